use crate::grade::{classify, Grade};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// One submitted row. The grade is derived from `marks` whenever it is asked
/// for, so it can never disagree with the score.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub name: String,
    pub roll_number: String,
    pub subject: String,
    pub marks: f64,
    pub attendance: f64,
}

impl StudentRecord {
    pub fn grade(&self) -> Grade {
        classify(self.marks)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecordOut<'a> {
    name: &'a str,
    roll_number: &'a str,
    subject: &'a str,
    marks: f64,
    attendance: f64,
    grade: Grade,
}

// Accepts both the current field names and the ones written by the
// browser dashboard. A stored `grade` is ignored; it is recomputed on read.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecordIn {
    #[serde(default, alias = "sName")]
    name: Option<String>,
    #[serde(default, alias = "sRoll")]
    roll_number: Option<String>,
    #[serde(default, alias = "sSubject")]
    subject: Option<String>,
    #[serde(default, alias = "sMarks")]
    marks: Option<f64>,
    #[serde(default, alias = "sAttendance")]
    attendance: Option<f64>,
}

impl Serialize for StudentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StoredRecordOut {
            name: &self.name,
            roll_number: &self.roll_number,
            subject: &self.subject,
            marks: self.marks,
            attendance: self.attendance,
            grade: self.grade(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StudentRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = StoredRecordIn::deserialize(deserializer)?;
        Ok(StudentRecord {
            name: raw.name.unwrap_or_default(),
            roll_number: raw.roll_number.unwrap_or_default(),
            subject: raw.subject.unwrap_or_default(),
            marks: raw.marks.unwrap_or(0.0),
            attendance: raw.attendance.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    RollNumber,
    Subject,
    Marks,
    Attendance,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::RollNumber => "rollNumber",
            Field::Subject => "subject",
            Field::Marks => "marks",
            Field::Attendance => "attendance",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::RollNumber => "Roll number",
            Field::Subject => "Subject",
            Field::Marks => "Marks",
            Field::Attendance => "Attendance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{} is required", .0.label())]
    Required(Field),
    #[error("{} must be a number", .0.label())]
    NotANumber(Field),
    #[error("{} must be between 0 and 100", .field.label())]
    OutOfRange { field: Field, value: f64 },
}

impl ValidationError {
    pub fn field(&self) -> Field {
        match self {
            ValidationError::Required(f) | ValidationError::NotANumber(f) => *f,
            ValidationError::OutOfRange { field, .. } => *field,
        }
    }

    pub fn constraint(&self) -> &'static str {
        match self {
            ValidationError::Required(_) => "required",
            ValidationError::NotANumber(_) => "number",
            ValidationError::OutOfRange { .. } => "range_0_100",
        }
    }
}

/// Raw numeric form input before parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberInput {
    Blank,
    Number(f64),
    Text(String),
}

impl NumberInput {
    fn from_value(v: Option<&Value>) -> Self {
        match v {
            None | Some(Value::Null) => NumberInput::Blank,
            Some(Value::Number(n)) => n
                .as_f64()
                .map(NumberInput::Number)
                .unwrap_or_else(|| NumberInput::Text(n.to_string())),
            Some(Value::String(s)) if s.trim().is_empty() => NumberInput::Blank,
            Some(Value::String(s)) => NumberInput::Text(s.clone()),
            Some(other) => NumberInput::Text(other.to_string()),
        }
    }

    // A blank field counts as zero, like the browser form did.
    fn parse(&self, field: Field) -> Result<f64, ValidationError> {
        let v = match self {
            NumberInput::Blank => 0.0,
            NumberInput::Number(n) => *n,
            NumberInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::NotANumber(field))?,
        };
        if !v.is_finite() {
            return Err(ValidationError::NotANumber(field));
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&v) {
            return Err(ValidationError::OutOfRange { field, value: v });
        }
        // -0 passes the range check; store it as 0.
        Ok(v + 0.0)
    }
}

/// A candidate record as collected from the form.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub name: String,
    pub roll_number: String,
    pub subject: String,
    pub marks: NumberInput,
    pub attendance: NumberInput,
}

fn text_field(obj: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}

fn number_field(obj: &Value, keys: &[&str]) -> NumberInput {
    NumberInput::from_value(keys.iter().find_map(|k| obj.get(*k)))
}

impl RecordDraft {
    pub fn from_json(obj: &Value) -> Self {
        RecordDraft {
            name: text_field(obj, &["name", "sName"]),
            roll_number: text_field(obj, &["rollNumber", "sRoll"]),
            subject: text_field(obj, &["subject", "sSubject"]),
            marks: number_field(obj, &["marks", "sMarks"]),
            attendance: number_field(obj, &["attendance", "sAttendance"]),
        }
    }

    /// Checks required fields first, then marks, then attendance, reporting
    /// the first violation.
    pub fn validate(&self) -> Result<ValidatedRecord, ValidationError> {
        let name = self.name.trim();
        let roll_number = self.roll_number.trim();
        let subject = self.subject.trim();
        if name.is_empty() {
            return Err(ValidationError::Required(Field::Name));
        }
        if roll_number.is_empty() {
            return Err(ValidationError::Required(Field::RollNumber));
        }
        if subject.is_empty() {
            return Err(ValidationError::Required(Field::Subject));
        }
        let marks = self.marks.parse(Field::Marks)?;
        let attendance = self.attendance.parse(Field::Attendance)?;

        Ok(ValidatedRecord(StudentRecord {
            name: name.to_string(),
            roll_number: roll_number.to_string(),
            subject: subject.to_string(),
            marks,
            attendance,
        }))
    }
}

/// Proof that a record passed `RecordDraft::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord(StudentRecord);

impl ValidatedRecord {
    pub fn into_record(self) -> StudentRecord {
        self.0
    }
}
