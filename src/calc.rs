use crate::grade::{is_pass, Grade};
use crate::record::StudentRecord;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_TOP_N: usize = 5;
pub const UNKNOWN_SUBJECT: &str = "Unknown";

/// Half-away-from-zero rounding to `places` decimals.
pub fn round_to(x: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (x * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub count: usize,
    pub avg_marks: f64,
    pub avg_attendance: f64,
    /// Percentage, 0..=100.
    pub pass_rate: f64,
}

/// Card text exactly as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCards {
    pub total_students: String,
    pub avg_marks: String,
    pub avg_attendance: String,
    pub pass_rate: String,
}

impl SummaryStats {
    pub fn cards(&self) -> SummaryCards {
        SummaryCards {
            total_students: self.count.to_string(),
            avg_marks: format!("{:.2}", self.avg_marks),
            avg_attendance: format!("{:.2}", self.avg_attendance),
            pass_rate: if self.count == 0 {
                "0%".to_string()
            } else {
                format!("{:.1}%", self.pass_rate)
            },
        }
    }
}

pub fn summary_stats<'a, I>(records: I) -> SummaryStats
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut count: usize = 0;
    let mut sum_marks = 0.0;
    let mut sum_attendance = 0.0;
    let mut passed: usize = 0;
    for r in records {
        count += 1;
        sum_marks += r.marks;
        sum_attendance += r.attendance;
        if is_pass(r.marks) {
            passed += 1;
        }
    }
    if count == 0 {
        return SummaryStats {
            count: 0,
            avg_marks: 0.0,
            avg_attendance: 0.0,
            pass_rate: 0.0,
        };
    }
    let n = count as f64;
    SummaryStats {
        count,
        avg_marks: round_to(sum_marks / n, 2),
        avg_attendance: round_to(sum_attendance / n, 2),
        pass_rate: round_to(100.0 * passed as f64 / n, 1),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject: String,
    pub avg_marks: f64,
    pub count: usize,
}

/// Groups by the exact subject string, in order of first appearance.
pub fn subject_averages<'a, I>(records: I) -> Vec<SubjectAverage>
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut order: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in records {
        let subject = if r.subject.is_empty() {
            UNKNOWN_SUBJECT
        } else {
            r.subject.as_str()
        };
        let slot = match index.get(subject) {
            Some(i) => *i,
            None => {
                order.push((subject.to_string(), 0.0, 0));
                index.insert(subject.to_string(), order.len() - 1);
                order.len() - 1
            }
        };
        order[slot].1 += r.marks;
        order[slot].2 += 1;
    }
    order
        .into_iter()
        .map(|(subject, sum, count)| SubjectAverage {
            subject,
            avg_marks: if count > 0 {
                round_to(sum / count as f64, 2)
            } else {
                0.0
            },
            count,
        })
        .collect()
}

/// Count per grade; every grade is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeDistribution {
    counts: [usize; 5],
}

impl GradeDistribution {
    pub fn get(&self, grade: Grade) -> usize {
        self.counts[grade.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Grade, usize)> + '_ {
        Grade::ALL.into_iter().map(|g| (g, self.get(g)))
    }
}

// Serialized as an object keyed A..F in that order, for stable chart colors.
impl Serialize for GradeDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Grade::ALL.len()))?;
        for (grade, count) in self.iter() {
            map.serialize_entry(grade.as_str(), &count)?;
        }
        map.end()
    }
}

pub fn grade_distribution<'a, I>(records: I) -> GradeDistribution
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut dist = GradeDistribution::default();
    for r in records {
        dist.counts[r.grade().index()] += 1;
    }
    dist
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    #[serde(rename = "x")]
    pub attendance: f64,
    #[serde(rename = "y")]
    pub marks: f64,
}

pub fn scatter_series<'a, I>(records: I) -> Vec<ScatterPoint>
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    records
        .into_iter()
        .map(|r| ScatterPoint {
            attendance: r.attendance,
            marks: r.marks,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformer {
    pub name: String,
    pub marks: f64,
}

/// Highest marks first; equal marks keep insertion order.
pub fn top_performers<'a, I>(records: I, n: usize) -> Vec<TopPerformer>
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut sorted: Vec<&StudentRecord> = records.into_iter().collect();
    // Vec::sort_by is stable; equal marks (including -0 and 0) keep input order.
    sorted.sort_by(|a, b| b.marks.partial_cmp(&a.marks).unwrap_or(Ordering::Equal));
    sorted
        .into_iter()
        .take(n)
        .map(|r| TopPerformer {
            name: r.name.clone(),
            marks: r.marks,
        })
        .collect()
}
