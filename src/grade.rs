use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter grade. Declaration order is best-first so `Grade::ALL` doubles as
/// the fixed chart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Inclusive lower bound of the band; F has none.
    pub fn lower_bound(self) -> Option<f64> {
        match self {
            Grade::A => Some(90.0),
            Grade::B => Some(75.0),
            Grade::C => Some(60.0),
            Grade::D => Some(40.0),
            Grade::F => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowest passing mark. Tied to the D band so the pass rate and the grade
/// distribution always agree on what a fail is.
pub const PASS_MARK: f64 = 40.0;

pub fn classify(marks: f64) -> Grade {
    for grade in Grade::ALL {
        match grade.lower_bound() {
            Some(min) if marks >= min => return grade,
            Some(_) => {}
            None => return grade,
        }
    }
    Grade::F
}

pub fn is_pass(marks: f64) -> bool {
    marks >= PASS_MARK
}
