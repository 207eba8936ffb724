use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Output key for the computed per-student average.
pub const AVERAGE_FIELD: &str = "PROMEDIO";

/// Tokens read as a missing value rather than text.
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Cell::Missing;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Cell::Integer(value);
        }
        // `inf` and overflowing literals stay text so they never count as a score.
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Float(value),
            _ => Cell::Text(raw.to_string()),
        }
    }

    /// Numeric reading of a score cell. Text and missing cells read as NaN.
    pub fn score(&self) -> f64 {
        match self {
            Cell::Integer(value) => *value as f64,
            Cell::Float(value) => *value,
            Cell::Text(_) | Cell::Missing => f64::NAN,
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Integer(value) => serializer.serialize_i64(*value),
            Cell::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Cell::Float(_) | Cell::Missing => serializer.serialize_none(),
            Cell::Text(value) => serializer.serialize_str(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Roster {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Roster {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub columns: Arc<[String]>,
    pub cells: Vec<Cell>,
    pub average: f64,
}

impl Serialize for StudentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (column, cell) in self.columns.iter().zip(&self.cells) {
            if column == AVERAGE_FIELD {
                continue;
            }
            map.serialize_entry(column, cell)?;
        }
        if self.average.is_finite() {
            map.serialize_entry(AVERAGE_FIELD, &self.average)?;
        } else {
            map.serialize_entry(AVERAGE_FIELD, &Option::<f64>::None)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone)]
pub struct ScoredRoster {
    pub students: Vec<StudentRecord>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RosterResult {
    pub all_students: Vec<StudentRecord>,
    pub filtered_students: Vec<StudentRecord>,
}
