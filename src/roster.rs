use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::RosterError;
use crate::models::{Cell, Roster, RosterResult, ScoredRoster, StudentRecord};

/// Averages at or below this value land in the filtered subset.
pub const AT_RISK_THRESHOLD: f64 = 7.0;

/// Leading columns (identifier and name) that are passed through untouched.
pub const RESERVED_COLUMNS: usize = 2;

const MIN_COLUMNS: usize = RESERVED_COLUMNS + 1;

pub fn parse(raw: &[u8]) -> Result<Roster, RosterError> {
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(RosterError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(raw);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(RosterError::Empty);
    }
    let columns = dedupe_columns(headers.iter());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::infer).collect());
    }

    Ok(Roster { columns, rows })
}

/// Repeated header names get a `.N` suffix so every output key is unique.
fn dedupe_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<&str, usize> = HashMap::new();
    let mut columns = Vec::new();

    for header in headers {
        let mut name = header.to_string();
        while taken.contains(&name) {
            let suffix = suffixes.entry(header).or_insert(0);
            *suffix += 1;
            name = format!("{header}.{suffix}");
        }
        taken.insert(name.clone());
        columns.push(name);
    }

    columns
}

pub fn validate_shape(roster: Roster) -> Result<Roster, RosterError> {
    if roster.column_count() < MIN_COLUMNS {
        return Err(RosterError::Shape {
            columns: roster.column_count(),
        });
    }
    Ok(roster)
}

pub fn compute_averages(roster: Roster) -> ScoredRoster {
    let columns: Arc<[String]> = roster.columns.into();
    let students = roster
        .rows
        .into_iter()
        .map(|cells| StudentRecord {
            columns: Arc::clone(&columns),
            average: row_average(&cells),
            cells,
        })
        .collect();

    ScoredRoster { students }
}

/// Mean over every score column. One non-numeric score makes the whole mean NaN.
pub fn row_average(cells: &[Cell]) -> f64 {
    let scores = cells.get(RESERVED_COLUMNS..).unwrap_or(&[]);
    if scores.is_empty() {
        return f64::NAN;
    }
    let total: f64 = scores.iter().map(Cell::score).sum();
    total / scores.len() as f64
}

pub fn filter_by_threshold(roster: &ScoredRoster, threshold: f64) -> Vec<StudentRecord> {
    roster
        .students
        .iter()
        .filter(|student| student.average.is_finite() && student.average <= threshold)
        .cloned()
        .collect()
}

pub fn build_result(roster: ScoredRoster, filtered: Vec<StudentRecord>) -> RosterResult {
    RosterResult {
        all_students: roster.students,
        filtered_students: filtered,
    }
}

pub fn process(raw: &[u8]) -> Result<RosterResult, RosterError> {
    let roster = validate_shape(parse(raw)?)?;
    let scored = compute_averages(roster);
    let filtered = filter_by_threshold(&scored, AT_RISK_THRESHOLD);
    Ok(build_result(scored, filtered))
}
