use std::fmt::Write;

use crate::models::{Cell, RosterResult, StudentRecord};
use crate::roster::{AT_RISK_THRESHOLD, RESERVED_COLUMNS};

fn cell_label(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Integer(value)) => value.to_string(),
        Some(Cell::Float(value)) => value.to_string(),
        Some(Cell::Text(value)) => value.clone(),
        Some(Cell::Missing) | None => "-".to_string(),
    }
}

fn average_label(student: &StudentRecord) -> String {
    if student.average.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", student.average)
    }
}

pub fn build_report(source: &str, result: &RosterResult) -> String {
    let mut output = String::new();
    let score_columns: Vec<&str> = result
        .all_students
        .first()
        .map(|student| {
            student
                .columns
                .iter()
                .skip(RESERVED_COLUMNS)
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default();

    let _ = writeln!(output, "# Roster Average Report");
    let _ = writeln!(output, "Generated for {}", source);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Students: {}", result.all_students.len());
    let _ = writeln!(
        output,
        "- At or below {}: {}",
        AT_RISK_THRESHOLD,
        result.filtered_students.len()
    );
    if !score_columns.is_empty() {
        let _ = writeln!(output, "- Score columns: {}", score_columns.join(", "));
    }

    let incomplete = result
        .all_students
        .iter()
        .filter(|student| student.average.is_nan())
        .count();
    if incomplete > 0 {
        let _ = writeln!(output, "- Without a computable average: {}", incomplete);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students At or Below {}", AT_RISK_THRESHOLD);

    if result.filtered_students.is_empty() {
        let _ = writeln!(output, "No students at or below the threshold.");
    } else {
        for student in result.filtered_students.iter() {
            let _ = writeln!(
                output,
                "- {} ({}) average {}",
                cell_label(student.cells.get(1)),
                cell_label(student.cells.first()),
                average_label(student)
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster;

    #[test]
    fn report_lists_filtered_students() {
        let result =
            roster::process(b"ID,Name,Exam1,Exam2,Exam3\n1,Ana,8,6,9\n2,Beto,5,4,6\n").unwrap();
        let report = build_report("grades.csv", &result);

        assert!(report.contains("Generated for grades.csv"));
        assert!(report.contains("- Students: 2"));
        assert!(report.contains("- Score columns: Exam1, Exam2, Exam3"));
        assert!(report.contains("- Beto (2) average 5.00"));
        assert!(!report.contains("Ana (1)"));
    }

    #[test]
    fn report_notes_incomplete_rows() {
        let result = roster::process(b"ID,Name,S1\n1,Ana,absent\n").unwrap();
        let report = build_report("partial.csv", &result);

        assert!(report.contains("- Without a computable average: 1"));
        assert!(report.contains("No students at or below the threshold."));
    }
}
