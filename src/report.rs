use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One row of the input list. Supplied externally, immutable.
#[derive(Clone, Debug, Deserialize)]
pub struct ReportDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

pub fn load_reports(path: &Path) -> Result<Vec<ReportDescriptor>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open report list {}", path.display()))?;
    let mut reports = Vec::new();
    for row in reader.deserialize() {
        let mut report: ReportDescriptor = row.context("malformed row in report list")?;
        report.name = report.name.trim().to_string();
        report.url = report.url.trim().to_string();
        report.description = report.description.trim().to_string();
        reports.push(report);
    }
    Ok(reports)
}

/// Turn a report name into a safe file stem: filesystem-unsafe characters
/// become underscores, whitespace runs collapse to one underscore, no
/// leading/trailing underscore, at most 100 characters.
pub fn sanitize_filename(name: &str) -> String {
    let mut safe = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for ch in name.chars() {
        if matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            safe.push('_');
            in_whitespace = false;
        } else if ch.is_whitespace() {
            if !in_whitespace {
                safe.push('_');
            }
            in_whitespace = true;
        } else {
            safe.push(ch);
            in_whitespace = false;
        }
    }
    let capped: String = safe.trim_matches('_').chars().take(100).collect();
    capped.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("Sales/Q1"), "Sales_Q1");
        assert_eq!(sanitize_filename(r#"a<b>c:d"e\f|g?h*i"#), "a_b_c_d_e_f_g_h_i");
    }

    #[test]
    fn sanitize_collapses_whitespace_runs() {
        assert_eq!(sanitize_filename("Weekly   Revenue\tReport"), "Weekly_Revenue_Report");
    }

    #[test]
    fn sanitize_trims_and_caps() {
        assert_eq!(sanitize_filename("  /edge/  "), "edge");
        let long = "x".repeat(150);
        let safe = sanitize_filename(&long);
        assert_eq!(safe.len(), 100);
        // A cap landing on an underscore must not leave one at the edge.
        let mut tricky = "y".repeat(99);
        tricky.push(' ');
        tricky.push_str(&"z".repeat(50));
        let safe = sanitize_filename(&tricky);
        assert!(safe.len() <= 100);
        assert!(!safe.starts_with('_') && !safe.ends_with('_'));
        for ch in safe.chars() {
            assert!(!matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'));
            assert!(!ch.is_whitespace());
        }
    }

    #[test]
    fn loads_and_trims_csv_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,url,description").unwrap();
        writeln!(file, " Sales ,https://x/dash/1,  quarterly sales ").unwrap();
        writeln!(file, "No Url,,placeholder").unwrap();
        let reports = load_reports(file.path()).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "Sales");
        assert_eq!(reports[0].url, "https://x/dash/1");
        assert_eq!(reports[0].description, "quarterly sales");
        assert!(reports[1].url.is_empty());
    }
}
