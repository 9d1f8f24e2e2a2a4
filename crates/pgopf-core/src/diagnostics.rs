//! Non-fatal findings collected while importing, validating or featurizing a
//! network: a generator with inverted limits, a bus without load, a power
//! flow that only converged under relaxed tolerance.
//!
//! ```
//! use pgopf_core::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("power_flow", "converged only under relaxed tolerance");
//! diag.add_error_with_entity("reference", "endpoint bus does not exist", "Line 4-9");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert!(diag.has_errors());
//! ```

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Short machine-friendly tag, e.g. `reference` or `power_flow`
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.category, self.message)?;
        match &self.entity {
            Some(entity) => write!(f, " ({entity})"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, category: &str, message: &str, entity: Option<&str>) {
        self.issues.push(DiagnosticIssue {
            severity,
            category: category.to_string(),
            message: message.to_string(),
            entity: entity.map(str::to_string),
        });
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.push(Severity::Warning, category, message, None);
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.push(Severity::Warning, category, message, Some(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.push(Severity::Error, category, message, None);
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.push(Severity::Error, category, message, Some(entity));
    }

    pub fn issues(&self) -> &[DiagnosticIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    fn of(&self, severity: Severity) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.of(Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.of(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_severity() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());

        diag.add_warning("power_flow", "relaxed");
        diag.add_warning_with_entity("validation", "no load", "Bus 1");
        diag.add_error("parse", "bad row");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.errors().count(), 1);
        assert_eq!(diag.issues().len(), 3);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_display() {
        let mut diag = Diagnostics::new();
        diag.add_error_with_entity("reference", "unknown bus", "Line 2-3");
        diag.add_warning("power_flow", "relaxed");
        let lines: Vec<_> = diag.issues().iter().map(|i| i.to_string()).collect();
        assert_eq!(lines[0], "error[reference]: unknown bus (Line 2-3)");
        assert_eq!(lines[1], "warning[power_flow]: relaxed");
    }

    #[test]
    fn test_serializes_lowercase_severity() {
        let mut diag = Diagnostics::new();
        diag.add_warning("power_flow", "relaxed");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(!json.contains("\"entity\""));
    }
}
