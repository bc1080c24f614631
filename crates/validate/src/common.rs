//! Common types for task validation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for validation errors.
///
/// Descriptive only: any entry at all makes a result invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    /// The task cannot run as configured.
    Error,
    /// The task would run but likely not do what was intended.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Identifier of the rule that produced this entry.
    pub rule: String,
    /// Human-readable message.
    pub message: String,
    pub severity: Severity,
    /// Suggested fix, if available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorEntry {
    /// Create an error-level entry.
    pub fn error(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            severity: Severity::Error,
            suggestion: None,
        }
    }

    /// Create a warning-level entry.
    pub fn warning(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule, message)
        }
    }

    /// Add a suggested fix to the entry.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.rule, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (hint: {suggestion})")?;
        }
        Ok(())
    }
}

/// Outcome of validating one task.
///
/// Built once from the complete list of entries; `valid` is true exactly
/// when that list is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<ErrorEntry>,
}

impl ValidationResult {
    pub fn from_entries(errors: Vec<ErrorEntry>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Entries in rule order.
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Returns the number of error-level entries.
    pub fn error_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warning-level entries.
    pub fn warning_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .count()
    }

    /// Entries produced by the rule `rule`.
    pub fn by_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a ErrorEntry> {
        self.errors.iter().filter(move |e| e.rule == rule)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return f.write_str("valid");
        }
        write!(f, "invalid ({} problem(s))", self.errors.len())?;
        for entry in &self.errors {
            write!(f, "\n  - {entry}")?;
        }
        Ok(())
    }
}
