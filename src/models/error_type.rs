use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a failed automation result is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    /// Continue without logging
    Ignore,
    /// Log a warning and continue
    Warning,
    /// Abort the operation
    Error,
}

impl FromStr for ErrorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(ErrorType::Ignore),
            "warning" => Ok(ErrorType::Warning),
            "error" => Ok(ErrorType::Error),
            _ => Err(format!(
                "Invalid error type: {} (expected ignore, warning or error)",
                s
            )),
        }
    }
}

/// Ordered error-text substrings and the policy applied when one matches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarnList {
    entries: Vec<(String, ErrorType)>,
}

impl WarnList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern; earlier patterns take precedence
    pub fn push(&mut self, pattern: impl Into<String>, error_type: ErrorType) {
        self.entries.push((pattern.into(), error_type));
    }

    pub fn with(mut self, pattern: impl Into<String>, error_type: ErrorType) -> Self {
        self.push(pattern, error_type);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ErrorType)> {
        self.entries
            .iter()
            .map(|(pattern, error_type)| (pattern.as_str(), *error_type))
    }

    /// Policy of the first pattern found in `err`, or `Error` when none is
    pub fn classify(&self, err: &str) -> ErrorType {
        self.entries
            .iter()
            .find(|(pattern, _)| err.contains(pattern.as_str()))
            .map(|(_, error_type)| *error_type)
            .unwrap_or(ErrorType::Error)
    }
}

impl<S: Into<String>> FromIterator<(S, ErrorType)> for WarnList {
    fn from_iter<I: IntoIterator<Item = (S, ErrorType)>>(iter: I) -> Self {
        let mut list = WarnList::new();
        for (pattern, error_type) in iter {
            list.push(pattern, error_type);
        }
        list
    }
}
