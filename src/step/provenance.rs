// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::panic::Location;

use serde::Serialize;

/// Where a step was declared.
///
/// Captured automatically through `#[track_caller]` when a
/// [`StepDeclaration`](crate::step::StepDeclaration) is created, so every
/// diagnostic can point back at the declaring source line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Provenance {
    step_id: String,
    file: &'static str,
    line: u32,
    column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
}

impl Provenance {
    pub fn new(step_id: impl Into<String>, file: &'static str, line: u32, column: u32) -> Self {
        Self {
            step_id: step_id.into(),
            file,
            line,
            column,
            origin: None,
        }
    }

    /// Provenance pointing at the caller's source location.
    #[track_caller]
    pub fn caller(step_id: impl Into<String>) -> Self {
        let location = Location::caller();
        Self::new(step_id, location.file(), location.line(), location.column())
    }

    /// Attach a free-form origin, such as the extension that contributed the step.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// `file:line:column`
    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({}", self.step_id, self.location())?;
        if let Some(origin) = &self.origin {
            write!(f, ", from {}", origin)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_captures_this_file() {
        let provenance = Provenance::caller("probe");
        assert_eq!(provenance.step_id(), "probe");
        assert!(provenance.file().ends_with("provenance.rs"));
        assert!(provenance.line() > 0);
    }

    #[test]
    fn test_display_includes_origin_when_present() {
        let plain = Provenance::new("scan", "src/scan.rs", 7, 3);
        assert_eq!(plain.to_string(), "'scan' (src/scan.rs:7:3)");

        let tagged = plain.with_origin("ext-rest");
        assert_eq!(tagged.to_string(), "'scan' (src/scan.rs:7:3, from ext-rest)");
        assert_eq!(tagged.origin(), Some("ext-rest"));
    }
}
