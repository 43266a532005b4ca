//! Diagnostics reported by the bundler process.
//!
//! esbuild writes human-readable messages to stderr. This module extracts
//! them into [`Diagnostic`] values so errors can be reported per location
//! instead of as one opaque blob.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// `✘ [ERROR] message` or `▲ [WARNING] message` (`X` on terminals without unicode)
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:✘|▲|X)\s*\[(ERROR|WARNING)\]\s+(.+?)\s*$").unwrap()
});

/// `    src/popup.ts:12:4:`
static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(\S.*?):(\d+):(\d+):\s*$").unwrap());

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One message reported by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    /// Attach a source location.
    pub fn at(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// `file:line:col`, or just the file when the position is unknown.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        Some(match (self.line, self.column) {
            (Some(line), Some(column)) => format!("{}:{}:{}", file, line, column),
            (Some(line), None) => format!("{}:{}", file, line),
            _ => file.clone(),
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Parse esbuild's log output into diagnostics.
///
/// Every `[ERROR]`/`[WARNING]` header starts a diagnostic. The first
/// `file:line:col:` line that follows it, before the next header, becomes its
/// location. Code frames, notes and the trailing summary are ignored.
pub fn parse_esbuild_log(log: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut located = true;

    for line in log.lines() {
        if let Some(caps) = HEADER.captures(line) {
            diagnostics.push(match &caps[1] {
                "ERROR" => Diagnostic::error(&caps[2]),
                _ => Diagnostic::warning(&caps[2]),
            });
            located = false;
            continue;
        }

        if located {
            continue;
        }

        if let Some(caps) = LOCATION.captures(line) {
            if let Some(current) = diagnostics.last_mut() {
                current.file = Some(caps[1].to_string());
                current.line = caps[2].parse().ok();
                current.column = caps[3].parse().ok();
            }
            located = true;
        }
    }

    diagnostics
}
