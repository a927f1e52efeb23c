use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered log severity used for filtering.
///
/// A sink configured at level `L` accepts records at `L` and every
/// more severe level, so the derived ordering runs from `Debug` up to
/// `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    /// Parse a level name, treating anything unrecognized as `Info`.
    ///
    /// Mirrors how shortcut methods such as `log` are routed: only the
    /// four canonical names (and their backend aliases) keep their meaning.
    pub fn lenient(name: &str) -> Severity {
        name.parse().unwrap_or(Severity::Info)
    }

    /// Whether a record at `level` passes a sink configured at `self`.
    pub fn admits(&self, level: Severity) -> bool {
        level >= *self
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    /// Accepts the canonical names plus the extended backend vocabulary,
    /// normalized down to the four canonical levels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" | "silly" => Ok(Severity::Debug),
            "info" | "notice" | "verbose" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" | "critical" | "crit" | "alert" | "emergency" | "emerg" | "fatal" => {
                Ok(Severity::Error)
            }
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

/// Severity vocabulary understood by the error-tracking backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl BackendSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendSeverity::Debug => "debug",
            BackendSeverity::Info => "info",
            BackendSeverity::Warning => "warning",
            BackendSeverity::Error => "error",
        }
    }
}

impl fmt::Display for BackendSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw level name onto the backend's severity.
///
/// Total: every name not listed below, `error` included, reports as
/// `error`. Backend severities below `error` do not trigger alerting on
/// the remote side.
pub fn backend_severity(level: &str) -> BackendSeverity {
    match level {
        "warn" => BackendSeverity::Warning,
        "info" | "verbose" => BackendSeverity::Info,
        "debug" | "silly" => BackendSeverity::Debug,
        _ => BackendSeverity::Error,
    }
}

impl From<Severity> for BackendSeverity {
    fn from(level: Severity) -> Self {
        backend_severity(level.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_runs_from_debug_to_error() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Warn.admits(Severity::Error));
        assert!(Severity::Warn.admits(Severity::Warn));
        assert!(!Severity::Warn.admits(Severity::Info));
    }

    #[test]
    fn extended_names_normalize_down() {
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("notice".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("silly".parse::<Severity>(), Ok(Severity::Debug));
        assert_eq!("verbose".parse::<Severity>(), Ok(Severity::Info));
        for name in ["critical", "alert", "emergency", "ERROR"] {
            assert_eq!(name.parse::<Severity>(), Ok(Severity::Error), "{name}");
        }
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn lenient_falls_back_to_info() {
        assert_eq!(Severity::lenient("log"), Severity::Info);
        assert_eq!(Severity::lenient("warn"), Severity::Warn);
    }

    #[test]
    fn backend_mapping_is_total() {
        let cases = [
            ("warn", BackendSeverity::Warning),
            ("info", BackendSeverity::Info),
            ("verbose", BackendSeverity::Info),
            ("debug", BackendSeverity::Debug),
            ("silly", BackendSeverity::Debug),
            ("error", BackendSeverity::Error),
            ("critical", BackendSeverity::Error),
            ("", BackendSeverity::Error),
        ];
        for (level, expected) in cases {
            assert_eq!(backend_severity(level), expected, "{level}");
        }
        assert_eq!(BackendSeverity::from(Severity::Warn), BackendSeverity::Warning);
    }
}
