//! Environment variable names recognized by this crate.
//!
//! Explicit options passed to constructors always win over these; the
//! variables in turn win over the built-in defaults. Resolution goes
//! through a lookup function so callers (and tests) can supply their own
//! source instead of the process environment.

use crate::severity::Severity;

/// Minimum severity accepted by the [`Logger`](crate::logger::Logger).
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Base URL of the Airbrake endpoint, e.g. `https://api.airbrake.io`.
pub const AIRBRAKE_HOST_ENV: &str = "AIRBRAKE_HOST";

/// Airbrake project key.
pub const AIRBRAKE_PROJECT_KEY_ENV: &str = "AIRBRAKE_PROJECT_KEY";

/// Minimum severity forwarded to Airbrake.
pub const AIRBRAKE_LOG_LEVEL_ENV: &str = "AIRBRAKE_LOG_LEVEL";

/// Environment label attached to every notice.
pub const NODE_ENV_ENV: &str = "NODE_ENV";

/// Label used when [`NODE_ENV_ENV`] is not set.
pub const DEFAULT_ENVIRONMENT_LABEL: &str = "NODE_ENV Not Set";

/// Read a variable from the process environment, treating empty values
/// as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Resolve a severity: explicit value, then `key` from `lookup`, then
/// `default`. An unparsable value is reported on stderr and ignored.
pub fn resolve_level<F>(explicit: Option<Severity>, key: &str, lookup: &F, default: Severity) -> Severity
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = explicit {
        return level;
    }
    match lookup(key).map(|raw| raw.parse::<Severity>()) {
        Some(Ok(level)) => level,
        Some(Err(e)) => {
            eprintln!("ignoring {}: {}", key, e);
            default
        }
        None => default,
    }
}

/// Name of the running program, used as the notice `component`.
pub fn program_name() -> String {
    std::env::args()
        .next()
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .map(|path| path.display().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
