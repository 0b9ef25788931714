//! Environment-driven settings, read once at initialization.

use std::ffi::{OsStr, OsString};

/// Enables enforcement when set to exactly `1`. Otherwise denials are only reported.
pub const ENFORCE_ENV: &str = "LDIGNORE_ENFORCE";

/// Enables the diagnostics channel when set to exactly `1`.
pub const DEBUG_ENV: &str = "LDIGNORE_DEBUG";

/// Optional `EnvFilter` directives for the diagnostics channel.
pub const LOG_FILTER_ENV: &str = "LDIGNORE_LOG";

/// What happens to a call whose path the policy ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Report the denial, let the call through.
    #[default]
    Audit,
    /// Fail the call with `EACCES`.
    Enforce,
}

/// Settings read once, when the library initializes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub mode: Mode,

    /// Emit blocked paths and initialization events on stderr.
    pub diagnostics: bool,

    /// Filter directives for diagnostics (`LDIGNORE_LOG`), if set.
    pub log_filter: Option<String>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var_os(key))
    }

    /// Read settings with a custom env var lookup (for testing).
    pub fn from_env_with<F>(env_fn: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mode = if switch_enabled(env_fn(ENFORCE_ENV).as_deref()) {
            Mode::Enforce
        } else {
            Mode::Audit
        };

        Self {
            mode,
            diagnostics: switch_enabled(env_fn(DEBUG_ENV).as_deref()),
            log_filter: env_fn(LOG_FILTER_ENV)
                .and_then(|v| v.into_string().ok())
                .filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn enforcing(&self) -> bool {
        self.mode == Mode::Enforce
    }
}

fn switch_enabled(value: Option<&OsStr>) -> bool {
    value == Some(OsStr::new("1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        Settings::from_env_with(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_audit_without_diagnostics() {
        let s = settings(&[]);
        assert_eq!(s.mode, Mode::Audit);
        assert!(!s.diagnostics);
        assert!(!s.enforcing());
        assert_eq!(s.log_filter, None);
    }

    #[test]
    fn switches_require_literal_one() {
        let s = settings(&[(ENFORCE_ENV, "1"), (DEBUG_ENV, "1")]);
        assert!(s.enforcing());
        assert!(s.diagnostics);

        for value in ["true", "yes", "01", " 1", "1 ", "", "0", "2"] {
            let s = settings(&[(ENFORCE_ENV, value), (DEBUG_ENV, value)]);
            assert_eq!(s.mode, Mode::Audit, "value {value:?}");
            assert!(!s.diagnostics, "value {value:?}");
        }
    }

    #[test]
    fn switches_are_independent() {
        let s = settings(&[(DEBUG_ENV, "1")]);
        assert_eq!(s.mode, Mode::Audit);
        assert!(s.diagnostics);
    }

    #[test]
    fn log_filter_is_optional() {
        let s = settings(&[(LOG_FILTER_ENV, "ldignore=trace")]);
        assert_eq!(s.log_filter.as_deref(), Some("ldignore=trace"));
        assert_eq!(settings(&[(LOG_FILTER_ENV, "  ")]).log_filter, None);
    }
}
