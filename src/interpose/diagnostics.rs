//! Diagnostics channel.
//!
//! The library lives inside someone else's process, so it never touches
//! the global `tracing` dispatcher. Events are routed through a private
//! [`Dispatch`] that writes to stderr when `LDIGNORE_DEBUG=1`, and goes
//! nowhere otherwise.
//!
//! Panics raised while a thread evaluates policy are caught before they
//! reach the host; [`contain_panics`] keeps their report on this channel
//! as well.

use std::sync::Once;
use tracing::dispatcher;
use tracing::{Dispatch, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use super::guard::ReentrancyGuard;
use crate::config::Settings;

const DEFAULT_FILTER: &str = "debug";

pub struct Diagnostics {
    dispatch: Dispatch,
    enabled: bool,
}

impl Diagnostics {
    pub fn new(settings: &Settings) -> Self {
        Self::with_writer(settings, std::io::stderr)
    }

    /// Like [`Diagnostics::new`], writing to `writer` instead of stderr.
    pub fn with_writer<W>(settings: &Settings, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        if !settings.diagnostics {
            return Self::disabled();
        }

        let filter = settings
            .log_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run `f` with this channel as the thread's default dispatcher.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

/// Install a panic hook that reports panics raised during policy
/// evaluation through the thread's current dispatcher instead of stderr.
///
/// Other panics go to the hook that was installed before. Installing twice
/// is a no-op.
pub fn contain_panics() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if ReentrancyGuard::is_active() {
                error!("Panic during policy evaluation: {}", info);
            } else {
                previous(info);
            }
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn disabled_channel_swallows_events() {
        let diagnostics = Diagnostics::new(&Settings::default());
        assert!(!diagnostics.is_enabled());
        let enabled = diagnostics.scope(|| tracing::enabled!(tracing::Level::ERROR));
        assert!(!enabled);
    }

    #[test]
    fn enabled_channel_defaults_to_debug() {
        let settings = Settings {
            diagnostics: true,
            ..Settings::default()
        };
        let diagnostics = Diagnostics::new(&settings);
        assert!(diagnostics.is_enabled());
        assert!(diagnostics.scope(|| tracing::enabled!(tracing::Level::DEBUG)));
        assert!(!diagnostics.scope(|| tracing::enabled!(tracing::Level::TRACE)));
    }

    #[test]
    fn filter_directives_are_honored() {
        let settings = Settings {
            diagnostics: true,
            log_filter: Some("warn".into()),
            ..Settings::default()
        };
        let diagnostics = Diagnostics::new(&settings);
        assert!(diagnostics.scope(|| tracing::enabled!(tracing::Level::WARN)));
        assert!(!diagnostics.scope(|| tracing::enabled!(tracing::Level::INFO)));
    }

    #[test]
    fn scope_returns_closure_value() {
        let diagnostics = Diagnostics::disabled();
        assert_eq!(diagnostics.scope(|| 7), 7);
    }

    #[test]
    fn events_reach_custom_writer() {
        let captured = Captured::default();
        let sink = captured.clone();
        let settings = Settings {
            diagnostics: true,
            ..Settings::default()
        };
        let diagnostics = Diagnostics::with_writer(&settings, move || sink.clone());
        diagnostics.scope(|| tracing::warn!("Blocked /repo/.env"));
        assert!(captured.text().contains("Blocked /repo/.env"));
    }

    #[test]
    fn panics_during_evaluation_stay_on_the_channel() {
        contain_panics();
        let captured = Captured::default();
        let sink = captured.clone();
        let settings = Settings {
            diagnostics: true,
            ..Settings::default()
        };
        let diagnostics = Diagnostics::with_writer(&settings, move || sink.clone());

        let guard = ReentrancyGuard::enter().unwrap();
        let outcome =
            diagnostics.scope(|| std::panic::catch_unwind(|| panic!("rule table corrupted")));
        drop(guard);

        assert!(outcome.is_err());
        let text = captured.text();
        assert!(text.contains("Panic during policy evaluation"));
        assert!(text.contains("rule table corrupted"));
    }
}
