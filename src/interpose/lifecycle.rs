//! One-time initialization and the process-wide state it produces.
//!
//! ```text
//! NotInitialized ──► Initializing ──┬──► Ready ──► TornDown
//!                                   └──► Failed
//! ```
//!
//! The state is built exactly once, behind a [`OnceLock`], and is
//! read-only afterwards. `Failed` is terminal: every override reports
//! `ENOSYS`. After `TornDown` (library unload) calls are passed straight
//! to the real implementations.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, error};

use super::diagnostics::{Diagnostics, contain_panics};
use super::guard::ReentrancyGuard;
use super::real::RealFns;
use super::state::InterceptionState;
use crate::config::Settings;
use crate::error::{InitError, InterceptError};
use crate::policy::IgnorePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    NotInitialized = 0,
    Initializing = 1,
    Ready = 2,
    Failed = 3,
    TornDown = 4,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotInitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::TornDown,
        }
    }
}

static LIFECYCLE: AtomicU8 = AtomicU8::new(Lifecycle::NotInitialized as u8);
static STATE: OnceLock<Result<InterceptionState, InitError>> = OnceLock::new();

pub fn lifecycle() -> Lifecycle {
    Lifecycle::from_u8(LIFECYCLE.load(Ordering::Acquire))
}

fn set_lifecycle(next: Lifecycle) {
    LIFECYCLE.store(next as u8, Ordering::Release);
}

/// Initialize on first use; later calls return the same result.
///
/// Concurrent first callers block until the single initialization is done.
pub fn initialize() -> Result<&'static InterceptionState, &'static InitError> {
    STATE
        .get_or_init(|| {
            set_lifecycle(Lifecycle::Initializing);
            // Anything intercepted while we set up must not wait on this barrier.
            let _guard = ReentrancyGuard::enter();
            contain_panics();
            let result = build_state(Settings::from_env(), RealFns::resolve);
            set_lifecycle(if result.is_ok() {
                Lifecycle::Ready
            } else {
                Lifecycle::Failed
            });
            result
        })
        .as_ref()
}

/// Build the state from `settings` and a symbol resolver.
pub fn build_state<R>(settings: Settings, resolve: R) -> Result<InterceptionState, InitError>
where
    R: FnOnce() -> Result<RealFns, InitError>,
{
    let diagnostics = Diagnostics::new(&settings);

    match resolve() {
        Ok(real) => {
            diagnostics.scope(|| {
                debug!(
                    mode = ?settings.mode,
                    pid = std::process::id(),
                    "ldignore initialized"
                )
            });
            Ok(InterceptionState::with_diagnostics(
                real,
                settings,
                IgnorePolicy::new(),
                diagnostics,
            ))
        }
        Err(e) => {
            diagnostics.scope(|| {
                error!(
                    "ldignore initialization failed: {}; intercepted calls will fail with ENOSYS",
                    e
                )
            });
            Err(e)
        }
    }
}

/// Mark the library as unloaded.
pub fn teardown() {
    if let Some(Ok(state)) = STATE.get() {
        state.diagnostics().scope(|| debug!("ldignore unloading"));
    }
    set_lifecycle(Lifecycle::TornDown);
}

/// How an override must handle the current call.
pub enum Route {
    /// Evaluate policy, then delegate or deny.
    Gate(&'static InterceptionState),
    /// Delegate without consulting policy.
    PassThrough(RealFns),
    /// Fail without delegating.
    Fail(InterceptError),
}

/// Pick the [`Route`] for a call arriving now on this thread.
pub fn route() -> Route {
    if ReentrancyGuard::is_active() {
        return nested_route(STATE.get());
    }

    let init = initialize();
    select_route(init, lifecycle())
}

/// Route for a call outside policy evaluation, given the outcome of
/// initialization and the lifecycle stage observed after it.
pub fn select_route(
    init: Result<&'static InterceptionState, &'static InitError>,
    stage: Lifecycle,
) -> Route {
    match init {
        Err(e) => Route::Fail(e.clone().into()),
        Ok(state) if stage == Lifecycle::TornDown => Route::PassThrough(*state.real()),
        Ok(state) => Route::Gate(state),
    }
}

/// Route for a call made while this thread is evaluating policy or
/// initializing, where waiting on the barrier could deadlock.
fn nested_route(state: Option<&Result<InterceptionState, InitError>>) -> Route {
    match state {
        Some(Ok(state)) => Route::PassThrough(*state.real()),
        Some(Err(e)) => Route::Fail(e.clone().into()),
        None => match RealFns::resolve() {
            Ok(real) => Route::PassThrough(real),
            Err(e) => Route::Fail(e.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::interpose::state::fail;
    use nix::errno::Errno;

    #[test]
    fn failed_resolution_is_reported() {
        let result = build_state(Settings::default(), || {
            Err(InitError::SymbolUnresolved { symbol: "readlinkat" })
        });
        assert_eq!(
            result.err(),
            Some(InitError::SymbolUnresolved { symbol: "readlinkat" })
        );
    }

    #[test]
    fn built_state_keeps_settings() {
        let settings = Settings {
            mode: Mode::Enforce,
            ..Settings::default()
        };
        let state = build_state(settings.clone(), RealFns::resolve).unwrap();
        assert_eq!(state.settings(), &settings);
        assert!(!state.diagnostics().is_enabled());
    }

    #[test]
    fn initialize_runs_once_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    initialize().map(|s| s as *const InterceptionState as usize)
                })
            })
            .collect();
        let addrs: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
        assert_ne!(lifecycle(), Lifecycle::NotInitialized);
        assert_ne!(lifecycle(), Lifecycle::Initializing);
    }

    #[test]
    fn nested_calls_pass_through() {
        let _guard = ReentrancyGuard::enter().unwrap();
        assert!(matches!(route(), Route::PassThrough(_)));
    }

    #[test]
    fn failed_initialization_routes_to_enosys() {
        let failure: &'static InitError =
            Box::leak(Box::new(InitError::SymbolUnresolved { symbol: "open" }));
        let Route::Fail(e) = select_route(Err(failure), Lifecycle::Failed) else {
            panic!("failed initialization must not delegate");
        };
        assert_eq!(e.errno(), libc::ENOSYS);
        assert_eq!(fail(&e), -1);
        assert_eq!(Errno::last_raw(), libc::ENOSYS);
    }

    #[test]
    fn ready_state_is_gated() {
        assert!(matches!(
            select_route(Ok(leaked_state()), Lifecycle::Ready),
            Route::Gate(_)
        ));
    }

    #[test]
    fn torn_down_state_passes_through() {
        assert!(matches!(
            select_route(Ok(leaked_state()), Lifecycle::TornDown),
            Route::PassThrough(_)
        ));
    }

    #[test]
    fn nested_call_after_failed_init_reports_enosys() {
        let failed = Err(InitError::SymbolUnresolved { symbol: "readlink" });
        let Route::Fail(e) = nested_route(Some(&failed)) else {
            panic!("failed initialization must not delegate");
        };
        assert_eq!(e.errno(), libc::ENOSYS);
    }

    #[test]
    fn nested_call_during_init_resolves_symbols_itself() {
        assert!(matches!(nested_route(None), Route::PassThrough(_)));
    }

    fn leaked_state() -> &'static InterceptionState {
        let state = build_state(Settings::default(), RealFns::resolve).unwrap();
        Box::leak(Box::new(state))
    }
}
