//! `LD_PRELOAD` interception of `open`, `openat`, `readlink` and `readlinkat`.
//!
//! Every override follows the same protocol:
//!
//! 1. Run one-time initialization if nobody has yet.
//! 2. Initialization failed: fail with `ENOSYS`, nothing to delegate to.
//! 3. This thread is already evaluating policy: delegate immediately.
//! 4. Resolve an absolute decision path and ask the [`IgnorePolicy`].
//! 5. Ignored and enforcing: fail with `EACCES`, no I/O on the target.
//! 6. Otherwise delegate with the caller's exact arguments and return the
//!    real result and `errno` untouched.
//!
//! Usage:
//!
//! ```text
//! LD_PRELOAD=/path/to/libldignore.so LDIGNORE_ENFORCE=1 LDIGNORE_DEBUG=1 some-tool
//! ```
//!
//! [`IgnorePolicy`]: crate::policy::IgnorePolicy

mod diagnostics;
#[cfg(all(not(test), any(target_arch = "x86_64", target_arch = "aarch64")))]
mod exports;
mod guard;
mod lifecycle;
mod real;
mod state;

pub use diagnostics::Diagnostics;
pub use guard::ReentrancyGuard;
pub use lifecycle::{
    Lifecycle, Route, build_state, initialize, lifecycle, route, select_route, teardown,
};
pub use real::{RealFns, needs_mode};
pub use state::{InterceptionState, Operation, Target, fail};
