//! ldignore - keep a preloaded process away from files its operator marked private
//!
//! Load `libldignore.so` with `LD_PRELOAD` and every `open`, `openat`,
//! `readlink` and `readlinkat` the process makes is checked against the
//! `.claudeignore` / `.copilotignore` files of the target's ancestor
//! directories:
//! - Policy engine: hierarchical ignore file discovery and glob matching
//! - Interception layer: reentrancy-safe, thread-safe symbol interposition
//! - Audit mode by default; `LDIGNORE_ENFORCE=1` turns denials into `EACCES`

pub mod config;
pub mod error;
#[cfg(target_os = "linux")]
pub mod interpose;
pub mod paths;
pub mod policy;

pub use config::{Mode, Settings};
pub use error::{InitError, InterceptError};
pub use policy::{IgnorePolicy, should_ignore};
