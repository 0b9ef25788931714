//! Failure taxonomy of the interception layer.
//!
//! Only two failures ever reach a caller, both as `errno` values. Path
//! resolution problems and unreadable ignore files are absorbed where they
//! happen and never become errors.

use libc::c_int;
use thiserror::Error;

/// Initialization failed; the library cannot delegate any call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("could not resolve the next definition of `{symbol}`")]
    SymbolUnresolved { symbol: &'static str },
}

/// Why an intercepted call failed without reaching the real implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterceptError {
    /// Enforcement is on and the path is ignored.
    #[error("access to {path} denied by ignore policy")]
    PolicyDenied { path: String },

    /// Initialization failed, there is nothing to delegate to.
    #[error("{0}")]
    NotImplemented(#[from] InitError),
}

impl InterceptError {
    /// The `errno` value reported to the caller.
    pub fn errno(&self) -> c_int {
        match self {
            Self::PolicyDenied { .. } => libc::EACCES,
            Self::NotImplemented(_) => libc::ENOSYS,
        }
    }
}
