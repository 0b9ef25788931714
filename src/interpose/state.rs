//! Gate logic shared by the four overrides.
//!
//! [`InterceptionState`] is the fully initialized library: real entry
//! points, settings, policy and diagnostics. Each override asks it for a
//! verdict and then either fails the call or delegates with the caller's
//! exact arguments.

use libc::{c_char, c_int, mode_t, size_t, ssize_t};
use nix::errno::Errno;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::diagnostics::Diagnostics;
use super::guard::ReentrancyGuard;
use super::real::RealFns;
use crate::config::Settings;
use crate::error::InterceptError;
use crate::paths;
use crate::policy::IgnorePolicy;

/// Which override is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    OpenAt,
    Readlink,
    ReadlinkAt,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::OpenAt => "openat",
            Self::Readlink => "readlink",
            Self::ReadlinkAt => "readlinkat",
        }
    }
}

/// The path argument of an intercepted call.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Path(&'a Path),
    At { dirfd: c_int, path: &'a Path },
}

pub struct InterceptionState {
    real: RealFns,
    settings: Settings,
    policy: IgnorePolicy,
    diagnostics: Diagnostics,
}

impl InterceptionState {
    pub fn new(real: RealFns, settings: Settings, policy: IgnorePolicy) -> Self {
        let diagnostics = Diagnostics::new(&settings);
        Self::with_diagnostics(real, settings, policy, diagnostics)
    }

    pub fn with_diagnostics(
        real: RealFns,
        settings: Settings,
        policy: IgnorePolicy,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            real,
            settings,
            policy,
            diagnostics,
        }
    }

    pub fn real(&self) -> &RealFns {
        &self.real
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Decide whether the call may reach the real implementation.
    ///
    /// A thread already inside policy evaluation is always let through.
    /// `errno` is left exactly as the caller had it.
    pub fn check(&self, op: Operation, target: Target<'_>) -> Result<(), InterceptError> {
        let Some(_guard) = ReentrancyGuard::enter() else {
            return Ok(());
        };

        let saved_errno = Errno::last_raw();
        let verdict = self.diagnostics.scope(|| {
            catch_unwind(AssertUnwindSafe(|| self.evaluate(op, target))).unwrap_or_else(|_| {
                error!(operation = op.as_str(), "Policy evaluation panicked; allowing call");
                Ok(())
            })
        });
        Errno::set_raw(saved_errno);

        verdict
    }

    fn evaluate(&self, op: Operation, target: Target<'_>) -> Result<(), InterceptError> {
        let Some(path) = self.decision_path(target) else {
            return Ok(());
        };
        let Some(hit) = self.policy.explain(&path) else {
            return Ok(());
        };

        if self.settings.enforcing() {
            warn!(
                operation = op.as_str(),
                pattern = %hit.rule.pattern,
                source = %hit.source.display(),
                "Blocked {}",
                path.display()
            );
            Err(InterceptError::PolicyDenied {
                path: path.display().to_string(),
            })
        } else {
            info!(
                operation = op.as_str(),
                pattern = %hit.rule.pattern,
                source = %hit.source.display(),
                "Would block {} (audit mode)",
                path.display()
            );
            Ok(())
        }
    }

    fn decision_path(&self, target: Target<'_>) -> Option<PathBuf> {
        match target {
            Target::Path(path) => Some(path.to_path_buf()),
            Target::At { dirfd, path } => {
                paths::resolve_at(dirfd, path, |fd| self.real.dir_of_fd(fd))
            }
        }
    }

    /// Gated `open`.
    ///
    /// # Safety
    ///
    /// Same contract as `open(2)`; `mode` is only read when `flags` need it.
    pub unsafe fn open(&self, path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
        // SAFETY: forwarded from the caller of `open`.
        if let Some(target) = unsafe { paths::from_c_path(path) }
            && let Err(e) = self.check(Operation::Open, Target::Path(target))
        {
            return fail(&e);
        }
        unsafe { self.real.open(path, flags, mode) }
    }

    /// Gated `openat`.
    ///
    /// # Safety
    ///
    /// Same contract as `openat(2)`.
    pub unsafe fn openat(
        &self,
        dirfd: c_int,
        path: *const c_char,
        flags: c_int,
        mode: mode_t,
    ) -> c_int {
        // SAFETY: forwarded from the caller of `openat`.
        if let Some(target) = unsafe { paths::from_c_path(path) }
            && let Err(e) = self.check(Operation::OpenAt, Target::At { dirfd, path: target })
        {
            return fail(&e);
        }
        unsafe { self.real.openat(dirfd, path, flags, mode) }
    }

    /// Gated `readlink`.
    ///
    /// # Safety
    ///
    /// Same contract as `readlink(2)`.
    pub unsafe fn readlink(&self, path: *const c_char, buf: *mut c_char, len: size_t) -> ssize_t {
        // SAFETY: forwarded from the caller of `readlink`.
        if let Some(target) = unsafe { paths::from_c_path(path) }
            && let Err(e) = self.check(Operation::Readlink, Target::Path(target))
        {
            return fail(&e) as ssize_t;
        }
        unsafe { self.real.readlink(path, buf, len) }
    }

    /// Gated `readlinkat`.
    ///
    /// # Safety
    ///
    /// Same contract as `readlinkat(2)`.
    pub unsafe fn readlinkat(
        &self,
        dirfd: c_int,
        path: *const c_char,
        buf: *mut c_char,
        len: size_t,
    ) -> ssize_t {
        // SAFETY: forwarded from the caller of `readlinkat`.
        if let Some(target) = unsafe { paths::from_c_path(path) }
            && let Err(e) = self.check(Operation::ReadlinkAt, Target::At { dirfd, path: target })
        {
            return fail(&e) as ssize_t;
        }
        unsafe { self.real.readlinkat(dirfd, path, buf, len) }
    }
}

/// Report `e` through `errno` and return the C failure value.
pub fn fail(e: &InterceptError) -> c_int {
    Errno::set_raw(e.errno());
    -1
}
