//! Path resolution for policy decisions.
//!
//! Policy decisions need an absolute path, but callers hand us relative
//! paths, paths relative to a directory descriptor, or raw C strings.
//! Resolution favors availability: when a directory descriptor cannot be
//! translated, the unresolved relative path is used instead of failing.

use libc::{AT_FDCWD, c_char, c_int};
use std::ffi::{CStr, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Make `path` absolute against the current working directory.
///
/// Returns `None` for an empty path, or for a relative path when the
/// working directory cannot be determined.
pub fn absolutize(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    absolutize_with_cwd(path, &cwd)
}

/// Make `path` absolute against an explicit working directory.
pub fn absolutize_with_cwd(path: &Path, cwd: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        Some(cwd.join(path))
    }
}

/// Resolve `path` given relative to the directory descriptor `dirfd`.
///
/// * absolute `path`: used as is, `dirfd` is irrelevant
/// * `AT_FDCWD`: joined with the current working directory
/// * any other descriptor: joined with the directory `dir_of(dirfd)`
///   reports; when that lookup fails the raw relative path is returned
pub fn resolve_at<F>(dirfd: c_int, path: &Path, dir_of: F) -> Option<PathBuf>
where
    F: FnOnce(c_int) -> Option<PathBuf>,
{
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    if dirfd == AT_FDCWD {
        let cwd = std::env::current_dir().ok()?;
        return absolutize_with_cwd(path, &cwd);
    }
    match dir_of(dirfd) {
        Some(dir) => Some(dir.join(path)),
        None => Some(path.to_path_buf()),
    }
}

/// The `/proc` link naming the file behind descriptor `fd`.
pub fn fd_link(fd: c_int) -> PathBuf {
    PathBuf::from(format!("/proc/self/fd/{fd}"))
}

/// Borrow a C path argument as a [`Path`].
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives
/// the returned reference.
pub unsafe fn from_c_path<'a>(ptr: *const c_char) -> Option<&'a Path> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let bytes = unsafe { CStr::from_ptr(ptr) }.to_bytes();
    Some(Path::new(OsStr::from_bytes(bytes)))
}
