//! The real entry points, found through `dlsym(RTLD_NEXT, ..)`.

use libc::{c_char, c_int, c_uint, c_void, mode_t, size_t, ssize_t};
use std::ffi::{CStr, CString, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use crate::error::InitError;
use crate::paths;

pub type OpenFn = unsafe extern "C" fn(*const c_char, c_int, ...) -> c_int;
pub type OpenAtFn = unsafe extern "C" fn(c_int, *const c_char, c_int, ...) -> c_int;
pub type ReadlinkFn = unsafe extern "C" fn(*const c_char, *mut c_char, size_t) -> ssize_t;
pub type ReadlinkAtFn = unsafe extern "C" fn(c_int, *const c_char, *mut c_char, size_t) -> ssize_t;

/// Whether `flags` oblige the caller to pass a creation mode.
pub fn needs_mode(flags: c_int) -> bool {
    flags & libc::O_CREAT != 0 || flags & libc::O_TMPFILE == libc::O_TMPFILE
}

/// Table of the next definitions of the four wrapped functions.
#[derive(Clone, Copy)]
pub struct RealFns {
    open: OpenFn,
    openat: OpenAtFn,
    readlink: ReadlinkFn,
    readlinkat: ReadlinkAtFn,
}

impl RealFns {
    /// Look up every entry point in the objects loaded after this one.
    pub fn resolve() -> Result<Self, InitError> {
        // SAFETY: each name is paired with the C prototype of that symbol.
        unsafe {
            Ok(Self {
                open: next_symbol(c"open")?,
                openat: next_symbol(c"openat")?,
                readlink: next_symbol(c"readlink")?,
                readlinkat: next_symbol(c"readlinkat")?,
            })
        }
    }

    /// Call the real `open`, passing `mode` only when `flags` require one.
    ///
    /// # Safety
    ///
    /// Same contract as `open(2)`.
    pub unsafe fn open(&self, path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
        unsafe {
            if needs_mode(flags) {
                (self.open)(path, flags, mode as c_uint)
            } else {
                (self.open)(path, flags)
            }
        }
    }

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
        unsafe {
            if needs_mode(flags) {
                (self.openat)(dirfd, path, flags, mode as c_uint)
            } else {
                (self.openat)(dirfd, path, flags)
            }
        }
    }

    /// # Safety
    ///
    /// Same contract as `readlink(2)`.
    pub unsafe fn readlink(&self, path: *const c_char, buf: *mut c_char, len: size_t) -> ssize_t {
        unsafe { (self.readlink)(path, buf, len) }
    }

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
        unsafe { (self.readlinkat)(dirfd, path, buf, len) }
    }

    /// Target of the symlink at `path`, read with the real `readlink`.
    pub fn read_link(&self, path: &Path) -> Option<PathBuf> {
        let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
        let mut buf = vec![0u8; libc::PATH_MAX as usize];

        loop {
            // SAFETY: `c_path` is NUL-terminated and `buf` is writable for `buf.len()` bytes.
            let n = unsafe { self.readlink(c_path.as_ptr(), buf.as_mut_ptr().cast(), buf.len()) };
            let n = usize::try_from(n).ok()?;
            if n < buf.len() {
                buf.truncate(n);
                return Some(PathBuf::from(OsString::from_vec(buf)));
            }
            // Possibly truncated.
            buf.resize(buf.len() * 2, 0);
        }
    }

    /// Directory open behind descriptor `fd`.
    pub fn dir_of_fd(&self, fd: c_int) -> Option<PathBuf> {
        self.read_link(&paths::fd_link(fd))
    }
}

/// # Safety
///
/// `F` must be a function pointer type matching the C prototype of `name`.
unsafe fn next_symbol<F: Copy>(name: &'static CStr) -> Result<F, InitError> {
    // SAFETY: `name` is NUL-terminated; RTLD_NEXT is valid from a shared object.
    let ptr = unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr()) };
    if ptr.is_null() {
        return Err(InitError::SymbolUnresolved {
            symbol: symbol_name(name),
        });
    }
    debug_assert_eq!(size_of::<F>(), size_of::<*mut c_void>());
    // SAFETY: non-null code address of `name`, `F` matches its prototype.
    Ok(unsafe { std::mem::transmute_copy::<*mut c_void, F>(&ptr) })
}

fn symbol_name(name: &'static CStr) -> &'static str {
    name.to_str().unwrap_or("<non-utf8>")
}
