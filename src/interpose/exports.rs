//! The interposed symbols and the load/unload hooks.
//!
//! `open` and `openat` are variadic in C. Rust cannot define a variadic
//! function, so the creation mode is declared as a fixed trailing
//! parameter: on the supported ABIs a variadic integer travels in the same
//! register as a fixed one. The value is only forwarded when the flags say
//! the caller supplied it.

use libc::{c_char, c_int, mode_t, size_t, ssize_t};

use super::lifecycle::{self, Route};
use super::state::fail;

#[unsafe(no_mangle)]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    match lifecycle::route() {
        Route::Gate(state) => unsafe { state.open(path, flags, mode) },
        Route::PassThrough(real) => unsafe { real.open(path, flags, mode) },
        Route::Fail(e) => fail(&e),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn openat(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    match lifecycle::route() {
        Route::Gate(state) => unsafe { state.openat(dirfd, path, flags, mode) },
        Route::PassThrough(real) => unsafe { real.openat(dirfd, path, flags, mode) },
        Route::Fail(e) => fail(&e),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn readlink(path: *const c_char, buf: *mut c_char, len: size_t) -> ssize_t {
    match lifecycle::route() {
        Route::Gate(state) => unsafe { state.readlink(path, buf, len) },
        Route::PassThrough(real) => unsafe { real.readlink(path, buf, len) },
        Route::Fail(e) => fail(&e) as ssize_t,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn readlinkat(
    dirfd: c_int,
    path: *const c_char,
    buf: *mut c_char,
    len: size_t,
) -> ssize_t {
    match lifecycle::route() {
        Route::Gate(state) => unsafe { state.readlinkat(dirfd, path, buf, len) },
        Route::PassThrough(real) => unsafe { real.readlinkat(dirfd, path, buf, len) },
        Route::Fail(e) => fail(&e) as ssize_t,
    }
}

#[used]
#[unsafe(link_section = ".init_array")]
static ON_LOAD: extern "C" fn() = on_load;

#[used]
#[unsafe(link_section = ".fini_array")]
static ON_UNLOAD: extern "C" fn() = on_unload;

extern "C" fn on_load() {
    let _ = lifecycle::initialize();
}

extern "C" fn on_unload() {
    lifecycle::teardown();
}
