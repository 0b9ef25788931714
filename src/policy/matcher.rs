//! Glob matching of a single ignore rule against a candidate path.
//!
//! A rule is a flat glob. There is no negation (`!`), no anchoring (`/` at
//! the start) and no directory-only suffix: a trailing `/` is just part of
//! the pattern text. A rule matches when any one of three tests succeeds:
//!
//! 1. **Path match**: the path relative to the rule's directory matches the
//!    pattern, with wildcards stopping at `/`.
//! 2. **Basename match**: the last component of the relative path matches
//!    the pattern, so `*.log` hits `x.log` at any depth.
//! 3. **Any-depth match**: the relative path matches `**/<pattern>`, so a
//!    rule such as `build/out` also hits `crates/a/build/out`.

use globset::GlobBuilder;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Check whether `candidate` is matched by `pattern` declared in `base_dir`.
///
/// `candidate` is made relative to `base_dir` by stripping it as a textual
/// prefix, together with any separators that follow. A candidate outside
/// `base_dir` is matched unmodified. Paths are compared as raw bytes.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ldignore::policy::matches;
///
/// let base = Path::new("/repo");
/// assert!(matches(Path::new("/repo/logs/app.log"), "*.log", base));
/// assert!(matches(Path::new("/repo/a/b/.env"), ".env", base));
/// assert!(!matches(Path::new("/repo/src/main.rs"), "*.log", base));
/// ```
pub fn matches(candidate: &Path, pattern: &str, base_dir: &Path) -> bool {
    let relative = relative_to(
        candidate.as_os_str().as_bytes(),
        base_dir.as_os_str().as_bytes(),
    );
    let glob = translate(pattern);

    if glob_match(&glob, pattern, relative, true) {
        return true;
    }

    if glob_match(&glob, pattern, basename(relative), false) {
        return true;
    }

    glob_match(&format!("**/{glob}"), pattern, relative, true)
}

fn relative_to<'a>(candidate: &'a [u8], base_dir: &[u8]) -> &'a [u8] {
    match candidate.strip_prefix(base_dir) {
        Some(rest) => {
            let skip = rest.iter().take_while(|&&b| b == b'/').count();
            &rest[skip..]
        }
        None => candidate,
    }
}

/// Final component of `path`, ignoring trailing separators (`basename(3)`).
fn basename(path: &[u8]) -> &[u8] {
    let keep = path.len() - path.iter().rev().take_while(|&&b| b == b'/').count();
    let trimmed = &path[..keep];
    if trimmed.is_empty() {
        return if path.is_empty() { b"" } else { b"/" };
    }
    match trimmed.iter().rposition(|&b| b == b'/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Rewrite an `fnmatch(3)` pattern as a `globset` glob with the same meaning.
///
/// A run of `*` is a single wildcard, so user patterns never gain
/// recursive `**` semantics. An unterminated `[` and the brace characters
/// are literal.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '*' => {
                while chars.next_if(|&(_, next)| next == '*').is_some() {}
                out.push('*');
            }
            '\\' => match chars.next() {
                Some((_, escaped)) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => out.push_str("\\\\"),
            },
            '[' => match class_len(&pattern[idx..]) {
                Some(len) => {
                    out.push_str(&pattern[idx..idx + len]);
                    while chars.next_if(|&(i, _)| i < idx + len).is_some() {}
                }
                None => out.push_str("[[]"),
            },
            '{' | '}' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Byte length of the bracket expression opening `s`, if it is closed.
fn class_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    if matches!(bytes.get(i), Some(b'!' | b'^')) {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    bytes[i..]
        .iter()
        .position(|&b| b == b']')
        .map(|end| i + end + 1)
}

fn glob_match(glob: &str, literal: &str, text: &[u8], literal_separator: bool) -> bool {
    match GlobBuilder::new(glob)
        .literal_separator(literal_separator)
        .backslash_escape(true)
        .build()
    {
        Ok(compiled) => compiled.compile_matcher().is_match(OsStr::from_bytes(text)),
        // Whatever globset rejects is compared as plain text.
        Err(_) => literal.as_bytes() == text,
    }
}
