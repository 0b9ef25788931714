//! Ignore file parsing.
//!
//! One pattern per line. Blank lines and lines starting with `#` are
//! skipped; every other line is kept verbatim (no trimming). Lines that are
//! not valid UTF-8 are skipped. A file that is missing or unreadable
//! contributes no patterns.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Longest pattern kept from a single line, in bytes. Longer lines are cut.
pub const MAX_PATTERN_LEN: usize = 4095;

/// Patterns read from a single ignore file before the rest is ignored.
pub const MAX_PATTERNS: usize = 1024;

const COMMENT_MARKER: u8 = b'#';

/// Load the patterns declared in the ignore file at `path`, in file order.
///
/// Never fails: an unreadable file yields an empty list.
pub fn load_patterns(path: &Path) -> Vec<String> {
    match open_patterns(path) {
        Ok(patterns) => patterns,
        Err(e) => {
            debug!("Ignore file skipped: {:#}", e);
            Vec::new()
        }
    }
}

fn open_patterns(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open ignore file {}", path.display()))?;
    Ok(parse_patterns(BufReader::new(file)))
}

/// Parse ignore file content from `reader`.
///
/// A read error part way through keeps the patterns collected so far.
pub fn parse_patterns<R: BufRead>(mut reader: R) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut line = Vec::new();

    while patterns.len() < MAX_PATTERNS {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Stopped reading ignore file: {}", e);
                break;
            }
        }

        strip_line_terminator(&mut line);
        if line.first().is_none_or(|&b| b == COMMENT_MARKER) {
            continue;
        }

        match decode(&line) {
            Some(pattern) => patterns.push(pattern),
            None => debug!("Skipping ignore pattern that is not valid UTF-8"),
        }
    }

    patterns
}

fn strip_line_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

/// Decode a line, cut to [`MAX_PATTERN_LEN`] bytes.
///
/// A character split by the cut is dropped; any other invalid byte
/// rejects the whole line.
fn decode(line: &[u8]) -> Option<String> {
    let cut = &line[..line.len().min(MAX_PATTERN_LEN)];
    match std::str::from_utf8(cut) {
        Ok(text) => Some(text.to_owned()),
        Err(e) if e.error_len().is_none() && line.len() > MAX_PATTERN_LEN => {
            std::str::from_utf8(&cut[..e.valid_up_to()])
                .ok()
                .map(str::to_owned)
        }
        Err(_) => None,
    }
}
