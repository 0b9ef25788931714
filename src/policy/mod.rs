//! Hierarchical ignore policy.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  walker.rs   IgnorePolicy: parent dir → … → `/`               │
//! │              per directory: .claudeignore, then .copilotignore│
//! ├──────────────────────────────┬───────────────────────────────┤
//! │  loader.rs                   │  matcher.rs                   │
//! │  one pattern per line,       │  path glob, basename glob,    │
//! │  `#` comments, blank skipped │  `**/` any-depth glob         │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! Decisions are pure functions of the filesystem at call time. Every
//! failure on the way (missing file, unreadable file, unusable path)
//! results in "not ignored".

mod loader;
mod matcher;
mod walker;

pub use self::loader::{MAX_PATTERNS, MAX_PATTERN_LEN, load_patterns, parse_patterns};
pub use self::matcher::matches;
pub use self::walker::{
    IGNORE_FILE_NAMES, IgnoreFile, IgnoreMatch, IgnorePolicy, IgnoreRule, should_ignore,
};
