//! Dotted property paths.
//!
//! A path such as `a.b.0.c` is compiled into a list of segments that can be
//! walked against a [`ReactiveValue`]. Compilation only filters characters:
//! a path containing anything outside letters, digits, `.`, `$` and `_` is
//! rejected, but a path that passes is not otherwise validated.
//!
//! Walking reads each segment through the tracked getters, so resolving a
//! path inside a watcher subscribes the watcher to every step.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::Error;
use crate::reactive::ReactiveValue;

/// Whether `c` may appear in a path.
///
/// Letters are accepted from the Latin-1 and broad BMP identifier ranges;
/// characters outside the Basic Multilingual Plane are rejected.
pub fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '.' | '$' | '_')
        || matches!(
            c as u32,
            0x00B7
                | 0x00C0..=0x00D6
                | 0x00D8..=0x00F6
                | 0x00F8..=0x037D
                | 0x037F..=0x1FFF
                | 0x200C..=0x200D
                | 0x203F..=0x2040
                | 0x2070..=0x218F
                | 0x2C00..=0x2FEF
                | 0x3001..=0xD7FF
                | 0xF900..=0xFDCF
                | 0xFDF0..=0xFFFD
        )
}

/// Compile `path`, or `None` if it contains a rejected character.
pub fn compile(path: &str) -> Option<CompiledPath> {
    if !path.chars().all(is_path_char) {
        return None;
    }

    Some(CompiledPath {
        source: path.into(),
        segments: path.split('.').map(Box::from).collect(),
    })
}

/// A compiled path: an accessor over object graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    source: Box<str>,
    segments: SmallVec<[Box<str>; 4]>,
}

impl CompiledPath {
    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| &**s)
    }

    /// Walk the segments from `root`.
    ///
    /// Stops with `Undefined` as soon as an intermediate value is falsy
    /// (including `0`, `""` and `false`).
    pub fn resolve(&self, root: &ReactiveValue) -> ReactiveValue {
        let mut current = root.clone();
        for segment in &self.segments {
            if !current.is_truthy() {
                return ReactiveValue::Undefined;
            }
            current = current.property(segment);
        }
        current
    }
}

impl fmt::Display for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for CompiledPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s).ok_or_else(|| Error::unresolvable_path(s))
    }
}
