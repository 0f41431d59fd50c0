//! Data selections: glob patterns over source identifiers combined with time
//! windows and an optional publication version.
//!
//! The glob supports `*`, `?`, character classes `[set]` with ranges and the
//! negations `[!set]`/`[^set]`, and `\`-escapes. There is no regex engine; the
//! matcher is a small backtracking loop over bytes.
use crate::errors::*;
use crate::time::{format_nstime, NsTime, NST_UNSET};

/// One time window. `NST_UNSET` on either side leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectTime {
    pub start: NsTime,
    pub end: NsTime,
}

impl SelectTime {
    pub fn new(start: NsTime, end: NsTime) -> Self {
        SelectTime { start, end }
    }

    /// An everything-matching window, open on both sides.
    pub fn open() -> Self {
        SelectTime {
            start: NST_UNSET,
            end: NST_UNSET,
        }
    }

    /// Does `[start, end]` intersect this window?
    pub fn intersects(&self, start: NsTime, end: NsTime) -> bool {
        (self.start == NST_UNSET || end >= self.start)
            && (self.end == NST_UNSET || start <= self.end)
    }
}

/// One selection entry: a source identifier pattern, any number of time
/// windows and a publication version (0 matches every version).
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub sid_pattern: String,
    pub time_windows: Vec<SelectTime>,
    pub pub_version: u8,
}

impl Selection {
    pub fn new(sid_pattern: &str, time_windows: Vec<SelectTime>, pub_version: u8) -> Self {
        Selection {
            sid_pattern: sid_pattern.to_string(),
            time_windows,
            pub_version,
        }
    }

    /// Does a record with the given identity and time span match this entry?
    ///
    /// An empty window list means no time constraint at all.
    pub fn matches(&self, sid: &str, start: NsTime, end: NsTime, pub_version: u8) -> bool {
        if !glob_match(&self.sid_pattern, sid) {
            return false;
        }
        if self.pub_version > 0 && self.pub_version != pub_version {
            return false;
        }
        self.time_windows.is_empty() || self.time_windows.iter().any(|w| w.intersects(start, end))
    }
}

/// An ordered list of selection entries. A record matches the list if it
/// matches any entry; an empty list matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selections {
    entries: Vec<Selection>,
}

impl Selections {
    pub fn new() -> Self {
        Selections::default()
    }

    pub fn push(&mut self, selection: Selection) {
        self.entries.push(selection);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<Selection> {
        self.entries.iter()
    }

    /// Does any entry match the given record identity and time span?
    pub fn matches(&self, sid: &str, start: NsTime, end: NsTime, pub_version: u8) -> bool {
        self.entries
            .iter()
            .any(|s| s.matches(sid, start, end, pub_version))
    }

    /// A listing of the entries, one per line, for logs and diagnostics.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.sid_pattern);
            if entry.pub_version > 0 {
                out.push_str(&format!(" (version {})", entry.pub_version));
            }
            for window in &entry.time_windows {
                out.push_str(&format!(
                    "\n  {} - {}",
                    format_nstime(window.start),
                    format_nstime(window.end)
                ));
            }
            out.push('\n');
        }
        out
    }
}

/// Match `text` against a glob `pattern`.
///
/// `*` matches any run of characters including the empty one, `?` exactly one
/// character, `[abc]`/`[a-z]` a class, `[!...]` or `[^...]` a negated class,
/// and `\x` the character `x` literally.
/// ```
/// use giga_mseed_core::selection::glob_match;
///
/// assert!(glob_match("FDSN:IU_*", "FDSN:IU_ANMO_00_B_H_Z"));
/// assert!(glob_match("FDSN:IU_A?MO_00_B_H_Z", "FDSN:IU_ANMO_00_B_H_Z"));
/// assert!(!glob_match("FDSN:IU_[!A]*", "FDSN:IU_ANMO_00_B_H_Z"));
/// assert!(glob_match("a\\*c", "a*c"));
/// ```
pub fn glob_match(pattern: &str, text: &str) -> bool {
    glob_inner(pattern.as_bytes(), text.as_bytes())
}

fn glob_inner(pattern: &[u8], text: &[u8]) -> bool {
    let mut p = 0;
    let mut t = 0;
    // Backtracking state for the most recent `*`.
    let mut star_p = usize::MAX;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    star_p = p;
                    star_t = t;
                    p += 1;
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                b'\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                b'[' => {
                    if let Some((matched, after)) = match_class(&pattern[p..], text[t]) {
                        if matched {
                            p += after;
                            t += 1;
                            continue;
                        }
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }
        // Mismatch: widen the last `*` by one character, or fail.
        if star_p != usize::MAX {
            p = star_p + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }
    // Input consumed; only trailing stars may remain.
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

/// Match one character against the class starting at `class[0] == b'['`.
/// Returns whether it matched and how many pattern bytes the class spans.
/// A class with no terminating `]` matches nothing.
fn match_class(class: &[u8], ch: u8) -> Option<(bool, usize)> {
    let mut i = 1;
    let negated = match class.get(i) {
        Some(b'!') | Some(b'^') => {
            i += 1;
            true
        }
        _ => false,
    };
    let mut matched = false;
    let mut first = true;
    loop {
        let c = *class.get(i)?;
        if c == b']' && !first {
            i += 1;
            break;
        }
        first = false;
        let c = if c == b'\\' {
            i += 1;
            *class.get(i)?
        } else {
            c
        };
        // A range like `a-z`, unless the `-` is the last member.
        if class.get(i + 1) == Some(&b'-') && class.get(i + 2).map_or(false, |&e| e != b']') {
            let mut end = *class.get(i + 2)?;
            let mut span = 3;
            if end == b'\\' {
                end = *class.get(i + 3)?;
                span = 4;
            }
            if (c..=end).contains(&ch) {
                matched = true;
            }
            i += span;
        } else {
            if c == ch {
                matched = true;
            }
            i += 1;
        }
    }
    Some((matched != negated, i))
}
