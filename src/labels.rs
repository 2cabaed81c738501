//! DNS label sanitization.
//!
//! Mesos hands us framework names, task names and agent ids that were never
//! meant to be DNS labels. Two profiles turn them into legal labels:
//!
//! - [`LabelSpec::Rfc952`]: legacy strict mode, at most 24 characters.
//!   Disallowed characters are deleted, which can join adjacent fragments.
//! - [`LabelSpec::Rfc1123`]: at most 63 characters. A small scanning automaton
//!   collapses separator runs into a single hyphen.

use serde::{Deserialize, Serialize};

/// Default domain fragment separator.
pub const SEP: &str = ".";

/// Maximum label length under RFC 952.
pub const RFC952_MAX_LEN: usize = 24;

/// Maximum label length under RFC 1123.
pub const RFC1123_MAX_LEN: usize = 63;

const RFC952_LEFT_CUTSET: &[u8] = b"-0123456789";
const RFC952_RIGHT_CUTSET: &[u8] = b"-";

/// Label sanitizer profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSpec {
    /// Strict legacy profile.
    Rfc952,
    /// Permissive profile.
    #[default]
    Rfc1123,
}

impl LabelSpec {
    /// Select the profile from the `enforce_rfc952` configuration switch.
    pub fn from_enforce_rfc952(enforce: bool) -> Self {
        if enforce {
            Self::Rfc952
        } else {
            Self::Rfc1123
        }
    }

    /// Maximum label length of this profile.
    pub fn max_len(self) -> usize {
        match self {
            Self::Rfc952 => RFC952_MAX_LEN,
            Self::Rfc1123 => RFC1123_MAX_LEN,
        }
    }

    /// Sanitize `name` into a single label using the profile's own limit.
    pub fn label(self, name: &str) -> String {
        sanitize(name, self.max_len(), self)
    }
}

/// Sanitize `text` into a legal label of at most `max_len` characters.
///
/// Returns an empty string when nothing legal survives.
pub fn sanitize(text: &str, max_len: usize, spec: LabelSpec) -> String {
    let bytes = match spec {
        LabelSpec::Rfc952 => trim_cut(
            &map_strict(text),
            max_len,
            RFC952_LEFT_CUTSET,
            RFC952_RIGHT_CUTSET,
        ),
        LabelSpec::Rfc1123 => scan(text.as_bytes(), max_len),
    };
    // Only ASCII lowercase letters, digits and hyphens can be produced.
    bytes.into_iter().map(char::from).collect()
}

/// Split `name` on `sep`, sanitize every part and rejoin the non-empty ones.
pub fn domain_frag(name: &str, sep: &str, spec: LabelSpec) -> String {
    name.split(sep)
        .map(|part| spec.label(part))
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Strict character mapping: letters lowercase, digits stay, `-._` become
/// hyphens, everything else is deleted.
fn map_strict(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c {
            'A'..='Z' => Some(c.to_ascii_lowercase() as u8),
            'a'..='z' | '0'..='9' => Some(c as u8),
            '-' | '.' | '_' => Some(b'-'),
            _ => None,
        })
        .collect()
}

fn trim_left<'a>(bytes: &'a [u8], cutset: &[u8]) -> &'a [u8] {
    let start = bytes
        .iter()
        .position(|b| !cutset.contains(b))
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn trim_right<'a>(bytes: &'a [u8], cutset: &[u8]) -> &'a [u8] {
    let end = bytes
        .iter()
        .rposition(|b| !cutset.contains(b))
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Cut `label` at `max_len` after trimming the left cutset. When the cut
/// lands inside a run of right-cutset characters, the head is backfilled from
/// the remainder so the label keeps as many characters as allowed.
fn trim_cut(label: &[u8], max_len: usize, left: &[u8], right: &[u8]) -> Vec<u8> {
    let trimmed = trim_left(label, left);
    let size = trimmed.len().min(max_len);
    let mut head = trim_right(&trimmed[..size], right).to_vec();
    if head.len() == size {
        return head;
    }

    let tail = trim_left(&trimmed[size..], right);
    let take = tail.len().min(size - head.len());
    head.extend_from_slice(&tail[..take]);

    let end = trim_right(&head, right).len();
    head.truncate(end);
    head
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Start,
    Middle,
    End,
}

fn is_allowed(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

fn is_separator(b: u8) -> bool {
    matches!(b, b'-' | b'_' | b'.')
}

/// RFC 1123 scanning automaton.
///
/// `Start` skips to the first letter or digit, `Middle` copies letters and
/// digits and collapses separator runs into one hyphen, `End` stops copying
/// once the label is full.
fn scan(name: &[u8], max_len: usize) -> Vec<u8> {
    let input = name.to_ascii_lowercase();
    let mut accum: Vec<u8> = Vec::with_capacity(input.len().min(max_len));
    let mut state = ScanState::Start;
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        match state {
            ScanState::Start => {
                if is_allowed(c) {
                    state = ScanState::Middle;
                    continue;
                }
            }
            ScanState::Middle => {
                if accum.len() >= max_len {
                    let end = trim_right(&accum, b"-").len();
                    accum.truncate(end);
                    state = ScanState::End;
                    continue;
                }
                if is_separator(c) {
                    if accum.last() != Some(&b'-') {
                        accum.push(b'-');
                    }
                    i += 1;
                    continue;
                }
            }
            ScanState::End => {
                if accum.len() >= max_len {
                    break;
                }
            }
        }
        if is_allowed(c) {
            accum.push(c);
        }
        i += 1;
    }

    let end = trim_right(&accum, b"-").len();
    accum.truncate(end);
    accum
}

/// Shorthand for the strict profile.
pub fn rfc952(name: &str) -> String {
    LabelSpec::Rfc952.label(name)
}

/// Shorthand for the permissive profile.
pub fn rfc1123(name: &str) -> String {
    LabelSpec::Rfc1123.label(name)
}
