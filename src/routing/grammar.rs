//! Path grammars.
//!
//! A grammar is written as slash-separated segments, each either a literal
//! (`samples`) or a typed capture (`{id:uint}`), optionally followed by one
//! bracketed trailing sub-segment: `[/summary]` toggles a flag, while
//! `[/{other_id:digits}]` is an optional capture. Grammars compile to a regex
//! anchored at both ends.

use regex::Regex;
use std::collections::HashMap;

/// Type of a capture slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Decimal digits that must fit in a u64
    Uint,
    /// Decimal digits, kept as a string
    Digits,
    /// One or more hex characters
    Hex,
    /// Exactly 16 hex characters
    Hex16,
    /// Exactly 64 hex characters
    Sha256,
}

impl SlotKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "uint" => Some(SlotKind::Uint),
            "digits" => Some(SlotKind::Digits),
            "hex" => Some(SlotKind::Hex),
            "hex16" => Some(SlotKind::Hex16),
            "sha256" => Some(SlotKind::Sha256),
            _ => None,
        }
    }

    fn regex(&self) -> &'static str {
        match self {
            SlotKind::Uint | SlotKind::Digits => "[0-9]+",
            SlotKind::Hex => "[0-9a-fA-F]+",
            SlotKind::Hex16 => "[0-9a-fA-F]{16}",
            SlotKind::Sha256 => "[0-9a-fA-F]{64}",
        }
    }

    /// Checks a slot's regex can't express
    fn accepts(&self, value: &str) -> bool {
        match self {
            SlotKind::Uint => value.parse::<u64>().is_ok(),
            _ => true,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GrammarError {
    #[error("Empty pattern")]
    Empty,

    #[error("Invalid segment {segment:?} in pattern {pattern:?}")]
    InvalidSegment { pattern: String, segment: String },

    #[error("Unknown slot type {kind:?} in pattern {pattern:?}")]
    UnknownSlotKind { pattern: String, kind: String },

    #[error("Malformed optional suffix in pattern {0:?}")]
    MalformedOptional(String),

    #[error("Pattern {pattern:?} does not compile: {message}")]
    Regex { pattern: String, message: String },
}

enum Segment<'a> {
    Literal(&'a str),
    Capture { name: &'a str, kind: SlotKind },
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_segment<'a>(pattern: &str, raw: &'a str) -> Result<Segment<'a>, GrammarError> {
    let invalid = || GrammarError::InvalidSegment {
        pattern: pattern.to_string(),
        segment: raw.to_string(),
    };

    if let Some(inner) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        let (name, kind) = inner.split_once(':').ok_or_else(invalid)?;
        if !is_identifier(name) {
            return Err(invalid());
        }
        let kind = SlotKind::parse(kind).ok_or_else(|| GrammarError::UnknownSlotKind {
            pattern: pattern.to_string(),
            kind: kind.to_string(),
        })?;
        return Ok(Segment::Capture { name, kind });
    }

    if is_identifier(raw) {
        Ok(Segment::Literal(raw))
    } else {
        Err(invalid())
    }
}

/// Compiled path grammar
#[derive(Debug, Clone)]
pub struct Grammar {
    pattern: String,
    regex: Regex,
    slots: Vec<(String, SlotKind)>,
    flags: Vec<String>,
}

impl Grammar {
    pub fn parse(pattern: &str) -> Result<Self, GrammarError> {
        let (required, optional) = match pattern.find('[') {
            Some(idx) => {
                let inner = pattern[idx..]
                    .strip_prefix("[/")
                    .and_then(|r| r.strip_suffix(']'))
                    .filter(|inner| !inner.contains('/'))
                    .ok_or_else(|| GrammarError::MalformedOptional(pattern.to_string()))?;
                (&pattern[..idx], Some(inner))
            }
            None => (pattern, None),
        };

        if required.is_empty() {
            return Err(GrammarError::Empty);
        }

        let mut source = String::from("^");
        let mut slots = Vec::new();
        let mut flags = Vec::new();

        for (i, raw) in required.split('/').enumerate() {
            if i > 0 {
                source.push('/');
            }
            match parse_segment(pattern, raw)? {
                Segment::Literal(literal) => source.push_str(&regex::escape(literal)),
                Segment::Capture { name, kind } => {
                    source.push_str(&format!("(?P<{}>{})", name, kind.regex()));
                    slots.push((name.to_string(), kind));
                }
            }
        }

        if let Some(inner) = optional {
            match parse_segment(pattern, inner)? {
                Segment::Literal(literal) => {
                    source.push_str(&format!("(?P<{}>/{})?", literal, regex::escape(literal)));
                    flags.push(literal.to_string());
                }
                Segment::Capture { name, kind } => {
                    source.push_str(&format!("(?:/(?P<{}>{}))?", name, kind.regex()));
                    slots.push((name.to_string(), kind));
                }
            }
        }

        source.push('$');

        let regex = Regex::new(&source).map_err(|e| GrammarError::Regex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            slots,
            flags,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a whole path, returning its captures
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let mut values = HashMap::new();

        for (name, kind) in &self.slots {
            if let Some(m) = caps.name(name) {
                if !kind.accepts(m.as_str()) {
                    return None;
                }
                values.insert(name.clone(), m.as_str().to_string());
            }
        }

        for flag in &self.flags {
            if let Some(m) = caps.name(flag) {
                values.insert(flag.clone(), m.as_str().to_string());
            }
        }

        Some(Captures { values })
    }
}

/// Values captured from one matched path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captures {
    values: HashMap<String, String>,
}

impl Captures {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn owned(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        self.get(name)?.parse().ok()
    }

    pub fn hex(&self, name: &str) -> Option<u64> {
        u64::from_str_radix(self.get(name)?, 16).ok()
    }

    /// Whether an optional literal suffix was present
    pub fn flag(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_grammar() {
        let grammar = Grammar::parse("query/function").unwrap();
        assert!(grammar.captures("query/function").unwrap().is_empty());
        assert!(grammar.captures("query/functions").is_none());
        assert!(grammar.captures("xquery/function").is_none());
    }

    #[test]
    fn test_uint_capture() {
        let grammar = Grammar::parse("samples/{id:uint}").unwrap();
        let captures = grammar.captures("samples/42").unwrap();
        assert_eq!(captures.uint("id"), Some(42));

        assert!(grammar.captures("samples/4x2").is_none());
        assert!(grammar.captures("samples/").is_none());
        assert!(grammar.captures("samples//42").is_none());
        // Too large for u64
        assert!(grammar.captures("samples/99999999999999999999999").is_none());
    }

    #[test]
    fn test_digits_capture_keeps_large_values() {
        let grammar = Grammar::parse("matches/sample/{id:digits}").unwrap();
        let captures = grammar.captures("matches/sample/99999999999999999999999").unwrap();
        assert_eq!(captures.get("id"), Some("99999999999999999999999"));
    }

    #[test]
    fn test_fixed_length_hex() {
        let grammar = Grammar::parse("samples/sha256/{digest:sha256}").unwrap();
        let digest = "aB".repeat(32);
        assert!(grammar.captures(&format!("samples/sha256/{}", digest)).is_some());
        assert!(grammar.captures(&format!("samples/sha256/{}0", digest)).is_none());
        assert!(grammar.captures("samples/sha256/abcd").is_none());

        let grammar = Grammar::parse("query/pichash/{hash:hex16}").unwrap();
        let captures = grammar.captures("query/pichash/00000000000000ff").unwrap();
        assert_eq!(captures.hex("hash"), Some(255));
        assert!(grammar.captures("query/pichash/00000000000000fg").is_none());
    }

    #[test]
    fn test_optional_flag() {
        let grammar = Grammar::parse("jobs/{id:hex}[/result]").unwrap();

        let captures = grammar.captures("jobs/deadbeef").unwrap();
        assert_eq!(captures.get("id"), Some("deadbeef"));
        assert!(!captures.flag("result"));

        let captures = grammar.captures("jobs/deadbeef/result").unwrap();
        assert!(captures.flag("result"));

        assert!(grammar.captures("jobs/deadbeef/results").is_none());
    }

    #[test]
    fn test_optional_capture() {
        let grammar = Grammar::parse("matches/function/{id:digits}[/{other_id:digits}]").unwrap();

        let captures = grammar.captures("matches/function/1").unwrap();
        assert_eq!(captures.get("other_id"), None);

        let captures = grammar.captures("matches/function/1/2").unwrap();
        assert_eq!(captures.get("id"), Some("1"));
        assert_eq!(captures.get("other_id"), Some("2"));

        assert!(grammar.captures("matches/function/1/2/3").is_none());
    }

    #[test]
    fn test_malformed_patterns_are_rejected() {
        assert_eq!(Grammar::parse("").unwrap_err(), GrammarError::Empty);
        assert!(matches!(
            Grammar::parse("samples//x"),
            Err(GrammarError::InvalidSegment { .. })
        ));
        assert!(matches!(
            Grammar::parse("samples/{id:float}"),
            Err(GrammarError::UnknownSlotKind { .. })
        ));
        assert!(matches!(
            Grammar::parse("samples/{id}"),
            Err(GrammarError::InvalidSegment { .. })
        ));
        assert!(matches!(
            Grammar::parse("jobs/{id:hex}[result]"),
            Err(GrammarError::MalformedOptional(_))
        ));
        assert!(matches!(
            Grammar::parse("jobs/{id:hex}[/a/b]"),
            Err(GrammarError::MalformedOptional(_))
        ));
        assert!(matches!(
            Grammar::parse("a/{id:uint}/{id:uint}"),
            Err(GrammarError::Regex { .. })
        ));
    }
}
