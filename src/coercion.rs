use serde::Serialize;
use std::collections::HashMap;

/// A coerced query value together with whether the fallback was used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coerced<T> {
    pub value: T,
    pub defaulted: bool,
}

impl<T> Coerced<T> {
    fn parsed(value: T) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Boolean parsed from a query string, or the raw string when it is neither
/// a recognised true nor false spelling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StringifiedBool {
    Bool(bool),
    Raw(String),
}

impl StringifiedBool {
    /// Render for a backend query string
    pub fn as_query_value(&self) -> String {
        match self {
            StringifiedBool::Bool(b) => b.to_string(),
            StringifiedBool::Raw(s) => s.clone(),
        }
    }
}

impl Default for StringifiedBool {
    fn default() -> Self {
        StringifiedBool::Bool(false)
    }
}

impl From<bool> for StringifiedBool {
    fn from(value: bool) -> Self {
        StringifiedBool::Bool(value)
    }
}

/// Parse an unsigned integer, falling back to `default` when missing or malformed
pub fn uint_or(raw: Option<&str>, default: u64) -> Coerced<u64> {
    match raw.and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(value) => Coerced::parsed(value),
        None => Coerced::fallback(default),
    }
}

/// Parse an unsigned integer, yielding `None` rather than zero when it can't be read
pub fn numeric_or_absent(raw: Option<&str>) -> Coerced<Option<u64>> {
    match raw.and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(value) => Coerced::parsed(Some(value)),
        None => Coerced::fallback(None),
    }
}

/// Case-insensitive tri-state boolean: "true"/"1" and "false"/"0" are
/// recognised, anything else is passed through untouched
pub fn stringified_bool(raw: &str) -> Coerced<StringifiedBool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" => Coerced::parsed(StringifiedBool::Bool(true)),
        "false" | "0" => Coerced::parsed(StringifiedBool::Bool(false)),
        _ => Coerced::fallback(StringifiedBool::Raw(raw.to_string())),
    }
}

/// Stringified boolean with a default for a missing key
pub fn stringified_bool_or(raw: Option<&str>, default: bool) -> Coerced<StringifiedBool> {
    match raw {
        Some(s) => stringified_bool(s),
        None => Coerced::fallback(StringifiedBool::Bool(default)),
    }
}

/// Opt-in flag: only "1" and "true" (any case) switch it on
pub fn flag(raw: Option<&str>) -> Coerced<bool> {
    match raw {
        Some(s) => {
            let lowered = s.to_lowercase();
            Coerced::parsed(lowered == "1" || lowered == "true")
        }
        None => Coerced::fallback(false),
    }
}

/// Convenience accessors over a request's query map
pub trait QueryExt {
    fn raw(&self, key: &str) -> Option<&str>;

    fn uint_or(&self, key: &str, default: u64) -> Coerced<u64> {
        uint_or(self.raw(key), default)
    }

    fn numeric_or_absent(&self, key: &str) -> Coerced<Option<u64>> {
        numeric_or_absent(self.raw(key))
    }

    fn flag(&self, key: &str) -> Coerced<bool> {
        flag(self.raw(key))
    }

    fn stringified_bool_or(&self, key: &str, default: bool) -> Coerced<StringifiedBool> {
        stringified_bool_or(self.raw(key), default)
    }

    fn string(&self, key: &str) -> Option<String> {
        self.raw(key).map(str::to_string)
    }
}

impl QueryExt for HashMap<String, String> {
    fn raw(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}
