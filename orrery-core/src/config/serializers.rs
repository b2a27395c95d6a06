//! Named-type converters applied to typed config fields.
//!
//! A converter translates between the human-facing form stored in the file and
//! the form the config struct deserializes from. Registries compose in order:
//! a later registration for the same type name shadows earlier ones.

use serde_yaml::Value;
use std::fmt;
use std::sync::Arc;

use crate::logging::parse_level;

/// Converter type name for human durations stored as integer milliseconds.
pub const DURATION: &str = "duration";
/// Converter type name for log level names.
pub const LEVEL: &str = "level";

pub trait Converter: Send + Sync {
    /// File form to deserializable form.
    fn decode(&self, node: &Value) -> Result<Value, String>;

    /// Serialized form to file form.
    fn encode(&self, value: &Value) -> Result<Value, String>;
}

#[derive(Clone, Default)]
pub struct SerializerRegistry {
    entries: Vec<(String, Arc<dyn Converter>)>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base converters every config loader starts from.
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DURATION, DurationConverter);
        registry.register(LEVEL, LevelConverter);
        registry
    }

    pub fn register(&mut self, type_name: impl Into<String>, converter: impl Converter + 'static) {
        self.entries.push((type_name.into(), Arc::new(converter)));
    }

    /// Append every entry of `other`, keeping its order.
    pub fn register_all(&mut self, other: &SerializerRegistry) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// `base` followed by `overlay`; overlay entries shadow base entries.
    pub fn compose(base: &SerializerRegistry, overlay: &SerializerRegistry) -> Self {
        let mut composed = base.clone();
        composed.register_all(overlay);
        composed
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn Converter>> {
        self.entries
            .iter()
            .rev()
            .find(|(name, _)| name == type_name)
            .map(|(_, converter)| converter.clone())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

/// `"1h 30m"`, `"45s"`, `"250ms"` in the file; integer milliseconds in the struct.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationConverter;

impl Converter for DurationConverter {
    fn decode(&self, node: &Value) -> Result<Value, String> {
        match node {
            Value::Number(n) if n.as_u64().is_some() => Ok(node.clone()),
            Value::String(s) => parse_duration_ms(s).map(Value::from),
            other => Err(format!("expected a duration, found {}", describe(other))),
        }
    }

    fn encode(&self, value: &Value) -> Result<Value, String> {
        match value.as_u64() {
            Some(ms) => Ok(Value::from(format_duration_ms(ms))),
            None => Err(format!(
                "expected integer milliseconds, found {}",
                describe(value)
            )),
        }
    }
}

/// Case-insensitive level names, stored lowercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelConverter;

impl Converter for LevelConverter {
    fn decode(&self, node: &Value) -> Result<Value, String> {
        let raw = node
            .as_str()
            .ok_or_else(|| format!("expected a level name, found {}", describe(node)))?;
        parse_level(raw)
            .map(Value::from)
            .ok_or_else(|| format!("unknown level '{raw}'"))
    }

    fn encode(&self, value: &Value) -> Result<Value, String> {
        self.decode(value)
    }
}

/// Parse a human duration into milliseconds.
///
/// Units: `ms`, `s`, `m`, `h`, `d`. Components may be separated by spaces;
/// a bare number means seconds.
pub fn parse_duration_ms(input: &str) -> Result<u64, String> {
    let text = input.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u64 = 0;
    let mut chars = text.chars().peekable();
    while chars.peek().is_some() {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut digits = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(c);
            chars.next();
        }
        let mut unit = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_alphabetic) {
            unit.push(c);
            chars.next();
        }

        if digits.is_empty() {
            return Err(format!("invalid duration '{text}'"));
        }
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("duration component too large in '{text}'"))?;
        let scale = match unit.as_str() {
            "ms" => 1,
            "s" | "" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            other => return Err(format!("unknown duration unit '{other}' in '{text}'")),
        };
        total = amount
            .checked_mul(scale)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| format!("duration '{text}' overflows"))?;

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
    }

    Ok(total)
}

/// Inverse of [`parse_duration_ms`], largest units first.
pub fn format_duration_ms(ms: u64) -> String {
    if ms == 0 {
        return "0s".to_string();
    }

    const UNITS: [(u64, &str); 5] = [
        (86_400_000, "d"),
        (3_600_000, "h"),
        (60_000, "m"),
        (1_000, "s"),
        (1, "ms"),
    ];

    let mut rest = ms;
    let mut parts = Vec::new();
    for (scale, suffix) in UNITS {
        if rest >= scale {
            parts.push(format!("{}{}", rest / scale, suffix));
            rest %= scale;
        }
    }
    parts.join(" ")
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests;
