//! Argument contracts shared by the built-in tools

use scout_core::{Error, Result};
use serde_json::{json, Map, Value};

/// What to do with an integer argument outside its declared range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Pull the value to the nearest bound
    Clamp,
    /// Fail with `InvalidArguments`
    Reject,
}

/// Declared contract of one optional integer argument
#[derive(Debug, Clone, Copy)]
pub struct IntegerBounds {
    pub key: &'static str,
    pub description: &'static str,
    pub default: i64,
    pub min: i64,
    pub max: i64,
    pub policy: BoundsPolicy,
}

impl IntegerBounds {
    /// Value for `key`: the default when absent or null, otherwise the
    /// supplied integer after applying the bounds policy.
    pub fn resolve(&self, arguments: &Map<String, Value>) -> Result<i64> {
        let value = match arguments.get(self.key) {
            None | Some(Value::Null) => return Ok(self.default),
            Some(value) => value,
        };

        let n = match (value.as_i64(), value.as_u64()) {
            (Some(n), _) => n,
            (None, Some(_)) => i64::MAX,
            (None, None) => {
                return Err(Error::invalid_arguments(format!(
                    "{} must be an integer, got {}",
                    self.key, value
                )))
            }
        };

        if (self.min..=self.max).contains(&n) {
            return Ok(n);
        }

        match self.policy {
            BoundsPolicy::Clamp => Ok(n.clamp(self.min, self.max)),
            BoundsPolicy::Reject => Err(Error::invalid_arguments(format!(
                "{} must be between {} and {}, got {}",
                self.key, self.min, self.max, value
            ))),
        }
    }

    /// JSON schema property describing this argument
    pub fn schema_property(&self) -> Value {
        json!({
            "type": "integer",
            "description": self.description,
            "default": self.default,
            "minimum": self.min,
            "maximum": self.max
        })
    }
}

/// Required, non-blank string argument (trimmed)
pub fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match arguments.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) => Err(Error::invalid_arguments(format!("{} must not be empty", key))),
        Some(other) => Err(Error::invalid_arguments(format!(
            "{} must be a string, got {}",
            key, other
        ))),
        None => Err(Error::invalid_arguments(format!("missing required argument: {}", key))),
    }
}
