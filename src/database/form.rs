use std::collections::HashMap;

use serde_json::Value;

use super::error::TypeError;

pub type FormData = HashMap<String, Value>;

/// Raw JSON request body with typed accessors.
///
/// Keeps track of which keys were sent, so partial updates can tell an
/// omitted field apart from an empty one.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Integer value; numeric strings such as `"15"` are accepted too
    pub fn get_number(&self, key: &str) -> Result<i64, TypeError> {
        match self.inner.get(key) {
            Some(value) => value_as_integer(value),
            None => Err(TypeError::new("This field is required.")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Not a valid string.")),
            },
            None => Err(TypeError::new("This field is required.")),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<&Vec<Value>, TypeError> {
        match self.inner.get(key) {
            Some(value) => value
                .as_array()
                .ok_or_else(|| TypeError::new("Expected a list of items.")),
            None => Err(TypeError::new("This field is required.")),
        }
    }
}

pub fn value_as_integer(value: &Value) -> Result<i64, TypeError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| TypeError::new("A valid integer is required.")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_e| TypeError::new("A valid integer is required.")),
        _ => Err(TypeError::new("A valid integer is required.")),
    }
}
