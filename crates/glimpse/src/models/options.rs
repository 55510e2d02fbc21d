use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tool::ToolMetadata;

/// Tool metadata advertised to the model, or a list of tool names restricting which
/// registered tools are advertised.
pub const TOOLS: &str = "tools";
pub const TEMPERATURE: &str = "temperature";
pub const MAX_TOKENS: &str = "max_tokens";
/// Provider extension understood by search-augmented models.
pub const DISABLE_SEARCH: &str = "disable_search";

/// Invocation options. A few keys are recognised by the components in this crate; every
/// other key is carried through untouched so provider specific extensions keep working.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// Tool metadata previously written under [`TOOLS`], if the entry holds metadata objects
    pub fn tools(&self) -> Option<Vec<ToolMetadata>> {
        self.0
            .get(TOOLS)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Tool names supplied by a caller under [`TOOLS`] to restrict advertisement
    pub fn tool_names(&self) -> Option<Vec<String>> {
        let entries = self.0.get(TOOLS)?.as_array()?;
        entries
            .iter()
            .map(|entry| entry.as_str().map(str::to_string))
            .collect()
    }

    pub fn set_tools(&mut self, tools: &[ToolMetadata]) {
        let value = serde_json::to_value(tools).unwrap_or(Value::Array(Vec::new()));
        self.0.insert(TOOLS.to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
