//! Editable inputs of a step, as described to the configuration form.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Widget kind of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Email,
}

/// Schema entry for one editable input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputSchema {
    #[must_use]
    pub fn new(key: &str, label: &str, input_type: InputType, required: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            input_type,
            required,
            default: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Current input values keyed by schema key.
pub type Inputs = BTreeMap<String, JsonValue>;
