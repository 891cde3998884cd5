//! Compact callback-data encoding
//!
//! Interactive front ends round-trip a short (tag, exchange, parameter)
//! triple through UI callback payloads with tight size limits, so the keys
//! are single letters. Pure and stateless; nothing in the core depends on it.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackData {
    #[serde(rename = "c")]
    pub tag: String,
    #[serde(rename = "e", default)]
    pub exchange: String,
    #[serde(rename = "p", default)]
    pub parameter: String,
}

impl CallbackData {
    pub fn new(
        tag: impl Into<String>,
        exchange: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            exchange: exchange.into(),
            parameter: parameter.into(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
