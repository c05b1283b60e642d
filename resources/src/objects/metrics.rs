use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::Labels;

/// Response of an instant query against `/api/v1/query`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct VectorQueryResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: VectorData,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VectorData {
    #[serde(default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<VectorResult>,
}

/// One labeled sample, `value` is `[timestamp, "<number>"]`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct VectorResult {
    #[serde(default)]
    pub metric: Labels,
    #[serde(default)]
    pub value: Vec<JsonValue>,
}

impl VectorResult {
    pub fn new(metric: Labels, timestamp: f64, value: &str) -> Self {
        Self {
            metric,
            value: vec![JsonValue::from(timestamp), JsonValue::from(value)],
        }
    }

    /// The sample value as sent by the server, if well formed.
    pub fn sample(&self) -> Option<&str> {
        match self.value.as_slice() {
            [_, value, ..] => value.as_str(),
            _ => None,
        }
    }

    /// A sample is active unless it is exactly `"0"` or `"0.0"`.
    /// Malformed samples are ignored.
    pub fn is_active(&self) -> bool {
        self.sample()
            .map_or(false, |value| value != "0" && value != "0.0")
    }
}

impl VectorQueryResponse {
    pub fn results(&self) -> &[VectorResult] {
        &self.data.result
    }

    /// Idle when the vector is empty or none of its samples is active.
    pub fn is_idle(&self) -> bool {
        !self.results().iter().any(VectorResult::is_active)
    }
}
