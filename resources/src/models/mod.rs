use serde::{Deserialize, Serialize};

/// Body of `POST /system/scale-function/<name>`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleServiceRequest {
    pub service_name: String,
    pub replicas: u64,
}

impl ScaleServiceRequest {
    pub fn new(service_name: &str, replicas: u64) -> Self {
        Self {
            service_name: service_name.to_owned(),
            replicas,
        }
    }
}
