//! Virtual tag configurations: `/v2/virtual_tag_configs`

use super::common::VantageResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VirtualTagConfig {
    pub token: String,
    pub key: String,
    #[serde(default)]
    pub overridable: bool,
    pub backfill_until: Option<String>,
    pub created_by_token: Option<String>,
    #[serde(default)]
    pub values: Vec<VirtualTagValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualTagValue {
    pub filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_metric_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_metric: Option<CostMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentages: Option<Vec<Percentage>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostMetric {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentage {
    pub value: String,
    pub pct: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct VirtualTagConfigRequest {
    pub key: String,
    pub overridable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backfill_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<VirtualTagValue>>,
}

impl VantageResource for VirtualTagConfig {
    type CreateRequest = VirtualTagConfigRequest;
    type UpdateRequest = VirtualTagConfigRequest;

    fn api_path() -> &'static str {
        "/v2/virtual_tag_configs"
    }

    fn list_key() -> &'static str {
        "virtual_tag_configs"
    }
}
