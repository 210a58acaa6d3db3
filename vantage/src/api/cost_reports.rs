//! Cost reports: `/v2/cost_reports`

use super::common::{deserialize_joined, VantageResource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CostReport {
    pub token: String,
    pub title: String,
    pub folder_token: Option<String>,
    pub workspace_token: Option<String>,
    pub filter: Option<String>,
    #[serde(default, deserialize_with = "deserialize_joined")]
    pub groupings: Option<String>,
    #[serde(default)]
    pub saved_filter_tokens: Vec<String>,
    pub settings: Option<CostReportSettings>,
    pub date_interval: Option<String>,
    pub chart_type: Option<String>,
    pub date_bin: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub previous_period_start_date: Option<String>,
    pub previous_period_end_date: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostReportSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_credits: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_refunds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_discounts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tax: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amortize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unallocated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_previous_period: Option<bool>,
}

/// Request body for POST; PUT takes the same fields except `workspace_token`
#[derive(Debug, Default, Serialize)]
pub struct CreateCostReportRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_token: Option<String>,
    #[serde(flatten)]
    pub fields: CostReportFields,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateCostReportRequest {
    pub title: String,
    #[serde(flatten)]
    pub fields: CostReportFields,
}

#[derive(Debug, Default, Serialize)]
pub struct CostReportFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_filter_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<CostReportSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_bin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_period_start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_period_end_date: Option<String>,
}

impl VantageResource for CostReport {
    type CreateRequest = CreateCostReportRequest;
    type UpdateRequest = UpdateCostReportRequest;

    fn api_path() -> &'static str {
        "/v2/cost_reports"
    }

    fn list_key() -> &'static str {
        "cost_reports"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_api_payload() {
        let report: CostReport = serde_json::from_str(
            r#"{
                "token": "rprt_1",
                "title": "AWS",
                "groupings": ["provider", "service"],
                "settings": {"include_credits": false, "aggregate_by": "cost"},
                "date_interval": "last_month",
                "created_at": "2024-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(report.groupings.as_deref(), Some("provider,service"));
        assert!(report.saved_filter_tokens.is_empty());
        assert_eq!(report.settings.unwrap().aggregate_by.as_deref(), Some("cost"));
    }

    #[test]
    fn update_omits_workspace_token() {
        let body = serde_json::to_value(UpdateCostReportRequest {
            title: "AWS".to_string(),
            fields: CostReportFields {
                filter: Some("costs.provider = 'aws'".to_string()),
                ..Default::default()
            },
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"title": "AWS", "filter": "costs.provider = 'aws'"})
        );
    }
}
