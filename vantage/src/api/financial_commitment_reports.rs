//! Financial commitment reports: `/v2/financial_commitment_reports`

use super::common::{string_or_list, VantageResource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinancialCommitmentReport {
    pub token: String,
    pub title: String,
    pub workspace_token: Option<String>,
    pub filter: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub date_interval: Option<String>,
    pub date_bucket: Option<String>,
    #[serde(default, deserialize_with = "string_or_list::deserialize")]
    pub groupings: Option<Vec<String>>,
    pub on_demand_costs_scope: Option<String>,
    pub created_at: Option<String>,
    pub user_token: Option<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateFinancialCommitmentReportRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_token: Option<String>,
    #[serde(flatten)]
    pub fields: FinancialCommitmentReportFields,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateFinancialCommitmentReportRequest {
    pub title: String,
    #[serde(flatten)]
    pub fields: FinancialCommitmentReportFields,
}

#[derive(Debug, Default, Serialize)]
pub struct FinancialCommitmentReportFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_demand_costs_scope: Option<String>,
}

impl VantageResource for FinancialCommitmentReport {
    type CreateRequest = CreateFinancialCommitmentReportRequest;
    type UpdateRequest = UpdateFinancialCommitmentReportRequest;

    fn api_path() -> &'static str {
        "/v2/financial_commitment_reports"
    }

    fn list_key() -> &'static str {
        "financial_commitment_reports"
    }
}
