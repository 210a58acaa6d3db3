//! Resource reports: `/v2/resource_reports`

use super::common::VantageResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceReport {
    pub token: String,
    pub title: String,
    pub workspace_token: Option<String>,
    pub filter: Option<String>,
    pub created_at: Option<String>,
    pub created_by_token: Option<String>,
    pub user_token: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateResourceReportRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateResourceReportRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl VantageResource for ResourceReport {
    type CreateRequest = CreateResourceReportRequest;
    type UpdateRequest = UpdateResourceReportRequest;

    fn api_path() -> &'static str {
        "/v2/resource_reports"
    }

    fn list_key() -> &'static str {
        "resource_reports"
    }
}
