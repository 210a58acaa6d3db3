//! Kubernetes efficiency reports: `/v2/kubernetes_efficiency_reports`

use super::common::{string_or_list, VantageResource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KubernetesEfficiencyReport {
    pub token: String,
    pub title: String,
    pub workspace_token: Option<String>,
    pub filter: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub date_interval: Option<String>,
    pub aggregated_by: Option<String>,
    pub date_bucket: Option<String>,
    #[serde(default, deserialize_with = "string_or_list::deserialize")]
    pub groupings: Option<Vec<String>>,
    pub created_at: Option<String>,
    pub user_token: Option<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateKubernetesEfficiencyReportRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_token: Option<String>,
    #[serde(flatten)]
    pub fields: KubernetesEfficiencyReportFields,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateKubernetesEfficiencyReportRequest {
    pub title: String,
    #[serde(flatten)]
    pub fields: KubernetesEfficiencyReportFields,
}

#[derive(Debug, Default, Serialize)]
pub struct KubernetesEfficiencyReportFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupings: Option<Vec<String>>,
}

impl VantageResource for KubernetesEfficiencyReport {
    type CreateRequest = CreateKubernetesEfficiencyReportRequest;
    type UpdateRequest = UpdateKubernetesEfficiencyReportRequest;

    fn api_path() -> &'static str {
        "/v2/kubernetes_efficiency_reports"
    }

    fn list_key() -> &'static str {
        "kubernetes_efficiency_reports"
    }
}
