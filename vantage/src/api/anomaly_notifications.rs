//! Anomaly notifications: `/v2/anomaly_notifications`

use super::common::VantageResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnomalyNotification {
    pub token: String,
    pub cost_report_token: String,
    pub threshold: Option<i64>,
    #[serde(default)]
    pub user_tokens: Vec<String>,
    #[serde(default)]
    pub recipient_channels: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateAnomalyNotificationRequest {
    pub cost_report_token: String,
    #[serde(flatten)]
    pub fields: UpdateAnomalyNotificationRequest,
}

/// The cost report cannot change after creation
#[derive(Debug, Default, Serialize)]
pub struct UpdateAnomalyNotificationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_channels: Option<Vec<String>>,
}

impl VantageResource for AnomalyNotification {
    type CreateRequest = CreateAnomalyNotificationRequest;
    type UpdateRequest = UpdateAnomalyNotificationRequest;

    fn api_path() -> &'static str {
        "/v2/anomaly_notifications"
    }

    fn list_key() -> &'static str {
        "anomaly_notifications"
    }
}
