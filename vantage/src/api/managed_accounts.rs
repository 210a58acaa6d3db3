//! Managed accounts: `/v2/managed_accounts`

use super::common::VantageResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagedAccount {
    pub token: String,
    pub name: String,
    pub contact_email: String,
    pub parent_account_token: Option<String>,
    #[serde(default)]
    pub access_credential_tokens: Vec<String>,
    #[serde(default)]
    pub billing_rule_tokens: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ManagedAccountRequest {
    pub name: String,
    pub contact_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_credential_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_rule_tokens: Option<Vec<String>>,
}

impl VantageResource for ManagedAccount {
    type CreateRequest = ManagedAccountRequest;
    type UpdateRequest = ManagedAccountRequest;

    fn api_path() -> &'static str {
        "/v2/managed_accounts"
    }

    fn list_key() -> &'static str {
        "managed_accounts"
    }
}
