//! Budgets: `/v2/budgets`

use super::common::{number_or_string, VantageResource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Budget {
    pub token: String,
    pub name: String,
    pub workspace_token: Option<String>,
    pub cost_report_token: Option<String>,
    pub user_token: Option<String>,
    pub created_by_token: Option<String>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub child_budget_tokens: Vec<String>,
    #[serde(default)]
    pub budget_alert_tokens: Vec<String>,
    #[serde(default)]
    pub periods: Vec<BudgetPeriod>,
    #[serde(default)]
    pub performance: Vec<BudgetPerformance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub start_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "number_or_string::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BudgetPerformance {
    pub date: Option<String>,
    #[serde(default, deserialize_with = "number_or_string::deserialize")]
    pub actual: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string::deserialize")]
    pub amount: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateBudgetRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_token: Option<String>,
    #[serde(flatten)]
    pub fields: BudgetFields,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateBudgetRequest {
    pub name: String,
    #[serde(flatten)]
    pub fields: BudgetFields,
}

#[derive(Debug, Default, Serialize)]
pub struct BudgetFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_report_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_budget_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<BudgetPeriod>>,
}

impl VantageResource for Budget {
    type CreateRequest = CreateBudgetRequest;
    type UpdateRequest = UpdateBudgetRequest;

    fn api_path() -> &'static str {
        "/v2/budgets"
    }

    fn list_key() -> &'static str {
        "budgets"
    }
}
