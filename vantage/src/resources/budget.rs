use super::attributes;
use super::ManagedEntity;
use crate::api::budgets::{
    Budget, BudgetFields, BudgetPerformance, BudgetPeriod, CreateBudgetRequest,
    UpdateBudgetRequest,
};
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, NestedType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::{Date, ListLength, NumberRange};
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

pub struct BudgetEntity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetModel {
    pub token: Value<String>,
    pub name: Value<String>,
    pub workspace_token: Value<String>,
    pub cost_report_token: Value<String>,
    pub child_budget_tokens: Value<Vec<String>>,
    pub periods: Value<Vec<BudgetPeriodModel>>,
    pub user_token: Value<String>,
    pub created_by_token: Value<String>,
    pub created_at: Value<String>,
    pub budget_alert_tokens: Value<Vec<String>>,
    pub performance: Value<Vec<BudgetPerformanceModel>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetPeriodModel {
    pub start_at: Value<String>,
    pub end_at: Value<String>,
    pub amount: Value<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetPerformanceModel {
    pub date: Value<String>,
    pub actual: Value<f64>,
    pub amount: Value<f64>,
}

impl FromDynamic for BudgetPeriodModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let period = Self {
            start_at: r.get("start_at"),
            end_at: r.get("end_at"),
            amount: r.get("amount"),
        };
        r.finish(period)
    }
}

impl IntoDynamic for BudgetPeriodModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("start_at", self.start_at)
            .set("end_at", self.end_at)
            .set("amount", self.amount)
            .build()
    }
}

impl From<BudgetPeriod> for BudgetPeriodModel {
    fn from(period: BudgetPeriod) -> Self {
        Self {
            start_at: Value::Known(period.start_at),
            end_at: period.end_at.into(),
            amount: period.amount.into(),
        }
    }
}

impl FromDynamic for BudgetPerformanceModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let performance = Self {
            date: r.get("date"),
            actual: r.get("actual"),
            amount: r.get("amount"),
        };
        r.finish(performance)
    }
}

impl IntoDynamic for BudgetPerformanceModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("date", self.date)
            .set("actual", self.actual)
            .set("amount", self.amount)
            .build()
    }
}

impl From<BudgetPerformance> for BudgetPerformanceModel {
    fn from(performance: BudgetPerformance) -> Self {
        Self {
            date: performance.date.into(),
            actual: performance.actual.into(),
            amount: performance.amount.into(),
        }
    }
}

impl FromDynamic for BudgetModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            token: r.get("token"),
            name: r.get("name"),
            workspace_token: r.get("workspace_token"),
            cost_report_token: r.get("cost_report_token"),
            child_budget_tokens: r.get("child_budget_tokens"),
            periods: r.get("periods"),
            user_token: r.get("user_token"),
            created_by_token: r.get("created_by_token"),
            created_at: r.get("created_at"),
            budget_alert_tokens: r.get("budget_alert_tokens"),
            performance: r.get("performance"),
        };
        r.finish(model)
    }
}

impl IntoDynamic for BudgetModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("name", self.name)
            .set("workspace_token", self.workspace_token)
            .set("cost_report_token", self.cost_report_token)
            .set("child_budget_tokens", self.child_budget_tokens)
            .set("periods", self.periods)
            .set("user_token", self.user_token)
            .set("created_by_token", self.created_by_token)
            .set("created_at", self.created_at)
            .set("budget_alert_tokens", self.budget_alert_tokens)
            .set("performance", self.performance)
            .build()
    }
}

fn periods_attribute() -> Attribute {
    let period = NestedType::list(vec![
        AttributeBuilder::new("start_at", AttributeType::String)
            .description("First day of the period, YYYY-MM-DD.")
            .required()
            .validator(Date::create())
            .build(),
        AttributeBuilder::new("end_at", AttributeType::String)
            .description("Last day of the period, YYYY-MM-DD.")
            .optional()
            .computed()
            .validator(Date::create())
            .build(),
        AttributeBuilder::new("amount", AttributeType::Number)
            .description("Budgeted amount for the period.")
            .required()
            .validator(NumberRange::at_least(0.0))
            .build(),
    ]);

    AttributeBuilder::nested("periods", period)
        .description("Budget periods and their amounts.")
        .optional()
        .computed()
        .validator(ListLength::create(Some(1), None))
        .build()
}

fn performance_attribute() -> Attribute {
    let entry = NestedType::list(vec![
        AttributeBuilder::new("date", AttributeType::String)
            .description("Date of the measurement.")
            .computed()
            .build(),
        AttributeBuilder::new("actual", AttributeType::Number)
            .description("Actual spend up to the date.")
            .computed()
            .build(),
        AttributeBuilder::new("amount", AttributeType::Number)
            .description("Budgeted amount for the date.")
            .computed()
            .build(),
    ]);

    AttributeBuilder::nested("performance", entry)
        .description("Historical performance of the budget.")
        .computed()
        .build()
}

fn periods(model: &BudgetModel) -> Option<Vec<BudgetPeriod>> {
    model.periods.as_option().map(|periods| {
        periods
            .iter()
            .map(|period| BudgetPeriod {
                start_at: period.start_at.as_option().cloned().unwrap_or_default(),
                end_at: period.end_at.as_option().cloned(),
                amount: period.amount.as_option().copied(),
            })
            .collect()
    })
}

fn fields(model: &BudgetModel) -> BudgetFields {
    BudgetFields {
        cost_report_token: model.cost_report_token.as_option().cloned(),
        child_budget_tokens: model.child_budget_tokens.as_option().cloned(),
        periods: periods(model),
    }
}

impl ManagedEntity for BudgetEntity {
    type Api = Budget;
    type Model = BudgetModel;

    const TYPE_NAME: &'static str = "vantage_budget";
    const DATA_SOURCE_TYPE_NAME: &'static str = "vantage_budgets";
    const DISPLAY_NAME: &'static str = "budget";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Vantage budget.")
            .attribute(attributes::token("budget"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the budget.")
                    .required()
                    .build(),
            )
            .attribute(attributes::workspace_token("budget"))
            .attribute(attributes::optional_string(
                "cost_report_token",
                "Token of the cost report the budget tracks.",
            ))
            .attribute(attributes::string_list(
                "child_budget_tokens",
                "Tokens of budgets rolled up into this one.",
            ))
            .attribute(periods_attribute())
            .attribute(attributes::stable(
                "user_token",
                "Token of the user owning the budget.",
            ))
            .attribute(attributes::stable(
                "created_by_token",
                "Token of the creator of the budget.",
            ))
            .attribute(attributes::stable(
                "created_at",
                "Date and time the budget was created.",
            ))
            .attribute(
                AttributeBuilder::new(
                    "budget_alert_tokens",
                    AttributeType::list(AttributeType::String),
                )
                .description("Tokens of alerts attached to the budget.")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
            )
            .attribute(performance_attribute())
            .build()
    }

    fn create_request(model: &BudgetModel) -> CreateBudgetRequest {
        CreateBudgetRequest {
            name: model.name.as_option().cloned().unwrap_or_default(),
            workspace_token: model.workspace_token.as_option().cloned(),
            fields: fields(model),
        }
    }

    fn update_request(model: &BudgetModel) -> UpdateBudgetRequest {
        UpdateBudgetRequest {
            name: model.name.as_option().cloned().unwrap_or_default(),
            fields: fields(model),
        }
    }

    fn from_api(item: Budget) -> BudgetModel {
        BudgetModel {
            token: Value::Known(item.token),
            name: Value::Known(item.name),
            workspace_token: item.workspace_token.into(),
            cost_report_token: item.cost_report_token.into(),
            child_budget_tokens: Value::Known(item.child_budget_tokens),
            periods: Value::Known(item.periods.into_iter().map(Into::into).collect()),
            user_token: item.user_token.into(),
            created_by_token: item.created_by_token.into(),
            created_at: item.created_at.into(),
            budget_alert_tokens: Value::Known(item.budget_alert_tokens),
            performance: Value::Known(item.performance.into_iter().map(Into::into).collect()),
        }
    }

    fn validate(model: &BudgetModel) -> Vec<Diagnostic> {
        let Some(periods) = model.periods.as_option() else {
            return vec![];
        };

        let mut diagnostics = Vec::new();
        for (idx, period) in periods.iter().enumerate() {
            if let (Some(start), Some(end)) = (period.start_at.as_option(), period.end_at.as_option())
            {
                if end < start {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid budget period",
                            format!("end_at {} is before start_at {}.", end, start),
                        )
                        .with_attribute(
                            AttributePath::new("periods")
                                .index(idx as i64)
                                .attribute("end_at"),
                        ),
                    );
                }
            }
        }
        diagnostics
    }
}
