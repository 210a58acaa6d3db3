use super::attributes;
use super::ManagedEntity;
use crate::api::financial_commitment_reports::{
    CreateFinancialCommitmentReportRequest, FinancialCommitmentReport,
    FinancialCommitmentReportFields, UpdateFinancialCommitmentReportRequest,
};
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic};
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

pub struct FinancialCommitmentReportEntity;

pub const DATE_BUCKETS: &[&str] = &["hour", "day", "week", "month"];
pub const ON_DEMAND_COSTS_SCOPES: &[&str] = &["discountable", "all"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialCommitmentReportModel {
    pub token: Value<String>,
    pub title: Value<String>,
    pub workspace_token: Value<String>,
    pub filter: Value<String>,
    pub start_date: Value<String>,
    pub end_date: Value<String>,
    pub date_interval: Value<String>,
    pub date_bucket: Value<String>,
    pub groupings: Value<Vec<String>>,
    pub on_demand_costs_scope: Value<String>,
    pub created_at: Value<String>,
    pub user_token: Value<String>,
    pub default: Value<bool>,
}

impl FromDynamic for FinancialCommitmentReportModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            token: r.get("token"),
            title: r.get("title"),
            workspace_token: r.get("workspace_token"),
            filter: r.get("filter"),
            start_date: r.get("start_date"),
            end_date: r.get("end_date"),
            date_interval: r.get("date_interval"),
            date_bucket: r.get("date_bucket"),
            groupings: r.get("groupings"),
            on_demand_costs_scope: r.get("on_demand_costs_scope"),
            created_at: r.get("created_at"),
            user_token: r.get("user_token"),
            default: r.get("default"),
        };
        r.finish(model)
    }
}

impl IntoDynamic for FinancialCommitmentReportModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("title", self.title)
            .set("workspace_token", self.workspace_token)
            .set("filter", self.filter)
            .set("start_date", self.start_date)
            .set("end_date", self.end_date)
            .set("date_interval", self.date_interval)
            .set("date_bucket", self.date_bucket)
            .set("groupings", self.groupings)
            .set("on_demand_costs_scope", self.on_demand_costs_scope)
            .set("created_at", self.created_at)
            .set("user_token", self.user_token)
            .set("default", self.default)
            .build()
    }
}

fn fields(model: &FinancialCommitmentReportModel) -> FinancialCommitmentReportFields {
    FinancialCommitmentReportFields {
        filter: model.filter.as_option().cloned(),
        start_date: model.start_date.as_option().cloned(),
        end_date: model.end_date.as_option().cloned(),
        date_interval: model.date_interval.as_option().cloned(),
        date_bucket: model.date_bucket.as_option().cloned(),
        groupings: model.groupings.as_option().cloned(),
        on_demand_costs_scope: model.on_demand_costs_scope.as_option().cloned(),
    }
}

impl ManagedEntity for FinancialCommitmentReportEntity {
    type Api = FinancialCommitmentReport;
    type Model = FinancialCommitmentReportModel;

    const TYPE_NAME: &'static str = "vantage_financial_commitment_report";
    const DATA_SOURCE_TYPE_NAME: &'static str = "vantage_financial_commitment_reports";
    const DISPLAY_NAME: &'static str = "financial commitment report";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Vantage financial commitment report.")
            .attribute(attributes::token("report"))
            .attribute(
                AttributeBuilder::new("title", AttributeType::String)
                    .description("Title of the report.")
                    .required()
                    .build(),
            )
            .attribute(attributes::workspace_token("report"))
            .attribute(attributes::optional_string(
                "filter",
                "VQL filter selecting the commitments in the report.",
            ))
            .attribute(attributes::optional_date(
                "start_date",
                "First date of the report, YYYY-MM-DD.",
            ))
            .attribute(attributes::optional_date(
                "end_date",
                "Last date of the report, YYYY-MM-DD.",
            ))
            .attribute(attributes::date_interval())
            .attribute(attributes::one_of(
                "date_bucket",
                "Date bucketing of the report.",
                DATE_BUCKETS,
            ))
            .attribute(attributes::string_list(
                "groupings",
                "Groupings of the report, e.g. cost_type or commitment_type.",
            ))
            .attribute(attributes::one_of(
                "on_demand_costs_scope",
                "Which on-demand costs the report compares commitments against.",
                ON_DEMAND_COSTS_SCOPES,
            ))
            .attribute(attributes::stable(
                "created_at",
                "Date and time the report was created.",
            ))
            .attribute(attributes::stable(
                "user_token",
                "Token of the user owning the report.",
            ))
            .attribute(
                AttributeBuilder::new("default", AttributeType::Bool)
                    .description("Whether this is the default report of the workspace.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .build()
    }

    fn create_request(
        model: &FinancialCommitmentReportModel,
    ) -> CreateFinancialCommitmentReportRequest {
        CreateFinancialCommitmentReportRequest {
            title: model.title.as_option().cloned().unwrap_or_default(),
            workspace_token: model.workspace_token.as_option().cloned(),
            fields: fields(model),
        }
    }

    fn update_request(
        model: &FinancialCommitmentReportModel,
    ) -> UpdateFinancialCommitmentReportRequest {
        UpdateFinancialCommitmentReportRequest {
            title: model.title.as_option().cloned().unwrap_or_default(),
            fields: fields(model),
        }
    }

    fn from_api(item: FinancialCommitmentReport) -> FinancialCommitmentReportModel {
        FinancialCommitmentReportModel {
            token: Value::Known(item.token),
            title: Value::Known(item.title),
            workspace_token: item.workspace_token.into(),
            filter: item.filter.into(),
            start_date: item.start_date.into(),
            end_date: item.end_date.into(),
            date_interval: item.date_interval.into(),
            date_bucket: item.date_bucket.into(),
            groupings: Value::Known(item.groupings.unwrap_or_default()),
            on_demand_costs_scope: item.on_demand_costs_scope.into(),
            created_at: item.created_at.into(),
            user_token: item.user_token.into(),
            default: Value::Known(item.default),
        }
    }
}
