use super::attributes;
use super::ManagedEntity;
use crate::api::cost_reports::{
    CostReport, CostReportFields, CostReportSettings, CreateCostReportRequest,
    UpdateCostReportRequest,
};
use tfplug::defaults::StaticDefault;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, NestedType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::StringOneOf;
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

pub struct CostReportEntity;

pub const CHART_TYPES: &[&str] = &["area", "line", "pie", "bar", "multi_bar"];
pub const DATE_BINS: &[&str] = &["cumulative", "day", "week", "month", "quarter"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostReportModel {
    pub token: Value<String>,
    pub title: Value<String>,
    pub folder_token: Value<String>,
    pub workspace_token: Value<String>,
    pub filter: Value<String>,
    pub groupings: Value<String>,
    pub saved_filter_tokens: Value<Vec<String>>,
    pub settings: Value<CostReportSettingsModel>,
    pub date_interval: Value<String>,
    pub chart_type: Value<String>,
    pub date_bin: Value<String>,
    pub start_date: Value<String>,
    pub end_date: Value<String>,
    pub previous_period_start_date: Value<String>,
    pub previous_period_end_date: Value<String>,
    pub created_at: Value<String>,
}

/// Report-level toggles, all optional with server-side defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostReportSettingsModel {
    pub include_credits: Value<bool>,
    pub include_refunds: Value<bool>,
    pub include_discounts: Value<bool>,
    pub include_tax: Value<bool>,
    pub amortize: Value<bool>,
    pub unallocated: Value<bool>,
    pub aggregate_by: Value<String>,
    pub show_previous_period: Value<bool>,
}

impl CostReportSettingsModel {
    /// What Vantage applies when a report is created without settings
    pub fn defaults() -> Self {
        Self {
            include_credits: Value::Known(false),
            include_refunds: Value::Known(false),
            include_discounts: Value::Known(true),
            include_tax: Value::Known(true),
            amortize: Value::Known(true),
            unallocated: Value::Known(false),
            aggregate_by: Value::from("cost"),
            show_previous_period: Value::Known(true),
        }
    }

    fn to_api(&self) -> CostReportSettings {
        CostReportSettings {
            include_credits: self.include_credits.as_option().copied(),
            include_refunds: self.include_refunds.as_option().copied(),
            include_discounts: self.include_discounts.as_option().copied(),
            include_tax: self.include_tax.as_option().copied(),
            amortize: self.amortize.as_option().copied(),
            unallocated: self.unallocated.as_option().copied(),
            aggregate_by: self.aggregate_by.as_option().cloned(),
            show_previous_period: self.show_previous_period.as_option().copied(),
        }
    }
}

impl From<CostReportSettings> for CostReportSettingsModel {
    fn from(settings: CostReportSettings) -> Self {
        Self {
            include_credits: settings.include_credits.into(),
            include_refunds: settings.include_refunds.into(),
            include_discounts: settings.include_discounts.into(),
            include_tax: settings.include_tax.into(),
            amortize: settings.amortize.into(),
            unallocated: settings.unallocated.into(),
            aggregate_by: settings.aggregate_by.into(),
            show_previous_period: settings.show_previous_period.into(),
        }
    }
}

impl FromDynamic for CostReportSettingsModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let settings = Self {
            include_credits: r.get("include_credits"),
            include_refunds: r.get("include_refunds"),
            include_discounts: r.get("include_discounts"),
            include_tax: r.get("include_tax"),
            amortize: r.get("amortize"),
            unallocated: r.get("unallocated"),
            aggregate_by: r.get("aggregate_by"),
            show_previous_period: r.get("show_previous_period"),
        };
        r.finish(settings)
    }
}

impl IntoDynamic for CostReportSettingsModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("include_credits", self.include_credits)
            .set("include_refunds", self.include_refunds)
            .set("include_discounts", self.include_discounts)
            .set("include_tax", self.include_tax)
            .set("amortize", self.amortize)
            .set("unallocated", self.unallocated)
            .set("aggregate_by", self.aggregate_by)
            .set("show_previous_period", self.show_previous_period)
            .build()
    }
}

impl FromDynamic for CostReportModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            token: r.get("token"),
            title: r.get("title"),
            folder_token: r.get("folder_token"),
            workspace_token: r.get("workspace_token"),
            filter: r.get("filter"),
            groupings: r.get("groupings"),
            saved_filter_tokens: r.get("saved_filter_tokens"),
            settings: r.get("settings"),
            date_interval: r.get("date_interval"),
            chart_type: r.get("chart_type"),
            date_bin: r.get("date_bin"),
            start_date: r.get("start_date"),
            end_date: r.get("end_date"),
            previous_period_start_date: r.get("previous_period_start_date"),
            previous_period_end_date: r.get("previous_period_end_date"),
            created_at: r.get("created_at"),
        };
        r.finish(model)
    }
}

impl IntoDynamic for CostReportModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("title", self.title)
            .set("folder_token", self.folder_token)
            .set("workspace_token", self.workspace_token)
            .set("filter", self.filter)
            .set("groupings", self.groupings)
            .set("saved_filter_tokens", self.saved_filter_tokens)
            .set("settings", self.settings)
            .set("date_interval", self.date_interval)
            .set("chart_type", self.chart_type)
            .set("date_bin", self.date_bin)
            .set("start_date", self.start_date)
            .set("end_date", self.end_date)
            .set("previous_period_start_date", self.previous_period_start_date)
            .set("previous_period_end_date", self.previous_period_end_date)
            .set("created_at", self.created_at)
            .build()
    }
}

fn setting(name: &str, description: &str, default: bool) -> Attribute {
    AttributeBuilder::new(name, AttributeType::Bool)
        .description(description)
        .optional()
        .computed()
        .default(StaticDefault::bool(default))
        .build()
}

fn settings_attribute() -> Attribute {
    let nested = NestedType::single(vec![
        setting("include_credits", "Report costs with credits applied.", false),
        setting("include_refunds", "Report costs with refunds applied.", false),
        setting("include_discounts", "Report costs with discounts applied.", true),
        setting("include_tax", "Report costs including tax.", true),
        setting("amortize", "Amortize upfront commitments.", true),
        setting("unallocated", "Show unallocated costs.", false),
        AttributeBuilder::new("aggregate_by", AttributeType::String)
            .description("Aggregate the report by cost or usage.")
            .optional()
            .computed()
            .validator(StringOneOf::create(&["cost", "usage"]))
            .default(StaticDefault::string("cost"))
            .build(),
        setting(
            "show_previous_period",
            "Show the previous period alongside the current one.",
            true,
        ),
    ]);

    AttributeBuilder::nested("settings", nested)
        .description("Report settings.")
        .optional()
        .computed()
        .default(StaticDefault::create(
            CostReportSettingsModel::defaults().into_dynamic(),
        ))
        .build()
}

fn fields(model: &CostReportModel) -> CostReportFields {
    CostReportFields {
        folder_token: model.folder_token.as_option().cloned(),
        filter: model.filter.as_option().cloned(),
        groupings: model.groupings.as_option().cloned(),
        saved_filter_tokens: model.saved_filter_tokens.as_option().cloned(),
        settings: model.settings.as_option().map(CostReportSettingsModel::to_api),
        date_interval: model.date_interval.as_option().cloned(),
        chart_type: model.chart_type.as_option().cloned(),
        date_bin: model.date_bin.as_option().cloned(),
        start_date: model.start_date.as_option().cloned(),
        end_date: model.end_date.as_option().cloned(),
        previous_period_start_date: model.previous_period_start_date.as_option().cloned(),
        previous_period_end_date: model.previous_period_end_date.as_option().cloned(),
    }
}

impl ManagedEntity for CostReportEntity {
    type Api = CostReport;
    type Model = CostReportModel;

    const TYPE_NAME: &'static str = "vantage_cost_report";
    const DATA_SOURCE_TYPE_NAME: &'static str = "vantage_cost_reports";
    const DISPLAY_NAME: &'static str = "cost report";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Vantage cost report.")
            .attribute(attributes::token("cost report"))
            .attribute(
                AttributeBuilder::new("title", AttributeType::String)
                    .description("Title of the cost report.")
                    .required()
                    .build(),
            )
            .attribute(attributes::optional_string(
                "folder_token",
                "Token of the folder the report is filed in.",
            ))
            .attribute(attributes::workspace_token("cost report"))
            .attribute(attributes::optional_string(
                "filter",
                "VQL filter selecting the costs in the report.",
            ))
            .attribute(attributes::optional_string(
                "groupings",
                "Comma separated groupings, e.g. \"provider,service\".",
            ))
            .attribute(attributes::string_list(
                "saved_filter_tokens",
                "Tokens of saved filters applied to the report.",
            ))
            .attribute(settings_attribute())
            .attribute(attributes::date_interval())
            .attribute(attributes::one_of(
                "chart_type",
                "Chart type of the report.",
                CHART_TYPES,
            ))
            .attribute(attributes::one_of(
                "date_bin",
                "Date binning of the report.",
                DATE_BINS,
            ))
            .attribute(attributes::optional_date(
                "start_date",
                "First date of the report, YYYY-MM-DD. Requires a custom date interval.",
            ))
            .attribute(attributes::optional_date(
                "end_date",
                "Last date of the report, YYYY-MM-DD.",
            ))
            .attribute(attributes::optional_date(
                "previous_period_start_date",
                "First date of the comparison period, YYYY-MM-DD.",
            ))
            .attribute(attributes::optional_date(
                "previous_period_end_date",
                "Last date of the comparison period, YYYY-MM-DD.",
            ))
            .attribute(attributes::stable(
                "created_at",
                "Date and time the report was created.",
            ))
            .build()
    }

    fn create_request(model: &CostReportModel) -> CreateCostReportRequest {
        CreateCostReportRequest {
            title: model.title.as_option().cloned().unwrap_or_default(),
            workspace_token: model.workspace_token.as_option().cloned(),
            fields: fields(model),
        }
    }

    fn update_request(model: &CostReportModel) -> UpdateCostReportRequest {
        UpdateCostReportRequest {
            title: model.title.as_option().cloned().unwrap_or_default(),
            fields: fields(model),
        }
    }

    fn from_api(item: CostReport) -> CostReportModel {
        CostReportModel {
            token: Value::Known(item.token),
            title: Value::Known(item.title),
            folder_token: item.folder_token.into(),
            workspace_token: item.workspace_token.into(),
            filter: item.filter.into(),
            groupings: item.groupings.into(),
            saved_filter_tokens: Value::Known(item.saved_filter_tokens),
            settings: item.settings.map(CostReportSettingsModel::from).into(),
            date_interval: item.date_interval.into(),
            chart_type: item.chart_type.into(),
            date_bin: item.date_bin.into(),
            start_date: item.start_date.into(),
            end_date: item.end_date.into(),
            previous_period_start_date: item.previous_period_start_date.into(),
            previous_period_end_date: item.previous_period_end_date.into(),
            created_at: item.created_at.into(),
        }
    }

    fn validate(model: &CostReportModel) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if model.date_interval.as_option().map(String::as_str) == Some("custom")
            && model.start_date.is_null()
        {
            diagnostics.push(
                Diagnostic::error(
                    "Missing start date",
                    "start_date is required when date_interval is \"custom\".",
                )
                .with_attribute(AttributePath::new("start_date")),
            );
        }

        // YYYY-MM-DD compares correctly as text
        if let (Some(start), Some(end)) = (model.start_date.as_option(), model.end_date.as_option())
        {
            if end < start {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid date range",
                        format!("end_date {} is before start_date {}.", end, start),
                    )
                    .with_attribute(AttributePath::new("end_date")),
                );
            }
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{config, test_client};
    use crate::resources::{decode, EntityResource};
    use mockito::{Matcher, Server};
    use tfplug::context::Context;
    use tfplug::plan::plan_resource_change;
    use tfplug::resource::{Resource, UpdateResourceRequest};
    use tfplug::types::DynamicValue;

    fn report(attrs: ObjectBuilder) -> DynamicValue {
        config(&CostReportEntity::schema(), attrs.build())
    }

    #[test]
    fn settings_default_matches_nested_defaults() {
        let schema = CostReportEntity::schema();
        let settings = schema.attribute("settings").unwrap();
        let nested = settings.nested_type.as_ref().unwrap();
        assert_eq!(nested.attributes.len(), 8);
        assert!(settings.default.is_some());
        assert!(nested.attributes.iter().all(|a| a.default.is_some()));
    }

    #[test]
    fn plan_fills_settings_defaults() {
        let schema = CostReportEntity::schema();
        let proposed = report(ObjectBuilder::new().set("title", "AWS"));
        let planned =
            plan_resource_change(&schema, &Dynamic::Null, &proposed.value, &proposed.value);

        let model: CostReportModel = decode(&DynamicValue::new(planned.planned_state)).unwrap();
        assert!(model.token.is_unknown());
        assert!(model.created_at.is_unknown());
        assert_eq!(model.settings, Value::Known(CostReportSettingsModel::defaults()));
    }

    #[test]
    fn plan_fills_partial_settings() {
        let schema = CostReportEntity::schema();
        let settings = CostReportSettingsModel {
            amortize: Value::Known(false),
            ..Default::default()
        };
        let proposed = report(
            ObjectBuilder::new()
                .set("title", "AWS")
                .set("settings", settings),
        );

        let planned =
            plan_resource_change(&schema, &Dynamic::Null, &proposed.value, &proposed.value);
        let model: CostReportModel = decode(&DynamicValue::new(planned.planned_state)).unwrap();
        let settings = model.settings.into_option().unwrap();
        assert_eq!(settings.amortize, Value::Known(false));
        assert_eq!(settings.include_tax, Value::Known(true));
        assert_eq!(settings.aggregate_by, Value::from("cost"));
    }

    #[test]
    fn custom_interval_requires_start_date() {
        let model = CostReportModel {
            title: Value::from("AWS"),
            date_interval: Value::from("custom"),
            ..Default::default()
        };
        let diags = CostReportEntity::validate(&model);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("start_date")));

        let model = CostReportModel {
            date_interval: Value::from("custom"),
            start_date: Value::Unknown,
            ..Default::default()
        };
        assert!(CostReportEntity::validate(&model).is_empty());
    }

    #[test]
    fn end_date_before_start_date() {
        let model = CostReportModel {
            start_date: Value::from("2024-03-01"),
            end_date: Value::from("2024-02-01"),
            ..Default::default()
        };
        let diags = CostReportEntity::validate(&model);
        assert_eq!(diags[0].summary, "Invalid date range");
    }

    #[test]
    fn invalid_chart_type_is_rejected() {
        let schema = CostReportEntity::schema();
        let value = report(
            ObjectBuilder::new()
                .set("title", "AWS")
                .set("chart_type", "donut"),
        );
        let diags = schema.validate(&value.value);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("chart_type")));
    }

    #[test]
    fn api_settings_map_into_model() {
        let report: CostReport = serde_json::from_str(
            r#"{
                "token": "rprt_1",
                "title": "AWS",
                "groupings": "provider,service",
                "settings": {"include_credits": true, "aggregate_by": "usage"}
            }"#,
        )
        .unwrap();
        let model = CostReportEntity::from_api(report);
        let settings = model.settings.into_option().unwrap();
        assert_eq!(settings.include_credits, Value::Known(true));
        assert_eq!(settings.aggregate_by, Value::from("usage"));
        assert!(settings.amortize.is_null());
        assert_eq!(model.groupings, Value::from("provider,service"));
        assert_eq!(model.saved_filter_tokens, Value::Known(vec![]));
    }

    #[tokio::test]
    async fn update_sends_settings_without_workspace() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/v2/cost_reports/rprt_1")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "title": "AWS Costs",
                "settings": {"amortize": true, "aggregate_by": "cost"}
            })))
            .with_status(200)
            .with_body(
                r#"{"token":"rprt_1","title":"AWS Costs","workspace_token":"wrkspc_1",
                    "settings":{"include_credits":false,"include_refunds":false,
                    "include_discounts":true,"include_tax":true,"amortize":true,
                    "unallocated":false,"aggregate_by":"cost","show_previous_period":true}}"#,
            )
            .create_async()
            .await;

        let prior = report(
            ObjectBuilder::new()
                .set("token", "rprt_1")
                .set("title", "AWS")
                .set("workspace_token", "wrkspc_1"),
        );
        let planned = report(
            ObjectBuilder::new()
                .set("token", "rprt_1")
                .set("title", "AWS Costs")
                .set("workspace_token", "wrkspc_1")
                .set("settings", CostReportSettingsModel::defaults()),
        );

        let resource =
            EntityResource::<CostReportEntity>::with_client(test_client(&server.url()));
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "vantage_cost_report".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        mock.assert_async().await;
        assert!(response.diagnostics.is_empty());
        let model: CostReportModel = decode(&response.new_state).unwrap();
        assert_eq!(model.title, Value::from("AWS Costs"));
        assert_eq!(model.settings, Value::Known(CostReportSettingsModel::defaults()));
    }
}
