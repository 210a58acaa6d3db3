//! Drives schema checking, defaults and planning through the public API the
//! way a provider crate uses it

use tfplug::defaults::StaticDefault;
use tfplug::plan::plan_resource_change;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::validator::{Date, ListLength, NumberRange, StringOneOf};
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

fn report_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("A report")
        .attribute(
            AttributeBuilder::new("token", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("title", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("workspace_token", AttributeType::String)
                .optional()
                .computed()
                .plan_modifier(RequiresReplace::create())
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("chart_type", AttributeType::String)
                .optional()
                .computed()
                .default(StaticDefault::string("line"))
                .validator(StringOneOf::create(&["line", "bar", "pie"]))
                .build(),
        )
        .attribute(
            AttributeBuilder::nested(
                "periods",
                NestedType::list(vec![
                    AttributeBuilder::new("start_at", AttributeType::String)
                        .required()
                        .validator(Date::create())
                        .build(),
                    AttributeBuilder::new("amount", AttributeType::Number)
                        .required()
                        .validator(NumberRange::at_least(0.0))
                        .build(),
                ]),
            )
            .optional()
            .validator(ListLength::create(Some(1), None))
            .build(),
        )
        .build()
}

#[derive(Debug, Default, PartialEq)]
struct Period {
    start_at: Value<String>,
    amount: Value<f64>,
}

impl FromDynamic for Period {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let period = Self {
            start_at: r.get("start_at"),
            amount: r.get("amount"),
        };
        r.finish(period)
    }
}

impl IntoDynamic for Period {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("start_at", self.start_at)
            .set("amount", self.amount)
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
struct Report {
    token: Value<String>,
    title: Value<String>,
    workspace_token: Value<String>,
    chart_type: Value<String>,
    periods: Value<Vec<Period>>,
}

impl FromDynamic for Report {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let report = Self {
            token: r.get("token"),
            title: r.get("title"),
            workspace_token: r.get("workspace_token"),
            chart_type: r.get("chart_type"),
            periods: r.get("periods"),
        };
        r.finish(report)
    }
}

impl IntoDynamic for Report {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("title", self.title)
            .set("workspace_token", self.workspace_token)
            .set("chart_type", self.chart_type)
            .set("periods", self.periods)
            .build()
    }
}

fn user_config(title: &str, workspace: Option<&str>) -> Dynamic {
    let report = Report {
        title: Value::from(title),
        workspace_token: workspace.map(str::to_string).into(),
        ..Default::default()
    };
    report_schema().normalize(&report.into_dynamic())
}

#[test]
fn create_plan_injects_defaults_and_marks_computed_unknown() {
    let schema = report_schema();
    let config = user_config("Monthly", None);

    let plan = plan_resource_change(&schema, &Dynamic::Null, &config, &config);
    assert!(plan.diagnostics.is_empty());
    assert!(plan.requires_replace.is_empty());

    let planned = Report::from_dynamic(&plan.planned_state, &AttributePath::root()).unwrap();
    assert_eq!(planned.title, Value::from("Monthly"));
    assert_eq!(planned.chart_type, Value::from("line"));
    assert!(planned.token.is_unknown());
    assert!(planned.workspace_token.is_unknown());
    assert!(planned.periods.is_null());
}

#[test]
fn planned_state_survives_the_wire() {
    let schema = report_schema();
    let config = user_config("Monthly", Some("wrkspc_1"));
    let plan = plan_resource_change(&schema, &Dynamic::Null, &config, &config);

    let bytes = DynamicValue::new(plan.planned_state.clone())
        .encode_msgpack()
        .unwrap();
    let decoded = DynamicValue::decode_msgpack(&bytes).unwrap();
    assert_eq!(decoded.value, plan.planned_state);
    assert!(decoded
        .get(&AttributePath::new("token"))
        .unwrap()
        .is_unknown());
}

#[test]
fn moving_workspace_forces_replacement() {
    let schema = report_schema();
    let prior = Report {
        token: Value::from("rprt_1"),
        title: Value::from("Monthly"),
        workspace_token: Value::from("wrkspc_1"),
        chart_type: Value::from("line"),
        periods: Value::Null,
    }
    .into_dynamic();

    let config = user_config("Monthly", Some("wrkspc_2"));
    let mut proposed = prior.clone();
    if let Dynamic::Map(attrs) = &mut proposed {
        attrs.insert(
            "workspace_token".to_string(),
            Dynamic::String("wrkspc_2".to_string()),
        );
    }

    let plan = plan_resource_change(&schema, &prior, &proposed, &config);
    assert_eq!(
        plan.requires_replace,
        vec![AttributePath::new("workspace_token")]
    );
    let planned = Report::from_dynamic(&plan.planned_state, &AttributePath::root()).unwrap();
    assert_eq!(planned.token, Value::from("rprt_1"));
}

#[test]
fn validation_reaches_nested_list_elements() {
    let schema = report_schema();
    let config = schema.normalize(
        &ObjectBuilder::new()
            .set("title", "Monthly")
            .set("chart_type", "donut")
            .set(
                "periods",
                vec![
                    Period {
                        start_at: Value::from("2024-01-01"),
                        amount: Value::Known(100.0),
                    },
                    Period {
                        start_at: Value::from("2024-13-01"),
                        amount: Value::Known(-5.0),
                    },
                ],
            )
            .build(),
    );

    let mut paths: Vec<String> = schema
        .validate(&config)
        .into_iter()
        .filter_map(|d| d.attribute.map(|p| p.to_string()))
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            AttributePath::new("chart_type").to_string(),
            AttributePath::new("periods").index(1).attribute("amount").to_string(),
            AttributePath::new("periods").index(1).attribute("start_at").to_string(),
        ]
    );
}

#[test]
fn unknown_config_values_skip_validation() {
    let schema = report_schema();
    let config = schema.normalize(
        &ObjectBuilder::new()
            .set("title", "Monthly")
            .set("chart_type", Dynamic::Unknown)
            .set("periods", Dynamic::Unknown)
            .build(),
    );
    assert!(schema.validate(&config).is_empty());
}

#[test]
fn type_check_reports_mismatches_with_paths() {
    let schema = report_schema();
    let value = schema.normalize(
        &ObjectBuilder::new()
            .set("title", 42.0)
            .set(
                "periods",
                Dynamic::List(vec![ObjectBuilder::new()
                    .set("start_at", "2024-01-01")
                    .set("amount", "lots")
                    .build()]),
            )
            .build(),
    );

    let diags = schema.object_type().check(&value, &AttributePath::root());
    let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
    assert!(paths.contains(&AttributePath::new("title")));
    assert!(paths.contains(&AttributePath::new("periods").index(0).attribute("amount")));
}
