use super::attributes;
use super::ManagedEntity;
use crate::api::virtual_tag_configs::{
    Aggregation, CostMetric, Percentage, VirtualTagConfig, VirtualTagConfigRequest,
    VirtualTagValue,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, NestedType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::{NumberRange, StringLength};
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

pub struct VirtualTagConfigEntity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualTagConfigModel {
    pub token: Value<String>,
    pub key: Value<String>,
    pub overridable: Value<bool>,
    pub backfill_until: Value<String>,
    pub created_by_token: Value<String>,
    pub values: Value<Vec<VirtualTagValueModel>>,
}

/// One tag value and the costs it applies to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualTagValueModel {
    pub filter: Value<String>,
    pub name: Value<String>,
    pub business_metric_token: Value<String>,
    pub cost_metric: Value<CostMetricModel>,
    pub percentages: Value<Vec<PercentageModel>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostMetricModel {
    pub filter: Value<String>,
    pub aggregation: Value<AggregationModel>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationModel {
    pub tag: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentageModel {
    pub value: Value<String>,
    pub pct: Value<f64>,
}

impl FromDynamic for AggregationModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let aggregation = Self { tag: r.get("tag") };
        r.finish(aggregation)
    }
}

impl IntoDynamic for AggregationModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new().set("tag", self.tag).build()
    }
}

impl FromDynamic for CostMetricModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let metric = Self {
            filter: r.get("filter"),
            aggregation: r.get("aggregation"),
        };
        r.finish(metric)
    }
}

impl IntoDynamic for CostMetricModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("filter", self.filter)
            .set("aggregation", self.aggregation)
            .build()
    }
}

impl FromDynamic for PercentageModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let percentage = Self {
            value: r.get("value"),
            pct: r.get("pct"),
        };
        r.finish(percentage)
    }
}

impl IntoDynamic for PercentageModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("value", self.value)
            .set("pct", self.pct)
            .build()
    }
}

impl FromDynamic for VirtualTagValueModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let tag_value = Self {
            filter: r.get("filter"),
            name: r.get("name"),
            business_metric_token: r.get("business_metric_token"),
            cost_metric: r.get("cost_metric"),
            percentages: r.get("percentages"),
        };
        r.finish(tag_value)
    }
}

impl IntoDynamic for VirtualTagValueModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("filter", self.filter)
            .set("name", self.name)
            .set("business_metric_token", self.business_metric_token)
            .set("cost_metric", self.cost_metric)
            .set("percentages", self.percentages)
            .build()
    }
}

impl FromDynamic for VirtualTagConfigModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            token: r.get("token"),
            key: r.get("key"),
            overridable: r.get("overridable"),
            backfill_until: r.get("backfill_until"),
            created_by_token: r.get("created_by_token"),
            values: r.get("values"),
        };
        r.finish(model)
    }
}

impl IntoDynamic for VirtualTagConfigModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("key", self.key)
            .set("overridable", self.overridable)
            .set("backfill_until", self.backfill_until)
            .set("created_by_token", self.created_by_token)
            .set("values", self.values)
            .build()
    }
}

impl From<VirtualTagValue> for VirtualTagValueModel {
    fn from(value: VirtualTagValue) -> Self {
        Self {
            filter: Value::Known(value.filter),
            name: value.name.into(),
            business_metric_token: value.business_metric_token.into(),
            cost_metric: value
                .cost_metric
                .map(|metric| CostMetricModel {
                    filter: metric.filter.into(),
                    aggregation: metric
                        .aggregation
                        .map(|aggregation| AggregationModel {
                            tag: aggregation.tag.into(),
                        })
                        .into(),
                })
                .into(),
            percentages: value
                .percentages
                .map(|percentages| {
                    percentages
                        .into_iter()
                        .map(|p| PercentageModel {
                            value: Value::Known(p.value),
                            pct: Value::Known(p.pct),
                        })
                        .collect()
                })
                .into(),
        }
    }
}

impl VirtualTagValueModel {
    fn to_api(&self) -> VirtualTagValue {
        VirtualTagValue {
            filter: self.filter.as_option().cloned().unwrap_or_default(),
            name: self.name.as_option().cloned(),
            business_metric_token: self.business_metric_token.as_option().cloned(),
            cost_metric: self.cost_metric.as_option().map(|metric| CostMetric {
                filter: metric.filter.as_option().cloned(),
                aggregation: metric.aggregation.as_option().map(|aggregation| Aggregation {
                    tag: aggregation.tag.as_option().cloned(),
                }),
            }),
            percentages: self.percentages.as_option().map(|percentages| {
                percentages
                    .iter()
                    .map(|p| Percentage {
                        value: p.value.as_option().cloned().unwrap_or_default(),
                        pct: p.pct.as_option().copied().unwrap_or_default(),
                    })
                    .collect()
            }),
        }
    }

    /// How many of the mutually exclusive value kinds are set; unknown counts
    fn kinds_set(&self) -> usize {
        [
            !self.name.is_null(),
            !self.business_metric_token.is_null(),
            !self.cost_metric.is_null(),
            !self.percentages.is_null(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

fn cost_metric_attribute() -> Attribute {
    let aggregation = NestedType::single(vec![AttributeBuilder::new("tag", AttributeType::String)
        .description("Tag key whose values the cost metric aggregates by.")
        .optional()
        .build()]);

    let metric = NestedType::single(vec![
        AttributeBuilder::new("filter", AttributeType::String)
            .description("VQL filter selecting the costs of the metric.")
            .optional()
            .build(),
        AttributeBuilder::nested("aggregation", aggregation)
            .description("Aggregation applied to the metric.")
            .optional()
            .build(),
    ]);

    AttributeBuilder::nested("cost_metric", metric)
        .description("Allocate costs proportionally to another cost.")
        .optional()
        .build()
}

fn percentages_attribute() -> Attribute {
    let percentage = NestedType::list(vec![
        AttributeBuilder::new("value", AttributeType::String)
            .description("Tag value receiving the share.")
            .required()
            .build(),
        AttributeBuilder::new("pct", AttributeType::Number)
            .description("Share of the cost, in percent.")
            .required()
            .validator(NumberRange::create(Some(0.0), Some(100.0)))
            .build(),
    ]);

    AttributeBuilder::nested("percentages", percentage)
        .description("Split matching costs between tag values by percentage.")
        .optional()
        .build()
}

fn values_attribute() -> Attribute {
    let value = NestedType::list(vec![
        AttributeBuilder::new("filter", AttributeType::String)
            .description("VQL filter selecting the costs the value applies to.")
            .required()
            .build(),
        AttributeBuilder::new("name", AttributeType::String)
            .description("Name of the tag value.")
            .optional()
            .build(),
        AttributeBuilder::new("business_metric_token", AttributeType::String)
            .description("Token of a business metric to allocate costs by.")
            .optional()
            .build(),
        cost_metric_attribute(),
        percentages_attribute(),
    ]);

    AttributeBuilder::nested("values", value)
        .description(
            "Values of the virtual tag. Each sets exactly one of name, \
             business_metric_token, cost_metric or percentages.",
        )
        .optional()
        .computed()
        .build()
}

fn request(model: &VirtualTagConfigModel) -> VirtualTagConfigRequest {
    VirtualTagConfigRequest {
        key: model.key.as_option().cloned().unwrap_or_default(),
        overridable: model.overridable.as_option().copied().unwrap_or_default(),
        backfill_until: model.backfill_until.as_option().cloned(),
        values: model
            .values
            .as_option()
            .map(|values| values.iter().map(VirtualTagValueModel::to_api).collect()),
    }
}

impl ManagedEntity for VirtualTagConfigEntity {
    type Api = VirtualTagConfig;
    type Model = VirtualTagConfigModel;

    const TYPE_NAME: &'static str = "vantage_virtual_tag_config";
    const DATA_SOURCE_TYPE_NAME: &'static str = "vantage_virtual_tag_configs";
    const DISPLAY_NAME: &'static str = "virtual tag config";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Vantage virtual tag configuration.")
            .attribute(attributes::token("virtual tag config"))
            .attribute(
                AttributeBuilder::new("key", AttributeType::String)
                    .description("Key of the virtual tag.")
                    .required()
                    .validator(StringLength::create(Some(1), None))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("overridable", AttributeType::Bool)
                    .description("Whether the virtual tag overrides a provider tag with the same key.")
                    .required()
                    .build(),
            )
            .attribute(attributes::optional_date(
                "backfill_until",
                "Earliest month the tag is applied to, YYYY-MM-DD.",
            ))
            .attribute(attributes::stable(
                "created_by_token",
                "Token of the creator of the virtual tag.",
            ))
            .attribute(values_attribute())
            .build()
    }

    fn create_request(model: &VirtualTagConfigModel) -> VirtualTagConfigRequest {
        request(model)
    }

    fn update_request(model: &VirtualTagConfigModel) -> VirtualTagConfigRequest {
        request(model)
    }

    fn from_api(item: VirtualTagConfig) -> VirtualTagConfigModel {
        VirtualTagConfigModel {
            token: Value::Known(item.token),
            key: Value::Known(item.key),
            overridable: Value::Known(item.overridable),
            backfill_until: item.backfill_until.into(),
            created_by_token: item.created_by_token.into(),
            values: Value::Known(item.values.into_iter().map(Into::into).collect()),
        }
    }

    fn validate(model: &VirtualTagConfigModel) -> Vec<Diagnostic> {
        let Some(values) = model.values.as_option() else {
            return vec![];
        };

        let mut diagnostics = Vec::new();
        for (idx, value) in values.iter().enumerate() {
            let path = AttributePath::new("values").index(idx as i64);
            if value.kinds_set() != 1 {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid virtual tag value",
                        "Exactly one of name, business_metric_token, cost_metric or \
                         percentages must be set.",
                    )
                    .with_attribute(path.clone()),
                );
            }

            if let Some(percentages) = value.percentages.as_option() {
                let total: Option<f64> = percentages.iter().map(|p| p.pct.as_option()).sum();
                if let Some(total) = total.filter(|total| *total > 100.0) {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid percentages",
                            format!("Percentages add up to {}, more than 100.", total),
                        )
                        .with_attribute(path.attribute("percentages")),
                    );
                }
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
    use tfplug::resource::{Resource, UpdateResourceRequest};

    fn named(filter: &str, name: &str) -> VirtualTagValueModel {
        VirtualTagValueModel {
            filter: Value::from(filter),
            name: Value::from(name),
            ..Default::default()
        }
    }

    fn percentage(value: &str, pct: f64) -> PercentageModel {
        PercentageModel {
            value: Value::from(value),
            pct: Value::Known(pct),
        }
    }

    #[test]
    fn each_value_sets_exactly_one_kind() {
        let model = VirtualTagConfigModel {
            values: Value::Known(vec![
                named("costs.provider = 'aws'", "AWS"),
                VirtualTagValueModel {
                    filter: Value::from("costs.provider = 'gcp'"),
                    ..Default::default()
                },
                VirtualTagValueModel {
                    business_metric_token: Value::from("bsnss_mtrc_1"),
                    ..named("costs.provider = 'azure'", "Azure")
                },
            ]),
            ..Default::default()
        };

        let diags = VirtualTagConfigEntity::validate(&model);
        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(
            paths,
            vec![
                AttributePath::new("values").index(1),
                AttributePath::new("values").index(2),
            ]
        );
    }

    #[test]
    fn unknown_kind_counts_as_set() {
        let model = VirtualTagConfigModel {
            values: Value::Known(vec![VirtualTagValueModel {
                filter: Value::from("costs.provider = 'aws'"),
                name: Value::Unknown,
                ..Default::default()
            }]),
            ..Default::default()
        };
        assert!(VirtualTagConfigEntity::validate(&model).is_empty());
    }

    #[test]
    fn percentages_cannot_exceed_one_hundred() {
        let model = VirtualTagConfigModel {
            values: Value::Known(vec![VirtualTagValueModel {
                filter: Value::from("costs.provider = 'aws'"),
                percentages: Value::Known(vec![percentage("team-a", 60.0), percentage("team-b", 50.0)]),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let diags = VirtualTagConfigEntity::validate(&model);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Invalid percentages");
    }

    #[test]
    fn nested_type_errors_carry_full_path() {
        let schema = VirtualTagConfigEntity::schema();
        let value = schema.normalize(
            &ObjectBuilder::new()
                .set("key", "team")
                .set("overridable", true)
                .set(
                    "values",
                    Dynamic::List(vec![ObjectBuilder::new()
                        .set("filter", "costs.provider = 'aws'")
                        .set(
                            "cost_metric",
                            ObjectBuilder::new()
                                .set("filter", "costs.service = 'EC2'")
                                .set("aggregation", ObjectBuilder::new().set("tag", true).build())
                                .build(),
                        )
                        .build()]),
                )
                .build(),
        );

        let diags = schema.object_type().check(&value, &AttributePath::root());
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute,
            Some(
                AttributePath::new("values")
                    .index(0)
                    .attribute("cost_metric")
                    .attribute("aggregation")
                    .attribute("tag")
            )
        );
    }

    #[test]
    fn api_values_map_into_model() {
        let config: VirtualTagConfig = serde_json::from_str(
            r#"{
                "token": "vtag_1",
                "key": "team",
                "overridable": true,
                "values": [
                    {"filter": "costs.provider = 'aws'", "name": "platform"},
                    {"filter": "costs.provider = 'gcp'",
                     "cost_metric": {"filter": "costs.service = 'GKE'", "aggregation": {"tag": "team"}}},
                    {"filter": "costs.provider = 'azure'",
                     "percentages": [{"value": "a", "pct": 40}, {"value": "b", "pct": 60}]}
                ]
            }"#,
        )
        .unwrap();

        let model = VirtualTagConfigEntity::from_api(config);
        let values = model.values.into_option().unwrap();
        assert_eq!(values[0], named("costs.provider = 'aws'", "platform"));
        let metric = values[1].cost_metric.as_option().unwrap();
        assert_eq!(
            metric.aggregation,
            Value::Known(AggregationModel {
                tag: Value::from("team")
            })
        );
        assert_eq!(
            values[2].percentages,
            Value::Known(vec![percentage("a", 40.0), percentage("b", 60.0)])
        );
        assert!(model.backfill_until.is_null());
    }

    #[tokio::test]
    async fn update_replaces_values() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/v2/virtual_tag_configs/vtag_1")
            .match_body(Matcher::Json(serde_json::json!({
                "key": "team",
                "overridable": false,
                "values": [{"filter": "costs.provider = 'aws'", "name": "platform"}]
            })))
            .with_status(200)
            .with_body(
                r#"{"token":"vtag_1","key":"team","overridable":false,
                    "created_by_token":"usr_1",
                    "values":[{"filter":"costs.provider = 'aws'","name":"platform"}]}"#,
            )
            .create_async()
            .await;

        let schema = VirtualTagConfigEntity::schema();
        let prior = config(
            &schema,
            ObjectBuilder::new()
                .set("token", "vtag_1")
                .set("key", "team")
                .set("overridable", false)
                .set("created_by_token", "usr_1")
                .set("values", Vec::<VirtualTagValueModel>::new())
                .build(),
        );
        let planned = config(
            &schema,
            ObjectBuilder::new()
                .set("token", "vtag_1")
                .set("key", "team")
                .set("overridable", false)
                .set("created_by_token", "usr_1")
                .set("values", vec![named("costs.provider = 'aws'", "platform")])
                .build(),
        );

        let resource =
            EntityResource::<VirtualTagConfigEntity>::with_client(test_client(&server.url()));
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "vantage_virtual_tag_config".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned.clone(),
                    planned_private: vec![],
                },
            )
            .await;

        mock.assert_async().await;
        assert!(response.diagnostics.is_empty());
        let state: VirtualTagConfigModel = decode(&response.new_state).unwrap();
        assert_eq!(
            state.values,
            Value::Known(vec![named("costs.provider = 'aws'", "platform")])
        );
    }
}
