//! Planning engine
//!
//! Turns Terraform's proposed new state into the planned state: computed
//! attributes left null in configuration receive their default, become
//! unknown when the resource changes, or keep their prior value. Plan
//! modifiers run last and may request replacement.

use crate::plan_modifier::{values_equal, PlanModifyRequest};
use crate::schema::{Attribute, ObjectNestingMode, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PlanResult {
    pub planned_state: Dynamic,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compute the planned state for a resource change
pub fn plan_resource_change(
    schema: &Schema,
    prior_state: &Dynamic,
    proposed_new_state: &Dynamic,
    config: &Dynamic,
) -> PlanResult {
    // destroy
    if proposed_new_state.is_null() {
        return PlanResult {
            planned_state: Dynamic::Null,
            ..Default::default()
        };
    }

    let mut planner = Planner {
        creating: prior_state.is_null(),
        has_changes: prior_state.is_null() || !values_equal(proposed_new_state, prior_state),
        requires_replace: Vec::new(),
        diagnostics: Vec::new(),
    };

    let planned_state = planner.plan_object(
        &schema.block.attributes,
        prior_state,
        proposed_new_state,
        config,
        &AttributePath::root(),
    );

    PlanResult {
        planned_state,
        requires_replace: planner.requires_replace,
        diagnostics: planner.diagnostics,
    }
}

struct Planner {
    creating: bool,
    has_changes: bool,
    requires_replace: Vec<AttributePath>,
    diagnostics: Vec<Diagnostic>,
}

fn attr_of<'a>(object: &'a Dynamic, name: &str) -> &'a Dynamic {
    match object {
        Dynamic::Map(map) => map.get(name).unwrap_or(&Dynamic::Null),
        _ => &Dynamic::Null,
    }
}

fn element_of(list: &Dynamic, idx: usize) -> &Dynamic {
    match list {
        Dynamic::List(items) => items.get(idx).unwrap_or(&Dynamic::Null),
        _ => &Dynamic::Null,
    }
}

impl Planner {
    fn plan_object(
        &mut self,
        attributes: &[Attribute],
        prior: &Dynamic,
        proposed: &Dynamic,
        config: &Dynamic,
        path: &AttributePath,
    ) -> Dynamic {
        let planned: HashMap<String, Dynamic> = attributes
            .iter()
            .map(|attr| {
                let planned = self.plan_attribute(
                    attr,
                    attr_of(prior, &attr.name),
                    attr_of(proposed, &attr.name),
                    attr_of(config, &attr.name),
                    &path.clone().attribute(&attr.name),
                );
                (attr.name.clone(), planned)
            })
            .collect();
        Dynamic::Map(planned)
    }

    fn plan_attribute(
        &mut self,
        attr: &Attribute,
        prior: &Dynamic,
        proposed: &Dynamic,
        config: &Dynamic,
        path: &AttributePath,
    ) -> Dynamic {
        let mut planned = if attr.computed && config.is_null() {
            match &attr.default {
                Some(default) => default.default_value(),
                None if self.has_changes => Dynamic::Unknown,
                None => prior.clone(),
            }
        } else {
            match (&attr.nested_type, config) {
                (Some(nested), Dynamic::Map(_)) if nested.nesting == ObjectNestingMode::Single => {
                    self.plan_object(&nested.attributes, prior, proposed, config, path)
                }
                (Some(nested), Dynamic::List(elements))
                    if nested.nesting == ObjectNestingMode::List =>
                {
                    Dynamic::List(
                        elements
                            .iter()
                            .enumerate()
                            .map(|(idx, element_config)| {
                                self.plan_object(
                                    &nested.attributes,
                                    element_of(prior, idx),
                                    element_of(proposed, idx),
                                    element_config,
                                    &path.clone().index(idx as i64),
                                )
                            })
                            .collect(),
                    )
                }
                _ => proposed.clone(),
            }
        };

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify_plan(PlanModifyRequest {
                state: prior.clone(),
                plan: planned,
                config: config.clone(),
                path: path.clone(),
            });
            planned = response.plan_value;
            self.diagnostics.extend(response.diagnostics);
            if response.requires_replace && !self.creating {
                self.requires_replace.push(path.clone());
            }
        }

        planned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::{RequiresReplace, UseStateForUnknown};
    use crate::schema::{AttributeBuilder, AttributeType, NestedType, SchemaBuilder};

    fn schema() -> Schema {
        SchemaBuilder::new()
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
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested(
                    "settings",
                    NestedType::single(vec![
                        AttributeBuilder::new("amortize", AttributeType::Bool)
                            .optional()
                            .computed()
                            .default(StaticDefault::bool(true))
                            .build(),
                        AttributeBuilder::new("aggregate_by", AttributeType::String)
                            .optional()
                            .computed()
                            .default(StaticDefault::string("cost"))
                            .build(),
                    ]),
                )
                .optional()
                .computed()
                .default(StaticDefault::object([
                    ("amortize", Dynamic::Bool(true)),
                    ("aggregate_by", Dynamic::String("cost".into())),
                ]))
                .build(),
            )
            .build()
    }

    fn object(pairs: Vec<(&str, Dynamic)>) -> Dynamic {
        Dynamic::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn s(v: &str) -> Dynamic {
        Dynamic::String(v.to_string())
    }

    fn prior() -> Dynamic {
        object(vec![
            ("token", s("rprt_1")),
            ("title", s("Costs")),
            ("workspace_token", s("wrkspc_1")),
            ("created_at", s("2024-01-01T00:00:00Z")),
            (
                "settings",
                object(vec![("amortize", Dynamic::Bool(true)), ("aggregate_by", s("cost"))]),
            ),
        ])
    }

    fn config(title: &str, workspace: Dynamic) -> Dynamic {
        object(vec![
            ("token", Dynamic::Null),
            ("title", s(title)),
            ("workspace_token", workspace),
            ("created_at", Dynamic::Null),
            ("settings", Dynamic::Null),
        ])
    }

    #[test]
    fn create_marks_computed_unknown_and_applies_defaults() {
        let config = config("Costs", Dynamic::Null);
        let result = plan_resource_change(&schema(), &Dynamic::Null, &config, &config);

        let planned = result.planned_state.as_map().unwrap();
        assert!(planned["token"].is_unknown());
        assert!(planned["workspace_token"].is_unknown());
        assert!(planned["created_at"].is_unknown());
        assert_eq!(
            planned["settings"],
            object(vec![("amortize", Dynamic::Bool(true)), ("aggregate_by", s("cost"))])
        );
        assert!(result.requires_replace.is_empty());
    }

    #[test]
    fn unchanged_resource_keeps_prior_values() {
        let prior = prior();
        let config = config("Costs", s("wrkspc_1"));
        let result = plan_resource_change(&schema(), &prior, &prior, &config);

        assert_eq!(result.planned_state, prior);
        assert!(result.requires_replace.is_empty());
    }

    #[test]
    fn update_keeps_token_and_unknowns_other_computed() {
        let prior = prior();
        let config = config("Renamed", s("wrkspc_1"));
        let mut proposed = prior.clone();
        if let Dynamic::Map(map) = &mut proposed {
            map.insert("title".to_string(), s("Renamed"));
        }

        let result = plan_resource_change(&schema(), &prior, &proposed, &config);
        let planned = result.planned_state.as_map().unwrap();

        assert_eq!(planned["token"], s("rprt_1"));
        assert_eq!(planned["title"], s("Renamed"));
        assert!(planned["created_at"].is_unknown());
    }

    #[test]
    fn changed_workspace_requires_replace() {
        let prior = prior();
        let config = config("Costs", s("wrkspc_2"));
        let mut proposed = prior.clone();
        if let Dynamic::Map(map) = &mut proposed {
            map.insert("workspace_token".to_string(), s("wrkspc_2"));
        }

        let result = plan_resource_change(&schema(), &prior, &proposed, &config);
        assert_eq!(result.requires_replace, vec![AttributePath::new("workspace_token")]);
    }

    #[test]
    fn partial_nested_config_fills_defaults() {
        let mut config = config("Costs", Dynamic::Null);
        if let Dynamic::Map(map) = &mut config {
            map.insert(
                "settings".to_string(),
                object(vec![("amortize", Dynamic::Bool(false)), ("aggregate_by", Dynamic::Null)]),
            );
        }

        let result = plan_resource_change(&schema(), &Dynamic::Null, &config, &config);
        let planned = result.planned_state.as_map().unwrap();
        assert_eq!(
            planned["settings"],
            object(vec![("amortize", Dynamic::Bool(false)), ("aggregate_by", s("cost"))])
        );
    }

    #[test]
    fn destroy_passes_through() {
        let result = plan_resource_change(&schema(), &prior(), &Dynamic::Null, &Dynamic::Null);
        assert!(result.planned_state.is_null());
        assert!(result.requires_replace.is_empty());
    }
}
