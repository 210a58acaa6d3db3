//! Attribute shapes shared by several resources

use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::validator::{Date, ListElements, StringOneOf};

pub const DATE_INTERVALS: &[&str] = &[
    "this_month",
    "last_7_days",
    "last_30_days",
    "last_month",
    "last_3_months",
    "last_6_months",
    "custom",
    "last_12_months",
    "last_24_months",
    "last_36_months",
    "next_month",
    "next_3_months",
    "next_6_months",
    "next_12_months",
    "year_to_date",
];

/// Server-assigned identifier, stable for the life of the object
pub fn token(entity: &str) -> Attribute {
    AttributeBuilder::new("token", AttributeType::String)
        .description(&format!("Unique token of the {}.", entity))
        .computed()
        .plan_modifier(UseStateForUnknown::create())
        .build()
}

/// Objects cannot move between workspaces
pub fn workspace_token(entity: &str) -> Attribute {
    AttributeBuilder::new("workspace_token", AttributeType::String)
        .description(&format!(
            "Token of the workspace the {} belongs to. Defaults to the token's only workspace.",
            entity
        ))
        .optional()
        .computed()
        .plan_modifier(RequiresReplace::create())
        .plan_modifier(UseStateForUnknown::create())
        .build()
}

/// Read-only value that never changes once set
pub fn stable(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .computed()
        .plan_modifier(UseStateForUnknown::create())
        .build()
}

pub fn optional_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .computed()
        .build()
}

pub fn optional_date(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .computed()
        .validator(Date::create())
        .build()
}

pub fn one_of(name: &str, description: &str, allowed: &[&str]) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .computed()
        .validator(StringOneOf::create(allowed))
        .build()
}

pub fn date_interval() -> Attribute {
    one_of("date_interval", "Date interval of the report.", DATE_INTERVALS)
}

pub fn string_list(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::list(AttributeType::String))
        .description(description)
        .optional()
        .computed()
        .build()
}

pub fn string_list_of(name: &str, description: &str, allowed: &[&str]) -> Attribute {
    AttributeBuilder::new(name, AttributeType::list(AttributeType::String))
        .description(description)
        .optional()
        .computed()
        .validator(ListElements::create(StringOneOf::create(allowed)))
        .build()
}
