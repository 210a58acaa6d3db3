//! Default value providers for attributes
//!
//! Defaults are evaluated during planning for computed attributes whose
//! configuration value is null. A configured value, even one equal to the
//! default, always wins.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::StaticDefault;
//!
//! let amortize = AttributeBuilder::new("amortize", AttributeType::Bool)
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::bool(true))
//!     .build();
//! ```

use crate::types::Dynamic;
use crate::value::{IntoDynamic, ObjectBuilder};

pub trait DefaultValue: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    fn default_value(&self) -> Dynamic;
}

/// StaticDefault provides a fixed default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn DefaultValue> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn DefaultValue> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn DefaultValue> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn DefaultValue> {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Box<dyn DefaultValue> {
        Self::create(Dynamic::List(values))
    }

    /// Default for a nested object, given as attribute name/value pairs
    pub fn object<I, V>(attributes: I) -> Box<dyn DefaultValue>
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: IntoDynamic,
    {
        let value = attributes
            .into_iter()
            .fold(ObjectBuilder::new(), |b, (name, v)| b.set(name, v))
            .build();
        Self::create(value)
    }
}

impl DefaultValue for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self) -> Dynamic {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_default_string() {
        let default = StaticDefault::string("cost");
        assert_eq!(default.default_value(), Dynamic::String("cost".to_string()));
        assert!(default.description().contains("cost"));
    }

    #[test]
    fn static_default_number_and_bool() {
        assert_eq!(StaticDefault::number(1.0).default_value(), Dynamic::Number(1.0));
        assert_eq!(StaticDefault::bool(false).default_value(), Dynamic::Bool(false));
    }

    #[test]
    fn static_default_list() {
        let default = StaticDefault::list(vec![Dynamic::String("usr_1".into())]);
        assert_eq!(
            default.default_value().as_list().map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn static_default_object() {
        let default = StaticDefault::object([
            ("include_tax", Dynamic::Bool(true)),
            ("aggregate_by", Dynamic::String("cost".into())),
        ]);
        let value = default.default_value();
        let map = value.as_map().unwrap();
        assert_eq!(map["include_tax"], Dynamic::Bool(true));
        assert_eq!(map["aggregate_by"], Dynamic::String("cost".into()));
    }
}
