//! Typed three-state attribute values
//!
//! Terraform attribute values are null, unknown (during planning) or known.
//! `Value<T>` carries that distinction into typed models, and the
//! `FromDynamic` / `IntoDynamic` traits convert between models and the
//! untyped `Dynamic` representation used on the wire.

use crate::types::{AttributePath, Diagnostic, Dynamic};
use std::collections::{HashMap, HashSet};

/// Diagnostics produced while decoding a value
pub type DecodeResult<T> = std::result::Result<T, Vec<Diagnostic>>;

/// Three-state attribute value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value<T> {
    #[default]
    Null,
    Unknown,
    Known(T),
}

impl<T> Value<T> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    /// The known value, if any
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Value<U> {
        match self {
            Value::Null => Value::Null,
            Value::Unknown => Value::Unknown,
            Value::Known(v) => Value::Known(f(v)),
        }
    }

    /// Keep this value when known, otherwise fall back to `other`
    pub fn or(self, other: Value<T>) -> Value<T> {
        match self {
            Value::Known(v) => Value::Known(v),
            _ => other,
        }
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Known(v),
            None => Value::Null,
        }
    }
}

impl From<&str> for Value<String> {
    fn from(value: &str) -> Self {
        Value::Known(value.to_string())
    }
}

/// Decode a typed value from its untyped form
pub trait FromDynamic: Sized {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self>;
}

/// Encode a typed value into its untyped form
pub trait IntoDynamic {
    fn into_dynamic(self) -> Dynamic;
}

pub(crate) fn type_error(path: &AttributePath, expected: &str, actual: &Dynamic) -> Vec<Diagnostic> {
    vec![Diagnostic::error(
        "Invalid attribute type",
        format!("expected {}, got {}", expected, actual.kind()),
    )
    .with_attribute(path.clone())]
}

impl FromDynamic for String {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        match value {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(type_error(path, "string", other)),
        }
    }
}

impl FromDynamic for bool {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        match value {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(type_error(path, "bool", other)),
        }
    }
}

impl FromDynamic for f64 {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        match value {
            Dynamic::Number(n) => Ok(*n),
            // numbers too large for msgpack ints arrive in string form
            Dynamic::String(s) => s.parse().map_err(|_| type_error(path, "number", value)),
            other => Err(type_error(path, "number", other)),
        }
    }
}

impl FromDynamic for i64 {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let n = f64::from_dynamic(value, path)?;
        if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
            return Err(vec![Diagnostic::error(
                "Invalid attribute type",
                format!("expected a whole number, got {}", n),
            )
            .with_attribute(path.clone())]);
        }
        Ok(n as i64)
    }
}

impl<T: FromDynamic> FromDynamic for Vec<T> {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let items = match value {
            Dynamic::List(items) => items,
            other => return Err(type_error(path, "list", other)),
        };

        let mut out = Vec::with_capacity(items.len());
        let mut diagnostics = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            match T::from_dynamic(item, &path.clone().index(idx as i64)) {
                Ok(v) => out.push(v),
                Err(diags) => diagnostics.extend(diags),
            }
        }

        if diagnostics.is_empty() {
            Ok(out)
        } else {
            Err(diagnostics)
        }
    }
}

impl<T: FromDynamic> FromDynamic for Value<T> {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        match value {
            Dynamic::Null => Ok(Value::Null),
            Dynamic::Unknown => Ok(Value::Unknown),
            known => T::from_dynamic(known, path).map(Value::Known),
        }
    }
}

impl FromDynamic for Dynamic {
    fn from_dynamic(value: &Dynamic, _path: &AttributePath) -> DecodeResult<Self> {
        Ok(value.clone())
    }
}

impl IntoDynamic for String {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self)
    }
}

impl IntoDynamic for &str {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self.to_string())
    }
}

impl IntoDynamic for bool {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Bool(self)
    }
}

impl IntoDynamic for f64 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Number(self)
    }
}

impl IntoDynamic for i64 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Number(self as f64)
    }
}

impl<T: IntoDynamic> IntoDynamic for Vec<T> {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::List(self.into_iter().map(IntoDynamic::into_dynamic).collect())
    }
}

impl<T: IntoDynamic> IntoDynamic for Value<T> {
    fn into_dynamic(self) -> Dynamic {
        match self {
            Value::Null => Dynamic::Null,
            Value::Unknown => Dynamic::Unknown,
            Value::Known(v) => v.into_dynamic(),
        }
    }
}

impl<T: IntoDynamic> IntoDynamic for Option<T> {
    fn into_dynamic(self) -> Dynamic {
        match self {
            Some(v) => v.into_dynamic(),
            None => Dynamic::Null,
        }
    }
}

impl IntoDynamic for Dynamic {
    fn into_dynamic(self) -> Dynamic {
        self
    }
}

/// Reads the attributes of an object value into a typed model.
///
/// Every problem is collected as a diagnostic carrying its attribute path:
/// missing attributes, attributes of the wrong type, and attributes present
/// in the value that the model never read.
pub struct ObjectReader<'a> {
    attributes: &'a HashMap<String, Dynamic>,
    path: AttributePath,
    read: HashSet<&'a str>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        match value {
            Dynamic::Map(attributes) => Ok(Self {
                attributes,
                path: path.clone(),
                read: HashSet::new(),
                diagnostics: Vec::new(),
            }),
            other => Err(type_error(path, "object", other)),
        }
    }

    /// Read an attribute, recording a diagnostic when it is absent or mistyped
    pub fn get<T: FromDynamic + Default>(&mut self, name: &str) -> T {
        let path = self.path.clone().attribute(name);
        let Some((key, value)) = self.attributes.get_key_value(name) else {
            self.diagnostics.push(
                Diagnostic::error(
                    "Missing attribute",
                    format!("object is missing required attribute {:?}", name),
                )
                .with_attribute(path),
            );
            return T::default();
        };
        self.read.insert(key.as_str());

        match T::from_dynamic(value, &path) {
            Ok(v) => v,
            Err(diags) => {
                self.diagnostics.extend(diags);
                T::default()
            }
        }
    }

    /// Read an attribute that may be left out of the object entirely
    pub fn get_opt<T: FromDynamic + Default>(&mut self, name: &str) -> T {
        if self.attributes.contains_key(name) {
            self.get(name)
        } else {
            T::default()
        }
    }

    /// Finish reading, reporting attributes the model did not consume
    pub fn finish<T>(mut self, model: T) -> DecodeResult<T> {
        let mut extra: Vec<&String> = self
            .attributes
            .keys()
            .filter(|k| !self.read.contains(k.as_str()))
            .collect();
        extra.sort();
        for name in extra {
            self.diagnostics.push(
                Diagnostic::error(
                    "Unexpected attribute",
                    format!("object has unexpected attribute {:?}", name),
                )
                .with_attribute(self.path.clone().attribute(name)),
            );
        }

        if self.diagnostics.is_empty() {
            Ok(model)
        } else {
            Err(self.diagnostics)
        }
    }
}

/// Builds an object value attribute by attribute
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    attributes: HashMap<String, Dynamic>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: IntoDynamic>(mut self, name: &str, value: T) -> Self {
        self.attributes.insert(name.to_string(), value.into_dynamic());
        self
    }

    pub fn build(self) -> Dynamic {
        Dynamic::Map(self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Period {
        start_at: Value<String>,
        amount: Value<f64>,
    }

    impl FromDynamic for Period {
        fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
            let mut r = ObjectReader::new(value, path)?;
            let period = Period {
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

    #[test]
    fn value_three_states_decode() {
        let root = AttributePath::root();
        assert_eq!(
            Value::<String>::from_dynamic(&Dynamic::Null, &root).unwrap(),
            Value::Null
        );
        assert_eq!(
            Value::<String>::from_dynamic(&Dynamic::Unknown, &root).unwrap(),
            Value::Unknown
        );
        assert_eq!(
            Value::<String>::from_dynamic(&Dynamic::String("a".into()), &root).unwrap(),
            Value::Known("a".to_string())
        );
    }

    #[test]
    fn option_converts_to_value() {
        assert_eq!(Value::from(Some(3i64)), Value::Known(3));
        assert_eq!(Value::<i64>::from(None), Value::Null);
    }

    #[test]
    fn fractional_number_is_not_an_integer() {
        let err = i64::from_dynamic(&Dynamic::Number(1.5), &AttributePath::new("threshold"))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].attribute, Some(AttributePath::new("threshold")));
    }

    #[test]
    fn list_errors_carry_element_paths() {
        let value = Dynamic::List(vec![Dynamic::String("a".into()), Dynamic::Bool(true)]);
        let err = Vec::<String>::from_dynamic(&value, &AttributePath::new("groupings"))
            .unwrap_err();
        assert_eq!(err[0].attribute, Some(AttributePath::new("groupings").index(1)));
    }

    #[test]
    fn object_reader_reports_every_problem() {
        let value = ObjectBuilder::new()
            .set("amount", "lots")
            .set("currency", "USD")
            .build();

        let err = Period::from_dynamic(&value, &AttributePath::new("periods").index(0)).unwrap_err();
        let summaries: Vec<&str> = err.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec!["Missing attribute", "Invalid attribute type", "Unexpected attribute"]
        );
        assert_eq!(
            err[1].attribute,
            Some(AttributePath::new("periods").index(0).attribute("amount"))
        );
    }

    #[test]
    fn object_reader_rejects_non_objects() {
        assert!(Period::from_dynamic(&Dynamic::Bool(true), &AttributePath::root()).is_err());
    }

    #[test]
    fn model_round_trips_through_dynamic() {
        let dynamic = Period {
            start_at: Value::from("2024-01-01"),
            amount: Value::Unknown,
        }
        .into_dynamic();

        let decoded = Period::from_dynamic(&dynamic, &AttributePath::root()).unwrap();
        assert_eq!(decoded.start_at, Value::Known("2024-01-01".to_string()));
        assert!(decoded.amount.is_unknown());
    }
}
