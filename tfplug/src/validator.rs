//! Attribute validators
//!
//! Validators run against configuration values during ValidateResourceConfig
//! and ValidateDataResourceConfig. The schema only hands them known values;
//! null and unknown values are skipped.

use crate::types::{AttributePath, Diagnostic, Dynamic};
use chrono::NaiveDate;

pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

fn invalid(path: &AttributePath, summary: String, detail: String) -> Diagnostic {
    Diagnostic::error(summary, detail).with_attribute(path.clone())
}

pub struct StringLength {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLength {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for StringLength {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_string() else {
            return;
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have minimum length of {}", path, min),
                    format!("Got length {}", len),
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have maximum length of {}", path, max),
                    format!("Got length {}", len),
                ));
            }
        }
    }
}

pub struct StringPattern {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPattern {
    /// An invalid pattern yields a validator that reports it on every value
    pub fn create(pattern: &str, description: &str) -> Box<dyn Validator> {
        match regex::Regex::new(pattern) {
            Ok(pattern) => Box::new(Self {
                pattern,
                description: description.to_string(),
            }),
            Err(e) => Box::new(BrokenValidator(format!("invalid pattern {:?}: {}", pattern, e))),
        }
    }
}

impl Validator for StringPattern {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if !self.pattern.is_match(s) {
                diagnostics.push(invalid(
                    path,
                    format!("{} must match {}", path, self.description),
                    format!("Value '{}' does not match pattern", s),
                ));
            }
        }
    }
}

struct BrokenValidator(String);

impl Validator for BrokenValidator {
    fn description(&self) -> String {
        self.0.clone()
    }

    fn validate(&self, _value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        diagnostics.push(invalid(path, "Invalid validator".to_string(), self.0.clone()));
    }
}

/// Restricts a string to a fixed set of values
pub struct StringOneOf {
    pub allowed: Vec<String>,
}

impl StringOneOf {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(invalid(
                    path,
                    format!("{} has an invalid value", path),
                    format!("Value '{}' must be {}", s, self.description()),
                ));
            }
        }
    }
}

pub struct NumberRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRange {
    pub fn create(min: Option<f64>, max: Option<f64>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }

    pub fn at_least(min: f64) -> Box<dyn Validator> {
        Self::create(Some(min), None)
    }
}

impl Validator for NumberRange {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(n) = value.as_number() else {
            return;
        };
        if let Some(min) = self.min {
            if n < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must be at least {}", path, min),
                    format!("Got {}", n),
                ));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must be at most {}", path, max),
                    format!("Got {}", n),
                ));
            }
        }
    }
}

pub struct ListLength {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLength {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for ListLength {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(items) = value.as_list() else {
            return;
        };
        if let Some(min) = self.min {
            if items.len() < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have at least {} items", path, min),
                    format!("Got {} items", items.len()),
                ));
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have at most {} items", path, max),
                    format!("Got {} items", items.len()),
                ));
            }
        }
    }
}

/// Applies a validator to every known element of a list
pub struct ListElements {
    inner: Box<dyn Validator>,
}

impl ListElements {
    pub fn create(inner: Box<dyn Validator>) -> Box<dyn Validator> {
        Box::new(Self { inner })
    }
}

impl Validator for ListElements {
    fn description(&self) -> String {
        format!("each element: {}", self.inner.description())
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(items) = value.as_list() else {
            return;
        };
        for (idx, item) in items.iter().enumerate() {
            if item.is_null() || item.is_unknown() {
                continue;
            }
            self.inner
                .validate(item, &path.clone().index(idx as i64), diagnostics);
        }
    }
}

/// Calendar date in YYYY-MM-DD form
pub struct Date;

impl Date {
    pub fn create() -> Box<dyn Validator> {
        Box::new(Self)
    }
}

impl Validator for Date {
    fn description(&self) -> String {
        "date in YYYY-MM-DD format".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_string() {
            if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
                diagnostics.push(invalid(
                    path,
                    format!("{} must be a {}", path, self.description()),
                    format!("Value '{}' is not a valid date", s),
                ));
            }
        }
    }
}
