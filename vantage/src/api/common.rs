//! Common types and utilities for the Vantage API

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::marker::PhantomData;

use super::client::Client;
use super::error::ApiError;

/// Body of a 4xx response: `{"errors": ["..."]}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    errors: Option<ErrorMessages>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessages {
    One(String),
    Many(Vec<String>),
}

impl ApiErrorResponse {
    pub fn messages(self) -> Vec<String> {
        match self.errors {
            Some(ErrorMessages::One(message)) => vec![message],
            Some(ErrorMessages::Many(messages)) => messages,
            None => vec![],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    pub next: Option<String>,
}

/// A Vantage collection addressed by token under `/v2`
pub trait VantageResource: DeserializeOwned + Send + Sync {
    type CreateRequest: Serialize + Send + Sync;
    type UpdateRequest: Serialize + Send + Sync;

    /// Collection path, e.g. `/v2/budgets`
    fn api_path() -> &'static str;

    /// Key of the item array in a list response
    fn list_key() -> &'static str;

    fn resource_path(token: &str) -> String {
        format!("{}/{}", Self::api_path(), urlencoding::encode(token))
    }
}

/// CRUD operations on one collection
pub struct CollectionApi<'a, R> {
    client: &'a Client,
    _resource: PhantomData<R>,
}

impl<'a, R: VantageResource> CollectionApi<'a, R> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    /// Every item, following `links.next` until exhausted
    pub async fn list(&self) -> Result<Vec<R>, ApiError> {
        self.client.list_all(R::api_path(), R::list_key()).await
    }

    pub async fn get(&self, token: &str) -> Result<R, ApiError> {
        self.client.get(&R::resource_path(token)).await
    }

    pub async fn create(&self, request: &R::CreateRequest) -> Result<R, ApiError> {
        self.client.post(R::api_path(), request).await
    }

    pub async fn update(&self, token: &str, request: &R::UpdateRequest) -> Result<R, ApiError> {
        self.client.put(&R::resource_path(token), request).await
    }

    pub async fn delete(&self, token: &str) -> Result<(), ApiError> {
        self.client.delete(&R::resource_path(token)).await
    }
}

/// Amounts arrive as `"100.0"` from some endpoints and `100.0` from others
pub mod number_or_string {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(NumberOrString::Number(n)) => Ok(Some(n)),
            Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
            Some(NumberOrString::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Accepts `"a,b"` as well as `["a", "b"]`
pub mod string_or_list {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(
            Option::<StringOrList>::deserialize(deserializer)?.map(|v| match v {
                StringOrList::List(items) => items,
                StringOrList::String(s) => s
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect(),
            }),
        )
    }
}

/// The reverse of [`string_or_list`]: a list is joined with commas
pub fn deserialize_joined<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_list::deserialize(deserializer)?.map(|items| items.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "number_or_string::deserialize")]
        amount: Option<f64>,
        #[serde(default, deserialize_with = "string_or_list::deserialize")]
        groupings: Option<Vec<String>>,
        #[serde(default, deserialize_with = "deserialize_joined")]
        joined: Option<String>,
    }

    #[test]
    fn amounts_accept_numbers_and_strings() {
        let s: Sample = serde_json::from_str(r#"{"amount":"150.25"}"#).unwrap();
        assert_eq!(s.amount, Some(150.25));
        let s: Sample = serde_json::from_str(r#"{"amount":99}"#).unwrap();
        assert_eq!(s.amount, Some(99.0));
        let s: Sample = serde_json::from_str(r#"{"amount":null}"#).unwrap();
        assert_eq!(s.amount, None);
        assert!(serde_json::from_str::<Sample>(r#"{"amount":"lots"}"#).is_err());
    }

    #[test]
    fn groupings_accept_joined_strings() {
        let s: Sample = serde_json::from_str(r#"{"groupings":"cluster_id, namespace"}"#).unwrap();
        assert_eq!(
            s.groupings,
            Some(vec!["cluster_id".to_string(), "namespace".to_string()])
        );
        let s: Sample = serde_json::from_str(r#"{"groupings":["pod"]}"#).unwrap();
        assert_eq!(s.groupings, Some(vec!["pod".to_string()]));
        let s: Sample = serde_json::from_str(r#"{"groupings":""}"#).unwrap();
        assert_eq!(s.groupings, Some(vec![]));
    }

    #[test]
    fn joined_accepts_lists() {
        let s: Sample = serde_json::from_str(r#"{"joined":["provider","service"]}"#).unwrap();
        assert_eq!(s.joined.as_deref(), Some("provider,service"));
    }

    #[test]
    fn error_body_accepts_single_message() {
        let body: ApiErrorResponse =
            serde_json::from_str(r#"{"errors":"Title is required, got none"}"#).unwrap();
        assert_eq!(body.messages(), vec!["Title is required, got none".to_string()]);
        let body: ApiErrorResponse = serde_json::from_str(r#"{"errors":["a","b"]}"#).unwrap();
        assert_eq!(body.messages().len(), 2);
    }
}
