//! Vantage REST API v2 client

pub mod anomaly_notifications;
pub mod budgets;
pub mod client;
pub mod common;
pub mod cost_reports;
pub mod error;
pub mod financial_commitment_reports;
pub mod kubernetes_efficiency_reports;
pub mod managed_accounts;
pub mod resource_reports;
pub mod virtual_tag_configs;

pub use client::{Client, RetryConfig, DEFAULT_HOST};
pub use common::{CollectionApi, VantageResource};
pub use error::ApiError;
