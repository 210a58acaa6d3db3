pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

use async_trait::async_trait;
use data_sources::EntityListDataSource;
use provider_data::VantageProviderData;
use resources::{
    AnomalyNotificationEntity, BudgetEntity, CostReportEntity, EntityResource,
    FinancialCommitmentReportEntity, KubernetesEfficiencyReportEntity, ManagedAccountEntity,
    ManagedEntity, ResourceReportEntity, VirtualTagConfigEntity,
};
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{DataSourceFactory, DataSourceWithConfigure};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderSchemaRequest,
    ProviderSchemaResponse, ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfplug::resource::{ResourceFactory, ResourceWithConfigure};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::value::{DecodeResult, FromDynamic, ObjectReader, Value};

pub const API_TOKEN_ENV: &str = "VANTAGE_API_TOKEN";
pub const HOST_ENV: &str = "VANTAGE_HOST";

#[derive(Debug, Default)]
struct ProviderModel {
    api_token: Value<String>,
    host: Value<String>,
}

impl FromDynamic for ProviderModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        // An absent provider block arrives as null
        if value.is_null() {
            return Ok(Self::default());
        }
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            api_token: r.get("api_token"),
            host: r.get("host"),
        };
        r.finish(model)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn unknown_config(attribute: &str) -> Diagnostic {
    Diagnostic::error(
        "Unknown provider configuration",
        format!(
            "The provider cannot be configured while {} is unknown. \
             Apply the resources it depends on first.",
            attribute
        ),
    )
    .with_attribute(AttributePath::new(attribute))
}

pub struct VantageProvider;

impl Default for VantageProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl VantageProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages cost reports, budgets and other objects in Vantage.")
            .attribute(
                AttributeBuilder::new("api_token", AttributeType::String)
                    .description(&format!(
                        "Vantage API token. Falls back to the {} environment variable.",
                        API_TOKEN_ENV
                    ))
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("host", AttributeType::String)
                    .description(&format!(
                        "Base URL of the Vantage API. Falls back to the {} environment \
                         variable, then to {}.",
                        HOST_ENV,
                        api::DEFAULT_HOST
                    ))
                    .optional()
                    .build(),
            )
            .build()
    }
}

fn register_resource<E: ManagedEntity>(factories: &mut HashMap<String, ResourceFactory>) {
    factories.insert(
        E::TYPE_NAME.to_string(),
        Box::new(|| -> Box<dyn ResourceWithConfigure> { Box::new(EntityResource::<E>::new()) }),
    );
}

fn register_data_source<E: ManagedEntity>(factories: &mut HashMap<String, DataSourceFactory>) {
    factories.insert(
        E::DATA_SOURCE_TYPE_NAME.to_string(),
        Box::new(|| -> Box<dyn DataSourceWithConfigure> {
            Box::new(EntityListDataSource::<E>::new())
        }),
    );
}

#[async_trait]
impl Provider for VantageProvider {
    fn type_name(&self) -> &str {
        "vantage"
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];
        match ProviderModel::from_dynamic(&request.config.value, &AttributePath::root()) {
            Ok(model) => {
                if let Value::Known(host) = &model.host {
                    if let Err(err) = api::client::validate_host(host) {
                        diagnostics.push(
                            Diagnostic::error("Invalid host", err.to_string())
                                .with_attribute(AttributePath::new("host")),
                        );
                    }
                }
            }
            Err(diags) => diagnostics.extend(diags),
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut response = ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: None,
        };

        let model = match ProviderModel::from_dynamic(&request.config.value, &AttributePath::root())
        {
            Ok(model) => model,
            Err(diags) => {
                response.diagnostics = diags;
                return response;
            }
        };

        if model.api_token.is_unknown() {
            response.diagnostics.push(unknown_config("api_token"));
        }
        if model.host.is_unknown() {
            response.diagnostics.push(unknown_config("host"));
        }
        if !response.diagnostics.is_empty() {
            return response;
        }

        let api_token = model
            .api_token
            .into_option()
            .filter(|token| !token.is_empty())
            .or_else(|| env_var(API_TOKEN_ENV));
        let Some(api_token) = api_token else {
            response.diagnostics.push(
                Diagnostic::error(
                    "Missing API token",
                    format!(
                        "Set api_token in the provider block or the {} environment variable.",
                        API_TOKEN_ENV
                    ),
                )
                .with_attribute(AttributePath::new("api_token")),
            );
            return response;
        };

        let host = model
            .host
            .into_option()
            .or_else(|| env_var(HOST_ENV))
            .unwrap_or_else(|| api::DEFAULT_HOST.to_string());

        match api::Client::new(&host, &api_token) {
            Ok(client) => {
                tracing::info!(
                    host = %host,
                    terraform_version = %request.terraform_version,
                    "configured vantage provider"
                );
                response.provider_data = Some(Arc::new(VantageProviderData::new(client)));
            }
            Err(err) => {
                tracing::error!(host = %host, error = %err, "failed to build API client");
                response.diagnostics.push(
                    Diagnostic::error("Failed to create API client", err.to_string())
                        .with_attribute(AttributePath::new("host")),
                );
            }
        }
        response
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories = HashMap::new();
        register_resource::<CostReportEntity>(&mut factories);
        register_resource::<BudgetEntity>(&mut factories);
        register_resource::<VirtualTagConfigEntity>(&mut factories);
        register_resource::<KubernetesEfficiencyReportEntity>(&mut factories);
        register_resource::<ResourceReportEntity>(&mut factories);
        register_resource::<ManagedAccountEntity>(&mut factories);
        register_resource::<AnomalyNotificationEntity>(&mut factories);
        register_resource::<FinancialCommitmentReportEntity>(&mut factories);
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories = HashMap::new();
        register_data_source::<CostReportEntity>(&mut factories);
        register_data_source::<BudgetEntity>(&mut factories);
        register_data_source::<VirtualTagConfigEntity>(&mut factories);
        register_data_source::<KubernetesEfficiencyReportEntity>(&mut factories);
        register_data_source::<ResourceReportEntity>(&mut factories);
        register_data_source::<ManagedAccountEntity>(&mut factories);
        register_data_source::<AnomalyNotificationEntity>(&mut factories);
        register_data_source::<FinancialCommitmentReportEntity>(&mut factories);
        factories
    }
}

/// Provider block as Terraform sends it: every attribute present, null when unset
pub fn provider_config(api_token: Option<&str>, host: Option<&str>) -> DynamicValue {
    let attr = |v: Option<&str>| v.map_or(Dynamic::Null, |s| Dynamic::String(s.to_string()));
    DynamicValue::new(
        tfplug::value::ObjectBuilder::new()
            .set("api_token", attr(api_token))
            .set("host", attr(host))
            .build(),
    )
}
