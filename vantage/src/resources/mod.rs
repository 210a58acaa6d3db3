//! Resource implementations
//!
//! Every Vantage object follows the same lifecycle: POST on the collection to
//! create, then GET, PUT and DELETE keyed by the server-assigned token. The
//! per-object modules describe the schema and how the Terraform model maps to
//! the API payloads; [`EntityResource`] drives the lifecycle for all of them.

pub mod anomaly_notification;
pub mod attributes;
pub mod budget;
pub mod cost_report;
pub mod financial_commitment_report;
pub mod kubernetes_efficiency_report;
pub mod managed_account;
pub mod resource_report;
pub mod virtual_tag_config;

pub use anomaly_notification::AnomalyNotificationEntity;
pub use budget::BudgetEntity;
pub use cost_report::CostReportEntity;
pub use financial_commitment_report::FinancialCommitmentReportEntity;
pub use kubernetes_efficiency_report::KubernetesEfficiencyReportEntity;
pub use managed_account::ManagedAccountEntity;
pub use resource_report::ResourceReportEntity;
pub use virtual_tag_config::VirtualTagConfigEntity;

use crate::api::{ApiError, Client, CollectionApi, VantageResource};
use crate::provider_data::VantageProviderData;
use async_trait::async_trait;
use std::marker::PhantomData;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::Schema;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic};

/// A Vantage object type managed as a Terraform resource
pub trait ManagedEntity: Send + Sync + 'static {
    /// API representation
    type Api: VantageResource + 'static;
    /// Terraform representation, one field per schema attribute
    type Model: FromDynamic + IntoDynamic + Default + Send + Sync;

    const TYPE_NAME: &'static str;
    const DATA_SOURCE_TYPE_NAME: &'static str;
    /// Lowercase noun used in diagnostics, e.g. "cost report"
    const DISPLAY_NAME: &'static str;

    fn schema() -> Schema;

    fn create_request(model: &Self::Model) -> <Self::Api as VantageResource>::CreateRequest;

    fn update_request(model: &Self::Model) -> <Self::Api as VantageResource>::UpdateRequest;

    fn from_api(item: Self::Api) -> Self::Model;

    /// Cross-attribute checks the schema cannot express
    fn validate(_model: &Self::Model) -> Vec<Diagnostic> {
        vec![]
    }

    fn collection(client: &Client) -> CollectionApi<'_, Self::Api> {
        CollectionApi::new(client)
    }
}

/// Diagnostic for a failed API call, e.g. "Failed to create budget"
pub fn api_error(verb: &str, entity: &str, err: &ApiError) -> Diagnostic {
    Diagnostic::error(format!("Failed to {} {}", verb, entity), err.detail())
}

pub fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "The provider has not been configured with an API token. \
         Set api_token in the provider block or the VANTAGE_API_TOKEN environment variable.",
    )
}

pub(crate) fn decode<M: FromDynamic>(value: &DynamicValue) -> DecodeResult<M> {
    M::from_dynamic(&value.value, &AttributePath::root())
}

fn state_token(state: &DynamicValue) -> Option<String> {
    state
        .get_string(&AttributePath::new("token"))
        .ok()
        .filter(|token| !token.is_empty())
}

fn missing_token(entity: &str) -> Diagnostic {
    Diagnostic::error(
        "Missing token",
        format!("The {} state has no token; it cannot be located in Vantage.", entity),
    )
    .with_attribute(AttributePath::new("token"))
}

/// Terraform resource backed by one Vantage collection
pub struct EntityResource<E: ManagedEntity> {
    provider_data: Option<VantageProviderData>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: ManagedEntity> Default for EntityResource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ManagedEntity> EntityResource<E> {
    pub fn new() -> Self {
        Self {
            provider_data: None,
            _entity: PhantomData,
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            provider_data: Some(VantageProviderData::new(client)),
            _entity: PhantomData,
        }
    }

    fn client(&self) -> Result<&Client, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(|data| data.client.as_ref())
            .ok_or_else(not_configured)
    }

    fn encode(item: E::Api) -> DynamicValue {
        DynamicValue::new(E::from_api(item).into_dynamic())
    }
}

#[async_trait]
impl<E: ManagedEntity> Resource for EntityResource<E> {
    fn type_name(&self) -> &str {
        E::TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: E::schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        // type errors are reported by the schema check
        let diagnostics = match decode::<E::Model>(&request.config) {
            Ok(model) => E::validate(&model),
            Err(_) => vec![],
        };
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut response = CreateResourceResponse {
            new_state: DynamicValue::null(),
            private: vec![],
            diagnostics: vec![],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };
        let planned = match decode::<E::Model>(&request.planned_state) {
            Ok(model) => model,
            Err(diags) => {
                response.diagnostics.extend(diags);
                return response;
            }
        };

        let body = E::create_request(&planned);
        match E::collection(client).create(&body).await {
            Ok(created) => {
                response.new_state = Self::encode(created);
                tracing::info!(
                    resource = E::TYPE_NAME,
                    token = state_token(&response.new_state).as_deref().unwrap_or_default(),
                    "created"
                );
            }
            Err(err) => {
                tracing::error!(resource = E::TYPE_NAME, error = %err, "create failed");
                response
                    .diagnostics
                    .push(api_error("create", E::DISPLAY_NAME, &err));
            }
        }
        response
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut response = ReadResourceResponse {
            new_state: Some(request.current_state.clone()),
            diagnostics: vec![],
            private: request.private,
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };
        let Some(token) = state_token(&request.current_state) else {
            response.diagnostics.push(missing_token(E::DISPLAY_NAME));
            return response;
        };

        match E::collection(client).get(&token).await {
            Ok(item) => response.new_state = Some(Self::encode(item)),
            Err(err) if err.is_not_found() => {
                tracing::warn!(
                    resource = E::TYPE_NAME,
                    %token,
                    "not found, removing from state"
                );
                response.new_state = None;
            }
            Err(err) => response
                .diagnostics
                .push(api_error("read", E::DISPLAY_NAME, &err)),
        }
        response
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut response = UpdateResourceResponse {
            new_state: request.prior_state.clone(),
            private: request.planned_private,
            diagnostics: vec![],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };
        let Some(token) = state_token(&request.prior_state) else {
            response.diagnostics.push(missing_token(E::DISPLAY_NAME));
            return response;
        };
        let planned = match decode::<E::Model>(&request.planned_state) {
            Ok(model) => model,
            Err(diags) => {
                response.diagnostics.extend(diags);
                return response;
            }
        };

        let body = E::update_request(&planned);
        match E::collection(client).update(&token, &body).await {
            Ok(updated) => {
                tracing::info!(resource = E::TYPE_NAME, %token, "updated");
                response.new_state = Self::encode(updated);
            }
            Err(err) => response
                .diagnostics
                .push(api_error("update", E::DISPLAY_NAME, &err)),
        }
        response
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut response = DeleteResourceResponse {
            diagnostics: vec![],
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                response.diagnostics.push(diag);
                return response;
            }
        };
        let Some(token) = state_token(&request.prior_state) else {
            response.diagnostics.push(missing_token(E::DISPLAY_NAME));
            return response;
        };

        match E::collection(client).delete(&token).await {
            Ok(()) => tracing::info!(resource = E::TYPE_NAME, %token, "deleted"),
            Err(err) if err.is_not_found() => {
                tracing::debug!(resource = E::TYPE_NAME, %token, "already deleted")
            }
            Err(err) => response
                .diagnostics
                .push(api_error("delete", E::DISPLAY_NAME, &err)),
        }
        response
    }

    fn importer(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl<E: ManagedEntity> ResourceWithConfigure for EntityResource<E> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        // Terraform may validate and plan before the provider is configured
        self.provider_data = VantageProviderData::from_any(request.provider_data);
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl<E: ManagedEntity> ResourceWithImportState for EntityResource<E> {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("token"), &request, &mut response);
        response
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_client;
    use super::*;
    use mockito::Server;
    use tfplug::types::{ClientCapabilities, Dynamic};
    use tfplug::value::ObjectBuilder;

    type ResourceReports = EntityResource<ResourceReportEntity>;

    fn state(token: &str) -> DynamicValue {
        let schema = ResourceReportEntity::schema();
        DynamicValue::new(
            schema.normalize(
                &ObjectBuilder::new()
                    .set("token", token)
                    .set("title", "EC2")
                    .build(),
            ),
        )
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_diagnostic() {
        let resource = ResourceReports::new();
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "vantage_resource_report".to_string(),
                    current_state: state("rprt_1"),
                    private: vec![],
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
        assert_eq!(response.new_state, Some(state("rprt_1")));
    }

    #[tokio::test]
    async fn read_not_found_removes_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/resource_reports/rprt_gone")
            .with_status(404)
            .with_body(r#"{"errors":["Not found"]}"#)
            .create_async()
            .await;

        let resource = ResourceReports::with_client(test_client(&server.url()));
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "vantage_resource_report".to_string(),
                    current_state: state("rprt_gone"),
                    private: vec![],
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn read_server_error_keeps_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/resource_reports/rprt_1")
            .with_status(400)
            .with_body(r#"{"errors":["bad request"]}"#)
            .create_async()
            .await;

        let resource = ResourceReports::with_client(test_client(&server.url()));
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "vantage_resource_report".to_string(),
                    current_state: state("rprt_1"),
                    private: vec![],
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Failed to read resource report");
        assert!(response.diagnostics[0].detail.contains("bad request"));
        assert_eq!(response.new_state, Some(state("rprt_1")));
    }

    #[tokio::test]
    async fn delete_not_found_is_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v2/resource_reports/rprt_1")
            .with_status(404)
            .create_async()
            .await;

        let resource = ResourceReports::with_client(test_client(&server.url()));
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "vantage_resource_report".to_string(),
                    prior_state: state("rprt_1"),
                    planned_private: vec![],
                },
            )
            .await;
        mock.assert_async().await;
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn update_failure_keeps_prior_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/v2/resource_reports/rprt_1")
            .with_status(422)
            .with_body(r#"{"errors":["Title is too long"]}"#)
            .create_async()
            .await;

        let resource = ResourceReports::with_client(test_client(&server.url()));
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "vantage_resource_report".to_string(),
                    prior_state: state("rprt_1"),
                    planned_state: state("rprt_1"),
                    config: state("rprt_1"),
                    planned_private: vec![],
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Failed to update resource report");
        assert_eq!(response.new_state, state("rprt_1"));
    }

    #[tokio::test]
    async fn delete_without_token_is_an_error() {
        let resource = ResourceReports::with_client(test_client("http://localhost:1"));
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "vantage_resource_report".to_string(),
                    prior_state: DynamicValue::new(Dynamic::Map(Default::default())),
                    planned_private: vec![],
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Missing token");
    }

    #[tokio::test]
    async fn import_passes_token_through() {
        let resource = ResourceReports::new();
        let importer = resource.importer().unwrap();
        let response = importer
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "vantage_resource_report".to_string(),
                    id: "rprt_abc".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(
            state_token(&response.imported_resources[0].state).as_deref(),
            Some("rprt_abc")
        );
    }

    #[tokio::test]
    async fn configure_accepts_provider_data() {
        let mut resource = ResourceReports::new();
        let data: std::sync::Arc<dyn std::any::Any + Send + Sync> = std::sync::Arc::new(
            VantageProviderData::new(test_client("http://localhost:1")),
        );
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        assert!(resource.client().is_ok());
    }
}
