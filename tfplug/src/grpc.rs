//! gRPC implementation of the Terraform Plugin Protocol v6 service
//!
//! Bridges the generated `tfplugin6.Provider` service onto the framework's
//! Provider, Resource and DataSource traits. Every failure is reported to
//! Terraform as a diagnostic; no RPC returns a transport-level error.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceFactory, DataSourceSchemaRequest,
    DataSourceWithConfigure, ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::plan::plan_resource_change;
use crate::proto;
use crate::proto::provider_server::Provider as ProtoProvider;
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderSchemaRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceFactory, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{Attribute, ObjectNestingMode, Schema, StringKind};
use crate::types::{
    AttributePath, AttributePathStep, ClientCapabilities, Diagnostic, DiagnosticSeverity,
    DiagnosticsExt, DynamicValue,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type RpcResult<T> = std::result::Result<Response<T>, Status>;

/// The gRPC service wrapping a provider implementation
pub struct GrpcProviderServer<P: Provider> {
    provider: RwLock<P>,
    provider_data: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    ctx: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();
        Self {
            provider: RwLock::new(provider),
            provider_data: RwLock::new(None),
            resources,
            data_sources,
            ctx: Context::new(),
        }
    }

    /// The context handed to every request; cancelled by StopProvider
    pub fn context(&self) -> Context {
        self.ctx.clone()
    }

    fn new_resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        self.resources.get(type_name).map(|factory| factory()).ok_or_else(|| {
            vec![Diagnostic::error(
                "Unknown resource type",
                format!("The provider does not serve resource type {:?}", type_name),
            )]
        })
    }

    async fn configured_resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let mut resource = self.new_resource(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(self.ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }
        Ok(resource)
    }

    fn new_data_source(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        self.data_sources.get(type_name).map(|factory| factory()).ok_or_else(|| {
            vec![Diagnostic::error(
                "Unknown data source type",
                format!("The provider does not serve data source type {:?}", type_name),
            )]
        })
    }

    async fn configured_data_source(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let mut data_source = self.new_data_source(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(self.ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }
        Ok(data_source)
    }

    async fn resource_schema(&self, resource: &dyn ResourceWithConfigure) -> Schema {
        resource
            .schema(self.ctx.clone(), ResourceSchemaRequest)
            .await
            .schema
    }
}

/// Unwraps a `Result<T, Vec<Diagnostic>>` or returns the response built
/// from those diagnostics
macro_rules! try_diags {
    ($expr:expr, $response:expr) => {
        match $expr {
            Ok(v) => v,
            Err(diags) => {
                let mut response = $response;
                response.diagnostics = to_proto_diagnostics(diags);
                return Ok(Response::new(response));
            }
        }
    };
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProtoProvider for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> RpcResult<proto::get_metadata::Response> {
        tracing::debug!("GetMetadata");

        let mut resources: Vec<_> = self.resources.keys().cloned().collect();
        resources.sort();
        let mut data_sources: Vec<_> = self.data_sources.keys().cloned().collect();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> RpcResult<proto::get_provider_schema::Response> {
        tracing::debug!("GetProviderSchema");
        let mut diagnostics = Vec::new();

        let provider_response = self
            .provider
            .read()
            .await
            .schema(self.ctx.clone(), ProviderSchemaRequest)
            .await;
        diagnostics.extend(provider_response.diagnostics);
        let provider = collect(schema_to_proto(&provider_response.schema), &mut diagnostics);

        let mut resource_schemas = HashMap::new();
        for (type_name, factory) in &self.resources {
            let response = factory()
                .schema(self.ctx.clone(), ResourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            if let Some(schema) = collect(schema_to_proto(&response.schema), &mut diagnostics) {
                resource_schemas.insert(type_name.clone(), schema);
            }
        }

        let mut data_source_schemas = HashMap::new();
        for (type_name, factory) in &self.data_sources {
            let response = factory()
                .schema(self.ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            if let Some(schema) = collect(schema_to_proto(&response.schema), &mut diagnostics) {
                data_source_schemas.insert(type_name.clone(), schema);
            }
        }

        Ok(Response::new(proto::get_provider_schema::Response {
            provider,
            resource_schemas,
            data_source_schemas,
            diagnostics: to_proto_diagnostics(diagnostics),
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> RpcResult<proto::validate_provider_config::Response> {
        tracing::debug!("ValidateProviderConfig");
        let req = request.into_inner();
        let empty = proto::validate_provider_config::Response {
            diagnostics: vec![],
        };
        let config = try_diags!(decode_value(req.config), empty);

        let provider = self.provider.read().await;
        let schema = provider
            .schema(self.ctx.clone(), ProviderSchemaRequest)
            .await
            .schema;
        let mut diagnostics = schema.validate(&config.value);
        diagnostics.extend(
            provider
                .validate(self.ctx.clone(), ValidateProviderConfigRequest { config })
                .await
                .diagnostics,
        );

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: to_proto_diagnostics(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> RpcResult<proto::validate_resource_config::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ValidateResourceConfig");
        let empty = proto::validate_resource_config::Response {
            diagnostics: vec![],
        };

        let resource = try_diags!(self.new_resource(&req.type_name), empty);
        let config = try_diags!(decode_value(req.config), empty);
        let schema = self.resource_schema(resource.as_ref()).await;

        let mut diagnostics = schema
            .object_type()
            .check(&config.value, &AttributePath::root());
        if diagnostics.is_empty() {
            diagnostics.extend(schema.validate(&config.value));
            let response = resource
                .validate(
                    self.ctx.clone(),
                    ValidateResourceConfigRequest {
                        type_name: req.type_name,
                        config,
                        client_capabilities: client_capabilities(req.client_capabilities),
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: to_proto_diagnostics(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> RpcResult<proto::validate_data_resource_config::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ValidateDataResourceConfig");
        let empty = proto::validate_data_resource_config::Response {
            diagnostics: vec![],
        };

        let data_source = try_diags!(self.new_data_source(&req.type_name), empty);
        let config = try_diags!(decode_value(req.config), empty);
        let schema = data_source
            .schema(self.ctx.clone(), DataSourceSchemaRequest)
            .await
            .schema;

        let mut diagnostics = schema
            .object_type()
            .check(&config.value, &AttributePath::root());
        if diagnostics.is_empty() {
            diagnostics.extend(schema.validate(&config.value));
            let response = data_source
                .validate(
                    self.ctx.clone(),
                    ValidateDataSourceConfigRequest {
                        type_name: req.type_name,
                        config,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: to_proto_diagnostics(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> RpcResult<proto::upgrade_resource_state::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, version = req.version, "UpgradeResourceState");
        let empty = proto::upgrade_resource_state::Response {
            upgraded_state: None,
            diagnostics: vec![],
        };

        let resource = try_diags!(self.new_resource(&req.type_name), empty);
        let schema = self.resource_schema(resource.as_ref()).await;

        if req.version != schema.version {
            let diag = Diagnostic::error(
                "Unable to upgrade resource state",
                format!(
                    "stored state has schema version {}, but only version {} is supported",
                    req.version, schema.version
                ),
            );
            try_diags!(Err::<(), _>(vec![diag]), empty);
        }

        let raw = req.raw_state.unwrap_or_default();
        if raw.json.is_empty() && !raw.flatmap.is_empty() {
            let diag = Diagnostic::error(
                "Unable to upgrade resource state",
                "flatmap state from Terraform 0.11 and earlier is not supported",
            );
            try_diags!(Err::<(), _>(vec![diag]), empty);
        }

        let stored = try_diags!(
            DynamicValue::decode_json(&raw.json).map_err(|e| vec![Diagnostic::from(e)]),
            empty
        );
        let upgraded = DynamicValue::new(schema.normalize(&stored.value));
        let upgraded_state = try_diags!(encode_value(&upgraded), empty);

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(upgraded_state),
            diagnostics: vec![],
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> RpcResult<proto::configure_provider::Response> {
        let req = request.into_inner();
        tracing::info!(terraform_version = %req.terraform_version, "ConfigureProvider");
        let empty = proto::configure_provider::Response {
            diagnostics: vec![],
        };
        let config = try_diags!(decode_value(req.config), empty);

        let response = self
            .provider
            .write()
            .await
            .configure(
                self.ctx.clone(),
                ConfigureProviderRequest {
                    terraform_version: req.terraform_version,
                    config,
                    client_capabilities: client_capabilities(req.client_capabilities),
                },
            )
            .await;

        if !response.diagnostics.has_errors() {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: to_proto_diagnostics(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> RpcResult<proto::read_resource::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ReadResource");
        let empty = proto::read_resource::Response {
            new_state: req.current_state.clone(),
            diagnostics: vec![],
            private: req.private.clone(),
        };

        let resource = try_diags!(self.configured_resource(&req.type_name).await, empty);
        let current_state = try_diags!(decode_value(req.current_state.clone()), empty);
        let schema = self.resource_schema(resource.as_ref()).await;

        let response = resource
            .read(
                self.ctx.clone(),
                ReadResourceRequest {
                    type_name: req.type_name,
                    current_state,
                    private: req.private,
                    client_capabilities: client_capabilities(req.client_capabilities),
                },
            )
            .await;

        let mut diagnostics = response.diagnostics;
        let new_state = match response.new_state {
            Some(state) => {
                diagnostics.extend(check_state(&schema, &state));
                state
            }
            None => {
                tracing::info!("resource no longer exists, removing from state");
                DynamicValue::null()
            }
        };
        let new_state = try_diags!(encode_value(&new_state), empty);

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(new_state),
            diagnostics: to_proto_diagnostics(diagnostics),
            private: response.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> RpcResult<proto::plan_resource_change::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "PlanResourceChange");
        let empty = proto::plan_resource_change::Response {
            planned_state: None,
            requires_replace: vec![],
            planned_private: req.prior_private.clone(),
            diagnostics: vec![],
            legacy_type_system: false,
        };

        let resource = try_diags!(self.new_resource(&req.type_name), empty);
        let schema = self.resource_schema(resource.as_ref()).await;
        let prior_state = try_diags!(decode_value(req.prior_state), empty);
        let proposed = try_diags!(decode_value(req.proposed_new_state), empty);
        let config = try_diags!(decode_value(req.config), empty);

        let plan = plan_resource_change(&schema, &prior_state.value, &proposed.value, &config.value);
        let planned_state = try_diags!(encode_value(&DynamicValue::new(plan.planned_state)), empty);

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(planned_state),
            requires_replace: plan.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: to_proto_diagnostics(plan.diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> RpcResult<proto::apply_resource_change::Response> {
        let req = request.into_inner();
        let empty = proto::apply_resource_change::Response {
            new_state: req.prior_state.clone(),
            private: req.planned_private.clone(),
            diagnostics: vec![],
            legacy_type_system: false,
        };

        let resource = try_diags!(self.configured_resource(&req.type_name).await, empty);
        let schema = self.resource_schema(resource.as_ref()).await;
        let prior_state = try_diags!(decode_value(req.prior_state.clone()), empty);
        let planned_state = try_diags!(decode_value(req.planned_state), empty);
        let config = try_diags!(decode_value(req.config), empty);

        let (new_state, private, mut diagnostics) = if planned_state.is_null() {
            tracing::info!(type_name = %req.type_name, "deleting resource");
            let response = resource
                .delete(
                    self.ctx.clone(),
                    DeleteResourceRequest {
                        type_name: req.type_name,
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private,
                    },
                )
                .await;
            // a failed delete leaves the resource in state
            let new_state = if response.diagnostics.has_errors() {
                prior_state
            } else {
                DynamicValue::null()
            };
            (new_state, vec![], response.diagnostics)
        } else if prior_state.is_null() {
            tracing::info!(type_name = %req.type_name, "creating resource");
            let response = resource
                .create(
                    self.ctx.clone(),
                    CreateResourceRequest {
                        type_name: req.type_name,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        } else {
            tracing::info!(type_name = %req.type_name, "updating resource");
            let response = resource
                .update(
                    self.ctx.clone(),
                    UpdateResourceRequest {
                        type_name: req.type_name,
                        prior_state,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        };

        if !new_state.is_null() && !diagnostics.has_errors() {
            diagnostics.extend(check_state(&schema, &new_state));
        }
        let new_state = try_diags!(encode_value(&new_state), empty);

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(new_state),
            private,
            diagnostics: to_proto_diagnostics(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> RpcResult<proto::import_resource_state::Response> {
        let req = request.into_inner();
        tracing::info!(type_name = %req.type_name, id = %req.id, "ImportResourceState");
        let empty = proto::import_resource_state::Response {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        let resource = try_diags!(self.configured_resource(&req.type_name).await, empty);
        let Some(importer) = resource.importer() else {
            let diag = Diagnostic::error(
                "Resource Import Not Implemented",
                format!("{} does not support import", req.type_name),
            );
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: to_proto_diagnostics(vec![diag]),
            }));
        };
        let schema = self.resource_schema(resource.as_ref()).await;

        let response = importer
            .import_state(
                self.ctx.clone(),
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: client_capabilities(req.client_capabilities),
                },
            )
            .await;

        let mut diagnostics = response.diagnostics;
        let mut imported_resources = Vec::new();
        for imported in response.imported_resources {
            let state = DynamicValue::new(schema.normalize(&imported.state.value));
            match encode_value(&state) {
                Ok(state) => imported_resources.push(proto::import_resource_state::ImportedResource {
                    type_name: imported.type_name,
                    state: Some(state),
                    private: imported.private,
                }),
                Err(diags) => diagnostics.extend(diags),
            }
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: to_proto_diagnostics(diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> RpcResult<proto::read_data_source::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ReadDataSource");
        let empty = proto::read_data_source::Response {
            state: None,
            diagnostics: vec![],
        };

        let data_source = try_diags!(self.configured_data_source(&req.type_name).await, empty);
        let config = try_diags!(decode_value(req.config), empty);

        let response = data_source
            .read(
                self.ctx.clone(),
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                    client_capabilities: client_capabilities(req.client_capabilities),
                },
            )
            .await;
        let state = try_diags!(encode_value(&response.state), empty);

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(state),
            diagnostics: to_proto_diagnostics(response.diagnostics),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> RpcResult<proto::stop_provider::Response> {
        tracing::info!("StopProvider");
        self.ctx.cancel();
        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: true,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

fn client_capabilities(caps: Option<proto::ClientCapabilities>) -> ClientCapabilities {
    caps.map(|c| ClientCapabilities {
        deferral_allowed: c.deferral_allowed,
    })
    .unwrap_or_default()
}

fn collect<T>(
    result: std::result::Result<T, Vec<Diagnostic>>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(diags) => {
            diagnostics.extend(diags);
            None
        }
    }
}

/// Output from a resource must conform to its own schema
fn check_state(schema: &Schema, state: &DynamicValue) -> Vec<Diagnostic> {
    schema
        .object_type()
        .check(&state.value, &AttributePath::root())
        .into_iter()
        .map(|d| Diagnostic {
            summary: format!("Provider produced invalid state: {}", d.summary),
            ..d
        })
        .collect()
}

/// msgpack takes precedence; JSON is only sent for legacy callers
fn decode_value(
    value: Option<proto::DynamicValue>,
) -> std::result::Result<DynamicValue, Vec<Diagnostic>> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };
    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)
    } else {
        DynamicValue::decode_json(&value.json)
    };
    decoded.map_err(|e| {
        vec![Diagnostic::error(
            "Failed to decode value",
            format!("Terraform sent a value the provider could not decode: {}", e),
        )]
    })
}

fn encode_value(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Vec<Diagnostic>> {
    let msgpack = value.encode_msgpack().map_err(|e| {
        vec![Diagnostic::error(
            "Failed to encode value",
            format!("The provider could not encode its response: {}", e),
        )]
    })?;
    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn schema_to_proto(schema: &Schema) -> std::result::Result<proto::Schema, Vec<Diagnostic>> {
    let attributes = attributes_to_proto(&schema.block.attributes)?;
    Ok(proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.block.version,
            attributes,
            block_types: vec![],
            description: schema.block.description.clone(),
            description_kind: string_kind(schema.block.description_kind),
            deprecated: schema.block.deprecated,
        }),
    })
}

fn attributes_to_proto(
    attributes: &[Attribute],
) -> std::result::Result<Vec<proto::schema::Attribute>, Vec<Diagnostic>> {
    attributes.iter().map(attribute_to_proto).collect()
}

fn attribute_to_proto(
    attr: &Attribute,
) -> std::result::Result<proto::schema::Attribute, Vec<Diagnostic>> {
    let (r#type, nested_type) = match &attr.nested_type {
        Some(nested) => {
            let nesting = match nested.nesting {
                ObjectNestingMode::Invalid => proto::schema::object::NestingMode::Invalid,
                ObjectNestingMode::Single => proto::schema::object::NestingMode::Single,
                ObjectNestingMode::List => proto::schema::object::NestingMode::List,
                ObjectNestingMode::Set => proto::schema::object::NestingMode::Set,
                ObjectNestingMode::Map => proto::schema::object::NestingMode::Map,
            };
            let object = proto::schema::Object {
                attributes: attributes_to_proto(&nested.attributes)?,
                nesting: nesting as i32,
            };
            (vec![], Some(object))
        }
        None => {
            let bytes = attr.r#type.to_type_bytes().map_err(|e| {
                vec![Diagnostic::error(
                    "Invalid schema",
                    format!("attribute {:?}: {}", attr.name, e),
                )]
            })?;
            (bytes, None)
        }
    };

    Ok(proto::schema::Attribute {
        name: attr.name.clone(),
        r#type,
        nested_type,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: string_kind(StringKind::Plain),
        deprecated: attr.deprecated,
    })
}

fn string_kind(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;
    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn to_proto_diagnostics(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| {
            let severity = match d.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            };
            proto::Diagnostic {
                severity: severity as i32,
                summary: d.summary,
                detail: d.detail,
                attribute: d.attribute.as_ref().map(path_to_proto),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{DataSource, DataSourceSchemaResponse, ReadDataSourceResponse};
    use crate::defaults::StaticDefault;
    use crate::import::import_state_passthrough_id;
    use crate::plan_modifier::UseStateForUnknown;
    use crate::provider::{ConfigureProviderResponse, ProviderSchemaResponse};
    use crate::resource::{
        ConfigureResourceResponse, CreateResourceResponse, DeleteResourceResponse,
        ImportResourceStateResponse, ReadResourceResponse, Resource, ResourceSchemaResponse,
        ResourceWithImportState, UpdateResourceResponse,
    };
    use crate::data_source::ConfigureDataSourceResponse;
    use crate::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
    use crate::types::Dynamic;
    use async_trait::async_trait;

    struct WidgetProvider;

    #[async_trait]
    impl Provider for WidgetProvider {
        fn type_name(&self) -> &str {
            "widget"
        }

        async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
            ProviderSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("api_token", AttributeType::String)
                            .optional()
                            .sensitive()
                            .build(),
                    )
                    .build(),
                diagnostics: vec![],
            }
        }

        async fn configure(
            &mut self,
            _ctx: Context,
            _request: ConfigureProviderRequest,
        ) -> ConfigureProviderResponse {
            ConfigureProviderResponse {
                diagnostics: vec![],
                provider_data: Some(Arc::new("configured".to_string())),
            }
        }

        fn resources(&self) -> HashMap<String, ResourceFactory> {
            let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
            resources.insert(
                "widget_thing".to_string(),
                Box::new(|| Box::new(ThingResource { configured: false })),
            );
            resources
        }

        fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
            let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
            data_sources.insert("widget_things".to_string(), Box::new(|| Box::new(ThingsDataSource)));
            data_sources
        }
    }

    struct ThingResource {
        configured: bool,
    }

    fn thing_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(AttributeBuilder::new("name", AttributeType::String).required().build())
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .optional()
                    .computed()
                    .default(StaticDefault::number(1.0))
                    .build(),
            )
            .build()
    }

    #[async_trait]
    impl Resource for ThingResource {
        fn type_name(&self) -> &str {
            "widget_thing"
        }

        async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
            ResourceSchemaResponse {
                schema: thing_schema(),
                diagnostics: vec![],
            }
        }

        async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
            assert!(self.configured);
            let mut new_state = request.planned_state;
            new_state
                .set_string(&AttributePath::new("token"), "thng_1".to_string())
                .unwrap();
            CreateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            }
        }

        async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
            let token = request
                .current_state
                .get_string(&AttributePath::new("token"))
                .unwrap_or_default();
            let new_state = if token == "thng_gone" {
                None
            } else {
                let mut state = request.current_state;
                if state.get(&AttributePath::new("name")).map(Dynamic::is_null).unwrap_or(true) {
                    state.set_string(&AttributePath::new("name"), "imported".to_string()).unwrap();
                    state.set_number(&AttributePath::new("size"), 2.0).unwrap();
                }
                Some(state)
            };
            ReadResourceResponse {
                new_state,
                diagnostics: vec![],
                private: request.private,
            }
        }

        async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
            UpdateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![],
            }
        }

        async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
            DeleteResourceResponse {
                diagnostics: vec![],
            }
        }

        fn importer(&self) -> Option<&dyn ResourceWithImportState> {
            Some(self)
        }
    }

    #[async_trait]
    impl ResourceWithConfigure for ThingResource {
        async fn configure(
            &mut self,
            _ctx: Context,
            request: ConfigureResourceRequest,
        ) -> ConfigureResourceResponse {
            self.configured = request.provider_data.is_some();
            ConfigureResourceResponse {
                diagnostics: vec![],
            }
        }
    }

    #[async_trait]
    impl ResourceWithImportState for ThingResource {
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

    struct ThingsDataSource;

    #[async_trait]
    impl DataSource for ThingsDataSource {
        fn type_name(&self) -> &str {
            "widget_things"
        }

        async fn schema(&self, _ctx: Context, _request: DataSourceSchemaRequest) -> DataSourceSchemaResponse {
            DataSourceSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("names", AttributeType::list(AttributeType::String))
                            .computed()
                            .build(),
                    )
                    .build(),
                diagnostics: vec![],
            }
        }

        async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
            let mut state = DynamicValue::null();
            state
                .set(
                    &AttributePath::new("names"),
                    Dynamic::List(vec![Dynamic::String("a".to_string())]),
                )
                .unwrap();
            ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            }
        }
    }

    #[async_trait]
    impl DataSourceWithConfigure for ThingsDataSource {
        async fn configure(
            &mut self,
            _ctx: Context,
            _request: ConfigureDataSourceRequest,
        ) -> ConfigureDataSourceResponse {
            ConfigureDataSourceResponse {
                diagnostics: vec![],
            }
        }
    }

    fn object(pairs: &[(&str, Dynamic)]) -> Dynamic {
        Dynamic::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    fn wire(value: Dynamic) -> Option<proto::DynamicValue> {
        Some(encode_value(&DynamicValue::new(value)).unwrap())
    }

    fn unwire(value: Option<proto::DynamicValue>) -> Dynamic {
        decode_value(value).unwrap().value
    }

    async fn configured_server() -> GrpcProviderServer<WidgetProvider> {
        let server = GrpcProviderServer::new(WidgetProvider);
        let response = server
            .configure_provider(Request::new(proto::configure_provider::Request {
                terraform_version: "1.9.0".to_string(),
                config: wire(object(&[("api_token", Dynamic::String("t".to_string()))])),
                client_capabilities: None,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.diagnostics.is_empty());
        server
    }

    #[tokio::test]
    async fn metadata_lists_types() {
        let server = GrpcProviderServer::new(WidgetProvider);
        let response = server
            .get_metadata(Request::new(proto::get_metadata::Request {}))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.resources[0].type_name, "widget_thing");
        assert_eq!(response.data_sources[0].type_name, "widget_things");
    }

    #[tokio::test]
    async fn provider_schema_carries_type_bytes() {
        let server = GrpcProviderServer::new(WidgetProvider);
        let response = server
            .get_provider_schema(Request::new(proto::get_provider_schema::Request {}))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        let provider = response.provider.unwrap().block.unwrap();
        assert!(provider.attributes[0].sensitive);

        let thing = response.resource_schemas["widget_thing"].block.as_ref().unwrap();
        let size = thing.attributes.iter().find(|a| a.name == "size").unwrap();
        assert_eq!(size.r#type, b"\"number\"".to_vec());

        let things = response.data_source_schemas["widget_things"].block.as_ref().unwrap();
        assert_eq!(things.attributes[0].r#type, b"[\"list\",\"string\"]".to_vec());
    }

    #[tokio::test]
    async fn plan_create_fills_default_and_unknown_token() {
        let server = GrpcProviderServer::new(WidgetProvider);
        let config = object(&[
            ("token", Dynamic::Null),
            ("name", Dynamic::String("a".to_string())),
            ("size", Dynamic::Null),
        ]);
        let response = server
            .plan_resource_change(Request::new(proto::plan_resource_change::Request {
                type_name: "widget_thing".to_string(),
                prior_state: wire(Dynamic::Null),
                proposed_new_state: wire(config.clone()),
                config: wire(config),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        let planned = unwire(response.planned_state);
        let planned = planned.as_map().unwrap();
        assert!(planned["token"].is_unknown());
        assert_eq!(planned["size"], Dynamic::Number(1.0));
        assert!(response.requires_replace.is_empty());
    }

    #[tokio::test]
    async fn apply_dispatches_create_and_delete() {
        let server = configured_server().await;
        let planned = object(&[
            ("token", Dynamic::Unknown),
            ("name", Dynamic::String("a".to_string())),
            ("size", Dynamic::Number(1.0)),
        ]);
        let created = server
            .apply_resource_change(Request::new(proto::apply_resource_change::Request {
                type_name: "widget_thing".to_string(),
                prior_state: wire(Dynamic::Null),
                planned_state: wire(planned.clone()),
                config: wire(planned),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        let state = unwire(created.new_state);
        assert_eq!(state.as_map().unwrap()["token"], Dynamic::String("thng_1".to_string()));

        let deleted = server
            .apply_resource_change(Request::new(proto::apply_resource_change::Request {
                type_name: "widget_thing".to_string(),
                prior_state: wire(state),
                planned_state: wire(Dynamic::Null),
                config: wire(Dynamic::Null),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(deleted.diagnostics.is_empty());
        assert_eq!(deleted.new_state.unwrap().msgpack, vec![0xc0]);
    }

    #[tokio::test]
    async fn read_of_missing_resource_returns_null() {
        let server = configured_server().await;
        let response = server
            .read_resource(Request::new(proto::read_resource::Request {
                type_name: "widget_thing".to_string(),
                current_state: wire(object(&[
                    ("token", Dynamic::String("thng_gone".to_string())),
                    ("name", Dynamic::String("a".to_string())),
                    ("size", Dynamic::Number(1.0)),
                ])),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        assert!(unwire(response.new_state).is_null());
    }

    #[tokio::test]
    async fn import_normalizes_state() {
        let server = configured_server().await;
        let response = server
            .import_resource_state(Request::new(proto::import_resource_state::Request {
                type_name: "widget_thing".to_string(),
                id: "thng_9".to_string(),
                client_capabilities: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        let state = unwire(response.imported_resources[0].state.clone());
        let state = state.as_map().unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state["token"], Dynamic::String("thng_9".to_string()));
        assert!(state["name"].is_null());
    }

    #[tokio::test]
    async fn unknown_resource_type_is_a_diagnostic() {
        let server = configured_server().await;
        let response = server
            .read_resource(Request::new(proto::read_resource::Request {
                type_name: "widget_nope".to_string(),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Unknown resource type");
    }

    #[tokio::test]
    async fn validate_reports_type_mismatch() {
        let server = GrpcProviderServer::new(WidgetProvider);
        let response = server
            .validate_resource_config(Request::new(proto::validate_resource_config::Request {
                type_name: "widget_thing".to_string(),
                config: wire(object(&[
                    ("token", Dynamic::Null),
                    ("name", Dynamic::Bool(true)),
                    ("size", Dynamic::Null),
                ])),
                client_capabilities: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid attribute type");
    }

    #[tokio::test]
    async fn upgrade_rejects_newer_versions() {
        let server = GrpcProviderServer::new(WidgetProvider);
        let response = server
            .upgrade_resource_state(Request::new(proto::upgrade_resource_state::Request {
                type_name: "widget_thing".to_string(),
                version: 3,
                raw_state: Some(proto::RawState {
                    json: b"{}".to_vec(),
                    flatmap: HashMap::new(),
                }),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.upgraded_state.is_none());
        assert_eq!(response.diagnostics[0].summary, "Unable to upgrade resource state");
    }

    #[tokio::test]
    async fn upgrade_normalizes_stored_json() {
        let server = GrpcProviderServer::new(WidgetProvider);
        let response = server
            .upgrade_resource_state(Request::new(proto::upgrade_resource_state::Request {
                type_name: "widget_thing".to_string(),
                version: 0,
                raw_state: Some(proto::RawState {
                    json: br#"{"token":"thng_1","name":"a","legacy":true}"#.to_vec(),
                    flatmap: HashMap::new(),
                }),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        let state = unwire(response.upgraded_state);
        let state = state.as_map().unwrap();
        assert!(!state.contains_key("legacy"));
        assert!(state["size"].is_null());
    }

    #[tokio::test]
    async fn read_data_source_returns_state() {
        let server = configured_server().await;
        let response = server
            .read_data_source(Request::new(proto::read_data_source::Request {
                type_name: "widget_things".to_string(),
                config: wire(object(&[("names", Dynamic::Null)])),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        let state = unwire(response.state);
        assert_eq!(
            state.as_map().unwrap()["names"],
            Dynamic::List(vec![Dynamic::String("a".to_string())])
        );
    }

    #[tokio::test]
    async fn stop_provider_cancels_context() {
        let server = GrpcProviderServer::new(WidgetProvider);
        let ctx = server.context();
        server
            .stop_provider(Request::new(proto::stop_provider::Request {}))
            .await
            .unwrap();
        assert!(ctx.is_cancelled());
    }
}
