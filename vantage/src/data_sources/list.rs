//! Read-only listing of every object in a Vantage collection
//!
//! `vantage_budgets` exposes a single `budgets` attribute holding each budget
//! with the same attributes as the `vantage_budget` resource, all computed.

use crate::api::VantageResource;
use crate::provider_data::VantageProviderData;
use crate::resources::{api_error, not_configured, ManagedEntity};
use async_trait::async_trait;
use std::marker::PhantomData;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, NestedType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, Dynamic, DynamicValue};
use tfplug::value::{IntoDynamic, ObjectBuilder};

/// Strip everything configurable from resource attributes, recursively
pub fn computed_only(attributes: Vec<Attribute>) -> Vec<Attribute> {
    attributes
        .into_iter()
        .map(|mut attr| {
            attr.required = false;
            attr.optional = false;
            attr.computed = true;
            attr.validators.clear();
            attr.plan_modifiers.clear();
            attr.default = None;
            attr.nested_type = attr.nested_type.map(|mut nested| {
                nested.attributes = computed_only(nested.attributes);
                nested
            });
            attr
        })
        .collect()
}

pub struct EntityListDataSource<E: ManagedEntity> {
    provider_data: Option<VantageProviderData>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: ManagedEntity> Default for EntityListDataSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ManagedEntity> EntityListDataSource<E> {
    pub fn new() -> Self {
        Self {
            provider_data: None,
            _entity: PhantomData,
        }
    }

    pub fn schema() -> Schema {
        let key = E::Api::list_key();
        let items = NestedType::list(computed_only(E::schema().block.attributes));

        SchemaBuilder::new()
            .version(0)
            .description(&format!("Lists every {} visible to the API token.", E::DISPLAY_NAME))
            .attribute(
                AttributeBuilder::nested(key, items)
                    .description(&format!("Every {}.", E::DISPLAY_NAME))
                    .computed()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl<E: ManagedEntity> DataSource for EntityListDataSource<E> {
    fn type_name(&self) -> &str {
        E::DATA_SOURCE_TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut response = ReadDataSourceResponse {
            state: request.config,
            diagnostics: vec![],
        };

        let Some(data) = self.provider_data.as_ref() else {
            response.diagnostics.push(not_configured());
            return response;
        };

        let collection = E::collection(&data.client);
        let items = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                response.diagnostics.push(Diagnostic::error(
                    "Read cancelled",
                    "Terraform stopped the provider while the list was being read.",
                ));
                return response;
            }
            result = collection.list() => result,
        };

        match items {
            Ok(items) => {
                tracing::debug!(
                    data_source = E::DATA_SOURCE_TYPE_NAME,
                    count = items.len(),
                    "listed"
                );
                let items: Vec<Dynamic> = items
                    .into_iter()
                    .map(|item| E::from_api(item).into_dynamic())
                    .collect();
                response.state = DynamicValue::new(
                    ObjectBuilder::new()
                        .set(E::Api::list_key(), Dynamic::List(items))
                        .build(),
                );
            }
            Err(err) => {
                let plural = format!("{}s", E::DISPLAY_NAME);
                response.diagnostics.push(api_error("list", &plural, &err));
            }
        }
        response
    }
}

#[async_trait]
impl<E: ManagedEntity> DataSourceWithConfigure for EntityListDataSource<E> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.provider_data = VantageProviderData::from_any(request.provider_data);
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}
