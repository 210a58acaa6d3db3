use super::attributes;
use super::ManagedEntity;
use crate::api::resource_reports::{
    CreateResourceReportRequest, ResourceReport, UpdateResourceReportRequest,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic};
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

pub struct ResourceReportEntity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceReportModel {
    pub token: Value<String>,
    pub title: Value<String>,
    pub workspace_token: Value<String>,
    pub filter: Value<String>,
    pub created_at: Value<String>,
    pub created_by_token: Value<String>,
    pub user_token: Value<String>,
}

impl FromDynamic for ResourceReportModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            token: r.get("token"),
            title: r.get("title"),
            workspace_token: r.get("workspace_token"),
            filter: r.get("filter"),
            created_at: r.get("created_at"),
            created_by_token: r.get("created_by_token"),
            user_token: r.get("user_token"),
        };
        r.finish(model)
    }
}

impl IntoDynamic for ResourceReportModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("title", self.title)
            .set("workspace_token", self.workspace_token)
            .set("filter", self.filter)
            .set("created_at", self.created_at)
            .set("created_by_token", self.created_by_token)
            .set("user_token", self.user_token)
            .build()
    }
}

impl ManagedEntity for ResourceReportEntity {
    type Api = ResourceReport;
    type Model = ResourceReportModel;

    const TYPE_NAME: &'static str = "vantage_resource_report";
    const DATA_SOURCE_TYPE_NAME: &'static str = "vantage_resource_reports";
    const DISPLAY_NAME: &'static str = "resource report";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Vantage resource report.")
            .attribute(attributes::token("resource report"))
            .attribute(
                AttributeBuilder::new("title", AttributeType::String)
                    .description("Title of the resource report.")
                    .required()
                    .build(),
            )
            .attribute(attributes::workspace_token("resource report"))
            .attribute(attributes::optional_string(
                "filter",
                "VQL filter selecting the resources in the report.",
            ))
            .attribute(attributes::stable(
                "created_at",
                "Date and time the report was created.",
            ))
            .attribute(attributes::stable(
                "created_by_token",
                "Token of the creator of the report.",
            ))
            .attribute(attributes::stable(
                "user_token",
                "Token of the user owning the report.",
            ))
            .build()
    }

    fn create_request(model: &ResourceReportModel) -> CreateResourceReportRequest {
        CreateResourceReportRequest {
            title: model.title.as_option().cloned().unwrap_or_default(),
            workspace_token: model.workspace_token.as_option().cloned(),
            filter: model.filter.as_option().cloned(),
        }
    }

    fn update_request(model: &ResourceReportModel) -> UpdateResourceReportRequest {
        UpdateResourceReportRequest {
            title: model.title.as_option().cloned().unwrap_or_default(),
            filter: model.filter.as_option().cloned(),
        }
    }

    fn from_api(item: ResourceReport) -> ResourceReportModel {
        ResourceReportModel {
            token: Value::Known(item.token),
            title: Value::Known(item.title),
            workspace_token: item.workspace_token.into(),
            filter: item.filter.into(),
            created_at: item.created_at.into(),
            created_by_token: item.created_by_token.into(),
            user_token: item.user_token.into(),
        }
    }
}
