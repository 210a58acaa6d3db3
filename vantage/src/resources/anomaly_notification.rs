use super::attributes;
use super::ManagedEntity;
use crate::api::anomaly_notifications::{
    AnomalyNotification, CreateAnomalyNotificationRequest, UpdateAnomalyNotificationRequest,
};
use tfplug::plan_modifier::RequiresReplace;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic};
use tfplug::validator::NumberRange;
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

pub struct AnomalyNotificationEntity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyNotificationModel {
    pub token: Value<String>,
    pub cost_report_token: Value<String>,
    pub threshold: Value<i64>,
    pub user_tokens: Value<Vec<String>>,
    pub recipient_channels: Value<Vec<String>>,
    pub created_at: Value<String>,
    pub updated_at: Value<String>,
}

impl FromDynamic for AnomalyNotificationModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            token: r.get("token"),
            cost_report_token: r.get("cost_report_token"),
            threshold: r.get("threshold"),
            user_tokens: r.get("user_tokens"),
            recipient_channels: r.get("recipient_channels"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        };
        r.finish(model)
    }
}

impl IntoDynamic for AnomalyNotificationModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("cost_report_token", self.cost_report_token)
            .set("threshold", self.threshold)
            .set("user_tokens", self.user_tokens)
            .set("recipient_channels", self.recipient_channels)
            .set("created_at", self.created_at)
            .set("updated_at", self.updated_at)
            .build()
    }
}

impl ManagedEntity for AnomalyNotificationEntity {
    type Api = AnomalyNotification;
    type Model = AnomalyNotificationModel;

    const TYPE_NAME: &'static str = "vantage_anomaly_notification";
    const DATA_SOURCE_TYPE_NAME: &'static str = "vantage_anomaly_notifications";
    const DISPLAY_NAME: &'static str = "anomaly notification";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages notifications for cost anomalies detected on a cost report.")
            .attribute(attributes::token("anomaly notification"))
            .attribute(
                AttributeBuilder::new("cost_report_token", AttributeType::String)
                    .description("Token of the cost report watched for anomalies.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("threshold", AttributeType::Number)
                    .description("Minimum anomaly size, in dollars, that triggers a notification.")
                    .optional()
                    .computed()
                    .validator(NumberRange::at_least(1.0))
                    .build(),
            )
            .attribute(attributes::string_list(
                "user_tokens",
                "Tokens of the users notified by email.",
            ))
            .attribute(attributes::string_list(
                "recipient_channels",
                "Slack or Microsoft Teams channels notified.",
            ))
            .attribute(attributes::stable(
                "created_at",
                "Date and time the notification was created.",
            ))
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
                    .description("Date and time the notification was last updated.")
                    .computed()
                    .build(),
            )
            .build()
    }

    fn create_request(model: &AnomalyNotificationModel) -> CreateAnomalyNotificationRequest {
        CreateAnomalyNotificationRequest {
            cost_report_token: model.cost_report_token.as_option().cloned().unwrap_or_default(),
            fields: Self::update_request(model),
        }
    }

    fn update_request(model: &AnomalyNotificationModel) -> UpdateAnomalyNotificationRequest {
        UpdateAnomalyNotificationRequest {
            threshold: model.threshold.as_option().copied(),
            user_tokens: model.user_tokens.as_option().cloned(),
            recipient_channels: model.recipient_channels.as_option().cloned(),
        }
    }

    fn from_api(item: AnomalyNotification) -> AnomalyNotificationModel {
        AnomalyNotificationModel {
            token: Value::Known(item.token),
            cost_report_token: Value::Known(item.cost_report_token),
            threshold: item.threshold.into(),
            user_tokens: Value::Known(item.user_tokens),
            recipient_channels: Value::Known(item.recipient_channels),
            created_at: item.created_at.into(),
            updated_at: item.updated_at.into(),
        }
    }
}
