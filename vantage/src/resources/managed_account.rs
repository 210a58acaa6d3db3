use super::attributes;
use super::ManagedEntity;
use crate::api::managed_accounts::{ManagedAccount, ManagedAccountRequest};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic};
use tfplug::validator::{StringLength, StringPattern};
use tfplug::value::{DecodeResult, FromDynamic, IntoDynamic, ObjectBuilder, ObjectReader, Value};

pub struct ManagedAccountEntity;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagedAccountModel {
    pub token: Value<String>,
    pub name: Value<String>,
    pub contact_email: Value<String>,
    pub parent_account_token: Value<String>,
    pub access_credential_tokens: Value<Vec<String>>,
    pub billing_rule_tokens: Value<Vec<String>>,
}

impl FromDynamic for ManagedAccountModel {
    fn from_dynamic(value: &Dynamic, path: &AttributePath) -> DecodeResult<Self> {
        let mut r = ObjectReader::new(value, path)?;
        let model = Self {
            token: r.get("token"),
            name: r.get("name"),
            contact_email: r.get("contact_email"),
            parent_account_token: r.get("parent_account_token"),
            access_credential_tokens: r.get("access_credential_tokens"),
            billing_rule_tokens: r.get("billing_rule_tokens"),
        };
        r.finish(model)
    }
}

impl IntoDynamic for ManagedAccountModel {
    fn into_dynamic(self) -> Dynamic {
        ObjectBuilder::new()
            .set("token", self.token)
            .set("name", self.name)
            .set("contact_email", self.contact_email)
            .set("parent_account_token", self.parent_account_token)
            .set("access_credential_tokens", self.access_credential_tokens)
            .set("billing_rule_tokens", self.billing_rule_tokens)
            .build()
    }
}

fn request(model: &ManagedAccountModel) -> ManagedAccountRequest {
    ManagedAccountRequest {
        name: model.name.as_option().cloned().unwrap_or_default(),
        contact_email: model.contact_email.as_option().cloned().unwrap_or_default(),
        access_credential_tokens: model.access_credential_tokens.as_option().cloned(),
        billing_rule_tokens: model.billing_rule_tokens.as_option().cloned(),
    }
}

impl ManagedEntity for ManagedAccountEntity {
    type Api = ManagedAccount;
    type Model = ManagedAccountModel;

    const TYPE_NAME: &'static str = "vantage_managed_account";
    const DATA_SOURCE_TYPE_NAME: &'static str = "vantage_managed_accounts";
    const DISPLAY_NAME: &'static str = "managed account";

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Vantage MSP managed account.")
            .attribute(attributes::token("managed account"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the managed account.")
                    .required()
                    .validator(StringLength::create(Some(1), None))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("contact_email", AttributeType::String)
                    .description("Email address of the account's contact.")
                    .required()
                    .validator(StringPattern::create(EMAIL_PATTERN, "an email address"))
                    .build(),
            )
            .attribute(attributes::stable(
                "parent_account_token",
                "Token of the MSP account owning this account.",
            ))
            .attribute(attributes::string_list(
                "access_credential_tokens",
                "Tokens of the integrations the account may access.",
            ))
            .attribute(attributes::string_list(
                "billing_rule_tokens",
                "Tokens of the billing rules applied to the account.",
            ))
            .build()
    }

    fn create_request(model: &ManagedAccountModel) -> ManagedAccountRequest {
        request(model)
    }

    fn update_request(model: &ManagedAccountModel) -> ManagedAccountRequest {
        request(model)
    }

    fn from_api(item: ManagedAccount) -> ManagedAccountModel {
        ManagedAccountModel {
            token: Value::Known(item.token),
            name: Value::Known(item.name),
            contact_email: Value::Known(item.contact_email),
            parent_account_token: item.parent_account_token.into(),
            access_credential_tokens: Value::Known(item.access_credential_tokens),
            billing_rule_tokens: Value::Known(item.billing_rule_tokens),
        }
    }
}
