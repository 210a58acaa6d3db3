//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;

#[derive(Clone)]
pub struct VantageProviderData {
    pub client: Arc<Client>,
}

impl VantageProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Recover the provider data handed out by ConfigureProvider
    pub fn from_any(data: Option<Arc<dyn Any + Send + Sync>>) -> Option<Self> {
        data.and_then(|data| data.downcast_ref::<Self>().cloned())
    }
}
