//! Generated types for Terraform Plugin Protocol v6
//!
//! Messages mirror `proto/tfplugin6.proto`. Several names collide with the
//! framework's own types (`DynamicValue`, `Diagnostic`, `AttributePath`,
//! `Schema`), so refer to these through the `proto::` prefix.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

// Re-export the gRPC service trait and server
pub use provider_server::{Provider as ProviderService, ProviderServer};
