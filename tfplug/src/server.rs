//! Server module for running Terraform providers
//!
//! Terraform launches the provider binary and reads a single handshake line
//! from stdout: `core-version|protocol-version|network|address|protocol|cert`.
//! The certificate is generated at startup and advertised in that line, so
//! nothing needs to exist on disk. Logs must go to stderr.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::provider_server::ProviderServer;
use crate::provider::Provider;
use base64::Engine;
use std::io::Write;
use std::time::Duration;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};

/// Environment variable Terraform sets to prove it launched the binary
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// go-plugin core protocol version
const CORE_PROTOCOL_VERSION: u32 = 1;
const PLUGIN_PROTOCOL_VERSION: u32 = 6;

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum gRPC message size in bytes, both directions
    pub max_message_size: usize,
    /// How long in-flight requests may run after a shutdown signal
    pub shutdown_timeout: Duration,
    /// Refuse to start unless launched by Terraform
    pub require_magic_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: 256 << 20, // 256MB
            shutdown_timeout: Duration::from_secs(30),
            require_magic_cookie: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Skip the launch check, for running the binary under a debugger
    pub fn without_magic_cookie(mut self) -> Self {
        self.require_magic_cookie = false;
        self
    }
}

fn check_magic_cookie(value: Option<String>) -> Result<()> {
    match value.as_deref() {
        Some(MAGIC_COOKIE_VALUE) => Ok(()),
        _ => Err(TfplugError::Handshake(
            "this binary is a Terraform plugin and is not meant to be executed directly; \
             run terraform to load it"
                .to_string(),
        )),
    }
}

fn handshake_line(addr: std::net::SocketAddr, cert_der: &[u8]) -> String {
    format!(
        "{}|{}|tcp|{}|grpc|{}",
        CORE_PROTOCOL_VERSION,
        PLUGIN_PROTOCOL_VERSION,
        addr,
        base64::engine::general_purpose::STANDARD_NO_PAD.encode(cert_der)
    )
}

/// Server certificate plus, when Terraform supplied one, its client CA
fn tls_config() -> Result<(ServerTlsConfig, Vec<u8>)> {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .map_err(|e| TfplugError::TlsError(format!("failed to generate certificate: {}", e)))?;
    let identity = Identity::from_pem(certified.cert.pem(), certified.key_pair.serialize_pem());

    let mut config = ServerTlsConfig::new().identity(identity);
    if let Ok(client_cert) = std::env::var("PLUGIN_CLIENT_CERT") {
        config = config.client_ca_root(Certificate::from_pem(client_cert));
    }
    Ok((config, certified.cert.der().to_vec()))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                    _ = sigint.recv() => tracing::info!("received SIGINT"),
                }
            }
            _ => {
                tracing::warn!("failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        tracing::info!("received CTRL+C");
    }
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    if config.require_magic_cookie {
        check_magic_cookie(std::env::var(MAGIC_COOKIE_KEY).ok())?;
    }

    // several crypto backends may be linked; only the first install wins
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let grpc_server = GrpcProviderServer::new(provider);
    let ctx = grpc_server.context();
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let (tls, cert_der) = tls_config()?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", handshake_line(addr, &cert_der))?;
    stdout.flush()?;
    tracing::info!(%addr, "provider server listening");

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    let shutdown_ctx = ctx.clone();
    let server = Server::builder()
        .tls_config(tls)?
        .add_service(provider_service)
        .serve_with_incoming_shutdown(incoming, async move {
            wait_for_shutdown_signal().await;
            shutdown_ctx.cancel();
        });
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = async {
            ctx.cancelled().await;
            tokio::time::sleep(config.shutdown_timeout).await;
        } => {
            tracing::warn!(timeout = ?config.shutdown_timeout, "shutdown timeout exceeded, exiting");
        }
    }

    tracing::info!("provider server stopped");
    Ok(())
}

/// Convenience function to run a provider with default configuration
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}
