use tfplug::ServerConfig;
use vantage::VantageProvider;

#[tokio::main]
async fn main() -> tfplug::Result<()> {
    tfplug::init_logging();

    let provider = VantageProvider::new();
    tfplug::serve(provider, ServerConfig::default()).await
}
