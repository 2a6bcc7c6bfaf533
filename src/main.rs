use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tryon_proxy::models::Config;
use tryon_proxy::server;

#[derive(Debug, Parser)]
#[command(name = "tryon-proxy")]
#[command(about = "Serve the Gemini proxy for image composition and style suggestions")]
struct CliArgs {
    /// Address to listen on; overrides BIND_ADDR.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tryon_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tryon-proxy");

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; proxy requests will fail with a configuration error");
    }
    info!(
        "Retry policy: {:?}, {} attempts, base delay {:?}",
        config.retry.policy, config.retry.max_attempts, config.retry.base_delay
    );

    if let Err(e) = server::start_server(config).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn test_parse_bind_arg() {
        let args = CliArgs::try_parse_from(["tryon-proxy", "--bind", "127.0.0.1:3000"]).unwrap();
        assert_eq!(args.bind.unwrap().port(), 3000);
    }

    #[test]
    fn test_bind_arg_is_optional() {
        let args = CliArgs::try_parse_from(["tryon-proxy"]).unwrap();
        assert!(args.bind.is_none());
    }

    #[test]
    fn test_invalid_bind_arg_is_rejected() {
        assert!(CliArgs::try_parse_from(["tryon-proxy", "--bind", "localhost"]).is_err());
    }
}
