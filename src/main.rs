use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadcall_gateway::{
    ServerConfig,
    config::ConfigError,
    core::session::spawn_sweeper,
    core::telephony::{
        CallMode, OutboundCall, TelephonyClient, TwilioClient, TwilioConfig, entry_url,
        status_callback_url,
    },
    routes,
    state::AppState,
};

/// Lead call gateway - outbound qualification calls with a voice agent
#[derive(Parser, Debug)]
#[command(name = "leadcall-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP and WebSocket server
    Serve,

    /// Place an outbound call
    Dial {
        /// Destination number in E.164 form
        #[arg(long)]
        to: String,

        #[arg(long = "business")]
        business_name: Option<String>,

        #[arg(long = "product")]
        product_category: Option<String>,

        #[arg(long = "brand")]
        brand_name: Option<String>,

        /// Conversation flow: stream, relay or gather
        #[arg(long, default_value = "stream")]
        mode: CallMode,
    },

    /// Fetch the status of a call
    Status {
        /// Provider call id
        call_sid: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = if let Some(config_path) = cli.config {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Dial {
            to,
            business_name,
            product_category,
            brand_name,
            mode,
        } => {
            let context = config.campaign.context().with_overrides(
                business_name.as_deref(),
                product_category.as_deref(),
                brand_name.as_deref(),
            );
            let base_url = config
                .public_base_url()
                .ok_or_else(|| {
                    anyhow!("PUBLIC_URL must be set so the provider can reach this server")
                })?
                .to_string();
            let client = telephony_client(&config)?;

            let call = OutboundCall {
                to,
                from: None,
                url: entry_url(&base_url, mode, &context)?,
                status_callback: Some(status_callback_url(&base_url)),
                machine_detection: true,
            };
            match client.place_call(&call).await {
                Ok(record) => {
                    println!("Call placed: {} ({:?})", record.sid, record.status);
                    Ok(())
                }
                Err(e) if e.is_unverified_number() => Err(anyhow!(
                    "{e}\nTrial accounts can only call verified numbers. Verify {} in the Twilio console first.",
                    call.to
                )),
                Err(e) => Err(e.into()),
            }
        }
        Commands::Status { call_sid } => {
            let record = telephony_client(&config)?.fetch_call(&call_sid).await?;
            println!(
                "{}: {:?} (duration: {})",
                record.sid,
                record.status,
                record.duration.as_deref().unwrap_or("-")
            );
            Ok(())
        }
    }
}

fn telephony_client(config: &ServerConfig) -> anyhow::Result<TwilioClient> {
    if !config.telephony.is_configured() {
        return Err(anyhow!(
            "TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN must be set to use the telephony API"
        ));
    }
    let twilio = TwilioConfig::from_server_config(config)?;
    Ok(TwilioClient::new(twilio)?)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let sweep_interval = config.calls.sweep_interval();
    let max_age = config.calls.session_max_age();
    println!("Starting server on {address}");

    let app_state = AppState::new(config)
        .await
        .map_err(|e: ConfigError| anyhow!(e.to_string()))?;
    let sweeper = spawn_sweeper(app_state.registry.clone(), sweep_interval, max_age);

    let app = routes::voice::app(app_state);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("Server listening on http://{}", socket_addr);
    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    sweeper.abort();
    Ok(())
}
