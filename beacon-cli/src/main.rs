use anyhow::{Result, ensure};
use beacon_core::{DEFAULT_STUN_SERVERS, IceServerConfig};
use beacon_server::{DEFAULT_PORT, ServerConfig};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(bin_name = "beacon")]
#[command(about = "WebRTC signaling relay", version)]
struct Cli {
    /// Used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server.
    Serve(ServerArgs),
    /// Print the ICE servers clients would be given, then exit.
    IceServers(ServerArgs),
}

#[derive(clap::Args)]
struct ServerArgs {
    /// Full bind address; overrides --port.
    #[arg(long, env = "BEACON_BIND")]
    bind: Option<SocketAddr>,

    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// STUN URLs, comma separated. Defaults to the public Google and Twilio servers.
    #[arg(long, env = "BEACON_STUN", value_delimiter = ',')]
    stun: Vec<String>,

    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    turn_credential: Option<String>,

    /// Drop offers left unanswered this long. Off when unset.
    #[arg(long, env = "BEACON_NEGOTIATION_TIMEOUT_SECS")]
    negotiation_timeout_secs: Option<u64>,
}

impl ServerArgs {
    fn to_config(&self) -> Result<ServerConfig> {
        let bind_addr = self
            .bind
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)));

        let stun = if self.stun.is_empty() {
            IceServerConfig::stun(DEFAULT_STUN_SERVERS)
        } else {
            IceServerConfig::stun(self.stun.iter().cloned())
        };
        let mut ice_servers = vec![stun];

        if let Some(url) = &self.turn_url {
            ensure!(
                self.turn_username.is_some() && self.turn_credential.is_some(),
                "TURN server {} needs both a username and a credential",
                url
            );
            ice_servers.push(IceServerConfig {
                urls: vec![url.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            });
        }

        let mut config = ServerConfig {
            ice_servers,
            ..ServerConfig::default()
        }
        .with_bind_addr(bind_addr);
        if let Some(secs) = self.negotiation_timeout_secs {
            config = config.with_negotiation_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.to_config()?;

            println!("{}", "📡 Starting beacon signaling server...".green().bold());
            println!("   🔌 Listening: {}", config.bind_addr);
            for server in &config.ice_servers {
                println!("   🧊 ICE: {}", server.urls.join(", "));
            }
            if let Some(timeout) = config.negotiation_timeout {
                println!("   ⏱  Negotiation timeout: {:?}", timeout);
            }

            beacon_server::run(config).await?;
            println!("{}", "👋 Signaling server stopped".cyan());
        }
        Commands::IceServers(args) => {
            let config = args.to_config()?;
            println!("{}", serde_json::to_string_pretty(&config.ice_servers)?);
        }
    }

    Ok(())
}
