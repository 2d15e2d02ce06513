use clap::{Args, Parser, Subcommand};
use coreagent::{AgentConfig, ByteOrder, ConnectionMode, VersionField, DEFAULT_SOCKET_PATH};
use coreagent_demo::{run_server, MockAgent};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coreagent-demo")]
#[command(about = "Hello-world server traced through the core agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve GET /hello, reporting each request to the core agent
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:4000")]
        listen: String,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Run a mock core agent that logs every message it receives
    Agent {
        /// Socket path to listen on
        #[arg(long, env = "SCOUT_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
        socket: PathBuf,

        /// Byte order of the length prefix (big or little)
        #[arg(long, env = "SCOUT_FRAME_BYTE_ORDER", default_value = "big")]
        byte_order: ByteOrder,
    },
}

#[derive(Args)]
struct AgentArgs {
    /// Application name sent in Register
    #[arg(long, env = "SCOUT_NAME", default_value = "")]
    app: String,

    /// Agent key sent in Register
    #[arg(long, env = "SCOUT_KEY", default_value = "", hide_env_values = true)]
    key: String,

    /// Core agent socket path
    #[arg(long, env = "SCOUT_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    /// Connection policy (persistent or per-call)
    #[arg(long, env = "SCOUT_CONNECTION_MODE", default_value = "persistent")]
    mode: ConnectionMode,

    /// Byte order of the length prefix (big or little)
    #[arg(long, env = "SCOUT_FRAME_BYTE_ORDER", default_value = "big")]
    byte_order: ByteOrder,

    /// Key carrying the protocol version in Register (api_version, version or omit)
    #[arg(long, env = "SCOUT_REGISTER_VERSION_FIELD", default_value = "api_version")]
    version_field: VersionField,
}

impl From<AgentArgs> for AgentConfig {
    fn from(args: AgentArgs) -> Self {
        AgentConfig {
            app: args.app,
            key: args.key,
            socket_path: args.socket,
            mode: args.mode,
            byte_order: args.byte_order,
            version_field: args.version_field,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen, agent } => {
            let config = AgentConfig::from(agent);
            tracing::info!(
                "🔍 Reporting to core agent at {:?} ({:?})",
                config.socket_path,
                config.mode
            );
            let reporter = config.connect();
            run_server(&listen, reporter, shutdown_signal()).await
        }
        Commands::Agent { socket, byte_order } => {
            MockAgent::new(socket, byte_order)
                .serve(shutdown_signal())
                .await?;
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
