//! Tandem demo - serves the fake matchmaking services on both transports.
//!
//! Useful for poking at the gateway with curl and at the gRPC side with
//! grpcurl without writing a test.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info};

use tandem_config::ConfigLoader;
use tandem_server::{acquire_on, Server, ServerParams, ShutdownSignal};
use tandem_test::{DiagnosticsRegistration, FakeDiagnostics, FakeFrontend, FrontendRegistration};

const ENV_PREFIX: &str = "TANDEM";
const CONFIG_ENV: &str = "TANDEM_CONFIG";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("tandem-demo {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"Tandem demo - fake matchmaking services over gRPC and JSON/HTTP

USAGE:
    tandem-demo [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    TANDEM_CONFIG                     Configuration file, if --config is not given
    TANDEM__SERVER__RPC_PORT          gRPC port (default: 50504)
    TANDEM__SERVER__GATEWAY_PORT      Gateway port (default: 51504)
    TANDEM__SERVER__BIND_ADDR         Interface for both listeners (default: 0.0.0.0)
    TANDEM__TLS__CERT_PATH            PEM certificate chain; enables TLS with KEY_PATH
    TANDEM__TLS__KEY_PATH             PEM private key
    TANDEM__LOGGING__LEVEL            Filter directives (default: info)
    TANDEM__LOGGING__FORMAT           json, pretty or compact (default: json)

EXAMPLES:
    tandem-demo --config tandem.toml
    curl -X POST localhost:51504/v1/frontendservice/tickets -d '{{}}'
"
    );
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("tandem-demo failed: {e:#}");
        eprintln!("tandem-demo: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader
            .with_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    let config = loader.with_env_prefix(ENV_PREFIX).load()?;

    tandem_telemetry::init_logging(&config.log_config())?;

    let rpc = acquire_on(config.rpc_addr()?)?;
    let gateway = acquire_on(config.gateway_addr()?)?;
    let mut params = ServerParams::from_listeners(rpc, gateway);
    params
        .add_registration(FrontendRegistration::new(FakeFrontend::new()))
        .add_registration(DiagnosticsRegistration::new(FakeDiagnostics::new()))
        .with_config(config.server_config());
    if let Some(material) = config.tls_material()? {
        params.with_tls(material);
    }

    let mut server = Server::new();
    server.start(params).await?;
    info!(
        rpc_addr = ?server.rpc_addr(),
        gateway_addr = ?server.gateway_addr(),
        tls = config.tls.is_enabled(),
        "tandem-demo serving"
    );

    let report = server.serve_until(ShutdownSignal::with_os_signals()).await;
    info!(%report, "tandem-demo stopped");
    Ok(())
}
