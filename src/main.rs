use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};

use chihaya_lib::{app, bootstrap, console};

#[derive(Parser, Debug)]
#[command(name = "chihaya", about = "A high-throughput BitTorrent tracker.", version)]
struct Args {
    /// Path of the YAML configuration file.
    #[arg(long, default_value = "/etc/chihaya.yaml")]
    config: String,

    /// Log at debug level, whatever the configuration says.
    #[arg(long)]
    debug: bool,

    /// Log as line-delimited JSON.
    #[arg(long)]
    json: bool,

    /// Disable ANSI colors in the log output.
    #[arg(long)]
    nocolors: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exercise a running tracker with announce and scrape sequences.
    E2e {
        /// Base URL of an HTTP frontend, e.g. http://127.0.0.1:6969.
        #[arg(long)]
        http: Option<String>,

        /// Address of a UDP frontend, e.g. 127.0.0.1:6969.
        #[arg(long)]
        udp: Option<SocketAddr>,

        /// Seconds to pause between the check steps.
        #[arg(long, default_value_t = 1)]
        delay: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match &args.command {
        Some(Command::E2e { http, udp, delay }) => {
            bootstrap::logging::setup(chihaya_configuration::Threshold::Info, args.debug, args.json, args.nocolors);

            let options = console::e2e::Options {
                http: http.clone(),
                udp: *udp,
                delay: Duration::from_secs(*delay),
            };

            console::e2e::run(&options).await
        }
        None => run_tracker(&args).await,
    }
}

async fn run_tracker(args: &Args) -> anyhow::Result<()> {
    let (config, container) = bootstrap::app::setup(&args.config, args.debug, args.json, args.nocolors)?;

    let jobs = app::start(&config, &container).await?;

    chihaya_server_lib::signals::global_shutdown_signal().await;

    tracing::info!("chihaya shutting down ...");

    // Frontends and loops first, then the hook chain, then the store.
    jobs.cancel();
    jobs.wait_for_all(Duration::from_secs(10)).await;
    container.stop();

    tracing::info!("chihaya successfully shut down");

    Ok(())
}
