mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{fmt, EnvFilter};

use watchdoc_core::{Supervisor, WatchConfig};
use watchdoc_host::WatchDoctor;

/// How long `watch` waits for watchers to finish their current cycle on exit.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// watchdoc: alert when backend servers stop accepting connections.
#[derive(Parser)]
#[command(name = "watchdoc", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP host with the watcher module loaded.
    Serve {
        /// Path to TOML config file.
        #[arg(short, long)]
        config: PathBuf,

        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Watch servers from the command line (no HTTP host).
    Watch {
        /// Servers to watch, as host:port or http(s):// URLs.
        #[arg(required = true)]
        servers: Vec<String>,

        /// Notification server URL that down alerts are POSTed to.
        #[arg(short, long)]
        notify: String,

        /// Time between probes (e.g. 500ms, 5s, 1m).
        #[arg(short, long, default_value = "5s")]
        interval: String,

        /// Connect and notification timeout.
        #[arg(short, long, default_value = "2s")]
        timeout: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            run_serve(config, listen).await;
        }
        Commands::Watch {
            servers,
            notify,
            interval,
            timeout,
        } => {
            init_tracing("pretty");
            run_watch(servers, notify, interval, timeout).await;
        }
    }
}

async fn run_serve(config_path: PathBuf, listen_override: Option<SocketAddr>) {
    let app_config = match config::AppConfig::load(&config_path) {
        Ok(c) => {
            init_tracing(&c.server.log_format);
            tracing::info!(path = %config_path.display(), "Loaded config file");
            c
        }
        Err(e) => {
            init_tracing("pretty");
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let watch_config = match app_config.watch.to_watch_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Invalid watch configuration");
            std::process::exit(1);
        }
    };

    let listen = listen_override.unwrap_or(app_config.server.listen);
    let module = WatchDoctor::new(watch_config).with_name(&app_config.watch.name);

    tracing::info!(%listen, "Starting watchdoc host");
    if let Err(e) =
        watchdoc_host::serve_with_module(listen, module, watchdoc_host::shutdown_signal()).await
    {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

async fn run_watch(servers: Vec<String>, notify: String, interval: String, timeout: String) {
    let config = match WatchConfig::from_directive(&interval, &timeout, &notify, &servers.join(" ")) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(2);
        }
    };

    println!(
        "{} {}",
        style("watchdoc").bold(),
        style(env!("CARGO_PKG_VERSION")).dim()
    );
    println!("  {} {}", style("notify:  ").dim(), style(&config.notification_endpoint).bold());
    println!("  {} {:?}", style("interval:").dim(), config.interval);
    println!("  {} {:?}", style("timeout: ").dim(), config.timeout);
    for target in &config.targets {
        println!("  {} {}", style("server:  ").dim(), target);
    }
    println!();
    println!("{}", style("Press Ctrl+C to stop").dim());
    println!();

    let supervisor = Supervisor::new(config);
    if let Err(e) = supervisor.start().await {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }

    watchdoc_host::shutdown_signal().await;

    supervisor.stop_and_wait(DRAIN_GRACE).await;
    println!("{}", style("Watchers stopped.").dim());
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
