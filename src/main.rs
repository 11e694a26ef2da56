use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jamrpc::config::{AppConfig, Mode};
use jamrpc::rpc::{MethodRegistry, RpcClient, RpcServer};
use jamrpc::{context, handlers, logging, simulation};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "jamrpc")]
#[command(about = "JSON-RPC control interface for a conferencing client or server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./jamrpc.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the RPC server
    Daemon(DaemonArgs),
    /// Call one method on a running instance and print the result
    Call(CallArgs),
    /// Print notifications pushed by a running instance
    Watch(RemoteArgs),
    /// Show mode and version of a running instance
    Status(RemoteArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args, Serialize)]
struct DaemonArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    rpc_bind: Option<SocketAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    max_frame_bytes: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    json_logs: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    simulation: Option<bool>,
}

#[derive(Args)]
struct RemoteArgs {
    /// Address of the running instance (defaults to the configured rpc_bind)
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[derive(Args)]
struct CallArgs {
    method: String,

    /// Params object as JSON, e.g. '{"name":"bass"}'
    params: Option<String>,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_file = cli.config.as_deref();

    let config = match &cli.command {
        Commands::Daemon(args) => AppConfig::load(config_file, Some(args)),
        _ => AppConfig::load(config_file, None::<&DaemonArgs>),
    }
    .context("Failed to load configuration")?;

    match &cli.command {
        Commands::Daemon(_) => run_daemon(config).await.context("Failed to run daemon")?,
        Commands::Call(args) => run_call(&config, args)
            .await
            .with_context(|| format!("Call to {} failed", args.method))?,
        Commands::Watch(args) => run_watch(&config, args)
            .await
            .context("Failed to watch notifications")?,
        Commands::Status(args) => run_status(&config, args)
            .await
            .context("Failed to check status of daemon")?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    logging::init((&config).into()).context("Failed to initialise logging")?;

    let ctx = context::AppContext::new(config);
    let mut registry = MethodRegistry::new();
    let domain = handlers::install(&ctx, &mut registry);
    tracing::info!(mode = %ctx.config.mode, methods = registry.len(), "Methods registered");
    tracing::debug!(names = ?registry.names(), "Registered methods");

    let server = RpcServer::bind(
        ctx.config.rpc_bind,
        registry,
        ctx.connections.clone(),
        ctx.config.transport_limits(),
    )
    .await?;

    if ctx.config.simulation {
        simulation::spawn(domain);
    }

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            shutdown.shutdown();
        }
    });

    server.start().await?;
    Ok(())
}

fn remote_addr(config: &AppConfig, args: &RemoteArgs) -> SocketAddr {
    args.addr.unwrap_or(config.rpc_bind)
}

async fn run_call(config: &AppConfig, args: &CallArgs) -> Result<()> {
    let params = args
        .params
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("Params must be valid JSON")?;

    let client = RpcClient::new(remote_addr(config, &args.remote));
    let result: Value = client.call(&args.method, params).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_watch(config: &AppConfig, args: &RemoteArgs) -> Result<()> {
    let client = RpcClient::new(remote_addr(config, args));
    let mut notifications = client.subscribe().await?;
    println!("Watching {} (Ctrl-C to stop)", client.addr());

    while let Some(notification) = notifications.next().await? {
        println!("{} {}", notification.method, notification.params);
    }

    println!("Connection closed");
    Ok(())
}

async fn run_status(config: &AppConfig, args: &RemoteArgs) -> Result<()> {
    let client = RpcClient::new(remote_addr(config, args));

    let mode: Value = client.call_no_params("jamulus/getMode").await?;
    let version: Value = client.call_no_params("jamulus/getVersion").await?;

    println!("Address: {}", client.addr());
    println!("Mode:    {}", mode["mode"].as_str().unwrap_or("unknown"));
    println!("Version: {}", version["version"].as_str().unwrap_or("unknown"));
    Ok(())
}
