use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use wicket::config::ServerConfig;
use wicket::middleware::{handler, LoggingMiddleware, MetricsMiddleware};
use wicket::runtime_config::RuntimeConfig;
use wicket::server::{Context, ContextExt, Server, ServerOptions};

/// Echo service exercising route vars, binding and codec negotiation.
#[derive(Parser, Debug)]
#[command(name = "wicket", version, about)]
struct Cli {
    /// YAML server configuration
    #[arg(long, env = "WICKET_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address; overrides the config file
    #[arg(long)]
    addr: Option<String>,

    /// Log level; overrides WICKET_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct Greeting {
    #[serde(default)]
    greeting: Option<String>,
}

fn build_server(config: &ServerConfig, metrics: &MetricsMiddleware) -> Server {
    let options = ServerOptions::from_config(config)
        .with_middleware(Arc::new(LoggingMiddleware))
        .with_middleware(Arc::new(metrics.clone()));
    let mut server = Server::new(options);

    let stats = metrics.clone();
    let mut root = server.route("/");
    root.get("/health", |ctx: &mut dyn Context| {
        ctx.json(200, &serde_json::json!({ "status": "ok" }))
    })
    .get("/metrics", move |ctx: &mut dyn Context| {
        ctx.result(
            200,
            &serde_json::json!({
                "requests": stats.request_count(),
                "errors": stats.error_count(),
                "average_latency_us": stats.average_latency().as_micros() as u64,
            }),
        )
    })
    .get("/hello/{name}", |ctx: &mut dyn Context| {
        let mut query = Greeting::default();
        ctx.bind_query(&mut query)?;
        let name = ctx.vars().get("name").unwrap_or("world").to_string();
        let greeting = query.greeting.unwrap_or_else(|| "hello".to_string());
        ctx.result(200, &serde_json::json!({ "message": format!("{greeting}, {name}") }))
    })
    .post("/echo", |ctx: &mut dyn Context| {
        let mut body = Value::Null;
        ctx.bind(&mut body)?;
        let scope = ctx.scope().cloned().unwrap_or_default();
        let h = ctx.middleware(handler(|_, req| Ok(req)));
        let reply = h(&scope, body);
        ctx.returns(reply)
    });
    server
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = match &cli.log_level {
        Some(level) => wicket::logging::init_logging(level),
        None => wicket::logging::init_logging_with_config(&wicket::logging::LogConfig::from_env()),
    }?;

    RuntimeConfig::from_env().apply();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = cli.addr {
        config.address = addr;
    }

    let metrics = MetricsMiddleware::new();
    let server = build_server(&config, &metrics);
    let handle = server
        .start(config.address.as_str())
        .with_context(|| format!("binding {}", config.address))?;
    handle.wait_ready().context("server did not become ready")?;

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGTERM, SIGINT]).context("installing signal handlers")?;
        if let Some(signal) = signals.forever().next() {
            info!(signal, "Shutdown signal received");
        }
        handle.stop();
        info!(
            requests = metrics.request_count(),
            errors = metrics.error_count(),
            "Server stopped"
        );
    }

    #[cfg(not(unix))]
    {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("server coroutine panicked"))?;
    }

    Ok(())
}
