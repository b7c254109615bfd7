mod config;
mod events;
mod interpreter;
mod server;
mod session;
mod simulation;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use config::ServerConfig;
use deskterm::MovementConfig;
use server::SessionServer;

#[derive(Parser)]
#[command(name = "deskterm-server")]
#[command(about = "Authoritative pose and terminal server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = deskterm::DEFAULT_PORT)]
    port: u16,

    #[arg(
        short,
        long,
        default_value_t = 1,
        help = "Concurrent sessions; 1 serves a single session and exits"
    )]
    max_sessions: usize,

    #[arg(long, default_value_t = deskterm::DEFAULT_MOVE_SPEED)]
    move_speed: f32,

    #[arg(long, default_value_t = deskterm::SERVER_PITCH_LIMIT)]
    pitch_limit: f32,

    #[arg(long, default_value_t = deskterm::HISTORY_CAPACITY)]
    history_lines: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        bind: args.bind,
        port: args.port,
        max_sessions: args.max_sessions.max(1),
        movement: MovementConfig {
            move_speed: args.move_speed,
            pitch_limit: args.pitch_limit,
        },
        history_capacity: args.history_lines,
        ..Default::default()
    };

    let bind_addr = config.bind_addr();
    let server = SessionServer::bind(config)
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    log::info!("Server listening on {}", server.local_addr()?);

    if server.config().max_sessions == 1 {
        let report = server.serve_one().context("failed to accept session")?;
        log::info!("Session {} ended: {}", report.id, report.reason.as_str());
    } else {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(server.serve_concurrent(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        }))?;
        runtime.shutdown_timeout(Duration::from_secs(1));
    }

    log::info!("Server shutting down");
    Ok(())
}
