#![cfg_attr(not(test), deny(clippy::panic))]

use axum::Router;
use bonk_room_server::config;
use bonk_room_server::logging;
use bonk_room_server::room::ban_list::BanList;
use bonk_room_server::room::core::{now_ms, RoomServer};
use bonk_room_server::room::admin_ops;
use bonk_room_server::{console, websocket};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// A single-room WebSocket game server speaking the legacy bonk-style opcode protocol.
#[derive(Parser, Debug)]
#[command(name = "bonk-room-server")]
#[command(about = "A lightweight, single-room WebSocket game server")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config_security(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Room name: {}", cfg.room_name_on_startup);
                println!("  Max players: {}", cfg.max_players);
                println!("  HTTPS enabled: {}", cfg.use_https);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let port = cfg.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let ban_list_path = PathBuf::from("banlist.json");
    let chat_log_dir = PathBuf::from("chatlogs");

    let ban_list = BanList::load(&ban_list_path).await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to load ban list; starting with an empty one");
        BanList::default()
    });

    tracing::info!(%addr, room = %cfg.room_name_on_startup, "Starting bonk room server");

    let server = Arc::new(RoomServer::new(cfg.clone(), ban_list, ban_list_path, chat_log_dir));

    let console_server = server.clone();
    tokio::spawn(async move {
        console::run(console_server).await;
    });

    let close_watch_server = server.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let guard = close_watch_server.lock().await;
            if admin_ops::scheduled_close_due(&guard, now_ms()) {
                tracing::info!("scheduled close due, shutting down");
                std::process::exit(0);
            }
        }
    });

    let router: Router<()> = websocket::create_router(&cfg.security.cors_origins).with_state(server);

    #[cfg(feature = "tls")]
    if cfg.use_https {
        let tls_config = bonk_room_server::security::build_rustls_config(&cfg.security.tls)?;
        tracing::info!(%addr, "Server listening (TLS)");
        axum_server::bind_rustls(addr, tls_config)
            .serve(router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
        return Ok(());
    }

    #[cfg(not(feature = "tls"))]
    if cfg.use_https {
        anyhow::bail!("useHttps is set but this binary was built without the `tls` feature");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
