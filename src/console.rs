//! Stdin admin console (SPEC_FULL.md §4.O). Reads one command per line and
//! applies it to the shared room under the coarse lock, same as any other
//! mutation. Not exposed over the network — local operator access only.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::room::core::{now_ms, RoomServer};
use crate::room::{admin_ops, player_table::PlayerId};

/// Runs until stdin closes (EOF), processing one command per line.
pub async fn run(server: Arc<RoomServer>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(&server, &line).await,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "admin console read error");
                break;
            }
        }
    }
}

async fn handle_line(server: &Arc<RoomServer>, line: &str) {
    let mut parts = line.trim().split_whitespace();
    let Some(command) = parts.next() else { return };

    match command {
        "players" => {
            let guard = server.lock().await;
            for (id, name) in admin_ops::list_players(&guard) {
                println!("{id}\t{name}");
            }
        }
        "kick" => {
            let Some(id) = parts.next().and_then(|s| s.parse::<PlayerId>().ok()) else {
                println!("usage: kick <playerId>");
                return;
            };
            let mut guard = server.lock().await;
            let auto_assign_host = server.config.auto_assign_host;
            admin_ops::kick_player(&mut guard, id, auto_assign_host, now_ms());
        }
        "ban" => {
            let Some(id) = parts.next().and_then(|s| s.parse::<PlayerId>().ok()) else {
                println!("usage: ban <playerId>");
                return;
            };
            {
                let mut guard = server.lock().await;
                let auto_assign_host = server.config.auto_assign_host;
                admin_ops::ban_player(&mut guard, id, auto_assign_host, now_ms());
            }
            server.persist_ban_list().await;
        }
        "unban" => {
            let Some(username) = parts.next() else {
                println!("usage: unban <username>");
                return;
            };
            let removed = {
                let mut guard = server.lock().await;
                admin_ops::unban(&mut guard, username)
            };
            if removed {
                server.persist_ban_list().await;
            }
            println!("{}", if removed { "removed" } else { "not found" });
        }
        "transferhost" => {
            let Some(id) = parts.next().and_then(|s| s.parse::<PlayerId>().ok()) else {
                println!("usage: transferhost <playerId>");
                return;
            };
            let mut guard = server.lock().await;
            admin_ops::transfer_host(&mut guard, id, true);
        }
        "roomname" => {
            let Some(name) = parts.next() else {
                println!("usage: roomname <name>");
                return;
            };
            let mut guard = server.lock().await;
            admin_ops::set_room_name(&mut guard, name.to_string());
        }
        "password" => {
            let password = parts.next().map(str::to_string);
            let mut guard = server.lock().await;
            admin_ops::set_password(&mut guard, password);
        }
        "savechatlog" => {
            let mut guard = server.lock().await;
            let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string();
            if let Err(err) = admin_ops::save_chat_log(&mut guard, &server.chat_log_dir, &timestamp).await {
                tracing::warn!(error = %err, "failed to save chat log");
            }
        }
        "close" => {
            let force_after_ms = parts.next().and_then(|s| s.parse::<u64>().ok()).map(|mins| mins * 60_000);
            let mut guard = server.lock().await;
            admin_ops::schedule_close(&mut guard, force_after_ms, now_ms());
        }
        "abortclose" => {
            let mut guard = server.lock().await;
            admin_ops::abort_scheduled_close(&mut guard);
        }
        other => {
            println!("unknown command: {other}");
        }
    }
}
