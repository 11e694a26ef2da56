//! Stdin-driven domain events for trying the RPC interface without an
//! audio session.
//!
//! Client mode understands `connect`, `disconnect`, `chat <text>` and
//! `levels <n> <n> ...`; server mode understands
//! `record start|stop|restart`.

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::handlers::Domain;

/// Read commands from stdin on a background thread until stdin closes.
pub fn spawn(domain: Domain) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if let Err(e) = apply(&domain, &line) {
                warn!(error = %e, "(Simulator) {}", usage(&domain));
            }
        }
    });
}

/// Apply a single simulator command.
pub fn apply(domain: &Domain, command: &str) -> Result<()> {
    let command = command.trim();
    let (verb, rest) = command.split_once(' ').unwrap_or((command, ""));

    match (domain, verb) {
        (Domain::Client(client), "connect") => client.set_connected(true),
        (Domain::Client(client), "disconnect") => client.set_connected(false),
        (Domain::Client(client), "chat") => client.chat_text_received(rest.trim()),
        (Domain::Client(client), "levels") => {
            let levels = rest
                .split_whitespace()
                .map(|level| level.parse::<u16>())
                .collect::<Result<Vec<_>, _>>()
                .context("levels must be whole numbers")?;
            client.channel_levels_received(&levels);
        }
        (Domain::Server(server), "record") => match rest.trim() {
            "start" => server.start_recording(),
            "stop" => server.stop_recording(),
            "restart" => server.restart_recording(),
            other => bail!("unknown record action: {other:?}"),
        },
        _ => bail!("unknown command: {verb:?}"),
    }

    Ok(())
}

fn usage(domain: &Domain) -> &'static str {
    match domain {
        Domain::Client(_) => "Use: 'connect', 'disconnect', 'chat <text>' or 'levels <n>...'",
        Domain::Server(_) => "Use: 'record start|stop|restart'",
    }
}
