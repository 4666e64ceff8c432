//! nowlog-ctl — inject frames onto the nowlog link and inspect the log.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::net::UdpSocket;

use nowlog_core::config::NowlogConfig;
use nowlog_core::wire::{encode_frame, FLAG_ENCRYPTED};
use nowlog_core::MacAddr;

const DEFAULT_TAIL_LINES: usize = 10;

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_send(
    config: &NowlogConfig,
    port: u16,
    from: MacAddr,
    channel: Option<u8>,
    encrypted: bool,
    text: &str,
) -> Result<()> {
    let channel = channel.unwrap_or(config.radio.channel);
    let flags = if encrypted { FLAG_ENCRYPTED } else { 0 };
    let frame = encode_frame(from, channel, flags, text.as_bytes())?;

    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .context("failed to bind local socket")?;
    socket
        .send_to(&frame, ("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to send to link port {port}"))?;

    println!(
        "Sent {} bytes from {} on channel {}{}",
        text.len(),
        from,
        channel,
        if encrypted { " (encrypted)" } else { "" }
    );
    Ok(())
}

fn cmd_tail(path: PathBuf, lines: usize) -> Result<()> {
    let text = match std::fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("No messages logged yet ({}).", path.display());
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };

    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    for line in &all[start..] {
        println!("{line}");
    }
    Ok(())
}

fn cmd_peers(config: &NowlogConfig) -> Result<()> {
    let peers = config.peer_descriptors()?;
    if peers.is_empty() {
        println!("No trusted peers configured.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Trusted Peers ({})", peers.len());
    println!("═══════════════════════════════════════");
    for p in &peers {
        println!("  ┌─ {}", p.address());
        println!("  │  channel   : {}", p.channel());
        println!("  │  interface : {}", p.interface());
        println!("  └─ encrypt   : {}", p.encrypt());
    }
    Ok(())
}

fn print_usage() {
    println!("Usage: nowlog-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  send --from <mac> [--channel <n>] [--encrypted] <text>");
    println!("                Inject a frame onto the link");
    println!("  tail [-n <lines>] [--path <file>]");
    println!("                Print the last logged messages");
    println!("  peers         List configured trusted peers");
    println!();
    println!("Options:");
    println!("  --port <port>   Link port (default: from config)");
}

// ── Argument helpers ──────────────────────────────────────────────────────────

/// Remove `flag` and its value from `args`.
fn take_value(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("{flag} requires a value");
            }
            let value = args.remove(i + 1);
            args.remove(i);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Remove a boolean `flag` from `args`.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config = NowlogConfig::load().context("failed to load config")?;

    let port = match take_value(&mut args, "--port")? {
        Some(p) => p.parse().context("--port must be a number")?,
        None => config.radio.link_port,
    };

    let Some(command) = (!args.is_empty()).then(|| args.remove(0)) else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "send" => {
            let from: MacAddr = take_value(&mut args, "--from")?
                .context("send requires --from <mac>")?
                .parse()?;
            let channel = take_value(&mut args, "--channel")?
                .map(|c| c.parse::<u8>())
                .transpose()
                .context("--channel must be a number")?;
            let encrypted = take_flag(&mut args, "--encrypted");
            if args.is_empty() {
                bail!("send requires message text");
            }
            cmd_send(&config, port, from, channel, encrypted, &args.join(" ")).await
        }
        "tail" => {
            let lines = take_value(&mut args, "-n")?
                .map(|n| n.parse::<usize>())
                .transpose()
                .context("-n must be a number")?
                .unwrap_or(DEFAULT_TAIL_LINES);
            let path = take_value(&mut args, "--path")?
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    config
                        .storage
                        .mount_point
                        .join(config.storage.log_name.trim_start_matches('/'))
                });
            cmd_tail(path, lines)
        }
        "peers" => cmd_peers(&config),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
