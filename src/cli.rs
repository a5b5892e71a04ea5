//! Interactive console.
//!
//! Runs on its own OS thread so a blocked `readline` can never stall
//! the async runtime; the only thing flowing back to the main loop is
//! the quit signal. Bridge calls are synchronous and thread-safe.

use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::bridge::{Bridge, Target};
use crate::platform::midir::print_ports;

pub fn run_repl(bridge: Arc<Bridge>, client_name: String, quit_tx: mpsc::Sender<()>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let line = match rl.readline("pod> ") {
            Ok(line) => line,
            // Ctrl-C / Ctrl-D / closed stdin all mean quit.
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["quit"] | ["exit"] => break,
            ["help"] | ["?"] => print_help(),
            ["status"] => print_status(&bridge),
            ["channel"] => println!(
                "channel {}",
                (bridge.channel().wrapping_add(1)).to_string().cyan()
            ),
            ["ports"] => {
                if let Err(e) = print_ports(&client_name) {
                    println!("{} {}", "error:".red(), e);
                }
            }
            ["fbv", arg] if *arg == "on" || *arg == "off" => {
                bridge.set_enabled(Target::Fbv, *arg == "on");
            }
            ["pod", arg] if *arg == "on" || *arg == "off" => {
                bridge.set_enabled(Target::Pod, *arg == "on");
            }
            _ => println!("unknown command, try {}", "help".yellow()),
        }
    }

    let _ = quit_tx.blocking_send(());
    Ok(())
}

fn print_status(bridge: &Bridge) {
    let device = |target: Target| {
        let enabled = bridge.is_enabled(target);
        let connected = bridge.is_connected(target);
        match (enabled, connected) {
            (true, true) => "connected".green(),
            (true, false) => "enabled, not connected".yellow(),
            (false, _) => "disabled".dimmed(),
        }
    };

    println!("  FBV: {}", device(Target::Fbv));
    println!("  POD: {}", device(Target::Pod));
    println!(
        "  channel: {}",
        (bridge.channel().wrapping_add(1)).to_string().cyan()
    );
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  fbv on|off   enable or disable the foot controller");
    println!("  pod on|off   enable or disable the Pocket POD");
    println!("  channel      show the current channel (one-based)");
    println!("  status       show device and channel state");
    println!("  ports        list MIDI ports visible to the backend");
    println!("  quit         exit");
}
