//! Interactive REPL.

use crate::commands;
use colored::Colorize;
use rdtp_client::{ChatTransport, ClientError};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::io::Write;
use tokio::sync::broadcast;

pub async fn run(transport: ChatTransport) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "RDTP chat".bold().cyan());

    // Live chat messages print as they arrive (socket backend only)
    if let Some(mut pushes) = transport.subscribe_pushes() {
        tokio::spawn(async move {
            loop {
                match pushes.recv().await {
                    Ok(message) => {
                        print!("\n{} {}\n> ", "NEW MESSAGE:".bold().green(), message);
                        let _ = std::io::stdout().flush();
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        eprintln!("{}: dropped {} chat messages", "Warning".yellow(), n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".rdtp_history"))
        .unwrap_or_else(|_| ".rdtp_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match commands::execute(&transport, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break, // Exit command
                    Err(ClientError::NotAuthenticated) => {
                        println!("{}\n", "Please log in to use that command.".yellow())
                    }
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    // Disconnect
    transport.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}
