//! gptexport — export ChatGPT conversations from the command line.

use anyhow::Result;
use gptexport_cli::command::print_help;
use gptexport_cli::{Command, Session};
use gptexport_core::config::resolve_data_dir;
use gptexport_core::LocalStorage;
use gptexport_popup::{AuthRecord, Credentials, AUTH_KEY};
use gptexport_protocol::ExportFormat;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Formats => {
            for format in ExportFormat::all() {
                println!("  {:<10} {:<18} .{}", format.name(), format.label(), format.extension());
            }
            return Ok(());
        }
        _ => {}
    }

    let session = Session::open(&resolve_data_dir())?;

    match command {
        Command::Export {
            conversation,
            format,
            selection,
            out,
        } => {
            let saved = session
                .export(&conversation, format, selection, out.as_deref())
                .await?;
            println!("{}", saved.location);
        }
        Command::Menu {
            menu_item_id,
            conversation,
            out,
        } => {
            let outcome = session
                .context_menu(&menu_item_id, &conversation, out.as_deref())
                .await?;
            match &outcome.notification {
                Some(n) => println!("[{}] {}", n.title, n.message),
                None => println!("No menu item with id {}", menu_item_id),
            }
            if let Some(saved) = outcome.saved {
                println!("{}", saved.location);
            }
            if outcome.notification.map_or(true, |n| n.is_error()) {
                std::process::exit(1);
            }
        }
        Command::SignIn { username, password } => {
            let mut auth = session.auth();
            if auth.sign_in(&Credentials::new(username, password)) {
                println!("Welcome back to your pro account!");
            } else {
                eprintln!("Invalid credentials. Use username: test, password: test");
                std::process::exit(1);
            }
        }
        Command::SignOut => {
            session.auth().sign_out();
            println!("You have been successfully signed out.");
        }
        Command::WhoAmI => {
            let record = session
                .storage
                .get(AUTH_KEY)
                .map_err(|e| anyhow::anyhow!("Failed to read storage: {}", e))?
                .and_then(|v| serde_json::from_value::<AuthRecord>(v).ok());
            match record {
                Some(record) => {
                    let since = chrono::DateTime::from_timestamp_millis(record.authenticated_at)
                        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    println!("{} (pro, since {})", record.username, since);
                }
                None => println!("Not signed in"),
            }
        }
        Command::Help | Command::Formats => {}
    }

    Ok(())
}
