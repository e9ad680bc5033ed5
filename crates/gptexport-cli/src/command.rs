//! Hand-matched command line.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use gptexport_protocol::{ExportFormat, IncludeMessages};

/// Which message kinds an export keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Both,
    UserOnly,
    AssistantOnly,
}

impl Selection {
    pub fn include_messages(self) -> IncludeMessages {
        match self {
            Self::Both => IncludeMessages::all(),
            Self::UserOnly => IncludeMessages {
                user: true,
                assistant: false,
            },
            Self::AssistantOnly => IncludeMessages {
                user: false,
                assistant: true,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Export {
        conversation: PathBuf,
        format: Option<ExportFormat>,
        selection: Selection,
        out: Option<PathBuf>,
    },
    Menu {
        menu_item_id: String,
        conversation: PathBuf,
        out: Option<PathBuf>,
    },
    SignIn {
        username: String,
        password: String,
    },
    SignOut,
    WhoAmI,
    Formats,
    Help,
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Self::Help);
        };
        let rest = &args[1..];
        match name.as_str() {
            "export" => parse_export(rest),
            "menu" => {
                let [menu_item_id, conversation, flags @ ..] = rest else {
                    bail!("Usage: gptexport menu <menu-item-id> <conversation.json> [--out DIR]");
                };
                let mut out = None;
                let mut flags = flags.iter();
                while let Some(flag) = flags.next() {
                    match flag.as_str() {
                        "--out" => out = Some(PathBuf::from(value_of(flag, flags.next())?)),
                        other => bail!("Unknown option for menu: {}", other),
                    }
                }
                Ok(Self::Menu {
                    menu_item_id: menu_item_id.clone(),
                    conversation: PathBuf::from(conversation),
                    out,
                })
            }
            "signin" => match rest {
                [username, password] => Ok(Self::SignIn {
                    username: username.clone(),
                    password: password.clone(),
                }),
                _ => bail!("Usage: gptexport signin <username> <password>"),
            },
            "signout" => Ok(Self::SignOut),
            "whoami" => Ok(Self::WhoAmI),
            "formats" => Ok(Self::Formats),
            "--help" | "-h" | "help" => Ok(Self::Help),
            other => bail!("Unknown command: {}. Use 'gptexport help' for usage.", other),
        }
    }
}

fn parse_export(args: &[String]) -> Result<Command> {
    let Some((conversation, flags)) = args.split_first() else {
        bail!(
            "Usage: gptexport export <conversation.json> [--format F] [--user-only|--assistant-only] [--out DIR]"
        );
    };
    let mut format = None;
    let mut selection = Selection::Both;
    let mut out = None;

    let mut flags = flags.iter();
    while let Some(flag) = flags.next() {
        match flag.as_str() {
            "--format" | "-f" => {
                let name = value_of(flag, flags.next())?;
                format = Some(
                    ExportFormat::from_name(name)
                        .ok_or_else(|| anyhow!("Unknown format: {}", name))?,
                );
            }
            "--user-only" => selection = narrow(selection, Selection::UserOnly)?,
            "--assistant-only" => selection = narrow(selection, Selection::AssistantOnly)?,
            "--out" | "-o" => out = Some(PathBuf::from(value_of(flag, flags.next())?)),
            other => bail!("Unknown option for export: {}", other),
        }
    }

    Ok(Command::Export {
        conversation: PathBuf::from(conversation),
        format,
        selection,
        out,
    })
}

fn narrow(current: Selection, next: Selection) -> Result<Selection> {
    if current != Selection::Both && current != next {
        bail!("--user-only and --assistant-only cannot be combined");
    }
    Ok(next)
}

fn value_of<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str> {
    value
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{} needs a value", flag))
}

pub fn print_help() {
    println!("gptexport — export ChatGPT conversations");
    println!();
    println!("Usage: gptexport <command>");
    println!();
    println!("Commands:");
    println!("  export <conversation.json> [--format F] [--user-only|--assistant-only] [--out DIR]");
    println!("                           Export through the popup and confirm the dialog");
    println!("  menu <menu-item-id> <conversation.json> [--out DIR]");
    println!("                           Simulate a context-menu click");
    println!("  signin <user> <pass>     Sign in to the pro account");
    println!("  signout                  Sign out");
    println!("  whoami                   Show the signed-in account");
    println!("  formats                  List export formats");
    println!("  help                     Show this help message");
}
