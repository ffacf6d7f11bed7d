//! The interactive chat loop.
//!
//! A plain line-based prompt: slash commands manage the session, anything
//! else is sent to the model. Replies are printed section by section using
//! the post-processor, so structured answers keep their headings and
//! anything else renders as-is.

use std::error::Error;
use std::io::{self, BufRead, Write};

use crate::api::client::HttpModelClient;
use crate::api::SamplingParams;
use crate::auth::{CredentialStore, User};
use crate::cli::account;
use crate::core::config::Config;
use crate::core::format::split_sections;
use crate::core::message::Message;
use crate::core::role::{ExpertiseRole, ROLE_TABLE};
use crate::core::secrets::{self, MissingApiKeyError};
use crate::core::session::ChatSession;
use crate::history::ChatHistoryStore;
use crate::storage::{FileStore, KeyValueStore};

enum CommandOutcome {
    Continue,
    Quit,
}

pub async fn run_chat(
    model: Option<String>,
    role_flag: Option<String>,
    env_only: bool,
) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    let credentials = match secrets::resolve_credentials(!env_only, config.base_url.as_deref()) {
        Ok(credentials) => credentials,
        Err(err) => {
            if let Some(missing) = err.downcast_ref::<MissingApiKeyError>() {
                eprintln!("{missing}");
                eprintln!();
                eprintln!("💡 Quick fixes:");
                for fix in missing.quick_fixes() {
                    eprintln!("  • {fix}");
                }
                std::process::exit(missing.exit_code());
            }
            return Err(err);
        }
    };

    let store = FileStore::open_default()?;
    let accounts = CredentialStore::new(store.clone());
    let histories = ChatHistoryStore::new(store);
    let user = accounts.current_user();

    let client = HttpModelClient::new(
        credentials.base_url,
        credentials.api_key,
        model.unwrap_or_else(|| config.model_name()),
    );
    let sampling = config.sampling();

    let role = starting_role(role_flag.or(config.default_role.clone()), user.as_ref());
    let mut session = ChatSession::new(role);

    greet(&session, user.as_ref(), client.model());

    let stdin = io::stdin();
    loop {
        print!("[{}] > ", session.role().label());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            match handle_command(&mut session, &histories, user.as_ref(), line) {
                CommandOutcome::Continue => continue,
                CommandOutcome::Quit => break,
            }
        }

        match session
            .send_message(line, &client, &sampling, &histories, user.as_ref())
            .await
        {
            Ok(()) => match session.error() {
                Some(err) => {
                    eprintln!("❌ {err}");
                    eprintln!("   Use /dismiss to clear the error, then try again.");
                }
                None => {
                    if let Some(reply) = session.messages().last().filter(|m| m.is_assistant()) {
                        print_reply(reply);
                    }
                }
            },
            Err(blocked) => eprintln!("⚠️  {blocked}"),
        }
    }

    Ok(())
}

fn greet(session: &ChatSession, user: Option<&User>, model: &str) {
    println!("🏭 Kilnchat: cement plant engineering assistant");
    println!("📡 Using model: {model}");
    match user {
        Some(user) => println!("{}", account::signed_in_line(user)),
        None => println!("Guest mode: sign in to unlock General AI and saved conversations"),
    }
    println!(
        "Role: {}. Use /role to switch and /help for commands.",
        session.role().label()
    );
    println!();
}

/// Resolve the starting role from flag/config, falling back to the default
/// when it is unknown or requires an account the user does not have.
fn starting_role(requested: Option<String>, user: Option<&User>) -> ExpertiseRole {
    let Some(requested) = requested else {
        return ExpertiseRole::default();
    };
    match ExpertiseRole::try_from(requested.as_str()) {
        Ok(role) if role.requires_account() && user.is_none() => {
            eprintln!("⚠️  {} is only available to signed-in users", role.label());
            ExpertiseRole::default()
        }
        Ok(role) => role,
        Err(err) => {
            eprintln!("⚠️  {err}");
            ExpertiseRole::default()
        }
    }
}

fn handle_command<S: KeyValueStore>(
    session: &mut ChatSession,
    histories: &ChatHistoryStore<S>,
    user: Option<&User>,
    line: &str,
) -> CommandOutcome {
    let mut parts = line[1..].splitn(2, ' ');
    let name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    match name {
        "help" => print_help(),
        "role" => {
            if args.is_empty() {
                print_roles(session, user);
            } else {
                switch_role(session, user, args);
            }
        }
        "new" => {
            session.new_chat();
            println!("Started a new conversation.");
        }
        "history" => match user {
            Some(user) => {
                let listed = histories.list(&user.id);
                if listed.is_empty() {
                    println!("No saved conversations yet.");
                }
                for history in listed {
                    println!("{}  [{}] {}", history.id, history.role.label(), history.title);
                }
            }
            None => println!("Sign in to keep conversation history."),
        },
        "load" => match user {
            Some(user) => match histories.get(&user.id, args) {
                Some(history) => {
                    session.load_history(&history);
                    println!("Loaded '{}' ({} messages).", history.title, history.messages.len());
                }
                None => println!("No conversation with id {args}"),
            },
            None => println!("Sign in to load saved conversations."),
        },
        "dismiss" => match session.dismiss_error() {
            Some(_) => println!("Error dismissed."),
            None => println!("No active error."),
        },
        "quit" | "exit" => return CommandOutcome::Quit,
        _ => println!("Unknown command '/{name}'. /help lists the commands."),
    }
    CommandOutcome::Continue
}

fn print_help() {
    println!("Commands:");
    println!("  /role [name]   Show or switch the expertise role");
    println!("  /new           Start a fresh conversation");
    println!("  /history       List saved conversations");
    println!("  /load <id>     Continue a saved conversation");
    println!("  /dismiss       Clear the current error");
    println!("  /quit          Leave the chat");
}

fn print_roles(session: &ChatSession, user: Option<&User>) {
    for spec in ROLE_TABLE {
        let current = if spec.role == session.role() { "▶" } else { " " };
        let gate = if spec.role.requires_account() && user.is_none() {
            " (sign in required)"
        } else {
            ""
        };
        println!(
            "{current} {:<24} {}{gate}",
            spec.id, spec.description
        );
    }
}

fn switch_role(session: &mut ChatSession, user: Option<&User>, wanted: &str) {
    match ExpertiseRole::try_from(wanted) {
        Ok(role) if role.requires_account() && user.is_none() => {
            println!("{} is only available to signed-in users.", role.label());
        }
        Ok(role) => {
            session.set_role(role);
            println!("Switched to {}.", role.label());
        }
        Err(err) => println!("{err}"),
    }
}

fn print_reply(message: &Message) {
    println!();
    for section in split_sections(&message.content) {
        if let Some(heading) = &section.heading {
            println!("{} {}", section.kind.marker(), heading);
        }
        if !section.body.is_empty() {
            println!("{}", section.body);
        }
        println!();
    }
}
