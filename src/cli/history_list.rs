//! Saved-conversation subcommands. Everything here requires a signed-in
//! user; guests have no persisted history to manage.

use std::error::Error;

use crate::auth::CredentialStore;
use crate::cli::HistoryCommands;
use crate::history::ChatHistoryStore;
use crate::storage::FileStore;

pub fn run(command: HistoryCommands) -> Result<(), Box<dyn Error>> {
    let store = FileStore::open_default()?;
    let accounts = CredentialStore::new(store.clone());
    let Some(user) = accounts.current_user() else {
        eprintln!("❌ Not signed in. Run 'kilnchat login' first.");
        return Ok(());
    };
    let histories = ChatHistoryStore::new(store);

    match command {
        HistoryCommands::List => {
            let listed = histories.list(&user.id);
            if listed.is_empty() {
                println!("No saved conversations yet.");
                return Ok(());
            }
            for history in listed {
                println!(
                    "{}  {}  [{}] {}",
                    history.id,
                    history.last_updated.format("%Y-%m-%d %H:%M"),
                    history.role.label(),
                    history.title
                );
            }
        }
        HistoryCommands::Show { id } => match histories.get(&user.id, &id) {
            Some(history) => {
                println!("[{}] {}", history.role.label(), history.title);
                println!();
                for message in &history.messages {
                    let speaker = if message.is_user() { "You" } else { "Assistant" };
                    println!(
                        "{} ({}):",
                        speaker,
                        message.timestamp.format("%Y-%m-%d %H:%M")
                    );
                    println!("{}", message.content);
                    println!();
                }
            }
            None => println!("No conversation with id {id}"),
        },
        HistoryCommands::Delete { id } => {
            histories.delete(&user.id, &id)?;
            println!("✅ Deleted {id}");
        }
        HistoryCommands::Clear => {
            histories.clear(&user.id)?;
            println!("✅ Cleared all saved conversations");
        }
    }
    Ok(())
}
