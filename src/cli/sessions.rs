//! Listing and deleting stored sessions without starting the chat UI.

use std::error::Error;

use chrono::Local;

use crate::core::session::Session;
use crate::core::state::ChatState;
use crate::core::store::SessionStore;

pub fn format_session_row(session: &Session) -> String {
    let created = session
        .created_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M");
    let count = session.messages.len();
    let noun = if count == 1 { "message" } else { "messages" };
    format!(
        "{}  {}  {:>3} {:<8}  {}",
        session.id, created, count, noun, session.title
    )
}

pub fn list_sessions(store: &SessionStore) -> Result<(), Box<dyn Error>> {
    let sessions = store.load()?;
    if sessions.is_empty() {
        println!("No saved sessions.");
        return Ok(());
    }
    for session in &sessions {
        println!("{}", format_session_row(session));
    }
    Ok(())
}

/// Remove one session. Unknown ids leave the store untouched.
pub fn remove_stored_session(store: &SessionStore, id: &str) -> Result<bool, Box<dyn Error>> {
    // A store that cannot be decoded is left alone rather than overwritten.
    let mut state = ChatState::new(store.load()?);
    if !state.remove_session(id) {
        return Ok(false);
    }
    store.save(&state.snapshot())?;
    Ok(true)
}

pub fn delete_session(store: &SessionStore, id: &str) -> Result<(), Box<dyn Error>> {
    if remove_stored_session(store, id)? {
        println!("✅ Deleted session {id}");
    } else {
        println!("No session with id {id}");
    }
    Ok(())
}
