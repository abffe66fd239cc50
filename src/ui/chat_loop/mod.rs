//! Full-screen chat session.

pub mod event_loop;
pub mod keybindings;
pub mod lifecycle;

use std::error::Error;

use tokio_util::sync::CancellationToken;

use crate::ui::app::App;
use event_loop::run_event_loop;
use lifecycle::{restore_terminal, setup_terminal};

pub async fn run_chat(mut app: App) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;
    let cancel_token = CancellationToken::new();

    let result = run_event_loop(&mut terminal, &mut app, &cancel_token).await;

    cancel_token.cancel();
    restore_terminal(&mut terminal)?;
    result
}
