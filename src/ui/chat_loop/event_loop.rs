//! Event polling, dispatching, and UI rendering loop.
//!
//! Terminal input is read on a background task and forwarded over a channel.
//! The loop redraws after every input event, every stream message, every
//! state change published by the chat state, and on a short tick while an
//! answer is pending so the activity indicator animates.

use std::error::Error;
use std::time::Duration;

use ratatui::backend::Backend;
use ratatui::crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::keybindings::{action_for, UiAction};
use crate::core::chat_stream::ChatStreamService;
use crate::ui::app::App;
use crate::ui::renderer::ui;
use crate::utils::clipboard::copy_to_clipboard;

const INDICATOR_FRAME: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

fn spawn_event_reader(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while !cancel_token.is_cancelled() {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    cancel_token: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let event_reader = spawn_event_reader(event_tx, cancel_token.clone());
    let mut changes = app.controller.state().subscribe();
    let mut indicator = tokio::time::interval(INDICATOR_FRAME);
    indicator.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let result = loop {
        if let Err(err) = terminal.draw(|f| ui(f, app)) {
            break Err(err.into());
        }

        tokio::select! {
            Some(event) = event_rx.recv() => {
                if handle_event(app, event, &stream_service, cancel_token) == LoopControl::Exit {
                    break Ok(());
                }
            }
            Some((message, stream_id)) = stream_rx.recv() => {
                app.apply_stream_message(message, stream_id);
            }
            Ok(()) = changes.changed() => {}
            _ = indicator.tick(), if app.is_awaiting() => {}
            else => break Ok(()),
        }
    };

    cancel_token.cancel();
    event_reader.abort();
    result
}

pub fn handle_event(
    app: &mut App,
    event: Event,
    stream_service: &ChatStreamService,
    cancel_token: &CancellationToken,
) -> LoopControl {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            handle_key(app, key, stream_service, cancel_token)
        }
        Event::Paste(text) => {
            app.textarea.insert_str(text);
            LoopControl::Continue
        }
        _ => LoopControl::Continue,
    }
}

pub fn handle_key(
    app: &mut App,
    key: KeyEvent,
    stream_service: &ChatStreamService,
    cancel_token: &CancellationToken,
) -> LoopControl {
    let action = action_for(&key);
    match action {
        UiAction::Quit => return LoopControl::Exit,
        UiAction::Send => {
            if let Some(params) = app.submit_input(cancel_token) {
                debug!(stream_id = params.stream_id, "Dispatching request");
                stream_service.spawn_stream(params);
            }
        }
        UiAction::Suggestion(index) => {
            if let Some(params) = app.submit_suggestion(index, cancel_token) {
                debug!(stream_id = params.stream_id, index, "Dispatching suggestion");
                stream_service.spawn_stream(params);
            }
        }
        UiAction::Newline => app.textarea.insert_newline(),
        UiAction::NewChat => app.new_chat(),
        UiAction::DeleteSession => app.delete_active_session(),
        UiAction::PreviousSession => app.select_relative(-1),
        UiAction::NextSession => app.select_relative(1),
        UiAction::PageUp => app.page_up(),
        UiAction::PageDown => app.page_down(),
        UiAction::CopyLast => app.copy_last_answer(copy_to_clipboard),
        UiAction::Edit => {
            app.status = None;
            app.textarea.input(tui_textarea::Input::from(key));
        }
    }
    LoopControl::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::ConversationController;
    use crate::core::store::SessionStore;
    use crate::utils::test_utils::{create_test_client, gemini_reply, RecordingTransport};
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::Arc;

    fn app_with(transport: Arc<RecordingTransport>) -> App {
        let client = Arc::new(create_test_client(transport, true));
        let controller = ConversationController::new(SessionStore::in_memory(), client);
        App::new(controller, "gemini-test".to_string(), false)
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    fn type_text(app: &mut App, service: &ChatStreamService, token: &CancellationToken, text: &str) {
        for ch in text.chars() {
            handle_event(app, press(KeyCode::Char(ch), KeyModifiers::NONE), service, token);
        }
    }

    #[tokio::test]
    async fn typed_message_round_trips_through_the_service() {
        let transport = Arc::new(RecordingTransport::new().with_post(200, &gemini_reply("Hi!")));
        let mut app = app_with(transport.clone());
        let (service, mut rx) = ChatStreamService::new();
        let token = CancellationToken::new();

        type_text(&mut app, &service, &token, "hello");
        assert_eq!(app.input_text(), "hello");
        handle_event(&mut app, press(KeyCode::Enter, KeyModifiers::NONE), &service, &token);
        assert!(app.is_awaiting());
        assert_eq!(app.input_text(), "");

        while app.stream.is_some() {
            let (message, id) = rx.recv().await.expect("stream message");
            app.apply_stream_message(message, id);
        }

        assert!(!app.is_awaiting());
        let session = app.controller.state().active_session().expect("session");
        let contents: Vec<_> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "Hi!"]);
        assert_eq!(transport.calls_to("POST"), 1);
    }

    #[tokio::test]
    async fn enter_while_waiting_does_not_dispatch() {
        let transport = Arc::new(RecordingTransport::new().with_post(200, &gemini_reply("one")));
        let mut app = app_with(transport);
        let (service, _rx) = ChatStreamService::new();
        let token = CancellationToken::new();

        type_text(&mut app, &service, &token, "a");
        handle_event(&mut app, press(KeyCode::Enter, KeyModifiers::NONE), &service, &token);
        type_text(&mut app, &service, &token, "b");
        handle_event(&mut app, press(KeyCode::Enter, KeyModifiers::NONE), &service, &token);

        assert_eq!(app.input_text(), "b");
        assert!(app.status.is_some());
        let session = app.controller.state().active_session().expect("session");
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn alt_enter_and_paste_edit_the_input() {
        let mut app = app_with(Arc::new(RecordingTransport::new()));
        let (service, _rx) = ChatStreamService::new();
        let token = CancellationToken::new();

        type_text(&mut app, &service, &token, "one");
        handle_event(&mut app, press(KeyCode::Enter, KeyModifiers::ALT), &service, &token);
        handle_event(&mut app, Event::Paste("two".to_string()), &service, &token);
        assert_eq!(app.input_text(), "one\ntwo");
    }

    #[test]
    fn quit_and_session_keys() {
        let mut app = app_with(Arc::new(RecordingTransport::new()));
        let (service, _rx) = ChatStreamService::new();
        let token = CancellationToken::new();

        handle_event(&mut app, press(KeyCode::Char('n'), KeyModifiers::CONTROL), &service, &token);
        assert_eq!(app.controller.state().sessions().len(), 1);
        handle_event(&mut app, press(KeyCode::Char('x'), KeyModifiers::CONTROL), &service, &token);
        assert!(app.controller.state().sessions().is_empty());

        assert_eq!(
            handle_event(&mut app, press(KeyCode::Esc, KeyModifiers::NONE), &service, &token),
            LoopControl::Exit
        );
    }
}
