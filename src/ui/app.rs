//! View state for the chat screen: the controller plus everything that only
//! matters while the terminal UI is running (input box, scroll position,
//! the answer currently being received).

use std::cell::Cell;
use std::time::Instant;

use chrono::Local;
use ratatui::text::{Line, Span};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tui_textarea::TextArea;

use crate::core::chat_stream::{StreamMessage, StreamParams};
use crate::core::constants::SUGGESTED_PROMPTS;
use crate::core::controller::{ConversationController, PendingTurn, SendError};
use crate::core::message::{Message, Role};
use crate::core::text_wrapping::wrap_text;
use crate::ui::theme::Theme;

pub const USER_LABEL: &str = "You";
pub const ASSISTANT_LABEL: &str = "Nexus";

/// An answer that has been requested and not yet recorded.
#[derive(Debug)]
pub struct ActiveStream {
    pub id: u64,
    pub pending: PendingTurn,
    pub partial: String,
    pub error: Option<String>,
}

impl ActiveStream {
    /// What gets stored once the stream ends.
    fn final_content(&self) -> String {
        match &self.error {
            None => self.partial.clone(),
            Some(error) if self.partial.trim().is_empty() => error.clone(),
            Some(error) => format!("{}\n\n{}", self.partial, error),
        }
    }
}

pub struct App {
    pub controller: ConversationController,
    pub textarea: TextArea<'static>,
    pub theme: Theme,
    pub model: String,
    /// Show answers as they arrive instead of all at once.
    pub incremental: bool,
    pub stream: Option<ActiveStream>,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub status: Option<String>,
    pub pulse_start: Instant,
    next_stream_id: u64,
    // Written by the renderer so paging knows the current geometry.
    pub(crate) max_scroll: Cell<u16>,
    pub(crate) page_height: Cell<u16>,
}

impl App {
    pub fn new(controller: ConversationController, model: String, incremental: bool) -> Self {
        let mut app = Self {
            controller,
            textarea: TextArea::default(),
            theme: Theme::from_env(),
            model,
            incremental,
            stream: None,
            scroll_offset: 0,
            auto_scroll: true,
            status: None,
            pulse_start: Instant::now(),
            next_stream_id: 0,
            max_scroll: Cell::new(0),
            page_height: Cell::new(0),
        };
        app.configure_textarea();
        app
    }

    fn configure_textarea(&mut self) {
        self.textarea.set_style(self.theme.input_text_style);
        self.textarea
            .set_cursor_style(self.theme.input_cursor_style);
        self.textarea
            .set_cursor_line_style(ratatui::style::Style::default());
        self.textarea
            .set_placeholder_text("Ask Nexus anything…");
    }

    pub fn is_awaiting(&self) -> bool {
        self.controller.state().is_awaiting()
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.textarea = TextArea::default();
        self.configure_textarea();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Header shown above the transcript.
    pub fn title(&self) -> String {
        let backend = if self.controller.client().uses_relay() {
            "relay"
        } else {
            "gemini"
        };
        format!(
            "Nexchat v{} • {} • {}",
            env!("CARGO_PKG_VERSION"),
            self.model,
            backend
        )
    }

    /// Send whatever is in the input box. The box is cleared only when the
    /// turn was accepted.
    pub fn submit_input(&mut self, cancel_token: &CancellationToken) -> Option<StreamParams> {
        let text = self.input_text();
        let params = self.start_send(&text, cancel_token)?;
        self.clear_input();
        Some(params)
    }

    /// Send one of the welcome-screen suggestions. Only offered while the
    /// active conversation is empty.
    pub fn submit_suggestion(
        &mut self,
        index: usize,
        cancel_token: &CancellationToken,
    ) -> Option<StreamParams> {
        if !self.shows_welcome() {
            return None;
        }
        let prompt = SUGGESTED_PROMPTS.get(index)?;
        self.start_send(prompt, cancel_token)
    }

    pub fn start_send(
        &mut self,
        text: &str,
        cancel_token: &CancellationToken,
    ) -> Option<StreamParams> {
        let pending = match self.controller.begin_send(text) {
            Ok(pending) => pending,
            Err(SendError::Empty) => return None,
            Err(err @ SendError::Busy) => {
                self.set_status(format!("Hold on: {err}"));
                return None;
            }
        };

        self.next_stream_id += 1;
        let id = self.next_stream_id;
        let params = StreamParams {
            client: self.controller.client(),
            prompt: pending.prompt.clone(),
            history: pending.history.clone(),
            cancel_token: cancel_token.clone(),
            stream_id: id,
            incremental: self.incremental,
        };
        self.stream = Some(ActiveStream {
            id,
            pending,
            partial: String::new(),
            error: None,
        });
        self.status = None;
        self.auto_scroll = true;
        self.pulse_start = Instant::now();
        Some(params)
    }

    /// Fold one message from the stream service into the view. Messages for
    /// any stream other than the current one are ignored.
    pub fn apply_stream_message(&mut self, message: StreamMessage, stream_id: u64) {
        let Some(stream) = self.stream.as_mut().filter(|s| s.id == stream_id) else {
            debug!(stream_id, "Ignoring message for stale stream");
            return;
        };
        match message {
            StreamMessage::Chunk(text) => stream.partial.push_str(&text),
            StreamMessage::Error(error) => stream.error = Some(error),
            StreamMessage::End => {
                if let Some(stream) = self.stream.take() {
                    let content = stream.final_content();
                    self.controller.finish_send(&stream.pending, content);
                }
            }
        }
    }

    pub fn new_chat(&mut self) {
        self.controller.new_chat();
        self.reset_scroll();
    }

    pub fn delete_active_session(&mut self) {
        let Some(id) = self.controller.state().active_id().map(str::to_string) else {
            return;
        };
        self.controller.delete_session(&id);
        self.reset_scroll();
    }

    /// Hands the newest recorded answer of the active session to `copy` and
    /// reports the outcome in the status line.
    pub fn copy_last_answer<F>(&mut self, copy: F)
    where
        F: FnOnce(&str) -> Result<(), String>,
    {
        let last = self.controller.state().active_session().and_then(|session| {
            session
                .messages
                .iter()
                .rev()
                .find(|message| message.role == Role::Assistant)
                .map(|message| message.content.clone())
        });
        let Some(content) = last else {
            self.set_status("No answer to copy yet");
            return;
        };
        match copy(&content) {
            Ok(()) => self.set_status("Copied last answer to clipboard"),
            Err(err) => {
                debug!(error = %err, "Clipboard copy failed");
                self.set_status(format!("Clipboard error: {err}"));
            }
        }
    }

    pub fn select_relative(&mut self, offset: isize) {
        if self.controller.select_relative(offset) {
            self.reset_scroll();
        }
    }

    fn reset_scroll(&mut self) {
        self.scroll_offset = 0;
        self.auto_scroll = true;
    }

    pub fn page_up(&mut self) {
        let current = self.current_scroll();
        self.auto_scroll = false;
        self.scroll_offset = current.saturating_sub(self.page_height.get().max(1));
    }

    pub fn page_down(&mut self) {
        let max = self.max_scroll.get();
        let next = self
            .current_scroll()
            .saturating_add(self.page_height.get().max(1));
        if next >= max {
            self.scroll_offset = max;
            self.auto_scroll = true;
        } else {
            self.scroll_offset = next;
        }
    }

    /// Effective scroll offset for the last rendered geometry.
    pub fn current_scroll(&self) -> u16 {
        let max = self.max_scroll.get();
        if self.auto_scroll {
            max
        } else {
            self.scroll_offset.min(max)
        }
    }

    /// True when the welcome screen (with suggestions) is on display.
    pub fn shows_welcome(&self) -> bool {
        let awaiting_here = self.stream.is_some();
        let empty = self
            .controller
            .state()
            .active_session()
            .is_none_or(|session| session.is_empty());
        empty && !awaiting_here
    }

    /// Transcript lines for the active session, wrapped to `width`.
    pub fn build_display_lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = usize::from(width);
        if self.shows_welcome() {
            return self.welcome_lines(width);
        }

        let mut lines = Vec::new();
        let state = self.controller.state();
        let active = state.active_session();
        if let Some(session) = active {
            for message in &session.messages {
                self.push_message_lines(&mut lines, message, width);
            }
        }

        if let Some(stream) = &self.stream {
            if active.is_some_and(|s| s.id == stream.pending.session_id) {
                lines.push(Line::from(vec![
                    Span::styled(ASSISTANT_LABEL, self.theme.assistant_prefix_style),
                    Span::styled(" · thinking…", self.theme.timestamp_style),
                ]));
                if !stream.partial.is_empty() {
                    for text in wrap_text(&stream.partial, width) {
                        lines.push(Line::styled(text, self.theme.assistant_text_style));
                    }
                }
            }
        }
        lines
    }

    fn push_message_lines(&self, lines: &mut Vec<Line<'static>>, message: &Message, width: usize) {
        let (label, label_style, text_style) = if message.is_user() {
            (
                USER_LABEL,
                self.theme.user_prefix_style,
                self.theme.user_text_style,
            )
        } else {
            (
                ASSISTANT_LABEL,
                self.theme.assistant_prefix_style,
                self.theme.assistant_text_style,
            )
        };
        let clock = message
            .timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string();
        lines.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::styled(format!(" · {clock}"), self.theme.timestamp_style),
        ]));
        for text in wrap_text(&message.content, width) {
            lines.push(Line::styled(text, text_style));
        }
        lines.push(Line::default());
    }

    fn welcome_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::styled("Welcome to Nexchat", self.theme.title_style),
            Line::default(),
        ];
        for text in wrap_text("Type a message below, or press a key to try one of these:", width) {
            lines.push(Line::styled(text, self.theme.system_text_style));
        }
        lines.push(Line::default());
        for (index, prompt) in SUGGESTED_PROMPTS.iter().enumerate() {
            let entry = format!("F{}  {}", index + 1, prompt);
            for text in wrap_text(&entry, width) {
                lines.push(Line::styled(text, self.theme.assistant_text_style));
            }
        }
        lines
    }
}
