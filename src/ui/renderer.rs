use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::ui::app::App;

pub const SIDEBAR_WIDTH: u16 = 30;
const MAX_INPUT_LINES: u16 = 6;

pub fn ui(f: &mut Frame, app: &App) {
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(app.theme.background_color)),
        area,
    );

    let columns = Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(area);
    render_sidebar(f, app, columns[0]);

    let input_lines = (app.textarea.lines().len() as u16).clamp(1, MAX_INPUT_LINES);
    let rows = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_lines + 2), // +2 for borders
    ])
    .split(columns[1]);

    render_transcript(f, app, rows[0]);
    render_input(f, app, rows[1]);
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let state = app.controller.state();
    let items: Vec<ListItem> = state
        .sessions()
        .iter()
        .map(|session| ListItem::new(session.title.clone()))
        .collect();

    let list = List::new(items)
        .style(app.theme.sidebar_item_style)
        .highlight_style(app.theme.sidebar_active_style)
        .block(
            Block::default()
                .borders(Borders::RIGHT)
                .border_style(app.theme.sidebar_border_style)
                .title(Line::styled("Sessions · Ctrl+N new", app.theme.title_style)),
        );

    let mut list_state = ListState::default().with_selected(state.active_index());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    // One row goes to the title.
    let available_height = area.height.saturating_sub(1);
    let lines = app.build_display_lines(area.width);
    let total_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);

    app.max_scroll
        .set(total_lines.saturating_sub(available_height));
    app.page_height.set(available_height);

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(Line::styled(app.title(), app.theme.title_style)))
        .scroll((app.current_scroll(), 0));
    f.render_widget(paragraph, area);
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let title = if app.is_awaiting() {
        "Waiting for Nexus (Ctrl+C to quit)"
    } else {
        "Message (Enter to send, Alt+Enter for new line, Ctrl+C to quit)"
    };

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.input_border_style)
        .title(Line::styled(title, app.theme.input_title_style));

    if app.is_awaiting() {
        block = block.title_top(
            Line::styled(pulse_symbol(app), app.theme.streaming_indicator_style).right_aligned(),
        );
    }
    if let Some(status) = &app.status {
        block = block.title_bottom(Line::styled(status.clone(), app.theme.status_style));
    }

    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(&app.textarea, inner);
}

fn pulse_symbol(app: &App) -> &'static str {
    // Two cycles per second.
    let elapsed = app.pulse_start.elapsed().as_millis() as f32 / 1000.0;
    let pulse_phase = (elapsed * 2.0) % 2.0;
    let pulse_intensity = if pulse_phase < 1.0 {
        pulse_phase
    } else {
        2.0 - pulse_phase
    };

    if pulse_intensity < 0.33 {
        "○"
    } else if pulse_intensity < 0.66 {
        "◐"
    } else {
        "●"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::ConversationController;
    use crate::core::store::SessionStore;
    use crate::utils::test_utils::{create_test_client, RecordingTransport};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn test_app() -> App {
        let transport = Arc::new(RecordingTransport::new());
        let client = Arc::new(create_test_client(transport, false));
        let controller = ConversationController::new(SessionStore::in_memory(), client);
        App::new(controller, "gemini-test".to_string(), false)
    }

    fn render(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..height {
            for x in 0..width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn welcome_screen_shows_title_and_suggestions() {
        let app = test_app();
        let screen = render(&app, 120, 20);
        assert!(screen.contains("gemini-test • relay"));
        assert!(screen.contains("F1  Synthesize a financial roadmap"));
        assert!(screen.contains("Sessions"));
    }

    #[test]
    fn sidebar_lists_sessions_and_transcript_shows_messages() {
        let mut app = test_app();
        let token = CancellationToken::new();
        let id = app.start_send("What is Rust?", &token).unwrap().stream_id;
        app.apply_stream_message(
            crate::core::chat_stream::StreamMessage::Chunk("A language.".into()),
            id,
        );
        app.apply_stream_message(crate::core::chat_stream::StreamMessage::End, id);

        let screen = render(&app, 100, 20);
        assert!(screen.contains("What is Rust?"));
        assert!(screen.contains("You · "));
        assert!(screen.contains("Nexus · "));
        assert!(screen.contains("A language."));
    }

    #[test]
    fn long_transcripts_scroll_to_bottom() {
        let mut app = test_app();
        let token = CancellationToken::new();
        for i in 0..10 {
            let id = app.start_send(&format!("question {i}"), &token).unwrap().stream_id;
            app.apply_stream_message(
                crate::core::chat_stream::StreamMessage::Chunk(format!("answer {i}")),
                id,
            );
            app.apply_stream_message(crate::core::chat_stream::StreamMessage::End, id);
        }

        let screen = render(&app, 100, 16);
        assert!(app.max_scroll.get() > 0);
        assert!(screen.contains("answer 9"));
        assert!(!screen.contains("answer 0"));
    }

    #[test]
    fn status_is_shown_under_the_input() {
        let mut app = test_app();
        app.set_status("Hold on");
        let screen = render(&app, 100, 12);
        assert!(screen.contains("Hold on"));
    }
}
