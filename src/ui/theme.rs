use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Overall background color to paint the full frame
    pub background_color: Color,
    // Chat message styles
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_prefix_style: Style,
    pub assistant_text_style: Style,
    pub timestamp_style: Style,
    pub system_text_style: Style,

    // Chrome
    pub title_style: Style,
    pub sidebar_border_style: Style,
    pub sidebar_item_style: Style,
    pub sidebar_active_style: Style,
    pub streaming_indicator_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub status_style: Style,

    // Input area
    pub input_text_style: Style,
    pub input_cursor_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Rgb(2, 6, 23),
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_prefix_style: Style::default()
                .fg(Color::Rgb(129, 140, 248))
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(Color::White),
            timestamp_style: Style::default().fg(Color::DarkGray),
            system_text_style: Style::default().fg(Color::DarkGray),

            title_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
            sidebar_border_style: Style::default().fg(Color::DarkGray),
            sidebar_item_style: Style::default().fg(Color::Gray),
            sidebar_active_style: Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(129, 140, 248))
                .add_modifier(Modifier::BOLD),
            streaming_indicator_style: Style::default().fg(Color::Rgb(129, 140, 248)),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),
            status_style: Style::default().fg(Color::Yellow),

            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    /// Plain palette for terminals without color.
    pub fn monochrome() -> Self {
        let plain = Style::default();
        let bold = Style::default().add_modifier(Modifier::BOLD);
        Theme {
            background_color: Color::Reset,
            user_prefix_style: bold,
            user_text_style: plain,
            assistant_prefix_style: bold,
            assistant_text_style: plain,
            timestamp_style: plain,
            system_text_style: plain,
            title_style: bold,
            sidebar_border_style: plain,
            sidebar_item_style: plain,
            sidebar_active_style: Style::default().add_modifier(Modifier::REVERSED),
            streaming_indicator_style: plain,
            input_border_style: plain,
            input_title_style: plain,
            status_style: bold,
            input_text_style: plain,
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    /// `NO_COLOR` selects the monochrome palette.
    pub fn from_env() -> Self {
        if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            Self::monochrome()
        } else {
            Self::dark_default()
        }
    }
}
