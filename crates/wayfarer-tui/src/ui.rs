use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use wayfarer_core::{BackendStatus, ChatRole, Message};
use crate::app::{App, InputMode};

const MAX_INPUT_ROWS: u16 = 4;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' || chars.peek() != Some(&'*') {
            current_text.push(c);
            continue;
        }
        // Consume the second *
        chars.next();

        let mut bold_text = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                found_close = true;
                break;
            }
            bold_text.push(c);
        }

        if found_close && !bold_text.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
        } else {
            // No closing **, treat as literal
            current_text.push_str("**");
            current_text.push_str(&bold_text);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let error_height = if app.session.state().last_error().is_some() { 1 } else { 0 };
    let input_rows = (app.session.state().pending_input().split('\n').count() as u16)
        .clamp(1, MAX_INPUT_ROWS);

    // Main layout: header, transcript, error banner, input, footer
    let [header_area, chat_area, error_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(error_height),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    if error_height > 0 {
        render_error_banner(app, frame, error_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn status_style(status: BackendStatus) -> Style {
    match status {
        BackendStatus::Ready => Style::default().fg(Color::Black).bg(Color::Green),
        BackendStatus::Error => Style::default().fg(Color::White).bg(Color::Red),
        BackendStatus::Checking => Style::default().fg(Color::Black).bg(Color::Yellow),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = app.session.state().backend_status();

    let title = Line::from(vec![
        Span::styled(" AI Travel Planner ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", status.display_name()), status_style(status)),
        Span::raw(" "),
        Span::styled(app.base_url.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let time = Span::styled(
        format!("  {}", message.timestamp().format("%H:%M")),
        Style::default().fg(Color::DarkGray),
    );

    match message.sender() {
        ChatRole::User => {
            lines.push(Line::from(vec![
                Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                time,
            ]));
            for line in message.text().lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Bot => {
            lines.push(Line::from(vec![
                Span::styled("AI", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                time,
            ]));
            if message.id().is_error_reply() {
                for line in message.text().lines() {
                    lines.push(Line::styled(line.to_string(), Style::default().fg(Color::Red)));
                }
            } else {
                for line in message.text().lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
    }

    lines.push(Line::default());
    lines
}

/// Rows `lines` take once wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width) as u16)
        .fold(0u16, u16::saturating_add)
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Chat ");

    let inner = block.inner(area);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    let state = app.session.state();

    if state.transcript().is_empty() && !state.is_in_flight() {
        app.total_chat_lines = 0;
        app.chat_scroll = 0;
        let placeholder = Text::from(vec![
            Line::default(),
            Line::from("Start chatting below!"),
            Line::styled("Ask your travel questions", Style::default().fg(Color::DarkGray)),
        ]);
        let paragraph = Paragraph::new(placeholder)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let mut lines: Vec<Line> = state.transcript().iter().flat_map(message_lines).collect();

    if state.is_in_flight() {
        lines.push(Line::from(Span::styled(
            "AI",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("{} AI Thinking...", app.spinner()),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    app.total_chat_lines = wrapped_height(&lines, app.chat_width);
    if app.follow_tail {
        app.chat_scroll = app.max_scroll();
    } else {
        app.chat_scroll = app.chat_scroll.min(app.max_scroll());
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(paragraph, area);

    if app.total_chat_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(app.max_scroll() as usize)
            .position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_error_banner(app: &App, frame: &mut Frame, area: Rect) {
    let Some(error) = app.session.state().last_error() else {
        return;
    };
    let banner = Paragraph::new(error.to_string())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::LightRed).bg(Color::Black));
    frame.render_widget(banner, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let state = app.session.state();
    let editing = app.input_mode == InputMode::Editing;

    let (title, border_color) = if state.is_in_flight() {
        (" Waiting for reply... ", Color::DarkGray)
    } else if editing {
        (" Message (Enter to send, Alt+Enter for newline) ", Color::Yellow)
    } else {
        (" Message (i to type) ", Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Cursor position as (row, column) within the pending text
    let before_cursor: String = state.pending_input().chars().take(app.input_cursor).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|tail| tail.chars().count())
        .unwrap_or(0);

    // Scroll so the cursor stays visible
    let row_offset = cursor_row.saturating_sub(inner_height.saturating_sub(1));
    let col_offset = if inner_width == 0 {
        0
    } else {
        cursor_col.saturating_sub(inner_width - 1)
    };

    let visible: Vec<Line> = state
        .pending_input()
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let text_color = if state.is_in_flight() { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(visible)
        .style(Style::default().fg(text_color))
        .block(block);

    frame.render_widget(input, area);

    if editing && !state.is_in_flight() {
        frame.set_cursor_position((
            area.x + 1 + (cursor_col - col_offset) as u16,
            area.y + 1 + (cursor_row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" s ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };
    hints.extend(vec![
        Span::styled(" ^S ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" ^R ", key_style),
        Span::styled(" recheck backend ", label_style),
        Span::styled(" ^C ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};
    use wayfarer_core::{ChatError, ConnectivityError, HealthOutcome};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_empty_session_shows_placeholder_and_checking() {
        let (mut app, _rx) = test_app(Ok(String::new()));
        let screen = draw(&mut app);
        assert!(screen.contains("Start chatting below!"));
        assert!(screen.contains("Checking"));
    }

    #[test]
    fn test_transcript_and_thinking_indicator() {
        let (mut app, _rx) = test_app(Ok(String::new()));
        app.session.resolve_probe(HealthOutcome::Ready);
        let ticket = app.session.submit("Where should I go in spring?").unwrap();

        let screen = draw(&mut app);
        assert!(screen.contains("Online"));
        assert!(screen.contains("Where should I go in spring?"));
        assert!(screen.contains("AI Thinking..."));

        app.session.resolve_chat(ticket, Ok("Paris is **lovely**".to_string()));
        let screen = draw(&mut app);
        assert!(screen.contains("Paris is lovely"));
        assert!(!screen.contains("AI Thinking..."));
    }

    #[test]
    fn test_error_banner_and_inline_error() {
        let (mut app, _rx) = test_app(Ok(String::new()));
        app.session.resolve_probe(HealthOutcome::Unreachable(ConnectivityError::BadStatus(502)));
        let ticket = app.session.submit("Car rental in Crete").unwrap();
        app.session.resolve_chat(
            ticket,
            Err(ChatError::RequestFailed { status: 500, detail: Some("quota exceeded".to_string()) }),
        );

        let screen = draw(&mut app);
        assert!(screen.contains("Error: quota exceeded"));
        assert!(screen.contains(" Error "));
    }

    #[test]
    fn test_long_transcript_follows_tail() {
        let (mut app, _rx) = test_app(Ok(String::new()));
        for i in 0..20 {
            let ticket = app.session.submit(&format!("question {}", i)).unwrap();
            app.session.resolve_chat(ticket, Ok(format!("answer {}", i)));
        }

        let screen = draw(&mut app);
        assert!(app.chat_scroll > 0);
        assert_eq!(app.chat_scroll, app.max_scroll());
        assert!(screen.contains("answer 19"));
        assert!(!screen.contains("question 0 "));
    }

    #[test]
    fn test_parse_markdown_line_bold() {
        let line = parse_markdown_line("Visit **Kyoto** in autumn");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Kyoto");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_line_unclosed() {
        let line = parse_markdown_line("5 ** 2");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "5 ** 2");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("x".repeat(25)), Line::default()];
        assert_eq!(wrapped_height(&lines, 10), 4);
    }
}
