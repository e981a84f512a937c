use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use codegen_chat_core::{ChatMessage, ChatRole};
use crate::app::{App, InputMode};

const KEYWORDS: &[&str] = &[
    // shared across the languages the service usually answers in
    "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "def",
    "default", "do", "elif", "else", "enum", "except", "export", "extends", "false", "False",
    "finally", "fn", "for", "from", "func", "function", "if", "impl", "import", "in",
    "interface", "let", "loop", "match", "mod", "mut", "new", "nil", "None", "null", "package",
    "pass", "private", "protected", "pub", "public", "raise", "return", "self", "static",
    "struct", "switch", "this", "throw", "trait", "true", "True", "try", "type", "use", "var",
    "void", "while", "with", "yield",
];

fn code_style() -> Style {
    Style::default().fg(Color::White)
}

/// Tokenize one line of source into styled spans.
///
/// Not a parser: highlights keywords, string literals, numbers and line
/// comments, which is enough to make generated snippets readable.
pub fn highlight_code_line(text: &str) -> Line<'static> {
    let trimmed = text.trim_start();
    if trimmed.starts_with("```") {
        return Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if trimmed.starts_with('#') && !trimmed.starts_with("#[") && !trimmed.starts_with("#!") {
        return Line::from(Span::styled(text.to_string(), comment_style()));
    }

    let chars: Vec<char> = text.chars().collect();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    let flush = |plain: &mut String, spans: &mut Vec<Span<'static>>| {
        if !plain.is_empty() {
            spans.push(Span::styled(std::mem::take(plain), code_style()));
        }
    };

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            flush(&mut plain, &mut spans);
            let rest: String = chars[i..].iter().collect();
            spans.push(Span::styled(rest, comment_style()));
            i = chars.len();
        } else if c == '"' || c == '\'' || c == '`' {
            flush(&mut plain, &mut spans);
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            let end = (i + 1).min(chars.len());
            let literal: String = chars[start..end].iter().collect();
            spans.push(Span::styled(literal, Style::default().fg(Color::Green)));
            i = end;
        } else if c.is_ascii_digit() {
            flush(&mut plain, &mut spans);
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                i += 1;
            }
            let number: String = chars[start..i].iter().collect();
            spans.push(Span::styled(number, Style::default().fg(Color::Magenta)));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if KEYWORDS.contains(&word.as_str()) {
                flush(&mut plain, &mut spans);
                spans.push(Span::styled(
                    word,
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ));
            } else {
                plain.push_str(&word);
            }
        } else {
            plain.push(c);
            i += 1;
        }
    }
    flush(&mut plain, &mut spans);

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn comment_style() -> Style {
    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_endpoint_input {
        render_endpoint_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Code Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("→ {}", app.controller.generator_name()),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_header(msg: &ChatMessage, selected: bool) -> Line<'static> {
    match msg.role {
        ChatRole::User => Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        ChatRole::Assistant => {
            let mut spans = vec![Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )];
            if msg.is_code {
                let hint = if selected { "  [y] copy" } else { "" };
                spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
            }
            Line::from(spans)
        }
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area for mouse hit-testing and scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Conversation ");

    let chat = chat_paragraph(app)
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// The transcript as it is drawn, wrapped the same way for rendering and
/// for scroll math.
pub fn chat_paragraph(app: &App) -> Paragraph<'static> {
    let chat_text = if app.messages().is_empty() && !app.is_busy() {
        Text::from(Span::styled(
            "Describe the code you want and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let selected = app.selected_code.or_else(|| {
            app.controller.conversation().code_message_indices().last().copied()
        });
        let mut lines: Vec<Line> = Vec::new();

        for (idx, msg) in app.messages().iter().enumerate() {
            let is_selected = selected == Some(idx);
            lines.push(message_header(msg, is_selected));

            if msg.is_code {
                let gutter_style = if is_selected {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                for line in msg.content.lines() {
                    let mut code_line = highlight_code_line(line);
                    code_line.spans.insert(0, Span::styled("│ ", gutter_style));
                    lines.push(code_line);
                }
            } else if msg.is_failure() {
                for line in msg.content.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(Color::Red),
                    )));
                }
            } else {
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            lines.push(Line::default());
        }

        if app.is_busy() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Generating{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    Paragraph::new(chat_text).wrap(Wrap { trim: false })
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.is_busy();
    let editing = app.input_mode == InputMode::Editing && !busy;

    let (border_color, title) = if busy {
        (Color::DarkGray, " Waiting for response... ")
    } else if editing {
        (Color::Yellow, " Prompt (Enter to send, Esc for commands) ")
    } else {
        (Color::DarkGray, " Prompt (i to type) ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input().is_empty() && !busy {
        Paragraph::new("Type your request here...")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = app
            .input()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let style = if busy {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if editing && !app.show_endpoint_input {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    let hints: &[(&str, &str)] = if app.show_endpoint_input {
        &[(" Enter ", " save "), (" Esc ", " cancel ")]
    } else {
        match app.input_mode {
            InputMode::Editing => &[(" Enter ", " send "), (" Esc ", " commands ")],
            InputMode::Normal => &[
                (" j/k ", " scroll "),
                (" n/N ", " code "),
                (" y ", " copy "),
                (" E ", " endpoint "),
                (" i ", " type "),
                (" q ", " quit "),
            ],
        }
    };
    for (key, label) in hints {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    if let Some(status) = &app.status {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_endpoint_input(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 7;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(area);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Code Generation Endpoint ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    if inner.height < 5 {
        return;
    }

    let instructions = Paragraph::new("Enter the full URL, e.g. https://…/generate-code")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    // Input field, scrolled so the cursor stays visible
    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let scroll_offset = if width > 0 && app.endpoint_input_cursor >= width {
        app.endpoint_input_cursor - width + 1
    } else {
        0
    };
    let visible: String = app
        .endpoint_input
        .chars()
        .skip(scroll_offset)
        .take(width)
        .collect();
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let cursor_x = (app.endpoint_input_cursor - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    if let Some(error) = &app.endpoint_error {
        let error_line = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error_line, Rect::new(inner.x, inner.y + 4, inner.width, 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_with, Gate};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut screen = String::new();
        for row in buffer.content.chunks(buffer.area.width as usize) {
            for cell in row {
                screen.push_str(cell.symbol());
            }
            screen.push('\n');
        }
        screen
    }

    fn span_text(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_keywords_strings_numbers() {
        let line = highlight_code_line("let name = \"x\"; // note 1");
        assert_eq!(
            span_text(&line),
            vec!["let", " name = ", "\"x\"", "; ", "// note 1"]
        );
        assert_eq!(line.spans[0].style.fg, Some(Color::Yellow));
        assert_eq!(line.spans[2].style.fg, Some(Color::Green));
        assert_eq!(line.spans[4].style.fg, Some(Color::DarkGray));
    }

    #[test]
    fn test_highlight_preserves_text() {
        let source = "    if (x > 10) { return 'a\\'b'; }";
        let line = highlight_code_line(source);
        let rebuilt: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_highlight_numbers_and_identifiers() {
        let line = highlight_code_line("x1 = 42");
        let spans = span_text(&line);
        assert_eq!(spans, vec!["x1 = ".to_string(), "42".to_string()]);
        assert_eq!(line.spans[1].style.fg, Some(Color::Magenta));
    }

    #[test]
    fn test_highlight_fence_and_hash_comment() {
        let fence = highlight_code_line("```python");
        assert_eq!(fence.spans.len(), 1);
        assert_eq!(fence.spans[0].style.fg, Some(Color::DarkGray));

        let comment = highlight_code_line("  # compute total");
        assert_eq!(comment.spans.len(), 1);
        assert!(comment.spans[0].style.add_modifier.contains(Modifier::ITALIC));

        let attribute = highlight_code_line("#[derive(Debug)]");
        assert!(attribute.spans.len() > 1);
    }

    #[test]
    fn test_highlight_unterminated_string() {
        let line = highlight_code_line("print(\"oops");
        let rebuilt: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(rebuilt, "print(\"oops");
    }

    #[tokio::test]
    async fn test_render_empty_conversation() {
        let (mut app, _gate) = app_with(Gate::new("x"));
        let screen = draw(&mut app, 80, 20);

        assert!(screen.contains("Code Assistant"));
        assert!(screen.contains("Describe the code you want"));
        assert!(screen.contains("Type your request here..."));
        assert!(screen.contains("INSERT"));
        assert_eq!(app.chat_width, 78);
    }

    #[tokio::test]
    async fn test_render_busy_shows_indicator_and_disables_input() {
        let (mut app, gate) = app_with(Gate::new("const x = 1;"));
        app.insert_str("make a constant");
        app.submit();

        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("You:"));
        assert!(screen.contains("make a constant"));
        assert!(screen.contains("Generating."));
        assert!(screen.contains("Waiting for response..."));

        gate.release();
        app.controller.wait().await;

        let screen = draw(&mut app, 80, 20);
        assert!(!screen.contains("Generating"));
        assert!(screen.contains("│ const x = 1;"));
        assert!(screen.contains("[y] copy"));
    }

    #[tokio::test]
    async fn test_settled_reply_is_visible_after_word_wrap() {
        let (mut app, gate) = app_with(Gate::new("x"));
        // 12x12 leaves a chat area with 10 columns and 5 rows inside the border
        draw(&mut app, 12, 12);
        assert_eq!((app.chat_width, app.chat_height), (10, 5));

        app.insert_str("aaaaaa bbbbbb cccccc dddddd eeeeee ffffff gggggg hhhhhh ZZZZZZ");
        app.submit();
        assert!(draw(&mut app, 12, 12).contains("Generating"));

        gate.release();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !app.poll_request().await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("request never settled");

        let screen = draw(&mut app, 12, 12);
        assert!(screen.contains("││ x"), "reply scrolled out of view:\n{}", screen);
        assert!(!screen.contains("aaaaaa"));
    }

    #[tokio::test]
    async fn test_render_failure_message() {
        let (mut app, gate) = app_with(Gate::failing("bad request"));
        app.insert_str("anything");
        app.submit();
        gate.release();
        app.controller.wait().await;

        let screen = draw(&mut app, 100, 20);
        assert!(screen.contains("Sorry, something went wrong"));
        assert!(screen.contains("bad request"));
        assert!(!screen.contains("[y] copy"));
    }

    #[tokio::test]
    async fn test_render_endpoint_popup() {
        let (mut app, _gate) = app_with(Gate::new("x"));
        app.show_endpoint_input = true;
        app.endpoint_error = Some("Invalid endpoint URL".to_string());

        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("Code Generation Endpoint"));
        assert!(screen.contains("Invalid endpoint URL"));
    }

    #[tokio::test]
    async fn test_render_tiny_terminal_does_not_panic() {
        let (mut app, _gate) = app_with(Gate::new("x"));
        app.show_endpoint_input = true;
        draw(&mut app, 10, 4);
    }
}
