use anyhow::Result;
use codegen_chat_core::config::{validate_endpoint, Config};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{char_to_byte_index, App, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_endpoint_input {
        handle_endpoint_input(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.show_endpoint_input {
        for c in text.chars().filter(|c| !c.is_control()) {
            insert_endpoint_char(app, c);
        }
    } else if app.input_mode == InputMode::Editing {
        app.insert_str(text);
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to the prompt
        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            app.cursor_end();
        }

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = app.half_page();
            app.scroll_chat_down(half);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = app.half_page();
            app.scroll_chat_up(half);
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::PageDown => {
            let half = app.half_page();
            app.scroll_chat_down(half * 2);
        }
        KeyCode::PageUp => {
            let half = app.half_page();
            app.scroll_chat_up(half * 2);
        }
        KeyCode::Char('g') => app.scroll_chat_to_top(),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Code block selection and copy
        KeyCode::Char('n') => app.select_next_code(),
        KeyCode::Char('N') => app.select_prev_code(),
        KeyCode::Char('y') => copy_selected_code(app),

        KeyCode::Char('E') => app.open_endpoint_input(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit();
        }
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn insert_endpoint_char(app: &mut App, c: char) {
    let byte_pos = char_to_byte_index(&app.endpoint_input, app.endpoint_input_cursor);
    app.endpoint_input.insert(byte_pos, c);
    app.endpoint_input_cursor += 1;
}

fn handle_endpoint_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.close_endpoint_input();
        }
        KeyCode::Enter => {
            if app.is_busy() {
                app.endpoint_error =
                    Some("Wait for the current request to finish first".to_string());
                return;
            }
            match validate_endpoint(&app.endpoint_input) {
                Ok(endpoint) => apply_endpoint(app, &endpoint),
                Err(e) => app.endpoint_error = Some(e.to_string()),
            }
        }
        KeyCode::Backspace => {
            if app.endpoint_input_cursor > 0 {
                app.endpoint_input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.endpoint_input, app.endpoint_input_cursor);
                app.endpoint_input.remove(byte_pos);
            }
        }
        KeyCode::Char(c) => insert_endpoint_char(app, c),
        KeyCode::Left => {
            app.endpoint_input_cursor = app.endpoint_input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.endpoint_input.chars().count();
            app.endpoint_input_cursor = (app.endpoint_input_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.endpoint_input_cursor = 0,
        KeyCode::End => app.endpoint_input_cursor = app.endpoint_input.chars().count(),
        _ => {}
    }
}

fn apply_endpoint(app: &mut App, endpoint: &str) {
    match app.use_endpoint(endpoint) {
        Ok(true) => {}
        Ok(false) => {
            app.endpoint_error = Some("Wait for the current request to finish first".to_string());
            return;
        }
        Err(e) => {
            app.endpoint_error = Some(e.to_string());
            return;
        }
    }

    app.status = Some(match Config::save_endpoint(endpoint) {
        Ok(_) => format!("Endpoint set to {}", endpoint),
        Err(e) => {
            tracing::warn!(error = %e, "could not save endpoint");
            format!("Endpoint set for this session (not saved: {})", e)
        }
    });
    app.close_endpoint_input();
    app.input_mode = InputMode::Editing;
}

fn copy_selected_code(app: &mut App) {
    let Some(code) = app.selected_code_message().map(|m| m.content.clone()) else {
        app.status = Some("No code to copy yet".to_string());
        return;
    };

    app.status = Some(match copy_to_clipboard(&code) {
        Ok(tool) => format!("Copied {} lines ({})", code.lines().count(), tool),
        Err(e) => {
            tracing::warn!(error = %e, "clipboard copy failed");
            format!("Copy failed: {}", e)
        }
    });
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}

/// Pipe `text` into the first clipboard command that is available.
/// Returns the name of the command used.
fn copy_to_clipboard(text: &str) -> Result<&'static str> {
    const CANDIDATES: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
        ("clip.exe", &[]),
    ];

    pipe_to_first(CANDIDATES, text).ok_or_else(|| {
        anyhow::anyhow!("no clipboard command found (pbcopy, wl-copy, xclip, xsel)")
    })
}

/// Try each command in order until one accepts all of `text` and exits cleanly
fn pipe_to_first(candidates: &[(&'static str, &[&str])], text: &str) -> Option<&'static str> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    for (program, args) in candidates {
        let Ok(mut child) = Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };

        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        // stdin is dropped by now, so the tool sees EOF and exits
        let status = child.wait();
        if let Err(e) = written {
            tracing::debug!(program, error = %e, "clipboard command rejected input");
            continue;
        }
        if status.is_ok_and(|s| s.success()) {
            return Some(*program);
        }
    }

    None
}
