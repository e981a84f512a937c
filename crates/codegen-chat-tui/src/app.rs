use std::time::Duration;

use anyhow::Result;
use codegen_chat_core::{generator_for, ChatMessage, Controller};
use ratatui::layout::Rect;

use crate::ui;

/// Width assumed for wrap calculations before the first render
const DEFAULT_WRAP_WIDTH: u16 = 50;
/// Height assumed for scroll calculations before the first render
const DEFAULT_CHAT_HEIGHT: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation (messages, pending prompt, busy flag)
    pub controller: Controller,
    pub input_cursor: usize, // cursor position in the pending prompt, in chars

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area for scroll calculations
    pub chat_width: u16,  // Inner width of chat area for wrap calculations
    pub chat_area: Option<Rect>,
    pub selected_code: Option<usize>, // message index of the code block `y` copies

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Transient one-line feedback shown in the footer
    pub status: Option<String>,

    // Endpoint popup state
    pub show_endpoint_input: bool,
    pub endpoint_input: String,
    pub endpoint_input_cursor: usize,
    pub endpoint_error: Option<String>,

    pub timeout: Option<Duration>,
}

impl App {
    pub fn new(controller: Controller, timeout: Option<Duration>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            controller,
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            selected_code: None,

            animation_frame: 0,
            status: None,

            show_endpoint_input: false,
            endpoint_input: String::new(),
            endpoint_input_cursor: 0,
            endpoint_error: None,

            timeout,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.controller.messages()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn input(&self) -> &str {
        self.controller.pending_input()
    }

    // Prompt editing. Ignored while a request is outstanding.

    pub fn insert_char(&mut self, c: char) {
        if self.is_busy() {
            return;
        }
        let cursor = self.input_cursor;
        let input = self.controller.pending_input_mut();
        let byte_pos = char_to_byte_index(input, cursor);
        input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| *c != '\r') {
            // Newlines would break the single-line input box
            self.insert_char(if c == '\n' { ' ' } else { c });
        }
    }

    pub fn delete_before_cursor(&mut self) {
        if self.is_busy() || self.input_cursor == 0 {
            return;
        }
        self.input_cursor -= 1;
        let cursor = self.input_cursor;
        let input = self.controller.pending_input_mut();
        let byte_pos = char_to_byte_index(input, cursor);
        input.remove(byte_pos);
    }

    pub fn delete_at_cursor(&mut self) {
        if self.is_busy() {
            return;
        }
        let cursor = self.input_cursor;
        let input = self.controller.pending_input_mut();
        if cursor < input.chars().count() {
            let byte_pos = char_to_byte_index(input, cursor);
            input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input().chars().count();
    }

    /// Submit the pending prompt. Returns whether the controller accepted it.
    pub fn submit(&mut self) -> bool {
        if !self.controller.submit() {
            return false;
        }
        self.input_cursor = 0;
        self.status = None;
        self.animation_frame = 0;
        self.scroll_chat_to_bottom();
        true
    }

    /// Pick up a finished request, if any
    pub async fn poll_request(&mut self) -> bool {
        if !self.controller.poll().await {
            return false;
        }
        if self.messages().last().is_some_and(|m| m.is_code) {
            self.selected_code = Some(self.messages().len() - 1);
        }
        self.scroll_chat_to_bottom();
        true
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling

    fn wrap_width(&self) -> u16 {
        if self.chat_width > 0 {
            self.chat_width
        } else {
            DEFAULT_WRAP_WIDTH
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            DEFAULT_CHAT_HEIGHT
        }
    }

    /// Rendered height of the chat transcript, including the busy indicator
    pub fn total_chat_lines(&self) -> u16 {
        let lines = ui::chat_paragraph(self).line_count(self.wrap_width());
        u16::try_from(lines).unwrap_or(u16::MAX)
    }

    fn max_chat_scroll(&self) -> u16 {
        self.total_chat_lines().saturating_sub(self.visible_height())
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    // Code block selection for copying

    pub fn select_next_code(&mut self) {
        let indices = self.controller.conversation().code_message_indices();
        self.selected_code = match self.selected_code {
            Some(current) => indices
                .iter()
                .copied()
                .find(|&i| i > current)
                .or(indices.first().copied()),
            None => indices.first().copied(),
        };
    }

    pub fn select_prev_code(&mut self) {
        let indices = self.controller.conversation().code_message_indices();
        self.selected_code = match self.selected_code {
            Some(current) => indices
                .iter()
                .rev()
                .copied()
                .find(|&i| i < current)
                .or(indices.last().copied()),
            None => indices.last().copied(),
        };
    }

    /// The code message `y` would copy: the selection, or the latest one
    pub fn selected_code_message(&self) -> Option<&ChatMessage> {
        let messages = self.messages();
        match self.selected_code {
            Some(idx) => messages.get(idx).filter(|m| m.is_code),
            None => messages.iter().rev().find(|m| m.is_code),
        }
    }

    // Endpoint popup

    pub fn open_endpoint_input(&mut self) {
        let current = if self.controller.generator_name().contains("://") {
            self.controller.generator_name().to_string()
        } else {
            String::new()
        };
        self.endpoint_input_cursor = current.chars().count();
        self.endpoint_input = current;
        self.show_endpoint_input = true;
    }

    pub fn close_endpoint_input(&mut self) {
        self.show_endpoint_input = false;
        self.endpoint_input.clear();
        self.endpoint_input_cursor = 0;
        self.endpoint_error = None;
    }

    /// Point the controller at a new, already validated endpoint
    pub fn use_endpoint(&mut self, endpoint: &str) -> Result<bool> {
        let generator = generator_for(Some(endpoint), self.timeout)?;
        Ok(self.controller.set_generator(generator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_with, Gate};

    #[tokio::test]
    async fn test_editing_is_utf8_safe() {
        let (mut app, _gate) = app_with(Gate::new("ok"));
        app.insert_str("héllo");
        app.cursor_left();
        app.cursor_left();
        app.insert_char('ü');
        assert_eq!(app.input(), "hélülo");
        assert_eq!(app.input_cursor, 4);
    }

    #[tokio::test]
    async fn test_cursor_movement_and_deletion() {
        let (mut app, _gate) = app_with(Gate::new("ok"));
        app.insert_str("abc");
        app.cursor_home();
        app.delete_at_cursor();
        assert_eq!(app.input(), "bc");
        app.cursor_end();
        app.delete_before_cursor();
        assert_eq!(app.input(), "b");
        app.cursor_right();
        assert_eq!(app.input_cursor, 1);
        app.cursor_home();
        app.delete_before_cursor();
        assert_eq!(app.input(), "b");
    }

    #[tokio::test]
    async fn test_paste_flattens_newlines() {
        let (mut app, _gate) = app_with(Gate::new("ok"));
        app.insert_str("line one\r\nline two");
        assert_eq!(app.input(), "line one line two");
    }

    #[tokio::test]
    async fn test_submit_resets_cursor_and_blocks_editing() {
        let (mut app, gate) = app_with(Gate::new("fn main() {}"));
        app.insert_str("write main");
        assert!(app.submit());
        assert_eq!(app.input_cursor, 0);
        assert!(app.is_busy());

        app.insert_str("more");
        assert_eq!(app.input(), "");
        assert!(!app.submit());

        gate.release();
        app.controller.wait().await;
        assert!(!app.is_busy());
        assert_eq!(app.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_poll_request_selects_new_code() {
        let (mut app, gate) = app_with(Gate::new("let x = 1;"));
        app.insert_str("x");
        app.submit();
        gate.release();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !app.poll_request().await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("request never settled");

        assert_eq!(app.selected_code, Some(1));
        assert_eq!(app.selected_code_message().unwrap().content, "let x = 1;");
    }

    #[tokio::test]
    async fn test_code_selection_cycles() {
        let (mut app, gate) = app_with(Gate::new("code"));
        for prompt in ["a", "b"] {
            app.insert_str(prompt);
            app.submit();
            gate.release();
            app.controller.wait().await;
        }

        assert_eq!(app.selected_code, None);
        assert_eq!(app.selected_code_message().map(|m| m.is_code), Some(true));
        app.select_next_code();
        assert_eq!(app.selected_code, Some(1));
        app.select_next_code();
        assert_eq!(app.selected_code, Some(3));
        app.select_next_code();
        assert_eq!(app.selected_code, Some(1));
        app.select_prev_code();
        assert_eq!(app.selected_code, Some(3));
    }

    #[tokio::test]
    async fn test_total_chat_lines_follows_word_wrap() {
        let (mut app, gate) = app_with(Gate::new("x"));
        app.chat_width = 10;
        app.chat_height = 5;

        // 20 chars, but no word fits next to another in 10 columns
        app.insert_str("aaaaaa bbbbbb cccccc");
        app.submit();
        gate.release();
        app.controller.wait().await;

        let unwrapped = ui::chat_paragraph(&app).line_count(u16::MAX) as u16;
        // the prompt alone gains two rows once wrapped
        assert!(app.total_chat_lines() >= unwrapped + 2);
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, app.total_chat_lines() - 5);
    }

    #[tokio::test]
    async fn test_scroll_is_clamped() {
        let (mut app, gate) = app_with(Gate::new("one\ntwo\nthree\nfour"));
        app.chat_height = 3;
        app.chat_width = 40;

        app.scroll_chat_down(100);
        assert_eq!(app.chat_scroll, 0);

        app.insert_str("lines please");
        app.submit();
        gate.release();
        app.controller.wait().await;

        // user: 3 lines, code: 6 lines
        assert_eq!(app.total_chat_lines(), 9);
        app.scroll_chat_down(100);
        assert_eq!(app.chat_scroll, 6);
        app.scroll_chat_up(2);
        assert_eq!(app.chat_scroll, 4);
        app.scroll_chat_to_top();
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn test_use_endpoint_swaps_generator() {
        let (mut app, _gate) = app_with(Gate::new("ok"));
        assert!(app.use_endpoint("http://localhost:9000/generate-code").unwrap());
        assert_eq!(app.controller.generator_name(), "http://localhost:9000/generate-code");

        app.open_endpoint_input();
        assert_eq!(app.endpoint_input, "http://localhost:9000/generate-code");
        assert_eq!(app.endpoint_input_cursor, app.endpoint_input.chars().count());
        app.close_endpoint_input();
        assert!(!app.show_endpoint_input);
        assert!(app.endpoint_input.is_empty());
    }
}
