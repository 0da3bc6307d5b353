use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use wayfarer_core::{ChatBackend, ChatError, ChatTicket, HealthOutcome, Session};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation state, mutated only through the session's operations
    pub session: Session,
    pub base_url: String,

    // Input cursor, counted in chars
    pub input_cursor: usize,

    // Transcript scrolling
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16, // Inner height of the transcript pane
    pub chat_width: u16,  // Inner width, for wrap estimates
    pub total_chat_lines: u16,

    pub animation_frame: usize,

    backend: Arc<dyn ChatBackend>,
    events: mpsc::UnboundedSender<AppEvent>,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl App {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        base_url: String,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            session: Session::new(),
            base_url,

            input_cursor: 0,

            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,

            animation_frame: 0,

            backend,
            events,
        }
    }

    /// Check the backend on a background task. Used at startup and for
    /// explicit re-checks.
    pub fn start_probe(&mut self) {
        if !self.session.begin_probe() {
            return;
        }
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = backend.check_health().await;
            let _ = events.send(AppEvent::ProbeFinished(outcome));
        });
    }

    pub fn probe_finished(&mut self, outcome: HealthOutcome) {
        self.session.resolve_probe(outcome);
    }

    /// Send the pending input. Both the Enter key and the explicit submit
    /// command land here.
    pub fn submit(&mut self) {
        let Some(ticket) = self.session.submit_pending() else {
            return;
        };
        self.input_cursor = 0;
        self.follow_tail = true;
        debug!(id = %ticket.id(), "chat submitted");

        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.send_chat(ticket.text()).await;
            let _ = events.send(AppEvent::ChatFinished(ticket, result));
        });
    }

    pub fn chat_finished(&mut self, ticket: ChatTicket, result: Result<String, ChatError>) {
        if self.session.resolve_chat(ticket, result) {
            self.follow_tail = true;
        }
    }

    /// Typing is ignored while a request is in flight.
    fn can_edit(&self) -> bool {
        !self.session.state().is_in_flight()
    }

    pub fn insert_char(&mut self, c: char) {
        if !self.can_edit() {
            return;
        }
        let cursor = self.input_cursor;
        self.session.update_input(|input| {
            let byte_pos = char_to_byte_index(input, cursor);
            input.insert(byte_pos, c);
        });
        self.input_cursor += 1;
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if !self.can_edit() || self.input_cursor == 0 {
            return;
        }
        self.input_cursor -= 1;
        let cursor = self.input_cursor;
        self.session.update_input(|input| {
            let byte_pos = char_to_byte_index(input, cursor);
            input.remove(byte_pos);
        });
    }

    pub fn delete(&mut self) {
        if !self.can_edit() || self.input_cursor >= self.input_len() {
            return;
        }
        let cursor = self.input_cursor;
        self.session.update_input(|input| {
            let byte_pos = char_to_byte_index(input, cursor);
            input.remove(byte_pos);
        });
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input_len());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input_len();
    }

    fn input_len(&self) -> usize {
        self.session.state().pending_input().chars().count()
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        if self.chat_scroll >= self.max_scroll() {
            self.follow_tail = true;
        }
    }

    pub fn scroll_top(&mut self) {
        self.follow_tail = false;
        self.chat_scroll = 0;
    }

    pub fn scroll_bottom(&mut self) {
        self.follow_tail = true;
        self.chat_scroll = self.max_scroll();
    }

    pub fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.state().is_in_flight() {
            self.animation_frame = (self.animation_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.animation_frame % SPINNER_FRAMES.len()]
    }

    pub fn quit(&mut self) {
        debug!("quit requested");
        self.should_quit = true;
    }
}

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use async_trait::async_trait;
    use wayfarer_core::BackendStatus;

    pub(crate) struct ScriptedBackend {
        pub health: HealthOutcome,
        pub reply: Result<String, ChatError>,
        pub chats: AtomicUsize,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn check_health(&self) -> HealthOutcome {
            self.health.clone()
        }

        async fn send_chat(&self, _text: &str) -> Result<String, ChatError> {
            self.chats.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    pub(crate) fn test_app(reply: Result<String, ChatError>) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (app, rx, _backend) = scripted_app(reply);
        (app, rx)
    }

    fn scripted_app(
        reply: Result<String, ChatError>,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>, Arc<ScriptedBackend>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = Arc::new(ScriptedBackend {
            health: HealthOutcome::Ready,
            reply,
            chats: AtomicUsize::new(0),
        });
        let app = App::new(backend.clone(), "http://localhost:8000".to_string(), tx);
        (app, rx, backend)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[tokio::test]
    async fn test_submit_round_trip_through_event_channel() {
        let (mut app, mut rx) = test_app(Ok("Paris is lovely".to_string()));
        type_text(&mut app, "Where in France?");

        app.submit();
        assert!(app.session.state().is_in_flight());
        assert_eq!(app.session.state().pending_input(), "");
        assert_eq!(app.input_cursor, 0);

        match rx.recv().await {
            Some(AppEvent::ChatFinished(ticket, result)) => app.chat_finished(ticket, result),
            other => panic!("unexpected event {:?}", other),
        }

        let transcript = app.session.state().transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].text(), "Paris is lovely");
        assert!(!app.session.state().is_in_flight());
    }

    #[tokio::test]
    async fn test_second_submit_while_waiting_sends_nothing() {
        let (mut app, mut rx, backend) = scripted_app(Ok("Try Porto".to_string()));
        type_text(&mut app, "Where in Portugal?");
        app.submit();

        // Typing is blocked while waiting, so stage the next message directly
        app.session.update_input(|input| input.push_str("And Spain?"));
        app.submit();
        assert_eq!(app.session.state().transcript().len(), 1);
        assert_eq!(app.session.state().pending_input(), "And Spain?");

        match rx.recv().await {
            Some(AppEvent::ChatFinished(ticket, result)) => app.chat_finished(ticket, result),
            other => panic!("unexpected event {:?}", other),
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(backend.chats.load(Ordering::SeqCst), 1);
        assert_eq!(app.session.state().transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_probe_round_trip() {
        let (mut app, mut rx) = test_app(Ok(String::new()));
        app.start_probe();
        assert_eq!(app.session.state().backend_status(), BackendStatus::Checking);

        match rx.recv().await {
            Some(AppEvent::ProbeFinished(outcome)) => app.probe_finished(outcome),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(app.session.state().backend_status(), BackendStatus::Ready);
    }

    #[tokio::test]
    async fn test_editing_blocked_while_in_flight() {
        let (mut app, _rx) = test_app(Ok("ok".to_string()));
        type_text(&mut app, "first");
        app.submit();

        type_text(&mut app, "more");
        app.backspace();
        assert_eq!(app.session.state().pending_input(), "");
    }

    #[test]
    fn test_cursor_editing_is_utf8_safe() {
        let (mut app, _rx) = test_app(Ok(String::new()));
        type_text(&mut app, "Zürich");
        app.cursor_left();
        app.cursor_left();
        app.backspace();
        assert_eq!(app.session.state().pending_input(), "Zürch");

        app.cursor_home();
        app.delete();
        assert_eq!(app.session.state().pending_input(), "ürch");

        app.cursor_end();
        app.insert_newline();
        assert_eq!(app.session.state().pending_input(), "ürch\n");
        assert_eq!(app.input_cursor, 5);
    }

    #[test]
    fn test_blank_submit_spawns_nothing() {
        let (mut app, mut rx) = test_app(Ok(String::new()));
        type_text(&mut app, "   ");
        app.submit();
        assert!(app.session.state().transcript().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_scrolling_leaves_and_rejoins_tail() {
        let (mut app, _rx) = test_app(Ok(String::new()));
        app.total_chat_lines = 50;
        app.chat_height = 10;

        app.scroll_bottom();
        assert_eq!(app.chat_scroll, 40);

        app.scroll_up(5);
        assert!(!app.follow_tail);
        assert_eq!(app.chat_scroll, 35);

        app.scroll_down(100);
        assert_eq!(app.chat_scroll, 40);
        assert!(app.follow_tail);
    }

    #[test]
    fn test_scroll_down_saturates_at_line_limit() {
        let (mut app, _rx) = test_app(Ok(String::new()));
        app.total_chat_lines = u16::MAX;
        app.chat_height = 1;

        app.scroll_bottom();
        app.scroll_down(3);
        assert_eq!(app.chat_scroll, u16::MAX - 1);
        assert!(app.follow_tail);
    }
}
