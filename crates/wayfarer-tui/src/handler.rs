use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

const SCROLL_STEP: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        // Pane sizes are recomputed on the next draw
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::ProbeFinished(outcome) => app.probe_finished(outcome),
        AppEvent::ChatFinished(ticket, result) => app.chat_finished(ticket, result),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.quit();
                return;
            }
            KeyCode::Char('s') => {
                app.submit();
                return;
            }
            KeyCode::Char('r') => {
                app.start_probe();
                return;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::PageUp => return app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => return app.scroll_down(app.chat_height.max(1)),
        _ => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('i') | KeyCode::Tab => app.input_mode = InputMode::Editing,
        KeyCode::Enter | KeyCode::Char('s') => app.submit(),
        KeyCode::Char('r') => app.start_probe(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') => app.scroll_down(app.chat_height / 2),
        KeyCode::Char('u') => app.scroll_up(app.chat_height / 2),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) {
                app.insert_newline();
            } else {
                app.submit();
            }
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(SCROLL_STEP),
        MouseEventKind::ScrollDown => app.scroll_down(SCROLL_STEP),
        _ => {}
    }
}
