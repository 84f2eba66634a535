use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tfs_chat_core::QuickAction;
use crate::app::App;
use crate::tui::AppEvent;

const WHEEL_STEP: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    app.poll_pending().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        // Enter without a modifier submits; modified Enter is ignored so that
        // terminals reporting Shift+Enter don't send half-typed messages
        KeyCode::Enter if key.modifiers.is_empty() => app.submit_input(),
        KeyCode::Enter => {}
        KeyCode::Esc => app.clear_input(),

        // Quick actions
        KeyCode::F(n @ 1..=3) => {
            if let Some(action) = QuickAction::all().get(usize::from(n) - 1) {
                app.apply_quick_action(*action);
            }
        }

        // Transcript scrolling
        KeyCode::PageUp => app.scroll_up(app.page_size()),
        KeyCode::PageDown => app.scroll_down(app.page_size()),
        KeyCode::Up if key.modifiers.contains(KeyModifiers::CONTROL) => app.scroll_up(1),
        KeyCode::Down if key.modifiers.contains(KeyModifiers::CONTROL) => app.scroll_down(1),

        // Line editing
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_home(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_transcript = app
        .transcript_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_transcript {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_STEP),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_STEP),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use crossterm::event::KeyEventKind;
    use tfs_chat_core::{ActivityHistory, ApiClient, ChatSession, MemoryStore};

    fn app() -> App {
        let history = ActivityHistory::load(Box::new(MemoryStore::new()));
        App::with_parts(ChatSession::new(history), ApiClient::new("http://127.0.0.1:9/api/v1"))
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn function_keys_prefill_quick_actions() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::F(2), KeyModifiers::NONE));
        assert_eq!(app.input, QuickAction::Checklist.prompt());
        handle_key(&mut app, key(KeyCode::F(9), KeyModifiers::NONE));
        assert_eq!(app.input, QuickAction::Checklist.prompt());
    }

    #[test]
    fn shift_enter_does_not_submit() {
        let mut app = app();
        app.input = "цепочка".to_string();
        handle_key(&mut app, key(KeyCode::Enter, KeyModifiers::SHIFT));
        assert!(!app.is_processing());
        assert_eq!(app.input, "цепочка");
    }

    #[test]
    fn blank_enter_is_ignored() {
        let mut app = app();
        app.input = "   ".to_string();
        handle_key(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.pending.is_none());
        assert!(app.session.conversation().is_empty());
    }

    #[test]
    fn ctrl_c_quits_and_escape_clears() {
        let mut app = app();
        app.input = "x".to_string();
        app.cursor = 1;
        handle_key(&mut app, key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(app.input.is_empty());
        handle_key(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
