use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::app::{App, FocusPane, InputMode};
use crate::config::Config;
use crate::model::Model;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(Instant::now()),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // The alert is modal
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_alert();
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn copy_pane(app: &mut App, model: Model) {
    if app.copy_response(model) {
        info!(model = model.as_str(), "response copied");
    }
}

fn compare(app: &mut App) {
    if app.compare_visible && !app.is_busy() {
        app.start_compare();
    }
}

fn submit(app: &mut App) {
    if !app.is_busy() {
        app.submit_question();
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => app.cycle_focus(),

        KeyCode::Char('i') => {
            if app.focus != FocusPane::Comparison {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Char('/') => {
            app.focus = FocusPane::Question;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Enter => match app.focus {
            FocusPane::Question => submit(app),
            FocusPane::Response(_) => app.input_mode = InputMode::Editing,
            FocusPane::Comparison => {}
        },

        // Copy buttons: focused pane, or a pane by number
        KeyCode::Char('c') => {
            if let FocusPane::Response(model) = app.focus {
                copy_pane(app, model);
            }
        }
        KeyCode::Char('1') => copy_pane(app, Model::ChatGpt),
        KeyCode::Char('2') => copy_pane(app, Model::Gemini),
        KeyCode::Char('3') => copy_pane(app, Model::Claude),

        KeyCode::Char('C') => compare(app),

        KeyCode::Char('m') => {
            let mode = app.toggle_render_mode();
            if let Err(e) = Config::save_render_mode(mode) {
                warn!(error = %e, "could not save render mode");
            }
            app.status = Some(format!("Render mode: {}", mode.as_str()));
        }
        KeyCode::Char('e') => {
            let result = Config::export_path().and_then(|path| {
                app.export_comparison(&path)?;
                Ok(path)
            });
            app.status = Some(match result {
                Ok(path) => format!("Saved {}", path.display()),
                Err(e) => format!("Export failed: {}", e),
            });
        }

        // Half-page scroll (must be before plain 'd'/'u' to match first)
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.scroll_down(10),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.scroll_up(10),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.focus {
        FocusPane::Question => handle_question_editing(app, key),
        FocusPane::Response(model) => handle_response_editing(app, model, key),
        FocusPane::Comparison => app.input_mode = InputMode::Normal,
    }
}

fn handle_question_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.cycle_focus();
        }
        KeyCode::Enter => submit(app),
        KeyCode::Backspace => app.question_backspace(),
        KeyCode::Delete => app.question_delete(),
        KeyCode::Left => app.question_cursor_left(),
        KeyCode::Right => app.question_cursor_right(),
        KeyCode::Home => app.question_cursor_home(),
        KeyCode::End => app.question_cursor_end(),
        KeyCode::Char(c) => app.question_insert(c),
        _ => {}
    }
}

fn handle_response_editing(app: &mut App, model: Model, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.response_push(model, '\n'),
        KeyCode::Backspace => app.response_pop(model),
        KeyCode::Char(c) => app.response_push(model, c),
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.alert.is_some() || app.input_mode != InputMode::Editing {
        return;
    }
    match app.focus {
        FocusPane::Question => app.question_insert_str(text),
        FocusPane::Response(model) => app.response_push_str(model, text),
        FocusPane::Comparison => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn pane_at(app: &App, x: u16, y: u16) -> Option<FocusPane> {
    let hit = |area: Option<Rect>| area.is_some_and(|r| point_in_rect(x, y, r));

    if hit(app.question_area) {
        return Some(FocusPane::Question);
    }
    if let Some(model) = Model::all()
        .into_iter()
        .find(|m| hit(app.response_areas[m.index()]))
    {
        return Some(FocusPane::Response(model));
    }
    if app.comparison_visible && hit(app.comparison_area) {
        return Some(FocusPane::Comparison);
    }
    None
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.alert.is_some() {
        return;
    }

    let Some(pane) = pane_at(app, mouse.column, mouse.row) else {
        return;
    };

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.focus = pane;
            app.scroll_down(3);
        }
        MouseEventKind::ScrollUp => {
            app.focus = pane;
            app.scroll_up(3);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if app.focus != pane {
                app.input_mode = InputMode::Normal;
            }
            app.focus = pane;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::FakeBackend;
    use crate::app::ASK_FAILED;
    use crate::clipboard::tests::RecordingSink;
    use crate::clipboard::Clipboard;
    use crate::config::Settings;
    use crate::render::{Language, RenderMode};
    use crossterm::event::KeyEventState;
    use std::sync::Arc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app_with(backend: FakeBackend) -> (App, RecordingSink) {
        let sink = RecordingSink::default();
        let clipboard = Clipboard::new(Box::new(sink.clone()), Box::new(RecordingSink::failing()));
        let settings = Settings {
            server_url: "http://127.0.0.1:5000".into(),
            render_mode: RenderMode::Plain,
            language: Language::En,
        };
        (App::new(Arc::new(backend), clipboard, settings), sink)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn typing_and_enter_submits_the_question() {
        let (mut app, _) = app_with(FakeBackend {
            ask_body: Some(r#"{"chatgpt":"A","gemini":"B","claude":"C"}"#.into()),
            ..FakeBackend::default()
        });

        assert_eq!(app.input_mode, InputMode::Editing);
        type_text(&mut app, "hej");
        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.is_busy());

        // Enter while busy is ignored
        handle_event(&mut app, key(KeyCode::Enter));

        app.settle_pending().await;
        assert_eq!(app.response(Model::Gemini).text, "B");
        assert_eq!(app.question_input, "hej");
    }

    #[tokio::test]
    async fn alert_swallows_keys_until_dismissed() {
        let (mut app, _) = app_with(FakeBackend::default());
        handle_event(&mut app, key(KeyCode::Enter));
        app.settle_pending().await;
        assert_eq!(app.alert.as_deref(), Some(ASK_FAILED));

        handle_event(&mut app, key(KeyCode::Char('x')));
        assert!(app.question_input.is_empty());

        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.alert.is_none());
        assert!(!app.is_busy());
    }

    #[tokio::test]
    async fn compare_key_needs_a_visible_compare_control() {
        let (mut app, _) = app_with(FakeBackend {
            compare_body: Some(r#"{"a":"b"}"#.into()),
            ..FakeBackend::default()
        });
        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);

        handle_event(&mut app, key(KeyCode::Char('C')));
        assert!(!app.is_busy());

        app.compare_visible = true;
        handle_event(&mut app, key(KeyCode::Char('C')));
        assert!(app.is_busy());
        app.settle_pending().await;
        assert!(app.comparison_visible);
    }

    #[tokio::test]
    async fn number_keys_copy_panes() {
        let (mut app, sink) = app_with(FakeBackend::default());
        app.response_mut(Model::Gemini).text = "gemini text".into();
        handle_event(&mut app, key(KeyCode::Esc));

        handle_event(&mut app, key(KeyCode::Char('1')));
        assert!(sink.written().is_empty());

        handle_event(&mut app, key(KeyCode::Char('2')));
        assert_eq!(sink.written(), vec!["gemini text"]);
        assert!(app.is_copied(Model::Gemini, Instant::now()));
    }

    #[tokio::test]
    async fn response_panes_are_editable() {
        let (mut app, _) = app_with(FakeBackend::default());
        app.response_mut(Model::Claude).text = "ab".into();
        app.focus = FocusPane::Response(Model::Claude);

        type_text(&mut app, "c");
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(&mut app, key(KeyCode::Backspace));
        handle_event(&mut app, key(KeyCode::Backspace));
        type_text(&mut app, "d");
        assert_eq!(app.response(Model::Claude).text, "abd");
    }

    #[tokio::test]
    async fn paste_goes_to_the_focused_input() {
        let (mut app, _) = app_with(FakeBackend::default());
        handle_event(&mut app, AppEvent::Paste("line one\nline two".into()));
        assert_eq!(app.question_input, "line oneline two");

        app.focus = FocusPane::Response(Model::ChatGpt);
        handle_event(&mut app, AppEvent::Paste("a\r\nb".into()));
        assert_eq!(app.response(Model::ChatGpt).text, "a\nb");
    }

    #[tokio::test]
    async fn ctrl_c_quits_from_anywhere() {
        let (mut app, _) = app_with(FakeBackend::default());
        app.alert = Some("boom".into());
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                kind: crossterm::event::KeyEventKind::Press,
                state: KeyEventState::NONE,
            }),
        );
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn mouse_click_focuses_pane() {
        let (mut app, _) = app_with(FakeBackend::default());
        app.response_areas[Model::Claude.index()] = Some(Rect::new(10, 5, 10, 10));

        handle_event(
            &mut app,
            AppEvent::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 12,
                row: 6,
                modifiers: KeyModifiers::NONE,
            }),
        );
        assert_eq!(app.focus, FocusPane::Response(Model::Claude));
        assert_eq!(app.input_mode, InputMode::Normal);
    }
}
