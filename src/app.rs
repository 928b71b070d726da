use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backend::QueryBackend;
use crate::clipboard::Clipboard;
use crate::config::Settings;
use crate::error::{PanelError, Result};
use crate::model::{ComparisonResult, Model, ModelResponses, ResponseSlot};
use crate::render::{self, ComparisonView, Language, RenderMode};

/// How long the ✓ stays on a pane after copying
pub const COPY_FEEDBACK: Duration = Duration::from_millis(2000);

pub const ASK_FAILED: &str = "An error occurred while fetching responses";
pub const COMPARE_FAILED: &str = "An error occurred while comparing responses";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Question,
    Response(Model),
    Comparison,
}

/// The one request allowed in flight
pub enum PendingRequest {
    Ask(JoinHandle<Result<ModelResponses>>),
    Compare(JoinHandle<Result<ComparisonResult>>),
}

impl PendingRequest {
    pub fn is_finished(&self) -> bool {
        match self {
            PendingRequest::Ask(handle) => handle.is_finished(),
            PendingRequest::Compare(handle) => handle.is_finished(),
        }
    }
}

fn join_result<T>(joined: std::result::Result<Result<T>, tokio::task::JoinError>) -> Result<T> {
    joined.unwrap_or_else(|e| Err(PanelError::Task(e.to_string())))
}

/// Decorative "response time" in [1.0, 3.0) seconds
pub fn synthetic_time_label<R: Rng>(rng: &mut R) -> String {
    format!("{:.1}s", rng.gen_range(1.0..3.0))
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Question input
    pub question_input: String,
    pub question_cursor: usize,

    // Answers, indexed by Model::index
    pub responses: [ResponseSlot; 3],
    pub copied_until: [Option<Instant>; 3],

    // Compare state
    pub compare_visible: bool,
    pub comparison: Option<ComparisonResult>,
    pub comparison_view: Option<ComparisonView>,
    pub comparison_visible: bool,
    pub comparison_scroll: u16,
    pub comparison_height: u16,
    // Wrapped rows at the last drawn width, unwrapped until first draw
    pub comparison_rows: u16,

    // Request state; busy is "pending.is_some()"
    pub pending: Option<PendingRequest>,

    // Popups and status line
    pub alert: Option<String>,
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8,

    // Settings
    pub server_url: String,
    pub render_mode: RenderMode,
    pub language: Language,

    // Panel areas for mouse hit-testing (updated during render)
    pub question_area: Option<Rect>,
    pub response_areas: [Option<Rect>; 3],
    pub comparison_area: Option<Rect>,

    backend: Arc<dyn QueryBackend>,
    clipboard: Clipboard,
}

impl App {
    pub fn new(backend: Arc<dyn QueryBackend>, clipboard: Clipboard, settings: Settings) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Question,

            question_input: String::new(),
            question_cursor: 0,

            responses: Default::default(),
            copied_until: [None; 3],

            compare_visible: false,
            comparison: None,
            comparison_view: None,
            comparison_visible: false,
            comparison_scroll: 0,
            comparison_height: 0,
            comparison_rows: 0,

            pending: None,

            alert: None,
            status: None,

            animation_frame: 0,

            server_url: settings.server_url,
            render_mode: settings.render_mode,
            language: settings.language,

            question_area: None,
            response_areas: [None; 3],
            comparison_area: None,

            backend,
            clipboard,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn response(&self, model: Model) -> &ResponseSlot {
        &self.responses[model.index()]
    }

    pub fn response_mut(&mut self, model: Model) -> &mut ResponseSlot {
        &mut self.responses[model.index()]
    }

    /// Whatever the panes hold right now, edits included
    pub fn responses_snapshot(&self) -> ModelResponses {
        ModelResponses {
            chatgpt: self.response(Model::ChatGpt).text.clone(),
            gemini: self.response(Model::Gemini).text.clone(),
            claude: self.response(Model::Claude).text.clone(),
        }
    }

    pub fn submit_label(&self) -> String {
        if self.is_busy() {
            format!("Processing{}", ".".repeat(self.animation_frame as usize + 1))
        } else {
            "Ask AIs".to_string()
        }
    }

    /// Sends the question as typed (empty included). Refused while busy.
    pub fn submit_question(&mut self) -> bool {
        if self.is_busy() {
            warn!("submit ignored, a request is already in flight");
            return false;
        }

        self.compare_visible = false;
        self.comparison_visible = false;
        self.status = None;
        self.animation_frame = 0;

        let question = self.question_input.clone();
        info!(chars = question.chars().count(), "asking models");

        let backend = Arc::clone(&self.backend);
        self.pending = Some(PendingRequest::Ask(tokio::spawn(async move {
            backend.ask(&question).await
        })));
        true
    }

    /// Sends the current pane contents for analysis. Refused while busy.
    pub fn start_compare(&mut self) -> bool {
        if self.is_busy() {
            warn!("compare ignored, a request is already in flight");
            return false;
        }

        self.status = None;
        self.animation_frame = 0;

        let responses = self.responses_snapshot();
        info!("requesting comparison");

        let backend = Arc::clone(&self.backend);
        self.pending = Some(PendingRequest::Compare(tokio::spawn(async move {
            backend.compare(&responses).await
        })));
        true
    }

    /// Applies the in-flight result if its task is done, without blocking
    pub async fn poll_pending(&mut self) {
        if self.pending.as_ref().is_some_and(|p| p.is_finished()) {
            self.settle_pending().await;
        }
    }

    /// Waits for the in-flight request and applies its outcome
    pub async fn settle_pending(&mut self) {
        match self.pending.take() {
            Some(PendingRequest::Ask(handle)) => {
                let result = join_result(handle.await);
                self.apply_ask_result(result);
            }
            Some(PendingRequest::Compare(handle)) => {
                let result = join_result(handle.await);
                self.apply_compare_result(result);
            }
            None => {}
        }
    }

    pub fn apply_ask_result(&mut self, result: Result<ModelResponses>) {
        self.pending = None;

        match result {
            Ok(responses) => {
                let mut rng = rand::thread_rng();
                for model in Model::all() {
                    let slot = self.response_mut(model);
                    slot.text = responses.get(model).to_string();
                    slot.scroll = 0;
                    slot.time_label = Some(synthetic_time_label(&mut rng));
                }
                self.compare_visible = true;
                info!("responses received");
            }
            Err(e) => {
                error!(error = %e, "ask request failed");
                self.alert = Some(ASK_FAILED.to_string());
            }
        }
    }

    pub fn apply_compare_result(&mut self, result: Result<ComparisonResult>) {
        self.pending = None;

        match result {
            Ok(comparison) => {
                info!(entries = comparison.entries.len(), "comparison received");
                let view = render::render_comparison(&comparison, self.render_mode, self.language);
                self.comparison_rows = view.total_height();
                self.comparison_view = Some(view);
                self.comparison = Some(comparison);
                self.comparison_scroll = 0;
                self.comparison_visible = true;
            }
            Err(e) => {
                error!(error = %e, "compare request failed");
                self.alert = Some(COMPARE_FAILED.to_string());
            }
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn copy_response(&mut self, model: Model) -> bool {
        self.copy_response_at(model, Instant::now())
    }

    /// Empty panes are left alone: no clipboard write, no indicator
    pub fn copy_response_at(&mut self, model: Model, now: Instant) -> bool {
        let text = self.response(model).text.clone();
        if text.is_empty() {
            return false;
        }

        if self.clipboard.copy(&text).is_none() {
            self.status = Some("Could not copy to clipboard".to_string());
        }
        self.copied_until[model.index()] = Some(now + COPY_FEEDBACK);
        true
    }

    pub fn is_copied(&self, model: Model, now: Instant) -> bool {
        self.copied_until[model.index()].is_some_and(|until| now < until)
    }

    /// Tick animation frame and expire copy indicators (called by Tick event)
    pub fn tick(&mut self, now: Instant) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        for until in self.copied_until.iter_mut() {
            if until.is_some_and(|t| now >= t) {
                *until = None;
            }
        }
    }

    pub fn toggle_render_mode(&mut self) -> RenderMode {
        self.render_mode = self.render_mode.toggle();
        if let Some(comparison) = &self.comparison {
            let view = render::render_comparison(comparison, self.render_mode, self.language);
            self.comparison_rows = view.total_height();
            self.comparison_scroll = self.comparison_scroll.min(self.comparison_max_scroll());
            self.comparison_view = Some(view);
        }
        self.render_mode
    }

    pub fn export_comparison(&self, path: &Path) -> anyhow::Result<()> {
        let comparison = self
            .comparison
            .as_ref()
            .filter(|_| self.comparison_visible)
            .ok_or_else(|| anyhow::anyhow!("No comparison to export"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let html = render::comparison_document(comparison, self.render_mode, self.language);
        std::fs::write(path, html)?;
        info!(path = %path.display(), "comparison exported");
        Ok(())
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Question => FocusPane::Response(Model::ChatGpt),
            FocusPane::Response(Model::ChatGpt) => FocusPane::Response(Model::Gemini),
            FocusPane::Response(Model::Gemini) => FocusPane::Response(Model::Claude),
            FocusPane::Response(Model::Claude) => {
                if self.comparison_visible {
                    FocusPane::Comparison
                } else {
                    FocusPane::Question
                }
            }
            FocusPane::Comparison => FocusPane::Question,
        };
    }

    // Question editing
    pub fn question_insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.question_input, self.question_cursor);
        self.question_input.insert(byte_pos, c);
        self.question_cursor += 1;
    }

    pub fn question_insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| *c != '\n' && *c != '\r') {
            self.question_insert(c);
        }
    }

    pub fn question_backspace(&mut self) {
        if self.question_cursor > 0 {
            self.question_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.question_input, self.question_cursor);
            self.question_input.remove(byte_pos);
        }
    }

    pub fn question_delete(&mut self) {
        let char_count = self.question_input.chars().count();
        if self.question_cursor < char_count {
            let byte_pos = char_to_byte_index(&self.question_input, self.question_cursor);
            self.question_input.remove(byte_pos);
        }
    }

    pub fn question_cursor_left(&mut self) {
        self.question_cursor = self.question_cursor.saturating_sub(1);
    }

    pub fn question_cursor_right(&mut self) {
        let char_count = self.question_input.chars().count();
        self.question_cursor = (self.question_cursor + 1).min(char_count);
    }

    pub fn question_cursor_home(&mut self) {
        self.question_cursor = 0;
    }

    pub fn question_cursor_end(&mut self) {
        self.question_cursor = self.question_input.chars().count();
    }

    // Response panes are edited at the end of the text
    pub fn response_push(&mut self, model: Model, c: char) {
        self.response_mut(model).text.push(c);
    }

    pub fn response_push_str(&mut self, model: Model, text: &str) {
        self.response_mut(model).text.push_str(&text.replace("\r\n", "\n"));
    }

    pub fn response_pop(&mut self, model: Model) {
        self.response_mut(model).text.pop();
    }

    pub fn comparison_max_scroll(&self) -> u16 {
        self.comparison_rows.saturating_sub(self.comparison_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Response(model) => {
                let slot = self.response_mut(model);
                slot.scroll = slot.scroll.saturating_add(lines).min(slot.max_scroll());
            }
            FocusPane::Comparison => {
                let max = self.comparison_max_scroll();
                self.comparison_scroll = self.comparison_scroll.saturating_add(lines).min(max);
            }
            FocusPane::Question => {}
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Response(model) => {
                let slot = self.response_mut(model);
                slot.scroll = slot.scroll.saturating_sub(lines);
            }
            FocusPane::Comparison => {
                self.comparison_scroll = self.comparison_scroll.saturating_sub(lines);
            }
            FocusPane::Question => {}
        }
    }
}
