use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tfs_chat_core::{
    ActivityHistory, ApiClient, ChatError, ChatSession, Config, FileStore, QuickAction,
    ServiceResponse, StatusSnapshot, Submission,
};

/// What the background request task hands back: the status seen just before
/// dispatch, and the dispatch outcome.
pub type RequestOutcome = (StatusSnapshot, tfs_chat_core::Result<ServiceResponse>);

pub struct PendingRequest {
    pub submission: Submission,
    pub task: JoinHandle<RequestOutcome>,
}

pub struct App {
    pub should_quit: bool,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Transcript view
    pub transcript_scroll: u16,
    pub transcript_height: u16, // inner height, updated during render
    pub transcript_lines: u16,  // wrapped line count, updated during render
    pub follow_bottom: bool,
    pub transcript_area: Option<Rect>,

    // Transient one-line message under the input ("request already running", ...)
    pub notice: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub session: ChatSession,
    pub client: ApiClient,
    pub pending: Option<PendingRequest>,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let store = FileStore::new(config.data_dir()?);
        let history = ActivityHistory::load(Box::new(store));
        let client = ApiClient::new(&config.api_base_url());
        tracing::info!(base_url = client.base_url(), "using automation backend");

        Ok(Self::with_parts(ChatSession::new(history), client))
    }

    pub fn with_parts(session: ChatSession, client: ApiClient) -> Self {
        Self {
            should_quit: false,
            input: String::new(),
            cursor: 0,
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_lines: 0,
            follow_bottom: true,
            transcript_area: None,
            notice: None,
            animation_frame: 0,
            session,
            client,
            pending: None,
        }
    }

    /// Startup availability check.
    pub async fn refresh_status(&mut self) {
        let snapshot = self.client.refresh_status().await;
        self.session.apply_status(snapshot);
    }

    /// Hand the input line to the session and start the request in the background.
    pub fn submit_input(&mut self) {
        let submission = match self.session.begin(&self.input) {
            Ok(submission) => submission,
            Err(ChatError::EmptyMessage) => return,
            Err(ChatError::Busy) => {
                self.notice = Some("Дождитесь ответа на предыдущий запрос".to_string());
                return;
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                return;
            }
        };

        self.input.clear();
        self.cursor = 0;
        self.notice = None;
        self.follow_bottom = true;

        let client = self.client.clone();
        let capability = submission.capability;
        let message = submission.message.clone();
        let task = tokio::spawn(async move {
            let snapshot = client.refresh_status().await;
            let outcome = client.dispatch(capability, &message).await;
            (snapshot, outcome)
        });

        self.pending = Some(PendingRequest { submission, task });
    }

    /// Collect the background request once it has finished.
    pub async fn poll_pending(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .map(|p| p.task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        let Some(PendingRequest { submission, task }) = self.pending.take() else {
            return;
        };

        match task.await {
            Ok((snapshot, outcome)) => {
                self.session.apply_status(snapshot);
                self.session.complete(submission, outcome);
            }
            Err(e) => {
                tracing::error!(error = %e, "request task did not complete");
                self.session
                    .complete(submission, Ok(ServiceResponse::transport_failure(e)));
            }
        }
        self.follow_bottom = true;
    }

    pub fn is_processing(&self) -> bool {
        self.session.is_processing()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_processing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn apply_quick_action(&mut self, action: QuickAction) {
        self.input = action.prompt().to_string();
        self.cursor = self.input.chars().count();
    }

    // Input editing, UTF-8 safe
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.notice = None;
    }

    // Transcript scrolling
    fn max_scroll(&self) -> u16 {
        self.transcript_lines.saturating_sub(self.transcript_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(self.max_scroll());
        if self.transcript_scroll >= self.max_scroll() {
            self.follow_bottom = true;
        }
    }

    pub fn page_size(&self) -> u16 {
        (self.transcript_height / 2).max(1)
    }

    /// Called by the renderer once the wrapped transcript height is known.
    pub fn update_transcript_metrics(&mut self, lines: u16, height: u16) {
        self.transcript_lines = lines;
        self.transcript_height = height;
        if self.follow_bottom {
            self.transcript_scroll = self.max_scroll();
        } else {
            self.transcript_scroll = self.transcript_scroll.min(self.max_scroll());
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
