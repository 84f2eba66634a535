//! Per-submission orchestration: classify, dispatch, render, record.

use crate::client::ApiClient;
use crate::error::{ChatError, Result};
use crate::history::ActivityHistory;
use crate::intent::{classify, Capability};
use crate::render::render;
use crate::response::ServiceResponse;
use crate::state::{ChatMessage, Conversation};
use crate::status::StatusSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Processing,
}

/// An accepted message on its way to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub capability: Capability,
    pub message: String,
}

/// Owns the transcript, the activity history and the last status snapshot.
///
/// Exactly one submission can be in flight; [`ChatSession::begin`] rejects
/// further input with [`ChatError::Busy`] until [`ChatSession::complete`] runs.
pub struct ChatSession {
    conversation: Conversation,
    history: ActivityHistory,
    status: StatusSnapshot,
    phase: Phase,
}

impl ChatSession {
    pub fn new(history: ActivityHistory) -> Self {
        Self {
            conversation: Conversation::new(),
            history,
            status: StatusSnapshot::default(),
            phase: Phase::Idle,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn history(&self) -> &ActivityHistory {
        &self.history
    }

    pub fn status(&self) -> &StatusSnapshot {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        self.phase == Phase::Processing
    }

    pub fn apply_status(&mut self, snapshot: StatusSnapshot) {
        self.status = snapshot;
    }

    /// Idle -> Processing: accept the input, echo it, and classify it.
    pub fn begin(&mut self, input: &str) -> Result<Submission> {
        let message = input.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.is_processing() {
            return Err(ChatError::Busy);
        }

        let capability = classify(message);
        tracing::info!(capability = capability.as_str(), "processing chat message");

        self.conversation.push(ChatMessage::user(message));
        self.phase = Phase::Processing;

        Ok(Submission {
            capability,
            message: message.to_string(),
        })
    }

    /// Processing -> Idle: append exactly one reply turn and one activity entry.
    pub fn complete(
        &mut self,
        submission: Submission,
        outcome: Result<ServiceResponse>,
    ) -> ChatMessage {
        let response = outcome.unwrap_or_else(|e| {
            tracing::error!(error = %e, "chat request failed");
            ServiceResponse::transport_failure(e)
        });

        let reply = ChatMessage::reply(render(&response));
        self.conversation.push(reply.clone());
        self.history
            .record(&submission.message, &response, submission.capability);
        self.phase = Phase::Idle;
        reply
    }

    /// Run one full submission: echo, status check, dispatch, render, record.
    pub async fn submit(&mut self, client: &ApiClient, input: &str) -> Result<ChatMessage> {
        let submission = self.begin(input)?;

        let snapshot = client.refresh_status().await;
        self.apply_status(snapshot);

        let outcome = client
            .dispatch(submission.capability, &submission.message)
            .await;
        Ok(self.complete(submission, outcome))
    }
}
