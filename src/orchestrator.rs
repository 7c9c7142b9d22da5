//! Conversation state and the per-submission flow that drives the two gateways.
//!
//! A submission goes `Idle -> Submitting(ai) -> Submitting(video) -> Idle`.
//! The AI call always finishes before the video call starts, and the video
//! call only happens when the AI call succeeded and video mode is on.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::constants::{ASSISTANT_FALLBACK, DEFAULT_VIDEO_LIMIT, UNEXPECTED_ERROR, VIDEO_SOFT_WARNING};
use crate::error::GatewayError;
use crate::gateway::{CompletionService, VideoResult, VideoSearch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionState {
    pub draft_text: String,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub video_mode_enabled: bool,
}

/// Why a submission did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The draft was empty or whitespace.
    BlankDraft,
    /// Another submission is still in flight.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Skipped(SkipReason),
    Settled,
}

/// Transcript, current video strip and submission flags.
///
/// The transcript is append-only. Mutation happens only through the
/// transition methods below, which the [`Orchestrator`] calls in order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    messages: Vec<Message>,
    videos: Vec<VideoResult>,
    #[serde(flatten)]
    state: SubmissionState,
}

impl Conversation {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn videos(&self) -> &[VideoResult] {
        &self.videos
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.state.draft_text = draft.into();
    }

    pub fn set_video_mode(&mut self, enabled: bool) {
        self.state.video_mode_enabled = enabled;
    }

    /// Idle -> Submitting(ai). Returns the trimmed text to send.
    fn begin_submission(&mut self) -> Result<String, SkipReason> {
        if self.state.is_loading {
            return Err(SkipReason::Busy);
        }
        let text = self.state.draft_text.trim();
        if text.is_empty() {
            return Err(SkipReason::BlankDraft);
        }
        let text = text.to_string();
        self.messages.push(Message::user(text.clone()));
        self.state.draft_text.clear();
        self.state.last_error = None;
        self.state.is_loading = true;
        Ok(text)
    }

    fn record_reply(&mut self, reply: String) {
        let content = if reply.is_empty() {
            ASSISTANT_FALLBACK.to_string()
        } else {
            reply
        };
        self.messages.push(Message::assistant(content));
    }

    fn record_fatal(&mut self, message: String) {
        self.state.last_error = Some(message);
        self.videos.clear();
    }

    fn record_videos(&mut self, videos: Vec<VideoResult>) {
        self.videos = videos;
    }

    fn record_video_failure(&mut self) {
        self.state.last_error = Some(VIDEO_SOFT_WARNING.to_string());
        self.videos.clear();
    }

    fn settle(&mut self) {
        self.state.is_loading = false;
    }
}

/// Runs a gateway call, turning both its error and any panic into the text
/// shown to the user.
async fn guarded<T, F>(call: F) -> Result<T, String>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => {
            error!("Gateway call panicked");
            Err(UNEXPECTED_ERROR.to_string())
        }
    }
}

/// Locks the conversation. A panic while it was held cannot leave it
/// half-updated (every transition is a single assignment or push), so a
/// poisoned lock is recovered.
fn lock(conversation: &Mutex<Conversation>) -> MutexGuard<'_, Conversation> {
    conversation.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `is_loading` when dropped, so a submission settles on every exit
/// path, including when its future is dropped mid-call.
struct SettleGuard<'a> {
    conversation: &'a Mutex<Conversation>,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        lock(self.conversation).settle();
    }
}

/// Owns the [`Conversation`] and coordinates the gateways for each submission.
///
/// The conversation lock is only held between awaits, never across a gateway
/// call, so snapshots taken mid-submission show `is_loading == true`.
pub struct Orchestrator {
    completion: Arc<dyn CompletionService>,
    video_search: Arc<dyn VideoSearch>,
    video_limit: u32,
    conversation: Mutex<Conversation>,
}

impl Orchestrator {
    pub fn new(completion: Arc<dyn CompletionService>, video_search: Arc<dyn VideoSearch>) -> Self {
        Self {
            completion,
            video_search,
            video_limit: DEFAULT_VIDEO_LIMIT,
            conversation: Mutex::new(Conversation::default()),
        }
    }

    pub fn with_video_limit(mut self, limit: u32) -> Self {
        self.video_limit = limit;
        self
    }

    pub async fn snapshot(&self) -> Conversation {
        lock(&self.conversation).clone()
    }

    pub async fn set_draft(&self, draft: impl Into<String>) {
        lock(&self.conversation).set_draft(draft);
    }

    pub async fn set_video_mode(&self, enabled: bool) {
        lock(&self.conversation).set_video_mode(enabled);
    }

    /// Submits the current draft.
    pub async fn submit(&self) -> SubmitOutcome {
        self.drive(None, None).await
    }

    /// Replaces the draft with `draft` and submits it, unless a submission is
    /// already in flight.
    pub async fn submit_message(&self, draft: impl Into<String>) -> SubmitOutcome {
        self.drive(Some(draft.into()), None).await
    }

    /// Like [`Orchestrator::submit_message`], but also sets video mode. Both
    /// are left alone when another submission is in flight.
    pub async fn submit_with_video_mode(
        &self,
        draft: impl Into<String>,
        video_mode: bool,
    ) -> SubmitOutcome {
        self.drive(Some(draft.into()), Some(video_mode)).await
    }

    async fn drive(&self, draft: Option<String>, video_mode: Option<bool>) -> SubmitOutcome {
        let (text, video_mode, settle) = {
            let mut conversation = lock(&self.conversation);
            if conversation.state.is_loading {
                return SubmitOutcome::Skipped(SkipReason::Busy);
            }
            if let Some(enabled) = video_mode {
                conversation.set_video_mode(enabled);
            }
            if let Some(draft) = draft {
                conversation.set_draft(draft);
            }
            match conversation.begin_submission() {
                Ok(text) => (
                    text,
                    conversation.state.video_mode_enabled,
                    SettleGuard {
                        conversation: &self.conversation,
                    },
                ),
                Err(reason) => return SubmitOutcome::Skipped(reason),
            }
        };

        info!(video_mode, "Submission started");
        self.run_gateways(&text, video_mode).await;
        drop(settle);
        info!("Submission settled");
        SubmitOutcome::Settled
    }

    async fn run_gateways(&self, text: &str, video_mode: bool) {
        match guarded(self.completion.complete(text)).await {
            Ok(reply) => lock(&self.conversation).record_reply(reply),
            Err(message) => {
                error!(%message, "AI request failed");
                lock(&self.conversation).record_fatal(message);
                return;
            }
        }

        if !video_mode {
            return;
        }

        match guarded(self.video_search.search(text, self.video_limit)).await {
            Ok(videos) => lock(&self.conversation).record_videos(videos),
            Err(message) => {
                warn!(%message, "Video search failed");
                lock(&self.conversation).record_video_failure();
            }
        }
    }
}
