// Interactive terminal chat. Every input line goes through the same
// Orchestrator the web page uses.

use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::orchestrator::{Conversation, Orchestrator, Role, SkipReason, SubmitOutcome};

const HELP: &str = "Type a message and press Enter. /video toggles video results, /quit exits.";

/// Renders what changed since `seen` messages were printed.
pub fn render_update(conversation: &Conversation, seen: usize) -> String {
    let mut out = String::new();
    if let Some(err) = &conversation.state().last_error {
        out.push_str(&format!("! {}\n", err));
    }
    for message in conversation.messages().iter().skip(seen) {
        if message.role == Role::Assistant {
            out.push_str(&format!("bot> {}\n", message.content));
        }
    }
    if conversation.state().video_mode_enabled && !conversation.videos().is_empty() {
        out.push_str("Related videos:\n");
        for video in conversation.videos() {
            out.push_str(&format!("  - {} ({})\n", video.title, video.watch_url()));
        }
    }
    out
}

pub async fn run_chat(orchestrator: &Orchestrator, video: bool) -> Result<()> {
    orchestrator.set_video_mode(video).await;
    println!("I-Tube chat. {}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}", HELP);
                continue;
            }
            "/video" => {
                let enabled = !orchestrator.snapshot().await.state().video_mode_enabled;
                orchestrator.set_video_mode(enabled).await;
                println!("Video results {}.", if enabled { "on" } else { "off" });
                continue;
            }
            _ => {}
        }

        let seen = orchestrator.snapshot().await.messages().len();
        match orchestrator.submit_message(line).await {
            SubmitOutcome::Skipped(SkipReason::BlankDraft) => continue,
            SubmitOutcome::Skipped(SkipReason::Busy) => {
                println!("Still waiting for the previous reply.");
                continue;
            }
            SubmitOutcome::Settled => {}
        }

        let conversation = orchestrator.snapshot().await;
        // The user turn was appended too; only print what follows it.
        print!("{}", render_update(&conversation, seen + 1));
    }

    info!("Chat session finished.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::{CompletionService, VideoResult, VideoSearch};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
            Ok(format!("you said {}", prompt))
        }
    }

    struct OneVideo;

    #[async_trait]
    impl VideoSearch for OneVideo {
        async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<VideoResult>, GatewayError> {
            Ok(vec![VideoResult {
                external_id: "abc".into(),
                title: "A video".into(),
                thumbnail_url: String::new(),
            }])
        }
    }

    #[tokio::test]
    async fn test_render_update_shows_reply_and_videos() {
        let orchestrator = Orchestrator::new(Arc::new(Echo), Arc::new(OneVideo));
        orchestrator.set_video_mode(true).await;
        orchestrator.submit_message("hi").await;

        let out = render_update(&orchestrator.snapshot().await, 1);
        assert!(out.contains("bot> you said hi"));
        assert!(out.contains("A video (https://www.youtube.com/watch?v=abc)"));
        assert!(!out.starts_with('!'));
    }

    #[tokio::test]
    async fn test_render_update_hides_videos_when_mode_off() {
        let orchestrator = Orchestrator::new(Arc::new(Echo), Arc::new(OneVideo));
        orchestrator.set_video_mode(true).await;
        orchestrator.submit_message("hi").await;
        orchestrator.set_video_mode(false).await;

        let out = render_update(&orchestrator.snapshot().await, 1);
        assert!(!out.contains("Related videos"));
    }
}
