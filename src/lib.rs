pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod orchestrator;
pub mod relay;
pub mod web_server;
pub mod youtube;

pub use config::Config;
pub use error::{ApiError, GatewayError};
pub use gateway::{CompletionService, VideoResult, VideoSearch};
pub use orchestrator::{Conversation, Message, Orchestrator, Role, SubmitOutcome};
