// Fixed wire strings and defaults shared by the gateways, the relay client and the web UI.

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_PORT: u16 = 9900;

/// Number of videos requested per lookup unless the caller asks otherwise.
pub const DEFAULT_VIDEO_LIMIT: u32 = 3;

/// Returned by the completion gateway when the model produced only whitespace.
pub const NO_RESPONSE_FALLBACK: &str = "No response generated.";
/// Used for the assistant turn when a completion service hands back an empty reply.
pub const ASSISTANT_FALLBACK: &str = "I apologize, I could not generate a response.";

pub const GEMINI_KEY_MISSING: &str = "Google Gemini API key is not configured";
pub const YOUTUBE_KEY_MISSING: &str = "YouTube API configuration error";
pub const EMPTY_AI_RESPONSE: &str = "Empty response from AI service";
pub const CHAT_REQUEST_FAILED: &str = "Failed to process request";
pub const MESSAGE_REQUIRED: &str = "Message is required";

pub const QUERY_REQUIRED: &str = "Search query is required";
pub const YOUTUBE_API_ERROR: &str = "YouTube API error";
pub const YOUTUBE_INVALID_RESPONSE: &str = "Invalid YouTube API response";
pub const YOUTUBE_REQUEST_FAILED: &str = "Failed to fetch YouTube results";
pub const UNKNOWN_ERROR: &str = "Unknown error";

// Messages produced on the client side of the relay.
pub const RELAY_CHAT_UNREACHABLE: &str = "Failed to communicate with AI service";
pub const RELAY_VIDEO_FAILED: &str = "Failed to fetch videos";
pub const RELAY_VIDEO_INVALID: &str = "Invalid video response format";
pub const RELAY_VIDEO_UNREACHABLE: &str = "Failed to fetch video results";

pub const VIDEO_SOFT_WARNING: &str = "Video search failed, but chat continues to work";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";
pub const THUMBNAIL_PLACEHOLDER: &str = "/static/placeholder.svg";
