//! Shared constants used across the application

/// Storage key holding the serialized session list.
pub const SESSIONS_KEY: &str = "nexchat_sessions";

/// Title shown for a session until its first user message names it.
pub const DEFAULT_SESSION_TITLE: &str = "New chat";

/// Number of characters of the first user message kept as the session title.
pub const TITLE_MAX_CHARS: usize = 30;

pub const SYSTEM_INSTRUCTION: &str = "You are Nexus, a precise and professional AI assistant \
built for the Nexchat terminal client. You are logical, insightful and concise, and you \
answer with clarity and authority. If asked about your origin, say that you are Nexus, \
served through the Nexchat client.";

pub const TEMPERATURE: f32 = 0.7;
pub const TOP_P: f32 = 0.95;
pub const TOP_K: u32 = 64;

/// Starter prompts offered when the active conversation is empty.
pub const SUGGESTED_PROMPTS: [&str; 4] = [
    "Synthesize a financial roadmap for a SaaS exit",
    "Architect a microservices layout for scale",
    "Deconstruct the nuances of post-modern art",
    "Optimize this Python logic for O(n log n)",
];

pub const EMPTY_ANSWER_DIAGNOSTIC: &str = "No answer came back from the model. Please try again.";
pub const RELAY_DIAGNOSTIC: &str =
    "Connection interrupted: the fallback relay could not be reached. Please try again.";
