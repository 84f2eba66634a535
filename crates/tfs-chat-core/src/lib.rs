pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod intent;
pub mod render;
pub mod response;
pub mod session;
pub mod state;
pub mod status;
pub mod store;

// Re-export main types for convenience
pub use client::ApiClient;
pub use config::Config;
pub use error::{ChatError, Result};
pub use history::{ActivityEntry, ActivityHistory, ActivitySummary};
pub use intent::{classify, Capability, QuickAction};
pub use render::{render, Block, DisplayContent, Tone};
pub use response::{ServiceResponse, WorkItemRef};
pub use session::{ChatSession, Phase, Submission};
pub use state::{ChatMessage, ChatRole, Conversation};
pub use status::{ServiceInfo, StatusSnapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};
