pub mod ai;
pub mod config;
pub mod controller;
pub mod state;

// Re-export main types for convenience
pub use ai::{generator_for, CodeGenerator, GenerateError, HttpGenerator, Unconfigured};
pub use config::Config;
pub use controller::Controller;
pub use state::{ChatMessage, ChatRole, Conversation};
