pub mod auth_service;
pub mod completion_service;

pub use auth_service::{AuthError, AuthService};
pub use completion_service::{CompletionError, CompletionProxy, PromptMode};
