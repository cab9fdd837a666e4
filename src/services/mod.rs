//! Business logic services for the chat relay.
//!
//! This module contains the model registry and the chat dispatch service
//! that drives one upstream session per request.

pub mod chat_service;
pub mod model_registry;

// Re-export commonly used types
pub use chat_service::{ChatEventStream, ChatService, OutboundEvent};
pub use model_registry::{ModelRegistry, ModelTarget};
