//! Hotpot concierge ordering widget
//!
//! Client-side state for a conversational hot-pot ordering assistant: a chat
//! transcript, the guest's ordering context (guest count, allergies, broth
//! quantities) and the recommendation checklist, kept in sync with the
//! concierge backend over JSON.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod core;
pub mod render;

pub use backend::{Backend, BackendError, HttpBackend};
pub use config::{Config, WidgetConfig};
pub use crate::core::{ChatOrchestrator, ConversationContext, Submission};
