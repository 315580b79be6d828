//! Core widget components
//!
//! This module contains the ordering state machine: the cart model, the
//! confirmation gate, the session synchronizer and the chat orchestrator,
//! all sharing one conversation context.

pub mod cart;
mod chat;
mod context;
mod gate;
mod session;

pub use cart::{BrothCart, BrothLine, BrothStep, CartError, CartModel, Item, RecommendationSet};
pub use chat::{recommend_prompt, ChatOrchestrator, Submission};
pub use context::{BrothSpec, ChatContext, ConversationContext, ConversationState};
pub use gate::{ConfirmationGate, UnmetPrecondition};
pub use session::{ChatOutcome, Recommendation, SessionSynchronizer, SyncOutcome};
