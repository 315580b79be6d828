//! Per-widget conversation context
//!
//! One `ConversationContext` exists per widget instance. It owns the session
//! id, the cart model, the allergy selection and the transcript, and is
//! shared by reference between the synchronizer and the orchestrator.
//!
//! State changes go through [`ConversationContext::update`], which recomputes
//! the confirmation gate and bumps a revision number that front-ends watch to
//! know when to re-render. The inner lock is only ever held for a synchronous
//! transition, never across a backend call.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use crate::catalog::{AllergySelection, Ingredient};
use crate::config::WidgetConfig;
use crate::conversation::Transcript;

use super::cart::{BrothLine, CartModel};
use super::gate::ConfirmationGate;

/// Mutable state of one conversation
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub session_id: Option<String>,
    pub cart: CartModel,
    pub allergies: AllergySelection,
    pub transcript: Transcript,
    /// Ingredient listing for the knowledge dropdown
    pub ingredients: Vec<Ingredient>,
    /// Whether the send control accepts a new chat submission
    pub send_enabled: bool,
    gate: ConfirmationGate,
}

impl ConversationState {
    fn new(catalog: &[String], guests: u32) -> Self {
        let cart = CartModel::new(catalog, guests);
        let gate = ConfirmationGate::evaluate(&cart);
        Self {
            session_id: None,
            cart,
            allergies: AllergySelection::new(),
            transcript: Transcript::new(),
            ingredients: Vec::new(),
            send_enabled: true,
            gate,
        }
    }

    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    /// Guest count, allergies and broths as sent with a chat message
    pub fn chat_context(&self) -> ChatContext {
        ChatContext {
            num_guests: self.cart.guest_count(),
            allergies: self.allergies.tags(),
            broths: self
                .cart
                .broth_lines()
                .into_iter()
                .map(BrothSpec::Line)
                .collect(),
        }
    }
}

/// A broth entry supplied by a caller: either a bare name or a name with a
/// quantity. Missing or zero quantities count as one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum BrothSpec {
    Name(String),
    Line(BrothLine),
    Partial {
        name_cn: String,
        #[serde(default)]
        quantity: Option<u32>,
    },
}

impl BrothSpec {
    pub fn normalize(&self) -> BrothLine {
        match self {
            BrothSpec::Name(name) => BrothLine {
                name_cn: name.clone(),
                quantity: 1,
            },
            BrothSpec::Line(line) => BrothLine {
                name_cn: line.name_cn.clone(),
                quantity: line.quantity.max(1),
            },
            BrothSpec::Partial { name_cn, quantity } => BrothLine {
                name_cn: name_cn.clone(),
                quantity: quantity.unwrap_or(1).max(1),
            },
        }
    }
}

/// Ordering context attached to a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    pub num_guests: u32,
    pub allergies: Vec<String>,
    pub broths: Vec<BrothSpec>,
}

pub struct ConversationContext {
    config: WidgetConfig,
    state: Mutex<ConversationState>,
    revision: watch::Sender<u64>,
}

impl ConversationContext {
    pub fn new(config: WidgetConfig) -> Self {
        let state = ConversationState::new(&config.catalog.broths, config.guests.default);
        let (revision, _) = watch::channel(0);
        Self {
            config,
            state: Mutex::new(state),
            revision,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Read a value out of the current state
    pub fn read<R>(&self, f: impl FnOnce(&ConversationState) -> R) -> R {
        f(&*self.lock())
    }

    /// Clone of the whole state, for rendering
    pub fn snapshot(&self) -> ConversationState {
        self.read(|s| s.clone())
    }

    /// Apply a transition, recompute the gate and signal a re-render
    pub fn update<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> R {
        let result = {
            let mut state = self.lock();
            let result = f(&mut *state);
            state.gate = ConfirmationGate::evaluate(&state.cart);
            result
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    /// Like [`update`](Self::update) for fallible transitions. A transition
    /// that fails must leave the state untouched, so no re-render is signalled.
    pub fn try_update<T, E>(
        &self,
        f: impl FnOnce(&mut ConversationState) -> Result<T, E>,
    ) -> Result<T, E> {
        let value = {
            let mut state = self.lock();
            let value = f(&mut *state)?;
            state.gate = ConfirmationGate::evaluate(&state.cart);
            value
        };
        self.revision.send_modify(|rev| *rev += 1);
        Ok(value)
    }

    pub fn session_id(&self) -> Option<String> {
        self.read(|s| s.session_id.clone())
    }

    pub fn gate(&self) -> ConfirmationGate {
        self.read(|s| s.gate.clone())
    }

    /// Receiver that changes whenever the state does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        // State is plain data, so a panic mid-update cannot leave it torn
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
