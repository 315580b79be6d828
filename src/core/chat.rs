//! Chat orchestrator
//!
//! The orchestrator is what a front-end binds its controls to. It:
//! 1. Rejects empty input and submissions while the send control is disabled
//! 2. Writes the user's line to the transcript and shows the typing indicator
//! 3. Hands the call to the session synchronizer
//! 4. Appends the reply, order card or recommendation card, or a system
//!    message when the call failed
//! 5. Re-enables the send control

use std::sync::Arc;

use crate::backend::Backend;
use crate::catalog::{Allergy, Ingredient};
use crate::conversation::Source;

use super::cart::{BrothStep, CartError};
use super::context::{ChatContext, ConversationContext};
use super::session::SessionSynchronizer;

/// Result of a user-initiated action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Empty or whitespace-only input; nothing happened
    Ignored,
    /// The send control is disabled while another send is outstanding
    Blocked,
    /// The confirmation gate is closed
    NotConfirmable,
    /// The backend answered and the transcript was updated
    Delivered,
    /// The call failed and a system message was shown
    Failed,
}

pub struct ChatOrchestrator {
    ctx: Arc<ConversationContext>,
    sync: SessionSynchronizer,
}

impl ChatOrchestrator {
    pub fn new(ctx: Arc<ConversationContext>, backend: Arc<dyn Backend>) -> Self {
        Self {
            ctx,
            sync: SessionSynchronizer::new(backend),
        }
    }

    pub fn context(&self) -> &Arc<ConversationContext> {
        &self.ctx
    }

    /// Send a chat message with the current ordering context
    pub async fn send_message(&self, text: &str) -> Submission {
        self.send_message_with(text, None).await
    }

    /// Send a chat message with an explicit ordering context
    pub async fn send_message_with(&self, text: &str, context: Option<ChatContext>) -> Submission {
        if text.trim().is_empty() {
            return Submission::Ignored;
        }

        let accepted = self.ctx.update(|state| {
            if !state.send_enabled {
                return false;
            }
            state.transcript.add_user(text);
            state.send_enabled = false;
            state.transcript.show_typing();
            true
        });
        if !accepted {
            tracing::debug!("send control disabled, submission blocked");
            return Submission::Blocked;
        }

        let result = self.sync.send_chat_message(&self.ctx, text, context).await;

        self.ctx.update(|state| {
            state.transcript.remove_typing();
            state.send_enabled = true;
            match result {
                Ok(outcome) => {
                    state.transcript.add_assistant(&outcome.reply, outcome.source);
                    if let Some(order) = outcome.order {
                        state.transcript.add_order_card(order);
                    }
                    Submission::Delivered
                }
                Err(e) => {
                    tracing::warn!(error = %e, "chat request failed");
                    state
                        .transcript
                        .add_system(&format!("网络错误：{}，请稍后重试。", e));
                    Submission::Failed
                }
            }
        })
    }

    /// Ask for a fresh recommendation card for the current guests and
    /// allergies. Runs even while a chat send is outstanding.
    pub async fn recommend(&self) -> Submission {
        let (guests, allergies) = self.ctx.update(|state| {
            let guests = state.cart.guest_count();
            let allergies = state.allergies.tags();
            state
                .transcript
                .add_user(&recommend_prompt(guests, &allergies));
            state.send_enabled = false;
            state.transcript.show_typing();
            (guests, allergies)
        });

        let result = self
            .sync
            .request_recommendation(&self.ctx, guests, allergies)
            .await;

        self.ctx.update(|state| {
            state.transcript.remove_typing();
            state.send_enabled = true;
            match result {
                Ok(rec) => {
                    state
                        .transcript
                        .add_assistant(&rec.message, Some(Source::Concierge));
                    state.transcript.add_recommend_card(rec.card_id);
                    Submission::Delivered
                }
                Err(e) => {
                    tracing::warn!(error = %e, "recommendation failed");
                    state.transcript.add_system(&format!("获取推荐失败：{}", e));
                    Submission::Failed
                }
            }
        })
    }

    /// Tick or untick an item on the active card and push the card's
    /// selection under the card's own session
    pub async fn toggle_item(&self, item_id: &str) -> Result<bool, CartError> {
        let (selected, snapshot) = self.ctx.try_update(|state| {
            let selected = state.cart.toggle_item(item_id)?;
            let snapshot = state.cart.active_recommendation().and_then(|card| {
                card.session_id
                    .clone()
                    .filter(|s| !s.is_empty())
                    .map(|session| (session, card.selected_ids()))
            });
            Ok::<_, CartError>((selected, snapshot))
        })?;

        let Some((session, cart)) = snapshot else {
            return Ok(selected);
        };

        if let Err(e) = self.sync.sync_cart(&self.ctx, &session, cart).await {
            tracing::warn!(error = %e, session = %session, "cart sync failed");
            self.ctx.update(|state| {
                state.transcript.add_system(&format!("购物车同步失败：{}", e));
            });
        }
        Ok(selected)
    }

    /// Send the confirmation message if the gate allows it
    pub async fn confirm_order(&self) -> Submission {
        if !self.ctx.gate().can_confirm {
            return Submission::NotConfirmable;
        }
        let message = self.ctx.config().messages.confirm_order.clone();
        self.send_message(&message).await
    }

    pub async fn ask_about_broth(&self, name: &str) -> Submission {
        self.send_message(&format!("{}有什么特点和适合什么人？", name))
            .await
    }

    pub async fn ask_about_ingredient(&self, name_cn: &str) -> Submission {
        self.send_message(&format!("{}有什么特点和涮煮建议？", name_cn))
            .await
    }

    /// Fetch the ingredient listing. Failures leave the listing empty.
    pub async fn load_ingredients(&self) -> Vec<Ingredient> {
        let ingredients = match self.sync.ingredients().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "could not load ingredients");
                Vec::new()
            }
        };
        self.ctx
            .update(|state| state.ingredients = ingredients.clone());
        ingredients
    }

    pub fn set_guest_count(&self, guests: u32) -> Result<(), CartError> {
        self.ctx
            .try_update(|state| state.cart.set_guest_count(guests).map(|_| ()))
    }

    /// Step a broth; `Ok(false)` when the cart was already at its bound
    pub fn adjust_broth(&self, name: &str, step: BrothStep) -> Result<bool, CartError> {
        self.ctx.try_update(|state| state.cart.adjust_broth(name, step))
    }

    pub fn toggle_allergy(&self, allergy: Allergy) -> bool {
        self.ctx.update(|state| state.allergies.toggle(allergy))
    }
}

/// User line shown when the recommend button is pressed
pub fn recommend_prompt(guests: u32, allergies: &[String]) -> String {
    let mut prompt = format!("请根据{}人", guests);
    if !allergies.is_empty() {
        prompt.push_str(&format!("，{}过敏", allergies.join("、")));
    }
    prompt.push_str("，推荐一份预选食材（含肉、海鲜、蔬菜、豆制品、主食）。");
    prompt
}
