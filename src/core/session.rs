//! Session synchronizer
//!
//! Mediates every backend call that reads or writes session state:
//! - cart syncs are tagged with the session id captured when the selection
//!   was snapshotted, and never move the live session id to a stale value
//! - a recommendation first flushes the active card's selection, then asks
//!   for a new card; the response defines the session from then on
//! - chat replies always carry the session id to continue with
//!
//! Nothing here is mutated before a call succeeds. Concurrent flows are not
//! serialized against each other; whichever response lands last decides the
//! session id.

use std::sync::Arc;

use serde_json::Value;

use crate::backend::{Backend, BackendError, CartUpdateRequest, ChatRequest, RecommendRequest};
use crate::catalog::Ingredient;
use crate::conversation::Source;

use super::cart::RecommendationSet;
use super::context::{BrothSpec, ChatContext, ConversationContext, ConversationState};

/// What a successful cart sync did to the live session id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The snapshot matched the live session
    Current,
    /// No session was live; the snapshot was adopted
    Adopted,
    /// The live session has moved on; only the old card was confirmed
    Stale,
}

/// A new active card installed from a recommend response
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub message: String,
    pub card_id: uuid::Uuid,
}

/// Effects of a chat reply to be shown in the transcript
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub source: Option<Source>,
    /// Structured order, shown as-is
    pub order: Option<Value>,
}

pub struct SessionSynchronizer {
    backend: Arc<dyn Backend>,
}

impl SessionSynchronizer {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Push the selection of a card to the backend under the session it was
    /// captured with
    pub async fn sync_cart(
        &self,
        ctx: &ConversationContext,
        snapshot_session_id: &str,
        item_ids: Vec<String>,
    ) -> Result<SyncOutcome, BackendError> {
        let request = CartUpdateRequest {
            session_id: snapshot_session_id.to_string(),
            cart: item_ids,
        };
        let reply = self.backend.update_cart(&request).await?;
        if !reply.ok {
            return Err(BackendError::Rejected(
                reply.error.unwrap_or_else(|| "cart update rejected".to_string()),
            ));
        }

        let outcome = ctx.update(|state| match state.session_id.as_deref() {
            None => {
                state.session_id = Some(snapshot_session_id.to_string());
                SyncOutcome::Adopted
            }
            Some(current) if current == snapshot_session_id => SyncOutcome::Current,
            Some(_) => SyncOutcome::Stale,
        });

        match outcome {
            SyncOutcome::Stale => tracing::debug!(
                snapshot = snapshot_session_id,
                "cart sync acknowledged for a superseded session"
            ),
            SyncOutcome::Adopted => tracing::info!(
                session = snapshot_session_id,
                "adopted session from cart sync"
            ),
            SyncOutcome::Current => {}
        }
        Ok(outcome)
    }

    /// Flush the active card, then fetch and install a new one
    pub async fn request_recommendation(
        &self,
        ctx: &ConversationContext,
        guest_count: u32,
        allergies: Vec<String>,
    ) -> Result<Recommendation, BackendError> {
        let (session_id, pending_cart) = ctx.read(|state| {
            let pending = state
                .cart
                .active_recommendation()
                .map(RecommendationSet::selected_ids);
            (state.session_id.clone(), pending)
        });

        if let (Some(session), Some(cart)) = (&session_id, pending_cart) {
            // The reply body is not inspected; only transport failures abort
            let flush = CartUpdateRequest {
                session_id: session.clone(),
                cart,
            };
            let reply = self.backend.update_cart(&flush).await?;
            if !reply.ok {
                tracing::warn!(session = %session, error = ?reply.error, "pre-recommend flush not accepted");
            }
        }

        let request = RecommendRequest {
            num_guests: guest_count,
            allergies,
            session_id,
        };
        let reply = self.backend.recommend(&request).await?;
        let items = reply.checklist();

        let recommendation = ctx.update(|state| {
            if let Some(id) = reply.session_id.clone() {
                state.session_id = Some(id);
            }
            let card = RecommendationSet::new(
                reply.message.clone(),
                reply.session_id.clone().or_else(|| state.session_id.clone()),
                items,
            );
            let card = state.cart.replace_active_recommendation(card);
            Recommendation {
                message: card.message.clone(),
                card_id: card.id,
            }
        });

        tracing::info!(
            session = ?reply.session_id,
            card = %recommendation.card_id,
            "installed new recommendation card"
        );
        Ok(recommendation)
    }

    /// Send one chat message with the given (or current) ordering context
    pub async fn send_chat_message(
        &self,
        ctx: &ConversationContext,
        text: &str,
        context: Option<ChatContext>,
    ) -> Result<ChatOutcome, BackendError> {
        let (session_id, current) = ctx.read(|state| {
            (state.session_id.clone(), ConversationState::chat_context(state))
        });
        let context = context.unwrap_or(current);

        let request = ChatRequest {
            message: text.to_string(),
            session_id,
            num_guests: context.num_guests,
            allergies: context.allergies,
            broths: context.broths.iter().map(BrothSpec::normalize).collect(),
        };
        let reply = self.backend.chat(&request).await?;

        if let Some(id) = reply.session_id.clone() {
            ctx.update(|state| state.session_id = Some(id));
        }

        Ok(ChatOutcome {
            source: Source::from_wire(reply.source.as_deref()),
            reply: reply.reply,
            order: reply.order_json,
        })
    }

    /// Ingredient listing; not tied to any session
    pub async fn ingredients(&self) -> Result<Vec<Ingredient>, BackendError> {
        self.backend.ingredients().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Call, MockBackend};
    use crate::backend::{CartUpdateReply, ChatReply, RecommendReply, WireItem};
    use crate::config::WidgetConfig;
    use serde_json::json;

    fn setup() -> (Arc<MockBackend>, SessionSynchronizer, ConversationContext) {
        let backend = Arc::new(MockBackend::new());
        let sync = SessionSynchronizer::new(backend.clone());
        let ctx = ConversationContext::new(WidgetConfig::default());
        (backend, sync, ctx)
    }

    fn wire(id: &str, name: &str, checked: bool) -> WireItem {
        WireItem {
            id: Some(id.into()),
            name_cn: Some(name.into()),
            name_en: None,
            checked: Some(checked),
        }
    }

    fn recommend_reply(session: &str, items: Vec<WireItem>) -> RecommendReply {
        RecommendReply {
            session_id: Some(session.into()),
            message: format!("card for {}", session),
            all_items: Some(items),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sync_adopts_when_no_session() {
        let (_backend, sync, ctx) = setup();
        let outcome = sync.sync_cart(&ctx, "s1", vec!["x1".into()]).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Adopted);
        assert_eq!(ctx.session_id().as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_sync_never_overwrites_with_stale_session() {
        let (backend, sync, ctx) = setup();
        ctx.update(|s| s.session_id = Some("s2".into()));

        let outcome = sync.sync_cart(&ctx, "s1", vec![]).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Stale);
        assert_eq!(ctx.session_id().as_deref(), Some("s2"));
        assert_eq!(backend.cart_updates()[0].session_id, "s1");
    }

    #[tokio::test]
    async fn test_sync_rejection_is_an_error() {
        let (backend, sync, ctx) = setup();
        backend.push_update_cart(Ok(CartUpdateReply {
            ok: false,
            error: Some("session_not_found".into()),
            ..Default::default()
        }));

        let err = sync.sync_cart(&ctx, "s1", vec![]).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(ref e) if e == "session_not_found"));
        assert_eq!(ctx.session_id(), None);
    }

    #[tokio::test]
    async fn test_first_recommendation_skips_flush() {
        let (backend, sync, ctx) = setup();
        backend.push_recommend(Ok(recommend_reply("s1", vec![wire("x1", "牛肉", true)])));

        let rec = sync.request_recommendation(&ctx, 4, vec![]).await.unwrap();

        assert_eq!(rec.message, "card for s1");
        assert_eq!(
            backend.calls(),
            vec![Call::Recommend(RecommendRequest {
                num_guests: 4,
                allergies: vec![],
                session_id: None,
            })]
        );
        let state = ctx.snapshot();
        assert_eq!(state.session_id.as_deref(), Some("s1"));
        let card = state.cart.active_recommendation().unwrap();
        assert_eq!(card.id, rec.card_id);
        assert_eq!(card.session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_recommendation_flushes_active_card_first() {
        let (backend, sync, ctx) = setup();
        backend.push_recommend(Ok(recommend_reply(
            "s1",
            vec![wire("x1", "牛肉", true), wire("x2", "羊肉", true)],
        )));
        backend.push_recommend(Ok(recommend_reply("s2", vec![wire("y1", "豆腐", true)])));

        sync.request_recommendation(&ctx, 2, vec![]).await.unwrap();
        ctx.try_update(|s| s.cart.toggle_item("x2")).unwrap();
        sync.request_recommendation(&ctx, 2, vec!["海鲜".into()])
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            Call::UpdateCart(CartUpdateRequest {
                session_id: "s1".into(),
                cart: vec!["x1".into()],
            })
        );
        assert!(matches!(&calls[2], Call::Recommend(r) if r.session_id.as_deref() == Some("s1")));

        let state = ctx.snapshot();
        assert_eq!(state.session_id.as_deref(), Some("s2"));
        assert_eq!(state.cart.recommendations().len(), 2);
        assert!(state.cart.recommendations()[0].is_archived());
        assert_eq!(state.cart.selected_item_ids(), vec!["y1"]);
    }

    #[tokio::test]
    async fn test_failed_flush_aborts_without_mutation() {
        let (backend, sync, ctx) = setup();
        backend.push_recommend(Ok(recommend_reply("s1", vec![wire("x1", "牛肉", true)])));
        sync.request_recommendation(&ctx, 2, vec![]).await.unwrap();

        backend.push_update_cart(Err(BackendError::Status(502)));
        let err = sync.request_recommendation(&ctx, 2, vec![]).await.unwrap_err();

        assert!(matches!(err, BackendError::Status(502)));
        assert_eq!(backend.calls().len(), 2);
        let state = ctx.snapshot();
        assert_eq!(state.cart.recommendations().len(), 1);
        assert_eq!(state.session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_failed_recommend_leaves_state_untouched() {
        let (backend, sync, ctx) = setup();
        backend.push_recommend(Err(BackendError::Status(500)));

        assert!(sync.request_recommendation(&ctx, 2, vec![]).await.is_err());
        let state = ctx.snapshot();
        assert!(state.cart.recommendations().is_empty());
        assert_eq!(state.session_id, None);
    }

    #[tokio::test]
    async fn test_chat_carries_context_and_adopts_session() {
        let (backend, sync, ctx) = setup();
        backend.push_chat(Ok(ChatReply {
            session_id: Some("s9".into()),
            reply: "已生成订单".into(),
            source: Some("concierge".into()),
            order_json: Some(json!({"items": ["x1"]})),
        }));

        let context = ChatContext {
            num_guests: 3,
            allergies: vec!["花生".into()],
            broths: vec![
                BrothSpec::Name("素食汤底".into()),
                BrothSpec::Partial {
                    name_cn: "番茄火锅汤底".into(),
                    quantity: None,
                },
            ],
        };
        let outcome = sync
            .send_chat_message(&ctx, "确认下单", Some(context))
            .await
            .unwrap();

        assert_eq!(outcome.source, Some(Source::Concierge));
        assert_eq!(outcome.order, Some(json!({"items": ["x1"]})));
        assert_eq!(ctx.session_id().as_deref(), Some("s9"));

        let calls = backend.calls();
        let Call::Chat(request) = &calls[0] else {
            panic!("expected a chat call");
        };
        assert_eq!(request.session_id, None);
        assert_eq!(request.num_guests, 3);
        assert!(request.broths.iter().all(|b| b.quantity == 1));
    }

    #[tokio::test]
    async fn test_chat_uses_live_session() {
        let (backend, sync, ctx) = setup();
        ctx.update(|s| s.session_id = Some("s1".into()));
        backend.push_chat(Ok(ChatReply {
            session_id: Some("s1".into()),
            reply: "好的".into(),
            ..Default::default()
        }));

        sync.send_chat_message(&ctx, "你好", None).await.unwrap();

        let calls = backend.calls();
        let Call::Chat(request) = &calls[0] else {
            panic!("expected a chat call");
        };
        assert_eq!(request.session_id.as_deref(), Some("s1"));
        assert_eq!(request.num_guests, 2);
        assert!(request.broths.is_empty());
    }
}
