//! Scripted backend for exercising the synchronizer without a server

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::catalog::Ingredient;

use super::{
    Backend, BackendError, CartUpdateReply, CartUpdateRequest, ChatReply, ChatRequest,
    RecommendReply, RecommendRequest,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Chat(ChatRequest),
    Recommend(RecommendRequest),
    UpdateCart(CartUpdateRequest),
    Ingredients,
}

type Scripted<T> = Mutex<VecDeque<Result<T, BackendError>>>;

/// Replies are served in the order they were queued. A gate, when set, holds
/// the next cart update until the paired sender fires.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    chat: Scripted<ChatReply>,
    recommend: Scripted<RecommendReply>,
    update_cart: Scripted<CartUpdateReply>,
    ingredients: Scripted<Vec<Ingredient>>,
    cart_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chat(&self, reply: Result<ChatReply, BackendError>) {
        self.chat.lock().unwrap().push_back(reply);
    }

    pub fn push_recommend(&self, reply: Result<RecommendReply, BackendError>) {
        self.recommend.lock().unwrap().push_back(reply);
    }

    pub fn push_update_cart(&self, reply: Result<CartUpdateReply, BackendError>) {
        self.update_cart.lock().unwrap().push_back(reply);
    }

    pub fn push_ingredients(&self, reply: Result<Vec<Ingredient>, BackendError>) {
        self.ingredients.lock().unwrap().push_back(reply);
    }

    /// Hold the next cart update until the returned sender is used
    pub fn gate_next_cart_update(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.cart_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cart_updates(&self) -> Vec<CartUpdateRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpdateCart(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next<T>(queue: &Scripted<T>, what: &str) -> Result<T, BackendError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::InvalidResponse(format!("no scripted {}", what))))
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        self.record(Call::Chat(request.clone()));
        Self::next(&self.chat, "chat reply")
    }

    async fn recommend(&self, request: &RecommendRequest) -> Result<RecommendReply, BackendError> {
        self.record(Call::Recommend(request.clone()));
        Self::next(&self.recommend, "recommend reply")
    }

    async fn update_cart(
        &self,
        request: &CartUpdateRequest,
    ) -> Result<CartUpdateReply, BackendError> {
        self.record(Call::UpdateCart(request.clone()));
        let gate = self.cart_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let scripted = self.update_cart.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(CartUpdateReply {
                ok: true,
                cart: request.cart.clone(),
                total: Some(request.cart.len() as u32),
                error: None,
            })
        })
    }

    async fn ingredients(&self) -> Result<Vec<Ingredient>, BackendError> {
        self.record(Call::Ingredients);
        Self::next(&self.ingredients, "ingredient listing")
    }
}
