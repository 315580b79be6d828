//! HTTP implementation of the concierge backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::Ingredient;
use crate::config::Config;

use super::{
    Backend, BackendError, CartUpdateReply, CartUpdateRequest, ChatReply, ChatRequest,
    IngredientsReply, RecommendReply, RecommendRequest,
};

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        Self::new(config.api_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Self::decode(path, response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, BackendError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;

        Self::decode(path, response).await
    }

    async fn decode<R: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<R, BackendError> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), "backend returned non-success status");
            return Err(BackendError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            BackendError::InvalidResponse(format!("{} - Body: {}", e, body))
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        tracing::debug!(session = ?request.session_id, "POST /api/chat");
        self.post_json("/api/chat", request).await
    }

    async fn recommend(&self, request: &RecommendRequest) -> Result<RecommendReply, BackendError> {
        tracing::debug!(
            session = ?request.session_id,
            guests = request.num_guests,
            "POST /api/recommend"
        );
        self.post_json("/api/recommend", request).await
    }

    async fn update_cart(
        &self,
        request: &CartUpdateRequest,
    ) -> Result<CartUpdateReply, BackendError> {
        tracing::debug!(
            session = %request.session_id,
            items = request.cart.len(),
            "POST /api/cart/update"
        );
        self.post_json("/api/cart/update", request).await
    }

    async fn ingredients(&self) -> Result<Vec<Ingredient>, BackendError> {
        let reply: IngredientsReply = self.get_json("/api/ingredients").await?;
        Ok(reply.ingredients)
    }
}
