//! Concierge backend client
//!
//! The widget only talks to the backend through the [`Backend`] trait. The
//! request/response types mirror the JSON contract of the concierge service;
//! every response field is optional or defaulted so that a partial reply
//! degrades to empty values instead of failing the call.

mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::catalog::Ingredient;
use crate::core::cart::{BrothLine, Item};

pub use http::HttpBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Treat an explicit `null` the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `POST /api/chat` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub num_guests: u32,
    pub allergies: Vec<String>,
    pub broths: Vec<BrothLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reply: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub order_json: Option<Value>,
}

/// `POST /api/recommend` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub num_guests: u32,
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendReply {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Full checklist, ticked items first; preferred over `items`
    #[serde(default)]
    pub all_items: Option<Vec<WireItem>>,
    #[serde(default)]
    pub items: Option<Vec<WireItem>>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub num_guests: Option<u32>,
}

impl RecommendReply {
    /// Checklist items, falling back from `all_items` to `items` to nothing
    pub fn checklist(&self) -> Vec<Item> {
        self.all_items
            .as_ref()
            .or(self.items.as_ref())
            .map(|items| items.iter().map(WireItem::to_item).collect())
            .unwrap_or_default()
    }
}

/// Recommended item as it appears on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name_cn: Option<String>,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub checked: Option<bool>,
}

impl WireItem {
    /// Items are ticked unless the backend says `checked: false`
    pub fn to_item(&self) -> Item {
        Item {
            id: self.id.clone().unwrap_or_default(),
            name_cn: self.name_cn.clone().unwrap_or_default(),
            name_en: self.name_en.clone().filter(|en| !en.is_empty()),
            selected: self.checked != Some(false),
        }
    }
}

/// `POST /api/cart/update` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartUpdateRequest {
    pub session_id: String,
    pub cart: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartUpdateReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cart: Vec<String>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct IngredientsReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<Ingredient>,
}

/// The concierge service as seen by the widget
#[async_trait]
pub trait Backend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError>;

    async fn recommend(&self, request: &RecommendRequest) -> Result<RecommendReply, BackendError>;

    async fn update_cart(&self, request: &CartUpdateRequest)
        -> Result<CartUpdateReply, BackendError>;

    async fn ingredients(&self) -> Result<Vec<Ingredient>, BackendError>;
}
