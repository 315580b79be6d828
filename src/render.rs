//! Text projection of the conversation state
//!
//! Nothing here reads anything but a [`ConversationState`] snapshot, so a
//! front-end can redraw from scratch on every revision.

use crate::conversation::{EntryKind, Role, TranscriptEntry};
use crate::core::{ConversationState, RecommendationSet};

/// Render one transcript entry
pub fn entry(state: &ConversationState, entry: &TranscriptEntry) -> String {
    match &entry.kind {
        EntryKind::Message {
            role,
            source,
            content,
        } => match role {
            Role::User => format!("你: {}", content),
            Role::System => format!("[系统] {}", content),
            Role::Assistant => match source.as_ref().and_then(|s| s.tag()) {
                Some(tag) => format!("顾问 [{}]\n{}", tag, content),
                None => format!("顾问\n{}", content),
            },
        },
        EntryKind::OrderCard { order } => {
            let body = serde_json::to_string_pretty(order).unwrap_or_else(|_| order.to_string());
            format!("📋 结构化订单\n{}", body)
        }
        EntryKind::RecommendCard { card_id } => match state.cart.recommendation(*card_id) {
            Some(card) => recommend_card(card),
            None => String::from("(推荐卡片不可用)"),
        },
    }
}

/// Checklist with the selected counter; archived cards are marked read-only
pub fn recommend_card(card: &RecommendationSet) -> String {
    let mut out = String::new();
    out.push_str(&card.message);
    if card.is_archived() {
        out.push_str(" (已归档)");
    }
    out.push('\n');
    out.push_str(&format!("已选 {} 样\n", card.selected_count()));
    for item in &card.items {
        let mark = if item.selected { "[x]" } else { "[ ]" };
        out.push_str(&format!("  {} {} {}\n", mark, item.id, item.label()));
    }
    out
}

/// Broth stepper summary, e.g. "已选 1/2 项"
pub fn broth_summary(state: &ConversationState) -> String {
    let broths = state.cart.broths();
    let mut out = format!("锅底 已选 {}/{} 项", broths.total(), broths.max_guests());
    for line in broths.lines() {
        out.push_str(&format!("\n  {} × {}", line.name_cn, line.quantity));
    }
    out
}

pub fn allergy_summary(state: &ConversationState) -> String {
    let tags = state.allergies.tags();
    if tags.is_empty() {
        format!("过敏 已选 {} 项", tags.len())
    } else {
        format!("过敏 已选 {} 项: {}", tags.len(), tags.join("、"))
    }
}

/// Confirm control state with its hint
pub fn confirm_status(state: &ConversationState) -> String {
    match state.gate().hint() {
        None => "确认下单: 可用".to_string(),
        Some(hint) => format!("确认下单: 不可用 ({})", hint),
    }
}

/// Full status panel
pub fn status(state: &ConversationState) -> String {
    let session = state.session_id.as_deref().unwrap_or("-");
    let mut out = format!("会话: {}\n人数: {}\n", session, state.cart.guest_count());
    out.push_str(&allergy_summary(state));
    out.push('\n');
    out.push_str(&broth_summary(state));
    out.push('\n');
    out.push_str(&confirm_status(state));
    if state.transcript.is_typing() {
        out.push_str("\n…");
    }
    out
}
