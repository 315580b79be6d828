//! Order confirmation gate

use std::fmt;

use super::cart::CartModel;

/// A precondition for confirming the order that is not yet met
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmetPrecondition {
    RecommendationMissing,
    BrothMissing,
}

impl fmt::Display for UnmetPrecondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmetPrecondition::RecommendationMissing => f.write_str("点击「食材推荐」生成预选菜单"),
            UnmetPrecondition::BrothMissing => f.write_str("在「锅底选择」中至少选择一款锅底"),
        }
    }
}

/// Whether the order can be confirmed, and why not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationGate {
    pub can_confirm: bool,
    /// Always recommendation first, broth second
    pub unmet: Vec<UnmetPrecondition>,
}

impl ConfirmationGate {
    pub fn evaluate(cart: &CartModel) -> Self {
        let mut unmet = Vec::new();
        if cart.active_recommendation().is_none() {
            unmet.push(UnmetPrecondition::RecommendationMissing);
        }
        if cart.total_broth_count() == 0 {
            unmet.push(UnmetPrecondition::BrothMissing);
        }

        Self {
            can_confirm: unmet.is_empty(),
            unmet,
        }
    }

    /// Tooltip text for the confirm control, `None` when confirmable
    pub fn hint(&self) -> Option<String> {
        if self.unmet.is_empty() {
            return None;
        }
        let tips = self
            .unmet
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join("；");
        Some(format!("请先：{}", tips))
    }
}
