//! In-memory cart model
//!
//! Holds the broth cart (bounded by the guest count) and the history of
//! recommendation cards. Only the newest card is editable; every earlier card
//! is archived the moment a new one is installed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Guest count used before the guest selects one
pub const DEFAULT_GUESTS: u32 = 2;

/// Errors from cart transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Guest count must be at least 1, got {0}")]
    InvalidGuestCount(u32),

    #[error("Unknown broth: {0}")]
    UnknownBroth(String),

    #[error("No active recommendation")]
    NoActiveRecommendation,

    #[error("Item not found in active recommendation: {0}")]
    ItemNotFound(String),
}

/// Direction of a single broth stepper click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrothStep {
    Increment,
    Decrement,
}

/// One broth line as sent in the chat payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrothLine {
    pub name_cn: String,
    pub quantity: u32,
}

/// Broth quantities in catalog order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrothCart {
    entries: Vec<(String, u32)>,
    max_guests: u32,
}

impl BrothCart {
    pub fn new(catalog: &[String], max_guests: u32) -> Self {
        Self {
            entries: catalog.iter().map(|name| (name.clone(), 0)).collect(),
            max_guests: max_guests.max(1),
        }
    }

    pub fn max_guests(&self) -> u32 {
        self.max_guests
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn quantity(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(broth, _)| broth == name)
            .map(|(_, n)| *n)
    }

    /// All entries in catalog order, zeros included
    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    /// Non-zero entries in catalog order
    pub fn lines(&self) -> Vec<BrothLine> {
        self.entries
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(name, n)| BrothLine {
                name_cn: name.clone(),
                quantity: *n,
            })
            .collect()
    }

    /// Whether the stepper for `name` can go down / up
    pub fn can_step(&self, name: &str, step: BrothStep) -> bool {
        match (self.quantity(name), step) {
            (None, _) => false,
            (Some(n), BrothStep::Decrement) => n > 0,
            (Some(_), BrothStep::Increment) => self.total() < self.max_guests,
        }
    }

    fn set_max_guests(&mut self, max_guests: u32) {
        self.max_guests = max_guests;
        let mut overflow = self.total().saturating_sub(max_guests);

        // Trim from the end of the catalog backward
        for (_, n) in self.entries.iter_mut().rev() {
            if overflow == 0 {
                break;
            }
            let deduct = (*n).min(overflow);
            *n -= deduct;
            overflow -= deduct;
        }
    }

    fn step(&mut self, name: &str, step: BrothStep) -> Result<bool, CartError> {
        if !self.can_step(name, step) {
            return match self.quantity(name) {
                Some(_) => Ok(false),
                None => Err(CartError::UnknownBroth(name.to_string())),
            };
        }

        if let Some((_, n)) = self.entries.iter_mut().find(|(broth, _)| broth == name) {
            match step {
                BrothStep::Increment => *n += 1,
                BrothStep::Decrement => *n -= 1,
            }
        }
        Ok(true)
    }
}

/// A recommended menu item with its checkbox state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name_cn: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub selected: bool,
}

impl Item {
    /// Display label: Chinese name (or English when missing), with
    /// " / English" appended when both exist
    pub fn label(&self) -> String {
        let en = self.name_en.as_deref().filter(|en| !en.is_empty());
        match (self.name_cn.is_empty(), en) {
            (false, Some(en)) => format!("{} / {}", self.name_cn, en),
            (false, None) => self.name_cn.clone(),
            (true, Some(en)) => en.to_string(),
            (true, None) => String::new(),
        }
    }
}

/// One recommendation card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationSet {
    pub id: Uuid,
    /// Backend message shown as the card title
    pub message: String,
    /// Session the card belongs to; selection syncs are tagged with it
    pub session_id: Option<String>,
    pub items: Vec<Item>,
    archived: bool,
}

impl RecommendationSet {
    pub fn new(message: impl Into<String>, session_id: Option<String>, items: Vec<Item>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            session_id,
            items,
            archived: false,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|it| it.selected).count()
    }

    /// Ids of ticked items, skipping items without an id
    pub fn selected_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|it| it.selected && !it.id.is_empty())
            .map(|it| it.id.clone())
            .collect()
    }
}

/// Cart state owned by a conversation
#[derive(Debug, Clone)]
pub struct CartModel {
    broths: BrothCart,
    recommendations: Vec<RecommendationSet>,
}

impl CartModel {
    pub fn new(catalog: &[String], guests: u32) -> Self {
        Self {
            broths: BrothCart::new(catalog, guests),
            recommendations: Vec::new(),
        }
    }

    pub fn broths(&self) -> &BrothCart {
        &self.broths
    }

    pub fn guest_count(&self) -> u32 {
        self.broths.max_guests()
    }

    /// Set the guest count, trimming broths that no longer fit
    pub fn set_guest_count(&mut self, guests: u32) -> Result<&BrothCart, CartError> {
        if guests == 0 {
            return Err(CartError::InvalidGuestCount(guests));
        }
        self.broths.set_max_guests(guests);
        Ok(&self.broths)
    }

    /// Step one broth up or down. Returns `false` when the cart is already at
    /// its bound for that direction.
    pub fn adjust_broth(&mut self, name: &str, step: BrothStep) -> Result<bool, CartError> {
        self.broths.step(name, step)
    }

    pub fn total_broth_count(&self) -> u32 {
        self.broths.total()
    }

    /// Archive the current card and install `set` as the active one
    pub fn replace_active_recommendation(&mut self, mut set: RecommendationSet) -> &RecommendationSet {
        for previous in self.recommendations.iter_mut().filter(|s| !s.archived) {
            previous.archived = true;
        }
        set.archived = false;
        self.recommendations.push(set);
        &self.recommendations[self.recommendations.len() - 1]
    }

    /// Flip the checkbox of `item_id` on the active card, returning the new state
    pub fn toggle_item(&mut self, item_id: &str) -> Result<bool, CartError> {
        let active = self
            .recommendations
            .iter_mut()
            .rev()
            .find(|s| !s.archived)
            .ok_or(CartError::NoActiveRecommendation)?;

        let item = active
            .items
            .iter_mut()
            .find(|it| it.id == item_id)
            .ok_or_else(|| CartError::ItemNotFound(item_id.to_string()))?;

        item.selected = !item.selected;
        Ok(item.selected)
    }

    pub fn active_recommendation(&self) -> Option<&RecommendationSet> {
        self.recommendations.iter().rev().find(|s| !s.archived)
    }

    /// Every card ever produced, oldest first
    pub fn recommendations(&self) -> &[RecommendationSet] {
        &self.recommendations
    }

    pub fn recommendation(&self, id: Uuid) -> Option<&RecommendationSet> {
        self.recommendations.iter().find(|s| s.id == id)
    }

    /// Selected ids of the active card
    pub fn selected_item_ids(&self) -> Vec<String> {
        self.active_recommendation()
            .map(RecommendationSet::selected_ids)
            .unwrap_or_default()
    }

    pub fn broth_lines(&self) -> Vec<BrothLine> {
        self.broths.lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn item(id: &str, name: &str, selected: bool) -> Item {
        Item {
            id: id.to_string(),
            name_cn: name.to_string(),
            name_en: None,
            selected,
        }
    }

    #[test]
    fn test_adjust_broth_respects_guest_bound() {
        let mut cart = CartModel::new(&catalog(&["A", "B", "C"]), 3);
        let script = [
            ("A", BrothStep::Increment),
            ("B", BrothStep::Increment),
            ("A", BrothStep::Increment),
            ("C", BrothStep::Increment),
            ("C", BrothStep::Increment),
            ("B", BrothStep::Decrement),
            ("C", BrothStep::Increment),
            ("A", BrothStep::Increment),
            ("B", BrothStep::Decrement),
            ("B", BrothStep::Decrement),
        ];

        for (name, step) in script {
            cart.adjust_broth(name, step).unwrap();
            assert!(cart.total_broth_count() <= cart.guest_count());
        }
        assert_eq!(cart.total_broth_count(), 3);
    }

    #[derive(Debug, Clone)]
    enum CartOp {
        Adjust(usize, BrothStep),
        Guests(u32),
    }

    fn cart_op(broths: usize, max_guests: u32) -> impl Strategy<Value = CartOp> {
        prop_oneof![
            3 => (0..broths, prop_oneof![Just(BrothStep::Increment), Just(BrothStep::Decrement)])
                .prop_map(|(i, step)| CartOp::Adjust(i, step)),
            1 => (1..=max_guests).prop_map(CartOp::Guests),
        ]
    }

    proptest! {
        #[test]
        fn prop_broth_total_never_exceeds_guests(
            start in 1u32..=6,
            ops in prop::collection::vec(cart_op(crate::catalog::BROTH_LIST.len(), 6), 0..60),
        ) {
            let broths = crate::catalog::default_broths();
            let mut cart = CartModel::new(&broths, start);
            for op in ops {
                match op {
                    CartOp::Adjust(i, step) => {
                        cart.adjust_broth(&broths[i], step).unwrap();
                    }
                    CartOp::Guests(n) => {
                        cart.set_guest_count(n).unwrap();
                    }
                }
                prop_assert!(cart.total_broth_count() <= cart.guest_count());
            }
        }
    }

    #[test]
    fn test_adjust_broth_noops_at_bounds() {
        let mut cart = CartModel::new(&catalog(&["A", "B"]), 1);

        assert!(!cart.adjust_broth("A", BrothStep::Decrement).unwrap());
        assert!(cart.adjust_broth("A", BrothStep::Increment).unwrap());
        assert!(!cart.adjust_broth("B", BrothStep::Increment).unwrap());
        assert_eq!(cart.broths().quantity("A"), Some(1));
        assert_eq!(cart.broths().quantity("B"), Some(0));
    }

    #[test]
    fn test_adjust_unknown_broth() {
        let mut cart = CartModel::new(&catalog(&["A"]), 2);
        assert_eq!(
            cart.adjust_broth("Z", BrothStep::Increment),
            Err(CartError::UnknownBroth("Z".into()))
        );
    }

    #[test]
    fn test_lowering_guests_trims_from_catalog_tail() {
        let mut cart = CartModel::new(&catalog(&["A", "B", "C"]), 3);
        for name in ["A", "B", "C"] {
            cart.adjust_broth(name, BrothStep::Increment).unwrap();
        }

        let broths = cart.set_guest_count(1).unwrap();
        assert_eq!(broths.quantity("A"), Some(1));
        assert_eq!(broths.quantity("B"), Some(0));
        assert_eq!(broths.quantity("C"), Some(0));
    }

    #[test]
    fn test_lowering_guests_takes_partial_quantities() {
        let mut cart = CartModel::new(&catalog(&["A", "B", "C"]), 5);
        for _ in 0..2 {
            cart.adjust_broth("A", BrothStep::Increment).unwrap();
        }
        for _ in 0..3 {
            cart.adjust_broth("B", BrothStep::Increment).unwrap();
        }

        cart.set_guest_count(3).unwrap();
        assert_eq!(cart.broths().quantity("A"), Some(2));
        assert_eq!(cart.broths().quantity("B"), Some(1));

        // Raising the count again never restores anything
        cart.set_guest_count(6).unwrap();
        assert_eq!(cart.total_broth_count(), 3);
    }

    #[test]
    fn test_zero_guests_rejected() {
        let mut cart = CartModel::new(&catalog(&["A"]), 2);
        assert_eq!(cart.set_guest_count(0).err(), Some(CartError::InvalidGuestCount(0)));
        assert_eq!(cart.guest_count(), 2);
    }

    #[test]
    fn test_replace_archives_previous_card() {
        let mut cart = CartModel::new(&catalog(&["A"]), 2);
        cart.replace_active_recommendation(RecommendationSet::new(
            "first",
            Some("s1".into()),
            vec![item("a", "甲", true), item("b", "乙", true)],
        ));
        cart.replace_active_recommendation(RecommendationSet::new(
            "second",
            Some("s2".into()),
            vec![item("c", "丙", true), item("d", "丁", false)],
        ));

        let sets = cart.recommendations();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].is_archived());
        assert!(!sets[1].is_archived());
        assert_eq!(cart.selected_item_ids(), vec!["c"]);

        // Items of the archived card can no longer be toggled
        assert_eq!(cart.toggle_item("a"), Err(CartError::ItemNotFound("a".into())));
        assert_eq!(cart.recommendations()[0].selected_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_toggle_item() {
        let mut cart = CartModel::new(&catalog(&["A"]), 2);
        assert_eq!(cart.toggle_item("x"), Err(CartError::NoActiveRecommendation));

        cart.replace_active_recommendation(RecommendationSet::new(
            "card",
            None,
            vec![item("x1", "牛肉", false), item("x2", "羊肉", true), item("", "无编号", true)],
        ));

        assert!(cart.toggle_item("x1").unwrap());
        assert_eq!(cart.selected_item_ids(), vec!["x1", "x2"]);
        assert_eq!(cart.active_recommendation().unwrap().selected_count(), 3);
        assert!(!cart.toggle_item("x2").unwrap());
        assert_eq!(cart.selected_item_ids(), vec!["x1"]);
    }

    #[test]
    fn test_item_label() {
        let mut it = item("x", "牛肉", true);
        assert_eq!(it.label(), "牛肉");
        it.name_en = Some("Beef".into());
        assert_eq!(it.label(), "牛肉 / Beef");
        it.name_cn = String::new();
        assert_eq!(it.label(), "Beef");
    }

    #[test]
    fn test_broth_lines_skip_empty_entries() {
        let mut cart = CartModel::new(&catalog(&["A", "B", "C"]), 4);
        cart.adjust_broth("C", BrothStep::Increment).unwrap();
        cart.adjust_broth("A", BrothStep::Increment).unwrap();
        cart.adjust_broth("C", BrothStep::Increment).unwrap();

        assert_eq!(
            cart.broth_lines(),
            vec![
                BrothLine { name_cn: "A".into(), quantity: 1 },
                BrothLine { name_cn: "C".into(), quantity: 2 },
            ]
        );
    }
}
