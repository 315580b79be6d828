//! Static menu data: broth catalog and allergy tags
//!
//! The broth order here is significant. When the guest count drops below the
//! number of broths in the cart, quantities are removed from the end of this
//! list first.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Broth catalog, in menu order (20 soup bases)
pub const BROTH_LIST: [&str; 20] = [
    "姜葱浓汤底",
    "清新小肥羊汤底",
    "麻辣小肥羊汤底",
    "素食汤底",
    "川味香辣汤底",
    "牛油麻辣汤底",
    "野生菇菌汤底",
    "咖喱火锅汤底",
    "番茄火锅汤底",
    "啤酒鸭火锅汤底",
    "人参鸡汤底",
    "药膳乌鸡汤底",
    "香辣蟹火锅汤底",
    "香辣牛筋汤底",
    "香辣牛尾汤底",
    "养颜猪手汤底",
    "酸菜鱼火锅汤底",
    "海鲜冬阴功汤底",
    "鲍鱼火锅汤底",
    "海参什锦海鲜汤底",
];

/// Default broth catalog as owned names
pub fn default_broths() -> Vec<String> {
    BROTH_LIST.iter().map(|b| b.to_string()).collect()
}

/// Allergy tags understood by the backend
///
/// Declaration order is the display and wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Allergy {
    #[serde(rename = "花生")]
    Peanut,
    #[serde(rename = "海鲜")]
    Seafood,
    #[serde(rename = "面筋")]
    Gluten,
}

impl Allergy {
    pub const ALL: [Allergy; 3] = [Allergy::Peanut, Allergy::Seafood, Allergy::Gluten];

    /// Tag as sent to the backend
    pub fn tag(&self) -> &'static str {
        match self {
            Allergy::Peanut => "花生",
            Allergy::Seafood => "海鲜",
            Allergy::Gluten => "面筋",
        }
    }
}

impl fmt::Display for Allergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown allergy: {0}")]
pub struct UnknownAllergy(pub String);

impl FromStr for Allergy {
    type Err = UnknownAllergy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "花生" | "peanut" => Ok(Allergy::Peanut),
            "海鲜" | "seafood" => Ok(Allergy::Seafood),
            "面筋" | "gluten" => Ok(Allergy::Gluten),
            other => Err(UnknownAllergy(other.to_string())),
        }
    }
}

/// Allergies currently ticked by the guest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllergySelection {
    selected: BTreeSet<Allergy>,
}

impl AllergySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one allergy, returning whether it is now selected
    pub fn toggle(&mut self, allergy: Allergy) -> bool {
        if self.selected.remove(&allergy) {
            false
        } else {
            self.selected.insert(allergy);
            true
        }
    }

    pub fn contains(&self, allergy: Allergy) -> bool {
        self.selected.contains(&allergy)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Backend tags in enumeration order
    pub fn tags(&self) -> Vec<String> {
        self.selected.iter().map(|a| a.tag().to_string()).collect()
    }
}

/// An entry of the ingredient listing served by `GET /api/ingredients`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default)]
    pub name_cn: Option<String>,
    #[serde(default)]
    pub name_en: Option<String>,
}

impl Ingredient {
    /// "中文 / English", or just the Chinese name
    pub fn label(&self) -> String {
        let cn = self.name_cn.as_deref().unwrap_or_default();
        match self.name_en.as_deref().filter(|en| !en.is_empty()) {
            Some(en) => format!("{} / {}", cn, en),
            None => cn.to_string(),
        }
    }
}
