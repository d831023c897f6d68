//! Packaging-type classification from free-text product names.
//!
//! Categories overlap (a name carrying `分享装袋装` also carries `袋装`), so
//! classification is an ordered list of (token, category) rules evaluated
//! first-match-wins, followed by the weight-marker fallback. The rule table
//! was derived from observed product names and can be replaced per deployment
//! via [`PackagingClassifier::with_rules`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kilogram marker with a numeric weight, e.g. `2KG`, `1.5KG`.
static KG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)KG").expect("Invalid regex: kg marker"));

/// Gram marker with an integer weight, e.g. `45G`, `250G`.
static GRAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)G").expect("Invalid regex: gram marker"));

/// Coarse packaging category of a product, derived from its full name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackagingCategory {
    /// 分享装袋装 - share pack in a bag.
    ShareBag,
    /// 分享装盒装 - share pack in a box.
    ShareBox,
    /// 随手包 - grab-and-go hand pack.
    HandPack,
    /// 迷你包 - mini pack.
    MiniPack,
    /// 分享装 - generic share pack.
    SharePack,
    /// 袋装 - bag.
    Bag,
    /// 盒装 - box.
    Box,
    /// 大包装 - large pack (1.5kg / 2kg, or >100g).
    LargePack,
    /// 散装 - bulk (other kilogram weights).
    Bulk,
    /// 小包装 - small pack (≤50g).
    SmallPack,
    /// 中包装 - medium pack (≤100g).
    MediumPack,
    /// 其他 - no rule matched.
    Other,
}

impl PackagingCategory {
    /// Display label, matching the labels used in the source data's locale.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShareBag => "分享装袋装",
            Self::ShareBox => "分享装盒装",
            Self::HandPack => "随手包",
            Self::MiniPack => "迷你包",
            Self::SharePack => "分享装",
            Self::Bag => "袋装",
            Self::Box => "盒装",
            Self::LargePack => "大包装",
            Self::Bulk => "散装",
            Self::SmallPack => "小包装",
            Self::MediumPack => "中包装",
            Self::Other => "其他",
        }
    }
}

impl fmt::Display for PackagingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered token-rule classifier for packaging categories.
#[derive(Debug, Clone)]
pub struct PackagingClassifier {
    /// (substring token, category) pairs, most specific first.
    token_rules: Vec<(String, PackagingCategory)>,
}

impl Default for PackagingClassifier {
    fn default() -> Self {
        Self {
            token_rules: [
                ("分享装袋装", PackagingCategory::ShareBag),
                ("分享装盒装", PackagingCategory::ShareBox),
                ("随手包", PackagingCategory::HandPack),
                ("迷你包", PackagingCategory::MiniPack),
                ("分享装", PackagingCategory::SharePack),
                ("袋装", PackagingCategory::Bag),
                ("盒装", PackagingCategory::Box),
            ]
            .into_iter()
            .map(|(token, category)| (token.to_string(), category))
            .collect(),
        }
    }
}

impl PackagingClassifier {
    /// Build a classifier with a custom ordered rule table.
    pub fn with_rules(token_rules: Vec<(String, PackagingCategory)>) -> Self {
        Self { token_rules }
    }

    /// Classify a product name into exactly one category.
    ///
    /// Total function: a null name, or a name matching no rule, yields
    /// [`PackagingCategory::Other`].
    pub fn classify(&self, full_name: Option<&str>) -> PackagingCategory {
        let Some(name) = full_name else {
            return PackagingCategory::Other;
        };

        for (token, category) in &self.token_rules {
            if name.contains(token.as_str()) {
                return *category;
            }
        }

        // Weight markers are checked after the token rules so that e.g.
        // `2KG迷你包` stays a MiniPack. KG before G: every kg marker also
        // contains a bare G.
        let upper = name.to_uppercase();
        if let Some(caps) = KG_RE.captures(&upper) {
            let kilos: f64 = caps[1].parse().unwrap_or(0.0);
            return if kilos == 1.5 || kilos == 2.0 {
                PackagingCategory::LargePack
            } else {
                PackagingCategory::Bulk
            };
        }
        if let Some(caps) = GRAM_RE.captures(&upper) {
            if let Ok(grams) = caps[1].parse::<u32>() {
                return if grams <= 50 {
                    PackagingCategory::SmallPack
                } else if grams <= 100 {
                    PackagingCategory::MediumPack
                } else {
                    PackagingCategory::LargePack
                };
            }
        }

        PackagingCategory::Other
    }
}

/// Classify with the default rule table.
pub fn classify_packaging(full_name: Option<&str>) -> PackagingCategory {
    static DEFAULT: Lazy<PackagingClassifier> = Lazy::new(PackagingClassifier::default);
    DEFAULT.classify(full_name)
}
