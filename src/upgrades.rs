//! Purchasable one-shot upgrades.
//!
//! Effects are data, not closures: the rate recompute derives everything
//! from the purchased flags, so applying a save is just restoring flags.

use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::error::GameError;
use crate::units::{ProductionEngine, UnitKind};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum UpgradeEffect {
    /// Adds a flat amount to the base click yield.
    ClickPower(f64),
    /// Multiplies one unit kind's base output.
    UnitMultiplier { target: UnitKind, multiplier: f64 },
    /// Multiplies the aggregate production rate.
    CpsMultiplier(f64),
    /// Multiplies cooking yield (`baking_multiplier`).
    BakingBoost(f64),
}

/// Visibility requirement for an upgrade. All present conditions must hold.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpgradeRequirement {
    /// Cumulative cookies ever produced.
    pub cookies_all_time: f64,
    pub unit_count: Option<(UnitKind, u32)>,
    pub cps_at_least: f64,
    /// Id of an upgrade that must already be purchased.
    pub requires: Option<&'static str>,
}

#[derive(Clone, Debug)]
pub struct Upgrade {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: f64,
    pub effect: UpgradeEffect,
    pub requirement: UpgradeRequirement,
    pub purchased: bool,
}

#[derive(Clone, Debug)]
pub struct Upgrades {
    pub list: Vec<Upgrade>,
}

impl Upgrades {
    pub fn new() -> Self {
        let def = |id, name, description, cost, effect, requirement| Upgrade {
            id,
            name,
            description,
            cost,
            effect,
            requirement,
            purchased: false,
        };
        Self {
            list: vec![
                def(
                    "click_boost_1",
                    "クリック強化 I",
                    "クリックあたりのクッキーが +1 されます",
                    100.0,
                    UpgradeEffect::ClickPower(1.0),
                    UpgradeRequirement {
                        cookies_all_time: 50.0,
                        ..Default::default()
                    },
                ),
                def(
                    "click_boost_2",
                    "クリック強化 II",
                    "クリックあたりのクッキーがさらに +3 されます",
                    500.0,
                    UpgradeEffect::ClickPower(3.0),
                    UpgradeRequirement {
                        cookies_all_time: 200.0,
                        requires: Some("click_boost_1"),
                        ..Default::default()
                    },
                ),
                def(
                    "cursor_efficiency",
                    "クリックヘルパー効率化",
                    "クリックヘルパーの生産量が2倍になります",
                    200.0,
                    UpgradeEffect::UnitMultiplier {
                        target: UnitKind::Cursor,
                        multiplier: 2.0,
                    },
                    UpgradeRequirement {
                        unit_count: Some((UnitKind::Cursor, 10)),
                        ..Default::default()
                    },
                ),
                def(
                    "grandma_recipe",
                    "おばあちゃんの秘伝レシピ",
                    "おばあちゃんの生産量が2倍になります",
                    1_000.0,
                    UpgradeEffect::UnitMultiplier {
                        target: UnitKind::Grandma,
                        multiplier: 2.0,
                    },
                    UpgradeRequirement {
                        unit_count: Some((UnitKind::Grandma, 5)),
                        ..Default::default()
                    },
                ),
                def(
                    "global_boost",
                    "グローバル生産効率化",
                    "全ユニットの生産量が1.5倍になります",
                    5_000.0,
                    UpgradeEffect::CpsMultiplier(1.5),
                    UpgradeRequirement {
                        cps_at_least: 50.0,
                        ..Default::default()
                    },
                ),
                def(
                    "better_oven",
                    "高性能オーブン",
                    "調理1回あたりのクッキー生産量が1.5倍になります",
                    1_500.0,
                    UpgradeEffect::BakingBoost(1.5),
                    UpgradeRequirement {
                        cookies_all_time: 300.0,
                        ..Default::default()
                    },
                ),
            ],
        }
    }

    pub fn find(&self, id: &str) -> Option<&Upgrade> {
        self.list.iter().find(|u| u.id == id)
    }

    fn is_purchased(&self, id: &str) -> bool {
        self.find(id).map(|u| u.purchased).unwrap_or(false)
    }

    /// Whether an upgrade's requirement is currently met.
    pub fn is_unlocked(
        &self,
        upgrade: &Upgrade,
        eco: &EconomyState,
        production: &ProductionEngine,
    ) -> bool {
        let req = &upgrade.requirement;
        if eco.cookies_all_time < req.cookies_all_time {
            return false;
        }
        if let Some((kind, count)) = req.unit_count {
            if production.unit(kind).count < count {
                return false;
            }
        }
        if eco.total_production_rate < req.cps_at_least {
            return false;
        }
        if let Some(dep) = req.requires {
            if !self.is_purchased(dep) {
                return false;
            }
        }
        true
    }

    /// Upgrades currently offered to the player (unlocked, not purchased).
    pub fn visible(&self, eco: &EconomyState, production: &ProductionEngine) -> Vec<&Upgrade> {
        self.list
            .iter()
            .filter(|u| !u.purchased && self.is_unlocked(u, eco, production))
            .collect()
    }

    /// Purchase by id. The caller must recompute rates afterwards.
    pub fn buy(
        &mut self,
        eco: &mut EconomyState,
        production: &ProductionEngine,
        id: &str,
    ) -> Result<UpgradeEffect, GameError> {
        let idx = self
            .list
            .iter()
            .position(|u| u.id == id)
            .ok_or(GameError::NotFound)?;
        if self.list[idx].purchased {
            return Err(GameError::AlreadyInProgress);
        }
        if !self.is_unlocked(&self.list[idx], eco, production) {
            return Err(GameError::LockedContent);
        }
        eco.spend(self.list[idx].cost)?;
        self.list[idx].purchased = true;
        Ok(self.list[idx].effect)
    }

    // ── Derived multipliers, read by the recompute ──────────────

    pub fn unit_multiplier(&self, kind: UnitKind) -> f64 {
        self.list
            .iter()
            .filter(|u| u.purchased)
            .filter_map(|u| match u.effect {
                UpgradeEffect::UnitMultiplier { target, multiplier } if target == kind => {
                    Some(multiplier)
                }
                _ => None,
            })
            .product()
    }

    pub fn click_power_bonus(&self) -> f64 {
        self.list
            .iter()
            .filter(|u| u.purchased)
            .filter_map(|u| match u.effect {
                UpgradeEffect::ClickPower(amount) => Some(amount),
                _ => None,
            })
            .sum()
    }

    pub fn cps_multiplier(&self) -> f64 {
        self.list
            .iter()
            .filter(|u| u.purchased)
            .filter_map(|u| match u.effect {
                UpgradeEffect::CpsMultiplier(m) => Some(m),
                _ => None,
            })
            .product()
    }

    pub fn baking_multiplier(&self) -> f64 {
        self.list
            .iter()
            .filter(|u| u.purchased)
            .filter_map(|u| match u.effect {
                UpgradeEffect::BakingBoost(m) => Some(m),
                _ => None,
            })
            .product()
    }
}

impl Default for Upgrades {
    fn default() -> Self {
        Self::new()
    }
}
