//! Production units: purchase, milestones, synergy, rate recompute.
//!
//! The recompute is a full pass in a fixed order — reset to base, apply the
//! unit's own milestone factor, then add incoming synergy computed on the
//! raw base rate. Running it twice with no purchases in between yields
//! identical rates (synergy is all-to-all, so nothing incremental).

use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::error::GameError;
use crate::upgrades::Upgrades;

/// Owned-count thresholds shared by every unit, with the output bonus each
/// grants. Strictly increasing in both fields.
pub const MILESTONES: [(u32, f64); 6] = [
    (10, 1.5),
    (25, 2.0),
    (50, 2.5),
    (100, 3.0),
    (200, 5.0),
    (500, 10.0),
];

/// Kinds of production units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    Cursor,
    Grandma,
    Factory,
}

impl UnitKind {
    pub fn all() -> &'static [UnitKind] {
        &[UnitKind::Cursor, UnitKind::Grandma, UnitKind::Factory]
    }

    pub fn index(&self) -> usize {
        match self {
            UnitKind::Cursor => 0,
            UnitKind::Grandma => 1,
            UnitKind::Factory => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnitKind::Cursor => "クリックヘルパー",
            UnitKind::Grandma => "おばあちゃん",
            UnitKind::Factory => "工場",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UnitKind::Cursor => "自動でクッキーをクリックする小さな手です",
            UnitKind::Grandma => "おいしいクッキーを焼きます",
            UnitKind::Factory => "大量のクッキーを生産します",
        }
    }

    pub fn base_cost(&self) -> f64 {
        match self {
            UnitKind::Cursor => 10.0,
            UnitKind::Grandma => 100.0,
            UnitKind::Factory => 1_000.0,
        }
    }

    pub fn base_rate(&self) -> f64 {
        match self {
            UnitKind::Cursor => 0.1,
            UnitKind::Grandma => 1.0,
            UnitKind::Factory => 10.0,
        }
    }

    /// Outgoing synergy: each owned unit of this kind adds
    /// `bonus × targetBaseRate` to every unit of the target kind.
    pub fn synergy(&self) -> &'static [(UnitKind, f64)] {
        match self {
            UnitKind::Cursor => &[(UnitKind::Cursor, 0.1)],
            UnitKind::Grandma => &[(UnitKind::Cursor, 0.2), (UnitKind::Grandma, 0.1)],
            UnitKind::Factory => &[
                (UnitKind::Cursor, 0.5),
                (UnitKind::Grandma, 2.0),
                (UnitKind::Factory, 1.0),
            ],
        }
    }
}

/// クリック報酬に効くのはカーソルの自己シナジーだけ (原作仕様)。
const CURSOR_CLICK_SYNERGY: f64 = 0.1;

/// A single purchasable unit type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub kind: UnitKind,
    pub count: u32,
    /// Milestone thresholds crossed so far (0 = none).
    pub milestone_level: usize,
    /// Effective output per owned unit. Derived; set by `recompute_rates`.
    pub effective_rate: f64,
}

impl Unit {
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            count: 0,
            milestone_level: 0,
            effective_rate: kind.base_rate(),
        }
    }

    /// Geometric cost curve: `ceil(base × 1.15^count)`. Strictly increasing.
    pub fn cost(&self) -> f64 {
        (self.kind.base_cost() * 1.15_f64.powi(self.count as i32)).ceil()
    }
}

/// Result of a successful unit purchase.
#[derive(Clone, Debug)]
pub struct UnitPurchase {
    pub kind: UnitKind,
    pub count: u32,
    pub cost: f64,
    /// Milestones crossed by this purchase, as `(threshold, bonus)`.
    pub milestones: Vec<(u32, f64)>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductionEngine {
    pub units: Vec<Unit>,
}

impl ProductionEngine {
    pub fn new() -> Self {
        Self {
            units: UnitKind::all().iter().map(|k| Unit::new(*k)).collect(),
        }
    }

    pub fn unit(&self, kind: UnitKind) -> &Unit {
        &self.units[kind.index()]
    }

    pub fn unit_mut(&mut self, kind: UnitKind) -> &mut Unit {
        &mut self.units[kind.index()]
    }

    /// Buy one unit. Deducts the geometric cost, detects milestone
    /// crossings and recomputes every rate.
    pub fn buy_unit(
        &mut self,
        eco: &mut EconomyState,
        upgrades: &Upgrades,
        kind: UnitKind,
    ) -> Result<UnitPurchase, GameError> {
        let cost = self.unit(kind).cost();
        eco.spend(cost)?;

        let unit = self.unit_mut(kind);
        let prev_count = unit.count;
        unit.count += 1;

        // Each threshold fires exactly once: counts only grow, so a
        // threshold is crossed on the single purchase that reaches it.
        let mut crossed = Vec::new();
        for (i, (threshold, bonus)) in MILESTONES.iter().enumerate() {
            if prev_count < *threshold && unit.count >= *threshold {
                unit.milestone_level = i + 1;
                crossed.push((*threshold, *bonus));
            }
        }

        let count = unit.count;
        self.recompute_rates(eco, upgrades);

        Ok(UnitPurchase {
            kind,
            count,
            cost,
            milestones: crossed,
        })
    }

    /// Full, idempotent recompute of every unit's effective rate, the
    /// aggregate production rate and the per-click yield.
    pub fn recompute_rates(&mut self, eco: &mut EconomyState, upgrades: &Upgrades) {
        // Reset to base, with purchased upgrade multipliers.
        for unit in &mut self.units {
            unit.effective_rate = unit.kind.base_rate() * upgrades.unit_multiplier(unit.kind);
        }

        // Own milestone factor.
        for unit in &mut self.units {
            if unit.milestone_level > 0 {
                unit.effective_rate *= MILESTONES[unit.milestone_level - 1].1;
            }
        }

        // Incoming synergy, computed on the raw base rate.
        let counts: Vec<u32> = self.units.iter().map(|u| u.count).collect();
        for source in UnitKind::all() {
            let source_count = counts[source.index()];
            if source_count == 0 {
                continue;
            }
            for (target, bonus) in source.synergy() {
                self.units[target.index()].effective_rate +=
                    target.base_rate() * bonus * source_count as f64;
            }
        }

        eco.total_production_rate = self
            .units
            .iter()
            .map(|u| u.effective_rate * u.count as f64)
            .sum::<f64>()
            * upgrades.cps_multiplier()
            * eco.cps_multiplier
            * eco.global_multiplier;

        let cursor_count = counts[UnitKind::Cursor.index()] as f64;
        eco.per_click_yield = (1.0
            + upgrades.click_power_bonus()
            + CURSOR_CLICK_SYNERGY * cursor_count)
            * eco.click_multiplier;
    }
}

impl Default for ProductionEngine {
    fn default() -> Self {
        Self::new()
    }
}
