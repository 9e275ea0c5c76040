//! Shared economy ledger: cookies, rates, multipliers, timed effects.
//!
//! Every other component mutates the economy exclusively through a
//! `&mut EconomyState` handle passed into its methods — there are no
//! ambient globals. Spend operations reject (never clamp), so the cookie
//! balance can never go negative.

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::{Tick, TICKS_PER_SEC};

/// What a timed multiplier applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Per-click yield only.
    Click,
    /// Passive production only.
    Production,
    /// Passive production only (historically a separate multiplier slot).
    Cps,
    /// Both clicks and passive production.
    All,
}

/// A temporary multiplier with an absolute expiry tick.
///
/// 期限はタイマーコールバックではなく tick 毎の期限チェックで処理する。
/// セーブにそのまま載るので、リロードしても効果は生き残る。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    pub multiplier: f64,
    pub expires_at: Tick,
    /// Display name of whatever granted the effect (recipe name etc.).
    pub label: String,
}

/// The shared mutable ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EconomyState {
    /// Spendable cookie balance. Never negative.
    pub cookies: f64,
    /// Cumulative cookies ever earned. Monotone; drives unlock thresholds.
    pub cookies_all_time: f64,
    pub cookies_from_clicks: f64,
    pub cookies_from_units: f64,
    pub total_clicks: u64,
    /// Recomputed base click yield (upgrades + cursor synergy + permanent
    /// click multiplier). Timed effects and the global multiplier are
    /// applied at click time.
    pub per_click_yield: f64,
    /// Recomputed passive rate including all permanent multipliers.
    pub total_production_rate: f64,
    /// Permanent click multiplier (market items).
    pub click_multiplier: f64,
    /// Permanent production multiplier (market items).
    pub cps_multiplier: f64,
    /// Applies to everything, clicks included.
    pub global_multiplier: f64,
    pub active_effects: Vec<ActiveEffect>,
}

impl EconomyState {
    pub fn new() -> Self {
        Self {
            cookies: 0.0,
            cookies_all_time: 0.0,
            cookies_from_clicks: 0.0,
            cookies_from_units: 0.0,
            total_clicks: 0,
            per_click_yield: 1.0,
            total_production_rate: 0.0,
            click_multiplier: 1.0,
            cps_multiplier: 1.0,
            global_multiplier: 1.0,
            active_effects: Vec::new(),
        }
    }

    /// Credit earned cookies (production, order rewards, bonuses).
    pub fn earn(&mut self, amount: f64) {
        self.cookies += amount;
        self.cookies_all_time += amount;
    }

    /// Deduct `cost`, rejecting if the balance does not cover it.
    pub fn spend(&mut self, cost: f64) -> Result<(), GameError> {
        if self.cookies < cost {
            return Err(GameError::InsufficientFunds);
        }
        self.cookies -= cost;
        Ok(())
    }

    /// Combined timed multiplier on passive production.
    pub fn production_effect_factor(&self) -> f64 {
        self.active_effects
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    EffectKind::Production | EffectKind::Cps | EffectKind::All
                )
            })
            .map(|e| e.multiplier)
            .product()
    }

    /// Combined timed multiplier on clicks.
    pub fn click_effect_factor(&self) -> f64 {
        self.active_effects
            .iter()
            .filter(|e| matches!(e.kind, EffectKind::Click | EffectKind::All))
            .map(|e| e.multiplier)
            .product()
    }

    /// Register a timed effect lasting `duration_secs` from `now`.
    pub fn add_effect(
        &mut self,
        kind: EffectKind,
        multiplier: f64,
        duration_secs: u64,
        label: &str,
        now: Tick,
    ) {
        self.active_effects.push(ActiveEffect {
            kind,
            multiplier,
            expires_at: now + duration_secs * TICKS_PER_SEC,
            label: label.to_string(),
        });
    }

    /// Drop effects whose deadline has passed, returning them for logging.
    pub fn expire_effects(&mut self, now: Tick) -> Vec<ActiveEffect> {
        let mut expired = Vec::new();
        self.active_effects.retain(|e| {
            if e.expires_at <= now {
                expired.push(e.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Accrue passive production for `delta_ticks`. Returns the amount.
    pub fn accrue(&mut self, delta_ticks: u32) -> f64 {
        let seconds = delta_ticks as f64 / TICKS_PER_SEC as f64;
        let produced = self.total_production_rate * self.production_effect_factor() * seconds;
        if produced > 0.0 {
            self.cookies += produced;
            self.cookies_all_time += produced;
            self.cookies_from_units += produced;
        }
        produced
    }

    /// Manual click. Returns the cookies earned.
    pub fn click(&mut self) -> f64 {
        let value = self.per_click_yield * self.global_multiplier * self.click_effect_factor();
        self.cookies += value;
        self.cookies_all_time += value;
        self.cookies_from_clicks += value;
        self.total_clicks += 1;
        value
    }
}

impl Default for EconomyState {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact display formatting: 1.2K / 3.4M / 5.6B.
pub fn format_number(num: f64) -> String {
    if num < 1_000.0 {
        format!("{}", num.floor() as i64)
    } else if num < 1_000_000.0 {
        format!("{:.1}K", num / 1_000.0)
    } else if num < 1_000_000_000.0 {
        format!("{:.1}M", num / 1_000_000.0)
    } else {
        format!("{:.1}B", num / 1_000_000_000.0)
    }
}
