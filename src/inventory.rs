//! Finished-goods storage with per-type and total capacity limits.
//!
//! Additions that would break either limit are rejected whole — a failed
//! `add` leaves the stock untouched. `consume_batch` verifies every line
//! item before deducting anything, so partial consumption is never
//! observable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::error::GameError;
use crate::recipes::RecipeKind;

const BASE_PER_TYPE: u32 = 50;
const BASE_TOTAL: u32 = 200;
const UPGRADE_BASE_COST: f64 = 1_000.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CookieInventory {
    stock: BTreeMap<RecipeKind, u32>,
    pub storage_level: u32,
}

impl CookieInventory {
    pub fn new() -> Self {
        Self {
            stock: BTreeMap::new(),
            storage_level: 1,
        }
    }

    pub fn amount(&self, kind: RecipeKind) -> u32 {
        self.stock.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_stock(&self) -> u32 {
        self.stock.values().sum()
    }

    pub fn max_total(&self) -> u32 {
        BASE_TOTAL * self.storage_level
    }

    pub fn max_per_type(&self) -> u32 {
        BASE_PER_TYPE * self.storage_level
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecipeKind, u32)> + '_ {
        self.stock.iter().map(|(k, v)| (*k, *v))
    }

    /// Store cookies. Rejected in full if either capacity would be broken.
    pub fn add(&mut self, kind: RecipeKind, amount: u32) -> bool {
        if self.total_stock() + amount > self.max_total() {
            return false;
        }
        if self.amount(kind) + amount > self.max_per_type() {
            return false;
        }
        *self.stock.entry(kind).or_insert(0) += amount;
        true
    }

    /// Take cookies out. Rejected if the stock does not cover `amount`.
    pub fn remove(&mut self, kind: RecipeKind, amount: u32) -> bool {
        let have = self.amount(kind);
        if have < amount {
            return false;
        }
        if have == amount {
            self.stock.remove(&kind);
        } else {
            self.stock.insert(kind, have - amount);
        }
        true
    }

    /// Whether every line item is satisfiable.
    pub fn check_stock(&self, items: &[(RecipeKind, u32)]) -> bool {
        items.iter().all(|(kind, amount)| self.amount(*kind) >= *amount)
    }

    /// All-or-nothing deduction of a multi-item batch.
    pub fn consume_batch(&mut self, items: &[(RecipeKind, u32)]) -> bool {
        if !self.check_stock(items) {
            return false;
        }
        for (kind, amount) in items {
            self.remove(*kind, *amount);
        }
        true
    }

    pub fn upgrade_cost(&self) -> f64 {
        UPGRADE_BASE_COST * 3.0_f64.powi(self.storage_level as i32 - 1)
    }

    /// Buy the next storage level; both capacity ceilings scale linearly.
    pub fn upgrade_storage(&mut self, eco: &mut EconomyState) -> Result<u32, GameError> {
        eco.spend(self.upgrade_cost())?;
        self.storage_level += 1;
        Ok(self.storage_level)
    }
}

impl Default for CookieInventory {
    fn default() -> Self {
        Self::new()
    }
}
