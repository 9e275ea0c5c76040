//! Raw ingredient stock: purchase, explicit unlocks, teaser hints.

use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::error::GameError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IngredientKind {
    Flour,
    Sugar,
    Butter,
    Chocolate,
    Almond,
    Coconut,
    Matcha,
    Strawberry,
}

impl IngredientKind {
    pub fn all() -> &'static [IngredientKind] {
        &[
            IngredientKind::Flour,
            IngredientKind::Sugar,
            IngredientKind::Butter,
            IngredientKind::Chocolate,
            IngredientKind::Almond,
            IngredientKind::Coconut,
            IngredientKind::Matcha,
            IngredientKind::Strawberry,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            IngredientKind::Flour => 0,
            IngredientKind::Sugar => 1,
            IngredientKind::Butter => 2,
            IngredientKind::Chocolate => 3,
            IngredientKind::Almond => 4,
            IngredientKind::Coconut => 5,
            IngredientKind::Matcha => 6,
            IngredientKind::Strawberry => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IngredientKind::Flour => "小麦粉",
            IngredientKind::Sugar => "砂糖",
            IngredientKind::Butter => "バター",
            IngredientKind::Chocolate => "チョコレート",
            IngredientKind::Almond => "アーモンド",
            IngredientKind::Coconut => "ココナッツ",
            IngredientKind::Matcha => "抹茶",
            IngredientKind::Strawberry => "イチゴ",
        }
    }

    /// Cost per unit when buying directly.
    pub fn base_price(&self) -> f64 {
        match self {
            IngredientKind::Flour => 10.0,
            IngredientKind::Sugar => 15.0,
            IngredientKind::Butter => 25.0,
            IngredientKind::Chocolate => 30.0,
            IngredientKind::Almond => 40.0,
            IngredientKind::Coconut => 50.0,
            IngredientKind::Matcha => 60.0,
            IngredientKind::Strawberry => 70.0,
        }
    }

    /// One-time unlock price; `None` means available from the start.
    pub fn unlock_price(&self) -> Option<f64> {
        match self {
            IngredientKind::Flour
            | IngredientKind::Sugar
            | IngredientKind::Butter
            | IngredientKind::Chocolate => None,
            IngredientKind::Almond => Some(500.0),
            IngredientKind::Coconut => Some(1_000.0),
            IngredientKind::Matcha => Some(2_000.0),
            IngredientKind::Strawberry => Some(3_000.0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ingredient {
    pub kind: IngredientKind,
    pub amount: u32,
    pub unlocked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngredientStock {
    pub items: Vec<Ingredient>,
}

impl IngredientStock {
    pub fn new() -> Self {
        Self {
            items: IngredientKind::all()
                .iter()
                .map(|k| Ingredient {
                    kind: *k,
                    amount: 0,
                    unlocked: k.unlock_price().is_none(),
                })
                .collect(),
        }
    }

    pub fn get(&self, kind: IngredientKind) -> &Ingredient {
        &self.items[kind.index()]
    }

    pub fn get_mut(&mut self, kind: IngredientKind) -> &mut Ingredient {
        &mut self.items[kind.index()]
    }

    pub fn amount(&self, kind: IngredientKind) -> u32 {
        self.get(kind).amount
    }

    pub fn add(&mut self, kind: IngredientKind, amount: u32) {
        self.get_mut(kind).amount += amount;
    }

    pub fn unlocked_kinds(&self) -> Vec<IngredientKind> {
        self.items
            .iter()
            .filter(|i| i.unlocked)
            .map(|i| i.kind)
            .collect()
    }

    /// Buy `amount` units at the base price.
    pub fn buy(
        &mut self,
        eco: &mut EconomyState,
        kind: IngredientKind,
        amount: u32,
    ) -> Result<f64, GameError> {
        if !self.get(kind).unlocked {
            return Err(GameError::LockedContent);
        }
        let cost = kind.base_price() * amount as f64;
        eco.spend(cost)?;
        self.get_mut(kind).amount += amount;
        Ok(cost)
    }

    /// Pay the one-time unlock price to reveal a locked ingredient.
    pub fn unlock(
        &mut self,
        eco: &mut EconomyState,
        kind: IngredientKind,
    ) -> Result<(), GameError> {
        if self.get(kind).unlocked {
            return Err(GameError::AlreadyInProgress);
        }
        let price = kind.unlock_price().ok_or(GameError::NotFound)?;
        eco.spend(price)?;
        self.get_mut(kind).unlocked = true;
        Ok(())
    }

    /// Teaser for a locked ingredient once the balance reaches half its
    /// unlock price. Derived, never persisted.
    pub fn hint_visible(&self, eco: &EconomyState, kind: IngredientKind) -> bool {
        if self.get(kind).unlocked {
            return false;
        }
        match kind.unlock_price() {
            Some(price) => eco.cookies >= price * 0.5,
            None => false,
        }
    }
}

impl Default for IngredientStock {
    fn default() -> Self {
        Self::new()
    }
}
