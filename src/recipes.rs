//! Recipe catalog and the single-slot cooking state machine.
//!
//! `Idle → Cooking → Idle`. Ingredients are reserved atomically when the
//! cook starts, not at completion. Completion is tick-driven: the slot
//! stores an absolute end tick and the master tick compares against it.

use serde::{Deserialize, Serialize};

use crate::economy::EffectKind;
use crate::error::GameError;
use crate::ingredients::{IngredientKind, IngredientStock};
use crate::inventory::CookieInventory;
use crate::upgrades::Upgrades;
use crate::Tick;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RecipeKind {
    Plain,
    ChocolateChip,
    Almond,
    Coconut,
    Matcha,
    Strawberry,
    DoubleChocolate,
    Royal,
}

impl RecipeKind {
    pub fn all() -> &'static [RecipeKind] {
        &[
            RecipeKind::Plain,
            RecipeKind::ChocolateChip,
            RecipeKind::Almond,
            RecipeKind::Coconut,
            RecipeKind::Matcha,
            RecipeKind::Strawberry,
            RecipeKind::DoubleChocolate,
            RecipeKind::Royal,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            RecipeKind::Plain => 0,
            RecipeKind::ChocolateChip => 1,
            RecipeKind::Almond => 2,
            RecipeKind::Coconut => 3,
            RecipeKind::Matcha => 4,
            RecipeKind::Strawberry => 5,
            RecipeKind::DoubleChocolate => 6,
            RecipeKind::Royal => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecipeKind::Plain => "プレーンクッキー",
            RecipeKind::ChocolateChip => "チョコチップクッキー",
            RecipeKind::Almond => "アーモンドクッキー",
            RecipeKind::Coconut => "ココナッツクッキー",
            RecipeKind::Matcha => "抹茶クッキー",
            RecipeKind::Strawberry => "イチゴクッキー",
            RecipeKind::DoubleChocolate => "ダブルチョコレートクッキー",
            RecipeKind::Royal => "ロイヤルクッキー",
        }
    }
}

/// Timed bonus granted when a cook with a special effect completes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpecialEffect {
    pub kind: EffectKind,
    pub multiplier: f64,
    pub duration_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipe {
    pub kind: RecipeKind,
    /// Ingredient cost per batch.
    pub ingredients: Vec<(IngredientKind, u32)>,
    /// Cookies yielded per batch; also the per-item value orders price on.
    pub base_cookies: u32,
    /// Mutable: the golden spatula halves it.
    pub cook_time_secs: u64,
    pub unlocked: bool,
    /// Cumulative cookies required to discover the recipe (0 = known).
    pub unlock_at: f64,
    pub special_effect: Option<SpecialEffect>,
}

/// The single global cooking slot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CookingSlot {
    pub recipe: Option<RecipeKind>,
    pub started_at: Tick,
    pub ends_at: Tick,
}

/// A completed cook, reported back to the caller for logging and effects.
#[derive(Clone, Debug)]
pub struct CookFinished {
    pub kind: RecipeKind,
    pub produced: u32,
    /// False when the inventory rejected the yield (capacity full).
    pub stored: bool,
    pub effect: Option<SpecialEffect>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeCatalog {
    pub recipes: Vec<Recipe>,
    pub cooking: CookingSlot,
}

impl RecipeCatalog {
    pub fn new() -> Self {
        use IngredientKind::*;
        let def = |kind,
                   ingredients: &[(IngredientKind, u32)],
                   base_cookies,
                   cook_time_secs,
                   unlock_at: f64,
                   special_effect| Recipe {
            kind,
            ingredients: ingredients.to_vec(),
            base_cookies,
            cook_time_secs,
            unlocked: unlock_at == 0.0,
            unlock_at,
            special_effect,
        };
        Self {
            recipes: vec![
                def(
                    RecipeKind::Plain,
                    &[(Flour, 1), (Sugar, 1), (Butter, 1)],
                    3,
                    5,
                    0.0,
                    None,
                ),
                def(
                    RecipeKind::ChocolateChip,
                    &[(Flour, 2), (Sugar, 1), (Butter, 1), (Chocolate, 2)],
                    4,
                    8,
                    50.0,
                    None,
                ),
                def(
                    RecipeKind::Almond,
                    &[(Flour, 2), (Sugar, 2), (Butter, 1), (Almond, 3)],
                    5,
                    10,
                    200.0,
                    None,
                ),
                def(
                    RecipeKind::Coconut,
                    &[(Flour, 2), (Sugar, 2), (Butter, 1), (Coconut, 3)],
                    6,
                    12,
                    500.0,
                    None,
                ),
                def(
                    RecipeKind::Matcha,
                    &[(Flour, 2), (Sugar, 1), (Butter, 1), (Matcha, 2)],
                    5,
                    15,
                    1_000.0,
                    Some(SpecialEffect {
                        kind: EffectKind::Production,
                        multiplier: 1.1,
                        duration_secs: 60,
                    }),
                ),
                def(
                    RecipeKind::Strawberry,
                    &[(Flour, 2), (Sugar, 3), (Butter, 1), (Strawberry, 3)],
                    7,
                    18,
                    2_000.0,
                    Some(SpecialEffect {
                        kind: EffectKind::Click,
                        multiplier: 1.2,
                        duration_secs: 90,
                    }),
                ),
                def(
                    RecipeKind::DoubleChocolate,
                    &[(Flour, 1), (Sugar, 2), (Butter, 1), (Chocolate, 4)],
                    6,
                    20,
                    3_000.0,
                    Some(SpecialEffect {
                        kind: EffectKind::Cps,
                        multiplier: 1.15,
                        duration_secs: 120,
                    }),
                ),
                def(
                    RecipeKind::Royal,
                    &[
                        (Flour, 3),
                        (Sugar, 3),
                        (Butter, 2),
                        (Chocolate, 2),
                        (Almond, 2),
                        (Coconut, 2),
                        (Matcha, 1),
                        (Strawberry, 1),
                    ],
                    10,
                    30,
                    10_000.0,
                    Some(SpecialEffect {
                        kind: EffectKind::All,
                        multiplier: 1.5,
                        duration_secs: 300,
                    }),
                ),
            ],
            cooking: CookingSlot::default(),
        }
    }

    pub fn get(&self, kind: RecipeKind) -> &Recipe {
        &self.recipes[kind.index()]
    }

    pub fn get_mut(&mut self, kind: RecipeKind) -> &mut Recipe {
        &mut self.recipes[kind.index()]
    }

    pub fn unlocked_kinds(&self) -> Vec<RecipeKind> {
        self.recipes
            .iter()
            .filter(|r| r.unlocked)
            .map(|r| r.kind)
            .collect()
    }

    pub fn locked_kinds(&self) -> Vec<RecipeKind> {
        self.recipes
            .iter()
            .filter(|r| !r.unlocked)
            .map(|r| r.kind)
            .collect()
    }

    pub fn is_cooking(&self) -> bool {
        self.cooking.recipe.is_some()
    }

    /// Cooking progress in `[0, 1]`, if a cook is active.
    pub fn progress(&self, now: Tick) -> Option<f64> {
        self.cooking.recipe?;
        let total = self.cooking.ends_at.saturating_sub(self.cooking.started_at);
        if total == 0 {
            return Some(1.0);
        }
        let elapsed = now.saturating_sub(self.cooking.started_at);
        Some((elapsed as f64 / total as f64).min(1.0))
    }

    /// Begin cooking. Deducts all required ingredients atomically and
    /// returns the end tick.
    pub fn start_cook(
        &mut self,
        stock: &mut IngredientStock,
        kind: RecipeKind,
        now: Tick,
    ) -> Result<Tick, GameError> {
        if self.is_cooking() {
            return Err(GameError::AlreadyInProgress);
        }
        let recipe = self.get(kind);
        if !recipe.unlocked {
            return Err(GameError::LockedContent);
        }
        // Verify the full cost before touching the stock.
        for (ingredient, amount) in &recipe.ingredients {
            if stock.amount(*ingredient) < *amount {
                return Err(GameError::InsufficientIngredients);
            }
        }
        let costs = recipe.ingredients.clone();
        let cook_ticks = recipe.cook_time_secs * crate::TICKS_PER_SEC;
        for (ingredient, amount) in &costs {
            stock.get_mut(*ingredient).amount -= amount;
        }
        self.cooking = CookingSlot {
            recipe: Some(kind),
            started_at: now,
            ends_at: now + cook_ticks,
        };
        Ok(self.cooking.ends_at)
    }

    /// Tick-driven completion check. On completion the yield is credited
    /// to the inventory (rejected whole if capacity is exceeded) and the
    /// slot resets to idle.
    pub fn tick_cooking(
        &mut self,
        upgrades: &Upgrades,
        inventory: &mut CookieInventory,
        now: Tick,
    ) -> Option<CookFinished> {
        let kind = self.cooking.recipe?;
        if now < self.cooking.ends_at {
            return None;
        }
        let recipe = self.get(kind);
        let produced = (recipe.base_cookies as f64 * upgrades.baking_multiplier()).floor() as u32;
        let effect = recipe.special_effect;
        let stored = inventory.add(kind, produced);
        self.cooking = CookingSlot::default();
        Some(CookFinished {
            kind,
            produced,
            stored,
            effect,
        })
    }

    /// Flip newly reachable recipes to unlocked, exactly once each.
    pub fn check_unlocks(&mut self, cookies_all_time: f64) -> Vec<RecipeKind> {
        let mut newly = Vec::new();
        for recipe in &mut self.recipes {
            if !recipe.unlocked && cookies_all_time >= recipe.unlock_at {
                recipe.unlocked = true;
                newly.push(recipe.kind);
            }
        }
        newly
    }

    /// Teaser for a locked recipe at 30% of its unlock threshold. Derived.
    pub fn hint_visible(&self, kind: RecipeKind, cookies_all_time: f64) -> bool {
        let recipe = self.get(kind);
        !recipe.unlocked && cookies_all_time >= recipe.unlock_at * 0.3
    }

    /// 金のヘラ: halve every cook time, rounding up.
    pub fn halve_cook_times(&mut self) {
        for recipe in &mut self.recipes {
            recipe.cook_time_secs = recipe.cook_time_secs.div_ceil(2);
        }
    }
}

impl Default for RecipeCatalog {
    fn default() -> Self {
        Self::new()
    }
}
