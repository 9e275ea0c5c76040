//! Customer orders: generation, expiry, fulfillment, statistics.
//!
//! Orders move `Active → {Completed | Rejected | Expired}` exactly once.
//! Generation runs on a self-rescheduling deadline (recurring-timer
//! semantics): each invocation adjusts difficulty to the player level,
//! maybe generates, then books the next invocation. An external trigger
//! replaces the pending deadline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::error::GameError;
use crate::ingredients::{IngredientKind, IngredientStock};
use crate::inventory::CookieInventory;
use crate::player::{GameClock, PlayerProgress};
use crate::recipes::{RecipeCatalog, RecipeKind};
use crate::rng::GameRng;
use crate::stats::SalesStats;
use crate::{Tick, TICKS_PER_SEC};

const SPECIAL_ORDER_CHANCE: f64 = 0.1;
const SWEEP_INTERVAL: Tick = TICKS_PER_SEC; // once per second

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Completed,
    Rejected,
    Expired,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique and monotonic.
    pub id: u64,
    pub customer: String,
    pub items: Vec<(RecipeKind, u32)>,
    pub created_at: Tick,
    pub expires_at: Tick,
    pub reward: f64,
    pub special: bool,
    pub status: OrderStatus,
}

/// Generation parameters, tightened as the player levels up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderDifficulty {
    pub min_items: u32,
    pub max_items: u32,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub base_time_limit_secs: f64,
    pub time_limit_variance_secs: f64,
    pub base_reward_multiplier: f64,
}

impl Default for OrderDifficulty {
    fn default() -> Self {
        Self {
            min_items: 1,
            max_items: 3,
            min_quantity: 1,
            max_quantity: 5,
            base_time_limit_secs: 60.0,
            time_limit_variance_secs: 30.0,
            base_reward_multiplier: 1.5,
        }
    }
}

impl OrderDifficulty {
    /// Higher level: more variety, bigger quantities, better rewards,
    /// tighter deadlines.
    pub fn adjust_for_level(&mut self, level: u32) {
        if level >= 5 {
            self.max_items = (3 + (level - 5) / 5).min(5);
            self.max_quantity = (5 + (level - 5) / 3).min(10);
        }
        self.base_reward_multiplier = 1.5 + level as f64 * 0.1;
        if level >= 10 {
            self.base_time_limit_secs = (60.0 - (level - 10) as f64).max(45.0);
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrderStats {
    pub completed: u64,
    /// Rejections and expiries combined.
    pub rejected: u64,
    pub total_revenue: f64,
    pub recipe_sales: BTreeMap<RecipeKind, u64>,
    pub best_selling: Option<RecipeKind>,
    pub best_selling_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderAction {
    Complete,
    Reject,
}

/// Terminal order plus the experience the fulfillment earned.
#[derive(Clone, Debug)]
pub struct OrderOutcome {
    pub order: Order,
    pub exp: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderEngine {
    pub active: Vec<Order>,
    pub stats: OrderStats,
    pub difficulty: OrderDifficulty,
    pub max_active: usize,
    pub next_order_delay_secs: f64,
    pub next_generation_at: Tick,
    pub(crate) next_sweep_at: Tick,
    pub(crate) next_order_id: u64,
    /// Opt-in just-in-time cooking: cover a stock shortfall by consuming
    /// the raw ingredients for the missing batches. Off by default.
    pub jit_cooking: bool,
}

impl OrderEngine {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            stats: OrderStats::default(),
            difficulty: OrderDifficulty::default(),
            max_active: 3,
            next_order_delay_secs: 30.0,
            next_generation_at: 0,
            next_sweep_at: 0,
            next_order_id: 1,
            jit_cooking: false,
        }
    }

    pub fn find(&self, id: u64) -> Option<&Order> {
        self.active.iter().find(|o| o.id == id)
    }

    /// Cancel the pending schedule and generate at the next tick.
    pub fn trigger_generation(&mut self, now: Tick) {
        self.next_generation_at = now;
    }

    /// Scheduled generation step. Returns the new order for logging.
    pub fn run_schedule(
        &mut self,
        recipes: &RecipeCatalog,
        player: &PlayerProgress,
        rng: &mut GameRng,
        now: Tick,
    ) -> Option<Order> {
        if now < self.next_generation_at {
            return None;
        }
        self.difficulty.adjust_for_level(player.level);

        let generated = if self.active.len() < self.max_active {
            self.generate(recipes, rng, now)
        } else {
            None
        };

        let delay_secs = self.next_order_delay_secs
            * player.order_delay_multiplier()
            * rng.range_f64(0.8, 1.2);
        self.next_generation_at = now + (delay_secs * TICKS_PER_SEC as f64) as Tick;

        generated
    }

    /// Sample a new order from the unlocked recipe pool.
    fn generate(&mut self, recipes: &RecipeCatalog, rng: &mut GameRng, now: Tick) -> Option<Order> {
        let mut pool = recipes.unlocked_kinds();
        if pool.is_empty() {
            return None;
        }
        let d = &self.difficulty;
        let order_size = rng.range_u32(d.min_items, d.max_items) as usize;

        // Shuffle-then-take: distinct recipes, guaranteed termination.
        rng.shuffle(&mut pool);
        let items: Vec<(RecipeKind, u32)> = pool
            .into_iter()
            .take(order_size)
            .map(|kind| (kind, rng.range_u32(d.min_quantity, d.max_quantity)))
            .collect();

        let mut time_limit_secs = d.base_time_limit_secs
            + rng.range_f64(-d.time_limit_variance_secs, d.time_limit_variance_secs);
        let mut reward = (base_reward(recipes, &items) * d.base_reward_multiplier).floor();

        let special = rng.chance(SPECIAL_ORDER_CHANCE);
        if special {
            reward = (reward * 2.0).floor();
            time_limit_secs *= 0.8;
        }

        let order = Order {
            id: self.next_order_id,
            customer: customer_name(rng),
            items,
            created_at: now,
            expires_at: now + (time_limit_secs * TICKS_PER_SEC as f64) as Tick,
            reward,
            special,
            status: OrderStatus::Active,
        };
        self.next_order_id += 1;
        self.active.push(order.clone());
        Some(order)
    }

    /// Expire overdue orders. Runs at most once per second of ticks;
    /// expiries count as rejections in the stats.
    pub fn sweep_timeouts(&mut self, now: Tick) -> Vec<Order> {
        if now < self.next_sweep_at {
            return Vec::new();
        }
        self.next_sweep_at = now + SWEEP_INTERVAL;

        let mut expired = Vec::new();
        self.active.retain_mut(|order| {
            if order.expires_at < now {
                order.status = OrderStatus::Expired;
                expired.push(order.clone());
                false
            } else {
                true
            }
        });
        self.stats.rejected += expired.len() as u64;
        expired
    }

    /// Complete or reject an active order.
    ///
    /// Completion is inventory-first: the finished-goods stock must cover
    /// every line item. With `jit_cooking` enabled, a shortfall may instead
    /// be covered by consuming the raw ingredients for the missing batches
    /// (validated in full before anything is deducted).
    #[allow(clippy::too_many_arguments)]
    pub fn process_order(
        &mut self,
        id: u64,
        action: OrderAction,
        inventory: &mut CookieInventory,
        recipes: &RecipeCatalog,
        ingredients: &mut IngredientStock,
        eco: &mut EconomyState,
        sales: &mut SalesStats,
        clock: &GameClock,
    ) -> Result<OrderOutcome, GameError> {
        let idx = self
            .active
            .iter()
            .position(|o| o.id == id)
            .ok_or(GameError::NotFound)?;

        if action == OrderAction::Reject {
            let mut order = self.active.remove(idx);
            order.status = OrderStatus::Rejected;
            self.stats.rejected += 1;
            return Ok(OrderOutcome { order, exp: 0 });
        }

        let items = self.active[idx].items.clone();
        self.fulfill_items(&items, inventory, recipes, ingredients)?;

        let mut order = self.active.remove(idx);
        order.status = OrderStatus::Completed;
        eco.earn(order.reward);
        self.stats.completed += 1;
        self.stats.total_revenue += order.reward;

        let total_quantity: u32 = order.items.iter().map(|(_, q)| q).sum();
        for (kind, quantity) in &order.items {
            let sold = self.stats.recipe_sales.entry(*kind).or_insert(0);
            *sold += *quantity as u64;
            if *sold > self.stats.best_selling_count {
                self.stats.best_selling_count = *sold;
                self.stats.best_selling = Some(*kind);
            }
            // Revenue attributed proportionally to each recipe's share.
            let share = if total_quantity > 0 {
                (order.reward * *quantity as f64 / total_quantity as f64).floor()
            } else {
                0.0
            };
            sales.record_sale(clock, *kind, *quantity, share);
        }

        let exp = (order.reward / 10.0).ceil() as u64;
        Ok(OrderOutcome { order, exp })
    }

    /// Consume the order's items from inventory, falling back to raw
    /// ingredients for the shortfall when JIT cooking is enabled.
    fn fulfill_items(
        &self,
        items: &[(RecipeKind, u32)],
        inventory: &mut CookieInventory,
        recipes: &RecipeCatalog,
        ingredients: &mut IngredientStock,
    ) -> Result<(), GameError> {
        if inventory.check_stock(items) {
            inventory.consume_batch(items);
            return Ok(());
        }
        if !self.jit_cooking {
            return Err(GameError::InsufficientStock);
        }

        // Plan the implicit cook: whole batches per short recipe.
        let mut needed: BTreeMap<IngredientKind, u32> = BTreeMap::new();
        let mut surpluses: Vec<(RecipeKind, u32)> = Vec::new();
        for (kind, quantity) in items {
            let shortfall = quantity.saturating_sub(inventory.amount(*kind));
            if shortfall == 0 {
                continue;
            }
            let recipe = recipes.get(*kind);
            let batches = shortfall.div_ceil(recipe.base_cookies);
            for (ingredient, amount) in &recipe.ingredients {
                *needed.entry(*ingredient).or_insert(0) += amount * batches;
            }
            surpluses.push((*kind, batches * recipe.base_cookies - shortfall));
        }
        for (ingredient, amount) in &needed {
            if ingredients.amount(*ingredient) < *amount {
                return Err(GameError::InsufficientIngredients);
            }
        }

        // Validated — now mutate.
        for (ingredient, amount) in &needed {
            ingredients.get_mut(*ingredient).amount -= amount;
        }
        for (kind, quantity) in items {
            let from_stock = inventory.amount(*kind).min(*quantity);
            if from_stock > 0 {
                inventory.remove(*kind, from_stock);
            }
        }
        // Whole-batch overshoot goes back on the shelf, capacity allowing.
        for (kind, surplus) in surpluses {
            if surplus > 0 {
                let _ = inventory.add(kind, surplus);
            }
        }
        Ok(())
    }
}

impl Default for OrderEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Reward basis: Σ per-batch yield × quantity, before the multiplier.
pub fn base_reward(recipes: &RecipeCatalog, items: &[(RecipeKind, u32)]) -> f64 {
    items
        .iter()
        .map(|(kind, quantity)| recipes.get(*kind).base_cookies as f64 * *quantity as f64)
        .sum()
}

const CUSTOMER_FAMILY_NAMES: [&str; 15] = [
    "田中", "佐藤", "鈴木", "高橋", "渡辺", "伊藤", "山本", "中村", "小林", "加藤", "吉田",
    "山田", "佐々木", "山口", "松本",
];

const CUSTOMER_SUFFIXES: [&str; 10] = [
    "さん", "様", "さん家", "ファミリー", "一家", "商店", "カフェ", "レストラン", "ホテル",
    "学園",
];

fn customer_name(rng: &mut GameRng) -> String {
    let family = CUSTOMER_FAMILY_NAMES[rng.next_u32() as usize % CUSTOMER_FAMILY_NAMES.len()];
    let suffix = CUSTOMER_SUFFIXES[rng.next_u32() as usize % CUSTOMER_SUFFIXES.len()];
    format!("{}{}", family, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> (
        OrderEngine,
        RecipeCatalog,
        CookieInventory,
        IngredientStock,
        EconomyState,
        SalesStats,
        GameClock,
        GameRng,
    ) {
        (
            OrderEngine::new(),
            RecipeCatalog::new(),
            CookieInventory::new(),
            IngredientStock::new(),
            EconomyState::new(),
            SalesStats::new(),
            GameClock::new(),
            GameRng::new(1234),
        )
    }

    fn push_order(engine: &mut OrderEngine, items: Vec<(RecipeKind, u32)>, expires_at: Tick) -> u64 {
        let id = engine.next_order_id;
        engine.next_order_id += 1;
        engine.active.push(Order {
            id,
            customer: "テスト商店".to_string(),
            items,
            created_at: 0,
            expires_at,
            reward: 16.0,
            special: false,
            status: OrderStatus::Active,
        });
        id
    }

    #[test]
    fn reward_formula_matches_worked_example() {
        let recipes = RecipeCatalog::new();
        // Plain yields 3 per batch, Almond yields 5.
        let items = vec![(RecipeKind::Plain, 2), (RecipeKind::Almond, 1)];
        let reward = (base_reward(&recipes, &items) * 1.5).floor();
        assert!((reward - 16.0).abs() < 0.001);
        // Special order doubles the reward and shrinks the deadline.
        let special = (reward * 2.0).floor();
        assert!((special - 32.0).abs() < 0.001);
        assert!((60.0_f64 * 0.8 - 48.0).abs() < 0.001);
    }

    #[test]
    fn difficulty_scales_with_level() {
        let mut d = OrderDifficulty::default();
        d.adjust_for_level(1);
        assert_eq!(d.max_items, 3);
        assert!((d.base_reward_multiplier - 1.6).abs() < 0.001);

        d.adjust_for_level(20);
        assert_eq!(d.max_items, 5);
        assert_eq!(d.max_quantity, 10);
        assert!((d.base_time_limit_secs - 50.0).abs() < 0.001);

        d.adjust_for_level(40);
        assert!((d.base_time_limit_secs - 45.0).abs() < 0.001);
    }

    #[test]
    fn generation_respects_active_cap() {
        let (mut engine, recipes, _, _, _, _, _, mut rng) = context();
        let player = PlayerProgress::new();
        for _ in 0..10 {
            engine.trigger_generation(0);
            engine.run_schedule(&recipes, &player, &mut rng, 0);
        }
        assert_eq!(engine.active.len(), engine.max_active);
    }

    #[test]
    fn generated_items_are_distinct_and_in_range() {
        let (mut engine, recipes, _, _, _, _, _, mut rng) = context();
        let player = PlayerProgress::new();
        for round in 0..50 {
            engine.active.clear();
            engine.trigger_generation(round);
            let order = engine
                .run_schedule(&recipes, &player, &mut rng, round)
                .expect("order generated");
            let mut kinds: Vec<RecipeKind> = order.items.iter().map(|(k, _)| *k).collect();
            kinds.sort();
            kinds.dedup();
            assert_eq!(kinds.len(), order.items.len(), "duplicate recipe in order");
            for (_, quantity) in &order.items {
                assert!((1..=5).contains(quantity));
            }
            assert!(order.expires_at > order.created_at);
        }
    }

    #[test]
    fn schedule_reschedules_itself() {
        let (mut engine, recipes, _, _, _, _, _, mut rng) = context();
        let player = PlayerProgress::new();
        engine.run_schedule(&recipes, &player, &mut rng, 0);
        let next = engine.next_generation_at;
        assert!(next > 0);
        // Not due yet: nothing happens, deadline unchanged.
        assert!(engine.run_schedule(&recipes, &player, &mut rng, next - 1).is_none());
        assert_eq!(engine.next_generation_at, next);
    }

    #[test]
    fn order_ids_are_monotonic() {
        let (mut engine, recipes, _, _, _, _, _, mut rng) = context();
        let player = PlayerProgress::new();
        let mut last = 0;
        for i in 0..3 {
            engine.trigger_generation(i);
            let order = engine.run_schedule(&recipes, &player, &mut rng, i).unwrap();
            assert!(order.id > last);
            last = order.id;
        }
    }

    #[test]
    fn sweep_expires_overdue_orders() {
        let (mut engine, ..) = context();
        push_order(&mut engine, vec![(RecipeKind::Plain, 1)], 100);
        push_order(&mut engine, vec![(RecipeKind::Plain, 1)], 500);
        let expired = engine.sweep_timeouts(101);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].status, OrderStatus::Expired);
        assert_eq!(engine.active.len(), 1);
        assert_eq!(engine.stats.rejected, 1);
    }

    #[test]
    fn sweep_is_rate_limited() {
        let (mut engine, ..) = context();
        engine.sweep_timeouts(0);
        push_order(&mut engine, vec![(RecipeKind::Plain, 1)], 1);
        // Within the same sweep window nothing expires yet.
        assert!(engine.sweep_timeouts(5).is_empty());
        assert_eq!(engine.sweep_timeouts(10).len(), 1);
    }

    #[test]
    fn complete_requires_stock() {
        let (mut engine, recipes, mut inventory, mut ingredients, mut eco, mut sales, clock, _) =
            context();
        let id = push_order(&mut engine, vec![(RecipeKind::Plain, 2)], 1_000);
        let err = engine.process_order(
            id,
            OrderAction::Complete,
            &mut inventory,
            &recipes,
            &mut ingredients,
            &mut eco,
            &mut sales,
            &clock,
        );
        assert_eq!(err.unwrap_err(), GameError::InsufficientStock);
        // Order stays active.
        assert_eq!(engine.active.len(), 1);
        assert_eq!(engine.find(id).unwrap().status, OrderStatus::Active);
    }

    #[test]
    fn complete_pays_and_updates_stats() {
        let (mut engine, recipes, mut inventory, mut ingredients, mut eco, mut sales, clock, _) =
            context();
        inventory.add(RecipeKind::Plain, 2);
        inventory.add(RecipeKind::Almond, 1);
        let id = push_order(
            &mut engine,
            vec![(RecipeKind::Plain, 2), (RecipeKind::Almond, 1)],
            1_000,
        );
        let outcome = engine
            .process_order(
                id,
                OrderAction::Complete,
                &mut inventory,
                &recipes,
                &mut ingredients,
                &mut eco,
                &mut sales,
                &clock,
            )
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Completed);
        assert_eq!(outcome.exp, 2); // ceil(16 / 10)
        assert!((eco.cookies - 16.0).abs() < 0.001);
        assert_eq!(engine.stats.completed, 1);
        assert_eq!(engine.stats.best_selling, Some(RecipeKind::Plain));
        assert_eq!(inventory.amount(RecipeKind::Plain), 0);
        // Proportional attribution: plain floor(16×2/3)=10, almond floor(16/3)=5.
        let today = sales.today(&clock).unwrap();
        assert!((today.revenue - 15.0).abs() < 0.001);
    }

    #[test]
    fn reject_has_no_side_effects_beyond_stats() {
        let (mut engine, recipes, mut inventory, mut ingredients, mut eco, mut sales, clock, _) =
            context();
        let id = push_order(&mut engine, vec![(RecipeKind::Plain, 2)], 1_000);
        let outcome = engine
            .process_order(
                id,
                OrderAction::Reject,
                &mut inventory,
                &recipes,
                &mut ingredients,
                &mut eco,
                &mut sales,
                &clock,
            )
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Rejected);
        assert_eq!(engine.stats.rejected, 1);
        assert!(eco.cookies.abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_order_is_not_found() {
        let (mut engine, recipes, mut inventory, mut ingredients, mut eco, mut sales, clock, _) =
            context();
        let err = engine.process_order(
            999,
            OrderAction::Complete,
            &mut inventory,
            &recipes,
            &mut ingredients,
            &mut eco,
            &mut sales,
            &clock,
        );
        assert_eq!(err.unwrap_err(), GameError::NotFound);
    }

    #[test]
    fn jit_fallback_consumes_ingredients_for_shortfall() {
        let (mut engine, recipes, mut inventory, mut ingredients, mut eco, mut sales, clock, _) =
            context();
        engine.jit_cooking = true;
        inventory.add(RecipeKind::Plain, 1);
        for kind in IngredientKind::all() {
            ingredients.get_mut(*kind).amount = 10;
        }
        // Need 4 plain, have 1: shortfall 3 = one batch (yield 3).
        let id = push_order(&mut engine, vec![(RecipeKind::Plain, 4)], 1_000);
        engine
            .process_order(
                id,
                OrderAction::Complete,
                &mut inventory,
                &recipes,
                &mut ingredients,
                &mut eco,
                &mut sales,
                &clock,
            )
            .unwrap();
        // One plain batch costs 1 flour + 1 sugar + 1 butter.
        assert_eq!(ingredients.amount(IngredientKind::Flour), 9);
        assert_eq!(ingredients.amount(IngredientKind::Sugar), 9);
        assert_eq!(inventory.amount(RecipeKind::Plain), 0);
    }

    #[test]
    fn jit_fallback_validates_before_mutating() {
        let (mut engine, recipes, mut inventory, mut ingredients, mut eco, mut sales, clock, _) =
            context();
        engine.jit_cooking = true;
        inventory.add(RecipeKind::Plain, 1);
        ingredients.get_mut(IngredientKind::Flour).amount = 10;
        // Sugar and butter missing: the JIT plan must fail cleanly.
        let id = push_order(&mut engine, vec![(RecipeKind::Plain, 4)], 1_000);
        let err = engine.process_order(
            id,
            OrderAction::Complete,
            &mut inventory,
            &recipes,
            &mut ingredients,
            &mut eco,
            &mut sales,
            &clock,
        );
        assert_eq!(err.unwrap_err(), GameError::InsufficientIngredients);
        assert_eq!(inventory.amount(RecipeKind::Plain), 1);
        assert_eq!(ingredients.amount(IngredientKind::Flour), 10);
    }

    #[test]
    fn jit_surplus_returns_to_inventory() {
        let (mut engine, recipes, mut inventory, mut ingredients, mut eco, mut sales, clock, _) =
            context();
        engine.jit_cooking = true;
        for kind in IngredientKind::all() {
            ingredients.get_mut(*kind).amount = 10;
        }
        // Need 2 plain with zero stock: one batch of 3, surplus 1.
        let id = push_order(&mut engine, vec![(RecipeKind::Plain, 2)], 1_000);
        engine
            .process_order(
                id,
                OrderAction::Complete,
                &mut inventory,
                &recipes,
                &mut ingredients,
                &mut eco,
                &mut sales,
                &clock,
            )
            .unwrap();
        assert_eq!(inventory.amount(RecipeKind::Plain), 1);
    }

    #[test]
    fn customer_names_are_plausible() {
        let mut rng = GameRng::new(5);
        for _ in 0..20 {
            let name = customer_name(&mut rng);
            assert!(!name.is_empty());
        }
    }
}
