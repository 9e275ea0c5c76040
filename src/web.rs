//! Browser boundary: a `wasm-bindgen` facade over [`Game`].
//!
//! The page drives `frame(performance.now())` from its animation loop;
//! the accumulator converts variable frame deltas into discrete ticks.
//! Rendering reads the JSON snapshot and the message log — the DOM layer
//! owns presentation entirely.

use wasm_bindgen::prelude::*;

use crate::game::Game;
use crate::ingredients::IngredientKind;
use crate::market::MarketItemId;
use crate::orders::OrderAction;
use crate::recipes::RecipeKind;
use crate::save::{self, LocalStorage};
use crate::suppliers::{ContractTier, SupplierId};
use crate::units::UnitKind;
use crate::TICKS_PER_SEC;

const MS_PER_TICK: f64 = 1000.0 / TICKS_PER_SEC as f64;
/// Clamp frame deltas so a backgrounded tab cannot demand a tick storm.
const MAX_FRAME_DELTA_MS: f64 = 500.0;
/// Autosave interval in ticks (30 seconds).
const AUTOSAVE_INTERVAL: u32 = 300;

fn today_epoch_day() -> u32 {
    (js_sys::Date::now() / 86_400_000.0) as u32
}

#[wasm_bindgen]
pub struct WebGame {
    game: Game,
    store: LocalStorage,
    accumulator_ms: f64,
    last_timestamp_ms: Option<f64>,
    ticks_since_save: u32,
}

#[wasm_bindgen]
impl WebGame {
    /// Load the saved game (or start fresh) and run the login check.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        let store = LocalStorage;
        let seed = js_sys::Date::now() as u32;
        let mut game = save::load_game(&store, seed);
        game.check_login(today_epoch_day());
        Self {
            game,
            store,
            accumulator_ms: 0.0,
            last_timestamp_ms: None,
            ticks_since_save: 0,
        }
    }

    /// Feed a frame timestamp; advances the simulation by however many
    /// whole ticks have elapsed. Returns the tick count processed.
    pub fn frame(&mut self, now_ms: f64) -> u32 {
        let delta = match self.last_timestamp_ms {
            Some(prev) => (now_ms - prev).clamp(0.0, MAX_FRAME_DELTA_MS),
            None => 0.0,
        };
        self.last_timestamp_ms = Some(now_ms);

        self.accumulator_ms += delta;
        let ticks = (self.accumulator_ms / MS_PER_TICK) as u32;
        self.accumulator_ms -= ticks as f64 * MS_PER_TICK;

        self.game.tick(ticks);

        self.ticks_since_save += ticks;
        if self.ticks_since_save >= AUTOSAVE_INTERVAL || self.game.dirty {
            self.save();
            self.ticks_since_save = 0;
        }
        ticks
    }

    pub fn save(&mut self) {
        save::save_game(&self.game, &mut self.store);
        self.game.dirty = false;
    }

    /// Wipe the save and restart from scratch.
    pub fn reset(&mut self) {
        save::clear_save(&mut self.store);
        self.game.reset();
        self.save();
    }

    // ── Commands (errors surface in the game log) ───────────────

    pub fn click(&mut self) -> f64 {
        self.game.click()
    }

    pub fn buy_unit(&mut self, unit: &str) -> bool {
        match parse_unit(unit) {
            Some(kind) => self.game.buy_unit(kind).is_ok(),
            None => false,
        }
    }

    pub fn buy_upgrade(&mut self, id: &str) -> bool {
        self.game.buy_upgrade(id).is_ok()
    }

    pub fn buy_ingredient(&mut self, ingredient: &str, amount: u32) -> bool {
        match parse_ingredient(ingredient) {
            Some(kind) => self.game.buy_ingredient(kind, amount).is_ok(),
            None => false,
        }
    }

    pub fn unlock_ingredient(&mut self, ingredient: &str) -> bool {
        match parse_ingredient(ingredient) {
            Some(kind) => self.game.unlock_ingredient(kind).is_ok(),
            None => false,
        }
    }

    pub fn start_cooking(&mut self, recipe: &str) -> bool {
        match parse_recipe(recipe) {
            Some(kind) => self.game.start_cooking(kind).is_ok(),
            None => false,
        }
    }

    pub fn complete_order(&mut self, id: u64) -> bool {
        self.game.process_order(id, OrderAction::Complete).is_ok()
    }

    pub fn reject_order(&mut self, id: u64) -> bool {
        self.game.process_order(id, OrderAction::Reject).is_ok()
    }

    pub fn sign_contract(&mut self, supplier: &str, tier: &str) -> bool {
        match (parse_supplier(supplier), parse_tier(tier)) {
            (Some(supplier), Some(tier)) => self.game.sign_contract(supplier, tier).is_ok(),
            _ => false,
        }
    }

    pub fn sell_cookies(&mut self, amount: f64) -> bool {
        self.game.sell_cookies(amount).is_ok()
    }

    pub fn buy_market_item(&mut self, item: &str) -> bool {
        match parse_market_item(item) {
            Some(item) => self.game.buy_market_item(item).is_ok(),
            None => false,
        }
    }

    pub fn upgrade_storage(&mut self) -> bool {
        self.game.upgrade_storage().is_ok()
    }

    // ── Render data ─────────────────────────────────────────────

    pub fn cookies(&self) -> f64 {
        self.game.eco.cookies
    }

    pub fn cps(&self) -> f64 {
        self.game.eco.total_production_rate * self.game.eco.production_effect_factor()
    }

    pub fn per_click(&self) -> f64 {
        self.game.eco.per_click_yield
    }

    pub fn level(&self) -> u32 {
        self.game.player.level
    }

    pub fn market_price(&self) -> f64 {
        self.game.market.price
    }

    pub fn market_coins(&self) -> f64 {
        self.game.market.currency
    }

    pub fn cooking_progress(&self) -> f64 {
        self.game.recipes.progress(self.game.now).unwrap_or(-1.0)
    }

    /// Active orders as JSON for the order board.
    pub fn orders_json(&self) -> String {
        serde_json::to_string(&self.game.orders.active).unwrap_or_else(|_| "[]".to_string())
    }

    /// Message log as JSON `[{text, important}, ...]`, newest last.
    pub fn log_json(&self) -> String {
        let entries: Vec<serde_json::Value> = self
            .game
            .log
            .iter()
            .map(|e| serde_json::json!({"text": e.text, "important": e.important}))
            .collect();
        serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for WebGame {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_unit(id: &str) -> Option<UnitKind> {
    match id {
        "cursor" => Some(UnitKind::Cursor),
        "grandma" => Some(UnitKind::Grandma),
        "factory" => Some(UnitKind::Factory),
        _ => None,
    }
}

fn parse_ingredient(id: &str) -> Option<IngredientKind> {
    match id {
        "flour" => Some(IngredientKind::Flour),
        "sugar" => Some(IngredientKind::Sugar),
        "butter" => Some(IngredientKind::Butter),
        "chocolate" => Some(IngredientKind::Chocolate),
        "almond" => Some(IngredientKind::Almond),
        "coconut" => Some(IngredientKind::Coconut),
        "matcha" => Some(IngredientKind::Matcha),
        "strawberry" => Some(IngredientKind::Strawberry),
        _ => None,
    }
}

fn parse_recipe(id: &str) -> Option<RecipeKind> {
    match id {
        "plain_cookie" => Some(RecipeKind::Plain),
        "chocolate_chip" => Some(RecipeKind::ChocolateChip),
        "almond_cookie" => Some(RecipeKind::Almond),
        "coconut_cookie" => Some(RecipeKind::Coconut),
        "matcha_cookie" => Some(RecipeKind::Matcha),
        "strawberry_cookie" => Some(RecipeKind::Strawberry),
        "double_chocolate" => Some(RecipeKind::DoubleChocolate),
        "royal_cookie" => Some(RecipeKind::Royal),
        _ => None,
    }
}

fn parse_supplier(id: &str) -> Option<SupplierId> {
    match id {
        "village_mill" => Some(SupplierId::VillageMill),
        "town_mill" => Some(SupplierId::TownMill),
        "automated_mill" => Some(SupplierId::AutomatedMill),
        "local_refinery" => Some(SupplierId::LocalRefinery),
        "sugar_factory" => Some(SupplierId::SugarFactory),
        "modern_refinery" => Some(SupplierId::ModernRefinery),
        "dairy_farm" => Some(SupplierId::DairyFarm),
        "butter_factory" => Some(SupplierId::ButterFactory),
        "gourmet_creamery" => Some(SupplierId::GourmetCreamery),
        _ => None,
    }
}

fn parse_tier(id: &str) -> Option<ContractTier> {
    match id {
        "daily" => Some(ContractTier::Daily),
        "weekly" => Some(ContractTier::Weekly),
        "monthly" => Some(ContractTier::Monthly),
        _ => None,
    }
}

fn parse_market_item(id: &str) -> Option<MarketItemId> {
    match id {
        "baker_hat" => Some(MarketItemId::BakerHat),
        "premium_oven" => Some(MarketItemId::PremiumOven),
        "recipe_book" => Some(MarketItemId::RecipeBook),
        "ingredient_package" => Some(MarketItemId::IngredientPackage),
        "golden_spatula" => Some(MarketItemId::GoldenSpatula),
        _ => None,
    }
}
