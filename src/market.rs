//! Cookie market: a bounded random-walk price, surplus sales and a small
//! item catalog paid in market coins (a separate currency).

use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::error::GameError;
use crate::ingredients::{IngredientKind, IngredientStock};
use crate::recipes::{RecipeCatalog, RecipeKind};
use crate::rng::GameRng;
use crate::{Tick, TICKS_PER_SEC};

pub const PRICE_FLOOR: f64 = 0.5;
pub const PRICE_CEILING: f64 = 5.0;
const TREND_MIN: f64 = -10.0;
const TREND_MAX: f64 = 10.0;
const UPDATE_INTERVAL: Tick = 5 * TICKS_PER_SEC;
const MAX_PRICE_HISTORY: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketItemId {
    BakerHat,
    PremiumOven,
    RecipeBook,
    IngredientPackage,
    GoldenSpatula,
}

impl MarketItemId {
    pub fn all() -> &'static [MarketItemId] {
        &[
            MarketItemId::BakerHat,
            MarketItemId::PremiumOven,
            MarketItemId::RecipeBook,
            MarketItemId::IngredientPackage,
            MarketItemId::GoldenSpatula,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            MarketItemId::BakerHat => "一流シェフの帽子",
            MarketItemId::PremiumOven => "高級オーブン",
            MarketItemId::RecipeBook => "古代のレシピ本",
            MarketItemId::IngredientPackage => "材料パッケージ",
            MarketItemId::GoldenSpatula => "金のヘラ",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MarketItemId::BakerHat => "クリック報酬が2倍になります",
            MarketItemId::PremiumOven => "自動生産速度が50%上昇します",
            MarketItemId::RecipeBook => "新しいレシピをひとつ即座に解禁します",
            MarketItemId::IngredientPackage => "ランダムな材料を10個獲得します",
            MarketItemId::GoldenSpatula => "調理時間が半分になります",
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            MarketItemId::BakerHat => 500.0,
            MarketItemId::PremiumOven => 1_000.0,
            MarketItemId::RecipeBook => 300.0,
            MarketItemId::IngredientPackage => 200.0,
            MarketItemId::GoldenSpatula => 2_000.0,
        }
    }

    /// Packages and books can be bought again; gear cannot.
    pub fn one_time(&self) -> bool {
        !matches!(
            self,
            MarketItemId::RecipeBook | MarketItemId::IngredientPackage
        )
    }
}

/// What a purchase actually did, for logging.
#[derive(Clone, Debug, PartialEq)]
pub enum MarketItemOutcome {
    Applied,
    RecipeUnlocked(RecipeKind),
    IngredientsGranted(IngredientKind, u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrendAlert {
    Boom,
    Crash,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketState {
    /// Coins per cookie, clamped to `[PRICE_FLOOR, PRICE_CEILING]`.
    pub price: f64,
    /// Random-walk drift in `[-10, 10]`.
    pub trend: f64,
    pub volatility: f64,
    /// Market coins owned (separate from cookies).
    pub currency: f64,
    pub last_update: Tick,
    /// `(price, tick)` ring, oldest first.
    pub history: Vec<(f64, Tick)>,
    pub purchased: Vec<MarketItemId>,
}

impl MarketState {
    pub fn new() -> Self {
        Self {
            price: 1.0,
            trend: 0.0,
            volatility: 0.2,
            currency: 0.0,
            last_update: 0,
            history: Vec::new(),
            purchased: Vec::new(),
        }
    }

    /// One random-walk step, rate-limited to the update interval.
    pub fn update(&mut self, rng: &mut GameRng, now: Tick) -> Option<TrendAlert> {
        if now.saturating_sub(self.last_update) < UPDATE_INTERVAL {
            return None;
        }
        self.last_update = now;

        self.trend += rng.range_f64(-1.0, 1.0);
        self.trend = self.trend.clamp(TREND_MIN, TREND_MAX);

        let trend_factor = 1.0 + self.trend / 50.0;
        let random_factor = 1.0 + rng.range_f64(-self.volatility / 2.0, self.volatility / 2.0);
        self.price *= trend_factor * random_factor;
        self.price = self.price.clamp(PRICE_FLOOR, PRICE_CEILING);

        self.history.push((self.price, now));
        if self.history.len() > MAX_PRICE_HISTORY {
            self.history.remove(0);
        }

        if self.trend > 8.0 {
            Some(TrendAlert::Boom)
        } else if self.trend < -8.0 {
            Some(TrendAlert::Crash)
        } else {
            None
        }
    }

    /// Sell cookies at the current price for market coins. Large sales
    /// depress the trend.
    pub fn sell(
        &mut self,
        eco: &mut EconomyState,
        rng: &mut GameRng,
        amount: f64,
        now: Tick,
    ) -> Result<f64, GameError> {
        if amount <= 0.0 {
            return Err(GameError::NotFound);
        }
        eco.spend(amount)?;
        let revenue = (amount * self.price).floor();
        self.currency += revenue;
        self.trend = (self.trend - amount / 1_000.0).clamp(TREND_MIN, TREND_MAX);
        self.update(rng, now);
        Ok(revenue)
    }

    pub fn is_purchased(&self, item: MarketItemId) -> bool {
        self.purchased.contains(&item)
    }

    /// Buy a catalog item with market coins. Everything is validated
    /// before coins move; repeatable items never mark `purchased`.
    pub fn buy_item(
        &mut self,
        eco: &mut EconomyState,
        recipes: &mut RecipeCatalog,
        stock: &mut IngredientStock,
        rng: &mut GameRng,
        item: MarketItemId,
    ) -> Result<MarketItemOutcome, GameError> {
        if item.one_time() && self.is_purchased(item) {
            return Err(GameError::AlreadyInProgress);
        }
        if self.currency < item.price() {
            return Err(GameError::InsufficientFunds);
        }

        let outcome = match item {
            MarketItemId::BakerHat => {
                eco.click_multiplier *= 2.0;
                MarketItemOutcome::Applied
            }
            MarketItemId::PremiumOven => {
                eco.cps_multiplier *= 1.5;
                MarketItemOutcome::Applied
            }
            MarketItemId::RecipeBook => {
                let locked = recipes.locked_kinds();
                let kind = *rng.pick(&locked).ok_or(GameError::NotFound)?;
                recipes.get_mut(kind).unlocked = true;
                MarketItemOutcome::RecipeUnlocked(kind)
            }
            MarketItemId::IngredientPackage => {
                let unlocked = stock.unlocked_kinds();
                let kind = *rng.pick(&unlocked).ok_or(GameError::NotFound)?;
                stock.add(kind, 10);
                MarketItemOutcome::IngredientsGranted(kind, 10)
            }
            MarketItemId::GoldenSpatula => {
                recipes.halve_cook_times();
                MarketItemOutcome::Applied
            }
        };

        self.currency -= item.price();
        if item.one_time() {
            self.purchased.push(item);
        }
        Ok(outcome)
    }
}

impl Default for MarketState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_stays_clamped_over_many_steps() {
        let mut market = MarketState::new();
        let mut rng = GameRng::new(99);
        let mut now = 0;
        for _ in 0..10_000 {
            market.update(&mut rng, now);
            assert!(
                (PRICE_FLOOR..=PRICE_CEILING).contains(&market.price),
                "price escaped bounds: {}",
                market.price
            );
            assert!((TREND_MIN..=TREND_MAX).contains(&market.trend));
            now += UPDATE_INTERVAL;
        }
    }

    #[test]
    fn update_is_rate_limited() {
        let mut market = MarketState::new();
        let mut rng = GameRng::new(7);
        market.update(&mut rng, UPDATE_INTERVAL);
        let price = market.price;
        let history_len = market.history.len();
        market.update(&mut rng, UPDATE_INTERVAL + 1);
        assert_eq!(market.price, price);
        assert_eq!(market.history.len(), history_len);
    }

    #[test]
    fn history_ring_evicts_oldest() {
        let mut market = MarketState::new();
        let mut rng = GameRng::new(13);
        let mut now = 0;
        for _ in 0..30 {
            market.update(&mut rng, now);
            now += UPDATE_INTERVAL;
        }
        assert_eq!(market.history.len(), 20);
        // Oldest surviving entry is from the 11th update.
        assert_eq!(market.history[0].1, 10 * UPDATE_INTERVAL);
    }

    #[test]
    fn sell_rejects_shortage() {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut rng = GameRng::new(3);
        eco.cookies = 50.0;
        let err = market.sell(&mut eco, &mut rng, 100.0, 0);
        assert_eq!(err.unwrap_err(), GameError::InsufficientFunds);
        assert!((eco.cookies - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sell_credits_floor_of_price_times_amount() {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut rng = GameRng::new(3);
        eco.cookies = 1_000.0;
        market.price = 1.5;
        // Avoid the forced update mutating price before we assert.
        market.last_update = 1;
        let revenue = market.sell(&mut eco, &mut rng, 333.0, 2).unwrap();
        assert!((revenue - 499.0).abs() < 0.001); // floor(333 × 1.5)
        assert!((market.currency - 499.0).abs() < 0.001);
        assert!((eco.cookies - 667.0).abs() < 0.001);
    }

    #[test]
    fn large_sale_depresses_trend() {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut rng = GameRng::new(3);
        eco.cookies = 10_000.0;
        market.last_update = 1;
        market.sell(&mut eco, &mut rng, 5_000.0, 2).unwrap();
        assert!((market.trend - (-5.0)).abs() < 0.001);
    }

    fn coins(market: &mut MarketState, amount: f64) {
        market.currency = amount;
    }

    #[test]
    fn one_time_item_cannot_repeat() {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut recipes = RecipeCatalog::new();
        let mut stock = IngredientStock::new();
        let mut rng = GameRng::new(17);
        coins(&mut market, 2_000.0);
        market
            .buy_item(&mut eco, &mut recipes, &mut stock, &mut rng, MarketItemId::BakerHat)
            .unwrap();
        assert!((eco.click_multiplier - 2.0).abs() < 0.001);
        assert!((market.currency - 1_500.0).abs() < 0.001);
        let err = market.buy_item(
            &mut eco,
            &mut recipes,
            &mut stock,
            &mut rng,
            MarketItemId::BakerHat,
        );
        assert_eq!(err.unwrap_err(), GameError::AlreadyInProgress);
    }

    #[test]
    fn repeatable_package_grants_ingredients() {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut recipes = RecipeCatalog::new();
        let mut stock = IngredientStock::new();
        let mut rng = GameRng::new(17);
        coins(&mut market, 400.0);
        let first = market
            .buy_item(
                &mut eco,
                &mut recipes,
                &mut stock,
                &mut rng,
                MarketItemId::IngredientPackage,
            )
            .unwrap();
        assert!(matches!(first, MarketItemOutcome::IngredientsGranted(_, 10)));
        // Still buyable.
        market
            .buy_item(
                &mut eco,
                &mut recipes,
                &mut stock,
                &mut rng,
                MarketItemId::IngredientPackage,
            )
            .unwrap();
        let total: u32 = IngredientKind::all().iter().map(|k| stock.amount(*k)).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn recipe_book_fails_cleanly_when_all_unlocked() {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut recipes = RecipeCatalog::new();
        let mut stock = IngredientStock::new();
        let mut rng = GameRng::new(17);
        for recipe in &mut recipes.recipes {
            recipe.unlocked = true;
        }
        coins(&mut market, 300.0);
        let err = market.buy_item(
            &mut eco,
            &mut recipes,
            &mut stock,
            &mut rng,
            MarketItemId::RecipeBook,
        );
        assert_eq!(err.unwrap_err(), GameError::NotFound);
        // Coins untouched: validation precedes payment.
        assert!((market.currency - 300.0).abs() < 0.001);
    }

    #[test]
    fn spatula_halves_cook_times_once() {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut recipes = RecipeCatalog::new();
        let mut stock = IngredientStock::new();
        let mut rng = GameRng::new(17);
        coins(&mut market, 2_000.0);
        market
            .buy_item(
                &mut eco,
                &mut recipes,
                &mut stock,
                &mut rng,
                MarketItemId::GoldenSpatula,
            )
            .unwrap();
        assert_eq!(recipes.get(RecipeKind::Royal).cook_time_secs, 15);
        assert!(market.is_purchased(MarketItemId::GoldenSpatula));
    }
}
