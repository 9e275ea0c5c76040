//! The game facade: owns every component, runs the master tick, exposes
//! the user command surface.
//!
//! The master tick runs its phases in a stable order every cycle —
//! production accrual, cooking, unlock checks, the game clock, order
//! sweep/generation, supplier cycles, market update — because later
//! phases read state written by earlier ones (order generation reads the
//! clock and player level).

use crate::economy::{format_number, EconomyState};
use crate::error::GameError;
use crate::ingredients::{IngredientKind, IngredientStock};
use crate::inventory::CookieInventory;
use crate::market::{MarketItemId, MarketItemOutcome, MarketState, TrendAlert};
use crate::orders::{Order, OrderAction, OrderEngine, OrderOutcome};
use crate::player::{CalendarEvent, LoginReward, PlayerProgress, TIME_SCALE_MINUTES};
use crate::recipes::{CookFinished, RecipeCatalog, RecipeKind};
use crate::rng::GameRng;
use crate::stats::SalesStats;
use crate::suppliers::{ContractEvent, ContractTier, SupplierContract, SupplierEngine, SupplierId};
use crate::units::{ProductionEngine, UnitKind, UnitPurchase};
use crate::upgrades::Upgrades;
use crate::{Tick, TICKS_PER_SEC};

const MAX_LOG_ENTRIES: usize = 50;
/// Chance that a manual click shakes loose a free ingredient.
const CLICK_DROP_CHANCE: f64 = 0.01;
const CLICK_FLAVOR_CHANCE: f64 = 0.1;

const CLICK_FLAVOR: [&str; 5] = [
    "おいしいクッキーを焼きました！",
    "さくさくのクッキーができました！",
    "チョコチップがたっぷり！",
    "香ばしい匂いがしてきます",
    "もう一枚焼けました！",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub text: String,
    pub important: bool,
}

pub struct Game {
    pub now: Tick,
    pub eco: EconomyState,
    pub production: ProductionEngine,
    pub upgrades: Upgrades,
    pub ingredients: IngredientStock,
    pub recipes: RecipeCatalog,
    pub inventory: CookieInventory,
    pub orders: OrderEngine,
    pub suppliers: SupplierEngine,
    pub market: MarketState,
    pub player: PlayerProgress,
    pub sales_stats: SalesStats,
    pub rng: GameRng,
    pub log: Vec<LogEntry>,
    /// Ticks accumulated toward the next whole second of clock time.
    clock_tick_acc: u32,
    /// Set by every state-mutating command; the host saves and clears it.
    pub dirty: bool,
}

impl Game {
    pub fn new(seed: u32) -> Self {
        let mut game = Self {
            now: 0,
            eco: EconomyState::new(),
            production: ProductionEngine::new(),
            upgrades: Upgrades::new(),
            ingredients: IngredientStock::new(),
            recipes: RecipeCatalog::new(),
            inventory: CookieInventory::new(),
            orders: OrderEngine::new(),
            suppliers: SupplierEngine::new(),
            market: MarketState::new(),
            player: PlayerProgress::new(),
            sales_stats: SalesStats::new(),
            rng: GameRng::new(seed),
            log: Vec::new(),
            clock_tick_acc: 0,
            dirty: false,
        };
        game.add_log("Sweet Success へようこそ！", true);
        game
    }

    pub fn add_log(&mut self, text: &str, important: bool) {
        self.log.push(LogEntry {
            text: text.to_string(),
            important,
        });
        if self.log.len() > MAX_LOG_ENTRIES {
            self.log.remove(0);
        }
    }

    fn log_error(&mut self, err: GameError) {
        self.add_log(&err.to_string(), false);
    }

    fn grant_experience(&mut self, amount: u64) {
        for up in self.player.add_experience(amount) {
            self.eco.earn(up.bonus);
            self.add_log(
                &format!(
                    "🎖️ レベル{}にアップしました！ボーナス {} クッキー獲得！",
                    up.level,
                    format_number(up.bonus)
                ),
                true,
            );
        }
    }

    // ── Master tick ─────────────────────────────────────────────

    /// Advance the simulation by `delta_ticks` discrete ticks.
    pub fn tick(&mut self, delta_ticks: u32) {
        if delta_ticks == 0 {
            return;
        }
        self.now += delta_ticks as Tick;

        for effect in self.eco.expire_effects(self.now) {
            self.add_log(&format!("{}の効果が切れました。", effect.label), false);
        }

        self.eco.accrue(delta_ticks);

        if let Some(done) = self
            .recipes
            .tick_cooking(&self.upgrades, &mut self.inventory, self.now)
        {
            self.on_cook_finished(done);
        }

        for kind in self.recipes.check_unlocks(self.eco.cookies_all_time) {
            self.add_log(
                &format!("新しいレシピ「{}」を発見しました！", kind.name()),
                true,
            );
        }

        self.clock_tick_acc += delta_ticks;
        while self.clock_tick_acc >= TICKS_PER_SEC as u32 {
            self.clock_tick_acc -= TICKS_PER_SEC as u32;
            for event in self.player.clock.advance(TIME_SCALE_MINUTES) {
                self.on_calendar_event(event);
            }
        }

        for order in self.orders.sweep_timeouts(self.now) {
            self.add_log(
                &format!("{}の注文が期限切れになりました！", order.customer),
                true,
            );
        }
        if let Some(order) = self
            .orders
            .run_schedule(&self.recipes, &self.player, &mut self.rng, self.now)
        {
            let special = if order.special { "【特別注文】" } else { "" };
            self.add_log(
                &format!("{}{}から新しい注文が入りました！", special, order.customer),
                true,
            );
        }

        for event in self.suppliers.run_production(&mut self.ingredients, self.now) {
            self.on_contract_event(event);
        }
        for event in self.suppliers.run_maintenance(&mut self.eco, self.now) {
            self.on_contract_event(event);
        }

        match self.market.update(&mut self.rng, self.now) {
            Some(TrendAlert::Boom) => {
                self.add_log("市場が活況です！クッキーの価値が急上昇中！", false)
            }
            Some(TrendAlert::Crash) => {
                self.add_log("市場が急落しています。クッキーの価値が暴落中...", false)
            }
            None => {}
        }
    }

    fn on_cook_finished(&mut self, done: CookFinished) {
        self.add_log(
            &format!(
                "{}が完成しました！{}個のクッキーを獲得！",
                done.kind.name(),
                done.produced
            ),
            false,
        );
        if !done.stored {
            self.add_log("在庫がいっぱいで保存できませんでした！", true);
        }
        self.sales_stats
            .record_production(&self.player.clock, done.kind, done.produced);
        if let Some(effect) = done.effect {
            self.eco.add_effect(
                effect.kind,
                effect.multiplier,
                effect.duration_secs,
                done.kind.name(),
                self.now,
            );
            self.add_log(
                &format!(
                    "{}の特殊効果発動！（{}秒間）",
                    done.kind.name(),
                    effect.duration_secs
                ),
                true,
            );
        }
        self.grant_experience((done.produced as u64).div_ceil(10));
        self.dirty = true;
    }

    fn on_calendar_event(&mut self, event: CalendarEvent) {
        match event {
            CalendarEvent::NewDay { year, month, day } => {
                self.add_log(
                    &format!("📅 {}年 {}月 {}日になりました", year, month, day),
                    false,
                );
            }
            CalendarEvent::NewYear => {
                self.eco.earn(10_000.0);
                self.add_log("🎆 新年おめでとう！特別ボーナス 10,000クッキー獲得！", true);
            }
            CalendarEvent::Noon => {
                self.add_log("🕛 お昼時です！クッキーの需要が増加中...", false);
            }
            CalendarEvent::WeekendSale => {
                self.add_log("🛍️ 週末セール開催中！注文が増えています！", false);
            }
        }
    }

    fn on_contract_event(&mut self, event: ContractEvent) {
        match event {
            ContractEvent::Payment { supplier, amount } => {
                self.add_log(
                    &format!(
                        "{}へ{}クッキーを支払いました。",
                        supplier.name(),
                        format_number(amount)
                    ),
                    false,
                );
            }
            ContractEvent::Terminated { supplier } => {
                self.add_log(
                    &format!(
                        "{}への支払いに失敗しました。契約が打ち切られます。",
                        supplier.name()
                    ),
                    true,
                );
            }
            ContractEvent::Expired { supplier } => {
                self.add_log(
                    &format!("{}との契約が期限切れになりました。", supplier.name()),
                    false,
                );
            }
            ContractEvent::OrderCompleted { supplier, ingredient } => {
                self.add_log(
                    &format!(
                        "{}からの{}発注が完了しました！",
                        supplier.name(),
                        ingredient.name()
                    ),
                    true,
                );
            }
        }
    }

    // ── User commands ───────────────────────────────────────────

    /// Manual click. Occasionally drops a free ingredient.
    pub fn click(&mut self) -> f64 {
        let earned = self.eco.click();
        if self.rng.chance(CLICK_DROP_CHANCE) {
            let unlocked = self.ingredients.unlocked_kinds();
            if let Some(kind) = self.rng.pick(&unlocked).copied() {
                self.ingredients.add(kind, 1);
                self.add_log(
                    &format!("ラッキー！クリックして{}を1個見つけました！", kind.name()),
                    false,
                );
            }
        } else if self.rng.chance(CLICK_FLAVOR_CHANCE) {
            if let Some(message) = self.rng.pick(&CLICK_FLAVOR).copied() {
                self.add_log(message, false);
            }
        }
        earned
    }

    pub fn buy_unit(&mut self, kind: UnitKind) -> Result<UnitPurchase, GameError> {
        match self.production.buy_unit(&mut self.eco, &self.upgrades, kind) {
            Ok(purchase) => {
                self.add_log(
                    &format!(
                        "{}を購入しました！現在{}個所持しています。",
                        kind.name(),
                        purchase.count
                    ),
                    false,
                );
                for (threshold, bonus) in &purchase.milestones {
                    self.add_log(
                        &format!(
                            "すごい！ {}が{}個を達成しました！生産力が{}x倍に向上します！",
                            kind.name(),
                            threshold,
                            bonus
                        ),
                        true,
                    );
                }
                self.dirty = true;
                Ok(purchase)
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn buy_upgrade(&mut self, id: &str) -> Result<(), GameError> {
        match self.upgrades.buy(&mut self.eco, &self.production, id) {
            Ok(_) => {
                self.production.recompute_rates(&mut self.eco, &self.upgrades);
                let name = self.upgrades.find(id).map(|u| u.name).unwrap_or(id);
                self.add_log(&format!("アップグレード「{}」を購入しました！", name), false);
                self.dirty = true;
                Ok(())
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn buy_ingredient(&mut self, kind: IngredientKind, amount: u32) -> Result<(), GameError> {
        match self.ingredients.buy(&mut self.eco, kind, amount) {
            Ok(_) => {
                self.add_log(
                    &format!("{}を{}個購入しました！", kind.name(), amount),
                    false,
                );
                self.dirty = true;
                Ok(())
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn unlock_ingredient(&mut self, kind: IngredientKind) -> Result<(), GameError> {
        match self.ingredients.unlock(&mut self.eco, kind) {
            Ok(()) => {
                self.add_log(
                    &format!("新しい材料「{}」を解禁しました！", kind.name()),
                    true,
                );
                self.dirty = true;
                Ok(())
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn start_cooking(&mut self, kind: RecipeKind) -> Result<(), GameError> {
        match self.recipes.start_cook(&mut self.ingredients, kind, self.now) {
            Ok(_) => {
                self.add_log(&format!("{}の調理を開始しました！", kind.name()), false);
                self.dirty = true;
                Ok(())
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn process_order(&mut self, id: u64, action: OrderAction) -> Result<Order, GameError> {
        let result = self.orders.process_order(
            id,
            action,
            &mut self.inventory,
            &self.recipes,
            &mut self.ingredients,
            &mut self.eco,
            &mut self.sales_stats,
            &self.player.clock,
        );
        match result {
            Ok(OrderOutcome { order, exp }) => {
                if action == OrderAction::Complete {
                    let special = if order.special { "【特別注文】" } else { "" };
                    self.add_log(
                        &format!(
                            "{}{}の注文が完了しました！報酬{}クッキーを獲得！",
                            special,
                            order.customer,
                            format_number(order.reward)
                        ),
                        true,
                    );
                    self.grant_experience(exp);
                } else {
                    self.add_log(
                        &format!("{}の注文をキャンセルしました。", order.customer),
                        false,
                    );
                }
                self.dirty = true;
                Ok(order)
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn sign_contract(
        &mut self,
        supplier: SupplierId,
        tier: ContractTier,
    ) -> Result<SupplierContract, GameError> {
        match self
            .suppliers
            .sign_contract(&self.eco, self.player.level, supplier, tier, self.now)
        {
            Ok(contract) => {
                self.add_log(
                    &format!("{}と{}契約を締結しました！", supplier.name(), tier.name()),
                    true,
                );
                self.dirty = true;
                Ok(contract)
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn sell_cookies(&mut self, amount: f64) -> Result<f64, GameError> {
        match self
            .market
            .sell(&mut self.eco, &mut self.rng, amount, self.now)
        {
            Ok(revenue) => {
                self.add_log(
                    &format!(
                        "{}個のクッキーを売却して{}コインを獲得しました！",
                        format_number(amount),
                        format_number(revenue)
                    ),
                    false,
                );
                self.dirty = true;
                Ok(revenue)
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn buy_market_item(&mut self, item: MarketItemId) -> Result<MarketItemOutcome, GameError> {
        let result = self.market.buy_item(
            &mut self.eco,
            &mut self.recipes,
            &mut self.ingredients,
            &mut self.rng,
            item,
        );
        match result {
            Ok(outcome) => {
                // Permanent multipliers may have changed.
                self.production.recompute_rates(&mut self.eco, &self.upgrades);
                match &outcome {
                    MarketItemOutcome::RecipeUnlocked(kind) => self.add_log(
                        &format!(
                            "古代のレシピ本から「{}」のレシピを発見しました！",
                            kind.name()
                        ),
                        true,
                    ),
                    MarketItemOutcome::IngredientsGranted(kind, amount) => self.add_log(
                        &format!(
                            "材料パッケージから{}を{}個獲得しました！",
                            kind.name(),
                            amount
                        ),
                        false,
                    ),
                    MarketItemOutcome::Applied => {
                        self.add_log(&format!("{}を購入しました！", item.name()), true)
                    }
                }
                self.dirty = true;
                Ok(outcome)
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    pub fn upgrade_storage(&mut self) -> Result<u32, GameError> {
        match self.inventory.upgrade_storage(&mut self.eco) {
            Ok(level) => {
                self.add_log(
                    &format!(
                        "保管容量がアップグレードされました！新しい容量: {}",
                        self.inventory.max_total()
                    ),
                    true,
                );
                self.dirty = true;
                Ok(level)
            }
            Err(err) => {
                self.log_error(err);
                Err(err)
            }
        }
    }

    /// Session-start login bookkeeping; `today` is an epoch-day number.
    pub fn check_login(&mut self, today: u32) -> LoginReward {
        let reward = self.player.check_login(today);
        match &reward {
            LoginReward::First { bonus } => {
                self.eco.earn(*bonus);
                self.add_log(
                    "🎉 初めてのログインです！ボーナスとして500クッキーを獲得しました！",
                    true,
                );
                self.dirty = true;
            }
            LoginReward::SameDay => {}
            LoginReward::Streak {
                streak,
                bonus,
                weekly_bonus,
            } => {
                self.eco.earn(*bonus);
                if let Some(weekly) = weekly_bonus {
                    self.eco.earn(*weekly);
                    self.add_log(
                        &format!(
                            "🎊 {}日連続ログイン達成！特別ボーナス {} クッキー獲得！",
                            streak,
                            format_number(*weekly)
                        ),
                        true,
                    );
                } else {
                    self.add_log(
                        &format!(
                            "✨ {}日連続ログイン！ボーナス {} クッキー獲得！",
                            streak,
                            format_number(*bonus)
                        ),
                        true,
                    );
                }
                self.dirty = true;
            }
            LoginReward::Reset { ended_streak, bonus } => {
                if *ended_streak > 1 {
                    self.add_log(
                        &format!(
                            "連続ログインが途切れました。{}日間お疲れ様でした！",
                            ended_streak
                        ),
                        true,
                    );
                }
                self.eco.earn(*bonus);
                self.add_log("ログインボーナス 100クッキー獲得！", true);
                self.dirty = true;
            }
        }
        reward
    }

    /// Throw everything away and start over. In-flight deadlines die with
    /// the discarded state.
    pub fn reset(&mut self) {
        let seed = self.rng.next_u32();
        *self = Game::new(seed);
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Game {
        Game::new(2024)
    }

    #[test]
    fn click_earns_and_counts() {
        let mut g = game();
        let earned = g.click();
        assert!((earned - 1.0).abs() < 0.001);
        assert_eq!(g.eco.total_clicks, 1);
    }

    #[test]
    fn tick_accrues_passive_production() {
        let mut g = game();
        g.eco.cookies = 1_000.0;
        g.buy_unit(UnitKind::Grandma).unwrap();
        let before = g.eco.cookies;
        g.tick(TICKS_PER_SEC as u32 * 10);
        // One grandma ≈ 1 cps for 10 seconds.
        assert!(g.eco.cookies > before + 9.0);
    }

    #[test]
    fn tick_order_is_stable_across_runs() {
        let mut a = game();
        let mut b = game();
        for g in [&mut a, &mut b] {
            g.eco.earn(50_000.0);
            g.buy_unit(UnitKind::Factory).unwrap();
            for _ in 0..600 {
                g.tick(10);
            }
        }
        assert_eq!(a.eco.cookies, b.eco.cookies);
        assert_eq!(a.orders.active.len(), b.orders.active.len());
        assert_eq!(a.market.price, b.market.price);
    }

    #[test]
    fn cooking_pipeline_end_to_end() {
        let mut g = game();
        g.eco.cookies = 1_000.0;
        g.buy_ingredient(IngredientKind::Flour, 2).unwrap();
        g.buy_ingredient(IngredientKind::Sugar, 2).unwrap();
        g.buy_ingredient(IngredientKind::Butter, 2).unwrap();
        g.start_cooking(RecipeKind::Plain).unwrap();
        assert!(g.recipes.is_cooking());
        g.tick(5 * TICKS_PER_SEC as u32);
        assert!(!g.recipes.is_cooking());
        assert_eq!(g.inventory.amount(RecipeKind::Plain), 3);
        // Production recorded in today's stats.
        let today = g.sales_stats.today(&g.player.clock).unwrap();
        assert_eq!(today.production[&RecipeKind::Plain], 3);
    }

    #[test]
    fn special_effect_applies_and_expires() {
        let mut g = game();
        g.eco.earn(5_000.0);
        g.tick(1);
        assert!(g.recipes.get(RecipeKind::Matcha).unlocked);
        for kind in [
            IngredientKind::Flour,
            IngredientKind::Sugar,
            IngredientKind::Butter,
            IngredientKind::Matcha,
        ] {
            g.ingredients.get_mut(kind).amount = 10;
            g.ingredients.get_mut(kind).unlocked = true;
        }
        g.start_cooking(RecipeKind::Matcha).unwrap();
        g.tick(15 * TICKS_PER_SEC as u32);
        assert_eq!(g.eco.active_effects.len(), 1);
        assert!((g.eco.production_effect_factor() - 1.1).abs() < 0.001);
        // 60 second effect.
        g.tick(60 * TICKS_PER_SEC as u32);
        assert!(g.eco.active_effects.is_empty());
        assert!((g.eco.production_effect_factor() - 1.0).abs() < 0.001);
    }

    #[test]
    fn recipe_unlocks_notify_once() {
        let mut g = game();
        g.eco.earn(60.0);
        g.tick(1);
        assert!(g.recipes.get(RecipeKind::ChocolateChip).unlocked);
        let count = g
            .log
            .iter()
            .filter(|e| e.text.contains("チョコチップクッキー"))
            .count();
        g.tick(10);
        let count_after = g
            .log
            .iter()
            .filter(|e| e.text.contains("チョコチップクッキー"))
            .count();
        assert_eq!(count, count_after);
    }

    #[test]
    fn orders_appear_over_time() {
        let mut g = game();
        // The first generation deadline is tick 0, so the very first
        // tick produces an order.
        g.tick(1);
        assert_eq!(g.orders.active.len(), 1);
    }

    #[test]
    fn new_year_bonus_credited() {
        let mut g = game();
        // A full in-game year: 360 days × 24h at 10 in-game min/sec
        // = 51,840 seconds of ticks.
        let seconds_per_year = 360 * 24 * 6;
        for _ in 0..seconds_per_year / 60 {
            g.tick(60 * TICKS_PER_SEC as u32);
        }
        assert_eq!(g.player.clock.year, 2);
        assert!(g.log.iter().any(|e| e.text.contains("新年おめでとう")));
    }

    #[test]
    fn failed_command_logs_notification() {
        let mut g = game();
        let err = g.buy_unit(UnitKind::Factory);
        assert_eq!(err.unwrap_err(), GameError::InsufficientFunds);
        assert!(g.log.iter().any(|e| e.text == "クッキーが足りません！"));
    }

    #[test]
    fn reset_reinitializes_state() {
        let mut g = game();
        g.eco.earn(10_000.0);
        g.buy_unit(UnitKind::Cursor).unwrap();
        g.reset();
        assert!(g.eco.cookies.abs() < f64::EPSILON);
        assert_eq!(g.production.unit(UnitKind::Cursor).count, 0);
        assert_eq!(g.now, 0);
        assert!(g.orders.active.is_empty());
    }

    #[test]
    fn log_is_capped() {
        let mut g = game();
        for i in 0..100 {
            g.add_log(&format!("msg {}", i), false);
        }
        assert_eq!(g.log.len(), MAX_LOG_ENTRIES);
    }

    #[test]
    fn level_up_bonus_flows_into_economy() {
        let mut g = game();
        g.grant_experience(100);
        assert_eq!(g.player.level, 2);
        assert!((g.eco.cookies - 2_000.0).abs() < 0.001);
    }
}
