//! Property tests for the simulation core's algebraic invariants.

use proptest::prelude::*;

use sweet_success::economy::EconomyState;
use sweet_success::game::Game;
use sweet_success::inventory::CookieInventory;
use sweet_success::market::{MarketState, PRICE_CEILING, PRICE_FLOOR};
use sweet_success::orders::OrderAction;
use sweet_success::player::PlayerProgress;
use sweet_success::recipes::RecipeKind;
use sweet_success::rng::GameRng;
use sweet_success::units::{ProductionEngine, UnitKind};
use sweet_success::upgrades::Upgrades;

// ── Strategy helpers ──────────────────────────────────

fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
    prop_oneof![
        Just(UnitKind::Cursor),
        Just(UnitKind::Grandma),
        Just(UnitKind::Factory),
    ]
}

fn arb_recipe_kind() -> impl Strategy<Value = RecipeKind> {
    prop_oneof![
        Just(RecipeKind::Plain),
        Just(RecipeKind::ChocolateChip),
        Just(RecipeKind::Almond),
        Just(RecipeKind::Coconut),
        Just(RecipeKind::Matcha),
        Just(RecipeKind::Strawberry),
        Just(RecipeKind::DoubleChocolate),
        Just(RecipeKind::Royal),
    ]
}

// ── Unit cost curve ───────────────────────────────────

proptest! {
    #[test]
    fn prop_cost_matches_geometric_formula(
        kind in arb_unit_kind(),
        count in 0u32..200,
    ) {
        let mut engine = ProductionEngine::new();
        engine.unit_mut(kind).count = count;
        let expected = (kind.base_cost() * 1.15f64.powi(count as i32)).ceil();
        prop_assert_eq!(engine.unit(kind).cost(), expected);
    }

    #[test]
    fn prop_cost_strictly_increases(
        kind in arb_unit_kind(),
        count in 0u32..199,
    ) {
        let mut engine = ProductionEngine::new();
        engine.unit_mut(kind).count = count;
        let before = engine.unit(kind).cost();
        engine.unit_mut(kind).count = count + 1;
        prop_assert!(engine.unit(kind).cost() > before);
    }
}

// ── Recompute idempotence ─────────────────────────────

proptest! {
    #[test]
    fn prop_recompute_is_idempotent(
        purchases in proptest::collection::vec(arb_unit_kind(), 0..60),
    ) {
        let mut engine = ProductionEngine::new();
        let mut eco = EconomyState::new();
        let upgrades = Upgrades::new();
        eco.cookies = 1e15;
        for kind in purchases {
            engine.buy_unit(&mut eco, &upgrades, kind).unwrap();
        }
        engine.recompute_rates(&mut eco, &upgrades);
        let rate = eco.total_production_rate;
        let click = eco.per_click_yield;
        let unit_rates: Vec<f64> = engine.units.iter().map(|u| u.effective_rate).collect();
        engine.recompute_rates(&mut eco, &upgrades);
        prop_assert_eq!(rate, eco.total_production_rate);
        prop_assert_eq!(click, eco.per_click_yield);
        let again: Vec<f64> = engine.units.iter().map(|u| u.effective_rate).collect();
        prop_assert_eq!(unit_rates, again);
    }
}

// ── Milestones fire once per threshold ────────────────

proptest! {
    #[test]
    fn prop_milestones_fire_once(
        kind in arb_unit_kind(),
        total in 1u32..120,
    ) {
        let mut engine = ProductionEngine::new();
        let mut eco = EconomyState::new();
        let upgrades = Upgrades::new();
        eco.cookies = 1e18;
        let mut crossings = 0usize;
        for _ in 0..total {
            let purchase = engine.buy_unit(&mut eco, &upgrades, kind).unwrap();
            crossings += purchase.milestones.len();
        }
        // Thresholds at or below the final count, each exactly once.
        let expected = [10u32, 25, 50, 100, 200, 500]
            .iter()
            .filter(|t| **t <= total)
            .count();
        prop_assert_eq!(crossings, expected);
    }
}

// ── Inventory capacity invariants ─────────────────────

proptest! {
    #[test]
    fn prop_inventory_never_exceeds_caps(
        ops in proptest::collection::vec((arb_recipe_kind(), 1u32..80, any::<bool>()), 1..60),
    ) {
        let mut inventory = CookieInventory::new();
        for (kind, amount, is_add) in ops {
            if is_add {
                inventory.add(kind, amount);
            } else {
                inventory.remove(kind, amount);
            }
            prop_assert!(inventory.total_stock() <= inventory.max_total());
            for (_, stock) in inventory.iter() {
                prop_assert!(stock <= inventory.max_per_type());
            }
        }
    }

    #[test]
    fn prop_rejected_add_leaves_stock_unchanged(
        kind in arb_recipe_kind(),
        preload in 0u32..=50,
        amount in 1u32..200,
    ) {
        let mut inventory = CookieInventory::new();
        inventory.add(kind, preload);
        let before: Vec<_> = inventory.iter().collect();
        let accepted = inventory.add(kind, amount);
        if !accepted {
            prop_assert_eq!(before, inventory.iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn prop_consume_batch_atomic(
        have_a in 0u32..20,
        have_b in 0u32..20,
        want_a in 1u32..20,
        want_b in 1u32..20,
    ) {
        let mut inventory = CookieInventory::new();
        inventory.add(RecipeKind::Plain, have_a);
        inventory.add(RecipeKind::Royal, have_b);
        let items = [(RecipeKind::Plain, want_a), (RecipeKind::Royal, want_b)];
        let ok = inventory.consume_batch(&items);
        if ok {
            prop_assert_eq!(inventory.amount(RecipeKind::Plain), have_a - want_a);
            prop_assert_eq!(inventory.amount(RecipeKind::Royal), have_b - want_b);
        } else {
            // No partial deduction is ever observable.
            prop_assert_eq!(inventory.amount(RecipeKind::Plain), have_a);
            prop_assert_eq!(inventory.amount(RecipeKind::Royal), have_b);
        }
    }
}

// ── Market price bounds ───────────────────────────────

proptest! {
    #[test]
    fn prop_market_price_always_clamped(seed in 1u32..10_000) {
        let mut market = MarketState::new();
        let mut rng = GameRng::new(seed);
        let mut now = 0;
        for _ in 0..10_000 {
            market.update(&mut rng, now);
            prop_assert!((PRICE_FLOOR..=PRICE_CEILING).contains(&market.price));
            now += 50;
        }
    }

    #[test]
    fn prop_market_sell_conserves_value(
        seed in 1u32..1_000,
        amount in 1u32..5_000,
    ) {
        let mut market = MarketState::new();
        let mut eco = EconomyState::new();
        let mut rng = GameRng::new(seed);
        eco.cookies = 1e9;
        let price = market.price;
        let revenue = market.sell(&mut eco, &mut rng, amount as f64, 1).unwrap();
        prop_assert_eq!(revenue, (amount as f64 * price).floor());
        prop_assert_eq!(market.currency, revenue);
    }
}

// ── Economy invariant: balance never negative ─────────

proptest! {
    #[test]
    fn prop_cookies_never_negative_under_random_play(
        seed in 1u32..5_000,
        script in proptest::collection::vec(0u8..6, 1..80),
    ) {
        let mut game = Game::new(seed);
        for op in script {
            match op {
                0 => {
                    game.click();
                }
                1 => {
                    let _ = game.buy_unit(UnitKind::Cursor);
                }
                2 => {
                    let _ = game.buy_unit(UnitKind::Grandma);
                }
                3 => {
                    let _ = game.start_cooking(RecipeKind::Plain);
                }
                4 => {
                    let _ = game.sell_cookies(10.0);
                }
                _ => game.tick(25),
            }
            prop_assert!(game.eco.cookies >= 0.0);
        }
    }
}

// ── Login streak transitions ──────────────────────────

proptest! {
    #[test]
    fn prop_login_streak_counts_consecutive_days(days in 2u32..40) {
        let mut player = PlayerProgress::new();
        player.check_login(10_000);
        for d in 1..days {
            player.check_login(10_000 + d);
        }
        prop_assert_eq!(player.login_streak, days);
        prop_assert_eq!(player.total_logins, days);
    }

    #[test]
    fn prop_login_gap_resets_to_one(gap in 2u32..400) {
        let mut player = PlayerProgress::new();
        player.check_login(10_000);
        player.check_login(10_001);
        player.check_login(10_001 + gap);
        prop_assert_eq!(player.login_streak, 1);
    }
}

// ── Order state machine ───────────────────────────────

proptest! {
    #[test]
    fn prop_orders_reach_exactly_one_terminal_state(seed in 1u32..2_000) {
        let mut game = Game::new(seed);
        game.eco.earn(1_000.0);
        let mut terminal = 0u64;
        for _ in 0..400 {
            game.tick(10);
            // Randomly reject the first order sometimes.
            if game.now % 70 == 0 {
                if let Some(id) = game.orders.active.first().map(|o| o.id) {
                    if game.process_order(id, OrderAction::Reject).is_ok() {
                        terminal += 1;
                    }
                }
            }
        }
        let stats = &game.orders.stats;
        // Every terminal transition is counted exactly once.
        prop_assert!(stats.completed + stats.rejected >= terminal);
        // Active orders are all genuinely active.
        for order in &game.orders.active {
            prop_assert_eq!(order.status, sweet_success::orders::OrderStatus::Active);
            prop_assert!(order.expires_at + 10 >= game.now);
        }
    }
}
