//! セーブ/ロード機能。
//!
//! ## バージョニング方針
//!
//! - `SAVE_VERSION`: 現在のセーブ形式バージョン。フィールド追加時にインクリメントする。
//! - `MIN_COMPATIBLE_VERSION`: 互換性を維持できる最小バージョン。
//!   新フィールドの追加のみの場合はこの値を変えない（旧データを維持できる）。
//!   既存フィールドの意味変更や削除など破壊的変更を行った場合のみインクリメントする。
//!
//! セーブは論理ドメインごとに別キーで保存する。ロードはキー単位の
//! ベストエフォート方式: キーが欠けている・壊れている場合は、その
//! ドメインだけ初期値に戻し、他のドメインはそのまま読み込む。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::economy::ActiveEffect;
use crate::game::Game;
use crate::orders::{Order, OrderStatus};
use crate::player::GameClock;
use crate::recipes::{CookingSlot, RecipeKind};
use crate::stats::SalesStats;
use crate::suppliers::{ContractTier, SupplierContract, SupplierId};
use crate::Tick;

const SAVE_VERSION: u32 = 1;
const MIN_COMPATIBLE_VERSION: u32 = 1;

const KEY_CORE: &str = "sweet_success_core";
const KEY_INGREDIENTS: &str = "sweet_success_ingredients";
const KEY_RECIPES: &str = "sweet_success_recipes";
const KEY_INVENTORY: &str = "sweet_success_inventory";
const KEY_ORDERS: &str = "sweet_success_orders";
const KEY_SUPPLIERS: &str = "sweet_success_suppliers";
const KEY_PLAYER: &str = "sweet_success_player";
const KEY_STATS: &str = "sweet_success_stats";

const ALL_KEYS: [&str; 8] = [
    KEY_CORE,
    KEY_INGREDIENTS,
    KEY_RECIPES,
    KEY_INVENTORY,
    KEY_ORDERS,
    KEY_SUPPLIERS,
    KEY_PLAYER,
    KEY_STATS,
];

/// Opaque key-value persistence service. The browser build talks to
/// localStorage; native builds and tests use an in-memory map.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    map: std::collections::BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

/// localStorage バックエンド。WASM 環境でのみ動作。
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

#[cfg(target_arch = "wasm32")]
impl KvStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            if let Err(e) = storage.set_item(key, value) {
                web_sys::console::warn_1(
                    &format!("Sweet Success: localStorage への保存に失敗: {e:?}").into(),
                );
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

// ── Save structs (one per domain key) ───────────────────────────

fn one() -> f64 {
    1.0
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct CoreSave {
    version: u32,
    now: Tick,
    cookies: f64,
    cookies_all_time: f64,
    cookies_from_clicks: f64,
    cookies_from_units: f64,
    total_clicks: u64,
    #[serde(default = "one")]
    click_multiplier: f64,
    #[serde(default = "one")]
    cps_multiplier: f64,
    #[serde(default = "one")]
    global_multiplier: f64,
    active_effects: Vec<ActiveEffect>,
    /// `(count, milestone_level)` per unit, in `UnitKind::all()` order.
    units: Vec<(u32, usize)>,
    /// Purchase flags in catalog order.
    upgrades_purchased: Vec<bool>,
    rng_state: u32,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct IngredientsSave {
    version: u32,
    /// `(amount, unlocked)` in `IngredientKind::all()` order.
    items: Vec<(u32, bool)>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct RecipesSave {
    version: u32,
    unlocked: Vec<bool>,
    cook_times: Vec<u64>,
    /// `(recipe index, started_at, ends_at)`.
    cooking: Option<(usize, Tick, Tick)>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct InventorySave {
    version: u32,
    /// `(recipe index, amount)`.
    stock: Vec<(usize, u32)>,
    storage_level: u32,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct OrderSave {
    id: u64,
    customer: String,
    items: Vec<(usize, u32)>,
    created_at: Tick,
    expires_at: Tick,
    reward: f64,
    special: bool,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct OrdersSave {
    version: u32,
    active: Vec<OrderSave>,
    completed: u64,
    rejected: u64,
    total_revenue: f64,
    recipe_sales: Vec<(usize, u64)>,
    min_items: u32,
    max_items: u32,
    min_quantity: u32,
    max_quantity: u32,
    base_time_limit_secs: f64,
    time_limit_variance_secs: f64,
    base_reward_multiplier: f64,
    next_generation_at: Tick,
    next_order_id: u64,
    jit_cooking: bool,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct ContractSave {
    supplier: usize,
    /// 0 = daily, 1 = weekly, 2 = monthly.
    tier: u8,
    start: Tick,
    end: Tick,
    next_payment: Tick,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct IngredientOrderSave {
    id: u64,
    supplier: usize,
    amount: u32,
    delivered: u32,
    completed: bool,
    created_at: Tick,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct SuppliersSave {
    version: u32,
    contracts: Vec<ContractSave>,
    orders: Vec<IngredientOrderSave>,
    next_order_id: u64,
    next_production_at: Tick,
    next_maintenance_at: Tick,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct PlayerSave {
    version: u32,
    name: String,
    level: u32,
    experience: u64,
    experience_to_next: u64,
    login_streak: u32,
    total_logins: u32,
    first_login_day: Option<u32>,
    last_login_day: Option<u32>,
    clock: Option<GameClock>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct StatsSave {
    version: u32,
    stats: SalesStats,
}

// ── Extract ─────────────────────────────────────────────────────

fn extract_core(game: &Game) -> CoreSave {
    CoreSave {
        version: SAVE_VERSION,
        now: game.now,
        cookies: game.eco.cookies,
        cookies_all_time: game.eco.cookies_all_time,
        cookies_from_clicks: game.eco.cookies_from_clicks,
        cookies_from_units: game.eco.cookies_from_units,
        total_clicks: game.eco.total_clicks,
        click_multiplier: game.eco.click_multiplier,
        cps_multiplier: game.eco.cps_multiplier,
        global_multiplier: game.eco.global_multiplier,
        active_effects: game.eco.active_effects.clone(),
        units: game
            .production
            .units
            .iter()
            .map(|u| (u.count, u.milestone_level))
            .collect(),
        upgrades_purchased: game.upgrades.list.iter().map(|u| u.purchased).collect(),
        rng_state: game.rng.state(),
    }
}

fn extract_orders(game: &Game) -> OrdersSave {
    let d = &game.orders.difficulty;
    OrdersSave {
        version: SAVE_VERSION,
        active: game
            .orders
            .active
            .iter()
            .map(|o| OrderSave {
                id: o.id,
                customer: o.customer.clone(),
                items: o.items.iter().map(|(k, q)| (k.index(), *q)).collect(),
                created_at: o.created_at,
                expires_at: o.expires_at,
                reward: o.reward,
                special: o.special,
            })
            .collect(),
        completed: game.orders.stats.completed,
        rejected: game.orders.stats.rejected,
        total_revenue: game.orders.stats.total_revenue,
        recipe_sales: game
            .orders
            .stats
            .recipe_sales
            .iter()
            .map(|(k, n)| (k.index(), *n))
            .collect(),
        min_items: d.min_items,
        max_items: d.max_items,
        min_quantity: d.min_quantity,
        max_quantity: d.max_quantity,
        base_time_limit_secs: d.base_time_limit_secs,
        time_limit_variance_secs: d.time_limit_variance_secs,
        base_reward_multiplier: d.base_reward_multiplier,
        next_generation_at: game.orders.next_generation_at,
        next_order_id: game.orders.next_order_id,
        jit_cooking: game.orders.jit_cooking,
    }
}

fn extract_suppliers(game: &Game) -> SuppliersSave {
    SuppliersSave {
        version: SAVE_VERSION,
        contracts: game
            .suppliers
            .contracts
            .iter()
            .map(|c| ContractSave {
                supplier: c.supplier.index(),
                tier: tier_to_index(c.tier),
                start: c.start,
                end: c.end,
                next_payment: c.next_payment,
            })
            .collect(),
        orders: game
            .suppliers
            .orders
            .iter()
            .map(|o| IngredientOrderSave {
                id: o.id,
                supplier: o.supplier.index(),
                amount: o.amount,
                delivered: o.delivered,
                completed: o.completed,
                created_at: o.created_at,
            })
            .collect(),
        next_order_id: game.suppliers.next_order_id,
        next_production_at: game.suppliers.next_production_at,
        next_maintenance_at: game.suppliers.next_maintenance_at,
    }
}

// ── Apply ───────────────────────────────────────────────────────

fn recipe_kind_from_index(idx: usize) -> Option<RecipeKind> {
    RecipeKind::all().get(idx).copied()
}

fn supplier_from_index(idx: usize) -> Option<SupplierId> {
    SupplierId::all().get(idx).copied()
}

fn tier_to_index(tier: ContractTier) -> u8 {
    match tier {
        ContractTier::Daily => 0,
        ContractTier::Weekly => 1,
        ContractTier::Monthly => 2,
    }
}

fn tier_from_index(idx: u8) -> ContractTier {
    match idx {
        1 => ContractTier::Weekly,
        2 => ContractTier::Monthly,
        _ => ContractTier::Daily,
    }
}

/// 定義の個数が合わない場合は無視して初期データの方を使う。
fn apply_core(game: &mut Game, save: &CoreSave) {
    game.now = save.now;
    game.eco.cookies = save.cookies;
    game.eco.cookies_all_time = save.cookies_all_time;
    game.eco.cookies_from_clicks = save.cookies_from_clicks;
    game.eco.cookies_from_units = save.cookies_from_units;
    game.eco.total_clicks = save.total_clicks;
    game.eco.click_multiplier = save.click_multiplier;
    game.eco.cps_multiplier = save.cps_multiplier;
    game.eco.global_multiplier = save.global_multiplier;
    game.eco.active_effects = save.active_effects.clone();

    for (i, (count, milestone_level)) in save.units.iter().enumerate() {
        if let Some(unit) = game.production.units.get_mut(i) {
            unit.count = *count;
            unit.milestone_level = *milestone_level;
        }
    }
    for (i, &purchased) in save.upgrades_purchased.iter().enumerate() {
        if let Some(upgrade) = game.upgrades.list.get_mut(i) {
            upgrade.purchased = purchased;
        }
    }
    game.rng = crate::rng::GameRng::new(save.rng_state);
}

fn apply_ingredients(game: &mut Game, save: &IngredientsSave) {
    for (i, (amount, unlocked)) in save.items.iter().enumerate() {
        if let Some(item) = game.ingredients.items.get_mut(i) {
            item.amount = *amount;
            item.unlocked = *unlocked;
        }
    }
}

fn apply_recipes(game: &mut Game, save: &RecipesSave) {
    for (i, &unlocked) in save.unlocked.iter().enumerate() {
        if let Some(recipe) = game.recipes.recipes.get_mut(i) {
            recipe.unlocked = unlocked;
        }
    }
    for (i, &cook_time) in save.cook_times.iter().enumerate() {
        if let Some(recipe) = game.recipes.recipes.get_mut(i) {
            if cook_time > 0 {
                recipe.cook_time_secs = cook_time;
            }
        }
    }
    if let Some((idx, started_at, ends_at)) = save.cooking {
        if let Some(kind) = recipe_kind_from_index(idx) {
            game.recipes.cooking = CookingSlot {
                recipe: Some(kind),
                started_at,
                ends_at,
            };
        }
    }
}

fn apply_inventory(game: &mut Game, save: &InventorySave) {
    if save.storage_level > 0 {
        game.inventory.storage_level = save.storage_level;
    }
    for (idx, amount) in &save.stock {
        if let Some(kind) = recipe_kind_from_index(*idx) {
            game.inventory.add(kind, *amount);
        }
    }
}

fn apply_orders(game: &mut Game, save: &OrdersSave) {
    game.orders.active = save
        .active
        .iter()
        .filter_map(|o| {
            let items: Vec<(RecipeKind, u32)> = o
                .items
                .iter()
                .filter_map(|(idx, q)| Some((recipe_kind_from_index(*idx)?, *q)))
                .collect();
            if items.is_empty() {
                return None;
            }
            Some(Order {
                id: o.id,
                customer: o.customer.clone(),
                items,
                created_at: o.created_at,
                expires_at: o.expires_at,
                reward: o.reward,
                special: o.special,
                status: OrderStatus::Active,
            })
        })
        .collect();
    game.orders.stats.completed = save.completed;
    game.orders.stats.rejected = save.rejected;
    game.orders.stats.total_revenue = save.total_revenue;
    game.orders.stats.recipe_sales = save
        .recipe_sales
        .iter()
        .filter_map(|(idx, n)| Some((recipe_kind_from_index(*idx)?, *n)))
        .collect();
    // Re-derive the argmax instead of trusting the save.
    if let Some((kind, count)) = game
        .orders
        .stats
        .recipe_sales
        .iter()
        .max_by_key(|(_, n)| **n)
        .map(|(k, n)| (*k, *n))
    {
        game.orders.stats.best_selling = Some(kind);
        game.orders.stats.best_selling_count = count;
    }
    let d = &mut game.orders.difficulty;
    if save.max_items > 0 {
        d.min_items = save.min_items;
        d.max_items = save.max_items;
        d.min_quantity = save.min_quantity;
        d.max_quantity = save.max_quantity;
        d.base_time_limit_secs = save.base_time_limit_secs;
        d.time_limit_variance_secs = save.time_limit_variance_secs;
        d.base_reward_multiplier = save.base_reward_multiplier;
    }
    game.orders.next_generation_at = save.next_generation_at;
    game.orders.next_order_id = save.next_order_id.max(1);
    game.orders.jit_cooking = save.jit_cooking;
}

fn apply_suppliers(game: &mut Game, save: &SuppliersSave) {
    game.suppliers.contracts = save
        .contracts
        .iter()
        .filter_map(|c| {
            Some(SupplierContract {
                supplier: supplier_from_index(c.supplier)?,
                tier: tier_from_index(c.tier),
                start: c.start,
                end: c.end,
                next_payment: c.next_payment,
            })
        })
        .collect();
    game.suppliers.orders = save
        .orders
        .iter()
        .filter_map(|o| {
            let supplier = supplier_from_index(o.supplier)?;
            Some(crate::suppliers::IngredientOrder {
                id: o.id,
                supplier,
                ingredient: supplier.ingredient(),
                amount: o.amount,
                delivered: o.delivered,
                completed: o.completed,
                created_at: o.created_at,
            })
        })
        .collect();
    game.suppliers.next_order_id = save.next_order_id.max(1);
    game.suppliers.next_production_at = save.next_production_at;
    game.suppliers.next_maintenance_at = save.next_maintenance_at;
}

fn apply_player(game: &mut Game, save: &PlayerSave) {
    if !save.name.is_empty() {
        game.player.name = save.name.clone();
    }
    game.player.level = save.level.max(1);
    game.player.experience = save.experience;
    game.player.experience_to_next = save.experience_to_next.max(100);
    game.player.login_streak = save.login_streak;
    game.player.total_logins = save.total_logins;
    game.player.first_login_day = save.first_login_day;
    game.player.last_login_day = save.last_login_day;
    if let Some(clock) = &save.clock {
        game.player.clock = clock.clone();
    }
}

// ── Entry points ────────────────────────────────────────────────

fn put<T: Serialize>(store: &mut dyn KvStore, key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        store.set(key, &json);
    }
}

/// 壊れたキーは None として扱う（そのドメインだけ初期化される）。
fn read<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Option<T> {
    serde_json::from_str(&store.get(key)?).ok()
}

fn compatible(version: u32) -> bool {
    version >= MIN_COMPATIBLE_VERSION
}

/// Write every domain under its own key (write-through saves).
pub fn save_game(game: &Game, store: &mut dyn KvStore) {
    put(store, KEY_CORE, &extract_core(game));
    put(
        store,
        KEY_INGREDIENTS,
        &IngredientsSave {
            version: SAVE_VERSION,
            items: game
                .ingredients
                .items
                .iter()
                .map(|i| (i.amount, i.unlocked))
                .collect(),
        },
    );
    put(
        store,
        KEY_RECIPES,
        &RecipesSave {
            version: SAVE_VERSION,
            unlocked: game.recipes.recipes.iter().map(|r| r.unlocked).collect(),
            cook_times: game
                .recipes
                .recipes
                .iter()
                .map(|r| r.cook_time_secs)
                .collect(),
            cooking: game.recipes.cooking.recipe.map(|kind| {
                (
                    kind.index(),
                    game.recipes.cooking.started_at,
                    game.recipes.cooking.ends_at,
                )
            }),
        },
    );
    put(
        store,
        KEY_INVENTORY,
        &InventorySave {
            version: SAVE_VERSION,
            stock: game
                .inventory
                .iter()
                .map(|(kind, amount)| (kind.index(), amount))
                .collect(),
            storage_level: game.inventory.storage_level,
        },
    );
    put(store, KEY_ORDERS, &extract_orders(game));
    put(store, KEY_SUPPLIERS, &extract_suppliers(game));
    put(
        store,
        KEY_PLAYER,
        &PlayerSave {
            version: SAVE_VERSION,
            name: game.player.name.clone(),
            level: game.player.level,
            experience: game.player.experience,
            experience_to_next: game.player.experience_to_next,
            login_streak: game.player.login_streak,
            total_logins: game.player.total_logins,
            first_login_day: game.player.first_login_day,
            last_login_day: game.player.last_login_day,
            clock: Some(game.player.clock.clone()),
        },
    );
    put(
        store,
        KEY_STATS,
        &StatsSave {
            version: SAVE_VERSION,
            stats: game.sales_stats.clone(),
        },
    );
}

/// Rebuild a game from the store. Missing or malformed domains fall back
/// to their initial state; nothing aborts the load.
pub fn load_game(store: &dyn KvStore, fallback_seed: u32) -> Game {
    let core: Option<CoreSave> = read(store, KEY_CORE).filter(|c: &CoreSave| compatible(c.version));
    let seed = core.as_ref().map(|c| c.rng_state).unwrap_or(fallback_seed);
    let mut game = Game::new(seed);

    if let Some(core) = &core {
        apply_core(&mut game, core);
    }
    if let Some(save) = read::<IngredientsSave>(store, KEY_INGREDIENTS) {
        if compatible(save.version) {
            apply_ingredients(&mut game, &save);
        }
    }
    if let Some(save) = read::<RecipesSave>(store, KEY_RECIPES) {
        if compatible(save.version) {
            apply_recipes(&mut game, &save);
        }
    }
    if let Some(save) = read::<InventorySave>(store, KEY_INVENTORY) {
        if compatible(save.version) {
            apply_inventory(&mut game, &save);
        }
    }
    if let Some(save) = read::<OrdersSave>(store, KEY_ORDERS) {
        if compatible(save.version) {
            apply_orders(&mut game, &save);
        }
    }
    if let Some(save) = read::<SuppliersSave>(store, KEY_SUPPLIERS) {
        if compatible(save.version) {
            apply_suppliers(&mut game, &save);
        }
    }
    if let Some(save) = read::<PlayerSave>(store, KEY_PLAYER) {
        if compatible(save.version) {
            apply_player(&mut game, &save);
        }
    }
    if let Some(save) = read::<StatsSave>(store, KEY_STATS) {
        if compatible(save.version) {
            game.sales_stats = save.stats;
        }
    }

    // Rates are derived state; rebuild them from the restored flags.
    game.production
        .recompute_rates(&mut game.eco, &game.upgrades);
    game.add_log("セーブデータを読み込みました", false);
    game
}

/// Remove every save key (game reset).
pub fn clear_save(store: &mut dyn KvStore) {
    for key in ALL_KEYS {
        store.remove(key);
    }
}
