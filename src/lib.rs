//! Sweet Success — クッキーベーカリー経営ゲームのコアシミュレーション。
//!
//! The engine is pure, deterministic and headless: rendering, input and
//! the page itself are external collaborators. Time is a fixed-timestep
//! tick (10 ticks per real second); every timed behavior is an absolute
//! tick deadline checked during [`Game::tick`], so simulation state
//! survives serialization.

pub mod economy;
pub mod error;
pub mod game;
pub mod ingredients;
pub mod inventory;
pub mod market;
pub mod orders;
pub mod player;
pub mod recipes;
pub mod rng;
pub mod save;
pub mod stats;
pub mod suppliers;
pub mod units;
pub mod upgrades;

mod simulator;

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Discrete simulation time. 10 ticks per real second.
pub type Tick = u64;

/// Simulation tick rate.
pub const TICKS_PER_SEC: Tick = 10;

pub use economy::{format_number, EconomyState, EffectKind};
pub use error::GameError;
pub use game::{Game, LogEntry};
pub use ingredients::{IngredientKind, IngredientStock};
pub use inventory::CookieInventory;
pub use market::{MarketItemId, MarketState};
pub use orders::{Order, OrderAction, OrderEngine, OrderStatus};
pub use player::{GameClock, LoginReward, PlayerProgress};
pub use recipes::{RecipeCatalog, RecipeKind};
pub use save::{KvStore, MemoryStore};
pub use suppliers::{ContractTier, SupplierEngine, SupplierId};
pub use units::{ProductionEngine, UnitKind};
pub use upgrades::Upgrades;
