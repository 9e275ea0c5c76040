//! Supplier contracts: recurring payments that drip-feed raw ingredients.
//!
//! At most one contract per supplier; re-signing replaces it. Charging is
//! amortized: nothing is debited at signing (the full tier cost only gates
//! affordability), and one daily debit is taken per elapsed day. A missed
//! payment force-terminates the contract — no refund, no owed deliveries.

use serde::{Deserialize, Serialize};

use crate::economy::EconomyState;
use crate::error::GameError;
use crate::ingredients::{IngredientKind, IngredientStock};
use crate::{Tick, TICKS_PER_SEC};

/// Production cycle: the hourly rate is applied in 1/12 slices.
const PRODUCTION_INTERVAL: Tick = 30 * TICKS_PER_SEC;
/// Contract maintenance (expiry + payments).
const MAINTENANCE_INTERVAL: Tick = 60 * TICKS_PER_SEC;
/// One contract day of wall-clock time.
pub const DAY_TICKS: Tick = 24 * 60 * 60 * TICKS_PER_SEC;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractTier {
    Daily,
    Weekly,
    Monthly,
}

impl ContractTier {
    pub fn name(&self) -> &'static str {
        match self {
            ContractTier::Daily => "日次",
            ContractTier::Weekly => "週次",
            ContractTier::Monthly => "月次",
        }
    }

    pub fn duration_days(&self) -> u64 {
        match self {
            ContractTier::Daily => 1,
            ContractTier::Weekly => 7,
            ContractTier::Monthly => 30,
        }
    }

    /// Units ordered from the supplier when the contract is signed.
    pub fn order_amount(&self) -> u32 {
        match self {
            ContractTier::Daily => 20,
            ContractTier::Weekly => 150,
            ContractTier::Monthly => 600,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierId {
    VillageMill,
    TownMill,
    AutomatedMill,
    LocalRefinery,
    SugarFactory,
    ModernRefinery,
    DairyFarm,
    ButterFactory,
    GourmetCreamery,
}

impl SupplierId {
    pub fn all() -> &'static [SupplierId] {
        &[
            SupplierId::VillageMill,
            SupplierId::TownMill,
            SupplierId::AutomatedMill,
            SupplierId::LocalRefinery,
            SupplierId::SugarFactory,
            SupplierId::ModernRefinery,
            SupplierId::DairyFarm,
            SupplierId::ButterFactory,
            SupplierId::GourmetCreamery,
        ]
    }

    pub fn index(&self) -> usize {
        match self {
            SupplierId::VillageMill => 0,
            SupplierId::TownMill => 1,
            SupplierId::AutomatedMill => 2,
            SupplierId::LocalRefinery => 3,
            SupplierId::SugarFactory => 4,
            SupplierId::ModernRefinery => 5,
            SupplierId::DairyFarm => 6,
            SupplierId::ButterFactory => 7,
            SupplierId::GourmetCreamery => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SupplierId::VillageMill => "村の製粉所",
            SupplierId::TownMill => "町の製粉工場",
            SupplierId::AutomatedMill => "全自動製粉システム",
            SupplierId::LocalRefinery => "地元の製糖所",
            SupplierId::SugarFactory => "大型製糖工場",
            SupplierId::ModernRefinery => "最新鋭精製プラント",
            SupplierId::DairyFarm => "酪農家の手作りバター",
            SupplierId::ButterFactory => "バター製造工場",
            SupplierId::GourmetCreamery => "グルメクリーマリー",
        }
    }

    pub fn ingredient(&self) -> IngredientKind {
        match self {
            SupplierId::VillageMill | SupplierId::TownMill | SupplierId::AutomatedMill => {
                IngredientKind::Flour
            }
            SupplierId::LocalRefinery | SupplierId::SugarFactory | SupplierId::ModernRefinery => {
                IngredientKind::Sugar
            }
            SupplierId::DairyFarm | SupplierId::ButterFactory | SupplierId::GourmetCreamery => {
                IngredientKind::Butter
            }
        }
    }

    /// Ingredient units produced per hour while under contract.
    pub fn hourly_rate(&self) -> u32 {
        match self {
            SupplierId::VillageMill => 5,
            SupplierId::TownMill => 15,
            SupplierId::AutomatedMill => 50,
            SupplierId::LocalRefinery => 4,
            SupplierId::SugarFactory => 12,
            SupplierId::ModernRefinery => 40,
            SupplierId::DairyFarm => 3,
            SupplierId::ButterFactory => 10,
            SupplierId::GourmetCreamery => 35,
        }
    }

    pub fn unlock_level(&self) -> u32 {
        match self {
            SupplierId::VillageMill => 1,
            SupplierId::TownMill => 5,
            SupplierId::AutomatedMill => 10,
            SupplierId::LocalRefinery => 2,
            SupplierId::SugarFactory => 6,
            SupplierId::ModernRefinery => 12,
            SupplierId::DairyFarm => 3,
            SupplierId::ButterFactory => 7,
            SupplierId::GourmetCreamery => 14,
        }
    }

    /// Total cost of a contract tier.
    pub fn tier_cost(&self, tier: ContractTier) -> f64 {
        let (daily, weekly, monthly) = match self {
            SupplierId::VillageMill => (20.0, 120.0, 450.0),
            SupplierId::TownMill => (50.0, 300.0, 1_200.0),
            SupplierId::AutomatedMill => (200.0, 1_200.0, 4_800.0),
            SupplierId::LocalRefinery => (25.0, 150.0, 600.0),
            SupplierId::SugarFactory => (60.0, 360.0, 1_440.0),
            SupplierId::ModernRefinery => (180.0, 1_080.0, 4_320.0),
            SupplierId::DairyFarm => (30.0, 180.0, 720.0),
            SupplierId::ButterFactory => (70.0, 420.0, 1_680.0),
            SupplierId::GourmetCreamery => (150.0, 900.0, 3_600.0),
        };
        match tier {
            ContractTier::Daily => daily,
            ContractTier::Weekly => weekly,
            ContractTier::Monthly => monthly,
        }
    }

    pub fn daily_debit(&self, tier: ContractTier) -> f64 {
        self.tier_cost(tier) / tier.duration_days() as f64
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierContract {
    pub supplier: SupplierId,
    pub tier: ContractTier,
    pub start: Tick,
    pub end: Tick,
    pub next_payment: Tick,
}

/// A standing delivery tracked until `delivered ≥ amount`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientOrder {
    pub id: u64,
    pub supplier: SupplierId,
    pub ingredient: IngredientKind,
    pub amount: u32,
    pub delivered: u32,
    pub completed: bool,
    pub created_at: Tick,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContractEvent {
    Payment { supplier: SupplierId, amount: f64 },
    Terminated { supplier: SupplierId },
    Expired { supplier: SupplierId },
    OrderCompleted { supplier: SupplierId, ingredient: IngredientKind },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupplierEngine {
    pub contracts: Vec<SupplierContract>,
    pub orders: Vec<IngredientOrder>,
    pub(crate) next_order_id: u64,
    pub(crate) next_production_at: Tick,
    pub(crate) next_maintenance_at: Tick,
}

impl SupplierEngine {
    pub fn new() -> Self {
        Self {
            contracts: Vec::new(),
            orders: Vec::new(),
            next_order_id: 1,
            next_production_at: 0,
            next_maintenance_at: 0,
        }
    }

    pub fn contract_for(&self, supplier: SupplierId) -> Option<&SupplierContract> {
        self.contracts.iter().find(|c| c.supplier == supplier)
    }

    /// Sign (or renew, replacing) a contract with a supplier.
    ///
    /// The full tier cost gates affordability but is not debited here;
    /// payment happens as daily debits starting one day in.
    pub fn sign_contract(
        &mut self,
        eco: &EconomyState,
        player_level: u32,
        supplier: SupplierId,
        tier: ContractTier,
        now: Tick,
    ) -> Result<SupplierContract, GameError> {
        if player_level < supplier.unlock_level() {
            return Err(GameError::LevelTooLow);
        }
        if eco.cookies < supplier.tier_cost(tier) {
            return Err(GameError::InsufficientFunds);
        }

        let contract = SupplierContract {
            supplier,
            tier,
            start: now,
            end: now + tier.duration_days() * DAY_TICKS,
            next_payment: now + DAY_TICKS,
        };
        match self.contracts.iter_mut().find(|c| c.supplier == supplier) {
            Some(existing) => *existing = contract.clone(),
            None => self.contracts.push(contract.clone()),
        }

        self.orders.push(IngredientOrder {
            id: self.next_order_id,
            supplier,
            ingredient: supplier.ingredient(),
            amount: tier.order_amount(),
            delivered: 0,
            completed: false,
            created_at: now,
        });
        self.next_order_id += 1;

        Ok(contract)
    }

    /// Delivery cycle: each live contract ships `max(1, hourly/12)` units
    /// into the oldest incomplete order for its supplier.
    pub fn run_production(
        &mut self,
        stock: &mut IngredientStock,
        now: Tick,
    ) -> Vec<ContractEvent> {
        if now < self.next_production_at {
            return Vec::new();
        }
        self.next_production_at = now + PRODUCTION_INTERVAL;

        let mut events = Vec::new();
        for contract in &self.contracts {
            if now > contract.end {
                continue;
            }
            let supplier = contract.supplier;
            let per_cycle = (supplier.hourly_rate() / 12).max(1);
            let Some(order) = self
                .orders
                .iter_mut()
                .filter(|o| o.supplier == supplier && !o.completed)
                .min_by_key(|o| o.created_at)
            else {
                continue;
            };
            let delivery = per_cycle.min(order.amount - order.delivered);
            if delivery == 0 {
                continue;
            }
            order.delivered += delivery;
            stock.add(order.ingredient, delivery);
            if order.delivered >= order.amount {
                order.completed = true;
                events.push(ContractEvent::OrderCompleted {
                    supplier,
                    ingredient: order.ingredient,
                });
            }
        }
        events
    }

    /// Maintenance cycle: expire finished contracts and charge one daily
    /// debit per elapsed day. Insufficient funds force-terminate.
    pub fn run_maintenance(&mut self, eco: &mut EconomyState, now: Tick) -> Vec<ContractEvent> {
        if now < self.next_maintenance_at {
            return Vec::new();
        }
        self.next_maintenance_at = now + MAINTENANCE_INTERVAL;

        let mut events = Vec::new();
        self.contracts.retain_mut(|contract| {
            // Settle debits due up to the contract end before expiring it,
            // so the final day is never skipped.
            while now >= contract.next_payment && contract.next_payment <= contract.end {
                let debit = contract.supplier.daily_debit(contract.tier);
                if eco.spend(debit).is_err() {
                    events.push(ContractEvent::Terminated {
                        supplier: contract.supplier,
                    });
                    return false;
                }
                events.push(ContractEvent::Payment {
                    supplier: contract.supplier,
                    amount: debit,
                });
                contract.next_payment += DAY_TICKS;
            }
            if now > contract.end {
                events.push(ContractEvent::Expired {
                    supplier: contract.supplier,
                });
                return false;
            }
            true
        });
        events
    }
}

impl Default for SupplierEngine {
    fn default() -> Self {
        Self::new()
    }
}
