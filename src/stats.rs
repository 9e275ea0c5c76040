//! Production and sales statistics, bucketed by the in-game calendar.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::player::GameClock;
use crate::recipes::RecipeKind;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PeriodStats {
    pub production: BTreeMap<RecipeKind, u64>,
    pub sales: BTreeMap<RecipeKind, u64>,
    pub revenue: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SalesStats {
    pub daily: BTreeMap<String, PeriodStats>,
    pub weekly: BTreeMap<String, PeriodStats>,
    pub monthly: BTreeMap<String, PeriodStats>,
}

fn day_key(clock: &GameClock) -> String {
    format!("{}-{:02}-{:02}", clock.year, clock.month, clock.day)
}

fn week_key(clock: &GameClock) -> String {
    format!("{}-W{:02}", clock.year, clock.week)
}

fn month_key(clock: &GameClock) -> String {
    format!("{}-{:02}", clock.year, clock.month)
}

impl SalesStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn buckets(&mut self, clock: &GameClock) -> [&mut PeriodStats; 3] {
        // Split borrows: each map is a distinct field.
        let daily = self.daily.entry(day_key(clock)).or_default();
        let weekly = self.weekly.entry(week_key(clock)).or_default();
        let monthly = self.monthly.entry(month_key(clock)).or_default();
        [daily, weekly, monthly]
    }

    pub fn record_production(&mut self, clock: &GameClock, kind: RecipeKind, quantity: u32) {
        for bucket in self.buckets(clock) {
            *bucket.production.entry(kind).or_insert(0) += quantity as u64;
        }
    }

    pub fn record_sale(&mut self, clock: &GameClock, kind: RecipeKind, quantity: u32, revenue: f64) {
        for bucket in self.buckets(clock) {
            *bucket.sales.entry(kind).or_insert(0) += quantity as u64;
            bucket.revenue += revenue;
        }
    }

    pub fn today(&self, clock: &GameClock) -> Option<&PeriodStats> {
        self.daily.get(&day_key(clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_recorded_in_all_buckets() {
        let mut stats = SalesStats::new();
        let clock = GameClock::new();
        stats.record_production(&clock, RecipeKind::Plain, 5);
        stats.record_production(&clock, RecipeKind::Plain, 3);
        assert_eq!(stats.daily["1-01-01"].production[&RecipeKind::Plain], 8);
        assert_eq!(stats.weekly["1-W01"].production[&RecipeKind::Plain], 8);
        assert_eq!(stats.monthly["1-01"].production[&RecipeKind::Plain], 8);
    }

    #[test]
    fn sales_accumulate_revenue() {
        let mut stats = SalesStats::new();
        let clock = GameClock::new();
        stats.record_sale(&clock, RecipeKind::ChocolateChip, 2, 24.0);
        stats.record_sale(&clock, RecipeKind::Plain, 1, 5.0);
        let today = stats.today(&clock).unwrap();
        assert!((today.revenue - 29.0).abs() < 0.001);
        assert_eq!(today.sales[&RecipeKind::ChocolateChip], 2);
    }

    #[test]
    fn separate_days_separate_buckets() {
        let mut stats = SalesStats::new();
        let mut clock = GameClock::new();
        stats.record_production(&clock, RecipeKind::Plain, 1);
        clock.advance(24 * 60);
        stats.record_production(&clock, RecipeKind::Plain, 2);
        assert_eq!(stats.daily.len(), 2);
        assert_eq!(stats.daily["1-01-02"].production[&RecipeKind::Plain], 2);
        // Same week, though.
        assert_eq!(stats.weekly["1-W01"].production[&RecipeKind::Plain], 3);
    }
}
