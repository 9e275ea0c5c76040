//! Player progression: level/experience, login streaks, the in-game clock.
//!
//! The engine never reads a wall clock. Login checks take an epoch-day
//! number supplied by the host (the wasm layer derives it from
//! `js_sys::Date`), and the game clock advances a fixed number of in-game
//! minutes per real second of ticks.

use serde::{Deserialize, Serialize};

/// In-game minutes that pass per real second.
pub const TIME_SCALE_MINUTES: u32 = 10;

const MINUTES_PER_DAY: u32 = 24 * 60;
const DAYS_PER_MONTH: u32 = 30;
const MONTHS_PER_YEAR: u32 = 12;

/// In-game calendar and time of day. `day_of_week` runs 1 (Monday) to
/// 7 (Sunday). Months are a flat 30 days.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: u32,
    pub day_of_week: u32,
    pub minute_of_day: u32,
}

/// Calendar boundaries crossed while advancing the clock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalendarEvent {
    NewDay { year: u32, month: u32, day: u32 },
    NewYear,
    Noon,
    WeekendSale,
}

impl GameClock {
    pub fn new() -> Self {
        Self {
            day: 1,
            week: 1,
            month: 1,
            year: 1,
            day_of_week: 1,
            minute_of_day: 8 * 60, // opens at 08:00
        }
    }

    pub fn hour_of_day(&self) -> u32 {
        self.minute_of_day / 60
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week == 6 || self.day_of_week == 7
    }

    /// Advance by `minutes`, stepping in `TIME_SCALE_MINUTES` chunks so
    /// that hour boundaries are hit exactly.
    pub fn advance(&mut self, minutes: u32) -> Vec<CalendarEvent> {
        let mut events = Vec::new();
        let mut remaining = minutes;
        while remaining > 0 {
            let step = remaining.min(TIME_SCALE_MINUTES);
            remaining -= step;
            self.minute_of_day += step;

            if self.minute_of_day >= MINUTES_PER_DAY {
                self.minute_of_day -= MINUTES_PER_DAY;
                self.day += 1;
                self.day_of_week = self.day_of_week % 7 + 1;
                if self.day_of_week == 1 {
                    self.week += 1;
                }
                if self.day > DAYS_PER_MONTH {
                    self.day = 1;
                    self.month += 1;
                    if self.month > MONTHS_PER_YEAR {
                        self.month = 1;
                        self.year += 1;
                    }
                }
                events.push(CalendarEvent::NewDay {
                    year: self.year,
                    month: self.month,
                    day: self.day,
                });
                if self.day == 1 && self.month == 1 {
                    events.push(CalendarEvent::NewYear);
                }
            }

            if self.minute_of_day == 12 * 60 {
                events.push(CalendarEvent::Noon);
            }
            if self.minute_of_day == 10 * 60 && self.is_weekend() {
                events.push(CalendarEvent::WeekendSale);
            }
        }
        events
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a level-up while absorbing experience.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelUp {
    pub level: u32,
    pub bonus: f64,
}

/// Outcome of the once-per-session login check.
#[derive(Clone, Debug, PartialEq)]
pub enum LoginReward {
    /// First ever login.
    First { bonus: f64 },
    /// Already logged in today; nothing changes.
    SameDay,
    /// Consecutive-day login. `weekly_bonus` is set on 7-day multiples.
    Streak {
        streak: u32,
        bonus: f64,
        weekly_bonus: Option<f64>,
    },
    /// The streak broke; reset to 1 with a flat bonus.
    Reset { ended_streak: u32, bonus: f64 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub name: String,
    pub level: u32,
    pub experience: u64,
    pub experience_to_next: u64,
    pub login_streak: u32,
    pub total_logins: u32,
    /// Days since the Unix epoch, supplied by the host.
    pub first_login_day: Option<u32>,
    pub last_login_day: Option<u32>,
    pub clock: GameClock,
}

impl PlayerProgress {
    pub fn new() -> Self {
        Self {
            name: "プレイヤー".to_string(),
            level: 1,
            experience: 0,
            experience_to_next: 100,
            login_streak: 0,
            total_logins: 0,
            first_login_day: None,
            last_login_day: None,
            clock: GameClock::new(),
        }
    }

    /// Absorb experience; every threshold crossed levels up, grows the
    /// next threshold ×1.5 and grants a `level × 1000` cookie bonus.
    pub fn add_experience(&mut self, amount: u64) -> Vec<LevelUp> {
        self.experience += amount;
        let mut ups = Vec::new();
        while self.experience >= self.experience_to_next {
            self.experience -= self.experience_to_next;
            self.level += 1;
            self.experience_to_next = (self.experience_to_next as f64 * 1.5).floor() as u64;
            ups.push(LevelUp {
                level: self.level,
                bonus: self.level as f64 * 1_000.0,
            });
        }
        ups
    }

    /// Session-start login bookkeeping. `today` is an epoch-day number.
    pub fn check_login(&mut self, today: u32) -> LoginReward {
        match self.last_login_day {
            None => {
                self.first_login_day = Some(today);
                self.last_login_day = Some(today);
                self.login_streak = 1;
                self.total_logins = 1;
                LoginReward::First { bonus: 500.0 }
            }
            Some(last) if last == today => LoginReward::SameDay,
            Some(last) => {
                self.last_login_day = Some(today);
                self.total_logins += 1;
                if today == last + 1 {
                    self.login_streak += 1;
                    let bonus = 50.0 * self.login_streak as f64;
                    let weekly_bonus = if self.login_streak % 7 == 0 {
                        Some(1_000.0 * (self.login_streak / 7) as f64)
                    } else {
                        None
                    };
                    LoginReward::Streak {
                        streak: self.login_streak,
                        bonus,
                        weekly_bonus,
                    }
                } else {
                    let ended = self.login_streak;
                    self.login_streak = 1;
                    LoginReward::Reset {
                        ended_streak: ended,
                        bonus: 100.0,
                    }
                }
            }
        }
    }

    /// Cadence multiplier the order generator applies to its delay:
    /// lunch rush shortens it, night lengthens it, weekends shorten it.
    pub fn order_delay_multiplier(&self) -> f64 {
        let hour = self.clock.hour_of_day();
        let mut multiplier = if (11..=14).contains(&hour) {
            0.7
        } else if hour >= 22 || hour <= 6 {
            1.5
        } else {
            1.0
        };
        if self.clock.is_weekend() {
            multiplier *= 0.8;
        }
        multiplier
    }
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self::new()
    }
}
