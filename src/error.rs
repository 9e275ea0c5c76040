//! Recoverable command failures.
//!
//! Every user command returns `Result<_, GameError>`. Failures are
//! user-facing and non-fatal: state is left untouched (all multi-step
//! operations validate fully before mutating) and the message surfaces
//! in the game log as a transient notification.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameError {
    /// Not enough cookies (or market coins) to pay.
    InsufficientFunds,
    /// Finished-goods inventory does not cover the requested items.
    InsufficientStock,
    /// Raw ingredient stock does not cover a recipe's cost.
    InsufficientIngredients,
    /// An inventory add would exceed per-type or total capacity.
    CapacityExceeded,
    /// The single cooking slot is busy, or a one-time purchase was repeated.
    AlreadyInProgress,
    /// Recipe / ingredient / supplier not yet unlocked.
    LockedContent,
    /// Unknown order / unit / recipe / item id.
    NotFound,
    /// Player level below a supplier's unlock level.
    LevelTooLow,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            GameError::InsufficientFunds => "クッキーが足りません！",
            GameError::InsufficientStock => "注文に必要なクッキーがありません！",
            GameError::InsufficientIngredients => "材料が足りません！",
            GameError::CapacityExceeded => "倉庫が一杯です！",
            GameError::AlreadyInProgress => "既に実行中です！",
            GameError::LockedContent => "まだ解禁されていません！",
            GameError::NotFound => "対象が見つかりません",
            GameError::LevelTooLow => "レベルが足りません",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for GameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_user_facing() {
        assert_eq!(
            GameError::InsufficientFunds.to_string(),
            "クッキーが足りません！"
        );
    }
}
