use thiserror::Error;

/// Errors raised by mechanisms, agents and the round driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuctionError {
    /// Negative or non-finite clicks, reserve or bid, or a malformed bid set
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A division by a zero click count would be needed to continue
    #[error("Arithmetic degeneracy at slot {slot}: {reason}")]
    ArithmeticDegeneracy { slot: usize, reason: String },

    /// The requested round has not been recorded yet
    #[error("Round {round} is not available in history")]
    HistoryUnavailable { round: usize },
}

/// Check that a reserve price is usable
pub fn validate_reserve(reserve: f64) -> Result<(), AuctionError> {
    if !reserve.is_finite() || reserve < 0.0 {
        return Err(AuctionError::InvalidInput(format!("reserve must be a non-negative number, got {}", reserve)));
    }
    Ok(())
}

/// Check that every slot click count is usable
pub fn validate_clicks(slot_clicks: &[f64]) -> Result<(), AuctionError> {
    for (slot, clicks) in slot_clicks.iter().enumerate() {
        if !clicks.is_finite() || *clicks < 0.0 {
            return Err(AuctionError::InvalidInput(format!("slot {} has invalid click count {}", slot, clicks)));
        }
    }
    Ok(())
}
