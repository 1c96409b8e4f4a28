use common::{Error, Result};

/// RSI (Relative Strength Index) of `closes` (oldest first), Wilder smoothing.
///
/// Average gain and loss are exponential averages with `alpha = 1 / period`
/// seeded by the first change, not by an SMA over the first `period` changes.
/// Fails with `InsufficientData` when fewer than `period + 1` values are given.
///
/// Zero average loss: returns 100 when there was any gain, 50 for a
/// completely flat series.
pub fn rsi(closes: &[f64], period: usize) -> Result<f64> {
    if period == 0 {
        return Err(Error::InvalidInput("RSI period must be >= 1".into()));
    }
    if closes.len() < period + 1 {
        return Err(Error::InsufficientData {
            needed: period + 1,
            got: closes.len(),
        });
    }

    let alpha = 1.0 / period as f64;
    let mut changes = closes.windows(2).map(|w| w[1] - w[0]);

    // len >= 2 here, so there is at least one change
    let first = changes.next().unwrap_or(0.0);
    let mut avg_gain = first.max(0.0);
    let mut avg_loss = (-first).max(0.0);

    for change in changes {
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
    }

    if avg_loss == 0.0 {
        return Ok(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Ok(100.0 - 100.0 / (1.0 + rs))
}
