use common::{Error, Result};

/// Exponential Moving Average of `closes` (oldest first), returning the
/// value at the last bar.
///
/// Smoothing factor `k = 2 / (period + 1)`, seeded with the first close
/// rather than an SMA of the first `period` values:
/// `ema[0] = closes[0]`, `ema[i] = k * closes[i] + (1 - k) * ema[i - 1]`.
///
/// Fails with `InsufficientData` when fewer than `period` values are given.
pub fn ema(closes: &[f64], period: usize) -> Result<f64> {
    if period == 0 {
        return Err(Error::InvalidInput("EMA period must be >= 1".into()));
    }
    if closes.len() < period {
        return Err(Error::InsufficientData {
            needed: period,
            got: closes.len(),
        });
    }

    let k = 2.0 / (period as f64 + 1.0);
    let ema_val = closes[1..]
        .iter()
        .fold(closes[0], |prev, &price| k * price + (1.0 - k) * prev);
    Ok(ema_val)
}
