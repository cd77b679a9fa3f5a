//! Indicators computed from a series of closing prices, oldest first.

pub const RSI_PERIOD: usize = 14;
pub const SMA_LONG_PERIOD: usize = 200;
pub const BOLLINGER_PERIOD: usize = 20;

/// Relative Strength Index using simple averages of the last `period` changes.
///
/// All gains give 100. A completely flat window gives 50.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gain, loss) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gain / period as f64;
    let avg_loss = loss / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let sum: f64 = closes.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Bollinger band width `(upper - lower) / middle` with bands at two sample
/// standard deviations.
pub fn bollinger_width(closes: &[f64], period: usize) -> Option<f64> {
    if period < 2 {
        return None;
    }
    let middle = sma(closes, period)?;
    if middle == 0.0 {
        return None;
    }

    let variance = closes
        .iter()
        .rev()
        .take(period)
        .map(|c| (c - middle).powi(2))
        .sum::<f64>()
        / (period - 1) as f64;
    let std = variance.sqrt();

    let upper = middle + 2.0 * std;
    let lower = middle - 2.0 * std;
    Some((upper - lower) / middle)
}
