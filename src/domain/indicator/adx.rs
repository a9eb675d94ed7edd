//! Average Directional Index with directional indicators.
//!
//! For each bar after the first:
//! +DM = up move if up > down and up > 0, else 0
//! -DM = down move if down > up and down > 0, else 0
//! TR, +DM and -DM are Wilder-smoothed over n bars (seeded by their mean).
//! +DI = 100 * s(+DM) / s(TR), -DI = 100 * s(-DM) / s(TR)
//! DX = 100 * |+DI - -DI| / (+DI + -DI)
//! ADX = mean of the first n DX values, then Wilder-smoothed.
//! First valid ADX at index 2n - 1.

use serde::Serialize;

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdxPoint {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

pub fn calculate_adx(candles: &[Candle], period: usize) -> Result<Vec<Option<AdxPoint>>, TradebenchError> {
    let t = IndicatorType::Adx(period);
    check_period(t, "period", period)?;
    check_len(t, candles.len())?;

    let n = period as f64;
    let len = candles.len();
    let mut tr = vec![0.0; len];
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    for i in 1..len {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i - 1].low - candles[i].low;
        tr[i] = candles[i].true_range(candles[i - 1].close);
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let mut s_tr = tr[1..=period].iter().sum::<f64>() / n;
    let mut s_plus = plus_dm[1..=period].iter().sum::<f64>() / n;
    let mut s_minus = minus_dm[1..=period].iter().sum::<f64>() / n;

    // (index, +DI, -DI, DX) from index `period` onwards
    let mut directional = Vec::with_capacity(len - period);
    for i in period..len {
        if i > period {
            s_tr = (s_tr * (n - 1.0) + tr[i]) / n;
            s_plus = (s_plus * (n - 1.0) + plus_dm[i]) / n;
            s_minus = (s_minus * (n - 1.0) + minus_dm[i]) / n;
        }
        let (plus_di, minus_di) = if s_tr > 0.0 {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };
        directional.push((i, plus_di, minus_di, dx));
    }

    let mut out = vec![None; len];
    let mut adx = directional[..period].iter().map(|d| d.3).sum::<f64>() / n;
    for (j, &(i, plus_di, minus_di, dx)) in directional.iter().enumerate().skip(period - 1) {
        if j >= period {
            adx = (adx * (n - 1.0) + dx) / n;
        }
        out[i] = Some(AdxPoint {
            adx,
            plus_di,
            minus_di,
        });
    }
    Ok(out)
}
