/// indicators.rs — Rolling indicator primitives
///
/// Pure functions over plain OHLCV slices. Every function tolerates short
/// input (fewer bars than the requested window) by degrading to best-effort
/// values instead of panicking — the caller decides whether a degraded value
/// is usable.

/// Exponential moving average with smoothing `k = 2/(length+1)`, seeded with
/// the first sample so early values are not biased toward zero.
///
/// `length <= 1` returns the series unchanged.
pub fn ema(vals: &[f64], length: usize) -> Vec<f64> {
    if length <= 1 || vals.is_empty() {
        return vals.to_vec();
    }
    let k = 2.0 / (length as f64 + 1.0);
    let mut out = Vec::with_capacity(vals.len());
    let mut e = vals[0];
    for &v in vals {
        e = v * k + e * (1.0 - k);
        out.push(e);
    }
    out
}

/// Average true range, EMA-smoothed.
///
/// TR per bar = `max(h-l, |h-prev_close|, |l-prev_close|)` for bars `1..n`;
/// the smoothed series is left-padded by duplicating its first value so the
/// output length equals `close.len()`.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], length: usize) -> Vec<f64> {
    let n = close.len();
    if n < 2 || high.len() < n || low.len() < n {
        return vec![0.0; n];
    }
    let mut trs = Vec::with_capacity(n - 1);
    let mut prev = close[0];
    for i in 1..n {
        let tr = (high[i] - low[i])
            .max((high[i] - prev).abs())
            .max((low[i] - prev).abs());
        trs.push(tr);
        prev = close[i];
    }
    let smoothed = ema(&trs, length);
    let mut out = Vec::with_capacity(n);
    out.push(smoothed[0]);
    out.extend_from_slice(&smoothed);
    out
}

/// Max over the up-to-`window` values strictly before index `end`.
/// `None` when nothing precedes `end`.
pub fn trailing_max(vals: &[f64], end: usize, window: usize) -> Option<f64> {
    let end = end.min(vals.len());
    let start = end.saturating_sub(window);
    vals[start..end]
        .iter()
        .copied()
        .fold(None, |m: Option<f64>, v| Some(m.map_or(v, |m| m.max(v))))
}

/// Min over the up-to-`window` values strictly before index `end`.
pub fn trailing_min(vals: &[f64], end: usize, window: usize) -> Option<f64> {
    let end = end.min(vals.len());
    let start = end.saturating_sub(window);
    vals[start..end]
        .iter()
        .copied()
        .fold(None, |m: Option<f64>, v| Some(m.map_or(v, |m| m.min(v))))
}

/// Mean over the up-to-`window` values strictly before index `end`.
pub fn trailing_mean(vals: &[f64], end: usize, window: usize) -> Option<f64> {
    let end = end.min(vals.len());
    let start = end.saturating_sub(window);
    let slice = &vals[start..end];
    if slice.is_empty() {
        return None;
    }
    Some(slice.iter().sum::<f64>() / slice.len() as f64)
}

/// Volume confirmation: the bar at `idx` prints more than `mult` × the mean
/// volume of the `window` bars before it.
pub fn volume_confirmed(vols: &[f64], idx: usize, window: usize, mult: f64) -> bool {
    match (vols.get(idx), trailing_mean(vols, idx, window)) {
        (Some(&v), Some(m)) => v > m * mult,
        _ => false,
    }
}
