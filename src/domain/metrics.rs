//! Performance metrics over a finished equity curve.
//!
//! Everything here is a pure function of its inputs.

use super::portfolio::EquityCurve;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualised Sharpe ratio against a zero benchmark:
/// `sqrt(periods_per_year) * mean(returns) / stdev(returns)` with the
/// population standard deviation.
///
/// Returns `NaN` for an empty series or zero volatility.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        periods_per_year.sqrt() * mean / stddev
    } else {
        f64::NAN
    }
}

/// Sharpe ratio of returns in excess of an annual risk-free rate, spread
/// evenly over `periods_per_year`.
pub fn excess_sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    let per_period = risk_free_rate / periods_per_year;
    let excess: Vec<f64> = returns.iter().map(|r| r - per_period).collect();
    sharpe_ratio(&excess, periods_per_year)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownSeries {
    pub high_water_mark: Vec<f64>,
    pub drawdown: Vec<f64>,
    /// Bars spent below the high-water mark.
    pub duration: Vec<usize>,
}

/// Single left-to-right pass computing the high-water mark, absolute drawdown
/// and drawdown duration at every point.
pub fn drawdown_series(equity: &[f64]) -> DrawdownSeries {
    let mut high_water_mark = Vec::with_capacity(equity.len());
    let mut drawdown = Vec::with_capacity(equity.len());
    let mut duration = Vec::with_capacity(equity.len());

    let Some(&first) = equity.first() else {
        return DrawdownSeries {
            high_water_mark,
            drawdown,
            duration,
        };
    };

    high_water_mark.push(first);
    drawdown.push(0.0);
    duration.push(0);

    for t in 1..equity.len() {
        let hwm = high_water_mark[t - 1].max(equity[t]);
        let dd = hwm - equity[t];
        let dur = if dd == 0.0 { 0 } else { duration[t - 1] + 1 };
        high_water_mark.push(hwm);
        drawdown.push(dd);
        duration.push(dur);
    }

    DrawdownSeries {
        high_water_mark,
        drawdown,
        duration,
    }
}

/// `(max drawdown, max drawdown duration in bars)`; `(0.0, 0)` when empty.
pub fn max_drawdown_and_duration(equity: &[f64]) -> (f64, usize) {
    let series = drawdown_series(equity);
    let max_dd = series.drawdown.iter().copied().fold(0.0_f64, f64::max);
    let max_duration = series.duration.iter().copied().max().unwrap_or(0);
    (max_dd, max_duration)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
}

impl Metrics {
    pub fn compute(curve: &EquityCurve, periods_per_year: f64, risk_free_rate: f64) -> Self {
        let final_equity = curve.equity.last().copied().unwrap_or(1.0);
        let total_return = final_equity - 1.0;

        let years = curve.returns.len() as f64 / periods_per_year;
        let annualized_return = if years > 0.0 && total_return.is_finite() && final_equity > 0.0 {
            final_equity.powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let sharpe_ratio = excess_sharpe_ratio(&curve.returns, risk_free_rate, periods_per_year);
        let (max_drawdown, max_drawdown_duration) = max_drawdown_and_duration(&curve.equity);

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
        }
    }

    /// Printable `(label, value)` pairs for the run summary.
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Return", format!("{:.2}%", self.total_return * 100.0)),
            ("Annualized Return", format!("{:.2}%", self.annualized_return * 100.0)),
            ("Sharpe Ratio", format!("{:.2}", self.sharpe_ratio)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown * 100.0)),
            ("Drawdown Duration", format!("{}", self.max_drawdown_duration)),
        ]
    }
}
