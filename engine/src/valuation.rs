//! Cash-flow and valuation math. Pure functions, no side effects.

/// Baseline discount rate (WACC) before scenario deltas.
pub const BASELINE_DISCOUNT_RATE: f64 = 0.08;

/// Perpetual growth rate used for the terminal value.
pub const TERMINAL_GROWTH_RATE: f64 = 0.02;

/// Minimum spread kept between the discount rate and terminal growth.
pub const MIN_RATE_SPREAD: f64 = 0.01;

/// Free cash flow: `EBIT × (1 − t) + D&A + ΔWC + CapEx`.
///
/// `change_in_working_capital` and `capex` must already carry cash-flow
/// statement signs (outflows negative); no sign correction happens here.
pub fn free_cash_flow(
    ebit: f64,
    tax_rate: f64,
    depreciation_amortization: f64,
    change_in_working_capital: f64,
    capex: f64,
) -> f64 {
    let nopat = ebit * (1.0 - tax_rate);
    nopat + depreciation_amortization + change_in_working_capital + capex
}

/// Net present value of cash flows received at t = 1..N.
pub fn net_present_value(cash_flows: &[f64], discount_rate: f64) -> f64 {
    cash_flows
        .iter()
        .zip(1..)
        .map(|(cf, t)| cf / (1.0 + discount_rate).powi(t))
        .sum()
}

/// Keep the Gordon growth denominator positive: `r ≤ g` becomes `g + 0.01`.
pub fn guarded_discount_rate(discount_rate: f64, growth: f64) -> f64 {
    if discount_rate <= growth {
        growth + MIN_RATE_SPREAD
    } else {
        discount_rate
    }
}

/// Gordon growth terminal value at the end of the explicit period.
///
/// Callers pass a rate already run through [`guarded_discount_rate`].
pub fn terminal_value(fcf: f64, discount_rate: f64, growth: f64) -> f64 {
    fcf * (1.0 + growth) / (discount_rate - growth)
}

/// One explicit period plus a terminal value, both discounted once.
pub fn single_period_npv(fcf: f64, discount_rate: f64, growth: f64) -> f64 {
    let tv = terminal_value(fcf, discount_rate, growth);
    fcf / (1.0 + discount_rate) + tv / (1.0 + discount_rate)
}
