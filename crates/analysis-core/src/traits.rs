/// Source of every placeholder heuristic the engines rely on.
///
/// The statements carry no inventory, retained-earnings or depreciation lines,
/// so those figures are approximated from fractions supplied here. Engines
/// never invent numbers on their own; callers pick the provider (static
/// values, or a seeded scenario for what-if runs).
pub trait AssumptionProvider: Send + Sync {
    /// Share of current assets treated as non-liquid (inventory stand-in) in the quick ratio.
    fn non_liquid_fraction(&self) -> f64;

    /// Share of equity treated as retained earnings in the Z-score.
    fn retained_earnings_fraction(&self) -> f64;

    /// Depreciation estimate as a share of total assets, used for EBITDA.
    fn depreciation_fraction(&self) -> f64;

    fn discount_rate(&self) -> f64;

    fn terminal_growth(&self) -> f64;

    /// Explicit FCF growth for the DCF. `None` derives it from revenue history.
    fn dcf_growth(&self) -> Option<f64>;

    /// Additive growth perturbation for a forecast model at a horizon year.
    fn growth_shock(&self, _model: &str, _horizon: u32) -> f64 {
        0.0
    }
}
