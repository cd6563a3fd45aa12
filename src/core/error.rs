use thiserror::Error;

/// Input problems detected before any month is simulated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("At least one debt is required.")]
    NoDebts,
    #[error("Debt #{position} must have a name.")]
    MissingName { position: usize },
    #[error("Debt '{name}' has a non-finite {field}.")]
    NotFinite { name: String, field: &'static str },
    #[error("Inputs must be non-negative: debt '{name}' has {field} {value:.2}.")]
    Negative {
        name: String,
        field: &'static str,
        value: f64,
    },
    #[error("Monthly budget must be > 0 (got {0:.2}).")]
    NonPositiveBudget(f64),
    #[error(
        "Monthly budget (${budget:.2}) is less than total minimum payments (${minimums:.2})."
    )]
    InsufficientBudget { budget: f64, minimums: f64 },
}
