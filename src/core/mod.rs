mod engine;
mod error;
pub mod export;
mod types;

pub use engine::{compare_strategies, order_debts, simulate, validate_inputs};
pub use error::SimulationError;
pub use types::{
    Debt, DebtMonth, HORIZON_MONTHS, MonthlySnapshot, PAYOFF_EPSILON, PayoffOutcome,
    SimulationRun, Strategy, StrategyComparison, TimelinePoint, debt_labels,
};
