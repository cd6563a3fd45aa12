use serde::Serialize;

/// Balances at or below this are treated as paid off.
pub const PAYOFF_EPSILON: f64 = 0.005;

/// Hard cap on simulated months (100 years).
pub const HORIZON_MONTHS: u32 = 1200;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Smallest starting balance first.
    Snowball,
    /// Highest APR first.
    Avalanche,
}

impl Strategy {
    pub fn complement(self) -> Self {
        match self {
            Strategy::Snowball => Strategy::Avalanche,
            Strategy::Avalanche => Strategy::Snowball,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Snowball => "Snowball (Smallest Balance First)",
            Strategy::Avalanche => "Avalanche (Highest APR First)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub name: String,
    pub balance: f64,
    pub apr_pct: f64,
    pub min_pay: f64,
}

impl Debt {
    pub fn new(name: impl Into<String>, balance: f64, apr_pct: f64, min_pay: f64) -> Self {
        Self {
            name: name.into(),
            balance,
            apr_pct,
            min_pay,
        }
    }

    pub fn monthly_rate(&self) -> f64 {
        self.apr_pct / 100.0 / 12.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtMonth {
    pub balance: f64,
    pub paid: f64,
    pub interest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySnapshot {
    pub month: u32,
    pub remaining_budget: f64,
    pub cumulative_interest: f64,
    pub extra_target: Option<usize>,
    pub debts: Vec<DebtMonth>,
}

impl MonthlySnapshot {
    pub fn total_balance(&self) -> f64 {
        self.debts.iter().map(|d| d.balance).sum()
    }

    pub fn total_paid(&self) -> f64 {
        self.debts.iter().map(|d| d.paid).sum()
    }
}

/// Terminal state of one simulation run. A run that hits the horizon is not a payoff,
/// even if `months` happens to equal the horizon for both variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PayoffOutcome {
    #[serde(rename_all = "camelCase")]
    Converged { months: u32, total_interest: f64 },
    #[serde(rename_all = "camelCase")]
    HorizonExceeded { months: u32, total_interest: f64 },
}

impl PayoffOutcome {
    pub fn converged(&self) -> bool {
        matches!(self, PayoffOutcome::Converged { .. })
    }

    pub fn months(&self) -> u32 {
        match *self {
            PayoffOutcome::Converged { months, .. } | PayoffOutcome::HorizonExceeded { months, .. } => {
                months
            }
        }
    }

    pub fn total_interest(&self) -> f64 {
        match *self {
            PayoffOutcome::Converged { total_interest, .. }
            | PayoffOutcome::HorizonExceeded { total_interest, .. } => total_interest,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub strategy: Strategy,
    pub order: Vec<usize>,
    pub outcome: PayoffOutcome,
    pub snapshots: Vec<MonthlySnapshot>,
    pub paid_off: Vec<Option<u32>>,
    pub debt_names: Vec<String>,
}

impl SimulationRun {
    /// Payoff month per debt, keyed by name. Falls back to `#<position> <name>` keys for
    /// every debt when any two names collide.
    pub fn paid_off_months(&self) -> Vec<(String, Option<u32>)> {
        debt_labels(&self.debt_names)
            .into_iter()
            .zip(self.paid_off.iter().copied())
            .collect()
    }
}

pub fn debt_labels(names: &[String]) -> Vec<String> {
    let collides = names
        .iter()
        .enumerate()
        .any(|(i, name)| names[..i].contains(name));
    if !collides {
        return names.to_vec();
    }
    names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("#{} {name}", i + 1))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub month: u32,
    pub chosen_total_balance: f64,
    pub other_total_balance: f64,
}

#[derive(Debug, Clone)]
pub struct StrategyComparison {
    pub debts: Vec<Debt>,
    pub monthly_budget: f64,
    pub chosen: SimulationRun,
    pub other: SimulationRun,
}
