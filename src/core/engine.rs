use tracing::{debug, warn};

use super::error::SimulationError;
use super::types::{
    Debt, DebtMonth, HORIZON_MONTHS, MonthlySnapshot, PAYOFF_EPSILON, PayoffOutcome,
    SimulationRun, Strategy, StrategyComparison, TimelinePoint,
};

#[derive(Debug, Clone)]
struct SimulationState {
    month: u32,
    balances: Vec<f64>,
    total_interest: f64,
    paid_off: Vec<Option<u32>>,
}

impl SimulationState {
    fn initial(debts: &[Debt]) -> Self {
        let mut balances = Vec::with_capacity(debts.len());
        let mut paid_off = Vec::with_capacity(debts.len());
        for debt in debts {
            if debt.balance <= PAYOFF_EPSILON {
                balances.push(0.0);
                paid_off.push(Some(0));
            } else {
                balances.push(debt.balance);
                paid_off.push(None);
            }
        }
        Self {
            month: 0,
            balances,
            total_interest: 0.0,
            paid_off,
        }
    }

    fn has_outstanding(&self) -> bool {
        self.balances.iter().any(|&b| b > PAYOFF_EPSILON)
    }

    /// Advances one month, leaving `self` untouched.
    fn step(&self, debts: &[Debt], monthly_budget: f64, order: &[usize]) -> (Self, MonthlySnapshot) {
        let month = self.month + 1;
        let mut balances = self.balances.clone();
        let mut paid_off = self.paid_off.clone();
        let mut interest = vec![0.0; debts.len()];
        let mut paid = vec![0.0; debts.len()];
        let mut remaining_budget = monthly_budget;

        for (i, debt) in debts.iter().enumerate() {
            if balances[i] <= 0.0 {
                continue;
            }
            interest[i] = balances[i] * debt.monthly_rate();
            balances[i] += interest[i];
        }

        for (i, debt) in debts.iter().enumerate() {
            if balances[i] <= 0.0 {
                continue;
            }
            let pay = debt.min_pay.min(balances[i]);
            paid[i] += pay;
            balances[i] -= pay;
            remaining_budget -= pay;
        }

        let mut extra_target = None;
        if remaining_budget > 0.0 {
            if let Some(&idx) = order.iter().find(|&&idx| balances[idx] > PAYOFF_EPSILON) {
                let extra = remaining_budget.min(balances[idx]);
                paid[idx] += extra;
                balances[idx] -= extra;
                remaining_budget -= extra;
                extra_target = Some(idx);
            }
        }

        for (balance, payoff) in balances.iter_mut().zip(paid_off.iter_mut()) {
            if *balance <= PAYOFF_EPSILON {
                *balance = 0.0;
                if payoff.is_none() {
                    *payoff = Some(month);
                }
            }
        }

        let total_interest = self.total_interest + interest.iter().sum::<f64>();

        let snapshot = MonthlySnapshot {
            month,
            remaining_budget,
            cumulative_interest: total_interest,
            extra_target,
            debts: balances
                .iter()
                .zip(paid.iter())
                .zip(interest.iter())
                .map(|((&balance, &paid), &interest)| DebtMonth {
                    balance,
                    paid,
                    interest,
                })
                .collect(),
        };

        let next = Self {
            month,
            balances,
            total_interest,
            paid_off,
        };
        (next, snapshot)
    }
}

pub fn validate_inputs(debts: &[Debt], monthly_budget: f64) -> Result<(), SimulationError> {
    if debts.is_empty() {
        return Err(SimulationError::NoDebts);
    }

    for (i, debt) in debts.iter().enumerate() {
        if debt.name.trim().is_empty() {
            return Err(SimulationError::MissingName { position: i + 1 });
        }
        for (field, value) in [
            ("balance", debt.balance),
            ("APR", debt.apr_pct),
            ("minimum payment", debt.min_pay),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::NotFinite {
                    name: debt.name.clone(),
                    field,
                });
            }
            if value < 0.0 {
                return Err(SimulationError::Negative {
                    name: debt.name.clone(),
                    field,
                    value,
                });
            }
        }
    }

    if !monthly_budget.is_finite() || monthly_budget <= 0.0 {
        return Err(SimulationError::NonPositiveBudget(monthly_budget));
    }

    let minimums: f64 = debts.iter().map(|d| d.min_pay).sum();
    if minimums > monthly_budget {
        return Err(SimulationError::InsufficientBudget {
            budget: monthly_budget,
            minimums,
        });
    }

    Ok(())
}

/// Target order for extra payments, computed once from the starting balances.
/// Ties keep input order.
pub fn order_debts(debts: &[Debt], strategy: Strategy) -> Vec<usize> {
    let mut order = (0..debts.len()).collect::<Vec<_>>();
    match strategy {
        Strategy::Snowball => {
            order.sort_by(|&a, &b| debts[a].balance.total_cmp(&debts[b].balance));
        }
        Strategy::Avalanche => {
            order.sort_by(|&a, &b| debts[b].apr_pct.total_cmp(&debts[a].apr_pct));
        }
    }
    order
}

pub fn simulate(
    debts: &[Debt],
    monthly_budget: f64,
    strategy: Strategy,
) -> Result<SimulationRun, SimulationError> {
    validate_inputs(debts, monthly_budget)?;
    Ok(run_validated(debts, monthly_budget, strategy))
}

fn run_validated(debts: &[Debt], monthly_budget: f64, strategy: Strategy) -> SimulationRun {
    let order = order_debts(debts, strategy);
    let mut state = SimulationState::initial(debts);
    let mut snapshots = Vec::new();

    while state.has_outstanding() && state.month < HORIZON_MONTHS {
        let (next, snapshot) = state.step(debts, monthly_budget, &order);
        snapshots.push(snapshot);
        state = next;
    }

    let outcome = if state.has_outstanding() {
        warn!(
            ?strategy,
            months = state.month,
            "debts not paid off within horizon"
        );
        PayoffOutcome::HorizonExceeded {
            months: state.month,
            total_interest: state.total_interest,
        }
    } else {
        PayoffOutcome::Converged {
            months: state.month,
            total_interest: state.total_interest,
        }
    };
    debug!(
        ?strategy,
        months = outcome.months(),
        total_interest = outcome.total_interest(),
        "simulation finished"
    );

    SimulationRun {
        strategy,
        order,
        outcome,
        snapshots,
        paid_off: state.paid_off,
        debt_names: debts.iter().map(|d| d.name.clone()).collect(),
    }
}

/// Runs `chosen` and its complement over the same inputs. Validation happens once,
/// before either run.
pub fn compare_strategies(
    debts: &[Debt],
    monthly_budget: f64,
    chosen: Strategy,
) -> Result<StrategyComparison, SimulationError> {
    validate_inputs(debts, monthly_budget)?;
    let chosen_run = run_validated(debts, monthly_budget, chosen);
    let other_run = run_validated(debts, monthly_budget, chosen.complement());
    Ok(StrategyComparison {
        debts: debts.to_vec(),
        monthly_budget,
        chosen: chosen_run,
        other: other_run,
    })
}

impl StrategyComparison {
    /// Interest the chosen strategy saves over the other one (negative if it costs more).
    pub fn interest_saved(&self) -> f64 {
        self.other.outcome.total_interest() - self.chosen.outcome.total_interest()
    }

    pub fn months_saved(&self) -> i64 {
        i64::from(self.other.outcome.months()) - i64::from(self.chosen.outcome.months())
    }

    /// Total remaining balance per month for both runs. The shorter run reads as 0 after
    /// its last month.
    pub fn timeline(&self) -> Vec<TimelinePoint> {
        let len = self.chosen.snapshots.len().max(self.other.snapshots.len());
        (0..len)
            .map(|i| TimelinePoint {
                month: i as u32 + 1,
                chosen_total_balance: self
                    .chosen
                    .snapshots
                    .get(i)
                    .map_or(0.0, MonthlySnapshot::total_balance),
                other_total_balance: self
                    .other
                    .snapshots
                    .get(i)
                    .map_or(0.0, MonthlySnapshot::total_balance),
            })
            .collect()
    }
}
