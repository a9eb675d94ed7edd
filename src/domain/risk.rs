//! Position sizing and risk/reward advisory.
//!
//! Nothing here blocks a trade: sizing is a pure formula and validation
//! only produces warning strings for the caller to act on.

use serde::Serialize;

use crate::domain::metrics::serialize_ratio;

/// Advisory thresholds. Percentages are expressed as percent (2.0 = 2%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskConfig {
    pub max_position_risk_pct: f64,
    pub min_risk_reward: f64,
    pub min_stop_distance_pct: f64,
    pub max_stop_distance_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_position_risk_pct: 2.0,
            min_risk_reward: 1.5,
            min_stop_distance_pct: 0.1,
            max_stop_distance_pct: 2.0,
        }
    }
}

/// Entry, exits and size of a (proposed or open) position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradePlan {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_amount: f64,
    pub potential_reward: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub risk_reward_ratio: f64,
    pub position_risk_percent: f64,
    pub recommended_size: f64,
    pub warnings: Vec<String>,
}

/// (balance * risk_fraction) / |entry - stop|.
///
/// Returns 0.0 when entry and stop coincide; the caller treats a
/// non-positive size as "do not trade".
pub fn recommend_size(balance: f64, risk_fraction: f64, entry: f64, stop: f64) -> f64 {
    let distance = (entry - stop).abs();
    if distance == 0.0 || !distance.is_finite() {
        return 0.0;
    }
    (balance * risk_fraction) / distance
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        RiskManager { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn assess_risk(&self, plan: &TradePlan, balance: f64, risk_fraction: f64) -> RiskAssessment {
        let risk_amount = (plan.entry - plan.stop_loss).abs() * plan.size;
        let potential_reward = (plan.take_profit - plan.entry).abs() * plan.size;
        RiskAssessment {
            risk_amount,
            potential_reward,
            risk_reward_ratio: ratio(potential_reward, risk_amount),
            position_risk_percent: position_risk_percent(risk_amount, balance),
            recommended_size: recommend_size(balance, risk_fraction, plan.entry, plan.stop_loss),
            warnings: self.validate(plan, balance),
        }
    }

    /// Advisory warnings; an empty list means nothing to flag.
    pub fn validate(&self, plan: &TradePlan, balance: f64) -> Vec<String> {
        let mut warnings = Vec::new();
        let risk_amount = (plan.entry - plan.stop_loss).abs() * plan.size;
        let reward = (plan.take_profit - plan.entry).abs() * plan.size;

        let rr = ratio(reward, risk_amount);
        if rr < self.config.min_risk_reward {
            warnings.push(format!(
                "risk/reward ratio {:.2} is below minimum {:.2}",
                rr, self.config.min_risk_reward
            ));
        }

        let risk_pct = position_risk_percent(risk_amount, balance);
        if risk_pct > self.config.max_position_risk_pct {
            warnings.push(format!(
                "position risk {:.2}% exceeds maximum {:.2}%",
                risk_pct, self.config.max_position_risk_pct
            ));
        }

        if plan.entry != 0.0 {
            let stop_pct = (plan.entry - plan.stop_loss).abs() / plan.entry.abs() * 100.0;
            if stop_pct < self.config.min_stop_distance_pct {
                warnings.push(format!(
                    "stop distance {:.3}% is tighter than {:.3}%",
                    stop_pct, self.config.min_stop_distance_pct
                ));
            } else if stop_pct > self.config.max_stop_distance_pct {
                warnings.push(format!(
                    "stop distance {:.3}% is wider than {:.3}%",
                    stop_pct, self.config.max_stop_distance_pct
                ));
            }
        }
        warnings
    }
}

fn ratio(reward: f64, risk: f64) -> f64 {
    if risk > 0.0 {
        reward / risk
    } else if reward > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

fn position_risk_percent(risk_amount: f64, balance: f64) -> f64 {
    if balance > 0.0 {
        risk_amount / balance * 100.0
    } else {
        0.0
    }
}
