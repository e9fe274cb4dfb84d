use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Probability at or above which an employee is predicted to leave
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Lower bounds of the MEDIUM, HIGH and CRITICAL tiers
pub const MEDIUM_RISK_FROM: f64 = 0.3;
pub const HIGH_RISK_FROM: f64 = 0.5;
pub const CRITICAL_RISK_FROM: f64 = 0.7;

/// Attrition risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a churn probability with half-open tiers:
    /// `[0, 0.3)` LOW, `[0.3, 0.5)` MEDIUM, `[0.5, 0.7)` HIGH, `[0.7, 1.0]` CRITICAL.
    pub fn from_probability(probability: f64) -> Self {
        if probability < MEDIUM_RISK_FROM {
            RiskLevel::Low
        } else if probability < HIGH_RISK_FROM {
            RiskLevel::Medium
        } else if probability < CRITICAL_RISK_FROM {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// Binary attrition decision. Independent of the risk tier.
pub fn decide(probability: f64) -> u8 {
    u8::from(probability >= DECISION_THRESHOLD)
}

/// Outcome of scoring one employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Probability of attrition in `[0, 1]`
    pub churn_probability: f64,

    /// 1 when `churn_probability >= 0.5`
    pub prediction: u8,

    pub risk_level: RiskLevel,

    /// Name and version of the model that produced the score
    pub model_identifier: String,
}

impl PredictionResult {
    pub fn from_probability(probability: f64, model_identifier: impl Into<String>) -> Self {
        Self {
            churn_probability: probability,
            prediction: decide(probability),
            risk_level: RiskLevel::from_probability(probability),
            model_identifier: model_identifier.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn just_below(x: f64) -> f64 {
        f64::from_bits(x.to_bits() - 1)
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(just_below(0.3)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(just_below(0.5)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(just_below(0.7)), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.7), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_decision_is_independent_of_tier() {
        assert_eq!(decide(0.3), 0);
        assert_eq!(decide(just_below(0.5)), 0);
        assert_eq!(decide(0.5), 1);

        let medium = PredictionResult::from_probability(0.45, "m@v1");
        assert_eq!(medium.risk_level, RiskLevel::Medium);
        assert_eq!(medium.prediction, 0);
    }

    #[test]
    fn test_half_probability_is_high_and_positive() {
        let result = PredictionResult::from_probability(0.5, "logistic_regression@v1");
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.prediction, 1);
    }

    #[test]
    fn test_risk_level_wire_format() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
        assert_eq!(RiskLevel::Medium.to_string(), "MEDIUM");
        assert_eq!(RiskLevel::from_str("HIGH").unwrap(), RiskLevel::High);
        assert_eq!(RiskLevel::Low.as_label(), "LOW");
    }
}
