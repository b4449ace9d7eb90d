use serde::{Deserialize, Serialize};

use super::domain::PredictionResult;

/// Body returned by the single-model contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStatusResponse {
    pub loan_status: String,
    pub approval_probability: f64,
}

/// Body returned when the caller selected a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDecisionResponse {
    pub model_used: String,
    pub approval_probability: f64,
    pub decision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    LoanStatus(LoanStatusResponse),
    ModelDecision(ModelDecisionResponse),
}

impl PredictResponse {
    pub fn loan_status(result: &PredictionResult) -> Self {
        Self::LoanStatus(LoanStatusResponse {
            loan_status: result.decision.label().to_string(),
            approval_probability: result.approval_percentage(),
        })
    }

    pub fn model_decision(result: &PredictionResult) -> Self {
        Self::ModelDecision(ModelDecisionResponse {
            model_used: result.model.as_str().to_string(),
            approval_probability: result.approval_percentage(),
            decision: result.decision.label().to_string(),
        })
    }
}
