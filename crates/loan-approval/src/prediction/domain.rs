use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of features every scaler and classifier consumes.
pub const FEATURE_COUNT: usize = 11;

/// Input features in the order the scaler and classifiers were fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Gender,
    Married,
    Dependents,
    Education,
    SelfEmployed,
    ApplicantIncome,
    CoapplicantIncome,
    LoanAmount,
    LoanTerm,
    CreditHistory,
    PropertyArea,
}

impl Feature {
    /// Canonical feature order. Changing it invalidates every persisted artifact.
    pub const ORDER: [Feature; FEATURE_COUNT] = [
        Feature::Gender,
        Feature::Married,
        Feature::Dependents,
        Feature::Education,
        Feature::SelfEmployed,
        Feature::ApplicantIncome,
        Feature::CoapplicantIncome,
        Feature::LoanAmount,
        Feature::LoanTerm,
        Feature::CreditHistory,
        Feature::PropertyArea,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::Gender => "gender",
            Feature::Married => "married",
            Feature::Dependents => "dependents",
            Feature::Education => "education",
            Feature::SelfEmployed => "self_employed",
            Feature::ApplicantIncome => "applicant_income",
            Feature::CoapplicantIncome => "coapplicant_income",
            Feature::LoanAmount => "loan_amount",
            Feature::LoanTerm => "loan_term",
            Feature::CreditHistory => "credit_history",
            Feature::PropertyArea => "property_area",
        }
    }

    /// Position of the feature in [`Feature::ORDER`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw, unscaled feature values laid out in [`Feature::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub(crate) fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

/// Number of dependents, with "3+" collapsed into three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dependents(u8);

impl Dependents {
    pub const MAX: u8 = 3;

    /// Counts above the top bucket collapse into it.
    pub fn new(count: u64) -> Self {
        Self(count.min(u64::from(Self::MAX)) as u8)
    }

    pub fn count(self) -> u8 {
        self.0
    }
}

impl FromStr for Dependents {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "3+" => Ok(Self(Self::MAX)),
            other => other
                .parse::<u64>()
                .map(Self::new)
                .map_err(|_| format!("'{raw}' is not one of 0, 1, 2, 3, 3+")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyArea {
    Rural,
    Semiurban,
    Urban,
}

impl PropertyArea {
    pub fn code(self) -> u8 {
        match self {
            PropertyArea::Rural => 0,
            PropertyArea::Semiurban => 1,
            PropertyArea::Urban => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PropertyArea::Rural),
            1 => Some(PropertyArea::Semiurban),
            2 => Some(PropertyArea::Urban),
            _ => None,
        }
    }
}

/// A validated loan application. Built through
/// [`LoanApplicationRequest::validate`](super::request::LoanApplicationRequest::validate).
#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    pub gender: bool,
    pub married: bool,
    pub dependents: Dependents,
    pub education: bool,
    pub self_employed: bool,
    pub applicant_income: f64,
    pub coapplicant_income: f64,
    pub loan_amount: f64,
    pub loan_term: f64,
    pub credit_history: bool,
    pub property_area: PropertyArea,
}

impl LoanApplication {
    pub fn to_features(&self) -> FeatureVector {
        let flag = |value: bool| if value { 1.0 } else { 0.0 };
        FeatureVector([
            flag(self.gender),
            flag(self.married),
            f64::from(self.dependents.count()),
            flag(self.education),
            flag(self.self_employed),
            self.applicant_income,
            self.coapplicant_income,
            self.loan_amount,
            self.loan_term,
            flag(self.credit_history),
            f64::from(self.property_area.code()),
        ])
    }
}

/// Names under which classifiers can be registered and selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    NeuralNetwork,
    Svm,
    DecisionTree,
    Knn,
}

impl ModelName {
    pub const ALL: [ModelName; 4] = [
        ModelName::NeuralNetwork,
        ModelName::Svm,
        ModelName::DecisionTree,
        ModelName::Knn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelName::NeuralNetwork => "neural_network",
            ModelName::Svm => "svm",
            ModelName::DecisionTree => "decision_tree",
            ModelName::Knn => "knn",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelName::NeuralNetwork => "Neural Network",
            ModelName::Svm => "SVM",
            ModelName::DecisionTree => "Decision Tree",
            ModelName::Knn => "KNN",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = UnknownModel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ModelName::ALL
            .into_iter()
            .find(|name| name.as_str() == raw)
            .ok_or_else(|| UnknownModel(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model '{0}'")]
pub struct UnknownModel(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// Inclusive on the approved side.
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability >= threshold {
            Decision::Approved
        } else {
            Decision::Rejected
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }
}

/// Outcome of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub model: ModelName,
    pub probability: f64,
    pub threshold: f64,
    pub decision: Decision,
}

impl PredictionResult {
    /// Approval probability as a percentage rounded to two decimals.
    ///
    /// Display value only. `decision` was taken on the unrounded probability, so a record just
    /// under the threshold can report a percentage equal to it and still be rejected.
    pub fn approval_percentage(&self) -> f64 {
        (self.probability * 100.0 * 100.0).round() / 100.0
    }
}
