use serde::Deserialize;

use super::domain::{Dependents, Feature, LoanApplication, PropertyArea};

/// Wire schema for a loan application. Every field is optional at this layer so a
/// missing value is reported by name instead of as a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoanApplicationRequest {
    #[serde(default)]
    pub gender: Option<f64>,
    #[serde(default)]
    pub married: Option<f64>,
    #[serde(default)]
    pub dependents: Option<DependentsInput>,
    #[serde(default)]
    pub education: Option<f64>,
    #[serde(default)]
    pub self_employed: Option<f64>,
    #[serde(default)]
    pub applicant_income: Option<f64>,
    #[serde(default)]
    pub coapplicant_income: Option<f64>,
    #[serde(default)]
    pub loan_amount: Option<f64>,
    #[serde(default)]
    pub loan_term: Option<f64>,
    #[serde(default)]
    pub credit_history: Option<f64>,
    #[serde(default)]
    pub property_area: Option<f64>,
}

/// Dependents arrive either as a number or as the dataset label ("0".."3", "3+").
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DependentsInput {
    Count(f64),
    Label(String),
}

/// Body accepted by `POST /predict`. Without `model` the request follows the
/// single-model contract.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub application: LoanApplicationRequest,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field '{field}': {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    fn missing(feature: Feature) -> Self {
        Self::new(feature.name(), "field is required")
    }
}

impl LoanApplicationRequest {
    /// Checks every field in canonical feature order and returns the first failure.
    pub fn validate(&self) -> Result<LoanApplication, ValidationError> {
        Ok(LoanApplication {
            gender: binary_flag(Feature::Gender, self.gender)?,
            married: binary_flag(Feature::Married, self.married)?,
            dependents: dependents(self.dependents.as_ref())?,
            education: binary_flag(Feature::Education, self.education)?,
            self_employed: binary_flag(Feature::SelfEmployed, self.self_employed)?,
            applicant_income: non_negative(Feature::ApplicantIncome, self.applicant_income)?,
            coapplicant_income: non_negative(
                Feature::CoapplicantIncome,
                self.coapplicant_income,
            )?,
            loan_amount: non_negative(Feature::LoanAmount, self.loan_amount)?,
            loan_term: positive(Feature::LoanTerm, self.loan_term)?,
            credit_history: binary_flag(Feature::CreditHistory, self.credit_history)?,
            property_area: property_area(self.property_area)?,
        })
    }
}

/// Threshold overrides must be a probability.
pub fn validate_threshold(threshold: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match threshold {
        Some(value) if !value.is_finite() || !(0.0..=1.0).contains(&value) => Err(
            ValidationError::new("threshold", "must be a number between 0 and 1"),
        ),
        other => Ok(other),
    }
}

fn required(feature: Feature, value: Option<f64>) -> Result<f64, ValidationError> {
    let value = value.ok_or_else(|| ValidationError::missing(feature))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::new(feature.name(), "must be a finite number"))
    }
}

fn binary_flag(feature: Feature, value: Option<f64>) -> Result<bool, ValidationError> {
    let value = required(feature, value)?;
    if value == 0.0 {
        Ok(false)
    } else if value == 1.0 {
        Ok(true)
    } else {
        Err(ValidationError::new(feature.name(), "must be 0 or 1"))
    }
}

fn non_negative(feature: Feature, value: Option<f64>) -> Result<f64, ValidationError> {
    let value = required(feature, value)?;
    if value < 0.0 {
        return Err(ValidationError::new(feature.name(), "must not be negative"));
    }
    Ok(value)
}

fn positive(feature: Feature, value: Option<f64>) -> Result<f64, ValidationError> {
    let value = required(feature, value)?;
    if value <= 0.0 {
        return Err(ValidationError::new(feature.name(), "must be greater than 0"));
    }
    Ok(value)
}

fn dependents(value: Option<&DependentsInput>) -> Result<Dependents, ValidationError> {
    let field = Feature::Dependents.name();
    match value {
        None => Err(ValidationError::missing(Feature::Dependents)),
        Some(DependentsInput::Label(label)) => label
            .parse::<Dependents>()
            .map_err(|reason| ValidationError::new(field, reason)),
        Some(DependentsInput::Count(count)) => {
            let count = required(Feature::Dependents, Some(*count))?;
            if count < 0.0 || count.fract() != 0.0 {
                return Err(ValidationError::new(
                    field,
                    "must be a whole number of dependents",
                ));
            }
            Ok(Dependents::new(count as u64))
        }
    }
}

fn property_area(value: Option<f64>) -> Result<PropertyArea, ValidationError> {
    let value = required(Feature::PropertyArea, value)?;
    let area = if value.fract() == 0.0 && (0.0..=2.0).contains(&value) {
        PropertyArea::from_code(value as u8)
    } else {
        None
    };
    area.ok_or_else(|| {
        ValidationError::new(
            Feature::PropertyArea.name(),
            "must be 0 (rural), 1 (semiurban) or 2 (urban)",
        )
    })
}
