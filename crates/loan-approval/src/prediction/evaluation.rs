//! Offline comparison of the registered classifiers on a labeled, encoded dataset.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use super::domain::{Decision, Feature, LoanApplication, ModelName, FEATURE_COUNT};
use super::request::{
    validate_threshold, DependentsInput, LoanApplicationRequest, ValidationError,
};
use super::service::{PredictionError, PredictionService};

const LABEL_COLUMN: &str = "loan_status";

/// One dataset row: a validated application and whether it was approved.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledApplication {
    pub application: LoanApplication,
    pub approved: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    fn record(&mut self, approved: bool, decision: Decision) {
        match (approved, decision) {
            (false, Decision::Rejected) => self.true_negative += 1,
            (false, Decision::Approved) => self.false_positive += 1,
            (true, Decision::Rejected) => self.false_negative += 1,
            (true, Decision::Approved) => self.true_positive += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_negative + self.true_positive) as f64 / total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEvaluation {
    pub model: ModelName,
    pub accuracy: f64,
    /// `None` when the dataset holds a single class.
    pub roc_auc: Option<f64>,
    pub average_precision: Option<f64>,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub approved: usize,
    pub threshold: f64,
    pub models: Vec<ModelEvaluation>,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("unable to open dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to read dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("dataset row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: ValidationError,
    },
    #[error("dataset has no rows")]
    Empty,
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

pub fn load_dataset(path: &Path) -> Result<Vec<LabeledApplication>, EvaluationError> {
    let file = File::open(path)?;
    read_dataset(file)
}

/// Reads a CSV whose header names the eleven features and `loan_status`, in any order.
pub fn read_dataset<R: Read>(reader: R) -> Result<Vec<LabeledApplication>, EvaluationError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or(EvaluationError::MissingColumn(name))
    };
    let mut feature_columns = [0usize; FEATURE_COUNT];
    for feature in Feature::ORDER {
        feature_columns[feature.index()] = column(feature.name())?;
    }
    let label_column = column(LABEL_COLUMN)?;

    let mut rows = Vec::new();
    for (position, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = position + 1;
        let field = |feature: Feature| record.get(feature_columns[feature.index()]);

        let request =
            row_request(&field).map_err(|source| EvaluationError::Row { row, source })?;
        let application = request
            .validate()
            .map_err(|source| EvaluationError::Row { row, source })?;
        let approved = parse_label(record.get(label_column))
            .map_err(|source| EvaluationError::Row { row, source })?;

        rows.push(LabeledApplication {
            application,
            approved,
        });
    }

    Ok(rows)
}

fn row_request<'a>(
    field: &impl Fn(Feature) -> Option<&'a str>,
) -> Result<LoanApplicationRequest, ValidationError> {
    let number = |feature: Feature| -> Result<Option<f64>, ValidationError> {
        match field(feature).filter(|raw| !raw.is_empty()) {
            None => Ok(None),
            Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| {
                ValidationError::new(feature.name(), format!("'{raw}' is not a number"))
            }),
        }
    };
    let dependents = field(Feature::Dependents)
        .filter(|raw| !raw.is_empty())
        .map(|raw| match raw.parse::<f64>() {
            Ok(count) => DependentsInput::Count(count),
            Err(_) => DependentsInput::Label(raw.to_string()),
        });

    Ok(LoanApplicationRequest {
        gender: number(Feature::Gender)?,
        married: number(Feature::Married)?,
        dependents,
        education: number(Feature::Education)?,
        self_employed: number(Feature::SelfEmployed)?,
        applicant_income: number(Feature::ApplicantIncome)?,
        coapplicant_income: number(Feature::CoapplicantIncome)?,
        loan_amount: number(Feature::LoanAmount)?,
        loan_term: number(Feature::LoanTerm)?,
        credit_history: number(Feature::CreditHistory)?,
        property_area: number(Feature::PropertyArea)?,
    })
}

fn parse_label(raw: Option<&str>) -> Result<bool, ValidationError> {
    match raw.map(str::trim) {
        Some("1") | Some("1.0") | Some("Y") | Some("y") => Ok(true),
        Some("0") | Some("0.0") | Some("N") | Some("n") => Ok(false),
        Some(other) => Err(ValidationError::new(
            LABEL_COLUMN,
            format!("'{other}' is not one of 0, 1, Y, N"),
        )),
        None => Err(ValidationError::new(LABEL_COLUMN, "field is required")),
    }
}

/// Scores every registered model on the same rows.
pub fn evaluate(
    service: &PredictionService,
    rows: &[LabeledApplication],
    threshold: Option<f64>,
) -> Result<EvaluationReport, EvaluationError> {
    if rows.is_empty() {
        return Err(EvaluationError::Empty);
    }
    let threshold = validate_threshold(threshold)
        .map_err(PredictionError::from)?
        .unwrap_or(service.settings().default_threshold);
    let labels: Vec<bool> = rows.iter().map(|row| row.approved).collect();

    let mut models = Vec::new();
    for model in service.models() {
        let mut confusion = ConfusionMatrix::default();
        let mut scores = Vec::with_capacity(rows.len());
        for row in rows {
            let result = service.predict(&row.application, model, Some(threshold))?;
            confusion.record(row.approved, result.decision);
            scores.push(result.probability);
        }

        models.push(ModelEvaluation {
            model,
            accuracy: confusion.accuracy(),
            roc_auc: roc_auc(&scores, &labels),
            average_precision: average_precision(&scores, &labels),
            confusion,
        });
    }

    Ok(EvaluationReport {
        samples: rows.len(),
        approved: labels.iter().filter(|approved| **approved).count(),
        threshold,
        models,
    })
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share their rank.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let positives = labels.iter().filter(|label| **label).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group shares the average of start+1..=end+1.
        let rank = (start + end) as f64 / 2.0 + 1.0;
        let tied_positives = order[start..=end].iter().filter(|i| labels[**i]).count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end + 1;
    }

    let positives = positives as f64;
    let negatives = negatives as f64;
    Some((positive_rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives))
}

/// Step-wise average precision over distinct score thresholds, highest first.
pub fn average_precision(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let positives = labels.iter().filter(|label| **label).count();
    if positives == 0 || positives == labels.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));

    let (mut true_positive, mut seen) = (0usize, 0usize);
    let mut previous_recall = 0.0;
    let mut precision_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        true_positive += order[start..=end].iter().filter(|i| labels[**i]).count();
        seen += end - start + 1;

        let recall = true_positive as f64 / positives as f64;
        let precision = true_positive as f64 / seen as f64;
        precision_sum += (recall - previous_recall) * precision;
        previous_recall = recall;
        start = end + 1;
    }

    Some(precision_sum)
}
