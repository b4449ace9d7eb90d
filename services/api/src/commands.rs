use crate::cli::ArtifactArgs;
use crate::infra::{load_config, load_service};
use clap::Args;
use loan_approval::error::AppError;
use loan_approval::prediction::{
    evaluate, load_dataset, EvaluationReport, PredictRequest, PredictResponse, PredictionService,
};
use loan_approval::telemetry::{self, LogOutput};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// JSON file holding one application in the `/predict` request format
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Score with this model and answer in the model-selection format
    #[arg(long)]
    pub(crate) model: Option<String>,
    /// Override the decision threshold
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
    #[command(flatten)]
    pub(crate) artifacts: ArtifactArgs,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// CSV file with the eleven feature columns and `loan_status`
    #[arg(long)]
    pub(crate) dataset: PathBuf,
    /// Decision threshold used for the confusion matrices
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) artifacts: ArtifactArgs,
}

/// Loads config, logging and artifacts for a one-shot command. Logs go to stderr.
fn prepare(artifacts: ArtifactArgs) -> Result<PredictionService, AppError> {
    let config = load_config(artifacts)?;
    telemetry::init(&config.telemetry, LogOutput::Stderr)?;
    load_service(&config)
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let PredictArgs {
        input,
        model,
        threshold,
        artifacts,
    } = args;

    let raw = std::fs::read_to_string(&input)?;
    let mut request: PredictRequest = serde_json::from_str(&raw)?;
    if model.is_some() {
        request.model = model;
    }
    if threshold.is_some() {
        request.threshold = threshold;
    }

    let service = prepare(artifacts)?;
    let response = service.handle(&request)?;
    println!("{}", render_prediction(&response)?);
    Ok(())
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        dataset,
        threshold,
        json,
        artifacts,
    } = args;

    let service = prepare(artifacts)?;
    let rows = load_dataset(&dataset)?;
    let report = evaluate(&service, &rows, threshold)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

pub(crate) fn run_models(args: ArtifactArgs) -> Result<(), AppError> {
    let service = prepare(args)?;
    let settings = service.settings();

    println!("Registered models");
    for model in service.models() {
        let marker = if model == settings.default_model {
            " (default)"
        } else {
            ""
        };
        println!("- {} [{}]{}", model.label(), model, marker);
    }
    println!(
        "Thresholds: model selection {:.2} | default model {:.2}",
        settings.default_threshold, settings.simple_threshold
    );
    Ok(())
}

fn render_prediction(response: &PredictResponse) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(response)?)
}

fn render_report(report: &EvaluationReport) -> String {
    let mut out = format!(
        "Evaluated {} applications ({} approved) at threshold {:.2}\n",
        report.samples, report.approved, report.threshold
    );
    out.push_str(&format!(
        "{:<16} {:>8} {:>8} {:>8} {:>6} {:>6} {:>6} {:>6}\n",
        "model", "accuracy", "roc_auc", "avg_prec", "tn", "fp", "fn", "tp"
    ));
    for model in &report.models {
        out.push_str(&format!(
            "{:<16} {:>8.3} {:>8} {:>8} {:>6} {:>6} {:>6} {:>6}\n",
            model.model.as_str(),
            model.accuracy,
            optional_metric(model.roc_auc),
            optional_metric(model.average_precision),
            model.confusion.true_negative,
            model.confusion.false_positive,
            model.confusion.false_negative,
            model.confusion.true_positive,
        ));
    }
    out
}

fn optional_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.3}"))
}
