use crate::commands::{run_evaluate, run_models, run_predict, EvaluateArgs, PredictArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_approval::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "loan-approval",
    about = "Serve and inspect loan approval predictions from pre-trained classifiers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single application read from a JSON file
    Predict(PredictArgs),
    /// Score a labelled CSV dataset with every registered model
    Evaluate(EvaluateArgs),
    /// List the classifiers found in the artifact directory
    Models(ArtifactArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ArtifactArgs {
    /// Override the configured artifact directory (scaler.json and models/)
    #[arg(long)]
    pub(crate) artifact_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) artifacts: ArtifactArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Predict(args) => run_predict(args),
        Command::Evaluate(args) => run_evaluate(args),
        Command::Models(args) => run_models(args),
    }
}
