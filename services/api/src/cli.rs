use crate::commands::{run_loss, run_score, LossArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gestor360::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Gestor 360",
    about = "Serve the Gestor 360° diagnostic API or score questionnaires offline",
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
    /// Score a questionnaire answer file and print the per-category breakdown
    Score(ScoreArgs),
    /// Estimate annual losses from an overall score and revenue
    Loss(LossArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Loss(args) => run_loss(args),
    }
}
