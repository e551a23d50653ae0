use crate::demo::{run_credit_score, run_demo, CreditScoreArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use plms::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Personal Loan Servicing",
    about = "Run and demonstrate the personal loan servicing stack from the command line",
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
    /// Credit score utilities backed by the deterministic model
    Credit {
        #[command(subcommand)]
        command: CreditCommand,
    },
    /// Run an end-to-end CLI demo covering the credit gate, loan intake, and an EMI payment
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CreditCommand {
    /// Score a PAN and report loan eligibility
    Score(CreditScoreArgs),
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
        Command::Credit {
            command: CreditCommand::Score(args),
        } => run_credit_score(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
