use crate::demo::{run_demo, run_reference_listing, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lumen::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lumen",
    about = "Run and demonstrate the brotherhood membership service from the command line",
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
    /// Walk through enrolment, dues and ceremonies against an in-memory store
    Demo(DemoArgs),
    /// Print the standard role and ceremony-type catalogues
    ReferenceData,
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
        Command::Demo(args) => run_demo(args),
        Command::ReferenceData => {
            run_reference_listing();
            Ok(())
        }
    }
}
