use crate::commands::{
    run_export, run_import_federations, run_report, ExportArgs, ImportFederationsArgs, ReportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use exhibit_registry::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Exhibit Registry",
    about = "Run the exhibition registration service and its staff tooling",
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
    /// Write the staff export archive or workbook to disk
    Export(ExportArgs),
    /// Print the exhibit catalog grouped by class or country
    Report(ReportArgs),
    /// Load national federations from a CSV file
    ImportFederations(ImportFederationsArgs),
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
        Command::Export(args) => run_export(args),
        Command::Report(args) => run_report(args),
        Command::ImportFederations(args) => run_import_federations(args),
    }
}
