use crate::evaluate::{run_evaluate, EvaluateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use patent_grader::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Patent Suitability Grader",
    about = "Grade patents by citation originality and market potential",
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
    /// Run one batch offline and print its report
    Evaluate(EvaluateArgs),
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
        Command::Evaluate(args) => run_evaluate(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_accepts_country_lists() {
        let cli = Cli::try_parse_from([
            "patent-grader-api",
            "evaluate",
            "solid-state battery",
            "--countries",
            "US,KR",
            "--top-n",
            "2",
            "--no-judge",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Evaluate(args)) => {
                assert_eq!(args.query, "solid-state battery");
                assert_eq!(args.countries, vec!["US", "KR"]);
                assert_eq!(args.top_n, Some(2));
                assert!(args.no_judge);
                assert!(!args.json);
            }
            other => panic!("expected evaluate command, got {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["patent-grader-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
