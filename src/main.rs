use clap::Parser;
use rubric_grader::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Grade(args) => cli::grade::run(args).await,
    }
}
