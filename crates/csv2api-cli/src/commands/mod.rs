mod generate;
mod import;
mod ping;
mod testcsv;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let contract = cli.importing.contract();

    match &cli.command {
        Command::Import(args) => import::run(args, contract, cli.pretty).await,
        Command::TestCsv(args) => testcsv::run(args, contract, cli.verbose),
        Command::Ping(args) => ping::run(args, contract, cli.pretty).await,
        Command::Generate(args) => generate::run(args, contract),
    }
}
