use csv2api_core::{check_batch, BatchCheck, CsvSource, EntityContract};

use crate::cli::TestCsvArgs;
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn run(args: &TestCsvArgs, contract: &EntityContract, verbose: bool) -> Result<(), CliError> {
    let normalizer = config::normalizer(&args.fields);
    // structural faults are reported like any other problem
    let check = match CsvSource::open(&args.csv_file).and_then(CsvSource::read_all) {
        Ok(batch) => check_batch(&batch.headers, batch.records, contract, &normalizer),
        Err(error) => {
            let mut check = BatchCheck::default();
            check.errors.insert(error.to_string(), 1);
            check
        }
    };

    if let Some(first) = &check.first {
        output::print_lines(["Review this structure for correctness:"])?;
        output::render(first, true)?;
    }

    if check.is_clean() {
        return output::print_lines(["SUCCESS"]);
    }

    let mut lines = vec![String::from("The following errors were reported:")];
    if verbose {
        lines.extend(
            check
                .errors
                .iter()
                .map(|(message, count)| format!("  {message} (x{count})")),
        );
    } else {
        lines.extend(check.errors.keys().map(|message| format!("  {message}")));
    }
    lines.push(String::from("FAILURE"));
    output::print_error_lines(lines)?;

    Err(CliError::CheckFailed {
        problems: check.errors.values().sum(),
    })
}
