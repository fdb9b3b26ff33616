use std::collections::BTreeMap;

use csv2api_core::{EntityContract, Generator};

use crate::cli::GenerateArgs;
use crate::error::CliError;

pub fn run(args: &GenerateArgs, contract: &'static EntityContract) -> Result<(), CliError> {
    let extra = args
        .extra
        .iter()
        .map(|field| (field.key.clone(), field.value.clone()))
        .collect::<BTreeMap<_, _>>();

    let stdout = std::io::stdout().lock();
    Generator::new(contract, &extra).write(args.count, stdout)?;
    Ok(())
}
