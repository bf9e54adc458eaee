use crate::output;
use crate::registers::{Mode, Rule, Value};

/// Search and output the known chamber registers.
#[derive(clap::Parser)]
pub struct Args {
    /// Only list registers whose name, address or description contains this
    /// pattern.
    filter: Option<String>,
    #[clap(flatten)]
    output: output::Args,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Output(#[from] output::Error),
}

#[derive(serde::Serialize)]
pub struct RegisterSchema {
    pub address: u16,
    pub name: &'static str,
    pub mode: Mode,
    pub rule: Rule,
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub description: &'static str,
}

impl RegisterSchema {
    pub fn all_registers() -> impl Iterator<Item = Self> {
        use crate::registers::*;
        use std::iter::zip;
        zip(
            zip(zip(zip(zip(zip(ADDRESSES, NAMES), MODES), RULES), MINIMUM_VALUES), MAXIMUM_VALUES),
            DESCRIPTIONS,
        )
        .map(
            |((((((&address, &name), &mode), &rule), &minimum), &maximum), &description)| {
                RegisterSchema { address, name, mode, rule, minimum, maximum, description }
            },
        )
    }

    pub fn is_match(&self, pattern: &str) -> bool {
        let pattern = pattern.to_uppercase();
        self.name.contains(&pattern)
            || self.description.to_uppercase().contains(&pattern)
            || self.address.to_string().contains(&pattern)
    }
}

pub fn run(args: Args) -> Result<(), Error> {
    let mut output = args.output.to_output()?;
    output.headers(vec!["Address", "Name", "Mode", "Rule", "Min", "Max", "Description"])?;
    for register in RegisterSchema::all_registers() {
        if let Some(pattern) = &args.filter {
            if !register.is_match(pattern) {
                continue;
            }
        }
        output.result(
            || {
                vec![
                    register.address.to_string(),
                    register.name.to_string(),
                    register.mode.to_string(),
                    register.rule.to_string(),
                    register.minimum.map(|v| v.to_string()).unwrap_or_default(),
                    register.maximum.map(|v| v.to_string()).unwrap_or_default(),
                    register.description.to_string(),
                ]
            },
            || &register,
        )?;
    }
    output.commit()?;
    Ok(())
}
