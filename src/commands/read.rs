use crate::registers::{RegisterIndex, Value};
use crate::{connection, modbus, output, registers};

/// Read chamber registers and decode their values.
#[derive(clap::Parser)]
pub struct Args {
    /// Register names or decimal addresses to read.
    #[arg(required = true)]
    registers: Vec<String>,

    /// Read this many consecutive registers starting at each requested one.
    #[arg(long, short = 'c', default_value = "1",
          value_parser = clap::value_parser!(u16).range(1..=modbus::MAX_SAFE_READ_COUNT as i64))]
    count: u16,

    #[clap(flatten)]
    connection: connection::Args,
    #[clap(flatten)]
    output: output::Args,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Register(#[from] registers::Error),
    #[error(transparent)]
    Connection(#[from] connection::Error),
    #[error(transparent)]
    Output(#[from] output::Error),
    #[error("could not create the async runtime")]
    CreateRuntime(#[source] std::io::Error),
}

#[derive(serde::Serialize)]
struct ReadRecord {
    address: u16,
    name: Option<&'static str>,
    raw: u16,
    value: Value,
}

pub fn run(args: Args) -> Result<(), Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::CreateRuntime)?;
    runtime.block_on(run_async(args))
}

async fn run_async(args: Args) -> Result<(), Error> {
    // Resolve every requested register up-front so typos fail before any
    // wire traffic.
    let mut starts = Vec::with_capacity(args.registers.len());
    for register in &args.registers {
        // Bare addresses outside the catalog are allowed for reads; they
        // come back as raw words.
        match register.parse::<u16>() {
            Ok(address) => starts.push(address),
            Err(_) => starts.push(RegisterIndex::lookup(register)?.address()),
        }
    }
    let connection = connection::Connection::new(&args.connection).await?;
    let mut output = args.output.to_output()?;
    output.headers(vec!["Address", "Name", "Raw", "Value"])?;
    for start in starts {
        let values = connection.read_registers(start, args.count).await?;
        for offset in 0..args.count {
            let address = start + offset;
            let Some(raw) = modbus::extract_word(start, address, &values) else {
                continue;
            };
            let index = RegisterIndex::from_address(address);
            let value = match index {
                Some(index) => index.decode(raw),
                None => Value::Integer(raw),
            };
            let name = index.map(|index| index.name());
            output.result(
                || {
                    vec![
                        address.to_string(),
                        name.unwrap_or_default().to_string(),
                        format!("{raw:#06X}"),
                        value.to_string(),
                    ]
                },
                || ReadRecord { address, name, raw, value },
            )?;
        }
    }
    output.commit()?;
    Ok(())
}
