use crate::registers::{Input, RegisterIndex};
use crate::{connection, registers};

/// Encode a value and write it to a chamber register.
///
/// Values take the shape the register's rule expects: a plain or decimal
/// number, a `high:low` byte pair, or an enumeration member name such as
/// `run/resume`.
#[derive(clap::Parser)]
pub struct Args {
    /// The register name or decimal address to write.
    register: String,

    /// The value to write.
    value: String,

    #[clap(flatten)]
    connection: connection::Args,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Register(#[from] registers::Error),
    #[error(transparent)]
    Connection(#[from] connection::Error),
    #[error("could not create the async runtime")]
    CreateRuntime(#[source] std::io::Error),
}

pub fn run(args: Args) -> Result<(), Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::CreateRuntime)?;
    runtime.block_on(run_async(args))
}

async fn run_async(args: Args) -> Result<(), Error> {
    let register = RegisterIndex::lookup(&args.register)?;
    let Ok(input) = args.value.parse::<Input>();
    let raw = register.encode(&input)?;
    let connection = connection::Connection::new(&args.connection).await?;
    connection.write_register(register.address(), raw).await?;
    println!(
        "{} ({}) = {} (raw {raw:#06X})",
        register.name(),
        register.address(),
        register.decode(raw),
    );
    Ok(())
}
