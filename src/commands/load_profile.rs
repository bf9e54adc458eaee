use std::path::PathBuf;

use crate::{connection, profile, registers};
use tracing::info;

/// Upload a profile file into the chamber controller.
#[derive(clap::Parser)]
pub struct Args {
    /// Path to the profile file: one comma-separated header row followed by
    /// one row per step.
    file: PathBuf,

    /// Start the profile from step 1 once the controller has stored it.
    #[arg(long)]
    start: bool,

    #[clap(flatten)]
    connection: connection::Args,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not read the profile file at {1:?}")]
    ReadFile(#[source] std::io::Error, PathBuf),
    #[error(transparent)]
    Profile(#[from] profile::Error),
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
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|e| Error::ReadFile(e, args.file.clone()))?;
    let profile = profile::Profile::parse(&text)?;
    info!(message = "profile parsed", name = profile.name(), steps = profile.step_count());
    let connection = connection::Connection::new(&args.connection).await?;
    let blocks = profile::upload(&connection, &profile).await?;
    println!("stored {blocks} blocks ({} steps)", profile.step_count());
    if args.start {
        connection
            .write_register(registers::PROFILE_START_STEP_ADDRESS, 1)
            .await?;
        connection
            .write_register(registers::PROFILE_CONTROL_ADDRESS, registers::PROFILE_CONTROL_RUN)
            .await?;
        println!("profile started");
    }
    Ok(())
}
