use argh::FromArgs;
use eyre::Context;
use lockstep::{config::Config, lockstep_default_zenoh_prefix, nodes::client};
use std::{fs, io, path::PathBuf, sync::Arc};
use zenoh::prelude::ZFuture;

#[derive(FromArgs)]
/// Interactive lockstep client
struct Args {
    #[argh(positional)]
    config_file: PathBuf,
}

fn main() -> eyre::Result<()> {
    if let Err(err) = set_up_logger() {
        eprintln!(
            "{:?}",
            eyre::Error::new(err).wrap_err("failed to set up logger")
        );
    }

    let args: Args = argh::from_env();

    let config: Config = serde_yaml::from_str(
        &fs::read_to_string(&args.config_file).context("failed to read config file")?,
    )
    .context("failed to parse config file")?;

    let zenoh = zenoh::open(zenoh::config::Config::default())
        .wait()
        .map_err(|e| eyre::eyre!(e))?;
    let zenoh_prefix = lockstep_default_zenoh_prefix();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();

    client::run_interactive(
        &config,
        &mut stdin.lock(),
        &mut stdout.lock(),
        &mut stderr.lock(),
        Arc::new(zenoh),
        zenoh_prefix.to_owned(),
    )
}

fn set_up_logger() -> Result<(), fern::InitError> {
    // keep the prompt clean; logs go to a file only
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(fern::log_file("client.log")?)
        .apply()?;
    Ok(())
}
