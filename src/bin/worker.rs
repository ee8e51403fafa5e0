use argh::FromArgs;
use eyre::Context;
use lockstep::{config::Config, lockstep_default_zenoh_prefix, nodes::worker};
use std::{fs, path::PathBuf, sync::Arc};
use zenoh::prelude::ZFuture;

#[derive(FromArgs)]
/// Lockstep worker node
struct Args {
    #[argh(positional)]
    config_file: PathBuf,

    /// the id of this worker, i.e. its index in the cluster
    #[argh(positional)]
    worker_id: usize,
}

fn main() -> eyre::Result<()> {
    let args: Args = argh::from_env();

    if let Err(err) = set_up_logger(args.worker_id) {
        eprintln!(
            "{:?}",
            eyre::Error::new(err).wrap_err("failed to set up logger")
        );
    }

    let config: Config = serde_yaml::from_str(
        &fs::read_to_string(&args.config_file).context("failed to read config file")?,
    )
    .context("failed to parse config file")?;

    let zenoh = zenoh::open(zenoh::config::Config::default())
        .wait()
        .map_err(|e| eyre::eyre!(e))?;
    let zenoh_prefix = lockstep_default_zenoh_prefix();

    worker::run(
        &config,
        Arc::new(zenoh),
        zenoh_prefix.to_owned(),
        args.worker_id,
    )
}

fn set_up_logger(worker_id: usize) -> Result<(), fern::InitError> {
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
        .chain(std::io::stdout())
        .chain(fern::log_file(format!("worker_{}.log", worker_id))?)
        .apply()?;
    Ok(())
}
