pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod dnd;
pub mod optimistic;
pub mod render;
pub mod task;
pub mod views;

use std::ffi::OsString;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::cli::{
  Command,
  GlobalCli,
  KeyVal
};
use crate::config::Config;
use crate::datastore::DataStore;

/// Entry point of the `lane` binary.
/// With no subcommand it shows the
/// work board.
#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli =
    GlobalCli::parse_from(pre.cleaned_args);
  cli::init_tracing(cli.verbose, cli.quiet)?;

  let cfg = load_config(
    cli.lanerc.as_deref(),
    pre.rc_overrides,
    cli.rc_overrides
  )?;
  let mut store =
    open_store(&cfg, cli.data.as_deref())?;
  let renderer =
    render::Renderer::new(&cfg)?;

  let command = cli
    .command
    .unwrap_or(Command::Board {
      json: false
    });
  commands::dispatch(
    &mut store, &cfg, &renderer, command
  )
}

/// Positional `rc.` overrides apply
/// first, `--rc` flags after them.
fn load_config(
  lanerc: Option<&Path>,
  positional: Vec<(String, String)>,
  flags: Vec<KeyVal>
) -> anyhow::Result<Config> {
  let mut cfg = Config::load(lanerc)?;
  cfg.apply_overrides(
    positional.into_iter().chain(
      flags
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  Ok(cfg)
}

fn open_store(
  cfg: &Config,
  data: Option<&Path>
) -> anyhow::Result<DataStore> {
  let data_dir =
    config::resolve_data_dir(cfg, data)
      .context(
        "failed to resolve data directory"
      )?;
  let store = DataStore::open(&data_dir)
    .with_context(|| {
      format!(
        "failed to open datastore at {}",
        data_dir.display()
      )
    })?;
  info!(
    data_dir = %data_dir.display(),
    "lane ready"
  );
  Ok(store)
}
