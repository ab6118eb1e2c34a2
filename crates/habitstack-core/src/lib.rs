pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod notice;
pub mod ordering;
pub mod prefs;
pub mod reflection;
pub mod render;
pub mod session;
pub mod store;
pub mod task;
pub mod views;
pub mod workspace;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::config::Backend;
use crate::store::{
  LocalTaskStore,
  RemoteTaskStore,
  TaskStore
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting habitstack"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store: Box<dyn TaskStore> =
    match cfg.backend()? {
      | Backend::Local => {
        Box::new(
          LocalTaskStore::open(
            &data_dir
          )
          .with_context(|| {
            format!(
              "failed to open task \
               store at {}",
              data_dir.display()
            )
          })?
        )
      }
      | Backend::Remote => {
        Box::new(
          RemoteTaskStore::new(
            cfg.remote()?
          )
          .context(
            "failed to configure \
             remote task store"
          )?
        )
      }
    };

  let mut workspace =
    workspace::Workspace::new(
      store,
      cfg.user()?,
      cfg.session_settings()?
    );
  let prefs =
    prefs::PreferenceStore::load(
      &data_dir
    )
    .context(
      "failed to load preferences"
    )?;
  let reflections =
    reflection::ReflectionLog::load(
      &data_dir
    )
    .context(
      "failed to load reflections"
    )?;

  let mut renderer =
    render::Renderer::new(&cfg)?;
  renderer.set_notifications(
    prefs.get().notifications
  );

  let mut ctx = commands::Context {
    workspace: &mut workspace,
    prefs,
    reflections,
    cfg: &cfg,
    renderer: &mut renderer
  };
  commands::dispatch(
    &mut ctx,
    cli.command
  )?;

  info!("done");
  Ok(())
}
