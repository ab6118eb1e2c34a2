use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::session::SessionSettings;
use crate::store::RemoteConfig;

const DEFAULTS: [(&str, &str); 9] = [
  ("data.location", "~/.habitstack"),
  ("store.backend", "local"),
  ("remote.table", "tasks"),
  ("session.break", "5"),
  ("session.work", "25"),
  ("session.standalone_break", "5"),
  ("session.autostart", "on"),
  ("session.autostart_delay", "3"),
  ("color", "on")
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
  Local,
  Remote
}

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    for (key, value) in DEFAULTS {
      cfg.map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    let rc_file = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc_file {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no rc file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn get_u32(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u32>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u32>().with_context(
          || {
            format!(
              "invalid number for \
               {key}: {v}"
            )
          }
        )
      })
      .transpose()
  }

  fn require_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        strict_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid boolean for {key}: \
             {v}"
          )
        })
      })
      .transpose()
  }

  pub fn backend(
    &self
  ) -> anyhow::Result<Backend> {
    match self
      .get("store.backend")
      .unwrap_or_default()
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "" | "local" => Ok(Backend::Local),
      | "remote" => Ok(Backend::Remote),
      | other => {
        Err(anyhow!(
          "unknown store.backend: \
           {other}"
        ))
      }
    }
  }

  /// Authenticated user. The local backend always has one.
  pub fn user(
    &self
  ) -> anyhow::Result<Option<String>> {
    let user = self
      .get("auth.user")
      .filter(|u| !u.trim().is_empty());
    match (self.backend()?, user) {
      | (_, Some(user)) => Ok(Some(user)),
      | (Backend::Local, None) => {
        Ok(Some("local".to_string()))
      }
      | (Backend::Remote, None) => Ok(None)
    }
  }

  pub fn remote(
    &self
  ) -> anyhow::Result<RemoteConfig> {
    let base_url = self
      .get("remote.url")
      .ok_or_else(|| {
        anyhow!(
          "remote.url is required for \
           the remote backend"
        )
      })?;
    let api_key = self
      .get("remote.api_key")
      .ok_or_else(|| {
        anyhow!(
          "remote.api_key is required \
           for the remote backend"
        )
      })?;
    Ok(RemoteConfig {
      base_url,
      api_key,
      table: self
        .get("remote.table")
        .unwrap_or_else(|| {
          "tasks".to_string()
        }),
      access_token: self
        .get("auth.token"),
      user_id: self.user()?
    })
  }

  pub fn session_settings(
    &self
  ) -> anyhow::Result<SessionSettings> {
    let defaults =
      SessionSettings::default();
    Ok(SessionSettings {
      break_minutes: self
        .get_u32("session.break")?
        .unwrap_or(defaults.break_minutes)
        .max(1),
      standalone_work_minutes: self
        .get_u32("session.work")?
        .unwrap_or(
          defaults
            .standalone_work_minutes
        )
        .max(1),
      standalone_break_minutes: self
        .get_u32(
          "session.standalone_break"
        )?
        .unwrap_or(
          defaults
            .standalone_break_minutes
        )
        .max(1),
      auto_start_next: self
        .require_bool(
          "session.autostart"
        )?
        .unwrap_or(
          defaults.auto_start_next
        ),
      auto_start_delay_secs: self
        .get_u32(
          "session.autostart_delay"
        )?
        .unwrap_or(
          defaults.auto_start_delay_secs
        )
    })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("HABITSTACKRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate =
    home.join(".habitstackrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".habitstack"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

pub fn strict_bool(
  s: &str
) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::{
    Backend,
    Config
  };

  #[test]
  fn loads_rc_with_include_and_overrides()
  {
    let dir =
      tempdir().expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "session.break = 10\n"
    )
    .expect("write include");
    let rc = dir.path().join("main.rc");
    fs::write(
      &rc,
      "# comment\nstore.backend = remote\n\
       remote.url = https://db.example.com\n\
       remote.api_key = anon # trailing\n\
       include extra.rc\n"
    )
    .expect("write rc");

    let mut cfg = Config::load(Some(&rc))
      .expect("load config");
    cfg.apply_overrides(vec![(
      "rc.auth.user".to_string(),
      "u-42".to_string()
    )]);

    assert_eq!(
      cfg.backend().expect("backend"),
      Backend::Remote
    );
    let remote =
      cfg.remote().expect("remote");
    assert_eq!(remote.api_key, "anon");
    assert_eq!(remote.table, "tasks");
    assert_eq!(
      remote.user_id.as_deref(),
      Some("u-42")
    );
    let settings = cfg
      .session_settings()
      .expect("settings");
    assert_eq!(settings.break_minutes, 10);
    assert_eq!(
      settings.standalone_work_minutes,
      25
    );
  }

  #[test]
  fn rejects_invalid_numbers() {
    let dir =
      tempdir().expect("tempdir");
    let rc = dir.path().join("rc");
    fs::write(
      &rc,
      "session.work = soon\n"
    )
    .expect("write rc");
    let cfg = Config::load(Some(&rc))
      .expect("load config");
    assert!(
      cfg.session_settings().is_err()
    );
  }

  #[test]
  fn local_backend_has_implicit_user() {
    let dir =
      tempdir().expect("tempdir");
    let rc = dir.path().join("rc");
    fs::write(&rc, "").expect("write rc");
    let cfg = Config::load(Some(&rc))
      .expect("load config");
    assert_eq!(
      cfg.user().expect("user").as_deref(),
      Some("local")
    );
  }
}
