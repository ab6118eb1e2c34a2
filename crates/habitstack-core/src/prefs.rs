//! Local preferences: timer theme, background image, notification and
//! introduction flags. Loaded once at start and rewritten on every change.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};

pub const MAX_BACKGROUND_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub background: String,
    pub text: String,
    pub accent: String,
    pub gradient: String,
}

/// Two-colour gradient replacing the theme's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomColors {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub colors: ThemeColors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomColors>,
}

fn theme(id: &str, name: &str, from: &str, to: &str, text: &str) -> Theme {
    Theme {
        id: id.to_string(),
        name: name.to_string(),
        colors: ThemeColors {
            background: format!("from-{from}/20 to-{to}/20"),
            text: text.to_string(),
            accent: format!("border-{from}/30"),
            gradient: format!("from-{from} to-{to}"),
        },
        custom: None,
    }
}

pub fn builtin_themes() -> Vec<Theme> {
    vec![
        theme("default", "Ocean", "blue-500", "cyan-500", "text-blue-900"),
        theme("sunset", "Sunset", "orange-500", "pink-500", "text-orange-900"),
        theme("forest", "Forest", "green-500", "emerald-500", "text-green-900"),
        theme("pomofocus", "PomoFocus", "red-400", "pink-400", "text-white"),
    ]
}

pub fn find_theme(id: &str) -> Option<Theme> {
    builtin_themes().into_iter().find(|t| t.id == id)
}

impl Default for Theme {
    fn default() -> Self {
        theme("default", "Ocean", "blue-500", "cyan-500", "text-blue-900")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    /// `data:` URI of the uploaded background image.
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default = "default_true")]
    pub notifications: bool,
    #[serde(default)]
    pub intro_seen: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            background: None,
            notifications: true,
            intro_seen: false,
        }
    }
}

#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    prefs: Preferences,
}

impl PreferenceStore {
    #[instrument(skip(data_dir))]
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("preferences.json");
        let prefs = read_json_or_default(&path)?;
        debug!(path = %path.display(), "loaded preferences");
        Ok(Self { path, prefs })
    }

    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.prefs)
    }

    pub fn set_theme(&mut self, id: &str) -> Result<&Theme> {
        let theme = find_theme(id).ok_or_else(|| {
            let known: Vec<String> = builtin_themes().into_iter().map(|t| t.id).collect();
            Error::validation(format!("unknown theme '{id}' (known: {})", known.join(", ")))
        })?;
        info!(theme = %theme.id, "theme selected");
        self.prefs.theme = theme;
        self.save()?;
        Ok(&self.prefs.theme)
    }

    pub fn set_custom_colors(&mut self, from: &str, to: &str) -> Result<()> {
        for color in [from, to] {
            if !is_hex_color(color) {
                return Err(Error::validation(format!("not a hex colour: {color}")));
            }
        }
        self.prefs.theme.custom = Some(CustomColors {
            from: from.to_ascii_lowercase(),
            to: to.to_ascii_lowercase(),
        });
        self.save()
    }

    pub fn clear_custom_colors(&mut self) -> Result<()> {
        self.prefs.theme.custom = None;
        self.save()
    }

    /// Validates size and content type before anything is written; a
    /// rejected file leaves the current background in place.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn set_background_from_file(&mut self, path: &Path) -> Result<()> {
        let size = fs::metadata(path)?.len();
        check_background_size(size)?;
        let bytes = fs::read(path)?;
        check_background_size(bytes.len() as u64)?;
        let mime = sniff_image_mime(&bytes)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        self.prefs.background = Some(format!("data:{mime};base64,{encoded}"));
        self.save()?;
        info!(size, mime, "background updated");
        Ok(())
    }

    pub fn clear_background(&mut self) -> Result<()> {
        self.prefs.background = None;
        self.save()
    }

    pub fn set_notifications(&mut self, enabled: bool) -> Result<()> {
        self.prefs.notifications = enabled;
        self.save()
    }

    pub fn mark_intro_seen(&mut self) -> Result<()> {
        self.prefs.intro_seen = true;
        self.save()
    }
}

pub fn check_background_size(size: u64) -> Result<()> {
    if size > MAX_BACKGROUND_BYTES {
        warn!(size, "background image too large");
        return Err(Error::validation("please select an image smaller than 5MB"));
    }
    Ok(())
}

pub fn sniff_image_mime(bytes: &[u8]) -> Result<&'static str> {
    let format = image::guess_format(bytes)
        .map_err(|_| Error::validation("please select an image file"))?;
    let mime = format.to_mime_type();
    if !mime.starts_with("image/") {
        return Err(Error::validation("please select an image file"));
    }
    Ok(mime)
}

fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, value)?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| Error::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn defaults_when_file_missing() {
        let dir = tempdir().expect("tempdir");
        let store = PreferenceStore::load(dir.path()).expect("load");
        assert_eq!(store.get(), &Preferences::default());
        assert!(store.get().notifications);
        assert!(!store.get().intro_seen);
    }

    #[test]
    fn theme_survives_reload() {
        let dir = tempdir().expect("tempdir");
        let mut store = PreferenceStore::load(dir.path()).expect("load");
        store.set_theme("forest").expect("set theme");
        store.set_custom_colors("#FF0000", "#00f").expect("custom");
        store.mark_intro_seen().expect("intro");

        let reloaded = PreferenceStore::load(dir.path()).expect("reload");
        assert_eq!(reloaded.get().theme.id, "forest");
        assert_eq!(
            reloaded.get().theme.custom,
            Some(CustomColors {
                from: "#ff0000".to_string(),
                to: "#00f".to_string()
            })
        );
        assert!(reloaded.get().intro_seen);
    }

    #[test]
    fn unknown_theme_and_bad_colour_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut store = PreferenceStore::load(dir.path()).expect("load");
        assert!(matches!(store.set_theme("neon"), Err(Error::Validation(_))));
        assert!(matches!(
            store.set_custom_colors("red", "#000"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn oversized_background_rejected_before_write() {
        let dir = tempdir().expect("tempdir");
        let mut store = PreferenceStore::load(dir.path()).expect("load");

        let small = dir.path().join("small.png");
        fs::write(&small, PNG_HEADER).expect("write small");
        store.set_background_from_file(&small).expect("small image accepted");
        let before = store.get().background.clone();
        assert!(before.as_deref().is_some_and(|b| b.starts_with("data:image/png;base64,")));

        let big = dir.path().join("big.png");
        let mut payload = PNG_HEADER.to_vec();
        payload.resize(6 * 1024 * 1024, 0);
        fs::write(&big, payload).expect("write big");

        let err = store.set_background_from_file(&big).expect_err("too large");
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.get().background, before);
        let on_disk = PreferenceStore::load(dir.path()).expect("reload");
        assert_eq!(on_disk.get().background, before);
    }

    #[test]
    fn size_limit_applies_to_bytes_read() {
        assert!(check_background_size(MAX_BACKGROUND_BYTES).is_ok());
        assert!(matches!(
            check_background_size(MAX_BACKGROUND_BYTES + 1),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn non_image_background_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut store = PreferenceStore::load(dir.path()).expect("load");
        let text = dir.path().join("notes.txt");
        fs::write(&text, "just some words").expect("write");
        assert!(matches!(
            store.set_background_from_file(&text),
            Err(Error::Validation(_))
        ));
        assert!(store.get().background.is_none());
    }
}
