use std::path::Path;

use anyhow::anyhow;
use tracing::instrument;

use super::Context;
use crate::config::strict_bool;
use crate::notice::Notice;
use crate::prefs::builtin_themes;

/// No arguments lists the themes; otherwise selects, customises or clears.
#[instrument(skip(ctx, custom))]
pub(super) fn theme(
    ctx: &mut Context<'_>,
    id: Option<&str>,
    custom: Option<Vec<String>>,
    clear_custom: bool,
) -> anyhow::Result<()> {
    if let Some(id) = id {
        let theme = ctx.prefs.set_theme(id)?.name.clone();
        ctx.renderer
            .print_notices(&[Notice::success("Theme updated", format!("Timer theme set to {theme}"))])?;
    }
    if clear_custom {
        ctx.prefs.clear_custom_colors()?;
    }
    if let Some(colors) = custom {
        let [from, to] = colors.as_slice() else {
            return Err(anyhow!("--custom takes exactly two colours"));
        };
        ctx.prefs.set_custom_colors(from, to)?;
    }

    let prefs = ctx.prefs.get().clone();
    ctx.renderer.print_themes(&builtin_themes(), &prefs)
}

pub(super) fn background(ctx: &mut Context<'_>, path: Option<&Path>, clear: bool) -> anyhow::Result<()> {
    let notice = match (path, clear) {
        (_, true) => {
            ctx.prefs.clear_background()?;
            Notice::info("Background removed", "The timer background was cleared.")
        }
        (Some(path), false) => {
            ctx.prefs.set_background_from_file(path)?;
            Notice::success("Background updated", format!("Using {}", path.display()))
        }
        (None, false) => {
            let state = if ctx.prefs.get().background.is_some() {
                "custom image"
            } else {
                "none"
            };
            println!("background: {state}");
            return Ok(());
        }
    };
    ctx.renderer.print_notices(&[notice])
}

pub(super) fn notifications(ctx: &mut Context<'_>, state: &str) -> anyhow::Result<()> {
    let enabled = strict_bool(state).ok_or_else(|| anyhow!("expected on or off, got: {state}"))?;
    ctx.prefs.set_notifications(enabled)?;
    ctx.renderer.set_notifications(enabled);
    println!("Notifications {}.", if enabled { "on" } else { "off" });
    Ok(())
}

/// Effective configuration plus the files it came from.
pub(super) fn show(ctx: &mut Context<'_>) -> anyhow::Result<()> {
    let mut pairs: Vec<_> = ctx.cfg.iter().collect();
    pairs.sort();
    for (key, value) in pairs {
        let shown = if key.ends_with("api_key") || key.ends_with("token") {
            "********"
        } else {
            value.as_str()
        };
        println!("{key:<28} {shown}");
    }
    for file in &ctx.cfg.loaded_files {
        println!("# loaded {}", file.display());
    }
    Ok(())
}
