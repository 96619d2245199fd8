//! Viewer defaults: flag files layered under the command line.
//!
//! A flag file holds whitespace-separated command-line flags with `#` comments.
//! Effective flags are `global < local < command line`, merged with
//! [`ConfigFlags::union`].

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::app::ViewerOptions;
use crate::engine::scheduler::SchedulerConfig;
use crate::engine::surface::{DisplayProfile, HostEngine};
use crate::engine::PreviewConfig;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFlags {
    pub no_toc: bool,
    pub toc: bool,
    pub no_images: bool,
    pub perf: bool,
    pub force_half_cell: bool,
    pub engine: Option<HostEngine>,
    pub device_pixel_ratio: Option<f32>,
    pub batch_yield_ms: Option<u64>,
    pub scroll_threshold: Option<f32>,
    pub max_surface_pixels: Option<u64>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge two flag sets; switches are OR-ed, values from `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            no_toc: self.no_toc || other.no_toc,
            toc: self.toc || other.toc,
            no_images: self.no_images || other.no_images,
            perf: self.perf || other.perf,
            force_half_cell: self.force_half_cell || other.force_half_cell,
            engine: other.engine.or(self.engine),
            device_pixel_ratio: other.device_pixel_ratio.or(self.device_pixel_ratio),
            batch_yield_ms: other.batch_yield_ms.or(self.batch_yield_ms),
            scroll_threshold: other.scroll_threshold.or(self.scroll_threshold),
            max_surface_pixels: other.max_surface_pixels.or(self.max_surface_pixels),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    /// Whether the outline panel starts open.
    pub const fn toc_visible(&self) -> bool {
        self.toc && !self.no_toc
    }

    /// Viewer switches for these flags, without config paths.
    pub fn viewer_options(&self) -> ViewerOptions {
        ViewerOptions {
            toc_visible: self.toc_visible(),
            images: !self.no_images,
            force_half_cell: self.force_half_cell,
            preview: self.preview_config(),
            ..ViewerOptions::default()
        }
    }

    /// Engine settings for these flags; unset values keep the engine defaults.
    pub fn preview_config(&self) -> PreviewConfig {
        let defaults = PreviewConfig::default();
        let scheduler = SchedulerConfig {
            scroll_threshold: self
                .scroll_threshold
                .unwrap_or(defaults.scheduler.scroll_threshold),
            batch_yield: self
                .batch_yield_ms
                .map_or(defaults.scheduler.batch_yield, Duration::from_millis),
            ..defaults.scheduler
        };
        PreviewConfig {
            display: DisplayProfile::new(self.engine.unwrap_or_default(), self.device_pixel_ratio),
            scheduler,
            max_surface_pixels: self
                .max_surface_pixels
                .unwrap_or(defaults.max_surface_pixels),
            ..defaults
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("pagewise").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("pagewise")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("pagewise").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("pagewise")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".pagewiserc")
}

/// Read a flag file. A missing file yields the defaults.
///
/// # Errors
///
/// Fails when the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Write `flags` to `path`, creating parent directories.
///
/// # Errors
///
/// Fails when the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# pagewise defaults (saved with --save)".to_string()];
    let switches = [
        (flags.no_toc, "--no-toc"),
        (flags.toc, "--toc"),
        (flags.no_images, "--no-images"),
        (flags.perf, "--perf"),
        (flags.force_half_cell, "--force-half-cell"),
    ];
    lines.extend(
        switches
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, flag)| (*flag).to_string()),
    );
    if let Some(engine) = flags.engine {
        let name = match engine {
            HostEngine::Safari => "safari",
            HostEngine::Other => "other",
        };
        lines.push(format!("--engine {name}"));
    }
    if let Some(ratio) = flags.device_pixel_ratio {
        lines.push(format!("--device-pixel-ratio {ratio}"));
    }
    if let Some(ms) = flags.batch_yield_ms {
        lines.push(format!("--batch-yield-ms {ms}"));
    }
    if let Some(threshold) = flags.scroll_threshold {
        lines.push(format!("--scroll-threshold {threshold}"));
    }
    if let Some(pixels) = flags.max_surface_pixels {
        lines.push(format!("--max-surface-pixels {pixels}"));
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove a flag file if it exists.
///
/// # Errors
///
/// Fails when the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the flags this module knows out of raw arguments. Unknown tokens are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--no-toc" => flags.no_toc = true,
            "--toc" => flags.toc = true,
            "--no-images" => flags.no_images = true,
            "--perf" => flags.perf = true,
            "--force-half-cell" => flags.force_half_cell = true,
            _ => {
                let (name, inline) = token
                    .split_once('=')
                    .map_or((token, None), |(name, value)| (name, Some(value)));
                let value = match inline {
                    Some(value) => Some(value),
                    None if is_value_flag(name) => {
                        i += 1;
                        tokens.get(i).map(String::as_str)
                    }
                    None => None,
                };
                if let Some(value) = value {
                    apply_value(&mut flags, name, value);
                }
            }
        }
        i += 1;
    }
    flags
}

const VALUE_FLAGS: [&str; 6] = [
    "--engine",
    "--device-pixel-ratio",
    "--batch-yield-ms",
    "--scroll-threshold",
    "--max-surface-pixels",
    "--render-debug-log",
];

fn is_value_flag(name: &str) -> bool {
    VALUE_FLAGS.contains(&name)
}

fn apply_value(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--engine" => flags.engine = parse_engine(value),
        "--device-pixel-ratio" => flags.device_pixel_ratio = parse_number(value),
        "--batch-yield-ms" => flags.batch_yield_ms = parse_number(value),
        "--scroll-threshold" => flags.scroll_threshold = parse_number(value),
        "--max-surface-pixels" => flags.max_surface_pixels = parse_number(value),
        "--render-debug-log" => flags.render_debug_log = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn parse_engine(s: &str) -> Option<HostEngine> {
    match s {
        "safari" => Some(HostEngine::Safari),
        "other" => Some(HostEngine::Other),
        _ => None,
    }
}

fn parse_number<T: FromStr>(s: &str) -> Option<T> {
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let flags = parse_flag_tokens(&args(&[
            "pagewise",
            "--toc",
            "--no-images",
            "--engine",
            "safari",
            "--device-pixel-ratio=3",
            "--render-debug-log=render.log",
            "--force-half-cell",
            "manual.json",
        ]));
        assert!(flags.toc);
        assert!(flags.no_images);
        assert_eq!(flags.engine, Some(HostEngine::Safari));
        assert_eq!(flags.device_pixel_ratio, Some(3.0));
        assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
        assert!(flags.force_half_cell);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let flags = parse_flag_tokens(&args(&[
            "--engine",
            "gecko",
            "--batch-yield-ms",
            "soon",
            "--max-surface-pixels=-4",
        ]));
        assert_eq!(flags, ConfigFlags::default());
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            toc: true,
            engine: Some(HostEngine::Safari),
            batch_yield_ms: Some(25),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            perf: true,
            engine: Some(HostEngine::Other),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.toc);
        assert!(merged.perf);
        assert_eq!(merged.engine, Some(HostEngine::Other));
        assert_eq!(merged.batch_yield_ms, Some(25));
    }

    #[test]
    fn test_preview_config_applies_overrides() {
        let flags = ConfigFlags {
            engine: Some(HostEngine::Safari),
            device_pixel_ratio: Some(3.0),
            batch_yield_ms: Some(0),
            scroll_threshold: Some(50.0),
            max_surface_pixels: Some(1024),
            ..ConfigFlags::default()
        };
        let config = flags.preview_config();
        assert!((config.display.device_scale() - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.scheduler.batch_yield, Duration::ZERO);
        assert!((config.scheduler.scroll_threshold - 50.0).abs() < f32::EPSILON);
        assert_eq!(config.scheduler.navigation_window, 3);
        assert_eq!(config.max_surface_pixels, 1024);
    }

    #[test]
    fn test_preview_config_defaults() {
        assert_eq!(ConfigFlags::default().preview_config(), PreviewConfig::default());
    }

    #[test]
    fn test_toc_visible_needs_toc_without_no_toc() {
        let on = ConfigFlags {
            toc: true,
            ..ConfigFlags::default()
        };
        assert!(on.toc_visible());
        assert!(!on.union(&ConfigFlags {
            no_toc: true,
            ..ConfigFlags::default()
        })
        .toc_visible());
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config");
        let flags = ConfigFlags {
            toc: true,
            no_images: true,
            perf: true,
            force_half_cell: true,
            engine: Some(HostEngine::Safari),
            device_pixel_ratio: Some(1.5),
            batch_yield_ms: Some(20),
            scroll_threshold: Some(120.0),
            max_surface_pixels: Some(4_000_000),
            render_debug_log: Some(PathBuf::from("render.log")),
            ..ConfigFlags::default()
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }
}
