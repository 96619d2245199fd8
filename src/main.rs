//! Pagewise - progressive page rendering in the terminal.
//!
//! # Usage
//!
//! ```bash
//! pagewise manual.json
//! pagewise --toc --engine safari --device-pixel-ratio 3 manual.json
//! pagewise --replay steps.txt --export-dir out/ manual.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pagewise::app::{App, ViewerOptions};
use pagewise::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use pagewise::document::DocumentSource;
use pagewise::engine::HostEngine;
use pagewise::perf;
use pagewise::replay::{self, ReplayOptions};

/// Scroll-driven page viewer
#[derive(Parser, Debug)]
#[command(name = "pagewise", version, about, long_about = None)]
struct Cli {
    /// Document manifest to view
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Start with the outline panel visible
    #[arg(long)]
    toc: bool,

    /// Keep the outline panel hidden at startup
    #[arg(long)]
    no_toc: bool,

    /// Rendering engine of the host, used to cap the device scale
    #[arg(long, value_enum)]
    engine: Option<HostEngine>,

    /// Device pixel ratio to render page surfaces at
    #[arg(long, value_name = "RATIO")]
    device_pixel_ratio: Option<f32>,

    /// Pause between pages of a multi-page render pass
    #[arg(long, value_name = "MS")]
    batch_yield_ms: Option<u64>,

    /// Distance from the bottom, in layout units, that triggers the next page
    #[arg(long, value_name = "UNITS")]
    scroll_threshold: Option<f32>,

    /// Largest surface, in pixels, a page may be rendered into
    #[arg(long, value_name = "PIXELS")]
    max_surface_pixels: Option<u64>,

    /// Disable inline page images (show placeholders only)
    #[arg(long)]
    no_images: bool,

    /// Force image rendering to use half-cell fallback mode
    #[arg(long)]
    force_half_cell: bool,

    /// Enable performance logging
    #[arg(long)]
    perf: bool,

    /// Write detailed render debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Run a replay script headlessly and print a JSON trace
    #[arg(long, value_name = "SCRIPT")]
    replay: Option<PathBuf>,

    /// Write rendered pages as PNG files (with --replay)
    #[arg(long, value_name = "DIR", requires = "replay")]
    export_dir: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("PAGEWISE_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize render debug log {}: {}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    // Verify file exists
    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }

    if let Some(script) = &cli.replay {
        let commands = replay::load_script(script)?;
        let options = ReplayOptions {
            config: effective.preview_config(),
            export_dir: cli.export_dir.clone(),
            ..ReplayOptions::default()
        };
        let source = DocumentSource::Locator(cli.file.display().to_string());
        replay::run(source, &commands, &options, std::io::stdout().lock())
            .context("Replay failed")?;
        return Ok(());
    }

    let options = ViewerOptions {
        global_config: Some(global_path),
        local_config: local_path.exists().then_some(local_path),
        ..effective.viewer_options()
    };
    let mut app = App::new(cli.file, options);
    app.run().context("Application error")
}
