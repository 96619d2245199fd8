use std::path::PathBuf;
use std::time::Duration;

use pagewise::config::{ConfigFlags, load_config_flags, parse_flag_tokens};
use pagewise::engine::HostEngine;

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".pagewiserc");
    let content = r"
# comment
--toc

--engine safari

--render-debug-log=render.log
--batch-yield-ms 0
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.toc);
    assert_eq!(flags.engine, Some(HostEngine::Safari));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
    assert_eq!(flags.batch_yield_ms, Some(0));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".pagewiserc");
    let content = "--toc\n--engine safari\n--render-debug-log file.log\n--device-pixel-ratio 3\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "pagewise".to_string(),
        "--engine".to_string(),
        "other".to_string(),
        "--force-half-cell".to_string(),
        "manual.json".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.toc, "file flags should remain enabled");
    assert!(effective.force_half_cell, "cli flags should be applied");
    assert_eq!(
        effective.engine,
        Some(HostEngine::Other),
        "cli should override engine"
    );
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
    // Safari would cap a ratio of 3 at 2; the CLI switched the engine.
    let scale = effective.preview_config().display.device_scale();
    assert!((scale - 3.0).abs() < f32::EPSILON);
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "pagewise".to_string(),
        "--scroll-threshold=120".to_string(),
        "--render-debug-log=render.log".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.scroll_threshold, Some(120.0));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_config_union_merges_booleans() {
    let global = ConfigFlags {
        no_images: true,
        no_toc: true,
        ..ConfigFlags::default()
    };
    let local = ConfigFlags {
        toc: true,
        perf: true,
        batch_yield_ms: Some(5),
        ..ConfigFlags::default()
    };
    let merged = global.union(&local);
    assert!(merged.no_images);
    assert!(merged.no_toc);
    assert!(merged.toc);
    assert!(merged.perf);
    assert!(!merged.toc_visible(), "--no-toc wins over --toc");
    assert_eq!(
        merged.preview_config().scheduler.batch_yield,
        Duration::from_millis(5)
    );

    let options = merged.viewer_options();
    assert!(!options.toc_visible);
    assert!(!options.images);
    assert!(!options.force_half_cell);
    assert_eq!(options.preview.scheduler.batch_yield, Duration::from_millis(5));
    assert_eq!(options.global_config, None);
}
