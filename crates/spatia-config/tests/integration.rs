//! Integration tests for spatia-config.
//!
//! Covers the file round trip and applying a config to a live graph.

use std::sync::Arc;

use spatia_config::{ConfigError, EngineConfig, MAX_EQ_BANDS, ValidationError};
use spatia_core::AudioGraph;
use spatia_io::{ManualBackend, SoftwareChain};
use tempfile::TempDir;

fn customized() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.audio.output_device = Some("USB".to_string());
    config.audio.preview_frames_per_callback = 128;
    config.dsp.eq_bands = vec![3.0, 1.5, 0.0, -2.0];
    config.dsp.compressor.makeup_db = 2.5;
    config.dsp.reverb.enabled = true;
    config.dsp.reverb.wet = 0.35;
    config.spatial.head_tracking_enabled = true;
    config.test_tone.frequency_hz = 1000.0;
    config
}

#[test]
fn save_then_load_preserves_every_section() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("engine.toml");

    let config = customized();
    config.save(&path).unwrap();
    assert!(path.is_file(), "save creates parent directories");

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}

#[test]
fn load_or_default_handles_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn load_reports_path_of_unreadable_file() {
    let dir = TempDir::new().unwrap();
    let err = EngineConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn hand_written_file_with_errors_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        "[dsp]\neq_bands = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]\n\n[dsp.reverb]\nwet = -0.1\n",
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    let err = config.validate().unwrap_err();
    let ValidationError::Multiple(errors) = &err else {
        panic!("expected two problems, got {err:?}");
    };
    assert_eq!(errors.len(), 2);

    let wrapped: ConfigError = err.into();
    assert!(wrapped.to_string().contains("dsp.reverb.wet"));
}

#[test]
fn apply_pushes_settings_into_the_chain() {
    let chain = Arc::new(SoftwareChain::new(Box::new(ManualBackend::new())));
    let graph = AudioGraph::new(chain.clone());

    let config = customized();
    config.apply_dsp(&graph);
    config.apply_spatial(&graph);

    let params = chain.params();
    assert_eq!(params.eq_gain_db(0), Some(3.0));
    assert_eq!(params.eq_gain_db(3), Some(-2.0));
    assert_eq!(params.eq_gain_db(MAX_EQ_BANDS - 1), Some(0.0));
    assert_eq!(params.compressor().makeup_db, 2.5);
    assert!(params.reverb().enabled);
    assert_eq!(params.tone_frequency(), 1000.0);
    assert!(!params.tone_enabled());

    let policy = graph.policy();
    assert!(policy.spatial_enabled);
    assert!(policy.head_tracking_enabled);
    assert!(!policy.keep_in_background);
}
