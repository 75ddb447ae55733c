//! Integration tests for spatia-io: WAV files and the software chain driven
//! through the core routing engine.

use std::sync::Arc;

use spatia_core::pcm::f32_to_le_bytes;
use spatia_core::{
    AudioFormat, AudioGraph, CompressorParams, FixedOutputRate, FormatAdaptingProcessor,
    NativeChain, OutputBuffer, PcmBuffer,
};
use spatia_io::{
    ManualBackend, SoftwareChain, WavEncoding, read_wav_info, read_wav_interleaved,
    write_wav_interleaved,
};
use tempfile::NamedTempFile;

fn engine() -> (ManualBackend, Arc<SoftwareChain>, Arc<AudioGraph>) {
    let backend = ManualBackend::new();
    let chain = Arc::new(SoftwareChain::new(Box::new(backend.clone())));
    let graph = Arc::new(AudioGraph::new(chain.clone()));
    (backend, chain, graph)
}

fn run_block(processor: &mut FormatAdaptingProcessor, samples: &[f32]) -> Vec<f32> {
    let bytes = f32_to_le_bytes(samples);
    let mut input = PcmBuffer::new(&bytes);
    let frames = processor.queue_input(&mut input);
    assert_eq!(frames * 2, samples.len());
    match processor.get_output() {
        OutputBuffer::Float(out) => out.to_vec(),
        OutputBuffer::Int16(_) => panic!("expected float output"),
    }
}

fn sine(frames: usize) -> Vec<f32> {
    (0..frames)
        .flat_map(|i| {
            let s = (i as f32 * 0.05).sin() * 0.25;
            [s, s]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Offline: WAV in, chain, WAV out
// ---------------------------------------------------------------------------

#[test]
fn wav_file_through_chain_with_makeup_gain() {
    let (_, _, graph) = engine();
    graph.ensure_chain_created(48000).unwrap();
    graph.dsp().set_compressor(CompressorParams {
        makeup_db: 6.0,
        ..CompressorParams::default()
    });

    let input_file = NamedTempFile::new().unwrap();
    let source = sine(1024);
    write_wav_interleaved(input_file.path(), &source, 48000, WavEncoding::Float32).unwrap();

    let (samples, info) = read_wav_interleaved(input_file.path()).unwrap();
    let format = info.stereo_format().unwrap();
    assert_eq!(format, AudioFormat::stereo_f32(48000));

    let mut processor = FormatAdaptingProcessor::new(graph.clone());
    processor.configure(format).unwrap();

    let mut rendered = Vec::with_capacity(samples.len());
    for block in samples.chunks(256) {
        rendered.extend(run_block(&mut processor, block));
    }
    assert_eq!(rendered.len(), source.len());
    for (out, inp) in rendered.iter().zip(&source) {
        assert!((out - inp * 1.995_262).abs() < 1e-4);
    }

    let output_file = NamedTempFile::new().unwrap();
    write_wav_interleaved(output_file.path(), &rendered, 48000, WavEncoding::Int16).unwrap();
    let info = read_wav_info(output_file.path()).unwrap();
    assert_eq!(info.num_frames, 1024);
    assert_eq!(info.encoding, Some(WavEncoding::Int16));
}

#[test]
fn without_chain_audio_is_untouched() {
    let (_, chain, graph) = engine();
    chain.set_compressor(CompressorParams {
        makeup_db: 12.0,
        ..CompressorParams::default()
    });
    let mut processor = FormatAdaptingProcessor::new(graph);
    processor.configure(AudioFormat::stereo_f32(48000)).unwrap();

    let block = sine(64);
    assert_eq!(run_block(&mut processor, &block), block);
}

// ---------------------------------------------------------------------------
// Live: preview path on a manual stream
// ---------------------------------------------------------------------------

#[test]
fn preview_moves_audio_to_the_stream() {
    let (backend, chain, graph) = engine();
    graph.start_preview(48000, 32).unwrap();
    assert!(backend.is_streaming());
    assert!(chain.is_io_running());

    let mut processor = FormatAdaptingProcessor::new(graph.clone());
    processor.configure(AudioFormat::stereo_f32(48000)).unwrap();

    let block = sine(32);
    let out = run_block(&mut processor, &block);
    assert!(out.iter().all(|&s| s == 0.0), "pipeline output is silenced");

    let played = backend.pull(32).unwrap();
    assert_eq!(played, block);
    assert_eq!(chain.dropped_samples(), 0);
}

#[test]
fn stopping_preview_returns_audio_to_the_pipeline() {
    let (backend, chain, graph) = engine();
    graph.start_preview(48000, 32).unwrap();
    graph.stop_preview_if_running();
    assert!(!backend.is_streaming());
    assert!(chain.is_created());

    let mut processor = FormatAdaptingProcessor::new(graph.clone());
    processor.configure(AudioFormat::stereo_f32(48000)).unwrap();
    let block = sine(16);
    assert_eq!(run_block(&mut processor, &block), block);
}

#[test]
fn test_tone_plays_during_preview() {
    let (backend, _, graph) = engine();
    graph.dsp().set_test_tone_frequency(480.0);
    graph.dsp().set_test_tone_level(0.3);
    graph.dsp().set_test_tone_enabled(true);
    graph.start_preview(48000, 100).unwrap();

    let played = backend.pull(100).unwrap();
    let peak = played.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.25 && peak <= 0.3 + 1e-6, "peak {}", peak);
}

#[test]
fn output_rate_change_closes_preview_stream() {
    let (backend, chain, graph) = engine();
    graph.start_preview(48000, 64).unwrap();

    let rate = graph
        .ensure_chain_for_output(&FixedOutputRate(Some(44100)))
        .unwrap();
    assert_eq!(rate, 44100);
    assert!(!graph.is_preview_running());
    assert!(!backend.is_streaming());
    assert!(chain.is_created());
}

#[test]
fn shutdown_releases_everything() {
    let (backend, chain, graph) = engine();
    graph.start_preview(48000, 64).unwrap();
    graph.shutdown();
    assert!(!backend.is_streaming());
    assert!(!chain.is_created());
    assert!(!graph.is_chain_created());
}
