//! Live preview command.
//!
//! Opens the low-latency output stream on a real device and either plays
//! the test tone, a WAV file routed through the preview path, or both.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use spatia_core::pcm::f32_to_le_bytes;
use spatia_core::{AudioFormat, AudioGraph, FormatAdaptingProcessor, OutputDeviceQuery, PcmBuffer};
use spatia_io::{CpalBackend, SoftwareChain, read_wav_interleaved};

use super::common::load_config;

/// Blocks pushed ahead of real time when a file starts.
const PREFILL_BLOCKS: usize = 4;

#[derive(Args)]
pub struct PreviewArgs {
    /// WAV file to play through the preview path
    #[arg(long, value_name = "WAV")]
    input: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<f64>,

    /// Play the test tone
    #[arg(long)]
    tone: bool,

    /// Test tone frequency in Hz
    #[arg(long)]
    frequency: Option<f32>,

    /// Test tone level (0-1)
    #[arg(long)]
    level: Option<f32>,

    /// Output device name (partial, case-insensitive)
    #[arg(long)]
    device: Option<String>,

    /// Frames per device callback
    #[arg(long)]
    frames: Option<u32>,
}

pub fn run(args: PreviewArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if args.tone {
        config.test_tone.enabled = true;
    }
    if let Some(hz) = args.frequency {
        config.test_tone.frequency_hz = hz;
    }
    if let Some(level) = args.level {
        config.test_tone.level = level;
    }
    config.validate()?;

    let device = args.device.or_else(|| config.audio.output_device.clone());
    let frames = args
        .frames
        .unwrap_or(config.audio.preview_frames_per_callback);

    let query = CpalBackend::new().with_output_device(device.clone());
    let chain = Arc::new(SoftwareChain::new(Box::new(
        CpalBackend::new().with_output_device(device.clone()),
    )));
    let graph = Arc::new(AudioGraph::new(chain.clone()));
    config.apply_dsp(&graph);

    let rate = query.current_output_sample_rate().unwrap_or_else(|| {
        tracing::warn!(
            fallback = config.audio.fallback_sample_rate,
            "output device did not report a sample rate"
        );
        config.audio.fallback_sample_rate
    });
    graph.ensure_chain_created(rate)?;
    graph.start_preview(rate, frames)?;

    println!("Preview running");
    println!("  Output: {}", device.as_deref().unwrap_or("default"));
    println!("  Sample rate: {} Hz", rate);
    println!("  Callback: {} frames", frames);
    if config.test_tone.enabled {
        println!(
            "  Test tone: {} Hz at {:.2}",
            config.test_tone.frequency_hz, config.test_tone.level
        );
    }
    println!("\nPress Ctrl+C to stop...\n");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let deadline = args
        .seconds
        .map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    let keep_going =
        || running.load(Ordering::SeqCst) && deadline.is_none_or(|d| Instant::now() < d);

    let result = match &args.input {
        Some(path) => play_file(&graph, path, rate, frames, &keep_going),
        None => {
            while keep_going() {
                std::thread::sleep(Duration::from_millis(50));
            }
            Ok(())
        }
    };

    graph.shutdown();
    let dropped = chain.dropped_samples();
    if dropped > 0 {
        tracing::warn!(dropped, "preview samples dropped");
    }
    result?;
    println!("Done!");
    Ok(())
}

fn play_file(
    graph: &Arc<AudioGraph>,
    path: &Path,
    device_rate: u32,
    frames: u32,
    keep_going: &dyn Fn() -> bool,
) -> anyhow::Result<()> {
    let (samples, info) = read_wav_interleaved(path)?;
    if info.sample_rate != device_rate {
        tracing::warn!(
            file_rate = info.sample_rate,
            device_rate,
            "file rate differs from device rate; playing without resampling"
        );
    }
    println!("Playing {} ({:.2}s)", path.display(), info.duration_secs);

    let mut processor = FormatAdaptingProcessor::new(Arc::clone(graph));
    processor.configure(AudioFormat::stereo_f32(info.sample_rate))?;

    let block_samples = frames as usize * 2;
    let block_duration = Duration::from_secs_f64(f64::from(frames) / f64::from(device_rate));
    for (i, block) in samples.chunks(block_samples).enumerate() {
        if !keep_going() {
            break;
        }
        let bytes = f32_to_le_bytes(block);
        let mut input = PcmBuffer::new(&bytes);
        processor.queue_input(&mut input);
        // Pipeline output is silent while the preview path owns the audio.
        let _ = processor.get_output();
        if i >= PREFILL_BLOCKS {
            std::thread::sleep(block_duration);
        }
    }
    processor.queue_end_of_stream();
    Ok(())
}
