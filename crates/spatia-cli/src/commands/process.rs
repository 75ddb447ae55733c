//! Offline WAV processing command.
//!
//! Runs a file through the same processor and routing gate a live pipeline
//! uses, in blocks, with the in-process chain standing in for the native
//! library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use spatia_core::pcm::{f32_to_le_bytes, i16_to_le_bytes, rms};
use spatia_core::{
    AudioGraph, FormatAdaptingProcessor, OutputBuffer, PcmBuffer, SampleEncoding, f32_to_i16,
    i16_to_f32, linear_to_db,
};
use spatia_io::{ManualBackend, SoftwareChain, WavEncoding, read_wav_interleaved, write_wav_interleaved};

use super::common::{load_config, peak};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file (mono or stereo, 16-bit or 32-bit float)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Leave the chain uncreated so audio passes through untouched
    #[arg(long)]
    bypass: bool,

    /// Frames per processing block
    #[arg(long, default_value = "512")]
    block_frames: usize,

    /// Output encoding (defaults to the input's)
    #[arg(long, value_enum)]
    encoding: Option<EncodingArg>,

    /// Override the compressor makeup gain in dB
    #[arg(long, allow_hyphen_values = true)]
    makeup_db: Option<f32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Int16,
    Float32,
}

impl From<EncodingArg> for WavEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Int16 => WavEncoding::Int16,
            EncodingArg::Float32 => WavEncoding::Float32,
        }
    }
}

pub fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(db) = args.makeup_db {
        config.dsp.compressor.makeup_db = db;
        config.validate()?;
    }
    anyhow::ensure!(args.block_frames > 0, "--block-frames must be at least 1");

    println!("Reading {}...", args.input.display());
    let (samples, info) = read_wav_interleaved(&args.input)?;
    let format = info
        .stereo_format()
        .ok_or_else(|| anyhow::anyhow!("unsupported WAV layout"))?;
    println!(
        "  {} frames, {} Hz, {} ch, {:.2}s",
        info.num_frames, info.sample_rate, info.channels, info.duration_secs
    );

    let chain = Arc::new(SoftwareChain::new(Box::new(ManualBackend::new())));
    let graph = Arc::new(AudioGraph::new(chain));
    config.apply_dsp(&graph);
    if args.bypass {
        println!("Chain bypassed");
    } else {
        graph.ensure_chain_created(info.sample_rate)?;
    }

    let mut processor = FormatAdaptingProcessor::new(Arc::clone(&graph));
    processor.configure(format)?;

    let input_bytes = match format.encoding {
        SampleEncoding::Float32 => f32_to_le_bytes(&samples),
        SampleEncoding::Int16 => {
            let ints: Vec<i16> = samples.iter().map(|&s| f32_to_i16(s)).collect();
            i16_to_le_bytes(&ints)
        }
    };

    let pb = ProgressBar::new(info.num_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")?
            .progress_chars("##-"),
    );

    let mut output = Vec::with_capacity(samples.len());
    for block in input_bytes.chunks(args.block_frames * format.bytes_per_frame()) {
        let mut input = PcmBuffer::new(block);
        let frames = processor.queue_input(&mut input);
        match processor.get_output() {
            OutputBuffer::Float(out) => output.extend_from_slice(out),
            OutputBuffer::Int16(out) => output.extend(out.iter().map(|&s| i16_to_f32(s))),
        }
        pb.inc(frames as u64);
    }
    processor.queue_end_of_stream();
    pb.finish_with_message("done");
    graph.shutdown();

    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&samples)),
        linear_to_db(peak(&samples))
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&output)),
        linear_to_db(peak(&output))
    );

    let encoding = args
        .encoding
        .map(WavEncoding::from)
        .or(info.encoding)
        .unwrap_or(WavEncoding::Float32);
    println!("\nWriting {}...", args.output.display());
    write_wav_interleaved(&args.output, &output, info.sample_rate, encoding)?;
    println!("Done!");
    Ok(())
}
