//! Head-tracking replay command.
//!
//! Feeds a CSV of rotation-vector readings through the orientation tracker,
//! attached to a graph the way a host would attach the device sensor, and
//! prints the smoothed yaw forwarded to the chain for every reading.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Args;
use spatia_core::{
    AudioGraph, FixedDisplayRotation, OrientationTracker, ReplaySensor, RotationSensor,
    RotationVector,
};
use spatia_io::{ManualBackend, SoftwareChain};

use super::common::load_config;

#[derive(Args)]
pub struct YawArgs {
    /// CSV of readings, one `x,y,z` or `x,y,z,w` per line
    #[arg(value_name = "CSV")]
    input: PathBuf,

    /// Display rotation in degrees (0, 90, 180 or 270)
    #[arg(long, default_value = "0")]
    display_rotation: i32,

    /// Track as a backgrounded app with playback running
    #[arg(long)]
    background: bool,
}

/// Parse rotation-vector readings. Blank lines, `#` comments and a leading
/// header row are skipped.
pub fn parse_readings(text: &str) -> anyhow::Result<Vec<RotationVector>> {
    let mut readings = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Result<Vec<f32>, _> = line.split(',').map(|f| f.trim().parse::<f32>()).collect();
        let fields = match fields {
            Ok(fields) => fields,
            Err(_) if readings.is_empty() && line.starts_with(|c: char| c.is_ascii_alphabetic()) => {
                continue;
            }
            Err(e) => anyhow::bail!("line {}: {}", idx + 1, e),
        };
        let reading = match fields.as_slice() {
            [x, y, z] => RotationVector::without_scalar(*x, *y, *z),
            [x, y, z, w] => RotationVector::new(*x, *y, *z, *w),
            _ => anyhow::bail!(
                "line {}: expected 3 or 4 fields, found {}",
                idx + 1,
                fields.len()
            ),
        };
        readings.push(reading);
    }
    Ok(readings)
}

pub fn run(args: YawArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let text = std::fs::read_to_string(&args.input)
        .map_err(|e| anyhow::anyhow!("{}: {}", args.input.display(), e))?;
    let readings = parse_readings(&text)?;
    anyhow::ensure!(!readings.is_empty(), "{} holds no readings", args.input.display());

    let chain = Arc::new(SoftwareChain::new(Box::new(ManualBackend::new())));
    let graph = Arc::new(AudioGraph::new(chain.clone()));
    graph.ensure_chain_created(config.audio.fallback_sample_rate)?;

    let sensor = Arc::new(ReplaySensor::new());
    let sink = graph.yaw_sink();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let tracker = Arc::new(OrientationTracker::new(
        Some(sensor.clone() as Arc<dyn RotationSensor>),
        Arc::new(FixedDisplayRotation(args.display_rotation)),
        Arc::new(move |yaw| {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            println!("{},{:.3}", n, yaw);
            sink(yaw);
        }),
    ));

    graph.set_spatial_enabled(true);
    graph.set_head_tracking_enabled(true);
    if args.background {
        graph.set_keep_in_background(true);
        graph.set_playback_active(true);
        graph.on_background();
    }
    graph.attach_tracker(tracker.clone());
    anyhow::ensure!(tracker.is_tracking(), "head tracker did not start");

    println!("reading,yaw_deg");
    let delivered = sensor.replay(readings);

    tracing::info!(
        delivered,
        smoothed = count.load(Ordering::Relaxed),
        mode = ?tracker.mode(),
        chain_yaw = chain.params().yaw_deg(),
        "replay finished"
    );
    graph.detach_tracker(&tracker);
    graph.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_and_four_field_lines() {
        let text = "x,y,z,w\n# comment\n0,0,0.5,0.866\n\n0.1, 0.0, 0.2\n";
        let readings = parse_readings(text).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0], RotationVector::new(0.0, 0.0, 0.5, 0.866));
        assert_eq!(readings[1].w, None);
    }

    #[test]
    fn rejects_bad_rows() {
        assert!(parse_readings("0,0\n").is_err());
        assert!(parse_readings("0,0,0\nfoo,0,0\n").is_err());
    }
}
