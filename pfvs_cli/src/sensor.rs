//! `pfvs scan`, `pfvs stream` and `pfvs self-check`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::Result;
use pfvs_core::{ScanPipeline, ScanResult, StreamCfg, StreamController, StreamSample, share_gateway};
use pfvs_traits::MonotonicClock;
use serde_json::json;

use crate::setup::{self, Loaded};

/// Upper bound on one wait for a streamed sample, so Ctrl-C stays responsive.
const RECV_SLICE: Duration = Duration::from_millis(100);

fn pipeline(loaded: &Loaded, material: Option<&str>, check_filament: bool) -> Result<ScanPipeline> {
    let mut gw = setup::sensor_head(loaded, material)?;
    if check_filament {
        setup::require_filament(&mut gw, loaded)?;
    }
    Ok(ScanPipeline::new(
        share_gateway(gw),
        setup::classifier(loaded)?,
        Arc::new(MonotonicClock::new()),
    ))
}

fn print_scan(result: &ScanResult, json_mode: bool) {
    let differential = result.frame.differential();
    if json_mode {
        let rgbc = result.rgbc;
        let obj = json!({
            "material": result.material.as_str(),
            "color": result.color.to_string(),
            "rgbc": { "r": rgbc.r, "g": rgbc.g, "b": rgbc.b, "c": rgbc.clear },
            "channels": differential.to_vec(),
        });
        println!("{obj}");
        return;
    }
    println!("material: {}", result.material);
    println!("color: {} (rgbc {:?})", result.color, result.rgbc);
    let channels: Vec<String> = differential.iter().map(|v| format!("{v:.1}")).collect();
    println!("channels: {}", channels.join(" "));
}

pub fn run_scan(loaded: &Loaded, material: Option<&str>, json_mode: bool) -> Result<()> {
    let result = pipeline(loaded, material, false)?.scan()?;
    tracing::info!(material = %result.material, color = %result.color, "scan complete");
    print_scan(&result, json_mode);
    Ok(())
}

pub fn run_self_check(loaded: &Loaded, json_mode: bool) -> Result<()> {
    let result = pipeline(loaded, None, true)?.scan()?;
    tracing::info!(material = %result.material, "self-check passed");
    if json_mode {
        println!(
            "{}",
            json!({ "status": "ok", "filament": true, "material": result.material.as_str() })
        );
    } else {
        println!("OK: filament present, scan read {}", result.material);
    }
    Ok(())
}

fn print_sample(sample: &StreamSample, json_mode: bool) {
    if json_mode {
        let obj = json!({
            "seq": sample.seq,
            "color": sample.color.to_string(),
            "channels": sample.channels.to_vec(),
        });
        println!("{obj}");
    } else {
        let peak = sample.channels.iter().copied().fold(f32::MIN, f32::max);
        println!("#{:<4} color={} peak={peak:.1}", sample.seq, sample.color);
    }
}

/// How long to block for the next sample; `None` once the deadline passed.
fn next_wait(deadline: Option<Instant>, now: Instant) -> Option<Duration> {
    let Some(deadline) = deadline else {
        return Some(RECV_SLICE);
    };
    let left = deadline.saturating_duration_since(now);
    if left.is_zero() {
        None
    } else {
        Some(left.min(RECV_SLICE))
    }
}

pub fn run_stream(
    loaded: &Loaded,
    duration: Duration,
    material: Option<&str>,
    json_mode: bool,
    shutdown: &AtomicBool,
) -> Result<()> {
    let gw = setup::sensor_head(loaded, material)?;
    let mut stream = StreamController::new(
        share_gateway(gw),
        StreamCfg::from(&loaded.cfg.stream),
        Arc::new(MonotonicClock::new()),
    );
    stream.start()?;
    tracing::info!(duration_ms = duration.as_millis(), "streaming");

    // too far out to represent: run until Ctrl-C
    let deadline = Instant::now().checked_add(duration);
    if deadline.is_none() {
        tracing::info!("duration out of range; streaming until interrupted");
    }
    while !shutdown.load(Ordering::Relaxed) && stream.is_running() {
        let Some(wait) = next_wait(deadline, Instant::now()) else {
            break;
        };
        if let Some(sample) = stream.recv_timeout(wait) {
            print_sample(&sample, json_mode);
        }
    }
    let taken = stream.samples_taken();
    stream.stop()?;
    tracing::info!(samples = taken, "stream finished");

    if let Some(e) = stream.last_error() {
        return Err(eyre::Report::new(e));
    }
    if !json_mode {
        println!("{taken} samples");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_duration_streams_until_interrupted() {
        let now = Instant::now();
        let deadline = now.checked_add(Duration::from_millis(u64::MAX));
        assert_eq!(next_wait(deadline, now), Some(RECV_SLICE));
        assert_eq!(next_wait(None, now), Some(RECV_SLICE));
        assert_eq!(next_wait(None, now + Duration::from_secs(3600)), Some(RECV_SLICE));
    }

    #[test]
    fn wait_is_capped_and_ends_at_the_deadline() {
        let now = Instant::now();
        let deadline = now.checked_add(Duration::from_millis(30));
        assert_eq!(next_wait(deadline, now), Some(Duration::from_millis(30)));
        let far = now.checked_add(Duration::from_secs(60));
        assert_eq!(next_wait(far, now), Some(RECV_SLICE));
        assert_eq!(next_wait(deadline, now + Duration::from_millis(30)), None);
    }
}
