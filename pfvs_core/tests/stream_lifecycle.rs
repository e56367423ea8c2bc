//! Stream controller start/stop lifecycle and shutter handling.
//!
//! Verifies that:
//! - No worker is spawned without filament
//! - A second start is refused while a worker is live
//! - Every exit path leaves the LED shutters closed

use std::sync::Arc;
use std::time::Duration;

use pfvs_core::error::VerifyError;
use pfvs_core::mocks::{ChannelSink, ManualClock, ScriptedGateway};
use pfvs_core::{Event, StreamCfg, StreamController, share_gateway};
use pfvs_traits::clock::MonotonicClock;

fn cfg() -> StreamCfg {
    StreamCfg {
        sample_period: Duration::from_millis(5),
        channel_capacity: 4,
    }
}

fn controller(gw: &ScriptedGateway) -> StreamController {
    StreamController::new(share_gateway(gw.clone()), cfg(), Arc::new(MonotonicClock::new()))
}

#[test]
fn start_without_filament_spawns_nothing() {
    let gw = ScriptedGateway::uniform(1.0, 100.0).with_filament(false);
    let mut stream = controller(&gw);
    let err = stream.start().expect_err("no filament");
    assert_eq!(
        err.downcast_ref::<VerifyError>(),
        Some(&VerifyError::NoFilamentDetected)
    );
    assert!(!stream.is_running());
    assert_eq!(gw.raw_reads(), 0);
    assert_eq!(gw.shutters(), [false; 3]);
}

#[test]
fn second_start_is_already_running() {
    let gw = ScriptedGateway::uniform(1.0, 100.0);
    let mut stream = controller(&gw);
    stream.start().expect("first start");
    let err = stream.start().expect_err("second start");
    assert_eq!(
        err.downcast_ref::<VerifyError>(),
        Some(&VerifyError::AlreadyRunning)
    );
    stream.stop().expect("stop");
}

#[test]
fn samples_flow_and_stop_closes_shutters() {
    let gw = ScriptedGateway::uniform(1.0, 100.0);
    let mut stream = controller(&gw);
    stream.start().expect("start");

    let sample = stream
        .recv_timeout(Duration::from_secs(2))
        .expect("a sample within 2s");
    assert_eq!(sample.channels, [100.0; 18]);
    assert!(sample.seq >= 1);

    stream.stop().expect("stop");
    assert!(!stream.is_running());
    assert_eq!(gw.shutters(), [false; 3]);
}

#[test]
fn stop_is_idempotent() {
    let gw = ScriptedGateway::uniform(1.0, 100.0);
    let mut stream = controller(&gw);
    stream.stop().expect("stop without start");
    stream.start().expect("start");
    stream.stop().expect("stop");
    stream.stop().expect("stop again");
    assert_eq!(gw.shutters(), [false; 3]);
}

#[test]
fn read_error_ends_stream_and_closes_shutters() {
    let gw = ScriptedGateway::uniform(1.0, 100.0).with_read_fault_after(3);
    let mut stream = controller(&gw);
    stream.start().expect("start");

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while stream.is_running() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!stream.is_running());
    assert_eq!(gw.shutters(), [false; 3]);
    assert!(stream.last_error().is_some_and(|e| e.is_sensor()));

    // a dead worker is reaped on restart instead of reporting AlreadyRunning
    stream.start().expect("restart after failure");
    stream.stop().expect("stop");
}

#[test]
fn drop_joins_worker_and_closes_shutters() {
    let gw = ScriptedGateway::uniform(1.0, 100.0);
    {
        let mut stream = StreamController::new(
            share_gateway(gw.clone()),
            cfg(),
            Arc::new(ManualClock::new()),
        );
        stream.start().expect("start");
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(gw.shutters(), [false; 3]);
}

#[test]
fn samples_are_published_as_events() {
    let gw = ScriptedGateway::uniform(1.0, 100.0);
    let (sink, rx) = ChannelSink::bounded(8);
    let mut stream = controller(&gw).with_events(Arc::new(sink));
    stream.start().expect("start");
    let event = rx.recv_timeout(Duration::from_secs(2)).expect("event");
    assert!(matches!(event, Event::StreamSample(_)));
    stream.stop().expect("stop");
}
