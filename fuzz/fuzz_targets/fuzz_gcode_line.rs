#![no_main]
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use pfvs_core::GCodeInterceptor;
use pfvs_core::gcode;
use pfvs_core::mocks::{FixedClassifier, ManualClock, RecordingPrinter, ScriptedGateway};

fuzz_target!(|data: &str| {
    // Temperature parsing never yields NaN.
    for line in data.lines() {
        if let Some(echo) = gcode::parse_temperature(line) {
            assert!(!echo.current_c.is_nan() && !echo.target_c.is_nan());
        }
    }

    // Every line passes through unchanged whatever state the interceptor reaches.
    let Ok(mut interceptor) = GCodeInterceptor::builder()
        .with_gateway(ScriptedGateway::uniform(100.0, 400.0))
        .with_classifier(FixedClassifier::new("PLA"))
        .with_printer(RecordingPrinter::new())
        .with_clock(Arc::new(ManualClock::new()))
        .build()
    else {
        return;
    };
    for line in data.lines() {
        if let Some(state) = line.strip_prefix("@") {
            interceptor.on_state_changed(state);
            continue;
        }
        assert_eq!(interceptor.intercept(line), line);
    }
});
