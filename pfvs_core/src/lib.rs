#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Filament verification core (hardware-agnostic).
//!
//! This crate watches a printer's firmware line stream, scans the loaded
//! filament when it matters and decides whether the print may go on. All
//! hardware and host interaction goes through `pfvs_traits::SensorGateway`,
//! `MaterialClassifier` and `PrinterControl`.
//!
//! ## Architecture
//!
//! - **Interception**: `GCodeInterceptor` sees every line, tracks load/unload
//!   markers and temperature echoes, and reacts to host notifications.
//! - **Lifecycle**: `PrintStateMachine` decides when the real print target is
//!   committed and a verification cycle must run (`state` module).
//! - **Scanning**: `ScanPipeline` takes a dark/light differential spectral frame
//!   and a color read, then asks the classifier (`scan`, `color`, `spectral`).
//! - **Policy**: `MaterialPolicy` allows, corrects the thermal profile or
//!   rejects (`policy`, `material`).
//! - **Streaming**: `StreamController` samples continuously on its own thread,
//!   sharing the gateway guard with scans (`stream`).
//!
//! Unknown materials are allowed (fail-open); materials known to be
//! unprintable cancel the print (fail-closed); scan failures leave the print
//! paused for the operator.

pub mod builder;
pub mod classifier;
pub mod color;
pub mod config;
pub mod conversions;
pub mod counters;
pub mod error;
pub mod events;
pub mod gcode;
pub mod hw_error;
pub mod interceptor;
pub mod material;
pub mod mocks;
pub mod policy;
pub mod scan;
pub mod session;
pub mod spectral;
pub mod state;
pub mod stream;

pub use builder::{InterceptorBuilder, Missing, Set};
pub use classifier::{NearestCentroid, ReferenceSpectrum};
pub use color::classify_color;
pub use config::{PolicyCfg, StreamCfg};
pub use counters::{CounterStore, UsageCounters};
pub use error::{BuildError, Result, VerifyError};
pub use events::{ChannelSink, Event, EventSink, NullSink, ScanTrigger, TracingSink};
pub use interceptor::GCodeInterceptor;
pub use material::{FilamentProfile, Material, ProfileTable};
pub use policy::{Decision, MaterialPolicy};
pub use scan::{ScanPipeline, ScanResult, SharedGateway, share_gateway};
pub use session::ScanSession;
pub use spectral::SpectralFrame;
pub use state::{HostState, LifecycleState, PrintStateMachine};
pub use stream::{StreamController, StreamSample};
