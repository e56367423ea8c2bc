//! Fire-and-forget outbound notifications (UI, telemetry, replay summaries).
//!
//! Publishing never blocks and never fails the caller; a full or
//! disconnected channel just drops the event.

use crossbeam_channel as xch;
use pfvs_traits::{ColorLabel, MaterialLabel, Rgbc, SPECTRAL_CHANNELS};

use crate::counters::UsageCounters;
use crate::state::LifecycleState;
use crate::stream::StreamSample;

/// What caused a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    Load,
    Verification,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MaterialPredicted {
        material: MaterialLabel,
        trigger: ScanTrigger,
    },
    ScanFrame {
        differential: [f32; SPECTRAL_CHANNELS],
    },
    ColorClassified {
        rgbc: Rgbc,
        color: ColorLabel,
    },
    Counters {
        session: UsageCounters,
        totals: UsageCounters,
    },
    StreamSample(StreamSample),
    Lifecycle(LifecycleState),
}

pub trait EventSink: Send + Sync {
    fn publish(&self, event: Event);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: Event) {}
}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: Event) {
        tracing::debug!(?event, "event");
    }
}

/// Forwards events into a bounded crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: xch::Sender<Event>,
}

impl ChannelSink {
    pub fn bounded(capacity: usize) -> (Self, xch::Receiver<Event>) {
        let (tx, rx) = xch::bounded(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: Event) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::trace!(full = e.is_full(), "event dropped");
        }
    }
}
