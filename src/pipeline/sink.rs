use crate::error::Result;
use crate::pipeline::types::DetectorEvent;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Pluggable output handler for detector events.
///
/// One sink is shared by all detector stations; calls are serialized by the
/// pipeline, so implementations need no locking of their own.
pub trait EventSink: Send + 'static {
    /// Handle one event. Called for each detection, and for each raw
    /// probability when debug output is enabled.
    fn handle(&mut self, event: &DetectorEvent) -> Result<()>;

    /// Called once after every detector has drained.
    fn finish(&mut self) {}

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Forwards events into a crossbeam channel.
pub struct ChannelSink {
    tx: Sender<DetectorEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that gets its events.
    pub fn new() -> (Self, Receiver<DetectorEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &DetectorEvent) -> Result<()> {
        if self.tx.send(event.clone()).is_err() {
            // Receiver dropped - nobody is listening, OK to ignore
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Collects events in memory for tests and library use.
#[derive(Default)]
pub struct CollectorSink {
    events: Arc<Mutex<Vec<DetectorEvent>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected events; stays valid after the sink has
    /// been moved into a pipeline.
    pub fn events(&self) -> Arc<Mutex<Vec<DetectorEvent>>> {
        self.events.clone()
    }
}

impl EventSink for CollectorSink {
    fn handle(&mut self, event: &DetectorEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Writes the wake word name to stdout on every detection, and debug
/// probabilities as `name probability` to stderr.
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn handle(&mut self, event: &DetectorEvent) -> Result<()> {
        match event {
            DetectorEvent::Detected(detection) => println!("{}", detection.wake_word),
            DetectorEvent::Probability {
                wake_word,
                probability,
                ..
            } => eprintln!("{} {}", wake_word, probability),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// The sink as seen by detector stations: one lock around the user's sink,
/// plus a detection counter.
#[derive(Clone)]
pub(crate) struct SharedSink {
    inner: Arc<Mutex<Box<dyn EventSink>>>,
    detections: Arc<AtomicU64>,
}

impl SharedSink {
    pub(crate) fn new(sink: Box<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
            detections: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn emit(&self, event: &DetectorEvent) -> Result<()> {
        if matches!(event, DetectorEvent::Detected(_)) {
            self.detections.fetch_add(1, Ordering::SeqCst);
        }
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle(event)
    }

    pub(crate) fn finish(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish();
    }

    pub(crate) fn detections(&self) -> u64 {
        self.detections.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Detection;

    fn detected(wake_word: &str) -> DetectorEvent {
        DetectorEvent::Detected(Detection {
            wake_word: wake_word.to_string(),
            detector: 0,
            step: 0,
            probability: 0.9,
        })
    }

    #[test]
    fn event_sink_is_object_safe() {
        let _sink: Box<dyn EventSink> = Box::new(CollectorSink::new());
    }

    #[test]
    fn collector_sink_collects_in_order() {
        let mut sink = CollectorSink::new();
        let events = sink.events();

        sink.handle(&detected("alexa")).unwrap();
        sink.handle(&detected("hey_jarvis")).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].wake_word(), "alexa");
        assert_eq!(events[1].wake_word(), "hey_jarvis");
    }

    #[test]
    fn channel_sink_forwards_events() {
        let (mut sink, rx) = ChannelSink::new();
        sink.handle(&detected("alexa")).unwrap();

        assert_eq!(rx.try_recv().unwrap(), detected("alexa"));
    }

    #[test]
    fn channel_sink_ignores_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(sink.handle(&detected("alexa")).is_ok());
    }

    #[test]
    fn stdout_sink_name() {
        assert_eq!(StdoutSink.name(), "stdout");
    }

    #[test]
    fn shared_sink_counts_only_detections() {
        let collector = CollectorSink::new();
        let events = collector.events();
        let shared = SharedSink::new(Box::new(collector));

        shared.emit(&detected("alexa")).unwrap();
        shared
            .emit(&DetectorEvent::Probability {
                wake_word: "alexa".to_string(),
                step: 1,
                probability: 0.1,
            })
            .unwrap();

        assert_eq!(shared.detections(), 1);
        assert_eq!(events.lock().unwrap().len(), 2);
    }
}
