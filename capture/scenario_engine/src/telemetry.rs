use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use tokio::{
    runtime::{Handle, Runtime},
    sync::mpsc,
    task::JoinHandle,
};

/// Builder for [`PlaybackTelemetry`].
pub struct PlaybackTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl PlaybackTelemetryBuilder {
    /// Creates a builder scoped to a module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            event_publisher: None,
        }
    }

    /// Appends structured log lines to `path`.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops log lines below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Publishes lifecycle events through `publisher`.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Opens the log file, if any.
    pub fn build(self) -> Result<PlaybackTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::with_min_level(path, self.min_level)?),
            None => None,
        };
        Ok(PlaybackTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
                publisher: self.event_publisher,
                writer: Mutex::new(None),
            }),
        })
    }
}

/// Log and event sink shared by players and browsers.
#[derive(Clone)]
pub struct PlaybackTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for PlaybackTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackTelemetry")
            .field("module", &self.inner.module)
            .field("logs", &self.inner.logger.is_some())
            .field("events", &self.inner.publisher.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
    publisher: Option<Arc<dyn EventPublisher>>,
    writer: Mutex<Option<EventWriter>>,
}

/// Single task publishing queued records one at a time, in queue order.
struct EventWriter {
    queue: mpsc::UnboundedSender<EventRecord>,
    task: JoinHandle<()>,
}

impl EventWriter {
    fn spawn(handle: &Handle, publisher: Arc<dyn EventPublisher>) -> Self {
        let (queue, mut inbox) = mpsc::unbounded_channel::<EventRecord>();
        let task = handle.spawn(async move {
            while let Some(record) = inbox.recv().await {
                let event_type = record.event_type.clone();
                if let Err(err) = publisher.publish(record).await {
                    tracing::warn!(error = %err, event_type, "event publish failed");
                }
            }
        });
        Self { queue, task }
    }
}

impl PlaybackTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> PlaybackTelemetryBuilder {
        PlaybackTelemetryBuilder::new(module)
    }

    /// Module label stamped on every record.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Writes a log line with object `metadata` merged in.
    pub fn log(&self, level: LogLevel, message: &str, metadata: &Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Publishes an event. Inside a tokio runtime the record is queued for the
    /// telemetry's writer task, which publishes in queue order; call
    /// [`PlaybackTelemetry::flush`] before the runtime goes away. Elsewhere the
    /// publish runs to completion on a temporary runtime.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        let Some(publisher) = &self.inner.publisher else {
            return Ok(());
        };
        let record = EventRecord::new(&self.inner.module, event_type, payload);
        let Ok(handle) = Handle::try_current() else {
            return Runtime::new()?.block_on(publisher.publish(record));
        };
        let mut writer = self.inner.writer.lock();
        let record = match writer.as_ref() {
            Some(live) => match live.queue.send(record) {
                Ok(()) => return Ok(()),
                // Writer died with its runtime; start a fresh one below.
                Err(mpsc::error::SendError(record)) => record,
            },
            None => record,
        };
        let fresh = EventWriter::spawn(&handle, Arc::clone(publisher));
        // The receiver was just created, so this send cannot fail.
        let _ = fresh.queue.send(record);
        *writer = Some(fresh);
        Ok(())
    }

    /// Waits until every queued event has been published. Later events start
    /// a new writer task.
    pub async fn flush(&self) -> Result<()> {
        let writer = self.inner.writer.lock().take();
        if let Some(EventWriter { queue, task }) = writer {
            drop(queue);
            task.await?;
        }
        Ok(())
    }

    /// Logs at info level and publishes `event_type` with the same payload.
    pub fn lifecycle(&self, event_type: &str, payload: Value) -> Result<()> {
        self.log(LogLevel::Info, event_type, &payload)?;
        self.event(event_type, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_event_bus::MemoryEventBus;
    use tempfile::tempdir;

    #[test]
    fn writes_log_line_and_event() {
        let tmp = tempdir().unwrap();
        let bus = Arc::new(MemoryEventBus::new(4));
        let log_path = tmp.path().join("playback.log");
        let telemetry = PlaybackTelemetry::builder("playback")
            .log_path(&log_path)
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        telemetry
            .lifecycle("playback.started", json!({ "scenario": "hvac-emergency" }))
            .unwrap();
        let logged = std::fs::read_to_string(&log_path).unwrap();
        assert!(logged.contains("playback.started"));
        assert!(logged.contains("hvac-emergency"));
        assert_eq!(bus.event_types(), vec!["playback.started".to_string()]);
    }

    #[test]
    fn min_level_filters_quiet_lines() {
        let tmp = tempdir().unwrap();
        let log_path = tmp.path().join("quiet.log");
        let telemetry = PlaybackTelemetry::builder("playback")
            .log_path(&log_path)
            .min_level(LogLevel::Warn)
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Debug, "tick", &json!({}))
            .unwrap();
        telemetry
            .log(LogLevel::Error, "broken", &json!({}))
            .unwrap();
        let logged = std::fs::read_to_string(&log_path).unwrap_or_default();
        assert!(!logged.contains("tick"));
        assert!(logged.contains("broken"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn events_keep_order_and_flush_drains_them() {
        let bus = Arc::new(MemoryEventBus::new(256));
        let telemetry = PlaybackTelemetry::builder("playback")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let expected: Vec<String> = (0..200).map(|i| format!("tick.{i}")).collect();
        for event_type in &expected {
            telemetry.event(event_type, json!({})).unwrap();
        }
        telemetry.flush().await.unwrap();
        assert_eq!(bus.event_types(), expected);

        telemetry.event("after.flush", json!({})).unwrap();
        telemetry.clone().flush().await.unwrap();
        assert_eq!(bus.event_types().last().map(String::as_str), Some("after.flush"));
    }

    #[tokio::test]
    async fn flush_without_events_returns_at_once() {
        let telemetry = PlaybackTelemetry::builder("idle")
            .event_publisher(Arc::new(MemoryEventBus::new(1)))
            .build()
            .unwrap();
        telemetry.flush().await.unwrap();
    }

    #[test]
    fn disabled_sinks_are_noops() {
        let telemetry = PlaybackTelemetry::builder("quiet").build().unwrap();
        telemetry.lifecycle("playback.reset", json!(null)).unwrap();
        assert_eq!(telemetry.module(), "quiet");
    }
}
