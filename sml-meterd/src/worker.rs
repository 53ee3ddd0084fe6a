//! Polling worker
//!
//! One background task owns the whole poll cycle: open the serial link,
//! frame a telegram, decode both energy registers, publish the snapshot
//! and feed the sinks. Consumers only observe the published snapshot and
//! state through watch channels; nothing outside the task mutates them.

use crate::config::MeterConfig;
use crate::sink::ReadingSink;
use async_trait::async_trait;
use sml_core::{now_millis, MeterSnapshot, SmlError, SmlResult};
use sml_framing::{FieldDecoder, FrameScanner, NEGATIVE_ENERGY_FIELD, POSITIVE_ENERGY_FIELD};
use sml_transport::{ByteSource, SerialSettings, SerialSource};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cooldown after a transport failure before the next attempt. Fixed,
/// with no backoff growth: operators rely on the steady retry timing.
const TRANSPORT_COOLDOWN: Duration = Duration::from_secs(2);

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No cycle has completed yet
    NotStarted,
    /// At least one cycle (successful or not) has completed
    Polling,
    /// A stop request has been honored; terminal
    Stopped,
}

/// Produces a fresh byte source for every polling cycle
///
/// The seam that lets tests run the worker against a scripted source
/// instead of a serial port.
#[async_trait]
pub trait SourceFactory: Send + Sync + 'static {
    type Source: ByteSource;

    async fn connect(&self) -> SmlResult<Self::Source>;
}

/// Opens the configured serial port anew on every cycle
pub struct SerialFactory {
    settings: SerialSettings,
}

impl SerialFactory {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &MeterConfig) -> Self {
        Self::new(SerialSettings::with_timeout(
            config.port.clone(),
            config.baud_rate,
            Duration::from_secs(config.read_timeout_secs),
        ))
    }
}

#[async_trait]
impl SourceFactory for SerialFactory {
    type Source = SerialSource;

    async fn connect(&self) -> SmlResult<SerialSource> {
        let mut source = SerialSource::new(self.settings.clone());
        source.open().await?;
        Ok(source)
    }
}

/// The polling worker; consumed by [`PollingWorker::spawn`]
pub struct PollingWorker<F: SourceFactory> {
    config: MeterConfig,
    factory: F,
    sinks: Vec<Box<dyn ReadingSink>>,
}

/// Handle to a running worker
///
/// Observers read the latest snapshot and state; `stop` is the only
/// control operation.
pub struct WorkerHandle {
    readings: watch::Receiver<MeterSnapshot>,
    state: watch::Receiver<WorkerState>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Latest published snapshot (default-zero before the first cycle)
    pub fn snapshot(&self) -> MeterSnapshot {
        *self.readings.borrow()
    }

    /// Watch receiver for snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<MeterSnapshot> {
        self.readings.clone()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Block until the first cycle has completed (success or failure)
    pub async fn wait_ready(&mut self) -> SmlResult<()> {
        self.state
            .wait_for(|s| *s != WorkerState::NotStarted)
            .await
            .map_err(|_| SmlError::Connection(std::io::Error::other("worker terminated")))?;
        Ok(())
    }

    /// Request a cooperative stop and wait for the task to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.join.await;
    }
}

impl<F: SourceFactory> PollingWorker<F> {
    pub fn new(config: MeterConfig, factory: F, sinks: Vec<Box<dyn ReadingSink>>) -> Self {
        Self {
            config,
            factory,
            sinks,
        }
    }

    /// Start the background polling task
    pub fn spawn(self) -> WorkerHandle {
        let (readings_tx, readings_rx) = watch::channel(MeterSnapshot::default());
        let (state_tx, state_rx) = watch::channel(WorkerState::NotStarted);
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            self.run(readings_tx, &state_tx, task_cancel).await;
            let _ = state_tx.send(WorkerState::Stopped);
        });

        WorkerHandle {
            readings: readings_rx,
            state: state_rx,
            cancel,
            join,
        }
    }

    async fn run(
        self,
        readings_tx: watch::Sender<MeterSnapshot>,
        state_tx: &watch::Sender<WorkerState>,
        cancel: CancellationToken,
    ) {
        let scanner = FrameScanner::new();
        let cycle = Duration::from_secs(self.config.cycle_secs);

        while !cancel.is_cancelled() {
            // A stop request also aborts a scan in progress rather than
            // waiting out the read timeout.
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll_once(&scanner, &readings_tx) => result,
            };

            // Readiness: the first completed cycle, failed or not, moves
            // the worker out of NotStarted so waiters unblock.
            if *state_tx.borrow() == WorkerState::NotStarted {
                let _ = state_tx.send(WorkerState::Polling);
            }

            match result {
                Ok(()) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(cycle) => {}
                    }
                }
                Err(e) if e.is_transport() => {
                    log::error!("Reading {} failed: {}", self.config.port, e);
                    if cancel.is_cancelled() {
                        break;
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(TRANSPORT_COOLDOWN) => {}
                    }
                }
                Err(e) => {
                    // Defensive cases such as an empty telegram: report
                    // like a failed read, no cooldown, repeat the cycle.
                    log::error!("Reading {} failed: {}", self.config.port, e);
                }
            }
        }
    }

    async fn poll_once(
        &self,
        scanner: &FrameScanner,
        readings_tx: &watch::Sender<MeterSnapshot>,
    ) -> SmlResult<()> {
        let mut source = self.factory.connect().await?;
        let result = scanner.scan(&mut source).await;
        let _ = source.close().await;
        let telegram = result?;

        if telegram.is_empty() {
            return Err(SmlError::InvalidData("empty telegram".to_string()));
        }
        log::debug!("Telegram ({} bytes): {}", telegram.len(), telegram);

        let snapshot = MeterSnapshot {
            positive: FieldDecoder::decode_field(&telegram, &POSITIVE_ENERGY_FIELD),
            negative: FieldDecoder::decode_field(&telegram, &NEGATIVE_ENERGY_FIELD),
            taken_at_ms: now_millis(),
        };
        log::info!(
            "1.8.0: {} kWh, 2.8.0: {} kWh",
            snapshot.positive,
            snapshot.negative
        );

        // Both readings go out as one atomic snapshot.
        let _ = readings_tx.send(snapshot);

        for sink in &self.sinks {
            if let Err(e) = sink.publish(&snapshot).await {
                log::error!("Sink {} failed: {}", sink.name(), e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sml_core::Reading;
    use sml_framing::{FieldSpec, START_MARKER, STOP_MARKER};
    use sml_transport::MockSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    fn encode_field(buf: &mut Vec<u8>, field: &FieldSpec, tag: u8, payload: &[u8]) {
        let obis_idx = buf.len();
        buf.extend_from_slice(&field.obis.wire_pattern());
        while buf.len() < obis_idx + field.value_offset {
            buf.push(0x00);
        }
        buf.push(tag);
        buf.extend_from_slice(payload);
    }

    /// Telegram with 1.8.0 = 1234.568 kWh and 2.8.0 = 0.026 kWh
    fn sample_telegram() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&START_MARKER);
        encode_field(&mut buf, &POSITIVE_ENERGY_FIELD, 0x55, &12345678i32.to_be_bytes());
        encode_field(&mut buf, &NEGATIVE_ENERGY_FIELD, 0x62, &[0xFF]);
        buf.extend_from_slice(&STOP_MARKER);
        buf.extend_from_slice(&[0x00, 0xAB, 0xCD]);
        buf
    }

    struct MockFactory {
        telegram: Vec<u8>,
        fail_first: AtomicUsize,
        connects: AtomicUsize,
    }

    impl MockFactory {
        fn new(telegram: Vec<u8>) -> Self {
            Self {
                telegram,
                fail_first: AtomicUsize::new(0),
                connects: AtomicUsize::new(0),
            }
        }

        fn failing_first(telegram: Vec<u8>, failures: usize) -> Self {
            Self {
                fail_first: AtomicUsize::new(failures),
                ..Self::new(telegram)
            }
        }
    }

    #[async_trait]
    impl SourceFactory for MockFactory {
        type Source = MockSource;

        async fn connect(&self) -> SmlResult<MockSource> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(SmlError::Connection(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such port",
                )));
            }
            Ok(MockSource::new(self.telegram.clone()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        published: Arc<Mutex<Vec<MeterSnapshot>>>,
    }

    #[async_trait]
    impl ReadingSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn publish(&self, snapshot: &MeterSnapshot) -> SmlResult<()> {
            self.published.lock().unwrap().push(*snapshot);
            Ok(())
        }
    }

    fn test_config() -> MeterConfig {
        MeterConfig {
            cycle_secs: 60,
            ..MeterConfig::default()
        }
    }

    #[tokio::test]
    async fn test_one_cycle_populates_readings_and_sinks() {
        let sink = RecordingSink::default();
        let published = sink.published.clone();
        let worker = PollingWorker::new(
            test_config(),
            MockFactory::new(sample_telegram()),
            vec![Box::new(sink)],
        );

        let mut handle = worker.spawn();
        handle.wait_ready().await.unwrap();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.positive.kwh(), 1234.568);
        assert_eq!(snapshot.negative.kwh(), 0.026);
        assert!(snapshot.taken_at_ms > 0);

        let calls = published.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], snapshot);

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_interrupts_inter_cycle_sleep() {
        let worker = PollingWorker::new(
            test_config(),
            MockFactory::new(sample_telegram()),
            Vec::new(),
        );

        let mut handle = worker.spawn();
        handle.wait_ready().await.unwrap();
        assert_eq!(handle.state(), WorkerState::Polling);

        // The worker is now in its 60 s inter-cycle sleep; stopping must
        // not wait the cycle out.
        let started = Instant::now();
        handle.stop().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retries_after_cooldown() {
        let factory = Arc::new(MockFactory::failing_first(sample_telegram(), 2));
        let worker = PollingWorker::new(test_config(), SharedFactory(factory.clone()), Vec::new());

        let mut handle = worker.spawn();
        let mut readings = handle.subscribe();
        readings
            .wait_for(|s| s.positive != Reading::ZERO)
            .await
            .unwrap();

        // Two failed connects, then the successful one.
        assert_eq!(factory.connects.load(Ordering::SeqCst), 3);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_worker_reaches_stopped_state() {
        let worker = PollingWorker::new(
            test_config(),
            MockFactory::new(sample_telegram()),
            Vec::new(),
        );

        let mut handle = worker.spawn();
        handle.wait_ready().await.unwrap();
        let state = handle.state.clone();
        handle.stop().await;
        assert_eq!(*state.borrow(), WorkerState::Stopped);
    }

    /// Factory wrapper so a test can keep a handle on the inner mock
    struct SharedFactory(Arc<MockFactory>);

    #[async_trait]
    impl SourceFactory for SharedFactory {
        type Source = MockSource;

        async fn connect(&self) -> SmlResult<MockSource> {
            self.0.connect().await
        }
    }
}
