/// Bounded stdout/stderr collection
///
/// Each stream is drained on its own thread so a chatty child never blocks
/// on a full pipe. Bytes past the per-stream limit are read and discarded.
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Output limits configuration
#[derive(Debug, Clone)]
pub struct OutputLimits {
    /// Per-stream stdout limit (bytes)
    pub stdout_limit: usize,
    /// Per-stream stderr limit (bytes)
    pub stderr_limit: usize,
    /// How long to wait for pipes to close once the process is gone
    pub collection_timeout_ms: u64,
}

impl Default for OutputLimits {
    fn default() -> Self {
        OutputLimits {
            stdout_limit: 1024 * 1024,
            stderr_limit: 256 * 1024,
            collection_timeout_ms: 2000,
        }
    }
}

/// Output integrity classification
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputIntegrity {
    #[default]
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "truncated_by_limit")]
    TruncatedByLimit,
    #[serde(rename = "read_error")]
    ReadError,
    /// A pipe stayed open past the collection window (escaped descendant)
    #[serde(rename = "collector_timeout")]
    CollectorTimeout,
}

impl OutputIntegrity {
    pub fn is_truncated(self) -> bool {
        self != OutputIntegrity::Complete
    }

    /// Worse of two states.
    pub fn combine(self, other: OutputIntegrity) -> OutputIntegrity {
        self.max(other)
    }
}

impl std::fmt::Display for OutputIntegrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputIntegrity::Complete => write!(f, "complete"),
            OutputIntegrity::TruncatedByLimit => write!(f, "truncated_by_limit"),
            OutputIntegrity::ReadError => write!(f, "read_error"),
            OutputIntegrity::CollectorTimeout => write!(f, "collector_timeout"),
        }
    }
}

/// Bytes captured from one stream.
#[derive(Debug, Clone, Default)]
pub struct StreamCapture {
    pub data: Vec<u8>,
    pub integrity: OutputIntegrity,
}

/// Output collection result
#[derive(Debug, Clone, Default)]
pub struct CollectedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub integrity: OutputIntegrity,
}

/// Output collector with bounded collection
pub struct OutputCollector {
    limits: OutputLimits,
}

impl OutputCollector {
    pub fn new(limits: OutputLimits) -> Self {
        OutputCollector { limits }
    }

    /// Start draining both streams. Call [`PendingOutput::finish`] after the
    /// process has exited.
    pub fn start<O, E>(&self, stdout: Option<O>, stderr: Option<E>) -> PendingOutput
    where
        O: Read + Send + 'static,
        E: Read + Send + 'static,
    {
        PendingOutput {
            stdout: stdout.map(|s| StreamDrain::spawn(s, self.limits.stdout_limit)),
            stderr: stderr.map(|s| StreamDrain::spawn(s, self.limits.stderr_limit)),
            timeout: Duration::from_millis(self.limits.collection_timeout_ms),
        }
    }
}

/// One collector thread and the bytes it has read so far.
struct StreamDrain {
    capture: Arc<Mutex<StreamCapture>>,
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl StreamDrain {
    fn spawn<R: Read + Send + 'static>(stream: R, limit: usize) -> Self {
        let capture = Arc::new(Mutex::new(StreamCapture::default()));
        let (tx, done) = channel();
        let sink = Arc::clone(&capture);
        let handle = thread::spawn(move || {
            drain(stream, limit, &sink);
            let _ = tx.send(());
        });
        StreamDrain {
            capture,
            done,
            handle,
        }
    }

    /// Wait for EOF until `deadline`. A stream still open at the deadline
    /// keeps what was read so far and is marked [`OutputIntegrity::CollectorTimeout`];
    /// its thread exits on its own once the last writer closes the pipe.
    fn collect(self, deadline: Instant) -> StreamCapture {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.done.recv_timeout(remaining) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let joined = self.handle.join().is_ok();
                let mut capture = snapshot(&self.capture);
                if !joined {
                    capture.integrity = capture.integrity.combine(OutputIntegrity::ReadError);
                }
                capture
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Output stream still open after collection window; keeping partial output"
                );
                let mut capture = snapshot(&self.capture);
                capture.integrity = capture.integrity.combine(OutputIntegrity::CollectorTimeout);
                capture
            }
        }
    }
}

fn lock(capture: &Mutex<StreamCapture>) -> MutexGuard<'_, StreamCapture> {
    capture.lock().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot(capture: &Mutex<StreamCapture>) -> StreamCapture {
    lock(capture).clone()
}

/// Collector threads in flight.
pub struct PendingOutput {
    stdout: Option<StreamDrain>,
    stderr: Option<StreamDrain>,
    timeout: Duration,
}

impl PendingOutput {
    /// Wait (bounded) for both streams to hit EOF.
    pub fn finish(self) -> CollectedOutput {
        let deadline = Instant::now() + self.timeout;
        let stdout = self
            .stdout
            .map(|s| s.collect(deadline))
            .unwrap_or_default();
        let stderr = self
            .stderr
            .map(|s| s.collect(deadline))
            .unwrap_or_default();

        CollectedOutput {
            integrity: stdout.integrity.combine(stderr.integrity),
            stdout: stdout.data,
            stderr: stderr.data,
        }
    }
}

/// Read `stream` to EOF into `sink`, keeping at most `limit` bytes.
fn drain<R: Read>(mut stream: R, limit: usize, sink: &Mutex<StreamCapture>) {
    let mut chunk = [0u8; 8192];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let mut capture = lock(sink);
                let room = limit.saturating_sub(capture.data.len());
                if n > room {
                    capture.data.extend_from_slice(&chunk[..room]);
                    capture.integrity = capture.integrity.combine(OutputIntegrity::TruncatedByLimit);
                } else {
                    capture.data.extend_from_slice(&chunk[..n]);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => {
                let mut capture = lock(sink);
                capture.integrity = capture.integrity.combine(OutputIntegrity::ReadError);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drained<R: Read>(stream: R, limit: usize) -> StreamCapture {
        let sink = Mutex::new(StreamCapture::default());
        drain(stream, limit, &sink);
        sink.into_inner().unwrap()
    }

    #[test]
    fn test_drain_within_limit() {
        let capture = drained(Cursor::new(b"hello".to_vec()), 16);
        assert_eq!(capture.data, b"hello");
        assert_eq!(capture.integrity, OutputIntegrity::Complete);
    }

    #[test]
    fn test_drain_truncates_but_consumes_everything() {
        let mut cursor = Cursor::new(vec![b'x'; 50_000]);
        let capture = drained(&mut cursor, 100);
        assert_eq!(capture.data.len(), 100);
        assert_eq!(capture.integrity, OutputIntegrity::TruncatedByLimit);
        assert_eq!(cursor.position(), 50_000);
    }

    #[test]
    fn test_collect_no_streams() {
        let collector = OutputCollector::new(OutputLimits::default());
        let out = collector
            .start(None::<Cursor<Vec<u8>>>, None::<Cursor<Vec<u8>>>)
            .finish();
        assert!(out.stdout.is_empty());
        assert!(out.stderr.is_empty());
        assert_eq!(out.integrity, OutputIntegrity::Complete);
    }

    #[test]
    fn test_collect_both_streams() {
        let limits = OutputLimits {
            stdout_limit: 4,
            stderr_limit: 64,
            collection_timeout_ms: 1000,
        };
        let out = OutputCollector::new(limits)
            .start(
                Some(Cursor::new(b"abcdefgh".to_vec())),
                Some(Cursor::new(b"warn".to_vec())),
            )
            .finish();
        assert_eq!(out.stdout, b"abcd");
        assert_eq!(out.stderr, b"warn");
        assert_eq!(out.integrity, OutputIntegrity::TruncatedByLimit);
    }

    #[test]
    fn test_integrity_combine_and_display() {
        assert_eq!(
            OutputIntegrity::Complete.combine(OutputIntegrity::ReadError),
            OutputIntegrity::ReadError
        );
        assert!(!OutputIntegrity::Complete.is_truncated());
        assert_eq!(format!("{}", OutputIntegrity::TruncatedByLimit), "truncated_by_limit");
    }

    /// Yields `first`, then blocks until the test drops the sender.
    struct HeldOpen {
        first: Option<Vec<u8>>,
        release: Receiver<()>,
    }

    impl Read for HeldOpen {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(first) = self.first.take() {
                buf[..first.len()].copy_from_slice(&first);
                return Ok(first.len());
            }
            let _ = self.release.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_stream_held_open_keeps_partial_output() {
        let (hold, release) = channel::<()>();
        let limits = OutputLimits {
            collection_timeout_ms: 100,
            ..OutputLimits::default()
        };
        let started = Instant::now();
        let out = OutputCollector::new(limits)
            .start(
                Some(HeldOpen {
                    first: Some(b"ok\n".to_vec()),
                    release,
                }),
                Some(Cursor::new(Vec::new())),
            )
            .finish();
        drop(hold);

        assert_eq!(out.stdout, b"ok\n");
        assert_eq!(out.integrity, OutputIntegrity::CollectorTimeout);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
