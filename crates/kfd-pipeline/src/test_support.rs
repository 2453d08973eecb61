//! Scriptable detector for tests.
//!
//! The image bytes drive the fake: `"leaf,leaf,stem"` yields those labels,
//! `"fail"` returns an error, `"panic"` panics. A `sleep=<ms>;` prefix delays
//! the answer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kfd_ml_client::{Detector, MlError, MlResult};
use kfd_models::{Detection, Thresholds};

#[derive(Default)]
pub struct ScriptedDetector {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number of simultaneous `detect` calls observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&self, image: &[u8], _thresholds: Thresholds) -> MlResult<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let script = String::from_utf8_lossy(image).into_owned();
        let (delay, body) = match script.strip_prefix("sleep=").and_then(|s| s.split_once(';')) {
            Some((ms, rest)) => (ms.parse().unwrap_or(0), rest.to_string()),
            None => (0, script),
        };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match body.trim() {
            "fail" => Err(MlError::ServiceUnavailable("scripted failure".to_string())),
            "panic" => panic!("scripted panic"),
            labels => Ok(labels
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| Detection {
                    label: l.to_string(),
                    confidence: 0.9,
                })
                .collect()),
        }
    }
}
