//! Scripted transcriber for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use subgen_models::Segment;

use crate::error::{TranscribeError, TranscribeResult};
use crate::Transcriber;

/// In-memory transcriber.
///
/// Scripted results are consumed FIFO; once the script is exhausted every
/// call returns a canned single-segment transcript. The in-flight gauge lets
/// tests assert how many transcriptions overlapped, which is how the AI
/// semaphore bound is observed.
#[derive(Default)]
pub struct MockTranscriber {
    script: Mutex<VecDeque<Result<Vec<Segment>, String>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each call open for `delay`, widening the observation window.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful result for the next unscripted call.
    pub fn push_segments(&self, segments: Vec<Segment>) {
        self.script.lock().unwrap().push_back(Ok(segments));
    }

    /// Queue a provider failure for the next unscripted call.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.script.lock().unwrap().push_back(Err(message.into()));
    }

    /// Total calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously in-flight calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn canned() -> Vec<Segment> {
        vec![Segment::new("This is a mock transcript.", 0, 1000)]
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _audio_key: &str) -> TranscribeResult<Vec<Segment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Some(Ok(segments)) => Ok(segments),
            Some(Err(message)) => Err(TranscribeError::provider(message)),
            None => Ok(Self::canned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_results_are_consumed_in_order() {
        let mock = MockTranscriber::new();
        mock.push_segments(vec![Segment::new("first", 0, 500)]);
        mock.push_failure("provider exploded");

        let first = mock.transcribe("a.mp3").await.unwrap();
        assert_eq!(first, vec![Segment::new("first", 0, 500)]);

        let second = mock.transcribe("a.mp3").await;
        match second {
            Err(TranscribeError::Provider(msg)) => assert_eq!(msg, "provider exploded"),
            other => panic!("unexpected result: {other:?}"),
        }

        // Script exhausted: canned transcript.
        let third = mock.transcribe("a.mp3").await.unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.in_flight(), 0);
    }

    #[tokio::test]
    async fn gauge_tracks_overlapping_calls() {
        use std::sync::Arc;

        let mock = Arc::new(MockTranscriber::new().with_delay(Duration::from_millis(50)));

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let mock = Arc::clone(&mock);
                tokio::spawn(async move { mock.transcribe("a.mp3").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(mock.calls(), 3);
        assert_eq!(mock.in_flight(), 0);
        assert!(mock.peak_in_flight() >= 2, "tasks should have overlapped");
    }
}
