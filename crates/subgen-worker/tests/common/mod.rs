//! In-memory collaborators for worker tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use subgen_models::{Clip, TimedWord};
use subgen_queue::{Delivery, JobStream, Publisher, QueueError, QueueResult};
use subgen_storage::{ObjectStore, StorageError, StorageResult};
use subgen_transcribe::{TranscribeError, TranscribeResult, Transcriber};

/// Object store backed by a map of key to bytes.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing_downloads: Mutex<HashSet<String>>,
    failing_uploads: Mutex<HashSet<String>>,
    upload_delays: Mutex<VecDeque<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn fail_download(&self, key: &str) {
        self.failing_downloads.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_upload(&self, key: &str) {
        self.failing_uploads.lock().unwrap().insert(key.to_string());
    }

    /// Hold the next upload call for `delay` before it reads its file.
    pub fn delay_next_upload(&self, delay: Duration) {
        self.upload_delays.lock().unwrap().push_back(delay);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download_file(&self, key: &str, dest: &Path) -> StorageResult<()> {
        if self.failing_downloads.lock().unwrap().contains(key) {
            return Err(StorageError::download_failed(format!("injected failure for {}", key)));
        }
        let data = self.get(key).ok_or_else(|| StorageError::not_found(key))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn upload_file(&self, src: &Path, key: &str) -> StorageResult<()> {
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(StorageError::upload_failed(format!("injected failure for {}", key)));
        }
        let delay = self.upload_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let data = tokio::fs::read(src).await?;
        self.put(key, &data);
        Ok(())
    }
}

#[derive(Clone)]
enum Script {
    Words(Vec<TimedWord>),
    Fail(String),
    Panic,
}

/// Transcriber returning scripted words per staged file name.
///
/// Tracks how many transcriptions run at once.
#[derive(Default)]
pub struct ScriptedTranscriber {
    scripts: Mutex<HashMap<String, Script>>,
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Mutex<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn words(&self, file_name: &str, words: Vec<TimedWord>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Script::Words(words));
    }

    pub fn fail(&self, file_name: &str, message: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Script::Fail(message.to_string()));
    }

    pub fn panic_on(&self, file_name: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Script::Panic);
    }

    pub fn delay(&self, file_name: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(file_name.to_string(), delay);
    }

    pub fn default_delay(&self, delay: Duration) {
        *self.default_delay.lock().unwrap() = delay;
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> TranscribeResult<Vec<TimedWord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        assert!(audio_path.exists(), "audio must be staged before transcription");

        let name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&name)
            .copied()
            .unwrap_or(*self.default_delay.lock().unwrap());
        tokio::time::sleep(delay).await;

        let script = self.scripts.lock().unwrap().get(&name).cloned();
        let words = match script {
            Some(Script::Words(words)) => words,
            Some(Script::Fail(message)) => return Err(TranscribeError::TranscriptFailed(message)),
            Some(Script::Panic) => panic!("transcriber blew up on {}", name),
            None => vec![TimedWord::new(format!("from {}", name), 0, 500)],
        };
        Ok(words)
    }
}

/// Publisher that records every published clip.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(Clip, String)>>,
    fail: Mutex<bool>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let publisher = Self::default();
        *publisher.fail.lock().unwrap() = true;
        publisher
    }

    pub fn published(&self) -> Vec<(Clip, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, clip: &Clip, message_type: &str) -> QueueResult<String> {
        if *self.fail.lock().unwrap() {
            return Err(QueueError::publish_failed("broker unavailable"));
        }
        let mut published = self.published.lock().unwrap();
        published.push((clip.clone(), message_type.to_string()));
        Ok(format!("{}-0", published.len()))
    }
}

struct PendingEntry {
    clip: Clip,
    last_seen: Instant,
    deliveries: usize,
}

/// Job stream with consumer-group semantics kept in memory.
///
/// Pending entries track their idle time, so reclaiming behaves like a
/// stream that other workers scan too.
#[derive(Default)]
pub struct MemoryStream {
    next_id: AtomicUsize,
    fresh: Mutex<VecDeque<(String, Clip)>>,
    pending: Mutex<HashMap<String, PendingEntry>>,
    acked: Mutex<Vec<String>>,
    failing_acks: Mutex<usize>,
    touches: AtomicUsize,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, clip: &Clip) -> String {
        let id = format!("{}-0", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.fresh
            .lock()
            .unwrap()
            .push_back((id.clone(), clip.clone()));
        id
    }

    /// Make the next `n` ack calls fail.
    pub fn fail_next_acks(&self, n: usize) {
        *self.failing_acks.lock().unwrap() = n;
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn touches(&self) -> usize {
        self.touches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStream for MemoryStream {
    async fn init(&self) -> QueueResult<()> {
        Ok(())
    }

    async fn consume(
        &self,
        _consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let taken: Vec<(String, Clip)> = {
            let mut fresh = self.fresh.lock().unwrap();
            let n = count.min(fresh.len());
            fresh.drain(..n).collect()
        };
        if taken.is_empty() {
            tokio::time::sleep(Duration::from_millis(block_ms)).await;
            return Ok(Vec::new());
        }

        let mut pending = self.pending.lock().unwrap();
        Ok(taken
            .into_iter()
            .map(|(id, clip)| {
                pending.insert(
                    id.clone(),
                    PendingEntry {
                        clip: clip.clone(),
                        last_seen: Instant::now(),
                        deliveries: 1,
                    },
                );
                Delivery {
                    message_id: id,
                    clip,
                    deliveries: 1,
                }
            })
            .collect())
    }

    async fn claim_pending(
        &self,
        _consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
        exclude: &HashSet<String>,
    ) -> QueueResult<Vec<Delivery>> {
        let min_idle = Duration::from_millis(min_idle_ms);
        let mut pending = self.pending.lock().unwrap();
        let mut claimed = Vec::new();
        for (id, entry) in pending.iter_mut() {
            if claimed.len() == count {
                break;
            }
            if exclude.contains(id) || entry.last_seen.elapsed() < min_idle {
                continue;
            }
            entry.last_seen = Instant::now();
            entry.deliveries += 1;
            claimed.push(Delivery {
                message_id: id.clone(),
                clip: entry.clip.clone(),
                deliveries: entry.deliveries,
            });
        }
        Ok(claimed)
    }

    async fn touch(&self, _consumer_name: &str, message_ids: &[String]) -> QueueResult<()> {
        let mut pending = self.pending.lock().unwrap();
        for id in message_ids {
            if let Some(entry) = pending.get_mut(id) {
                entry.last_seen = Instant::now();
            }
        }
        self.touches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        {
            let mut failing = self.failing_acks.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(QueueError::connection_failed("injected ack failure"));
            }
        }
        self.pending.lock().unwrap().remove(message_id);
        self.acked.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

/// Words `w1..wn`, each 100ms long.
pub fn words(n: usize) -> Vec<TimedWord> {
    (0..n)
        .map(|i| TimedWord::new(format!("w{}", i + 1), i as u64 * 100, (i as u64 + 1) * 100))
        .collect()
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub publisher: Arc<RecordingPublisher>,
    pub work_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_publisher(RecordingPublisher::new())
    }

    pub fn with_publisher(publisher: RecordingPublisher) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            transcriber: Arc::new(ScriptedTranscriber::new()),
            publisher: Arc::new(publisher),
            work_dir: tempfile::TempDir::new().unwrap(),
        }
    }

    /// Put audio for every chunk of `clip` into the store.
    pub fn seed_audio(&self, clip: &Clip) {
        for chunk in clip.audios() {
            let key = subgen_storage::audio_key(&clip.user_id, &clip.id, chunk);
            self.store.put(&key, b"fake audio");
        }
    }

    pub fn orchestrator(&self, max_parallel: usize) -> subgen_worker::ClipOrchestrator {
        let processor = subgen_worker::ChunkProcessor::new(
            self.store.clone(),
            self.transcriber.clone(),
            self.work_dir.path(),
        );
        subgen_worker::ClipOrchestrator::new(processor, self.publisher.clone(), max_parallel)
    }

    /// Files left anywhere under the work directory.
    pub fn staged_files(&self) -> Vec<std::path::PathBuf> {
        fn walk(dir: &Path, out: &mut Vec<std::path::PathBuf>) {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        walk(&path, out);
                    } else {
                        out.push(path);
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(self.work_dir.path(), &mut out);
        out
    }
}
