//! Fake engine for session tests: opens can be held back per URL and
//! status events are pushed by the test through [`FakeEngine::emit`].

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    AudioEngine, BridgeError, EngineEventReceiver, EngineHandle, EngineStatus, LoadedMedia,
    OpenOptions,
};
use core_playback::Track;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Default)]
struct Media {
    live: HashMap<EngineHandle, String>,
    opened: Vec<(String, EngineHandle)>,
    played: Vec<EngineHandle>,
}

pub struct FakeEngine {
    media: Mutex<Media>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    events: broadcast::Sender<EngineStatus>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            media: Mutex::new(Media::default()),
            gates: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn gate(&self, url: &str) {
        self.gates
            .lock()
            .insert(url.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, url: &str) {
        if let Some(gate) = self.gates.lock().get(url) {
            gate.add_permits(1);
        }
    }

    pub fn emit(&self, status: EngineStatus) {
        let _ = self.events.send(status);
    }

    /// Number of live subscriptions to the status channel.
    pub fn listeners(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn live_count(&self) -> usize {
        self.media.lock().live.len()
    }

    pub fn open_count(&self, url: &str) -> usize {
        self.media
            .lock()
            .opened
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    /// Latest handle opened for `url`.
    pub fn handle_for(&self, url: &str) -> Option<EngineHandle> {
        self.media
            .lock()
            .opened
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, h)| *h)
    }

    pub fn played(&self, handle: EngineHandle) -> bool {
        self.media.lock().played.contains(&handle)
    }

    fn check(&self, handle: EngineHandle) -> BridgeResult<()> {
        if self.media.lock().live.contains_key(&handle) {
            Ok(())
        } else {
            Err(BridgeError::InvalidHandle(handle.to_string()))
        }
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn open(&self, url: &str, _options: OpenOptions) -> BridgeResult<LoadedMedia> {
        let gate = self.gates.lock().get(url).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| BridgeError::OperationFailed("gate closed".into()))?
                .forget();
        }

        let handle = EngineHandle::new();
        let mut media = self.media.lock();
        media.live.insert(handle, url.to_string());
        media.opened.push((url.to_string(), handle));
        Ok(LoadedMedia::new(handle, Some(Duration::from_secs(180))))
    }

    async fn close(&self, handle: EngineHandle) -> BridgeResult<()> {
        match self.media.lock().live.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(BridgeError::InvalidHandle(handle.to_string())),
        }
    }

    async fn play(&self, handle: EngineHandle) -> BridgeResult<()> {
        self.check(handle)?;
        self.media.lock().played.push(handle);
        Ok(())
    }

    async fn pause(&self, handle: EngineHandle) -> BridgeResult<()> {
        self.check(handle)
    }

    async fn seek(&self, handle: EngineHandle, _position: Duration) -> BridgeResult<()> {
        self.check(handle)
    }

    async fn set_volume(&self, handle: EngineHandle, _volume: f32) -> BridgeResult<()> {
        self.check(handle)
    }

    fn subscribe(&self) -> EngineEventReceiver {
        self.events.subscribe()
    }
}

pub fn track(id: &str) -> Track {
    Track::new(
        id,
        format!("Song {id}"),
        "Artist",
        format!("https://cdn.test/{id}.mp3"),
    )
    .with_duration(Duration::from_secs(180))
}

pub fn url(id: &str) -> String {
    format!("https://cdn.test/{id}.mp3")
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
