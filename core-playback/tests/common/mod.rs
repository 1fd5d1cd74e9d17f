//! Scripted in-memory audio engine shared by the integration tests.
//!
//! - opens can be held back per URL with [`ScriptedEngine::gate`] and let
//!   through with [`ScriptedEngine::release`]
//! - URLs registered with [`ScriptedEngine::fail_url`] fail to open
//! - the next call of an operation can be made to fail with
//!   [`ScriptedEngine::fail_next`]
//! - every call is logged and live handles are counted

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    AudioEngine, BridgeError, EngineEventReceiver, EngineHandle, EngineStatus, LoadedMedia,
    OpenOptions,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open { url: String, volume: f32 },
    Close(EngineHandle),
    Play(EngineHandle),
    Pause(EngineHandle),
    Seek(EngineHandle, Duration),
    SetVolume(EngineHandle, f32),
}

#[derive(Default)]
struct Script {
    live: HashSet<EngineHandle>,
    handles_by_url: HashMap<String, Vec<EngineHandle>>,
    calls: Vec<Call>,
    failing_urls: HashSet<String>,
    durations: HashMap<String, Duration>,
    failures: HashMap<&'static str, VecDeque<BridgeError>>,
}

pub struct ScriptedEngine {
    script: Mutex<Script>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    events: broadcast::Sender<EngineStatus>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            script: Mutex::new(Script::default()),
            gates: Mutex::new(HashMap::new()),
            events,
        })
    }

    /// Hold back every `open` of `url` until [`ScriptedEngine::release`].
    pub fn gate(&self, url: &str) {
        self.gates
            .lock()
            .insert(url.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let one pending `open` of `url` through.
    pub fn release(&self, url: &str) {
        if let Some(gate) = self.gates.lock().get(url) {
            gate.add_permits(1);
        }
    }

    pub fn fail_url(&self, url: &str) {
        self.script.lock().failing_urls.insert(url.to_string());
    }

    pub fn heal_url(&self, url: &str) {
        self.script.lock().failing_urls.remove(url);
    }

    pub fn set_duration(&self, url: &str, duration: Duration) {
        self.script
            .lock()
            .durations
            .insert(url.to_string(), duration);
    }

    /// Make the next call of `operation` ("play", "pause", "seek", ...) fail.
    pub fn fail_next(&self, operation: &'static str, err: BridgeError) {
        self.script
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    pub fn emit(&self, status: EngineStatus) {
        let _ = self.events.send(status);
    }

    pub fn live_count(&self) -> usize {
        self.script.lock().live.len()
    }

    pub fn is_live(&self, handle: EngineHandle) -> bool {
        self.script.lock().live.contains(&handle)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub fn open_count(&self, url: &str) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Open { url: u, .. } if u == url))
            .count()
    }

    /// Handles opened for `url`, oldest first.
    pub fn handles_for(&self, url: &str) -> Vec<EngineHandle> {
        self.script
            .lock()
            .handles_by_url
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    /// Most recent handle opened for `url`.
    pub fn handle_for(&self, url: &str) -> EngineHandle {
        *self
            .handles_for(url)
            .last()
            .unwrap_or_else(|| panic!("no handle opened for {url}"))
    }

    pub fn played(&self, handle: EngineHandle) -> bool {
        self.calls().contains(&Call::Play(handle))
    }

    fn record(&self, call: Call, operation: &'static str) -> BridgeResult<()> {
        let mut script = self.script.lock();
        script.calls.push(call);
        match script.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn ensure_live(&self, handle: EngineHandle) -> BridgeResult<()> {
        if self.is_live(handle) {
            Ok(())
        } else {
            Err(BridgeError::InvalidHandle(handle.to_string()))
        }
    }
}

#[async_trait]
impl AudioEngine for ScriptedEngine {
    async fn open(&self, url: &str, options: OpenOptions) -> BridgeResult<LoadedMedia> {
        self.record(
            Call::Open {
                url: url.to_string(),
                volume: options.initial_volume,
            },
            "open",
        )?;

        let gate = self.gates.lock().get(url).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| BridgeError::OperationFailed("gate closed".to_string()))?
                .forget();
        }

        let mut script = self.script.lock();
        if script.failing_urls.contains(url) {
            return Err(BridgeError::SourceUnavailable(format!("cannot open {url}")));
        }

        let handle = EngineHandle::new();
        script.live.insert(handle);
        script
            .handles_by_url
            .entry(url.to_string())
            .or_default()
            .push(handle);
        let duration = script.durations.get(url).copied();
        Ok(LoadedMedia::new(handle, duration))
    }

    async fn close(&self, handle: EngineHandle) -> BridgeResult<()> {
        self.record(Call::Close(handle), "close")?;
        if self.script.lock().live.remove(&handle) {
            Ok(())
        } else {
            Err(BridgeError::InvalidHandle(handle.to_string()))
        }
    }

    async fn play(&self, handle: EngineHandle) -> BridgeResult<()> {
        self.record(Call::Play(handle), "play")?;
        self.ensure_live(handle)
    }

    async fn pause(&self, handle: EngineHandle) -> BridgeResult<()> {
        self.record(Call::Pause(handle), "pause")?;
        self.ensure_live(handle)
    }

    async fn seek(&self, handle: EngineHandle, position: Duration) -> BridgeResult<()> {
        self.record(Call::Seek(handle, position), "seek")?;
        self.ensure_live(handle)
    }

    async fn set_volume(&self, handle: EngineHandle, volume: f32) -> BridgeResult<()> {
        self.record(Call::SetVolume(handle, volume), "set_volume")?;
        self.ensure_live(handle)
    }

    fn subscribe(&self) -> EngineEventReceiver {
        self.events.subscribe()
    }
}

/// Poll `condition` until it holds, panicking after one second.
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
