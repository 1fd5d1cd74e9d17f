//! # Load Coordinator
//!
//! Single-flight track loading.
//!
//! Every load request bumps a generation counter held in [`HandleSlot`] and
//! receives a [`LoadTicket`] stamped with the new value. When the engine's
//! `open` completes, the result is applied only if the ticket is still
//! current; otherwise the freshly opened handle is closed straight away.
//! Overlapping loads therefore never leave an older track's audio running.
//!
//! ```text
//!  load(A) ── begin(g=1) ──── open(A) ..................... done: g≠2 → close(A)
//!  load(B) ─────── begin(g=2) ──── open(B) ...... done: g=2 → install(B)
//! ```
//!
//! The slot lives inside the controller's state lock; the coordinator only
//! performs the awaited engine calls, so no lock is held across `.await`.

use crate::model::Track;
use bridge_traits::{AudioEngine, BridgeError, EngineHandle, LoadedMedia, OpenOptions};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use tracing::{debug, warn};

/// Generation counter plus the one engine handle considered live.
#[derive(Debug, Default)]
pub struct HandleSlot {
    generation: u64,
    live: Option<EngineHandle>,
}

impl HandleSlot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn live(&self) -> Option<EngineHandle> {
        self.live
    }

    pub fn is_live(&self, handle: EngineHandle) -> bool {
        self.live == Some(handle)
    }

    /// Start a new load: bump the generation and detach the previous handle.
    ///
    /// The detached handle travels with the ticket and is closed by
    /// [`LoadCoordinator::open`] before the new media is opened.
    pub fn begin(&mut self, track: Track) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
            track,
            previous: self.live.take(),
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.generation == ticket.generation
    }

    /// Install `handle` as live if `ticket` is still current.
    pub fn install(&mut self, ticket: &LoadTicket, handle: EngineHandle) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.live = Some(handle);
        true
    }

    /// Invalidate every in-flight load and detach the live handle.
    pub fn invalidate(&mut self) -> Option<EngineHandle> {
        self.generation += 1;
        self.live.take()
    }

    /// Detach the live handle without touching the generation.
    pub fn detach(&mut self) -> Option<EngineHandle> {
        self.live.take()
    }
}

/// Proof of a load request, stamped with its generation.
///
/// Holds the handle detached by [`HandleSlot::begin`] until
/// [`LoadCoordinator::open`] closes it.
#[derive(Debug)]
#[must_use = "a ticket must be opened or the handle it carries stays open"]
pub struct LoadTicket {
    generation: u64,
    track: Track,
    previous: Option<EngineHandle>,
}

impl Drop for LoadTicket {
    fn drop(&mut self) {
        if let Some(handle) = self.previous {
            warn!(
                %handle,
                generation = self.generation,
                "Load ticket dropped before opening; previous handle left open"
            );
        }
    }
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn track(&self) -> &Track {
        &self.track
    }
}

/// Performs the engine side of a load.
#[derive(Clone)]
pub struct LoadCoordinator {
    engine: Arc<dyn AudioEngine>,
}

impl LoadCoordinator {
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self { engine }
    }

    /// Close the handle detached by `begin`, then open the ticket's track.
    ///
    /// A failing close is logged and does not abort the load.
    pub async fn open(
        &self,
        ticket: &mut LoadTicket,
        options: OpenOptions,
    ) -> Result<LoadedMedia, BridgeError> {
        if let Some(previous) = ticket.previous.take() {
            self.release(previous).await;
        }

        debug!(
            track_id = %ticket.track.id(),
            generation = ticket.generation,
            url = %redact_url(ticket.track.url()),
            "Opening media"
        );
        self.engine.open(ticket.track.url(), options).await
    }

    /// Best-effort close of a handle nobody considers live any more.
    pub async fn release(&self, handle: EngineHandle) {
        if let Err(e) = self.engine.close(handle).await {
            warn!(%handle, error = %e, "Failed to close engine handle");
        }
    }
}

impl std::fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("engine", &"AudioEngine { ... }")
            .finish()
    }
}
