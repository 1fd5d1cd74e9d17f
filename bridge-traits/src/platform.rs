//! Trait-bound helpers shared by every bridge contract.
//!
//! Engines and stores are handed to the core as `Arc<dyn Trait>` and shared
//! between the session façade, the controller and the engine-event pump task,
//! so every bridge must be `Send + Sync`.

/// Marker trait for bridge implementations that can be shared across tasks.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}
