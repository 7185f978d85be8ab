//! Single-writer async runtime, change events and query subscriptions.

/// Change event types emitted by the runtime.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
/// Reactive query subscriptions and their registry.
pub mod subscription;
