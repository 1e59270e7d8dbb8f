//! Rive Player Core
//!
//! Scene-update engine for embedding Rive animations in a UI surface.
//!
//! # Features
//!
//! - **Mutation Queue**: all scene changes are serialized onto the frame clock
//! - **Cancellable Loads**: generation tokens discard superseded source loads
//! - **Deferred Inputs**: input changes made while a file loads are replayed
//! - **Frame Clock**: foreground or background ticking at a target rate
//! - **Repaint Coalescing**: many repaint requests, one host invalidation
//! - **Input Bindings**: named bool/number/trigger inputs bound to a player
//!
//! The player is generic over an [`AnimationRuntime`] that parses and plays
//! files, and fetches bytes through a [`ByteFetcher`].

pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod inputs;
pub mod loader;
pub mod player;
pub mod queue;
pub mod repaint;
pub mod runtime;
pub mod scene;
pub mod surface;

pub use clock::{
    frame_interval, ClockMode, ClockState, FrameClock, FrameTicker, TickTarget, DEFAULT_FPS,
    MAX_FPS,
};
pub use config::{InitialValue, InputConfig, InputKind, PlayerConfig};
pub use error::{FetchError, PlayerError, Result, RuntimeError, SceneComponent};
pub use fetch::{ByteFetcher, FetchFuture};
pub use inputs::{
    BoolInput, CollectionChange, InputBinding, InputCollection, InputSink, InputValue,
    NumberInput, TriggerInput,
};
pub use loader::{load_source, GenerationCounter, GenerationToken, LoadStatus, SourceLoader};
pub use player::{PlayerBuilder, RivePlayer, SceneState};
pub use queue::{Mutation, MutationQueue};
pub use repaint::RepaintSignal;
pub use runtime::{
    AnimationOf, AnimationRuntime, Artboard, ArtboardOf, Canvas, CanvasOf, FileOf,
    LinearAnimation, RiveFile, StateMachine, StateMachineOf,
};
pub use scene::{Playback, Scene, SceneUpdate, StateMachineFallback};
pub use surface::SurfaceHost;
