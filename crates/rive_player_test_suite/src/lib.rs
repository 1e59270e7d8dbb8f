//! Rive Player Test Suite
//!
//! Scenario tests for the scene-update engine, run against scripted fakes.
//!
//! # Contents
//!
//! - **Fakes**: a runtime serving scripted files, a fetcher whose responses
//!   can be held and released, a recording canvas and a counting surface host
//! - **Harness**: [`TestPlayer`], a player wired to the fakes with helpers
//!   to wait for loads and inspect the scene
//!
//! The scenarios themselves live in `tests/`.

pub mod fakes;
pub mod harness;

pub use fakes::{
    file_bytes, ArtboardSpec, CountingHost, FakeRuntime, FileSpec, GatedFetcher, MachineSpec,
    RecordingCanvas, RuntimeCall, RuntimeLog,
};
pub use harness::{init_tracing, SceneSummary, TestPlayer, WAIT_TIMEOUT};
