//! Test harness for scenario tests
//!
//! Wraps a [`RivePlayer`] over the fake collaborators with:
//! - a private tokio runtime for source loads
//! - an attached [`CountingHost`] surface in foreground mode
//! - collected error reports
//! - polling helpers that wait for asynchronous loads with a timeout

use crate::fakes::{file_bytes, FakeRuntime, FileSpec, GatedFetcher, RecordingCanvas, RuntimeLog};
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use rive_player_core::{
    GenerationToken, LoadStatus, Playback, PlayerConfig, PlayerError, RivePlayer, SceneState,
};
use std::sync::{Arc, Once};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// How long helpers wait for asynchronous work
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install the test tracing subscriber once per process
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=rive_player_core=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// What the live scene is made of
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneSummary {
    pub file: Option<String>,
    pub artboard: Option<String>,
    pub state_machine: Option<String>,
    pub animation: Option<String>,
}

impl SceneSummary {
    pub fn empty() -> Self {
        Self {
            file: None,
            artboard: None,
            state_machine: None,
            animation: None,
        }
    }

    fn of(state: &SceneState<FakeRuntime>) -> Self {
        let scene = state.scene();
        let (state_machine, animation) = match scene.playback() {
            Some(Playback::StateMachine(sm)) => (Some(sm.name().to_string()), None),
            Some(Playback::Animation(a)) => (None, Some(a.name().to_string())),
            None => (None, None),
        };
        Self {
            file: scene.file().map(|f| f.name().to_string()),
            artboard: scene.artboard().map(|a| a.name().to_string()),
            state_machine,
            animation,
        }
    }
}

/// A player wired to fakes
pub struct TestPlayer {
    pub player: RivePlayer<FakeRuntime>,
    pub runtime: FakeRuntime,
    pub fetcher: GatedFetcher,
    pub host: Arc<crate::fakes::CountingHost>,
    errors: Arc<Mutex<Vec<PlayerError>>>,
    // Dropped after the player
    _loads: tokio::runtime::Runtime,
}

impl TestPlayer {
    pub fn new() -> Result<Self> {
        Self::with_config(PlayerConfig::default())
    }

    pub fn with_config(config: PlayerConfig) -> Result<Self> {
        Self::build(config, &[], true)
    }

    /// Files are registered before the player is built, so a configured
    /// source can load them
    pub fn with_files(config: PlayerConfig, files: &[(&str, FileSpec)]) -> Result<Self> {
        Self::build(config, files, true)
    }

    /// Build without attaching a surface
    pub fn detached(config: PlayerConfig, files: &[(&str, FileSpec)]) -> Result<Self> {
        Self::build(config, files, false)
    }

    fn build(config: PlayerConfig, files: &[(&str, FileSpec)], attach: bool) -> Result<Self> {
        init_tracing();

        let loads = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("Failed to create load runtime")?;

        let runtime = FakeRuntime::new();
        let fetcher = GatedFetcher::new();
        for (uri, spec) in files {
            fetcher.serve(uri, file_bytes(&spec.name));
            runtime.register(spec.clone());
        }
        let player = RivePlayer::builder(runtime.clone(), fetcher.clone())
            .config(config)
            .handle(loads.handle().clone())
            .build()
            .context("Failed to build player")?;

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        player.on_error(move |error| sink.lock().push(error.clone()));

        let host = Arc::new(crate::fakes::CountingHost::new());
        if attach {
            player
                .attach_surface(host.clone())
                .context("Failed to attach surface")?;
        }

        Ok(Self {
            player,
            runtime,
            fetcher,
            host,
            errors,
            _loads: loads,
        })
    }

    /// Register `spec` with the runtime and serve it at `uri`
    pub fn add_file(&self, uri: &str, spec: FileSpec) {
        self.fetcher.serve(uri, file_bytes(&spec.name));
        self.runtime.register(spec);
    }

    pub fn log(&self) -> &Arc<RuntimeLog> {
        self.runtime.log()
    }

    pub fn errors(&self) -> Vec<PlayerError> {
        self.errors.lock().clone()
    }

    pub fn tick(&self) -> Result<()> {
        self.player.tick().context("tick failed")
    }

    /// Wait until `condition` holds
    pub fn wait_until(&self, what: &str, condition: impl Fn() -> bool) -> Result<()> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while !condition() {
            if Instant::now() >= deadline {
                bail!("Timed out waiting for {}", what);
            }
            thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    }

    /// Wait for the load of `token` to settle
    pub fn wait_for_load(&self, token: GenerationToken) -> Result<LoadStatus> {
        let status = self.player.load_status();
        self.wait_until(&format!("load {}", token), || {
            let current = *status.borrow();
            current.token() == Some(token) && current.is_settled()
        })?;
        let settled = *status.borrow();
        Ok(settled)
    }

    /// Wait for the current load to settle, then tick once
    pub fn settle(&self) -> Result<LoadStatus> {
        let status = self.wait_for_load(self.player.generation())?;
        self.tick()?;
        Ok(status)
    }

    /// Set the source and wait until the loaded scene is live
    pub fn load(&self, uri: &str) -> Result<LoadStatus> {
        self.player.set_source(uri);
        self.settle()
    }

    pub fn scene(&self) -> SceneSummary {
        self.player.with_scene(SceneSummary::of)
    }

    pub fn paint(&self) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::default();
        self.player.on_paint(&mut canvas, 400, 300);
        canvas
    }
}
