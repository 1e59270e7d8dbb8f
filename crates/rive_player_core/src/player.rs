//! The player
//!
//! [`RivePlayer`] owns one scene and everything that feeds it: the mutation
//! queue, the source loader, the input collection and the frame clock.
//!
//! Property setters never touch the scene directly. They enqueue mutations
//! that the frame clock applies at the start of its next tick, so the scene
//! only ever changes between paints, on one thread at a time.
//!
//! While a source load is in flight, input changes are held in a deferred
//! buffer and replayed right after the loaded file is installed. Changing the
//! artboard or state machine during that window discards the buffer.

use crate::clock::{ClockMode, ClockState, FrameClock, TickTarget, MAX_FPS};
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::fetch::ByteFetcher;
use crate::inputs::{InputBinding, InputCollection, InputSink};
use crate::loader::{GenerationCounter, GenerationToken, LoadStatus, SourceLoader};
use crate::queue::{Mutation, MutationQueue};
use crate::repaint::RepaintSignal;
use crate::runtime::{AnimationRuntime, CanvasOf, FileOf};
use crate::scene::{Scene, SceneUpdate, StateMachineFallback};
use crate::surface::SurfaceHost;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;

type ErrorListener = Arc<dyn Fn(&PlayerError) + Send + Sync>;

/// Scene plus the names it was built from
///
/// This is what queued mutations operate on.
pub struct SceneState<R: AnimationRuntime> {
    scene: Scene<R>,
    artboard_name: String,
    state_machine_name: String,
    fallback: StateMachineFallback,
    generation: Arc<GenerationCounter>,
    reported: Vec<PlayerError>,
}

enum InputCommand {
    Bool(String, bool),
    Number(String, f32),
    Trigger(String),
}

impl<R: AnimationRuntime> SceneState<R> {
    fn new(generation: Arc<GenerationCounter>) -> Self {
        Self {
            scene: Scene::empty(),
            artboard_name: String::new(),
            state_machine_name: String::new(),
            fallback: StateMachineFallback::default(),
            generation,
            reported: Vec::new(),
        }
    }

    pub fn scene(&self) -> &Scene<R> {
        &self.scene
    }

    pub fn artboard_name(&self) -> &str {
        &self.artboard_name
    }

    pub fn state_machine_name(&self) -> &str {
        &self.state_machine_name
    }

    fn clear(&mut self) {
        self.scene = Scene::empty();
    }

    fn rebuild(&mut self, update: SceneUpdate) {
        if let Err(e) = self.scene.rebuild(
            update,
            &self.artboard_name,
            &self.state_machine_name,
            self.fallback,
        ) {
            self.reported.push(e);
        }
    }

    /// Install a loaded file if its generation is still current
    fn install(&mut self, token: GenerationToken, file: FileOf<R>) -> bool {
        if !self.generation.is_current(token) {
            tracing::debug!("Dropping loaded file {}, source changed before apply", token);
            return false;
        }
        self.scene.replace_file(file);
        self.rebuild(SceneUpdate::File);
        true
    }

    fn fail(&mut self, token: GenerationToken, error: PlayerError) {
        if !self.generation.is_current(token) {
            return;
        }
        self.scene = Scene::empty();
        self.reported.push(error);
    }

    fn apply_input(&mut self, command: InputCommand) {
        let (name, found) = match &command {
            InputCommand::Bool(name, value) => (name, self.scene.set_bool(name, *value)),
            InputCommand::Number(name, value) => (name, self.scene.set_number(name, *value)),
            InputCommand::Trigger(name) => (name, self.scene.fire_trigger(name)),
        };
        match found {
            Some(true) => {}
            Some(false) => tracing::warn!("State machine has no input named '{}'", name),
            None => tracing::trace!("No state machine playing, input '{}' ignored", name),
        }
    }
}

#[derive(Clone, Debug)]
struct Properties {
    source: String,
    artboard: String,
    state_machine: String,
    fallback: StateMachineFallback,
    draw_in_background: bool,
    target_frame_rate: u32,
    surface_attached: bool,
}

impl Properties {
    fn clock_mode(&self) -> ClockMode {
        if self.draw_in_background {
            ClockMode::Background
        } else {
            ClockMode::Foreground
        }
    }
}

struct PlayerShared<R: AnimationRuntime> {
    self_ref: Weak<PlayerShared<R>>,
    queue: MutationQueue<SceneState<R>>,
    scene: Mutex<SceneState<R>>,
    generation: Arc<GenerationCounter>,
    // Lock order: inputs, then deferred, then the queue
    deferred: Mutex<Option<Vec<Mutation<SceneState<R>>>>>,
    properties: RwLock<Properties>,
    loader: SourceLoader<R>,
    repaint: RepaintSignal,
    listeners: RwLock<Vec<ErrorListener>>,
    inputs: Mutex<InputCollection>,
    load_status: watch::Sender<LoadStatus>,
    superseded: AtomicU64,
}

impl<R: AnimationRuntime> PlayerShared<R> {
    fn input_owner(&self) -> Weak<dyn InputSink> {
        self.self_ref.clone()
    }

    fn set_source(&self, uri: String) {
        let mut deferred = self.deferred.lock();
        // Recorded with the token it belongs to
        self.properties.write().source = uri.clone();
        // Never show the previous file while the new one loads
        self.queue.enqueue(|state| state.clear());
        let token = self.generation.advance();

        if uri.is_empty() {
            *deferred = None;
            self.load_status.send_replace(LoadStatus::Idle);
            tracing::debug!("Source cleared ({})", token);
            return;
        }

        *deferred = Some(Vec::new());
        self.load_status.send_replace(LoadStatus::Loading(token));
        tracing::debug!("Loading source '{}' ({})", uri, token);

        let player = self.self_ref.clone();
        self.loader.request_load(uri, token, move |token, result| {
            if let Some(player) = player.upgrade() {
                player.complete_load(token, result);
            }
        });
    }

    fn complete_load(&self, token: GenerationToken, result: Result<FileOf<R>>) {
        let mut deferred = self.deferred.lock();
        if !self.generation.is_current(token) {
            self.superseded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Discarding superseded load {}", token);
            return;
        }

        let replay = deferred.take().unwrap_or_default();
        match result {
            Ok(file) => {
                tracing::debug!(
                    "Load {} complete, replaying {} deferred inputs",
                    token,
                    replay.len()
                );
                self.queue.enqueue(move |state| {
                    if state.install(token, file) {
                        for mutation in replay {
                            mutation(&mut *state);
                        }
                    }
                });
                self.load_status.send_replace(LoadStatus::Loaded(token));
            }
            Err(error) => {
                if !replay.is_empty() {
                    tracing::debug!("Discarding {} deferred inputs after failed load", replay.len());
                }
                self.queue.enqueue(move |state| state.fail(token, error));
                self.load_status.send_replace(LoadStatus::Failed(token));
            }
        }
    }

    fn set_artboard(&self, name: String) {
        let recorded = name.clone();
        self.rename(
            SceneUpdate::Artboard,
            move |properties| properties.artboard = recorded,
            move |state| state.artboard_name = name,
        );
    }

    fn set_state_machine(&self, name: String) {
        let recorded = name.clone();
        self.rename(
            SceneUpdate::Playback,
            move |properties| properties.state_machine = recorded,
            move |state| state.state_machine_name = name,
        );
    }

    fn set_fallback(&self, fallback: StateMachineFallback) {
        self.rename(
            SceneUpdate::Playback,
            move |properties| properties.fallback = fallback,
            move |state| state.fallback = fallback,
        );
    }

    /// Record a name change and rebuild, unless a load will rebuild anyway
    fn rename<P, F>(&self, update: SceneUpdate, record: P, assign: F)
    where
        P: FnOnce(&mut Properties),
        F: FnOnce(&mut SceneState<R>) + Send + 'static,
    {
        let mut deferred = self.deferred.lock();
        record(&mut *self.properties.write());
        self.queue.enqueue(assign);
        match deferred.as_mut() {
            Some(pending) => {
                if !pending.is_empty() {
                    tracing::debug!("Discarding {} deferred inputs", pending.len());
                }
                pending.clear();
            }
            None => self.queue.enqueue(move |state| state.rebuild(update)),
        }
    }

    fn submit_input(&self, command: InputCommand) {
        let mutation: Mutation<SceneState<R>> =
            Box::new(move |state: &mut SceneState<R>| state.apply_input(command));
        let mut deferred = self.deferred.lock();
        match deferred.as_mut() {
            Some(pending) => pending.push(mutation),
            None => self.queue.extend(Some(mutation)),
        }
    }

    fn report(&self, error: PlayerError) {
        tracing::warn!("{}", error);
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(&error);
        }
    }
}

impl<R: AnimationRuntime> TickTarget for PlayerShared<R> {
    fn apply_pending(&self) {
        let reported = {
            let mut state = self.scene.lock();
            self.queue.drain_and_apply(&mut state);
            std::mem::take(&mut state.reported)
        };
        // Listeners run without the scene lock so they can call back in
        for error in reported {
            self.report(error);
        }
    }

    fn advance(&self, elapsed: Duration) {
        self.scene.lock().scene.advance(elapsed.as_secs_f32());
    }

    fn request_repaint(&self) {
        self.repaint.request();
    }
}

impl<R: AnimationRuntime> InputSink for PlayerShared<R> {
    fn set_bool(&self, name: &str, value: bool) {
        self.submit_input(InputCommand::Bool(name.to_string(), value));
    }

    fn set_number(&self, name: &str, value: f32) {
        self.submit_input(InputCommand::Number(name.to_string(), value));
    }

    fn fire_trigger(&self, name: &str) {
        self.submit_input(InputCommand::Trigger(name.to_string()));
    }
}

/// An animated scene embedded in a host surface
///
/// All setters may be called from any thread.
pub struct RivePlayer<R: AnimationRuntime> {
    shared: Arc<PlayerShared<R>>,
    clock: Mutex<Option<FrameClock>>,
}

impl<R: AnimationRuntime> RivePlayer<R> {
    pub fn builder(runtime: R, fetcher: impl ByteFetcher) -> PlayerBuilder<R> {
        PlayerBuilder::new(Arc::new(runtime), Arc::new(fetcher))
    }

    /// A player with default configuration and its own loader runtime
    pub fn new(runtime: R, fetcher: impl ByteFetcher) -> Result<Self> {
        Self::builder(runtime, fetcher).build()
    }

    // =========================================================================
    // Scene properties
    // =========================================================================

    /// Load a new source; an empty URI clears the scene
    pub fn set_source(&self, uri: impl Into<String>) {
        self.shared.set_source(uri.into());
    }

    pub fn set_artboard(&self, name: impl Into<String>) {
        self.shared.set_artboard(name.into());
    }

    pub fn set_state_machine(&self, name: impl Into<String>) {
        self.shared.set_state_machine(name.into());
    }

    pub fn set_state_machine_fallback(&self, fallback: StateMachineFallback) {
        self.shared.set_fallback(fallback);
    }

    pub fn source(&self) -> String {
        self.shared.properties.read().source.clone()
    }

    pub fn artboard(&self) -> String {
        self.shared.properties.read().artboard.clone()
    }

    pub fn state_machine(&self) -> String {
        self.shared.properties.read().state_machine.clone()
    }

    pub fn state_machine_fallback(&self) -> StateMachineFallback {
        self.shared.properties.read().fallback
    }

    /// Token of the most recent source request
    pub fn generation(&self) -> GenerationToken {
        self.shared.generation.current()
    }

    /// Watch the progress of the most recent source request
    pub fn load_status(&self) -> watch::Receiver<LoadStatus> {
        self.shared.load_status.subscribe()
    }

    /// Number of loads that finished after a newer source was requested
    pub fn superseded_loads(&self) -> u64 {
        self.shared.superseded.load(Ordering::Relaxed)
    }

    /// Inspect the live scene
    ///
    /// Holds the scene lock for the duration of `f`; the frame clock waits.
    pub fn with_scene<T>(&self, f: impl FnOnce(&SceneState<R>) -> T) -> T {
        let state = self.shared.scene.lock();
        f(&state)
    }

    /// Number of mutations waiting for the next tick
    pub fn pending_mutations(&self) -> usize {
        self.shared.queue.len()
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    pub fn set_bool(&self, name: &str, value: bool) {
        self.shared.set_bool(name, value);
    }

    pub fn set_number(&self, name: &str, value: f32) {
        self.shared.set_number(name, value);
    }

    pub fn fire_trigger(&self, name: &str) {
        self.shared.fire_trigger(name);
    }

    /// Replace the input collection, returning the previous one unbound
    ///
    /// Every item of the new collection is bound to this player and applied
    /// in order.
    pub fn set_input_collection(&self, collection: InputCollection) -> InputCollection {
        let mut inputs = self.shared.inputs.lock();
        let mut old = std::mem::replace(&mut *inputs, collection);
        old.set_owner(None);
        inputs.set_owner(Some(self.shared.input_owner()));
        old
    }

    /// Edit the bound input collection in place
    pub fn update_inputs<T>(&self, f: impl FnOnce(&mut InputCollection) -> T) -> T {
        let mut inputs = self.shared.inputs.lock();
        f(&mut inputs)
    }

    /// First bound input targeting `target`
    pub fn input(&self, target: &str) -> Option<InputBinding> {
        self.shared.inputs.lock().find(target).cloned()
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Register a listener for load and resolution failures
    ///
    /// Listeners run on the frame clock's thread, after the failing
    /// mutation was applied.
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&PlayerError) + Send + Sync + 'static,
    {
        self.shared.listeners.write().push(Arc::new(listener));
    }

    // =========================================================================
    // Surface and clock
    // =========================================================================

    /// Tick from a dedicated thread instead of the host's render loop
    ///
    /// Only valid before the surface is attached.
    pub fn set_draw_in_background(&self, enabled: bool) -> Result<()> {
        let mut properties = self.shared.properties.write();
        if properties.surface_attached {
            return Err(PlayerError::invalid_configuration(
                "draw_in_background cannot change after the surface is attached",
            ));
        }
        properties.draw_in_background = enabled;
        Ok(())
    }

    pub fn draw_in_background(&self) -> bool {
        self.shared.properties.read().draw_in_background
    }

    /// Only valid before the surface is attached
    pub fn set_target_frame_rate(&self, fps: u32) -> Result<()> {
        if fps == 0 || fps > MAX_FPS {
            return Err(PlayerError::invalid_configuration(format!(
                "target frame rate must be between 1 and {}, got {}",
                MAX_FPS, fps
            )));
        }
        let mut properties = self.shared.properties.write();
        if properties.surface_attached {
            return Err(PlayerError::invalid_configuration(
                "target frame rate cannot change after the surface is attached",
            ));
        }
        properties.target_frame_rate = fps;
        Ok(())
    }

    pub fn target_frame_rate(&self) -> u32 {
        self.shared.properties.read().target_frame_rate
    }

    /// How often a foreground host should call [`tick`](Self::tick)
    pub fn frame_interval(&self) -> Duration {
        crate::clock::frame_interval(self.target_frame_rate())
    }

    /// Attach the host surface and start the frame clock
    pub fn attach_surface(&self, host: Arc<dyn SurfaceHost>) -> Result<()> {
        let mut slot = self.clock.lock();
        if slot.is_some() {
            return Err(PlayerError::invalid_configuration(
                "a surface is already attached",
            ));
        }

        let properties = self.shared.properties.read().clone();
        let mut clock = FrameClock::new(properties.clock_mode(), properties.target_frame_rate)?;
        let target: Arc<dyn TickTarget> = self.shared.clone();
        clock.start(Arc::downgrade(&target))?;

        self.shared.properties.write().surface_attached = true;
        self.shared.repaint.attach(host);
        tracing::debug!(
            "Surface attached, {:?} clock at {} fps",
            clock.mode(),
            clock.target_fps()
        );
        *slot = Some(clock);
        Ok(())
    }

    pub fn is_surface_attached(&self) -> bool {
        self.shared.properties.read().surface_attached
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock
            .lock()
            .as_ref()
            .map(FrameClock::state)
            .unwrap_or(ClockState::Stopped)
    }

    /// Run one foreground tick
    pub fn tick(&self) -> Result<()> {
        self.tick_at(Instant::now())
    }

    /// Run one foreground tick as if it happened at `now`
    pub fn tick_at(&self, now: Instant) -> Result<()> {
        let ticker = {
            let slot = self.clock.lock();
            let Some(clock) = slot.as_ref() else {
                return Err(PlayerError::invalid_configuration(
                    "tick() requires an attached surface",
                ));
            };
            if clock.mode() == ClockMode::Background {
                return Err(PlayerError::invalid_configuration(
                    "tick() is driven by the background clock when draw_in_background is set",
                ));
            }
            clock.ticker()
        };
        // Error listeners run during the tick and may call back into the player
        ticker.tick_at(&*self.shared, now);
        Ok(())
    }

    /// Ask the host for a repaint outside the clock's cadence
    pub fn request_repaint(&self) {
        self.shared.repaint.request();
    }

    /// Paint the current scene; called by the host in response to an invalidation
    pub fn on_paint(&self, canvas: &mut CanvasOf<R>, width: u32, height: u32) {
        self.shared.repaint.begin_paint();
        self.shared.scene.lock().scene.draw(canvas, width, height);
    }
}

impl<R: AnimationRuntime> Drop for RivePlayer<R> {
    fn drop(&mut self) {
        // Stop ticking before the scene goes away
        if let Some(mut clock) = self.clock.get_mut().take() {
            clock.stop();
        }
        self.shared.inputs.lock().set_owner(None);
    }
}

impl<R: AnimationRuntime> fmt::Debug for RivePlayer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let properties = self.shared.properties.read().clone();
        f.debug_struct("RivePlayer")
            .field("properties", &properties)
            .field("generation", &self.generation())
            .field("clock", &self.clock_state())
            .finish()
    }
}

/// Builder for [`RivePlayer`]
pub struct PlayerBuilder<R: AnimationRuntime> {
    runtime: Arc<R>,
    fetcher: Arc<dyn ByteFetcher>,
    config: PlayerConfig,
    handle: Option<Handle>,
}

impl<R: AnimationRuntime> PlayerBuilder<R> {
    pub fn new(runtime: Arc<R>, fetcher: Arc<dyn ByteFetcher>) -> Self {
        Self {
            runtime,
            fetcher,
            config: PlayerConfig::default(),
            handle: None,
        }
    }

    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run loads on an existing tokio runtime instead of a private one
    pub fn handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn build(self) -> Result<RivePlayer<R>> {
        let config = self.config;
        config.validate()?;

        let loader = match self.handle {
            Some(handle) => SourceLoader::with_handle(self.runtime, self.fetcher, handle),
            None => SourceLoader::new(self.runtime, self.fetcher)?,
        };

        let generation = Arc::new(GenerationCounter::new());
        let mut state = SceneState::new(Arc::clone(&generation));
        state.artboard_name = config.artboard.clone();
        state.state_machine_name = config.state_machine.clone();
        state.fallback = config.state_machine_fallback;

        let properties = Properties {
            source: String::new(),
            artboard: config.artboard.clone(),
            state_machine: config.state_machine.clone(),
            fallback: config.state_machine_fallback,
            draw_in_background: config.draw_in_background,
            target_frame_rate: config.target_frame_rate,
            surface_attached: false,
        };
        let (load_status, _) = watch::channel(LoadStatus::Idle);

        let shared = Arc::new_cyclic(|self_ref| PlayerShared {
            self_ref: self_ref.clone(),
            queue: MutationQueue::new(),
            scene: Mutex::new(state),
            generation,
            deferred: Mutex::new(None),
            properties: RwLock::new(properties),
            loader,
            repaint: RepaintSignal::new(),
            listeners: RwLock::new(Vec::new()),
            inputs: Mutex::new(InputCollection::new()),
            load_status,
            superseded: AtomicU64::new(0),
        });

        let player = RivePlayer {
            shared,
            clock: Mutex::new(None),
        };

        // Source first so configured input values wait for the file
        if !config.source.is_empty() {
            player.set_source(config.source);
        }
        // Bound even when empty, so inputs pushed later reach the player
        player.set_input_collection(InputCollection::from_config(&config.inputs));
        Ok(player)
    }
}
