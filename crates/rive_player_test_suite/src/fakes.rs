//! Scripted collaborators
//!
//! A [`FakeRuntime`] "parses" bytes of the form `RIVE:<name>` by looking up
//! a [`FileSpec`] registered under that name. Everything the player asks of
//! the runtime is recorded in a shared [`RuntimeLog`].

use parking_lot::Mutex;
use rive_player_core::{
    AnimationRuntime, Artboard, ByteFetcher, Canvas, FetchError, FetchFuture, LinearAnimation,
    RiveFile, RuntimeError, StateMachine, SurfaceHost,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bytes the fake runtime parses into the file registered as `name`
pub fn file_bytes(name: &str) -> Vec<u8> {
    format!("RIVE:{}", name).into_bytes()
}

// ============================================================================
// File specs
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct FileSpec {
    pub name: String,
    pub artboards: Vec<ArtboardSpec>,
}

impl FileSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            artboards: Vec::new(),
        }
    }

    /// Add an artboard; the first one added is the default
    pub fn artboard(mut self, artboard: ArtboardSpec) -> Self {
        self.artboards.push(artboard);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ArtboardSpec {
    pub name: String,
    pub state_machines: Vec<MachineSpec>,
    pub animations: Vec<String>,
}

impl ArtboardSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a state machine with the given input names; the first is the default
    pub fn state_machine(mut self, name: &str, inputs: &[&str]) -> Self {
        self.state_machines.push(MachineSpec {
            name: name.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn animation(mut self, name: &str) -> Self {
        self.animations.push(name.to_string());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct MachineSpec {
    pub name: String,
    pub inputs: Vec<String>,
}

// ============================================================================
// Runtime log
// ============================================================================

/// Something the player asked the runtime to do
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeCall {
    Parse(String),
    Artboard(String),
    StateMachine(String),
    Animation(String),
    SetBool(String, bool),
    SetNumber(String, f32),
    FireTrigger(String),
    Draw(String),
}

impl RuntimeCall {
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            RuntimeCall::SetBool(..) | RuntimeCall::SetNumber(..) | RuntimeCall::FireTrigger(_)
        )
    }
}

#[derive(Debug, Default)]
pub struct RuntimeLog {
    calls: Mutex<Vec<RuntimeCall>>,
    advanced: Mutex<f64>,
    advances: AtomicUsize,
}

impl RuntimeLog {
    fn record(&self, call: RuntimeCall) {
        self.calls.lock().push(call);
    }

    fn advance(&self, seconds: f32) {
        *self.advanced.lock() += f64::from(seconds);
        self.advances.fetch_add(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().clone()
    }

    /// Input calls that reached a state machine, in order
    pub fn inputs(&self) -> Vec<RuntimeCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.is_input())
            .cloned()
            .collect()
    }

    pub fn parsed(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::Parse(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Total time the scene was advanced by
    pub fn advanced_seconds(&self) -> f64 {
        *self.advanced.lock()
    }

    pub fn advance_count(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

// ============================================================================
// Fake runtime
// ============================================================================

/// Runtime backend that serves registered [`FileSpec`]s
#[derive(Clone, Default)]
pub struct FakeRuntime {
    files: Arc<Mutex<HashMap<String, FileSpec>>>,
    log: Arc<RuntimeLog>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, spec: FileSpec) {
        self.files.lock().insert(spec.name.clone(), spec);
    }

    pub fn log(&self) -> &Arc<RuntimeLog> {
        &self.log
    }
}

impl AnimationRuntime for FakeRuntime {
    type File = FakeFile;

    fn parse(&self, bytes: &[u8]) -> Result<FakeFile, RuntimeError> {
        let name = std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.strip_prefix("RIVE:"))
            .ok_or_else(|| RuntimeError::new("not a RIVE file"))?;
        let spec = self
            .files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::new(format!("unknown file '{}'", name)))?;
        self.log.record(RuntimeCall::Parse(name.to_string()));
        Ok(FakeFile {
            spec,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct FakeFile {
    spec: FileSpec,
    log: Arc<RuntimeLog>,
}

impl FakeFile {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    fn instantiate(&self, spec: &ArtboardSpec) -> FakeArtboard {
        self.log.record(RuntimeCall::Artboard(spec.name.clone()));
        FakeArtboard {
            spec: spec.clone(),
            log: Arc::clone(&self.log),
        }
    }
}

impl RiveFile for FakeFile {
    type Artboard = FakeArtboard;

    fn artboard(&self, name: &str) -> Option<FakeArtboard> {
        self.spec
            .artboards
            .iter()
            .find(|artboard| artboard.name == name)
            .map(|artboard| self.instantiate(artboard))
    }

    fn default_artboard(&self) -> Option<FakeArtboard> {
        self.spec.artboards.first().map(|artboard| self.instantiate(artboard))
    }
}

pub struct FakeArtboard {
    spec: ArtboardSpec,
    log: Arc<RuntimeLog>,
}

impl FakeArtboard {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    fn machine(&self, spec: &MachineSpec) -> FakeStateMachine {
        self.log.record(RuntimeCall::StateMachine(spec.name.clone()));
        FakeStateMachine {
            spec: spec.clone(),
            log: Arc::clone(&self.log),
        }
    }

    fn linear(&self, name: &str) -> FakeAnimation {
        self.log.record(RuntimeCall::Animation(name.to_string()));
        FakeAnimation {
            name: name.to_string(),
            log: Arc::clone(&self.log),
        }
    }
}

impl Artboard for FakeArtboard {
    type StateMachine = FakeStateMachine;
    type Animation = FakeAnimation;
    type Canvas = RecordingCanvas;

    fn state_machine(&self, name: &str) -> Option<FakeStateMachine> {
        self.spec
            .state_machines
            .iter()
            .find(|machine| machine.name == name)
            .map(|machine| self.machine(machine))
    }

    fn default_state_machine(&self) -> Option<FakeStateMachine> {
        self.spec.state_machines.first().map(|machine| self.machine(machine))
    }

    fn animation(&self, name: &str) -> Option<FakeAnimation> {
        self.spec
            .animations
            .iter()
            .find(|animation| *animation == name)
            .map(|animation| self.linear(animation))
    }

    fn default_animation(&self) -> Option<FakeAnimation> {
        self.spec.animations.first().map(|animation| self.linear(animation))
    }

    fn draw(&mut self, canvas: &mut RecordingCanvas, width: u32, height: u32) {
        self.log.record(RuntimeCall::Draw(self.spec.name.clone()));
        canvas.draws.push((self.spec.name.clone(), width, height));
    }
}

pub struct FakeStateMachine {
    spec: MachineSpec,
    log: Arc<RuntimeLog>,
}

impl FakeStateMachine {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    fn has_input(&self, name: &str) -> bool {
        self.spec.inputs.iter().any(|input| input == name)
    }
}

impl StateMachine for FakeStateMachine {
    type Artboard = FakeArtboard;

    fn advance(&mut self, _artboard: &mut FakeArtboard, elapsed_seconds: f32) -> bool {
        self.log.advance(elapsed_seconds);
        true
    }

    fn set_bool(&mut self, name: &str, value: bool) -> bool {
        if !self.has_input(name) {
            return false;
        }
        self.log.record(RuntimeCall::SetBool(name.to_string(), value));
        true
    }

    fn set_number(&mut self, name: &str, value: f32) -> bool {
        if !self.has_input(name) {
            return false;
        }
        self.log.record(RuntimeCall::SetNumber(name.to_string(), value));
        true
    }

    fn fire_trigger(&mut self, name: &str) -> bool {
        if !self.has_input(name) {
            return false;
        }
        self.log.record(RuntimeCall::FireTrigger(name.to_string()));
        true
    }
}

pub struct FakeAnimation {
    name: String,
    log: Arc<RuntimeLog>,
}

impl FakeAnimation {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LinearAnimation for FakeAnimation {
    type Artboard = FakeArtboard;

    fn advance(&mut self, _artboard: &mut FakeArtboard, elapsed_seconds: f32) -> bool {
        self.log.advance(elapsed_seconds);
        true
    }
}

/// Canvas that records what was painted
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub clears: usize,
    /// Artboard name and size of every draw
    pub draws: Vec<(String, u32, u32)>,
}

impl Canvas for RecordingCanvas {
    fn clear(&mut self) {
        self.clears += 1;
    }
}

// ============================================================================
// Fetcher
// ============================================================================

#[derive(Default)]
struct FetcherState {
    sources: Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    requests: Mutex<Vec<String>>,
}

/// Fetcher whose responses complete only when the test allows it
///
/// Fetches of a held URI wait until [`release`](Self::release) lets one
/// through; other URIs respond immediately.
#[derive(Clone, Default)]
pub struct GatedFetcher {
    state: Arc<FetcherState>,
}

impl GatedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, uri: &str, bytes: Vec<u8>) {
        self.state.sources.lock().insert(uri.to_string(), Ok(bytes));
    }

    pub fn fail(&self, uri: &str, error: FetchError) {
        self.state.sources.lock().insert(uri.to_string(), Err(error));
    }

    /// Hold fetches of `uri` until released
    pub fn hold(&self, uri: &str) {
        self.state
            .gates
            .lock()
            .insert(uri.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held fetch of `uri` complete
    pub fn release(&self, uri: &str) {
        if let Some(gate) = self.state.gates.lock().get(uri) {
            gate.add_permits(1);
        }
    }

    /// Every URI requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().clone()
    }
}

impl ByteFetcher for GatedFetcher {
    fn fetch(&self, uri: &str) -> FetchFuture {
        self.state.requests.lock().push(uri.to_string());
        let gate = self.state.gates.lock().get(uri).cloned();
        let state = Arc::clone(&self.state);
        let uri = uri.to_string();

        Box::pin(async move {
            if let Some(gate) = gate {
                gate.acquire()
                    .await
                    .map_err(|e| FetchError::Network(e.to_string()))?
                    .forget();
            }
            let response = state.sources.lock().get(&uri).cloned();
            response.unwrap_or_else(|| Err(FetchError::Io(format!("{} not found", uri))))
        })
    }
}

// ============================================================================
// Surface host
// ============================================================================

/// Host that counts invalidations
#[derive(Debug, Default)]
pub struct CountingHost {
    invalidations: AtomicUsize,
}

impl CountingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl SurfaceHost for CountingHost {
    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
