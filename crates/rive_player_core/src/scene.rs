//! The live scene
//!
//! A [`Scene`] bundles the loaded file with the artboard and playback
//! instantiated from it. Instances are only ever replaced as a unit while a
//! mutation is applied, so the artboard and playback always match the file
//! and the names recorded at that moment.

use crate::error::{PlayerError, SceneComponent};
use crate::runtime::{
    AnimationOf, AnimationRuntime, Artboard, ArtboardOf, Canvas, CanvasOf, FileOf, LinearAnimation,
    RiveFile, StateMachine, StateMachineOf,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a rebuild reaches
///
/// Ordered so that a larger update implies the smaller ones: a new file
/// re-instantiates the artboard, and a new artboard re-instantiates the
/// playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SceneUpdate {
    /// Re-resolve the state machine (or legacy animation) only
    Playback,
    /// Re-resolve the artboard, then the playback
    Artboard,
    /// A new file was loaded; re-resolve everything
    File,
}

/// Fallbacks tried when the requested state machine does not exist
///
/// With an explicit name the chain is: named state machine, then the
/// same-named legacy animation, then the default state machine. Each fallback
/// step can be switched off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateMachineFallback {
    /// Try a linear animation of the same name (or the first animation when
    /// no name was given)
    pub legacy_animation: bool,
    /// Fall back to the artboard's default state machine when an explicit
    /// name resolves to nothing
    pub default_state_machine: bool,
}

impl Default for StateMachineFallback {
    fn default() -> Self {
        Self {
            legacy_animation: true,
            default_state_machine: true,
        }
    }
}

impl StateMachineFallback {
    /// Only ever play exactly what was asked for
    pub fn strict() -> Self {
        Self {
            legacy_animation: false,
            default_state_machine: false,
        }
    }
}

/// What drives the artboard over time
pub enum Playback<R: AnimationRuntime> {
    StateMachine(StateMachineOf<R>),
    /// Legacy linear animation (accepts no inputs)
    Animation(AnimationOf<R>),
}

impl<R: AnimationRuntime> Playback<R> {
    pub fn is_state_machine(&self) -> bool {
        matches!(self, Playback::StateMachine(_))
    }

    pub fn state_machine(&self) -> Option<&StateMachineOf<R>> {
        match self {
            Playback::StateMachine(sm) => Some(sm),
            Playback::Animation(_) => None,
        }
    }

    pub fn animation(&self) -> Option<&AnimationOf<R>> {
        match self {
            Playback::StateMachine(_) => None,
            Playback::Animation(animation) => Some(animation),
        }
    }
}

impl<R: AnimationRuntime> fmt::Debug for Playback<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Playback::StateMachine(_) => f.write_str("Playback::StateMachine"),
            Playback::Animation(_) => f.write_str("Playback::Animation"),
        }
    }
}

/// The live bundle of file, artboard and playback
pub struct Scene<R: AnimationRuntime> {
    file: Option<FileOf<R>>,
    artboard: Option<ArtboardOf<R>>,
    playback: Option<Playback<R>>,
}

impl<R: AnimationRuntime> Scene<R> {
    /// A scene with nothing loaded
    pub fn empty() -> Self {
        Self {
            file: None,
            artboard: None,
            playback: None,
        }
    }

    pub fn file(&self) -> Option<&FileOf<R>> {
        self.file.as_ref()
    }

    pub fn artboard(&self) -> Option<&ArtboardOf<R>> {
        self.artboard.as_ref()
    }

    pub fn playback(&self) -> Option<&Playback<R>> {
        self.playback.as_ref()
    }

    /// Whether a file has been loaded into this scene
    pub fn is_loaded(&self) -> bool {
        self.file.is_some()
    }

    /// Whether the scene has both an artboard and something to play it
    pub fn is_complete(&self) -> bool {
        self.artboard.is_some() && self.playback.is_some()
    }

    /// Install a freshly loaded file, dropping every instance of the old one
    pub fn replace_file(&mut self, file: FileOf<R>) {
        self.playback = None;
        self.artboard = None;
        self.file = Some(file);
    }

    /// Re-instantiate the parts of the scene covered by `update`
    ///
    /// Rebuilding is deterministic: the same file, names and fallback always
    /// produce the same scene. Whatever fails to resolve is left empty (never
    /// a stale instance of a previous name) and reported as the error.
    pub fn rebuild(
        &mut self,
        update: SceneUpdate,
        artboard_name: &str,
        state_machine_name: &str,
        fallback: StateMachineFallback,
    ) -> Result<(), PlayerError> {
        if update >= SceneUpdate::Artboard {
            self.playback = None;
            self.artboard = None;
            let Some(file) = self.file.as_ref() else {
                return Ok(());
            };
            self.artboard = Some(resolve_artboard::<R>(file, artboard_name)?);
        }

        self.playback = None;
        let Some(artboard) = self.artboard.as_ref() else {
            return Ok(());
        };
        self.playback = Some(resolve_playback::<R>(
            artboard,
            state_machine_name,
            fallback,
        )?);
        Ok(())
    }

    /// Advance the playback and apply it to the artboard
    ///
    /// Returns `false` if there is nothing to advance.
    pub fn advance(&mut self, elapsed_seconds: f32) -> bool {
        match (self.artboard.as_mut(), self.playback.as_mut()) {
            (Some(artboard), Some(Playback::StateMachine(sm))) => {
                sm.advance(artboard, elapsed_seconds)
            }
            (Some(artboard), Some(Playback::Animation(animation))) => {
                animation.advance(artboard, elapsed_seconds)
            }
            _ => false,
        }
    }

    /// Paint the scene, or just the background when it is incomplete
    pub fn draw(&mut self, canvas: &mut CanvasOf<R>, width: u32, height: u32) {
        canvas.clear();
        if self.playback.is_none() {
            return;
        }
        if let Some(artboard) = self.artboard.as_mut() {
            artboard.draw(canvas, width, height);
        }
    }

    /// `None` when no state machine is playing, otherwise whether the input exists
    pub fn set_bool(&mut self, name: &str, value: bool) -> Option<bool> {
        self.state_machine_mut().map(|sm| sm.set_bool(name, value))
    }

    /// `None` when no state machine is playing, otherwise whether the input exists
    pub fn set_number(&mut self, name: &str, value: f32) -> Option<bool> {
        self.state_machine_mut().map(|sm| sm.set_number(name, value))
    }

    /// `None` when no state machine is playing, otherwise whether the input exists
    pub fn fire_trigger(&mut self, name: &str) -> Option<bool> {
        self.state_machine_mut().map(|sm| sm.fire_trigger(name))
    }

    fn state_machine_mut(&mut self) -> Option<&mut StateMachineOf<R>> {
        match self.playback.as_mut() {
            Some(Playback::StateMachine(sm)) => Some(sm),
            _ => None,
        }
    }
}

impl<R: AnimationRuntime> Default for Scene<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: AnimationRuntime> fmt::Debug for Scene<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("loaded", &self.file.is_some())
            .field("artboard", &self.artboard.is_some())
            .field("playback", &self.playback)
            .finish()
    }
}

fn resolve_artboard<R: AnimationRuntime>(
    file: &FileOf<R>,
    name: &str,
) -> Result<ArtboardOf<R>, PlayerError> {
    if !name.is_empty() {
        if let Some(artboard) = file.artboard(name) {
            return Ok(artboard);
        }
        tracing::warn!("Artboard '{}' not found, using the default artboard", name);
    }
    file.default_artboard().ok_or_else(|| PlayerError::Resolution {
        component: SceneComponent::Artboard,
        name: name.to_string(),
    })
}

fn resolve_playback<R: AnimationRuntime>(
    artboard: &ArtboardOf<R>,
    name: &str,
    fallback: StateMachineFallback,
) -> Result<Playback<R>, PlayerError> {
    let unresolved = || PlayerError::Resolution {
        component: SceneComponent::StateMachine,
        name: name.to_string(),
    };

    if name.is_empty() {
        if let Some(sm) = artboard.default_state_machine() {
            return Ok(Playback::StateMachine(sm));
        }
        if fallback.legacy_animation {
            if let Some(animation) = artboard.default_animation() {
                return Ok(Playback::Animation(animation));
            }
        }
        return Err(unresolved());
    }

    if let Some(sm) = artboard.state_machine(name) {
        return Ok(Playback::StateMachine(sm));
    }
    if fallback.legacy_animation {
        if let Some(animation) = artboard.animation(name) {
            tracing::debug!("Playing legacy animation '{}'", name);
            return Ok(Playback::Animation(animation));
        }
    }
    if fallback.default_state_machine {
        if let Some(sm) = artboard.default_state_machine() {
            tracing::warn!(
                "State machine '{}' not found, using the default state machine",
                name
            );
            return Ok(Playback::StateMachine(sm));
        }
    }
    Err(unresolved())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::runtime::Canvas;

    // Minimal runtime: a file is a list of artboards, an artboard lists its
    // state machines and animations by name. First entry is the default.

    struct TestRuntime;

    #[derive(Clone)]
    struct TestFile(Vec<TestArtboard>);

    #[derive(Clone)]
    struct TestArtboard {
        name: &'static str,
        machines: Vec<&'static str>,
        animations: Vec<&'static str>,
        drawn: u32,
    }

    struct TestMachine(&'static str);
    struct TestAnimation(&'static str);

    #[derive(Default)]
    struct TestCanvas {
        clears: u32,
    }

    impl Canvas for TestCanvas {
        fn clear(&mut self) {
            self.clears += 1;
        }
    }

    impl AnimationRuntime for TestRuntime {
        type File = TestFile;
        fn parse(&self, _bytes: &[u8]) -> Result<TestFile, RuntimeError> {
            Err(RuntimeError::new("unused"))
        }
    }

    impl RiveFile for TestFile {
        type Artboard = TestArtboard;
        fn artboard(&self, name: &str) -> Option<TestArtboard> {
            self.0.iter().find(|a| a.name == name).cloned()
        }
        fn default_artboard(&self) -> Option<TestArtboard> {
            self.0.first().cloned()
        }
    }

    impl Artboard for TestArtboard {
        type StateMachine = TestMachine;
        type Animation = TestAnimation;
        type Canvas = TestCanvas;

        fn state_machine(&self, name: &str) -> Option<TestMachine> {
            self.machines.iter().copied().find(|m| *m == name).map(TestMachine)
        }
        fn default_state_machine(&self) -> Option<TestMachine> {
            self.machines.first().copied().map(TestMachine)
        }
        fn animation(&self, name: &str) -> Option<TestAnimation> {
            self.animations.iter().copied().find(|a| *a == name).map(TestAnimation)
        }
        fn default_animation(&self) -> Option<TestAnimation> {
            self.animations.first().copied().map(TestAnimation)
        }
        fn draw(&mut self, _canvas: &mut TestCanvas, _width: u32, _height: u32) {
            self.drawn += 1;
        }
    }

    impl StateMachine for TestMachine {
        type Artboard = TestArtboard;
        fn advance(&mut self, _artboard: &mut TestArtboard, _elapsed: f32) -> bool {
            true
        }
        fn set_bool(&mut self, name: &str, _value: bool) -> bool {
            name == "on"
        }
        fn set_number(&mut self, _name: &str, _value: f32) -> bool {
            false
        }
        fn fire_trigger(&mut self, _name: &str) -> bool {
            false
        }
    }

    impl LinearAnimation for TestAnimation {
        type Artboard = TestArtboard;
        fn advance(&mut self, _artboard: &mut TestArtboard, _elapsed: f32) -> bool {
            true
        }
    }

    fn artboard(
        name: &'static str,
        machines: &[&'static str],
        animations: &[&'static str],
    ) -> TestArtboard {
        TestArtboard {
            name,
            machines: machines.to_vec(),
            animations: animations.to_vec(),
            drawn: 0,
        }
    }

    fn loaded(file: TestFile) -> Scene<TestRuntime> {
        let mut scene = Scene::empty();
        scene.replace_file(file);
        scene
    }

    fn summary(scene: &Scene<TestRuntime>) -> (Option<&'static str>, Option<&'static str>) {
        let artboard = scene.artboard().map(|a| a.name);
        let playback = scene.playback().map(|p| match p {
            Playback::StateMachine(sm) => sm.0,
            Playback::Animation(a) => a.0,
        });
        (artboard, playback)
    }

    #[test]
    fn test_defaults_when_names_empty() {
        let mut scene = loaded(TestFile(vec![
            artboard("Main", &["SM", "Other"], &[]),
            artboard("Second", &["SM2"], &[]),
        ]));
        scene
            .rebuild(SceneUpdate::File, "", "", StateMachineFallback::default())
            .unwrap();
        assert_eq!(summary(&scene), (Some("Main"), Some("SM")));
        assert!(scene.is_complete());
    }

    #[test]
    fn test_named_artboard_and_state_machine() {
        let mut scene = loaded(TestFile(vec![
            artboard("Main", &["SM"], &[]),
            artboard("Second", &["Idle", "Hover"], &[]),
        ]));
        scene
            .rebuild(SceneUpdate::File, "Second", "Hover", StateMachineFallback::default())
            .unwrap();
        assert_eq!(summary(&scene), (Some("Second"), Some("Hover")));
    }

    #[test]
    fn test_unknown_artboard_falls_back_to_default() {
        let mut scene = loaded(TestFile(vec![artboard("Main", &["SM"], &[])]));
        scene
            .rebuild(SceneUpdate::Artboard, "Missing", "", StateMachineFallback::default())
            .unwrap();
        assert_eq!(summary(&scene), (Some("Main"), Some("SM")));
    }

    #[test]
    fn test_state_machine_fallback_chain() {
        let file = TestFile(vec![artboard("Main", &["SM"], &["walk", "run"])]);

        // Named state machine missing, same-named animation exists
        let mut scene = loaded(file.clone());
        scene
            .rebuild(SceneUpdate::File, "", "run", StateMachineFallback::default())
            .unwrap();
        assert_eq!(summary(&scene), (Some("Main"), Some("run")));
        assert!(!scene.playback().unwrap().is_state_machine());

        // Neither exists: default state machine
        scene
            .rebuild(SceneUpdate::Playback, "", "jump", StateMachineFallback::default())
            .unwrap();
        assert_eq!(summary(&scene), (Some("Main"), Some("SM")));

        // Legacy fallback disabled
        let fallback = StateMachineFallback {
            legacy_animation: false,
            default_state_machine: true,
        };
        scene
            .rebuild(SceneUpdate::Playback, "", "run", fallback)
            .unwrap();
        assert_eq!(summary(&scene), (Some("Main"), Some("SM")));
    }

    #[test]
    fn test_empty_name_plays_first_animation_without_state_machines() {
        let mut scene = loaded(TestFile(vec![artboard("Main", &[], &["walk", "run"])]));
        scene
            .rebuild(SceneUpdate::File, "", "", StateMachineFallback::default())
            .unwrap();
        assert_eq!(summary(&scene), (Some("Main"), Some("walk")));
    }

    #[test]
    fn test_total_resolution_failure_leaves_component_empty() {
        let mut scene = loaded(TestFile(vec![artboard("Main", &["SM"], &[])]));
        scene
            .rebuild(SceneUpdate::File, "", "", StateMachineFallback::default())
            .unwrap();
        assert!(scene.is_complete());

        let err = scene
            .rebuild(SceneUpdate::Playback, "", "jump", StateMachineFallback::strict())
            .unwrap_err();
        assert_eq!(
            err,
            PlayerError::Resolution {
                component: SceneComponent::StateMachine,
                name: "jump".into()
            }
        );
        // No stale state machine survives the failed rebuild
        assert_eq!(summary(&scene), (Some("Main"), None));
        assert!(!scene.is_complete());

        let mut canvas = TestCanvas::default();
        scene.draw(&mut canvas, 100, 100);
        assert_eq!(canvas.clears, 1);
        assert_eq!(scene.artboard().unwrap().drawn, 0);
    }

    #[test]
    fn test_file_without_artboards_reports_artboard() {
        let mut scene = loaded(TestFile(vec![]));
        let err = scene
            .rebuild(SceneUpdate::File, "Main", "", StateMachineFallback::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PlayerError::Resolution {
                component: SceneComponent::Artboard,
                ..
            }
        ));
        assert_eq!(summary(&scene), (None, None));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let file = TestFile(vec![
            artboard("Main", &["SM"], &[]),
            artboard("Second", &["Idle"], &[]),
        ]);
        let mut once = loaded(file.clone());
        once.rebuild(SceneUpdate::File, "", "", StateMachineFallback::default())
            .unwrap();
        once.rebuild(SceneUpdate::Artboard, "Second", "", StateMachineFallback::default())
            .unwrap();

        let mut twice = loaded(file);
        twice
            .rebuild(SceneUpdate::File, "", "", StateMachineFallback::default())
            .unwrap();
        for _ in 0..2 {
            twice
                .rebuild(SceneUpdate::Artboard, "Second", "", StateMachineFallback::default())
                .unwrap();
        }
        assert_eq!(summary(&once), summary(&twice));
    }

    #[test]
    fn test_empty_scene_is_inert() {
        let mut scene = Scene::<TestRuntime>::empty();
        assert!(scene
            .rebuild(SceneUpdate::Artboard, "Main", "SM", StateMachineFallback::default())
            .is_ok());
        assert!(!scene.advance(0.016));
        assert_eq!(scene.set_bool("on", true), None);

        let mut canvas = TestCanvas::default();
        scene.draw(&mut canvas, 10, 10);
        assert_eq!(canvas.clears, 1);
    }

    #[test]
    fn test_inputs_reach_state_machine_only() {
        let mut scene = loaded(TestFile(vec![artboard("Main", &["SM"], &["walk"])]));
        scene
            .rebuild(SceneUpdate::File, "", "", StateMachineFallback::default())
            .unwrap();
        assert_eq!(scene.set_bool("on", true), Some(true));
        assert_eq!(scene.set_bool("off", true), Some(false));

        scene
            .rebuild(SceneUpdate::Playback, "", "walk", StateMachineFallback::default())
            .unwrap();
        assert_eq!(scene.set_bool("on", true), None);
        assert!(scene.advance(0.5));
    }
}
