//! Animation runtime abstraction
//!
//! The player never interprets `.riv` bytes itself. A runtime backend turns
//! bytes into a file handle, the file hands out artboard instances, and
//! artboards hand out state machines (or legacy linear animations) that
//! advance time and drive the artboard.
//!
//! Each backend is one family of concrete types tied together through
//! associated types, so a player is generic over a single
//! [`AnimationRuntime`] parameter.

use crate::error::RuntimeError;

/// Drawing target handed to [`Artboard::draw`]
pub trait Canvas {
    /// Clear to the background color
    fn clear(&mut self);
}

/// Entry point of a runtime backend
pub trait AnimationRuntime: Send + Sync + 'static {
    /// Parsed file handle
    type File: RiveFile;

    /// Parse animation file bytes
    fn parse(&self, bytes: &[u8]) -> Result<Self::File, RuntimeError>;
}

/// A parsed animation file
pub trait RiveFile: Send + 'static {
    type Artboard: Artboard;

    /// Instantiate the artboard with the given name
    fn artboard(&self, name: &str) -> Option<Self::Artboard>;

    /// Instantiate the file's default artboard
    fn default_artboard(&self) -> Option<Self::Artboard>;
}

/// An instantiated artboard
pub trait Artboard: Send + Sized + 'static {
    type StateMachine: StateMachine<Artboard = Self>;
    type Animation: LinearAnimation<Artboard = Self>;
    type Canvas: Canvas + ?Sized;

    /// Instantiate the state machine with the given name
    fn state_machine(&self, name: &str) -> Option<Self::StateMachine>;

    /// Instantiate the artboard's default state machine
    fn default_state_machine(&self) -> Option<Self::StateMachine>;

    /// Instantiate the (legacy) linear animation with the given name
    fn animation(&self, name: &str) -> Option<Self::Animation>;

    /// Instantiate the artboard's first linear animation
    fn default_animation(&self) -> Option<Self::Animation>;

    /// Draw the artboard's current pose scaled into `width` x `height` pixels
    fn draw(&mut self, canvas: &mut Self::Canvas, width: u32, height: u32);
}

/// An instantiated state machine
pub trait StateMachine: Send + 'static {
    type Artboard;

    /// Advance by `elapsed_seconds` and apply the result to `artboard`
    ///
    /// Returns `true` while the state machine still has work to do.
    fn advance(&mut self, artboard: &mut Self::Artboard, elapsed_seconds: f32) -> bool;

    /// Set a boolean input. Returns `false` if no such input exists.
    fn set_bool(&mut self, name: &str, value: bool) -> bool;

    /// Set a number input. Returns `false` if no such input exists.
    fn set_number(&mut self, name: &str, value: f32) -> bool;

    /// Fire a trigger input. Returns `false` if no such input exists.
    fn fire_trigger(&mut self, name: &str) -> bool;
}

/// A legacy linear animation, played when no state machine is available
pub trait LinearAnimation: Send + 'static {
    type Artboard;

    /// Advance by `elapsed_seconds` and apply the result to `artboard`
    fn advance(&mut self, artboard: &mut Self::Artboard, elapsed_seconds: f32) -> bool;
}

/// File handle type of runtime `R`
pub type FileOf<R> = <R as AnimationRuntime>::File;
/// Artboard type of runtime `R`
pub type ArtboardOf<R> = <FileOf<R> as RiveFile>::Artboard;
/// State machine type of runtime `R`
pub type StateMachineOf<R> = <ArtboardOf<R> as Artboard>::StateMachine;
/// Linear animation type of runtime `R`
pub type AnimationOf<R> = <ArtboardOf<R> as Artboard>::Animation;
/// Canvas type of runtime `R`
pub type CanvasOf<R> = <ArtboardOf<R> as Artboard>::Canvas;
