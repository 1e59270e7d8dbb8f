//! Player configuration
//!
//! A player can be set up in code or from a TOML/JSON document:
//!
//! ```toml
//! source = "ms-appx:///Assets/button.riv"
//! artboard = "Main"
//! state_machine = "Button"
//! target_frame_rate = 60
//!
//! [[inputs]]
//! kind = "bool"
//! target = "Hover"
//! value = false
//!
//! [[inputs]]
//! kind = "trigger"
//! target = "Press"
//! ```

use crate::clock::{DEFAULT_FPS, MAX_FPS};
use crate::error::{PlayerError, Result};
use crate::scene::StateMachineFallback;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Kind of a state machine input
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Bool,
    Number,
    Trigger,
}

/// Initial value of a configured input
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialValue {
    Bool(bool),
    Number(f64),
}

/// A state machine input declared in configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub kind: InputKind,
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<InitialValue>,
}

impl InputConfig {
    pub fn initial_bool(&self) -> Option<bool> {
        match self.value {
            Some(InitialValue::Bool(value)) => Some(value),
            _ => None,
        }
    }

    pub fn initial_number(&self) -> Option<f64> {
        match self.value {
            Some(InitialValue::Number(value)) => Some(value),
            _ => None,
        }
    }
}

/// Declarative player setup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Source URI; empty means no scene
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub artboard: String,
    #[serde(default, alias = "stateMachine")]
    pub state_machine: String,
    #[serde(default, alias = "drawInBackground")]
    pub draw_in_background: bool,
    #[serde(default = "default_frame_rate", alias = "targetFrameRate")]
    pub target_frame_rate: u32,
    #[serde(default, alias = "stateMachineFallback")]
    pub state_machine_fallback: StateMachineFallback,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
}

fn default_frame_rate() -> u32 {
    DEFAULT_FPS
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            artboard: String::new(),
            state_machine: String::new(),
            draw_in_background: false,
            target_frame_rate: DEFAULT_FPS,
            state_machine_fallback: StateMachineFallback::default(),
            inputs: Vec::new(),
        }
    }
}

impl PlayerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PlayerError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| PlayerError::Config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PlayerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") | None => Self::from_toml_str(&content),
            Some(other) => Err(PlayerError::Config(format!(
                "unsupported config format '.{}' for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_frame_rate == 0 || self.target_frame_rate > MAX_FPS {
            return Err(PlayerError::Config(format!(
                "target_frame_rate must be between 1 and {}, got {}",
                MAX_FPS, self.target_frame_rate
            )));
        }
        for input in &self.inputs {
            let mismatch = match (input.kind, input.value) {
                (InputKind::Bool, Some(InitialValue::Number(_))) => true,
                (InputKind::Number, Some(InitialValue::Bool(_))) => true,
                (InputKind::Trigger, Some(_)) => true,
                _ => false,
            };
            if mismatch {
                return Err(PlayerError::Config(format!(
                    "input '{}' has a value that does not match its kind",
                    input.target
                )));
            }
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PlayerError::Config(format!("failed to serialize: {}", e)))
    }
}
