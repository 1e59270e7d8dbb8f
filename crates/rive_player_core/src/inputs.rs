//! State machine input bindings
//!
//! An [`InputBinding`] names a state machine input and carries a value for
//! it. While the binding belongs to a player (its owner), every change to
//! the target name or value is forwarded through the owner's [`InputSink`].
//! Bindings are grouped in an [`InputCollection`]; membership changes bind
//! and unbind items. A binding has at most one owner: the collection that
//! bound it most recently. Leaving any other collection keeps that owner.

use crate::config::{InputConfig, InputKind};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Receives input values on behalf of a player's state machine
pub trait InputSink: Send + Sync {
    fn set_bool(&self, name: &str, value: bool);
    fn set_number(&self, name: &str, value: f32);
    fn fire_trigger(&self, name: &str);
}

/// Current value of a binding
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputValue {
    /// `None` until a value is assigned
    Bool(Option<bool>),
    /// `None` until a value is assigned
    Number(Option<f64>),
    /// Triggers carry no value; they are fired explicitly
    Trigger,
}

impl InputValue {
    pub fn kind(&self) -> InputKind {
        match self {
            InputValue::Bool(_) => InputKind::Bool,
            InputValue::Number(_) => InputKind::Number,
            InputValue::Trigger => InputKind::Trigger,
        }
    }
}

struct BindingState {
    target: String,
    value: InputValue,
    owner: Option<Weak<dyn InputSink>>,
}

/// A named, valued input that forwards itself to its owner
///
/// Clones share state: a host can keep a clone and set values on it after
/// the original was added to a collection.
#[derive(Clone)]
pub struct InputBinding {
    state: Arc<Mutex<BindingState>>,
}

impl InputBinding {
    pub fn new(target: impl Into<String>, value: InputValue) -> Self {
        Self {
            state: Arc::new(Mutex::new(BindingState {
                target: target.into(),
                value,
                owner: None,
            })),
        }
    }

    pub fn bool(target: impl Into<String>) -> Self {
        Self::new(target, InputValue::Bool(None))
    }

    pub fn number(target: impl Into<String>) -> Self {
        Self::new(target, InputValue::Number(None))
    }

    pub fn trigger(target: impl Into<String>) -> Self {
        Self::new(target, InputValue::Trigger)
    }

    pub fn from_config(config: &InputConfig) -> Self {
        match config.kind {
            InputKind::Bool => Self::new(&config.target, InputValue::Bool(config.initial_bool())),
            InputKind::Number => {
                Self::new(&config.target, InputValue::Number(config.initial_number()))
            }
            InputKind::Trigger => Self::trigger(&config.target),
        }
    }

    pub fn target(&self) -> String {
        self.state.lock().target.clone()
    }

    pub fn value(&self) -> InputValue {
        self.state.lock().value
    }

    pub fn kind(&self) -> InputKind {
        self.value().kind()
    }

    /// Whether the binding currently has a live owner
    pub fn is_bound(&self) -> bool {
        self.state
            .lock()
            .owner
            .as_ref()
            .is_some_and(|owner| owner.strong_count() > 0)
    }

    /// Rename the target input and re-apply the current value
    pub fn set_target(&self, target: impl Into<String>) {
        self.state.lock().target = target.into();
        self.apply();
    }

    /// Assign a boolean value and apply it
    ///
    /// Ignored (with a warning) on non-boolean bindings.
    pub fn set_bool(&self, value: bool) {
        if !self.replace_value(InputKind::Bool, InputValue::Bool(Some(value))) {
            return;
        }
        self.apply();
    }

    /// Assign a number value and apply it
    ///
    /// Ignored (with a warning) on non-number bindings.
    pub fn set_number(&self, value: f64) {
        if !self.replace_value(InputKind::Number, InputValue::Number(Some(value))) {
            return;
        }
        self.apply();
    }

    /// Fire a trigger binding
    pub fn fire(&self) {
        if self.kind() != InputKind::Trigger {
            tracing::warn!("fire() called on non-trigger input '{}'", self.target());
            return;
        }
        self.forward(true);
    }

    /// Push the current value to the owner
    ///
    /// No-op without a target name, without a live owner, or before a value
    /// was assigned. Triggers are never fired by `apply`.
    pub fn apply(&self) {
        self.forward(false);
    }

    pub(crate) fn set_owner(&self, owner: Option<Weak<dyn InputSink>>) {
        self.state.lock().owner = owner;
    }

    /// Unbind, but only from `owner`
    pub(crate) fn release(&self, owner: &Weak<dyn InputSink>) {
        let mut state = self.state.lock();
        if state
            .owner
            .as_ref()
            .is_some_and(|current| Weak::ptr_eq(current, owner))
        {
            state.owner = None;
        }
    }

    /// Whether two bindings share the same state
    pub fn ptr_eq(&self, other: &InputBinding) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn replace_value(&self, kind: InputKind, value: InputValue) -> bool {
        let mut state = self.state.lock();
        if state.value.kind() != kind {
            tracing::warn!(
                "Input '{}' is a {:?} input, ignoring {:?} value",
                state.target,
                state.value.kind(),
                kind
            );
            return false;
        }
        state.value = value;
        true
    }

    fn forward(&self, fire: bool) {
        // Snapshot under the lock, call the sink after releasing it
        let (target, value, owner) = {
            let state = self.state.lock();
            if state.target.is_empty() {
                return;
            }
            let Some(owner) = state.owner.as_ref().and_then(Weak::upgrade) else {
                return;
            };
            (state.target.clone(), state.value, owner)
        };

        match value {
            InputValue::Bool(Some(v)) => owner.set_bool(&target, v),
            InputValue::Number(Some(v)) => owner.set_number(&target, v as f32),
            InputValue::Trigger if fire => owner.fire_trigger(&target),
            _ => {}
        }
    }
}

impl fmt::Debug for InputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InputBinding")
            .field("target", &state.target)
            .field("value", &state.value)
            .field("bound", &state.owner.is_some())
            .finish()
    }
}

/// Boolean input
#[derive(Clone, Debug)]
pub struct BoolInput(InputBinding);

impl BoolInput {
    pub fn new(target: impl Into<String>) -> Self {
        Self(InputBinding::bool(target))
    }

    pub fn with_value(self, value: bool) -> Self {
        self.0.set_bool(value);
        self
    }

    pub fn set_value(&self, value: bool) {
        self.0.set_bool(value);
    }

    pub fn value(&self) -> Option<bool> {
        match self.0.value() {
            InputValue::Bool(value) => value,
            _ => None,
        }
    }

    pub fn binding(&self) -> &InputBinding {
        &self.0
    }
}

impl Default for BoolInput {
    fn default() -> Self {
        Self::new("")
    }
}

/// Number input
#[derive(Clone, Debug)]
pub struct NumberInput(InputBinding);

impl NumberInput {
    pub fn new(target: impl Into<String>) -> Self {
        Self(InputBinding::number(target))
    }

    pub fn with_value(self, value: f64) -> Self {
        self.0.set_number(value);
        self
    }

    pub fn set_value(&self, value: f64) {
        self.0.set_number(value);
    }

    pub fn value(&self) -> Option<f64> {
        match self.0.value() {
            InputValue::Number(value) => value,
            _ => None,
        }
    }

    pub fn binding(&self) -> &InputBinding {
        &self.0
    }
}

impl Default for NumberInput {
    fn default() -> Self {
        Self::new("")
    }
}

/// Trigger input
#[derive(Clone, Debug)]
pub struct TriggerInput(InputBinding);

impl TriggerInput {
    pub fn new(target: impl Into<String>) -> Self {
        Self(InputBinding::trigger(target))
    }

    pub fn fire(&self) {
        self.0.fire();
    }

    pub fn binding(&self) -> &InputBinding {
        &self.0
    }
}

impl Default for TriggerInput {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<BoolInput> for InputBinding {
    fn from(input: BoolInput) -> Self {
        input.0
    }
}

impl From<NumberInput> for InputBinding {
    fn from(input: NumberInput) -> Self {
        input.0
    }
}

impl From<TriggerInput> for InputBinding {
    fn from(input: TriggerInput) -> Self {
        input.0
    }
}

/// A membership change in an [`InputCollection`]
#[derive(Clone, Debug)]
pub enum CollectionChange {
    Added(InputBinding),
    Removed(InputBinding),
    Replaced { old: InputBinding, new: InputBinding },
    Reset(Vec<InputBinding>),
}

/// Ordered bindings sharing one owner
///
/// Items entering the collection are bound to the owner and applied; items
/// leaving it are unbound first, so they can no longer reach the player.
#[derive(Default)]
pub struct InputCollection {
    items: Vec<InputBinding>,
    owner: Option<Weak<dyn InputSink>>,
}

impl InputCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(configs: &[InputConfig]) -> Self {
        configs.iter().map(InputBinding::from_config).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&InputBinding> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputBinding> {
        self.items.iter()
    }

    /// First binding targeting `target`
    pub fn find(&self, target: &str) -> Option<&InputBinding> {
        self.items.iter().find(|item| item.target() == target)
    }

    pub fn push(&mut self, item: impl Into<InputBinding>) -> CollectionChange {
        let index = self.items.len();
        self.insert(index, item)
    }

    /// Insert at `index`, clamped to the end of the collection
    pub fn insert(&mut self, index: usize, item: impl Into<InputBinding>) -> CollectionChange {
        let item = item.into();
        let index = index.min(self.items.len());
        self.items.insert(index, item.clone());
        self.bind(&item);
        CollectionChange::Added(item)
    }

    pub fn remove(&mut self, index: usize) -> Option<CollectionChange> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.unbind(&item);
        Some(CollectionChange::Removed(item))
    }

    pub fn replace(
        &mut self,
        index: usize,
        item: impl Into<InputBinding>,
    ) -> Option<CollectionChange> {
        let slot = self.items.get_mut(index)?;
        let new = item.into();
        let old = std::mem::replace(slot, new.clone());
        self.unbind(&old);
        self.bind(&new);
        Some(CollectionChange::Replaced { old, new })
    }

    pub fn clear(&mut self) -> CollectionChange {
        let old = std::mem::take(&mut self.items);
        for item in &old {
            self.unbind(item);
        }
        CollectionChange::Reset(old)
    }

    /// Bind every item to `owner` (or unbind them all with `None`)
    ///
    /// Items are applied in collection order once bound. Unbinding skips
    /// items that another collection has bound since.
    pub fn set_owner(&mut self, owner: Option<Weak<dyn InputSink>>) {
        for item in &self.items {
            self.unbind(item);
        }
        self.owner = owner;
        let Some(owner) = &self.owner else {
            return;
        };
        for item in &self.items {
            item.set_owner(Some(Weak::clone(owner)));
        }
        for item in &self.items {
            item.apply();
        }
    }

    fn bind(&self, item: &InputBinding) {
        if let Some(owner) = &self.owner {
            item.set_owner(Some(Weak::clone(owner)));
            item.apply();
        }
    }

    fn unbind(&self, item: &InputBinding) {
        if let Some(owner) = &self.owner {
            item.release(owner);
        }
    }
}

impl<I: Into<InputBinding>> FromIterator<I> for InputCollection {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
            owner: None,
        }
    }
}

impl fmt::Debug for InputCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputCollection")
            .field("items", &self.items)
            .field("bound", &self.owner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl InputSink for RecordingSink {
        fn set_bool(&self, name: &str, value: bool) {
            self.calls.lock().push(format!("bool {}={}", name, value));
        }
        fn set_number(&self, name: &str, value: f32) {
            self.calls.lock().push(format!("number {}={}", name, value));
        }
        fn fire_trigger(&self, name: &str) {
            self.calls.lock().push(format!("trigger {}", name));
        }
    }

    fn sink() -> (Arc<RecordingSink>, Weak<dyn InputSink>) {
        let sink = Arc::new(RecordingSink::default());
        let as_dyn: Arc<dyn InputSink> = sink.clone();
        let weak = Arc::downgrade(&as_dyn);
        (sink, weak)
    }

    #[test]
    fn test_set_owner_applies_in_order() {
        let (sink, owner) = sink();
        let mut inputs: InputCollection = vec![
            InputBinding::from(BoolInput::new("a").with_value(true)),
            InputBinding::from(BoolInput::new("b").with_value(false)),
        ]
        .into_iter()
        .collect();

        inputs.set_owner(Some(owner));
        assert_eq!(*sink.calls.lock(), vec!["bool a=true", "bool b=false"]);
    }

    #[test]
    fn test_unbound_and_untargeted_bindings_are_silent() {
        let (sink, owner) = sink();
        let input = BoolInput::default();
        input.set_value(true);

        let mut inputs = InputCollection::new();
        inputs.set_owner(Some(owner));
        inputs.push(input.clone());
        // Empty target: nothing forwarded
        assert!(sink.calls.lock().is_empty());

        input.binding().set_target("armed");
        assert_eq!(*sink.calls.lock(), vec!["bool armed=true"]);
    }

    #[test]
    fn test_trigger_fires_only_explicitly() {
        let (sink, owner) = sink();
        let trigger = TriggerInput::new("jump");
        let mut inputs = InputCollection::new();
        inputs.set_owner(Some(owner));
        inputs.push(trigger.clone());
        assert!(sink.calls.lock().is_empty());

        trigger.fire();
        trigger.fire();
        assert_eq!(*sink.calls.lock(), vec!["trigger jump", "trigger jump"]);
    }

    #[test]
    fn test_removed_and_replaced_items_are_unbound() {
        let (sink, owner) = sink();
        let speed = NumberInput::new("speed");
        let level = NumberInput::new("level");
        let mut inputs: InputCollection = vec![speed.clone()].into_iter().collect();
        inputs.set_owner(Some(owner));

        speed.set_value(2.0);
        assert_eq!(*sink.calls.lock(), vec!["number speed=2"]);

        let change = inputs.replace(0, level.clone()).unwrap();
        assert!(matches!(change, CollectionChange::Replaced { .. }));
        assert!(!speed.binding().is_bound());
        assert!(level.binding().is_bound());

        speed.set_value(3.0);
        level.set_value(1.5);
        assert_eq!(
            *sink.calls.lock(),
            vec!["number speed=2", "number level=1.5"]
        );

        inputs.remove(0);
        level.set_value(4.0);
        assert_eq!(sink.calls.lock().len(), 2);
    }

    #[test]
    fn test_shared_binding_stays_with_latest_collection() {
        let (first_sink, first) = sink();
        let (second_sink, second) = sink();
        let hover = BoolInput::new("hover");

        let mut a = InputCollection::new();
        a.set_owner(Some(first));
        a.push(hover.clone());
        let mut b = InputCollection::new();
        b.set_owner(Some(second));
        b.push(hover.clone());

        // Leaving the collection that no longer owns it changes nothing
        a.remove(0);
        assert!(hover.binding().is_bound());
        hover.set_value(true);
        assert!(first_sink.calls.lock().is_empty());
        assert_eq!(*second_sink.calls.lock(), vec!["bool hover=true"]);

        a.push(hover.clone());
        a.set_owner(None);
        b.clear();
        assert!(!hover.binding().is_bound());
    }

    #[test]
    fn test_clear_unbinds_everything() {
        let (_sink, owner) = sink();
        let a = BoolInput::new("a");
        let b = TriggerInput::new("b");
        let mut inputs = InputCollection::new();
        inputs.set_owner(Some(owner));
        inputs.push(a.clone());
        inputs.push(b.clone());

        match inputs.clear() {
            CollectionChange::Reset(old) => assert_eq!(old.len(), 2),
            other => panic!("unexpected change {:?}", other),
        }
        assert!(!a.binding().is_bound());
        assert!(!b.binding().is_bound());
        assert!(inputs.is_empty());
    }

    #[test]
    fn test_dropped_owner_is_not_called() {
        let (sink, owner) = sink();
        let input = BoolInput::new("a");
        let mut inputs = InputCollection::new();
        inputs.set_owner(Some(owner));
        inputs.push(input.clone());

        drop(sink);
        assert!(!input.binding().is_bound());
        // Would panic on a dangling owner; must be a silent no-op
        input.set_value(true);
    }

    #[test]
    fn test_wrong_kind_is_ignored() {
        let input = InputBinding::trigger("t");
        input.set_bool(true);
        assert_eq!(input.value(), InputValue::Trigger);

        let insert_far = {
            let mut inputs = InputCollection::new();
            inputs.insert(10, input);
            inputs.len()
        };
        assert_eq!(insert_far, 1);
    }
}
