//! State machine inputs: bindings, collections and deferral during loads

use anyhow::Result;
use rive_player_core::{
    BoolInput, FetchError, InitialValue, InputCollection, InputConfig, InputKind, NumberInput,
    PlayerConfig, TriggerInput,
};
use rive_player_test_suite::{ArtboardSpec, FileSpec, RuntimeCall, TestPlayer};

fn button_file(name: &str) -> FileSpec {
    FileSpec::new(name).artboard(
        ArtboardSpec::new("Main")
            .state_machine("Button", &["hover", "pressed", "level", "click"])
            .animation("idle"),
    )
}

fn loaded_player() -> Result<TestPlayer> {
    let t = TestPlayer::new()?;
    t.add_file("button.riv", button_file("button"));
    t.load("button.riv")?;
    t.log().clear();
    Ok(t)
}

#[test]
fn test_collection_applies_each_input_once_in_order() -> Result<()> {
    let t = loaded_player()?;
    let inputs: InputCollection = vec![
        BoolInput::new("hover").with_value(true),
        BoolInput::new("pressed").with_value(false),
    ]
    .into_iter()
    .collect();

    t.player.set_input_collection(inputs);
    t.tick()?;

    assert_eq!(
        t.log().inputs(),
        vec![
            RuntimeCall::SetBool("hover".into(), true),
            RuntimeCall::SetBool("pressed".into(), false),
        ]
    );
    Ok(())
}

#[test]
fn test_binding_changes_forward_to_player() -> Result<()> {
    let t = loaded_player()?;
    let level = NumberInput::new("level");
    let click = TriggerInput::new("click");
    t.player.update_inputs(|inputs| {
        inputs.push(level.clone());
        inputs.push(click.clone());
    });

    level.set_value(2.0);
    click.fire();
    level.set_value(3.5);
    t.tick()?;

    assert_eq!(
        t.log().inputs(),
        vec![
            RuntimeCall::SetNumber("level".into(), 2.0),
            RuntimeCall::FireTrigger("click".into()),
            RuntimeCall::SetNumber("level".into(), 3.5),
        ]
    );
    Ok(())
}

#[test]
fn test_retargeting_reapplies_value() -> Result<()> {
    let t = loaded_player()?;
    let input = BoolInput::default().with_value(true);
    t.player.update_inputs(|inputs| inputs.push(input.clone()));
    t.tick()?;
    assert!(t.log().inputs().is_empty());

    input.binding().set_target("hover");
    t.tick()?;
    assert_eq!(t.log().inputs(), vec![RuntimeCall::SetBool("hover".into(), true)]);
    Ok(())
}

#[test]
fn test_trigger_without_target_is_a_no_op() -> Result<()> {
    let t = loaded_player()?;
    let trigger = TriggerInput::default();
    t.player.update_inputs(|inputs| inputs.push(trigger.clone()));

    trigger.fire();
    t.tick()?;
    assert!(t.log().inputs().is_empty());
    assert!(t.errors().is_empty());
    Ok(())
}

#[test]
fn test_removed_binding_stops_forwarding() -> Result<()> {
    let t = loaded_player()?;
    let level = NumberInput::new("level");
    t.player.update_inputs(|inputs| inputs.push(level.clone()));
    assert!(level.binding().is_bound());

    t.player.update_inputs(|inputs| inputs.remove(0));
    assert!(!level.binding().is_bound());

    level.set_value(9.0);
    t.tick()?;
    assert!(t.log().inputs().is_empty());
    Ok(())
}

#[test]
fn test_replacing_collection_unbinds_old_items() -> Result<()> {
    let t = loaded_player()?;
    let hover = BoolInput::new("hover");
    t.player
        .set_input_collection(vec![hover.clone()].into_iter().collect());

    let old = t.player.set_input_collection(InputCollection::new());
    assert_eq!(old.len(), 1);
    assert!(!hover.binding().is_bound());

    hover.set_value(true);
    t.tick()?;
    assert!(t.log().inputs().is_empty());
    Ok(())
}

#[test]
fn test_inputs_during_load_are_replayed_after_install() -> Result<()> {
    let t = TestPlayer::new()?;
    t.add_file("button.riv", button_file("button"));
    t.fetcher.hold("button.riv");

    t.player.set_source("button.riv");
    t.player.set_bool("hover", true);
    t.player.set_number("level", 3.0);
    t.player.fire_trigger("click");
    t.tick()?;
    assert!(t.log().inputs().is_empty());

    t.fetcher.release("button.riv");
    t.settle()?;

    let calls = t.log().calls();
    assert_eq!(
        calls,
        vec![
            RuntimeCall::Parse("button".into()),
            RuntimeCall::Artboard("Main".into()),
            RuntimeCall::StateMachine("Button".into()),
            RuntimeCall::SetBool("hover".into(), true),
            RuntimeCall::SetNumber("level".into(), 3.0),
            RuntimeCall::FireTrigger("click".into()),
        ]
    );
    Ok(())
}

#[test]
fn test_artboard_change_discards_deferred_inputs() -> Result<()> {
    let t = TestPlayer::new()?;
    t.add_file("button.riv", button_file("button"));
    t.fetcher.hold("button.riv");

    t.player.set_source("button.riv");
    t.player.set_bool("hover", true);
    t.player.set_artboard("Main");
    t.player.set_bool("pressed", true);
    t.fetcher.release("button.riv");
    t.settle()?;

    // Only activity after the artboard change survives
    assert_eq!(
        t.log().inputs(),
        vec![RuntimeCall::SetBool("pressed".into(), true)]
    );
    Ok(())
}

#[test]
fn test_failed_load_discards_deferred_inputs() -> Result<()> {
    let t = TestPlayer::new()?;
    t.fetcher.fail("button.riv", FetchError::Io("missing".into()));
    t.fetcher.hold("button.riv");

    t.player.set_source("button.riv");
    t.player.set_bool("hover", true);
    t.fetcher.release("button.riv");
    t.settle()?;

    // A later successful load does not see the stale input
    t.add_file("other.riv", button_file("other"));
    t.load("other.riv")?;
    assert!(t.log().inputs().is_empty());
    assert_eq!(t.errors().len(), 1);
    Ok(())
}

#[test]
fn test_new_source_discards_previous_deferred_inputs() -> Result<()> {
    let t = TestPlayer::new()?;
    t.add_file("a.riv", button_file("a"));
    t.add_file("b.riv", button_file("b"));
    t.fetcher.hold("a.riv");
    t.fetcher.hold("b.riv");

    t.player.set_source("a.riv");
    t.player.set_bool("hover", true);
    t.player.set_source("b.riv");
    t.player.set_bool("pressed", true);
    t.fetcher.release("a.riv");
    t.fetcher.release("b.riv");
    t.settle()?;

    assert_eq!(t.scene().file.as_deref(), Some("b"));
    assert_eq!(
        t.log().inputs(),
        vec![RuntimeCall::SetBool("pressed".into(), true)]
    );
    Ok(())
}

#[test]
fn test_unknown_input_is_ignored() -> Result<()> {
    let t = loaded_player()?;
    t.player.set_bool("no-such-input", true);
    t.player.fire_trigger("nope");
    t.tick()?;

    assert!(t.log().inputs().is_empty());
    assert!(t.errors().is_empty());
    Ok(())
}

#[test]
fn test_inputs_ignored_by_legacy_animation() -> Result<()> {
    let t = loaded_player()?;
    t.player.set_state_machine("idle");
    t.player.set_bool("hover", true);
    t.tick()?;

    assert_eq!(t.scene().animation.as_deref(), Some("idle"));
    assert!(t.log().inputs().is_empty());
    Ok(())
}

#[test]
fn test_configured_inputs_wait_for_configured_source() -> Result<()> {
    let config = PlayerConfig {
        source: "button.riv".into(),
        inputs: vec![
            InputConfig {
                kind: InputKind::Bool,
                target: "hover".into(),
                value: Some(InitialValue::Bool(true)),
            },
            InputConfig {
                kind: InputKind::Number,
                target: "level".into(),
                value: Some(InitialValue::Number(4.0)),
            },
            InputConfig {
                kind: InputKind::Trigger,
                target: "click".into(),
                value: None,
            },
        ],
        ..Default::default()
    };
    let t = TestPlayer::with_files(config, &[("button.riv", button_file("button"))])?;
    t.settle()?;

    assert_eq!(
        t.log().inputs(),
        vec![
            RuntimeCall::SetBool("hover".into(), true),
            RuntimeCall::SetNumber("level".into(), 4.0),
        ]
    );
    assert!(t.player.input("click").is_some());
    Ok(())
}

#[test]
fn test_bindings_outlive_player() -> Result<()> {
    let t = loaded_player()?;
    let hover = BoolInput::new("hover");
    t.player.update_inputs(|inputs| inputs.push(hover.clone()));
    assert!(hover.binding().is_bound());

    drop(t);
    assert!(!hover.binding().is_bound());
    hover.set_value(true);
    Ok(())
}

#[test]
fn test_default_collection_binds_pushed_inputs() -> Result<()> {
    // No inputs configured: the player starts with an empty collection
    let t = TestPlayer::new()?;
    let hover = BoolInput::new("hover");
    t.player.update_inputs(|inputs| inputs.push(hover.clone()));
    assert!(hover.binding().is_bound());

    t.add_file("button.riv", button_file("button"));
    t.load("button.riv")?;
    t.log().clear();

    hover.set_value(true);
    t.tick()?;
    assert_eq!(t.log().inputs(), vec![RuntimeCall::SetBool("hover".into(), true)]);
    Ok(())
}

#[test]
fn test_binding_shared_with_replaced_collection_stays_bound() -> Result<()> {
    let t = loaded_player()?;
    let hover = BoolInput::new("hover");
    t.player.update_inputs(|inputs| inputs.push(hover.clone()));

    let next: InputCollection = vec![hover.clone()].into_iter().collect();
    let old = t.player.set_input_collection(next);
    assert_eq!(old.len(), 1);
    assert!(hover.binding().is_bound());

    t.tick()?;
    t.log().clear();
    hover.set_value(true);
    t.tick()?;
    assert_eq!(t.log().inputs(), vec![RuntimeCall::SetBool("hover".into(), true)]);
    Ok(())
}
