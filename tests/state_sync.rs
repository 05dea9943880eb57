extern crate prism;

use prism::device::headless::{Call, HeadlessDevice};
use prism::prelude::*;
use prism::state::snapshot::{AlphaBlendState, ShadowState};
use prism::state::{BlendFactor, FogMode};

fn engine() -> StateEngine<HeadlessDevice> {
    let _ = env_logger::try_init();
    StateEngine::new(HeadlessDevice::new(), EngineOptions::default())
}

fn translucent() -> ShadowState {
    ShadowState {
        blend: AlphaBlendState {
            enabled: true,
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::InvSrcAlpha,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn bind_commit_delete_roundtrip() {
    let mut engine = engine();

    let desc = TextureDesc {
        width: 16,
        height: 16,
        debug_name: "albedo".to_string(),
        ..Default::default()
    };
    let handle = engine.create_texture(desc, 1, "world").unwrap();
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::CreateTexture(1)]
    );

    let flags = BindFlags {
        srgb_read: true,
        ..Default::default()
    };
    engine.bind_texture(0, flags, Some(handle));

    // Nothing reaches the device until the commit drain.
    assert!(engine.device_mut().take_calls().is_empty());

    engine.commit_all(TimingClass::PerDraw, false);
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::BindTexture(0, Some((1, flags)))]
    );

    // Committing again with no mutation issues nothing.
    engine.commit_all(TimingClass::PerDraw, false);
    engine.commit_all(TimingClass::PerPass, false);
    assert!(engine.device_mut().take_calls().is_empty());

    // Deleting unbinds everywhere before the resource dies.
    engine.delete_texture(handle);
    assert_eq!(engine.binding(0), None);
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::BindTexture(0, None), Call::DestroyTexture(1)]
    );

    engine.commit_all(TimingClass::PerDraw, false);
    assert!(engine.device_mut().take_calls().is_empty());
}

#[test]
fn redundant_mutation_is_free() {
    let mut engine = engine();

    engine.set_cull_mode(CullMode::Clockwise);
    engine.set_cull_mode(CullMode::Clockwise);
    engine.commit_all(TimingClass::PerDraw, false);
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::SetCullMode(CullMode::Clockwise)]
    );

    // Setting a field back and forth within one drain window still issues
    // at most one call, carrying the final desired value.
    engine.set_cull_mode(CullMode::Nothing);
    engine.set_cull_mode(CullMode::CounterClockwise);
    engine.commit_all(TimingClass::PerDraw, false);
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::SetCullMode(CullMode::CounterClockwise)]
    );
}

#[test]
fn snapshots_dedup_and_noop() {
    let mut engine = engine();

    let a = engine.take_snapshot(ShadowState::default());
    let b = engine.take_snapshot(translucent());
    let c = engine.take_snapshot(ShadowState::default());
    assert_eq!(a, c);
    assert_ne!(a, b);
    assert_eq!(a, engine.default_snapshot());

    engine.use_snapshot(a, false);
    assert_eq!(engine.device_mut().take_calls().len(), 4);
    assert_eq!(engine.current_snapshot(), Some(a));

    engine.use_snapshot(a, false);
    assert!(engine.device_mut().take_calls().is_empty());
}

#[test]
fn deferred_snapshot_applies_at_commit() {
    let mut engine = engine();
    let id = engine.take_snapshot(translucent());

    engine.use_snapshot(id, true);
    assert!(engine.device_mut().take_calls().is_empty());
    assert_eq!(engine.current_snapshot(), None);

    engine.commit_all(TimingClass::PerDraw, false);
    assert_eq!(engine.device_mut().take_calls().len(), 4);
    assert_eq!(engine.current_snapshot(), Some(id));
}

#[test]
fn per_draw_drains_independently_of_per_pass() {
    let mut engine = engine();

    engine.set_fog(FogParams {
        mode: FogMode::Linear {
            start: 10.0,
            end: 100.0,
        },
        color: [0.5, 0.5, 0.5, 1.0],
    });
    engine.set_clip_plane(0, Some(prism::math::Vector4::new(0.0, 1.0, 0.0, 0.0)));

    engine.commit_all(TimingClass::PerDraw, false);
    let calls = engine.device_mut().take_calls();
    assert_eq!(calls.len(), 1);
    assert!(match calls[0] {
        Call::SetFog(_) => true,
        _ => false,
    });

    engine.commit_all(TimingClass::PerPass, false);
    let calls = engine.device_mut().take_calls();
    assert_eq!(calls.len(), 1);
    assert!(match calls[0] {
        Call::SetClipPlane(0, Some(_)) => true,
        _ => false,
    });
}

#[test]
fn view_change_requeues_clip_planes() {
    let mut engine = engine();
    engine.set_clip_plane(0, Some(prism::math::Vector4::new(0.0, 1.0, 0.0, 0.0)));
    engine.commit_all(TimingClass::PerPass, false);
    engine.device_mut().take_calls();

    // A view transform change invalidates the derived clip-space planes
    // even though the raw plane values did not move.
    engine.set_transform(
        TransformKind::View,
        prism::math::Matrix4::from_translation(prism::math::Vector3::new(0.0, 0.0, -5.0)),
    );
    engine.commit_all(TimingClass::PerDraw, false);
    engine.commit_all(TimingClass::PerPass, false);

    let calls = engine.device_mut().take_calls();
    assert!(calls.iter().any(|c| match c {
        Call::SetClipPlane(0, Some(_)) => true,
        _ => false,
    }));
}

#[test]
fn constant_writes_are_diffed_and_forcible() {
    let mut engine = engine();
    let values = [[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]];

    engine.set_vec4_constants(4, &values, false);
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::SetVec4Constants(4, values.to_vec())]
    );

    engine.set_vec4_constants(4, &values, false);
    assert!(engine.device_mut().take_calls().is_empty());

    engine.set_vec4_constants(4, &values, true);
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::SetVec4Constants(4, values.to_vec())]
    );
}

#[test]
fn deactivated_device_defers_everything() {
    let mut engine = engine();
    engine.set_active(false);

    engine.set_cull_mode(CullMode::Clockwise);
    engine.commit_all(TimingClass::PerDraw, false);
    assert!(engine.device_mut().take_calls().is_empty());
    assert_eq!(engine.pending_commits(TimingClass::PerDraw), 1);

    engine.set_active(true);
    engine.invalidate();
    engine.commit_all(TimingClass::PerDraw, false);

    let calls = engine.device_mut().take_calls();
    assert!(calls.contains(&Call::SetCullMode(CullMode::Clockwise)));
}

#[test]
fn constants_set_while_deactivated_survive_reactivation() {
    let mut engine = engine();
    let values = [[1.0, 2.0, 3.0, 4.0]];

    engine.set_active(false);
    engine.set_vec4_constants(8, &values, false);
    assert!(engine.device_mut().take_calls().is_empty());

    engine.set_active(true);
    engine.invalidate();
    assert!(engine
        .device_mut()
        .take_calls()
        .contains(&Call::SetVec4Constants(8, values.to_vec())));

    // The flushed value now diffs like any other.
    engine.set_vec4_constants(8, &values, false);
    assert!(engine.device_mut().take_calls().is_empty());
}

#[test]
fn invalidate_reissues_current_snapshot_state() {
    let mut engine = engine();
    let id = engine.take_snapshot(translucent());

    engine.use_snapshot(id, false);
    engine.device_mut().take_calls();

    engine.invalidate();
    assert_eq!(engine.current_snapshot(), None);

    // Applying the same id after invalidation re-issues all four blocks.
    engine.use_snapshot(id, false);
    assert_eq!(engine.device_mut().take_calls().len(), 4);
}

#[test]
fn frame_advance_paces_with_fences() {
    let mut engine = engine();

    engine.advance_frame();
    engine.advance_frame();
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::InsertFence(1), Call::InsertFence(2)]
    );

    // The default lag is two frames, so the third boundary waits on the
    // first fence.
    engine.advance_frame();
    assert_eq!(
        engine.device_mut().take_calls(),
        vec![Call::WaitFence(1), Call::InsertFence(3)]
    );
}
