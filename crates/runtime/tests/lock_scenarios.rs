//! End-to-end lock lifecycle scenarios driven through the runtime.

use std::sync::Arc;

use glam::Vec3;

use lock_core::{
    AcquisitionRules, AimFrame, InputEvent, LockStateTag, OwnerId, SearchShape, SwitchDirection,
    TargetMarker,
};
use runtime::{
    Event, QueueInputProvider, ReplicationEvent, Runtime, StaticVisibilityOracle, Topic,
};

fn cone_rules() -> AcquisitionRules {
    AcquisitionRules {
        shape: SearchShape::Cone,
        radius: 2000.0,
        max_angle_deg: 45.0,
        require_los: true,
        ..Default::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn build_runtime(owner: OwnerId) -> anyhow::Result<Runtime> {
    init_tracing();
    let runtime = Runtime::builder()
        .with_visibility(Arc::new(StaticVisibilityOracle::open()))
        .with_owner(owner, cone_rules(), AimFrame::looking_down_x(Vec3::ZERO))
        .build()
        .await?;
    Ok(runtime)
}

fn expect_update(event: Event) -> runtime::LockUpdate {
    match event {
        Event::Replication(ReplicationEvent::Update { update, payload }) => {
            // The payload on the bus is always the encoded form of the update.
            assert_eq!(runtime::LockUpdate::decode(&payload).unwrap(), update);
            update
        }
        other => panic!("expected replication update, got {other:?}"),
    }
}

#[tokio::test]
async fn locks_nearest_then_releases_when_target_destroyed() -> anyhow::Result<()> {
    let owner = OwnerId(1);
    let mut runtime = build_runtime(owner).await?;
    let handle = runtime.handle();
    let mut replication = runtime.subscribe(Topic::Replication);

    // Two unoccluded candidates inside the cone.
    let near = handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)))
        .await?;
    let far = handle
        .spawn_marker(TargetMarker::new(Vec3::new(1500.0, 0.0, 0.0)))
        .await?;

    handle.inject_input(owner, InputEvent::Acquire).await?;
    runtime.step().await?;

    let snapshot = handle.snapshot(owner).await?;
    assert_eq!(snapshot.tag, LockStateTag::Locked);
    assert_eq!(snapshot.handle.map(|h| h.target), Some(near));
    assert_ne!(snapshot.handle.map(|h| h.target), Some(far));

    let update = expect_update(replication.recv().await?);
    assert_eq!(update.seq, 1);
    assert_eq!(update.tag, LockStateTag::Locked);

    // Destroying the locked target releases on the next validation tick.
    handle.despawn_marker(near).await?;
    runtime.step().await?;

    let update = expect_update(replication.recv().await?);
    assert_eq!(update.seq, 2);
    assert_eq!(update.tag, LockStateTag::Released);
    assert_eq!(update.handle, None);

    // Released settles to Idle one tick later.
    runtime.step().await?;
    let update = expect_update(replication.recv().await?);
    assert_eq!(update.seq, 3);
    assert_eq!(update.tag, LockStateTag::Idle);

    let snapshot = handle.snapshot(owner).await?;
    assert_eq!(snapshot.tag, LockStateTag::Idle);
    assert_eq!(snapshot.handle, None);

    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn noop_switch_publishes_nothing() -> anyhow::Result<()> {
    let owner = OwnerId(1);
    let mut runtime = build_runtime(owner).await?;
    let handle = runtime.handle();
    let mut replication = runtime.subscribe(Topic::Replication);

    // The only other candidate sits to the left of the locked target.
    handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)))
        .await?;
    handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, -200.0)))
        .await?;

    handle.inject_input(owner, InputEvent::Acquire).await?;
    runtime.step().await?;
    let locked = expect_update(replication.recv().await?);
    assert_eq!(locked.tag, LockStateTag::Locked);

    handle
        .inject_input(owner, InputEvent::Switch(SwitchDirection::Right))
        .await?;
    runtime.step().await?;

    // The lock is retained and no further update hits the wire.
    let snapshot = handle.snapshot(owner).await?;
    assert_eq!(snapshot.tag, LockStateTag::Locked);
    assert_eq!(snapshot.handle, locked.handle);
    assert!(replication.try_recv().is_err());

    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn cooldown_blocks_immediate_reacquisition() -> anyhow::Result<()> {
    let owner = OwnerId(1);
    let rules = AcquisitionRules {
        cooldown_ticks: 5,
        ..cone_rules()
    };
    let mut runtime = Runtime::builder()
        .with_visibility(Arc::new(StaticVisibilityOracle::open()))
        .with_owner(owner, rules, AimFrame::looking_down_x(Vec3::ZERO))
        .build()
        .await?;
    let handle = runtime.handle();

    let target = handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)))
        .await?;

    // Acquire (tick 1), release (tick 2).
    handle.inject_input(owner, InputEvent::Acquire).await?;
    runtime.step().await?;
    handle.inject_input(owner, InputEvent::Release).await?;
    runtime.step().await?;

    // Tick 3 falls inside the 5-tick window: the re-acquire is rejected.
    handle.inject_input(owner, InputEvent::Acquire).await?;
    runtime.step().await?;
    assert_eq!(handle.snapshot(owner).await?.tag, LockStateTag::Idle);

    // Burn ticks 4..=7, then the same target is acquirable again.
    for _ in 0..4 {
        runtime.step().await?;
    }
    handle.inject_input(owner, InputEvent::Acquire).await?;
    runtime.step().await?;

    let snapshot = handle.snapshot(owner).await?;
    assert_eq!(snapshot.tag, LockStateTag::Locked);
    assert_eq!(snapshot.handle.map(|h| h.target), Some(target));

    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn occluded_candidates_are_not_acquired() -> anyhow::Result<()> {
    let owner = OwnerId(1);
    let mut runtime = Runtime::builder()
        .with_visibility(Arc::new(StaticVisibilityOracle::wall_at_x(300.0, 5000.0)))
        .with_owner(owner, cone_rules(), AimFrame::looking_down_x(Vec3::ZERO))
        .build()
        .await?;
    let handle = runtime.handle();

    // Behind the wall: geometrically eligible, never visible.
    handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)))
        .await?;

    handle.inject_input(owner, InputEvent::Acquire).await?;
    runtime.step().await?;

    assert_eq!(handle.snapshot(owner).await?.tag, LockStateTag::Idle);

    runtime.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn queued_provider_drives_the_lock() -> anyhow::Result<()> {
    let owner = OwnerId(7);
    let provider = Arc::new(QueueInputProvider::new());

    struct SharedProvider(Arc<QueueInputProvider>);

    #[async_trait::async_trait]
    impl runtime::InputProvider for SharedProvider {
        async fn poll_inputs(
            &self,
            owner: OwnerId,
        ) -> runtime::Result<Vec<lock_core::InputEvent>> {
            self.0.poll_inputs(owner).await
        }
    }

    let mut rt = Runtime::builder()
        .with_visibility(Arc::new(StaticVisibilityOracle::open()))
        .with_owner(owner, cone_rules(), AimFrame::looking_down_x(Vec3::ZERO))
        .with_provider(owner, SharedProvider(provider.clone()))
        .build()
        .await?;
    let handle = rt.handle();

    handle
        .spawn_marker(TargetMarker::new(Vec3::new(400.0, 0.0, 0.0)))
        .await?;

    // Nothing queued: the step is quiet.
    rt.step().await?;
    assert_eq!(handle.snapshot(owner).await?.tag, LockStateTag::Idle);

    provider.push(InputEvent::Acquire);
    rt.step().await?;
    assert_eq!(handle.snapshot(owner).await?.tag, LockStateTag::Locked);

    rt.shutdown().await?;
    Ok(())
}
