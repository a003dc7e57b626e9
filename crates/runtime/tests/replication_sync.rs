//! Authority-to-observer consistency across the wire.
//!
//! Drives the authoritative runtime, carries the encoded payloads to an
//! observer replica, and checks that the observed state converges under
//! reordering and late marker replication.

use std::sync::Arc;

use glam::Vec3;

use lock_core::{
    AcquisitionRules, AimFrame, InputEvent, LockStateTag, MarkerRegistry, OwnerId, TargetMarker,
    Tick,
};
use runtime::{
    ApplyOutcome, Event, LockUpdate, ObserverBridge, ObserverConfig, ReplicationEvent, Runtime,
    StaticVisibilityOracle, Topic,
};

fn rules() -> AcquisitionRules {
    AcquisitionRules {
        radius: 2000.0,
        require_los: false,
        ..Default::default()
    }
}

async fn build_authority(owner: OwnerId) -> anyhow::Result<Runtime> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let runtime = Runtime::builder()
        .with_visibility(Arc::new(StaticVisibilityOracle::open()))
        .with_owner(owner, rules(), AimFrame::looking_down_x(Vec3::ZERO))
        .build()
        .await?;
    Ok(runtime)
}

async fn drain_payloads(
    replication: &mut tokio::sync::broadcast::Receiver<Event>,
) -> Vec<Vec<u8>> {
    let mut payloads = Vec::new();
    while let Ok(event) = replication.try_recv() {
        if let Event::Replication(ReplicationEvent::Update { payload, .. }) = event {
            payloads.push(payload);
        }
    }
    payloads
}

#[tokio::test]
async fn observer_mirrors_authoritative_lifecycle() -> anyhow::Result<()> {
    let owner = OwnerId(1);
    let mut authority = build_authority(owner).await?;
    let handle = authority.handle();
    let mut replication = authority.subscribe(Topic::Replication);

    // The observer replica has already spawned the same target.
    let mut observer_registry = MarkerRegistry::new();
    let replica = observer_registry.spawn(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)));
    let mut observer = ObserverBridge::new(ObserverConfig::default());

    let target = handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)))
        .await?;
    assert_eq!(target, replica);

    // Lock, then explicitly release, then settle.
    handle.inject_input(owner, InputEvent::Acquire).await?;
    authority.step().await?;
    handle.inject_input(owner, InputEvent::Release).await?;
    authority.step().await?;
    authority.step().await?;

    let mut tick = 0u64;
    for payload in drain_payloads(&mut replication).await {
        tick += 1;
        let update = LockUpdate::decode(&payload)?;
        observer.apply(update, &observer_registry, Tick(tick));
    }

    // Final observed state matches the authority: Idle, no handle.
    let observed = observer.state(owner).unwrap();
    assert_eq!(observed.tag, LockStateTag::Idle);
    assert_eq!(observed.handle, None);
    assert_eq!(observer.stale_discarded(), 0);

    let snapshot = handle.snapshot(owner).await?;
    assert_eq!(snapshot.tag, observed.tag);

    authority.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn reordered_delivery_converges_to_the_same_state() -> anyhow::Result<()> {
    let owner = OwnerId(1);
    let mut authority = build_authority(owner).await?;
    let handle = authority.handle();
    let mut replication = authority.subscribe(Topic::Replication);

    let mut observer_registry = MarkerRegistry::new();
    observer_registry.spawn(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)));
    let mut observer = ObserverBridge::new(ObserverConfig::default());

    handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)))
        .await?;
    handle.inject_input(owner, InputEvent::Acquire).await?;
    authority.step().await?;
    handle.inject_input(owner, InputEvent::Release).await?;
    authority.step().await?;
    authority.step().await?;

    let payloads = drain_payloads(&mut replication).await;
    assert!(payloads.len() >= 3);

    // Deliver newest-first: the first update wins, the rest are stale.
    let mut updates: Vec<LockUpdate> = payloads
        .iter()
        .map(|payload| LockUpdate::decode(payload))
        .collect::<Result<_, _>>()?;
    updates.sort_by(|a, b| b.seq.cmp(&a.seq));

    let newest = updates[0];
    assert_eq!(
        observer.apply(newest, &observer_registry, Tick(1)),
        ApplyOutcome::Applied
    );
    for stale in &updates[1..] {
        assert_eq!(
            observer.apply(*stale, &observer_registry, Tick(2)),
            ApplyOutcome::Stale
        );
    }

    // Observer state reflects the newest sequence, never a regression.
    let observed = observer.state(owner).unwrap();
    assert_eq!(observed.tag, newest.tag);
    assert_eq!(observer.last_seq(owner), newest.seq);
    assert_eq!(observer.stale_discarded(), updates.len() as u64 - 1);

    authority.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn late_replicated_marker_resolves_parked_lock() -> anyhow::Result<()> {
    let owner = OwnerId(1);
    let mut authority = build_authority(owner).await?;
    let handle = authority.handle();
    let mut replication = authority.subscribe(Topic::Replication);

    let authority_target = handle
        .spawn_marker(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)))
        .await?;
    handle.inject_input(owner, InputEvent::Acquire).await?;
    authority.step().await?;

    // The observer has not replicated the marker yet.
    let mut observer_registry = MarkerRegistry::new();
    let mut observer = ObserverBridge::new(ObserverConfig::default());

    let payloads = drain_payloads(&mut replication).await;
    let update = LockUpdate::decode(&payloads[0])?;
    assert_eq!(
        observer.apply(update, &observer_registry, Tick(1)),
        ApplyOutcome::Parked
    );
    assert_eq!(observer.state(owner), None);

    // The marker replicates in; the parked lock applies.
    let replica = observer_registry.spawn(TargetMarker::new(Vec3::new(500.0, 0.0, 0.0)));
    assert_eq!(replica, authority_target);
    for event in observer_registry.drain_events() {
        observer.on_marker_event(&event, &observer_registry);
    }

    let observed = observer.state(owner).unwrap();
    assert_eq!(observed.tag, LockStateTag::Locked);
    assert_eq!(observed.handle.map(|h| h.target), Some(replica));

    authority.shutdown().await?;
    Ok(())
}
