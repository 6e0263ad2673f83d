use std::time::Duration;

use glam::Vec3;
use snowbound_arena::{AreaManager, Region};
use snowbound_core::{AgentConfig, Event, SpawnerConfig, Unobstructed};
use snowbound_system_spawning::Spawner;

const FAR_PLAYER: Vec3 = Vec3::new(500.0, 0.0, 0.0);

fn square(name: &str, center: Vec3, half: f32) -> Region {
    Region::new(
        name,
        vec![
            center + Vec3::new(-half, 0.0, -half),
            center + Vec3::new(half, 0.0, -half),
            center + Vec3::new(half, 0.0, half),
            center + Vec3::new(-half, 0.0, half),
        ],
        center.y - 2.0,
        center.y + 2.0,
    )
}

fn spawner() -> Spawner {
    Spawner::new(SpawnerConfig::default(), AgentConfig::default())
}

#[test]
fn cramped_arena_reports_the_unplaceable_remainder() {
    // Each region is far smaller than the separation distance, so it can
    // host at most one agent. Two regions cap the batch at two.
    let areas = AreaManager::new(vec![
        square("ledge-a", Vec3::new(-20.0, 0.0, 0.0), 0.2),
        square("ledge-b", Vec3::new(20.0, 0.0, 0.0), 0.2),
    ]);
    let mut events = Vec::new();
    let outcome = spawner().spawn_enemies(5, Duration::ZERO, &areas, FAR_PLAYER, &mut events);

    assert_eq!(outcome.spawned, 2);
    assert_eq!(outcome.shortfall, 3);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::AgentSpawned { .. }))
            .count(),
        2
    );
}

#[test]
fn single_tiny_region_places_exactly_one_agent() {
    let areas = AreaManager::new(vec![square("ledge", Vec3::ZERO, 0.2)]);
    let mut events = Vec::new();
    let outcome = spawner().spawn_enemies(5, Duration::ZERO, &areas, FAR_PLAYER, &mut events);
    assert_eq!(outcome.spawned, 1);
    assert_eq!(outcome.shortfall, 4);
}

#[test]
fn placements_keep_their_distances() {
    let areas = AreaManager::new(vec![square("field", Vec3::ZERO, 30.0)]);
    let player = Vec3::new(2.0, 0.0, 2.0);
    let config = SpawnerConfig::default();
    let mut spawner = Spawner::new(config.clone(), AgentConfig::default());
    let mut events = Vec::new();
    let outcome = spawner.spawn_enemies(8, Duration::ZERO, &areas, player, &mut events);
    assert_eq!(outcome.shortfall, 0, "a 60x60 field fits eight agents");

    let positions: Vec<Vec3> = spawner.agents().iter().map(|agent| agent.position()).collect();
    for (i, a) in positions.iter().enumerate() {
        let planar = Vec3::new(a.x - player.x, 0.0, a.z - player.z).length();
        assert!(
            planar >= config.min_distance_from_player,
            "agent {i} spawned {planar} from the player"
        );
        assert!(areas.contains(*a), "agent {i} spawned outside the arena");
        for b in &positions[i + 1..] {
            assert!(
                a.distance(*b) >= config.min_distance_between_agents,
                "agents spawned {} apart",
                a.distance(*b)
            );
        }
    }
}

#[test]
fn allow_list_excludes_unlisted_regions() {
    let areas = AreaManager::new(vec![
        square("north", Vec3::new(0.0, 0.0, 40.0), 15.0),
        square("south", Vec3::new(0.0, 0.0, -40.0), 15.0),
    ]);
    let config = SpawnerConfig {
        allowed_regions: vec!["north".to_owned()],
        ..SpawnerConfig::default()
    };
    let mut spawner = Spawner::new(config, AgentConfig::default());
    let mut events = Vec::new();
    let outcome = spawner.spawn_enemies(4, Duration::ZERO, &areas, FAR_PLAYER, &mut events);
    assert_eq!(outcome.shortfall, 0);
    for agent in spawner.agents() {
        assert!(
            agent.position().z > 0.0,
            "agent at {:?} spawned in the excluded region",
            agent.position()
        );
    }
}

#[test]
fn inactive_regions_yield_only_shortfall() {
    let mut areas = AreaManager::new(vec![square("field", Vec3::ZERO, 20.0)]);
    assert!(areas.set_region_active(0, false));
    let mut events = Vec::new();
    let outcome = spawner().spawn_enemies(3, Duration::ZERO, &areas, FAR_PLAYER, &mut events);
    assert_eq!(outcome.spawned, 0);
    assert_eq!(outcome.shortfall, 3);
    assert!(events.is_empty());
}

#[test]
fn identical_seeds_replay_identical_layouts() {
    let areas = AreaManager::new(vec![square("field", Vec3::ZERO, 30.0)]);
    let mut layouts = Vec::new();
    for _ in 0..2 {
        let mut spawner = spawner();
        spawner.reseed(0xfeed_f00d);
        let mut events = Vec::new();
        let _ = spawner.spawn_enemies(5, Duration::ZERO, &areas, FAR_PLAYER, &mut events);
        layouts.push(
            spawner
                .agents()
                .iter()
                .map(|agent| agent.position())
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(layouts[0], layouts[1]);
}

#[test]
fn clear_all_removes_every_agent() {
    let areas = AreaManager::new(vec![square("field", Vec3::ZERO, 30.0)]);
    let mut spawner = spawner();
    let mut events = Vec::new();
    let outcome = spawner.spawn_enemies(4, Duration::ZERO, &areas, FAR_PLAYER, &mut events);
    assert_eq!(outcome.spawned, 4);

    events.clear();
    spawner.clear_all(&mut events);
    assert!(spawner.agents().is_empty());
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::AgentRemoved { .. }))
            .count(),
        4
    );
}

#[test]
fn corpses_despawn_after_the_linger_window() {
    let areas = AreaManager::new(vec![square("field", Vec3::ZERO, 30.0)]);
    let mut spawner = spawner();
    let mut events = Vec::new();
    let _ = spawner.spawn_enemies(1, Duration::ZERO, &areas, FAR_PLAYER, &mut events);
    let id = spawner.agents()[0].id();

    let killed_at = Duration::from_secs(1);
    assert!(spawner.mark_dead(id, killed_at, &mut events));
    assert_eq!(spawner.alive_count(), 0);
    assert_eq!(spawner.agents().len(), 1, "the corpse lingers");

    events.clear();
    // The default linger is 2.5 seconds; one tick past it purges the corpse.
    spawner.tick(
        Duration::from_millis(100),
        Duration::from_secs(4),
        FAR_PLAYER,
        &Unobstructed,
        &areas,
        &mut events,
    );
    assert!(spawner.agents().is_empty());
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::AgentRemoved { .. }))
            .count(),
        1
    );
}

#[test]
fn damage_routes_to_the_addressed_agent() {
    let areas = AreaManager::new(vec![square("field", Vec3::ZERO, 30.0)]);
    let mut spawner = spawner();
    let mut events = Vec::new();
    let _ = spawner.spawn_enemies(2, Duration::ZERO, &areas, FAR_PLAYER, &mut events);
    let id = spawner.agents()[0].id();
    let other = spawner.agents()[1].id();
    let now = Duration::from_secs(1);

    assert!(!spawner.damage_agent(id, 40.0, now, &mut events));
    assert!(spawner.damage_agent(id, 70.0, now, &mut events), "depletion kills");
    assert_eq!(spawner.alive_count(), 1);
    assert!(!spawner.agents().iter().any(|a| a.id() == id && !a.is_dead()));
    assert!(spawner.agents().iter().any(|a| a.id() == other && !a.is_dead()));

    // Signals addressed to unknown agents are dropped.
    assert!(!spawner.damage_agent(snowbound_core::AgentId::new(999), 10.0, now, &mut events));
}
