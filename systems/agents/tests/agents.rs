use std::time::Duration;

use glam::Vec3;
use snowbound_arena::{AreaManager, Region};
use snowbound_core::{
    AgentConfig, AgentId, AgentState, Event, Sightline, Unobstructed, VoiceGate, VoiceLine,
    SPOTTED_VOICE_WINDOW,
};
use snowbound_system_agents::EnemyAgent;

/// Sightline stub with a fixed answer.
struct Wall(bool);

impl Sightline for Wall {
    fn blocked(&self, _from: Vec3, _to: Vec3) -> bool {
        self.0
    }
}

fn open_field(half: f32) -> AreaManager {
    AreaManager::new(vec![Region::new(
        "field",
        vec![
            Vec3::new(-half, 0.0, -half),
            Vec3::new(half, 0.0, -half),
            Vec3::new(half, 0.0, half),
            Vec3::new(-half, 0.0, half),
        ],
        -10.0,
        10.0,
    )])
}

fn spawn_agent(areas: &AreaManager) -> EnemyAgent {
    EnemyAgent::new(
        AgentId::new(1),
        Vec3::ZERO,
        AgentConfig::default(),
        0x51de_ca5e,
        Duration::ZERO,
        areas,
    )
}

struct Harness {
    areas: AreaManager,
    agent: EnemyAgent,
    gate: VoiceGate,
    events: Vec<Event>,
    now: Duration,
}

impl Harness {
    fn new() -> Self {
        let areas = open_field(40.0);
        let agent = spawn_agent(&areas);
        Self {
            areas,
            agent,
            gate: VoiceGate::new(SPOTTED_VOICE_WINDOW),
            events: Vec::new(),
            now: Duration::ZERO,
        }
    }

    fn tick(&mut self, dt: Duration, player: Vec3, sight: &dyn Sightline) {
        self.now += dt;
        self.agent.fixed_tick(
            dt,
            self.now,
            player,
            sight,
            &self.areas,
            &mut self.gate,
            &mut self.events,
        );
    }

    fn count<F: Fn(&Event) -> bool>(&self, predicate: F) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}

#[test]
fn blocked_sight_never_triggers_chase() {
    let mut harness = Harness::new();
    let player = Vec3::new(9.5, 0.0, 0.0);

    for _ in 0..5 {
        harness.tick(Duration::from_millis(10), player, &Wall(true));
    }
    assert_eq!(harness.agent.state(), AgentState::Patrolling);

    // The obstacle disappears; the transition happens within one tick.
    harness.tick(Duration::from_millis(10), player, &Wall(false));
    assert_eq!(harness.agent.state(), AgentState::Chasing);
    assert_eq!(
        harness.count(|event| matches!(
            event,
            Event::VoiceLineRequested {
                line: VoiceLine::EnemySpotted
            }
        )),
        1
    );
}

#[test]
fn player_beyond_detection_range_is_ignored() {
    let mut harness = Harness::new();
    let player = Vec3::new(30.0, 0.0, 0.0);
    for _ in 0..10 {
        harness.tick(Duration::from_millis(10), player, &Unobstructed);
    }
    assert_eq!(harness.agent.state(), AgentState::Patrolling);
}

#[test]
fn chase_ends_beyond_lose_range() {
    let mut harness = Harness::new();
    harness.tick(Duration::from_millis(10), Vec3::new(5.0, 0.0, 0.0), &Unobstructed);
    assert_eq!(harness.agent.state(), AgentState::Chasing);

    // Hysteresis: drifting past detection range alone does not break the
    // chase while sight holds.
    harness.tick(
        Duration::from_millis(10),
        Vec3::new(20.0, 0.0, 0.0),
        &Unobstructed,
    );
    assert_eq!(harness.agent.state(), AgentState::Chasing);

    harness.tick(
        Duration::from_millis(10),
        Vec3::new(40.0, 0.0, 0.0),
        &Unobstructed,
    );
    assert_eq!(harness.agent.state(), AgentState::Patrolling);
}

#[test]
fn lost_sight_expires_after_memory_duration() {
    let mut harness = Harness::new();
    let player = Vec3::new(8.0, 0.0, 0.0);
    harness.tick(Duration::from_millis(100), player, &Unobstructed);
    assert_eq!(harness.agent.state(), AgentState::Chasing);

    // Sight blocked, player still close: memory keeps the chase alive.
    let mut elapsed = Duration::ZERO;
    while elapsed < Duration::from_millis(2_800) {
        harness.tick(Duration::from_millis(200), player, &Wall(true));
        elapsed += Duration::from_millis(200);
    }
    assert_eq!(harness.agent.state(), AgentState::Chasing);

    harness.tick(Duration::from_millis(400), player, &Wall(true));
    assert_eq!(harness.agent.state(), AgentState::Patrolling);
}

#[test]
fn attack_fires_after_windup_and_respects_cooldown() {
    let mut harness = Harness::new();
    let player = Vec3::new(5.0, 0.0, 0.0);
    let dt = Duration::from_millis(100);

    // First tick acquires the target, second tick starts the attack.
    harness.tick(dt, player, &Unobstructed);
    harness.tick(dt, player, &Unobstructed);
    assert_eq!(harness.agent.state(), AgentState::Attacking);
    assert_eq!(harness.count(|event| matches!(event, Event::AttackStarted { .. })), 1);
    assert_eq!(
        harness.count(|event| matches!(event, Event::ProjectileLaunched { .. })),
        0,
        "projectile must wait for the wind-up"
    );

    // Wind-up elapses within three more ticks.
    for _ in 0..3 {
        harness.tick(dt, player, &Unobstructed);
    }
    assert_eq!(
        harness.count(|event| matches!(event, Event::ProjectileLaunched { .. })),
        1
    );

    // No second attack until the cooldown from the wind-up start elapses.
    let mut elapsed = Duration::ZERO;
    while elapsed < Duration::from_millis(1_400) {
        harness.tick(dt, player, &Unobstructed);
        elapsed += dt;
    }
    assert_eq!(harness.count(|event| matches!(event, Event::AttackStarted { .. })), 1);

    while elapsed < Duration::from_millis(2_400) {
        harness.tick(dt, player, &Unobstructed);
        elapsed += dt;
    }
    assert_eq!(harness.count(|event| matches!(event, Event::AttackStarted { .. })), 2);
}

#[test]
fn projectile_aims_along_the_configured_arc() {
    let mut harness = Harness::new();
    let player = Vec3::new(5.0, 0.0, 0.0);
    let dt = Duration::from_millis(100);
    for _ in 0..6 {
        harness.tick(dt, player, &Unobstructed);
    }
    let velocity = harness
        .events
        .iter()
        .find_map(|event| match event {
            Event::ProjectileLaunched { velocity, .. } => Some(*velocity),
            _ => None,
        })
        .expect("a projectile");
    assert!(velocity.is_finite());
    assert!(velocity.y > 0.0, "arc must rise toward the launch angle");
}

#[test]
fn death_cancels_pending_windup() {
    let mut harness = Harness::new();
    let player = Vec3::new(5.0, 0.0, 0.0);
    let dt = Duration::from_millis(100);
    harness.tick(dt, player, &Unobstructed);
    harness.tick(dt, player, &Unobstructed);
    assert_eq!(harness.agent.state(), AgentState::Attacking);

    let now = harness.now;
    assert!(harness.agent.mark_dead(now, &mut harness.events));
    assert!(!harness.agent.mark_dead(now, &mut harness.events), "second signal is a no-op");

    for _ in 0..10 {
        harness.tick(dt, player, &Unobstructed);
    }
    assert_eq!(
        harness.count(|event| matches!(event, Event::ProjectileLaunched { .. })),
        0,
        "a dead agent's timers must never fire"
    );
    assert_eq!(harness.agent.state(), AgentState::Dead);
    assert!(harness.agent.due_for_despawn(now + Duration::from_secs(3)));
    assert!(!harness.agent.due_for_despawn(now + Duration::from_secs(2)));
}

#[test]
fn damage_kills_only_at_depletion() {
    let mut harness = Harness::new();
    let now = Duration::from_secs(1);
    assert!(!harness.agent.take_damage(60.0, now, &mut harness.events));
    assert!(!harness.agent.is_dead());
    assert!(harness.agent.take_damage(60.0, now, &mut harness.events));
    assert!(harness.agent.is_dead());
    assert!(!harness.agent.take_damage(10.0, now, &mut harness.events));
}

#[test]
fn patrol_targets_stay_inside_the_region() {
    // A region far smaller than the patrol radius forces clamping.
    let areas = open_field(2.0);
    let agent = spawn_agent(&areas);
    assert!(
        areas.contains(agent.patrol_target()),
        "patrol target {:?} escaped the region",
        agent.patrol_target()
    );
}

#[test]
fn arrival_at_a_patrol_target_dwells_before_retargeting() {
    let mut harness = Harness::new();
    let player = Vec3::new(200.0, 0.0, 0.0);
    let dt = Duration::from_millis(100);
    let target = harness.agent.patrol_target();

    // Walk to the target; the target must hold for the whole approach.
    let mut steps = 0;
    while harness.agent.position().distance(target) > 0.5 {
        harness.tick(dt, player, &Unobstructed);
        assert_eq!(harness.agent.patrol_target(), target);
        steps += 1;
        assert!(steps < 150, "agent never reached its patrol target");
    }

    // The next tick halts and arms the dwell.
    harness.events.clear();
    harness.tick(dt, player, &Unobstructed);
    assert_eq!(harness.agent.patrol_target(), target);
    assert!(harness.events.contains(&Event::WalkingChanged {
        agent: AgentId::new(1),
        walking: false
    }));

    // One and a half seconds sit well inside the two second dwell window.
    for _ in 0..15 {
        harness.tick(dt, player, &Unobstructed);
    }
    assert_eq!(harness.agent.patrol_target(), target, "dwell holds the target");
    assert_eq!(
        harness.count(|event| matches!(
            event,
            Event::WalkingChanged { walking: true, .. }
        )),
        0,
        "no walking during the dwell"
    );

    // Another second passes the dwell deadline and a new target is rolled.
    for _ in 0..10 {
        harness.tick(dt, player, &Unobstructed);
    }
    assert_ne!(harness.agent.patrol_target(), target);
}

#[test]
fn stalled_patrol_picks_a_new_target() {
    let mut harness = Harness::new();
    let player = Vec3::new(100.0, 0.0, 0.0);
    let before = harness.agent.patrol_target();

    // Zero-length steps simulate an agent pinned in place; once the stuck
    // check interval passes, the target must change.
    harness.now = Duration::from_millis(600);
    harness.agent.fixed_tick(
        Duration::ZERO,
        harness.now,
        player,
        &Unobstructed,
        &harness.areas,
        &mut harness.gate,
        &mut harness.events,
    );
    assert_ne!(harness.agent.patrol_target(), before);
}

#[test]
fn wall_contact_abandons_patrol_target() {
    let mut harness = Harness::new();
    let before = harness.agent.patrol_target();
    let now = Duration::from_secs(2);

    // Walkable ground contact is ignored.
    harness.agent.notify_obstacle_contact(Vec3::Y, now, &harness.areas);
    assert_eq!(harness.agent.patrol_target(), before);

    harness
        .agent
        .notify_obstacle_contact(Vec3::new(1.0, 0.0, 0.0), now, &harness.areas);
    assert_ne!(harness.agent.patrol_target(), before);
}

#[test]
fn spotted_voice_line_is_rate_limited_across_agents() {
    let areas = open_field(40.0);
    let mut first = spawn_agent(&areas);
    let mut second = EnemyAgent::new(
        AgentId::new(2),
        Vec3::new(2.0, 0.0, 0.0),
        AgentConfig::default(),
        0xdead_beef,
        Duration::ZERO,
        &areas,
    );
    let mut gate = VoiceGate::new(SPOTTED_VOICE_WINDOW);
    let mut events = Vec::new();
    let player = Vec3::new(4.0, 0.0, 0.0);
    let dt = Duration::from_millis(100);

    first.fixed_tick(dt, dt, player, &Unobstructed, &areas, &mut gate, &mut events);
    second.fixed_tick(dt, dt, player, &Unobstructed, &areas, &mut gate, &mut events);

    let voices = events
        .iter()
        .filter(|event| matches!(event, Event::VoiceLineRequested { .. }))
        .count();
    assert_eq!(voices, 1, "one spotted line per window across the pack");
}

#[test]
fn orientation_converges_on_the_player() {
    let mut harness = Harness::new();
    let player = Vec3::new(6.0, 0.0, 0.0);
    harness.tick(Duration::from_millis(100), player, &Unobstructed);
    assert_eq!(harness.agent.state(), AgentState::Chasing);

    for _ in 0..20 {
        harness.agent.orient_tick(Duration::from_millis(50), player);
    }
    let expected = std::f32::consts::FRAC_PI_2;
    assert!(
        (harness.agent.yaw() - expected).abs() < 1e-3,
        "yaw {} should face +X",
        harness.agent.yaw()
    );
}
