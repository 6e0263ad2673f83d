#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy agent state machine for the Snowbound encounter.
//!
//! Each [`EnemyAgent`] runs a patrol / chase / attack / dead state machine
//! advanced by two tick entry points: [`EnemyAgent::fixed_tick`] performs
//! sensing, movement integration, and attack scheduling at a fixed rate so
//! speeds stay frame-rate independent, while [`EnemyAgent::orient_tick`]
//! smooths facing at the presentation rate. Long-running behaviours (patrol
//! dwell, attack wind-up and recovery, death linger) are explicit deadlines
//! against the accumulated simulation clock rather than coroutines, and
//! every deadline is cancelled the moment the agent dies.

use std::f32::consts::TAU;
use std::time::Duration;

use glam::Vec3;
use snowbound_arena::AreaManager;
use snowbound_core::{AgentConfig, AgentId, AgentState, Event, Sightline, VoiceGate, VoiceLine};

/// Launch speed of the straight 45-degree fallback shot used when the
/// ballistic solve has no solution at the configured angle.
const FALLBACK_LAUNCH_SPEED: f32 = 15.0;

/// Threshold below which the ballistic discriminant is treated as having
/// no solution.
const BALLISTIC_EPSILON: f32 = 0.01;

/// Horizontal distance at which a patrol target counts as reached.
const ARRIVAL_TOLERANCE: f32 = 0.5;

/// Projectiles are aimed this far above the player's reference position.
const AIM_HEIGHT_OFFSET: f32 = 1.0;

/// Contact normals with a Y component below this are treated as walls
/// rather than walkable ground.
const STEEP_CONTACT_NORMAL_Y: f32 = 0.7;

/// Remaining and maximum hit points of one agent.
///
/// Depletion is the "died" signal for the rest of the simulation; damage
/// saturates at zero and never goes negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Health {
    current: f32,
    maximum: f32,
}

impl Health {
    /// Creates a full health pool.
    #[must_use]
    pub fn new(maximum: f32) -> Self {
        let maximum = maximum.max(0.0);
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Hit points remaining.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Hit points granted at spawn.
    #[must_use]
    pub const fn maximum(&self) -> f32 {
        self.maximum
    }

    /// Whether the pool has reached zero.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount.max(0.0)).max(0.0);
    }
}

/// Pending attack timer state, advanced against the simulation clock.
#[derive(Clone, Copy, Debug)]
enum AttackPhase {
    /// Animation started; the projectile launches at `fire_at`.
    Windup { fire_at: Duration },
    /// Projectile away; control returns to the chase at `until`.
    Recovering { until: Duration },
}

/// One simulated enemy actor.
#[derive(Debug)]
pub struct EnemyAgent {
    id: AgentId,
    config: AgentConfig,
    position: Vec3,
    yaw: f32,
    state: AgentState,
    spawn_origin: Vec3,
    patrol_target: Vec3,
    dwell_until: Option<Duration>,
    last_seen: Duration,
    last_attack_started: Option<Duration>,
    attack_phase: Option<AttackPhase>,
    walking: bool,
    health: Health,
    rng: SplitMix64,
    stuck_anchor: Vec3,
    next_stuck_check: Duration,
    last_retarget: Option<Duration>,
    despawn_at: Option<Duration>,
}

impl EnemyAgent {
    /// Creates an agent at a validated spawn position.
    ///
    /// The spawn position becomes the patrol origin, and an initial patrol
    /// target is rolled immediately, clamped into the nearest region.
    #[must_use]
    pub fn new(
        id: AgentId,
        position: Vec3,
        config: AgentConfig,
        seed: u64,
        now: Duration,
        areas: &AreaManager,
    ) -> Self {
        let mut agent = Self {
            id,
            position,
            yaw: 0.0,
            state: AgentState::Patrolling,
            spawn_origin: position,
            patrol_target: position,
            dwell_until: None,
            last_seen: Duration::ZERO,
            last_attack_started: None,
            attack_phase: None,
            walking: false,
            health: Health::new(config.initial_health),
            rng: SplitMix64::new(seed),
            stuck_anchor: position,
            next_stuck_check: now.saturating_add(config.stuck_check_interval),
            last_retarget: None,
            despawn_at: None,
            config,
        };
        agent.pick_patrol_target(areas);
        agent
    }

    /// Identifier assigned by the spawner.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Current behavioural state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Facing angle in radians around the vertical axis.
    #[must_use]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Current health pool.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Patrol point the agent is currently heading toward.
    #[must_use]
    pub const fn patrol_target(&self) -> Vec3 {
        self.patrol_target
    }

    /// Whether the agent has been marked dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == AgentState::Dead
    }

    /// Whether the death linger has elapsed and the agent can be removed.
    #[must_use]
    pub fn due_for_despawn(&self, now: Duration) -> bool {
        self.despawn_at.map_or(false, |at| now >= at)
    }

    /// Advances the fixed-rate simulation by `dt`, ending at time `now`.
    ///
    /// Sensing evaluates the caller-provided `player` snapshot, so every
    /// agent ticked with the same arguments perceives a consistent world.
    pub fn fixed_tick(
        &mut self,
        dt: Duration,
        now: Duration,
        player: Vec3,
        sight: &dyn Sightline,
        areas: &AreaManager,
        voice_gate: &mut VoiceGate,
        out: &mut Vec<Event>,
    ) {
        if self.is_dead() {
            return;
        }

        self.sense(now, player, sight, voice_gate, out);
        self.advance_attack_phase(now, player, out);

        match self.state {
            AgentState::Attacking => {
                // Horizontal movement halts for the whole wind-up and
                // recovery window; orientation keeps tracking the player.
                self.set_walking(false, out);
            }
            AgentState::Chasing => {
                // Pursuit deliberately ignores region bounds.
                self.move_towards(player, self.config.chase_speed, dt, out);
            }
            AgentState::Patrolling => self.patrol(dt, now, areas, out),
            AgentState::Dead => {}
        }
    }

    /// Smooths facing toward the current target at the presentation rate.
    pub fn orient_tick(&mut self, dt: Duration, player: Vec3) {
        let target = match self.state {
            AgentState::Chasing | AgentState::Attacking => player,
            AgentState::Patrolling if self.walking => self.patrol_target,
            _ => return,
        };
        let mut direction = target - self.position;
        direction.y = 0.0;
        if direction.length_squared() <= f32::EPSILON {
            return;
        }
        let desired = direction.x.atan2(direction.z);
        let blend = (self.config.rotation_speed * dt.as_secs_f32()).min(1.0);
        self.yaw = wrap_angle(self.yaw + wrap_angle(desired - self.yaw) * blend);
    }

    /// Applies damage from the health collaborator.
    ///
    /// Returns `true` when this hit depleted the pool and killed the agent.
    pub fn take_damage(&mut self, amount: f32, now: Duration, out: &mut Vec<Event>) -> bool {
        if self.is_dead() {
            return false;
        }
        self.health.damage(amount);
        if self.health.is_depleted() {
            return self.mark_dead(now, out);
        }
        false
    }

    /// Halts AI control immediately and schedules removal.
    ///
    /// Any pending attack wind-up or dwell deadline is cancelled so no
    /// stale timer can act on the corpse. Returns `false` when the agent
    /// was already dead.
    pub fn mark_dead(&mut self, now: Duration, out: &mut Vec<Event>) -> bool {
        if self.is_dead() {
            return false;
        }
        self.state = AgentState::Dead;
        self.attack_phase = None;
        self.dwell_until = None;
        self.set_walking(false, out);
        self.despawn_at = Some(now.saturating_add(self.config.death_linger));
        true
    }

    /// Reacts to a collision report from the physics collaborator.
    ///
    /// A near-vertical contact surface while patrolling means the agent is
    /// pushing against a wall, so the current patrol target is abandoned.
    pub fn notify_obstacle_contact(&mut self, normal: Vec3, now: Duration, areas: &AreaManager) {
        if self.state != AgentState::Patrolling {
            return;
        }
        if normal.y < STEEP_CONTACT_NORMAL_Y {
            self.retarget(now, areas);
        }
    }

    fn sense(
        &mut self,
        now: Duration,
        player: Vec3,
        sight: &dyn Sightline,
        voice_gate: &mut VoiceGate,
        out: &mut Vec<Event>,
    ) {
        match self.state {
            AgentState::Patrolling => {
                let distance = self.position.distance(player);
                if distance <= self.config.detection_range
                    && !sight.blocked(self.position, player)
                {
                    self.start_chasing(now, voice_gate, out);
                }
            }
            AgentState::Chasing | AgentState::Attacking => {
                let distance = self.position.distance(player);
                let can_see = !sight.blocked(self.position, player);
                if can_see {
                    self.last_seen = now;
                }

                let too_far = distance > self.config.lose_range;
                let memory_expired = !can_see
                    && now > self.last_seen.saturating_add(self.config.memory_duration);
                if too_far || memory_expired {
                    self.stop_chasing();
                } else if self.state == AgentState::Chasing
                    && distance <= self.config.attack_range
                    && can_see
                    && self.cooldown_elapsed(now)
                {
                    self.begin_attack(now, out);
                }
            }
            AgentState::Dead => {}
        }
    }

    fn start_chasing(&mut self, now: Duration, voice_gate: &mut VoiceGate, out: &mut Vec<Event>) {
        log::debug!("agent {} spotted the player", self.id.get());
        self.state = AgentState::Chasing;
        self.dwell_until = None;
        self.last_seen = now;
        if voice_gate.try_fire(now) {
            out.push(Event::VoiceLineRequested {
                line: VoiceLine::EnemySpotted,
            });
        }
    }

    fn stop_chasing(&mut self) {
        log::debug!("agent {} lost the player", self.id.get());
        self.state = AgentState::Patrolling;
        self.dwell_until = None;
        // A wind-up in flight is cancelled outright; the cooldown clock in
        // `last_attack_started` still applies to the next attempt.
        self.attack_phase = None;
    }

    fn cooldown_elapsed(&self, now: Duration) -> bool {
        self.last_attack_started
            .map_or(true, |started| {
                now >= started.saturating_add(self.config.attack_cooldown)
            })
    }

    fn begin_attack(&mut self, now: Duration, out: &mut Vec<Event>) {
        self.state = AgentState::Attacking;
        self.last_attack_started = Some(now);
        self.attack_phase = Some(AttackPhase::Windup {
            fire_at: now.saturating_add(self.config.attack_windup),
        });
        self.set_walking(false, out);
        out.push(Event::AttackStarted { agent: self.id });
    }

    fn advance_attack_phase(&mut self, now: Duration, player: Vec3, out: &mut Vec<Event>) {
        match self.attack_phase {
            Some(AttackPhase::Windup { fire_at }) if now >= fire_at => {
                self.launch_projectile(player, out);
                let started = self.last_attack_started.unwrap_or(now);
                self.attack_phase = Some(AttackPhase::Recovering {
                    until: started.saturating_add(self.config.attack_cooldown),
                });
            }
            Some(AttackPhase::Recovering { until }) if now >= until => {
                self.attack_phase = None;
                // Sensing on the next tick decides whether the chase is
                // still warranted.
                self.state = AgentState::Chasing;
            }
            _ => {}
        }
    }

    fn launch_projectile(&mut self, player: Vec3, out: &mut Vec<Event>) {
        let origin = self.position + Vec3::Y * self.config.muzzle_height;
        let target = player + Vec3::Y * AIM_HEIGHT_OFFSET;
        let velocity = solve_ballistic_velocity(
            origin,
            target,
            self.config.gravity,
            self.config.launch_angle_deg.to_radians(),
        );
        out.push(Event::ProjectileLaunched {
            agent: self.id,
            origin,
            velocity,
        });
    }

    fn patrol(&mut self, dt: Duration, now: Duration, areas: &AreaManager, out: &mut Vec<Event>) {
        if let Some(until) = self.dwell_until {
            self.set_walking(false, out);
            if now >= until {
                self.dwell_until = None;
                self.pick_patrol_target(areas);
            }
            return;
        }

        self.check_stuck(now, areas);

        let remaining = horizontal_distance(self.position, self.patrol_target);
        if remaining > ARRIVAL_TOLERANCE {
            let target = areas.clamp_to_nearest(self.patrol_target);
            self.move_towards(target, self.config.patrol_speed, dt, out);
        } else {
            self.set_walking(false, out);
            self.dwell_until = Some(now.saturating_add(self.config.patrol_dwell));
        }
    }

    fn check_stuck(&mut self, now: Duration, areas: &AreaManager) {
        if now < self.next_stuck_check {
            return;
        }
        if self.position.distance(self.stuck_anchor) < self.config.min_move_distance {
            self.retarget(now, areas);
        }
        self.stuck_anchor = self.position;
        self.next_stuck_check = now.saturating_add(self.config.stuck_check_interval);
    }

    fn retarget(&mut self, now: Duration, areas: &AreaManager) {
        if let Some(last) = self.last_retarget {
            if now < last.saturating_add(self.config.retarget_cooldown) {
                return;
            }
        }
        self.pick_patrol_target(areas);
        self.dwell_until = None;
        self.last_retarget = Some(now);
        self.stuck_anchor = self.position;
        self.next_stuck_check = now.saturating_add(self.config.stuck_check_interval);
    }

    fn pick_patrol_target(&mut self, areas: &AreaManager) {
        // Uniform point in the patrol disc around the spawn origin.
        let radius = self.config.patrol_radius * self.rng.next_unit().sqrt();
        let angle = self.rng.next_unit() * TAU;
        let candidate =
            self.spawn_origin + Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
        self.patrol_target = areas.clamp_to_nearest(candidate);
    }

    fn move_towards(&mut self, target: Vec3, speed: f32, dt: Duration, out: &mut Vec<Event>) {
        self.set_walking(true, out);
        let step = speed * dt.as_secs_f32();
        let delta = target - self.position;
        if delta.length() <= step {
            self.position = target;
        } else {
            self.position += delta.normalize_or_zero() * step;
        }
    }

    fn set_walking(&mut self, walking: bool, out: &mut Vec<Event>) {
        if self.walking != walking {
            self.walking = walking;
            out.push(Event::WalkingChanged {
                agent: self.id,
                walking,
            });
        }
    }
}

/// Solves the initial velocity that carries a projectile from `origin` to
/// `target` along a ballistic arc launched at `angle_rad` above the horizon.
///
/// When the target sits above the apex reachable at that angle the
/// discriminant goes non-positive; a straight diagonal fallback shot is
/// returned instead so no NaN ever reaches the physics collaborator.
#[must_use]
pub fn solve_ballistic_velocity(origin: Vec3, target: Vec3, gravity: f32, angle_rad: f32) -> Vec3 {
    let mut offset = target - origin;
    let height = offset.y;
    offset.y = 0.0;
    let distance = offset.length();
    let direction = offset.normalize_or_zero();

    let term = distance * angle_rad.tan() - height;
    if term <= BALLISTIC_EPSILON || direction == Vec3::ZERO {
        return (direction + Vec3::Y).normalize() * FALLBACK_LAUNCH_SPEED;
    }

    let cos = angle_rad.cos();
    let speed = (gravity * distance * distance / (2.0 * cos * cos * term)).sqrt();
    direction * speed * cos + Vec3::Y * speed * angle_rad.sin()
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let delta = b - a;
    (delta.x * delta.x + delta.z * delta.z).sqrt()
}

fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped > TAU / 2.0 {
        wrapped -= TAU;
    } else if wrapped < -TAU / 2.0 {
        wrapped += TAU;
    }
    wrapped
}

#[derive(Debug)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed };
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn next_unit(&mut self) -> f32 {
        const SCALE: f32 = 1.0 / ((1u32 << 24) as f32);
        let value = self.next_u64() >> 40;
        (value as f32) * SCALE
    }
}
