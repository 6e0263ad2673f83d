#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared contracts for the Snowbound encounter core.
//!
//! This crate defines the identifiers, agent states, configuration types,
//! and the one-way [`Event`] notification surface that connect the arena,
//! the agent simulation, the spawner, and the round director. Setup flows
//! downward through direct calls (director to spawner to agents to arena
//! queries); everything the presentation layer needs to know flows upward
//! as `Event` values appended to a per-tick output buffer. Nothing in this
//! crate performs I/O of its own.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier assigned to an enemy agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Behavioural state of a single enemy agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentState {
    /// Wandering toward random points near the spawn origin.
    Patrolling,
    /// Pursuing the player at chase speed, unconstrained by region bounds.
    Chasing,
    /// Halted, facing the player, winding up or recovering from an attack.
    Attacking,
    /// Removed from AI control; lingers briefly so death effects can play.
    Dead,
}

/// Voice lines the core may ask the audio collaborator to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceLine {
    /// Played once when the encounter begins.
    EncounterStarted,
    /// Played when an agent first spots the player, rate limited.
    EnemySpotted,
    /// Played once when the final wave is cleared.
    Victory,
}

/// One-way notifications emitted toward the excluded presentation layer.
///
/// Consumers may drop any of these without affecting simulation
/// correctness; none of them carries a reply channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Requests playback of a voice line.
    VoiceLineRequested {
        /// Line to play.
        line: VoiceLine,
    },
    /// Reports that an agent's walking animation flag changed.
    WalkingChanged {
        /// Agent whose flag changed.
        agent: AgentId,
        /// New value of the walking flag.
        walking: bool,
    },
    /// Requests that the attack animation be triggered for an agent.
    AttackStarted {
        /// Agent that began its attack wind-up.
        agent: AgentId,
    },
    /// Requests instantiation of a projectile with a solved velocity.
    ProjectileLaunched {
        /// Agent that launched the projectile.
        agent: AgentId,
        /// World-space origin of the projectile.
        origin: Vec3,
        /// Initial velocity following the ballistic arc.
        velocity: Vec3,
    },
    /// Confirms that an agent entered the simulation.
    AgentSpawned {
        /// Identifier assigned to the new agent.
        agent: AgentId,
        /// Validated spawn position.
        position: Vec3,
    },
    /// Confirms that an agent left the simulation.
    AgentRemoved {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Reports wave progress for the HUD collaborator.
    HudUpdated {
        /// Display name of the active wave.
        wave_name: String,
        /// Kills still required to finish the wave.
        remaining_kills: u32,
    },
    /// Requests that the upgrade selection panel be shown.
    UpgradePanelShown,
    /// Requests that the upgrade selection panel be hidden.
    UpgradePanelHidden,
    /// Terminal notification that the encounter was completed.
    EncounterCompleted,
}

/// Injected line-of-sight test between two world positions.
///
/// The obstacle configuration lives outside this core, so sight is probed
/// through this predicate rather than a physics engine.
pub trait Sightline {
    /// Returns `true` when the straight path from `from` to `to` is blocked.
    fn blocked(&self, from: Vec3, to: Vec3) -> bool;
}

/// Sightline implementation with no obstacles at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unobstructed;

impl Sightline for Unobstructed {
    fn blocked(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }
}

/// Rate limiter for repeatable voice lines.
///
/// Tracks the last simulated time a line fired and suppresses repeats
/// inside the configured window.
#[derive(Clone, Copy, Debug)]
pub struct VoiceGate {
    window: Duration,
    last_fired: Option<Duration>,
}

impl VoiceGate {
    /// Creates a gate that allows at most one firing per `window`.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// Attempts to fire at simulated time `now`.
    ///
    /// Returns `true` and arms the window when allowed, `false` while the
    /// window from the previous firing is still open.
    pub fn try_fire(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last_fired {
            if now < last.saturating_add(self.window) {
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }
}

/// Default window applied to the enemy-spotted voice line.
pub const SPOTTED_VOICE_WINDOW: Duration = Duration::from_secs(15);

/// Tunable parameters for a single enemy agent.
///
/// Defaults mirror the encounter's shipped tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Radius at which the player can be noticed.
    pub detection_range: f32,
    /// Maximum distance at which an attack may begin.
    pub attack_range: f32,
    /// Distance beyond which a chased player is abandoned.
    pub lose_range: f32,
    /// How long pursuit continues after sight is lost.
    pub memory_duration: Duration,
    /// Movement speed while patrolling, in units per second.
    pub patrol_speed: f32,
    /// Movement speed while chasing, in units per second.
    pub chase_speed: f32,
    /// Turn rate used for facing smoothing, in radians per second.
    pub rotation_speed: f32,
    /// Radius around the spawn origin for random patrol targets.
    pub patrol_radius: f32,
    /// Dwell time at a reached patrol target before picking a new one.
    pub patrol_dwell: Duration,
    /// Minimum simulated time between successive attacks.
    pub attack_cooldown: Duration,
    /// Delay between the attack animation starting and the projectile
    /// launching.
    pub attack_windup: Duration,
    /// Fixed projectile launch angle in degrees above the horizon.
    pub launch_angle_deg: f32,
    /// Height of the projectile origin above the agent position.
    pub muzzle_height: f32,
    /// Gravity magnitude used by the ballistic solve.
    pub gravity: f32,
    /// Interval between anti-stuck position checks while patrolling.
    pub stuck_check_interval: Duration,
    /// Minimum distance the agent must cover per stuck check.
    pub min_move_distance: f32,
    /// Cooldown between forced patrol retargets.
    pub retarget_cooldown: Duration,
    /// Health pool granted at spawn.
    pub initial_health: f32,
    /// How long a dead agent lingers before removal, for death effects.
    pub death_linger: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            detection_range: 10.0,
            attack_range: 7.0,
            lose_range: 25.0,
            memory_duration: Duration::from_secs(3),
            patrol_speed: 2.0,
            chase_speed: 5.0,
            rotation_speed: 15.0,
            patrol_radius: 10.0,
            patrol_dwell: Duration::from_secs(2),
            attack_cooldown: Duration::from_secs(2),
            attack_windup: Duration::from_millis(300),
            launch_angle_deg: 25.0,
            muzzle_height: 1.0,
            gravity: 9.81,
            stuck_check_interval: Duration::from_millis(500),
            min_move_distance: 0.1,
            retarget_cooldown: Duration::from_secs(1),
            initial_health: 100.0,
            death_linger: Duration::from_millis(2_500),
        }
    }
}

impl AgentConfig {
    /// Validates the configuration up front.
    ///
    /// Runtime code never calls this; the simulation degrades gracefully
    /// on odd values. Embedders validate user-supplied tuning once at load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("detection_range", self.detection_range),
            ("attack_range", self.attack_range),
            ("lose_range", self.lose_range),
            ("patrol_speed", self.patrol_speed),
            ("chase_speed", self.chase_speed),
            ("patrol_radius", self.patrol_radius),
            ("gravity", self.gravity),
            ("initial_health", self.initial_health),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field });
            }
        }
        if self.detection_range > self.lose_range {
            return Err(ConfigError::DetectionExceedsLose {
                detection: self.detection_range,
                lose: self.lose_range,
            });
        }
        if !(self.launch_angle_deg > 0.0 && self.launch_angle_deg < 90.0) {
            return Err(ConfigError::LaunchAngleOutOfRange {
                angle: self.launch_angle_deg,
            });
        }
        Ok(())
    }
}

/// Tunable parameters for the spawner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    /// Minimum horizontal distance between a spawn point and the player.
    pub min_distance_from_player: f32,
    /// Minimum distance between spawn points accepted in one batch.
    pub min_distance_between_agents: f32,
    /// Names of regions eligible for spawning; empty means all regions.
    pub allowed_regions: Vec<String>,
    /// Seed for the deterministic placement generator.
    pub rng_seed: u64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            min_distance_from_player: 8.0,
            min_distance_between_agents: 3.0,
            allowed_regions: Vec::new(),
            rng_seed: 0x5eed_ba11_ca5c_ade5,
        }
    }
}

impl SpawnerConfig {
    /// Validates the configuration up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("min_distance_from_player", self.min_distance_from_player),
            (
                "min_distance_between_agents",
                self.min_distance_between_agents,
            ),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative { field });
            }
        }
        Ok(())
    }
}

/// Definition of one scripted wave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlan {
    /// Name shown on the HUD while the wave runs.
    pub name: String,
    /// Kills required to complete the wave.
    pub kill_quota: u32,
}

impl WavePlan {
    /// Creates a new wave plan.
    #[must_use]
    pub fn new(name: impl Into<String>, kill_quota: u32) -> Self {
        Self {
            name: name.into(),
            kill_quota,
        }
    }
}

/// Wave sequencing mode selected for an encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WaveMode {
    /// A finite, ordered list of waves; clearing the last one wins.
    Scripted(Vec<WavePlan>),
    /// Unbounded waves with a linear quota growth formula.
    Endless {
        /// Quota of the first wave.
        base_count: u32,
        /// Additional quota per wave index.
        growth_factor: f32,
    },
}

impl WaveMode {
    /// Validates the mode selection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Scripted(waves) if waves.is_empty() => Err(ConfigError::EmptyWaveList),
            Self::Endless { growth_factor, .. } if *growth_factor < 0.0 => {
                Err(ConfigError::Negative {
                    field: "growth_factor",
                })
            }
            _ => Ok(()),
        }
    }
}

/// Difficulty presets offered by the menu collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Short, gentle scripted ramp.
    Easy,
    /// Standard scripted ramp.
    Normal,
    /// Long, punishing scripted ramp.
    Hard,
    /// Unbounded waves that grow forever.
    Endless,
}

impl Difficulty {
    /// Resolves the preset into a concrete wave mode.
    #[must_use]
    pub fn wave_mode(self) -> WaveMode {
        match self {
            Self::Easy => WaveMode::Scripted(vec![
                WavePlan::new("Wave 1", 3),
                WavePlan::new("Wave 2", 5),
                WavePlan::new("Wave 3", 8),
            ]),
            Self::Normal => WaveMode::Scripted(vec![
                WavePlan::new("Wave 1", 4),
                WavePlan::new("Wave 2", 6),
                WavePlan::new("Wave 3", 9),
                WavePlan::new("Wave 4", 12),
            ]),
            Self::Hard => WaveMode::Scripted(vec![
                WavePlan::new("Wave 1", 6),
                WavePlan::new("Wave 2", 9),
                WavePlan::new("Wave 3", 13),
                WavePlan::new("Wave 4", 18),
                WavePlan::new("Wave 5", 24),
            ]),
            Self::Endless => WaveMode::Endless {
                base_count: 5,
                growth_factor: 1.2,
            },
        }
    }
}

/// Tunable parameters for the round director.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectorConfig {
    /// Wave sequencing mode for the encounter.
    pub mode: WaveMode,
    /// Extra agents spawned beyond each wave's kill quota.
    pub buffer_count: u32,
    /// Seed from which per-wave placement seeds are derived.
    pub global_seed: u64,
    /// Whether an upgrade interlude is presented between waves. When
    /// `false` the next wave starts as soon as the quota is met.
    pub upgrade_interlude: bool,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            mode: Difficulty::Endless.wave_mode(),
            buffer_count: 2,
            global_seed: 0xd1f_f1c_0171,
            upgrade_interlude: true,
        }
    }
}

impl DirectorConfig {
    /// Validates the configuration up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mode.validate()
    }
}

/// Defects detectable in user-supplied configuration.
///
/// These surface only from explicit `validate` calls performed before an
/// encounter starts; the running simulation recovers from bad values
/// locally instead of failing.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A field that must be strictly positive was zero or negative.
    #[error("{field} must be positive")]
    NonPositive {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A field that must be non-negative was negative.
    #[error("{field} must not be negative")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Detection hysteresis would be inverted.
    #[error("detection range {detection} exceeds lose range {lose}")]
    DetectionExceedsLose {
        /// Configured detection radius.
        detection: f32,
        /// Configured lose radius.
        lose: f32,
    },
    /// The ballistic solve requires an angle strictly between 0 and 90.
    #[error("launch angle {angle} degrees outside the open interval (0, 90)")]
    LaunchAngleOutOfRange {
        /// Configured launch angle in degrees.
        angle: f32,
    },
    /// Scripted mode was selected without any waves.
    #[error("scripted mode requires at least one wave")]
    EmptyWaveList,
}
