#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic enemy placement and batch ownership.
//!
//! The [`Spawner`] finds valid, mutually separated, player-distant points
//! inside the allowed regions and instantiates one [`EnemyAgent`] per
//! accepted point. It owns the live batch: per-tick agent updates fan out
//! from here, inbound damage and death signals are routed here, and the
//! whole batch can be force-despawned when a wave ends. Placement uses a
//! seeded linear congruential generator so a reseeded spawner replays the
//! same layout for the same arena and player snapshot.

use std::time::Duration;

use glam::Vec3;
use snowbound_arena::{AreaManager, Region};
use snowbound_core::{
    AgentConfig, AgentId, Event, Sightline, SpawnerConfig, VoiceGate, SPOTTED_VOICE_WINDOW,
};
use snowbound_system_agents::EnemyAgent;

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;

/// Sampling attempts allowed per requested agent before giving up.
const ATTEMPTS_PER_REQUEST: u32 = 20;

/// Result of one [`Spawner::spawn_enemies`] call.
///
/// `shortfall` counts requested agents for which no valid point was found;
/// the round director credits these as synthetic kills so a cramped arena
/// can never make a wave unwinnable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnOutcome {
    /// Number of agents actually instantiated.
    pub spawned: u32,
    /// Number of requested agents that could not be placed.
    pub shortfall: u32,
}

/// Places, owns, and ticks the current batch of enemy agents.
#[derive(Debug)]
pub struct Spawner {
    config: SpawnerConfig,
    agent_config: AgentConfig,
    rng_state: u64,
    agents: Vec<EnemyAgent>,
    next_id: u32,
    voice_gate: VoiceGate,
}

impl Spawner {
    /// Creates a spawner with the provided placement and agent tuning.
    #[must_use]
    pub fn new(config: SpawnerConfig, agent_config: AgentConfig) -> Self {
        let rng_state = config.rng_seed;
        Self {
            config,
            agent_config,
            rng_state,
            agents: Vec::new(),
            next_id: 0,
            voice_gate: VoiceGate::new(SPOTTED_VOICE_WINDOW),
        }
    }

    /// Replaces the placement RNG state, typically with a per-wave seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng_state = seed;
    }

    /// Agents currently tracked, dead-but-lingering ones included.
    #[must_use]
    pub fn agents(&self) -> &[EnemyAgent] {
        &self.agents
    }

    /// Number of tracked agents that are still alive.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|agent| !agent.is_dead()).count()
    }

    /// Places up to `count` agents inside the allowed regions.
    ///
    /// Candidates are sampled by picking an allowed region at random,
    /// drawing a uniform point in its horizontal bounding box, and keeping
    /// it only when the region itself confirms containment, the player is
    /// far enough away, and every previously accepted point in this batch
    /// keeps its separation distance. The attempt budget is bounded, so a
    /// region with too little room reports a shortfall instead of looping.
    pub fn spawn_enemies(
        &mut self,
        count: u32,
        now: Duration,
        areas: &AreaManager,
        player: Vec3,
        out: &mut Vec<Event>,
    ) -> SpawnOutcome {
        self.purge_despawned(now, out);

        let eligible: Vec<&Region> = areas
            .regions()
            .iter()
            .filter(|region| {
                region.is_active()
                    && !region.is_degenerate()
                    && (self.config.allowed_regions.is_empty()
                        || self
                            .config
                            .allowed_regions
                            .iter()
                            .any(|name| name == region.name()))
            })
            .collect();

        if eligible.is_empty() {
            log::warn!("no eligible spawn regions; reporting {count} placements as shortfall");
            return SpawnOutcome {
                spawned: 0,
                shortfall: count,
            };
        }

        let mut accepted: Vec<Vec3> = Vec::with_capacity(count as usize);
        let budget = count.saturating_mul(ATTEMPTS_PER_REQUEST);
        let mut attempts = 0;
        while accepted.len() < count as usize && attempts < budget {
            attempts += 1;
            let region = eligible[self.next_index(eligible.len())];
            let Some(candidate) = self.sample_in_region(region) else {
                continue;
            };
            if self.is_valid_placement(candidate, player, &accepted) {
                accepted.push(candidate);
            }
        }

        for position in &accepted {
            let id = AgentId::new(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            let seed = self.advance_rng();
            let agent = EnemyAgent::new(id, *position, self.agent_config.clone(), seed, now, areas);
            self.agents.push(agent);
            out.push(Event::AgentSpawned {
                agent: id,
                position: *position,
            });
        }

        let spawned = accepted.len() as u32;
        let shortfall = count - spawned;
        if shortfall > 0 {
            log::warn!(
                "placed {spawned} of {count} agents after {attempts} attempts; \
                 {shortfall} reported as shortfall"
            );
        }
        SpawnOutcome { spawned, shortfall }
    }

    /// Force-destroys every tracked agent, lingering corpses included.
    pub fn clear_all(&mut self, out: &mut Vec<Event>) {
        for agent in &self.agents {
            out.push(Event::AgentRemoved { agent: agent.id() });
        }
        self.agents.clear();
    }

    /// Advances every live agent by one fixed-rate tick.
    ///
    /// Corpses whose death linger has elapsed are removed first; all
    /// surviving agents then perceive the same `player` snapshot.
    pub fn tick(
        &mut self,
        dt: Duration,
        now: Duration,
        player: Vec3,
        sight: &dyn Sightline,
        areas: &AreaManager,
        out: &mut Vec<Event>,
    ) {
        self.purge_despawned(now, out);
        let Self {
            agents, voice_gate, ..
        } = self;
        for agent in agents.iter_mut() {
            agent.fixed_tick(dt, now, player, sight, areas, voice_gate, out);
        }
    }

    /// Smooths facing for every live agent at the presentation rate.
    pub fn orient_tick(&mut self, dt: Duration, player: Vec3) {
        for agent in &mut self.agents {
            agent.orient_tick(dt, player);
        }
    }

    /// Applies damage to one agent on behalf of the health collaborator.
    ///
    /// Returns `true` when the hit killed the agent. Signals addressed to
    /// agents that no longer exist are dropped silently.
    pub fn damage_agent(
        &mut self,
        id: AgentId,
        amount: f32,
        now: Duration,
        out: &mut Vec<Event>,
    ) -> bool {
        match self.agents.iter_mut().find(|agent| agent.id() == id) {
            Some(agent) => agent.take_damage(amount, now, out),
            None => false,
        }
    }

    /// Marks one agent dead on behalf of the health collaborator.
    ///
    /// Returns `true` when the agent existed and was not already dead, in
    /// which case the caller owes the director a kill notification.
    pub fn mark_dead(&mut self, id: AgentId, now: Duration, out: &mut Vec<Event>) -> bool {
        match self.agents.iter_mut().find(|agent| agent.id() == id) {
            Some(agent) => agent.mark_dead(now, out),
            None => false,
        }
    }

    fn purge_despawned(&mut self, now: Duration, out: &mut Vec<Event>) {
        let mut index = 0;
        while index < self.agents.len() {
            if self.agents[index].due_for_despawn(now) {
                let agent = self.agents.remove(index);
                out.push(Event::AgentRemoved { agent: agent.id() });
            } else {
                index += 1;
            }
        }
    }

    fn sample_in_region(&mut self, region: &Region) -> Option<Vec3> {
        let (min, max) = region.horizontal_bounds()?;
        let x = min.x + (max.x - min.x) * self.next_unit();
        let z = min.y + (max.y - min.y) * self.next_unit();
        // Place on the vertical midline of the region's band, clamped so a
        // lopsided band still yields a containable height.
        let y = region
            .centroid()
            .y
            .clamp(region.min_height(), region.max_height());
        let candidate = Vec3::new(x, y, z);
        region.contains(candidate).then_some(candidate)
    }

    fn is_valid_placement(&self, candidate: Vec3, player: Vec3, accepted: &[Vec3]) -> bool {
        if horizontal_distance(candidate, player) < self.config.min_distance_from_player {
            return false;
        }
        accepted
            .iter()
            .all(|existing| candidate.distance(*existing) >= self.config.min_distance_between_agents)
    }

    fn advance_rng(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        self.rng_state
    }

    fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "next_index requires candidates");
        let value = self.advance_rng();
        (value % len as u64) as usize
    }

    fn next_unit(&mut self) -> f32 {
        const SCALE: f32 = 1.0 / ((1u32 << 24) as f32);
        let value = self.advance_rng() >> 40;
        (value as f32) * SCALE
    }
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let delta = b - a;
    (delta.x * delta.x + delta.z * delta.z).sqrt()
}
