#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduling for the encounter.
//!
//! The [`RoundDirector`] sequences waves from a scripted list or an endless
//! growth formula, asks the spawner for `kill_quota + buffer` agents per
//! wave, tracks kill progress, runs the between-wave upgrade interlude, and
//! declares victory when a scripted list is exhausted. Spawn shortfalls are
//! credited as kills immediately, so a wave can always be completed with
//! the agents that actually exist.

use std::time::Duration;

use glam::Vec3;
use sha2::{Digest, Sha256};
use snowbound_arena::AreaManager;
use snowbound_core::{DirectorConfig, Event, VoiceLine, WaveMode};
use snowbound_system_spawning::Spawner;

/// Lifecycle of the round director.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirectorState {
    /// Created but not yet started.
    Waiting,
    /// Placing the next wave's agents.
    Spawning,
    /// A wave is live; kills count toward the quota.
    Fighting,
    /// Quota met; waiting for the upgrade interlude to finish.
    UpgradePhase,
    /// Terminal. The final scripted wave was cleared.
    Victory,
}

/// Progress snapshot of the wave currently in play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveWave {
    name: String,
    kill_quota: u32,
    spawn_count: u32,
    remaining: u32,
}

impl ActiveWave {
    /// Display name of the wave.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kills required to clear the wave.
    #[must_use]
    pub const fn kill_quota(&self) -> u32 {
        self.kill_quota
    }

    /// Agents requested from the spawner for this wave.
    #[must_use]
    pub const fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    /// Kills still outstanding.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Sequences waves, tracks quotas, and drives the spawner between them.
#[derive(Debug)]
pub struct RoundDirector {
    config: DirectorConfig,
    state: DirectorState,
    next_wave_index: u32,
    wave: Option<ActiveWave>,
}

impl RoundDirector {
    /// Creates a director that waits for [`Self::start`].
    #[must_use]
    pub const fn new(config: DirectorConfig) -> Self {
        Self {
            config,
            state: DirectorState::Waiting,
            next_wave_index: 0,
            wave: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DirectorState {
        self.state
    }

    /// The wave currently in play, if any.
    #[must_use]
    pub fn wave(&self) -> Option<&ActiveWave> {
        self.wave.as_ref()
    }

    /// Whether the encounter has been won.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == DirectorState::Victory
    }

    /// Begins the encounter and spawns the first wave.
    ///
    /// Calling this in any state other than [`DirectorState::Waiting`] is
    /// ignored.
    pub fn start(
        &mut self,
        spawner: &mut Spawner,
        areas: &AreaManager,
        player: Vec3,
        now: Duration,
        out: &mut Vec<Event>,
    ) {
        if self.state != DirectorState::Waiting {
            log::warn!("start ignored in state {:?}", self.state);
            return;
        }
        out.push(Event::VoiceLineRequested {
            line: VoiceLine::EncounterStarted,
        });
        self.advance(spawner, areas, player, now, out);
    }

    /// Records one enemy kill.
    ///
    /// Ignored outside [`DirectorState::Fighting`], so stray death reports
    /// from lingering corpses or cleared buffer agents never corrupt the
    /// next wave's count. Meeting the quota destroys the surviving buffer
    /// agents and either opens the upgrade interlude or, when the interlude
    /// is disabled, starts the next wave immediately.
    pub fn on_enemy_killed(
        &mut self,
        spawner: &mut Spawner,
        areas: &AreaManager,
        player: Vec3,
        now: Duration,
        out: &mut Vec<Event>,
    ) {
        if self.state != DirectorState::Fighting {
            return;
        }
        let Some(wave) = self.wave.as_mut() else {
            return;
        };
        wave.remaining = wave.remaining.saturating_sub(1);
        out.push(Event::HudUpdated {
            wave_name: wave.name.clone(),
            remaining_kills: wave.remaining,
        });
        if wave.remaining == 0 {
            self.complete_wave(spawner, areas, player, now, out);
        }
    }

    /// Closes the upgrade interlude and starts the next wave.
    ///
    /// Ignored outside [`DirectorState::UpgradePhase`].
    pub fn finish_upgrade(
        &mut self,
        spawner: &mut Spawner,
        areas: &AreaManager,
        player: Vec3,
        now: Duration,
        out: &mut Vec<Event>,
    ) {
        if self.state != DirectorState::UpgradePhase {
            log::warn!("finish_upgrade ignored in state {:?}", self.state);
            return;
        }
        out.push(Event::UpgradePanelHidden);
        self.advance(spawner, areas, player, now, out);
    }

    fn complete_wave(
        &mut self,
        spawner: &mut Spawner,
        areas: &AreaManager,
        player: Vec3,
        now: Duration,
        out: &mut Vec<Event>,
    ) {
        spawner.clear_all(out);
        if self.scripted_exhausted() {
            self.declare_victory(out);
        } else if self.config.upgrade_interlude {
            self.state = DirectorState::UpgradePhase;
            self.wave = None;
            out.push(Event::UpgradePanelShown);
        } else {
            self.advance(spawner, areas, player, now, out);
        }
    }

    /// Plans, seeds, and spawns the next wave.
    ///
    /// Exactly one spawn cycle per call. A wave that self-completes on the
    /// spot (zero planned quota, or the whole quota met by shortfall
    /// credits) parks the director in the upgrade phase regardless of the
    /// interlude flag, so a degenerate config or an arena with almost no
    /// spawn room can never spin the director through empty waves forever.
    fn advance(
        &mut self,
        spawner: &mut Spawner,
        areas: &AreaManager,
        player: Vec3,
        now: Duration,
        out: &mut Vec<Event>,
    ) {
        let Some((name, kill_quota)) = self.plan_next_wave() else {
            self.declare_victory(out);
            return;
        };
        self.state = DirectorState::Spawning;
        let index = self.next_wave_index;
        self.next_wave_index += 1;

        let spawn_count = kill_quota + self.config.buffer_count;
        spawner.reseed(derive_wave_seed(self.config.global_seed, index));
        let outcome = spawner.spawn_enemies(spawn_count, now, areas, player, out);

        let remaining = kill_quota.saturating_sub(outcome.shortfall);
        self.wave = Some(ActiveWave {
            name: name.clone(),
            kill_quota,
            spawn_count,
            remaining,
        });
        self.state = DirectorState::Fighting;
        out.push(Event::HudUpdated {
            wave_name: name,
            remaining_kills: remaining,
        });

        if remaining > 0 {
            return;
        }
        // Nothing left to kill; the wave is already over.
        spawner.clear_all(out);
        if self.scripted_exhausted() {
            self.declare_victory(out);
            return;
        }
        log::error!(
            "wave {index} completed with no possible kills; holding in the upgrade phase"
        );
        self.state = DirectorState::UpgradePhase;
        self.wave = None;
        out.push(Event::UpgradePanelShown);
    }

    fn plan_next_wave(&self) -> Option<(String, u32)> {
        match &self.config.mode {
            WaveMode::Scripted(waves) => waves
                .get(self.next_wave_index as usize)
                .map(|plan| (plan.name.clone(), plan.kill_quota)),
            WaveMode::Endless {
                base_count,
                growth_factor,
            } => {
                let quota = endless_quota(*base_count, *growth_factor, self.next_wave_index);
                Some((
                    format!("Wave {} (Endless)", self.next_wave_index + 1),
                    quota,
                ))
            }
        }
    }

    fn scripted_exhausted(&self) -> bool {
        match &self.config.mode {
            WaveMode::Scripted(waves) => self.next_wave_index as usize >= waves.len(),
            WaveMode::Endless { .. } => false,
        }
    }

    fn declare_victory(&mut self, out: &mut Vec<Event>) {
        self.state = DirectorState::Victory;
        self.wave = None;
        out.push(Event::HudUpdated {
            wave_name: "Mission complete".to_owned(),
            remaining_kills: 0,
        });
        out.push(Event::VoiceLineRequested {
            line: VoiceLine::Victory,
        });
        out.push(Event::EncounterCompleted);
    }
}

/// Kill quota of endless wave `index`, counting from zero.
#[must_use]
pub fn endless_quota(base_count: u32, growth_factor: f32, index: u32) -> u32 {
    let raw = base_count as f32 + growth_factor * index as f32;
    if raw <= 0.0 {
        0
    } else {
        raw.floor() as u32
    }
}

fn derive_wave_seed(global_seed: u64, wave_index: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(wave_index.to_le_bytes());
    let digest = hasher.finalize();
    let bytes: [u8; 8] = digest[0..8].try_into().expect("sha256 digest slice length");
    u64::from_le_bytes(bytes)
}
