//! Event logging and the end-of-run summary.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use savannah_gameplay::{ChargerState, GameEvent, SessionSnapshot};

/// Counters accumulated from the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// FSM transitions
    pub state_changes: u64,
    /// Attacks launched by chargers
    pub charges_launched: u64,
    /// Damage events (any defender)
    pub hits: u64,
    /// Knockbacks applied
    pub knockbacks: u64,
    /// Charger deaths
    pub charger_deaths: u64,
    /// Player deaths
    pub player_deaths: u64,
    /// Player respawns
    pub respawns: u64,
    /// Region resets
    pub region_resets: u64,
    /// Checkpoints reached
    pub checkpoints: u64,
    /// Props broken
    pub props_broken: u64,
    /// Potions dropped by props
    pub potions_dropped: u64,
    /// Potions picked up
    pub potions_collected: u64,
    /// Potions drunk
    pub potions_used: u64,
    /// Dodge dashes
    pub dashes: u64,
    /// Player hitboxes spawned
    pub player_attacks: u64,
}

impl RunSummary {
    /// Counts one event.
    pub fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::StateChanged { to, .. } => {
                self.state_changes += 1;
                if *to == ChargerState::Attacking {
                    self.charges_launched += 1;
                }
            },
            GameEvent::Damaged { .. } => self.hits += 1,
            GameEvent::KnockedBack { .. } => self.knockbacks += 1,
            GameEvent::Died { .. } => self.charger_deaths += 1,
            GameEvent::Despawned { .. } => {},
            GameEvent::PlayerDied { .. } => self.player_deaths += 1,
            GameEvent::PlayerRespawned { .. } => self.respawns += 1,
            GameEvent::RegionReset { .. } => self.region_resets += 1,
            GameEvent::CheckpointReached { .. } => self.checkpoints += 1,
            GameEvent::PropBroken { .. } => self.props_broken += 1,
            GameEvent::PotionDropped { .. } => self.potions_dropped += 1,
            GameEvent::PotionCollected { .. } => self.potions_collected += 1,
            GameEvent::PotionUsed { .. } => self.potions_used += 1,
            GameEvent::Dashed { .. } => self.dashes += 1,
            GameEvent::HitboxSpawned { .. } => self.player_attacks += 1,
        }
    }
}

/// Final report printed as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Event counters
    pub summary: RunSummary,
    /// Session state at the end of the run
    pub final_state: SessionSnapshot,
}

/// Logs one event at a level matching its weight.
pub fn log_event(event: &GameEvent) {
    match event {
        GameEvent::StateChanged { actor, from, to } => debug!("{actor}: {from:?} -> {to:?}"),
        GameEvent::Damaged {
            target,
            amount,
            remaining,
            ..
        } => debug!("{target} took {amount} damage ({remaining} left)"),
        GameEvent::KnockedBack { target, direction } => debug!("{target} knocked back {direction}"),
        GameEvent::Died { actor, region } => match region {
            Some(region) => info!("{actor} defeated in {region}"),
            None => info!("{actor} defeated"),
        },
        GameEvent::Despawned { actor } => debug!("{actor} despawned"),
        GameEvent::PlayerDied { player } => info!("{player} died"),
        GameEvent::PlayerRespawned {
            player,
            position,
            region,
        } => info!("{player} respawned at {position} in {region}"),
        GameEvent::RegionReset { region, actors } => match region {
            Some(region) => info!("{region} reset ({actors} actors)"),
            None => info!("global reset ({actors} actors)"),
        },
        GameEvent::CheckpointReached { region, position } => {
            info!("checkpoint {position} reached in {region}");
        },
        GameEvent::PropBroken { prop, drops_potion } => {
            info!("{prop} broken (potion: {drops_potion})");
        },
        GameEvent::PotionDropped { potion, position } => debug!("{potion} dropped at {position}"),
        GameEvent::PotionCollected {
            player,
            potion,
            carried,
        } => info!("{player} picked up {potion} ({carried} carried)"),
        GameEvent::PotionUsed {
            player,
            healed,
            carried,
        } => info!("{player} drank a potion (+{healed}, {carried} left)"),
        GameEvent::Dashed { player, direction } => debug!("{player} dashed {direction}"),
        GameEvent::HitboxSpawned {
            owner,
            damage,
            center,
        } => debug!("{owner} swings for {damage} at {center}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savannah_common::{ActorId, RegionKey, Vec2};

    #[test]
    fn test_summary_counts_events() {
        let actor = ActorId::new();
        let mut summary = RunSummary::default();

        let events = [
            GameEvent::StateChanged {
                actor,
                from: ChargerState::Charging,
                to: ChargerState::Attacking,
            },
            GameEvent::Died {
                actor,
                region: Some(RegionKey::new("Savannah")),
            },
            GameEvent::PropBroken {
                prop: ActorId::new(),
                drops_potion: true,
            },
            GameEvent::PotionDropped {
                potion: ActorId::new(),
                position: Vec2::ZERO,
            },
            GameEvent::PotionUsed {
                player: actor,
                healed: 40.0,
                carried: 0,
            },
            GameEvent::PlayerRespawned {
                player: ActorId::new(),
                position: Vec2::ZERO,
                region: RegionKey::new("Savannah"),
            },
        ];
        for event in &events {
            summary.record(event);
            log_event(event);
        }

        assert_eq!(summary.state_changes, 1);
        assert_eq!(summary.charges_launched, 1);
        assert_eq!(summary.charger_deaths, 1);
        assert_eq!(summary.props_broken, 1);
        assert_eq!(summary.potions_dropped, 1);
        assert_eq!(summary.potions_used, 1);
        assert_eq!(summary.respawns, 1);
        assert_eq!(summary.hits, 0);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = RunReport {
            summary: RunSummary {
                hits: 3,
                ..RunSummary::default()
            },
            final_state: savannah_gameplay::GameSession::new(
                savannah_gameplay::SessionConfig::default(),
                Vec2::ZERO,
            )
            .snapshot(),
        };
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["summary"]["hits"], 3);
        assert_eq!(json["final_state"]["current_region"], "Savannah");
    }
}
