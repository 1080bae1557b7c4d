//! Tunable combat profiles.
//!
//! Profiles are plain serde structs with defaults matching the shipped
//! balance. They can be authored as RON files and are validated on load.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use savannah_common::Vec2;

/// Errors raised while loading or validating a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile file could not be read
    #[error("failed to read profile {path}: {source}")]
    Read {
        /// Path that failed
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// RON parse failure
    #[error("failed to parse profile RON: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A tunable is out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

fn require_positive(field: &'static str, value: f32) -> ProfileResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProfileError::Invalid {
            field,
            reason: "must be a positive number",
        })
    }
}

fn require_non_negative(field: &'static str, value: f32) -> ProfileResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ProfileError::Invalid {
            field,
            reason: "must be zero or greater",
        })
    }
}

fn read_profile(path: &Path) -> ProfileResult<String> {
    std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Tunables for a Crimson Charger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargerProfile {
    /// Starting and maximum health
    pub health: f32,
    /// Damage dealt to the player on a landed charge
    pub damage: f32,
    /// Wind-up before the charge launches (seconds)
    pub charge_time: f32,
    /// Time spent stunned after a contact (seconds)
    pub stun_time: f32,
    /// Impulse applied when knocked back
    pub knockback_force: f32,
    /// Knockback cooldown; further knockbacks are ignored meanwhile (seconds)
    pub knockback_duration: f32,
    /// Roaming speed of the pathfinding driver
    pub move_speed: f32,
    /// Give-up time for a charge that hits nothing (seconds)
    pub attack_duration: f32,
    /// Dash speed while attacking
    pub attack_speed: f32,
    /// Player detection radius
    pub detection_range: f32,
    /// Time between roam heading changes (seconds)
    pub roam_interval: f32,
    /// Half-extents of the contact rectangle used while attacking
    pub attack_half_extents: Vec2,
    /// Damage each side takes when two chargers collide
    pub peer_clash_damage: f32,
    /// Delay before the initiating charger receives its own clash knockback
    pub peer_knockback_delay: f32,
    /// Delay after a whiffed charge before the driver is re-enabled
    pub recovery_time: f32,
    /// Time between death and removal from the world (seconds)
    pub despawn_delay: f32,
    /// Half-extents of the charger's own collider
    pub body_half_extents: Vec2,
}

impl Default for ChargerProfile {
    fn default() -> Self {
        Self {
            health: 5.0,
            damage: 1.0,
            charge_time: 2.0,
            stun_time: 2.0,
            knockback_force: 5.0,
            knockback_duration: 0.5,
            move_speed: 2.0,
            attack_duration: 2.0,
            attack_speed: 10.0,
            detection_range: 5.0,
            roam_interval: 2.0,
            attack_half_extents: Vec2::new(2.0, 1.5),
            peer_clash_damage: 1.0,
            peer_knockback_delay: 0.1,
            recovery_time: 0.5,
            despawn_delay: 2.0,
            body_half_extents: Vec2::splat(0.4),
        }
    }
}

impl ChargerProfile {
    /// Parses and validates a profile from RON text.
    pub fn from_ron(text: &str) -> ProfileResult<Self> {
        let profile: Self = ron::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads and validates a profile from a RON file.
    pub fn load(path: &Path) -> ProfileResult<Self> {
        Self::from_ron(&read_profile(path)?)
    }

    /// Checks every tunable is in range.
    pub fn validate(&self) -> ProfileResult<()> {
        require_positive("health", self.health)?;
        require_non_negative("damage", self.damage)?;
        require_non_negative("charge_time", self.charge_time)?;
        require_non_negative("stun_time", self.stun_time)?;
        require_non_negative("knockback_force", self.knockback_force)?;
        require_non_negative("knockback_duration", self.knockback_duration)?;
        require_non_negative("move_speed", self.move_speed)?;
        require_positive("attack_duration", self.attack_duration)?;
        require_non_negative("attack_speed", self.attack_speed)?;
        require_non_negative("detection_range", self.detection_range)?;
        require_positive("roam_interval", self.roam_interval)?;
        require_non_negative("attack_half_extents.x", self.attack_half_extents.x)?;
        require_non_negative("attack_half_extents.y", self.attack_half_extents.y)?;
        require_non_negative("peer_clash_damage", self.peer_clash_damage)?;
        require_non_negative("peer_knockback_delay", self.peer_knockback_delay)?;
        require_non_negative("recovery_time", self.recovery_time)?;
        require_non_negative("despawn_delay", self.despawn_delay)?;
        require_positive("body_half_extents.x", self.body_half_extents.x)?;
        require_positive("body_half_extents.y", self.body_half_extents.y)?;
        Ok(())
    }
}

/// Tunables for the player combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    /// Maximum health
    pub max_health: f32,
    /// Impulse applied when knocked back
    pub knockback_force: f32,
    /// Knockback duration; attacks are refused meanwhile (seconds)
    pub knockback_duration: f32,
    /// Walking speed
    pub move_speed: f32,
    /// Time after an attack during which the combo continues (seconds)
    pub combo_window: f32,
    /// Damage of the first two hits of a combo
    pub basic_damage: f32,
    /// Damage of the third hit of a combo
    pub finisher_damage: f32,
    /// Dash distance of a light attack
    pub attack_dash_distance: f32,
    /// Dash multiplier of the finisher
    pub finisher_dash_multiplier: f32,
    /// Lock time of a light attack (seconds)
    pub light_attack_duration: f32,
    /// Damage of a released heavy attack
    pub heavy_damage: f32,
    /// Hold time required for a heavy attack (seconds)
    pub heavy_charge_time: f32,
    /// Dash distance of a heavy attack
    pub heavy_dash_distance: f32,
    /// Lock time of a heavy attack (seconds)
    pub heavy_attack_duration: f32,
    /// Full size of a spawned hitbox
    pub attack_size: Vec2,
    /// Time the hitbox takes to sweep along the dash (seconds)
    pub hitbox_sweep_time: f32,
    /// Lifetime of a spawned hitbox (seconds)
    pub hitbox_lifetime: f32,
    /// Half-extents of the player's collider
    pub body_half_extents: Vec2,
    /// Velocity of a dodge dash
    pub dash_speed: f32,
    /// Length of a dodge dash (seconds)
    pub dash_duration: f32,
    /// Time from the start of a dash until the next one is allowed (seconds)
    pub dash_cooldown: f32,
    /// Potions the player can carry
    pub max_potions: u8,
    /// Reach of a potion pickup
    pub potion_pickup_radius: f32,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            knockback_force: 10.0,
            knockback_duration: 1.0,
            move_speed: 5.0,
            combo_window: 0.5,
            basic_damage: 1.0,
            finisher_damage: 2.0,
            attack_dash_distance: 2.0,
            finisher_dash_multiplier: 3.0,
            light_attack_duration: 0.5,
            heavy_damage: 5.0,
            heavy_charge_time: 2.0,
            heavy_dash_distance: 3.0,
            heavy_attack_duration: 0.6,
            attack_size: Vec2::new(1.5, 1.0),
            hitbox_sweep_time: 0.2,
            hitbox_lifetime: 1.0,
            body_half_extents: Vec2::splat(0.4),
            dash_speed: 20.0,
            dash_duration: 0.2,
            dash_cooldown: 1.0,
            max_potions: 3,
            potion_pickup_radius: 2.0,
        }
    }
}

impl PlayerProfile {
    /// Parses and validates a profile from RON text.
    pub fn from_ron(text: &str) -> ProfileResult<Self> {
        let profile: Self = ron::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads and validates a profile from a RON file.
    pub fn load(path: &Path) -> ProfileResult<Self> {
        Self::from_ron(&read_profile(path)?)
    }

    /// Checks every tunable is in range.
    pub fn validate(&self) -> ProfileResult<()> {
        require_positive("max_health", self.max_health)?;
        require_non_negative("knockback_force", self.knockback_force)?;
        require_non_negative("knockback_duration", self.knockback_duration)?;
        require_non_negative("move_speed", self.move_speed)?;
        require_non_negative("combo_window", self.combo_window)?;
        require_non_negative("basic_damage", self.basic_damage)?;
        require_non_negative("finisher_damage", self.finisher_damage)?;
        require_non_negative("heavy_damage", self.heavy_damage)?;
        require_non_negative("heavy_charge_time", self.heavy_charge_time)?;
        require_non_negative("light_attack_duration", self.light_attack_duration)?;
        require_non_negative("heavy_attack_duration", self.heavy_attack_duration)?;
        require_positive("attack_size.x", self.attack_size.x)?;
        require_positive("attack_size.y", self.attack_size.y)?;
        require_non_negative("hitbox_sweep_time", self.hitbox_sweep_time)?;
        require_positive("hitbox_lifetime", self.hitbox_lifetime)?;
        require_positive("body_half_extents.x", self.body_half_extents.x)?;
        require_positive("body_half_extents.y", self.body_half_extents.y)?;
        require_non_negative("dash_speed", self.dash_speed)?;
        require_positive("dash_duration", self.dash_duration)?;
        require_non_negative("dash_cooldown", self.dash_cooldown)?;
        require_non_negative("potion_pickup_radius", self.potion_pickup_radius)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ChargerProfile::default().validate().is_ok());
        assert!(PlayerProfile::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let profile = ChargerProfile::from_ron("(health: 8.0, charge_time: 1.5)");
        let profile = match profile {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(profile.health, 8.0);
        assert_eq!(profile.charge_time, 1.5);
        assert_eq!(profile.damage, 1.0);
        assert_eq!(profile.attack_half_extents, Vec2::new(2.0, 1.5));
    }

    #[test]
    fn test_invalid_health_rejected() {
        let result = ChargerProfile::from_ron("(health: 0.0)");
        assert!(matches!(
            result,
            Err(ProfileError::Invalid { field: "health", .. })
        ));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            PlayerProfile::from_ron("not ron at all {"),
            Err(ProfileError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = PlayerProfile::load(Path::new("/nonexistent/player.ron"));
        assert!(matches!(result, Err(ProfileError::Read { .. })));
    }

    #[test]
    fn test_player_ron_keeps_dash_and_potion_defaults() {
        let profile = match PlayerProfile::from_ron("(max_health: 50.0, max_potions: 5)") {
            Ok(p) => p,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(profile.max_potions, 5);
        assert_eq!(profile.dash_speed, 20.0);
        assert_eq!(profile.dash_cooldown, 1.0);
        assert!(matches!(
            PlayerProfile::from_ron("(dash_duration: 0.0)"),
            Err(ProfileError::Invalid { field: "dash_duration", .. })
        ));
    }
}
