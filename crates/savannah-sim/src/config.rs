//! Simulation configuration.
//!
//! Describes the timing, tunables and scenario layout of a headless run.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use savannah_common::{RegionKey, SavannahError, SavannahResult, Vec2};
use savannah_gameplay::{
    Aabb, Breakable, ChargerProfile, GameSession, PlayerProfile, RegionTrigger, SessionConfig,
    DEFAULT_RESPAWN_DELAY, DEFAULT_START_REGION,
};

/// Configuration file name.
const CONFIG_FILE: &str = "savannah.toml";

/// Environment variable overriding the configuration path.
const CONFIG_ENV: &str = "SAVANNAH_CONFIG";

/// Leading comment of a saved scenario file.
const SCENARIO_HEADER: &str =
    "# Savannah combat sim scenario. Omitted keys take their built-in values.\n\n";

/// An axis-aligned box given by center and half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSetup {
    /// Box center
    pub center: Vec2,
    /// Half width and half height
    pub half_extents: Vec2,
}

impl BoxSetup {
    fn aabb(&self) -> Aabb {
        Aabb::from_center(self.center, self.half_extents)
    }
}

/// A breakable prop placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropSetup {
    /// Prop position
    pub position: Vec2,
    /// Whether breaking it drops a potion
    #[serde(default)]
    pub drops_potion: bool,
    /// Hits needed to break it
    #[serde(default = "default_prop_hit_points")]
    pub hit_points: i32,
}

fn default_prop_hit_points() -> i32 {
    1
}

/// One region of the scenario and everything placed in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSetup {
    /// Region name
    pub name: String,
    /// Checkpoint position (defaults to the trigger center)
    #[serde(default)]
    pub checkpoint: Option<Vec2>,
    /// Charger spawn points
    #[serde(default)]
    pub chargers: Vec<Vec2>,
    /// Entry volume that records the region's checkpoint
    #[serde(default)]
    pub trigger: Option<BoxSetup>,
    /// Static obstacles
    #[serde(default)]
    pub obstacles: Vec<BoxSetup>,
    /// Gaps and ledges
    #[serde(default)]
    pub gaps: Vec<BoxSetup>,
    /// Breakable props
    #[serde(default)]
    pub props: Vec<PropSetup>,
}

/// Headless simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Fixed ticks per simulated second
    pub tick_rate: u32,
    /// Simulated seconds to run
    pub duration: f32,
    /// Seed for charger roaming
    pub seed: u64,
    /// Delay between player death and respawn (seconds)
    pub respawn_delay: f32,

    // === Tunables ===
    /// RON file with charger tunables (None = built-in defaults)
    pub charger_profile: Option<PathBuf>,
    /// RON file with player tunables (None = built-in defaults)
    pub player_profile: Option<PathBuf>,

    // === Player Script ===
    /// Where the player starts; also the first respawn point
    pub player_start: Vec2,
    /// Points the player walks through in order
    pub waypoints: Vec<Vec2>,
    /// Seconds between scripted light attacks (0 = never attack)
    pub attack_interval: f32,
    /// Reach within which the script attacks a charger
    pub attack_reach: f32,

    // === Scenario ===
    /// Region the player starts in
    pub start_region: String,
    /// Regions and their contents
    pub regions: Vec<RegionSetup>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_rate: 60,
            duration: 30.0,
            seed: 0x5A7A_4E4E,
            respawn_delay: DEFAULT_RESPAWN_DELAY,

            // Tunables
            charger_profile: None,
            player_profile: None,

            // Player script
            player_start: Vec2::ZERO,
            waypoints: vec![Vec2::new(6.0, 0.0), Vec2::new(6.0, 4.0), Vec2::new(22.0, 4.0)],
            attack_interval: 0.6,
            attack_reach: 2.5,

            // Scenario
            start_region: DEFAULT_START_REGION.to_string(),
            regions: vec![
                RegionSetup {
                    name: DEFAULT_START_REGION.to_string(),
                    trigger: None,
                    checkpoint: None,
                    chargers: vec![Vec2::new(8.0, 1.0), Vec2::new(10.0, -2.0)],
                    obstacles: vec![BoxSetup {
                        center: Vec2::new(12.0, 0.0),
                        half_extents: Vec2::new(0.5, 3.0),
                    }],
                    gaps: Vec::new(),
                    props: vec![PropSetup {
                        position: Vec2::new(3.0, 0.0),
                        drops_potion: true,
                        hit_points: 1,
                    }],
                },
                RegionSetup {
                    name: "Canyon".to_string(),
                    trigger: Some(BoxSetup {
                        center: Vec2::new(18.0, 4.0),
                        half_extents: Vec2::new(1.0, 3.0),
                    }),
                    checkpoint: Some(Vec2::new(18.0, 4.0)),
                    chargers: vec![Vec2::new(24.0, 6.0)],
                    obstacles: Vec::new(),
                    gaps: vec![BoxSetup {
                        center: Vec2::new(26.0, 0.0),
                        half_extents: Vec2::new(1.0, 1.0),
                    }],
                    props: Vec::new(),
                },
            ],
        }
    }
}

impl SimConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load a scenario from a specific path.
    /// Falls back to the built-in scenario if the file is missing or invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("no scenario at {}, running the built-in one", path.display());
            return Self::default();
        }

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("cannot read scenario {}: {e}", path.display());
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&text) {
            Ok(config) => {
                info!(
                    "scenario {} loaded: {} regions, {} waypoints",
                    path.display(),
                    config.regions.len(),
                    config.waypoints.len()
                );
                config
            },
            Err(e) => {
                warn!("scenario {} rejected, running the built-in one: {e}", path.display());
                Self::default()
            },
        }
    }

    /// Write the scenario as commented TOML, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let body = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, format!("{SCENARIO_HEADER}{body}"))?;

        info!(
            "scenario with {} regions written to {}",
            self.regions.len(),
            path.display()
        );
        Ok(())
    }

    /// Configuration path: `SAVANNAH_CONFIG` if set, else `savannah.toml` in
    /// the working directory.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 1000);
        if !self.duration.is_finite() {
            self.duration = 0.0;
        }
        self.duration = self.duration.clamp(0.0, 3600.0);
        if !(self.respawn_delay.is_finite() && self.respawn_delay >= 0.0) {
            self.respawn_delay = DEFAULT_RESPAWN_DELAY;
        }
        if !(self.attack_interval.is_finite() && self.attack_interval >= 0.0) {
            self.attack_interval = 0.0;
        }
        self.attack_reach = self.attack_reach.max(0.0);
    }

    /// Fixed step in seconds.
    #[must_use]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Number of ticks covering `duration`.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (self.duration * self.tick_rate as f32).round().max(0.0) as u64
    }

    /// Loads the tunable profiles and lays out the scenario.
    pub fn build_session(&self) -> SavannahResult<GameSession> {
        if !self.regions.is_empty() && !self.regions.iter().any(|r| r.name == self.start_region) {
            return Err(SavannahError::UnknownRegion(self.start_region.clone()));
        }

        let charger = match &self.charger_profile {
            Some(path) => ChargerProfile::load(path)
                .map_err(|e| SavannahError::Config(format!("{}: {e}", path.display())))?,
            None => ChargerProfile::default(),
        };
        let player = match &self.player_profile {
            Some(path) => PlayerProfile::load(path)
                .map_err(|e| SavannahError::Config(format!("{}: {e}", path.display())))?,
            None => PlayerProfile::default(),
        };

        let session_config = SessionConfig {
            start_region: RegionKey::new(self.start_region.as_str()),
            respawn_delay: self.respawn_delay,
            seed: self.seed,
            charger,
            player,
            ..SessionConfig::default()
        };
        let mut session = GameSession::new(session_config, self.player_start);

        for region in &self.regions {
            let key = RegionKey::new(region.name.as_str());
            if let Some(trigger) = region.trigger {
                let mut volume = RegionTrigger::new(key.clone(), trigger.aabb());
                if let Some(checkpoint) = region.checkpoint {
                    volume = volume.with_checkpoint(checkpoint);
                }
                session.add_trigger(volume);
            }
            for &position in &region.chargers {
                session.spawn_charger(key.clone(), position);
            }
            for obstacle in &region.obstacles {
                session.add_obstacle(obstacle.aabb());
            }
            for gap in &region.gaps {
                session.add_gap(gap.aabb());
            }
            for prop in &region.props {
                session.add_breakable(
                    Breakable::new(prop.position, prop.drops_potion).with_hit_points(prop.hit_points),
                );
            }
        }

        info!(
            "scenario ready: {} regions, {} chargers",
            self.regions.len(),
            session.chargers().len()
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.start_region, "Savannah");
        assert_eq!(config.total_ticks(), 1800);
        assert!((config.dt() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();

        config.tick_rate = 0;
        config.duration = f32::NAN;
        config.respawn_delay = -1.0;
        config.attack_interval = f32::INFINITY;

        config.validate();

        assert_eq!(config.tick_rate, 1);
        assert_eq!(config.duration, 0.0);
        assert_eq!(config.respawn_delay, DEFAULT_RESPAWN_DELAY);
        assert_eq!(config.attack_interval, 0.0);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = SimConfig::default();
        config.seed = 42;
        config.duration = 5.0;

        config.save_to(&path).expect("save");
        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.starts_with("# Savannah combat sim scenario"));
        let loaded = SimConfig::load_from(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let temp_dir = TempDir::new().expect("temp dir");
        let missing = SimConfig::load_from(temp_dir.path().join("nope.toml"));
        assert_eq!(missing, SimConfig::default());

        let broken = temp_dir.path().join("broken.toml");
        fs::write(&broken, "tick_rate = \"fast\"").expect("write");
        assert_eq!(SimConfig::load_from(&broken), SimConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "duration = 2.0\nregions = []\n").expect("write");

        let config = SimConfig::load_from(&path);
        assert_eq!(config.duration, 2.0);
        assert!(config.regions.is_empty());
        assert_eq!(config.tick_rate, 60);
    }

    #[test]
    fn test_build_session_places_scenario() {
        let session = SimConfig::default().build_session().expect("session");
        assert_eq!(session.chargers().len(), 3);
        assert_eq!(session.props().len(), 1);
        assert!(session.registry().has_region(&RegionKey::new("Canyon")));
    }

    #[test]
    fn test_unknown_start_region_rejected() {
        let config = SimConfig {
            start_region: "Atlantis".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(
            config.build_session(),
            Err(SavannahError::UnknownRegion(name)) if name == "Atlantis"
        ));
    }

    #[test]
    fn test_missing_profile_is_config_error() {
        let temp_dir = TempDir::new().expect("temp dir");
        let config = SimConfig {
            charger_profile: Some(temp_dir.path().join("charger.ron")),
            ..SimConfig::default()
        };
        assert!(matches!(config.build_session(), Err(SavannahError::Config(_))));
    }
}
