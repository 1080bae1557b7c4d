//! Scripted player input for headless runs.

use tracing::debug;

use savannah_common::Vec2;
use savannah_gameplay::{ChargerState, GameSession, Interval};

/// Distance at which a waypoint counts as reached.
const ARRIVAL_RADIUS: f32 = 0.25;

/// Walks the player through waypoints, swings at nearby chargers and drinks
/// a potion when badly hurt.
#[derive(Debug, Clone)]
pub struct Pilot {
    waypoints: Vec<Vec2>,
    next: usize,
    attack: Option<Interval>,
    reach: f32,
}

impl Pilot {
    /// Creates a pilot. An `attack_interval` of zero disables attacks.
    pub fn new(waypoints: Vec<Vec2>, attack_interval: f32, reach: f32) -> Self {
        Self {
            waypoints,
            next: 0,
            attack: (attack_interval > 0.0).then(|| Interval::new(attack_interval)),
            reach,
        }
    }

    /// Index of the waypoint being walked to.
    pub const fn next_waypoint(&self) -> usize {
        self.next
    }

    /// Whether every waypoint has been reached.
    pub fn is_finished(&self) -> bool {
        self.next >= self.waypoints.len()
    }

    /// Sets movement input and issues attacks for this tick.
    pub fn steer(&mut self, session: &mut GameSession, dt: f32) {
        if !session.player().is_alive() {
            return;
        }
        let position = session.player().position();

        while let Some(&target) = self.waypoints.get(self.next) {
            if target.distance(position) > ARRIVAL_RADIUS {
                break;
            }
            debug!("waypoint {} reached", self.next);
            self.next += 1;
        }
        let heading = self
            .waypoints
            .get(self.next)
            .map_or(Vec2::ZERO, |&target| (target - position).normalize_or_zero());
        session.player_mut().set_move_input(heading);

        session.player_collect_potions();
        let player = session.player();
        if player.potions() > 0 && player.health() < player.profile().max_health * 0.5 {
            if let Err(refusal) = session.player_use_potion() {
                debug!("scripted potion refused: {refusal:?}");
            }
        }

        let Some(attack) = self.attack.as_mut() else {
            return;
        };
        if !attack.tick(dt) {
            return;
        }
        let nearest = session
            .chargers()
            .iter()
            .filter(|c| c.is_active() && c.state() != ChargerState::Dead)
            .map(|c| c.position())
            .filter(|p| p.distance(position) <= self.reach)
            .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)));
        if let Some(enemy) = nearest {
            if let Err(refusal) = session.player_light_attack(enemy - position) {
                debug!("scripted attack refused: {refusal:?}");
            }
        }
    }
}
