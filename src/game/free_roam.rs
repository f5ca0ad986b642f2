use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use crate::engine::mesh::Mesh;
use crate::engine::renderer::Renderer;

use super::world::Aabb;
use super::{draw_player, draw_report, view_projection, AppConfig, Report};

pub const WALK_SPEED: f32 = 90.0;
pub const RUN_SPEED: f32 = 190.0;
/// Facing turns at most this far per update toward the travel heading.
pub const TURN_STEP: f32 = 0.2;

pub const PLAYER_SIZE: f32 = 15.0;
const FIELD_HALF: f32 = 220.0;

/// (x, z, width, depth, height); height only matters to the draw pass.
const OBSTACLES: [(f32, f32, f32, f32, f32); 6] = [
    (-120.0, -40.0, 50.0, 50.0, 40.0),
    (90.0, -90.0, 40.0, 70.0, 30.0),
    (0.0, 60.0, 60.0, 30.0, 50.0),
    (150.0, 60.0, 35.0, 35.0, 25.0),
    (-80.0, 120.0, 45.0, 40.0, 35.0),
    (60.0, 150.0, 70.0, 25.0, 45.0),
];

const REPORT_SPOTS: [(f32, f32); 5] = [
    (-160.0, 20.0),
    (-30.0, -120.0),
    (120.0, 10.0),
    (-140.0, 170.0),
    (30.0, 100.0),
];

const TELEPORT_ZONE: Aabb = Aabb { x: 0.0, z: 195.0, width: 60.0, depth: 30.0 };

/// Held-key snapshot fed into the continuous-movement scenes.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub run: bool,
}

impl InputState {
    /// Heading for the pressed key combination, `None` when idle.
    /// 0 faces +z; positive angles turn toward -x.
    pub fn direction_offset(&self) -> Option<f32> {
        if self.forward {
            if self.left {
                Some(FRAC_PI_4)
            } else if self.right {
                Some(-FRAC_PI_4)
            } else {
                Some(0.0)
            }
        } else if self.backward {
            if self.left {
                Some(PI - FRAC_PI_4)
            } else if self.right {
                Some(FRAC_PI_4 - PI)
            } else {
                Some(PI)
            }
        } else if self.left {
            Some(FRAC_PI_2)
        } else if self.right {
            Some(-FRAC_PI_2)
        } else {
            None
        }
    }
}

/// Shortest-arc turn, clamped to `max_step` radians.
pub fn rotate_towards(current: f32, target: f32, max_step: f32) -> f32 {
    let mut diff = (target - current) % TAU;
    if diff > PI {
        diff -= TAU;
    } else if diff < -PI {
        diff += TAU;
    }
    if diff.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(diff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Challenge,
}

/// Exploration hub: wander the field, pick up reports, step on the pad
/// to move on to the road challenge.
pub struct FreeRoam {
    pub player_x: f32,
    pub player_z: f32,
    pub yaw: f32,
    pub obstacles: Vec<Aabb>,
    pub reports: Vec<Report>,
    pub teleport_zone: Aabb,
    pub transition: Option<Transition>,
}

impl FreeRoam {
    pub fn new() -> Self {
        FreeRoam {
            player_x: 0.0,
            player_z: -160.0,
            yaw: 0.0,
            obstacles: OBSTACLES
                .iter()
                .map(|&(x, z, width, depth, _)| Aabb { x, z, width, depth })
                .collect(),
            reports: REPORT_SPOTS
                .iter()
                .map(|&(x, z)| Report { x, z, collected: false })
                .collect(),
            teleport_zone: TELEPORT_ZONE,
            transition: None,
        }
    }

    fn player_box(&self, x: f32, z: f32) -> Aabb {
        Aabb { x, z, width: PLAYER_SIZE, depth: PLAYER_SIZE }
    }

    pub fn collected(&self) -> u32 {
        self.reports.iter().filter(|r| r.collected).count() as u32
    }

    pub fn total(&self) -> u32 {
        self.reports.len() as u32
    }

    pub fn update(&mut self, dt: f32, input: &InputState) {
        if self.transition.is_some() {
            return;
        }

        if let Some(heading) = input.direction_offset() {
            self.yaw = rotate_towards(self.yaw, heading, TURN_STEP);
            let speed = if input.run { RUN_SPEED } else { WALK_SPEED };
            let next_x = (self.player_x - heading.sin() * speed * dt).clamp(-FIELD_HALF, FIELD_HALF);
            let next_z = (self.player_z + heading.cos() * speed * dt).clamp(-FIELD_HALF, FIELD_HALF);

            // Blocked moves are reverted wholesale.
            let next = self.player_box(next_x, next_z);
            if !self.obstacles.iter().any(|o| next.intersects(o)) {
                self.player_x = next_x;
                self.player_z = next_z;
            }
        }

        let player = self.player_box(self.player_x, self.player_z);
        for report in &mut self.reports {
            if !report.collected && player.intersects(&report.aabb()) {
                report.collected = true;
            }
        }

        if player.intersects(&self.teleport_zone) {
            self.transition = Some(Transition::Challenge);
        }
    }
}

/// Browser-side wrapper: the roam state plus everything needed to draw it.
pub struct FreeRoamScene {
    pub renderer: Renderer,
    pub roam: FreeRoam,
    player_mesh: Option<Mesh>,
    player_fallback: Mesh,
    config: Option<AppConfig>,
    last_time_ms: f64,
    time: f32,
}

impl FreeRoamScene {
    pub fn new(renderer: Renderer, player_mesh: Option<Mesh>, config: Option<AppConfig>) -> Self {
        FreeRoamScene {
            renderer,
            roam: FreeRoam::new(),
            player_mesh,
            player_fallback: super::create_player_mesh(),
            config,
            last_time_ms: js_sys::Date::now(),
            time: 0.0,
        }
    }

    pub fn update(&mut self, input: &InputState) {
        let now = js_sys::Date::now();
        let dt = (((now - self.last_time_ms) / 1000.0) as f32).min(0.1);
        self.last_time_ms = now;
        self.time += dt;
        self.roam.update(dt, input);
    }

    pub fn render(&self) {
        let Some(canvas) = self.renderer.canvas() else {
            return;
        };
        let width = canvas.width() as i32;
        let height = canvas.height() as i32;
        self.renderer.resize(width, height);
        self.renderer.clear(0.53, 0.81, 0.92);
        self.renderer.enable_depth_test();

        let vp = view_projection(width, height, self.roam.player_x, self.roam.player_z);

        // Field.
        self.renderer
            .draw_box(0.0, -1.5, 0.0, 2.0 * FIELD_HALF, 3.0, 2.0 * FIELD_HALF, 0.37, 0.50, 0.34, &vp);

        for &(x, z, w, d, h) in &OBSTACLES {
            self.renderer.draw_box(x, h / 2.0, z, w, h, d, 0.55, 0.42, 0.30, &vp);
        }

        // Teleport pad.
        let pad = &self.roam.teleport_zone;
        self.renderer
            .draw_box(pad.x, 0.5, pad.z, pad.width, 1.0, pad.depth, 0.25, 0.85, 0.45, &vp);

        for report in &self.roam.reports {
            draw_report(&self.renderer, report, self.time, &vp);
        }

        draw_player(
            &self.renderer,
            self.player_mesh.as_ref(),
            &self.player_fallback,
            self.config.as_ref(),
            self.roam.player_x,
            0.0,
            self.roam.player_z,
            self.roam.yaw,
            &vp,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(forward: bool, backward: bool, left: bool, right: bool) -> InputState {
        InputState { forward, backward, left, right, run: false }
    }

    #[test]
    fn direction_offset_matches_key_combinations() {
        assert_eq!(held(true, false, false, false).direction_offset(), Some(0.0));
        assert_eq!(held(true, false, true, false).direction_offset(), Some(FRAC_PI_4));
        assert_eq!(held(true, false, false, true).direction_offset(), Some(-FRAC_PI_4));
        assert_eq!(held(false, true, false, false).direction_offset(), Some(PI));
        assert_eq!(held(false, true, true, false).direction_offset(), Some(PI - FRAC_PI_4));
        assert_eq!(held(false, false, true, false).direction_offset(), Some(FRAC_PI_2));
        assert_eq!(held(false, false, false, true).direction_offset(), Some(-FRAC_PI_2));
        assert_eq!(held(false, false, false, false).direction_offset(), None);
    }

    #[test]
    fn idle_input_moves_nothing() {
        let mut roam = FreeRoam::new();
        let (x, z) = (roam.player_x, roam.player_z);
        roam.update(0.1, &InputState::default());
        assert_eq!((roam.player_x, roam.player_z), (x, z));
    }

    #[test]
    fn forward_walk_advances_along_z() {
        let mut roam = FreeRoam::new();
        let z = roam.player_z;
        roam.update(0.1, &held(true, false, false, false));
        assert!((roam.player_z - (z + WALK_SPEED * 0.1)).abs() < 1e-3);
        assert_eq!(roam.player_x, 0.0);
    }

    #[test]
    fn running_is_faster_than_walking() {
        let mut walker = FreeRoam::new();
        let mut runner = FreeRoam::new();
        walker.update(0.1, &held(true, false, false, false));
        runner.update(0.1, &InputState { forward: true, run: true, ..Default::default() });
        assert!(runner.player_z > walker.player_z);
    }

    #[test]
    fn blocked_move_is_reverted() {
        let mut roam = FreeRoam::new();
        roam.obstacles = vec![Aabb { x: 0.0, z: -140.0, width: 40.0, depth: 10.0 }];
        let z = roam.player_z;
        // Large dt drives the step straight into the block.
        roam.update(0.2, &held(true, false, false, false));
        assert_eq!(roam.player_z, z);
    }

    #[test]
    fn walking_over_a_report_collects_it_once() {
        let mut roam = FreeRoam::new();
        roam.reports = vec![Report { x: 0.0, z: -150.0, collected: false }];
        roam.update(0.2, &held(true, false, false, false));
        assert_eq!(roam.collected(), 1);
        roam.update(0.1, &held(false, true, false, false));
        assert_eq!(roam.collected(), 1);
    }

    #[test]
    fn stepping_on_the_pad_requests_the_challenge() {
        let mut roam = FreeRoam::new();
        roam.teleport_zone = Aabb { x: 0.0, z: -150.0, width: 40.0, depth: 20.0 };
        roam.update(0.2, &held(true, false, false, false));
        assert_eq!(roam.transition, Some(Transition::Challenge));

        // Scene is done; further input is ignored.
        let z = roam.player_z;
        roam.update(0.2, &held(true, false, false, false));
        assert_eq!(roam.player_z, z);
    }

    #[test]
    fn facing_turns_toward_travel_heading_in_steps() {
        let mut roam = FreeRoam::new();
        roam.update(0.01, &held(false, false, true, false));
        assert!((roam.yaw - TURN_STEP).abs() < 1e-5);
        for _ in 0..20 {
            roam.update(0.01, &held(false, false, true, false));
        }
        assert!((roam.yaw - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn rotate_towards_takes_the_short_arc() {
        let turned = rotate_towards(-3.0, 3.0, 0.2);
        assert!(turned < -3.0 || turned > 3.0 - 1e-6 || turned < -3.0 + 0.2);
        // -3.0 to 3.0 is shorter through -PI.
        assert!((turned - (-3.2)).abs() < 1e-5);
    }
}
