use nalgebra::Matrix4;

use crate::engine::mesh::Mesh;
use crate::engine::renderer::Renderer;

use super::free_roam::{rotate_towards, InputState, TURN_STEP};
use super::handoff::SceneHandoff;
use super::rows::{self, Lane, Row, Tree, Vehicle, MAX_TILE_INDEX, MIN_TILE_INDEX, TILE_SIZE, VEHICLE_COLORS};
use super::world::{Aabb, CAR_DEPTH, CAR_LENGTH, PLAYER_DEPTH, PLAYER_WIDTH, TRUCK_DEPTH, TRUCK_LENGTH};
use super::{draw_player, draw_report, draw_row, view_projection, AppConfig, Report};

pub const WALK_SPEED: f32 = 110.0;
pub const RUN_SPEED: f32 = 210.0;

pub const END_ROW_COUNT: i32 = 11;
pub const END_Z: f32 = END_ROW_COUNT as f32 * TILE_SIZE;

const REPORT_SPOTS: [(f32, f32); 3] = [
    (-4.0 * TILE_SIZE, 3.0 * TILE_SIZE),
    (3.0 * TILE_SIZE, 6.0 * TILE_SIZE),
    (0.0, 9.0 * TILE_SIZE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Finished,
    TimedOut,
}

/// Deterministic level: exactly three car lanes, no trucks, the rest
/// forest with fixed tree placements.
pub fn fixed_rows() -> Vec<Row> {
    fn forest(trees: &[(i32, f32)]) -> Row {
        Row::Forest {
            trees: trees.iter().map(|&(tile, height)| Tree { tile, height }).collect(),
        }
    }
    fn car_lane(direction: bool, speed: f32, spawns: &[(i32, usize)]) -> Row {
        Row::CarLane(Lane {
            direction,
            speed,
            vehicles: spawns
                .iter()
                .map(|&(tile, color)| Vehicle {
                    start_tile: tile,
                    color: VEHICLE_COLORS[color],
                    x: tile as f32 * TILE_SIZE,
                })
                .collect(),
        })
    }

    vec![
        forest(&[(-5, 45.0), (0, 60.0), (4, 20.0)]),
        car_lane(true, 140.0, &[(-7, 0), (-1, 2), (6, 1)]),
        forest(&[(-6, 20.0), (2, 60.0), (7, 45.0)]),
        forest(&[(-3, 45.0), (1, 20.0), (5, 60.0)]),
        car_lane(false, 188.0, &[(-8, 1), (-2, 2), (5, 0)]),
        forest(&[(-7, 20.0), (-1, 45.0), (6, 60.0)]),
        forest(&[(-4, 60.0), (0, 20.0), (4, 45.0)]),
        car_lane(true, 156.0, &[(-5, 0), (0, 1), (7, 2)]),
        forest(&[(-8, 45.0), (-2, 20.0), (3, 60.0)]),
        forest(&[(-6, 20.0), (-1, 60.0), (6, 45.0)]),
        forest(&[(-5, 45.0), (2, 20.0), (5, 60.0)]),
    ]
}

/// Timed crossing over the fixed level. Vehicle contact sends the
/// player back to the start line; only the clock ends the attempt.
pub struct Challenge {
    pub rows: Vec<Row>,
    pub player_x: f32,
    pub player_z: f32,
    pub yaw: f32,
    pub time_ms_left: f64,
    pub reports: Vec<Report>,
    pub total_reports: u32,
    pub exit: Option<Exit>,
    carried_reports: u32,
}

impl Challenge {
    pub fn new(handoff: SceneHandoff) -> Self {
        Challenge {
            rows: fixed_rows(),
            player_x: 0.0,
            player_z: 0.0,
            yaw: 0.0,
            time_ms_left: handoff.time_ms_left,
            reports: REPORT_SPOTS
                .iter()
                .map(|&(x, z)| Report { x, z, collected: false })
                .collect(),
            total_reports: handoff.total_reports,
            exit: None,
            carried_reports: handoff.reports_collected,
        }
    }

    pub fn collected_total(&self) -> u32 {
        self.carried_reports + self.reports.iter().filter(|r| r.collected).count() as u32
    }

    pub fn handoff(&self) -> SceneHandoff {
        SceneHandoff {
            reports_collected: self.collected_total(),
            total_reports: self.total_reports,
            time_ms_left: self.time_ms_left,
        }
    }

    fn player_box(&self) -> Aabb {
        Aabb { x: self.player_x, z: self.player_z, width: PLAYER_WIDTH, depth: PLAYER_DEPTH }
    }

    pub fn update(&mut self, dt: f32, input: &InputState) {
        if self.exit.is_some() {
            return;
        }

        self.time_ms_left -= f64::from(dt) * 1000.0;
        if self.time_ms_left <= 0.0 {
            self.time_ms_left = 0.0;
            self.exit = Some(Exit::TimedOut);
            return;
        }

        for row in &mut self.rows {
            if let Some(lane) = row.lane_mut() {
                rows::animate_lane(lane, dt);
            }
        }

        if let Some(heading) = input.direction_offset() {
            self.yaw = rotate_towards(self.yaw, heading, TURN_STEP);
            let speed = if input.run { RUN_SPEED } else { WALK_SPEED };
            self.player_x = (self.player_x - heading.sin() * speed * dt)
                .clamp(MIN_TILE_INDEX as f32 * TILE_SIZE, MAX_TILE_INDEX as f32 * TILE_SIZE);
            self.player_z = (self.player_z + heading.cos() * speed * dt).max(-2.0 * TILE_SIZE);
        }

        let player = self.player_box();

        if self.hits_vehicle(&player) {
            // Knocked back to the start line; the clock keeps running.
            self.player_x = 0.0;
            self.player_z = 0.0;
            return;
        }

        for report in &mut self.reports {
            if !report.collected && player.intersects(&report.aabb()) {
                report.collected = true;
            }
        }

        if self.player_z >= END_Z + TILE_SIZE / 2.0 {
            self.exit = Some(Exit::Finished);
        }
    }

    fn hits_vehicle(&self, player: &Aabb) -> bool {
        self.rows.iter().enumerate().any(|(i, row)| {
            let (lane, length, depth) = match row {
                Row::CarLane(lane) => (lane, CAR_LENGTH, CAR_DEPTH),
                Row::TruckLane(lane) => (lane, TRUCK_LENGTH, TRUCK_DEPTH),
                Row::Forest { .. } => return false,
            };
            let row_z = (i as f32 + 1.0) * TILE_SIZE;
            lane.vehicles
                .iter()
                .any(|v| player.intersects(&Aabb { x: v.x, z: row_z, width: length, depth }))
        })
    }
}

/// Browser-side wrapper around the challenge state.
pub struct ChallengeScene {
    pub renderer: Renderer,
    pub challenge: Challenge,
    player_mesh: Option<Mesh>,
    player_fallback: Mesh,
    config: Option<AppConfig>,
    last_time_ms: f64,
    time: f32,
}

impl ChallengeScene {
    pub fn new(renderer: Renderer, player_mesh: Option<Mesh>, config: Option<AppConfig>, handoff: SceneHandoff) -> Self {
        ChallengeScene {
            renderer,
            challenge: Challenge::new(handoff),
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
        self.challenge.update(dt, input);
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

        let vp: Matrix4<f32> = view_projection(width, height, self.challenge.player_x, self.challenge.player_z);

        for r in -9..=0 {
            draw_row(&self.renderer, None, r as f32 * TILE_SIZE, &vp);
        }
        for (i, row) in self.challenge.rows.iter().enumerate() {
            draw_row(&self.renderer, Some(row), (i as f32 + 1.0) * TILE_SIZE, &vp);
        }
        // Safe meadow past the finish line.
        for r in 0..6 {
            draw_row(&self.renderer, None, END_Z + (r as f32 + 1.0) * TILE_SIZE, &vp);
        }

        for report in &self.challenge.reports {
            draw_report(&self.renderer, report, self.time, &vp);
        }

        draw_player(
            &self.renderer,
            self.player_mesh.as_ref(),
            &self.player_fallback,
            self.config.as_ref(),
            self.challenge.player_x,
            0.0,
            self.challenge.player_z,
            self.challenge.yaw,
            &vp,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward() -> InputState {
        InputState { forward: true, ..Default::default() }
    }

    #[test]
    fn fixed_level_has_three_car_lanes_and_no_trucks() {
        let rows = fixed_rows();
        assert_eq!(rows.len(), END_ROW_COUNT as usize);
        let cars = rows.iter().filter(|r| matches!(r, Row::CarLane(_))).count();
        let trucks = rows.iter().filter(|r| matches!(r, Row::TruckLane(_))).count();
        assert_eq!(cars, 3);
        assert_eq!(trucks, 0);
    }

    #[test]
    fn timer_counts_down_and_expires_once() {
        let mut challenge = Challenge::new(SceneHandoff { time_ms_left: 250.0, ..Default::default() });
        challenge.update(0.1, &InputState::default());
        assert!((challenge.time_ms_left - 150.0).abs() < 1e-6);
        assert_eq!(challenge.exit, None);

        challenge.update(0.2, &InputState::default());
        assert_eq!(challenge.exit, Some(Exit::TimedOut));
        assert_eq!(challenge.time_ms_left, 0.0);

        // A finished scene no longer ticks.
        challenge.update(0.2, &forward());
        assert_eq!(challenge.time_ms_left, 0.0);
        assert_eq!(challenge.player_z, 0.0);
    }

    #[test]
    fn vehicle_contact_resets_to_the_start_line() {
        let mut challenge = Challenge::new(SceneHandoff::default());
        challenge.player_x = -7.0 * TILE_SIZE;
        challenge.player_z = 2.0 * TILE_SIZE; // board row 2, the first car lane
        challenge.update(0.016, &InputState::default());
        assert_eq!((challenge.player_x, challenge.player_z), (0.0, 0.0));
        assert_eq!(challenge.exit, None);
    }

    #[test]
    fn crossing_the_last_row_finishes() {
        let mut challenge = Challenge::new(SceneHandoff::default());
        challenge.player_z = END_Z + TILE_SIZE / 2.0 - 1.0;
        challenge.update(0.05, &forward());
        assert_eq!(challenge.exit, Some(Exit::Finished));
    }

    #[test]
    fn reports_resume_from_the_handoff() {
        let handoff = SceneHandoff { reports_collected: 4, total_reports: 8, time_ms_left: 60_000.0 };
        let mut challenge = Challenge::new(handoff);
        assert_eq!(challenge.collected_total(), 4);

        challenge.reports[0].collected = true;
        assert_eq!(challenge.collected_total(), 5);

        let out = challenge.handoff();
        assert_eq!(out.reports_collected, 5);
        assert_eq!(out.total_reports, 8);
        assert!(out.time_ms_left <= 60_000.0);
    }

    #[test]
    fn walking_collects_a_report_on_the_way() {
        let mut challenge = Challenge::new(SceneHandoff::default());
        challenge.player_x = 0.0;
        challenge.player_z = 9.0 * TILE_SIZE - 10.0;
        challenge.update(0.1, &forward());
        assert_eq!(challenge.collected_total(), 1);
    }

    #[test]
    fn movement_stays_inside_the_tile_range() {
        let mut challenge = Challenge::new(SceneHandoff::default());
        challenge.player_x = MIN_TILE_INDEX as f32 * TILE_SIZE;
        let left = InputState { left: true, ..Default::default() };
        for _ in 0..50 {
            challenge.update(0.1, &left);
        }
        assert_eq!(challenge.player_x, MIN_TILE_INDEX as f32 * TILE_SIZE);
    }
}
