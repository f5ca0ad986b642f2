pub mod challenge;
pub mod free_roam;
pub mod handoff;
pub mod rows;
pub mod world;

use nalgebra::{Matrix4, Orthographic3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::engine::mesh::{Mesh, MeshBuilder};
use crate::engine::renderer::Renderer;

use self::rows::{Row, TILE_SIZE, TILES_PER_ROW};
use self::world::{Aabb, Direction, World};

#[derive(Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    pub path: String,
    pub scale: f32,
    pub rotation_offset_x: f32,
    pub rotation_offset_y: f32,
    pub rotation_offset_z: f32,
    pub position_offset_y: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            path: "/assets/models/soldier.glb".to_string(),
            scale: 10.0,
            rotation_offset_x: 0.0,
            rotation_offset_y: 0.0,
            rotation_offset_z: 0.0,
            position_offset_y: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub player_model: ModelConfig,
}

const REPORT_SIZE: f32 = 20.0;

/// A collectible dropped somewhere on the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub x: f32,
    pub z: f32,
    pub collected: bool,
}

impl Report {
    pub fn aabb(&self) -> Aabb {
        Aabb { x: self.x, z: self.z, width: REPORT_SIZE, depth: REPORT_SIZE }
    }
}

/// The endless crossing: simulation state plus everything needed to
/// put it on screen.
pub struct Game {
    pub renderer: Renderer,
    pub world: World,
    player_mesh: Option<Mesh>,
    player_fallback: Mesh,
    config: Option<AppConfig>,
    last_time_ms: f64,
}

impl Game {
    pub fn new(renderer: Renderer, player_mesh: Option<Mesh>, config: Option<AppConfig>) -> Self {
        Game {
            renderer,
            world: World::new(random_seed()),
            player_mesh,
            player_fallback: create_player_mesh(),
            config,
            last_time_ms: js_sys::Date::now(),
        }
    }

    pub fn update(&mut self) {
        let now = js_sys::Date::now();
        // Tab switches can produce huge deltas; cap them.
        let dt = (((now - self.last_time_ms) / 1000.0) as f32).min(0.1);
        self.last_time_ms = now;
        self.world.update(dt);
    }

    pub fn queue_move(&mut self, direction: Direction) {
        self.world.queue_move(direction);
    }

    pub fn restart(&mut self) {
        self.world.restart(random_seed());
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

        let vp = view_projection(width, height, self.world.player_x, self.world.player_z);

        // Plain grass behind the start row.
        for r in -9..=0 {
            draw_row(&self.renderer, None, r as f32 * TILE_SIZE, &vp);
        }
        for (i, row) in self.world.rows.iter().enumerate() {
            draw_row(&self.renderer, Some(row), (i as f32 + 1.0) * TILE_SIZE, &vp);
        }

        draw_player(
            &self.renderer,
            self.player_mesh.as_ref(),
            &self.player_fallback,
            self.config.as_ref(),
            self.world.player_x,
            self.world.player_hop,
            self.world.player_z,
            self.world.player_yaw,
            &vp,
        );
    }
}

fn random_seed() -> u64 {
    (js_sys::Math::random() * 1_000_000.0) as u64
}

/// Orthographic follow camera: fixed offset from the interpolated
/// player position, sized against the viewport's longer edge.
pub fn view_projection(width: i32, height: i32, px: f32, pz: f32) -> Matrix4<f32> {
    let size = 200.0;
    let ratio = if height > 0 { width as f32 / height as f32 } else { 1.0 };
    let (w, h) = if ratio < 1.0 { (size, size / ratio) } else { (size * ratio, size) };

    let projection = Orthographic3::new(-w / 2.0, w / 2.0, -h / 2.0, h / 2.0, 50.0, 600.0).to_homogeneous();
    let eye = Point3::new(px + 180.0, 220.0, pz - 180.0);
    let target = Point3::new(px, 0.0, pz);
    let view = Matrix4::look_at_rh(&eye, &target, &Vector3::y());
    projection * view
}

/// One board row. `None` draws a bare grass strip.
pub fn draw_row(renderer: &Renderer, row: Option<&Row>, row_z: f32, vp: &Matrix4<f32>) {
    match row {
        None | Some(Row::Forest { .. }) => draw_grass_strip(renderer, row_z, vp),
        Some(Row::CarLane(_)) | Some(Row::TruckLane(_)) => draw_road_strip(renderer, row_z, vp),
    }
    match row {
        Some(Row::Forest { trees }) => {
            for tree in trees {
                draw_tree(renderer, tree.tile as f32 * TILE_SIZE, row_z, tree.height, vp);
            }
        }
        Some(Row::CarLane(lane)) => {
            for vehicle in &lane.vehicles {
                draw_car(renderer, vehicle.x, row_z, lane.direction, vehicle.color, vp);
            }
        }
        Some(Row::TruckLane(lane)) => {
            for vehicle in &lane.vehicles {
                draw_truck(renderer, vehicle.x, row_z, lane.direction, vehicle.color, vp);
            }
        }
        None => {}
    }
}

fn draw_grass_strip(renderer: &Renderer, row_z: f32, vp: &Matrix4<f32>) {
    let strip = TILES_PER_ROW as f32 * TILE_SIZE;
    renderer.draw_box(0.0, -1.5, row_z, strip, 3.0, TILE_SIZE, 0.73, 0.96, 0.33, vp);
    // Darker shoulders outside the playable range.
    renderer.draw_box(-strip, -1.5, row_z, strip, 3.0, TILE_SIZE, 0.60, 0.78, 0.28, vp);
    renderer.draw_box(strip, -1.5, row_z, strip, 3.0, TILE_SIZE, 0.60, 0.78, 0.28, vp);
}

fn draw_road_strip(renderer: &Renderer, row_z: f32, vp: &Matrix4<f32>) {
    let strip = TILES_PER_ROW as f32 * TILE_SIZE;
    renderer.draw_box(0.0, -0.5, row_z, strip, 1.0, TILE_SIZE, 0.27, 0.29, 0.35, vp);
    renderer.draw_box(-strip, -0.5, row_z, strip, 1.0, TILE_SIZE, 0.22, 0.24, 0.29, vp);
    renderer.draw_box(strip, -0.5, row_z, strip, 1.0, TILE_SIZE, 0.22, 0.24, 0.29, vp);
}

fn draw_tree(renderer: &Renderer, x: f32, row_z: f32, height: f32, vp: &Matrix4<f32>) {
    renderer.draw_box(x, 10.0, row_z, 15.0, 20.0, 15.0, 0.30, 0.16, 0.15, vp);
    renderer.draw_box(x, height / 2.0 + 20.0, row_z, 30.0, height, 30.0, 0.48, 0.64, 0.11, vp);
}

fn draw_car(renderer: &Renderer, x: f32, row_z: f32, direction: bool, color: (f32, f32, f32), vp: &Matrix4<f32>) {
    // Mirroring part offsets stands in for the 180-degree turn.
    let s = if direction { 1.0 } else { -1.0 };
    renderer.draw_box(x, 12.0, row_z, 60.0, 15.0, 30.0, color.0, color.1, color.2, vp);
    renderer.draw_box(x - 6.0 * s, 25.5, row_z, 33.0, 12.0, 24.0, 0.8, 0.8, 0.8, vp);
    for wheel_x in [18.0, -18.0] {
        renderer.draw_box(x + wheel_x * s, 6.0, row_z, 12.0, 12.0, 33.0, 0.2, 0.2, 0.2, vp);
    }
}

fn draw_truck(renderer: &Renderer, x: f32, row_z: f32, direction: bool, color: (f32, f32, f32), vp: &Matrix4<f32>) {
    let s = if direction { 1.0 } else { -1.0 };
    renderer.draw_box(x - 15.0 * s, 25.0, row_z, 70.0, 35.0, 35.0, 0.71, 0.78, 0.99, vp);
    renderer.draw_box(x + 35.0 * s, 20.0, row_z, 30.0, 30.0, 30.0, color.0, color.1, color.2, vp);
    for wheel_x in [37.0, 5.0, -35.0] {
        renderer.draw_box(x + wheel_x * s, 6.0, row_z, 12.0, 12.0, 33.0, 0.2, 0.2, 0.2, vp);
    }
}

pub fn draw_report(renderer: &Renderer, report: &Report, time: f32, vp: &Matrix4<f32>) {
    if report.collected {
        return;
    }
    let bob = (time * 3.0).sin() * 2.0;
    renderer.draw_box(report.x, 10.0 + bob, report.z, 14.0, 14.0, 3.0, 1.0, 0.84, 0.0, vp);
}

#[allow(clippy::too_many_arguments)]
pub fn draw_player(
    renderer: &Renderer,
    player_mesh: Option<&Mesh>,
    fallback: &Mesh,
    config: Option<&AppConfig>,
    x: f32,
    y: f32,
    z: f32,
    yaw: f32,
    vp: &Matrix4<f32>,
) {
    if let Some(mesh) = player_mesh {
        let default_model = ModelConfig::default();
        let model = config.map(|c| &c.player_model).unwrap_or(&default_model);
        renderer.draw_mesh(
            mesh,
            x,
            y + model.position_offset_y,
            z,
            model.scale,
            model.scale,
            model.scale,
            model.rotation_offset_x,
            yaw + model.rotation_offset_y,
            model.rotation_offset_z,
            vp,
        );
    } else {
        renderer.draw_mesh(fallback, x, y, z, 1.0, 1.0, 1.0, 0.0, yaw, 0.0, vp);
    }
}

/// Placeholder when the real model fails to load. The nose box marks
/// the facing so the turn animation still reads.
pub fn create_player_mesh() -> Mesh {
    let mut builder = MeshBuilder::new();
    builder.push_box(0.0, 10.0, 0.0, 15.0, 20.0, 15.0, 0.92, 0.92, 0.92);
    builder.push_box(0.0, 21.0, 0.0, 9.0, 4.0, 9.0, 0.85, 0.30, 0.25);
    builder.push_box(0.0, 14.0, 8.5, 4.0, 4.0, 3.0, 1.0, 0.6, 0.2);
    builder.build()
}
