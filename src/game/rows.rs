use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

pub const MIN_TILE_INDEX: i32 = -8;
pub const MAX_TILE_INDEX: i32 = 8;
pub const TILES_PER_ROW: i32 = MAX_TILE_INDEX - MIN_TILE_INDEX + 1;
pub const TILE_SIZE: f32 = 42.0;

/// Rows generated per batch, and how close the player may get to the
/// generation frontier before the next batch is appended.
pub const ROW_BATCH: usize = 20;
pub const GENERATION_MARGIN: i32 = 10;

/// Vehicles wrap a couple of tiles beyond the visible strip so the
/// teleport to the opposite bound happens off-screen.
pub const LANE_MIN_X: f32 = (MIN_TILE_INDEX - 2) as f32 * TILE_SIZE;
pub const LANE_MAX_X: f32 = (MAX_TILE_INDEX + 2) as f32 * TILE_SIZE;

pub const TREES_PER_FOREST: usize = 4;
pub const CARS_PER_LANE: usize = 3;
pub const TRUCKS_PER_LANE: usize = 2;

/// Tiles reserved on each side of an accepted vehicle spawn.
const CAR_RESERVE: i32 = 1;
const TRUCK_RESERVE: i32 = 2;

/// Draws attempted before the sampler falls back to scanning for a free
/// tile. The scan is total because of the footprint guards below.
const MAX_PLACEMENT_DRAWS: u32 = 64;

// Spawn footprints must fit the tile range or placement could never finish.
const _: () = assert!(TILES_PER_ROW as usize > TREES_PER_FOREST);
const _: () = assert!(TILES_PER_ROW as usize >= CARS_PER_LANE * (2 * CAR_RESERVE as usize + 1));
const _: () = assert!(TILES_PER_ROW as usize >= TRUCKS_PER_LANE * (2 * TRUCK_RESERVE as usize + 1));

pub const TREE_HEIGHTS: [f32; 3] = [20.0, 45.0, 60.0];
pub const LANE_SPEEDS: [f32; 3] = [125.0, 156.0, 188.0];
pub const VEHICLE_COLORS: [(f32, f32, f32); 3] = [
    (0.65, 0.15, 0.14),
    (0.74, 0.71, 0.22),
    (0.47, 0.69, 0.29),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tree {
    pub tile: i32,
    /// Crown height, decorative only.
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vehicle {
    pub start_tile: i32,
    pub color: (f32, f32, f32),
    /// World-space offset along the lane, advanced every frame.
    pub x: f32,
}

impl Vehicle {
    fn spawn(start_tile: i32, color: (f32, f32, f32)) -> Self {
        Vehicle { start_tile, color, x: start_tile as f32 * TILE_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    /// true = vehicles travel toward +x.
    pub direction: bool,
    pub speed: f32,
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Forest { trees: Vec<Tree> },
    CarLane(Lane),
    TruckLane(Lane),
}

impl Row {
    pub fn lane(&self) -> Option<&Lane> {
        match self {
            Row::CarLane(lane) | Row::TruckLane(lane) => Some(lane),
            Row::Forest { .. } => None,
        }
    }

    pub fn lane_mut(&mut self) -> Option<&mut Lane> {
        match self {
            Row::CarLane(lane) | Row::TruckLane(lane) => Some(lane),
            Row::Forest { .. } => None,
        }
    }

    pub fn tree_at(&self, tile: i32) -> bool {
        match self {
            Row::Forest { trees } => trees.iter().any(|t| t.tile == tile),
            _ => false,
        }
    }
}

pub fn generate_rows<R: Rng>(rng: &mut R, count: usize) -> Vec<Row> {
    (0..count).map(|_| generate_row(rng)).collect()
}

fn generate_row<R: Rng>(rng: &mut R) -> Row {
    match rng.gen_range(0..3) {
        0 => generate_car_lane(rng),
        1 => generate_truck_lane(rng),
        _ => generate_forest(rng),
    }
}

fn generate_forest<R: Rng>(rng: &mut R) -> Row {
    let mut occupied = HashSet::new();
    let trees = (0..TREES_PER_FOREST)
        .map(|_| {
            let tile = claim_tile(rng, &mut occupied, 0);
            let height = choose(rng, &TREE_HEIGHTS);
            Tree { tile, height }
        })
        .collect();
    Row::Forest { trees }
}

fn generate_car_lane<R: Rng>(rng: &mut R) -> Row {
    Row::CarLane(generate_lane(rng, CARS_PER_LANE, CAR_RESERVE))
}

fn generate_truck_lane<R: Rng>(rng: &mut R) -> Row {
    Row::TruckLane(generate_lane(rng, TRUCKS_PER_LANE, TRUCK_RESERVE))
}

fn generate_lane<R: Rng>(rng: &mut R, vehicle_count: usize, reserve: i32) -> Lane {
    let direction = rng.gen_bool(0.5);
    let speed = choose(rng, &LANE_SPEEDS);
    let mut occupied = HashSet::new();
    let vehicles = (0..vehicle_count)
        .map(|_| {
            let tile = claim_tile(rng, &mut occupied, reserve);
            let color = choose(rng, &VEHICLE_COLORS);
            Vehicle::spawn(tile, color)
        })
        .collect();
    Lane { direction, speed, vehicles }
}

fn choose<R: Rng, T: Copy>(rng: &mut R, options: &[T]) -> T {
    options.choose(rng).copied().unwrap_or(options[0])
}

/// Draws a tile not yet in `occupied`, then reserves it together with
/// `reserve` neighbors on each side. Bounded: once the draws run out,
/// the remaining free tiles are scanned in order.
fn claim_tile<R: Rng>(rng: &mut R, occupied: &mut HashSet<i32>, reserve: i32) -> i32 {
    let mut tile = None;
    for _ in 0..MAX_PLACEMENT_DRAWS {
        let candidate = rng.gen_range(MIN_TILE_INDEX..=MAX_TILE_INDEX);
        if !occupied.contains(&candidate) {
            tile = Some(candidate);
            break;
        }
    }
    let tile = tile.unwrap_or_else(|| {
        (MIN_TILE_INDEX..=MAX_TILE_INDEX)
            .find(|t| !occupied.contains(t))
            .unwrap_or(MIN_TILE_INDEX)
    });
    for t in tile - reserve..=tile + reserve {
        occupied.insert(t);
    }
    tile
}

/// One frame of lane travel with the hard wrap at the off-screen bounds.
/// A vehicle already past the bound snaps to the opposite bound exactly.
pub fn advance_vehicle(x: f32, direction: bool, speed: f32, dt: f32) -> f32 {
    if direction {
        if x > LANE_MAX_X {
            LANE_MIN_X
        } else {
            x + speed * dt
        }
    } else if x < LANE_MIN_X {
        LANE_MAX_X
    } else {
        x - speed * dt
    }
}

pub fn animate_lane(lane: &mut Lane, dt: f32) {
    for vehicle in &mut lane.vehicles {
        vehicle.x = advance_vehicle(vehicle.x, lane.direction, lane.speed, dt);
    }
}
