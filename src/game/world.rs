use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, PI};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::rows::{self, Row, GENERATION_MARGIN, MAX_TILE_INDEX, MIN_TILE_INDEX, ROW_BATCH, TILE_SIZE};

/// One hop takes a fifth of a second, regardless of frame rate.
pub const STEP_TIME: f32 = 0.2;
pub const HOP_HEIGHT: f32 = 8.0;

pub const PLAYER_WIDTH: f32 = 15.0;
pub const PLAYER_DEPTH: f32 = 15.0;
pub const CAR_LENGTH: f32 = 60.0;
pub const CAR_DEPTH: f32 = 30.0;
pub const TRUCK_LENGTH: f32 = 100.0;
pub const TRUCK_DEPTH: f32 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub fn apply(self, position: Position) -> Position {
        let Position { row, tile } = position;
        match self {
            Direction::Forward => Position { row: row + 1, tile },
            Direction::Backward => Position { row: row - 1, tile },
            Direction::Left => Position { row, tile: tile - 1 },
            Direction::Right => Position { row, tile: tile + 1 },
        }
    }

    pub fn target_yaw(self) -> f32 {
        match self {
            Direction::Forward => 0.0,
            Direction::Left => FRAC_PI_2,
            Direction::Right => -FRAC_PI_2,
            Direction::Backward => PI,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: i32,
    pub tile: i32,
}

impl Position {
    pub const START: Position = Position { row: 0, tile: 0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Playing,
    GameOver { final_score: i32 },
}

/// Ground-plane bounding box, centered; height plays no part in any
/// overlap this game cares about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub z: f32,
    pub width: f32,
    pub depth: f32,
}

impl Aabb {
    pub fn intersects(&self, other: &Aabb) -> bool {
        (self.x - other.x).abs() < (self.width + other.width) / 2.0
            && (self.z - other.z).abs() < (self.depth + other.depth) / 2.0
    }
}

/// Every piece of mutable gameplay state for the endless crossing:
/// the row history, the buffered move queue, the committed grid
/// position and the interpolated render position derived from it.
pub struct World {
    /// `rows[i]` is board row `i + 1`; rows at and below 0 are plain grass.
    pub rows: Vec<Row>,
    pub position: Position,
    pub status: Status,
    /// Interpolated render state, valid every frame (matches the
    /// committed position whenever no step is in flight).
    pub player_x: f32,
    pub player_z: f32,
    pub player_hop: f32,
    pub player_yaw: f32,
    moves: VecDeque<Direction>,
    step_elapsed: f32,
    rng: SmallRng,
}

impl World {
    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let rows = rows::generate_rows(&mut rng, ROW_BATCH);
        World {
            rows,
            position: Position::START,
            status: Status::Playing,
            player_x: 0.0,
            player_z: 0.0,
            player_hop: 0.0,
            player_yaw: 0.0,
            moves: VecDeque::new(),
            step_elapsed: 0.0,
            rng,
        }
    }

    #[cfg(test)]
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let mut world = World::new(0);
        world.rows = rows;
        world
    }

    pub fn restart(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
        self.rows.clear();
        let batch = rows::generate_rows(&mut self.rng, ROW_BATCH);
        self.rows.extend(batch);
        self.position = Position::START;
        self.status = Status::Playing;
        self.player_x = 0.0;
        self.player_z = 0.0;
        self.player_hop = 0.0;
        self.player_yaw = 0.0;
        self.moves.clear();
        self.step_elapsed = 0.0;
    }

    pub fn score(&self) -> i32 {
        self.position.row
    }

    pub fn queue_len(&self) -> usize {
        self.moves.len()
    }

    /// Board row lookup: row 1 is the first generated row.
    fn row_at(&self, row_index: i32) -> Option<&Row> {
        if row_index >= 1 {
            self.rows.get(row_index as usize - 1)
        } else {
            None
        }
    }

    /// Buffered input. The candidate is accepted only if the position
    /// reached after *all* queued moves plus the candidate is on the
    /// board and not inside a tree; otherwise it is dropped silently.
    pub fn queue_move(&mut self, direction: Direction) {
        if matches!(self.status, Status::GameOver { .. }) {
            return;
        }
        let final_position = self
            .moves
            .iter()
            .copied()
            .chain(std::iter::once(direction))
            .fold(self.position, |pos, dir| dir.apply(pos));
        if !self.ends_up_in_valid_position(final_position) {
            return;
        }
        self.moves.push_back(direction);
    }

    fn ends_up_in_valid_position(&self, position: Position) -> bool {
        if position.row == -1 || position.tile < MIN_TILE_INDEX || position.tile > MAX_TILE_INDEX {
            return false;
        }
        if let Some(row) = self.row_at(position.row) {
            if row.tree_at(position.tile) {
                return false;
            }
        }
        true
    }

    pub fn update(&mut self, dt: f32) {
        if matches!(self.status, Status::GameOver { .. }) {
            return;
        }
        self.animate_vehicles(dt);
        self.animate_player(dt);
        self.hit_test();
    }

    fn animate_vehicles(&mut self, dt: f32) {
        for row in &mut self.rows {
            if let Some(lane) = row.lane_mut() {
                rows::animate_lane(lane, dt);
            }
        }
    }

    fn animate_player(&mut self, dt: f32) {
        let Some(&head) = self.moves.front() else {
            self.step_elapsed = 0.0;
            self.player_x = self.position.tile as f32 * TILE_SIZE;
            self.player_z = self.position.row as f32 * TILE_SIZE;
            self.player_hop = 0.0;
            return;
        };

        self.step_elapsed += dt;
        let progress = (self.step_elapsed / STEP_TIME).min(1.0);

        let start_x = self.position.tile as f32 * TILE_SIZE;
        let start_z = self.position.row as f32 * TILE_SIZE;
        let end = head.apply(self.position);
        let end_x = end.tile as f32 * TILE_SIZE;
        let end_z = end.row as f32 * TILE_SIZE;

        self.player_x = lerp(start_x, end_x, progress);
        self.player_z = lerp(start_z, end_z, progress);
        self.player_hop = (progress * PI).sin() * HOP_HEIGHT;
        // Lerp toward the target each frame rather than slerping from a
        // fixed start angle; re-queueing mid-step changes the turn rate.
        self.player_yaw = lerp(self.player_yaw, head.target_yaw(), progress);

        if progress >= 1.0 {
            self.step_completed();
        }
    }

    /// Commits the discrete move exactly once per completed step.
    fn step_completed(&mut self) {
        if let Some(direction) = self.moves.pop_front() {
            self.position = direction.apply(self.position);
        }
        self.step_elapsed = 0.0;
        self.player_hop = 0.0;

        if self.position.row > self.rows.len() as i32 - GENERATION_MARGIN {
            let batch = rows::generate_rows(&mut self.rng, ROW_BATCH);
            self.rows.extend(batch);
        }
    }

    /// Checks the row the player is standing in (board row `currentRow`,
    /// stored at index `currentRow - 1`). A step in flight toward the
    /// next row is therefore still judged against the row being left.
    fn hit_test(&mut self) {
        let Some(row) = self.row_at(self.position.row) else {
            return;
        };
        let (lane, length, depth) = match row {
            Row::CarLane(lane) => (lane, CAR_LENGTH, CAR_DEPTH),
            Row::TruckLane(lane) => (lane, TRUCK_LENGTH, TRUCK_DEPTH),
            Row::Forest { .. } => return,
        };

        let player = Aabb {
            x: self.player_x,
            z: self.player_z,
            width: PLAYER_WIDTH,
            depth: PLAYER_DEPTH,
        };
        let row_z = self.position.row as f32 * TILE_SIZE;
        let hit = lane.vehicles.iter().any(|vehicle| {
            player.intersects(&Aabb { x: vehicle.x, z: row_z, width: length, depth })
        });

        if hit {
            self.status = Status::GameOver { final_score: self.position.row };
        }
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use crate::game::rows::{generate_rows, Lane, Tree, Vehicle};

    fn open_rows(count: usize) -> Vec<Row> {
        (0..count).map(|_| Row::Forest { trees: Vec::new() }).collect()
    }

    fn car_lane_with(vehicle_xs: &[f32]) -> Row {
        Row::CarLane(Lane {
            direction: true,
            speed: 125.0,
            vehicles: vehicle_xs
                .iter()
                .map(|&x| Vehicle { start_tile: 0, color: (1.0, 0.0, 0.0), x })
                .collect(),
        })
    }

    fn run_steps(world: &mut World, steps: usize) {
        // Four quarter-step frames per hop.
        for _ in 0..steps * 4 {
            world.update(STEP_TIME / 4.0);
        }
    }

    #[test]
    fn forward_and_left_commit_expected_arithmetic() {
        assert_eq!(
            Direction::Forward.apply(Position { row: 2, tile: 0 }),
            Position { row: 3, tile: 0 }
        );
        assert_eq!(
            Direction::Left.apply(Position { row: 3, tile: 0 }),
            Position { row: 3, tile: -1 }
        );
    }

    #[test]
    fn queued_moves_resolve_to_final_position() {
        let mut world = World::with_rows(open_rows(30));
        world.queue_move(Direction::Forward);
        world.queue_move(Direction::Forward);
        world.queue_move(Direction::Left);
        assert_eq!(world.queue_len(), 3);

        run_steps(&mut world, 3);
        assert_eq!(world.position, Position { row: 2, tile: -1 });
        assert_eq!(world.queue_len(), 0);
    }

    #[test]
    fn right_at_max_tile_is_dropped() {
        let mut world = World::with_rows(open_rows(30));
        world.position = Position { row: 0, tile: MAX_TILE_INDEX };
        world.queue_move(Direction::Right);
        assert_eq!(world.queue_len(), 0);
        assert_eq!(world.position, Position { row: 0, tile: MAX_TILE_INDEX });
    }

    #[test]
    fn backward_from_start_is_dropped() {
        let mut world = World::with_rows(open_rows(30));
        world.queue_move(Direction::Backward);
        assert_eq!(world.queue_len(), 0);
    }

    #[test]
    fn move_into_tree_is_dropped() {
        let mut rows = open_rows(30);
        rows[0] = Row::Forest { trees: vec![Tree { tile: 0, height: 45.0 }] };
        let mut world = World::with_rows(rows);
        world.queue_move(Direction::Forward);
        assert_eq!(world.queue_len(), 0);

        // A detour around the tree is accepted.
        world.queue_move(Direction::Right);
        world.queue_move(Direction::Forward);
        assert_eq!(world.queue_len(), 2);
    }

    #[test]
    fn validity_folds_over_the_whole_queue() {
        let mut world = World::with_rows(open_rows(30));
        world.position = Position { row: 0, tile: MAX_TILE_INDEX - 1 };
        world.queue_move(Direction::Right);
        assert_eq!(world.queue_len(), 1);
        // Already heading to the edge; a second right would overshoot.
        world.queue_move(Direction::Right);
        assert_eq!(world.queue_len(), 1);
    }

    #[test]
    fn commit_happens_once_per_step() {
        let mut world = World::with_rows(open_rows(30));
        world.queue_move(Direction::Forward);
        world.update(STEP_TIME / 2.0);
        assert_eq!(world.position, Position::START);
        world.update(STEP_TIME / 2.0);
        assert_eq!(world.position, Position { row: 1, tile: 0 });
        // Further frames with an empty queue leave the position alone.
        world.update(STEP_TIME);
        assert_eq!(world.position, Position { row: 1, tile: 0 });
    }

    #[test]
    fn render_position_interpolates_and_hops() {
        let mut world = World::with_rows(open_rows(30));
        world.queue_move(Direction::Forward);
        world.update(STEP_TIME / 2.0);
        assert!((world.player_z - TILE_SIZE / 2.0).abs() < 1e-3);
        assert!((world.player_hop - HOP_HEIGHT).abs() < 1e-3);
        world.update(STEP_TIME / 2.0);
        assert!((world.player_z - TILE_SIZE).abs() < 1e-3);
        assert_eq!(world.player_hop, 0.0);
    }

    #[test]
    fn yaw_moves_toward_target_without_overshooting() {
        let mut world = World::with_rows(open_rows(30));
        world.queue_move(Direction::Left);
        world.update(STEP_TIME / 4.0);
        let first = world.player_yaw;
        assert!(first > 0.0 && first < FRAC_PI_2);
        world.update(STEP_TIME / 4.0);
        let second = world.player_yaw;
        assert!(second > first && second <= FRAC_PI_2);
    }

    #[test]
    fn crossing_the_margin_appends_a_batch() {
        let mut world = World::with_rows(open_rows(ROW_BATCH));
        for _ in 0..ROW_BATCH {
            world.queue_move(Direction::Forward);
        }
        run_steps(&mut world, ROW_BATCH);
        assert_eq!(world.position.row, ROW_BATCH as i32);
        assert!(world.rows.len() > ROW_BATCH);
    }

    #[test]
    fn vehicle_overlap_on_current_row_ends_the_round() {
        let mut rows = open_rows(30);
        rows[2] = car_lane_with(&[0.0]);
        let mut world = World::with_rows(rows);
        // Standing in board row 3, where the lane is.
        world.position = Position { row: 3, tile: 0 };
        world.update(0.0);
        assert_eq!(world.status, Status::GameOver { final_score: 3 });
    }

    #[test]
    fn distant_vehicle_does_not_collide() {
        let mut rows = open_rows(30);
        rows[2] = car_lane_with(&[4.0 * TILE_SIZE]);
        let mut world = World::with_rows(rows);
        world.position = Position { row: 3, tile: 0 };
        world.update(0.0);
        assert_eq!(world.status, Status::Playing);
    }

    #[test]
    fn game_over_freezes_the_simulation() {
        let mut rows = open_rows(30);
        rows[0] = car_lane_with(&[0.0]);
        let mut world = World::with_rows(rows);
        world.position = Position { row: 1, tile: 0 };
        world.update(0.0);
        let Status::GameOver { final_score } = world.status else {
            panic!("expected game over");
        };
        assert_eq!(final_score, 1);

        world.queue_move(Direction::Forward);
        assert_eq!(world.queue_len(), 0);
        world.update(STEP_TIME);
        assert_eq!(world.position, Position { row: 1, tile: 0 });
    }

    #[test]
    fn restart_resets_everything() {
        let mut world = World::new(1);
        world.queue_move(Direction::Forward);
        run_steps(&mut world, 1);
        world.restart(2);
        assert_eq!(world.position, Position::START);
        assert_eq!(world.status, Status::Playing);
        assert_eq!(world.queue_len(), 0);
        assert_eq!(world.rows.len(), ROW_BATCH);
        assert_eq!(world.player_x, 0.0);
        assert_eq!(world.player_z, 0.0);
    }

    #[test]
    fn generated_world_survives_a_burst_of_random_walking() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut world = World::with_rows(generate_rows(&mut rng, 40));
        let dirs = [Direction::Forward, Direction::Backward, Direction::Left, Direction::Right];
        for i in 0..200 {
            world.queue_move(dirs[i % dirs.len()]);
            world.update(0.05);
        }
        assert!(world.position.row >= 0);
        assert!((MIN_TILE_INDEX..=MAX_TILE_INDEX).contains(&world.position.tile));
    }

    proptest! {
        #[test]
        fn committed_position_never_leaves_the_board(
            seed in any::<u64>(),
            moves in proptest::collection::vec(0..4usize, 0..60),
        ) {
            let mut world = World::new(seed);
            let dirs = [Direction::Forward, Direction::Backward, Direction::Left, Direction::Right];
            for m in moves {
                world.queue_move(dirs[m]);
            }
            for _ in 0..1000 {
                world.update(0.05);
            }
            prop_assert!(world.position.row >= 0);
            prop_assert!(world.position.tile >= MIN_TILE_INDEX);
            prop_assert!(world.position.tile <= MAX_TILE_INDEX);
        }

        #[test]
        fn wrapped_vehicles_stay_inside_lane_bounds(seed in any::<u64>()) {
            let mut world = World::new(seed);
            for _ in 0..300 {
                world.update(0.03);
            }
            for row in &world.rows {
                if let Some(lane) = row.lane() {
                    for vehicle in &lane.vehicles {
                        // One frame of travel past a bound at most.
                        prop_assert!(vehicle.x >= rows::LANE_MIN_X - lane.speed * 0.03);
                        prop_assert!(vehicle.x <= rows::LANE_MAX_X + lane.speed * 0.03);
                    }
                }
            }
        }
    }
}
