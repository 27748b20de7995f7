use super::{
    action::Direction,
    config::GameConfig,
    state::{CollisionType, GameOutcome, GameState, Position, Snake},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info};

/// Result of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// Whether the snake ate food this step
    pub ate_food: bool,
    /// Type of collision if one occurred
    pub collision_type: Option<CollisionType>,
    /// Whether the game is over after this step
    pub terminated: bool,
}

/// Notification delivered to observers after a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A tick advanced the game
    Ticked(StepResult),
    /// A turn was accepted and will apply on the next tick
    DirectionChanged(Direction),
    /// The game went back to its initial state
    Reset,
    /// An arbitrary state was installed with [`GameEngine::restore`]
    Restored,
}

type Observer = Box<dyn FnMut(&GameEvent, &GameState) + Send>;

/// The game engine that owns the game state and enforces the rules
///
/// The engine is synchronous and knows nothing about clocks or input
/// devices. Something outside calls [`tick`](Self::tick) at a fixed
/// interval and forwards turns through [`set_direction`](Self::set_direction).
pub struct GameEngine {
    config: GameConfig,
    state: GameState,
    pending_direction: Direction,
    rng: StdRng,
    observers: Vec<Observer>,
}

impl GameEngine {
    /// Create a new game engine seeded from system entropy
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a game engine whose food placement is reproducible
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, mut rng: StdRng) -> Self {
        let state = Self::initial_state(&config, &mut rng);

        Self {
            pending_direction: state.direction(),
            config,
            state,
            rng,
            observers: Vec::new(),
        }
    }

    fn initial_state(config: &GameConfig, rng: &mut StdRng) -> GameState {
        let snake = Snake::new(config.start_position(), Direction::Up);

        match spawn_food(rng, config.grid_size, &snake) {
            Some(food) => GameState::new(snake, food, config.grid_size),
            None => {
                // A board too small to hold both the snake and a food cell.
                let food = snake.head();
                let mut state = GameState::new(snake, food, config.grid_size);
                state.end(GameOutcome::BoardFilled);
                state
            }
        }
    }

    /// Register a callback invoked after every state change
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&GameEvent, &GameState) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Reset the game to its initial state
    pub fn reset(&mut self) -> &GameState {
        self.state = Self::initial_state(&self.config, &mut self.rng);
        self.pending_direction = self.state.direction();

        info!(food = ?self.state.food, "game reset");
        self.notify(&GameEvent::Reset);

        &self.state
    }

    /// Replace the current state wholesale
    ///
    /// The pending direction becomes the state's committed direction.
    pub fn restore(&mut self, state: GameState) {
        self.pending_direction = state.direction();
        self.state = state;
        self.notify(&GameEvent::Restored);
    }

    /// Queue a turn for the next tick
    ///
    /// Turning back onto the committed direction of travel is ignored, as is
    /// any call once the game is over. Returns whether the turn was accepted.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if self.state.game_over || self.state.direction().is_opposite(direction) {
            return false;
        }

        self.pending_direction = direction;
        self.notify(&GameEvent::DirectionChanged(direction));
        true
    }

    /// Advance the game by one step
    pub fn tick(&mut self) -> StepResult {
        if self.state.game_over {
            return StepResult {
                ate_food: false,
                collision_type: None,
                terminated: true,
            };
        }

        let direction = self.pending_direction;
        let new_head = self.state.snake.head().moved_in_direction(direction);

        let result = if let Some(collision_type) = self.check_collision(new_head) {
            self.state.end(GameOutcome::Collision(collision_type));
            info!(
                score = self.state.score,
                length = self.state.snake.len(),
                ?collision_type,
                "game over"
            );

            StepResult {
                ate_food: false,
                collision_type: Some(collision_type),
                terminated: true,
            }
        } else {
            let ate_food = new_head == self.state.food;

            self.state.snake.direction = direction;
            self.state.snake.advance(new_head, ate_food);

            if ate_food {
                self.state.score += 1;
                match spawn_food(&mut self.rng, self.state.grid_size, &self.state.snake) {
                    Some(food) => {
                        debug!(score = self.state.score, ?food, "food eaten");
                        self.state.food = food;
                    }
                    None => {
                        self.state.end(GameOutcome::BoardFilled);
                        info!(score = self.state.score, "board filled");
                    }
                }
            }

            StepResult {
                ate_food,
                collision_type: None,
                terminated: self.state.game_over,
            }
        };

        self.notify(&GameEvent::Ticked(result.clone()));
        result
    }

    /// Check if the new head position causes a collision
    ///
    /// The body is checked as it stands before the move, so stepping onto
    /// the current tail cell counts even though the tail would vacate it.
    fn check_collision(&self, pos: Position) -> Option<CollisionType> {
        if !self.state.is_in_bounds(pos) {
            return Some(CollisionType::Wall);
        }

        if self.state.snake.occupies(pos) {
            return Some(CollisionType::SelfCollision);
        }

        None
    }

    fn notify(&mut self, event: &GameEvent) {
        for observer in &mut self.observers {
            observer(event, &self.state);
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Snake segments, head first
    pub fn snake(&self) -> &[Position] {
        &self.state.snake.body
    }

    pub fn food(&self) -> Position {
        self.state.food
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    /// Direction applied by the most recent tick
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Direction the next tick will apply
    pub fn pending_direction(&self) -> Direction {
        self.pending_direction
    }
}

/// Pick a uniformly random free cell by rejection sampling
///
/// Returns `None` when the snake already covers the whole board.
pub fn spawn_food<R: Rng>(rng: &mut R, grid_size: usize, snake: &Snake) -> Option<Position> {
    if snake.len() >= grid_size * grid_size {
        return None;
    }

    loop {
        let x = rng.gen_range(0..grid_size) as i32;
        let y = rng.gen_range(0..grid_size) as i32;
        let pos = Position::new(x, y);

        if !snake.occupies(pos) {
            return Some(pos);
        }
    }
}
