//! Runtime glue around the game engine
//!
//! A [`GameSession`] puts the engine behind a single lock so the tick timer
//! and input events can interleave safely, owns the tick timer for as long
//! as a game is running, and publishes every state change on a watch
//! channel for whatever is drawing the board.

pub mod timer;

pub use timer::TickTimer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::game::{Direction, GameEngine, GameState};

pub struct GameSession {
    engine: Arc<Mutex<GameEngine>>,
    updates: watch::Receiver<GameState>,
    timer: Option<TickTimer>,
    period: Duration,
}

fn lock(engine: &Mutex<GameEngine>) -> MutexGuard<'_, GameEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

impl GameSession {
    /// Wrap an engine. The timer is not armed until [`start`](Self::start).
    pub fn new(mut engine: GameEngine) -> Self {
        let period = engine.config().tick_interval();
        let (sender, updates) = watch::channel(engine.state().clone());

        engine.subscribe(move |_, state| {
            sender.send_replace(state.clone());
        });

        Self {
            engine: Arc::new(Mutex::new(engine)),
            updates,
            timer: None,
            period,
        }
    }

    /// Arm the tick timer if the game is running and no timer is active
    ///
    /// The timer releases itself on the tick that ends the game.
    pub fn start(&mut self) {
        if self.is_timer_active() || lock(&self.engine).is_game_over() {
            return;
        }

        let engine = Arc::clone(&self.engine);
        self.timer = Some(TickTimer::spawn(self.period, move || {
            !lock(&engine).tick().terminated
        }));
        debug!(period_ms = self.period.as_millis() as u64, "tick timer armed");
    }

    /// Cancel the tick timer, leaving the game where it is
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            debug!("tick timer released");
        }
    }

    /// Start over from the initial state with a fresh timer
    pub fn reset(&mut self) {
        self.stop();
        lock(&self.engine).reset();
        self.start();
    }

    /// Forward a turn to the engine; returns whether it was accepted
    pub fn set_direction(&self, direction: Direction) -> bool {
        lock(&self.engine).set_direction(direction)
    }

    pub fn snapshot(&self) -> GameState {
        lock(&self.engine).state().clone()
    }

    /// Receiver that is marked changed after every state mutation
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.updates.clone()
    }

    pub fn is_timer_active(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }
}
