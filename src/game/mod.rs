//! Core game logic module for Snake
//!
//! This module contains all the game logic without any I/O, timing or
//! rendering dependencies. A front end drives it by calling `tick` on a
//! fixed interval and forwarding turns.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

// Re-export commonly used types
pub use action::Direction;
pub use config::GameConfig;
pub use engine::{GameEngine, GameEvent, StepResult, spawn_food};
pub use state::{CollisionType, GameOutcome, GameState, Position, Snake};
