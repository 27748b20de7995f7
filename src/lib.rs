//! Grid Snake - a single-player snake game on a square grid
//!
//! This library provides:
//! - The deterministic game engine (game module)
//! - Tick scheduling and state publication around the engine (session module)
//! - Terminal input mapping and TUI rendering (input and render modules)
//! - The interactive terminal mode (modes module)

pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod render;
pub mod session;
