use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stderr, stderr};
use std::time::Duration;
use tokio::time::interval;
use tracing::info;

use crate::game::{GameEngine, GameState};
use crate::input::{InputHandler, KeyAction};
use crate::metrics::GameMetrics;
use crate::render::Renderer;
use crate::session::GameSession;

pub struct HumanMode {
    session: GameSession,
    state: GameState,
    metrics: GameMetrics,
    renderer: Renderer,
    input_handler: InputHandler,
    should_quit: bool,
    game_over_recorded: bool,
}

impl HumanMode {
    pub fn new(engine: GameEngine) -> Self {
        let session = GameSession::new(engine);
        let state = session.snapshot();

        Self {
            session,
            state,
            metrics: GameMetrics::new(),
            renderer: Renderer::new(),
            input_handler: InputHandler::new(),
            should_quit: false,
            game_over_recorded: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut terminal = undo_on_error(Self::setup_terminal, || {
            let _ = execute!(stderr(), LeaveAlternateScreen);
            let _ = disable_raw_mode();
        })?;

        info!("game started");
        self.session.start();

        // Run game loop with cleanup
        let result = self.run_game_loop(&mut terminal).await;

        self.session.stop();
        self.cleanup_terminal(&mut terminal)?;

        result
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stderr>>> {
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;
        Ok(terminal)
    }

    async fn run_game_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut updates = self.session.subscribe();

        // The board redraws on every state change; this only keeps the clock moving.
        let mut clock_timer = interval(Duration::from_secs(1));

        loop {
            self.metrics.update();
            terminal
                .draw(|frame| {
                    self.renderer.render(frame, &self.state, &self.metrics);
                })
                .context("Failed to draw frame")?;

            tokio::select! {
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(err)) => return Err(err).context("Failed to read terminal event"),
                        None => self.should_quit = true,
                    }
                }

                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    self.apply_state(state);
                }

                _ = clock_timer.tick() => {}

                // Handle Ctrl+C
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };

        // Only process key press events, not release
        if key.kind != KeyEventKind::Press {
            return;
        }

        match self.input_handler.handle_key_event(key) {
            KeyAction::Turn(direction) => {
                self.session.set_direction(direction);
            }
            KeyAction::Restart => self.reset_game(),
            KeyAction::Quit => self.should_quit = true,
            KeyAction::None => {}
        }
    }

    fn apply_state(&mut self, state: GameState) {
        if state.game_over && !self.game_over_recorded {
            self.metrics.on_game_over(state.score);
            self.game_over_recorded = true;
        }

        self.state = state;
    }

    fn reset_game(&mut self) {
        // The tick that ended the game may not have reached the watch branch yet.
        self.apply_state(self.session.snapshot());

        if !self.state.game_over {
            info!(score = self.state.score, "game abandoned");
        }

        self.session.reset();
        self.state = self.session.snapshot();
        self.metrics.on_game_start();
        self.game_over_recorded = false;
    }

    fn cleanup_terminal(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}

/// Run `setup`, calling `undo` before handing back any error it returns
fn undo_on_error<T>(setup: impl FnOnce() -> Result<T>, undo: impl FnOnce()) -> Result<T> {
    let result = setup();
    if result.is_err() {
        undo();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CollisionType, Direction, GameConfig, GameOutcome, Position, Snake};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_game_initialization() {
        let mode = HumanMode::new(GameEngine::with_seed(GameConfig::default(), 3));
        assert!(!mode.state.game_over);
        assert_eq!(mode.state.score, 0);
        assert_eq!(mode.state.snake.body, vec![Position::new(7, 7)]);
    }

    #[test]
    fn test_game_over_recorded_once() {
        let mut mode = HumanMode::new(GameEngine::with_seed(GameConfig::default(), 3));
        let mut state = mode.state.clone();
        state.score = 6;
        state.game_over = true;
        state.outcome = Some(GameOutcome::Collision(CollisionType::Wall));

        mode.apply_state(state.clone());
        mode.apply_state(state);

        assert_eq!(mode.metrics.games_played, 1);
        assert_eq!(mode.metrics.best_score, 6);
    }

    #[test]
    fn test_quit_key() {
        let mut mode = HumanMode::new(GameEngine::with_seed(GameConfig::default(), 3));
        mode.handle_event(key(KeyCode::Char('q')));
        assert!(mode.should_quit);
    }

    #[test]
    fn test_undo_on_error_only_runs_on_failure() {
        let mut undone = false;
        let value = undo_on_error(|| Ok(5), || undone = true).unwrap();
        assert_eq!(value, 5);
        assert!(!undone);

        let result: Result<()> = undo_on_error(|| Err(anyhow::anyhow!("no tty")), || undone = true);
        assert!(result.is_err());
        assert!(undone);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_records_game_that_just_ended() {
        let mut engine = GameEngine::with_seed(GameConfig::default(), 3);
        let mut state = GameState::new(
            Snake::new(Position::new(7, 0), Direction::Up),
            Position::new(0, 14),
            15,
        );
        state.score = 9;
        engine.restore(state);

        let mut mode = HumanMode::new(engine);
        mode.session.start();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(mode.session.snapshot().game_over);
        assert!(!mode.state.game_over);

        mode.handle_event(key(KeyCode::Char('r')));

        assert_eq!(mode.metrics.games_played, 1);
        assert_eq!(mode.metrics.best_score, 9);
        assert_eq!(mode.state.score, 0);
        assert!(!mode.state.game_over);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_key_resets_game() {
        let mut mode = HumanMode::new(GameEngine::with_seed(GameConfig::default(), 3));
        mode.session.start();
        mode.handle_event(key(KeyCode::Left));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(mode.session.snapshot().snake.head(), Position::new(6, 7));

        mode.handle_event(key(KeyCode::Char('r')));

        assert_eq!(mode.state.snake.body, vec![Position::new(7, 7)]);
        assert_eq!(mode.state.direction(), Direction::Up);
        assert!(!mode.game_over_recorded);
    }
}
