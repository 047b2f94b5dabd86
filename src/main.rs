/// Entry point and frame loop for the terminal frontend.
///
/// Input is drained every frame; the simulation advances on a fixed
/// tick (`timing.tick_rate_ms`); the renderer redraws every frame.

mod ui;

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};

use sidescroller::config::GameConfig;
use sidescroller::sim::event::GameEvent;
use sidescroller::sim::session::{Phase, Session};
use ui::input::{InputState, KEYS_PAUSE, KEYS_QUIT, KEYS_RESTART};
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = GameConfig::load();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms.max(1));
    let mut session = Session::new(config);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }
    let mut input = InputState::new();
    input.honor_release = enable_key_release();

    let result = game_loop(&mut session, &mut renderer, &mut input, tick_rate);

    if input.honor_release {
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Final score: {}", session.score);
}

/// Ask the terminal for Release events. Only trusted when supported.
fn enable_key_release() -> bool {
    if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
        return false;
    }
    execute!(
        std::io::stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .is_ok()
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    input: &mut InputState,
    tick_rate: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut last_tick = Instant::now();
    let mut paused = false;

    loop {
        input.drain_events();

        if input.ctrl_c_pressed() || input.any_pressed(KEYS_QUIT) {
            break;
        }

        if session.is_over() {
            if input.any_pressed(&[KeyCode::Enter]) {
                session.restart();
            }
        } else if input.any_pressed(KEYS_PAUSE) {
            paused = !paused;
        } else if input.any_pressed(KEYS_RESTART) && session.phase == Phase::Playing {
            // Give up the current attempt.
            let mut events = vec![];
            sidescroller::sim::player::kill(&mut session.state, &mut events);
            session.apply(&events);
        }

        if last_tick.elapsed() >= tick_rate {
            if !paused {
                for event in session.tick(input.frame_input()) {
                    if event == GameEvent::ExtraLife {
                        log::debug!("extra life, {} total", session.lives);
                    }
                }
            }
            last_tick = Instant::now();
        }

        renderer.render(session, paused)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}
