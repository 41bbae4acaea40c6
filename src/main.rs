/// Blast Grid: terminal bomb arena against AI opponents.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::execute;
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::FrameInput;
use domain::grid::Dir;
use sim::event::GameEvent;
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{InputState, Key};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const LOG_FILE: &str = "blastgrid.log";

fn main() {
    // The terminal belongs to the renderer, so logs go to a file.
    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {e:#}");
    }

    let mut world = match GameConfig::load() {
        Ok(cfg) => WorldState::new(cfg),
        Err(e) => {
            tracing::error!("initialization failed: {e:#}");
            WorldState::failed(&e)
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut world, &mut renderer, sound.as_ref());

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!("game loop aborted: {e:#}");
        eprintln!("Game error: {e:#}");
    }

    println!();
    println!("Thanks for playing Blast Grid! Matches played: {}", world.matches_played);
}

fn init_logging() -> Result<()> {
    let file = File::create(LOG_FILE).with_context(|| format!("could not create {LOG_FILE}"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("could not install log subscriber: {e}"))?;
    Ok(())
}

fn game_loop(world: &mut WorldState, renderer: &mut Renderer, sound: Option<&SoundEngine>) -> Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = enable_key_release();
    let mut gp = GamepadState::new();
    gp.load_button_config(&world.config.gamepad);

    let frame = Duration::from_millis(world.config.timing.frame_ms);
    let mut last_frame = Instant::now();

    let result = loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break Ok(());
        }
        if handle_meta(world, &kb, &gp) {
            break Ok(());
        }

        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        if world.phase == Phase::Playing {
            let input = FrameInput {
                movement: detect_movement(&kb, &gp),
                place_bomb: kb.was_pressed(Key::Bomb) || gp.place_bomb_pressed(),
            };
            let events = step::step(world, input, dt);
            process_sound_events(sound, &events);
        }
        world.anim_tick = world.anim_tick.wrapping_add(1);

        if let Err(e) = renderer.render(world) {
            break Err(anyhow::Error::new(e).context("render failed"));
        }
        std::thread::sleep(frame.saturating_sub(last_frame.elapsed()));
    };

    if kb.honor_release {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    result
}

/// Ask the terminal for key Release events. Without them, held keys
/// expire on a timeout instead.
fn enable_key_release() -> bool {
    let supported = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
    if !supported {
        tracing::info!("keyboard enhancement unsupported, using hold timeout");
        return false;
    }
    execute!(
        io::stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .is_ok()
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for cue in events.iter().filter_map(GameEvent::sound) {
        sfx.play(cue.name, cue.volume);
    }
}

fn detect_movement(kb: &InputState, gp: &GamepadState) -> Option<Dir> {
    kb.movement().or_else(|| Dir::ALL.into_iter().find(|&d| gp.dir_held(d)))
}

/// Menu and phase keys. Returns true when the player asked to quit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState) -> bool {
    let confirm = kb.was_pressed(Key::Confirm) || gp.confirm_pressed();
    let back = kb.was_pressed(Key::Back) || gp.cancel_pressed();
    let quit = kb.was_pressed(Key::Quit);

    match world.phase {
        Phase::Title => {
            if quit || back {
                return true;
            }
            if confirm && world.can_start() {
                world.phase = Phase::Instructions;
            }
        }
        Phase::Instructions => {
            if quit {
                return true;
            }
            if confirm {
                world.start_match();
            } else if back {
                world.return_to_title();
            }
        }
        Phase::Playing => {
            if back {
                tracing::info!("match abandoned");
                world.return_to_title();
            }
        }
        phase if phase.is_game_over() => {
            if confirm || back {
                world.return_to_title();
            }
        }
        _ => {}
    }
    false
}
