/// Entry point and frame loop.
///
/// Each frame: drain keyboard and gamepad, run operator commands, poll the
/// theatre at the configured rate, hand its intents to the stage (and the
/// speakers), then render the stage.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use config::AppConfig;
use domain::area::AreaTable;
use domain::gesture::KONAMI_CODE;
use sim::theatre::Theatre;
use ui::gamepad::GamepadState;
use ui::input::KeyboardState;
use ui::renderer::Renderer;
use ui::sound::{cue_for, SoundEngine};
use ui::stage::Stage;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = AppConfig::load();
    init_logging(&config);
    for warning in &config.warnings {
        log::warn!("{warning}");
    }

    let areas = match AreaTable::load(Some(config.areas_file.as_path())) {
        Ok(a) => a,
        Err(e) => {
            log::error!("area table: {e}");
            eprintln!("Could not load areas: {e}");
            std::process::exit(1);
        }
    };
    log::info!("{} areas loaded", areas.len());

    let mut theatre = match Theatre::new(areas, &config) {
        Ok(t) => t,
        Err(e) => {
            log::error!("start area: {e}");
            eprintln!("Could not start: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = run(&mut theatre, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("{e}");
        eprintln!("Error: {e}");
    }
    log::info!("shutting down");
}

/// Logs go to a file; the terminal belongs to the renderer.
fn init_logging(config: &AppConfig) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match File::create(&config.log_file) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", config.log_file.display());
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn run(
    theatre: &mut Theatre,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = KeyboardState::new();
    kb.honor_release = renderer.enable_key_release()?;
    log::info!("key release events: {}", kb.honor_release);
    let mut gp = GamepadState::new();
    let mut stage = Stage::new(theatre.viewport());

    let started = Instant::now();
    let elapsed_ms = || started.elapsed().as_millis() as u64;
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let mut last_tick = Instant::now();

    theatre.start();
    for intent in theatre.drain_intents() {
        stage.apply(0, &intent);
    }

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_requested() {
            break;
        }

        for cmd in kb.commands() {
            log::debug!("command {cmd:?}");
            theatre.command(elapsed_ms(), cmd);
        }

        if last_tick.elapsed() >= tick_rate {
            theatre.poll(elapsed_ms(), gp.report().as_ref(), &kb.logical());
            last_tick = Instant::now();
        }

        let now = elapsed_ms();
        for intent in theatre.drain_intents() {
            if let (Some(sfx), Some(cue)) = (sound, cue_for(&intent, KONAMI_CODE.len())) {
                sfx.play(cue);
            }
            stage.apply(now, &intent);
        }

        renderer.render(&stage, now)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}
