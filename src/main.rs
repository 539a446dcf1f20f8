use anyhow::{Context, Result};
use clap::Parser;
use cloudchamber::display::{
    Display, InputEvent, MouseButtonKind, RenderTarget, DEFAULT_HEIGHT, DEFAULT_WIDTH,
};
use cloudchamber::util::FpsCounter;
use cloudchamber::{
    ChamberConfig, JsonFileStore, MemoryStore, ParticleChamber, PixelBuffer, PreferenceStore,
    Theme, ToggleButton,
};
use sdl2::keyboard::Keycode;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, warn};

const TITLE: &str = "cloudchamber";

#[derive(Parser, Debug)]
#[command(
    name = "cloudchamber",
    version,
    about = "Charged particles curling through a magnetic field, shed by your pointer"
)]
struct Cli {
    /// Window width
    #[arg(long, short = 'W', default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Window height
    #[arg(long, short = 'H', default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Disable VSync for uncapped framerate
    #[arg(long)]
    no_vsync: bool,

    /// Starting theme ("dark", anything else is light); T switches live
    #[arg(long, default_value = "light")]
    theme: Theme,

    /// JSON file with chamber tuning overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preference file (defaults to the platform config directory)
    #[arg(long, env = "CLOUDCHAMBER_PREFS")]
    prefs: Option<PathBuf>,

    /// Fixed RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Draw lines between nearby particles
    #[arg(long)]
    connections: bool,

    /// Hide the on-screen toggle (P still toggles)
    #[arg(long)]
    no_toggle: bool,

    /// Show FPS in the window title
    #[arg(long)]
    fps: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(cli: &Cli) -> Result<ChamberConfig> {
    let mut config = match &cli.config {
        Some(path) => ChamberConfig::load(path)
            .with_context(|| format!("loading chamber config {}", path.display()))?,
        None => ChamberConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.connections {
        config.connections.enabled = true;
    }
    Ok(config)
}

fn open_store(cli: &Cli) -> Box<dyn PreferenceStore> {
    match cli.prefs.clone().or_else(JsonFileStore::default_path) {
        Some(path) => {
            info!(path = %path.display(), "using preference file");
            Box::new(JsonFileStore::open(path))
        },
        None => {
            warn!("no config directory available; preferences will not persist");
            Box::new(MemoryStore::new())
        },
    }
}

fn toggle_chamber(chamber: &mut ParticleChamber, button: Option<&mut ToggleButton>) {
    let enabled = chamber.toggle();
    if let Some(button) = button {
        button.sync(enabled);
    }
    info!(enabled, "chamber toggled");
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let store = open_store(&cli);
    let theme = Rc::new(Cell::new(cli.theme));

    let (mut display, texture_creator) =
        Display::with_options(TITLE, cli.width, cli.height, !cli.no_vsync)?;
    let (width, height) = (display.width(), display.height());
    let mut target = RenderTarget::with_size(&texture_creator, width, height)?;

    let mut chamber =
        ParticleChamber::new(config, width, height, store, Box::new(Rc::clone(&theme)));
    let mut frame = PixelBuffer::with_size(width, height);
    let mut toggle =
        (!cli.no_toggle).then(|| ToggleButton::new(width, height, chamber.is_enabled()));

    // FPS counter with 60 sample rolling average
    let mut fps_counter = FpsCounter::new(60);
    let mut show_fps = cli.fps;
    let mut frame_number: u64 = 0;

    info!(
        width,
        height,
        vsync = !cli.no_vsync,
        theme = theme.get().as_str(),
        "cloudchamber started (P toggle, T theme, F fps, Esc quit)"
    );

    'main: loop {
        let (_dt, avg_fps) = fps_counter.tick();

        for event in display.poll_events() {
            match event {
                InputEvent::Quit => break 'main,
                InputEvent::KeyDown(key) => match key {
                    Keycode::Escape => break 'main,
                    Keycode::P => toggle_chamber(&mut chamber, toggle.as_mut()),
                    Keycode::T => {
                        theme.set(theme.get().toggled());
                        info!(theme = theme.get().as_str(), "theme switched");
                    },
                    Keycode::F => {
                        show_fps = !show_fps;
                        if !show_fps {
                            display.set_title(TITLE);
                        }
                    },
                    _ => {},
                },
                InputEvent::MouseMove { x, y } => chamber.pointer_moved(x as f32, y as f32),
                InputEvent::MouseDown {
                    x,
                    y,
                    button: MouseButtonKind::Left,
                } => {
                    if toggle.as_ref().is_some_and(|b| b.contains(x, y)) {
                        toggle_chamber(&mut chamber, toggle.as_mut());
                    }
                },
                InputEvent::MouseDown { .. } => {},
                InputEvent::PointerLeave => chamber.pointer_left(),
                InputEvent::Resized { width, height } => {
                    chamber.resize(width, height);
                    frame = PixelBuffer::with_size(width, height);
                    target = RenderTarget::with_size(&texture_creator, width, height)?;
                    if let Some(button) = toggle.as_mut() {
                        button.anchor(width, height);
                    }
                    info!(width, height, "viewport resized");
                },
            }
        }

        chamber.frame();

        frame.copy_from(chamber.surface());
        if let Some(button) = &toggle {
            button.render(&mut frame, theme.get());
        }

        frame_number += 1;
        if show_fps && frame_number % 30 == 0 {
            let (min_fps, max_fps) = fps_counter.min_max_fps();
            display.set_title(&format!(
                "{}  {} fps ({}-{})  {:.1}ms  {} particles",
                TITLE,
                avg_fps as u32,
                min_fps as u32,
                max_fps as u32,
                fps_counter.avg_frame_time_ms(),
                chamber.particle_count()
            ));
        }

        display.present(&mut target, &frame)?;
    }

    info!(frames = frame_number, "cloudchamber stopped");
    Ok(())
}
