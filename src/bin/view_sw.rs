//! view_sw - walk through a map with the software renderer.
//!
//! ```bash
//! cargo run --release -- doom1.wad --map E1M1 --width 640 --height 400
//! ```
//!
//! Arrows / WASD move and turn, Alt + ←/→ strafes, Shift runs,
//! PageUp/PageDown fly, F toggles full-bright, Esc quits.

use anyhow::{Context, bail};
use bspview::{
    engine::{
        Engine, Frame,
        types::{MAX_SCREEN_HEIGHT, MAX_SCREEN_WIDTH},
    },
    wad::{Wad, load_catalog, load_level},
};
use clap::Parser;
use glam::Vec2;
use log::{LevelFilter, info};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

const EYE_HEIGHT: f32 = 41.0;
const WALK_SPEED: f32 = 8.0;
const RUN_SPEED: f32 = 16.0;
const TURN_SPEED: f32 = 0.06;

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// IWAD or PWAD to load
    #[arg(value_name = "WAD")]
    wad: PathBuf,

    /// Map marker name (`E1M1`, `MAP01`) or index into the map list
    #[arg(long, default_value = "0")]
    map: String,

    #[arg(long, default_value_t = 640)]
    width: usize,

    #[arg(long, default_value_t = 400)]
    height: usize,

    /// off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log: LevelFilter,

    /// Sky texture name; defaults to the one the map slot uses
    #[arg(long)]
    sky: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    TermLogger::init(
        opts.log,
        ConfigBuilder::default()
            .set_time_level(LevelFilter::Trace)
            .build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let wad = Wad::from_file(&opts.wad)
        .with_context(|| format!("opening {}", opts.wad.display()))?;
    let maps = wad.level_indices();
    let marker = match opts.map.parse::<usize>() {
        Ok(i) => *maps
            .get(i)
            .with_context(|| format!("map index {i} out of range ({} maps)", maps.len()))?,
        Err(_) => wad
            .level_by_name(&opts.map)
            .with_context(|| format!("no map called {}", opts.map))?,
    };

    let catalog = load_catalog(&wad)?;
    let loaded = load_level(&wad, marker, &catalog, opts.sky.as_deref())?;
    let level = loaded.level;
    let (start, angle) = loaded
        .player_start
        .map_or((Vec2::ZERO, 0.0), |s| (s.pos, s.angle));

    let (mut w, mut h) = (opts.width, opts.height);
    if w > MAX_SCREEN_WIDTH || h > MAX_SCREEN_HEIGHT {
        bail!("window {w}x{h} larger than {MAX_SCREEN_WIDTH}x{MAX_SCREEN_HEIGHT}");
    }

    let mut engine = Engine::new(catalog);
    engine.on_resolution_changed(w, h)?;

    let mut win = Window::new(
        &format!("bspview - {}", level.name),
        w,
        h,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )?;
    win.set_target_fps(35);

    let mut frame = Frame::new(start, level.floor_height_at(start) + EYE_HEIGHT, angle);
    let mut fly = 0.0f32;
    let mut rgb = vec![0u32; w * h];

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        /* --------------- resize --------------------------------------- */
        let (nw, nh) = win.get_size();
        let (nw, nh) = (nw.clamp(1, MAX_SCREEN_WIDTH), nh.clamp(1, MAX_SCREEN_HEIGHT));
        if (nw, nh) != (w, h) {
            (w, h) = (nw, nh);
            engine.on_resolution_changed(w, h)?;
            rgb.resize(w * h, 0);
        }

        /* --------------- input ---------------------------------------- */
        let speed = if win.is_key_down(Key::LeftShift) || win.is_key_down(Key::RightShift) {
            RUN_SPEED
        } else {
            WALK_SPEED
        };
        let alt = win.is_key_down(Key::LeftAlt) || win.is_key_down(Key::RightAlt);
        let (mut forward, mut side) = (0.0, 0.0);

        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += speed;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= speed;
        }
        if win.is_key_down(Key::A) || (alt && win.is_key_down(Key::Left)) {
            side -= speed;
        }
        if win.is_key_down(Key::D) || (alt && win.is_key_down(Key::Right)) {
            side += speed;
        }
        if !alt {
            if win.is_key_down(Key::Left) {
                frame.turn(TURN_SPEED);
            }
            if win.is_key_down(Key::Right) {
                frame.turn(-TURN_SPEED);
            }
        }
        if win.is_key_down(Key::PageUp) {
            fly += speed;
        }
        if win.is_key_down(Key::PageDown) {
            fly -= speed;
        }
        if win.is_key_pressed(Key::F, KeyRepeat::No) {
            frame.fixed_colormap = match frame.fixed_colormap {
                None => Some(0),
                Some(_) => None,
            };
        }

        frame.step(forward, side);
        frame.z = level.floor_height_at(frame.pos) + EYE_HEIGHT + fly;

        /* --------------- draw ----------------------------------------- */
        let t0 = Instant::now();
        engine.render_frame(&level, &frame)?;
        acc_time += t0.elapsed();
        acc_frames += 1;

        let palette = engine.catalog().palette();
        for (dst, &idx) in rgb.iter_mut().zip(&engine.screen().pixels) {
            *dst = palette[idx as usize];
        }
        win.update_with_buffer(&rgb, w, h)?;

        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            let stats = engine.stats();
            info!(
                "avg render: {avg_ms:.2} ms ({:.1} FPS), {} subsectors, {} visplanes",
                1000.0 / avg_ms,
                stats.subsectors,
                stats.visplanes
            );
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
