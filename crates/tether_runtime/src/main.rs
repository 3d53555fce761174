//! Tether Desktop Harness
//!
//! Drives a runtime session the way a headset host would: init once, then
//! update and draw both eyes every frame, with synthetic head tracking.

use anyhow::{Context as _, Result};
use clap::Parser;
use glam::{Mat4, Quat, Vec3};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tether_core::fatal;
use tether_core::frame::{
    DisplayDimensions, EyeDrawRequest, FrameDrawData, FrameUpdateData, EYE_COUNT,
};
use tether_core::time::FrameClock;
use tether_script::{FrameError, InitParams, RuntimeSession};
use tether_services::{init_logging, Settings};

/// Half the interpupillary distance, in meters
const HALF_IPD: f32 = 0.032;

#[derive(Debug, Parser)]
#[command(name = "tether", version, about = "Run a tether application package on the desktop")]
struct Args {
    /// Writable root (mirror, save directory and change token live here)
    #[arg(long)]
    writable: PathBuf,

    /// Application package: zip archive or directory
    #[arg(long)]
    package: PathBuf,

    /// Frames to run before asking the application to quit
    #[arg(long, default_value_t = 600)]
    frames: u64,

    #[arg(long, default_value_t = 72.0)]
    fps: f64,

    #[arg(long, default_value_t = 1024)]
    eye_width: u32,

    #[arg(long, default_value_t = 1024)]
    eye_height: u32,

    /// JSON settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Overrides the settings file's log level
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    init_logging(args.log_level.as_deref().unwrap_or(&settings.logging.level));
    fatal::install_panic_hook();

    tracing::info!("Tether v{}", tether_core::VERSION);

    std::fs::create_dir_all(&args.writable)
        .with_context(|| format!("creating {}", args.writable.display()))?;

    let params = InitParams {
        writable_root: args.writable.clone(),
        package: args.package.clone(),
        display: DisplayDimensions {
            width: args.eye_width,
            height: args.eye_height,
        },
        zero_display_time: 0.0,
    };
    let mut session = match RuntimeSession::init(&params, &settings, Box::new(log_draw)) {
        Ok(session) => session,
        Err(err) => fatal::terminate("init", &err),
    };

    let frame_time = Duration::from_secs_f64(1.0 / args.fps.max(1.0));
    let clock = FrameClock::start();
    let mut frame = 0u64;

    loop {
        if frame == args.frames {
            tracing::info!(frames = frame, "Frame limit reached, requesting quit");
            session.events().quit();
        }

        match session.update(&synthetic_frame(&clock, &params.display)) {
            Ok(()) => {}
            // Quit was requested and the application honored it
            Err(FrameError::Finished { frames }) if frame >= args.frames => {
                tracing::info!(frames, "Application finished");
                return Ok(());
            }
            Err(err) => fatal::terminate("update", &err),
        }

        for eye in 0..EYE_COUNT as i32 {
            if let Err(err) = session.draw(&FrameDrawData {
                framebuffer: eye as u32,
                eye,
            }) {
                fatal::terminate("draw", &err);
            }
        }

        frame += 1;
        thread::sleep(frame_time);
    }
}

/// Head slowly turning in place, seen through a symmetric frustum
fn synthetic_frame(clock: &FrameClock, display: &DisplayDimensions) -> FrameUpdateData {
    let time = clock.seconds();
    let orientation = Quat::from_rotation_y((time * 0.5).sin() as f32 * 0.6);
    let head = Mat4::from_rotation_translation(orientation, Vec3::new(0.0, 1.6, 0.0));
    let aspect = display.width as f32 / display.height.max(1) as f32;
    let projection = Mat4::perspective_rh(90f32.to_radians(), aspect, 0.05, 100.0);

    let view = |offset: f32| {
        (head * Mat4::from_translation(Vec3::new(offset, 0.0, 0.0)))
            .inverse()
            .to_cols_array()
    };

    let mut data = FrameUpdateData {
        display_time: time,
        ..FrameUpdateData::default()
    };
    data.head_pose.position = [0.0, 1.6, 0.0];
    data.head_pose.orientation = orientation.to_array();
    data.eye_view_matrix = [view(-HALF_IPD), view(HALF_IPD)];
    data.projection_matrix = [projection.to_cols_array(); EYE_COUNT];
    data
}

fn log_draw(request: &EyeDrawRequest) {
    tracing::trace!(
        framebuffer = request.framebuffer,
        eye = ?request.eye,
        width = request.dimensions.width,
        height = request.dimensions.height,
        "draw eye"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::frame::Eye;

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from([
            "tether",
            "--writable",
            "/tmp/files",
            "--package",
            "app.zip",
        ])
        .unwrap();
        assert_eq!(args.frames, 600);
        assert_eq!(args.eye_width, 1024);
        assert!(args.settings.is_none());
    }

    #[test]
    fn synthetic_eyes_are_offset() {
        let clock = FrameClock::start();
        let data = synthetic_frame(&clock, &DisplayDimensions::default());
        let left = data.view_matrix(Eye::Left).inverse().w_axis;
        let right = data.view_matrix(Eye::Right).inverse().w_axis;
        assert!((left - right).length() > 2.0 * HALF_IPD - 1e-4);
        assert_eq!(data.projection(Eye::Left), data.projection(Eye::Right));
    }
}
