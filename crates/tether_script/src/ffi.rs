//! C ABI for the native host
//!
//! The host owns the render loop: it calls init once, then update and draw
//! every frame from the same thread. The session travels as an opaque
//! pointer. Every unrecoverable failure ends the process from here.

use crate::session::{InitParams, RuntimeSession};
use crate::FrameError;
use std::ffi::{c_char, CStr};
use std::path::{Path, PathBuf};
use tether_core::fatal;
use tether_core::frame::{
    DisplayDimensions, EyeDrawRequest, EyeRenderer, FrameDrawData, FrameUpdateData,
};
use tether_services::{init_logging, Settings, SettingsError, SETTINGS_FILE};
use thiserror::Error;

/// Native per-eye draw: framebuffer, eye, width, height, then pointers to
/// 16 column-major floats each for view and projection
pub type DrawEyeCallback = extern "C" fn(u32, u32, u32, u32, *const f32, *const f32);

/// Init parameters as laid out by the host
#[repr(C)]
pub struct BridgeInitData {
    /// NUL-terminated path of the app's writable storage
    pub writable_path: *const c_char,
    /// NUL-terminated path of the app package
    pub package_path: *const c_char,
    pub suggested_eye_texture: DisplayDimensions,
    pub zero_display_time: f64,
    pub draw_eye: Option<DrawEyeCallback>,
}

#[derive(Debug, Error)]
pub enum FfiError {
    #[error("{0} is null")]
    NullPointer(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidPath(&'static str),
}

struct NativeRenderer(Option<DrawEyeCallback>);

impl EyeRenderer for NativeRenderer {
    fn draw_eye(&mut self, request: &EyeDrawRequest) {
        let Some(draw) = self.0 else {
            tracing::trace!(eye = ?request.eye, "No native draw callback");
            return;
        };
        let view = request.view.to_cols_array();
        let projection = request.projection.to_cols_array();
        draw(
            request.framebuffer,
            request.eye.index() as u32,
            request.dimensions.width,
            request.dimensions.height,
            view.as_ptr(),
            projection.as_ptr(),
        );
    }
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn path_arg(ptr: *const c_char, what: &'static str) -> Result<PathBuf, FfiError> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer(what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(PathBuf::from)
        .map_err(|_| FfiError::InvalidPath(what))
}

/// # Safety
/// `data` must be null or point to a valid [`BridgeInitData`].
unsafe fn init_params(data: *const BridgeInitData) -> Result<InitParams, FfiError> {
    let data = data.as_ref().ok_or(FfiError::NullPointer("init data"))?;
    Ok(InitParams {
        writable_root: path_arg(data.writable_path, "writable path")?,
        package: path_arg(data.package_path, "package path")?,
        display: data.suggested_eye_texture,
        zero_display_time: data.zero_display_time,
    })
}

/// Settings for a device install: `tether.json` under the writable root,
/// or defaults when there is none.
fn host_settings(writable_root: &Path) -> Result<Settings, SettingsError> {
    Settings::load_or_default(&writable_root.join(SETTINGS_FILE))
}

/// Create the session. Never returns null: failures abort the process.
///
/// # Safety
/// `data` must point to a valid [`BridgeInitData`] whose strings stay alive
/// for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn tether_bridge_init(data: *const BridgeInitData) -> *mut RuntimeSession {
    let params = init_params(data);
    let settings = match &params {
        Ok(params) => host_settings(&params.writable_root),
        Err(_) => Ok(Settings::default()),
    };
    let level = match &settings {
        Ok(settings) => settings.logging.level.clone(),
        Err(_) => Settings::default().logging.level,
    };
    init_logging(&level);
    fatal::install_panic_hook();

    let params = match params {
        Ok(params) => params,
        Err(err) => fatal::terminate("bridge init", &err),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => fatal::terminate("bridge init", &err),
    };
    let renderer = Box::new(NativeRenderer((*data).draw_eye));

    match RuntimeSession::init(&params, &settings, renderer) {
        Ok(session) => Box::into_raw(Box::new(session)),
        Err(err) => fatal::terminate("bridge init", &err),
    }
}

/// Run one frame of the application task.
///
/// # Safety
/// `session` must come from [`tether_bridge_init`]; `data` must point to a
/// valid [`FrameUpdateData`].
#[no_mangle]
pub unsafe extern "C" fn tether_bridge_update(
    session: *mut RuntimeSession,
    data: *const FrameUpdateData,
) {
    let (Some(session), Some(data)) = (session.as_mut(), data.as_ref()) else {
        fatal::terminate("bridge update", &FfiError::NullPointer("session or frame data"));
    };
    if let Err(err) = session.update(data) {
        fatal::terminate("bridge update", &err);
    }
}

/// Draw one eye of the most recent frame.
///
/// # Safety
/// `session` must come from [`tether_bridge_init`]; `data` must point to a
/// valid [`FrameDrawData`].
#[no_mangle]
pub unsafe extern "C" fn tether_bridge_draw(
    session: *mut RuntimeSession,
    data: *const FrameDrawData,
) {
    let (Some(session), Some(data)) = (session.as_mut(), data.as_ref()) else {
        fatal::terminate("bridge draw", &FfiError::NullPointer("session or draw data"));
    };
    match session.draw(data) {
        Ok(()) => {}
        Err(FrameError::InvalidEye { eye }) => {
            tracing::warn!(eye, "Ignoring draw for unknown eye");
        }
        Err(err) => fatal::terminate("bridge draw", &err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::ffi::CString;
    use tether_core::frame::Eye;
    use tether_core::glam::Mat4;

    thread_local! {
        static DRAWN: RefCell<Vec<(u32, u32, u32, u32, [f32; 16])>> = RefCell::new(Vec::new());
    }

    extern "C" fn record(
        framebuffer: u32,
        eye: u32,
        width: u32,
        height: u32,
        view: *const f32,
        _projection: *const f32,
    ) {
        let mut matrix = [0.0; 16];
        // SAFETY: the renderer passes a pointer to 16 floats
        unsafe { std::ptr::copy_nonoverlapping(view, matrix.as_mut_ptr(), 16) };
        DRAWN.with(|drawn| {
            drawn
                .borrow_mut()
                .push((framebuffer, eye, width, height, matrix))
        });
    }

    fn init_data(writable: &CString, package: &CString) -> BridgeInitData {
        BridgeInitData {
            writable_path: writable.as_ptr(),
            package_path: package.as_ptr(),
            suggested_eye_texture: DisplayDimensions {
                width: 800,
                height: 600,
            },
            zero_display_time: 3.0,
            draw_eye: Some(record),
        }
    }

    #[test]
    fn init_params_are_read_from_host_struct() {
        let writable = CString::new("/data/files").unwrap();
        let package = CString::new("/data/app/base.apk").unwrap();
        let data = init_data(&writable, &package);

        let params = unsafe { init_params(&data) }.unwrap();
        assert_eq!(params.writable_root, PathBuf::from("/data/files"));
        assert_eq!(params.package, PathBuf::from("/data/app/base.apk"));
        assert_eq!(params.display.width, 800);
        assert_eq!(params.zero_display_time, 3.0);
    }

    #[test]
    fn null_pointers_are_rejected() {
        let writable = CString::new("/data/files").unwrap();
        let package = CString::new("/data/app/base.apk").unwrap();
        let mut data = init_data(&writable, &package);
        data.package_path = std::ptr::null();

        let err = unsafe { init_params(&data) }.unwrap_err();
        assert_eq!(err.to_string(), "package path is null");
        assert!(unsafe { init_params(std::ptr::null()) }.is_err());
    }

    #[test]
    fn native_renderer_passes_matrices() {
        let view = Mat4::from_rotation_y(0.25);
        let mut renderer = NativeRenderer(Some(record));
        renderer.draw_eye(&EyeDrawRequest {
            framebuffer: 9,
            eye: Eye::Right,
            dimensions: DisplayDimensions {
                width: 800,
                height: 600,
            },
            view,
            projection: Mat4::IDENTITY,
        });

        let drawn = DRAWN.with(|drawn| drawn.borrow_mut().pop()).unwrap();
        assert_eq!((drawn.0, drawn.1, drawn.2, drawn.3), (9, 1, 800, 600));
        assert_eq!(drawn.4, view.to_cols_array());
    }

    #[test]
    fn frames_run_through_the_c_entry_points() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("package/assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("main.js"), "tether.update = function (dt) {};").unwrap();
        std::fs::create_dir_all(dir.path().join("files")).unwrap();

        let params = InitParams {
            writable_root: dir.path().join("files"),
            package: dir.path().join("package"),
            display: DisplayDimensions::default(),
            zero_display_time: 0.0,
        };
        let session = RuntimeSession::init(
            &params,
            &Settings::default(),
            Box::new(NativeRenderer(Some(record))),
        )
        .ok()
        .unwrap();
        let session = Box::into_raw(Box::new(session));

        unsafe {
            let frame = FrameUpdateData::default();
            tether_bridge_update(session, &frame);
            tether_bridge_update(session, &frame);
            tether_bridge_draw(session, &FrameDrawData { framebuffer: 1, eye: 0 });
            // Unknown eyes are logged, not fatal
            tether_bridge_draw(session, &FrameDrawData { framebuffer: 1, eye: 4 });

            assert_eq!((*session).frames(), 2);
            drop(Box::from_raw(session));
        }

        let drawn = DRAWN.with(|drawn| drawn.borrow().len());
        assert_eq!(drawn, 1);
    }

    #[test]
    fn host_settings_come_from_the_writable_root() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(host_settings(dir.path()).unwrap(), Settings::default());

        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "storage": { "program_dir": "cache/program" }, "logging": { "level": "debug" } }"#,
        )
        .unwrap();
        let settings = host_settings(dir.path()).unwrap();
        assert_eq!(settings.storage.program_dir, "cache/program");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.storage.save_dir, "data");
    }

    #[test]
    fn unsafe_host_settings_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "storage": { "program_dir": ".." } }"#,
        )
        .unwrap();
        assert!(matches!(
            host_settings(dir.path()),
            Err(SettingsError::Storage { key: "program_dir", .. })
        ));
    }
}
