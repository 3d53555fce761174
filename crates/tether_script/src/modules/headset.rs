use super::{index_error, NativeModule};
use rquickjs::{Ctx, Function, Object};
use tether_core::frame::{
    ControllerState, DisplayDimensions, Eye, SharedFrame, CONTROLLER_COUNT,
};

/// Read-only view of the current frame record
pub(crate) struct HeadsetModule {
    frame: SharedFrame,
    display: DisplayDimensions,
}

impl HeadsetModule {
    pub fn new(frame: SharedFrame, display: DisplayDimensions) -> Self {
        Self { frame, display }
    }
}

fn eye_index<'js>(ctx: &Ctx<'js>, index: i32) -> rquickjs::Result<Eye> {
    Eye::try_from(index).map_err(|index| index_error(ctx, "eye", index))
}

fn controller<'js>(
    ctx: &Ctx<'js>,
    frame: &SharedFrame,
    hand: i32,
) -> rquickjs::Result<ControllerState> {
    usize::try_from(hand)
        .ok()
        .filter(|&hand| hand < CONTROLLER_COUNT)
        .map(|hand| frame.load().controllers[hand])
        .ok_or_else(|| index_error(ctx, "hand", hand))
}

impl NativeModule for HeadsetModule {
    fn load<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let module = Object::new(ctx.clone())?;

        let frame = self.frame.clone();
        module.set(
            "getDisplayTime",
            Function::new(ctx.clone(), move || frame.load().display_time)?,
        )?;

        let display = self.display;
        module.set(
            "getDisplayDimensions",
            Function::new(ctx.clone(), move || vec![display.width, display.height])?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "getViewMatrix",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, index: i32| -> rquickjs::Result<Vec<f32>> {
                    let eye = eye_index(&ctx, index)?;
                    Ok(frame.load().view_matrix(eye).to_cols_array().to_vec())
                },
            )?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "getProjectionMatrix",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, index: i32| -> rquickjs::Result<Vec<f32>> {
                    let eye = eye_index(&ctx, index)?;
                    Ok(frame.load().projection(eye).to_cols_array().to_vec())
                },
            )?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "getHeadPosition",
            Function::new(ctx.clone(), move || frame.load().head_pose.position.to_vec())?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "getHeadOrientation",
            Function::new(ctx.clone(), move || {
                frame.load().head_pose.orientation.to_vec()
            })?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "isConnected",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, hand: i32| -> rquickjs::Result<bool> {
                    Ok(controller(&ctx, &frame, hand)?.is_connected())
                },
            )?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "isDown",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, hand: i32, mask: u32| -> rquickjs::Result<bool> {
                    Ok(controller(&ctx, &frame, hand)?.buttons & mask != 0)
                },
            )?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "isTouched",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, hand: i32, mask: u32| -> rquickjs::Result<bool> {
                    Ok(controller(&ctx, &frame, hand)?.touches & mask != 0)
                },
            )?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "getAxes",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, hand: i32| -> rquickjs::Result<Vec<f32>> {
                    let state = controller(&ctx, &frame, hand)?;
                    Ok(vec![
                        state.trigger,
                        state.grip,
                        state.trackpad[0],
                        state.trackpad[1],
                    ])
                },
            )?,
        )?;

        let frame = self.frame.clone();
        module.set(
            "getControllerPosition",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, hand: i32| -> rquickjs::Result<Vec<f32>> {
                    Ok(controller(&ctx, &frame, hand)?.pose.position.to_vec())
                },
            )?,
        )?;

        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ModuleRegistry;
    use crate::runtime::ScriptRuntime;
    use tether_core::frame::FrameUpdateData;

    fn runtime(frame: &SharedFrame) -> ScriptRuntime {
        let mut registry = ModuleRegistry::new();
        registry.register(
            "tether.headset",
            HeadsetModule::new(frame.clone(), DisplayDimensions::default()),
        );
        let runtime = ScriptRuntime::new().unwrap();
        runtime
            .context()
            .with(|ctx| registry.install(&ctx))
            .unwrap();
        runtime
            .execute("globalThis.headset = require('tether.headset');")
            .unwrap();
        runtime
    }

    #[test]
    fn reads_the_current_frame() {
        let frame = SharedFrame::default();
        let runtime = runtime(&frame);

        let mut data = FrameUpdateData::default();
        data.display_time = 2.25;
        data.head_pose.position = [0.0, 1.5, -0.5];
        data.eye_view_matrix[1][12] = 0.032;
        data.controllers[0].connected = 1;
        data.controllers[0].buttons = 0b10;
        data.controllers[1].trigger = 0.5;
        frame.store(data);

        let read = |expr: &str| runtime.evaluate_to_string(expr).unwrap();
        assert_eq!(read("headset.getDisplayTime()"), "2.25");
        assert_eq!(read("headset.getHeadPosition().join(',')"), "0,1.5,-0.5");
        assert_eq!(read("headset.getViewMatrix(1)[12].toFixed(3)"), "0.032");
        assert_eq!(read("headset.getViewMatrix(0)[12]"), "0");
        assert_eq!(read("headset.isConnected(0)"), "true");
        assert_eq!(read("headset.isConnected(1)"), "false");
        assert_eq!(read("headset.isDown(0, 2)"), "true");
        assert_eq!(read("headset.isDown(0, 1)"), "false");
        assert_eq!(read("headset.getAxes(1)[0]"), "0.5");
        assert_eq!(read("headset.getDisplayDimensions().join('x')"), "1024x1024");
    }

    #[test]
    fn bad_indices_throw_range_errors() {
        let runtime = runtime(&SharedFrame::default());
        let caught = |expr: &str| {
            runtime
                .evaluate_to_string(&format!(
                    "(() => {{ try {{ {expr}; return 'ok'; }} catch (e) {{ return e.name + ': ' + e.message; }} }})()"
                ))
                .unwrap()
        };
        assert_eq!(caught("headset.getViewMatrix(2)"), "RangeError: invalid eye index 2");
        assert_eq!(caught("headset.getAxes(-1)"), "RangeError: invalid hand index -1");
    }
}
