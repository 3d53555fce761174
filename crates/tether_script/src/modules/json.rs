use super::NativeModule;
use rquickjs::prelude::Opt;
use rquickjs::{Ctx, Exception, Function, Object, Value};

/// JSON codec binding
pub(crate) struct JsonModule;

impl NativeModule for JsonModule {
    fn load<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let module = Object::new(ctx.clone())?;

        module.set(
            "encode",
            Function::new(
                ctx.clone(),
                |ctx: Ctx<'js>, value: Value<'js>, pretty: Opt<bool>| -> rquickjs::Result<String> {
                    let Some(text) = ctx.json_stringify(value)? else {
                        return Err(Exception::throw_type(&ctx, "value cannot be encoded as JSON"));
                    };
                    let text = text.to_string()?;
                    if !pretty.0.unwrap_or(false) {
                        return Ok(text);
                    }

                    serde_json::from_str::<serde_json::Value>(&text)
                        .and_then(|parsed| serde_json::to_string_pretty(&parsed))
                        .map_err(|err| Exception::throw_internal(&ctx, &err.to_string()))
                },
            )?,
        )?;

        module.set(
            "decode",
            Function::new(
                ctx.clone(),
                |ctx: Ctx<'js>, text: String| -> rquickjs::Result<Value<'js>> {
                    // serde_json reports line and column, which the engine does not
                    if let Err(err) = serde_json::from_str::<serde_json::Value>(&text) {
                        return Err(Exception::throw_syntax(&ctx, &format!("invalid JSON: {err}")));
                    }
                    ctx.json_parse(text)
                },
            )?,
        )?;

        Ok(module)
    }
}
