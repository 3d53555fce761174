//! Script access to the mirrored program and the save directory.
//!
//! Lookups try the save directory first, then the program mirror, so a file
//! written at runtime shadows the packaged one.

use super::NativeModule;
use rquickjs::{Ctx, Exception, Function, Object};
use std::path::{Component, Path, PathBuf};

pub(crate) struct FilesystemModule {
    program_root: PathBuf,
    save_dir: PathBuf,
}

impl FilesystemModule {
    pub fn new(program_root: PathBuf, save_dir: PathBuf) -> Self {
        Self {
            program_root,
            save_dir,
        }
    }
}

/// Join a script-supplied relative path onto `root`, refusing anything that
/// climbs out of it.
fn confine(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|part| !matches!(part, Component::Normal(_) | Component::CurDir));
    (!escapes).then(|| root.join(relative))
}

/// First existing candidate for `relative` across `roots`.
fn locate(roots: &[PathBuf], relative: &str) -> Option<PathBuf> {
    roots
        .iter()
        .filter_map(|root| confine(root, relative))
        .find(|path| path.exists())
}

impl NativeModule for FilesystemModule {
    fn load<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let module = Object::new(ctx.clone())?;
        let roots = vec![self.save_dir.clone(), self.program_root.clone()];

        let source = self.program_root.to_string_lossy().into_owned();
        module.set(
            "getSource",
            Function::new(ctx.clone(), move || source.clone())?,
        )?;

        let save = self.save_dir.to_string_lossy().into_owned();
        module.set(
            "getSaveDirectory",
            Function::new(ctx.clone(), move || save.clone())?,
        )?;

        let search = roots.clone();
        module.set(
            "exists",
            Function::new(ctx.clone(), move |path: String| {
                locate(&search, &path).is_some()
            })?,
        )?;

        let search = roots.clone();
        module.set(
            "read",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, path: String| -> rquickjs::Result<String> {
                    let Some(found) = locate(&search, &path) else {
                        return Err(Exception::throw_message(
                            &ctx,
                            &format!("file '{path}' not found"),
                        ));
                    };
                    std::fs::read_to_string(&found).map_err(|err| {
                        Exception::throw_message(&ctx, &format!("failed to read '{path}': {err}"))
                    })
                },
            )?,
        )?;

        let save_dir = self.save_dir.clone();
        module.set(
            "write",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, path: String, contents: String| -> rquickjs::Result<()> {
                    let Some(target) = confine(&save_dir, &path) else {
                        return Err(Exception::throw_message(
                            &ctx,
                            &format!("path '{path}' is outside the save directory"),
                        ));
                    };
                    std::fs::write(&target, contents).map_err(|err| {
                        Exception::throw_message(&ctx, &format!("failed to write '{path}': {err}"))
                    })
                },
            )?,
        )?;

        let search = roots;
        module.set(
            "getDirectoryItems",
            Function::new(ctx.clone(), move |path: String| -> Vec<String> {
                let mut items: Vec<String> = search
                    .iter()
                    .filter_map(|root| confine(root, &path))
                    .filter_map(|dir| std::fs::read_dir(dir).ok())
                    .flatten()
                    .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
                    .collect();
                items.sort();
                items.dedup();
                items
            })?,
        )?;

        Ok(module)
    }
}
