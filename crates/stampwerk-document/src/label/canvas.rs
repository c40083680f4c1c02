// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label canvas — one output surface, owned by one composition and finalised
// exactly once. Bytes come from a `Renderer`; they are written to a hidden
// sibling first and renamed into place, so an interrupted run never leaves a
// partial artifact under the final name.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use stampwerk_core::error::{Result, StampError};
use tracing::{info, instrument};

use super::plan::LabelPlan;
use crate::assets::LabelResources;
use crate::integrity::hash_bytes;

/// Turns a draw plan into the bytes of a finished document.
pub trait Renderer: Sync {
    fn render(&self, plan: &LabelPlan, resources: &LabelResources) -> Result<Vec<u8>>;
}

/// A finalised label on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelArtifact {
    pub index: usize,
    pub path: PathBuf,
    pub bytes: usize,
    pub sha256: String,
}

#[derive(Debug)]
pub struct LabelCanvas {
    path: PathBuf,
    plan: LabelPlan,
}

impl LabelCanvas {
    pub fn new(path: &Path, plan: LabelPlan) -> Self {
        Self {
            path: path.to_path_buf(),
            plan,
        }
    }

    /// Render and durably write the label. Consumes the canvas.
    #[instrument(skip_all, fields(index = self.plan.index, path = %self.path.display()))]
    pub fn finalize(
        self,
        renderer: &dyn Renderer,
        resources: &LabelResources,
    ) -> Result<LabelArtifact> {
        let index = self.plan.index;
        let fail = |reason: String| StampError::Render {
            index,
            path: self.path.clone(),
            reason,
        };

        let bytes = renderer
            .render(&self.plan, resources)
            .map_err(|err| match err {
                StampError::Render { .. } => err,
                other => fail(other.to_string()),
            })?;

        write_atomically(&self.path, &bytes).map_err(|err| fail(err.to_string()))?;

        let sha256 = hash_bytes(&bytes);
        info!(bytes = bytes.len(), sha256 = %sha256, "Label written");
        Ok(LabelArtifact {
            index,
            path: self.path,
            bytes: bytes.len(),
            sha256,
        })
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{}.part", file_name));

    let result = (|| {
        let mut file = fs::File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FontRegistry, SvgAsset};
    use crate::label::{DrawCommand, LabelLayout, Rect};

    struct JsonRenderer;

    impl Renderer for JsonRenderer {
        fn render(&self, plan: &LabelPlan, _: &LabelResources) -> Result<Vec<u8>> {
            Ok(serde_json::to_vec(plan)?)
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&self, _: &LabelPlan, _: &LabelResources) -> Result<Vec<u8>> {
            Err(StampError::Pdf("surface refused".into()))
        }
    }

    fn resources() -> LabelResources {
        let svg = |w, h| {
            SvgAsset::parse(Path::new("a.svg"), format!(r#"<svg width="{w}" height="{h}"/>"#))
                .unwrap()
        };
        LabelResources::new(
            LabelLayout::default(),
            svg(130, 214),
            svg(10, 10),
            FontRegistry::default(),
        )
    }

    fn plan(index: usize) -> LabelPlan {
        LabelPlan {
            index,
            width: 520.0,
            height: 856.0,
            commands: vec![DrawCommand::Module {
                rect: Rect::square(0.0, 0.0, 20.0),
            }],
        }
    }

    #[test]
    fn finalize_writes_and_fingerprints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr3.pdf");
        let artifact = LabelCanvas::new(&path, plan(3))
            .finalize(&JsonRenderer, &resources())
            .unwrap();

        let written = fs::read(&path).unwrap();
        assert_eq!(artifact.index, 3);
        assert_eq!(artifact.bytes, written.len());
        assert_eq!(artifact.sha256, hash_bytes(&written));
        // No temporary file is left behind.
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("qr3.pdf")]);
    }

    #[test]
    fn renderer_failure_is_a_render_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr0.pdf");
        let err = LabelCanvas::new(&path, plan(0))
            .finalize(&FailingRenderer, &resources())
            .unwrap_err();
        match err {
            StampError::Render { index, path: p, reason } => {
                assert_eq!(index, 0);
                assert_eq!(p, path);
                assert!(reason.contains("surface refused"));
            }
            other => panic!("expected render error, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_target_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("qr0.pdf");
        let err = LabelCanvas::new(&path, plan(0))
            .finalize(&JsonRenderer, &resources())
            .unwrap_err();
        assert!(matches!(err, StampError::Render { index: 0, .. }));
    }
}
