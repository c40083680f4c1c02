// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label resources — decorative assets, fonts and geometry, loaded once per run
// and shared read-only by every composition.

pub mod fonts;
pub mod svg;

use std::collections::BTreeMap;

use stampwerk_core::RunConfig;
use stampwerk_core::error::{Result, StampError};
use tracing::{info, instrument};

pub use fonts::{FontMetrics, FontRegistry, FontResource};
pub use svg::SvgAsset;

use crate::label::{AssetRole, FontRole, LabelLayout};

/// Loads the two decorative SVG assets, keyed by role.
#[derive(Debug, Default)]
pub struct DocumentAssetLoader {
    assets: BTreeMap<AssetRole, SvgAsset>,
}

impl DocumentAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the asset for `role`. Loading a role twice is a no-op.
    pub fn load(&mut self, role: AssetRole, path: &std::path::Path) -> Result<&SvgAsset> {
        if !self.assets.contains_key(&role) {
            let asset = SvgAsset::load(path)?;
            info!(?role, width = asset.width, height = asset.height, "Asset loaded");
            self.assets.insert(role, asset);
        }
        self.get(role).ok_or_else(|| StampError::Asset {
            path: path.to_path_buf(),
            reason: format!("{role:?} asset was not retained"),
        })
    }

    pub fn get(&self, role: AssetRole) -> Option<&SvgAsset> {
        self.assets.get(&role)
    }

    /// Take the loaded asset for `role` out of the loader.
    fn take(&mut self, role: AssetRole) -> Option<SvgAsset> {
        self.assets.remove(&role)
    }
}

/// Everything a composition needs besides the voucher itself.
#[derive(Debug, Clone)]
pub struct LabelResources {
    pub layout: LabelLayout,
    pub background: SvgAsset,
    pub logo: SvgAsset,
    pub fonts: FontRegistry,
}

impl LabelResources {
    pub fn new(layout: LabelLayout, background: SvgAsset, logo: SvgAsset, fonts: FontRegistry) -> Self {
        Self {
            layout,
            background,
            logo,
            fonts,
        }
    }

    /// Load both assets and both fonts from the working directory.
    ///
    /// Any missing or unreadable file is fatal.
    #[instrument(skip_all, fields(dir = %config.working_dir.display()))]
    pub fn load(config: &RunConfig) -> Result<Self> {
        let names = &config.assets;

        let mut loader = DocumentAssetLoader::new();
        loader.load(AssetRole::Background, &config.asset_path(&names.background))?;
        loader.load(AssetRole::Logo, &config.asset_path(&names.logo))?;

        let mut fonts = FontRegistry::new();
        fonts.register(FontRole::Primary, &config.asset_path(&names.primary_font))?;
        fonts.register(FontRole::Secondary, &config.asset_path(&names.secondary_font))?;

        let background = loader
            .take(AssetRole::Background)
            .ok_or_else(|| missing(config, &names.background))?;
        let logo = loader
            .take(AssetRole::Logo)
            .ok_or_else(|| missing(config, &names.logo))?;

        info!(scale = config.scale, "Label resources ready");
        Ok(Self::new(
            LabelLayout::for_scale(config.scale),
            background,
            logo,
            fonts,
        ))
    }

    pub fn asset(&self, role: AssetRole) -> &SvgAsset {
        match role {
            AssetRole::Background => &self.background,
            AssetRole::Logo => &self.logo,
        }
    }
}

fn missing(config: &RunConfig, name: &str) -> StampError {
    StampError::MissingInput {
        what: "decorative asset".into(),
        path: config.asset_path(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loading_a_role_twice_keeps_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.svg");
        let second = dir.path().join("b.svg");
        fs::write(&first, r#"<svg width="10" height="20"/>"#).unwrap();
        fs::write(&second, r#"<svg width="30" height="40"/>"#).unwrap();

        let mut loader = DocumentAssetLoader::new();
        loader.load(AssetRole::Logo, &first).unwrap();
        let asset = loader.load(AssetRole::Logo, &second).unwrap();
        assert_eq!((asset.width, asset.height), (10.0, 20.0));
    }

    #[test]
    fn missing_background_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            working_dir: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        let err = LabelResources::load(&config).unwrap_err();
        match err {
            StampError::MissingInput { path, .. } => assert!(path.ends_with("label.svg")),
            other => panic!("expected missing input, got {other:?}"),
        }
    }

    #[test]
    fn missing_font_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("label.svg"), r#"<svg width="130" height="214"/>"#).unwrap();
        fs::write(dir.path().join("im.svg"), r#"<svg width="20" height="10"/>"#).unwrap();
        let config = RunConfig {
            working_dir: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        let err = LabelResources::load(&config).unwrap_err();
        match err {
            StampError::MissingInput { path, .. } => assert!(path.ends_with("ayar.ttf")),
            other => panic!("expected missing input, got {other:?}"),
        }
    }
}
