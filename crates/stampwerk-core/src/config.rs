// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration. There is no configuration file: the defaults are the
// reference constants and the CLI may override a handful of them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StampError};

/// File names of the fixed decorative assets and fonts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetNames {
    /// Background label template (SVG).
    pub background: String,
    /// Issuer logo (SVG).
    pub logo: String,
    /// Primary decorative font used for date and price.
    pub primary_font: String,
    /// Secondary monospace font used for the voucher identifier.
    pub secondary_font: String,
}

impl Default for AssetNames {
    fn default() -> Self {
        Self {
            background: "label.svg".into(),
            logo: "im.svg".into(),
            primary_font: "ayar.ttf".into(),
            secondary_font: "NotoMono-Regular.ttf".into(),
        }
    }
}

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding the source document, the assets, and the output.
    pub working_dir: PathBuf,
    /// The source document is the first file whose name starts with this.
    pub source_prefix: String,
    /// Output artifacts are named `<output_prefix><index>.pdf`.
    pub output_prefix: String,
    /// Single knob controlling output resolution.
    pub scale: f32,
    /// Worker pool size for per-voucher composition.
    pub jobs: usize,
    /// Treat a text-block shortfall as an error instead of a warning.
    pub strict_pairing: bool,
    pub assets: AssetNames,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            source_prefix: "Briefmarke".into(),
            output_prefix: "qr".into(),
            scale: 4.0,
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            strict_pairing: false,
            assets: AssetNames::default(),
        }
    }
}

impl RunConfig {
    /// Reject settings that would produce a degenerate canvas or an empty pool.
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(StampError::Config(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.jobs == 0 {
            return Err(StampError::Config("jobs must be at least 1".into()));
        }
        if self.output_prefix.is_empty() {
            return Err(StampError::Config("output prefix must not be empty".into()));
        }
        if self.source_prefix.is_empty() {
            return Err(StampError::Config("source prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Path of the artifact for voucher `index`.
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.working_dir
            .join(format!("{}{}.pdf", self.output_prefix, index))
    }

    /// Whether `file_name` is one of our output artifacts (`<prefix><digits>.pdf`).
    pub fn is_output_name(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.output_prefix.as_str())
            .and_then(|rest| rest.strip_suffix(".pdf"))
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Resolve an asset file name against the working directory.
    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.working_dir.join(Path::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let config = RunConfig::default();
        assert_eq!(config.scale, 4.0);
        assert_eq!(config.source_prefix, "Briefmarke");
        assert_eq!(config.output_prefix, "qr");
        assert_eq!(config.assets.background, "label.svg");
        assert_eq!(config.assets.secondary_font, "NotoMono-Regular.ttf");
        assert!(config.jobs >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_scale() {
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let config = RunConfig {
                scale,
                ..RunConfig::default()
            };
            assert!(matches!(config.validate(), Err(StampError::Config(_))));
        }
    }

    #[test]
    fn rejects_empty_pool() {
        let config = RunConfig {
            jobs: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn output_path_uses_zero_based_index() {
        let config = RunConfig {
            working_dir: PathBuf::from("/tmp/stamps"),
            ..RunConfig::default()
        };
        assert_eq!(config.output_path(0), PathBuf::from("/tmp/stamps/qr0.pdf"));
        assert_eq!(config.output_path(12), PathBuf::from("/tmp/stamps/qr12.pdf"));
    }

    #[test]
    fn output_name_matching_is_strict() {
        let config = RunConfig::default();
        assert!(config.is_output_name("qr0.pdf"));
        assert!(config.is_output_name("qr123.pdf"));
        assert!(!config.is_output_name("qr.pdf"));
        assert!(!config.is_output_name("qrcode.pdf"));
        assert!(!config.is_output_name("qr1.pdf.bak"));
        assert!(!config.is_output_name("Briefmarken.pdf"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RunConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: RunConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
