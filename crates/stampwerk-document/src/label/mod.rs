// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label module — geometry, draw plans, composition and the output canvas.

pub mod canvas;
pub mod composer;
pub mod layout;
pub mod plan;

pub use canvas::{LabelArtifact, LabelCanvas, Renderer};
pub use composer::{LabelComposer, parse_date_price, parse_identifier};
pub use layout::{LabelLayout, LayoutTemplate, VOUCHER_LABEL};
pub use plan::{Align, AssetRole, DrawCommand, FontRole, LabelPlan, Rect, TextRun};
