// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every technical error is mapped to a plain sentence and a concrete next step.

use crate::error::StampError;

/// Who has to act to fix an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Output is usable but incomplete.
    Warning,
    /// A file in the working directory is missing or broken.
    InputProblem,
    /// The environment (disk, permissions) got in the way.
    Environment,
    /// Should not happen with valid inputs.
    Internal,
}

impl Severity {
    /// Short tag printed in front of the message.
    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Warning => "incomplete",
            Severity::InputProblem => "input problem",
            Severity::Environment => "system problem",
            Severity::Internal => "internal error",
        }
    }
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `StampError` into something a person at a terminal can act on.
pub fn humanize_error(err: &StampError) -> HumanError {
    match err {
        StampError::MissingInput { what, path } => HumanError {
            message: format!("The {what} is missing ({}).", path.display()),
            suggestion: "Put the downloaded stamp PDF (named Briefmarke...) together with \
                         label.svg, im.svg, ayar.ttf and NotoMono-Regular.ttf in the \
                         working directory."
                .into(),
            severity: Severity::InputProblem,
        },

        StampError::Asset { path, .. } => HumanError {
            message: format!("The template {} could not be read.", path.display()),
            suggestion: "Check that the file is a valid SVG with a width and height or a viewBox."
                .into(),
            severity: Severity::InputProblem,
        },

        StampError::Font { path, .. } => HumanError {
            message: format!("The font {} could not be loaded.", path.display()),
            suggestion: "Replace it with an intact TrueType (.ttf) file.".into(),
            severity: Severity::InputProblem,
        },

        StampError::Pdf(_) => HumanError {
            message: "The stamp PDF could not be read.".into(),
            suggestion: "Download the stamp sheet again; the file may be truncated or encrypted."
                .into(),
            severity: Severity::InputProblem,
        },

        StampError::Decode { page, image, .. } => HumanError {
            message: format!("Code image {image} on page {page} is unreadable."),
            suggestion: "No stamps were written, because every later stamp would be paired \
                         with the wrong text. Download the stamp sheet again."
                .into(),
            severity: Severity::InputProblem,
        },

        StampError::PairingShortfall {
            images, produced, ..
        } => HumanError {
            message: format!(
                "Only {produced} of {images} stamps had complete text and were written."
            ),
            suggestion: "Check the last page of the stamp sheet; its text may be missing."
                .into(),
            severity: Severity::Warning,
        },

        StampError::Render { index, path, .. } => HumanError {
            message: format!("Stamp {index} could not be written to {}.", path.display()),
            suggestion: "Check free disk space and write permission in the working directory."
                .into(),
            severity: Severity::Environment,
        },

        StampError::Config(detail) => HumanError {
            message: format!("The settings are not valid: {detail}."),
            suggestion: "Run with --print-config to see the effective settings.".into(),
            severity: Severity::InputProblem,
        },

        StampError::Io(io) => HumanError {
            message: format!("A file operation failed: {io}."),
            suggestion: "Check permissions on the working directory.".into(),
            severity: Severity::Environment,
        },

        StampError::Serialization(_) => HumanError {
            message: "Something went wrong internally.".into(),
            suggestion: "Please report this together with the log output.".into(),
            severity: Severity::Internal,
        },
    }
}
