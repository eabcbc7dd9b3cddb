// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio: core types, options and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod options;
pub mod types;

pub use config::FolioConfig;
pub use error::{FolioError, Result};
pub use options::OptionsBag;
pub use types::*;
