// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanflow — Core types, kernel contract and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod kernel;
pub mod types;

pub use config::{DebouncePolicy, ScanConfig};
pub use error::ScanError;
pub use kernel::TransformKernel;
pub use types::*;
