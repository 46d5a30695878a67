// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan filters: binarization, colour enhancement and edge highlighting for
// captured document pages.

pub mod enhance;

pub use enhance::ScanEnhancer;
