// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: configuration, storage locations and the scripted scan run
// that the binary drives.

pub mod app_services;
pub mod data_dir;
pub mod scan_run;
