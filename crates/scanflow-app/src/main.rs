// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanflow — scanned-document session runner.
//
// Entry point. Initialises logging and configuration, then captures the given
// page images, applies the requested edits through an editing session and
// writes the finished pages out.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use scanflow_core::human_errors::humanize_error;
use scanflow_core::{CropRegion, DebouncePolicy, FilterKind};

use services::app_services::AppServices;
use services::scan_run::{ScanScript, run_scan};

#[derive(Debug, Parser)]
#[command(name = "scanflow", version, about = "Capture, rotate, crop and filter scanned pages")]
struct Args {
    /// Page images, in capture order. Without any, the host camera is used.
    images: Vec<PathBuf>,

    /// Filter to apply to every page (e.g. "grey", "black-and-white").
    #[arg(long, value_parser = parse_filter)]
    filter: Option<FilterKind>,

    /// Rotate taps per page; each tap turns the page 90 degrees clockwise.
    #[arg(long, default_value_t = 0)]
    rotate: u32,

    /// Crop region as left,top,right,bottom fractions (e.g. 0.05,0.05,0.95,0.95).
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRegion>,

    /// Output directory. Defaults to a timestamped folder under the data dir.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Data directory holding config.json.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the rotate debounce policy and save it to config.json.
    #[arg(long, value_parser = parse_policy)]
    set_debounce_policy: Option<DebouncePolicy>,
}

fn parse_filter(value: &str) -> Result<FilterKind, String> {
    FilterKind::from_name(value).ok_or_else(|| {
        let known: Vec<&str> = FilterKind::CATALOG.iter().map(|f| f.keyword()).collect();
        format!("unknown filter '{value}' (expected one of: {})", known.join(", "))
    })
}

fn parse_crop(value: &str) -> Result<CropRegion, String> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [left, top, right, bottom] => Ok(CropRegion::new(*left, *top, *right, *bottom)),
        _ => Err(format!("expected 4 comma-separated values, got {}", parts.len())),
    }
}

fn parse_policy(value: &str) -> Result<DebouncePolicy, String> {
    match value.to_ascii_lowercase().as_str() {
        "discard" => Ok(DebouncePolicy::Discard),
        "accumulate" => Ok(DebouncePolicy::Accumulate),
        other => Err(format!("unknown policy '{other}' (expected discard or accumulate)")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(pages = args.images.len(), "scanflow starting");

    let svc = match args.data_dir.clone() {
        Some(dir) => AppServices::with_data_dir(dir),
        None => AppServices::init(),
    };

    if let Some(policy) = args.set_debounce_policy {
        let mut config = svc.config();
        config.debounce_policy = policy;
        if let Err(e) = svc.save_config(&config) {
            tracing::warn!(error = %e, "could not save configuration");
        }
    }

    let out_dir = args.out.clone().unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("scan-%Y%m%d-%H%M%S").to_string();
        svc.exports_dir().join(stamp)
    });

    let script = ScanScript {
        images: args.images,
        filter: args.filter,
        rotate_taps: args.rotate,
        crop: args.crop,
        out_dir,
    };

    match run_scan(&svc, &script).await {
        Ok(summary) => {
            for path in &summary.exported {
                println!("{}", path.display());
            }
            if summary.failed_tasks > 0 {
                tracing::warn!(failed = summary.failed_tasks, "some edits could not be applied");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let human = humanize_error(&e);
            tracing::error!(error = %e, "scan failed");
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_names_and_keywords_parse() {
        assert_eq!(parse_filter("Grey"), Ok(FilterKind::Grayscale));
        assert_eq!(parse_filter("black-and-white"), Ok(FilterKind::BlackAndWhite));
        assert!(parse_filter("sepia").is_err());
    }

    #[test]
    fn crop_needs_four_values() {
        let region = parse_crop("0.1, 0.2, 0.9, 0.8").expect("crop");
        assert_eq!(region, CropRegion::new(0.1, 0.2, 0.9, 0.8));
        assert!(parse_crop("0.1,0.2").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
    }

    #[test]
    fn cli_accepts_full_invocation() {
        let args = Args::try_parse_from([
            "scanflow",
            "a.png",
            "b.png",
            "--filter",
            "grayscale",
            "--rotate",
            "2",
            "--set-debounce-policy",
            "accumulate",
        ])
        .expect("parse");
        assert_eq!(args.images.len(), 2);
        assert_eq!(args.filter, Some(FilterKind::Grayscale));
        assert_eq!(args.rotate, 2);
        assert_eq!(args.set_debounce_policy, Some(DebouncePolicy::Accumulate));
    }

    #[test]
    fn images_are_optional() {
        let args = Args::try_parse_from(["scanflow"]).expect("parse");
        assert!(args.images.is_empty());
    }
}
