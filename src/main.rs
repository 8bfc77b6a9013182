mod classifier;
mod logging;
mod report;
mod scan;
mod verdict;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::classifier::{VitClassifier, model_repo, select_device};
use crate::scan::{DEFAULT_MAX_IMAGES, ScanConfig, run_scan};

const RESULTS_DIR_NAME: &str = "results";

#[derive(Parser)]
#[command(name = "safescan")]
#[command(about = "Scan a folder of images with a pretrained safety classifier")]
struct Cli {
    /// Folder whose images should be scanned (non-recursive)
    folder: PathBuf,
}

/// Reports live next to the binary, not in the caller's working directory.
fn results_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("locating the safescan executable")?;
    let dir = exe
        .parent()
        .context("executable has no parent directory")?
        .join(RESULTS_DIR_NAME);
    Ok(dir)
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let device = select_device();
    let classifier = VitClassifier::load(&model_repo(), device)?;

    let config = ScanConfig {
        target: cli.folder,
        results_dir: results_dir()?,
        max_images: DEFAULT_MAX_IMAGES,
    };

    let summary = run_scan(&config, &classifier)?;
    info!(
        "Scan complete: {} images logged, {} entries skipped, report at {}",
        summary.records,
        summary.skipped,
        summary.report_path.display()
    );
    Ok(())
}
