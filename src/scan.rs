//! Directory scanner: the one-file-at-a-time classify-and-log loop.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::classifier::{Classification, SafetyClassifier};
use crate::report::ReportWriter;
use crate::verdict::verdict;

/// Stop after this many images have been logged.
pub const DEFAULT_MAX_IMAGES: usize = 100;

/// Everything one scan run needs, built once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// The folder whose immediate entries are scanned. No recursion.
    pub target: PathBuf,
    /// Where the report file is created.
    pub results_dir: PathBuf,
    /// Cap on logged images per run.
    pub max_images: usize,
}

/// What a finished scan produced, for the completion notice and for tests.
#[derive(Debug)]
pub struct ScanSummary {
    /// Records written to the report, in order.
    pub records: usize,
    /// Entries passed over: non-files plus undecodable files.
    pub skipped: usize,
    pub report_path: PathBuf,
}

/// Scan `config.target`: sort its immediate entries by file name, classify
/// each regular file, and write one record per scored image until
/// `config.max_images` records have been logged.
///
/// Undecodable files and non-file entries get a diagnostic and no record,
/// and do not count toward the limit. Only infrastructure failures (device,
/// inference, report I/O) abort the scan.
pub fn run_scan(config: &ScanConfig, classifier: &dyn SafetyClassifier) -> Result<ScanSummary> {
    if !config.target.is_dir() {
        bail!("{} is not a directory", config.target.display());
    }

    let folder_name = folder_basename(&config.target)?;
    let mut report = ReportWriter::create(&config.results_dir, &folder_name)?;

    let mut entries: Vec<PathBuf> = fs::read_dir(&config.target)
        .with_context(|| format!("reading {}", config.target.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut records = 0;
    let mut skipped = 0;
    for path in entries {
        if records == config.max_images {
            info!("Reached the {}-image limit, stopping", config.max_images);
            break;
        }

        // is_file follows symlinks: a link to a regular file is scanned, a
        // dangling or directory link is skipped.
        if !path.is_file() {
            info!("Skipping non-file entry: {}", path.display());
            skipped += 1;
            continue;
        }

        info!("File found: {}", path.display());
        match classifier.classify(&path)? {
            Classification::Scored(scores) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                report.record(&file_name, &verdict(&scores), &scores)?;
                records += 1;
            }
            Classification::Undecodable { reason } => {
                warn!("Could not decode {}: {}", path.display(), reason);
                skipped += 1;
            }
        }
    }

    let report_path = report.finish()?;
    Ok(ScanSummary {
        records,
        skipped,
        report_path,
    })
}

fn folder_basename(target: &Path) -> Result<String> {
    // Trailing separators would leave file_name empty, so normalize first.
    let canonical = target
        .canonicalize()
        .with_context(|| format!("resolving {}", target.display()))?;
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scan".to_string());
    Ok(name)
}
