//! Per-folder text report files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::info;

use crate::classifier::SafetyScores;

/// One report per scan: `<results dir>/<folder name>_result.txt`, truncating
/// any previous report for the same folder.
///
/// Dropping the writer flushes, closes, and announces the output path, so
/// the report survives (possibly incomplete) even when a scan aborts
/// mid-way.
pub struct ReportWriter {
    file: BufWriter<File>,
    path: PathBuf,
}

impl ReportWriter {
    /// Create the results directory if it is missing and open a fresh report
    /// file named after the scanned folder.
    pub fn create(results_dir: &Path, folder_name: &str) -> Result<Self> {
        fs::create_dir_all(results_dir)?;
        let path = results_dir.join(format!("{folder_name}_result.txt"));
        let file = BufWriter::new(File::create(&path)?);
        Ok(Self { file, path })
    }

    /// Append one record: file-name header, verdict line, raw probabilities,
    /// then a blank separator line.
    pub fn record(&mut self, file_name: &str, verdict: &str, scores: &SafetyScores) -> Result<()> {
        writeln!(self.file, "File name: {file_name}")?;
        writeln!(self.file, "Prediction: {verdict}")?;
        writeln!(self.file, "Probabilities: {scores}")?;
        writeln!(self.file)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush eagerly so write errors surface as errors instead of being
    /// swallowed by the close in `Drop`.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.file.flush()?;
        Ok(self.path.clone())
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
        info!("Results written to: {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pornographic: f32, dangerous: f32, gory: f32) -> SafetyScores {
        SafetyScores {
            pornographic,
            dangerous,
            gory,
        }
    }

    #[test]
    fn records_follow_the_three_line_template() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ReportWriter::create(dir.path(), "holiday").unwrap();
        writer
            .record("beach.jpg", "Safe", &scores(0.1, 0.2, 0.3))
            .unwrap();
        writer
            .record(
                "cliff.png",
                "May contain: gory material",
                &scores(0.0, 0.0, 0.9),
            )
            .unwrap();
        let path = writer.finish().unwrap();

        assert_eq!(path, dir.path().join("holiday_result.txt"));
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "File name: beach.jpg\n\
             Prediction: Safe\n\
             Probabilities: [0.1000, 0.2000, 0.3000]\n\
             \n\
             File name: cliff.png\n\
             Prediction: May contain: gory material\n\
             Probabilities: [0.0000, 0.0000, 0.9000]\n\
             \n"
        );
    }

    #[test]
    fn fresh_run_truncates_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pics_result.txt");
        fs::write(&path, "stale content from an earlier run\n").unwrap();

        let mut writer = ReportWriter::create(dir.path(), "pics").unwrap();
        writer
            .record("one.png", "Safe", &scores(0.0, 0.0, 0.0))
            .unwrap();
        writer.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.starts_with("File name: one.png\n"));
    }

    #[test]
    fn results_directory_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("nested").join("results");
        let writer = ReportWriter::create(&results, "empty").unwrap();
        assert!(results.is_dir());
        assert_eq!(writer.path(), results.join("empty_result.txt"));
    }

    #[test]
    fn dropping_without_finish_still_flushes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut writer = ReportWriter::create(dir.path(), "partial").unwrap();
            writer
                .record("only.bmp", "Safe", &scores(0.2, 0.2, 0.2))
                .unwrap();
            // No finish(): simulate a scan that errored out after one record.
        }
        let content = fs::read_to_string(dir.path().join("partial_result.txt")).unwrap();
        assert!(content.contains("File name: only.bmp"));
    }
}
