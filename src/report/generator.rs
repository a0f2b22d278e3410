use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use log::{info, warn};
use serde::Serialize;

use crate::error::{HarnessError, HarnessResult};
use crate::evaluation::EvaluationResult;
use crate::models::Config;

use super::document::PagedDocument;

pub const REPORT_TITLE: &str = "Weight Measurement Test Report";
pub const REPORT_EXTENSION: &str = "txt";
const SIGNATURE_LINE: &str = "______________________";
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Everything a report shows, captured at the moment of generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub config: Config,
    pub result: EvaluationResult,
    pub test_load: String,
    pub load_cell_value: String,
    pub duration: String,
    pub generated_at: DateTime<Local>,
}

/// Writes one report file per call into `output_dir`.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders the snapshot and writes it under a fresh name.
    ///
    /// The name is `report_<YYYYMMDD>_<HHMMSS>.txt`; if that file already
    /// exists a `_<n>` suffix is added, so reports from the same second never
    /// overwrite each other.
    pub fn generate(&self, snapshot: &ReportSnapshot) -> HarnessResult<PathBuf> {
        let contents = render(snapshot);
        let stem = report_stem(&snapshot.generated_at);

        let (path, mut file) = self.claim(&stem)?;
        if let Err(err) = file.write_all(contents.as_bytes()).and_then(|_| file.sync_all()) {
            discard_partial(&path);
            return Err(HarnessError::persistence(&path, err));
        }

        info!("Report written to {}", path.display());
        Ok(path)
    }

    fn claim(&self, stem: &str) -> HarnessResult<(PathBuf, fs::File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stem}.{REPORT_EXTENSION}")
            } else {
                format!("{stem}_{attempt}.{REPORT_EXTENSION}")
            };
            let path = self.output_dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(HarnessError::persistence(&path, err)),
            }
        }

        Err(HarnessError::persistence(
            self.output_dir.join(format!("{stem}.{REPORT_EXTENSION}")),
            io::Error::new(io::ErrorKind::AlreadyExists, "no free report name left"),
        ))
    }
}

/// Removes a report whose write failed part-way.
fn discard_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!("Failed to remove partial report {}: {err}", path.display());
    }
}

pub fn report_stem(at: &DateTime<Local>) -> String {
    format!("report_{}", at.format("%Y%m%d_%H%M%S"))
}

pub fn render(snapshot: &ReportSnapshot) -> String {
    let config = &snapshot.config;
    let mut doc = PagedDocument::default();

    doc.title(REPORT_TITLE);
    doc.line(&format!(
        "Generated: {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    doc.line("");

    doc.section(
        "Test Details",
        &[
            ("Date", config.date.clone()),
            ("Equipment Name", config.equipment_name.clone()),
            ("Equipment Make", config.equipment_make.clone()),
            ("Capacity (T)", config.capacity_t.to_string()),
        ],
    );

    doc.section(
        "Test Result",
        &[
            ("Test Load (T)", snapshot.test_load.clone()),
            ("Load Cell Value", snapshot.load_cell_value.clone()),
            ("Duration (s)", snapshot.duration.clone()),
            ("Result", snapshot.result.label().to_string()),
        ],
    );

    for (heading, signatory) in [
        ("Conducted By", &config.conducted_by),
        ("Approved By", &config.approved_by),
    ] {
        doc.section(
            heading,
            &[
                ("Name", signatory.name.clone()),
                ("Designation", signatory.designation.clone()),
                ("Signature", SIGNATURE_LINE.to_string()),
            ],
        );
    }

    doc.render()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::evaluation::{evaluate, Verdict};
    use crate::models::Capacity;

    fn snapshot() -> ReportSnapshot {
        let mut config = Config::default();
        config.date = "2024-03-01".into();
        config.equipment_name = "Chain block".into();
        config.equipment_make = "Tata".into();
        config.capacity_t = Capacity::Tonnes(50.0);
        config.conducted_by.name = "A. Rao".into();
        config.approved_by.name = "S. Menon".into();
        config.approved_by.designation = "QA Lead".into();

        ReportSnapshot {
            config,
            result: evaluate("42.3", Some(50.0)),
            test_load: "42.3".into(),
            load_cell_value: "42.3".into(),
            duration: "30".into(),
            generated_at: Local.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap(),
        }
    }

    #[test]
    fn stem_uses_second_resolution_timestamp() {
        assert_eq!(report_stem(&snapshot().generated_at), "report_20240301_140509");
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let text = render(&snapshot());
        let order = [
            REPORT_TITLE,
            "Test Details",
            "Capacity (T):",
            "Test Result",
            "Result:          RESULT: SUCCESS",
            "Conducted By",
            "Approved By",
            "Designation: QA Lead",
        ];

        let mut cursor = 0;
        for needle in order {
            let found = text[cursor..]
                .find(needle)
                .unwrap_or_else(|| panic!("{needle:?} missing or out of order"));
            cursor += found + needle.len();
        }
        assert!(text.contains("Capacity (T):   50\n"));
    }

    #[test]
    fn same_second_reports_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path());
        let snapshot = snapshot();

        let first = generator.generate(&snapshot).unwrap();
        let second = generator.generate(&snapshot).unwrap();

        assert_ne!(first, second);
        assert_eq!(first.file_name().unwrap(), "report_20240301_140509.txt");
        assert_eq!(second.file_name().unwrap(), "report_20240301_140509_1.txt");
        assert_eq!(
            fs::read_to_string(&first).unwrap(),
            fs::read_to_string(&second).unwrap()
        );
    }

    #[test]
    fn unwritable_directory_surfaces_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().join("missing"));

        let err = generator.generate(&snapshot()).unwrap_err();
        assert!(matches!(err, HarnessError::Persistence { .. }));
    }

    #[test]
    fn discarding_a_partial_report_tolerates_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("report_20240301_140509.txt");
        fs::write(&partial, "half").unwrap();

        discard_partial(&partial);
        assert!(!partial.exists());

        // Already gone: logged, not propagated.
        discard_partial(&partial);
        assert!(!partial.exists());
    }

    #[test]
    fn pending_result_is_rendered_as_pending() {
        let mut snapshot = snapshot();
        snapshot.result = EvaluationResult::pending();
        assert_eq!(snapshot.result.verdict, Verdict::Pending);
        assert!(render(&snapshot).contains("Result:          Pending\n"));
    }
}
