//! Workbook export.
//!
//! One run writes one directory, `cohort_complete_analysis_<stamp>/`,
//! holding a CSV per sheet and a `manifest.json` describing them.

use crate::{
    error::CohortResult,
    report::Workbook,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ARTIFACT_PREFIX: &str = "cohort_complete_analysis";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name:    String,
    pub file:    String,
    pub rows:    usize,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub generated_at: String,
    pub start_month:  String,
    pub end_month:    String,
    pub sheets:       Vec<ManifestEntry>,
}

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub directory: PathBuf,
    pub manifest:  PathBuf,
    pub sheets:    Vec<PathBuf>,
}

/// `All Users - AUM - Pre-IPO` → `all_users_aum_pre_ipo.csv`
pub fn sheet_file_name(sheet_name: &str) -> String {
    let mut out = String::with_capacity(sheet_name.len());
    for ch in sheet_name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    format!("{}.csv", out.trim_matches('_'))
}

pub fn write_workbook(workbook: &Workbook, output_dir: &Path) -> CohortResult<ExportPaths> {
    let stamp = workbook.generated_at.format("%Y%m%d_%H%M%S");
    let directory = output_dir.join(format!("{ARTIFACT_PREFIX}_{stamp}"));
    fs::create_dir_all(&directory)?;

    let mut entries = Vec::with_capacity(workbook.sheets.len());
    let mut sheet_paths = Vec::with_capacity(workbook.sheets.len());

    for sheet in &workbook.sheets {
        let file = sheet_file_name(&sheet.name);
        let path = directory.join(&file);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(sheet.table.header())?;
        for record in sheet.table.records() {
            writer.write_record(&record)?;
        }
        writer.flush()?;

        log::debug!("wrote {} ({} rows)", path.display(), sheet.table.len());
        entries.push(ManifestEntry {
            name: sheet.name.clone(),
            file,
            rows: sheet.table.len(),
            columns: sheet.table.header(),
        });
        sheet_paths.push(path);
    }

    let manifest = ExportManifest {
        generated_at: workbook.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        start_month: workbook.start_month.to_string(),
        end_month: workbook.end_month.to_string(),
        sheets: entries,
    };
    let manifest_path = directory.join("manifest.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    Ok(ExportPaths {
        directory,
        manifest: manifest_path,
        sheets: sheet_paths,
    })
}
