use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::FlagApi;
use crate::error::{Error, ValidationError};
use crate::merge::{build_replacement, RawOverrides, UpdateOverrides};
use crate::record::FlagRecord;

/// How a batch import reacts to a record the remote service rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Stop at the first failed record.
    FailFast,
    /// Try every record and report failures at the end.
    ContinueOnError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub succeeded: usize,
    pub failed: Vec<(String, Error)>,
    /// Records never attempted because the batch stopped early.
    pub skipped: usize,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len() + self.skipped
    }

    /// `Err` if any record failed.
    pub fn check(&self) -> Result<(), Error> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(Error::ImportFailed {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

/// What `export` writes and `import` reads back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub environment: String,
    pub exported_at: DateTime<Utc>,
    pub flags: Vec<FlagRecord>,
}

/// Import files are either an export document or a bare array of records.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Document { flags: Vec<FlagRecord> },
    Records(Vec<FlagRecord>),
}

pub fn create_flag(api: &dyn FlagApi, record: &FlagRecord) -> Result<(), Error> {
    record.validate()?;
    api.upsert(record)?;
    tracing::info!(key = %record.key, env = %record.environment, "flag created");
    Ok(())
}

/// Flags of one environment, sorted by key.
pub fn list_flags(api: &dyn FlagApi, environment: &str) -> Result<Vec<FlagRecord>, Error> {
    let mut flags = api.list_by_environment(environment)?;
    flags.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(flags)
}

/// The service has no fetch-by-key, so list the environment and pick one.
pub fn get_flag(api: &dyn FlagApi, key: &str, environment: &str) -> Result<FlagRecord, Error> {
    api.list_by_environment(environment)?
        .into_iter()
        .find(|f| f.key == key)
        .ok_or_else(|| Error::FlagNotFound {
            key: key.to_string(),
            environment: environment.to_string(),
        })
}

/// Change some fields of an existing flag.
///
/// Overrides are validated first; then the current record is fetched,
/// merged with the overrides and submitted as a full replacement. If the
/// fetch fails nothing is submitted. Concurrent writers between the fetch
/// and the upsert are not detected.
pub fn update_flag(
    api: &dyn FlagApi,
    key: &str,
    environment: &str,
    raw: RawOverrides,
) -> Result<FlagRecord, Error> {
    let overrides = UpdateOverrides::from_raw(raw)?;
    if overrides.is_empty() {
        return Err(ValidationError::NothingToUpdate.into());
    }

    let current = get_flag(api, key, environment)?;
    let next = build_replacement(&current, &overrides, environment);
    api.upsert(&next)?;
    tracing::info!(%key, env = %environment, "flag updated");
    Ok(next)
}

pub fn set_enabled(
    api: &dyn FlagApi,
    key: &str,
    environment: &str,
    enabled: bool,
) -> Result<FlagRecord, Error> {
    update_flag(
        api,
        key,
        environment,
        RawOverrides {
            enabled: Some(enabled),
            ..Default::default()
        },
    )
}

/// Keys are passed through as the service reported them; only `create`
/// originates a key and checks it.
pub fn delete_flag(api: &dyn FlagApi, key: &str, environment: &str) -> Result<(), Error> {
    api.delete(key, environment)?;
    tracing::info!(%key, env = %environment, "flag deleted");
    Ok(())
}

/// Read records from an import file.
pub fn read_import_file(path: &Path) -> Result<Vec<FlagRecord>, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ImportFile =
        serde_json::from_str(&content).map_err(|source| Error::ImportFormat {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(match file {
        ImportFile::Document { flags } => flags,
        ImportFile::Records(flags) => flags,
    })
}

/// Upsert every record into `environment`, in order.
///
/// All records are validated before the first request, so a bad file is
/// rejected as a whole. Remote failures are handled according to `mode`.
pub fn import_flags(
    api: &dyn FlagApi,
    environment: &str,
    records: Vec<FlagRecord>,
    mode: ImportMode,
) -> Result<ImportReport, Error> {
    let records: Vec<FlagRecord> = records
        .into_iter()
        .map(|mut record| {
            record.environment = environment.to_string();
            record
        })
        .collect();
    for record in &records {
        record.validate()?;
    }

    let mut report = ImportReport::default();
    let total = records.len();
    for (index, record) in records.iter().enumerate() {
        match api.upsert(record) {
            Ok(()) => {
                tracing::debug!(key = %record.key, "imported");
                report.succeeded += 1;
            }
            Err(e) => {
                tracing::warn!(key = %record.key, error = %e, "import failed");
                report.failed.push((record.key.clone(), e.into()));
                if mode == ImportMode::FailFast {
                    report.skipped = total - index - 1;
                    break;
                }
            }
        }
    }
    Ok(report)
}

pub fn export_flags(api: &dyn FlagApi, environment: &str) -> Result<ExportDocument, Error> {
    Ok(ExportDocument {
        environment: environment.to_string(),
        exported_at: Utc::now(),
        flags: list_flags(api, environment)?,
    })
}
