//! Archive extraction into the staging directory

use crate::config::{ImportConfig, StagingConfig};
use crate::core::progress::StageProgress;
use crate::domain::tables::table_for_file;
use crate::domain::{ArchiveHandle, ExtractError, StagedFileSet};
use crate::logging::{GroupLogger, LogGroup};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

/// Unpacks known table files and checks the required ones arrived
///
/// Members are staged under their base name, so a feed zipped inside a
/// folder stages the same as a flat one. Files that are not in the table
/// catalogue are skipped. Blocking; run it off the async executor.
#[derive(Debug, Clone)]
pub struct Extractor {
    staging_dir: PathBuf,
    required_tables: Vec<String>,
    logger: GroupLogger,
}

impl Extractor {
    pub fn new(staging: &StagingConfig, import: &ImportConfig, logger: GroupLogger) -> Self {
        Self {
            staging_dir: PathBuf::from(&staging.dir),
            required_tables: import.required_tables.clone(),
            logger,
        }
    }

    pub fn extract(
        &self,
        archive: &ArchiveHandle,
        progress: &StageProgress,
    ) -> Result<StagedFileSet, ExtractError> {
        let corrupt = |source| ExtractError::Corrupt {
            path: archive.path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.staging_dir).map_err(|source| ExtractError::Io {
            path: self.staging_dir.clone(),
            source,
        })?;

        let file = File::open(&archive.path).map_err(|source| ExtractError::Io {
            path: archive.path.clone(),
            source,
        })?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(corrupt)?;
        let total = zip.len() as u64;
        let mut staged = StagedFileSet::new(&self.staging_dir);

        self.logger.log(
            LogGroup::ExtractorSimple,
            format!("Extracting {total} members from {}", archive.path.display()),
        );

        for index in 0..zip.len() {
            let mut member = zip.by_index(index).map_err(corrupt)?;
            let base_name = member
                .enclosed_name()
                .filter(|_| !member.is_dir())
                .and_then(|path| path.file_name().map(|n| n.to_string_lossy().to_lowercase()));

            match base_name.as_deref().and_then(table_for_file) {
                Some(spec) => {
                    let destination = self.staging_dir.join(spec.file_name);
                    let written = copy_member(&mut member, &destination)
                        .map_err(|e| e.into_extract_error(&archive.path, &destination))?;
                    self.logger.log_with(LogGroup::ExtractorSimple, || {
                        format!("Staged {} ({written} bytes)", spec.file_name)
                    });
                    staged.insert(spec.name, destination);
                }
                None => {
                    tracing::debug!(member = %member.name(), "Skipping archive member");
                }
            }

            progress.report_fraction(index as u64 + 1, total);
        }

        let missing: Vec<String> = self
            .required_tables
            .iter()
            .filter(|table| !staged.contains(table))
            .map(|table| {
                crate::domain::tables::table_spec(table)
                    .map_or_else(|| format!("{table}.txt"), |spec| spec.file_name.to_string())
            })
            .collect();

        if !missing.is_empty() {
            self.logger.log(
                LogGroup::Error,
                format!("Archive is missing {}", missing.join(", ")),
            );
            if let Err(e) = staged.discard() {
                tracing::warn!(error = %e, "Failed to discard partially staged files");
            }
            return Err(ExtractError::MissingMembers { missing });
        }

        progress.report(100);
        self.logger.log(
            LogGroup::ExtractorSimple,
            format!("Staged {} table files", staged.len()),
        );
        Ok(staged)
    }
}

#[derive(Debug)]
enum CopyError {
    Read(std::io::Error),
    Write(std::io::Error),
}

impl CopyError {
    fn into_extract_error(self, archive: &Path, destination: &Path) -> ExtractError {
        match self {
            CopyError::Read(e) => ExtractError::Corrupt {
                path: archive.to_path_buf(),
                source: ZipError::Io(e),
            },
            CopyError::Write(source) => ExtractError::Io {
                path: destination.to_path_buf(),
                source,
            },
        }
    }
}

fn copy_member(member: &mut impl Read, destination: &Path) -> Result<u64, CopyError> {
    let mut out = File::create(destination).map_err(CopyError::Write)?;
    let mut buffer = vec![0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let read = member.read(&mut buffer).map_err(CopyError::Read)?;
        if read == 0 {
            break;
        }
        out.write_all(&buffer[..read]).map_err(CopyError::Write)?;
        written += read as u64;
    }
    out.flush().map_err(CopyError::Write)?;
    Ok(written)
}
