use std::sync::mpsc;
use std::thread;

use camino::Utf8PathBuf;
use extpack_domain::Unit;
use serde::Serialize;
use tracing::{error, info};

use crate::archive::TreeArchiver;
use crate::config::PackConfig;
use crate::error::{PackError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackedArchive {
    pub unit: String,
    pub path: Utf8PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PackReport {
    pub archives: Vec<PackedArchive>,
}

/// Packs units concurrently, one worker thread per unit.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveScheduler<'a> {
    archiver: TreeArchiver<'a>,
}

impl<'a> ArchiveScheduler<'a> {
    pub fn new(config: &'a PackConfig) -> Self {
        Self {
            archiver: TreeArchiver::new(config),
        }
    }

    /// Waits for every worker. A failed unit does not stop its siblings; the archives
    /// that did get written are listed in the error as well.
    pub fn pack_all(&self, units: &[Unit]) -> Result<PackReport> {
        let archiver = self.archiver;
        let mut archives = Vec::with_capacity(units.len());
        let mut failed = Vec::new();

        thread::scope(|scope| {
            let (result_tx, result_rx) = mpsc::channel();
            for unit in units {
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    let outcome = archiver.archive(unit);
                    // The receiver outlives every worker inside the scope.
                    let _ = result_tx.send((unit, outcome));
                });
            }
            drop(result_tx);

            for (unit, outcome) in result_rx {
                match outcome {
                    Ok(path) => {
                        info!(unit = %unit.name, archive = %path, "done");
                        archives.push(PackedArchive {
                            unit: unit.name.clone(),
                            path,
                        });
                    }
                    Err(err) => {
                        error!(
                            unit = %unit.name,
                            archive = %archiver.archive_path(unit),
                            %err,
                            "error creating pack"
                        );
                        failed.push(unit.name.clone());
                    }
                }
            }
        });

        archives.sort_by(|a, b| a.unit.cmp(&b.unit));
        if failed.is_empty() {
            return Ok(PackReport { archives });
        }
        failed.sort();
        Err(PackError::Scheduler { failed, archives })
    }
}
