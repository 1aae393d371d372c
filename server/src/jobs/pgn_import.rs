use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::BufReader;

use crate::import::{ImportError, ImportReport, PgnImporter};
use crate::monitoring::PerformanceMonitor;
use crate::persistence::Persistence;

/// Imports PGN files from disk and reports each run to the monitor.
pub struct PgnImportProcessor<D: Persistence> {
    importer: PgnImporter<D>,
    monitor: Arc<dyn PerformanceMonitor>,
}

impl<D: Persistence> PgnImportProcessor<D> {
    pub fn new(store: Arc<D>, monitor: Arc<dyn PerformanceMonitor>) -> Self {
        Self {
            importer: PgnImporter::new(store),
            monitor,
        }
    }

    pub async fn process(&self, path: &Path) -> Result<ImportReport, ImportError> {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let file = tokio::fs::File::open(path).await.map_err(|e| {
            tracing::error!(path = %path.display(), "Failed to open PGN file: {}", e);
            e
        })?;
        let report = self.importer.batch_import(&label, BufReader::new(file)).await?;

        self.monitor.register(
            "pgn_import",
            "process",
            report.processed as u64,
            "game",
            report.elapsed,
        );
        self.monitor.register(
            "pgn_import",
            "import",
            report.imported as u64,
            "game",
            report.elapsed,
        );
        tracing::info!(
            source = %report.source,
            imported = report.imported,
            skipped = report.skipped,
            "Imported {} of {} games",
            report.imported,
            report.processed
        );
        Ok(report)
    }

    /// Import the files one after another. A failed file does not stop the
    /// ones after it.
    pub async fn process_all(
        &self,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, Result<ImportReport, ImportError>)> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.process(path).await;
            if let Err(e) = &result {
                tracing::warn!(path = %path.display(), "PGN import failed: {}", e);
            }
            results.push((path.clone(), result));
        }
        results
    }
}
