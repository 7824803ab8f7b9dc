use std::sync::Arc;

use crate::artifacts::{ArtifactStore, DownloadSummary, HttpFetcher};
use crate::config::BenchConfig;
use crate::core::Catalog;
use crate::BenchResult;

/// Store over the configured artifacts directory, fetching over HTTPS.
pub fn open_store(config: &BenchConfig, catalog: &Catalog) -> ArtifactStore {
    ArtifactStore::new(&config.artifacts_dir, catalog, Arc::new(HttpFetcher::new()))
}

pub fn catalog_for(config: &BenchConfig, exploration: bool) -> Catalog {
    if exploration {
        Catalog::exploration(config.base_url.clone())
    } else {
        Catalog::reference(config.base_url.clone())
    }
}

pub fn print_download_summary(summary: &DownloadSummary) {
    println!(
        "Files downloaded: {} / {} ({} fetched, {} already present)",
        summary.resolved, summary.total, summary.fetched, summary.already_present
    );
    for (artifact, reason) in &summary.failed {
        println!("  failed: {artifact}: {reason}");
    }
}

/// List artifact status, optionally downloading missing ones first.
pub fn run(config: &BenchConfig, download: bool, hash: bool, exploration: bool) -> BenchResult<()> {
    let catalog = catalog_for(config, exploration);
    let store = open_store(config, &catalog);

    if download {
        let runtime = tokio::runtime::Runtime::new()?;
        let summary = runtime.block_on(store.request_all());
        print_download_summary(&summary);
    }

    for status in store.statuses() {
        let mark = if status.present { "x" } else { " " };
        let mut line = format!("[{mark}] {:<32} {}", status.artifact, status.path.display());
        if hash && status.present {
            line.push_str(&format!("  sha256:{}", store.fingerprint(&status.artifact)?));
        }
        if let Some(reason) = &status.failure {
            line.push_str(&format!("  ({reason})"));
        }
        println!("{line}");
    }

    let present = store.statuses().iter().filter(|s| s.present).count();
    println!("{present} / {} artifacts present in {}", store.total(), store.dir().display());
    Ok(())
}

/// Print the circuits of the catalog and the artifacts each one needs.
pub fn list_circuits(config: &BenchConfig, exploration: bool) -> BenchResult<()> {
    let catalog = catalog_for(config, exploration);
    for circuit in &catalog.circuits {
        println!("{} (witnesscalc_{})", circuit.id, circuit.id.witnesscalc_symbol());
        for artifact in circuit.artifacts() {
            println!("  {}", catalog.url_of(artifact));
        }
    }
    Ok(())
}
