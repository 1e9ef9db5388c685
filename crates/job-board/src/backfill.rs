//! One-shot derivation of `job_url_id` for rows stored without it

use serde::Serialize;

use crate::error::Result;
use crate::storage::JobStore;
use crate::types::extract_job_url_id;

/// Outcome of a backfill run
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BackfillReport {
    /// Rows found without a job url id
    pub scanned: usize,
    /// Rows given a job url id
    pub updated: usize,
    /// Rows whose URL does not match the pattern, left unset
    pub unmatched: usize,
    /// Rows the store refused to update, left unset
    pub failed: usize,
}

/// Fill in `job_url_id` from each row's URL.
///
/// Only rows with no job url id are selected, so a second run is a no-op.
/// With `dry_run` nothing is written and `updated` counts what would be.
pub fn run(store: &JobStore, dry_run: bool) -> Result<BackfillReport> {
    let rows = store.list_missing_job_url_id()?;
    let mut report = BackfillReport {
        scanned: rows.len(),
        ..Default::default()
    };

    if rows.is_empty() {
        tracing::info!("No rows need a job url id");
        return Ok(report);
    }
    tracing::info!("Found {} rows without a job url id", rows.len());

    for row in rows {
        let Some(job_url_id) = extract_job_url_id(&row.id) else {
            tracing::warn!("Cannot extract a job url id from {}", row.url);
            report.unmatched += 1;
            continue;
        };

        if dry_run {
            tracing::info!("Would set job url id of {} to {}", row.id, job_url_id);
            report.updated += 1;
        } else {
            match store.set_job_url_id(&row.id, &job_url_id) {
                Ok(true) => {
                    tracing::info!("Set job url id of {} to {}", row.id, job_url_id);
                    report.updated += 1;
                }
                Ok(false) => tracing::warn!("Row {} disappeared during backfill", row.id),
                Err(e) => {
                    tracing::error!(
                        "Failed to set job url id of {} to {}: {}",
                        row.id,
                        job_url_id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
    }

    tracing::info!(
        "Backfill done: {} updated, {} unmatched, {} failed{}",
        report.updated,
        report.unmatched,
        report.failed,
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_sets_job_url_id() {
        let store = JobStore::in_memory().unwrap();
        store
            .insert_legacy_row("https://site/position/12345/detail", "Backend Engineer", "研发 - 后端")
            .unwrap();
        store
            .insert_legacy_row("https://site/careers/intern", "Intern", "研发 - 后端")
            .unwrap();

        let report = run(&store, false).unwrap();
        assert_eq!(
            report,
            BackfillReport {
                scanned: 2,
                updated: 1,
                unmatched: 1,
                failed: 0,
            }
        );

        let row = store.get_by_job_url_id("12345").unwrap().unwrap();
        assert_eq!(row.id, "https://site/position/12345/detail");
        assert_eq!(row.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(row.department.as_deref(), Some("研发 - 后端"));
    }

    #[test]
    fn test_backfill_is_idempotent() {
        let store = JobStore::in_memory().unwrap();
        store
            .insert_legacy_row("https://site/position/1/detail", "A", "研发")
            .unwrap();
        store
            .insert_legacy_row("https://site/position/2/detail", "B", "研发")
            .unwrap();

        assert_eq!(run(&store, false).unwrap().updated, 2);

        let second = run(&store, false).unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_colliding_row_does_not_stop_backfill() {
        let store = JobStore::in_memory().unwrap();
        for id in [
            "https://site/position/42/detail",
            "https://site/position/42/detail?spread=x",
            "https://site/position/43/detail",
        ] {
            store.insert_legacy_row(id, "E", "研发").unwrap();
        }

        let first = run(&store, false).unwrap();
        assert_eq!(first.updated, 2);
        assert_eq!(first.failed, 1);
        assert!(store.get_by_job_url_id("43").unwrap().is_some());
        assert_eq!(
            store.get_by_job_url_id("42").unwrap().unwrap().id,
            "https://site/position/42/detail"
        );

        // The duplicate stays unset and nothing else changes on a rerun
        let second = run(&store, false).unwrap();
        assert_eq!(second.scanned, 1);
        assert_eq!(second.updated, 0);
        assert_eq!(second.failed, 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let store = JobStore::in_memory().unwrap();
        store
            .insert_legacy_row("https://site/position/3/detail", "C", "研发")
            .unwrap();

        assert_eq!(run(&store, true).unwrap().updated, 1);
        assert_eq!(store.list_missing_job_url_id().unwrap().len(), 1);
    }

    #[test]
    fn test_backfill_leaves_other_fields_untouched() {
        let store = JobStore::in_memory().unwrap();
        store
            .insert_legacy_row("https://site/position/4/detail", "D", "研发")
            .unwrap();
        let mut expected = store.get_by_id("https://site/position/4/detail").unwrap().unwrap();

        run(&store, false).unwrap();

        let after = store.get_by_id("https://site/position/4/detail").unwrap().unwrap();
        expected.job_url_id = Some("4".to_string());
        assert_eq!(after, expected);
    }
}
