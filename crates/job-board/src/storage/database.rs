//! SQLite store for job postings
//!
//! One `jobs` table keyed by the posting's full source URL. Each `JobStore`
//! owns its own connection; callers open one per unit of work and drop it
//! when done.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

use crate::config::FilterKey;
use crate::error::{Error, Result};
use crate::types::{JobPosting, UpsertOutcome};

const POSTING_COLUMNS: &str = "id, job_url_id, title, company, company_logo, location, salary, \
     tags, url, department, category, job_type, description, requirements, created_at, updated_at";

/// SQLite-backed job posting store
pub struct JobStore {
    conn: Connection,
}

/// Row lacking a job url id, as seen by the backfill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingJobUrlId {
    pub id: String,
    pub url: String,
}

impl JobStore {
    /// Create or open the database at the given path and run migrations
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an existing, already migrated database (per-request acquisition)
    pub fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        // WAL lets the crawler write while the server reads
        self.conn
            .execute_batch(
                r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
            )
            .map_err(|e| Error::config(format!("Failed to set pragmas: {}", e)))?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                job_url_id TEXT,
                title TEXT,
                company TEXT,
                company_logo TEXT,
                location TEXT,
                salary TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                url TEXT NOT NULL,
                department TEXT,
                category TEXT,
                job_type TEXT,
                description TEXT,
                requirements TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_job_url_id ON jobs(job_url_id);
            CREATE INDEX IF NOT EXISTS idx_jobs_department ON jobs(department);
            CREATE INDEX IF NOT EXISTS idx_jobs_category ON jobs(category);
        "#,
        )?;

        tracing::debug!("Database migrations complete");
        Ok(())
    }

    /// Insert a posting, or overwrite every field but `id` and `created_at`
    pub fn upsert(&mut self, posting: &JobPosting) -> Result<UpsertOutcome> {
        let tx = self.conn.transaction()?;

        let existed = tx
            .query_row("SELECT 1 FROM jobs WHERE id = ?1", params![posting.id], |_| Ok(()))
            .optional()?
            .is_some();

        tx.execute(
            r#"
            INSERT INTO jobs (
                id, job_url_id, title, company, company_logo, location, salary,
                tags, url, department, category, job_type, description, requirements,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(id) DO UPDATE SET
                job_url_id = excluded.job_url_id,
                title = excluded.title,
                company = excluded.company,
                company_logo = excluded.company_logo,
                location = excluded.location,
                salary = excluded.salary,
                tags = excluded.tags,
                url = excluded.url,
                department = excluded.department,
                category = excluded.category,
                job_type = excluded.job_type,
                description = excluded.description,
                requirements = excluded.requirements,
                updated_at = excluded.updated_at
            "#,
            params![
                posting.id,
                posting.job_url_id,
                posting.title,
                posting.company,
                posting.company_logo,
                posting.location,
                posting.salary,
                serde_json::to_string(&posting.tags)?,
                posting.url,
                posting.department,
                posting.category,
                posting.job_type,
                posting.description,
                serde_json::to_string(&posting.requirements)?,
                posting.created_at.to_rfc3339(),
                posting.updated_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    /// Get a posting by its full source URL
    pub fn get_by_id(&self, id: &str) -> Result<Option<JobPosting>> {
        self.query_one("id", id)
    }

    /// Get a posting by its numeric job url id
    pub fn get_by_job_url_id(&self, job_url_id: &str) -> Result<Option<JobPosting>> {
        self.query_one("job_url_id", job_url_id)
    }

    fn query_one(&self, column: &str, value: &str) -> Result<Option<JobPosting>> {
        let sql = format!("SELECT {} FROM jobs WHERE {} = ?1", POSTING_COLUMNS, column);
        let posting = self
            .conn
            .query_row(&sql, params![value], row_to_posting)
            .optional()?;
        Ok(posting)
    }

    /// All postings, oldest first
    pub fn list_all(&self) -> Result<Vec<JobPosting>> {
        let sql = format!(
            "SELECT {} FROM jobs ORDER BY created_at, id",
            POSTING_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let postings = stmt
            .query_map([], row_to_posting)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(postings)
    }

    /// Postings whose filter column equals `value` exactly
    pub fn list_by(&self, key: FilterKey, value: &str) -> Result<Vec<JobPosting>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE {} = ?1 ORDER BY created_at, id",
            POSTING_COLUMNS,
            key.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let postings = stmt
            .query_map(params![value], row_to_posting)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(postings)
    }

    /// Rows whose job url id has not been derived yet
    pub fn list_missing_job_url_id(&self) -> Result<Vec<MissingJobUrlId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, url FROM jobs WHERE job_url_id IS NULL ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MissingJobUrlId {
                    id: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Set the job url id of one row, leaving every other column untouched
    pub fn set_job_url_id(&self, id: &str, job_url_id: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE jobs SET job_url_id = ?1 WHERE id = ?2",
            params![job_url_id, id],
        )?;
        Ok(updated > 0)
    }

    /// Number of stored postings
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert a raw row as older tooling wrote it, with no job url id.
    #[cfg(test)]
    pub(crate) fn insert_legacy_row(&self, id: &str, title: &str, department: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO jobs (id, title, url, department, created_at, updated_at) \
             VALUES (?1, ?2, ?1, ?3, ?4, ?4)",
            params![id, title, department, now],
        )?;
        Ok(())
    }
}

fn row_to_posting(row: &rusqlite::Row) -> rusqlite::Result<JobPosting> {
    Ok(JobPosting {
        id: row.get(0)?,
        job_url_id: row.get(1)?,
        title: row.get(2)?,
        company: row.get(3)?,
        company_logo: row.get(4)?,
        location: row.get(5)?,
        salary: row.get(6)?,
        tags: json_column(row, 7)?,
        url: row.get(8)?,
        department: row.get(9)?,
        category: row.get(10)?,
        job_type: row.get(11)?,
        description: row.get(12)?,
        requirements: json_column(row, 13)?,
        created_at: timestamp_column(row, 14)?,
        updated_at: timestamp_column(row, 15)?,
    })
}

fn json_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn posting(job_url_id: &str, department: &str) -> JobPosting {
        let url = format!("https://jobs.bytedance.com/experienced/position/{}/detail", job_url_id);
        let now = Utc::now();
        JobPosting {
            id: url.clone(),
            job_url_id: Some(job_url_id.to_string()),
            title: Some("后端开发工程师".to_string()),
            company: Some("ByteDance".to_string()),
            company_logo: Some("/images/bytedance.svg".to_string()),
            location: Some("北京".to_string()),
            salary: Some("面议".to_string()),
            tags: vec![department.to_string(), "社招".to_string()],
            url,
            department: Some(department.to_string()),
            category: Some("后端".to_string()),
            job_type: Some("社招".to_string()),
            description: Some("1、负责服务端开发".to_string()),
            requirements: vec!["1、负责服务端开发".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = JobStore::in_memory().unwrap();
        let job = posting("100", "研发 - 后端");

        assert_eq!(store.upsert(&job).unwrap(), UpsertOutcome::Inserted);

        let by_url_id = store.get_by_job_url_id("100").unwrap().unwrap();
        assert_eq!(by_url_id.id, job.id);
        assert_eq!(by_url_id.tags, job.tags);
        assert_eq!(by_url_id.requirements, job.requirements);

        let by_id = store.get_by_id(&job.id).unwrap().unwrap();
        assert_eq!(by_id.job_url_id.as_deref(), Some("100"));

        assert!(store.get_by_job_url_id("999").unwrap().is_none());
    }

    #[test]
    fn test_upsert_overwrites_everything_but_id() {
        let mut store = JobStore::in_memory().unwrap();
        let original = posting("200", "研发 - 后端");
        store.upsert(&original).unwrap();

        let mut changed = posting("200", "研发 - 前端");
        changed.title = Some("前端开发工程师".to_string());
        changed.location = None;
        changed.salary = Some("30k".to_string());
        changed.requirements = vec!["- React".to_string()];
        changed.category = Some("前端".to_string());
        changed.created_at = original.created_at + Duration::days(1);
        changed.updated_at = original.updated_at + Duration::days(1);

        assert_eq!(store.upsert(&changed).unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.count().unwrap(), 1);

        let stored = store.get_by_id(&original.id).unwrap().unwrap();
        assert_eq!(stored.id, original.id);
        assert_eq!(stored.title, changed.title);
        assert_eq!(stored.location, None);
        assert_eq!(stored.salary, changed.salary);
        assert_eq!(stored.department, changed.department);
        assert_eq!(stored.category, changed.category);
        assert_eq!(stored.tags, changed.tags);
        assert_eq!(stored.requirements, changed.requirements);
        assert_eq!(
            stored.created_at.timestamp(),
            original.created_at.timestamp()
        );
        assert_eq!(stored.updated_at.timestamp(), changed.updated_at.timestamp());
    }

    #[test]
    fn test_list_by_filter_key() {
        let mut store = JobStore::in_memory().unwrap();
        store.upsert(&posting("1", "研发 - 后端")).unwrap();
        store.upsert(&posting("2", "研发 - 后端")).unwrap();
        store.upsert(&posting("3", "研发 - 前端")).unwrap();

        assert_eq!(store.list_all().unwrap().len(), 3);
        assert_eq!(
            store.list_by(FilterKey::Department, "研发 - 后端").unwrap().len(),
            2
        );
        // Exact, case-sensitive match only
        assert!(store.list_by(FilterKey::Department, "研发").unwrap().is_empty());
        assert_eq!(store.list_by(FilterKey::Category, "后端").unwrap().len(), 3);
    }

    #[test]
    fn test_missing_job_url_id() {
        let store = JobStore::in_memory().unwrap();
        store
            .insert_legacy_row("https://site/position/7/detail", "Engineer", "研发")
            .unwrap();

        let missing = store.list_missing_job_url_id().unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].url, "https://site/position/7/detail");

        assert!(store.set_job_url_id(&missing[0].id, "7").unwrap());
        assert!(store.list_missing_job_url_id().unwrap().is_empty());
        assert!(!store.set_job_url_id("https://site/unknown", "8").unwrap());
    }

    #[test]
    fn test_malformed_row_is_an_error() {
        let store = JobStore::in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO jobs (id, job_url_id, url, tags, requirements, created_at, updated_at) \
                 VALUES ('https://site/position/9/detail', '9', 'https://site/position/9/detail', \
                 'not json', '[oops', '2024-05-01 08:00:00', 'garbage')",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.get_by_job_url_id("9"),
            Err(Error::Database(rusqlite::Error::FromSqlConversionFailure(..)))
        ));
        assert!(store.list_all().is_err());
    }

    #[test]
    fn test_bad_timestamp_is_an_error() {
        let store = JobStore::in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO jobs (id, job_url_id, url, created_at, updated_at) \
                 VALUES ('https://site/position/8/detail', '8', 'https://site/position/8/detail', \
                 '2024-05-01 08:00:00', '2024-05-01T08:00:00+00:00')",
                [],
            )
            .unwrap();

        assert!(store.get_by_id("https://site/position/8/detail").is_err());
    }

    #[test]
    fn test_open_and_connect_share_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.db");

        let mut store = JobStore::open(&path).unwrap();
        store.upsert(&posting("300", "研发")).unwrap();
        drop(store);

        let reader = JobStore::connect(&path).unwrap();
        assert_eq!(reader.count().unwrap(), 1);
    }
}
