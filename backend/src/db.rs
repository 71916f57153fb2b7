use rusqlite::{params, Connection, Result as SqlResult, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use webcam_index_common::registry::Registry;
use webcam_index_common::webcam::Webcam;

/// SQLite-backed store for webcam records.
///
/// One row per webcam, keyed by name. WAL mode is enabled so a scrape
/// writer and a concurrent reader do not block each other.
pub struct RegistryStore {
    conn: Mutex<Connection>,
}

impl RegistryStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> SqlResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self::init(conn)?;
        info!(path = db_path.display().to_string(), "webcam store opened");
        Ok(store)
    }

    fn init(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS webcams (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                name          TEXT    NOT NULL,
                url_template  TEXT    NOT NULL,
                last_index    INTEGER NOT NULL DEFAULT 0,
                scraped_at_ms INTEGER
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_webcams_name
                ON webcams(name);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or update every registry entry in one transaction.
    ///
    /// An existing row keeps its `last_index` and scrape timestamp; only
    /// the URL template is refreshed. Idempotent.
    pub fn upsert_all(&self, registry: &Registry) -> SqlResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for entry in registry.iter() {
            tx.execute(
                "INSERT INTO webcams (name, url_template) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET url_template = excluded.url_template",
                params![entry.name, entry.url_template],
            )?;
        }
        tx.commit()?;
        debug!(webcams = registry.len(), "registry upserted");
        Ok(())
    }

    /// Write scraped indices back in one transaction, overwriting
    /// `last_index` unconditionally and stamping the scrape time.
    ///
    /// Names with no matching row are skipped with a warning; rows absent
    /// from `results` are left untouched.
    pub fn apply_scrape_results(&self, results: &BTreeMap<String, u64>) -> SqlResult<()> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for (name, index) in results {
            let changed = tx.execute(
                "UPDATE webcams SET last_index = ?1, scraped_at_ms = ?2 WHERE name = ?3",
                params![*index as i64, now_ms, name],
            )?;
            if changed == 0 {
                warn!(webcam = %name, "scrape result for unknown webcam, skipping");
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Record a successful direct fetch. `last_index` never decreases on
    /// this path, even against a newer concurrent scrape write.
    pub fn record_fetched(&self, name: &str, index: u64) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE webcams SET last_index = MAX(last_index, ?1) WHERE name = ?2",
            params![index as i64, name],
        )?;
        Ok(())
    }

    /// Look up a single webcam by name.
    pub fn get(&self, name: &str) -> SqlResult<Option<Webcam>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, url_template, last_index, scraped_at_ms
             FROM webcams WHERE name = ?1",
        )?;
        let mut rows = stmt.query_map(params![name], row_to_webcam)?;
        rows.next().transpose()
    }

    /// All webcams in registration order.
    pub fn list_all(&self) -> SqlResult<Vec<Webcam>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, url_template, last_index, scraped_at_ms
             FROM webcams ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], row_to_webcam)?;
        rows.collect()
    }
}

fn row_to_webcam(row: &Row<'_>) -> SqlResult<Webcam> {
    Ok(Webcam {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        url_template: row.get(2)?,
        last_index: row.get::<_, i64>(3)? as u64,
        scraped_at_ms: row.get(4)?,
    })
}
