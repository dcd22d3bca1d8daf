//! Schema management.

use rusqlite::Connection;
use std::time::Duration;

use crate::error::StoreResult;

/// Queue and lookup tables.
///
/// The `jobs` table is the queue: the status column is the only coordination
/// point between processes. Terminal rows are retained indefinitely.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS jobs (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant            TEXT NOT NULL,
        company_name      TEXT NOT NULL,
        kind              TEXT NOT NULL CHECK (kind IN ('receipt', 'estimate')),
        month_folder      TEXT DEFAULT '',
        image_file        TEXT DEFAULT '',
        audio_file        TEXT DEFAULT '',
        append_audio_file TEXT DEFAULT '',
        transcription     TEXT DEFAULT '',
        report_file       TEXT DEFAULT '',
        project_id        INTEGER,
        category_1_id     INTEGER,
        category_2_id     INTEGER,
        status            TEXT NOT NULL,
        created_at        TEXT NOT NULL,
        FOREIGN KEY (project_id) REFERENCES projects(id),
        FOREIGN KEY (category_1_id) REFERENCES categories(id),
        FOREIGN KEY (category_2_id) REFERENCES categories(id)
    );
    CREATE INDEX IF NOT EXISTS idx_jobs_tenant ON jobs(tenant);
    CREATE INDEX IF NOT EXISTS idx_jobs_kind_status ON jobs(kind, status);

    CREATE TABLE IF NOT EXISTS projects (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant     TEXT NOT NULL,
        name       TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_projects_tenant ON projects(tenant);

    CREATE TABLE IF NOT EXISTS categories (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant     TEXT NOT NULL,
        name       TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_categories_tenant ON categories(tenant);

    CREATE TABLE IF NOT EXISTS job_tasks (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id     INTEGER NOT NULL,
        task       TEXT NOT NULL,
        done       INTEGER DEFAULT 0,
        created_at TEXT NOT NULL,
        FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_job_tasks_job ON job_tasks(job_id);
";

/// Apply connection pragmas and create missing tables.
///
/// WAL mode plus a busy timeout make short guarded updates safe under
/// concurrent access from independently started processes.
pub fn init(conn: &Connection) -> StoreResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
