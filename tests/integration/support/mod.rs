#![allow(dead_code)]

use std::sync::Arc;

use tabula::config::DatabaseOptions;
use tabula::db::Database;
use tabula::types::Result;
use tabula::RelationRegistry;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_on TIMESTAMP,
    updated_on TIMESTAMP,
    username VARCHAR,
    password VARCHAR,
    manager_id INTEGER
);
CREATE TABLE projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_on TIMESTAMP,
    updated_on TIMESTAMP,
    title VARCHAR(64),
    owner_id INTEGER
);
CREATE TABLE project_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    project_id
);
CREATE TABLE tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL UNIQUE,
    kind TEXT DEFAULT 'plain',
    project_id INTEGER REFERENCES projects(id)
);
CREATE TABLE events (
    id INTEGER PRIMARY KEY,
    happened_at TIMESTAMP,
    token UUID,
    active BOOLEAN,
    payload BLOB,
    score REAL
);
";

const SEED: &str = "
INSERT INTO users (id, username, password) VALUES (1, 'big boss', 'bigboss123');
INSERT INTO users (id, username, password, manager_id) VALUES (2, 'lil boss', 'lilboss123', 1);
INSERT INTO users (id, username, password, manager_id) VALUES (3, 'wagie :(', 'wagie123', 2);
INSERT INTO users (id, username, password) VALUES (4, 'ekobadd', 'password123');
INSERT INTO projects (id, title, owner_id) VALUES (1, 'ekobadds project', 4);
INSERT INTO users (id, username, password) VALUES (5, 'ekofren', 'password345');
INSERT INTO project_members (user_id, project_id) VALUES (5, 1);
";

pub const BIG_BOSS: i64 = 1;
pub const LIL_BOSS: i64 = 2;
pub const WAGIE: i64 = 3;
pub const EKOBADD: i64 = 4;
pub const EKOFREN: i64 = 5;
pub const EKOBADDS_PROJECT: i64 = 1;

/// Seeded database in a temp dir with users, projects, project_members,
/// tags, and events registered.
pub struct Fixture {
    pub dir: TempDir,
    pub registry: RelationRegistry,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("tabula=debug"))
        .with_test_writer()
        .try_init();
}

pub fn open_database(dir: &TempDir) -> Result<Arc<Database>> {
    let db = Database::open(DatabaseOptions::at(dir.path().join("tabula-test.db")))?;
    Ok(Arc::new(db))
}

pub fn fixture() -> Result<Fixture> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let db = open_database(&dir)?;
    db.run_script(SCHEMA)?;
    db.run_script(SEED)?;

    let registry = RelationRegistry::new(db);
    registry.manage_table("users", "User")?;
    registry.manage_table("projects", "Project")?;
    registry.manage_table("project_members", "ProjectUser")?;
    registry.manage_table("tags", "Tag")?;
    registry.manage_table("events", "Event")?;
    Ok(Fixture { dir, registry })
}
