//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Entities
CREATE TABLE IF NOT EXISTS entities (
    name TEXT PRIMARY KEY NOT NULL,
    entity_type TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    observations TEXT NOT NULL DEFAULT '[]',
    last_observation_update TEXT,
    embedding TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Relations, identified by (source, target, relation_type)
CREATE TABLE IF NOT EXISTS relations (
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    relation_type TEXT NOT NULL,
    properties TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (source, target, relation_type),
    FOREIGN KEY (source) REFERENCES entities(name) ON DELETE CASCADE,
    FOREIGN KEY (target) REFERENCES entities(name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type);
CREATE INDEX IF NOT EXISTS idx_relations_target ON relations(target);
CREATE INDEX IF NOT EXISTS idx_relations_type ON relations(relation_type);

-- Full-text search over name, type and metadata
CREATE VIRTUAL TABLE IF NOT EXISTS entities_fts USING fts5(
    name,
    entity_type,
    metadata,
    content=entities,
    content_rowid=rowid
);

-- Triggers to keep FTS in sync
CREATE TRIGGER IF NOT EXISTS entities_ai AFTER INSERT ON entities BEGIN
    INSERT INTO entities_fts(rowid, name, entity_type, metadata)
    VALUES (new.rowid, new.name, new.entity_type, new.metadata);
END;

CREATE TRIGGER IF NOT EXISTS entities_ad AFTER DELETE ON entities BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name, entity_type, metadata)
    VALUES ('delete', old.rowid, old.name, old.entity_type, old.metadata);
END;

CREATE TRIGGER IF NOT EXISTS entities_au AFTER UPDATE OF name, entity_type, metadata ON entities BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name, entity_type, metadata)
    VALUES ('delete', old.rowid, old.name, old.entity_type, old.metadata);
    INSERT INTO entities_fts(rowid, name, entity_type, metadata)
    VALUES (new.rowid, new.name, new.entity_type, new.metadata);
END;
"#;
