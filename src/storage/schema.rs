//! Database schema definitions
//!
//! This module contains the SQL schema for the Site-Mirror database.

/// SQL schema for the database
///
/// One row per URL and mirrored site. `kind` and `status` hold the integer
/// codes of `ItemKind` and `ItemStatus`.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS frontier_items (
    site TEXT NOT NULL,
    url TEXT NOT NULL,
    kind INTEGER NOT NULL,
    status INTEGER NOT NULL,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    PRIMARY KEY (site, url)
);

CREATE INDEX IF NOT EXISTS idx_frontier_items_status ON frontier_items(site, status);
"#;

/// Initializes the database schema
///
/// Safe to call on an already initialized database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
