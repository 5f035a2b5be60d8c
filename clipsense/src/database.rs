//! SQLite database layer for clip history, settings and templates
//!
//! JSON columns (`detected_types`, `metadata`, `tags`, `variables`) are
//! decoded with an empty-default fallback, so one corrupt row never fails a
//! whole list or search. Clips are only ever soft-deleted here.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::interface::{AppSettings, ClipEntry, ContentType, SearchFilters, Template, TemplatePatch};
use crate::models::{decode_json_column, encode_json, format_timestamp, parse_timestamp, NewClip};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Schema version written by this build
pub const SCHEMA_VERSION: i64 = 1;

/// Maximum rows returned by one search
pub const SEARCH_PAGE_SIZE: usize = 100;

const CLIP_COLUMNS: &str =
    "id, content, content_type, detected_types, metadata, created_at, updated_at, is_favorite, is_deleted, tags";

const TEMPLATE_COLUMNS: &str = "id, name, template, variables, created_at";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS clips (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        content_type TEXT NOT NULL,
        detected_types TEXT,
        metadata TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_favorite INTEGER NOT NULL DEFAULT 0,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        tags TEXT
    );

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS templates (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        template TEXT NOT NULL,
        variables TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    );

    CREATE INDEX IF NOT EXISTS idx_clips_created_at ON clips(created_at);
    CREATE INDEX IF NOT EXISTS idx_clips_content_type ON clips(content_type);
    CREATE INDEX IF NOT EXISTS idx_clips_is_favorite ON clips(is_favorite);
    CREATE INDEX IF NOT EXISTS idx_clips_is_deleted ON clips(is_deleted);
"#;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Thread-safe database wrapper using connection pooling
///
/// WAL mode lets readers proceed while the capture pipeline writes.
/// Each public method is a single statement or a single transaction.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA busy_timeout=5000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory needs single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Create tables, stamp the schema version and seed default settings
    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(SCHEMA)?;

        let version: i64 = tx.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
            row.get(0)
        })?;

        if version > SCHEMA_VERSION {
            return Err(DatabaseError::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        if version < SCHEMA_VERSION {
            tracing::info!(from = version, to = SCHEMA_VERSION, "migrating database schema");
            tx.execute("DELETE FROM schema_version", [])?;
            tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [SCHEMA_VERSION])?;
        }

        let settings_count: i64 = tx.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
        if settings_count == 0 {
            let now = format_timestamp(Utc::now());
            for (key, value) in AppSettings::default().to_map() {
                tx.execute(
                    "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    params![key, encode_json(&value)?, now],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Current schema version marker
    pub fn schema_version(&self) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;
        Ok(version)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Clips
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new clip, assigning its id and timestamps. Returns the id.
    pub fn insert_clip(&self, clip: &NewClip) -> DatabaseResult<String> {
        let conn = self.get_conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = format_timestamp(Utc::now());

        conn.execute(
            r#"INSERT INTO clips (id, content, content_type, detected_types, metadata, created_at, updated_at, is_favorite, is_deleted, tags)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, 0, ?8)"#,
            params![
                id,
                clip.content,
                clip.content_type.database_type(),
                encode_json(&clip.detected_types)?,
                encode_json(&clip.metadata)?,
                now,
                clip.is_favorite,
                encode_json(&clip.tags)?,
            ],
        )?;

        Ok(id)
    }

    /// Number of visible clips
    pub fn count_clips(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM clips WHERE is_deleted = 0", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Visible clips, newest first
    pub fn list_clips(&self, limit: usize) -> DatabaseResult<Vec<ClipEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM clips WHERE is_deleted = 0 ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            CLIP_COLUMNS
        ))?;
        let clips = stmt
            .query_map([limit as i64], Self::row_to_clip)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clips)
    }

    /// A visible clip by id
    pub fn get_clip(&self, id: &str) -> DatabaseResult<Option<ClipEntry>> {
        let conn = self.get_conn()?;
        let clip = conn
            .query_row(
                &format!("SELECT {} FROM clips WHERE id = ?1 AND is_deleted = 0", CLIP_COLUMNS),
                [id],
                Self::row_to_clip,
            )
            .optional()?;
        Ok(clip)
    }

    /// Administrative read that also returns soft-deleted clips
    pub fn get_clip_including_deleted(&self, id: &str) -> DatabaseResult<Option<ClipEntry>> {
        let conn = self.get_conn()?;
        let clip = conn
            .query_row(&format!("SELECT {} FROM clips WHERE id = ?1", CLIP_COLUMNS), [id], Self::row_to_clip)
            .optional()?;
        Ok(clip)
    }

    /// Mark a visible clip deleted. Returns false if no visible clip matched.
    pub fn soft_delete(&self, id: &str) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE clips SET is_deleted = 1, updated_at = MAX(?1, created_at) WHERE id = ?2 AND is_deleted = 0",
            params![format_timestamp(Utc::now()), id],
        )?;
        Ok(changed > 0)
    }

    /// Flip the favorite flag. Returns the new value, or `None` if no visible
    /// clip matched.
    pub fn toggle_favorite(&self, id: &str) -> DatabaseResult<Option<bool>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                r#"UPDATE clips SET is_favorite = NOT is_favorite, updated_at = MAX(?1, created_at)
                   WHERE id = ?2 AND is_deleted = 0
                   RETURNING is_favorite"#,
                params![format_timestamp(Utc::now()), id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Union the given tags into a clip's tag set
    pub fn add_tags(&self, id: &str, tags: &[String]) -> DatabaseResult<bool> {
        self.update_tags(id, |set| set.extend(tags.iter().cloned()))
    }

    /// Remove the given tags from a clip's tag set
    pub fn remove_tags(&self, id: &str, tags: &[String]) -> DatabaseResult<bool> {
        self.update_tags(id, |set| {
            for tag in tags {
                set.remove(tag);
            }
        })
    }

    /// Read-modify-write of the tag set inside one transaction
    fn update_tags<F>(&self, id: &str, apply: F) -> DatabaseResult<bool>
    where
        F: FnOnce(&mut BTreeSet<String>),
    {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let raw: Option<Option<String>> = tx
            .query_row("SELECT tags FROM clips WHERE id = ?1 AND is_deleted = 0", [id], |row| row.get(0))
            .optional()?;
        let Some(raw) = raw else {
            return Ok(false);
        };

        let mut tags: BTreeSet<String> = decode_json_column(raw.as_deref(), "tags", id);
        apply(&mut tags);

        tx.execute(
            "UPDATE clips SET tags = ?1, updated_at = MAX(?2, created_at) WHERE id = ?3",
            params![encode_json(&tags)?, format_timestamp(Utc::now()), id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Substring search plus filters over visible clips, newest first.
    /// Empty filter lists are treated as absent.
    pub fn search_clips(&self, query: &str, filters: &SearchFilters) -> DatabaseResult<Vec<ClipEntry>> {
        let mut sql = format!("SELECT {} FROM clips WHERE is_deleted = 0", CLIP_COLUMNS);
        let mut args: Vec<SqlValue> = Vec::new();

        if !query.is_empty() {
            sql.push_str(r" AND content LIKE ? ESCAPE '\'");
            args.push(SqlValue::Text(format!("%{}%", escape_like(query))));
        }

        if let Some(types) = filters.content_types.as_deref().filter(|t| !t.is_empty()) {
            sql.push_str(&format!(" AND content_type IN ({})", placeholders(types.len())));
            args.extend(types.iter().map(|t| SqlValue::Text(t.database_type().to_string())));
        }

        if let Some(is_favorite) = filters.is_favorite {
            sql.push_str(" AND is_favorite = ?");
            args.push(SqlValue::Integer(is_favorite as i64));
        }

        if let Some(range) = &filters.date_range {
            sql.push_str(" AND created_at BETWEEN ? AND ?");
            args.push(SqlValue::Text(format_timestamp(range.start)));
            args.push(SqlValue::Text(format_timestamp(range.end)));
        }

        if let Some(tags) = filters.tags.as_deref().filter(|t| !t.is_empty()) {
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(CASE WHEN json_valid(clips.tags) THEN clips.tags ELSE '[]' END) AS t WHERE t.value IN ({}))",
                placeholders(tags.len())
            ));
            args.extend(tags.iter().map(|t| SqlValue::Text(t.clone())));
        }

        if let Some(kinds) = filters.detected_types.as_deref().filter(|k| !k.is_empty()) {
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(CASE WHEN json_valid(clips.detected_types) THEN clips.detected_types ELSE '[]' END) AS d WHERE json_extract(d.value, '$.type') IN ({}))",
                placeholders(kinds.len())
            ));
            args.extend(kinds.iter().map(|k| SqlValue::Text(k.clone())));
        }

        sql.push_str(&format!(" ORDER BY created_at DESC, rowid DESC LIMIT {}", SEARCH_PAGE_SIZE));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let clips = stmt
            .query_map(rusqlite::params_from_iter(args), Self::row_to_clip)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clips)
    }

    /// Soft-delete sensitive clips created before `cutoff`. Returns the number
    /// of clips expired.
    pub fn soft_delete_sensitive_before(&self, cutoff: DateTime<Utc>) -> DatabaseResult<usize> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"UPDATE clips SET is_deleted = 1, updated_at = MAX(?1, created_at)
               WHERE is_deleted = 0
                 AND created_at < ?2
                 AND json_extract(CASE WHEN json_valid(metadata) THEN metadata ELSE '{}' END, '$.isSensitive') = 1"#,
            params![format_timestamp(Utc::now()), format_timestamp(cutoff)],
        )?;
        Ok(changed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────

    /// All stored settings. Values that fail to parse are skipped.
    pub fn load_settings(&self) -> DatabaseResult<Map<String, Value>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = Map::new();
        for (key, raw) in rows {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    map.insert(key, value);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "corrupt setting value, ignoring"),
            }
        }
        Ok(map)
    }

    /// Upsert every key in the map in one transaction
    pub fn save_settings(&self, values: &Map<String, Value>) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = format_timestamp(Utc::now());
        for (key, value) in values {
            Self::upsert_setting(&tx, key, value, &now)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> DatabaseResult<Option<Value>> {
        let conn = self.get_conn()?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "corrupt setting value, ignoring");
                None
            }
        }))
    }

    pub fn set_setting(&self, key: &str, value: &Value) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        Self::upsert_setting(&conn, key, value, &format_timestamp(Utc::now()))
    }

    fn upsert_setting(conn: &rusqlite::Connection, key: &str, value: &Value, now: &str) -> DatabaseResult<()> {
        conn.execute(
            r#"INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            params![key, encode_json(value)?, now],
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Templates
    // ─────────────────────────────────────────────────────────────────────────

    /// All templates, newest first
    pub fn list_templates(&self) -> DatabaseResult<Vec<Template>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM templates ORDER BY created_at DESC, rowid DESC",
            TEMPLATE_COLUMNS
        ))?;
        let templates = stmt
            .query_map([], Self::row_to_template)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    pub fn get_template(&self, id: &str) -> DatabaseResult<Option<Template>> {
        let conn = self.get_conn()?;
        let template = conn
            .query_row(
                &format!("SELECT {} FROM templates WHERE id = ?1", TEMPLATE_COLUMNS),
                [id],
                Self::row_to_template,
            )
            .optional()?;
        Ok(template)
    }

    pub fn insert_template(&self, name: &str, body: &str, variables: &[String]) -> DatabaseResult<Template> {
        let conn = self.get_conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO templates (id, name, template, variables, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, body, encode_json(variables)?, format_timestamp(now)],
        )?;

        // Round-trip through the storage format so the returned value equals a later read
        let created_at = parse_timestamp(&format_timestamp(now)).unwrap_or(now);
        Ok(Template {
            id,
            name: name.to_string(),
            template: body.to_string(),
            variables: variables.to_vec(),
            created_at,
        })
    }

    /// Apply the set fields of a patch. Returns false if the template does not exist.
    pub fn update_template(&self, id: &str, patch: &TemplatePatch) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;

        let mut sets: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(name) = &patch.name {
            sets.push("name = ?");
            args.push(SqlValue::Text(name.clone()));
        }
        if let Some(body) = &patch.template {
            sets.push("template = ?");
            args.push(SqlValue::Text(body.clone()));
        }
        if let Some(variables) = &patch.variables {
            sets.push("variables = ?");
            args.push(SqlValue::Text(encode_json(variables)?));
        }

        if sets.is_empty() {
            let exists: Option<i64> = conn
                .query_row("SELECT 1 FROM templates WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            return Ok(exists.is_some());
        }

        args.push(SqlValue::Text(id.to_string()));
        let sql = format!("UPDATE templates SET {} WHERE id = ?", sets.join(", "));
        let changed = conn.execute(&sql, rusqlite::params_from_iter(args))?;
        Ok(changed > 0)
    }

    pub fn delete_template(&self, id: &str) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM templates WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Row mapping
    // ─────────────────────────────────────────────────────────────────────────

    fn row_to_clip(row: &rusqlite::Row) -> rusqlite::Result<ClipEntry> {
        let id: String = row.get(0)?;
        let content: String = row.get(1)?;
        let content_type: String = row.get(2)?;
        let detected_types: Option<String> = row.get(3)?;
        let metadata: Option<String> = row.get(4)?;
        let created_at: Option<String> = row.get(5)?;
        let updated_at: Option<String> = row.get(6)?;
        let is_favorite: bool = row.get(7)?;
        let is_deleted: bool = row.get(8)?;
        let tags: Option<String> = row.get(9)?;

        let created_at = Self::decode_timestamp(created_at.as_deref(), "created_at", &id).unwrap_or_default();
        let updated_at = Self::decode_timestamp(updated_at.as_deref(), "updated_at", &id)
            .unwrap_or(created_at)
            .max(created_at);

        Ok(ClipEntry {
            content_type: ContentType::from_database(&content_type),
            detected_types: decode_json_column(detected_types.as_deref(), "detected_types", &id),
            metadata: decode_json_column(metadata.as_deref(), "metadata", &id),
            tags: decode_json_column(tags.as_deref(), "tags", &id),
            created_at,
            updated_at,
            is_favorite,
            is_deleted,
            content,
            id,
        })
    }

    fn row_to_template(row: &rusqlite::Row) -> rusqlite::Result<Template> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let template: String = row.get(2)?;
        let variables: Option<String> = row.get(3)?;
        let created_at: Option<String> = row.get(4)?;

        Ok(Template {
            variables: decode_json_column(variables.as_deref(), "variables", &id),
            created_at: Self::decode_timestamp(created_at.as_deref(), "created_at", &id).unwrap_or_default(),
            name,
            template,
            id,
        })
    }

    fn decode_timestamp(raw: Option<&str>, column: &str, row_id: &str) -> Option<DateTime<Utc>> {
        let raw = raw?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            tracing::warn!(column, row_id, "unparseable timestamp");
        }
        parsed
    }
}

/// Escape LIKE wildcards so the query matches literally
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{ClipMetadata, DateRange, DetectedType};
    use chrono::{Duration, TimeZone};

    fn text_clip(content: &str) -> NewClip {
        NewClip {
            content: content.to_string(),
            content_type: ContentType::Text,
            detected_types: Vec::new(),
            metadata: ClipMetadata::default(),
            is_favorite: false,
            tags: BTreeSet::new(),
        }
    }

    fn typed_clip(content: &str, kind: &str) -> NewClip {
        let mut clip = text_clip(content);
        clip.detected_types.push(DetectedType {
            kind: kind.to_string(),
            confidence: 0.9,
            metadata: Map::new(),
            preview: None,
        });
        clip
    }

    fn set_created_at(db: &Database, id: &str, ts: DateTime<Utc>) {
        let conn = db.get_conn().unwrap();
        conn.execute(
            "UPDATE clips SET created_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![format_timestamp(ts), id],
        )
        .unwrap();
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_clip(&text_clip("hello")).unwrap();

        let clip = db.get_clip(&id).unwrap().unwrap();
        assert_eq!(clip.id, id);
        assert_eq!(clip.content, "hello");
        assert_eq!(clip.content_type, ContentType::Text);
        assert!(!clip.is_deleted);
        assert!(!clip.is_favorite);
        assert_eq!(clip.created_at, clip.updated_at);
        assert!(db.get_clip("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_with_insertion_tiebreak() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_clip(&text_clip("a")).unwrap();
        let b = db.insert_clip(&text_clip("b")).unwrap();
        let c = db.insert_clip(&text_clip("c")).unwrap();

        let same = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        set_created_at(&db, &a, same);
        set_created_at(&db, &b, same);
        set_created_at(&db, &c, same - Duration::seconds(1));

        let ids: Vec<String> = db.list_clips(10).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b, a, c]);

        assert_eq!(db.list_clips(1).unwrap().len(), 1);
    }

    #[test]
    fn test_soft_delete_hides_but_keeps_row() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_clip(&text_clip("gone soon")).unwrap();

        assert!(db.soft_delete(&id).unwrap());
        assert!(db.get_clip(&id).unwrap().is_none());
        assert!(db.list_clips(10).unwrap().is_empty());
        assert!(db.search_clips("gone", &SearchFilters::default()).unwrap().is_empty());

        let row = db.get_clip_including_deleted(&id).unwrap().unwrap();
        assert!(row.is_deleted);
        assert!(row.updated_at >= row.created_at);

        // Second delete finds no visible clip
        assert!(!db.soft_delete(&id).unwrap());
    }

    #[test]
    fn test_toggle_favorite() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_clip(&text_clip("fav")).unwrap();
        assert_eq!(db.toggle_favorite(&id).unwrap(), Some(true));
        assert!(db.get_clip(&id).unwrap().unwrap().is_favorite);
        assert_eq!(db.toggle_favorite(&id).unwrap(), Some(false));
        assert_eq!(db.toggle_favorite("missing").unwrap(), None);
    }

    #[test]
    fn test_tags_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut clip = text_clip("tagged");
        clip.tags.insert("Work".to_string());
        let id = db.insert_clip(&clip).unwrap();
        let original = db.get_clip(&id).unwrap().unwrap().tags;

        let added = vec!["urgent".to_string(), "work".to_string()];
        assert!(db.add_tags(&id, &added).unwrap());
        let tags = db.get_clip(&id).unwrap().unwrap().tags;
        assert_eq!(tags.len(), 3, "tags are case-sensitive");

        assert!(db.remove_tags(&id, &added).unwrap());
        assert_eq!(db.get_clip(&id).unwrap().unwrap().tags, original);

        assert!(!db.add_tags("missing", &added).unwrap());
    }

    #[test]
    fn test_search_substring_is_case_insensitive_and_literal() {
        let db = Database::open_in_memory().unwrap();
        db.insert_clip(&text_clip("Hello World")).unwrap();
        db.insert_clip(&text_clip("100% done")).unwrap();
        db.insert_clip(&text_clip("1000 done")).unwrap();
        db.insert_clip(&text_clip("snake_case")).unwrap();
        db.insert_clip(&text_clip("snakeXcase")).unwrap();

        let none = SearchFilters::default();
        assert_eq!(db.search_clips("hello", &none).unwrap().len(), 1);
        assert_eq!(db.search_clips("100%", &none).unwrap().len(), 1);
        assert_eq!(db.search_clips("e_c", &none).unwrap()[0].content, "snake_case");
        assert_eq!(db.search_clips("", &none).unwrap().len(), 5);
    }

    #[test]
    fn test_search_filters_combine() {
        let db = Database::open_in_memory().unwrap();
        let mut a = text_clip("alpha note");
        a.tags.insert("work".to_string());
        let a = db.insert_clip(&a).unwrap();

        let mut b = text_clip("beta note");
        b.tags.insert("home".to_string());
        let b = db.insert_clip(&b).unwrap();

        let c = db.insert_clip(&typed_clip("https://example.com note", "url")).unwrap();
        db.toggle_favorite(&c).unwrap();

        // Tags are OR within the set
        let filters = SearchFilters {
            tags: Some(vec!["work".to_string(), "home".to_string()]),
            ..Default::default()
        };
        let mut ids: Vec<String> = db.search_clips("note", &filters).unwrap().into_iter().map(|c| c.id).collect();
        ids.sort();
        let mut expected = vec![a.clone(), b.clone()];
        expected.sort();
        assert_eq!(ids, expected);

        // And AND-combined with the rest
        let filters = SearchFilters {
            tags: Some(vec!["work".to_string(), "home".to_string()]),
            is_favorite: Some(false),
            ..Default::default()
        };
        assert_eq!(db.search_clips("alpha", &filters).unwrap().len(), 1);
        assert!(db.search_clips("url", &filters).unwrap().is_empty());

        let favorites = SearchFilters {
            is_favorite: Some(true),
            ..Default::default()
        };
        assert_eq!(db.search_clips("", &favorites).unwrap()[0].id, c);

        let urls = SearchFilters {
            detected_types: Some(vec!["url".to_string(), "email".to_string()]),
            ..Default::default()
        };
        let found = db.search_clips("", &urls).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, c);

        let text_only = SearchFilters {
            content_types: Some(vec![ContentType::Text]),
            ..Default::default()
        };
        assert_eq!(db.search_clips("note", &text_only).unwrap().len(), 3);

        let empty_lists = SearchFilters {
            tags: Some(Vec::new()),
            content_types: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(db.search_clips("note", &empty_lists).unwrap().len(), 3);
    }

    #[test]
    fn test_search_date_range_inclusive() {
        let db = Database::open_in_memory().unwrap();
        let old = db.insert_clip(&text_clip("old")).unwrap();
        let edge = db.insert_clip(&text_clip("edge")).unwrap();
        let new = db.insert_clip(&text_clip("new")).unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        set_created_at(&db, &old, start - Duration::days(1));
        set_created_at(&db, &edge, start);
        set_created_at(&db, &new, end + Duration::days(1));

        let filters = SearchFilters {
            date_range: Some(DateRange { start, end }),
            ..Default::default()
        };
        let found = db.search_clips("", &filters).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, edge);
    }

    #[test]
    fn test_search_page_size() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..(SEARCH_PAGE_SIZE + 5) {
            db.insert_clip(&text_clip(&format!("item {}", i))).unwrap();
        }
        assert_eq!(db.search_clips("item", &SearchFilters::default()).unwrap().len(), SEARCH_PAGE_SIZE);
    }

    #[test]
    fn test_corrupt_json_columns_fall_back() {
        let db = Database::open_in_memory().unwrap();
        let good = db.insert_clip(&typed_clip("good", "url")).unwrap();
        let bad = db.insert_clip(&text_clip("bad")).unwrap();
        {
            let conn = db.get_conn().unwrap();
            conn.execute(
                "UPDATE clips SET detected_types = '{oops', metadata = 'nope', tags = '[\"a\",' WHERE id = ?1",
                [&bad],
            )
            .unwrap();
        }

        let clips = db.list_clips(10).unwrap();
        assert_eq!(clips.len(), 2);
        let bad_clip = clips.iter().find(|c| c.id == bad).unwrap();
        assert!(bad_clip.detected_types.is_empty());
        assert!(bad_clip.tags.is_empty());
        assert_eq!(bad_clip.metadata, ClipMetadata::default());

        // JSON-based filters skip the corrupt row instead of failing
        let filters = SearchFilters {
            tags: Some(vec!["a".to_string()]),
            ..Default::default()
        };
        assert!(db.search_clips("", &filters).unwrap().is_empty());
        let urls = SearchFilters {
            detected_types: Some(vec!["url".to_string()]),
            ..Default::default()
        };
        assert_eq!(db.search_clips("", &urls).unwrap()[0].id, good);
    }

    #[test]
    fn test_soft_delete_sensitive_before() {
        let db = Database::open_in_memory().unwrap();
        let mut secret = text_clip("to********en");
        secret.metadata.is_sensitive = true;
        let old_secret = db.insert_clip(&secret).unwrap();
        let fresh_secret = db.insert_clip(&secret).unwrap();
        let old_plain = db.insert_clip(&text_clip("plain")).unwrap();

        let cutoff = Utc::now() - Duration::minutes(5);
        set_created_at(&db, &old_secret, cutoff - Duration::seconds(1));
        set_created_at(&db, &old_plain, cutoff - Duration::seconds(1));

        assert_eq!(db.soft_delete_sensitive_before(cutoff).unwrap(), 1);
        assert!(db.get_clip(&old_secret).unwrap().is_none());
        assert!(db.get_clip_including_deleted(&old_secret).unwrap().is_some());
        assert!(db.get_clip(&fresh_secret).unwrap().is_some());
        assert!(db.get_clip(&old_plain).unwrap().is_some());
    }

    #[test]
    fn test_settings_seeded_and_upserted() {
        let db = Database::open_in_memory().unwrap();
        let stored = db.load_settings().unwrap();
        assert_eq!(stored.get("theme"), Some(&Value::from("system")));
        assert_eq!(stored.get("sensitiveDataTTL"), Some(&Value::from(300000)));

        let mut partial = Map::new();
        partial.insert("theme".to_string(), Value::from("dark"));
        partial.insert("customKey".to_string(), Value::from(42));
        db.save_settings(&partial).unwrap();

        let stored = db.load_settings().unwrap();
        assert_eq!(stored.get("theme"), Some(&Value::from("dark")));
        assert_eq!(stored.get("customKey"), Some(&Value::from(42)));
        assert_eq!(stored.get("language"), Some(&Value::from("en")));

        db.set_setting("language", &Value::from("de")).unwrap();
        assert_eq!(db.get_setting("language").unwrap(), Some(Value::from("de")));
        assert_eq!(db.get_setting("missing").unwrap(), None);
    }

    #[test]
    fn test_templates_crud() {
        let db = Database::open_in_memory().unwrap();
        let t = db
            .insert_template("Greeting", "Hi {{name}}", &["name".to_string()])
            .unwrap();
        assert_eq!(db.get_template(&t.id).unwrap(), Some(t.clone()));

        let patch = TemplatePatch {
            name: Some("Hello".to_string()),
            ..Default::default()
        };
        assert!(db.update_template(&t.id, &patch).unwrap());
        let updated = db.get_template(&t.id).unwrap().unwrap();
        assert_eq!(updated.name, "Hello");
        assert_eq!(updated.template, "Hi {{name}}");

        assert!(db.update_template(&t.id, &TemplatePatch::default()).unwrap());
        assert!(!db.update_template("missing", &patch).unwrap());

        assert_eq!(db.list_templates().unwrap().len(), 1);
        assert!(db.delete_template(&t.id).unwrap());
        assert!(!db.delete_template(&t.id).unwrap());
        assert!(db.list_templates().unwrap().is_empty());
    }

    #[test]
    fn test_fresh_database_stamped_current_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
