//! SQLite-backed gateway
//!
//! One connection, one [`TransactionDepth`]. Physical transactions are plain
//! `BEGIN`/`COMMIT`/`ROLLBACK`; nesting is handled by the core transaction
//! layer. Checkout and config databases are attached to the same connection
//! under their [`DbRole`] schema names.

#![allow(clippy::result_large_err)]

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use deckstore_core::errors::{DeckError, ExError, ExErrorKind};
use deckstore_core::gateway::{
    parse_reference, ArtifactFilter, ArtifactRecord, PersistenceGateway, QueryStatus,
    ReferenceForm, RowFlow,
};
use deckstore_core::model::hash::content_hash;
use deckstore_core::transaction::{TransactionDepth, Transactional};
use deckstore_core::{log_op_end, log_op_error, log_op_start};
use deckstore_core::{ArtifactType, Rid, Timestamp};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::config::StoreConfig;
use crate::db;
use crate::errors::{content_collision, from_rusqlite, Result};
use crate::migrations::apply_migrations;
use crate::role::DbRole;

pub struct SqliteStore {
    conn: Connection,
    depth: TransactionDepth,
    attached: BTreeSet<DbRole>,
}

impl SqliteStore {
    /// Open (creating if needed) the repository `config` describes, apply
    /// pending migrations and attach the configured role databases
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let start = Instant::now();
        log_op_start!("open_store", in_memory = config.path.is_none());

        match Self::open_inner(config) {
            Ok(store) => {
                log_op_end!(
                    "open_store",
                    duration_ms = start.elapsed().as_millis() as u64,
                    attached = store.attached.len()
                );
                Ok(store)
            }
            Err(err) => {
                log_op_error!(
                    "open_store",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }

    /// A fresh in-memory repository
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StoreConfig::default())
    }

    fn open_inner(config: &StoreConfig) -> Result<Self> {
        let mut conn = match &config.path {
            Some(path) => db::open(path)?,
            None => db::open_in_memory()?,
        };
        db::configure(&conn, config)?;
        apply_migrations(&mut conn)?;

        let mut store = Self {
            conn,
            depth: TransactionDepth::new(),
            attached: BTreeSet::new(),
        };
        for (role, path) in config.attached_roles()? {
            store.attach(role, &path)?;
        }
        Ok(store)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Attach the database for `role`, creating its settings table
    ///
    /// # Errors
    ///
    /// `Misuse` for the repository role, a role already attached, or while
    /// a transaction is open.
    pub fn attach(&mut self, role: DbRole, path: &Path) -> Result<()> {
        if !DbRole::ATTACHABLE.contains(&role) || self.attached.contains(&role) {
            return Err(misuse("attach", format!("cannot attach {} database", role)));
        }
        if self.current_level() > 0 {
            return Err(misuse("attach", "cannot attach inside a transaction"));
        }
        let path = path.to_string_lossy().into_owned();
        self.conn
            .execute(
                &format!("ATTACH DATABASE ?1 AS {}", role.schema()),
                [path.as_str()],
            )
            .map_err(from_rusqlite)?;
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {}.setting (name TEXT PRIMARY KEY, value TEXT NOT NULL)",
                role.schema()
            ))
            .map_err(from_rusqlite)?;
        self.attached.insert(role);
        tracing::debug!(role = role.schema(), path = %path, "database attached");
        Ok(())
    }

    pub fn detach(&mut self, role: DbRole) -> Result<()> {
        if !self.attached.contains(&role) {
            return Err(misuse("detach", format!("{} database is not attached", role)));
        }
        if self.current_level() > 0 {
            return Err(misuse("detach", "cannot detach inside a transaction"));
        }
        self.conn
            .execute_batch(&format!("DETACH DATABASE {}", role.schema()))
            .map_err(from_rusqlite)?;
        self.attached.remove(&role);
        Ok(())
    }

    /// The repository is always available; other roles once attached
    pub fn is_attached(&self, role: DbRole) -> bool {
        role == DbRole::Repository || self.attached.contains(&role)
    }

    pub fn get_setting(&self, role: DbRole, name: &str) -> Result<Option<String>> {
        self.require_role(role, "get_setting")?;
        self.conn
            .query_row(
                &format!("SELECT value FROM {}.setting WHERE name = ?1", role.schema()),
                [name],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)
    }

    pub fn set_setting(&mut self, role: DbRole, name: &str, value: &str) -> Result<()> {
        self.require_role(role, "set_setting")?;
        self.conn
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO {}.setting (name, value) VALUES (?1, ?2)",
                    role.schema()
                ),
                params![name, value],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn require_role(&self, role: DbRole, op: &str) -> Result<()> {
        if self.is_attached(role) {
            Ok(())
        } else {
            Err(misuse(op, format!("{} database is not attached", role)))
        }
    }

    fn blob_exists(&self, rid: Rid) -> Result<bool> {
        self.conn
            .query_row("SELECT 1 FROM blob WHERE rid = ?1", [rid.0], |_| Ok(()))
            .optional()
            .map(|found| found.is_some())
            .map_err(from_rusqlite)
    }

    fn single_rid(&self, sql: &str, arg: &str) -> Result<Option<Rid>> {
        self.conn
            .query_row(sql, [arg], |row| row.get(0))
            .optional()
            .map(|rid| rid.map(Rid))
            .map_err(from_rusqlite)
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<Option<Rid>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rid FROM blob WHERE uuid GLOB ?1 || '*' LIMIT 2")
            .map_err(from_rusqlite)?;
        let rids = stmt
            .query_map([prefix], |row| row.get::<_, i64>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        match rids.as_slice() {
            [rid] => Ok(Some(Rid(*rid))),
            [] => self.single_rid("SELECT rid FROM symbolic_name WHERE name = ?1", prefix),
            _ => Err(DeckError::AmbiguousReference {
                reference: prefix.to_string(),
            }
            .into()),
        }
    }

    fn tip(&self) -> Result<Option<Rid>> {
        self.single_rid(
            "SELECT rid FROM artifact WHERE type = ?1
             ORDER BY mtime_ms IS NULL, mtime_ms DESC, rid DESC LIMIT 1",
            ArtifactType::Checkin.as_str(),
        )
    }
}

fn misuse(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Misuse)
        .with_op(op)
        .with_message(message)
}

fn not_found(rid: Rid) -> ExError {
    DeckError::ArtifactNotFound {
        reference: rid.to_string(),
    }
    .into()
}

impl Transactional for SqliteStore {
    fn depth(&self) -> &TransactionDepth {
        &self.depth
    }

    fn depth_mut(&mut self) -> &mut TransactionDepth {
        &mut self.depth
    }

    fn begin_physical(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(from_rusqlite)
    }

    fn commit_physical(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(from_rusqlite)
    }

    fn rollback_physical(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(from_rusqlite)
    }
}

impl PersistenceGateway for SqliteStore {
    fn resolve(&self, reference: &str) -> Result<Option<Rid>> {
        match parse_reference(reference) {
            ReferenceForm::Rid(rid) => Ok(self.blob_exists(rid)?.then_some(rid)),
            ReferenceForm::Tip => self.tip(),
            ReferenceForm::Hash(hash) => {
                self.single_rid("SELECT rid FROM blob WHERE uuid = ?1", hash)
            }
            ReferenceForm::Prefix(prefix) => self.resolve_prefix(prefix),
            ReferenceForm::Name(name) => {
                self.single_rid("SELECT rid FROM symbolic_name WHERE name = ?1", name)
            }
        }
    }

    fn get_content(&self, rid: Rid) -> Result<Vec<u8>> {
        self.conn
            .query_row("SELECT content FROM blob WHERE rid = ?1", [rid.0], |row| {
                row.get(0)
            })
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| not_found(rid))
    }

    fn hash_of(&self, rid: Rid) -> Result<String> {
        self.conn
            .query_row("SELECT uuid FROM blob WHERE rid = ?1", [rid.0], |row| {
                row.get(0)
            })
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| not_found(rid))
    }

    fn is_private(&self, rid: Rid) -> Result<bool> {
        if !self.blob_exists(rid)? {
            return Err(not_found(rid));
        }
        self.conn
            .query_row("SELECT 1 FROM private WHERE rid = ?1", [rid.0], |_| Ok(()))
            .optional()
            .map(|found| found.is_some())
            .map_err(from_rusqlite)
    }

    fn put_content(&mut self, content: &[u8], is_private: bool) -> Result<(Rid, String)> {
        self.require_transaction("put_content")?;
        let uuid = content_hash(content);

        let existing: Option<(i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT rid, content FROM blob WHERE uuid = ?1",
                [&uuid],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;
        if let Some((rid, stored)) = existing {
            if stored != content {
                return Err(content_collision(&uuid));
            }
            return Ok((Rid(rid), uuid));
        }

        self.conn
            .execute(
                "INSERT INTO blob (uuid, size, content) VALUES (?1, ?2, ?3)",
                params![uuid, content.len() as i64, content],
            )
            .map_err(from_rusqlite)?;
        let rid = Rid(self.conn.last_insert_rowid());
        if is_private {
            self.conn
                .execute("INSERT INTO private (rid) VALUES (?1)", [rid.0])
                .map_err(from_rusqlite)?;
        }
        tracing::debug!(rid = rid.0, uuid = uuid.as_str(), size = content.len(), "content stored");
        Ok((rid, uuid))
    }

    fn record_artifact(&mut self, record: &ArtifactRecord) -> Result<()> {
        self.require_transaction("record_artifact")?;
        if !self.blob_exists(record.rid)? {
            return Err(not_found(record.rid));
        }
        self.conn
            .execute(
                "INSERT OR REPLACE INTO artifact (rid, uuid, type, mtime_ms, user, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.rid.0,
                    record.uuid,
                    record.artifact_type.as_str(),
                    record.time.map(|t| t.unix_millis()),
                    record.user,
                    record.comment,
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn set_symbolic_name(&mut self, name: &str, rid: Option<Rid>) -> Result<()> {
        self.require_transaction("set_symbolic_name")?;
        match rid {
            Some(rid) => self.conn.execute(
                "INSERT OR REPLACE INTO symbolic_name (name, rid) VALUES (?1, ?2)",
                params![name, rid.0],
            ),
            None => self
                .conn
                .execute("DELETE FROM symbolic_name WHERE name = ?1", [name]),
        }
        .map_err(from_rusqlite)?;
        Ok(())
    }

    fn for_each_artifact(
        &self,
        filter: &ArtifactFilter,
        visitor: &mut dyn FnMut(&ArtifactRecord) -> RowFlow,
    ) -> Result<QueryStatus> {
        let mut sql =
            String::from("SELECT rid, uuid, type, mtime_ms, user, comment FROM artifact WHERE 1");
        let mut args: Vec<Value> = Vec::new();
        if let Some(t) = filter.artifact_type {
            args.push(Value::Text(t.as_str().to_string()));
            sql.push_str(&format!(" AND type = ?{}", args.len()));
        }
        if let Some(user) = &filter.user {
            args.push(Value::Text(user.clone()));
            sql.push_str(&format!(" AND user = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY mtime_ms IS NULL, mtime_ms DESC, rid DESC");
        if let Some(limit) = filter.limit {
            args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            sql.push_str(&format!(" LIMIT ?{}", args.len()));
        }

        let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
        let mut rows = stmt.query(params_from_iter(args.iter())).map_err(from_rusqlite)?;
        while let Some(row) = rows.next().map_err(from_rusqlite)? {
            let type_name: String = row.get(2).map_err(from_rusqlite)?;
            let artifact_type = ArtifactType::from_name(&type_name).ok_or_else(|| {
                ExError::new(ExErrorKind::Corrupt)
                    .with_op("for_each_artifact")
                    .with_message(format!("unknown artifact type {:?}", type_name))
            })?;
            let record = ArtifactRecord {
                rid: Rid(row.get(0).map_err(from_rusqlite)?),
                uuid: row.get(1).map_err(from_rusqlite)?,
                artifact_type,
                time: row
                    .get::<_, Option<i64>>(3)
                    .map_err(from_rusqlite)?
                    .map(Timestamp::from_unix_millis),
                user: row.get(4).map_err(from_rusqlite)?,
                comment: row.get(5).map_err(from_rusqlite)?,
            };
            match visitor(&record) {
                RowFlow::Continue => {}
                RowFlow::Stop => return Ok(QueryStatus::Stopped),
                RowFlow::Fail(err) => return Err(err),
            }
        }
        Ok(QueryStatus::Completed)
    }
}
