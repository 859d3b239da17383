//! SQLite-backed member store.
//!
//! # Responsibility
//! - Implement `Store<E>` generically over the table layouts in `mapping`.
//! - Implement the member-specific lookups and cleanup steps.
//!
//! # Invariants
//! - One connection, serialized by a mutex; every save runs in a transaction.
//! - Auto-keyed rows are inserted when new and updated in place otherwise;
//!   saving an unknown auto key is `NotFound`, never an insert.
//! - Member-keyed rows are upserted; every non-key column is replaced.

use crate::db::{open_db, open_db_in_memory};
use crate::store::{SelectQuery, Store, StoreError, StoreResult};
use log::error;
use mapping::{select_list, SqlRecord};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

mod mapping;
mod queries;

/// Member store over one SQLite connection.
pub struct SqliteMemberStore {
    conn: Mutex<Connection>,
}

impl SqliteMemberStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens and migrates a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens and migrates a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            error!("event=store_lock module=store status=error reason=poisoned");
            StoreError::Unavailable("connection lock poisoned".to_string())
        })
    }
}

impl<E: SqlRecord> Store<E> for SqliteMemberStore {
    fn get(&self, key: E::Key) -> StoreResult<Option<E>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            select_list::<E>(),
            E::TABLE,
            E::KEY_COLUMN
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([E::key_to_sql(key)])?;
        match rows.next()? {
            Some(row) => Ok(Some(E::from_row(row)?)),
            None => Ok(None),
        }
    }

    fn save(&self, entity: &mut E) -> StoreResult<E::Key> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        entity.before_save(&tx)?;

        if E::AUTO_KEY && entity.is_new() {
            let placeholders = vec!["?"; E::COLUMNS.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                E::TABLE,
                E::COLUMNS.join(", ")
            );
            tx.execute(&sql, params_from_iter(entity.values()))?;
            let key = E::key_from_sql(tx.last_insert_rowid())?;
            entity.assign_key(key);
        } else if E::AUTO_KEY {
            // Store-assigned keys are never invented by callers: update only.
            let assignments = E::COLUMNS
                .iter()
                .map(|column| format!("{column} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {assignments} WHERE {} = ?;",
                E::TABLE,
                E::KEY_COLUMN
            );
            let mut values = entity.values();
            values.push(Value::Integer(E::key_to_sql(entity.key())));
            if tx.execute(&sql, params_from_iter(values))? == 0 {
                return Err(StoreError::NotFound(format!("{} {}", E::KIND, entity.key())));
            }
        } else {
            let placeholders = vec!["?"; E::COLUMNS.len() + 1].join(", ");
            let updates = E::COLUMNS
                .iter()
                .map(|column| format!("{column} = excluded.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO {table} ({select}) VALUES ({placeholders})
                 ON CONFLICT({key}) DO UPDATE SET {updates};",
                table = E::TABLE,
                select = select_list::<E>(),
                key = E::KEY_COLUMN,
            );
            let mut values = Vec::with_capacity(E::COLUMNS.len() + 1);
            values.push(Value::Integer(E::key_to_sql(entity.key())));
            values.extend(entity.values());
            tx.execute(&sql, params_from_iter(values))?;
        }

        tx.commit()?;
        Ok(entity.key())
    }

    fn delete(&self, key: E::Key) -> StoreResult<usize> {
        let conn = self.conn()?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1;", E::TABLE, E::KEY_COLUMN);
        Ok(conn.execute(&sql, [E::key_to_sql(key)])?)
    }

    fn select(&self, query: &SelectQuery) -> StoreResult<Vec<E>> {
        let mut sql = format!("SELECT {} FROM {} WHERE 1 = 1", select_list::<E>(), E::TABLE);
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(member_id) = query.member_id {
            let owner = E::OWNER_COLUMN.ok_or_else(|| {
                StoreError::InvalidData(format!("{} rows are not owned by a member", E::KIND))
            })?;
            sql.push_str(&format!(" AND {owner} = ?"));
            bind_values.push(Value::Integer(member_id));
        }

        sql.push_str(&format!(" ORDER BY {} ASC", E::KEY_COLUMN));

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(E::from_row(row)?);
        }
        Ok(records)
    }
}

/// Reads one optional scalar.
fn query_scalar<T: rusqlite::types::FromSql>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StoreResult<Option<T>> {
    Ok(conn.query_row(sql, params, |row| row.get::<_, T>(0)).optional()?)
}
