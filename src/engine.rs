//! Persistence engine: one connection, query helpers, explicit transactions.
//!
//! One engine instance owns exactly one connection and executes statements
//! strictly in call order; there is no pooling, batching or multiplexing.
//! A single instance is one logical unit of work, typically scoped to one
//! request.

use crate::config::EngineConfig;
use crate::entity::{Entity, PersistenceState};
use crate::hydrate::{self, RawRow};
use crate::schema::Schema;
use crate::sql::{self, Statement};
use crate::value::Value;
use crate::{Error, Result};
use rusqlite::types::Value as RawValue;
use rusqlite::{Connection, params_from_iter};

/// Synchronous persistence engine over one SQLite connection.
pub struct Engine {
    conn: Connection,
    in_transaction: bool,
}

impl Engine {
    /// Open a connection from an explicit configuration
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let conn = match &config.database {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            in_transaction: false,
        })
    }

    /// Run a query and hydrate every returned row.
    ///
    /// `limit`/`offset` are appended as a `LIMIT n [OFFSET m]` suffix. The
    /// schema is consulted once for the whole call; a hydration failure on
    /// any row fails the whole query.
    pub fn query(
        &self,
        sql: &str,
        schema: &Schema,
        params: &[Value],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Entity>> {
        let sql = with_limit(sql, limit, offset);
        tracing::debug!(table = schema.table(), sql = %sql, "query");

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let raw = raw_row(&columns, row)?;
            entities.push(hydrate::hydrate(schema, &raw)?);
        }
        Ok(entities)
    }

    /// Run a query expected to match at most one row; absence is `None`,
    /// not an error
    pub fn query_one(&self, sql: &str, schema: &Schema, params: &[Value]) -> Result<Option<Entity>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        match rows.next()? {
            Some(row) => {
                let raw = raw_row(&columns, row)?;
                Ok(Some(hydrate::hydrate(schema, &raw)?))
            }
            None => Ok(None),
        }
    }

    /// Run a count/aggregate query returning a single integer; an empty
    /// result set reads as 0
    pub fn scalar_int(&self, sql: &str, params: &[Value]) -> Result<i64> {
        match self
            .conn
            .query_row(sql, params_from_iter(params.iter()), |row| row.get(0))
        {
            Ok(n) => Ok(n),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist an entity: INSERT while `New`, UPDATE once `Loaded`.
    ///
    /// The persistence state flips to `Loaded` only after a successful
    /// INSERT, never speculatively.
    pub fn save(&self, entity: &mut Entity, schema: &Schema) -> Result<()> {
        match entity.state() {
            PersistenceState::New => {
                let stmt = sql::insert(schema, entity);
                tracing::debug!(table = schema.table(), "insert");
                self.execute_statement(&stmt)?;
                entity.mark_loaded();
            }
            PersistenceState::Loaded => {
                let stmt = sql::update(schema, entity);
                tracing::debug!(table = schema.table(), "update");
                self.execute_statement(&stmt)?;
            }
        }
        Ok(())
    }

    /// Raw parameterized delete; no hydration involved. Returns the number
    /// of affected rows.
    pub fn delete(&self, table: &str, where_clause: &str, params: &[Value]) -> Result<usize> {
        let sql = format!("DELETE FROM {} WHERE {}", table, where_clause);
        self.execute(&sql, params)
    }

    /// Execute an arbitrary parameterized statement
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        self.conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(Into::into)
    }

    /// Open a transaction. Nesting is not supported.
    pub fn begin_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::Transaction(
                "transaction already open; nesting is not supported".to_string(),
            ));
        }
        self.conn.execute_batch("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::Transaction("no open transaction to commit".to_string()));
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::Transaction(
                "no open transaction to roll back".to_string(),
            ));
        }
        self.conn.execute_batch("ROLLBACK")?;
        self.in_transaction = false;
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn execute_statement(&self, stmt: &Statement) -> Result<usize> {
        self.conn
            .execute(&stmt.sql, params_from_iter(stmt.params.iter()))
            .map_err(Into::into)
    }
}

fn with_limit(sql: &str, limit: Option<u32>, offset: Option<u32>) -> String {
    let mut sql = sql.to_string();
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }
    sql
}

/// Collect one result row into a name-to-raw-value map. Columns the query
/// did not return are simply absent, which the hydrator treats the same as
/// SQL NULL.
fn raw_row(columns: &[String], row: &rusqlite::Row<'_>) -> Result<RawRow> {
    let mut raw = RawRow::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        raw.insert(name.clone(), row.get::<_, RawValue>(i)?);
    }
    Ok(raw)
}
