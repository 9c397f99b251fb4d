// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Relational backend: MySQL, SQLite and PostgreSQL through sqlx's Any driver.
//
// One table per persisted type, named after the type's stored name:
//
// ```text
// CREATE TABLE IF NOT EXISTS "Profile" (
//     "_id"    VARCHAR(255) PRIMARY KEY,
//     "points" BIGINT,
//     "ratio"  DOUBLE PRECISION,
//     "role"   TEXT,
//     "tags"   TEXT            -- JSON
// )
// ```
//
// Booleans are stored as 0/1 integers. Scalars that are not numbers (text,
// chars, enum names, big integers) are stored as text. Containers, nested
// objects and opaque values are stored as JSON text. Saving is a single
// dialect-specific upsert statement.
//
// The table is created on first use of each type per connection. Columns
// are never altered; a field added to a type after its table exists needs
// a manual `ALTER TABLE`.

use std::collections::HashSet;
use std::sync::{Mutex, Once, PoisonError, RwLock};

use sqlx::any::{Any, AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{AnyPool, Column, Row};
use strongbox_core::{
    Backend, IntWidth, Kind, Record, ScannedRecord, SchemaInfo, StorageError, Value,
};
use tracing::{debug, info, warn};

use crate::runtime::DriverRuntime;

/// Name of the identifier column in every table.
pub const ID_COLUMN: &str = "_id";

static INSTALL_DRIVERS: Once = Once::new();

/// The SQL flavour behind a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Sqlite,
    Postgres,
}

/// How a field is laid out in its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnClass {
    Bool,
    Int,
    Float,
    Text,
    Json,
}

impl ColumnClass {
    fn of(kind: &Kind) -> Self {
        match kind.unwrap_optional() {
            Kind::Bool => ColumnClass::Bool,
            // u64 does not fit BIGINT; kept as decimal text.
            Kind::Int(IntWidth::U64) => ColumnClass::Text,
            Kind::Int(_) => ColumnClass::Int,
            Kind::Float(_) => ColumnClass::Float,
            Kind::Char | Kind::Text | Kind::BigInt | Kind::Enum { .. } => ColumnClass::Text,
            Kind::Complex(_)
            | Kind::Optional(_)
            | Kind::Array(_)
            | Kind::List(_)
            | Kind::Set(_)
            | Kind::Map(_)
            | Kind::Opaque => ColumnClass::Json,
        }
    }
}

impl SqlDialect {
    /// Pick the dialect from a connection URL's scheme.
    pub fn from_url(url: &str) -> Result<Self, StorageError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            other => Err(StorageError::BackendUnavailable(format!(
                "unsupported SQL scheme '{other}'"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SqlDialect::MySql => "mysql",
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::Postgres => "postgres",
        }
    }

    /// Quote a validated identifier.
    pub fn quote(self, ident: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{ident}`"),
            SqlDialect::Sqlite | SqlDialect::Postgres => format!("\"{ident}\""),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${index}"),
            SqlDialect::MySql | SqlDialect::Sqlite => "?".to_string(),
        }
    }

    fn column_type(self, class: ColumnClass) -> &'static str {
        match (self, class) {
            (SqlDialect::Sqlite, ColumnClass::Bool | ColumnClass::Int) => "INTEGER",
            (SqlDialect::Sqlite, ColumnClass::Float) => "REAL",
            (SqlDialect::Sqlite, ColumnClass::Text | ColumnClass::Json) => "TEXT",
            (SqlDialect::MySql, ColumnClass::Bool | ColumnClass::Int) => "BIGINT",
            (SqlDialect::MySql, ColumnClass::Float) => "DOUBLE",
            (SqlDialect::MySql, ColumnClass::Text | ColumnClass::Json) => "LONGTEXT",
            (SqlDialect::Postgres, ColumnClass::Bool | ColumnClass::Int) => "BIGINT",
            (SqlDialect::Postgres, ColumnClass::Float) => "DOUBLE PRECISION",
            (SqlDialect::Postgres, ColumnClass::Text | ColumnClass::Json) => "TEXT",
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` for `schema`.
    pub fn create_table_sql(self, schema: &SchemaInfo) -> Result<String, StorageError> {
        let mut columns = vec![format!(
            "{} VARCHAR(255) PRIMARY KEY",
            self.quote(ID_COLUMN)
        )];
        for column in columns_of(schema)? {
            columns.push(format!(
                "{} {}",
                self.quote(column.name),
                self.column_type(column.class)
            ));
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quote(table_name(schema)?),
            columns.join(", ")
        ))
    }

    /// Insert-or-replace keyed on the identifier column. Parameters are the
    /// identifier followed by each column in schema order.
    pub fn upsert_sql(self, schema: &SchemaInfo) -> Result<String, StorageError> {
        let table = self.quote(table_name(schema)?);
        let columns = columns_of(schema)?;

        let mut names = vec![self.quote(ID_COLUMN)];
        names.extend(columns.iter().map(|c| self.quote(c.name)));
        let placeholders: Vec<String> = (1..=names.len()).map(|i| self.placeholder(i)).collect();

        let insert = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );

        let update = match self {
            SqlDialect::MySql => {
                let sets: Vec<String> = if columns.is_empty() {
                    vec![format!("{0} = {0}", self.quote(ID_COLUMN))]
                } else {
                    columns
                        .iter()
                        .map(|c| {
                            let name = self.quote(c.name);
                            format!("{name} = VALUES({name})")
                        })
                        .collect()
                };
                format!(" ON DUPLICATE KEY UPDATE {}", sets.join(", "))
            }
            SqlDialect::Sqlite | SqlDialect::Postgres => {
                let conflict = self.quote(ID_COLUMN);
                if columns.is_empty() {
                    format!(" ON CONFLICT ({conflict}) DO NOTHING")
                } else {
                    let sets: Vec<String> = columns
                        .iter()
                        .map(|c| {
                            let name = self.quote(c.name);
                            format!("{name} = excluded.{name}")
                        })
                        .collect();
                    format!(" ON CONFLICT ({conflict}) DO UPDATE SET {}", sets.join(", "))
                }
            }
        };

        Ok(insert + &update)
    }

    fn select_one_sql(self, schema: &SchemaInfo) -> Result<String, StorageError> {
        Ok(format!(
            "SELECT * FROM {} WHERE {} = {}",
            self.quote(table_name(schema)?),
            self.quote(ID_COLUMN),
            self.placeholder(1)
        ))
    }

    fn select_all_sql(self, schema: &SchemaInfo) -> Result<String, StorageError> {
        Ok(format!("SELECT * FROM {}", self.quote(table_name(schema)?)))
    }

    fn select_ids_sql(self, schema: &SchemaInfo) -> Result<String, StorageError> {
        Ok(format!(
            "SELECT {} FROM {}",
            self.quote(ID_COLUMN),
            self.quote(table_name(schema)?)
        ))
    }

    fn delete_sql(self, schema: &SchemaInfo) -> Result<String, StorageError> {
        Ok(format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quote(table_name(schema)?),
            self.quote(ID_COLUMN),
            self.placeholder(1)
        ))
    }
}

struct ColumnPlan<'a> {
    name: &'static str,
    class: ColumnClass,
    kind: &'a Kind,
}

fn check_ident(owner: &'static str, ident: &str) -> Result<(), StorageError> {
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidSchema {
            type_name: owner,
            reason: format!("'{ident}' cannot be used as a SQL identifier"),
        })
    }
}

fn table_name(schema: &SchemaInfo) -> Result<&'static str, StorageError> {
    check_ident(schema.name, schema.name)?;
    Ok(schema.name)
}

/// Non-identifier persisted fields, in schema order.
fn columns_of(schema: &SchemaInfo) -> Result<Vec<ColumnPlan<'_>>, StorageError> {
    let mut columns = Vec::new();
    for field in schema.persisted_fields().filter(|f| !f.identifier) {
        let name = field.stored_name();
        check_ident(schema.name, name)?;
        if name == ID_COLUMN {
            return Err(StorageError::InvalidSchema {
                type_name: schema.name,
                reason: format!("'{ID_COLUMN}' is reserved for the identifier column"),
            });
        }
        columns.push(ColumnPlan {
            name,
            class: ColumnClass::of(&field.kind),
            kind: &field.kind,
        });
    }
    Ok(columns)
}

/// One bound parameter. Nulls carry their column class so PostgreSQL sees
/// a typed NULL.
#[derive(Debug, Clone, PartialEq)]
enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
    Null(ColumnClass),
}

fn to_param(
    dialect: SqlDialect,
    schema: &SchemaInfo,
    column: &ColumnPlan<'_>,
    value: Option<&Value>,
) -> Result<SqlParam, StorageError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(SqlParam::Null(column.class)),
        Some(value) => value,
    };

    let mismatch = || {
        StorageError::SerializationError(format!(
            "{}.{}: cannot store {} in a {} column",
            schema.name,
            column.name,
            value.type_name(),
            column.kind.describe()
        ))
    };

    match (column.class, value) {
        (ColumnClass::Bool, Value::Bool(b)) => Ok(SqlParam::Int(i64::from(*b))),
        (ColumnClass::Int, Value::Int(i)) => Ok(SqlParam::Int(*i)),
        // MySQL has no infinity or NaN, and SQLite reads NaN back as NULL.
        (ColumnClass::Float, Value::Float(f))
            if (dialect == SqlDialect::MySql && !f.is_finite())
                || (dialect == SqlDialect::Sqlite && f.is_nan()) =>
        {
            Err(StorageError::SerializationError(format!(
                "{}.{}: {} cannot store {f}",
                schema.name,
                column.name,
                dialect.name()
            )))
        }
        (ColumnClass::Float, Value::Float(f)) => Ok(SqlParam::Float(*f)),
        (ColumnClass::Float, Value::Int(i)) => Ok(SqlParam::Float(*i as f64)),
        (ColumnClass::Text, Value::Text(s)) => Ok(SqlParam::Text(s.clone())),
        (ColumnClass::Text, Value::Int(i)) => Ok(SqlParam::Text(i.to_string())),
        (ColumnClass::Json, value) => serde_json::to_string(value)
            .map(SqlParam::Text)
            .map_err(|e| StorageError::SerializationError(e.to_string())),
        _ => Err(mismatch()),
    }
}

fn bind_param<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    param: SqlParam,
) -> Query<'q, Any, AnyArguments<'q>> {
    match param {
        SqlParam::Int(v) => query.bind(v),
        SqlParam::Float(v) => query.bind(v),
        SqlParam::Text(v) => query.bind(v),
        SqlParam::Null(ColumnClass::Bool | ColumnClass::Int) => query.bind(Option::<i64>::None),
        SqlParam::Null(ColumnClass::Float) => query.bind(Option::<f64>::None),
        SqlParam::Null(ColumnClass::Text | ColumnClass::Json) => {
            query.bind(Option::<String>::None)
        }
    }
}

fn driver_err(err: sqlx::Error) -> StorageError {
    StorageError::Driver(err.to_string())
}

fn text_column(row: &AnyRow, name: &str) -> Result<Option<String>, StorageError> {
    match row.try_get::<Option<String>, _>(name) {
        Ok(text) => Ok(text),
        // MySQL reports TEXT columns as blobs through the Any driver.
        Err(_) => {
            let bytes: Option<Vec<u8>> = row.try_get(name).map_err(driver_err)?;
            bytes
                .map(|b| {
                    String::from_utf8(b).map_err(|e| StorageError::CorruptedData(e.to_string()))
                })
                .transpose()
        }
    }
}

fn decode_column(
    row: &AnyRow,
    column: &ColumnPlan<'_>,
) -> Result<Value, StorageError> {
    let value = match column.class {
        ColumnClass::Bool => row
            .try_get::<Option<i64>, _>(column.name)
            .map_err(driver_err)?
            .map(|v| Value::Bool(v != 0)),
        ColumnClass::Int => row
            .try_get::<Option<i64>, _>(column.name)
            .map_err(driver_err)?
            .map(Value::Int),
        ColumnClass::Float => row
            .try_get::<Option<f64>, _>(column.name)
            .map_err(driver_err)?
            .map(Value::Float),
        ColumnClass::Text => text_column(row, column.name)?.map(Value::Text),
        ColumnClass::Json => text_column(row, column.name)?
            .map(|text| {
                serde_json::from_str::<Value>(&text).map_err(|e| {
                    StorageError::CorruptedData(format!("column '{}': {e}", column.name))
                })
            })
            .transpose()?,
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Rebuild a record from a row. Columns missing from the table are left
/// out, so their fields fall back to defaults.
fn decode_row(schema: &SchemaInfo, row: &AnyRow) -> Result<Record, StorageError> {
    let present: HashSet<&str> = row.columns().iter().map(|c| c.name()).collect();
    let mut record = Record::new();
    for column in columns_of(schema)? {
        if !present.contains(column.name) {
            continue;
        }
        let value = decode_column(row, &column)?;
        record.insert(column.name.to_string(), value);
    }
    Ok(record)
}

/// A relational backend over a sqlx connection pool.
pub struct SqlBackend {
    url: String,
    dialect: SqlDialect,
    max_connections: u32,
    pool: RwLock<Option<AnyPool>>,
    ensured: Mutex<HashSet<&'static str>>,
    runtime: DriverRuntime,
}

impl SqlBackend {
    /// Prepare a backend for `url`. No connection is made until
    /// [`Backend::connect`].
    pub fn new(url: impl Into<String>, max_connections: u32) -> Result<Self, StorageError> {
        let url = url.into();
        let dialect = SqlDialect::from_url(&url)?;
        let runtime = DriverRuntime::new(dialect.name())?;
        Ok(Self {
            url,
            dialect,
            max_connections: max_connections.max(1),
            pool: RwLock::new(None),
            ensured: Mutex::new(HashSet::new()),
            runtime,
        })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn pool(&self) -> Result<AnyPool, StorageError> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| StorageError::NotConnected(self.dialect.name().to_string()))
    }

    fn ensure_table(&self, pool: &AnyPool, schema: &SchemaInfo) -> Result<(), StorageError> {
        if self
            .ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(schema.name)
        {
            return Ok(());
        }

        let ddl = self.dialect.create_table_sql(schema)?;
        debug!(dialect = self.dialect.name(), table = schema.name, "ensuring table");
        self.runtime
            .block_on(sqlx::query(&ddl).execute(pool))?
            .map_err(driver_err)?;

        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(schema.name);
        Ok(())
    }

    fn prepared(&self, schema: &SchemaInfo) -> Result<AnyPool, StorageError> {
        let pool = self.pool()?;
        self.ensure_table(&pool, schema)?;
        Ok(pool)
    }
}

impl std::fmt::Debug for SqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlBackend")
            .field("dialect", &self.dialect)
            .field("max_connections", &self.max_connections)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Backend for SqlBackend {
    fn name(&self) -> &str {
        self.dialect.name()
    }

    fn requires_connection(&self) -> bool {
        true
    }

    fn connect(&self) -> Result<(), StorageError> {
        if self.is_connected() {
            return Ok(());
        }
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let pool = self
            .runtime
            .block_on(
                AnyPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url),
            )?
            .map_err(driver_err)?;

        info!(dialect = self.dialect.name(), "connected");
        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = Some(pool);
        Ok(())
    }

    fn close_connection(&self) -> Result<(), StorageError> {
        let pool = self
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        if let Some(pool) = pool {
            self.runtime.block_on(pool.close())?;
            info!(dialect = self.dialect.name(), "connection closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|pool| !pool.is_closed())
    }

    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError> {
        let pool = self.prepared(schema)?;
        let sql = self.dialect.select_one_sql(schema)?;
        let row = self
            .runtime
            .block_on(sqlx::query(&sql).bind(id).fetch_optional(&pool))?
            .map_err(driver_err)?;
        row.map(|row| decode_row(schema, &row)).transpose()
    }

    fn write_raw(
        &self,
        schema: &SchemaInfo,
        id: &str,
        record: &Record,
    ) -> Result<(), StorageError> {
        let params = columns_of(schema)?
            .iter()
            .map(|column| to_param(self.dialect, schema, column, record.get(column.name)))
            .collect::<Result<Vec<_>, _>>()?;

        let pool = self.prepared(schema)?;
        let sql = self.dialect.upsert_sql(schema)?;
        let query = params
            .into_iter()
            .fold(sqlx::query(&sql).bind(id), bind_param);
        self.runtime
            .block_on(query.execute(&pool))?
            .map_err(driver_err)?;
        Ok(())
    }

    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError> {
        let pool = self.prepared(schema)?;
        let sql = self.dialect.delete_sql(schema)?;
        let result = self
            .runtime
            .block_on(sqlx::query(&sql).bind(id).execute(&pool))?
            .map_err(driver_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError> {
        let pool = self.prepared(schema)?;
        let sql = self.dialect.select_ids_sql(schema)?;
        let rows = self
            .runtime
            .block_on(sqlx::query(&sql).fetch_all(&pool))?
            .map_err(driver_err)?;
        rows.iter()
            .map(|row| text_column(row, ID_COLUMN).map(Option::unwrap_or_default))
            .collect()
    }

    fn read_all(&self, schema: &SchemaInfo) -> Result<Vec<ScannedRecord>, StorageError> {
        let pool = self.prepared(schema)?;
        let sql = self.dialect.select_all_sql(schema)?;
        let rows = self
            .runtime
            .block_on(sqlx::query(&sql).fetch_all(&pool))?
            .map_err(driver_err)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = match text_column(row, ID_COLUMN) {
                Ok(Some(id)) => id,
                Ok(None) => continue,
                Err(err) => {
                    warn!(table = schema.name, error = %err, "skipping row without a readable identifier");
                    continue;
                }
            };
            entries.push((id, decode_row(schema, row)));
        }
        Ok(entries)
    }
}

impl Drop for SqlBackend {
    fn drop(&mut self) {
        let _guard = self.runtime.enter();
        self.pool
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
