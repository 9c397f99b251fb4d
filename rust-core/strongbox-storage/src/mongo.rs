// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MongoDB document backend.
//
// One collection per persisted type, named after the type's stored name.
// Each object is one document whose `_id` is the identifier; the remaining
// keys are the record, with nested objects as embedded documents and
// containers as arrays. Saving is `replace_one` with upsert.

use std::sync::{PoisonError, RwLock};

use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};
use strongbox_core::{Backend, Record, ScannedRecord, SchemaInfo, StorageError, Value};
use tracing::{debug, info, warn};

use crate::runtime::DriverRuntime;

const ID_KEY: &str = "_id";

fn driver_err(err: mongodb::error::Error) -> StorageError {
    StorageError::Driver(err.to_string())
}

/// Convert a neutral value to BSON.
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::Text(s) => Bson::String(s.clone()),
        Value::List(items) => Bson::Array(items.iter().map(to_bson).collect()),
        Value::Map(map) => Bson::Document(to_document(map)),
    }
}

fn to_document(record: &Record) -> Document {
    record
        .iter()
        .map(|(key, value)| (key.clone(), to_bson(value)))
        .collect()
}

/// Convert BSON back to a neutral value.
///
/// Types the marshaler never writes (object ids, dates, decimals, binary)
/// come back in their relaxed extended-JSON form.
pub fn from_bson(bson: Bson) -> Value {
    convert_bson("value", bson)
}

fn convert_bson(key: &str, bson: Bson) -> Value {
    match bson {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::Int(i64::from(i)),
        Bson::Int64(i) => Value::Int(i),
        Bson::Double(f) => Value::Float(f),
        Bson::String(s) => Value::Text(s),
        Bson::Array(items) => Value::List(
            items
                .into_iter()
                .map(|item| convert_bson(key, item))
                .collect(),
        ),
        Bson::Document(doc) => Value::Map(from_document(doc)),
        Bson::ObjectId(oid) => Value::Text(oid.to_hex()),
        other => match serde_json::from_value(other.into_relaxed_extjson()) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "unconvertible BSON value read as null");
                Value::Null
            }
        },
    }
}

fn from_document(doc: Document) -> Record {
    doc.into_iter()
        .map(|(key, value)| {
            let value = convert_bson(&key, value);
            (key, value)
        })
        .collect()
}

fn id_of(doc: &Document) -> Option<String> {
    match doc.get(ID_KEY)? {
        Bson::String(s) => Some(s.clone()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::Int32(i) => Some(i.to_string()),
        Bson::Int64(i) => Some(i.to_string()),
        _ => None,
    }
}

/// The stored document minus its `_id`.
fn into_record(mut doc: Document) -> Record {
    doc.remove(ID_KEY);
    from_document(doc)
}

/// A MongoDB backend over one database.
pub struct MongoBackend {
    uri: String,
    database: String,
    client: RwLock<Option<Client>>,
    runtime: DriverRuntime,
}

impl MongoBackend {
    /// Prepare a backend for `uri` and `database`. No connection is made
    /// until [`Backend::connect`].
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Result<Self, StorageError> {
        Ok(Self {
            uri: uri.into(),
            database: database.into(),
            client: RwLock::new(None),
            runtime: DriverRuntime::new("mongo")?,
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self, schema: &SchemaInfo) -> Result<Collection<Document>, StorageError> {
        let client = self
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| StorageError::NotConnected(self.name().to_string()))?;
        Ok(client.database(&self.database).collection(schema.name))
    }
}

impl std::fmt::Debug for MongoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoBackend")
            .field("database", &self.database)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Backend for MongoBackend {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn requires_connection(&self) -> bool {
        true
    }

    fn connect(&self) -> Result<(), StorageError> {
        if self.is_connected() {
            return Ok(());
        }

        let database = self.database.clone();
        let client = self.runtime.block_on(async {
            let client = Client::with_uri_str(&self.uri).await?;
            client
                .database(&database)
                .run_command(doc! { "ping": 1 })
                .await?;
            Ok::<_, mongodb::error::Error>(client)
        })?;
        let client = client.map_err(driver_err)?;

        info!(database = %self.database, "connected to MongoDB");
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Some(client);
        Ok(())
    }

    fn close_connection(&self) -> Result<(), StorageError> {
        let client = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(client) = client {
            self.runtime.block_on(client.shutdown())?;
            info!(database = %self.database, "MongoDB connection closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError> {
        let collection = self.collection(schema)?;
        let found = self
            .runtime
            .block_on(collection.find_one(doc! { ID_KEY: id }))?
            .map_err(driver_err)?;
        Ok(found.map(into_record))
    }

    fn write_raw(
        &self,
        schema: &SchemaInfo,
        id: &str,
        record: &Record,
    ) -> Result<(), StorageError> {
        if record.contains_key(ID_KEY) {
            return Err(StorageError::InvalidSchema {
                type_name: schema.name,
                reason: format!("'{ID_KEY}' is reserved for the identifier"),
            });
        }
        let collection = self.collection(schema)?;
        let mut document = to_document(record);
        document.insert(ID_KEY, id);

        let result = self
            .runtime
            .block_on(
                collection
                    .replace_one(doc! { ID_KEY: id }, document)
                    .upsert(true),
            )?
            .map_err(driver_err)?;
        debug!(
            collection = schema.name,
            id,
            matched = result.matched_count,
            "replaced document"
        );
        Ok(())
    }

    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError> {
        let collection = self.collection(schema)?;
        let result = self
            .runtime
            .block_on(collection.delete_one(doc! { ID_KEY: id }))?
            .map_err(driver_err)?;
        Ok(result.deleted_count > 0)
    }

    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError> {
        let collection = self.collection(schema)?;
        let documents: Vec<Document> = self
            .runtime
            .block_on(async {
                collection
                    .find(doc! {})
                    .projection(doc! { ID_KEY: 1 })
                    .await?
                    .try_collect()
                    .await
            })?
            .map_err(driver_err)?;
        Ok(documents.iter().filter_map(id_of).collect())
    }

    fn read_all(&self, schema: &SchemaInfo) -> Result<Vec<ScannedRecord>, StorageError> {
        let collection = self.collection(schema)?;
        let documents: Vec<Document> = self
            .runtime
            .block_on(async { collection.find(doc! {}).await?.try_collect().await })?
            .map_err(driver_err)?;

        let mut entries = Vec::with_capacity(documents.len());
        for document in documents {
            match id_of(&document) {
                Some(id) => entries.push((id, Ok(into_record(document)))),
                None => warn!(collection = schema.name, "skipping document with an unusable _id"),
            }
        }
        Ok(entries)
    }
}

impl Drop for MongoBackend {
    fn drop(&mut self) {
        let _guard = self.runtime.enter();
        self.client
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
