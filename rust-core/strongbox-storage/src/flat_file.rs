// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flat-file backend: one document per object.
//
// Layout is `<root>/<TypeName>/<identifier>.<ext>`. The identifier is the
// file stem and never appears inside the document. Writes go to a temporary
// file in the same folder and are renamed over the target, so readers never
// see a half-written document. There is no cross-process locking; the last
// writer wins.
//
// The serialization format is a `Codec`; JSON and YAML share everything
// else.

use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use strongbox_core::{Backend, Record, SchemaInfo, StorageError};
use tracing::debug;

/// A document format for [`FlatFileBackend`].
pub trait Codec: Send + Sync + 'static {
    /// Backend name, used in logs and errors.
    const NAME: &'static str;
    /// File extension, without the dot.
    const EXTENSION: &'static str;

    fn encode(record: &Record) -> Result<Vec<u8>, StorageError>;

    fn decode(bytes: &[u8]) -> Result<Record, StorageError>;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reject names that would escape or alias a folder.
///
/// Only whole components are refused: `x..y` is an ordinary file name once
/// separators are ruled out, while `.` and `..` fall under the leading-dot
/// rule, which also keeps ids clear of the hidden temp files.
pub fn validate_path_component(id: &str) -> Result<(), StorageError> {
    let reason = if id.is_empty() {
        Some("empty")
    } else if id.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if id == "." || id == ".." {
        Some("is a relative path component")
    } else if id.starts_with('.') {
        Some("starts with '.'")
    } else if id.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StorageError::InvalidIdentifier {
            id: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Per-object documents under a root folder.
pub struct FlatFileBackend<C: Codec> {
    root: PathBuf,
    codec: PhantomData<fn() -> C>,
}

impl<C: Codec> FlatFileBackend<C> {
    /// Store documents under `root`. Nothing is created until the first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(backend = C::NAME, root = %root.display(), "opened flat-file backend");
        Self {
            root,
            codec: PhantomData,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn type_dir(&self, schema: &SchemaInfo) -> Result<PathBuf, StorageError> {
        validate_path_component(schema.name)?;
        Ok(self.root.join(schema.name))
    }

    fn file_name(id: &str) -> String {
        format!("{id}.{}", C::EXTENSION)
    }

    /// Path of the document stored for `id`.
    pub fn document_path(&self, schema: &SchemaInfo, id: &str) -> Result<PathBuf, StorageError> {
        validate_path_component(id)?;
        Ok(self.type_dir(schema)?.join(Self::file_name(id)))
    }
}

impl<C: Codec> std::fmt::Debug for FlatFileBackend<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatFileBackend")
            .field("format", &C::NAME)
            .field("root", &self.root)
            .finish()
    }
}

impl<C: Codec> Backend for FlatFileBackend<C> {
    fn name(&self) -> &str {
        C::NAME
    }

    fn read_raw(&self, schema: &SchemaInfo, id: &str) -> Result<Option<Record>, StorageError> {
        let path = self.document_path(schema, id)?;
        match fs::read(&path) {
            Ok(bytes) => C::decode(&bytes).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_raw(
        &self,
        schema: &SchemaInfo,
        id: &str,
        record: &Record,
    ) -> Result<(), StorageError> {
        let path = self.document_path(schema, id)?;
        let dir = self.type_dir(schema)?;
        fs::create_dir_all(&dir)?;

        let bytes = C::encode(record)?;
        let temp = dir.join(format!(
            ".{}.{}.{}.tmp",
            id,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(err) = fs::write(&temp, &bytes).and_then(|()| fs::rename(&temp, &path)) {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        Ok(())
    }

    fn delete_raw(&self, schema: &SchemaInfo, id: &str) -> Result<bool, StorageError> {
        let path = self.document_path(schema, id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list_ids(&self, schema: &SchemaInfo) -> Result<Vec<String>, StorageError> {
        let dir = self.type_dir(schema)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(C::EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if !stem.starts_with('.') {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }
}
