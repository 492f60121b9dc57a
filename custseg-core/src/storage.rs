//! Local object storage adapter.
//!
//! Maps an object-store style `(bucket, key)` namespace onto a directory
//! tree: `<root>/<bucket>/<key>`. Writes create intermediate directories and
//! replace objects by atomic rename; every failure comes back as a
//! [`SegmentError`] tagged [`Stage::Storage`].

use crate::data::Table;
use crate::error::{Result, SegmentError, Stage};
use crate::persistence;
use serde::de::DeserializeOwned;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Content of an object read through [`ObjectStorage::read_object`].
#[derive(Debug)]
pub enum ObjectContent {
    Bytes(Vec<u8>),
    Text(String),
    /// Re-readable in-memory reader over raw bytes.
    ByteStream(Cursor<Vec<u8>>),
    /// Re-readable in-memory reader over decoded text.
    TextStream(Cursor<String>),
}

impl ObjectContent {
    /// Drain the content into a string, rewinding streams first.
    pub fn into_text(self) -> Result<String> {
        let bytes = match self {
            Self::Text(s) => return Ok(s),
            Self::TextStream(c) => return Ok(c.into_inner()),
            Self::Bytes(b) => b,
            Self::ByteStream(mut c) => {
                c.set_position(0);
                let mut buf = Vec::new();
                c.read_to_end(&mut buf)
                    .map_err(|e| SegmentError::io(Stage::Storage, "reading object stream", e))?;
                buf
            }
        };
        String::from_utf8(bytes)
            .map_err(|e| SegmentError::serialization(Stage::Storage, "decoding object as UTF-8", e))
    }
}

/// Filesystem stand-in for a remote object store.
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    root: PathBuf,
}

impl ObjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "Using local object storage");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Concrete path of `key` inside `bucket`.
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    /// True iff the mapped path exists.
    pub fn key_path_available(&self, bucket: &str, key: &str) -> bool {
        self.object_path(bucket, key).exists()
    }

    /// Read an object by path.
    ///
    /// `decode` converts the bytes to UTF-8 text; `make_readable` wraps the
    /// result in an in-memory cursor.
    pub fn read_object(path: &Path, decode: bool, make_readable: bool) -> Result<ObjectContent> {
        debug!(path = %path.display(), decode, make_readable, "Reading object");
        let bytes = std::fs::read(path).map_err(|e| SegmentError::from_io(Stage::Storage, path, e))?;
        if !decode {
            return Ok(if make_readable {
                ObjectContent::ByteStream(Cursor::new(bytes))
            } else {
                ObjectContent::Bytes(bytes)
            });
        }
        let text = String::from_utf8(bytes).map_err(|e| {
            SegmentError::serialization(
                Stage::Storage,
                format!("decoding {} as UTF-8", path.display()),
                e,
            )
        })?;
        Ok(if make_readable {
            ObjectContent::TextStream(Cursor::new(text))
        } else {
            ObjectContent::Text(text)
        })
    }

    /// Resolve an object to its local path; NotFound if absent.
    pub fn get_file_object(&self, filename: &str, bucket: &str) -> Result<PathBuf> {
        let path = self.object_path(bucket, filename);
        if path.exists() {
            Ok(path)
        } else {
            Err(SegmentError::not_found(
                Stage::Storage,
                format!("{filename} in bucket {bucket} ({})", path.display()),
            ))
        }
    }

    /// Deserialize a persisted JSON model.
    pub fn load_model<T: DeserializeOwned>(&self, model_name: &str, bucket: &str) -> Result<T> {
        info!(model_name, bucket, "Loading model from local storage");
        let path = self.get_file_object(model_name, bucket)?;
        let text = Self::read_object(&path, true, false)?.into_text()?;
        serde_json::from_str(&text).map_err(|e| {
            SegmentError::serialization(
                Stage::Storage,
                format!("deserializing model {}", path.display()),
                e,
            )
        })
    }

    pub fn create_folder(&self, folder_name: &str, bucket: &str) -> Result<PathBuf> {
        let path = self.object_path(bucket, folder_name);
        std::fs::create_dir_all(&path).map_err(|e| {
            SegmentError::io(
                Stage::Storage,
                format!("creating folder {}", path.display()),
                e,
            )
        })?;
        Ok(path)
    }

    /// Store a local file under `bucket/to_filename`.
    ///
    /// With `remove` the source is moved, otherwise copied. The destination
    /// only changes by atomic rename, so a failure leaves the source in place
    /// and the destination as it was.
    pub fn upload_file(
        &self,
        from_filename: &Path,
        to_filename: &str,
        bucket: &str,
        remove: bool,
    ) -> Result<PathBuf> {
        info!(from = %from_filename.display(), to_filename, bucket, remove, "Saving file to local storage");
        let dest = self.object_path(bucket, to_filename);
        let outcome = if remove {
            persistence::atomic_move(from_filename, &dest)
        } else {
            persistence::atomic_copy(from_filename, &dest).map(|_| ())
        };
        outcome.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound && !from_filename.exists() {
                SegmentError::not_found(Stage::Storage, from_filename.display().to_string())
            } else {
                SegmentError::io(
                    Stage::Storage,
                    format!(
                        "uploading {} to {}",
                        from_filename.display(),
                        dest.display()
                    ),
                    e,
                )
            }
        })?;
        Ok(dest)
    }

    /// Write a table as CSV under `bucket/bucket_filename`.
    pub fn upload_df_as_csv(
        &self,
        table: &Table,
        bucket_filename: &str,
        bucket: &str,
    ) -> Result<PathBuf> {
        info!(bucket_filename, bucket, rows = table.row_count(), "Saving table as CSV to local storage");
        let path = self.object_path(bucket, bucket_filename);
        table.write_csv(&path)?;
        Ok(path)
    }

    /// Parse a table from already-read object content.
    pub fn get_df_from_object(content: ObjectContent) -> Result<Table> {
        Table::parse_csv(&content.into_text()?)
    }

    pub fn read_csv(&self, filename: &str, bucket: &str) -> Result<Table> {
        debug!(filename, bucket, "Reading CSV from local storage");
        let path = self.get_file_object(filename, bucket)?;
        Self::get_df_from_object(Self::read_object(&path, true, true)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn storage() -> (TempDir, ObjectStorage) {
        let dir = TempDir::new().unwrap();
        let storage = ObjectStorage::new(dir.path().join("local_storage"));
        (dir, storage)
    }

    #[test]
    fn test_key_path_available() {
        let (_dir, storage) = storage();
        assert!(!storage.key_path_available("models", "model.json"));
        persistence::atomic_write(&storage.object_path("models", "model.json"), b"{}").unwrap();
        assert!(storage.key_path_available("models", "model.json"));
    }

    #[test]
    fn test_read_object_modes() {
        let (dir, _storage) = storage();
        let path = dir.path().join("obj.txt");
        std::fs::write(&path, "hello").unwrap();

        match ObjectStorage::read_object(&path, false, false).unwrap() {
            ObjectContent::Bytes(b) => assert_eq!(b, b"hello"),
            other => panic!("unexpected {other:?}"),
        }
        match ObjectStorage::read_object(&path, true, false).unwrap() {
            ObjectContent::Text(s) => assert_eq!(s, "hello"),
            other => panic!("unexpected {other:?}"),
        }
        let stream = ObjectStorage::read_object(&path, true, true).unwrap();
        assert!(matches!(stream, ObjectContent::TextStream(_)));
        assert_eq!(stream.into_text().unwrap(), "hello");
        let bytes = ObjectStorage::read_object(&path, false, true).unwrap();
        assert_eq!(bytes.into_text().unwrap(), "hello");
    }

    #[test]
    fn test_read_object_missing_is_not_found() {
        let err = ObjectStorage::read_object(Path::new("/no/such/object"), true, false).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::NotFound {
                stage: Stage::Storage,
                ..
            }
        ));
    }

    #[test]
    fn test_read_object_invalid_utf8() {
        let (dir, _storage) = storage();
        let path = dir.path().join("bin");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = ObjectStorage::read_object(&path, true, false).unwrap_err();
        assert!(matches!(err, SegmentError::Serialization { .. }));
    }

    #[test]
    fn test_get_file_object() {
        let (_dir, storage) = storage();
        assert!(storage.get_file_object("a.csv", "b").is_err());
        storage.create_folder("", "b").unwrap();
        std::fs::write(storage.object_path("b", "a.csv"), "x\n1\n").unwrap();
        assert_eq!(
            storage.get_file_object("a.csv", "b").unwrap(),
            storage.object_path("b", "a.csv")
        );
    }

    #[test]
    fn test_load_model_wraps_deserialization_failure() {
        let (_dir, storage) = storage();
        persistence::atomic_write(&storage.object_path("m", "model.json"), b"not json").unwrap();
        let err = storage
            .load_model::<serde_json::Value>("model.json", "m")
            .unwrap_err();
        assert!(matches!(
            err,
            SegmentError::Serialization {
                stage: Stage::Storage,
                ..
            }
        ));
    }

    #[test]
    fn test_upload_file_with_remove_moves() {
        let (dir, storage) = storage();
        let src = dir.path().join("trained.json");
        std::fs::write(&src, "{\"k\":3}").unwrap();

        let dest = storage
            .upload_file(&src, "nested/model.json", "models", true)
            .unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "{\"k\":3}");
    }

    #[test]
    fn test_upload_file_without_remove_copies() {
        let (dir, storage) = storage();
        let src = dir.path().join("trained.json");
        std::fs::write(&src, "x").unwrap();
        storage.upload_file(&src, "model.json", "models", false).unwrap();
        assert!(src.exists());
        assert!(storage.key_path_available("models", "model.json"));
    }

    #[test]
    fn test_upload_file_failure_leaves_both_sides_intact() {
        let (dir, storage) = storage();
        let dest = storage.object_path("models", "model.json");
        persistence::atomic_write(&dest, b"previous").unwrap();

        // A directory cannot be moved over a file, so the upload fails.
        let src = dir.path().join("src_dir");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("inner"), "x").unwrap();
        assert!(storage.upload_file(&src, "model.json", "models", true).is_err());
        assert!(src.join("inner").exists());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "previous");

        let missing = dir.path().join("missing.json");
        let err = storage
            .upload_file(&missing, "model.json", "models", true)
            .unwrap_err();
        assert!(matches!(err, SegmentError::NotFound { .. }));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "previous");
    }

    #[test]
    fn test_csv_upload_and_read() {
        let (_dir, storage) = storage();
        let table = Table::from_rows(
            vec!["Age".into(), "Income".into()],
            vec![vec![58.0, 58138.0], vec![f64::NAN, 46344.0]],
        )
        .unwrap();
        storage
            .upload_df_as_csv(&table, "ingested/train.csv", "artifact")
            .unwrap();

        let back = storage.read_csv("ingested/train.csv", "artifact").unwrap();
        assert_eq!(back.columns, table.columns);
        assert_eq!(back.rows[0], vec![58.0, 58138.0]);
        assert!(back.rows[1][0].is_nan());
    }
}
