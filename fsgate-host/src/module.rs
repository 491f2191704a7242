// SPDX-License-Identifier: AGPL-3.0-or-later
//! Exported module trait and the filesystem module

use crate::error::{HostError, HostResult};
use async_trait::async_trait;
use fsgate_core::options::{DeleteOptions, InfoOptions, MakeDirectoryOptions, ReadOptions, WriteOptions};
use fsgate_core::FileUri;
use fsgate_local::FileSystem;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A native module a host runtime can discover and call
///
/// `exported_methods` is the export table: the host only dispatches names
/// listed there. Arguments arrive as a JSON array of positional values.
#[async_trait]
pub trait ExportedModule: Send + Sync {
    fn name(&self) -> &str;

    /// Values the host reads once at load time
    fn exported_constants(&self) -> Map<String, Value>;

    fn exported_methods(&self) -> &'static [&'static str];

    async fn call(&self, method: &str, args: Value) -> HostResult<Value>;
}

/// Positional call arguments
struct Args(Vec<Value>);

impl Args {
    fn new(args: Value) -> HostResult<Self> {
        match args {
            Value::Array(values) => Ok(Self(values)),
            Value::Null => Ok(Self(Vec::new())),
            other => Err(HostError::InvalidArguments(format!(
                "expected an argument array, got {other}"
            ))),
        }
    }

    fn required(&self, index: usize, what: &str) -> HostResult<&Value> {
        match self.0.get(index) {
            Some(Value::Null) | None => Err(HostError::InvalidArguments(format!(
                "missing argument {index} ({what})"
            ))),
            Some(value) => Ok(value),
        }
    }

    fn string(&self, index: usize, what: &str) -> HostResult<&str> {
        self.required(index, what)?.as_str().ok_or_else(|| {
            HostError::InvalidArguments(format!("argument {index} ({what}) must be a string"))
        })
    }

    fn uri(&self, index: usize) -> HostResult<FileUri> {
        Ok(FileUri::parse(self.string(index, "uri")?)?)
    }

    fn value<T: DeserializeOwned>(&self, index: usize, what: &str) -> HostResult<T> {
        Ok(T::deserialize(self.required(index, what)?)?)
    }

    /// Trailing options dictionary; absent or null means defaults.
    fn options<T: DeserializeOwned + Default>(&self, index: usize) -> HostResult<T> {
        match self.0.get(index) {
            Some(Value::Null) | None => Ok(T::default()),
            Some(value) => Ok(T::deserialize(value)?),
        }
    }
}

#[derive(Deserialize)]
struct Transfer {
    from: String,
    to: String,
}

impl Transfer {
    fn uris(&self) -> HostResult<(FileUri, FileUri)> {
        Ok((FileUri::parse(&self.from)?, FileUri::parse(&self.to)?))
    }
}

/// The filesystem facade exported to hosts
#[derive(Debug, Clone)]
pub struct FileSystemModule {
    fs: Arc<FileSystem>,
}

impl FileSystemModule {
    pub const NAME: &'static str = "ExponentFileSystem";

    pub const METHODS: &'static [&'static str] = &[
        "getInfoAsync",
        "copyAsync",
        "moveAsync",
        "deleteAsync",
        "makeDirectoryAsync",
        "readDirectoryAsync",
        "readAsStringAsync",
        "writeAsStringAsync",
        "getFreeDiskStorageAsync",
        "getTotalDiskCapacityAsync",
    ];

    pub fn new(fs: Arc<FileSystem>) -> Self {
        Self { fs }
    }

    pub fn facade(&self) -> &Arc<FileSystem> {
        &self.fs
    }
}

/// Directory constants are reported with a trailing slash, as hosts join
/// file names onto them directly.
fn directory_uri(path: &std::path::Path) -> String {
    let uri = FileUri::from_path(path).to_uri();
    if uri.ends_with('/') {
        uri
    } else {
        format!("{uri}/")
    }
}

#[async_trait]
impl ExportedModule for FileSystemModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn exported_constants(&self) -> Map<String, Value> {
        let mut constants = Map::new();
        constants.insert(
            "documentDirectory".into(),
            directory_uri(self.fs.document_directory()).into(),
        );
        constants.insert(
            "cacheDirectory".into(),
            directory_uri(self.fs.caches_directory()).into(),
        );
        constants.insert(
            "bundleDirectory".into(),
            directory_uri(self.fs.bundle_directory()).into(),
        );
        constants
    }

    fn exported_methods(&self) -> &'static [&'static str] {
        Self::METHODS
    }

    async fn call(&self, method: &str, args: Value) -> HostResult<Value> {
        let args = Args::new(args)?;
        tracing::debug!(method, argc = args.0.len(), "call");

        match method {
            "getInfoAsync" => {
                let info = self
                    .fs
                    .get_info(&args.uri(0)?, &args.options::<InfoOptions>(1)?)
                    .await?;
                Ok(serde_json::to_value(info)?)
            }
            "copyAsync" => {
                let (from, to) = args.value::<Transfer>(0, "options")?.uris()?;
                self.fs.copy(&from, &to).await?;
                Ok(Value::Null)
            }
            "moveAsync" => {
                let (from, to) = args.value::<Transfer>(0, "options")?.uris()?;
                self.fs.move_entry(&from, &to).await?;
                Ok(Value::Null)
            }
            "deleteAsync" => {
                self.fs
                    .delete(&args.uri(0)?, &args.options::<DeleteOptions>(1)?)
                    .await?;
                Ok(Value::Null)
            }
            "makeDirectoryAsync" => {
                self.fs
                    .make_directory(&args.uri(0)?, &args.options::<MakeDirectoryOptions>(1)?)
                    .await?;
                Ok(Value::Null)
            }
            "readDirectoryAsync" => Ok(Value::from(self.fs.read_directory(&args.uri(0)?).await?)),
            "readAsStringAsync" => {
                let contents = self
                    .fs
                    .read_as_string(&args.uri(0)?, &args.options::<ReadOptions>(1)?)
                    .await?;
                Ok(Value::String(contents))
            }
            "writeAsStringAsync" => {
                let uri = args.uri(0)?;
                let contents = args.string(1, "contents")?;
                self.fs
                    .write_as_string(&uri, contents, &args.options::<WriteOptions>(2)?)
                    .await?;
                Ok(Value::Null)
            }
            "getFreeDiskStorageAsync" => Ok(Value::from(self.fs.free_disk_storage().await?)),
            "getTotalDiskCapacityAsync" => Ok(Value::from(self.fs.total_disk_capacity().await?)),
            _ => Err(HostError::UnknownMethod {
                module: Self::NAME.to_string(),
                method: method.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use fsgate_core::{FsError, RootDirectories};

    struct Sandbox {
        _dir: tempfile::TempDir,
        module: FileSystemModule,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            for sub in ["Documents", "Caches", "Bundle"] {
                std::fs::create_dir(dir.path().join(sub)).unwrap();
            }
            let roots = RootDirectories::new(
                dir.path().join("Documents"),
                dir.path().join("Caches"),
                dir.path().join("Bundle"),
            )
            .unwrap();
            let module = FileSystemModule::new(Arc::new(FileSystem::new(roots)));
            Self { _dir: dir, module }
        }

        fn doc_uri(&self, name: &str) -> String {
            FileUri::from_path(self.module.facade().document_directory().join(name)).to_uri()
        }
    }

    #[test]
    fn test_constants() {
        let sandbox = Sandbox::new();
        let constants = sandbox.module.exported_constants();
        let doc = constants["documentDirectory"].as_str().unwrap();
        assert!(doc.starts_with("file:///"));
        assert!(doc.ends_with("/Documents/"));
        assert!(constants["cacheDirectory"].as_str().unwrap().ends_with("/Caches/"));
        assert!(constants["bundleDirectory"].as_str().unwrap().ends_with("/Bundle/"));
    }

    #[test]
    fn test_export_table() {
        let sandbox = Sandbox::new();
        let methods = sandbox.module.exported_methods();
        assert_eq!(methods.len(), 10);
        assert!(methods.contains(&"getInfoAsync"));
        assert!(methods.contains(&"copyAsync"));
    }

    #[tokio::test]
    async fn test_write_read_info() {
        let sandbox = Sandbox::new();
        let uri = sandbox.doc_uri("note.txt");
        let m = &sandbox.module;

        m.call("writeAsStringAsync", json!([uri, "hello", {}])).await.unwrap();
        let text = m.call("readAsStringAsync", json!([uri])).await.unwrap();
        assert_eq!(text, json!("hello"));

        let info = m
            .call("getInfoAsync", json!([uri, { "md5": true }]))
            .await
            .unwrap();
        assert_eq!(info["exists"], json!(true));
        assert_eq!(info["isDirectory"], json!(false));
        assert_eq!(info["size"], json!(5));
        assert_eq!(info["md5"], json!("5d41402abc4b2a76b9719d911017c592"));
    }

    #[tokio::test]
    async fn test_copy_move_delete() {
        let sandbox = Sandbox::new();
        let m = &sandbox.module;
        let a = sandbox.doc_uri("a.txt");
        let b = sandbox.doc_uri("b.txt");
        let c = sandbox.doc_uri("c.txt");

        m.call("writeAsStringAsync", json!([a, "x"])).await.unwrap();
        m.call("copyAsync", json!([{ "from": a, "to": b }])).await.unwrap();
        m.call("moveAsync", json!([{ "from": b, "to": c }])).await.unwrap();

        let listing = m
            .call("readDirectoryAsync", json!([sandbox.doc_uri("")]))
            .await
            .unwrap();
        assert_eq!(listing, json!(["a.txt", "c.txt"]));

        m.call("deleteAsync", json!([c])).await.unwrap();
        m.call("deleteAsync", json!([c, { "idempotent": true }]))
            .await
            .unwrap();
        let err = m.call("deleteAsync", json!([c])).await.unwrap_err();
        assert_eq!(err.code(), "E_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_make_directory() {
        let sandbox = Sandbox::new();
        let m = &sandbox.module;
        let nested = sandbox.doc_uri("x/y/z");
        let err = m.call("makeDirectoryAsync", json!([nested])).await.unwrap_err();
        assert_eq!(err.code(), "E_NOT_FOUND");
        m.call("makeDirectoryAsync", json!([nested, { "intermediates": true }]))
            .await
            .unwrap();
        let info = m.call("getInfoAsync", json!([nested])).await.unwrap();
        assert_eq!(info["isDirectory"], json!(true));
    }

    #[tokio::test]
    async fn test_bad_arguments() {
        let sandbox = Sandbox::new();
        let m = &sandbox.module;

        let err = m.call("getInfoAsync", json!([])).await.unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments(_)));

        let err = m.call("getInfoAsync", json!([42])).await.unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments(_)));

        let err = m.call("copyAsync", json!([{ "from": "/a" }])).await.unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments(_)));

        let err = m.call("getInfoAsync", json!(["relative/path"])).await.unwrap_err();
        assert!(matches!(err, HostError::Fs(FsError::InvalidUri(_))));

        let err = m.call("getInfoAsync", json!({ "uri": "/x" })).await.unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_outside_roots_rejected() {
        let sandbox = Sandbox::new();
        let err = sandbox
            .module
            .call("writeAsStringAsync", json!(["file:///definitely/not/allowed", "x"]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E_PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let sandbox = Sandbox::new();
        let err = sandbox.module.call("downloadAsync", json!([])).await.unwrap_err();
        assert!(matches!(err, HostError::UnknownMethod { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_disk_space() {
        let sandbox = Sandbox::new();
        let free = sandbox
            .module
            .call("getFreeDiskStorageAsync", Value::Null)
            .await
            .unwrap();
        let total = sandbox
            .module
            .call("getTotalDiskCapacityAsync", json!([]))
            .await
            .unwrap();
        assert!(free.as_u64().unwrap() <= total.as_u64().unwrap());
    }
}
