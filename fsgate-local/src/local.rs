// SPDX-License-Identifier: AGPL-3.0-or-later
//! Root-scoped local filesystem facade

use crate::disk::{self, SpaceInfo};
use crate::tree::{self, blocking, is_absent};
use base64::Engine as _;
use fsgate_core::{
    digest::md5_hex,
    options::{DeleteOptions, Encoding, InfoOptions, MakeDirectoryOptions, ReadOptions, WriteOptions},
    ExternalAccess, FacadeConfig, FileInfo, FileUri, FsError, FsResult, PermissionFlags,
    RootDirectories,
};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Filesystem facade over three host-provided roots
///
/// Holds no mutable state, so a single instance can be shared behind an
/// `Arc` and called concurrently.
#[derive(Debug, Clone)]
pub struct FileSystem {
    roots: RootDirectories,
    external_access: ExternalAccess,
}

impl FileSystem {
    pub fn new(roots: RootDirectories) -> Self {
        Self {
            roots,
            external_access: ExternalAccess::Deny,
        }
    }

    pub fn from_config(config: &FacadeConfig) -> FsResult<Self> {
        Ok(Self::new(config.root_directories()?)
            .with_external_access(config.permissions.external_access))
    }

    pub fn with_external_access(mut self, access: ExternalAccess) -> Self {
        self.external_access = access;
        self
    }

    pub fn roots(&self) -> &RootDirectories {
        &self.roots
    }

    pub fn document_directory(&self) -> &Path {
        self.roots.document()
    }

    pub fn caches_directory(&self) -> &Path {
        self.roots.caches()
    }

    pub fn bundle_directory(&self) -> &Path {
        self.roots.bundle()
    }

    // --- Synchronous helpers ---

    /// Permissions implied by the roots alone. Never touches the disk.
    pub fn permissions_for_path(&self, path: &Path) -> PermissionFlags {
        self.roots.permissions_for_path(path)
    }

    /// Effective permissions, consulting the OS for external paths when the
    /// facade is configured with [`ExternalAccess::Os`].
    pub fn permissions_for_uri(&self, uri: &FileUri) -> PermissionFlags {
        if self.roots.classify(uri.path()).is_some() {
            return self.permissions_for_path(uri.path());
        }
        match self.external_access {
            ExternalAccess::Deny => PermissionFlags::empty(),
            ExternalAccess::Os => os_permissions(uri.path()),
        }
    }

    fn require(&self, uri: &FileUri, required: PermissionFlags) -> FsResult<()> {
        if self.permissions_for_uri(uri).contains(required) {
            Ok(())
        } else {
            tracing::debug!(path = %uri.path().display(), ?required, "permission denied");
            Err(FsError::PermissionDenied {
                path: uri.path().to_path_buf(),
                required,
            })
        }
    }

    /// Make sure `path` is a directory, creating missing ancestors.
    ///
    /// Returns false when something other than a directory is in the way or
    /// creation fails.
    pub fn ensure_dir_exists(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => return true,
            Ok(_) => {
                tracing::warn!(path = %path.display(), "not a directory, cannot ensure it exists");
                return false;
            }
            Err(_) => {}
        }

        match std::fs::create_dir_all(path) {
            Ok(()) => path.is_dir(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to create directory");
                false
            }
        }
    }

    /// Name a fresh file inside `directory`. Nothing is created.
    pub fn generate_path_in_directory(&self, directory: &Path, extension: &str) -> PathBuf {
        let mut name = uuid::Uuid::new_v4().to_string();
        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() {
            name.push('.');
            name.push_str(extension);
        }
        directory.join(name)
    }

    pub fn md5(data: &[u8]) -> String {
        md5_hex(data)
    }

    // --- Async operations ---

    pub async fn get_info(&self, uri: &FileUri, options: &InfoOptions) -> FsResult<FileInfo> {
        self.require(uri, PermissionFlags::READ)?;
        tracing::debug!(uri = %uri, md5 = options.md5, "get_info");

        let path = uri.path().to_path_buf();
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if is_absent(&e) => return Ok(FileInfo::missing(uri)),
            Err(e) => return Err(FsError::io(&path, e)),
        };

        let mut info = if meta.is_dir() {
            let root = path.clone();
            let size = blocking(move || Ok(tree::dir_size(&root))).await?;
            FileInfo::directory(uri, size)
        } else {
            let mut info = FileInfo::file(uri, meta.len());
            if options.md5 {
                let md5 = blocking(move || tree::file_md5(path)).await?;
                info = info.with_md5(md5);
            }
            info
        };

        if let Some(modified) = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        {
            info = info.with_modification_time(modified.as_secs_f64());
        }
        Ok(info)
    }

    /// Copy a file or directory tree, replacing whatever is at `to`.
    ///
    /// A failed copy may leave `to` partially written.
    pub async fn copy(&self, from: &FileUri, to: &FileUri) -> FsResult<()> {
        self.require(from, PermissionFlags::READ)?;
        self.require(to, PermissionFlags::WRITE)?;
        tracing::debug!(from = %from, to = %to, "copy");

        let src = from.path().to_path_buf();
        let dst = to.path().to_path_buf();

        let meta = match fs::metadata(&src).await {
            Ok(meta) => meta,
            Err(e) if is_absent(&e) => return Err(FsError::NotFound(src)),
            Err(e) => return Err(FsError::io(&src, e)),
        };
        if src == dst {
            return Ok(());
        }
        self.check_transfer(&src, &dst, meta.is_dir())?;

        blocking(move || {
            if std::fs::symlink_metadata(&dst).is_ok() {
                tree::remove_any(&dst)?;
            }
            if meta.is_dir() {
                tree::copy_tree(&src, &dst).map(|_| ())
            } else {
                std::fs::copy(&src, &dst)
                    .map(|_| ())
                    .map_err(|e| FsError::io(&dst, e))
            }
        })
        .await
    }

    /// Move a file or directory, replacing whatever is at `to`.
    pub async fn move_entry(&self, from: &FileUri, to: &FileUri) -> FsResult<()> {
        self.require(from, PermissionFlags::WRITE)?;
        self.require(to, PermissionFlags::WRITE)?;
        tracing::debug!(from = %from, to = %to, "move");

        let src = from.path().to_path_buf();
        let dst = to.path().to_path_buf();

        let meta = match fs::symlink_metadata(&src).await {
            Ok(meta) => meta,
            Err(e) if is_absent(&e) => return Err(FsError::NotFound(src)),
            Err(e) => return Err(FsError::io(&src, e)),
        };
        if src == dst {
            return Ok(());
        }
        self.check_transfer(&src, &dst, meta.is_dir())?;

        blocking(move || {
            if std::fs::symlink_metadata(&dst).is_ok() {
                tree::remove_any(&dst)?;
            }
            match std::fs::rename(&src, &dst) {
                Ok(()) => Ok(()),
                Err(e) if is_cross_device(&e) => {
                    tracing::debug!(from = %src.display(), "rename crossed devices, copying");
                    if std::fs::metadata(&src).map(|m| m.is_dir()).unwrap_or(false) {
                        tree::copy_tree(&src, &dst)?;
                    } else {
                        std::fs::copy(&src, &dst).map_err(|e| FsError::io(&dst, e))?;
                    }
                    tree::remove_any(&src)
                }
                Err(e) => Err(FsError::io(&dst, e)),
            }
        })
        .await
    }

    /// Reject copy or move targets that would destroy the source or a root
    /// before anything on disk changes.
    fn check_transfer(&self, src: &Path, dst: &Path, src_is_dir: bool) -> FsResult<()> {
        if self.is_root(dst) {
            return Err(FsError::PermissionDenied {
                path: dst.to_path_buf(),
                required: PermissionFlags::WRITE,
            });
        }
        if src.starts_with(dst) {
            return Err(FsError::InvalidUri(format!(
                "cannot replace {} with an entry it contains",
                dst.display()
            )));
        }
        if src_is_dir && dst.starts_with(src) {
            return Err(FsError::InvalidUri(format!(
                "cannot place {} inside itself",
                src.display()
            )));
        }
        Ok(())
    }

    fn is_root(&self, path: &Path) -> bool {
        [self.roots.document(), self.roots.caches(), self.roots.bundle()]
            .iter()
            .any(|root| *root == path)
    }

    pub async fn delete(&self, uri: &FileUri, options: &DeleteOptions) -> FsResult<()> {
        self.require(uri, PermissionFlags::WRITE)?;
        tracing::debug!(uri = %uri, idempotent = options.idempotent, "delete");

        let path = uri.path().to_path_buf();
        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if is_absent(&e) => {
                return if options.idempotent {
                    Ok(())
                } else {
                    Err(FsError::NotFound(path))
                };
            }
            Err(e) => return Err(FsError::io(&path, e)),
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        result.map_err(|e| FsError::io(&path, e))
    }

    pub async fn make_directory(&self, uri: &FileUri, options: &MakeDirectoryOptions) -> FsResult<()> {
        self.require(uri, PermissionFlags::WRITE)?;
        tracing::debug!(uri = %uri, intermediates = options.intermediates, "make_directory");

        let path = uri.path().to_path_buf();
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() && options.intermediates => return Ok(()),
            Ok(_) => return Err(FsError::AlreadyExists(path)),
            Err(_) => {}
        }

        let result = if options.intermediates {
            fs::create_dir_all(&path).await
        } else {
            fs::create_dir(&path).await
        };
        result.map_err(|e| match path.parent() {
            Some(parent) if is_absent(&e) => FsError::NotFound(parent.to_path_buf()),
            _ => FsError::io(&path, e),
        })
    }

    /// Entry names directly inside a directory, sorted.
    pub async fn read_directory(&self, uri: &FileUri) -> FsResult<Vec<String>> {
        self.require(uri, PermissionFlags::READ)?;
        tracing::debug!(uri = %uri, "read_directory");

        let path = uri.path().to_path_buf();
        let meta = fs::metadata(&path).await.map_err(|e| FsError::io(&path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory(path));
        }

        let mut names = Vec::new();
        let mut read_dir = fs::read_dir(&path).await.map_err(|e| FsError::io(&path, e))?;
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| FsError::io(&path, e))? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    pub async fn read_as_string(&self, uri: &FileUri, options: &ReadOptions) -> FsResult<String> {
        self.require(uri, PermissionFlags::READ)?;
        tracing::debug!(uri = %uri, ?options, "read_as_string");

        let windowed = options.position.is_some() || options.length.is_some();
        if windowed && options.encoding != Encoding::Base64 {
            return Err(FsError::Unsupported(
                "position and length require base64 encoding".into(),
            ));
        }

        let path = uri.path().to_path_buf();
        let meta = fs::metadata(&path).await.map_err(|e| FsError::io(&path, e))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory(path));
        }

        let bytes = if windowed {
            let mut file = fs::File::open(&path).await.map_err(|e| FsError::io(&path, e))?;
            file.seek(std::io::SeekFrom::Start(options.position.unwrap_or(0)))
                .await
                .map_err(|e| FsError::io(&path, e))?;
            let mut buffer = Vec::new();
            let read = match options.length {
                Some(len) => file.take(len).read_to_end(&mut buffer).await,
                None => file.read_to_end(&mut buffer).await,
            };
            read.map_err(|e| FsError::io(&path, e))?;
            buffer
        } else {
            fs::read(&path).await.map_err(|e| FsError::io(&path, e))?
        };

        match options.encoding {
            Encoding::Utf8 => String::from_utf8(bytes)
                .map_err(|e| FsError::Encoding(format!("{} is not UTF-8: {e}", path.display()))),
            Encoding::Base64 => Ok(base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }

    pub async fn write_as_string(
        &self,
        uri: &FileUri,
        contents: &str,
        options: &WriteOptions,
    ) -> FsResult<()> {
        self.require(uri, PermissionFlags::WRITE)?;
        tracing::debug!(uri = %uri, len = contents.len(), ?options, "write_as_string");

        let bytes = match options.encoding {
            Encoding::Utf8 => contents.as_bytes().to_vec(),
            Encoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(contents)
                .map_err(|e| FsError::Encoding(format!("invalid base64: {e}")))?,
        };

        let path = uri.path().to_path_buf();
        if let Ok(meta) = fs::metadata(&path).await {
            if meta.is_dir() {
                return Err(FsError::IsADirectory(path));
            }
        }
        fs::write(&path, bytes).await.map_err(|e| match path.parent() {
            Some(parent) if is_absent(&e) => FsError::NotFound(parent.to_path_buf()),
            _ => FsError::io(&path, e),
        })
    }

    pub async fn free_disk_storage(&self) -> FsResult<u64> {
        Ok(self.space_info().await?.available)
    }

    pub async fn total_disk_capacity(&self) -> FsResult<u64> {
        Ok(self.space_info().await?.total)
    }

    async fn space_info(&self) -> FsResult<SpaceInfo> {
        let root = self.roots.document().to_path_buf();
        blocking(move || disk::space_info(&root)).await
    }
}

fn is_cross_device(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::EXDEV)
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

/// What the OS lets this process do with an external path.
///
/// A path that does not exist yet is writable when its parent is.
#[cfg(unix)]
fn os_permissions(path: &Path) -> PermissionFlags {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    fn access(path: &Path, mode: libc::c_int) -> bool {
        match CString::new(path.as_os_str().as_bytes()) {
            // SAFETY: the pointer is a valid NUL-terminated string for the call.
            Ok(c_path) => unsafe { libc::access(c_path.as_ptr(), mode) == 0 },
            Err(_) => false,
        }
    }

    let mut flags = PermissionFlags::empty();
    if path.exists() {
        if access(path, libc::R_OK) {
            flags |= PermissionFlags::READ;
        }
        if access(path, libc::W_OK) {
            flags |= PermissionFlags::WRITE;
        }
    } else if path.parent().is_some_and(|p| access(p, libc::W_OK)) {
        flags |= PermissionFlags::WRITE;
    }
    flags
}

#[cfg(not(unix))]
fn os_permissions(path: &Path) -> PermissionFlags {
    match std::fs::metadata(path) {
        Ok(meta) if meta.permissions().readonly() => PermissionFlags::READ,
        Ok(_) => PermissionFlags::read_write(),
        Err(_) => PermissionFlags::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    struct Sandbox {
        _dir: TempDir,
        fs: FileSystem,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            for sub in ["documents", "caches", "bundle"] {
                std::fs::create_dir(dir.path().join(sub)).unwrap();
            }
            let roots = RootDirectories::new(
                dir.path().join("documents"),
                dir.path().join("caches"),
                dir.path().join("bundle"),
            )
            .unwrap();
            Self {
                fs: FileSystem::new(roots),
                _dir: dir,
            }
        }

        fn doc(&self, rel: &str) -> FileUri {
            FileUri::from_path(self.fs.document_directory().join(rel))
        }

        fn bundle(&self, rel: &str) -> FileUri {
            FileUri::from_path(self.fs.bundle_directory().join(rel))
        }
    }

    #[test]
    fn test_root_accessors() {
        let sb = Sandbox::new();
        assert!(sb.fs.document_directory().ends_with("documents"));
        assert!(sb.fs.caches_directory().ends_with("caches"));
        assert!(sb.fs.bundle_directory().ends_with("bundle"));
    }

    #[test]
    fn test_permissions_by_root() {
        let sb = Sandbox::new();
        let caches = sb.fs.caches_directory().join("x");
        assert_eq!(sb.fs.permissions_for_path(sb.doc("a").path()), PermissionFlags::read_write());
        assert_eq!(sb.fs.permissions_for_path(&caches), PermissionFlags::read_write());
        assert_eq!(sb.fs.permissions_for_path(sb.bundle("a").path()), PermissionFlags::READ);
        assert!(sb.fs.permissions_for_path(Path::new("/usr/bin/env")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_external_access_os_policy() {
        let sb = Sandbox::new();
        let outside = tempfile::tempdir().unwrap();
        let file = outside.path().join("ext.txt");
        std::fs::write(&file, b"x").unwrap();
        let uri = FileUri::from_path(&file);

        assert!(sb.fs.permissions_for_uri(&uri).is_empty());

        let fs = sb.fs.clone().with_external_access(ExternalAccess::Os);
        assert!(fs.permissions_for_uri(&uri).can_read());
        // Root membership still wins over the OS answer.
        assert_eq!(fs.permissions_for_uri(&sb.bundle("a")), PermissionFlags::READ);
    }

    #[test]
    fn test_ensure_dir_exists_idempotent() {
        let sb = Sandbox::new();
        let target = sb.doc("a/b/c");
        assert!(sb.fs.ensure_dir_exists(target.path()));
        assert!(sb.fs.ensure_dir_exists(target.path()));
        assert!(target.path().is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_on_file_is_false() {
        let sb = Sandbox::new();
        let file = sb.doc("occupied");
        std::fs::write(file.path(), b"x").unwrap();
        assert!(!sb.fs.ensure_dir_exists(file.path()));
        assert!(file.path().is_file());
    }

    #[test]
    fn test_generate_path() {
        let sb = Sandbox::new();
        let dir = sb.fs.caches_directory().to_path_buf();
        let path = sb.fs.generate_path_in_directory(&dir, "jpg");
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert!(!path.exists());

        let dotted = sb.fs.generate_path_in_directory(&dir, ".png");
        assert!(dotted.to_string_lossy().ends_with(".png"));
        assert!(!dotted.to_string_lossy().ends_with("..png"));

        let bare = sb.fs.generate_path_in_directory(&dir, "");
        assert!(bare.extension().is_none());
    }

    #[test]
    fn test_generate_path_unique() {
        let sb = Sandbox::new();
        let dir = sb.fs.caches_directory().to_path_buf();
        let paths: HashSet<PathBuf> = (0..10_000)
            .map(|_| sb.fs.generate_path_in_directory(&dir, "jpg"))
            .collect();
        assert_eq!(paths.len(), 10_000);
    }

    #[test]
    fn test_md5() {
        assert_eq!(FileSystem::md5(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[tokio::test]
    async fn test_get_info_missing() {
        let sb = Sandbox::new();
        let info = sb.fs.get_info(&sb.doc("nope.txt"), &InfoOptions::default()).await.unwrap();
        assert!(!info.exists);
        assert!(info.size.is_none());
    }

    #[tokio::test]
    async fn test_get_info_file_with_md5() {
        let sb = Sandbox::new();
        let uri = sb.doc("hello.txt");
        std::fs::write(uri.path(), b"hello world").unwrap();

        let info = sb
            .fs
            .get_info(&uri, &InfoOptions { md5: true, size: true })
            .await
            .unwrap();
        assert!(info.exists);
        assert!(!info.is_directory);
        assert_eq!(info.size, Some(11));
        assert_eq!(info.md5.as_deref(), Some(FileSystem::md5(b"hello world").as_str()));
        assert!(info.modification_time.is_some());
        assert_eq!(info.uri, uri.to_uri());
    }

    #[tokio::test]
    async fn test_get_info_directory() {
        let sb = Sandbox::new();
        let dir = sb.doc("d");
        std::fs::create_dir_all(dir.path().join("e")).unwrap();
        std::fs::write(dir.path().join("one"), b"1").unwrap();
        std::fs::write(dir.path().join("e/two"), b"22").unwrap();

        let info = sb.fs.get_info(&dir, &InfoOptions { md5: true, size: false }).await.unwrap();
        assert!(info.is_directory);
        assert_eq!(info.size, Some(3));
        assert!(info.md5.is_none());
    }

    #[tokio::test]
    async fn test_get_info_outside_roots_denied() {
        let sb = Sandbox::new();
        let err = sb
            .fs
            .get_info(&FileUri::from_path("/etc/hosts"), &InfoOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let sb = Sandbox::new();
        let err = sb.fs.copy(&sb.doc("missing"), &sb.doc("dst")).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
        assert!(!sb.doc("dst").path().exists());
    }

    #[tokio::test]
    async fn test_copy_file_and_overwrite() {
        let sb = Sandbox::new();
        std::fs::write(sb.doc("a").path(), b"first").unwrap();
        std::fs::write(sb.doc("b").path(), b"old contents").unwrap();

        sb.fs.copy(&sb.doc("a"), &sb.doc("b")).await.unwrap();
        assert_eq!(std::fs::read(sb.doc("b").path()).unwrap(), b"first");
        assert_eq!(std::fs::read(sb.doc("a").path()).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_copy_from_bundle_into_documents() {
        let sb = Sandbox::new();
        std::fs::write(sb.bundle("asset.bin").path(), [1u8, 2, 3]).unwrap();
        sb.fs.copy(&sb.bundle("asset.bin"), &sb.doc("asset.bin")).await.unwrap();
        assert_eq!(std::fs::read(sb.doc("asset.bin").path()).unwrap(), [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_copy_into_bundle_denied() {
        let sb = Sandbox::new();
        std::fs::write(sb.doc("a").path(), b"x").unwrap();
        let err = sb.fs.copy(&sb.doc("a"), &sb.bundle("a")).await.unwrap_err();
        assert!(matches!(
            err,
            FsError::PermissionDenied { required, .. } if required == PermissionFlags::WRITE
        ));
        assert!(!sb.bundle("a").path().exists());
    }

    #[tokio::test]
    async fn test_copy_directory_into_itself() {
        let sb = Sandbox::new();
        std::fs::create_dir(sb.doc("tree").path()).unwrap();
        let err = sb.fs.copy(&sb.doc("tree"), &sb.doc("tree/inner")).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn test_copy_file_onto_its_parent() {
        let sb = Sandbox::new();
        std::fs::create_dir(sb.doc("album").path()).unwrap();
        std::fs::write(sb.doc("album/photo.jpg").path(), b"jpeg").unwrap();

        let err = sb
            .fs
            .copy(&sb.doc("album/photo.jpg"), &sb.doc("album"))
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidUri(_)));
        assert_eq!(std::fs::read(sb.doc("album/photo.jpg").path()).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_move_directory_onto_its_parent() {
        let sb = Sandbox::new();
        std::fs::create_dir_all(sb.doc("a/b").path()).unwrap();
        std::fs::write(sb.doc("a/b/note.txt").path(), b"keep").unwrap();

        let err = sb
            .fs
            .move_entry(&sb.doc("a/b"), &sb.doc("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidUri(_)));
        assert_eq!(std::fs::read(sb.doc("a/b/note.txt").path()).unwrap(), b"keep");

        let err = sb
            .fs
            .move_entry(&sb.doc("a"), &sb.doc("a/b/c"))
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidUri(_)));
        assert!(sb.doc("a/b").path().is_dir());
    }

    #[tokio::test]
    async fn test_transfer_onto_root_denied() {
        let sb = Sandbox::new();
        let cached = FileUri::from_path(sb.fs.caches_directory().join("c.txt"));
        std::fs::write(cached.path(), b"cache").unwrap();
        std::fs::write(sb.doc("other.txt").path(), b"other").unwrap();
        let document_root = FileUri::from_path(sb.fs.document_directory());

        let err = sb.fs.copy(&cached, &document_root).await.unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));
        let err = sb.fs.move_entry(&cached, &document_root).await.unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));

        assert!(sb.fs.document_directory().is_dir());
        assert_eq!(std::fs::read(sb.doc("other.txt").path()).unwrap(), b"other");
        assert!(cached.path().exists());
    }

    #[tokio::test]
    async fn test_delete_keeps_name_without_trailing_space() {
        let sb = Sandbox::new();
        std::fs::write(sb.doc("report").path(), b"plain").unwrap();
        std::fs::write(sb.doc("report ").path(), b"spaced").unwrap();

        let uri = FileUri::parse(&format!("{}/report ", sb.fs.document_directory().display())).unwrap();
        sb.fs.delete(&uri, &DeleteOptions::default()).await.unwrap();

        assert!(!sb.doc("report ").path().exists());
        assert_eq!(std::fs::read(sb.doc("report").path()).unwrap(), b"plain");
    }

    #[tokio::test]
    async fn test_move_entry() {
        let sb = Sandbox::new();
        std::fs::write(sb.doc("from").path(), b"data").unwrap();
        sb.fs.move_entry(&sb.doc("from"), &sb.doc("to")).await.unwrap();
        assert!(!sb.doc("from").path().exists());
        assert_eq!(std::fs::read(sb.doc("to").path()).unwrap(), b"data");

        let err = sb.fs.move_entry(&sb.doc("from"), &sb.doc("x")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_move_out_of_bundle_denied() {
        let sb = Sandbox::new();
        std::fs::write(sb.bundle("a").path(), b"x").unwrap();
        let err = sb.fs.move_entry(&sb.bundle("a"), &sb.doc("a")).await.unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));
        assert!(sb.bundle("a").path().exists());
    }

    #[tokio::test]
    async fn test_delete() {
        let sb = Sandbox::new();
        std::fs::create_dir_all(sb.doc("t/u").path()).unwrap();
        std::fs::write(sb.doc("t/u/f").path(), b"x").unwrap();

        sb.fs.delete(&sb.doc("t"), &DeleteOptions::default()).await.unwrap();
        assert!(!sb.doc("t").path().exists());

        let err = sb.fs.delete(&sb.doc("t"), &DeleteOptions::default()).await.unwrap_err();
        assert!(err.is_not_found());
        sb.fs
            .delete(&sb.doc("t"), &DeleteOptions { idempotent: true })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_make_directory() {
        let sb = Sandbox::new();
        let nested = sb.doc("x/y/z");

        let err = sb
            .fs
            .make_directory(&nested, &MakeDirectoryOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let opts = MakeDirectoryOptions { intermediates: true };
        sb.fs.make_directory(&nested, &opts).await.unwrap();
        sb.fs.make_directory(&nested, &opts).await.unwrap();
        assert!(nested.path().is_dir());

        let err = sb
            .fs
            .make_directory(&nested, &MakeDirectoryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_read_directory() {
        let sb = Sandbox::new();
        std::fs::write(sb.doc("b.txt").path(), b"").unwrap();
        std::fs::write(sb.doc("a.txt").path(), b"").unwrap();
        std::fs::create_dir(sb.doc("c").path()).unwrap();

        let root = FileUri::from_path(sb.fs.document_directory());
        let names = sb.fs.read_directory(&root).await.unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);

        let err = sb.fs.read_directory(&sb.doc("a.txt")).await.unwrap_err();
        assert!(matches!(err, FsError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_write_and_read_string() {
        let sb = Sandbox::new();
        let uri = sb.doc("note.txt");
        sb.fs
            .write_as_string(&uri, "héllo", &WriteOptions::default())
            .await
            .unwrap();
        let text = sb.fs.read_as_string(&uri, &ReadOptions::default()).await.unwrap();
        assert_eq!(text, "héllo");
    }

    #[tokio::test]
    async fn test_base64_window() {
        let sb = Sandbox::new();
        let uri = sb.doc("bin");
        let b64 = WriteOptions { encoding: Encoding::Base64 };
        // "AAECAwQF" is bytes 0..=5
        sb.fs.write_as_string(&uri, "AAECAwQF", &b64).await.unwrap();
        assert_eq!(std::fs::read(uri.path()).unwrap(), [0, 1, 2, 3, 4, 5]);

        let window = ReadOptions {
            encoding: Encoding::Base64,
            position: Some(2),
            length: Some(3),
        };
        let out = sb.fs.read_as_string(&uri, &window).await.unwrap();
        assert_eq!(out, "AgME");

        let bad = ReadOptions {
            encoding: Encoding::Utf8,
            position: Some(1),
            length: None,
        };
        assert!(matches!(
            sb.fs.read_as_string(&uri, &bad).await,
            Err(FsError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_write_invalid_base64() {
        let sb = Sandbox::new();
        let b64 = WriteOptions { encoding: Encoding::Base64 };
        let err = sb.fs.write_as_string(&sb.doc("x"), "not base64!", &b64).await.unwrap_err();
        assert!(matches!(err, FsError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_write_into_bundle_denied() {
        let sb = Sandbox::new();
        let err = sb
            .fs
            .write_as_string(&sb.bundle("x"), "data", &WriteOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E_PERMISSION_DENIED");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_disk_space() {
        let sb = Sandbox::new();
        let total = sb.fs.total_disk_capacity().await.unwrap();
        let free = sb.fs.free_disk_storage().await.unwrap();
        assert!(total > 0);
        assert!(free <= total);
    }
}
