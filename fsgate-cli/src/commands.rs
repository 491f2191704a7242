// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use crate::RootArgs;
use chrono::{DateTime, Utc};
use console::style;
use fsgate_core::{
    options::{DeleteOptions, Encoding, InfoOptions, MakeDirectoryOptions, ReadOptions, WriteOptions},
    ExternalAccess, FacadeConfig, FileInfo, FileUri, FsError, FsResult, PermissionFlags, RootKind,
};
use fsgate_local::FileSystem;
use std::io::{Read, Write};
use std::path::Path;
use tabled::{Table, Tabled};

/// Build the facade from the config file, then apply flag overrides
pub fn init_facade(args: &RootArgs) -> FsResult<FileSystem> {
    let mut config = match &args.config {
        Some(path) => FacadeConfig::load(path)?,
        None => FacadeConfig::default(),
    };

    let cwd = std::env::current_dir()?;
    let absolute = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) };
    if let Some(dir) = &args.document_dir {
        config.roots.document = Some(absolute(dir));
    }
    if let Some(dir) = &args.caches_dir {
        config.roots.caches = Some(absolute(dir));
    }
    if let Some(dir) = &args.bundle_dir {
        config.roots.bundle = Some(absolute(dir));
    }
    if args.allow_external {
        config.permissions.external_access = ExternalAccess::Os;
    }

    let fs = FileSystem::from_config(&config)?;
    tracing::debug!(roots = ?fs.roots(), "facade ready");
    Ok(fs)
}

/// Parse a path argument into a URI
/// Supports:
/// - file:///absolute/path - explicit URI
/// - /absolute/path - local absolute path
/// - relative/path - resolved against the working directory
fn parse_path(path: &str) -> FsResult<FileUri> {
    if path.contains("://") || Path::new(path).is_absolute() {
        return FileUri::parse(path);
    }
    let cwd = std::env::current_dir()?;
    Ok(FileUri::from_path(cwd.join(path)))
}

/// Format a modification time for display
fn format_time(secs: Option<f64>) -> String {
    secs.and_then(|s| DateTime::<Utc>::from_timestamp(s.trunc() as i64, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format file size
fn format_size(size: Option<u64>, human: bool) -> String {
    match size {
        Some(s) if human => bytesize::ByteSize(s).to_string(),
        Some(s) => s.to_string(),
        None => "-".to_string(),
    }
}

fn format_kind(info: &FileInfo) -> String {
    if info.is_directory {
        style("d").cyan().to_string()
    } else {
        "-".to_string()
    }
}

fn format_zone(zone: Option<RootKind>) -> String {
    match zone {
        Some(kind) => kind.as_str().to_string(),
        None => style("outside").dim().to_string(),
    }
}

fn format_permissions(flags: PermissionFlags) -> String {
    let mode = flags.to_mode_string();
    if flags.can_write() {
        style(mode).green().to_string()
    } else if flags.can_read() {
        style(mode).yellow().to_string()
    } else {
        style(mode).red().to_string()
    }
}

fn read_stdin() -> FsResult<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Access")]
    access: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Tabled)]
struct RootEntry {
    #[tabled(rename = "Root")]
    kind: &'static str,
    #[tabled(rename = "Access")]
    access: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// Show file/directory information
pub async fn info(fs: &FileSystem, path: &str, md5: bool) -> FsResult<()> {
    let uri = parse_path(path)?;
    let info = fs.get_info(&uri, &InfoOptions { md5, size: true }).await?;

    println!("  URI: {}", info.uri);
    if !info.exists {
        println!("  Exists: {}", style("no").red());
        return Ok(());
    }
    println!("  Type: {}", if info.is_directory { "directory" } else { "file" });
    if let Some(size) = info.size {
        println!("  Size: {} ({})", size, bytesize::ByteSize(size));
    }
    if info.modification_time.is_some() {
        println!("  Modified: {}", format_time(info.modification_time));
    }
    if let Some(hash) = &info.md5 {
        println!("  MD5: {hash}");
    }
    println!("  Access: {}", format_permissions(fs.permissions_for_uri(&uri)));

    Ok(())
}

/// Copy files or directory trees
pub async fn cp(fs: &FileSystem, source: &str, dest: &str) -> FsResult<()> {
    let from = parse_path(source)?;
    let to = parse_path(dest)?;
    fs.copy(&from, &to).await?;
    println!("Copied {source} -> {dest}");
    Ok(())
}

/// Move/rename files
pub async fn mv(fs: &FileSystem, source: &str, dest: &str) -> FsResult<()> {
    let from = parse_path(source)?;
    let to = parse_path(dest)?;
    fs.move_entry(&from, &to).await?;
    println!("Moved {source} -> {dest}");
    Ok(())
}

/// Remove files or directories
pub async fn rm(fs: &FileSystem, paths: &[String], force: bool) -> FsResult<()> {
    let options = DeleteOptions { idempotent: force };
    for path in paths {
        fs.delete(&parse_path(path)?, &options).await?;
        println!("Removed {path}");
    }
    Ok(())
}

/// Create directories
pub async fn mkdir(fs: &FileSystem, paths: &[String], parents: bool) -> FsResult<()> {
    let options = MakeDirectoryOptions {
        intermediates: parents,
    };
    for path in paths {
        fs.make_directory(&parse_path(path)?, &options).await?;
        println!("Created {path}");
    }
    Ok(())
}

/// List directory contents
pub async fn ls(
    fs: &FileSystem,
    path: Option<&str>,
    long: bool,
    all: bool,
    human: bool,
) -> FsResult<()> {
    let dir = match path {
        Some(p) => parse_path(p)?,
        None => FileUri::from_path(fs.document_directory()),
    };

    let names: Vec<String> = fs
        .read_directory(&dir)
        .await?
        .into_iter()
        .filter(|n| all || !n.starts_with('.'))
        .collect();

    if names.is_empty() {
        println!("(empty directory)");
        return Ok(());
    }

    if !long {
        for name in names {
            println!("{name}");
        }
        return Ok(());
    }

    let options = InfoOptions::default();
    let infos = futures::future::try_join_all(
        names.iter().map(|name| {
            let uri = dir.join(name);
            async move { fs.get_info(&uri, &options).await.map(|info| (uri, info)) }
        }),
    )
    .await?;

    let entries: Vec<LsEntry> = names
        .into_iter()
        .zip(infos)
        .map(|(name, (uri, info))| LsEntry {
            kind: format_kind(&info),
            access: format_permissions(fs.permissions_for_uri(&uri)),
            size: format_size(info.size, human),
            modified: format_time(info.modification_time),
            name,
        })
        .collect();

    println!("{}", Table::new(entries));
    Ok(())
}

/// Display file contents
pub async fn cat(
    fs: &FileSystem,
    path: &str,
    base64: bool,
    position: Option<u64>,
    length: Option<u64>,
) -> FsResult<()> {
    let windowed = position.is_some() || length.is_some();
    let options = ReadOptions {
        encoding: if base64 || windowed {
            Encoding::Base64
        } else {
            Encoding::Utf8
        },
        position,
        length,
    };

    let contents = fs.read_as_string(&parse_path(path)?, &options).await?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(contents.as_bytes())?;
    if options.encoding == Encoding::Base64 {
        writeln!(stdout)?;
    }
    Ok(())
}

/// Write a file from an argument or stdin
pub async fn write(
    fs: &FileSystem,
    path: &str,
    contents: Option<String>,
    base64: bool,
) -> FsResult<()> {
    let contents = match contents {
        Some(c) => c,
        None => String::from_utf8(read_stdin()?)
            .map_err(|e| FsError::Encoding(format!("stdin is not UTF-8: {e}")))?,
    };
    let options = WriteOptions {
        encoding: if base64 { Encoding::Base64 } else { Encoding::Utf8 },
    };
    fs.write_as_string(&parse_path(path)?, &contents, &options).await?;
    println!("Wrote {path}");
    Ok(())
}

/// Show the access granted for each path
pub fn perms(fs: &FileSystem, paths: &[String]) -> FsResult<()> {
    for path in paths {
        let uri = parse_path(path)?;
        let zone = fs.roots().classify(uri.path());
        println!(
            "{}  {:<8}  {}",
            format_permissions(fs.permissions_for_uri(&uri)),
            format_zone(zone),
            uri.path().display()
        );
    }
    Ok(())
}

/// Print a unique path inside a directory
pub fn genpath(fs: &FileSystem, dir: Option<&str>, ext: &str, create: bool) -> FsResult<()> {
    let dir = match dir {
        Some(d) => parse_path(d)?.into_path(),
        None => fs.caches_directory().to_path_buf(),
    };
    if create && !fs.ensure_dir_exists(&dir) {
        return Err(FsError::NotADirectory(dir));
    }
    println!("{}", fs.generate_path_in_directory(&dir, ext).display());
    Ok(())
}

/// Hash a file or stdin
pub async fn md5(fs: &FileSystem, path: Option<&str>) -> FsResult<()> {
    let (digest, label) = match path {
        None | Some("-") => (FileSystem::md5(&read_stdin()?), "-".to_string()),
        Some(p) => (file_md5(fs, &parse_path(p)?).await?, p.to_string()),
    };
    println!("{digest}  {label}");
    Ok(())
}

/// Digest a file through the facade so root permissions apply.
async fn file_md5(fs: &FileSystem, uri: &FileUri) -> FsResult<String> {
    let options = InfoOptions {
        md5: true,
        ..Default::default()
    };
    let info = fs.get_info(uri, &options).await?;
    if !info.exists {
        return Err(FsError::NotFound(uri.path().to_path_buf()));
    }
    info.md5
        .ok_or_else(|| FsError::IsADirectory(uri.path().to_path_buf()))
}

/// Show storage space information
pub async fn df(fs: &FileSystem) -> FsResult<()> {
    let total = fs.total_disk_capacity().await?;
    let avail = fs.free_disk_storage().await?;
    let used = total.saturating_sub(avail);

    println!("Storage for {}", fs.document_directory().display());
    println!("  Total:     {}", bytesize::ByteSize(total));
    if total > 0 {
        let pct = (used as f64 / total as f64) * 100.0;
        println!("  Used:      {} ({:.1}%)", bytesize::ByteSize(used), pct);
    }
    println!("  Available: {}", bytesize::ByteSize(avail));
    Ok(())
}

/// Show the resolved roots
pub fn roots(fs: &FileSystem) -> FsResult<()> {
    let entries: Vec<RootEntry> = [RootKind::Document, RootKind::Caches, RootKind::Bundle]
        .into_iter()
        .map(|kind| RootEntry {
            kind: kind.as_str(),
            access: kind.permissions().to_mode_string(),
            path: fs.roots().get(kind).display().to_string(),
        })
        .collect();
    println!("{}", Table::new(entries));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(Some(1024), false), "1024");
        assert_eq!(format_size(None, true), "-");
        assert_ne!(format_size(Some(2048), true), "2048");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(None), "-");
        assert_eq!(format_time(Some(0.0)), "1970-01-01 00:00");
        assert_eq!(format_time(Some(86_400.9)), "1970-01-02 00:00");
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("/tmp/a/../b").unwrap().path(), Path::new("/tmp/b"));
        assert_eq!(parse_path("file:///tmp/x").unwrap().path(), Path::new("/tmp/x"));
        assert!(matches!(
            parse_path("https://example.com/x"),
            Err(FsError::Unsupported(_))
        ));
        let rel = parse_path("some/file").unwrap();
        assert!(rel.path().is_absolute());
        assert!(rel.path().ends_with("some/file"));
    }

    #[test]
    fn test_init_facade_from_flags() {
        let dir = tempfile::tempdir().unwrap();
        let args = RootArgs {
            document_dir: Some(dir.path().join("docs")),
            caches_dir: Some(dir.path().join("caches")),
            bundle_dir: Some(dir.path().join("bundle")),
            ..Default::default()
        };
        let fs = init_facade(&args).unwrap();
        assert_eq!(fs.document_directory(), dir.path().join("docs"));
        assert_eq!(
            fs.permissions_for_path(&dir.path().join("bundle/app.js")),
            PermissionFlags::READ
        );
    }

    #[tokio::test]
    async fn test_file_md5_respects_roots() {
        let dir = tempfile::tempdir().unwrap();
        let args = RootArgs {
            document_dir: Some(dir.path().join("docs")),
            caches_dir: Some(dir.path().join("caches")),
            bundle_dir: Some(dir.path().join("bundle")),
            ..Default::default()
        };
        let fs = init_facade(&args).unwrap();
        std::fs::create_dir_all(fs.document_directory()).unwrap();

        let inside = FileUri::from_path(fs.document_directory().join("hello.txt"));
        std::fs::write(inside.path(), b"hello").unwrap();
        assert_eq!(
            file_md5(&fs, &inside).await.unwrap(),
            "5d41402abc4b2a76b9719d911017c592"
        );

        let outside = FileUri::from_path(dir.path().join("secret.txt"));
        std::fs::write(outside.path(), b"secret").unwrap();
        let err = file_md5(&fs, &outside).await.unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));

        let missing = FileUri::from_path(fs.document_directory().join("gone.txt"));
        assert!(file_md5(&fs, &missing).await.unwrap_err().is_not_found());

        let folder = FileUri::from_path(fs.document_directory());
        let err = file_md5(&fs, &folder).await.unwrap_err();
        assert!(matches!(err, FsError::IsADirectory(_)));
    }

    #[test]
    fn test_init_facade_config_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("fsgate.toml");
        std::fs::write(
            &config,
            format!(
                "[roots]\ndocument = {:?}\ncaches = {:?}\nbundle = {:?}\n",
                dir.path().join("d"),
                dir.path().join("c"),
                dir.path().join("b"),
            ),
        )
        .unwrap();
        let args = RootArgs {
            config: Some(config),
            caches_dir: Some(dir.path().join("override")),
            ..Default::default()
        };
        let fs = init_facade(&args).unwrap();
        assert_eq!(fs.document_directory(), dir.path().join("d"));
        assert_eq!(fs.caches_directory(), dir.path().join("override"));
    }
}
