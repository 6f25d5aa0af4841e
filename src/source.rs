//! Source packaging for Agent Engine deployments
//!
//! The source directory is shipped inline as a base64 gzip tarball rooted
//! at the directory's own name.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Environment file read for deployment env vars
pub const ENV_FILE: &str = ".env";

/// An archived source directory
#[derive(Debug, Clone)]
pub struct SourceArchive {
    /// Directory name used as the archive root and module prefix
    pub module_dirname: String,
    /// base64 of the `.tar.gz`
    pub encoded: String,
    /// Files written into the archive
    pub file_count: usize,
}

/// Name of the directory itself, after resolving `.` and symlinks
pub fn module_dirname(source_dir: &Path) -> Result<String> {
    let resolved = source_dir.canonicalize().map_err(|e| {
        Error::validation(format!("source dir {}: {}", source_dir.display(), e))
    })?;
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::validation(format!("source dir {} has no name", resolved.display())))
}

/// Pack `source_dir` into a base64 `.tar.gz`. With `exclude_env` the
/// top-level `.env` stays out of the archive.
pub fn package_source(source_dir: &Path, exclude_env: bool) -> Result<SourceArchive> {
    if !source_dir.is_dir() {
        return Err(Error::validation(format!(
            "source dir {} is not a directory",
            source_dir.display()
        )));
    }

    let module_dirname = module_dirname(source_dir)?;
    tracing::info!("Creating in-memory tarball of {}", source_dir.display());

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut file_count = 0;

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::validation(e.to_string()))?;

        if exclude_env && relative == Path::new(ENV_FILE) {
            tracing::debug!("Skipping {} in archive", ENV_FILE);
            continue;
        }

        let archive_path: PathBuf = Path::new(&module_dirname).join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            builder.append_dir(&archive_path, entry.path())?;
        } else if file_type.is_file() {
            builder.append_path_with_name(entry.path(), &archive_path)?;
            file_count += 1;
        }
    }

    let encoder = builder.into_inner()?;
    let bytes = encoder.finish()?;

    Ok(SourceArchive {
        module_dirname,
        encoded: STANDARD.encode(bytes),
        file_count,
    })
}

/// Parse `KEY=VALUE` lines of a dotenv file, keeping file order
pub fn parse_env(content: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            tracing::warn!("Ignoring malformed {} line", ENV_FILE);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.push((key.to_string(), unquote(value.trim())));
    }

    vars
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote) {
            if let Some(end) = inner.find(quote) {
                return inner[..end].to_string();
            }
        }
    }

    // Unquoted: drop an inline comment
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Read `<source_dir>/.env`; a missing file yields no variables
pub fn read_env_file(source_dir: &Path) -> Result<Vec<(String, String)>> {
    let path = source_dir.join(ENV_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(parse_env(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {} in {}", ENV_FILE, source_dir.display());
            Ok(Vec::new())
        }
        Err(e) => Err(Error::validation(format!("cannot read {}: {}", path.display(), e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_parse_env_variants() {
        let content = r#"
# comment
GOOGLE_CLOUD_PROJECT=my-project
export MODEL="gemini-2.5-flash"
GREETING='hello # not a comment'
TIMEOUT=30 # seconds
EMPTY=
not a pair
"#;
        assert_eq!(
            parse_env(content),
            vec![
                ("GOOGLE_CLOUD_PROJECT".to_string(), "my-project".to_string()),
                ("MODEL".to_string(), "gemini-2.5-flash".to_string()),
                ("GREETING".to_string(), "hello # not a comment".to_string()),
                ("TIMEOUT".to_string(), "30".to_string()),
                ("EMPTY".to_string(), "".to_string()),
            ]
        );
    }

    fn archive_entries(encoded: &str) -> Vec<String> {
        let bytes = STANDARD.decode(encoded).unwrap();
        let mut tar_bytes = Vec::new();
        GzDecoder::new(&bytes[..]).read_to_end(&mut tar_bytes).unwrap();
        let mut archive = tar::Archive::new(&tar_bytes[..]);
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().trim_end_matches('/').to_string())
            .collect()
    }

    #[test]
    fn test_package_source_excludes_top_level_env() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("my_agent");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("agent.py"), "app = None\n").unwrap();
        std::fs::write(src.join(".env"), "A=1\n").unwrap();
        std::fs::write(src.join("sub").join(".env"), "B=2\n").unwrap();

        let archive = package_source(&src, true).unwrap();
        assert_eq!(archive.module_dirname, "my_agent");
        assert_eq!(archive.file_count, 2);

        let entries = archive_entries(&archive.encoded);
        assert!(entries.contains(&"my_agent/agent.py".to_string()));
        assert!(entries.contains(&"my_agent/sub/.env".to_string()));
        assert!(!entries.contains(&"my_agent/.env".to_string()));
    }

    #[test]
    fn test_package_source_keeps_env_when_asked() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("agent_src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join(".env"), "A=1\n").unwrap();

        let archive = package_source(&src, false).unwrap();
        assert!(archive_entries(&archive.encoded).contains(&"agent_src/.env".to_string()));
    }

    #[test]
    fn test_read_env_file_missing_is_empty() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("agent.py"), "app = None\n").unwrap();
        assert!(read_env_file(root.path()).unwrap().is_empty());

        std::fs::write(root.path().join(ENV_FILE), "A=1\n").unwrap();
        assert_eq!(read_env_file(root.path()).unwrap(), vec![("A".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_read_env_file_unreadable_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join(ENV_FILE)).unwrap();
        assert!(matches!(read_env_file(root.path()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_package_source_rejects_missing_dir() {
        let err = package_source(Path::new("/definitely/not/here"), true).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
