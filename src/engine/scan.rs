use crate::engine::language::Language;
use crate::model::FileRecord;
use anyhow::{Context, Result};
use blake3::Hasher;
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// One file discovered by a repository walk, with enough metadata for
/// consumers to key results and detect unchanged files.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub hash: String,
    pub size: i64,
    pub language: Language,
}

impl ScannedFile {
    pub fn to_record(&self) -> FileRecord {
        FileRecord {
            path: self.rel_path.clone(),
            language: self.language.id().to_string(),
            hash: self.hash.clone(),
            size: self.size,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

pub fn scan_repo(repo_root: &Path) -> Result<Vec<ScannedFile>> {
    scan_repo_with_options(repo_root, ScanOptions::default())
}

/// Walk the repository and collect every file with a recognized extension,
/// sorted by relative path. Files without a known extension are skipped
/// here; the header-language fallback only applies to explicitly requested
/// single files.
pub fn scan_repo_with_options(repo_root: &Path, options: ScanOptions) -> Result<Vec<ScannedFile>> {
    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(repo_root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                eprintln!("srcgraph: walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let Some(language) = Language::from_path(path) else {
            continue;
        };
        let rel_path = crate::util::normalize_rel_path(repo_root, path)?;
        let size = fs::metadata(path)?.len() as i64;
        let hash = hash_file(path).with_context(|| format!("hash {}", path.display()))?;
        files.push(ScannedFile {
            rel_path,
            abs_path: path.to_path_buf(),
            hash,
            size,
            language,
        });
    }
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    entry.file_name() == OsStr::new(".git")
}

/// Scan a single path. Returns `None` for directories and files whose
/// extension maps to no supported language.
pub fn scan_path(repo_root: &Path, path: &Path) -> Result<Option<ScannedFile>> {
    if !path.is_file() {
        return Ok(None);
    }
    let Some(language) = Language::from_path(path) else {
        return Ok(None);
    };
    let rel_path = match crate::util::normalize_rel_path(repo_root, path) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let size = fs::metadata(path)?.len() as i64;
    let hash = hash_file(path).with_context(|| format!("hash {}", path.display()))?;
    Ok(Some(ScannedFile {
        rel_path,
        abs_path: path.to_path_buf(),
        hash,
        size,
        language,
    }))
}

fn hash_file(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    let mut hasher = Hasher::new();
    hasher.update(&data);
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_collects_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not code\n").unwrap();

        let files = scan_repo(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].rel_path, "a.rs");
        assert_eq!(files[0].language, Language::Rust);
        assert_eq!(files[1].rel_path, "b.py");
        assert!(!files[0].hash.is_empty());
    }

    #[test]
    fn scan_path_skips_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text\n").unwrap();
        assert!(scan_path(dir.path(), &path).unwrap().is_none());
    }

    #[test]
    fn identical_content_hashes_identically() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("b.py");
        std::fs::write(&a, "x = 1\n").unwrap();
        std::fs::write(&b, "x = 1\n").unwrap();
        let fa = scan_path(dir.path(), &a).unwrap().unwrap();
        let fb = scan_path(dir.path(), &b).unwrap().unwrap();
        assert_eq!(fa.hash, fb.hash);
        assert_eq!(fa.size, 6);
    }
}
