use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path};

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

pub fn normalize_rel_path(repo_root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(repo_root).with_context(|| {
        format!(
            "strip prefix {} from {}",
            repo_root.display(),
            path.display()
        )
    })?;
    Ok(normalize_path(rel))
}

pub fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

pub fn slice_lines(content: &str, start_line: i64, end_line: i64) -> String {
    if content.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = (start_line.max(1) - 1) as usize;
    let mut end = end_line.max(1) as usize;
    if start >= lines.len() {
        return String::new();
    }
    if end > lines.len() {
        end = lines.len();
    }
    if end <= start {
        end = start + 1;
    }
    lines[start..end].join("\n")
}

pub fn truncate_str_bytes(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes.min(value.len());
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Precomputed byte offsets of every line start, owned by the caller of a
/// single file's extraction pass so line lookups never re-split the source.
#[derive(Debug)]
pub struct LineIndex {
    offsets: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut offsets = vec![0];
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                offsets.push(idx + 1);
            }
        }
        Self {
            offsets,
            len: source.len(),
        }
    }

    /// Raw text of a 1-based line, without its trailing newline.
    pub fn line_text<'a>(&self, source: &'a str, line: i64) -> &'a str {
        if line < 1 || line as usize > self.offsets.len() {
            return "";
        }
        let idx = (line - 1) as usize;
        let start = self.offsets[idx];
        let end = self
            .offsets
            .get(idx + 1)
            .map(|next| next.saturating_sub(1))
            .unwrap_or(self.len);
        source.get(start..end).unwrap_or("").trim_end_matches('\r')
    }

    /// Trimmed context line used in occurrence and inheritance records.
    pub fn context_line(&self, source: &str, line: i64) -> String {
        self.line_text(source, line).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_lookup() {
        let source = "first\nsecond\n\nfourth";
        let index = LineIndex::new(source);
        assert_eq!(index.line_text(source, 1), "first");
        assert_eq!(index.line_text(source, 2), "second");
        assert_eq!(index.line_text(source, 3), "");
        assert_eq!(index.line_text(source, 4), "fourth");
        assert_eq!(index.line_text(source, 5), "");
        assert_eq!(index.line_text(source, 0), "");
    }

    #[test]
    fn context_line_trims() {
        let source = "    if x > 0:\n        pass\n";
        let index = LineIndex::new(source);
        assert_eq!(index.context_line(source, 1), "if x > 0:");
        assert_eq!(index.context_line(source, 2), "pass");
    }

    #[test]
    fn slice_lines_clamps_range() {
        let content = "a\nb\nc";
        assert_eq!(slice_lines(content, 1, 2), "a\nb");
        assert_eq!(slice_lines(content, 2, 99), "b\nc");
        assert_eq!(slice_lines(content, 99, 100), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_str_bytes("héllo", 2), "h");
        assert_eq!(truncate_str_bytes("abc", 10), "abc");
    }
}
