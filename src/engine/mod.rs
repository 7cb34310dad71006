pub mod cfg;
pub mod inheritance;
pub mod language;
pub mod pool;
pub mod scan;
pub mod symbols;
pub mod walker;

use crate::config::Config;
use crate::model::FileAnalysis;
use crate::util::{read_to_string, LineIndex};
use anyhow::{bail, Result};
use language::Language;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Parser;

/// Per-thread analysis engine. Owns one parser per language, created lazily
/// and reused across files; parsers hold grammar state and are cheap to keep
/// but not to rebuild.
pub struct Engine {
    parsers: HashMap<Language, Parser>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    fn parser_for(&mut self, language: Language) -> Result<&mut Parser> {
        match self.parsers.entry(language) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(language.parser()?)),
        }
    }

    /// Run the full single-file pipeline: parse, normalize spans, classify
    /// identifiers, extract inheritance. A grammar-level parse failure is
    /// not an error; it yields a `parse_failed` analysis so batch callers
    /// can skip and continue.
    pub fn analyze_source(
        &mut self,
        source: &str,
        filename: &str,
        language: Language,
    ) -> Result<FileAnalysis> {
        let parser = self.parser_for(language)?;
        let Some(tree) = parser.parse(source, None) else {
            eprintln!("srcgraph: parse failed for {filename} ({})", language.id());
            return Ok(FileAnalysis::parse_failed(filename, language.id()));
        };

        let lines = LineIndex::new(source);
        let buckets = walker::normalize(&tree, source, filename, language);
        let spans = walker::bucket_records(&buckets);
        let occurrences = symbols::classify_identifiers(&tree, source, filename, language, &lines);
        let inheritance =
            inheritance::extract_inheritance(&tree, source, filename, language, &lines);

        Ok(FileAnalysis {
            filename: filename.to_string(),
            language: language.id().to_string(),
            status: crate::model::AnalysisStatus::Ok,
            spans,
            occurrences,
            inheritance,
        })
    }

    /// Analyze a file on disk. `relative` is the path recorded in the
    /// output; language is inferred from the filename, falling back to the
    /// configured default grammar for unknown extensions.
    pub fn analyze_file(&mut self, absolute: &Path, relative: &str) -> Result<FileAnalysis> {
        let metadata = std::fs::metadata(absolute)?;
        let max_bytes = Config::get().max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            bail!(
                "{relative}: file is {} bytes, over the {max_bytes} byte limit",
                metadata.len()
            );
        }
        let source = read_to_string(absolute)?;
        let language = Language::from_filename_lossy(relative);
        self.analyze_source(&source, relative, language)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnalysisStatus;

    #[test]
    fn analyze_source_runs_full_pipeline() {
        let mut engine = Engine::new();
        let source = "class Animal:\n    def speak(self):\n        return 1\n";
        let analysis = engine
            .analyze_source(source, "animal.py", Language::Python)
            .unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Ok);
        assert_eq!(analysis.language, "python");
        assert!(analysis.span_count() > 0);
        assert!(analysis.occurrences.iter().any(|occ| occ.symbol == "speak"));
        assert_eq!(analysis.inheritance.len(), 1);
        assert_eq!(analysis.inheritance[0].class_name, "Animal");
    }

    #[test]
    fn parsers_are_reused_across_files() {
        let mut engine = Engine::new();
        engine
            .analyze_source("x = 1\n", "a.py", Language::Python)
            .unwrap();
        engine
            .analyze_source("y = 2\n", "b.py", Language::Python)
            .unwrap();
        assert_eq!(engine.parsers.len(), 1);
    }

    #[test]
    fn unknown_extension_falls_back_to_header_language() {
        let mut engine = Engine::new();
        // Valid C, so the fallback grammar produces a clean tree.
        let analysis = engine
            .analyze_source("int x = 1;\n", "data.bin", Language::from_filename_lossy("data.bin"))
            .unwrap();
        assert_eq!(analysis.status, AnalysisStatus::Ok);
    }
}
