use serde::Serialize;
use std::collections::BTreeMap;

/// One normalized structural span, in the wire shape consumed by the external
/// entity store. `type` carries the raw grammar kind; canonical buckets are
/// the map keys in [`FileAnalysis::spans`], not a field here.
#[derive(Debug, Serialize, Clone)]
pub struct SpanRecord {
    pub content: String,
    pub start_line: i64,
    pub end_line: i64,
    pub start_position: i64,
    pub end_position: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    Function,
    Class,
    Parameter,
    Variable,
    Field,
    Import,
}

/// One classified use of a name. Classification is local to the identifier's
/// immediate parent-chain shape; no cross-file state is consulted.
#[derive(Debug, Serialize, Clone)]
pub struct IdentifierOccurrence {
    pub symbol: String,
    pub symbol_type: SymbolType,
    pub filename: String,
    pub line: i64,
    pub column_start: i64,
    pub column_end: i64,
    pub context: String,
    pub is_definition: bool,
    pub is_write: bool,
    pub node_type: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Extends,
    Implements,
    Embeds,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ParentRelationship {
    pub parent_symbol: String,
    pub relationship_type: RelationshipType,
}

/// One defining type and its named parents. `relationships` may be empty: a
/// type declared with no parents is still emitted.
#[derive(Debug, Serialize, Clone)]
pub struct InheritanceRelationship {
    pub class_name: String,
    #[serde(rename = "class_type")]
    pub class_kind: String,
    pub filename: String,
    pub line: i64,
    pub context: String,
    pub is_abstract: bool,
    pub relationships: Vec<ParentRelationship>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowNodeKind {
    Decision,
    Loop,
    Process,
    Return,
    Connector,
}

#[derive(Debug, Serialize, Clone)]
pub struct FlowNode {
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: FlowNodeKind,
    pub label: String,
    pub line: i64,
    pub end_line: i64,
    pub source_snippet: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub invisible: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct FlowEdge {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

/// Ephemeral per-function control-flow graph, rebuilt on every request and
/// discarded after serialization.
#[derive(Debug, Serialize, Default)]
pub struct ControlFlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Ok,
    ParseFailed,
}

/// File metadata handed to the external store alongside the extraction
/// output, so consumers can key results and detect unchanged files.
#[derive(Debug, Serialize, Clone)]
pub struct FileRecord {
    pub path: String,
    pub language: String,
    pub hash: String,
    pub size: i64,
}

/// Full extraction output for one file: normalized span buckets keyed by kind
/// name (raw and canonical), identifier occurrences, and inheritance edges.
#[derive(Debug, Serialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub language: String,
    pub status: AnalysisStatus,
    pub spans: BTreeMap<String, Vec<SpanRecord>>,
    pub occurrences: Vec<IdentifierOccurrence>,
    pub inheritance: Vec<InheritanceRelationship>,
}

impl FileAnalysis {
    pub fn parse_failed(filename: &str, language: &str) -> Self {
        Self {
            filename: filename.to_string(),
            language: language.to_string(),
            status: AnalysisStatus::ParseFailed,
            spans: BTreeMap::new(),
            occurrences: Vec::new(),
            inheritance: Vec::new(),
        }
    }

    pub fn span_count(&self) -> usize {
        self.spans.values().map(|bucket| bucket.len()).sum()
    }
}

#[derive(Debug, Serialize, Default)]
pub struct AnalyzeStats {
    pub scanned: usize,
    pub parsed: usize,
    pub failed: usize,
    pub spans: usize,
    pub occurrences: usize,
    pub relationships: usize,
    pub duration_ms: u64,
}
