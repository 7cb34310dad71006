use crate::engine::language::Language;
use crate::model::SpanRecord;
use std::collections::BTreeMap;
use tree_sitter::{Node, Tree};

/// One captured structural span. Carries a live syntax-tree node handle,
/// scoped to the parse call that produced the tree, so callers can keep
/// traversing (e.g. to derive a return type) without re-parsing. Never
/// stored beyond the extraction pass.
#[derive(Debug, Clone)]
pub struct StructuralSpan<'tree> {
    pub content: String,
    pub start_line: i64,
    pub end_line: i64,
    pub start_column: i64,
    pub end_column: i64,
    pub raw_kind: &'static str,
    pub filename: String,
    pub node: Node<'tree>,
}

impl StructuralSpan<'_> {
    pub fn to_record(&self) -> SpanRecord {
        SpanRecord {
            content: self.content.clone(),
            start_line: self.start_line,
            end_line: self.end_line,
            start_position: self.start_column,
            end_position: self.end_column,
            kind: self.raw_kind.to_string(),
            filename: self.filename.clone(),
        }
    }
}

pub type SpanBuckets<'tree> = BTreeMap<&'static str, Vec<StructuralSpan<'tree>>>;

/// Walk a parsed tree once and bucket every captured node by raw kind, and
/// additionally by canonical kind where the language's adapter table maps
/// it. The traversal is cursor-based rather than recursive so deep trees
/// cannot overflow the stack; every node is visited exactly once.
pub fn normalize<'tree>(
    tree: &'tree Tree,
    source: &str,
    filename: &str,
    language: Language,
) -> SpanBuckets<'tree> {
    let capture = language.capture_kinds();
    let mut buckets: SpanBuckets<'tree> = BTreeMap::new();

    let mut cursor = tree.root_node().walk();
    loop {
        let node = cursor.node();
        let raw_kind = node.kind();
        if let Ok(idx) = capture.binary_search(&raw_kind) {
            let span = make_span(node, capture[idx], source, filename);
            if let Some(canonical) = language.canonical_kind(raw_kind) {
                buckets.entry(canonical).or_default().push(span.clone());
            }
            buckets.entry(capture[idx]).or_default().push(span);
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return buckets;
            }
        }
    }
}

/// Serializable projection of the buckets, for callers that outlive the tree.
pub fn bucket_records(buckets: &SpanBuckets<'_>) -> BTreeMap<String, Vec<SpanRecord>> {
    buckets
        .iter()
        .map(|(kind, spans)| {
            (
                kind.to_string(),
                spans.iter().map(StructuralSpan::to_record).collect(),
            )
        })
        .collect()
}

fn make_span<'tree>(
    node: Node<'tree>,
    raw_kind: &'static str,
    source: &str,
    filename: &str,
) -> StructuralSpan<'tree> {
    let start = node.start_position();
    let end = node.end_position();
    StructuralSpan {
        content: node_text(node, source),
        start_line: start.row as i64 + 1,
        end_line: end.row as i64 + 1,
        start_column: start.column as i64,
        end_column: end.column as i64,
        raw_kind,
        filename: filename.to_string(),
        node,
    }
}

pub fn node_text(node: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::language::{CLASS_DEFINITION, FUNCTION_DEFINITION, PARAMETER_LIST};

    fn parse(language: Language, source: &str) -> Tree {
        let mut parser = language.parser().unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn python_function_normalizes_once() {
        let source = "def greet(name):\n    return name\n";
        let tree = parse(Language::Python, source);
        let buckets = normalize(&tree, source, "greet.py", Language::Python);

        // Raw kind equals the canonical name, so the span appears exactly
        // once in the function_definition bucket.
        let functions = buckets.get(FUNCTION_DEFINITION).unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].start_line, 1);
        assert_eq!(functions[0].filename, "greet.py");

        let params = buckets.get(PARAMETER_LIST).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].content, "(name)");
        assert_eq!(buckets.get("parameters").unwrap().len(), 1);
    }

    #[test]
    fn rust_function_item_dual_bucketed() {
        let source = "fn add(a: i64, b: i64) -> i64 { a + b }\n";
        let tree = parse(Language::Rust, source);
        let buckets = normalize(&tree, source, "add.rs", Language::Rust);

        assert_eq!(buckets.get("function_item").unwrap().len(), 1);
        assert_eq!(buckets.get(FUNCTION_DEFINITION).unwrap().len(), 1);
        assert_eq!(
            buckets.get(FUNCTION_DEFINITION).unwrap()[0].raw_kind,
            "function_item"
        );
    }

    #[test]
    fn normalization_is_deterministic() {
        let source = "class A:\n    def m(self):\n        pass\n";
        let tree = parse(Language::Python, source);
        let first = bucket_records(&normalize(&tree, source, "a.py", Language::Python));
        let second = bucket_records(&normalize(&tree, source, "a.py", Language::Python));
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.get(CLASS_DEFINITION).unwrap().len(), 1);
    }

    #[test]
    fn span_node_handle_traversable() {
        let source = "def f(x):\n    pass\n";
        let tree = parse(Language::Python, source);
        let buckets = normalize(&tree, source, "f.py", Language::Python);
        let function = &buckets.get(FUNCTION_DEFINITION).unwrap()[0];
        let name = function.node.child_by_field_name("name").unwrap();
        assert_eq!(node_text(name, source), "f");
    }
}
