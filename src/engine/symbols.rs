use crate::engine::language::Language;
use crate::engine::walker::node_text;
use crate::model::{IdentifierOccurrence, SymbolType};
use crate::util::LineIndex;
use tree_sitter::{Node, Tree};

/// Classify every identifier-like node in the tree by the shape of its
/// immediate parent. The rules are intentionally local and context-only:
/// they avoid whole-program binding, trading some recall for speed and
/// independence from cross-file state.
pub fn classify_identifiers(
    tree: &Tree,
    source: &str,
    filename: &str,
    language: Language,
    lines: &LineIndex,
) -> Vec<IdentifierOccurrence> {
    let identifier_kinds = language.identifier_kinds();
    if identifier_kinds.is_empty() {
        return Vec::new();
    }

    let mut occurrences = Vec::new();
    let mut cursor = tree.root_node().walk();
    loop {
        let node = cursor.node();
        if identifier_kinds.contains(&node.kind()) {
            let symbol = node_text(node, source);
            if !symbol.is_empty() {
                occurrences.push(classify(node, symbol, source, filename, language, lines));
            }
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return occurrences;
            }
        }
    }
}

/// Ordered classification rules, evaluated in precedence order:
/// function name > type name > parameter > variable > field access >
/// import > call target > default variable reference.
fn classify(
    node: Node<'_>,
    symbol: String,
    source: &str,
    filename: &str,
    language: Language,
    lines: &LineIndex,
) -> IdentifierOccurrence {
    let (symbol_type, is_definition, is_write) = match node.parent() {
        Some(parent) => classify_by_parent(node, parent, language),
        None => (SymbolType::Variable, false, false),
    };

    let start = node.start_position();
    let end = node.end_position();
    let line = start.row as i64 + 1;
    IdentifierOccurrence {
        symbol,
        symbol_type,
        filename: filename.to_string(),
        line,
        column_start: start.column as i64,
        column_end: end.column as i64,
        context: lines.context_line(source, line),
        is_definition,
        is_write,
        node_type: node.kind().to_string(),
    }
}

fn classify_by_parent(
    node: Node<'_>,
    parent: Node<'_>,
    language: Language,
) -> (SymbolType, bool, bool) {
    let parent_kind = parent.kind();

    // (1) declared function name
    if language.function_name_parent_kinds().contains(&parent_kind)
        && is_name_child(node, parent)
    {
        return (SymbolType::Function, true, false);
    }

    // (2) declared type name
    if language.type_name_parent_kinds().contains(&parent_kind) && is_name_child(node, parent) {
        return (SymbolType::Class, true, false);
    }

    // (3) parameter position
    if language.parameter_parent_kinds().contains(&parent_kind) {
        return (SymbolType::Parameter, true, false);
    }

    // (4) variable declaration or assignment: definition+write iff this
    // identifier is the left-hand-side target, otherwise a plain read.
    // Go wraps both sides of `:=` and `=` in an expression_list, so the
    // assignment shape sits one level up.
    let assignment_parent = if language.assignment_parent_kinds().contains(&parent_kind) {
        Some(parent)
    } else if parent_kind == "expression_list" {
        parent
            .parent()
            .filter(|gp| language.assignment_parent_kinds().contains(&gp.kind()))
    } else {
        None
    };
    if let Some(assignment) = assignment_parent {
        return if is_assignment_target(node, assignment) {
            (SymbolType::Variable, true, true)
        } else {
            (SymbolType::Variable, false, false)
        };
    }

    // (5) member/attribute/property position of a field access
    for (access_kind, field_name) in language.member_access_parents() {
        if parent_kind == *access_kind {
            if parent
                .child_by_field_name(field_name)
                .is_some_and(|field| field.id() == node.id())
            {
                return (SymbolType::Field, false, false);
            }
            // Object position falls through to the default rule.
            return (SymbolType::Variable, false, false);
        }
    }

    // (6) import clause
    if language.import_parent_kinds().contains(&parent_kind) {
        return (SymbolType::Import, true, false);
    }

    // (7) callee position of a call expression
    for (call_kind, callee_field) in language.call_parents() {
        if parent_kind == *call_kind
            && parent
                .child_by_field_name(callee_field)
                .is_some_and(|callee| callee.id() == node.id())
        {
            return (SymbolType::Function, false, false);
        }
    }

    // (8) default
    (SymbolType::Variable, false, false)
}

/// True when this node sits in the declared-name position of its parent.
/// Grammars with a `name` field use it; otherwise the first identifier-like
/// child counts as the name.
fn is_name_child(node: Node<'_>, parent: Node<'_>) -> bool {
    if let Some(name) = parent.child_by_field_name("name") {
        return name.id() == node.id();
    }
    if let Some(declarator) = parent.child_by_field_name("declarator") {
        return declarator.id() == node.id();
    }
    let mut cursor = parent.walk();
    for child in parent.named_children(&mut cursor) {
        if child.kind().ends_with("identifier") {
            return child.id() == node.id();
        }
    }
    false
}

/// True when the identifier is the write target of an assignment-shaped
/// parent. Declaration forms (`let`, `var_spec`, declarators, Lua variable
/// lists) treat their name position as the target; binary assignment forms
/// compare against the `left` field.
fn is_assignment_target(node: Node<'_>, parent: Node<'_>) -> bool {
    if let Some(left) = parent.child_by_field_name("left") {
        return contains_node(left, node);
    }
    if let Some(name) = parent.child_by_field_name("name") {
        return name.id() == node.id();
    }
    if let Some(pattern) = parent.child_by_field_name("pattern") {
        return contains_node(pattern, node);
    }
    if let Some(declarator) = parent.child_by_field_name("declarator") {
        return declarator.id() == node.id();
    }
    // Lua variable_list: every identifier child is a target.
    parent.kind() == "variable_list"
}

fn contains_node(haystack: Node<'_>, needle: Node<'_>) -> bool {
    if haystack.id() == needle.id() {
        return true;
    }
    let mut cursor = haystack.walk();
    for child in haystack.named_children(&mut cursor) {
        if contains_node(child, needle) {
            return true;
        }
    }
    false
}
