use crate::engine::language::Language;
use crate::engine::walker::node_text;
use crate::model::{InheritanceRelationship, ParentRelationship, RelationshipType};
use crate::util::LineIndex;
use tree_sitter::{Node, Tree};

/// Extract inheritance/implementation edges for every class- or struct-like
/// definition in the tree. Each per-language handler is a pure function over
/// one syntax node; handlers never consult other files or prior results. A
/// definition with no recognized inheritance clause is still emitted with an
/// empty relationship list.
pub fn extract_inheritance(
    tree: &Tree,
    source: &str,
    filename: &str,
    language: Language,
    lines: &LineIndex,
) -> Vec<InheritanceRelationship> {
    let kinds = definition_kinds(language);
    if kinds.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut cursor = tree.root_node().walk();
    loop {
        let node = cursor.node();
        if kinds.contains(&node.kind()) {
            if let Some(record) = extract_definition(node, source, filename, language, lines) {
                out.push(record);
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
                return out;
            }
        }
    }
}

/// Node kinds that carry a type definition worth an inheritance record.
fn definition_kinds(language: Language) -> &'static [&'static str] {
    match language {
        // Rust adds impl blocks: `impl Trait for Type` is where the
        // implements edge lives, not on the struct itself.
        Language::Rust => &["struct_item", "enum_item", "trait_item", "impl_item"],
        _ => language.type_name_parent_kinds(),
    }
}

fn extract_definition(
    node: Node<'_>,
    source: &str,
    filename: &str,
    language: Language,
    lines: &LineIndex,
) -> Option<InheritanceRelationship> {
    // C-family specifiers appear at use sites too (`struct point p;`);
    // only the bodied form is a definition.
    if matches!(
        node.kind(),
        "struct_specifier" | "union_specifier" | "enum_specifier" | "class_specifier"
    ) && node.child_by_field_name("body").is_none()
    {
        return None;
    }
    let class_name = definition_name(node, source, language)?;
    let line = node.start_position().row as i64 + 1;
    let context = lines.context_line(source, line);
    let relationships = parent_relationships(node, source, language);
    let is_abstract = abstract_heuristic(node, &context, language);

    Some(InheritanceRelationship {
        class_name,
        class_kind: node.kind().to_string(),
        filename: filename.to_string(),
        line,
        context,
        is_abstract,
        relationships,
    })
}

fn definition_name(node: Node<'_>, source: &str, language: Language) -> Option<String> {
    // Rust impl blocks name the implementing type, not a `name` field.
    if language == Language::Rust && node.kind() == "impl_item" {
        let ty = node.child_by_field_name("type")?;
        return Some(bare_name(&node_text(ty, source)));
    }
    if let Some(name) = node.child_by_field_name("name") {
        let text = node_text(name, source);
        if !text.is_empty() {
            return Some(bare_name(&text));
        }
    }
    // Fall back to the first identifier-like child (C structs, anonymous
    // grammars without a name field).
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind().ends_with("identifier") {
            let text = node_text(child, source);
            if !text.is_empty() {
                return Some(bare_name(&text));
            }
        }
    }
    None
}

/// Flat per-language dispatch: one handler function per variant, selected by
/// an exhaustive match so a new language cannot skip this stage.
fn parent_relationships(
    node: Node<'_>,
    source: &str,
    language: Language,
) -> Vec<ParentRelationship> {
    match language {
        Language::Python => python_parents(node, source),
        Language::Rust => rust_parents(node, source),
        Language::JavaScript | Language::TypeScript | Language::Tsx => js_parents(node, source),
        Language::Go => go_parents(node, source),
        Language::C => Vec::new(),
        Language::Cpp => cpp_parents(node, source),
        Language::CSharp => csharp_parents(node, source),
        Language::Java => java_parents(node, source),
        Language::Lua => Vec::new(),
    }
}

fn python_parents(node: Node<'_>, source: &str) -> Vec<ParentRelationship> {
    let mut parents = Vec::new();
    let Some(superclasses) = node.child_by_field_name("superclasses") else {
        return parents;
    };
    let mut cursor = superclasses.walk();
    for child in superclasses.named_children(&mut cursor) {
        match child.kind() {
            "identifier" | "attribute" => {
                push_parent(&mut parents, &node_text(child, source), RelationshipType::Extends);
            }
            // keyword arguments (metaclass=...) are not parents
            _ => {}
        }
    }
    parents
}

fn rust_parents(node: Node<'_>, source: &str) -> Vec<ParentRelationship> {
    let mut parents = Vec::new();
    if node.kind() == "impl_item" {
        if let Some(trait_node) = node.child_by_field_name("trait") {
            push_parent(
                &mut parents,
                &node_text(trait_node, source),
                RelationshipType::Implements,
            );
        }
    }
    parents
}

fn js_parents(node: Node<'_>, source: &str) -> Vec<ParentRelationship> {
    let mut parents = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "class_heritage" => {
                // javascript: class_heritage wraps the extends expression;
                // typescript: it wraps extends_clause / implements_clause.
                let mut heritage_cursor = child.walk();
                let mut saw_clause = false;
                for clause in child.named_children(&mut heritage_cursor) {
                    match clause.kind() {
                        "extends_clause" => {
                            saw_clause = true;
                            collect_type_names(clause, source, RelationshipType::Extends, &mut parents);
                        }
                        "implements_clause" => {
                            saw_clause = true;
                            collect_type_names(
                                clause,
                                source,
                                RelationshipType::Implements,
                                &mut parents,
                            );
                        }
                        _ => {}
                    }
                }
                if !saw_clause {
                    collect_type_names(child, source, RelationshipType::Extends, &mut parents);
                }
            }
            "extends_type_clause" => {
                // typescript interface: `interface A extends B`
                collect_type_names(child, source, RelationshipType::Extends, &mut parents);
            }
            _ => {}
        }
    }
    parents
}

fn go_parents(node: Node<'_>, source: &str) -> Vec<ParentRelationship> {
    let mut parents = Vec::new();
    let Some(type_node) = node.child_by_field_name("type") else {
        return parents;
    };
    match type_node.kind() {
        "struct_type" => {
            let Some(fields) = type_node
                .named_children(&mut type_node.walk())
                .find(|child| child.kind() == "field_declaration_list")
            else {
                return parents;
            };
            let mut cursor = fields.walk();
            for field in fields.named_children(&mut cursor) {
                if field.kind() != "field_declaration" {
                    continue;
                }
                // An embedded field has a type but no declared name.
                if field.child_by_field_name("name").is_some() {
                    continue;
                }
                if let Some(embedded) = field.child_by_field_name("type") {
                    push_parent(
                        &mut parents,
                        &node_text(embedded, source),
                        RelationshipType::Embeds,
                    );
                }
            }
        }
        "interface_type" => {
            let mut cursor = type_node.walk();
            for child in type_node.named_children(&mut cursor) {
                match child.kind() {
                    "type_identifier" | "qualified_type" => {
                        push_parent(&mut parents, &node_text(child, source), RelationshipType::Embeds);
                    }
                    "type_elem" => {
                        if let Some(inner) = child.named_child(0) {
                            push_parent(
                                &mut parents,
                                &node_text(inner, source),
                                RelationshipType::Embeds,
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    parents
}

fn cpp_parents(node: Node<'_>, source: &str) -> Vec<ParentRelationship> {
    let mut parents = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "base_class_clause" {
            collect_type_names(child, source, RelationshipType::Extends, &mut parents);
        }
    }
    parents
}

fn csharp_parents(node: Node<'_>, source: &str) -> Vec<ParentRelationship> {
    let mut parents = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "base_list" {
            continue;
        }
        let mut base_cursor = child.walk();
        for base in child.named_children(&mut base_cursor) {
            let raw = node_text(base, source);
            let name = bare_name(&raw);
            if name.is_empty() {
                continue;
            }
            // The grammar does not distinguish a base class from an
            // interface; the I-prefix convention is the cheapest signal.
            let relationship = if looks_like_interface(&name) {
                RelationshipType::Implements
            } else {
                RelationshipType::Extends
            };
            parents.push(ParentRelationship {
                parent_symbol: name,
                relationship_type: relationship,
            });
        }
    }
    parents
}

fn java_parents(node: Node<'_>, source: &str) -> Vec<ParentRelationship> {
    let mut parents = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "superclass" => {
                collect_type_names(child, source, RelationshipType::Extends, &mut parents);
            }
            "super_interfaces" => {
                collect_type_names(child, source, RelationshipType::Implements, &mut parents);
            }
            "extends_interfaces" => {
                collect_type_names(child, source, RelationshipType::Extends, &mut parents);
            }
            _ => {}
        }
    }
    parents
}

/// Collect every type-name-looking descendant of an inheritance clause.
fn collect_type_names(
    clause: Node<'_>,
    source: &str,
    relationship: RelationshipType,
    parents: &mut Vec<ParentRelationship>,
) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" | "type_identifier" | "scoped_type_identifier" | "qualified_name"
            | "nested_type_identifier" | "attribute" | "member_expression" => {
                push_parent(parents, &node_text(child, source), relationship);
            }
            "generic_type" | "generic_name" => {
                // Parent<T> keeps only the bare name.
                push_parent(parents, &node_text(child, source), relationship);
            }
            "type_list" => {
                collect_type_names(child, source, relationship, parents);
            }
            _ => {}
        }
    }
}

fn push_parent(parents: &mut Vec<ParentRelationship>, raw: &str, relationship: RelationshipType) {
    let name = bare_name(raw);
    if name.is_empty() {
        return;
    }
    parents.push(ParentRelationship {
        parent_symbol: name,
        relationship_type: relationship,
    });
}

/// Reduce a possibly qualified, possibly generic type expression to a bare
/// name: `ns::Base<T>` -> `Base`, `pkg.Embedded` -> `Embedded`.
pub fn bare_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_generics = match trimmed.find(['<', '(']) {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    without_generics
        .rsplit(['.', ':'])
        .next()
        .unwrap_or(without_generics)
        .trim()
        .to_string()
}

fn looks_like_interface(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('I') && chars.next().is_some_and(|ch| ch.is_ascii_uppercase())
}

/// Byte-cheap per-language abstractness check against the definition's
/// source line. Not grammar-accurate by design.
fn abstract_heuristic(node: Node<'_>, context: &str, language: Language) -> bool {
    match language {
        Language::Python => {
            context.contains("ABC") || context.contains("Protocol") || context.contains("ABCMeta")
        }
        Language::Rust => node.kind() == "trait_item",
        Language::JavaScript => false,
        Language::TypeScript | Language::Tsx => {
            node.kind() == "interface_declaration" || context.contains("abstract ")
        }
        Language::Go => node
            .child_by_field_name("type")
            .is_some_and(|ty| ty.kind() == "interface_type"),
        Language::C => false,
        Language::Cpp => false,
        Language::CSharp | Language::Java => {
            node.kind() == "interface_declaration" || context.contains("abstract ")
        }
        Language::Lua => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(language: Language, source: &str) -> Vec<InheritanceRelationship> {
        let mut parser = language.parser().unwrap();
        let tree = parser.parse(source, None).unwrap();
        let lines = LineIndex::new(source);
        extract_inheritance(&tree, source, "test", language, &lines)
    }

    #[test]
    fn bare_name_strips_qualification_and_generics() {
        assert_eq!(bare_name("Base"), "Base");
        assert_eq!(bare_name("ns::Base<T>"), "Base");
        assert_eq!(bare_name("pkg.Embedded"), "Embedded");
        assert_eq!(bare_name("List<string>"), "List");
    }

    #[test]
    fn python_superclasses() {
        let records = extract(Language::Python, "class Dog(Animal, Pet):\n    pass\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class_name, "Dog");
        assert_eq!(records[0].relationships.len(), 2);
        assert_eq!(records[0].relationships[0].parent_symbol, "Animal");
        assert_eq!(
            records[0].relationships[0].relationship_type,
            RelationshipType::Extends
        );
    }

    #[test]
    fn python_bare_class_has_empty_relationships() {
        let records = extract(Language::Python, "class Plain:\n    pass\n");
        assert_eq!(records.len(), 1);
        assert!(records[0].relationships.is_empty());
        assert!(!records[0].is_abstract);
    }

    #[test]
    fn python_abc_is_abstract() {
        let records = extract(Language::Python, "class Shape(ABC):\n    pass\n");
        assert!(records[0].is_abstract);
    }

    #[test]
    fn rust_impl_trait_for_type() {
        let source = "struct Engine;\ntrait Start {}\nimpl Start for Engine {}\n";
        let records = extract(Language::Rust, source);
        let impl_record = records
            .iter()
            .find(|r| r.class_kind == "impl_item")
            .unwrap();
        assert_eq!(impl_record.class_name, "Engine");
        assert_eq!(impl_record.relationships.len(), 1);
        assert_eq!(impl_record.relationships[0].parent_symbol, "Start");
        assert_eq!(
            impl_record.relationships[0].relationship_type,
            RelationshipType::Implements
        );

        let trait_record = records
            .iter()
            .find(|r| r.class_kind == "trait_item")
            .unwrap();
        assert!(trait_record.is_abstract);
        assert!(trait_record.relationships.is_empty());
    }

    #[test]
    fn go_embedded_struct_field() {
        let source = "package main\n\ntype Base struct{}\n\ntype Wrapper struct {\n\tBase\n\tName string\n}\n";
        let records = extract(Language::Go, source);
        let wrapper = records.iter().find(|r| r.class_name == "Wrapper").unwrap();
        assert_eq!(wrapper.relationships.len(), 1);
        assert_eq!(wrapper.relationships[0].parent_symbol, "Base");
        assert_eq!(
            wrapper.relationships[0].relationship_type,
            RelationshipType::Embeds
        );
    }
}
