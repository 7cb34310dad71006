use crate::config::{Config, HeaderLanguage};
use anyhow::Result;
use std::path::Path;
use tree_sitter::Parser;

/// Canonical span categories that per-language raw node kinds normalize into.
pub const FUNCTION_DEFINITION: &str = "function_definition";
pub const CALL_EXPRESSION: &str = "call_expression";
pub const COMMENT: &str = "comment";
pub const PARAMETER_LIST: &str = "parameter_list";
pub const CLASS_DEFINITION: &str = "class_definition";
pub const STRUCT_DEFINITION: &str = "struct_definition";

/// Closed set of supported languages. Every extraction stage dispatches on
/// this enum with an exhaustive match, so wiring a new language into the
/// grammar table forces it through every stage at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    C,
    Cpp,
    CSharp,
    Java,
    Lua,
}

pub const ALL_LANGUAGES: &[Language] = &[
    Language::Python,
    Language::Rust,
    Language::JavaScript,
    Language::TypeScript,
    Language::Tsx,
    Language::Go,
    Language::C,
    Language::Cpp,
    Language::CSharp,
    Language::Java,
    Language::Lua,
];

impl Language {
    pub fn id(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Java => "java",
            Language::Lua => "lua",
        }
    }

    pub fn from_id(id: &str) -> Option<Language> {
        ALL_LANGUAGES
            .iter()
            .copied()
            .find(|lang| lang.id() == id.trim().to_ascii_lowercase())
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::Rust => &["rs"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::Tsx => &["tsx"],
            Language::Go => &["go"],
            Language::C => &["c"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh"],
            Language::CSharp => &["cs", "csx"],
            Language::Java => &["java"],
            Language::Lua => &["lua"],
        }
    }

    /// Infer a language from a filename extension. The ambiguous `.h`
    /// extension maps to the configured header language.
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_ascii_lowercase();
        if ext == "h" {
            return Some(match Config::get().header_language {
                HeaderLanguage::C => Language::C,
                HeaderLanguage::Cpp => Language::Cpp,
            });
        }
        ALL_LANGUAGES
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Language> {
        let ext = path.extension().and_then(|ext| ext.to_str())?;
        Language::from_extension(ext)
    }

    /// Infer from a filename, falling back to the configured header language
    /// when the extension is unrecognized. Misclassification is recoverable
    /// (empty or wrong buckets); a hard failure would stop a whole scan.
    pub fn from_filename_lossy(filename: &str) -> Language {
        Language::from_path(Path::new(filename)).unwrap_or(match Config::get().header_language {
            HeaderLanguage::C => Language::C,
            HeaderLanguage::Cpp => Language::Cpp,
        })
    }

    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Lua => tree_sitter_lua::LANGUAGE.into(),
        }
    }

    pub fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.grammar())?;
        Ok(parser)
    }

    /// Raw kinds that normalize to `function_definition`.
    pub fn function_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["function_definition"],
            Language::Rust => &["function_item"],
            Language::JavaScript => &[
                "function_declaration",
                "function_expression",
                "arrow_function",
                "method_definition",
                "generator_function_declaration",
            ],
            Language::TypeScript | Language::Tsx => &[
                "function_declaration",
                "function_expression",
                "arrow_function",
                "method_definition",
                "generator_function_declaration",
            ],
            Language::Go => &["function_declaration", "method_declaration", "func_literal"],
            Language::C => &["function_definition"],
            Language::Cpp => &["function_definition"],
            Language::CSharp => &[
                "method_declaration",
                "constructor_declaration",
                "local_function_statement",
            ],
            Language::Java => &["method_declaration", "constructor_declaration"],
            Language::Lua => &["function_declaration", "function_definition"],
        }
    }

    /// Raw kinds that normalize to `parameter_list`.
    pub fn parameter_list_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["parameters"],
            Language::Rust => &["parameters"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &["formal_parameters"],
            Language::Go => &["parameter_list"],
            Language::C | Language::Cpp => &["parameter_list"],
            Language::CSharp => &["parameter_list"],
            Language::Java => &["formal_parameters"],
            Language::Lua => &["parameters"],
        }
    }

    /// Raw kinds that normalize to `class_definition`.
    pub fn class_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["class_definition"],
            Language::Rust => &["trait_item", "impl_item", "enum_item"],
            Language::JavaScript => &["class_declaration"],
            Language::TypeScript | Language::Tsx => &[
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Language::Go => &["interface_type"],
            Language::C => &[],
            Language::Cpp => &["class_specifier"],
            Language::CSharp => &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Language::Java => &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Language::Lua => &[],
        }
    }

    /// Raw kinds that normalize to `struct_definition`.
    pub fn struct_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[],
            Language::Rust => &["struct_item"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &[],
            Language::Go => &["struct_type"],
            Language::C | Language::Cpp => &["struct_specifier", "union_specifier", "enum_specifier"],
            Language::CSharp => &["struct_declaration"],
            Language::Java => &[],
            Language::Lua => &[],
        }
    }

    /// Raw kinds that normalize to `call_expression`.
    pub fn call_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["call"],
            Language::Rust => &["call_expression"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &["call_expression"],
            Language::Go => &["call_expression"],
            Language::C | Language::Cpp => &["call_expression"],
            Language::CSharp => &["invocation_expression"],
            Language::Java => &["method_invocation"],
            Language::Lua => &["function_call"],
        }
    }

    /// Raw kinds that normalize to `comment`.
    pub fn comment_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["comment"],
            Language::Rust => &["line_comment", "block_comment"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &["comment"],
            Language::Go => &["comment"],
            Language::C | Language::Cpp => &["comment"],
            Language::CSharp => &["comment"],
            Language::Java => &["line_comment", "block_comment"],
            Language::Lua => &["comment"],
        }
    }

    /// Identifier-like node kinds fed to the occurrence classifier. A future
    /// grammar with no identifier kinds classifies nothing rather than
    /// failing.
    pub fn identifier_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["identifier"],
            Language::Rust => &["identifier", "type_identifier", "field_identifier"],
            Language::JavaScript => &[
                "identifier",
                "property_identifier",
                "shorthand_property_identifier",
            ],
            Language::TypeScript | Language::Tsx => &[
                "identifier",
                "property_identifier",
                "shorthand_property_identifier",
                "type_identifier",
            ],
            Language::Go => &[
                "identifier",
                "field_identifier",
                "type_identifier",
                "package_identifier",
            ],
            Language::C | Language::Cpp => &["identifier", "field_identifier", "type_identifier"],
            Language::CSharp => &["identifier"],
            Language::Java => &["identifier", "type_identifier"],
            Language::Lua => &["identifier"],
        }
    }

    /// Parent kinds that hold a declared function name directly (the parent
    /// a function-name identifier sees; for C-family grammars this is the
    /// declarator, not the definition node).
    pub fn function_name_parent_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["function_definition"],
            Language::Rust => &["function_item", "function_signature_item"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &[
                "function_declaration",
                "function_expression",
                "method_definition",
                "generator_function_declaration",
            ],
            Language::Go => &["function_declaration", "method_declaration"],
            Language::C | Language::Cpp => &["function_declarator"],
            Language::CSharp => &[
                "method_declaration",
                "constructor_declaration",
                "local_function_statement",
            ],
            Language::Java => &["method_declaration", "constructor_declaration"],
            Language::Lua => &["function_declaration"],
        }
    }

    /// Parent kinds that hold a declared type name (class, struct,
    /// interface, trait).
    pub fn type_name_parent_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["class_definition"],
            Language::Rust => &["struct_item", "enum_item", "trait_item"],
            Language::JavaScript => &["class_declaration"],
            Language::TypeScript | Language::Tsx => &[
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Language::Go => &["type_spec"],
            Language::C => &["struct_specifier", "union_specifier", "enum_specifier"],
            Language::Cpp => &[
                "class_specifier",
                "struct_specifier",
                "union_specifier",
                "enum_specifier",
            ],
            Language::CSharp => &[
                "class_declaration",
                "struct_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Language::Java => &[
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Language::Lua => &[],
        }
    }

    /// Parent kinds that mark a parameter position (the list node or the
    /// individual parameter node, whichever the grammar puts the identifier
    /// under).
    pub fn parameter_parent_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "parameters",
                "default_parameter",
                "typed_parameter",
                "typed_default_parameter",
            ],
            Language::Rust => &["parameters", "parameter"],
            Language::JavaScript => &["formal_parameters"],
            Language::TypeScript | Language::Tsx => &[
                "formal_parameters",
                "required_parameter",
                "optional_parameter",
            ],
            Language::Go => &["parameter_list", "parameter_declaration"],
            Language::C | Language::Cpp => &["parameter_list", "parameter_declaration"],
            Language::CSharp => &["parameter_list", "parameter"],
            Language::Java => &["formal_parameters", "formal_parameter"],
            Language::Lua => &["parameters"],
        }
    }

    /// Parent kinds for variable declaration and assignment constructs.
    pub fn assignment_parent_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["assignment", "augmented_assignment"],
            Language::Rust => &[
                "let_declaration",
                "assignment_expression",
                "compound_assignment_expr",
            ],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &[
                "variable_declarator",
                "assignment_expression",
                "augmented_assignment_expression",
            ],
            Language::Go => &[
                "short_var_declaration",
                "var_spec",
                "const_spec",
                "assignment_statement",
            ],
            Language::C | Language::Cpp => &["init_declarator", "assignment_expression"],
            Language::CSharp => &["variable_declarator", "assignment_expression"],
            Language::Java => &["variable_declarator", "assignment_expression"],
            Language::Lua => &["variable_list"],
        }
    }

    /// Member-access parent kinds, paired with the field name of the
    /// member/attribute/property position within that parent.
    pub fn member_access_parents(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::Python => &[("attribute", "attribute")],
            Language::Rust => &[("field_expression", "field")],
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                &[("member_expression", "property")]
            }
            Language::Go => &[("selector_expression", "field")],
            Language::C | Language::Cpp => &[("field_expression", "field")],
            Language::CSharp => &[("member_access_expression", "name")],
            Language::Java => &[("field_access", "field")],
            Language::Lua => &[
                ("dot_index_expression", "field"),
                ("method_index_expression", "method"),
            ],
        }
    }

    /// Parent kinds belonging to an import/module clause.
    pub fn import_parent_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "import_statement",
                "import_from_statement",
                "aliased_import",
                "dotted_name",
            ],
            Language::Rust => &[
                "use_declaration",
                "use_as_clause",
                "use_list",
                "scoped_use_list",
            ],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &[
                "import_specifier",
                "namespace_import",
                "import_clause",
            ],
            Language::Go => &["import_spec", "import_declaration"],
            Language::C | Language::Cpp => &["preproc_include"],
            Language::CSharp => &["using_directive"],
            Language::Java => &["import_declaration"],
            Language::Lua => &[],
        }
    }

    /// Call-expression parent kinds, paired with the field name of the
    /// callee position.
    pub fn call_parents(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::Python => &[("call", "function")],
            Language::Rust => &[("call_expression", "function")],
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                &[("call_expression", "function")]
            }
            Language::Go => &[("call_expression", "function")],
            Language::C | Language::Cpp => &[("call_expression", "function")],
            Language::CSharp => &[("invocation_expression", "function")],
            Language::Java => &[("method_invocation", "name")],
            Language::Lua => &[("function_call", "name")],
        }
    }

    /// Full capture set for the node normalizer: every raw kind recorded as
    /// a structural span.
    pub fn capture_kinds(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        kinds.extend_from_slice(self.function_kinds());
        kinds.extend_from_slice(self.parameter_list_kinds());
        kinds.extend_from_slice(self.class_kinds());
        kinds.extend_from_slice(self.struct_kinds());
        kinds.extend_from_slice(self.call_kinds());
        kinds.extend_from_slice(self.comment_kinds());
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    /// Canonical bucket for a raw kind, when the raw kind is a member of one
    /// of the normalization subsets and differs from the canonical name.
    pub fn canonical_kind(&self, raw_kind: &str) -> Option<&'static str> {
        let canonical = if self.function_kinds().contains(&raw_kind) {
            FUNCTION_DEFINITION
        } else if self.parameter_list_kinds().contains(&raw_kind) {
            PARAMETER_LIST
        } else if self.class_kinds().contains(&raw_kind) {
            CLASS_DEFINITION
        } else if self.struct_kinds().contains(&raw_kind) {
            STRUCT_DEFINITION
        } else if self.call_kinds().contains(&raw_kind) {
            CALL_EXPRESSION
        } else if self.comment_kinds().contains(&raw_kind) {
            COMMENT
        } else {
            return None;
        };
        if canonical == raw_kind {
            None
        } else {
            Some(canonical)
        }
    }
}
