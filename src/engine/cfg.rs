use crate::config::Config;
use crate::engine::language::Language;
use crate::engine::walker::node_text;
use crate::model::{ControlFlowGraph, FlowEdge, FlowNode, FlowNodeKind};
use crate::util::truncate_str_bytes;
use anyhow::Result;
use tree_sitter::Node;

const LABEL_MAX_BYTES: usize = 60;

/// Build a control-flow graph for one function body. `function_source` is
/// the stored source span of the function; `start_line` is its 1-based first
/// line in the original file so node lines map back to file coordinates.
///
/// Malformed or partial bodies degrade to whatever statements were
/// recognized; a block with zero recognized statements yields an empty
/// graph, never an error.
pub fn build_cfg(
    function_source: &str,
    language: Language,
    start_line: i64,
    end_line: i64,
) -> Result<ControlFlowGraph> {
    let _ = end_line;
    let mut parser = language.parser()?;
    let Some(tree) = parser.parse(function_source, None) else {
        return Ok(ControlFlowGraph::default());
    };
    let root = tree.root_node();
    let body = find_function_body(root, language).unwrap_or(root);

    let mut builder = CfgBuilder {
        graph: ControlFlowGraph::default(),
        source: function_source,
        line_offset: start_line.max(1) - 1,
        snippet_max: Config::get().snippet_max_bytes,
        frames: Vec::new(),
    };
    builder.process_block(body, Vec::new(), "");
    Ok(builder.graph)
}

/// Locate the body of the first function-shaped node in the parsed snippet.
/// Snippets that are bare statement lists fall back to the root.
fn find_function_body(root: Node<'_>, language: Language) -> Option<Node<'_>> {
    let function_kinds = language.function_kinds();
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if function_kinds.contains(&node.kind()) {
            if let Some(body) = node.child_by_field_name("body") {
                return Some(body);
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
                return None;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementShape {
    Conditional,
    Loop,
    Switch,
    Jump,
    Try,
    Block,
    Generic,
}

fn shape_of(kind: &str) -> StatementShape {
    match kind {
        "if_statement" | "if_expression" => StatementShape::Conditional,
        "for_statement" | "for_expression" | "for_in_statement" | "while_statement"
        | "while_expression" | "loop_expression" | "do_statement" | "repeat_statement"
        | "foreach_statement" | "for_range_loop" => StatementShape::Loop,
        "switch_statement" | "switch_expression" | "match_expression" | "match_statement"
        | "expression_switch_statement" | "type_switch_statement" => StatementShape::Switch,
        "return_statement" | "return_expression" | "throw_statement" | "raise_statement"
        | "break_statement" | "break_expression" | "continue_statement"
        | "continue_expression" | "goto_statement" => StatementShape::Jump,
        "try_statement" | "try_expression" => StatementShape::Try,
        "block" | "compound_statement" | "statement_block" | "do_block" => StatementShape::Block,
        _ => StatementShape::Generic,
    }
}

/// Mutable builder context shared by every statement handler. Each handler
/// receives the current set of entry node ids and returns the exit set for
/// the caller to wire onward; that threading is what lets arbitrarily nested
/// control structures compose without global state.
struct CfgBuilder<'a> {
    graph: ControlFlowGraph,
    source: &'a str,
    line_offset: i64,
    snippet_max: usize,
    frames: Vec<JumpFrame>,
}

/// Innermost-first stack of constructs a `break` can target. `continue`
/// skips switch frames to find the enclosing loop.
enum JumpFrame {
    Loop { loop_id: usize, breaks: Vec<usize> },
    Switch { breaks: Vec<usize> },
}

impl JumpFrame {
    fn breaks_mut(&mut self) -> &mut Vec<usize> {
        match self {
            JumpFrame::Loop { breaks, .. } | JumpFrame::Switch { breaks } => breaks,
        }
    }
}

impl<'a> CfgBuilder<'a> {
    fn create_node(&mut self, kind: FlowNodeKind, label: String, node: Node<'_>) -> usize {
        let id = self.graph.nodes.len();
        let snippet = truncate_str_bytes(node_text(node, self.source).trim(), self.snippet_max);
        self.graph.nodes.push(FlowNode {
            id,
            kind,
            label,
            line: node.start_position().row as i64 + 1 + self.line_offset,
            end_line: node.end_position().row as i64 + 1 + self.line_offset,
            source_snippet: snippet,
            invisible: false,
        });
        id
    }

    /// Structural connector with no visual content, used so callers always
    /// have a usable exit set.
    fn create_connector(&mut self, at: Node<'_>) -> usize {
        let id = self.graph.nodes.len();
        let line = at.end_position().row as i64 + 1 + self.line_offset;
        self.graph.nodes.push(FlowNode {
            id,
            kind: FlowNodeKind::Connector,
            label: String::new(),
            line,
            end_line: line,
            source_snippet: String::new(),
            invisible: true,
        });
        id
    }

    fn add_edge(&mut self, from: usize, to: usize, label: &str) {
        self.graph.edges.push(FlowEdge {
            from,
            to,
            label: label.to_string(),
        });
    }

    fn connect(&mut self, entries: &[usize], to: usize, label: &str) {
        for entry in entries {
            self.add_edge(*entry, to, label);
        }
    }

    fn process_block(&mut self, block: Node<'_>, entries: Vec<usize>, entry_label: &str) -> Vec<usize> {
        let mut cursor = block.walk();
        let stmts: Vec<Node<'_>> = block.named_children(&mut cursor).collect();
        self.process_statements(&stmts, entries, entry_label)
    }

    fn process_statements(
        &mut self,
        stmts: &[Node<'_>],
        entries: Vec<usize>,
        entry_label: &str,
    ) -> Vec<usize> {
        let mut current = entries;
        let mut label = entry_label.to_string();
        let mut terminated = false;
        for stmt in stmts {
            if terminated {
                // Unreachable statements after a return/throw are dropped.
                break;
            }
            let before = self.graph.nodes.len();
            let exits = self.dispatch(*stmt, &current, &label);
            if self.graph.nodes.len() > before {
                terminated = exits.is_empty();
                current = exits;
                label.clear();
            }
        }
        current
    }

    fn dispatch(&mut self, stmt: Node<'_>, entries: &[usize], label: &str) -> Vec<usize> {
        // Comments are named children of blocks in several grammars; they
        // carry no flow.
        if matches!(stmt.kind(), "comment" | "line_comment" | "block_comment") {
            return entries.to_vec();
        }
        // Statement wrappers carry the flow shape of their single child.
        if stmt.kind() == "expression_statement" && stmt.named_child_count() == 1 {
            let child = stmt.named_child(0).unwrap_or(stmt);
            if shape_of(child.kind()) != StatementShape::Generic {
                return self.dispatch(child, entries, label);
            }
        }

        match shape_of(stmt.kind()) {
            StatementShape::Conditional => self.handle_conditional(stmt, entries, label),
            StatementShape::Loop => self.handle_loop(stmt, entries, label),
            StatementShape::Switch => self.handle_switch(stmt, entries, label),
            StatementShape::Jump => self.handle_jump(stmt, entries, label),
            StatementShape::Try => self.handle_try(stmt, entries, label),
            StatementShape::Block => self.process_block(stmt, entries.to_vec(), label),
            StatementShape::Generic => self.handle_generic(stmt, entries, label),
        }
    }

    fn handle_conditional(&mut self, stmt: Node<'_>, entries: &[usize], label: &str) -> Vec<usize> {
        let decision = self.create_node(
            FlowNodeKind::Decision,
            self.condition_label(stmt),
            stmt,
        );
        self.connect(entries, decision, label);

        let mut exits = Vec::new();
        match consequence_of(stmt) {
            Some(block) => {
                let branch = self.process_branch(block, decision, "Yes");
                if branch.len() == 1 && branch[0] == decision {
                    // Empty then-branch: keep the Yes path alive.
                    let conn = self.create_connector(stmt);
                    self.add_edge(decision, conn, "Yes");
                    exits.push(conn);
                } else {
                    exits.extend(branch);
                }
            }
            None => {
                let conn = self.create_connector(stmt);
                self.add_edge(decision, conn, "Yes");
                exits.push(conn);
            }
        }

        let mut no_source = decision;
        let mut has_else = false;
        for alt in alternatives(stmt) {
            match alt.kind() {
                "elif_clause" | "elseif_statement" | "elseif" => {
                    let elif_decision = self.create_node(
                        FlowNodeKind::Decision,
                        self.condition_label(alt),
                        alt,
                    );
                    self.add_edge(no_source, elif_decision, "No");
                    if let Some(block) = consequence_of(alt) {
                        let branch = self.process_branch(block, elif_decision, "Yes");
                        if branch.len() == 1 && branch[0] == elif_decision {
                            let conn = self.create_connector(alt);
                            self.add_edge(elif_decision, conn, "Yes");
                            exits.push(conn);
                        } else {
                            exits.extend(branch);
                        }
                    }
                    no_source = elif_decision;
                }
                "else_clause" | "else_statement" => {
                    has_else = true;
                    let inner = alt
                        .child_by_field_name("body")
                        .or_else(|| alt.named_child(0));
                    match inner {
                        Some(child) if shape_of(child.kind()) == StatementShape::Conditional => {
                            // else-if chain: recurse, re-labelling its
                            // incoming edge "No".
                            exits.extend(self.handle_conditional(child, &[no_source], "No"));
                        }
                        Some(child) => {
                            let branch = self.process_branch(child, no_source, "No");
                            if branch.len() == 1 && branch[0] == no_source {
                                let conn = self.create_connector(alt);
                                self.add_edge(no_source, conn, "No");
                                exits.push(conn);
                            } else {
                                exits.extend(branch);
                            }
                        }
                        None => {
                            let conn = self.create_connector(alt);
                            self.add_edge(no_source, conn, "No");
                            exits.push(conn);
                        }
                    }
                }
                kind if shape_of(kind) == StatementShape::Conditional => {
                    has_else = true;
                    exits.extend(self.handle_conditional(alt, &[no_source], "No"));
                }
                // Go attaches the else block directly, without a clause
                // wrapper.
                kind if shape_of(kind) == StatementShape::Block => {
                    has_else = true;
                    let branch = self.process_branch(alt, no_source, "No");
                    if branch.len() == 1 && branch[0] == no_source {
                        let conn = self.create_connector(alt);
                        self.add_edge(no_source, conn, "No");
                        exits.push(conn);
                    } else {
                        exits.extend(branch);
                    }
                }
                _ => {}
            }
        }

        if !has_else {
            // No explicit else: synthesize an invisible connector so the
            // caller always has a usable No exit.
            let conn = self.create_connector(stmt);
            self.add_edge(no_source, conn, "No");
            exits.push(conn);
        }
        exits
    }

    fn process_branch(&mut self, block: Node<'_>, entry: usize, label: &str) -> Vec<usize> {
        if shape_of(block.kind()) == StatementShape::Block {
            self.process_block(block, vec![entry], label)
        } else {
            self.process_statements(&[block], vec![entry], label)
        }
    }

    fn handle_loop(&mut self, stmt: Node<'_>, entries: &[usize], label: &str) -> Vec<usize> {
        let loop_id = self.create_node(FlowNodeKind::Loop, self.header_label(stmt), stmt);
        self.connect(entries, loop_id, label);

        self.frames.push(JumpFrame::Loop {
            loop_id,
            breaks: Vec::new(),
        });
        let body_exits = match stmt.child_by_field_name("body") {
            Some(body) => self.process_branch(body, loop_id, "Loop"),
            None => vec![loop_id],
        };
        let breaks = match self.frames.pop() {
            Some(JumpFrame::Loop { breaks, .. }) => breaks,
            _ => Vec::new(),
        };

        // Close the cycle: every non-terminal body exit flows back to the
        // loop head. Returns and breaks already produced no exits.
        for exit in body_exits {
            if exit != loop_id {
                self.add_edge(exit, loop_id, "");
            }
        }

        let done = self.create_connector(stmt);
        self.add_edge(loop_id, done, "Done");
        for break_node in breaks {
            self.add_edge(break_node, done, "");
        }
        vec![done]
    }

    fn handle_switch(&mut self, stmt: Node<'_>, entries: &[usize], label: &str) -> Vec<usize> {
        let subject = scrutinee_of(stmt)
            .map(|node| node_text(node, self.source))
            .unwrap_or_default();
        let decision_label = truncate_str_bytes(
            format!("switch {}", subject.trim()).trim(),
            LABEL_MAX_BYTES,
        );
        let decision = self.create_node(FlowNodeKind::Decision, decision_label, stmt);
        self.connect(entries, decision, label);

        // In the C-family, Go, and JS/TS grammars a break inside a switch
        // exits the switch, not the enclosing loop; Rust match and Python
        // match take no break at all.
        let takes_break = stmt.kind().contains("switch");
        if takes_break {
            self.frames.push(JumpFrame::Switch { breaks: Vec::new() });
        }

        let body = stmt.child_by_field_name("body").unwrap_or(stmt);
        let mut exits = Vec::new();
        let mut saw_default = false;
        let mut cursor = body.walk();
        for clause in body.named_children(&mut cursor) {
            let kind = clause.kind();
            if !kind.contains("case") && !kind.contains("default") && kind != "match_arm" {
                continue;
            }
            let value = clause_value(clause);
            let is_default = kind.contains("default") || value.is_none();
            let clause_label = match value {
                Some(value) if !is_default => truncate_str_bytes(
                    node_text(value, self.source).trim(),
                    LABEL_MAX_BYTES,
                ),
                _ => "default".to_string(),
            };
            saw_default |= is_default;

            let clause_stmts = clause_statements(clause);
            let clause_exits = if clause_stmts.is_empty() {
                let conn = self.create_connector(clause);
                self.add_edge(decision, conn, &clause_label);
                vec![conn]
            } else {
                self.process_statements(&clause_stmts, vec![decision], &clause_label)
            };
            exits.extend(clause_exits.into_iter().filter(|id| *id != decision));
        }

        if takes_break {
            if let Some(JumpFrame::Switch { breaks }) = self.frames.pop() {
                exits.extend(breaks);
            }
        }

        if !saw_default {
            let conn = self.create_connector(stmt);
            self.add_edge(decision, conn, "default");
            exits.push(conn);
        }
        exits
    }

    fn handle_jump(&mut self, stmt: Node<'_>, entries: &[usize], label: &str) -> Vec<usize> {
        let kind = stmt.kind();
        let text = self.first_line_label(stmt);
        match kind {
            "return_statement" | "return_expression" => {
                let node = self.create_node(FlowNodeKind::Return, text, stmt);
                self.connect(entries, node, label);
                // Flow terminates here: zero successor edges, by design.
                Vec::new()
            }
            "throw_statement" | "raise_statement" => {
                let node = self.create_node(FlowNodeKind::Process, text, stmt);
                self.connect(entries, node, label);
                Vec::new()
            }
            "break_statement" | "break_expression" => {
                let node = self.create_node(FlowNodeKind::Process, text, stmt);
                self.connect(entries, node, label);
                if let Some(frame) = self.frames.last_mut() {
                    frame.breaks_mut().push(node);
                }
                Vec::new()
            }
            "continue_statement" | "continue_expression" => {
                let node = self.create_node(FlowNodeKind::Process, text, stmt);
                self.connect(entries, node, label);
                let target = self.frames.iter().rev().find_map(|frame| match frame {
                    JumpFrame::Loop { loop_id, .. } => Some(*loop_id),
                    JumpFrame::Switch { .. } => None,
                });
                if let Some(loop_id) = target {
                    self.add_edge(node, loop_id, "");
                }
                Vec::new()
            }
            _ => {
                // goto: local flow ends, target is out of scope for a
                // per-function graph.
                let node = self.create_node(FlowNodeKind::Process, text, stmt);
                self.connect(entries, node, label);
                Vec::new()
            }
        }
    }

    fn handle_try(&mut self, stmt: Node<'_>, entries: &[usize], label: &str) -> Vec<usize> {
        let try_node = self.create_node(FlowNodeKind::Process, "try".to_string(), stmt);
        self.connect(entries, try_node, label);

        let body_start = self.graph.nodes.len();
        let mut all_exits = match stmt.child_by_field_name("body") {
            Some(body) => self.process_branch(body, try_node, ""),
            None => vec![try_node],
        };
        // A body with zero recognized statements passes the try node through
        // as its own normal exit; only a body that produced nodes replaces it.
        if self.graph.nodes.len() > body_start {
            all_exits.retain(|id| *id != try_node);
        }

        let mut finally_body = None;
        let mut cursor = stmt.walk();
        for clause in stmt.named_children(&mut cursor) {
            match clause.kind() {
                "catch_clause" | "except_clause" => {
                    let handler_body = clause
                        .child_by_field_name("body")
                        .or_else(|| last_block_child(clause));
                    if let Some(body) = handler_body {
                        let catch_exits = self.process_branch(body, try_node, "exception");
                        all_exits.extend(catch_exits.into_iter().filter(|id| *id != try_node));
                    }
                }
                "finally_clause" => {
                    finally_body = clause
                        .child_by_field_name("body")
                        .or_else(|| last_block_child(clause));
                }
                _ => {}
            }
        }

        // A finally clause reroutes every accumulated exit, normal and
        // exceptional, through its block before the statement's exits are
        // computed.
        if let Some(body) = finally_body {
            all_exits = self.process_block(body, all_exits, "");
        }
        all_exits
    }

    fn handle_generic(&mut self, stmt: Node<'_>, entries: &[usize], label: &str) -> Vec<usize> {
        let text = self.first_line_label(stmt);
        if text.is_empty() || text.chars().all(|ch| "{};".contains(ch)) {
            // Brace-only or empty line: pass entries through unchanged.
            return entries.to_vec();
        }
        let node = self.create_node(FlowNodeKind::Process, text, stmt);
        self.connect(entries, node, label);
        vec![node]
    }

    fn condition_label(&self, stmt: Node<'_>) -> String {
        let text = stmt
            .child_by_field_name("condition")
            .map(|cond| node_text(cond, self.source))
            .unwrap_or_else(|| self.first_line_raw(stmt));
        truncate_str_bytes(text.trim().trim_matches(|ch| ch == '(' || ch == ')'), LABEL_MAX_BYTES)
    }

    fn header_label(&self, stmt: Node<'_>) -> String {
        truncate_str_bytes(self.first_line_raw(stmt).trim(), LABEL_MAX_BYTES)
    }

    fn first_line_label(&self, stmt: Node<'_>) -> String {
        truncate_str_bytes(self.first_line_raw(stmt).trim(), LABEL_MAX_BYTES)
    }

    fn first_line_raw(&self, stmt: Node<'_>) -> String {
        let text = node_text(stmt, self.source);
        text.lines().next().unwrap_or("").to_string()
    }
}

fn consequence_of(stmt: Node<'_>) -> Option<Node<'_>> {
    stmt.child_by_field_name("consequence")
        .or_else(|| stmt.child_by_field_name("body"))
}

/// Collect else/elif chain members. Grammars with an `alternative` field use
/// it (repeated for Python elif chains); others expose the clauses as plain
/// named children.
fn alternatives(stmt: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = stmt.walk();
    let via_field: Vec<Node<'_>> = stmt
        .children_by_field_name("alternative", &mut cursor)
        .collect();
    if !via_field.is_empty() {
        return via_field;
    }
    let mut cursor = stmt.walk();
    stmt.named_children(&mut cursor)
        .filter(|child| {
            matches!(
                child.kind(),
                "elif_clause" | "elseif_statement" | "elseif" | "else_clause" | "else_statement"
            )
        })
        .collect()
}

fn scrutinee_of(stmt: Node<'_>) -> Option<Node<'_>> {
    stmt.child_by_field_name("condition")
        .or_else(|| stmt.child_by_field_name("value"))
        .or_else(|| stmt.child_by_field_name("subject"))
        .or_else(|| stmt.named_child(0))
}

/// The case value of a switch clause, if it has one (default clauses do
/// not).
fn clause_value(clause: Node<'_>) -> Option<Node<'_>> {
    // Pattern first: a match arm's `value` field is its body, not its label.
    if let Some(pattern) = clause.child_by_field_name("pattern") {
        return Some(pattern);
    }
    if let Some(value) = clause.child_by_field_name("value") {
        return Some(value);
    }
    if clause.kind().contains("default") {
        return None;
    }
    // Go expression cases keep their values in a leading expression_list.
    let first = clause.named_child(0)?;
    if first.kind().contains("expression") || first.kind() == "case_pattern" {
        Some(first)
    } else {
        None
    }
}

/// Statements of a switch clause: everything after the value/pattern child.
fn clause_statements(clause: Node<'_>) -> Vec<Node<'_>> {
    let value_id = clause_value(clause).map(|node| node.id());
    let mut cursor = clause.walk();
    clause
        .named_children(&mut cursor)
        .filter(|child| Some(child.id()) != value_id)
        .filter(|child| {
            !matches!(child.kind(), "case_pattern" | "guard" | "expression_list")
        })
        .collect()
}

fn last_block_child(clause: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = clause.walk();
    clause
        .named_children(&mut cursor)
        .filter(|child| shape_of(child.kind()) == StatementShape::Block)
        .last()
}
