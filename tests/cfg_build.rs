use srcgraph::engine::cfg::build_cfg;
use srcgraph::engine::language::Language;
use srcgraph::model::{ControlFlowGraph, FlowNodeKind};

fn nodes_of(graph: &ControlFlowGraph, kind: FlowNodeKind) -> Vec<usize> {
    graph
        .nodes
        .iter()
        .filter(|node| node.kind == kind)
        .map(|node| node.id)
        .collect()
}

fn outgoing(graph: &ControlFlowGraph, id: usize) -> Vec<(usize, String)> {
    graph
        .edges
        .iter()
        .filter(|edge| edge.from == id)
        .map(|edge| (edge.to, edge.label.clone()))
        .collect()
}

fn incoming(graph: &ControlFlowGraph, id: usize) -> usize {
    graph.edges.iter().filter(|edge| edge.to == id).count()
}

#[test]
fn if_else_returns() {
    let source = "function f(x) { if (x > 0) { return 1; } else { return 2; } }";
    let graph = build_cfg(source, Language::JavaScript, 1, 1).unwrap();

    assert_eq!(nodes_of(&graph, FlowNodeKind::Decision).len(), 1);
    let returns = nodes_of(&graph, FlowNodeKind::Return);
    assert_eq!(returns.len(), 2);

    let decision = nodes_of(&graph, FlowNodeKind::Decision)[0];
    let labels: Vec<String> = outgoing(&graph, decision)
        .into_iter()
        .map(|(_, label)| label)
        .collect();
    assert!(labels.contains(&"Yes".to_string()));
    assert!(labels.contains(&"No".to_string()));

    for ret in returns {
        assert!(outgoing(&graph, ret).is_empty(), "returns terminate flow");
    }
}

#[test]
fn for_loop_cycle_and_done_edge() {
    let source = "function f() { for (i = 0; i < 10; i++) { total += i; } }";
    let graph = build_cfg(source, Language::JavaScript, 1, 1).unwrap();

    let loops = nodes_of(&graph, FlowNodeKind::Loop);
    assert_eq!(loops.len(), 1);
    let processes = nodes_of(&graph, FlowNodeKind::Process);
    assert_eq!(processes.len(), 1);

    let loop_id = loops[0];
    let body = processes[0];
    assert!(graph.edges.iter().any(|e| e.from == loop_id && e.to == body));
    assert!(graph.edges.iter().any(|e| e.from == body && e.to == loop_id));
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from == loop_id && e.label == "Done"));
}

#[test]
fn while_with_break_exits_through_done_connector() {
    let source = r#"
def poll(q):
    while True:
        item = q.get()
        if item is None:
            break
        handle(item)
    cleanup()
"#;
    let graph = build_cfg(source, Language::Python, 1, 8).unwrap();

    let loop_id = nodes_of(&graph, FlowNodeKind::Loop)[0];
    let done = outgoing(&graph, loop_id)
        .into_iter()
        .find(|(_, label)| label == "Done")
        .map(|(to, _)| to)
        .unwrap();
    assert!(graph.nodes[done].invisible);

    // The break node flows to the done connector, not back to the loop.
    let break_node = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("break"))
        .unwrap();
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from == break_node.id && e.to == done));
    assert!(!graph
        .edges
        .iter()
        .any(|e| e.from == break_node.id && e.to == loop_id));

    // cleanup() runs after the loop drains.
    let cleanup = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("cleanup"))
        .unwrap();
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from == done && e.to == cleanup.id));
}

#[test]
fn elif_chain_has_complete_decisions() {
    let source = r#"
def grade(score):
    if score > 90:
        return "A"
    elif score > 80:
        return "B"
    else:
        return "C"
"#;
    let graph = build_cfg(source, Language::Python, 1, 8).unwrap();

    let decisions = nodes_of(&graph, FlowNodeKind::Decision);
    assert_eq!(decisions.len(), 2);
    assert_eq!(nodes_of(&graph, FlowNodeKind::Return).len(), 3);

    // First decision: Yes to a return, No to the elif decision.
    let first = decisions[0];
    let no_target = outgoing(&graph, first)
        .into_iter()
        .find(|(_, label)| label == "No")
        .map(|(to, _)| to)
        .unwrap();
    assert!(decisions.contains(&no_target));
}

#[test]
fn switch_labels_cases_and_default() {
    let source = r#"
function pick(x) {
  switch (x) {
    case 1:
      return "one";
    default:
      return "other";
  }
}
"#;
    let graph = build_cfg(source, Language::JavaScript, 1, 9).unwrap();

    let decision = nodes_of(&graph, FlowNodeKind::Decision)[0];
    let labels: Vec<String> = outgoing(&graph, decision)
        .into_iter()
        .map(|(_, label)| label)
        .collect();
    assert!(labels.contains(&"1".to_string()));
    assert!(labels.contains(&"default".to_string()));

    for ret in nodes_of(&graph, FlowNodeKind::Return) {
        assert!(outgoing(&graph, ret).is_empty());
    }
}

#[test]
fn switch_without_default_gets_synthetic_default_path() {
    let source = r#"
function pick(x) {
  switch (x) {
    case 1:
      handle();
      break;
  }
}
"#;
    let graph = build_cfg(source, Language::JavaScript, 1, 8).unwrap();
    let decision = nodes_of(&graph, FlowNodeKind::Decision)[0];
    let default_edge = outgoing(&graph, decision)
        .into_iter()
        .find(|(_, label)| label == "default")
        .unwrap();
    assert!(graph.nodes[default_edge.0].invisible);
}

#[test]
fn try_except_finally_reroutes_all_exits() {
    let source = r#"
def load(path):
    try:
        data = read(path)
    except ValueError:
        data = None
    finally:
        close(path)
    return data
"#;
    let graph = build_cfg(source, Language::Python, 1, 9).unwrap();

    let try_node = graph.nodes.iter().find(|n| n.label == "try").unwrap();
    assert_eq!(try_node.kind, FlowNodeKind::Process);

    let exception_edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| e.from == try_node.id && e.label == "exception")
        .collect();
    assert_eq!(exception_edges.len(), 1);

    // Both the normal path and the handler converge on the finally block.
    let close = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("close"))
        .unwrap();
    assert!(incoming(&graph, close.id) >= 2);

    // And flow continues to the trailing return.
    let ret = nodes_of(&graph, FlowNodeKind::Return)[0];
    assert!(graph.edges.iter().any(|e| e.from == close.id && e.to == ret));
}

#[test]
fn switch_break_flows_to_following_statement() {
    let source = r#"
function route(x) {
  switch (x) {
    case 1:
      doA();
      break;
    default:
      doB();
  }
  after();
}
"#;
    let graph = build_cfg(source, Language::JavaScript, 1, 11).unwrap();

    let break_node = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("break"))
        .unwrap();
    let after = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("after"))
        .unwrap();
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.from == break_node.id && e.to == after.id),
        "break exits the switch into the next statement"
    );
}

#[test]
fn switch_break_inside_loop_stays_in_switch() {
    let source = r#"
function scan(items) {
  for (i = 0; i < items.length; i++) {
    switch (items[i]) {
      case 0:
        skip();
        break;
    }
    mark(i);
  }
}
"#;
    let graph = build_cfg(source, Language::JavaScript, 1, 11).unwrap();

    let loop_id = nodes_of(&graph, FlowNodeKind::Loop)[0];
    let done = outgoing(&graph, loop_id)
        .into_iter()
        .find(|(_, label)| label == "Done")
        .map(|(to, _)| to)
        .unwrap();
    let break_node = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("break"))
        .unwrap();
    let mark = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("mark"))
        .unwrap();

    assert!(
        !graph
            .edges
            .iter()
            .any(|e| e.from == break_node.id && e.to == done),
        "a switch break must not escape the enclosing loop"
    );
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from == break_node.id && e.to == mark.id));
}

#[test]
fn empty_try_body_keeps_normal_path() {
    let source = r#"
function f(x) {
  try {} catch (e) { handle(e); }
  after();
}
"#;
    let graph = build_cfg(source, Language::JavaScript, 1, 5).unwrap();

    let try_node = graph.nodes.iter().find(|n| n.label == "try").unwrap();
    let handler = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("handle"))
        .unwrap();
    let after = graph
        .nodes
        .iter()
        .find(|n| n.label.starts_with("after"))
        .unwrap();

    // Normal path and handler path both reach the trailing statement.
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from == try_node.id && e.to == after.id && e.label.is_empty()));
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from == handler.id && e.to == after.id));
}

#[test]
fn line_numbers_are_offset_into_the_file() {
    let source = "def f(x):\n    if x:\n        return 1\n    return 0\n";
    let graph = build_cfg(source, Language::Python, 100, 103).unwrap();
    let decision = graph
        .nodes
        .iter()
        .find(|n| n.kind == FlowNodeKind::Decision)
        .unwrap();
    assert_eq!(decision.line, 101);
}

#[test]
fn empty_and_malformed_inputs_degrade() {
    let graph = build_cfg("", Language::Python, 1, 1).unwrap();
    assert!(graph.nodes.is_empty());

    let graph = build_cfg("def f(:\n  whil x", Language::Python, 1, 2);
    assert!(graph.is_ok());
}
