//! Visualization of cross-strategies as a graph: FODA elements feed the
//! strategies crossing them, and strategies point at their strategic axis.

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;

use crate::state::models::StrategyRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// `fortaleza`, `debilidad`, `oportunidad`, `amenaza`, `estrategia` or `eje`.
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub label: String,
}

/// Nodes/edges payload in the shape browser graph libraries consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphPayload {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Build the strategy graph. Elements and axes shared by several strategies
/// become a single node.
pub fn build_graph(strategies: &[StrategyRecord]) -> DiGraph<GraphNode, String> {
    let mut graph = DiGraph::new();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();

    let mut node = |graph: &mut DiGraph<GraphNode, String>, n: GraphNode| -> NodeIndex {
        *index
            .entry(n.id.clone())
            .or_insert_with(|| graph.add_node(n))
    };

    for s in strategies {
        let strategy = node(
            &mut graph,
            GraphNode {
                id: format!("estrategia:{}", s.id),
                label: s.estrategia.clone(),
                group: "estrategia".to_string(),
            },
        );
        let internal = node(
            &mut graph,
            GraphNode {
                id: format!("interno:{}", s.interno_id),
                label: s.interno_texto.clone(),
                group: s.interno_tipo.as_str().to_string(),
            },
        );
        let external = node(
            &mut graph,
            GraphNode {
                id: format!("externo:{}", s.externo_id),
                label: s.externo_texto.clone(),
                group: s.externo_tipo.as_str().to_string(),
            },
        );
        graph.add_edge(internal, strategy, s.tipo_cruce.as_str().to_string());
        graph.add_edge(external, strategy, s.tipo_cruce.as_str().to_string());

        if let Some(ref eje_id) = s.eje_id {
            let axis = node(
                &mut graph,
                GraphNode {
                    id: format!("eje:{}", eje_id),
                    label: s.eje_label.clone().unwrap_or_else(|| eje_id.clone()),
                    group: "eje".to_string(),
                },
            );
            graph.add_edge(strategy, axis, "eje".to_string());
        }
    }

    graph
}

pub fn to_payload(graph: &DiGraph<GraphNode, String>) -> GraphPayload {
    let nodes = graph.node_indices().map(|idx| graph[idx].clone()).collect();
    let edges = graph
        .edge_indices()
        .filter_map(|edge| {
            let (from, to) = graph.edge_endpoints(edge)?;
            Some(GraphEdge {
                from: graph[from].id.clone(),
                to: graph[to].id.clone(),
                label: graph[edge].clone(),
            })
        })
        .collect();
    GraphPayload { nodes, edges }
}

/// Convert the strategy graph to DOT format.
pub fn to_dot(graph: &DiGraph<GraphNode, String>) -> String {
    let mut lines = Vec::new();
    lines.push("digraph estrategias {".to_string());
    lines.push("    rankdir=LR;".to_string());
    lines.push("    node [shape=box, style=filled];".to_string());

    for idx in graph.node_indices() {
        let n = &graph[idx];
        lines.push(format!(
            "    \"{}\" [label=\"{}\", fillcolor={}];",
            escape(&n.id),
            escape(&n.label),
            fill_color(&n.group)
        ));
    }

    for edge in graph.edge_indices() {
        if let Some((from, to)) = graph.edge_endpoints(edge) {
            lines.push(format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];",
                escape(&graph[from].id),
                escape(&graph[to].id),
                escape(&graph[edge])
            ));
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}

fn fill_color(group: &str) -> &'static str {
    match group {
        "fortaleza" => "palegreen",
        "debilidad" => "lightsalmon",
        "oportunidad" => "lightblue",
        "amenaza" => "khaki",
        "eje" => "plum",
        _ => "white",
    }
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CrossType, ElementKind};

    fn strategy(id: i64, interno_id: i64, externo_id: i64, eje: Option<&str>) -> StrategyRecord {
        StrategyRecord {
            id,
            tipo_cruce: CrossType::Fo,
            interno_id,
            interno_tipo: ElementKind::Fortaleza,
            interno_texto: format!("Fortaleza {}", interno_id),
            externo_id,
            externo_tipo: ElementKind::Oportunidad,
            externo_texto: format!("Oportunidad {}", externo_id),
            estrategia: format!("Estrategia \"{}\"", id),
            eje_id: eje.map(str::to_string),
            eje_label: eje.map(|_| "Salud".to_string()),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            created_by: None,
        }
    }

    #[test]
    fn shared_elements_are_one_node() {
        let graph = build_graph(&[
            strategy(1, 10, 20, Some("SALUD")),
            strategy(2, 10, 21, Some("SALUD")),
        ]);
        let payload = to_payload(&graph);
        // 2 strategies + 1 internal + 2 external + 1 axis
        assert_eq!(payload.nodes.len(), 6);
        // 2 element edges per strategy + 1 axis edge each
        assert_eq!(payload.edges.len(), 6);
        assert!(payload
            .edges
            .iter()
            .any(|e| e.from == "interno:10" && e.to == "estrategia:2" && e.label == "FO"));
        assert!(payload
            .edges
            .iter()
            .any(|e| e.from == "estrategia:1" && e.to == "eje:SALUD"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(to_payload(&build_graph(&[])), GraphPayload::default());
    }

    #[test]
    fn dot_escapes_quotes() {
        let dot = to_dot(&build_graph(&[strategy(1, 10, 20, None)]));
        assert!(dot.starts_with("digraph estrategias {"));
        assert!(dot.contains("label=\"Estrategia \\\"1\\\"\""));
        assert!(dot.contains("\"interno:10\" -> \"estrategia:1\" [label=\"FO\"];"));
        assert!(dot.ends_with('}'));
    }
}
