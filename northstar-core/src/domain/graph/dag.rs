// northstar-core/src/domain/graph/dag.rs

use crate::domain::error::DomainError;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// A node of the dependency graph: an identifier and the identifiers it depends on.
pub trait DependencyNode {
    fn node_id(&self) -> &str;
    fn node_dependencies(&self) -> &[String];
}

pub struct GraphSolver;

impl GraphSolver {
    /// Calculates the evaluation order of nodes (Topological Sort).
    /// Returns indices into `nodes`. When several nodes are ready at once, the one declared
    /// first wins, so the order is deterministic.
    ///
    /// Every dependency must name a node of the slice; unknown names and duplicate ids are
    /// configuration errors, and so is a cycle.
    pub fn plan_execution<N: DependencyNode>(nodes: &[N]) -> Result<Vec<usize>, DomainError> {
        // 1. Initialization: index every declared node
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.node_id(), i).is_some() {
                return Err(DomainError::Configuration(format!(
                    "Duplicate identifier '{}'",
                    node.node_id()
                )));
            }
        }

        // 2. Graph Construction (Dependency Inversion)
        let mut in_degree = vec![0usize; nodes.len()];
        let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

        for (i, node) in nodes.iter().enumerate() {
            for dep_name in node.node_dependencies() {
                let dep = *index.get(dep_name.as_str()).ok_or_else(|| {
                    DomainError::Configuration(format!(
                        "'{}' depends on unknown identifier '{}'",
                        node.node_id(),
                        dep_name
                    ))
                })?;
                adj_list[dep].push(i);
                in_degree[i] += 1;
            }
        }

        // 3. Kahn's Algorithm, ready set ordered by declaration index
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(Reverse(current)) = ready.pop() {
            order.push(current);
            for &neighbor in &adj_list[current] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    ready.push(Reverse(neighbor));
                }
            }
        }

        // 4. Cycle Detection
        if order.len() != nodes.len() {
            let stuck: Vec<&str> = nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, n)| n.node_id())
                .collect();
            return Err(DomainError::CircularDependency(format!(
                "{} (resolved {}/{} nodes)",
                stuck.join(", "),
                order.len(),
                nodes.len()
            )));
        }

        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    struct MockNode {
        id: String,
        deps: Vec<String>,
    }

    impl DependencyNode for MockNode {
        fn node_id(&self) -> &str {
            &self.id
        }
        fn node_dependencies(&self) -> &[String] {
            &self.deps
        }
    }

    fn create_mock_node(name: &str, deps: Vec<&str>) -> MockNode {
        MockNode {
            id: name.to_string(),
            deps: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn names(nodes: &[MockNode], order: &[usize]) -> Vec<String> {
        order.iter().map(|i| nodes[*i].id.clone()).collect()
    }

    #[test]
    fn test_dag_linear() -> Result<()> {
        // C depends on B, B depends on A, declared in reverse
        let nodes = vec![
            create_mock_node("metric_c", vec!["metric_b"]),
            create_mock_node("metric_b", vec!["metric_a"]),
            create_mock_node("metric_a", vec![]),
        ];

        let plan = GraphSolver::plan_execution(&nodes)?;
        assert_eq!(names(&nodes, &plan), vec!["metric_a", "metric_b", "metric_c"]);
        Ok(())
    }

    #[test]
    fn test_dag_ties_follow_declaration_order() -> Result<()> {
        let nodes = vec![
            create_mock_node("vpac", vec!["orders", "items"]),
            create_mock_node("zeta", vec![]),
            create_mock_node("orders", vec![]),
            create_mock_node("items", vec![]),
        ];

        let plan = GraphSolver::plan_execution(&nodes)?;
        assert_eq!(names(&nodes, &plan), vec!["zeta", "orders", "items", "vpac"]);
        Ok(())
    }

    #[test]
    fn test_dag_cycle_error() {
        let nodes = vec![
            create_mock_node("metric_a", vec!["metric_b"]),
            create_mock_node("metric_b", vec!["metric_a"]),
            create_mock_node("metric_c", vec![]),
        ];

        let result = GraphSolver::plan_execution(&nodes);
        match result {
            Err(DomainError::CircularDependency(msg)) => {
                assert!(msg.contains("metric_a"));
                assert!(msg.contains("metric_b"));
                assert!(!msg.contains("metric_c"));
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_dag_self_loop_is_cycle() {
        let nodes = vec![create_mock_node("metric_a", vec!["metric_a"])];
        assert!(matches!(
            GraphSolver::plan_execution(&nodes),
            Err(DomainError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_dag_unknown_dependency() {
        let nodes = vec![create_mock_node("metric_a", vec!["ghost"])];
        assert!(matches!(
            GraphSolver::plan_execution(&nodes),
            Err(DomainError::Configuration(msg)) if msg.contains("ghost")
        ));
    }

    #[test]
    fn test_dag_duplicate_identifier() {
        let nodes = vec![
            create_mock_node("metric_a", vec![]),
            create_mock_node("metric_a", vec![]),
        ];
        assert!(matches!(
            GraphSolver::plan_execution(&nodes),
            Err(DomainError::Configuration(msg)) if msg.contains("Duplicate")
        ));
    }
}
