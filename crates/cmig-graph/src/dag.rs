//! Discovered dependency edges
//!
//! Edges run from dependency to dependent. Configuration graphs may be cyclic
//! (an encapsulated assertion whose backing policy invokes it), so cycles are
//! recorded rather than rejected; [`DependencyDag::verify_order`] checks an
//! emitted order against every edge that is not part of a cycle.

use crate::error::GraphError;
use cmig_model::EntityKey;
use indexmap::IndexSet;
use parking_lot::RwLock;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use std::collections::HashMap;

/// Dependency graph over entity keys
#[derive(Debug, Default)]
pub struct DependencyDag {
    keys: RwLock<IndexSet<EntityKey>>,
    inner: RwLock<DiGraphMap<usize, ()>>,
}

impl DependencyDag {
    /// Empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index
    pub fn add_node(&self, key: &EntityKey) -> usize {
        let mut keys = self.keys.write();
        let (index, _) = keys.insert_full(key.clone());
        self.inner.write().add_node(index);
        index
    }

    /// Record that `dependent` depends on `dependency`
    pub fn add_edge(&self, dependency: &EntityKey, dependent: &EntityKey) -> Result<(), GraphError> {
        if dependency == dependent {
            return Err(GraphError::SelfLoop(dependency.clone()));
        }
        let from = self.add_node(dependency);
        let to = self.add_node(dependent);
        self.inner.write().add_edge(from, to, ());
        Ok(())
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.inner.read().node_count()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.inner.read().edge_count()
    }

    /// Whether any cycle exists
    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&*self.inner.read())
    }

    /// Groups of mutually dependent entities
    pub fn cycles(&self) -> Vec<Vec<EntityKey>> {
        let keys = self.keys.read();
        let g = self.inner.read();
        tarjan_scc(&*g)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().filter_map(|i| keys.get_index(i).cloned()).collect())
            .collect()
    }

    /// Check that `order` lists every node with each dependency first
    ///
    /// Edges inside a cycle are exempt.
    ///
    /// # Errors
    ///
    /// The first missing node or violated edge.
    pub fn verify_order(&self, order: &[EntityKey]) -> Result<(), GraphError> {
        let positions: HashMap<&EntityKey, usize> =
            order.iter().enumerate().map(|(i, k)| (k, i)).collect();
        let keys = self.keys.read();
        let g = self.inner.read();

        let mut component = HashMap::new();
        for (c, scc) in tarjan_scc(&*g).into_iter().enumerate() {
            for node in scc {
                component.insert(node, c);
            }
        }

        for node in g.nodes() {
            let Some(key) = keys.get_index(node) else {
                continue;
            };
            if !positions.contains_key(key) {
                return Err(GraphError::MissingFromOrder(key.clone()));
            }
        }

        for (from, to, _) in g.all_edges() {
            if component.get(&from) == component.get(&to) {
                continue;
            }
            let (Some(dependency), Some(dependent)) = (keys.get_index(from), keys.get_index(to)) else {
                continue;
            };
            if positions[dependency] > positions[dependent] {
                return Err(GraphError::OrderViolation {
                    dependency: dependency.clone(),
                    dependent: dependent.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmig_model::EntityType;

    fn key(id: &str) -> EntityKey {
        EntityKey::new(EntityType::Policy, id)
    }

    #[test]
    fn test_add_edge_rejects_self_loop() {
        let dag = DependencyDag::new();
        assert!(matches!(dag.add_edge(&key("a"), &key("a")), Err(GraphError::SelfLoop(_))));
        assert_eq!(dag.edge_count(), 0);
    }

    #[test]
    fn test_cycle_is_recorded_not_rejected() {
        let dag = DependencyDag::new();
        dag.add_edge(&key("a"), &key("b")).unwrap();
        dag.add_edge(&key("b"), &key("a")).unwrap();
        dag.add_edge(&key("zone"), &key("a")).unwrap();
        assert!(dag.is_cyclic());
        let cycles = dag.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
        assert!(!cycles[0].contains(&key("zone")));
    }

    #[test]
    fn test_verify_order_exempts_cycle_edges() {
        let dag = DependencyDag::new();
        dag.add_edge(&key("a"), &key("b")).unwrap();
        dag.add_edge(&key("b"), &key("a")).unwrap();
        dag.add_edge(&key("root"), &key("a")).unwrap();
        assert!(dag.verify_order(&[key("root"), key("b"), key("a")]).is_ok());
        assert!(matches!(
            dag.verify_order(&[key("b"), key("a"), key("root")]),
            Err(GraphError::OrderViolation { .. })
        ));
        assert!(matches!(
            dag.verify_order(&[key("a"), key("b")]),
            Err(GraphError::MissingFromOrder(_))
        ));
    }
}
