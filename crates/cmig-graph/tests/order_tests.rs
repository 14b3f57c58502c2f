use cmig_graph::{build, ExportOptions, RootSelector};
use cmig_model::EntityType;
use cmig_store::MemoryStore;
use cmig_test_utils::{directive_position, include_body, policy};
use proptest::prelude::*;
use std::collections::HashSet;

fn policy_id(i: usize) -> String {
    format!("901c{i:028}")
}

/// Policy `i` includes every policy named in `includes[i]`
fn include_store(includes: &[Vec<usize>]) -> MemoryStore {
    let store = MemoryStore::new();
    for (i, targets) in includes.iter().enumerate() {
        let body: String = targets
            .iter()
            .map(|t| include_body(&format!("guid-{}", policy_id(*t))))
            .collect();
        store
            .insert(policy(&policy_id(i), &format!("Policy {i}")).with_body(body))
            .unwrap();
    }
    store
}

proptest! {
    #[test]
    fn prop_acyclic_includes_come_first(
        includes in proptest::collection::vec(proptest::collection::vec(0..12usize, 0..4), 1..12)
    ) {
        // Only include earlier policies, so the graph is acyclic
        let includes: Vec<Vec<usize>> = includes
            .into_iter()
            .enumerate()
            .map(|(i, targets)| targets.into_iter().filter(|t| *t < i).collect())
            .collect();
        let store = include_store(&includes);
        let root = includes.len() - 1;
        let export = build(&store, &RootSelector::policy(&policy_id(root)), ExportOptions::default()).unwrap();

        prop_assert!(export.verify().is_ok());
        prop_assert!(!export.dag.is_cyclic());
        for (i, targets) in includes.iter().enumerate() {
            if export.bundle.mappings.iter().all(|m| m.src_id.as_str() != policy_id(i)) {
                continue;
            }
            let dependent = directive_position(&export.bundle, EntityType::Policy, &policy_id(i));
            for t in targets {
                let dependency = directive_position(&export.bundle, EntityType::Policy, &policy_id(*t));
                prop_assert!(dependency < dependent);
            }
        }
    }

    #[test]
    fn prop_cyclic_includes_terminate_once_each(
        includes in proptest::collection::vec(proptest::collection::vec(0..8usize, 0..4), 1..8)
    ) {
        let n = includes.len();
        let includes: Vec<Vec<usize>> = includes
            .into_iter()
            .map(|targets| targets.into_iter().filter(|t| *t < n).collect())
            .collect();
        let store = include_store(&includes);
        let export = build(&store, &RootSelector::policy(&policy_id(0)), ExportOptions::default()).unwrap();

        let keys = export.bundle.directive_keys();
        let unique: HashSet<_> = keys.iter().collect();
        prop_assert_eq!(unique.len(), keys.len());
        prop_assert_eq!(export.bundle.references.len(), keys.len() - 1);
        prop_assert!(export.verify().is_ok());
    }
}
