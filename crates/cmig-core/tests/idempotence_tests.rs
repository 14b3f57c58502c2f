use cmig_core::prelude::*;
use cmig_test_utils::*;
use proptest::prelude::*;

fn reconciling_action() -> impl Strategy<Value = MappingAction> {
    prop::sample::select(vec![MappingAction::NewOrExisting, MappingAction::NewOrUpdate])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_repeated_imports_keep_target_ids(action in reconciling_action(), repeats in 1u32..4) {
        let config = MigrationConfig::new()
            .with_default_action(action)
            .with_passphrase_env("CMIG_TEST_PASSPHRASE_NEVER_SET");
        let source = MigrationEngine::new(order_policy_store(), config.clone());
        let bundle = source
            .export(&RootSelector::policy(POLICY_ID), source.export_options())
            .unwrap()
            .bundle;

        let target = MigrationEngine::new(MemoryStore::new(), config);
        let first = target.import(&bundle, ImportOptions::new()).unwrap();
        prop_assert!(first.is_success());
        let populated = target.store().len();

        for _ in 1..repeats {
            let again = target.import(&bundle, ImportOptions::new()).unwrap();
            prop_assert!(again.is_success());
            prop_assert_eq!(again.summary().created, 0);
            for (a, b) in first.results.iter().zip(&again.results) {
                prop_assert_eq!(a.target_id(), b.target_id());
            }
            prop_assert_eq!(target.store().len(), populated);
        }

        let revision = target
            .store()
            .revision(&EntityKey::new(EntityType::Policy, POLICY_ID))
            .unwrap()
            .unwrap();
        let expected = if action == MappingAction::NewOrUpdate { repeats } else { 1 };
        prop_assert_eq!(revision.number, expected);
    }
}
