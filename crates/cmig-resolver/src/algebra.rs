//! Action/conflict algebra
//!
//! A pure function from the requested action, whether a target candidate
//! exists, and the directive's fail flags to what the resolver should do.
//!
//! | action          | candidate found                              | candidate absent                            |
//! |-----------------|----------------------------------------------|---------------------------------------------|
//! | NewOrExisting   | FailOnExisting: TargetExists, else use it    | FailOnNew: TargetNotFound, else create      |
//! | NewOrUpdate     | FailOnExisting: TargetExists, else update it | FailOnNew: TargetNotFound, else create      |
//! | AlwaysCreateNew | FailOnExisting: TargetExists, else create    | create                                      |
//! | Delete          | delete                                       | ignore                                      |
//! | Ignore          | ignore                                       | ignore                                      |

use cmig_model::{ErrorType, MappingAction, MappingProperties};

/// What to do with one directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Reuse the candidate
    UseExisting,
    /// Overwrite the candidate
    Update,
    /// Create a new entity
    Create,
    /// Remove the candidate
    Delete,
    /// Do nothing
    Ignore,
    /// Report a conflict
    Fail(ErrorType),
}

/// Decide the outcome for `action`
#[must_use]
pub fn decide(action: MappingAction, found: bool, properties: &MappingProperties) -> Decision {
    use MappingAction as A;

    match (action, found) {
        (A::Ignore, _) => Decision::Ignore,
        (A::Delete, true) => Decision::Delete,
        (A::Delete, false) => Decision::Ignore,
        (A::NewOrExisting | A::NewOrUpdate | A::AlwaysCreateNew, true)
            if properties.fail_on_existing =>
        {
            Decision::Fail(ErrorType::TargetExists)
        }
        (A::NewOrExisting, true) => Decision::UseExisting,
        (A::NewOrUpdate, true) => Decision::Update,
        (A::AlwaysCreateNew, _) => Decision::Create,
        (A::NewOrExisting | A::NewOrUpdate, false) if properties.fail_on_new => {
            Decision::Fail(ErrorType::TargetNotFound)
        }
        (A::NewOrExisting | A::NewOrUpdate, false) => Decision::Create,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn props(fail_on_new: bool, fail_on_existing: bool) -> MappingProperties {
        MappingProperties {
            fail_on_new,
            fail_on_existing,
            ..MappingProperties::default()
        }
    }

    #[test]
    fn test_full_table() {
        use Decision as D;
        use ErrorType as E;
        use MappingAction as A;

        // (action, found, FailOnNew, FailOnExisting) -> decision
        let table = [
            (A::NewOrExisting, true, false, false, D::UseExisting),
            (A::NewOrExisting, true, true, false, D::UseExisting),
            (A::NewOrExisting, true, false, true, D::Fail(E::TargetExists)),
            (A::NewOrExisting, false, false, false, D::Create),
            (A::NewOrExisting, false, true, false, D::Fail(E::TargetNotFound)),
            (A::NewOrExisting, false, false, true, D::Create),
            (A::NewOrUpdate, true, false, false, D::Update),
            (A::NewOrUpdate, true, false, true, D::Fail(E::TargetExists)),
            (A::NewOrUpdate, false, false, false, D::Create),
            (A::NewOrUpdate, false, true, true, D::Fail(E::TargetNotFound)),
            (A::AlwaysCreateNew, true, false, false, D::Create),
            (A::AlwaysCreateNew, true, false, true, D::Fail(E::TargetExists)),
            (A::AlwaysCreateNew, false, true, true, D::Create),
            (A::Delete, true, true, true, D::Delete),
            (A::Delete, false, true, true, D::Ignore),
            (A::Ignore, true, false, true, D::Ignore),
            (A::Ignore, false, true, false, D::Ignore),
        ];
        for (action, found, fail_on_new, fail_on_existing, expected) in table {
            assert_eq!(
                decide(action, found, &props(fail_on_new, fail_on_existing)),
                expected,
                "{action} found={found} new={fail_on_new} existing={fail_on_existing}"
            );
        }
    }

    #[test]
    fn test_delete_never_fails() {
        for found in [true, false] {
            for flags in [(false, false), (true, true)] {
                let decision = decide(MappingAction::Delete, found, &props(flags.0, flags.1));
                assert!(!matches!(decision, Decision::Fail(_)));
            }
        }
    }
}
