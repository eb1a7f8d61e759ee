//! Restricted-subset reconciliation properties and scenarios.

use std::{collections::BTreeMap, path::Path};

use proptest::prelude::*;
use vendroll_core::{
    Classification, Overrides, SubsetPolicy, digest_bytes, digest_file,
    subset::{self, HandEdit},
};
use vendroll_harness::Workspace;

/// Subset file names; small alphabet so upstream and subset overlap.
fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("a.c".to_string()),
        Just("b.c".to_string()),
        Just("crypto/mem.c".to_string()),
        Just("crypto/bn/add.c".to_string()),
        Just("include/openssl/ssl.h".to_string()),
    ]
}

/// Per file: upstream content, and whether the subset copy is stale.
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, (String, bool)>> {
    prop::collection::btree_map(name_strategy(), ("[a-z ]{0,40}", any::<bool>()), 1..5)
}

proptest! {
    /// After reconciliation every non-skipped subset file matches upstream,
    /// and a second pass changes nothing.
    #[test]
    fn prop_reconcile_converges(tree in tree_strategy()) {
        let ws = Workspace::new().unwrap();
        for (name, (content, stale)) in &tree {
            ws.write_upstream(name, content).unwrap();
            let local = if *stale { format!("{content} (old)") } else { content.clone() };
            ws.write_subset(name, &local).unwrap();
        }
        let config = ws.config(Overrides::default()).unwrap();
        let lookup = config.upstream_lookup();

        let first = subset::reconcile(&ws.subset(), &lookup, &config.subset_policy).unwrap();

        prop_assert!(first.manual.is_empty());
        for (name, (content, stale)) in &tree {
            let path = ws.subset().join(name);
            prop_assert_eq!(digest_file(&path).unwrap(), digest_bytes(content.as_bytes()));
            let expected =
                if *stale { Classification::Updated } else { Classification::Unchanged };
            prop_assert_eq!(first.class_of(name), Some(expected));
        }

        let second = subset::reconcile(&ws.subset(), &lookup, &config.subset_policy).unwrap();
        prop_assert_eq!(second.count(Classification::Updated), 0);
    }

    /// Planning never writes.
    #[test]
    fn prop_plan_is_read_only(tree in tree_strategy()) {
        let ws = Workspace::new().unwrap();
        for (name, (content, _)) in &tree {
            ws.write_upstream(name, content).unwrap();
            ws.write_subset(name, "local").unwrap();
        }
        let config = ws.config(Overrides::default()).unwrap();

        subset::plan(&ws.subset(), &config.upstream_lookup(), &config.subset_policy).unwrap();

        for name in tree.keys() {
            prop_assert_eq!(ws.read(ws.subset().join(name)).unwrap(), "local");
        }
    }
}

#[test]
fn differing_file_is_updated_and_missing_one_is_flagged() {
    let ws = Workspace::new().unwrap();
    ws.write_upstream("a.c", "int a = 2;\n").unwrap();
    ws.write_subset("a.c", "int a = 1;\n").unwrap();
    ws.write_subset("b.c", "int b;\n").unwrap();
    let config = ws.config(Overrides::default()).unwrap();

    let report =
        subset::reconcile(&ws.subset(), &config.upstream_lookup(), &config.subset_policy).unwrap();

    assert_eq!(ws.read(ws.subset().join("a.c")).unwrap(), "int a = 2;\n");
    assert_eq!(report.class_of("a.c"), Some(Classification::Updated));
    assert_eq!(report.class_of("b.c"), Some(Classification::MissingUpstream));
    assert_eq!(report.class_of("BUILD.gn"), Some(Classification::Skip));
    assert_eq!(report.class_of("README.fuchsia.md"), Some(Classification::Skip));
    assert!(report.manual.contains("b.c"));
    assert_eq!(report.manual.len(), 1);
    assert_eq!(ws.read(ws.subset().join("b.c")).unwrap(), "int b;\n");
}

#[test]
fn generated_file_at_vendored_root_wins() {
    let ws = Workspace::new().unwrap();
    ws.write_vendored("err_data.c", "generated\n").unwrap();
    ws.write_upstream("err_data.c", "stale\n").unwrap();
    ws.write_subset("err_data.c", "old\n").unwrap();
    let config = ws.config(Overrides::default()).unwrap();

    subset::reconcile(&ws.subset(), &config.upstream_lookup(), &config.subset_policy).unwrap();

    assert_eq!(ws.read(ws.subset().join("err_data.c")).unwrap(), "generated\n");
}

fn policy_with_hand_edit(rel: &str, upstream: &str) -> SubsetPolicy {
    let mut policy = SubsetPolicy::default();
    policy.hand_edits.insert(
        rel.to_string(),
        HandEdit { upstream: digest_bytes(upstream.as_bytes()), local: None },
    );
    policy
}

#[test]
fn hand_edit_is_kept_while_upstream_is_on_baseline() {
    let ws = Workspace::new().unwrap();
    ws.write_upstream("crypto/rand/urandom.c", "upstream v1\n").unwrap();
    ws.write_subset("crypto/rand/urandom.c", "upstream v1 + local patch\n").unwrap();
    let config = ws.config(Overrides::default()).unwrap();
    let policy = policy_with_hand_edit("crypto/rand/urandom.c", "upstream v1\n");

    let report = subset::reconcile(&ws.subset(), &config.upstream_lookup(), &policy).unwrap();

    assert_eq!(report.class_of("crypto/rand/urandom.c"), Some(Classification::Unchanged));
    assert!(report.manual.is_empty());
    assert_eq!(
        ws.read(ws.subset().join("crypto/rand/urandom.c")).unwrap(),
        "upstream v1 + local patch\n"
    );
}

#[test]
fn hand_edit_conflicts_when_upstream_moves() {
    let ws = Workspace::new().unwrap();
    ws.write_upstream("crypto/rand/urandom.c", "upstream v2\n").unwrap();
    ws.write_subset("crypto/rand/urandom.c", "upstream v1 + local patch\n").unwrap();
    let config = ws.config(Overrides::default()).unwrap();
    let policy = policy_with_hand_edit("crypto/rand/urandom.c", "upstream v1\n");

    let report = subset::reconcile(&ws.subset(), &config.upstream_lookup(), &policy).unwrap();

    assert_eq!(
        report.class_of("crypto/rand/urandom.c"),
        Some(Classification::ManuallyEditedConflict)
    );
    assert!(report.manual.contains(Path::new("crypto/rand/urandom.c")));
    assert_eq!(
        ws.read(ws.subset().join("crypto/rand/urandom.c")).unwrap(),
        "upstream v1 + local patch\n"
    );
}
