//! Property-based tests for the evaluation invariants.
//!
//! These cover determinism, the boolean pass rule, neutralization, and
//! waiver coverage across arbitrary findings and waiver declarations.

use std::collections::HashSet;

use checkgate_core::{
    evaluate, waiver, CheckConfig, CheckValue, Finding, Requirements, Severity, WaiverSet,
    Waivers,
};
use proptest::prelude::*;

// =========================================================================
// Helpers: arbitrary generators
// =========================================================================

fn arb_finding() -> impl Strategy<Value = Finding> {
    (
        "[A-Z][A-Z0-9]{0,3}/[A-Z]",
        prop::option::of(prop_oneof![
            Just("max_transition".to_string()),
            Just("max_capacitance".to_string()),
            Just("max_fanout".to_string()),
        ]),
        prop::option::of(1u32..5_000),
    )
        .prop_map(|(name, category, line)| {
            let mut finding = Finding::new(name);
            finding.category = category;
            finding.location.file = "reports/check.rpt".to_string();
            finding.location.line = line;
            finding
        })
}

fn arb_findings() -> impl Strategy<Value = Vec<Finding>> {
    prop::collection::vec(arb_finding(), 0..12)
}

fn arb_patterns() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just("max_transition".to_string()),
            Just("*capacitance*".to_string()),
            Just("fanout".to_string()),
            Just("U1/.*".to_string()),
            Just("bad[".to_string()),
        ],
        1..4,
    )
}

fn arb_waive_items() -> impl Strategy<Value = Vec<serde_json::Value>> {
    prop::collection::vec(
        prop_oneof![
            "[A-Z][A-Z0-9]{0,3}/[A-Z]"
                .prop_map(|name| serde_json::json!({ "name": name, "reason": "approved" })),
            "max_transition:[A-Z][A-Z0-9]{0,3}/[A-Z]"
                .prop_map(|name| serde_json::json!({ "name": name })),
            "[a-z ]{1,20}".prop_map(serde_json::Value::from),
            Just(serde_json::json!({ "reason": "no name" })),
        ],
        0..6,
    )
}

fn check_config(
    value: CheckValue,
    pattern_items: Vec<String>,
    waiver_value: CheckValue,
    waive_items: Vec<serde_json::Value>,
) -> CheckConfig {
    CheckConfig {
        item_id: None,
        description: None,
        input_files: Vec::new(),
        requirements: Requirements {
            value,
            pattern_items,
        },
        waivers: Waivers {
            value: waiver_value,
            waive_items,
        },
    }
}

fn arb_config() -> impl Strategy<Value = CheckConfig> {
    let boolean = (
        prop_oneof![
            Just(CheckValue::NotApplicable),
            (0u64..3).prop_map(CheckValue::Count)
        ],
        arb_waive_items(),
    )
        .prop_map(|(waiver_value, items)| {
            check_config(CheckValue::NotApplicable, Vec::new(), waiver_value, items)
        });

    let pattern = (
        0u64..4,
        arb_patterns(),
        prop_oneof![
            Just(CheckValue::NotApplicable),
            (0u64..3).prop_map(CheckValue::Count)
        ],
        arb_waive_items(),
    )
        .prop_map(|(expected, patterns, waiver_value, items)| {
            check_config(CheckValue::Count(expected), patterns, waiver_value, items)
        });

    prop_oneof![boolean, pattern]
}

// =========================================================================
// Properties
// =========================================================================

proptest! {
    #[test]
    fn evaluation_is_deterministic(config in arb_config(), findings in arb_findings()) {
        let first = evaluate(&config, &findings).unwrap();
        let second = evaluate(&config, &findings).unwrap();
        prop_assert_eq!(&first, &second);

        let ids: Vec<_> = first.groups.keys().collect();
        let again: Vec<_> = second.groups.keys().collect();
        prop_assert_eq!(ids, again);
    }

    #[test]
    fn boolean_check_passes_iff_no_findings(findings in arb_findings(), items in arb_waive_items()) {
        let config = check_config(CheckValue::NotApplicable, Vec::new(), CheckValue::NotApplicable, items);
        let result = evaluate(&config, &findings).unwrap();
        prop_assert_eq!(result.is_pass, findings.is_empty());
    }

    #[test]
    fn neutralized_check_always_passes_with_info_only(
        findings in arb_findings(),
        items in arb_waive_items(),
        patterns in prop::option::of(arb_patterns()),
        expected in 0u64..4,
    ) {
        let config = match patterns {
            Some(patterns) => check_config(CheckValue::Count(expected), patterns, CheckValue::Count(0), items),
            None => check_config(CheckValue::NotApplicable, Vec::new(), CheckValue::Count(0), items),
        };
        let result = evaluate(&config, &findings).unwrap();

        prop_assert!(result.is_pass);
        prop_assert!(result.details.iter().all(|d| d.severity == Severity::Info));
    }

    #[test]
    fn used_and_unused_waivers_partition_declared(findings in arb_findings(), items in arb_waive_items()) {
        let set = WaiverSet::parse(&items);
        let resolution = waiver::resolve(&findings, &set.entries);

        let used: HashSet<&str> = resolution.used_waivers.iter().map(|w| w.key.as_str()).collect();
        let unused: HashSet<&str> = resolution.unused_waivers.iter().map(|w| w.key.as_str()).collect();
        let declared: HashSet<&str> = set.entries.iter().map(|w| w.key.as_str()).collect();

        prop_assert!(used.is_disjoint(&unused));
        prop_assert!(used.is_subset(&declared));
        prop_assert_eq!(used.len() + unused.len(), declared.len());
        prop_assert_eq!(resolution.waived.len() + resolution.unwaived.len(), findings.len());
    }

    #[test]
    fn waived_findings_never_fail(findings in arb_findings(), items in arb_waive_items()) {
        let config = check_config(CheckValue::NotApplicable, Vec::new(), CheckValue::Count(1), items);
        let result = evaluate(&config, &findings).unwrap();

        let fails = result.count(Severity::Fail);
        prop_assert_eq!(result.is_pass, fails == 0);
    }
}
