//! Planning determinism and join/inline placement

mod common;

use aeroql::planner::{JobFlags, Planner};
use common::prepare;

const DOCUMENTS: &[&str] = &[
    "?category",
    "*category :asc name :offset 1 :limit 2",
    "#product (eq .category 3)",
    "*category + name +products(*product (eq .category ..id) :asc name)",
    "*category + name +grp(?group (eq .id ..group_id)) +n(#product (eq .category ..id))",
    "a: ?category\nb: *product (eq .category /a.id)\nc: (+ /d 1)\nd: #group",
    "*group +cats(*category (eq .group_id ..id) +p(?product (eq .category ..id)) +q(?product (eq .id ...id)))",
];

#[test]
fn planning_twice_yields_identical_plans() {
    for text in DOCUMENTS {
        let prepared = prepare(text);
        let again = Planner::new(prepared.document()).plan().unwrap();
        assert_eq!(prepared.plan(), &again, "{}", text);

        let third = Planner::new(prepared.document()).plan().unwrap();
        let explain_a = aeroql::planner::ExplainPlan::from_plan(&again, prepared.document()).to_string();
        let explain_b = aeroql::planner::ExplainPlan::from_plan(&third, prepared.document()).to_string();
        assert_eq!(explain_a, explain_b);
    }
}

fn child_flags(text: &str, child: &str) -> JobFlags {
    let prepared = prepare(text);
    let document = prepared.document();
    prepared
        .plan()
        .jobs()
        .iter()
        .find(|job| document.task(job.primary).name == child)
        .map(|job| job.flags)
        .unwrap()
}

#[test]
fn single_child_reading_parent_is_joined() {
    let flags = child_flags("*category +grp(?group (eq .id ..group_id))", "grp");
    assert!(flags.contains(JobFlags::SINGLE | JobFlags::JOINED));
    assert!(!flags.contains(JobFlags::INLINED));

    let prepared = prepare("*category +grp(?group (eq .id ..group_id))");
    let root = &prepared.plan().jobs()[0];
    assert!(root.flags.contains(JobFlags::JOINING));
    assert_eq!(root.tables.len(), 2);
}

#[test]
fn multi_child_is_inlined_and_aggregated() {
    let flags = child_flags("*category +products(*product (eq .category ..id))", "products");
    assert!(flags.contains(JobFlags::MULTI | JobFlags::INLINED | JobFlags::AGGREGATE_AS_DOCUMENT));
    assert!(!flags.contains(JobFlags::JOINED));
}

#[test]
fn independent_single_child_is_inlined() {
    let flags = child_flags("*category +first(?group)", "first");
    assert!(flags.contains(JobFlags::SINGLE | JobFlags::INLINED));
    assert!(!flags.contains(JobFlags::JOINED));
}

#[test]
fn single_child_reading_grandparent_only_is_inlined() {
    let text = "*group +cats(*category (eq .group_id ..id) +q(?product (eq .id ...id)))";
    let flags = child_flags(text, "q");
    assert!(flags.contains(JobFlags::INLINED));
    assert!(!flags.contains(JobFlags::JOINED));
}

#[test]
fn count_child_is_inlined() {
    let flags = child_flags("*category +n(#product (eq .category ..id))", "n");
    assert!(flags.contains(JobFlags::COUNT | JobFlags::INLINED));
}

#[test]
fn root_references_order_execution() {
    let prepared = prepare("c: (+ /d 1)\nd: #group\nb: *product (eq .category /a.id)\na: ?category");
    let document = prepared.document();
    let order: Vec<&str> = prepared
        .plan()
        .execution_order()
        .iter()
        .map(|job| document.task(prepared.plan().job(*job).primary).name.as_str())
        .collect();
    let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert!(position("d") < position("c"));
    assert!(position("a") < position("b"));
    assert_eq!(order.len(), 4);
}

#[test]
fn aliases_are_unique_per_plan() {
    let prepared = prepare(
        "*category +products(*product (eq .category ..id)) +more(*product (eq .category ..id))",
    );
    let aliases: Vec<&String> = prepared.plan().aliases().values().collect();
    assert_eq!(aliases.len(), 3);
    let mut unique = aliases.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3);
}
