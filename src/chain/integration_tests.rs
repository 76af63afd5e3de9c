//! Assembly of whole chains: problem reporting, pruning, waves and the
//! textual renderings.

use std::collections::BTreeSet;

use crate::chain::{Chain, ChainBuilder};
use crate::errors::{AssemblyError, AssemblyProblem};
use crate::item::{Item, ItemFlags, ItemId, ItemRegistry, MultiItem, SimpleItem};
use crate::step::{StepContext, StepDeclaration, StepError};

struct Config;
impl Item for Config {}
impl SimpleItem for Config {}

struct Sources;
impl Item for Sources {}
impl SimpleItem for Sources {}

struct Binary;
impl Item for Binary {}
impl SimpleItem for Binary {}

struct Report;
impl Item for Report {}
impl SimpleItem for Report {}

struct Warning;
impl Item for Warning {}
impl MultiItem for Warning {}

struct Hint;
impl Item for Hint {}
impl SimpleItem for Hint {}

fn noop(_ctx: &mut StepContext) -> Result<(), StepError> {
    Ok(())
}

fn registry() -> ItemRegistry {
    let mut registry = ItemRegistry::new();
    registry
        .register::<Binary>(ItemFlags::FINAL)
        .register::<Report>(ItemFlags::FINAL)
        .register::<Hint>(ItemFlags::WEAK)
        .register_multi::<Warning>(ItemFlags::FINAL_WEAK);
    registry
}

fn assemble(steps: Vec<StepDeclaration>) -> Result<Chain, AssemblyError> {
    let mut builder = ChainBuilder::new(registry());
    builder.add_steps(steps);
    builder.build()
}

fn ids(problem: &AssemblyProblem) -> BTreeSet<&str> {
    problem.step_ids().into_iter().collect()
}

#[test]
fn test_duplicate_producer_reported_regardless_of_order() {
    let first = || StepDeclaration::new("link_a", noop).produces::<Binary>();
    let second = || StepDeclaration::new("link_b", noop).produces::<Binary>();

    for steps in [vec![first(), second()], vec![second(), first()]] {
        let err = assemble(steps).unwrap_err();
        assert_eq!(err.len(), 1);
        let problem = &err.problems()[0];
        match problem {
            AssemblyProblem::DuplicateProducer { item, overridable, .. } => {
                assert_eq!(*item, ItemId::simple::<Binary>());
                assert!(!overridable);
            }
            other => panic!("unexpected problem: {other}"),
        }
        assert_eq!(ids(problem), BTreeSet::from(["link_a", "link_b"]));
    }
}

#[test]
fn test_two_overridable_producers_conflict() {
    let err = assemble(vec![
        StepDeclaration::new("default_a", noop).produces_overridable::<Binary>(),
        StepDeclaration::new("default_b", noop).produces_overridable::<Binary>(),
    ])
    .unwrap_err();
    assert!(matches!(
        err.problems()[0],
        AssemblyProblem::DuplicateProducer {
            overridable: true,
            ..
        }
    ));
}

#[test]
fn test_regular_producer_replaces_overridable_one() {
    let chain = assemble(vec![
        StepDeclaration::new("default_link", noop).produces_overridable::<Binary>(),
        StepDeclaration::new("custom_link", noop).produces::<Binary>(),
    ])
    .unwrap();
    assert_eq!(chain.len(), 1);
    assert!(chain.find("custom_link").is_some());
    assert_eq!(chain.pruned_steps()[0].step_id(), "default_link");
}

#[test]
fn test_missing_producer_names_consumer() {
    let err = assemble(vec![StepDeclaration::new("link", noop)
        .consumes::<Sources>()
        .produces::<Binary>()])
    .unwrap_err();
    assert_eq!(err.len(), 1);
    match &err.problems()[0] {
        AssemblyProblem::MissingProducer { item, consumer } => {
            assert_eq!(*item, ItemId::simple::<Sources>());
            assert_eq!(consumer.step_id(), "link");
        }
        other => panic!("unexpected problem: {other}"),
    }
}

#[test]
fn test_required_multi_item_needs_a_producer() {
    let err = assemble(vec![StepDeclaration::new("summarize", noop)
        .consumes_multi::<Warning>()
        .produces::<Report>()])
    .unwrap_err();
    assert!(matches!(
        err.problems()[0],
        AssemblyProblem::MissingProducer { .. }
    ));
}

#[test]
fn test_optional_consumer_of_unproduced_weak_item_builds() {
    let chain = assemble(vec![StepDeclaration::new("link", noop)
        .consumes_optional::<Hint>()
        .produces::<Binary>()])
    .unwrap();
    assert_eq!(chain.len(), 1);
    assert!(chain.steps()[0].upstream().is_empty());
}

#[test]
fn test_optional_consumer_of_strong_item_is_rejected() {
    let err = assemble(vec![StepDeclaration::new("link", noop)
        .consumes_optional::<Sources>()
        .produces::<Binary>()])
    .unwrap_err();
    assert!(matches!(
        err.problems()[0],
        AssemblyProblem::WeakConsumeNotAllowed { .. }
    ));
}

#[test]
fn test_initial_item_cannot_be_produced() {
    let mut builder = ChainBuilder::new(registry());
    builder
        .add_initial::<Config>()
        .add_step(StepDeclaration::new("configure", noop).produces::<Config>())
        .add_step(
            StepDeclaration::new("link", noop)
                .consumes::<Config>()
                .produces::<Binary>(),
        );
    let err = builder.build().unwrap_err();
    assert!(matches!(
        err.problems()[0],
        AssemblyProblem::InitialItemProduced { .. }
    ));
}

#[test]
fn test_every_problem_reported_in_one_pass() {
    let err = assemble(vec![
        StepDeclaration::new("link", noop).produces::<Binary>(),
        StepDeclaration::new("link", noop)
            .consumes::<Sources>()
            .produces::<Report>(),
        StepDeclaration::new("relink", noop).produces::<Binary>(),
    ])
    .unwrap_err();

    let kinds: BTreeSet<&str> = err
        .problems()
        .iter()
        .map(|problem| match problem {
            AssemblyProblem::DuplicateStepId { .. } => "duplicate_step",
            AssemblyProblem::DuplicateProducer { .. } => "duplicate_producer",
            AssemblyProblem::MissingProducer { .. } => "missing_producer",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        BTreeSet::from(["duplicate_step", "duplicate_producer", "missing_producer"])
    );
    assert!(err.to_string().contains("3 problem(s)"));
}

#[test]
fn test_two_step_cycle_names_both_steps() {
    let err = assemble(vec![
        StepDeclaration::new("compile", noop)
            .consumes::<Config>()
            .produces::<Sources>()
            .produces::<Binary>(),
        StepDeclaration::new("configure", noop)
            .consumes::<Sources>()
            .produces::<Config>(),
    ])
    .unwrap_err();

    assert!(err.has_cycle());
    let cycle = err
        .problems()
        .iter()
        .find(|p| matches!(p, AssemblyProblem::DependencyCycle { .. }))
        .unwrap();
    assert_eq!(ids(cycle), BTreeSet::from(["compile", "configure"]));
    assert_eq!(cycle.step_ids().len(), 2);
}

#[test]
fn test_three_step_cycle_names_every_step() {
    let err = assemble(vec![
        StepDeclaration::new("a", noop)
            .consumes::<Config>()
            .produces::<Sources>(),
        StepDeclaration::new("b", noop)
            .consumes::<Sources>()
            .produces::<Hint>(),
        StepDeclaration::new("c", noop)
            .consumes::<Hint>()
            .produces::<Config>(),
        StepDeclaration::new("sink", noop)
            .consumes::<Config>()
            .produces::<Report>(),
    ])
    .unwrap_err();

    let cycles: Vec<&AssemblyProblem> = err
        .problems()
        .iter()
        .filter(|p| matches!(p, AssemblyProblem::DependencyCycle { .. }))
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(ids(cycles[0]), BTreeSet::from(["a", "b", "c"]));
    assert!(!ids(cycles[0]).contains("sink"));
}

#[test]
fn test_self_consuming_step_is_a_cycle() {
    let err = assemble(vec![StepDeclaration::new("regenerate", noop)
        .consumes::<Sources>()
        .produces::<Sources>()
        .always_run()])
    .unwrap_err();
    assert!(err.has_cycle());
    assert_eq!(err.problems()[0].step_ids(), vec!["regenerate"]);
}

#[test]
fn test_cycle_among_pruned_steps_is_ignored() {
    let chain = assemble(vec![
        StepDeclaration::new("a", noop)
            .consumes::<Config>()
            .produces::<Sources>(),
        StepDeclaration::new("b", noop)
            .consumes::<Sources>()
            .produces::<Config>(),
        StepDeclaration::new("link", noop).produces::<Binary>(),
    ])
    .unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.pruned_steps().len(), 2);
}

fn pipeline() -> Chain {
    let mut builder = ChainBuilder::new(registry());
    builder
        .add_initial::<Config>()
        .add_steps([
            StepDeclaration::new("report", noop)
                .consumes::<Binary>()
                .consumes_multi_optional::<Warning>()
                .produces::<Report>(),
            StepDeclaration::new("link", noop)
                .consumes::<Sources>()
                .produces::<Binary>()
                .produces_multi::<Warning>(),
            StepDeclaration::new("fetch", noop)
                .consumes::<Config>()
                .produces::<Sources>(),
            StepDeclaration::new("lint", noop)
                .consumes::<Sources>()
                .produces_multi::<Warning>(),
        ]);
    builder.build().unwrap()
}

#[test]
fn test_waves_and_edges_of_a_pipeline() {
    let chain = pipeline();
    let waves: Vec<Vec<&str>> = chain
        .waves()
        .iter()
        .map(|wave| wave.iter().map(|&i| chain.step(i).unwrap().id()).collect())
        .collect();
    assert_eq!(
        waves,
        vec![vec!["fetch"], vec!["link", "lint"], vec!["report"]]
    );

    let report = chain.find("report").unwrap();
    let upstream: BTreeSet<&str> = report
        .upstream()
        .iter()
        .map(|&i| chain.step(i).unwrap().id())
        .collect();
    assert_eq!(upstream, BTreeSet::from(["link", "lint"]));
    assert!(chain.find("fetch").unwrap().upstream().is_empty());
    assert!(chain.initial_items().contains(&ItemId::simple::<Config>()));
    assert_eq!(chain.edges().count(), 4);
}

#[test]
fn test_dot_output_labels_edges_with_items() {
    let dot = pipeline().to_dot();
    assert!(dot.starts_with("digraph buildchain {"));
    assert!(dot.contains("\"fetch\" -> \"link\" [label=\"Sources\"];"));
    assert!(dot.contains("\"link\" -> \"report\" [label=\"Binary\\nWarning\"]")
        || dot.contains("\"link\" -> \"report\" [label=\"Warning\\nBinary\"]"));
    assert!(dot.contains("rank=same;"));
    assert!(dot.trim_end().ends_with('}'));
}

#[test]
fn test_description_serializes_to_json() {
    let chain = pipeline();
    let json = serde_json::to_value(chain.describe()).unwrap();

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    let ids: Vec<&str> = steps.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["report", "link", "fetch", "lint"]);
    assert_eq!(json["waves"][0][0], "fetch");
    assert_eq!(json["edges"].as_array().unwrap().len(), 4);
    assert!(json["pruned"].as_array().unwrap().is_empty());

    let report = &steps[0];
    let consumes: Vec<&str> = report["consumes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(consumes.iter().any(|c| c.ends_with("Warning?")));
}
