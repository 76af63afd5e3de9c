use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use the_buildchain::chain::ChainBuilder;
use the_buildchain::engine::{ChainExecutor, InitialItems};
use the_buildchain::errors::{AssemblyProblem, ContextError};
use the_buildchain::item::{Item, ItemFlags, ItemRegistry, MultiItem, SimpleItem};
use the_buildchain::step::{StepContext, StepDeclaration, StepError};

const MAX_STEPS: usize = 8;

// Item types are fixed at compile time, so step `i` of a generated chain
// produces `Out<i>` and looks its inputs up by index.
macro_rules! outputs {
    ($($name:ident => $index:literal),* $(,)?) => {
        $(
            struct $name;
            impl Item for $name {}
            impl SimpleItem for $name {}
        )*

        fn register_outputs(registry: &mut ItemRegistry) {
            $( registry.register::<$name>(ItemFlags::FINAL); )*
        }

        fn produce(declaration: StepDeclaration, index: usize) -> StepDeclaration {
            match index {
                $( $index => declaration.produces::<$name>(), )*
                _ => declaration,
            }
        }

        fn consume(declaration: StepDeclaration, index: usize) -> StepDeclaration {
            match index {
                $( $index => declaration.consumes::<$name>(), )*
                _ => declaration,
            }
        }

        fn publish(ctx: &mut StepContext, index: usize) -> Result<(), ContextError> {
            match index {
                $( $index => ctx.publish($name), )*
                _ => Ok(()),
            }
        }

        fn read(ctx: &StepContext, index: usize) -> Result<(), ContextError> {
            match index {
                $( $index => ctx.get::<$name>().map(|_| ()), )*
                _ => Ok(()),
            }
        }
    };
}

outputs! {
    Out0 => 0, Out1 => 1, Out2 => 2, Out3 => 3,
    Out4 => 4, Out5 => 5, Out6 => 6, Out7 => 7,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Start(usize),
    Finish(usize),
}

// Acyclic by construction: step i may only depend on steps 0..i.
fn dag_strategy() -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=MAX_STEPS).prop_flat_map(|count| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..count), count)
            .prop_map(|raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        }
                    })
                    .collect()
            })
    })
}

fn instrumented_step(
    index: usize,
    deps: &BTreeSet<usize>,
    journal: Arc<Mutex<Vec<Event>>>,
) -> StepDeclaration {
    let inputs: Vec<usize> = deps.iter().copied().collect();
    let body = move |ctx: &mut StepContext| -> Result<(), StepError> {
        journal.lock().unwrap().push(Event::Start(index));
        for &input in &inputs {
            read(ctx, input)?;
        }
        publish(ctx, index)?;
        journal.lock().unwrap().push(Event::Finish(index));
        Ok(())
    };

    let mut declaration = StepDeclaration::new(format!("step_{}", index), body);
    for &dep in deps {
        declaration = consume(declaration, dep);
    }
    produce(declaration, index)
}

fn position(journal: &[Event], event: Event) -> usize {
    journal
        .iter()
        .position(|&e| e == event)
        .unwrap_or(usize::MAX)
}

struct Value(u32);
impl Item for Value {}
impl MultiItem for Value {}

struct Noise;
impl Item for Noise {}
impl MultiItem for Noise {}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_steps_start_only_after_their_producers_finish(
        dag in dag_strategy(),
        concurrency in 1..4usize,
    ) {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ItemRegistry::new();
        register_outputs(&mut registry);

        let mut builder = ChainBuilder::new(registry);
        for (index, deps) in dag.iter().enumerate() {
            builder.add_step(instrumented_step(index, deps, journal.clone()));
        }
        let chain = builder.build().unwrap();

        for (index, deps) in dag.iter().enumerate() {
            let step = chain.find(&format!("step_{}", index)).unwrap();
            let expected_wave = deps
                .iter()
                .map(|&dep| chain.find(&format!("step_{}", dep)).unwrap().wave() + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(step.wave(), expected_wave);
        }

        let result = ChainExecutor::new(concurrency)
            .run_blocking(&chain, InitialItems::new())
            .unwrap();
        prop_assert_eq!(result.len(), dag.len());

        let journal = journal.lock().unwrap().clone();
        prop_assert_eq!(journal.len(), dag.len() * 2);
        for (index, deps) in dag.iter().enumerate() {
            let started = position(&journal, Event::Start(index));
            for &dep in deps {
                prop_assert!(
                    position(&journal, Event::Finish(dep)) < started,
                    "step_{} started before its producer step_{} finished",
                    index,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_multi_item_is_union_of_contributions(
        contributions in proptest::collection::vec(proptest::collection::vec(any::<u32>(), 0..5), 1..6),
    ) {
        let mut registry = ItemRegistry::new();
        registry.register_multi::<Value>(ItemFlags::FINAL);

        let mut builder = ChainBuilder::new(registry);
        for (index, values) in contributions.iter().enumerate() {
            let values = values.clone();
            builder.add_step(
                StepDeclaration::new(
                    format!("contributor_{}", index),
                    move |ctx: &mut StepContext| -> Result<(), StepError> {
                        ctx.contribute_all(values.iter().map(|&v| Value(v)))?;
                        Ok(())
                    },
                )
                .produces_multi::<Value>(),
            );
        }
        let chain = builder.build().unwrap();

        let result = ChainExecutor::new(3)
            .run_blocking(&chain, InitialItems::new())
            .unwrap();

        let mut observed: Vec<u32> = result.get_all::<Value>().iter().map(|v| v.0).collect();
        let mut expected: Vec<u32> = contributions.into_iter().flatten().collect();
        observed.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(observed, expected);
    }

    #[test]
    fn test_duplicate_producer_found_in_any_declaration_order(
        order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let mut registry = ItemRegistry::new();
        registry
            .register::<Out0>(ItemFlags::FINAL)
            .register_multi::<Noise>(ItemFlags::FINAL);

        let noop = |_ctx: &mut StepContext| -> Result<(), StepError> { Ok(()) };
        let mut builder = ChainBuilder::new(registry);
        for &slot in &order {
            let declaration = match slot {
                0 => StepDeclaration::new("first_producer", noop).produces::<Out0>(),
                1 => StepDeclaration::new("second_producer", noop).produces::<Out0>(),
                other => StepDeclaration::new(format!("noise_{}", other), noop).produces_multi::<Noise>(),
            };
            builder.add_step(declaration);
        }

        let err = builder.build().unwrap_err();
        prop_assert_eq!(err.len(), 1);
        let named: BTreeSet<&str> = err.problems()[0].step_ids().into_iter().collect();
        prop_assert!(matches!(err.problems()[0], AssemblyProblem::DuplicateProducer { .. }), "expected DuplicateProducer");
        prop_assert_eq!(named, BTreeSet::from(["first_producer", "second_producer"]));
    }
}
