//! End-to-end factory runs

use af_core::prelude::*;
use af_core::{PointMutation, RandomGuess, ResampleAndClone};
use af_factory::prelude::*;
use af_factory::{BlendingCrossoverStage, EvaluatorStage, FnStage};
use af_test_utils::{batch_of, init_tracing, sample_batch, sample_cases};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn splitter(left: usize) -> FnStage {
    FnStage::new(["a", "b"], move |batch: &mut Batch| {
        let len = batch.len();
        let right = batch.split_off(left.min(len));
        let mut out = StageOutput::new();
        out.insert("a".to_string(), std::mem::take(batch));
        out.insert("b".to_string(), Batch::from(right));
        Ok(out)
    })
}

fn ten() -> Batch {
    batch_of(&["do a"; 10])
}

fn pass() -> FnStage {
    FnStage::new(["out"], |batch: &mut Batch| {
        let mut out = StageOutput::new();
        out.insert("out".to_string(), std::mem::take(batch));
        Ok(out)
    })
}

#[test]
fn two_path_machine_reports_gains() {
    init_tracing();
    let mut factory = Factory::default();
    factory
        .build_workstation("split")
        .unwrap()
        .build_machine("m", splitter(6))
        .unwrap()
        .set_path("a", Destination::workstation("left"))
        .set_path("b", Destination::workstation("right"));
    factory.build_workstation("left").unwrap();
    factory.build_workstation("right").unwrap();

    factory
        .deliver(ten(), &Destination::machine("split", "m"))
        .unwrap();
    factory.run_workstation("split").unwrap();

    let machine = factory.workstation("split").unwrap().machine("m").unwrap();
    assert_eq!(machine.total_answers_in(), 10);
    assert_eq!(machine.average_gain("a"), 0.6);
    assert_eq!(machine.average_gain("b"), 0.4);
    assert_eq!(factory.workstation("left").unwrap().inbox_len(), 6);
    assert_eq!(factory.workstation("right").unwrap().inbox_len(), 4);

    let report = factory.flow_report();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].machine, "m");
    assert_eq!(report[0].average_gain("a"), 0.6);
    assert_eq!(report[0].pending, 0);
}

#[test]
fn breed_then_score_loop() {
    init_tracing();
    let mut factory = Factory::new(
        FactoryConfig::new("loop")
            .with_instruction_names(["int_add", "int_subtract", "int_dup"])
            .with_type_names(["int"]),
    )
    .unwrap();
    let types = factory.type_library();
    let options = factory.operator_options().with_target_size(5);

    let breeder = factory.build_workstation("breeder").unwrap();
    breeder
        .build_machine(
            "mutate",
            OperatorStage::new(PointMutation::new(types.clone()).with_options(options.clone())),
        )
        .unwrap()
        .set_path(PARENTS, Destination::machine("scorer", "score"))
        .set_path(CREATED, Destination::machine("scorer", "score"));

    let evaluator = TestCaseEvaluator::new(EvaluatorConfig::new("error"))
        .unwrap()
        .with_instructions(factory.instruction_library())
        .with_types(types);
    factory
        .build_workstation("scorer")
        .unwrap()
        .build_machine("score", EvaluatorStage::new(evaluator, sample_cases()))
        .unwrap()
        .set_path(SCORED, Destination::workstation("archive"));
    factory.build_workstation("archive").unwrap();

    factory
        .deliver(sample_batch(), &Destination::machine("breeder", "mutate"))
        .unwrap();
    factory.cycle().unwrap();

    let archive = factory.workstation("archive").unwrap().take_inbox();
    assert_eq!(archive.len(), 8);
    assert!(archive.iter().all(|a| a.score("error").is_some()));
    assert_eq!(archive.iter().filter(|a| a.progress() == 1).count(), 4);
}

#[test]
fn blending_stage_in_a_factory() {
    let mut factory = Factory::default();
    let types = factory.type_library();
    factory
        .build_workstation("w")
        .unwrap()
        .build_machine("blend", BlendingCrossoverStage::new(types).create(3))
        .unwrap()
        .set_path(PARENTS, Destination::workstation("w"))
        .set_path(CREATED, Destination::workstation("w"));
    factory
        .deliver(
            batch_of(&["value «int»\n«int» 1", "value «int»\n«int» 9"]),
            &Destination::machine("w", "blend"),
        )
        .unwrap();
    factory.cycle().unwrap();

    let inbox = factory.workstation("w").unwrap().take_inbox();
    assert_eq!(inbox.len(), 5);
    let machine = factory.workstation("w").unwrap().machine("blend").unwrap();
    assert_eq!(machine.average_gain(CREATED), 1.5);
}

#[test]
fn random_guesses_seed_an_empty_factory() {
    let mut factory = Factory::default();
    let guess = RandomGuess::new(factory.type_library())
        .with_options(factory.operator_options().with_target_size(4));
    factory
        .build_workstation("seed")
        .unwrap()
        .build_machine("guess", OperatorStage::new(guess).with_count(6))
        .unwrap()
        .set_path(PARENTS, Destination::workstation("seed"))
        .set_path(CREATED, Destination::workstation("seed"));

    factory.cycle().unwrap();
    let seeded = factory.workstation("seed").unwrap().take_inbox();
    assert_eq!(seeded.len(), 6);
    assert!(seeded.iter().all(|a| a.points() == 4));
}

#[test]
fn stage_failure_keeps_queue() {
    let mut factory = Factory::default();
    factory
        .build_workstation("w")
        .unwrap()
        .build_machine("clone", OperatorStage::new(ResampleAndClone::new()))
        .unwrap()
        .set_path(PARENTS, Destination::workstation("w"))
        .set_path(CREATED, Destination::workstation("w"));

    // nothing queued: cloning from an empty batch is a caller error
    let err = factory.cycle().unwrap_err();
    assert!(matches!(err, PipelineError::Stage(ref e) if e.is_caller_error()));
    let machine = factory.workstation("w").unwrap().machine("clone").unwrap();
    assert_eq!(machine.total_answers_in(), 0);
}

#[test]
fn later_failure_still_routes_earlier_output() {
    init_tracing();
    let mut factory = Factory::default();
    let w = factory.build_workstation("w").unwrap();
    w.build_machine("m1", pass())
        .unwrap()
        .set_path("out", Destination::workstation("x"));
    w.build_machine("m2", OperatorStage::new(ResampleAndClone::new()))
        .unwrap()
        .set_path(PARENTS, Destination::workstation("x"))
        .set_path(CREATED, Destination::workstation("x"));
    factory.build_workstation("x").unwrap();

    factory
        .deliver(batch_of(&["do a"; 4]), &Destination::machine("w", "m1"))
        .unwrap();
    assert!(factory.cycle().is_err());

    let w = factory.workstation("w").unwrap();
    assert_eq!(w.machine("m1").unwrap().total_answers_in(), 4);
    assert_eq!(w.pending("m1") + w.pending("m2"), 0);
    assert_eq!(factory.workstation("x").unwrap().inbox_len(), 4);
}

#[test]
fn failing_stage_requeues_queued_answers() {
    let mut factory = Factory::default();
    let w = factory.build_workstation("w").unwrap();
    w.build_machine("m1", pass())
        .unwrap()
        .set_path("out", Destination::machine("w", "m2"));
    w.build_machine(
        "m2",
        FnStage::new(["out"], |_: &mut Batch| Err(CoreError::Stage("refused".into()))),
    )
    .unwrap()
    .set_path("out", Destination::workstation("w"));

    factory
        .deliver(batch_of(&["do a"; 3]), &Destination::machine("w", "m1"))
        .unwrap();
    factory
        .deliver(batch_of(&["do b"; 2]), &Destination::machine("w", "m2"))
        .unwrap();
    let err = factory.cycle().unwrap_err();
    assert!(matches!(err, PipelineError::Stage(_)));

    let w = factory.workstation("w").unwrap();
    assert_eq!(w.pending("m1"), 0);
    assert_eq!(w.pending("m2"), 5);
    assert_eq!(w.machine("m2").unwrap().total_answers_in(), 0);
}

#[test]
fn broken_route_found_before_the_run() {
    let mut factory = Factory::default();
    factory
        .build_workstation("split")
        .unwrap()
        .build_machine("m", splitter(6))
        .unwrap()
        .set_path("a", Destination::workstation("left"))
        .set_path("b", Destination::workstation("nowhere"));
    factory.build_workstation("left").unwrap();
    factory
        .deliver(ten(), &Destination::machine("split", "m"))
        .unwrap();

    let err = factory.run_workstation("split").unwrap_err();
    assert!(err.is_configuration());
    let pending = factory.workstation("split").unwrap().pending("m");
    let left = factory.workstation("left").unwrap().inbox_len();
    assert_eq!(pending + left, 10);
    assert_eq!(left, 0);
}

proptest! {
    #[test]
    fn gains_sum_to_one_for_a_partition(total in 1usize..40, left in 0usize..40) {
        let mut factory = Factory::default();
        factory
            .build_workstation("w")
            .unwrap()
            .build_machine("m", splitter(left))
            .unwrap()
            .set_path("a", Destination::workstation("w"))
            .set_path("b", Destination::workstation("w"));
        factory
            .deliver(batch_of(&vec!["do a"; total]), &Destination::machine("w", "m"))
            .unwrap();
        factory.cycle().unwrap();

        let machine = factory.workstation("w").unwrap().machine("m").unwrap();
        let sum = machine.average_gain("a") + machine.average_gain("b");
        prop_assert!((sum - 1.0).abs() < 1e-12);
        prop_assert_eq!(factory.workstation("w").unwrap().inbox_len(), total);
    }
}
