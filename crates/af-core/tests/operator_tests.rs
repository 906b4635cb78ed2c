//! Search operators working on fixture batches

use af_core::prelude::*;
use af_core::{
    AnswerStore, BlendingCrossover, MemoryStore, PointCrossover, PointDelete, ResampleAndClone,
    UniformBackboneCrossover,
};
use af_test_utils::{answer, batch_of, chain, sample_batch};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

#[test]
fn point_crossover_on_single_answer_keeps_size_bounds() {
    let crowd = batch_of(&["block { do a do b ref c }"]);
    let mut rng = StdRng::seed_from_u64(99);
    let result = PointCrossover::new()
        .generate_with(&crowd, Some(25), &OperatorOptions::new(), &mut rng)
        .unwrap();
    assert_eq!(result.len(), 25);
    for baby in result.iter() {
        // self-crossover grafts a subtree of the same program into itself
        assert!(baby.points() >= 1 && baby.points() <= 7);
        assert_eq!(baby.ancestors(), &[crowd[0].id(), crowd[0].id()]);
    }
}

#[test]
fn point_crossover_lines_come_from_the_parent() {
    let parent = answer("block {\n  do int_add\n  block {\n    ref x\n    do int_dup\n  }\n}");
    let crowd = Batch::from(vec![parent.clone()]);
    let doubled = format!("{}\n{}", parent.blueprint(), parent.blueprint());
    let known: Vec<&str> = doubled
        .lines()
        .map(|l| l.trim_matches(|c: char| c.is_whitespace() || c == '{' || c == '}').trim())
        .collect();
    for _ in 0..20 {
        let result = PointCrossover::new().generate(&crowd, None).unwrap();
        assert_eq!(result.len(), 1);
        for line in result[0].blueprint().lines() {
            let body = line.trim_matches(|c: char| c.is_whitespace() || c == '{' || c == '}').trim();
            assert!(known.contains(&body), "unexpected line {line:?}");
        }
    }
}

#[test]
fn clones_of_a_single_answer_are_identical() {
    let crowd = batch_of(&["block {\n  do int_add\n  value «int»\n}\n«int» 4\n«bool» true"]);
    let result = ResampleAndClone::new().generate(&crowd, Some(5)).unwrap();
    assert_eq!(result.len(), 5);
    for clone in result.iter() {
        assert_eq!(clone.blueprint(), crowd[0].blueprint());
        assert_ne!(clone.id(), crowd[0].id());
    }
}

#[test]
fn backbone_crossover_over_uneven_parents() {
    let crowd = batch_of(&[&chain("m", 13), &chain("d", 6)]);
    let mut rng = StdRng::seed_from_u64(4);
    let result = UniformBackboneCrossover::new()
        .generate_with(&crowd, Some(40), &OperatorOptions::new(), &mut rng)
        .unwrap();
    assert_eq!(result.len(), 40);
    for baby in result.iter() {
        let mom = crowd.iter().find(|a| a.id() == baby.ancestors()[0]).unwrap();
        assert!(baby.program().backbone().len() <= mom.program().backbone().len());
    }
}

#[test]
fn operators_leave_inputs_untouched() {
    let crowd = sample_batch();
    let before = crowd.blueprints();
    let types = Arc::new(TypeRegistry::with_builtins());
    PointDelete::new().generate(&crowd, Some(3)).unwrap();
    BlendingCrossover::new(types).generate(&crowd, Some(2)).unwrap();
    assert_eq!(crowd.blueprints(), before);
}

#[test]
fn saved_offspring_round_trip_through_store() {
    let mut crowd = ResampleAndClone::new().generate(&sample_batch(), Some(3)).unwrap();
    let mut store = MemoryStore::new();
    let receipts = store.bulk_save(&mut crowd).unwrap();
    for (clone, receipt) in crowd.iter().zip(&receipts) {
        let record = store.load(&receipt.external_id).unwrap();
        assert_eq!(record.blueprint, clone.blueprint());
        assert_eq!(record.ancestors, clone.ancestors());
        assert_eq!(record.progress, 1);
    }
}

fn scored(values: &[f64]) -> Answer {
    let mut dude = answer("do a");
    for (i, v) in values.iter().enumerate() {
        dude.set_score(&format!("c{i}"), *v).unwrap();
    }
    dude
}

proptest! {
    #[test]
    fn domination_is_antisymmetric(
        a in prop::collection::vec(0.0f64..10.0, 3),
        b in prop::collection::vec(0.0f64..10.0, 3),
    ) {
        let (x, y) = (scored(&a), scored(&b));
        let criteria = ["c0", "c1", "c2"];
        prop_assert!(!(x.dominated_by(&y, &criteria) && y.dominated_by(&x, &criteria)));
        prop_assert!(!x.dominated_by(&x, &criteria));
    }
}
