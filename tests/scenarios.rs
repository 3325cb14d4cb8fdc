mod common;

use std::rc::Rc;

use num_bigint::BigUint;
use test_log::test;

use petri_reach::bdd::Bdd;
use petri_reach::deadlock::{find_deadlock, DeadlockOutcome};
use petri_reach::net::{IncidenceMatrix, Marking, NetBuilder, NetModel, Place, Transition};
use petri_reach::optimize::optimize_marking;
use petri_reach::order::VariableOrder;
use petri_reach::reach::{compute_reachable_set, ReachableSet};
use petri_reach::relation::TransitionRelation;
use petri_reach::Error;

fn cycle_place_major() -> NetModel {
    let places = vec![Place::new("p1"), Place::new("p2"), Place::new("p3")];
    let transitions = vec![Transition::new("t1"), Transition::new("t2"), Transition::new("t3")];
    // rows are places, columns are transitions
    let pre = IncidenceMatrix::place_major(vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]]).unwrap();
    let post = IncidenceMatrix::place_major(vec![vec![0, 0, 1], vec![1, 0, 0], vec![0, 1, 0]]).unwrap();
    NetModel::new(places, transitions, pre, post, &[1, 0, 0]).unwrap()
}

#[test]
fn test_three_place_cycle() {
    for net in [common::ring(3), cycle_place_major()] {
        let reach = compute_reachable_set(&net).unwrap();
        assert_eq!(*reach.count(), BigUint::from(3u32));
        assert_eq!(
            reach.markings(),
            vec![
                Marking::from_bits(&[0, 0, 1]),
                Marking::from_bits(&[0, 1, 0]),
                Marking::from_bits(&[1, 0, 0]),
            ]
        );

        assert_eq!(find_deadlock(&net, &reach).unwrap(), DeadlockOutcome::NoDeadlock);

        let best = optimize_marking(&["p1", "p2", "p3"], &reach, &[1, -2, 3]).unwrap();
        assert_eq!(best, Some((Marking::from_bits(&[0, 0, 1]), 3)));
    }
}

#[test]
fn test_source_transition() {
    let mut builder = NetBuilder::new();
    let p1 = builder.place("p1", false);
    let p2 = builder.place("p2", false);
    let t = builder.transition("t", [], [p1, p2]);
    let net = builder.build().unwrap();

    let reach = compute_reachable_set(&net).unwrap();
    assert_eq!(reach.markings(), vec![Marking::from_bits(&[0, 0]), Marking::from_bits(&[1, 1])]);

    let relation = TransitionRelation::new(reach.bdd(), &net, reach.order(), t);
    assert!(relation.is_enabled_at(reach.bdd(), reach.order(), &Marking::from_bits(&[0, 0])));
    assert!(!relation.is_enabled_at(reach.bdd(), reach.order(), &Marking::from_bits(&[1, 1])));

    assert_eq!(
        find_deadlock(&net, &reach).unwrap(),
        DeadlockOutcome::Found(Marking::from_bits(&[1, 1]))
    );
}

#[test]
fn test_empty_diagram_has_no_optimum() {
    let bdd = Rc::new(Bdd::default());
    let zero = bdd.zero;
    let reach = ReachableSet::from_parts(
        bdd,
        zero,
        VariableOrder::identity(3),
        vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
    )
    .unwrap();

    assert!(reach.is_empty());
    assert_eq!(*reach.count(), BigUint::ZERO);
    assert!(reach.markings().is_empty());
    assert_eq!(optimize_marking(&["p1", "p2", "p3"], &reach, &[1, -2, 3]).unwrap(), None);
}

#[test]
fn test_initial_marking_is_reachable() {
    for net in [
        common::ring(5),
        common::mutex(),
        common::philosophers(3),
        common::buffer(),
        common::two_chains(),
    ] {
        let reach = compute_reachable_set(&net).unwrap();
        assert!(reach.contains(net.initial_marking()));
    }
}

#[test]
fn test_counts_grow_until_fixpoint() {
    let net = common::philosophers(4);
    let reach = compute_reachable_set(&net).unwrap();

    let stats = reach.stats();
    assert!(!stats.is_empty());
    for (i, round) in stats.iter().enumerate() {
        assert_eq!(round.iteration, i + 1);
        assert!(round.new_states > BigUint::ZERO);
    }
    for pair in stats.windows(2) {
        assert!(pair[0].reachable_states < pair[1].reachable_states);
    }
    assert_eq!(&stats[stats.len() - 1].reachable_states, reach.count());
}

#[test]
fn test_malformed_input_is_rejected() {
    let places = || vec![Place::new("p1"), Place::new("p2")];
    let transitions = || vec![Transition::new("t1")];

    let err = NetModel::new(
        places(),
        transitions(),
        IncidenceMatrix::transition_major(vec![vec![1, 0]]).unwrap(),
        IncidenceMatrix::place_major(vec![vec![0], vec![1]]).unwrap(),
        &[1, 0],
    )
    .unwrap_err();
    assert!(matches!(err, Error::OrientationMismatch { .. }));

    let err = NetModel::new(
        places(),
        transitions(),
        IncidenceMatrix::transition_major(vec![vec![1, 0]]).unwrap(),
        IncidenceMatrix::transition_major(vec![vec![0, 1, 0]]).unwrap(),
        &[1, 0],
    )
    .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));

    // the matrices are place-major-shaped but declared transition-major
    let err = NetModel::new(
        places(),
        transitions(),
        IncidenceMatrix::transition_major(vec![vec![1], vec![0]]).unwrap(),
        IncidenceMatrix::transition_major(vec![vec![0], vec![1]]).unwrap(),
        &[1, 0],
    )
    .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}
