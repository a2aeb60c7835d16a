use ndarray::{Array1, Array2};

use crate::config::{PolicyIterationConfig, ValueIterationConfig, WorldConfig};
use crate::error::MdpError;
use crate::grid_world::{GridWorld, ACTION_SLOTS};
use crate::mdp::forest::Forest;
use crate::solvers::policy_iteration::{
    compare_policies, equal_policy_iterations, first_equal_iteration, policy_from_values,
    policy_matrix, q_values,
};
use crate::solvers::{PolicyIteration, ValueIteration};
use crate::transitions::{build_reward_vector, rewards_by_action, TransitionMatrices};

fn pi_config(gamma: f64) -> PolicyIterationConfig {
    PolicyIterationConfig {
        gamma,
        eval_epsilon: 1e-8,
        ..Default::default()
    }
}

#[test]
fn test_forest_policy() {
    let forest = Forest::new(3, 4.0, 2.0, 0.1).unwrap();
    let matrices = TransitionMatrices::build(&forest, 2).unwrap();
    let rewards = forest.reward_matrix();
    let solver = PolicyIteration::new(&matrices, &rewards, pi_config(0.9)).unwrap();

    let mut reports = Vec::new();
    let outcome = solver
        .run_with(|report, _, _| {
            reports.push(report.clone());
            Ok(())
        })
        .unwrap();

    assert!(outcome.converged);
    assert_eq!(&outcome.policy[..3], &[0, 0, 0]);
    assert_eq!(forest.render_policy(&outcome.policy), "WWW");
    let expected = [26.244, 29.484, 33.484];
    for (v, e) in outcome.values.iter().zip(expected) {
        assert!((v - e).abs() < 1e-3, "{} vs {}", v, e);
    }
    // The greedy start cuts in state 1; the first round fixes it.
    assert_eq!(reports[0].changed, 1);
    assert_eq!(reports.last().map(|r| r.changed), Some(0));
    assert_eq!(reports.len(), outcome.iterations);
}

#[test]
fn test_forest_with_likely_fire_cuts() {
    let forest = Forest::new(3, 4.0, 2.0, 0.8).unwrap();
    let matrices = TransitionMatrices::build(&forest, 2).unwrap();
    let rewards = forest.reward_matrix();
    let outcome = PolicyIteration::new(&matrices, &rewards, pi_config(0.9))
        .unwrap()
        .run()
        .unwrap();
    assert!(outcome.converged);
    assert_eq!(outcome.policy[1], 1);
}

#[test]
fn test_grid_world_agrees_with_value_iteration() {
    let world = GridWorld::parse("4,3\nSOOG\nO#vO\nOTOU\n", &WorldConfig::default()).unwrap();
    let matrices = TransitionMatrices::build(&world, ACTION_SLOTS).unwrap();
    let rewards = rewards_by_action(&build_reward_vector(&world), ACTION_SLOTS);
    let pi = PolicyIteration::new(&matrices, &rewards, pi_config(0.9))
        .unwrap()
        .run()
        .unwrap();
    assert!(pi.converged);

    let vi = ValueIteration::new(
        &world,
        ValueIterationConfig {
            gamma: 0.9,
            epsilon: 1e-8,
            ..Default::default()
        },
    )
    .unwrap()
    .run()
    .unwrap();

    // Both models agree on every state, the matrix model just adds a
    // terminal state worth nothing.
    for s in 0..vi.values.len() {
        assert!(
            (pi.values[s] - vi.values[s]).abs() < 1e-4,
            "state {}: {} vs {}",
            s,
            pi.values[s],
            vi.values[s]
        );
    }
    assert_eq!(pi.values[matrices.terminal()], 0.0);
}

#[test]
fn test_two_tile_world() {
    let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
    let matrices = TransitionMatrices::build(&world, ACTION_SLOTS).unwrap();
    let rewards = rewards_by_action(&build_reward_vector(&world), ACTION_SLOTS);
    let outcome = PolicyIteration::new(&matrices, &rewards, pi_config(0.9))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(outcome.policy[0], 1);
    let expected = (-0.01 + 0.9 * 0.8 * 10.0) / (1.0 - 0.9 * 0.2);
    assert!((outcome.values[0] - expected).abs() < 1e-4);
    assert_eq!(outcome.values[1], 10.0);
}

#[test]
fn test_policy_from_recorded_values() {
    let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
    let matrices = TransitionMatrices::build(&world, ACTION_SLOTS).unwrap();
    let values = [8.77, 10.0];
    let policy = policy_from_values(&matrices, &values).unwrap();
    assert_eq!(policy.len(), 3);
    assert_eq!(policy[0], 1);
    assert!(policy_from_values(&matrices, &[1.0]).is_err());
}

#[test]
fn test_compare_policies() {
    assert_eq!(compare_policies(&[1, 0, 0], &[3, 0]).unwrap(), vec![0]);
    assert_eq!(compare_policies(&[2, 4], &[2, 4]).unwrap(), Vec::<usize>::new());
    assert!(matches!(
        compare_policies(&[1], &[1, 0, 0]),
        Err(MdpError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_first_equal_iteration_in_value_log() {
    let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
    let matrices = TransitionMatrices::build(&world, ACTION_SLOTS).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vi.log");
    // Recovered policies: all zero, west, east, east.
    std::fs::write(
        &path,
        "1 0.1 0\n0 0\n2 0.2 5\n5 0\n3 0.3 5\n0 10\n4 0.4 1\n1 10\n",
    )
    .unwrap();

    let east = [1, 0];
    assert_eq!(equal_policy_iterations(&path, &matrices, &east).unwrap(), vec![3, 4]);
    assert_eq!(first_equal_iteration(&path, &matrices, &east).unwrap(), Some(3));
    assert_eq!(first_equal_iteration(&path, &matrices, &[2, 0]).unwrap(), None);

    std::fs::write(&path, "1 0.1 0\n0 0 0 0\n").unwrap();
    assert!(first_equal_iteration(&path, &matrices, &east).is_err());
}

#[test]
fn test_q_values_shape() {
    let forest = Forest::new(4, 4.0, 2.0, 0.1).unwrap();
    let matrices = TransitionMatrices::build(&forest, 2).unwrap();
    let rewards = forest.reward_matrix();
    let q = q_values(&matrices, &rewards, &Array1::zeros(5), 0.9).unwrap();
    assert_eq!(q, rewards);
}

#[test]
fn test_policy_matrix_validation() {
    let forest = Forest::new(3, 4.0, 2.0, 0.1).unwrap();
    let matrices = TransitionMatrices::build(&forest, 2).unwrap();
    assert!(policy_matrix(&matrices, &[0, 1]).is_err());
    assert!(policy_matrix(&matrices, &[0, 2, 0, 0]).is_err());
    let selected = policy_matrix(&matrices, &[1, 1, 1, 0]).unwrap();
    assert_eq!(selected.get(2, 0), 1.0);
    assert_eq!(selected.get(3, 3), 1.0);
}

#[test]
fn test_reward_shape_is_checked() {
    let forest = Forest::new(3, 4.0, 2.0, 0.1).unwrap();
    let matrices = TransitionMatrices::build(&forest, 2).unwrap();
    let rewards = Array2::zeros((3, 2));
    assert!(matches!(
        PolicyIteration::new(&matrices, &rewards, pi_config(0.9)),
        Err(MdpError::DimensionMismatch { .. })
    ));
}
