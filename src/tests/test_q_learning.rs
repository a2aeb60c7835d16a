use std::cell::RefCell;

use crate::config::{QLearningConfig, WorldConfig};
use crate::error::MdpError;
use crate::grid_world::GridWorld;
use crate::mdp::forest::Forest;
use crate::mdp::{Action, ActionKind, Mdp, Outcome, StateId};
use crate::solvers::{QLearning, QTable, StartPolicy};

fn quick_config(n_episodes: usize, seed: u64) -> QLearningConfig {
    QLearningConfig {
        n_episodes,
        seed,
        ..Default::default()
    }
}

#[test]
fn test_learns_to_walk_to_goal() {
    let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
    let config = QLearningConfig {
        gamma: 0.5,
        alpha: Some(0.05),
        n_episodes: 3000,
        seed: 11,
        ..Default::default()
    };
    let mut learner = QLearning::builder(&world).config(config).build().unwrap();
    let summary = learner.train().unwrap();

    assert_eq!(summary.episodes, 3000);
    assert_eq!(learner.policy()[0], 1);
    let q = learner.q_table();
    assert!(q.get(1).is_empty());
    assert!((q.get(0)[1] - 7.998 / 0.9).abs() < 1.5);
}

#[test]
fn test_same_seed_same_table() {
    let world = GridWorld::parse("3,3\nSOO\nOTv\nO>G\n", &WorldConfig::default()).unwrap();
    let run = |epsilon: f64| {
        let config = QLearningConfig {
            epsilon_start: epsilon,
            epsilon_min: epsilon,
            ..quick_config(300, 42)
        };
        let mut learner = QLearning::builder(&world)
            .config(config)
            .initializer(|w: &GridWorld, s| w.goal_directed_q_values(s))
            .build()
            .unwrap();
        learner.train().unwrap();
        (learner.q_table().clone(), learner.metrics().metrics().clone())
    };
    assert_eq!(run(0.0), run(0.0));
    assert_eq!(run(0.3), run(0.3));
}

#[test]
fn test_report_cadence() {
    let world = GridWorld::parse("3,1\nSOG\n", &WorldConfig::default()).unwrap();
    let mut reported = Vec::new();
    {
        let config = QLearningConfig {
            report_every: 4,
            ..quick_config(10, 1)
        };
        let mut learner = QLearning::builder(&world)
            .config(config)
            .on_episode(|report, q| {
                assert_eq!(q.num_states(), 3);
                reported.push(report.episode);
                Ok(())
            })
            .build()
            .unwrap();
        learner.train().unwrap();
    }
    assert_eq!(reported, vec![0, 4, 8, 9]);
}

#[test]
fn test_hook_error_stops_training() {
    let world = GridWorld::parse("3,1\nSOG\n", &WorldConfig::default()).unwrap();
    let mut learner = QLearning::builder(&world)
        .config(quick_config(10, 1))
        .on_episode(|_, _| Err(MdpError::RecorderClosed("gone".to_string())))
        .build()
        .unwrap();
    assert!(matches!(learner.train(), Err(MdpError::RecorderClosed(_))));
}

#[test]
fn test_epsilon_schedule() {
    let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
    let mut learner = QLearning::builder(&world)
        .config(quick_config(4, 0))
        .build()
        .unwrap();
    assert!((learner.epsilon_after(0) - 0.5).abs() < 1e-12);
    assert!((learner.epsilon_after(1) - (0.05 + 0.45 / 3.0)).abs() < 1e-12);
    assert!(learner.epsilon_after(1000) > 0.05);

    let summary = learner.train().unwrap();
    let epsilons: Vec<f64> = learner.metrics().metrics().epsilons.iter().copied().collect();
    assert_eq!(epsilons[0], 0.5);
    assert_eq!(epsilons[1], learner.epsilon_after(0));
    assert_eq!(epsilons[3], learner.epsilon_after(2));
    assert_eq!(summary.final_epsilon, learner.epsilon_after(3));

    let rates: Vec<f64> = learner.metrics().metrics().learning_rates.iter().copied().collect();
    assert_eq!(rates, vec![1.0, 0.5, 1.0 / 3.0, 0.25]);
}

#[test]
fn test_initializer_length_is_checked() {
    let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
    let result = QLearning::builder(&world)
        .initializer(|_: &GridWorld, _| vec![0.0])
        .build();
    assert!(matches!(result, Err(MdpError::DimensionMismatch { .. })));
}

#[test]
fn test_done_predicate_ends_episodes() {
    let world = GridWorld::parse("4,2\nSOOO\nOOOG\n", &WorldConfig::default()).unwrap();
    let starts = RefCell::new(Vec::new());
    let config = QLearningConfig {
        start_at_0: true,
        ..quick_config(50, 3)
    };
    let mut learner = QLearning::builder(&world)
        .config(config)
        .done_when(|s, _, _| {
            starts.borrow_mut().push(s);
            true
        })
        .build()
        .unwrap();
    let summary = learner.train().unwrap();
    assert_eq!(summary.total_steps, 50);
    assert!(starts.borrow().iter().all(|&s| s == 0));
}

#[test]
fn test_annealed_starts_explore() {
    let world = GridWorld::parse("4,2\nSOOO\nOOOG\n", &WorldConfig::default()).unwrap();
    let starts = RefCell::new(Vec::new());
    let mut learner = QLearning::builder(&world)
        .config(quick_config(200, 3))
        .done_when(|s, _, _| {
            starts.borrow_mut().push(s);
            true
        })
        .build()
        .unwrap();
    learner.train().unwrap();
    let starts = starts.borrow();
    assert!(starts.iter().any(|&s| s != 0));
    assert!(starts.iter().all(|&s| !world.is_terminal(s)));
}

#[test]
fn test_custom_start_policy() {
    let world = GridWorld::parse("3,1\nSOG\n", &WorldConfig::default()).unwrap();
    let mut learner = QLearning::builder(&world)
        .config(quick_config(5, 0))
        .start_policy(StartPolicy::custom(|_, _, _| 17))
        .build()
        .unwrap();
    assert!(matches!(learner.train(), Err(MdpError::InvalidParameter { .. })));

    let mut learner = QLearning::builder(&world)
        .config(quick_config(5, 0))
        .start_policy(StartPolicy::custom(|_, _, _| 2))
        .build()
        .unwrap();
    // Starting on the goal ends every episode at once.
    assert_eq!(learner.train().unwrap().total_steps, 0);
}

#[test]
fn test_forest_with_step_cap() {
    let forest = Forest::new(3, 4.0, 2.0, 0.1).unwrap();
    let config = QLearningConfig {
        gamma: 0.9,
        max_steps_per_episode: Some(20),
        ..quick_config(100, 5)
    };
    let mut learner = QLearning::builder(&forest).config(config).build().unwrap();
    let summary = learner.train().unwrap();
    assert_eq!(summary.total_steps, 2000);
    assert_eq!(learner.metrics().avg_episode_length(100), Some(20.0));
}

struct Broken {
    actions: Vec<Vec<Action>>,
}

impl Mdp for Broken {
    fn num_states(&self) -> usize {
        2
    }

    fn actions(&self, state: StateId) -> &[Action] {
        &self.actions[state]
    }

    fn reward(&self, _state: StateId) -> f64 {
        0.0
    }

    fn neighbors(&self, _state: StateId) -> &[StateId] {
        &[]
    }
}

#[test]
fn test_zero_mass_distribution_is_fatal() {
    let broken = Broken {
        actions: vec![
            vec![Action::new(
                ActionKind::Named("stuck".to_string()),
                vec![Outcome::new(0.0, 1)],
            )],
            vec![],
        ],
    };
    let result = QLearning::builder(&broken).build();
    assert!(matches!(result, Err(MdpError::InvalidDistribution { state: 0, .. })));
}

#[test]
fn test_q_table_snapshot_and_persistence() {
    let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
    let table = QTable::from_rows(&world, vec![vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![]]).unwrap();
    assert_eq!(table.best_action(0), 4);
    assert_eq!(table.best_action(1), 0);
    assert_eq!(table.max(1), None);
    assert_eq!(table.mean_max(), 5.0);

    let snapshot = table.padded_snapshot(5);
    assert_eq!(snapshot.len(), 5);
    assert_eq!(snapshot[2][0], 3.0);
    assert!(snapshot.iter().all(|row| row[1].is_nan()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.bin");
    table.save(&path).unwrap();
    assert_eq!(QTable::load(&path).unwrap(), table);

    assert!(QTable::from_rows(&world, vec![vec![0.0; 5]]).is_err());
}
