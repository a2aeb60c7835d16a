use crate::config::{ExperimentConfig, QLearningConfig, ValueIterationConfig, WorldConfig};
use crate::error::MdpError;

#[test]
fn test_defaults_are_valid() {
    let config = ExperimentConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.world.goal_reward, 10.0);
    assert_eq!(config.q_learning.epsilon_start, 0.5);
    assert_eq!(config.value_iteration.gamma, 0.99);
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.json");

    let mut config = ExperimentConfig::default();
    config.world = WorldConfig::with_normal_reward(-0.04);
    config.q_learning.alpha = Some(0.1);
    config.q_learning.seed = 99;
    config.save(&path).unwrap();

    let loaded = ExperimentConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_files_use_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{"value_iteration": {"gamma": 0.9}}"#).unwrap();

    let loaded = ExperimentConfig::load(&path).unwrap();
    assert_eq!(loaded.value_iteration.gamma, 0.9);
    assert_eq!(loaded.value_iteration.epsilon, 1e-4);
    assert_eq!(loaded.world, WorldConfig::default());
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");

    std::fs::write(&path, r#"{"q_learning": {"epsilon_min": 0.9}}"#).unwrap();
    assert!(matches!(
        ExperimentConfig::load(&path),
        Err(MdpError::InvalidParameter { .. })
    ));

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        ExperimentConfig::load(&path),
        Err(MdpError::Serialization(_))
    ));
}

#[test]
fn test_solver_validation() {
    let vi = ValueIterationConfig {
        max_iterations: 0,
        ..Default::default()
    };
    assert!(vi.validate().is_err());

    let bad_alpha = QLearningConfig {
        alpha: Some(1.5),
        ..Default::default()
    };
    assert!(bad_alpha.validate().is_err());

    let no_reports = QLearningConfig {
        report_every: 0,
        ..Default::default()
    };
    assert!(no_reports.validate().is_err());

    let zero_cap = QLearningConfig {
        max_steps_per_episode: Some(0),
        ..Default::default()
    };
    assert!(zero_cap.validate().is_err());
}
