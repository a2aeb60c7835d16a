// Test modules for all components
pub mod test_config;
pub mod test_policy_iteration;
pub mod test_q_learning;
