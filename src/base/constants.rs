/// Defines the directory where the solver logs and checkpoints are saved
pub const DEFAULT_OUT_DIR: &str = "/tmp/qnsolve/results";

/// Defines an auxiliary directory where the test result files are saved
pub const DEFAULT_TEST_DIR: &str = "/tmp/qnsolve/test";
