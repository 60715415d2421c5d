use std::path::PathBuf;

/// How `vlmp run` starts the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchConfig {
    /// Simulator command line; the aggregate file name is appended as the last argument.
    pub simulator: Vec<String>,
    pub queue_command: Vec<String>,
    pub gpus: Vec<u32>,
    pub session_file: PathBuf,
}
