use std::path::PathBuf;

pub struct DefaultsConfig {
    pub session_name: String,
    pub output_dir: PathBuf,
    pub strategy: String,
    pub simulator: String,
    pub queue_command: String,
    pub gpus: Vec<u32>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            session_name: "session".to_string(),
            output_dir: PathBuf::from("."),
            strategy: "none".to_string(),
            simulator: "UAMMDlauncher".to_string(),
            queue_command: "sbatch".to_string(),
            gpus: vec![0],
        }
    }
}
