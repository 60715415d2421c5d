use crate::cli::RunArgs;
use crate::config::{LaunchConfig, build_launch_config};
use crate::error::{CliError, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use vlmp::core::io::session::{SessionDescriptor, SessionSet};

/// One simulation set ready to be handed to the simulator.
#[derive(Debug, Clone)]
struct LaunchJob {
    set: String,
    folder: PathBuf,
    aggregate_file: String,
}

impl LaunchJob {
    fn from_set(session_dir: &Path, set: &SessionSet) -> Result<Self> {
        let folder = std::fs::canonicalize(session_dir.join(&set.folder))?;
        let aggregate_file = set
            .aggregate_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.json", set.name));
        Ok(Self {
            set: set.name.clone(),
            folder,
            aggregate_file,
        })
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let launch = build_launch_config(&args)?;
    info!("Loading session descriptor from {:?}", &launch.session_file);
    let descriptor = SessionDescriptor::load(&launch.session_file)?;
    let session_dir = launch
        .session_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let jobs = descriptor
        .simulation_sets
        .iter()
        .map(|set| LaunchJob::from_set(&session_dir, set))
        .collect::<Result<Vec<_>>>()?;
    if jobs.is_empty() {
        warn!("Session '{}' has no simulation sets to run.", descriptor.name);
        return Ok(());
    }

    if args.mode.local {
        run_local(&launch, jobs).await?;
    } else {
        run_liquid(&launch, jobs).await?;
    }

    println!("All simulation sets of session '{}' launched.", descriptor.name);
    Ok(())
}

/// Runs every set on this machine with one worker per GPU pulling from a shared queue.
///
/// Workers keep draining the queue after a failed set; the first failure is returned
/// once all of them are done.
async fn run_local(launch: &LaunchConfig, jobs: Vec<LaunchJob>) -> Result<()> {
    info!(
        "Running {} simulation set(s) locally on GPU(s) {:?}",
        jobs.len(),
        launch.gpus
    );
    let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
    let simulator = Arc::new(launch.simulator.clone());

    let mut workers = JoinSet::new();
    for &gpu in &launch.gpus {
        let queue = Arc::clone(&queue);
        let simulator = Arc::clone(&simulator);
        workers.spawn(async move {
            let mut failures = Vec::new();
            loop {
                let next = queue.lock().await.pop_front();
                let Some(job) = next else { break };
                if let Err(e) = run_set_on_gpu(&simulator, &job, gpu).await {
                    error!("{}", e);
                    failures.push(e);
                }
            }
            failures
        });
    }

    let mut first_failure = None;
    while let Some(joined) = workers.join_next().await {
        let failures =
            joined.map_err(|e| CliError::Other(anyhow::anyhow!("Launch worker failed: {}", e)))?;
        if first_failure.is_none() {
            first_failure = failures.into_iter().next();
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn run_set_on_gpu(simulator: &[String], job: &LaunchJob, gpu: u32) -> Result<()> {
    let (program, program_args) = split_program(simulator, &job.set)?;
    info!("Starting '{}' on GPU {}", job.set, gpu);
    debug!(
        "Executing {} {:?} {} in {:?}",
        program, program_args, job.aggregate_file, job.folder
    );

    let status = Command::new(program)
        .args(program_args)
        .arg(&job.aggregate_file)
        .current_dir(&job.folder)
        .env("CUDA_VISIBLE_DEVICES", gpu.to_string())
        .status()
        .await
        .map_err(|e| CliError::Launch {
            set: job.set.clone(),
            reason: format!("could not start '{}': {}", program, e),
        })?;

    if !status.success() {
        return Err(CliError::Launch {
            set: job.set.clone(),
            reason: format!("simulator exited with {}", status),
        });
    }
    info!("Finished '{}' on GPU {}", job.set, gpu);
    Ok(())
}

/// Writes one batch script per set and submits each with the queue command.
async fn run_liquid(launch: &LaunchConfig, jobs: Vec<LaunchJob>) -> Result<()> {
    info!("Submitting {} simulation set(s) to the queue", jobs.len());
    for job in &jobs {
        let script_path = job.folder.join(format!("{}.sh", job.set));
        tokio::fs::write(&script_path, batch_script(&launch.simulator, job)).await?;
        debug!("Wrote batch script {:?}", &script_path);

        let (program, program_args) = split_program(&launch.queue_command, &job.set)?;
        let status = Command::new(program)
            .args(program_args)
            .arg(&script_path)
            .current_dir(&job.folder)
            .status()
            .await
            .map_err(|e| CliError::Launch {
                set: job.set.clone(),
                reason: format!("could not start '{}': {}", program, e),
            })?;

        if !status.success() {
            return Err(CliError::Launch {
                set: job.set.clone(),
                reason: format!("queue command exited with {}", status),
            });
        }
        info!("Submitted '{}'", job.set);
    }
    Ok(())
}

fn batch_script(simulator: &[String], job: &LaunchJob) -> String {
    format!(
        "#!/bin/bash\n\
         #SBATCH --job-name={set}\n\
         #SBATCH --gres=gpu:1\n\
         #SBATCH --output={set}.out\n\
         \n\
         cd \"{folder}\"\n\
         {simulator} {file}\n",
        set = job.set,
        folder = job.folder.display(),
        simulator = simulator.join(" "),
        file = job.aggregate_file,
    )
}

fn split_program<'a>(command: &'a [String], set: &str) -> Result<(&'a str, &'a [String])> {
    match command.split_first() {
        Some((program, rest)) => Ok((program.as_str(), rest)),
        None => Err(CliError::Launch {
            set: set.to_string(),
            reason: "no command configured".to_string(),
        }),
    }
}
