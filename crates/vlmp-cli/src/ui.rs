use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::warn;
use vlmp::engine::progress::{Progress, ProgressCallback};

const EVENT_QUEUE: usize = 1024;

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

/// The pipeline phase currently on screen.
struct ActivePhase {
    name: &'static str,
    number: usize,
    started: Instant,
    bar: ProgressBar,
}

/// Renders library progress and forwarded log lines on stderr.
///
/// Phases are numbered in the order they start; a finished phase leaves one
/// `✓ [n] name (elapsed)` line behind.
pub struct UiManager {
    mp: MultiProgress,
    phase: Option<ActivePhase>,
    phases_started: usize,
    events: mpsc::Receiver<UiEvent>,
    shutdown: watch::Receiver<bool>,
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, events) = mpsc::channel(EVENT_QUEUE);
        let (shutdown_sender, shutdown) = watch::channel(false);
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let manager = Self {
            mp,
            phase: None,
            phases_started: 0,
            events,
            shutdown,
        };
        (manager, event_sender, shutdown_sender)
    }

    /// Processes events until shutdown is signalled, then flushes whatever is still queued.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                Some(event) = self.events.recv() => self.handle_event(event),
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
        if let Some(phase) = self.phase.take() {
            phase.bar.finish_and_clear();
        }
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(line) => self.print(line),
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => self.start_phase(name),
            Progress::PhaseFinish => self.finish_phase(),
            Progress::TaskStart { total_steps } => {
                if let Some(phase) = &self.phase {
                    phase.bar.disable_steady_tick();
                    phase.bar.set_style(bar_style());
                    phase.bar.set_length(total_steps);
                    phase.bar.set_position(0);
                }
            }
            Progress::TaskIncrement => {
                if let Some(phase) = &self.phase {
                    phase.bar.inc(1);
                }
            }
            Progress::TaskFinish => {
                if let Some(phase) = &self.phase {
                    phase.bar.finish();
                }
            }
            Progress::Message(text) => self.print(format!("  {}", text)),
        }
    }

    fn start_phase(&mut self, name: &'static str) {
        if let Some(previous) = self.phase.take() {
            previous.bar.finish_and_clear();
        }
        self.phases_started += 1;

        let bar = self.mp.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_prefix(format!("[{}]", self.phases_started));
        bar.set_message(name);
        bar.enable_steady_tick(Duration::from_millis(80));

        self.phase = Some(ActivePhase {
            name,
            number: self.phases_started,
            started: Instant::now(),
            bar,
        });
    }

    fn finish_phase(&mut self) {
        let Some(phase) = self.phase.take() else {
            return;
        };
        phase.bar.finish_and_clear();
        self.print(format!(
            "✓ [{}] {} ({})",
            phase.number,
            phase.name,
            HumanDuration(phase.started.elapsed())
        ));
    }

    fn print(&self, line: String) {
        if self.mp.is_hidden() {
            eprintln!("{}", line);
        } else {
            self.mp.println(line).ok();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:.bold.dim} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold.dim} {msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━╸ ")
}

/// Forwards library progress events to the UI task without blocking the workflow.
#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            if let Err(e) = sender.try_send(UiEvent::Progress(progress)) {
                warn!("Dropped progress update: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_manager() -> UiManager {
        let (manager, _, _) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        manager
    }

    fn send(manager: &mut UiManager, progress: Progress) {
        manager.handle_event(UiEvent::Progress(progress));
    }

    #[test]
    fn phases_are_numbered_in_start_order() {
        let mut manager = hidden_manager();
        assert!(manager.phase.is_none());

        send(&mut manager, Progress::PhaseStart { name: "Loading pool" });
        send(&mut manager, Progress::PhaseStart { name: "Assembling" });

        let phase = manager.phase.as_ref().unwrap();
        assert_eq!(phase.name, "Assembling");
        assert_eq!(phase.number, 2);
        assert_eq!(phase.bar.message(), "Assembling");
        assert_eq!(phase.bar.prefix(), "[2]");
    }

    #[test]
    fn phase_finish_clears_the_active_phase() {
        let mut manager = hidden_manager();
        send(&mut manager, Progress::PhaseStart { name: "Distributing" });
        send(&mut manager, Progress::PhaseFinish);
        assert!(manager.phase.is_none());

        send(&mut manager, Progress::PhaseFinish);
        assert!(manager.phase.is_none());
    }

    #[test]
    fn task_events_drive_the_bar() {
        let mut manager = hidden_manager();
        send(&mut manager, Progress::PhaseStart { name: "Materializing" });
        send(&mut manager, Progress::TaskStart { total_steps: 4 });
        send(&mut manager, Progress::TaskIncrement);
        send(&mut manager, Progress::TaskIncrement);

        let bar = &manager.phase.as_ref().unwrap().bar;
        assert_eq!(bar.length(), Some(4));
        assert_eq!(bar.position(), 2);

        send(&mut manager, Progress::TaskFinish);
        assert!(manager.phase.as_ref().unwrap().bar.is_finished());
    }

    #[test]
    fn task_events_without_a_phase_are_ignored() {
        let mut manager = hidden_manager();
        send(&mut manager, Progress::TaskStart { total_steps: 2 });
        send(&mut manager, Progress::TaskIncrement);
        send(&mut manager, Progress::Message("no phase".to_string()));
        assert!(manager.phase.is_none());
    }

    #[tokio::test]
    async fn progress_handler_forwards_events() {
        let (sender, mut receiver) = mpsc::channel(1);
        let callback = CliProgressHandler::new(sender).get_callback();

        callback(Progress::PhaseStart { name: "Assembling" });

        let event = receiver.recv().await.unwrap();
        assert!(matches!(
            event,
            UiEvent::Progress(Progress::PhaseStart { name: "Assembling" })
        ));
    }

    #[tokio::test]
    async fn run_drains_queued_events_after_shutdown() {
        let (manager, sender, shutdown) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        sender
            .send(UiEvent::Progress(Progress::PhaseStart { name: "Assembling" }))
            .await
            .unwrap();
        sender
            .send(UiEvent::Log("queued before shutdown".to_string()))
            .await
            .unwrap();
        shutdown.send(true).unwrap();
        manager.run().await;
    }
}
