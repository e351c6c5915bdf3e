use std::time::Duration;

use chrono::{DateTime, Local};

use crate::{
    config::default,
    errors,
    interface::{IDisplay, ILineSource, IProgressCallback, LineRead},
    registry::TaskRegistry,
    signal::SignalSink,
    task::{ActionMode, Task},
};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The input source was closed.
    Completed,
    /// The producer asked us to stop.
    Hangup,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
enum EngineState {
    Running,
    Finished(RunOutcome),
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub polling_interval: Duration,
    /// Echo every input line to the display debug channel.
    pub debug: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs_f64(default::INPUT_POLLING_INTERVAL_SECONDS),
            debug: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub lines_read: usize,
    pub progress: f64,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// Turns matched log lines into a global percentage.
///
/// Every task owns the span between the progress reached when it was entered
/// and its own target. Within that span the task advances by its completion
/// fraction, so the displayed value never exceeds the task target.
pub struct ProgressEngine<D: IDisplay> {
    registry: TaskRegistry,
    current: usize,
    progress_base: f64,
    task_range: f64,
    action: Option<ActionMode>,
    state: EngineState,
    display: D,
    display_released: bool,
    signal: SignalSink,
    options: EngineOptions,
}

impl<D: IDisplay> ProgressEngine<D> {
    pub fn new(registry: TaskRegistry, display: D, signal: SignalSink, options: EngineOptions) -> Self {
        let task_range = registry.task(0).target_progress(None);

        Self {
            registry,
            current: 0,
            progress_base: 0.0,
            task_range,
            action: None,
            state: EngineState::Running,
            display,
            display_released: false,
            signal,
            options,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn current_task(&self) -> &Task {
        self.registry.task(self.current)
    }

    pub fn action(&self) -> Option<&ActionMode> {
        self.action.as_ref()
    }

    pub fn progress_base(&self) -> f64 {
        self.progress_base
    }

    pub fn is_active(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn global_progress(&self) -> f64 {
        self.progress_base + self.task_range * self.current_task().completion_fraction()
    }

    pub fn transition_to(&mut self, task_id: &str) {
        let Some(position) = self.registry.position(task_id) else {
            log::warn!("Ignoring transition to unknown task {task_id}");
            return;
        };

        if position == self.current {
            log::debug!("Already in task {task_id}");
            return;
        }

        self.progress_base = self.global_progress();
        self.current = position;

        let task = self.registry.task(position);
        self.task_range = task.target_progress(self.action.as_ref()) - self.progress_base;

        log::info!(
            "Entering task {} at {:.1}% (range {:.1})",
            task.id(),
            self.progress_base,
            self.task_range
        );
        self.display
            .update_task(self.progress_base, task.id(), task.description());
    }

    /// Offers `line` to the matchers and applies the first event.
    pub fn process_line(&mut self, line: &str) {
        if !self.is_active() {
            return;
        }

        if self.options.debug {
            self.display.debug(line);
        }

        match self.registry.match_line(self.current, line) {
            Some(event) => event.deliver(self),
            None => log::trace!("Unmatched line: {line}"),
        }
    }

    pub async fn run<S>(&mut self, source: &mut S) -> errors::Result<RunSummary>
    where
        S: ILineSource + ?Sized,
    {
        let started_at = Local::now();
        let mut lines_read = 0;

        let progress = self.global_progress();
        let task = self.registry.task(self.current);
        self.display
            .update_task(progress, task.id(), task.description());

        let read_result = loop {
            if !self.is_active() {
                break Ok(());
            }

            match source.next_line().await {
                Ok(LineRead::Line(line)) => {
                    lines_read += 1;
                    self.process_line(&line);
                }
                Ok(LineRead::Pending) => tokio::time::sleep(self.options.polling_interval).await,
                Ok(LineRead::Closed) => {
                    log::info!("Input closed");
                    self.stop(RunOutcome::Completed);
                }
                Err(error) => {
                    self.stop(RunOutcome::Failed(error.to_string()));
                    break Err(error);
                }
            }
        };

        let progress = self.finish().await;
        read_result?;

        let outcome = match &self.state {
            EngineState::Finished(outcome) => outcome.clone(),
            EngineState::Running => RunOutcome::Completed,
        };

        Ok(RunSummary {
            outcome,
            lines_read,
            progress,
            started_at,
            finished_at: Local::now(),
        })
    }

    fn stop(&mut self, outcome: RunOutcome) {
        if self.state == EngineState::Running {
            self.state = EngineState::Finished(outcome);
        }
    }

    /// Single exit path: final update, display cleanup, signal flush.
    async fn finish(&mut self) -> f64 {
        let failed = matches!(self.state, EngineState::Finished(RunOutcome::Failed(_)));

        let progress = if failed {
            self.global_progress()
        } else {
            if !self.display_released {
                self.display.update(100.0, Some(default::FINISHED_MESSAGE));
            }
            self.signal.signal_progress(100.0);
            100.0
        };

        self.release_display();
        self.signal.shutdown().await;
        progress
    }

    fn release_display(&mut self) {
        if !self.display_released {
            self.display_released = true;
            self.display.cleanup();
        }
    }
}

impl<D: IDisplay> IProgressCallback for ProgressEngine<D> {
    fn on_step(&mut self, message: &str) {
        self.registry.task_mut(self.current).record_step();

        let progress = self.global_progress();
        self.display.update(progress, Some(message));
        self.signal.signal_progress(progress);
    }

    fn on_task(&mut self, task_id: &str) {
        self.transition_to(task_id);
    }

    fn on_action(&mut self, action: &str, message: &str) {
        log::info!("Detected action {action}");
        self.action = Some(ActionMode::from_label(action));
        self.on_step(message);
    }

    fn on_recurring_count(&mut self, count: u64) {
        self.registry
            .task_mut(self.current)
            .observe_recurring_count(count);
    }

    fn on_fatal_error(&mut self, message: &str) {
        log::error!("{message}");
        self.display.debug(message);
        self.stop(RunOutcome::Failed(message.to_owned()));
        self.release_display();
    }

    fn on_termination(&mut self) {
        log::info!("Received hangup");
        self.stop(RunOutcome::Hangup);
    }
}
