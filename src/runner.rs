use std::time::Duration;

use crate::{
    command::run::{ConfigOptions, Frontend},
    display::{LinePrintDisplay, TerminalDisplay},
    engine::{EngineOptions, ProgressEngine, RunSummary},
    errors::{self, Errors},
    interface::IDisplay,
    registry::TaskRegistry,
    signal::SignalSink,
    source::TailSource,
};

fn new_display(options: &ConfigOptions) -> Box<dyn IDisplay> {
    match options.frontend {
        Frontend::Lineprint => Box::new(LinePrintDisplay),
        Frontend::Terminal => Box::new(TerminalDisplay::new(
            &options.action,
            &options.message,
            &options.vendor,
            options.debug,
        )),
    }
}

/// Loads the task table, follows the input log and drives the display
/// until the run ends.
pub async fn run_progress(options: &ConfigOptions) -> errors::Result<RunSummary> {
    let config = options.read_config_from_file()?;
    let registry = TaskRegistry::from_config(&config)?;

    let polling_interval =
        Duration::try_from_secs_f64(options.input_polling_interval).map_err(|error| {
            Errors::ConfigReadError(format!(
                "invalid input polling interval {}: {}",
                options.input_polling_interval, error
            ))
        })?;

    let mut source = TailSource::open(&options.input).await?;

    let engine_options = EngineOptions {
        polling_interval,
        debug: options.debug,
    };
    let signal = SignalSink::spawn(options.signal_file.as_deref());

    let mut engine = ProgressEngine::new(registry, new_display(options), signal, engine_options);
    log::info!(
        "Following {} through {} tasks",
        options.input.display(),
        engine.registry().tasks().len()
    );

    let summary = engine.run(&mut source).await?;

    log::info!(
        "Run ended with {:?} at {:.1}% after {} lines ({} - {}), action {:?}",
        summary.outcome,
        summary.progress,
        summary.lines_read,
        summary.started_at.format("%H:%M:%S"),
        summary.finished_at.format("%H:%M:%S"),
        engine.action()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::engine::RunOutcome;

    fn options(input: PathBuf) -> ConfigOptions {
        ConfigOptions {
            input,
            frontend: Frontend::Lineprint,
            debug: false,
            message: String::new(),
            vendor: String::new(),
            action: "Install".to_owned(),
            input_polling_interval: 0.001,
            signal_file: None,
            config_file: None,
        }
    }

    #[tokio::test]
    async fn missing_input_is_reported_as_not_found() {
        let directory = tempfile::tempdir().unwrap();

        let result = run_progress(&options(directory.path().join("fai.log"))).await;

        assert!(result.is_err_and(|error| error.is_not_found()));
    }

    #[tokio::test]
    async fn fai_log_is_followed_until_hangup() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("fai.log");
        let signal = directory.path().join("progress");
        std::fs::write(&signal, "").unwrap();
        std::fs::write(
            &input,
            [
                "Calling task_confdir",
                "Calling task_setup",
                "Calling task_defvar",
                "FAI_ACTION: install",
                "Calling task_partition",
                "Executing: parted -s /dev/sda mklabel gpt",
                "Calling task_instsoft",
                "2 upgraded, 2 newly installed, 0 to remove and 0 not upgraded.",
                "Unpacking vim (2:9.0.1378-2) ...",
                "fai-progress: hangup",
                "Calling task_savelog",
            ]
            .join("\n")
                + "\n",
        )
        .unwrap();

        let mut options = options(input);
        options.signal_file = Some(signal.clone());
        let summary = run_progress(&options).await.unwrap();

        assert_eq!(summary.outcome, RunOutcome::Hangup);
        assert_eq!(summary.lines_read, 10);
        let signaled = std::fs::read_to_string(&signal).unwrap();
        assert_eq!(signaled.lines().last(), Some("PROGRESS 100.0"));
        assert_eq!(signaled.lines().count(), 4);
    }

    #[tokio::test]
    async fn unrepresentable_polling_interval_is_a_config_error() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("fai.log");
        std::fs::write(&input, "Calling task_confdir\n").unwrap();

        for interval in [1e30, -1.0, f64::NAN] {
            let mut options = options(input.clone());
            options.input_polling_interval = interval;

            let result = run_progress(&options).await;

            assert!(
                matches!(result, Err(Errors::ConfigReadError(_))),
                "interval {interval} was accepted"
            );
        }
    }

    #[tokio::test]
    async fn encoded_error_fails_the_run() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("fai.log");
        std::fs::write(&input, "Calling task_confdir\nldap2fai-error:bm8gaG9zdA==\n").unwrap();

        let summary = run_progress(&options(input)).await.unwrap();

        assert_eq!(
            summary.outcome,
            RunOutcome::Failed("ldap2fai-error: no host".to_owned())
        );
    }
}
