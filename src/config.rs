use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{self, Errors},
    matcher::MatchOperation,
};

const BUILTIN_CONFIGURATION: &str = include_str!("default_config.json");

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default)]
    pub initial_task: InitialTask,
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub parsers: Vec<ParserDefinition>,
}

pub mod default {
    pub const INITIAL_TASK_ID: &str = "init";
    pub const INITIAL_TASK_DESCRIPTION: &str = "Initializing FAI";
    pub const INITIAL_TASK_PROGRESS: f64 = 0.0;
    pub const INPUT_POLLING_INTERVAL_SECONDS: f64 = 0.05;
    pub const FINISHED_MESSAGE: &str = "finished";
    pub const BANNER_MESSAGE: &str = "Do not power off or unplug your machine!";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InitialTask {
    pub description: String,
    pub progress: f64,
}

impl Default for InitialTask {
    fn default() -> Self {
        Self {
            description: default::INITIAL_TASK_DESCRIPTION.to_owned(),
            progress: default::INITIAL_TASK_PROGRESS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskDefinition {
    pub id: String,
    pub description: String,
    /// Progress in percent once this task is finished.
    pub progress: f64,
    pub progress_softupdate: Option<f64>,
    /// Expected number of hits per recurring parser of this task.
    #[serde(default)]
    pub recurring: u64,
}

impl TaskDefinition {
    pub fn get_progress_softupdate(&self) -> f64 {
        self.progress_softupdate.unwrap_or(self.progress)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserDefinition {
    /// Owning task, global parser if absent.
    pub task: Option<String>,
    #[serde(default)]
    pub template: String,
    pub pattern: String,
    #[serde(default)]
    pub operation: MatchOperation,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub expected_hits: u64,
}

impl Configuration {
    /// Task and parser table of a stock FAI installation.
    pub fn builtin() -> errors::Result<Self> {
        Self::from_json(BUILTIN_CONFIGURATION)
    }

    pub fn from_json(content: &str) -> errors::Result<Self> {
        let config: Configuration = serde_json::from_str(content).map_err(|error| {
            Errors::ConfigReadError(format!("Failed to parse configuration: {}", error))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> errors::Result<()> {
        if let Some(duplicate) = self
            .tasks
            .iter()
            .map(|task| task.id.as_str())
            .chain(std::iter::once(default::INITIAL_TASK_ID))
            .duplicates()
            .next()
        {
            return Err(Errors::ConfigReadError(format!(
                "task '{duplicate}' is defined more than once"
            )));
        }

        // the initializing task comes first in the ordered sequence
        let targets = std::iter::once((
            default::INITIAL_TASK_ID,
            self.initial_task.progress,
            self.initial_task.progress,
        ))
        .chain(self.tasks.iter().map(|task| {
            (
                task.id.as_str(),
                task.progress,
                task.get_progress_softupdate(),
            )
        }));

        for (previous, next) in targets.tuple_windows() {
            if next.1 < previous.1 {
                return Err(Errors::TaskOrderError(format!(
                    "install progress of '{}' ({}) is lower than of '{}' ({})",
                    next.0, next.1, previous.0, previous.1
                )));
            }
            if next.2 < previous.2 {
                return Err(Errors::TaskOrderError(format!(
                    "softupdate progress of '{}' ({}) is lower than of '{}' ({})",
                    next.0, next.2, previous.0, previous.2
                )));
            }
        }

        for parser in &self.parsers {
            if parser.recurring && parser.expected_hits != 0 {
                return Err(Errors::ConfigReadError(format!(
                    "recurring parser '{}' must not define expected hits",
                    parser.pattern
                )));
            }

            match &parser.task {
                Some(task) => {
                    if !self.tasks.iter().any(|definition| &definition.id == task) {
                        return Err(Errors::UnknownTask(task.clone()));
                    }
                }
                None if parser.recurring => {
                    return Err(Errors::ConfigReadError(format!(
                        "global parser '{}' cannot be recurring",
                        parser.pattern
                    )));
                }
                None => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_configuration_is_valid() {
        let config = Configuration::builtin().unwrap();

        assert_eq!(config.tasks.first().unwrap().id, "confdir");
        assert_eq!(config.tasks.last().unwrap().progress, 100.0);
        assert!(config.parsers.iter().any(|p| p.operation == MatchOperation::EncodedFatal));
        assert!(config.parsers.iter().any(|p| p.operation == MatchOperation::Hangup));
    }

    #[test]
    fn unknown_parser_task_is_rejected() {
        let result = Configuration::from_json(
            r#"{
                "tasks": [{"id": "a", "description": "A", "progress": 10}],
                "parsers": [{"task": "b", "pattern": "x"}]
            }"#,
        );

        assert!(matches!(result, Err(Errors::UnknownTask(task)) if task == "b"));
    }

    #[test]
    fn decreasing_targets_are_rejected() {
        let install = Configuration::from_json(
            r#"{"tasks": [
                {"id": "a", "description": "A", "progress": 50},
                {"id": "b", "description": "B", "progress": 40}
            ]}"#,
        );
        let softupdate = Configuration::from_json(
            r#"{"tasks": [
                {"id": "a", "description": "A", "progress": 10, "progress_softupdate": 60},
                {"id": "b", "description": "B", "progress": 40}
            ]}"#,
        );

        assert!(matches!(install, Err(Errors::TaskOrderError(_))));
        assert!(matches!(softupdate, Err(Errors::TaskOrderError(_))));
    }

    #[test]
    fn initial_progress_above_first_task_is_rejected() {
        let result = Configuration::from_json(
            r#"{
                "initial_task": {"description": "Init", "progress": 40},
                "tasks": [
                    {"id": "a", "description": "A", "progress": 10},
                    {"id": "b", "description": "B", "progress": 50}
                ]
            }"#,
        );
        let softupdate = Configuration::from_json(
            r#"{
                "initial_task": {"description": "Init", "progress": 8},
                "tasks": [{"id": "a", "description": "A", "progress": 10, "progress_softupdate": 5}]
            }"#,
        );
        let equal = Configuration::from_json(
            r#"{
                "initial_task": {"description": "Init", "progress": 10},
                "tasks": [{"id": "a", "description": "A", "progress": 10}]
            }"#,
        );

        assert!(matches!(result, Err(Errors::TaskOrderError(message)) if message.contains("'a'")));
        assert!(matches!(softupdate, Err(Errors::TaskOrderError(_))));
        assert!(equal.is_ok());
    }

    #[test]
    fn recurring_parser_with_expected_hits_is_rejected() {
        let result = Configuration::from_json(
            r#"{
                "tasks": [{"id": "a", "description": "A", "progress": 10}],
                "parsers": [{"task": "a", "pattern": "x", "recurring": true, "expected_hits": 3}]
            }"#,
        );

        assert!(matches!(result, Err(Errors::ConfigReadError(_))));
    }

    #[test]
    fn duplicate_task_is_rejected() {
        let result = Configuration::from_json(
            r#"{"tasks": [
                {"id": "a", "description": "A", "progress": 10},
                {"id": "a", "description": "A again", "progress": 20}
            ]}"#,
        );

        assert!(matches!(result, Err(Errors::ConfigReadError(_))));
    }

    #[test]
    fn malformed_json_is_a_read_error() {
        assert!(matches!(
            Configuration::from_json("{ tasks: }"),
            Err(Errors::ConfigReadError(_))
        ));
    }
}
