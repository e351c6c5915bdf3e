use std::collections::HashMap;

use crate::{
    config::{Configuration, default},
    errors::{self, Errors},
    matcher::{MatchEvent, PatternMatcher},
    task::Task,
};

/// Ordered tasks of a run plus the matchers that are active regardless of the
/// current task. Index 0 is always the initializing task.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    global_matchers: Vec<PatternMatcher>,
}

impl TaskRegistry {
    pub fn from_config(config: &Configuration) -> errors::Result<Self> {
        config.validate()?;

        let mut tasks = vec![Task::new(
            default::INITIAL_TASK_ID,
            &config.initial_task.description,
            config.initial_task.progress,
            None,
            0,
        )];
        tasks.extend(config.tasks.iter().map(|definition| {
            Task::new(
                &definition.id,
                &definition.description,
                definition.progress,
                definition.progress_softupdate,
                definition.recurring,
            )
        }));

        let index: HashMap<String, usize> = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.id().to_owned(), position))
            .collect();

        let mut global_matchers = vec![];
        for parser in config.parsers.iter().filter(|parser| parser.task.is_none()) {
            global_matchers.push(PatternMatcher::new(
                &parser.pattern,
                &parser.template,
                parser.operation.clone(),
            )?);
        }
        for definition in &config.tasks {
            global_matchers.push(PatternMatcher::task_marker(
                &definition.id,
                &definition.description,
            )?);
        }

        let mut registry = Self {
            tasks,
            index,
            global_matchers,
        };

        for parser in &config.parsers {
            let Some(task_id) = &parser.task else {
                continue;
            };
            let matcher =
                PatternMatcher::new(&parser.pattern, &parser.template, parser.operation.clone())?;
            let position = registry
                .position(task_id)
                .ok_or_else(|| Errors::UnknownTask(task_id.clone()))?;
            registry.tasks[position].attach_matcher(matcher, parser.recurring, parser.expected_hits);
        }

        log::debug!(
            "Registered {} tasks and {} global matchers",
            registry.tasks.len(),
            registry.global_matchers.len()
        );

        Ok(registry)
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.index.get(task_id).copied()
    }

    pub fn task(&self, position: usize) -> &Task {
        &self.tasks[position]
    }

    pub fn task_mut(&mut self, position: usize) -> &mut Task {
        &mut self.tasks[position]
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// First event for `line`: global matchers in registration order, then the
    /// matchers of the task at `current`.
    pub fn match_line(&mut self, current: usize, line: &str) -> Option<MatchEvent> {
        if let Some(event) = self
            .global_matchers
            .iter_mut()
            .find_map(|matcher| matcher.try_match(line))
        {
            return Some(event);
        }
        self.tasks[current].try_match(line)
    }
}
