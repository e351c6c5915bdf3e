use crate::matcher::{MatchEvent, PatternMatcher};

/// Selects which target progress column applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionMode {
    Install,
    Softupdate,
    Other(String),
}

impl ActionMode {
    pub fn from_label(label: &str) -> Self {
        match label {
            "install" => ActionMode::Install,
            "softupdate" => ActionMode::Softupdate,
            other => ActionMode::Other(other.to_owned()),
        }
    }
}

/// A sequential phase of a FAI run with its own share of the progress bar.
///
/// Recurring matchers (one package out of many) share a single budget of
/// `expected_recurring_steps`, every other matcher adds its expected hits.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    description: String,
    install_target: f64,
    softupdate_target: f64,
    matchers: Vec<PatternMatcher>,
    recurring_factor: u64,
    non_recurring_hits: u64,
    expected_recurring_steps: u64,
    steps: u64,
}

impl Task {
    pub fn new(
        id: &str,
        description: &str,
        install_target: f64,
        softupdate_target: Option<f64>,
        expected_recurring_steps: u64,
    ) -> Self {
        Self {
            id: id.to_owned(),
            description: description.to_owned(),
            install_target,
            softupdate_target: softupdate_target.unwrap_or(install_target),
            matchers: vec![],
            recurring_factor: 0,
            non_recurring_hits: 0,
            expected_recurring_steps,
            steps: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn attach_matcher(&mut self, matcher: PatternMatcher, recurring: bool, expected_hits: u64) {
        self.matchers.push(matcher);
        if recurring {
            self.recurring_factor += 1;
        } else {
            self.non_recurring_hits += expected_hits;
        }
    }

    /// First event of the task-local matchers for `line`.
    pub fn try_match(&mut self, line: &str) -> Option<MatchEvent> {
        self.matchers
            .iter_mut()
            .find_map(|matcher| matcher.try_match(line))
    }

    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    /// Replaces the recurring step estimate with a count reported by the installer.
    pub fn observe_recurring_count(&mut self, count: u64) {
        log::debug!(
            "Task {}: expected recurring steps {} -> {count}",
            self.id,
            self.expected_recurring_steps
        );
        self.expected_recurring_steps = count;
    }

    pub fn expected_steps(&self) -> u64 {
        self.non_recurring_hits + self.recurring_factor * self.expected_recurring_steps
    }

    pub fn completion_fraction(&self) -> f64 {
        let expected = self.expected_steps();
        if expected == 0 {
            return 1.0;
        }
        (self.steps as f64 / expected as f64).min(1.0)
    }

    pub fn target_progress(&self, action: Option<&ActionMode>) -> f64 {
        match action {
            Some(ActionMode::Softupdate) => self.softupdate_target,
            _ => self.install_target,
        }
    }
}
