use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{self, Errors},
    interface::IProgressCallback,
};

pub const UNDECODABLE_ERROR_MESSAGE: &str =
    "ldap2fai-error occurred, however the cause could not be decoded!";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// What a match of a parser means for the run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperation {
    /// One more step of the current task.
    #[default]
    Step,
    /// apt summary line carrying `upgrades`, `installs` and `removes`.
    PackageCount,
    /// Detected action mode in group `action`, also counted as a step.
    Action,
    Fatal,
    /// Like `Fatal`, with a base64 encoded cause in group `payload`.
    EncodedFatal,
    Hangup,
    /// Entering the named task. Generated per task, never configured.
    #[serde(skip)]
    EnterTask(String),
}

impl MatchOperation {
    fn required_fields(&self) -> &'static [&'static str] {
        match self {
            MatchOperation::PackageCount => &["upgrades", "installs", "removes"],
            MatchOperation::Action => &["action"],
            MatchOperation::EncodedFatal => &["payload"],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    Step(String),
    EnterTask(String),
    RecurringCount(u64),
    Action { action: String, message: String },
    Fatal(String),
    Hangup,
}

impl MatchEvent {
    pub fn deliver<C: IProgressCallback + ?Sized>(self, callback: &mut C) {
        match self {
            MatchEvent::Step(message) => callback.on_step(&message),
            MatchEvent::EnterTask(task_id) => callback.on_task(&task_id),
            MatchEvent::RecurringCount(count) => callback.on_recurring_count(count),
            MatchEvent::Action { action, message } => callback.on_action(&action, &message),
            MatchEvent::Fatal(message) => callback.on_fatal_error(&message),
            MatchEvent::Hangup => callback.on_termination(),
        }
    }
}

/// A regular expression plus a message template rendered from its named groups.
///
/// Patterns are matched from the start of the line. Every `{field}` of the
/// template has to be a named group of the pattern, which is checked once on
/// construction.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Regex,
    template: String,
    operation: MatchOperation,
    hits: usize,
}

impl PatternMatcher {
    pub fn new(pattern: &str, template: &str, operation: MatchOperation) -> errors::Result<Self> {
        let compiled = Regex::new(&format!("^(?:{pattern})"))
            .map_err(|e| Errors::PatternError(format!("'{pattern}': {e}")))?;

        let groups: Vec<&str> = compiled.capture_names().flatten().collect();

        for placeholder in PLACEHOLDER.captures_iter(template) {
            let field = &placeholder[1];
            if !groups.contains(&field) {
                return Err(Errors::TemplateFieldError(format!(
                    "template '{template}' uses field '{field}' which pattern '{pattern}' does not capture"
                )));
            }
        }

        for field in operation.required_fields() {
            if !groups.contains(field) {
                return Err(Errors::TemplateFieldError(format!(
                    "pattern '{pattern}' must capture '{field}' for {operation:?}"
                )));
            }
        }

        Ok(Self {
            pattern: compiled,
            template: template.to_owned(),
            operation,
            hits: 0,
        })
    }

    /// Matcher for the markers FAI prints when it enters or skips a task.
    pub fn task_marker(task_id: &str, description: &str) -> errors::Result<Self> {
        let pattern = format!(
            r"((Skipp?|Call)ing task_|(Calling|Source) hook: )(?P<name>{})\b",
            regex::escape(task_id)
        );
        Self::new(
            &pattern,
            description,
            MatchOperation::EnterTask(task_id.to_owned()),
        )
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the event for `line`, or `None` without side effects if the
    /// line does not match.
    pub fn try_match(&mut self, line: &str) -> Option<MatchEvent> {
        let captures = self.pattern.captures(line)?;
        self.hits += 1;

        let fields: HashMap<&str, &str> = self
            .pattern
            .capture_names()
            .flatten()
            .filter_map(|name| captures.name(name).map(|value| (name, value.as_str())))
            .collect();

        Some(self.event(&fields))
    }

    fn event(&self, fields: &HashMap<&str, &str>) -> MatchEvent {
        match &self.operation {
            MatchOperation::Step => MatchEvent::Step(self.render(fields)),
            MatchOperation::EnterTask(task_id) => MatchEvent::EnterTask(task_id.clone()),
            MatchOperation::PackageCount => {
                let count = count_field(fields, "upgrades")
                    .saturating_add(count_field(fields, "installs"))
                    .saturating_sub(count_field(fields, "removes"));
                MatchEvent::RecurringCount(count.max(0) as u64)
            }
            MatchOperation::Action => MatchEvent::Action {
                action: fields.get("action").copied().unwrap_or_default().to_owned(),
                message: self.render(fields),
            },
            MatchOperation::Fatal => MatchEvent::Fatal(self.render(fields)),
            MatchOperation::EncodedFatal => {
                let payload = fields.get("payload").copied().unwrap_or_default().trim();
                match decode_payload(payload) {
                    Some(decoded) => {
                        let mut fields = fields.clone();
                        fields.insert("payload", &decoded);
                        MatchEvent::Fatal(self.render(&fields))
                    }
                    None => MatchEvent::Fatal(UNDECODABLE_ERROR_MESSAGE.to_owned()),
                }
            }
            MatchOperation::Hangup => MatchEvent::Hangup,
        }
    }

    fn render(&self, fields: &HashMap<&str, &str>) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures| {
                fields.get(&caps[1]).copied().unwrap_or_default().to_owned()
            })
            .into_owned()
    }
}

fn count_field(fields: &HashMap<&str, &str>, name: &str) -> i64 {
    let value = fields.get(name).copied().unwrap_or_default();
    value.parse::<i64>().unwrap_or_else(|error| {
        log::warn!("Ignoring unparsable {name} count '{value}': {error}");
        0
    })
}

fn decode_payload(payload: &str) -> Option<String> {
    match base64::engine::general_purpose::STANDARD.decode(payload) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(error) => {
            log::debug!("Failed to decode error payload '{payload}': {error}");
            None
        }
    }
}
