use crate::errors::Errors;

/// Front end receiving progress updates.
pub trait IDisplay {
    fn update(&mut self, percentage: f64, text: Option<&str>);
    fn update_task(&mut self, percentage: f64, task_id: &str, description: &str);
    fn debug(&mut self, message: &str);
    /// Releases terminal resources. Called once at shutdown.
    fn cleanup(&mut self);
}

impl<T: IDisplay + ?Sized> IDisplay for Box<T> {
    fn update(&mut self, percentage: f64, text: Option<&str>) {
        (**self).update(percentage, text)
    }

    fn update_task(&mut self, percentage: f64, task_id: &str, description: &str) {
        (**self).update_task(percentage, task_id, description)
    }

    fn debug(&mut self, message: &str) {
        (**self).debug(message)
    }

    fn cleanup(&mut self) {
        (**self).cleanup()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineRead {
    /// A complete line with trailing whitespace stripped.
    Line(String),
    /// No new data yet, try again later.
    Pending,
    /// The source will never produce data again.
    Closed,
}

#[async_trait::async_trait]
pub trait ILineSource {
    async fn next_line(&mut self) -> Result<LineRead, Errors>;
}

/// Operations a matched line can trigger.
pub trait IProgressCallback {
    fn on_step(&mut self, message: &str);
    fn on_task(&mut self, task_id: &str);
    fn on_action(&mut self, action: &str, message: &str);
    fn on_recurring_count(&mut self, count: u64);
    fn on_fatal_error(&mut self, message: &str);
    fn on_termination(&mut self);
}
