#![allow(clippy::print_with_newline)]

use std::io::{self, Write};

use crate::interface::IDisplay;

const BAR_WIDTH: usize = 40;

/// Prints one line per update, suitable for logs and dumb terminals.
#[derive(Debug, Clone, Default)]
pub struct LinePrintDisplay;

impl LinePrintDisplay {
    pub fn format_line(percentage: f64, text: Option<&str>) -> String {
        format!("[{:5.1}%] {}", percentage, text.unwrap_or_default())
    }
}

impl IDisplay for LinePrintDisplay {
    fn update(&mut self, percentage: f64, text: Option<&str>) {
        println!("{}", Self::format_line(percentage, text));
    }

    fn update_task(&mut self, percentage: f64, task_id: &str, description: &str) {
        let text = format!("{description} ({task_id})");
        self.update(percentage, Some(&text));
    }

    fn debug(&mut self, message: &str) {
        eprintln!("[DEBUG] {message}");
    }

    fn cleanup(&mut self) {}
}

/// Redraws a progress bar in place below a static banner.
#[derive(Debug, Clone)]
pub struct TerminalDisplay {
    task: String,
    message: String,
    percentage: f64,
}

impl TerminalDisplay {
    pub fn new(title: &str, banner: &str, vendor: &str, debug_mode: bool) -> Self {
        print!("\x1b[2J\x1b[H");
        print!("{title}\n\n{banner}\n");
        if !vendor.is_empty() {
            print!("{vendor}\n");
        }
        if debug_mode {
            print!("DEBUG MODE\n");
        }
        print!("\n");
        let _ = io::stdout().flush();

        Self {
            task: String::new(),
            message: String::from(" . . . "),
            percentage: 0.0,
        }
    }

    pub fn render_bar(percentage: f64) -> String {
        let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64) as usize;
        format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
    }

    fn draw(&self) {
        // clear the line, then redraw the bar in place
        print!(
            "\r\x1b[K{} {:5.1}% {}: {}",
            Self::render_bar(self.percentage),
            self.percentage,
            self.task,
            self.message
        );
        let _ = io::stdout().flush();
    }
}

impl IDisplay for TerminalDisplay {
    fn update(&mut self, percentage: f64, text: Option<&str>) {
        self.percentage = percentage;
        if let Some(text) = text {
            self.message = text.to_owned();
        }
        self.draw();
    }

    fn update_task(&mut self, percentage: f64, _task_id: &str, description: &str) {
        self.task = description.to_owned();
        self.update(percentage, Some(""));
    }

    fn debug(&mut self, message: &str) {
        print!("\r\x1b[K[DEBUG] {message}\n");
        self.draw();
    }

    fn cleanup(&mut self) {
        print!("\n");
        let _ = io::stdout().flush();
    }
}
