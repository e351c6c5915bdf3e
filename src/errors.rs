#[derive(Debug)]
pub enum Errors {
    ConfigReadError(String),
    IOError(std::io::Error),
    InputNotFound(String),
    TemplateFieldError(String),
    PatternError(String),
    UnknownTask(String),
    TaskOrderError(String),
}

pub type Result<T> = std::result::Result<T, Errors>;

impl From<std::io::Error> for Errors {
    fn from(err: std::io::Error) -> Self {
        Errors::IOError(err)
    }
}

impl std::fmt::Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Errors::ConfigReadError(msg) => write!(f, "Configuration read error: {}", msg),
            Errors::IOError(err) => write!(f, "I/O error: {}", err),
            Errors::InputNotFound(path) => write!(f, "No such file or directory: {}", path),
            Errors::TemplateFieldError(msg) => write!(f, "Template field error: {}", msg),
            Errors::PatternError(msg) => write!(f, "Invalid pattern: {}", msg),
            Errors::UnknownTask(task) => write!(f, "Unknown task: {}", task),
            Errors::TaskOrderError(msg) => write!(f, "Task order error: {}", msg),
        }
    }
}

impl Errors {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Errors::InputNotFound(_))
    }
}
