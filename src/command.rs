use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Command {
    #[clap(subcommand)]
    pub action: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum SubCommand {
    Run(run::Command),
}

pub mod run {
    use std::path::PathBuf;

    use clap::{Args, ValueEnum};

    use crate::{config::default, errors};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
    pub enum Frontend {
        Lineprint,
        #[default]
        Terminal,
    }

    #[derive(Clone, Debug, Args)]
    pub struct ConfigOptions {
        #[clap(help = "data source FAI log")]
        pub input: PathBuf,

        #[clap(short, long, value_enum, default_value_t = Frontend::Terminal, help = "choose frontend")]
        pub frontend: Frontend,

        #[clap(short, long, help = "turn debugging mode on")]
        pub debug: bool,

        #[clap(short, long, default_value = default::BANNER_MESSAGE, help = "this message will be displayed during fai run")]
        pub message: String,

        #[clap(short = 'l', long, default_value = "", help = "vendor to display")]
        pub vendor: String,

        #[clap(short, long, default_value = "Install", help = "action to display (install or update)")]
        pub action: String,

        #[clap(
            short,
            long,
            default_value_t = default::INPUT_POLLING_INTERVAL_SECONDS,
            help = "wait this amount of time in seconds before read line retry"
        )]
        pub input_polling_interval: f64,

        #[clap(short, long, help = "signal current progress to this path")]
        pub signal_file: Option<PathBuf>,

        #[clap(short, long, help = "task and parser configuration file, built-in FAI table if omitted")]
        pub config_file: Option<PathBuf>,
    }

    impl ConfigOptions {
        pub fn read_config_from_file(&self) -> errors::Result<crate::config::Configuration> {
            let Some(config_file) = &self.config_file else {
                log::debug!("Using built-in task configuration");
                return crate::config::Configuration::builtin();
            };

            log::debug!("Reading configuration from file: {}", config_file.display());

            let config_content = std::fs::read_to_string(config_file)?;
            let config = crate::config::Configuration::from_json(&config_content)?;

            log::info!(
                "Successfully loaded configuration from {}",
                config_file.display()
            );

            Ok(config)
        }
    }

    #[derive(Clone, Debug, Args)]
    #[clap(name = "run", about = "Display the progress of a FAI run")]
    pub struct Command {
        #[clap(flatten)]
        pub value: ConfigOptions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Errors;

    fn run_with_config_file(config_file: &std::path::Path) -> run::ConfigOptions {
        let command = Command::parse_from([
            std::ffi::OsStr::new("fai-progress"),
            std::ffi::OsStr::new("run"),
            std::ffi::OsStr::new("fai.log"),
            std::ffi::OsStr::new("--config-file"),
            config_file.as_os_str(),
        ]);

        let SubCommand::Run(run) = command.action;
        run.value
    }

    #[test]
    fn run_defaults() {
        let command = Command::parse_from(["fai-progress", "run", "/var/log/fai/fai.log"]);

        let SubCommand::Run(run) = command.action;
        assert_eq!(run.value.frontend, run::Frontend::Terminal);
        assert_eq!(run.value.input_polling_interval, 0.05);
        assert!(run.value.signal_file.is_none());
        assert!(run.value.read_config_from_file().is_ok());
    }

    #[test]
    fn run_options() {
        let command = Command::parse_from([
            "fai-progress",
            "run",
            "fai.log",
            "--frontend",
            "lineprint",
            "-d",
            "-i",
            "0.2",
            "-s",
            "/tmp/progress",
        ]);

        let SubCommand::Run(run) = command.action;
        assert_eq!(run.value.frontend, run::Frontend::Lineprint);
        assert!(run.value.debug);
        assert_eq!(run.value.input_polling_interval, 0.2);
        assert_eq!(
            run.value.signal_file.as_deref(),
            Some(std::path::Path::new("/tmp/progress"))
        );
    }

    #[test]
    fn config_file_replaces_builtin_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{
                "initial_task": {"description": "Booting", "progress": 1},
                "tasks": [
                    {"id": "partition", "description": "Partitioning", "progress": 30},
                    {"id": "instsoft", "description": "Installing software", "progress": 100, "recurring": 20}
                ],
                "parsers": [{"task": "instsoft", "pattern": "Unpacking", "recurring": true}]
            }"#,
        )
        .unwrap();

        let config = run_with_config_file(file.path())
            .read_config_from_file()
            .unwrap();

        assert_eq!(config.initial_task.description, "Booting");
        let ids: Vec<_> = config.tasks.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, ["partition", "instsoft"]);
        assert_eq!(config.parsers.len(), 1);
    }

    #[test]
    fn malformed_config_file_is_a_read_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"tasks": [{"id": "a""#).unwrap();

        let result = run_with_config_file(file.path()).read_config_from_file();

        assert!(matches!(result, Err(Errors::ConfigReadError(_))));
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let directory = tempfile::tempdir().unwrap();

        let result =
            run_with_config_file(&directory.path().join("tasks.json")).read_config_from_file();

        assert!(matches!(result, Err(Errors::IOError(_))));
    }
}
