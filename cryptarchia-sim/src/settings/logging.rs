use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{self, Display},
    fs, io,
    path::PathBuf,
    str::FromStr,
};
use structopt::StructOpt;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;

const DEFAULT_FILTER_LEVEL: LevelFilter = LevelFilter::INFO;
const DEFAULT_LOG_FORMAT: LogFormat = LogFormat::Plain;
const DEFAULT_LOG_OUTPUT: LogOutput = LogOutput::Stderr;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Format of the logger.
pub enum LogFormat {
    Plain,
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogFormat::Plain => "plain",
            LogFormat::Json => "json",
        };
        f.write_str(s)
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &*s.trim().to_lowercase() {
            "plain" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Output of the logger.
pub enum LogOutput {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            other => Err(format!("unknown log output '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open the log file `{}`", .path.to_string_lossy())]
    FileError {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },
    #[error("failed to set global subscriber")]
    SetGlobalSubscriberError(#[source] tracing_subscriber::util::TryInitError),
}

/// The `log` section of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    #[serde(default, with = "filter_level_opt_serde")]
    pub level: Option<LevelFilter>,
    #[serde(default)]
    pub format: Option<LogFormat>,
    #[serde(default)]
    pub output: Option<LogOutput>,
}

mod filter_level_opt_serde {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<LevelFilter>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|variant| {
                variant
                    .parse()
                    .map_err(|_| D::Error::custom(format!("unknown log level '{}'", variant)))
            })
            .transpose()
    }

    pub fn serialize<S: Serializer>(
        data: &Option<LevelFilter>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        data.map(|level| level.to_string()).serialize(serializer)
    }
}

fn log_level_parse(level: &str) -> Result<LevelFilter, String> {
    level
        .parse()
        .map_err(|_| format!("Unknown log level value: '{}'", level))
}

#[derive(Debug, StructOpt)]
pub struct CliSettings {
    /// Set log messages minimum severity. If not configured anywhere, defaults to "info".
    #[structopt(long = "log-level", parse(try_from_str = log_level_parse))]
    pub log_level: Option<LevelFilter>,

    /// Set format of the log emitted. Can be "json" or "plain".
    /// If not configured anywhere, defaults to "plain".
    #[structopt(long = "log-format", parse(try_from_str))]
    pub log_format: Option<LogFormat>,

    /// Set the output of the log emitted. Can be "stdout" or "stderr".
    /// If not configured anywhere, defaults to "stderr".
    #[structopt(long = "log-output", parse(try_from_str))]
    pub log_output: Option<LogOutput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
    pub output: LogOutput,
    /// what the command line overrode, to be logged once the logger is up
    pub overrides: Vec<String>,
}

impl LogSettings {
    /// The file settings, overridden by the command line.
    pub fn new(command_line: &CliSettings, file: Option<&FileSettings>) -> Self {
        let mut settings = LogSettings {
            level: DEFAULT_FILTER_LEVEL,
            format: DEFAULT_LOG_FORMAT,
            output: DEFAULT_LOG_OUTPUT,
            overrides: Vec::new(),
        };

        if let Some(file) = file {
            if let Some(level) = file.level {
                settings.level = level;
            }
            if let Some(format) = file.format {
                settings.format = format;
            }
            if let Some(output) = &file.output {
                settings.output = output.clone();
            }
        }

        if let Some(level) = command_line.log_level {
            if settings.level != level {
                settings.overrides.push(format!(
                    "log level overriden from command line: {} replaced with {}",
                    settings.level, level
                ));
            }
            settings.level = level;
        }
        if let Some(format) = command_line.log_format {
            if settings.format != format {
                settings.overrides.push(format!(
                    "log format overriden from command line: {} replaced with {}",
                    settings.format, format
                ));
            }
            settings.format = format;
        }
        if let Some(output) = &command_line.log_output {
            if &settings.output != output {
                settings.overrides.push(format!(
                    "log output overriden from command line: {:?} replaced with {:?}",
                    settings.output, output
                ));
            }
            settings.output = output.clone();
        }
        settings
    }

    /// Install the global subscriber. The guard must be held on to until
    /// the end of the program, or buffered logs are lost.
    pub fn init_log(&self) -> Result<WorkerGuard, Error> {
        use tracing_subscriber::prelude::*;

        let writer: Box<dyn io::Write + Send> = match &self.output {
            LogOutput::Stdout => Box::new(io::stdout()),
            LogOutput::Stderr => Box::new(io::stderr()),
            LogOutput::File(path) => {
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|cause| Error::FileError {
                        path: path.clone(),
                        cause,
                    })?;
                Box::new(file)
            }
        };
        let (non_blocking, guard) = tracing_appender::non_blocking(writer);

        let registry = tracing_subscriber::registry().with(self.level);
        let init = match self.format {
            LogFormat::Plain => {
                let layer = tracing_subscriber::fmt::Layer::new()
                    .with_level(true)
                    .with_writer(non_blocking);
                registry.with(layer).try_init()
            }
            LogFormat::Json => {
                let layer = tracing_subscriber::fmt::Layer::new()
                    .json()
                    .with_level(true)
                    .with_writer(non_blocking);
                registry.with(layer).try_init()
            }
        };
        init.map_err(Error::SetGlobalSubscriberError)?;

        Ok(guard)
    }
}
