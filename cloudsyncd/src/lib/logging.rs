use std::io::{self, Write};

use camino::Utf8Path;
use cloudsync::{config_bail, config_error};
use log::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Number of daily log files kept, the current one included
pub const KEPT_LOG_FILES: usize = 7;

/// Log target that copies every line to stderr and to a daily rolling file.
/// Files are named `<file name>.<YYYY-MM-DD>` in the folder of the log path.
pub struct Tee {
    file: RollingFileAppender,
}

impl Tee {
    pub fn open(log_path: &Utf8Path) -> cloudsync::Result<Self> {
        let Some(name) = log_path.file_name() else {
            config_bail!("'log_path' must point to a file: {log_path}");
        };
        let dir = match log_path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        let file = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(name)
            .max_log_files(KEPT_LOG_FILES)
            .build(dir)
            .map_err(|err| config_error!("Can't open log file {log_path}: {err}"))?;
        Ok(Self { file })
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // stderr may be closed when running detached
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the global logger.
/// `RUST_LOG` takes precedence over `verbosity`.
pub fn init(log_path: &Utf8Path, verbosity: u8) -> cloudsync::Result<()> {
    let tee = Tee::open(log_path)?;
    env_logger::Builder::new()
        .filter_level(level_for(verbosity))
        .parse_default_env()
        .format_timestamp_secs()
        .target(env_logger::Target::Pipe(Box::new(tee)))
        .try_init()
        .map_err(|err| cloudsync::other_error!("Can't install logger: {err}"))
}
