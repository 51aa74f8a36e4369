//! Archiver module
//!
//! Wraps the external archiving executable:
//! - Request model and validation (`options`)
//! - Argument construction (`args`)
//! - Process execution with concurrent stream draining (`process`)

pub mod args;
pub mod options;
pub mod process;

pub use args::build_args;
pub use options::{ArchiveOptions, ArchiveRequest, ValidationError};
pub use process::{run_process, ProcessResult};

use crate::config::ArchiverConfig;
use crate::logger;
use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Content type of a regular HTML archive
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
/// Content type of an MHTML archive
pub const MHTML_CONTENT_TYPE: &str = "multipart/related";

/// Successful archive output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedDocument {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

/// Errors from a single archive run
#[derive(Debug)]
pub enum ArchiveError {
    /// Rejected before any process was started
    Invalid(ValidationError),
    /// The process could not be started or its streams failed
    Launch(io::Error),
    /// The process exited unsuccessfully
    Failed(ProcessResult),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "Invalid archive request: {e}"),
            Self::Launch(e) => write!(f, "Failed to run archiver: {e}"),
            Self::Failed(result) => write!(
                f,
                "Archiver exited with code {}: {}",
                result.exit_code,
                result.stderr.trim()
            ),
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(e) => Some(e),
            Self::Launch(e) => Some(e),
            Self::Failed(_) => None,
        }
    }
}

impl From<ValidationError> for ArchiveError {
    fn from(e: ValidationError) -> Self {
        Self::Invalid(e)
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        Self::Launch(e)
    }
}

/// Handle to the archiving executable, built once from configuration
#[derive(Debug, Clone)]
pub struct Archiver {
    program: PathBuf,
    /// Arguments placed before the generated flags
    leading_args: Vec<String>,
    kill_on_disconnect: bool,
}

impl Archiver {
    pub fn from_config(config: &ArchiverConfig) -> Self {
        let program = if config.bundled {
            PathBuf::from(&config.bundled_path)
        } else {
            PathBuf::from(&config.program)
        };

        Self {
            program,
            leading_args: Vec::new(),
            kill_on_disconnect: config.kill_on_disconnect,
        }
    }

    /// Run `program` with `leading_args` ahead of the archive flags
    #[cfg(test)]
    pub fn with_leading_args(program: impl Into<PathBuf>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
            kill_on_disconnect: true,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the executable can currently be found
    pub fn is_available(&self) -> bool {
        resolve_executable(&self.program).is_some()
    }

    /// Archive one request: validate, build the command line, run the tool
    pub async fn archive(&self, request: &ArchiveRequest) -> Result<ArchivedDocument, ArchiveError> {
        let source = request.content_source()?;
        let args = build_args(&request.options, &source);
        let input = source.stdin_input();

        logger::log_debug(&format!(
            "[Archiver] {} {}",
            self.program.display(),
            args.join(" ")
        ));

        let started = Instant::now();
        let result = run_process(
            &self.program,
            self.leading_args.iter().chain(args.iter()),
            input,
            self.kill_on_disconnect,
        )
        .await?;

        logger::log_info(&format!(
            "[Archiver] {} finished with code {} in {} ms ({} bytes out)",
            source.describe(),
            result.exit_code,
            started.elapsed().as_millis(),
            result.stdout.len()
        ));

        if !result.success() {
            return Err(ArchiveError::Failed(result));
        }

        Ok(ArchivedDocument {
            body: result.stdout,
            content_type: content_type_for(&request.options),
        })
    }
}

pub const fn content_type_for(options: &ArchiveOptions) -> &'static str {
    if options.mhtml {
        MHTML_CONTENT_TYPE
    } else {
        HTML_CONTENT_TYPE
    }
}

/// Locate `program` the way the OS would when spawning it
fn resolve_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
