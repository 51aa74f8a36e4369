//! Subprocess execution
//!
//! Runs one archiver process with all three standard streams piped. Stdin is
//! fed and closed while stdout and stderr are drained concurrently, so neither
//! pipe can fill up and stall the child before it exits.

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};

/// Exit code reported when the process was terminated by a signal
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Captured outcome of one process run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Raw document bytes, in whatever encoding the tool wrote
    pub stdout: Vec<u8>,
    /// Diagnostics, decoded lossily
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessResult {
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawn `program` with `args`, optionally piping `input` to stdin, and
/// collect its output once it has exited.
pub async fn run_process<P, A, S>(
    program: P,
    args: A,
    input: Option<&str>,
    kill_on_drop: bool,
) -> io::Result<ProcessResult>
where
    P: AsRef<OsStr>,
    A: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(kill_on_drop)
        .spawn()?;

    let stdin = child.stdin.take();
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

    let (fed, out, err, status) = tokio::join!(
        feed_stdin(stdin, input),
        read_to_end(stdout),
        read_to_end(stderr),
        child.wait(),
    );

    let status = status?;
    fed?;

    Ok(ProcessResult {
        stdout: out?,
        stderr: String::from_utf8_lossy(&err?).into_owned(),
        exit_code: status.code().unwrap_or(SIGNALED_EXIT_CODE),
    })
}

/// Write `input` (if any) and close the stream to signal end-of-input
async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<&str>) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    if let Some(input) = input {
        match stdin.write_all(input.as_bytes()).await {
            Ok(()) => {}
            // The child may exit without reading everything
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e),
        }
        stdin.flush().await?;
    }

    drop(stdin);
    Ok(())
}

async fn read_to_end<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}
