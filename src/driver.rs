//! Line-driven request loop.
//!
//! Reads one line at a time, relays it through the session and prints the
//! reply.  Input is read on a helper thread so the loop can notice the
//! [`Interrupt`] while the user is idle at the prompt.  A request already in
//! flight is never cancelled.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::session::Session;
use crate::signal::Interrupt;
use crate::state::SessionState;

/// How often the loop re-checks the interrupt while waiting for input.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// How the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Terminal state `DOWN`.
    Clean,
    /// Any other terminal state, with the cause to report.
    Failed(String),
}

/// What the input thread produced.
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Spawn the reader thread.  It stops at end of input, on a read error or
/// once the loop has hung up.
fn spawn_reader<R>(mut input: R) -> Receiver<io::Result<Option<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || loop {
        let mut line = String::new();
        let item = match input.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };
        let last = !matches!(item, Ok(Some(_)));
        if tx.send(item).is_err() || last {
            break;
        }
    });
    rx
}

/// Wait for the next line, giving up early if the interrupt is raised.
fn next_input(
    lines: &Receiver<io::Result<Option<String>>>,
    interrupt: &Interrupt,
) -> io::Result<Input> {
    loop {
        if interrupt.is_raised() {
            return Ok(Input::Interrupted);
        }
        match lines.recv_timeout(POLL_SLICE) {
            Ok(Ok(Some(line))) => return Ok(Input::Line(line)),
            Ok(Ok(None)) | Err(RecvTimeoutError::Disconnected) => return Ok(Input::Eof),
            Ok(Err(e)) => return Err(e),
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Drive `session` until input ends, the interrupt is raised or the session
/// leaves `UP`.
///
/// `session` must already be connected.  Only console I/O errors are
/// returned as `Err`; session failures end up in [`Outcome::Failed`].
pub fn run<R, W>(
    session: &mut Session,
    input: R,
    output: &mut W,
    interrupt: &Interrupt,
) -> io::Result<Outcome>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let lines = spawn_reader(input);

    while session.state() == SessionState::Up {
        let line = match next_input(&lines, interrupt)? {
            Input::Line(line) => line,
            Input::Eof | Input::Interrupted => {
                interrupt.raise();
                let status = session.disconnect();
                print_status(output, &status)?;
                break;
            }
        };

        let request = line.trim_end_matches(['\n', '\r']);
        if request.is_empty() {
            continue;
        }

        if session.send(request).is_err() {
            break;
        }

        match session.receive() {
            Ok(reply) if reply.is_empty() => {
                log::info!("server closed the connection");
                let status = session.disconnect();
                print_status(output, &status)?;
                break;
            }
            Ok(reply) => {
                writeln!(output, "{reply}")?;
                output.flush()?;
            }
            Err(_) => break,
        }
    }

    Ok(match session.state() {
        SessionState::Down => Outcome::Clean,
        state => Outcome::Failed(
            session
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("session ended in state {state}")),
        ),
    })
}

fn print_status<W: Write>(output: &mut W, status: &str) -> io::Result<()> {
    if !status.is_empty() {
        writeln!(output, "{status}")?;
    }
    output.flush()
}
