//! Host collaborator
//!
//! The balancing core never displays anything nor exits the process. The
//! program embedding it provides a [`Host`] and decides what to do with a
//! failed assignment; [`unwrap_or_halt`] is the default policy: show the
//! message, then terminate.

use std::io::{self, BufRead, Write};

use tracing::error;

use crate::Result;

/// Presentation primitives provided by the program running the experiment
pub trait Host {
    /// Present a message and block until the user acknowledges it
    fn show_message(&mut self, message: &str);

    /// Stop the host process
    fn terminate(&mut self) -> !;
}

/// Return the value, or show the error and terminate the host.
///
/// On error the host is called exactly twice: [`Host::show_message`] then
/// [`Host::terminate`].
pub fn unwrap_or_halt<T, H: Host + ?Sized>(result: Result<T>, host: &mut H) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            error!(kind = ?err.kind(), "{err}");
            host.show_message(&err.to_string());
            host.terminate()
        }
    }
}

/// Terminal host: prints messages to stdout and exits with status 1
#[derive(Debug)]
pub struct ConsoleHost<W: Write = io::Stdout> {
    out: W,
    wait_for_ack: bool,
}

impl ConsoleHost {
    /// Create a console host writing to stdout
    ///
    /// With `wait_for_ack`, every message waits for the Enter key.
    #[must_use]
    pub fn new(wait_for_ack: bool) -> Self {
        Self::with_writer(io::stdout(), wait_for_ack)
    }
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<W: Write> ConsoleHost<W> {
    /// Create a console host writing messages to `out`
    #[must_use]
    pub const fn with_writer(out: W, wait_for_ack: bool) -> Self {
        Self { out, wait_for_ack }
    }

    /// Consume the host, returning its writer
    #[must_use]
    pub fn into_writer(self) -> W {
        self.out
    }
}

impl<W: Write> Host for ConsoleHost<W> {
    fn show_message(&mut self, message: &str) {
        // Nothing sensible to do if the terminal is gone
        let _ = writeln!(self.out, "{message}");
        if self.wait_for_ack {
            let _ = writeln!(self.out, "\n(press Enter to continue)");
            let _ = self.out.flush();
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
        }
        let _ = self.out.flush();
    }

    fn terminate(&mut self) -> ! {
        let _ = self.out.flush();
        std::process::exit(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Default)]
    struct RecordingHost {
        messages: Vec<String>,
    }

    impl Host for RecordingHost {
        fn show_message(&mut self, message: &str) {
            self.messages.push(message.to_string());
        }

        fn terminate(&mut self) -> ! {
            panic!("terminated after {:?}", self.messages);
        }
    }

    #[test]
    fn test_ok_passes_through() {
        let mut host = RecordingHost::default();
        assert_eq!(unwrap_or_halt(Ok(3), &mut host), 3);
        assert!(host.messages.is_empty());
    }

    #[test]
    fn test_console_host_writes_message_lines() {
        let mut host = ConsoleHost::with_writer(Vec::new(), false);
        host.show_message("Participant P01: condition 2");
        host.show_message("age=young: 1");

        let output = String::from_utf8(host.into_writer()).unwrap();
        assert_eq!(output, "Participant P01: condition 2\nage=young: 1\n");
    }

    #[test]
    #[should_panic(expected = "must have the field 'participant'")]
    fn test_error_shows_then_terminates() {
        let mut host = RecordingHost::default();
        let result: Result<()> = Err(Error::MissingField("participant".to_string()));
        unwrap_or_halt(result, &mut host);
    }
}
