//! Handing export payloads to an external logbook application.
//!
//! The receiver is identified by a fixed action name. When no receiver is
//! installed the hand-off reports [`Delivery::NoReceiver`]; callers show an
//! informational notice and carry on.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Action name the logbook application listens for.
pub const LOGBOOK_ACTION: &str = "ch.apprun.intent.LOG";

/// Key under which the logbook expects the payload.
pub const LOGBOOK_EXTRA_KEY: &str = "ch.apprun.logmessage";

/// Notice shown when no logbook application is available.
pub const NO_RECEIVER_NOTICE: &str = "LogBook application is not installed on this device.";

/// Result of a hand-off attempt that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The receiver accepted the payload.
    Delivered,
    /// No receiver is installed; nothing was sent.
    NoReceiver,
}

impl Delivery {
    /// Whether the payload reached a receiver.
    #[must_use]
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Something that can receive an export payload.
pub trait ExportTarget {
    /// Human-readable name of the target (for logging).
    fn name(&self) -> &str;

    /// Send `payload` to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if a receiver exists but fails to take the payload.
    /// A missing receiver is reported as [`Delivery::NoReceiver`] instead.
    fn deliver(&self, payload: &str) -> Result<Delivery>;
}

/// Launches a local receiver program for each hand-off.
///
/// The program is invoked as `<program> --action <action> --extra <extra_key>`
/// with the payload written to its standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTarget {
    program: String,
    action: String,
    extra_key: String,
}

impl CommandTarget {
    /// Create a target that runs `program` with the logbook action and key.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_action(program, LOGBOOK_ACTION, LOGBOOK_EXTRA_KEY)
    }

    /// Create a target with a custom action name and payload key.
    #[must_use]
    pub fn with_action(
        program: impl Into<String>,
        action: impl Into<String>,
        extra_key: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            action: action.into(),
            extra_key: extra_key.into(),
        }
    }

    /// The program launched on delivery.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The action name passed to the receiver.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The payload key passed to the receiver.
    #[must_use]
    pub fn extra_key(&self) -> &str {
        &self.extra_key
    }
}

impl ExportTarget for CommandTarget {
    fn name(&self) -> &str {
        &self.program
    }

    fn deliver(&self, payload: &str) -> Result<Delivery> {
        debug!(
            "Handing {} bytes to '{}' for action {}",
            payload.len(),
            self.program,
            self.action
        );

        let spawned = Command::new(&self.program)
            .arg("--action")
            .arg(&self.action)
            .arg("--extra")
            .arg(&self.extra_key)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("Receiver '{}' is not installed", self.program);
                return Ok(Delivery::NoReceiver);
            }
            Err(err) => return Err(Error::handoff(&self.program, err.to_string())),
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(payload.as_bytes()) {
                // A receiver that exits without reading closes the pipe early;
                // its exit status below decides the outcome.
                if err.kind() != ErrorKind::BrokenPipe {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::handoff(&self.program, err.to_string()));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|err| Error::handoff(&self.program, err.to_string()))?;
        if !status.success() {
            return Err(Error::handoff(
                &self.program,
                format!("receiver exited with {status}"),
            ));
        }

        info!("Delivered export to '{}'", self.program);
        Ok(Delivery::Delivered)
    }
}
