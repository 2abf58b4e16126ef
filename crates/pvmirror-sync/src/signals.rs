//! Signal reporting
//!
//! Receiving a process signal is an observability event: it is logged, the
//! tail of today's journal is attached to one alert, and only then does the
//! signal influence shutdown. Listening for OS signals is left to the binary.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pvmirror_journal::Notifier;

/// The process signals the daemon reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    Interrupt,
    Terminate,
    Hangup,
}

impl ProcessSignal {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessSignal::Interrupt => "SIGINT",
            ProcessSignal::Terminate => "SIGTERM",
            ProcessSignal::Hangup => "SIGHUP",
        }
    }

    /// SIGINT and SIGTERM ask the daemon to stop; SIGHUP does not.
    pub fn terminates(&self) -> bool {
        !matches!(self, ProcessSignal::Hangup)
    }
}

impl std::fmt::Display for ProcessSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the signal listener should do after a signal was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Keep running.
    Continue,
    /// Shutdown was requested; the current iteration is allowed to finish.
    Shutdown,
    /// A second terminating signal arrived while already shutting down.
    ForceExit,
}

/// Reports signals with the tail of the current log session.
#[derive(Debug, Clone)]
pub struct SignalReporter {
    notifier: Notifier,
    tail_lines: usize,
}

impl SignalReporter {
    pub fn new(notifier: Notifier, tail_lines: usize) -> Self {
        Self {
            notifier,
            tail_lines,
        }
    }

    /// Logs the signal and sends one alert carrying the last log lines.
    ///
    /// The tail read is queued behind every earlier append, so the excerpt
    /// includes the "Received" line itself.
    pub async fn report(&self, signal: ProcessSignal) {
        self.notifier.log_warn(format!("Received {signal}"));

        let excerpt = match self.notifier.journal().tail(self.tail_lines).await {
            Ok(lines) => lines.join("\n"),
            Err(e) => {
                warn!(error = %e, "Cannot read log tail for signal report");
                format!("(log tail unavailable: {e})")
            }
        };

        self.notifier
            .alert(&format!(
                "Received {signal}. Last {} log lines:\n{excerpt}",
                self.tail_lines
            ))
            .await;
    }

    /// Reports `signal` and applies the shutdown policy to `shutdown`.
    pub async fn handle(
        &self,
        signal: ProcessSignal,
        shutdown: &CancellationToken,
    ) -> SignalAction {
        let forced = signal.terminates() && shutdown.is_cancelled();

        self.report(signal).await;

        if forced {
            self.notifier
                .log_warn(format!("Received {signal} again while shutting down, exiting now"));
            if let Err(e) = self.notifier.journal().flush().await {
                warn!(error = %e, "Cannot flush log session before exiting");
            }
            return SignalAction::ForceExit;
        }

        if signal.terminates() {
            info!(%signal, "Shutdown requested, finishing the current iteration");
            shutdown.cancel();
            SignalAction::Shutdown
        } else {
            SignalAction::Continue
        }
    }
}
