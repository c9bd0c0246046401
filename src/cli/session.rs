//! Single-shot and interactive chat loops.
use anyhow::Result;
use tokio::{io::AsyncWriteExt, sync::mpsc};
use tracing::info;

use crate::agent::{Agent, ResilientAgent};

/// Process signals that end a chat session. Handlers are registered when
/// this is constructed, so a signal arriving before [`ShutdownSignals::recv`]
/// is polled is still observed.
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Resolve with the signal name once one arrives.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(_) => std::future::pending().await,
        }
    }
}

/// Answer `query` and print it on stdout. Returns the number of answered
/// turns, zero when a signal arrives first.
pub async fn run_once<A: Agent>(
    agent: &mut ResilientAgent<A>,
    query: &str,
    signals: &mut ShutdownSignals,
) -> Result<usize> {
    let answer = tokio::select! {
        answer = agent.answer(query) => answer,
        signal = signals.recv() => {
            info!(target: "mcp_chat::session", signal, "Signal received; ending session");
            return Ok(0);
        }
    };
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{answer}\n").as_bytes()).await?;
    stdout.flush().await?;
    Ok(1)
}

/// Read queries line by line until EOF or a shutdown signal. Returns the
/// number of answered turns.
pub async fn run_interactive<A: Agent>(
    agent: &mut ResilientAgent<A>,
    signals: &mut ShutdownSignals,
) -> Result<usize> {
    let mut lines = spawn_line_reader();
    let mut stdout = tokio::io::stdout();
    let mut turns = 0;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.recv() => line,
            signal = signals.recv() => {
                info!(target: "mcp_chat::session", signal, "Signal received; ending session");
                break;
            }
        };
        let Some(line) = line.transpose()? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        let answer = tokio::select! {
            answer = agent.answer(query) => answer,
            signal = signals.recv() => {
                info!(target: "mcp_chat::session", signal, "Signal received mid-turn; ending session");
                break;
            }
        };
        stdout.write_all(format!("\n{answer}\n\n").as_bytes()).await?;
        turns += 1;
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(turns)
}

/// Blocking stdin reads cannot be cancelled, so they run on a detached
/// thread that does not hold up process exit.
fn spawn_line_reader() -> mpsc::Receiver<std::io::Result<String>> {
    let (sender, receiver) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if sender.blocking_send(line).is_err() {
                break;
            }
        }
    });
    receiver
}
