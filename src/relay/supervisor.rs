use super::config::RelayConfig;
use super::input::LineSource;
use super::session::{open_session, SessionError};
use super::target::ConnectionTarget;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Outcome of a supervised run.
#[derive(Debug, Default)]
pub struct SupervisorReport {
    /// Number of sessions started.
    pub sessions: usize,
    /// Terminal error of every session, by target index.
    pub failures: Vec<(usize, SessionError)>,
}

/// Fans out one session per target and waits for all of them.
#[derive(Debug, Clone)]
pub struct SessionSupervisor {
    config: Arc<RelayConfig>,
}

impl SessionSupervisor {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run every session concurrently. `console` hands each connected
    /// session its input source and output writer.
    ///
    /// Sessions are independent: a failure is logged and never cancels a
    /// sibling.
    pub async fn run<I, W, F>(&self, console: F) -> SupervisorReport
    where
        I: LineSource + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        F: Fn(&ConnectionTarget) -> (I, W) + Send + Sync + 'static,
    {
        let console = Arc::new(console);
        let color = self.config.color();
        let mut sessions = JoinSet::new();

        for target in self.config.targets().iter().cloned() {
            let console = Arc::clone(&console);
            let span = tracing::info_span!("session", id = target.index, url = %target.url);
            sessions.spawn(
                async move {
                    let err = open_session(&target, color, || (*console)(&target)).await;
                    tracing::error!(operation = err.label(), "{}", err);
                    (target.index, err)
                }
                .instrument(span),
            );
        }

        let mut report = SupervisorReport {
            sessions: sessions.len(),
            failures: Vec::with_capacity(sessions.len()),
        };
        while let Some(joined) = sessions.join_next().await {
            match joined {
                Ok(failure) => report.failures.push(failure),
                Err(e) => tracing::error!("session task failed: {}", e),
            }
        }
        report.failures.sort_by_key(|(index, _)| *index);
        report
    }
}
