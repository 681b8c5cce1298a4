//! Session loop: run a handshake, then let an operator pick what happens next.

use super::session::{Session, SessionOutcome};
use super::transport::ServerCommand;
use crate::config::Settings;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// What to do after a handshake reaches its closing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Reset and run the handshake against another server.
    NewServer(ServerCommand),
    /// End the session.
    Quit,
}

/// Source of the decision taken at the closing step.
#[async_trait]
pub trait Operator: Send {
    /// Decide what follows `outcome`. An error aborts the whole session.
    async fn decide(&mut self, outcome: &SessionOutcome) -> Result<Decision>;
}

/// Operator that always quits after the first server.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOnce;

#[async_trait]
impl Operator for RunOnce {
    async fn decide(&mut self, _outcome: &SessionOutcome) -> Result<Decision> {
        Ok(Decision::Quit)
    }
}

/// Drives a [`Session`] across as many servers as the operator asks for.
pub struct Driver<O> {
    session: Session,
    operator: O,
}

impl<O: Operator> Driver<O> {
    pub fn new(settings: Settings, operator: O) -> Self {
        Self {
            session: Session::new(settings),
            operator,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// Run until the operator quits. Returns one outcome per server tested.
    ///
    /// The server process is terminated on every return path.
    pub async fn run(&mut self, command: ServerCommand) -> Result<Vec<SessionOutcome>> {
        let mut outcomes = Vec::new();
        let mut outcome = self.session.run(&command).await;

        loop {
            let decision = self.operator.decide(&outcome).await;
            outcomes.push(outcome);

            match decision {
                Ok(Decision::NewServer(next)) => {
                    info!(command = %next, "Operator chose a new server");
                    outcome = self.session.reset_for_new_test(&next).await;
                }
                Ok(Decision::Quit) => break,
                Err(e) => {
                    self.session.terminate().await;
                    self.session.end();
                    return Err(e);
                }
            }
        }

        self.session.terminate().await;
        self.session.end();
        Ok(outcomes)
    }
}
