//! High level lookup orchestration.
//!
//! Wires the dispatcher, response classification, the challenge solver,
//! and the fragment extractor into the protocol state machine: one
//! attempt, at most one challenge-triggered retry, then a structured
//! result set or a typed failure.

use std::sync::Arc;

use thiserror::Error;

use crate::challenges::classify::{Classification, classify};
use crate::challenges::solver::{ChallengeSolver, SolverError};
use crate::config::LookupConfig;
use crate::extract::{ResultSet, extract_fields};
use crate::upstream::{DispatchError, LookupRequest, ReqwestDispatcher, UpstreamTransport};

/// Result alias used across the orchestration layer.
pub type LookupResult<T> = Result<T, LookupError>;

/// Typed failure surfaced to the caller.
///
/// Challenge pages that are merely unsolvable are an expected condition,
/// kept distinct from true transport errors so callers can tell them
/// apart. The core never substitutes empty data for a failure.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("upstream dispatch failed: {0}")]
    DispatchFailed(#[from] DispatchError),
    #[error("challenge not solvable: {0}")]
    ChallengeUnsolvable(#[from] SolverError),
    #[error("upstream did not return the expected reply shape")]
    UnexpectedShape,
    #[error("upstream still not serving data after the challenge retry")]
    RetryExhausted,
}

impl LookupError {
    /// Stable kind name for callers mapping failures onto status codes.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::DispatchFailed(_) => "dispatch_failed",
            LookupError::ChallengeUnsolvable(_) => "challenge_unsolvable",
            LookupError::UnexpectedShape => "unexpected_shape",
            LookupError::RetryExhausted => "retry_exhausted",
        }
    }
}

/// Fluent builder for [`LookupClient`].
pub struct LookupClientBuilder {
    config: LookupConfig,
    transport: Option<Arc<dyn UpstreamTransport>>,
}

impl LookupClientBuilder {
    pub fn new(config: LookupConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Substitute the transport, e.g. a scripted stub in tests.
    pub fn with_transport(mut self, transport: Arc<dyn UpstreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> LookupResult<LookupClient> {
        let transport: Arc<dyn UpstreamTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestDispatcher::new(self.config)?),
        };
        Ok(LookupClient {
            transport,
            solver: ChallengeSolver::new(),
        })
    }
}

/// Protocol state machine driving at most two upstream attempts.
///
/// Cheap to share behind `Arc`; invocations carry no state across calls.
pub struct LookupClient {
    transport: Arc<dyn UpstreamTransport>,
    solver: ChallengeSolver,
}

impl LookupClient {
    /// Construct a client with the production dispatcher.
    pub fn new(config: LookupConfig) -> LookupResult<Self> {
        Self::builder(config).build()
    }

    /// Obtain a builder to customise the client instance.
    pub fn builder(config: LookupConfig) -> LookupClientBuilder {
        LookupClientBuilder::new(config)
    }

    /// Run one full lookup exchange for `subject`.
    ///
    /// `stored_token` is a cookie value the caller already holds; it rides
    /// the first attempt. A token derived from a challenge during this
    /// call never outlives it.
    pub async fn lookup(
        &self,
        subject: &str,
        stored_token: Option<&str>,
    ) -> LookupResult<ResultSet> {
        let mut request = LookupRequest::new(subject);
        if let Some(token) = stored_token {
            request = request.with_session_token(token);
        }

        let first = self.transport.send(&request).await?;
        match classify(&first) {
            Classification::DirectData(fragments) => Ok(extract_all(&fragments)),
            Classification::Malformed => {
                log::warn!("upstream returned JSON without a reply envelope");
                Err(LookupError::UnexpectedShape)
            }
            Classification::Challenge => {
                log::debug!("first attempt answered with a challenge page");
                self.retry_with_solved_token(subject, &first.text()).await
            }
        }
    }

    async fn retry_with_solved_token(
        &self,
        subject: &str,
        page_body: &str,
    ) -> LookupResult<ResultSet> {
        let token = self.solver.solve(page_body).map_err(|err| {
            log::warn!("challenge page not solvable: {err}");
            LookupError::ChallengeUnsolvable(err)
        })?;

        let request = LookupRequest::new(subject).with_session_token(token.into_hex());
        let second = self.transport.send(&request).await?;
        match classify(&second) {
            Classification::DirectData(fragments) => Ok(extract_all(&fragments)),
            // A second challenge or a malformed body both mean the single
            // permitted retry is spent; the machine never loops.
            Classification::Malformed | Classification::Challenge => {
                log::warn!("upstream kept withholding data after the solved challenge");
                Err(LookupError::RetryExhausted)
            }
        }
    }
}

fn extract_all(fragments: &[String]) -> ResultSet {
    fragments
        .iter()
        .map(|fragment| extract_fields(fragment))
        .collect()
}
