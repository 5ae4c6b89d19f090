//! Fixture lifecycle state machine.
//!
//! The [`LifecycleController`] drives one fixture from `Created` through
//! `Ready` to `Disposed`:
//!
//! 1. Create the staging directory.
//! 2. Create and start the container from the frozen launch spec.
//! 3. Poll the wait strategy until it holds, the container exits, or the
//!    readiness budget runs out.
//! 4. On teardown, stop and remove the container and delete the staging root.
//!
//! Setup failures are returned to the caller and leave the controller in
//! `Failed`. Teardown never fails; cleanup problems are logged.

mod staging;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::{ContainerEngine, ContainerHandle, ContainerRunState, EngineConnector};
use crate::error::{ConfigError, ContainerError, DindError, LifecycleError};
use crate::launch::LaunchSpec;

pub use staging::StagingDirectory;

/// Default overall readiness budget.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(120);

/// Default delay between readiness evaluations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Lifecycle states of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed; nothing has been allocated.
    Created,
    /// Staging directory and container are being created.
    Starting,
    /// The container runs and the wait strategy is being polled.
    WaitingForReady,
    /// The wait strategy holds; connection details are available.
    Ready,
    /// Teardown is in progress.
    Disposing,
    /// Teardown has finished.
    Disposed,
    /// Setup failed.
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::WaitingForReady => "waiting-for-ready",
            Self::Ready => "ready",
            Self::Disposing => "disposing",
            Self::Disposed => "disposed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Timing of the readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_READINESS_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ReadinessPolicy {
    /// Create a policy with an overall `timeout` and a fixed `poll_interval`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when either duration is zero.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Result<Self, DindError> {
        for (field, value) in [
            ("readiness.timeout", timeout),
            ("readiness.poll_interval", poll_interval),
        ] {
            if value.is_zero() {
                return Err(DindError::from(ConfigError::InvalidValue {
                    field: String::from(field),
                    reason: String::from("must be greater than zero"),
                }));
            }
        }

        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    /// Return the overall readiness budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Return the delay between evaluations.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Drives a single fixture container through its lifecycle.
///
/// Hooks take `&mut self`, so one controller is only ever driven by one
/// caller at a time.
#[derive(Debug)]
pub struct LifecycleController<E> {
    engine: Arc<E>,
    spec: LaunchSpec,
    staging: StagingDirectory,
    readiness: ReadinessPolicy,
    host: String,
    state: LifecycleState,
    handle: Option<ContainerHandle<E>>,
}

impl<E: ContainerEngine> LifecycleController<E> {
    /// Create a controller in state `Created`.
    ///
    /// `host` is the host name under which the container's published ports
    /// will be reachable.
    #[must_use]
    pub fn new(
        engine: Arc<E>,
        spec: LaunchSpec,
        staging: StagingDirectory,
        readiness: ReadinessPolicy,
        host: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            spec,
            staging,
            readiness,
            host: host.into(),
            state: LifecycleState::Created,
            handle: None,
        }
    }

    /// Return the current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Return the frozen launch spec.
    #[must_use]
    pub const fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Return the staging directory.
    #[must_use]
    pub const fn staging(&self) -> &StagingDirectory {
        &self.staging
    }

    /// Return the readiness timing.
    #[must_use]
    pub const fn readiness(&self) -> ReadinessPolicy {
        self.readiness
    }

    /// Return the container handle once the container has been started.
    #[must_use]
    pub const fn handle(&self) -> Option<&ContainerHandle<E>> {
        self.handle.as_ref()
    }

    /// Allocate resources and wait until the container is ready.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::InvalidTransition` unless the controller is
    /// in `Created`. Otherwise any failure moves the controller to `Failed`
    /// and is returned: `FilesystemError::StagingFailed`,
    /// `ContainerError::ImagePullFailed`, `ContainerError::CreateFailed`,
    /// `ContainerError::StartFailed`, `ContainerError::ContainerExited`, or
    /// `ContainerError::ReadinessTimeout`.
    pub async fn start(&mut self) -> Result<(), DindError> {
        if self.state != LifecycleState::Created {
            return Err(DindError::from(LifecycleError::InvalidTransition {
                operation: "set up",
                state: self.state,
            }));
        }

        self.transition(LifecycleState::Starting);
        if let Err(error) = self.staging.create() {
            return Err(self.fail(error));
        }

        let started =
            EngineConnector::create_and_start_async(self.engine.as_ref(), &self.spec).await;
        let container_id = match started {
            Ok(id) => id,
            Err(error) => return Err(self.fail(error)),
        };
        info!(
            container_id = %container_id,
            image = self.spec.image(),
            staging = %self.staging.path(),
            "fixture container started"
        );
        self.handle = Some(ContainerHandle::new(
            container_id,
            self.host.clone(),
            Arc::clone(&self.engine),
        ));

        self.transition(LifecycleState::WaitingForReady);
        let readiness = self.await_readiness().await;
        match readiness {
            Ok(()) => {
                self.transition(LifecycleState::Ready);
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Release every resource the fixture holds.
    ///
    /// Safe to call in any state and any number of times.
    pub async fn dispose(&mut self) {
        if self.state == LifecycleState::Disposed {
            return;
        }

        self.transition(LifecycleState::Disposing);

        if let Some(handle) = self.handle.as_mut() {
            if let Err(error) = handle.stop_and_remove().await {
                warn!(container_id = handle.id(), %error, "failed to remove fixture container");
            }
        }

        if let Err(error) = self.staging.remove() {
            warn!(staging = %self.staging.root(), %error, "failed to delete staging directory");
        }

        self.transition(LifecycleState::Disposed);
    }

    async fn await_readiness(&self) -> Result<(), DindError> {
        let Some(handle) = self.handle.as_ref() else {
            return Err(DindError::from(LifecycleError::NotReady { state: self.state }));
        };
        let strategy = self.spec.wait_strategy();
        let poll_interval = self.readiness.poll_interval();

        let polled = tokio::time::timeout(self.readiness.timeout(), async {
            loop {
                if strategy.evaluate(handle).await {
                    return Ok(());
                }

                if let Ok(ContainerRunState::Exited { exit_code }) = handle.state().await {
                    return Err(ContainerError::ContainerExited {
                        container_id: String::from(handle.id()),
                        exit_code,
                        logs: last_stderr(handle).await,
                    });
                }

                tokio::time::sleep(poll_interval).await;
            }
        })
        .await;

        match polled {
            Ok(result) => result.map_err(DindError::from),
            Err(_elapsed) => Err(DindError::from(ContainerError::ReadinessTimeout {
                container_id: String::from(handle.id()),
                timeout: self.readiness.timeout(),
                logs: last_stderr(handle).await,
            })),
        }
    }

    fn fail(&mut self, error: DindError) -> DindError {
        warn!(state = %self.state, %error, "fixture setup failed");
        self.state = LifecycleState::Failed;
        error
    }
}

impl<E> LifecycleController<E> {
    fn transition(&mut self, next: LifecycleState) {
        debug!(from = %self.state, to = %next, "fixture state transition");
        if matches!(next, LifecycleState::Ready | LifecycleState::Disposed) {
            info!(state = %next, "fixture {next}");
        }
        self.state = next;
    }
}

impl<E> Drop for LifecycleController<E> {
    fn drop(&mut self) {
        if !matches!(
            self.state,
            LifecycleState::Created | LifecycleState::Disposed
        ) {
            warn!(
                state = %self.state,
                staging = %self.staging.root(),
                "fixture dropped without teardown; its container may still be running"
            );
        }
    }
}

async fn last_stderr<E: ContainerEngine>(handle: &ContainerHandle<E>) -> String {
    handle
        .logs()
        .await
        .map(|logs| String::from(logs.stderr()))
        .unwrap_or_default()
}
