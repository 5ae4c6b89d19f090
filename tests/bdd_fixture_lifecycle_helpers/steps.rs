//! Given/when step definitions for fixture lifecycle behavioural scenarios.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use camino::Utf8PathBuf;
use rstest_bdd_macros::{given, when};
use tlsdind::error::{ContainerError, DindError, LifecycleError};
use tlsdind::fixture::{DindFixture, FixtureSettings};
use tlsdind::lifecycle::ReadinessPolicy;

use super::engine::{DaemonBehaviour, scripted_engine};
use super::state::{FixtureLifecycleState, RequestOutcome, StepResult};

fn configure(state: &FixtureLifecycleState, behaviour: DaemonBehaviour) -> StepResult<()> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|_| String::from("failed to create tokio runtime for scenario"))?;
    let temp_dir =
        tempfile::tempdir().map_err(|error| format!("failed to create temp dir: {error}"))?;
    let base = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
        .map_err(|_| String::from("temp dir is not UTF-8"))?;
    let readiness = ReadinessPolicy::new(Duration::from_millis(300), Duration::from_millis(5))
        .map_err(|error| error.to_string())?;
    let settings = FixtureSettings::new()
        .with_staging_base(base)
        .with_readiness(readiness);

    let (engine, removals) = scripted_engine(behaviour);
    let fixture = DindFixture::new(Arc::new(engine), settings).map_err(|error| error.to_string())?;

    state.staging_root.set(fixture.staging_dir().root());
    state
        .expected_credentials
        .set(fixture.staging_dir().client_path());
    state.fixture.set(Arc::new(Mutex::new(fixture)));
    state.removals.set(removals);
    state.temp_dir.set(Arc::new(temp_dir));
    state.runtime.set(Arc::new(runtime));
    Ok(())
}

fn classify(error: &DindError) -> RequestOutcome {
    match error {
        DindError::Container(ContainerError::ReadinessTimeout { .. }) => {
            RequestOutcome::ReadinessTimeout
        }
        DindError::Container(ContainerError::ContainerExited { exit_code, .. }) => {
            RequestOutcome::ContainerExited(*exit_code)
        }
        DindError::Lifecycle(LifecycleError::NotReady { .. }) => RequestOutcome::NotReady,
        other => RequestOutcome::Other(other.to_string()),
    }
}

#[given("a container engine whose daemon listens after {polls} log polls")]
fn daemon_listens_after(
    fixture_lifecycle_state: &FixtureLifecycleState,
    polls: usize,
) -> StepResult<()> {
    configure(fixture_lifecycle_state, DaemonBehaviour::ListensAfter(polls))
}

#[given("a container engine whose daemon never listens")]
fn daemon_never_listens(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<()> {
    configure(fixture_lifecycle_state, DaemonBehaviour::NeverListens)
}

#[given("a container engine whose daemon exits with code {code}")]
fn daemon_exits(fixture_lifecycle_state: &FixtureLifecycleState, code: i64) -> StepResult<()> {
    configure(fixture_lifecycle_state, DaemonBehaviour::Exits(code))
}

#[when("the fixture is set up")]
fn fixture_is_set_up(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<()> {
    let runtime = fixture_lifecycle_state.runtime()?;
    let shared = fixture_lifecycle_state.shared_fixture()?;
    let mut fixture = shared
        .lock()
        .map_err(|_| String::from("fixture mutex is poisoned"))?;

    let outcome = match fixture.setup_blocking(runtime.handle()) {
        Ok(()) => {
            let connection = fixture
                .connection_blocking(runtime.handle())
                .map_err(|error| format!("ready fixture should report a connection: {error}"))?;
            fixture_lifecycle_state.connection.set(connection);
            RequestOutcome::Succeeded
        }
        Err(error) => classify(&error),
    };

    fixture_lifecycle_state.setup_outcome.set(outcome);
    fixture_lifecycle_state
        .state_after_setup
        .set(fixture.state());
    Ok(())
}

#[when("connection details are requested")]
fn connection_details_requested(
    fixture_lifecycle_state: &FixtureLifecycleState,
) -> StepResult<()> {
    let runtime = fixture_lifecycle_state.runtime()?;
    let shared = fixture_lifecycle_state.shared_fixture()?;
    let fixture = shared
        .lock()
        .map_err(|_| String::from("fixture mutex is poisoned"))?;

    let outcome = match fixture.connection_blocking(runtime.handle()) {
        Ok(_) => RequestOutcome::Succeeded,
        Err(error) => classify(&error),
    };
    fixture_lifecycle_state.connection_outcome.set(outcome);
    Ok(())
}

#[when("the fixture is torn down")]
fn fixture_is_torn_down(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<()> {
    let runtime = fixture_lifecycle_state.runtime()?;
    let shared = fixture_lifecycle_state.shared_fixture()?;
    let mut fixture = shared
        .lock()
        .map_err(|_| String::from("fixture mutex is poisoned"))?;
    fixture.teardown_blocking(runtime.handle());
    Ok(())
}
