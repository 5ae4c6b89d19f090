//! Then-step assertions for fixture lifecycle behavioural scenarios.

use std::sync::atomic::Ordering;

use rstest_bdd_macros::then;
use tlsdind::lifecycle::LifecycleState;

use super::state::{FixtureLifecycleState, RequestOutcome, StepResult};

fn setup_outcome(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<RequestOutcome> {
    fixture_lifecycle_state
        .setup_outcome
        .get()
        .ok_or_else(|| String::from("setup outcome should be recorded"))
}

fn expect_setup(
    fixture_lifecycle_state: &FixtureLifecycleState,
    expected: &RequestOutcome,
) -> StepResult<()> {
    let outcome = setup_outcome(fixture_lifecycle_state)?;
    if &outcome != expected {
        return Err(format!("expected setup outcome {expected:?}, got {outcome:?}"));
    }
    Ok(())
}

fn parse_state(name: &str) -> StepResult<LifecycleState> {
    match name {
        "ready" => Ok(LifecycleState::Ready),
        "failed" => Ok(LifecycleState::Failed),
        "disposed" => Ok(LifecycleState::Disposed),
        "created" => Ok(LifecycleState::Created),
        other => Err(format!("unknown lifecycle state {other}")),
    }
}

#[then("setup succeeds")]
fn setup_succeeds(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<()> {
    expect_setup(fixture_lifecycle_state, &RequestOutcome::Succeeded)
}

#[then("setup fails with a readiness timeout")]
fn setup_fails_with_timeout(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<()> {
    expect_setup(fixture_lifecycle_state, &RequestOutcome::ReadinessTimeout)
}

#[then("setup fails because the container exited with code {code}")]
fn setup_fails_with_exit(
    fixture_lifecycle_state: &FixtureLifecycleState,
    code: i64,
) -> StepResult<()> {
    expect_setup(
        fixture_lifecycle_state,
        &RequestOutcome::ContainerExited(Some(code)),
    )
}

#[then("the fixture state after setup is {state}")]
fn fixture_state_after_setup(
    fixture_lifecycle_state: &FixtureLifecycleState,
    state: String,
) -> StepResult<()> {
    let expected = parse_state(&state)?;
    let observed = fixture_lifecycle_state
        .state_after_setup
        .get()
        .ok_or_else(|| String::from("state after setup should be recorded"))?;
    if observed != expected {
        return Err(format!("expected state {expected} after setup, got {observed}"));
    }
    Ok(())
}

#[then("the fixture state is {state}")]
fn fixture_state_is(
    fixture_lifecycle_state: &FixtureLifecycleState,
    state: String,
) -> StepResult<()> {
    let expected = parse_state(&state)?;
    let shared = fixture_lifecycle_state.shared_fixture()?;
    let observed = shared
        .lock()
        .map_err(|_| String::from("fixture mutex is poisoned"))?
        .state();
    if observed != expected {
        return Err(format!("expected state {expected}, got {observed}"));
    }
    Ok(())
}

#[then("the endpoint uses host {host} and mapped port {port}")]
fn endpoint_uses_mapped_port(
    fixture_lifecycle_state: &FixtureLifecycleState,
    host: String,
    port: u16,
) -> StepResult<()> {
    let connection = fixture_lifecycle_state
        .connection
        .get()
        .ok_or_else(|| String::from("connection should be recorded"))?;
    let expected = format!("tcp://{host}:{port}");
    if connection.endpoint() != expected {
        return Err(format!("expected {expected}, got {}", connection.endpoint()));
    }
    Ok(())
}

#[then("the credential path is the client directory of the staging directory")]
fn credential_path_is_client_dir(
    fixture_lifecycle_state: &FixtureLifecycleState,
) -> StepResult<()> {
    let connection = fixture_lifecycle_state
        .connection
        .get()
        .ok_or_else(|| String::from("connection should be recorded"))?;
    let expected = fixture_lifecycle_state
        .expected_credentials
        .get()
        .ok_or_else(|| String::from("expected credential path should be recorded"))?;
    if connection.credential_path() != expected {
        return Err(format!(
            "expected credential path {expected}, got {}",
            connection.credential_path()
        ));
    }
    Ok(())
}

#[then("the request fails because the fixture is not ready")]
fn request_fails_not_ready(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<()> {
    let outcome = fixture_lifecycle_state
        .connection_outcome
        .get()
        .ok_or_else(|| String::from("connection outcome should be recorded"))?;
    if outcome != RequestOutcome::NotReady {
        return Err(format!("expected not-ready failure, got {outcome:?}"));
    }
    Ok(())
}

#[then("the container was removed {count} time")]
fn container_removed(
    fixture_lifecycle_state: &FixtureLifecycleState,
    count: usize,
) -> StepResult<()> {
    let removals = fixture_lifecycle_state
        .removals
        .get()
        .ok_or_else(|| String::from("removal counter should be recorded"))?
        .load(Ordering::SeqCst);
    if removals != count {
        return Err(format!("expected {count} removals, got {removals}"));
    }
    Ok(())
}

#[then("the staging directory is gone")]
fn staging_directory_is_gone(fixture_lifecycle_state: &FixtureLifecycleState) -> StepResult<()> {
    let root = fixture_lifecycle_state
        .staging_root
        .get()
        .ok_or_else(|| String::from("staging root should be recorded"))?;
    if root.exists() {
        return Err(format!("staging directory {root} still exists"));
    }
    Ok(())
}
