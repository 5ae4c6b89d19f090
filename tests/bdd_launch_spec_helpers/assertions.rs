//! Then-step assertions for launch-spec behavioural scenarios.

use rstest_bdd_macros::then;
use tlsdind::launch::{AccessMode, LaunchSpec};

use super::state::{LaunchSpecState, StepResult};

fn built_spec(launch_spec_state: &LaunchSpecState) -> StepResult<LaunchSpec> {
    launch_spec_state
        .spec
        .get()
        .ok_or_else(|| String::from("launch spec should have been built"))
}

#[then("the launch spec uses image {image}")]
fn launch_spec_uses_image(launch_spec_state: &LaunchSpecState, image: String) -> StepResult<()> {
    let spec = built_spec(launch_spec_state)?;
    if spec.image() != image {
        return Err(format!("expected image {image}, got {}", spec.image()));
    }
    Ok(())
}

#[then("the launch spec is privileged")]
fn launch_spec_is_privileged(launch_spec_state: &LaunchSpecState) -> StepResult<()> {
    if !built_spec(launch_spec_state)?.privileged() {
        return Err(String::from("expected a privileged launch spec"));
    }
    Ok(())
}

#[then("port {port} is published on a dynamic host port")]
fn port_is_published_dynamically(launch_spec_state: &LaunchSpecState, port: u16) -> StepResult<()> {
    let spec = built_spec(launch_spec_state)?;
    let published = spec
        .port_bindings()
        .iter()
        .any(|binding| binding.container_port() == port && binding.dynamic_host_port());
    if !published {
        return Err(format!("expected port {port} with a dynamic host port"));
    }
    Ok(())
}

#[then("the staging mount targets {container} read-write")]
fn staging_mount_targets(launch_spec_state: &LaunchSpecState, container: String) -> StepResult<()> {
    let spec = built_spec(launch_spec_state)?;
    let mount = spec
        .mounts()
        .first()
        .ok_or_else(|| String::from("expected one mount"))?;
    if mount.container_path().as_str() != container {
        return Err(format!(
            "expected container path {container}, got {}",
            mount.container_path()
        ));
    }
    if mount.access_mode() != AccessMode::ReadWrite {
        return Err(String::from("expected a read-write mount"));
    }
    Ok(())
}

#[then("both launch specs are equal")]
fn both_launch_specs_are_equal(launch_spec_state: &LaunchSpecState) -> StepResult<()> {
    let first = built_spec(launch_spec_state)?;
    let second = launch_spec_state
        .second_spec
        .get()
        .ok_or_else(|| String::from("second launch spec should have been built"))?;
    if first != second {
        return Err(String::from("expected equal launch specs"));
    }
    Ok(())
}

#[then("building fails because {field} is missing")]
fn building_fails_missing(launch_spec_state: &LaunchSpecState, field: String) -> StepResult<()> {
    expect_failed_field(launch_spec_state, &field)
}

#[then("building fails because {field} is invalid")]
fn building_fails_invalid(launch_spec_state: &LaunchSpecState, field: String) -> StepResult<()> {
    expect_failed_field(launch_spec_state, &field)
}

fn expect_failed_field(launch_spec_state: &LaunchSpecState, field: &str) -> StepResult<()> {
    let failed = launch_spec_state
        .failed_field
        .get()
        .ok_or_else(|| String::from("expected the builder to fail"))?;
    if failed != field {
        return Err(format!("expected failure on {field}, got {failed}"));
    }
    if launch_spec_state.spec.get().is_some() {
        return Err(String::from("no launch spec should have been built"));
    }
    Ok(())
}
