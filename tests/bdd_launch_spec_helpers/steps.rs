//! Given/when step definitions for launch-spec behavioural scenarios.

use rstest_bdd_macros::{given, when};
use tlsdind::launch::{AccessMode, LaunchSpecBuilder};

use super::state::{LaunchSpecState, StepResult};

#[given("a launch spec builder for image {image}")]
fn builder_for_image(launch_spec_state: &LaunchSpecState, image: String) -> StepResult<()> {
    launch_spec_state.record(LaunchSpecBuilder::new().with_image(image))
}

#[given("a launch spec builder without an image")]
fn builder_without_image(launch_spec_state: &LaunchSpecState) {
    launch_spec_state.builder.set(LaunchSpecBuilder::new());
}

#[given("the container runs privileged")]
fn container_runs_privileged(launch_spec_state: &LaunchSpecState) -> StepResult<()> {
    let builder = launch_spec_state.current_builder()?;
    launch_spec_state.builder.set(builder.with_privileged(true));
    Ok(())
}

#[given("container port {port} is published on a dynamic host port")]
fn port_published_dynamically(launch_spec_state: &LaunchSpecState, port: u16) -> StepResult<()> {
    let builder = launch_spec_state.current_builder()?;
    launch_spec_state.record(builder.with_port_binding(port, true))
}

#[given("host directory {host} is mounted read-write at {container}")]
fn directory_mounted_read_write(
    launch_spec_state: &LaunchSpecState,
    host: String,
    container: String,
) -> StepResult<()> {
    let builder = launch_spec_state.current_builder()?;
    launch_spec_state.record(builder.with_mount(host, container, AccessMode::ReadWrite))
}

#[when("the launch spec is built")]
fn launch_spec_is_built(launch_spec_state: &LaunchSpecState) -> StepResult<()> {
    let builder = launch_spec_state.current_builder()?;
    match builder.build() {
        Ok(spec) => launch_spec_state.spec.set(spec),
        Err(error) => launch_spec_state.record(Err(error))?,
    }
    Ok(())
}

#[when("the launch spec is built twice")]
fn launch_spec_is_built_twice(launch_spec_state: &LaunchSpecState) -> StepResult<()> {
    let builder = launch_spec_state.current_builder()?;
    let first = builder.build().map_err(|error| error.to_string())?;
    let second = builder.build().map_err(|error| error.to_string())?;
    launch_spec_state.spec.set(first);
    launch_spec_state.second_spec.set(second);
    Ok(())
}
