//! Scripted engine doubles shared by unit tests across the crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bollard::models::{
    ContainerCreateBody, ContainerCreateResponse, ContainerInspectResponse, ContainerState,
    ContainerStateStatusEnum, NetworkSettings, PortBinding,
};
use bollard::query_parameters::CreateContainerOptions;
use mockall::mock;

use super::{
    ContainerCreator, ContainerLogs, ContainerRuntimeClient, CreateContainerFuture, EngineFuture,
    InspectContainerFuture,
};

mock! {
    #[derive(Debug)]
    pub Engine {}

    impl ContainerCreator for Engine {
        fn create_container<'a>(
            &'a self,
            options: Option<CreateContainerOptions>,
            config: ContainerCreateBody,
        ) -> CreateContainerFuture<'a>;
        fn inspect_image<'a>(&'a self, image: &str) -> EngineFuture<'a, ()>;
        fn pull_image<'a>(&'a self, image: &str) -> EngineFuture<'a, ()>;
    }

    impl ContainerRuntimeClient for Engine {
        fn start_container<'a>(&'a self, container_id: &str) -> EngineFuture<'a, ()>;
        fn inspect_container<'a>(&'a self, container_id: &str) -> InspectContainerFuture<'a>;
        fn fetch_logs<'a>(&'a self, container_id: &str) -> EngineFuture<'a, ContainerLogs>;
        fn stop_container<'a>(&'a self, container_id: &str) -> EngineFuture<'a, ()>;
        fn remove_container<'a>(&'a self, container_id: &str) -> EngineFuture<'a, ()>;
    }
}

/// Counters recording how often the engine double was asked to do things.
#[derive(Debug, Default)]
pub(crate) struct EngineCalls {
    pub(crate) pulls: AtomicUsize,
    pub(crate) creates: AtomicUsize,
    pub(crate) log_reads: AtomicUsize,
    pub(crate) removes: AtomicUsize,
    pub(crate) last_body: Mutex<Option<ContainerCreateBody>>,
}

impl EngineCalls {
    pub(crate) fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub(crate) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub(crate) fn log_reads(&self) -> usize {
        self.log_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub(crate) fn last_body(&self) -> Option<ContainerCreateBody> {
        self.last_body
            .lock()
            .expect("body capture lock should succeed")
            .clone()
    }
}

/// What the scripted container does once started.
#[derive(Debug, Clone)]
pub(crate) struct EngineScript {
    pub(crate) container_id: String,
    pub(crate) image_cached: bool,
    pub(crate) pull_error: Option<u16>,
    pub(crate) create_error: Option<u16>,
    pub(crate) start_error: Option<u16>,
    pub(crate) host_port: u16,
    /// Successive stderr snapshots; the last one repeats forever.
    pub(crate) stderr_sequence: Vec<String>,
    pub(crate) exit_code: Option<i64>,
    pub(crate) remove_error: Option<u16>,
}

impl EngineScript {
    pub(crate) fn ready_after(polls: usize) -> Self {
        let mut stderr_sequence: Vec<String> = (0..polls)
            .map(|_| String::from("level=info msg=\"Starting up\"\n"))
            .collect();
        stderr_sequence.push(String::from(
            "level=info msg=\"Starting up\"\nlevel=info msg=\"API listen on [::]:2376\"\n",
        ));

        Self {
            container_id: String::from("dind-container"),
            image_cached: true,
            pull_error: None,
            create_error: None,
            start_error: None,
            host_port: 49_153,
            stderr_sequence,
            exit_code: None,
            remove_error: None,
        }
    }

    pub(crate) fn never_ready() -> Self {
        Self {
            stderr_sequence: vec![String::from("level=info msg=\"Starting up\"\n")],
            ..Self::ready_after(0)
        }
    }
}

pub(crate) fn server_error(status_code: u16) -> bollard::errors::Error {
    bollard::errors::Error::DockerResponseServerError {
        status_code,
        message: format!("scripted engine failure {status_code}"),
    }
}

fn inspect_response(script: &EngineScript) -> ContainerInspectResponse {
    let state = script.exit_code.map_or_else(
        || ContainerState {
            running: Some(true),
            status: Some(ContainerStateStatusEnum::RUNNING),
            ..ContainerState::default()
        },
        |code| ContainerState {
            running: Some(false),
            status: Some(ContainerStateStatusEnum::EXITED),
            exit_code: Some(code),
            ..ContainerState::default()
        },
    );
    let ports = HashMap::from([(
        String::from("2376/tcp"),
        Some(vec![PortBinding {
            host_ip: Some(String::from("0.0.0.0")),
            host_port: Some(script.host_port.to_string()),
        }]),
    )]);

    ContainerInspectResponse {
        state: Some(state),
        network_settings: Some(NetworkSettings {
            ports: Some(ports),
            ..NetworkSettings::default()
        }),
        ..ContainerInspectResponse::default()
    }
}

/// Build an engine double that follows `script`.
pub(crate) fn scripted_engine(script: EngineScript) -> (MockEngine, Arc<EngineCalls>) {
    let calls = Arc::new(EngineCalls::default());
    let mut engine = MockEngine::new();

    let image_cached = script.image_cached;
    engine.expect_inspect_image().returning(move |_| {
        Box::pin(async move {
            if image_cached {
                Ok(())
            } else {
                Err(server_error(404))
            }
        })
    });

    let pull_calls = Arc::clone(&calls);
    let pull_error = script.pull_error;
    engine.expect_pull_image().returning(move |_| {
        pull_calls.pulls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { pull_error.map_or(Ok(()), |status| Err(server_error(status))) })
    });

    let create_calls = Arc::clone(&calls);
    let create_script = script.clone();
    engine.expect_create_container().returning(move |_, body| {
        create_calls.creates.fetch_add(1, Ordering::SeqCst);
        *create_calls
            .last_body
            .lock()
            .expect("body capture lock should succeed") = Some(body);
        let result = create_script.create_error.map_or_else(
            || {
                Ok(ContainerCreateResponse {
                    id: create_script.container_id.clone(),
                    warnings: vec![],
                })
            },
            |status| Err(server_error(status)),
        );
        Box::pin(async move { result })
    });

    let start_error = script.start_error;
    engine.expect_start_container().returning(move |_| {
        Box::pin(async move { start_error.map_or(Ok(()), |status| Err(server_error(status))) })
    });

    let inspect = inspect_response(&script);
    engine.expect_inspect_container().returning(move |_| {
        let snapshot = inspect.clone();
        Box::pin(async move { Ok(snapshot) })
    });

    let log_calls = Arc::clone(&calls);
    let sequence = script.stderr_sequence.clone();
    engine.expect_fetch_logs().returning(move |_| {
        let index = log_calls.log_reads.fetch_add(1, Ordering::SeqCst);
        let stderr = sequence
            .get(index)
            .or_else(|| sequence.last())
            .cloned()
            .unwrap_or_default();
        Box::pin(async move { Ok(ContainerLogs::new("", stderr)) })
    });

    engine
        .expect_stop_container()
        .returning(|_| Box::pin(async { Ok(()) }));

    let remove_calls = Arc::clone(&calls);
    let remove_error = script.remove_error;
    engine.expect_remove_container().returning(move |_| {
        remove_calls.removes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { remove_error.map_or(Ok(()), |status| Err(server_error(status))) })
    });

    (engine, calls)
}
