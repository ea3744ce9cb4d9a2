use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;

use basis::config::{ConfigLoader, DescriptorId};
use basis::engine::{RuntimeEvent, RuntimeOptions, TaskId, WatchCore, WatchRuntime};
use basis::types::TransformKind;
use basis_test_utils::builders::{ProjectBuilder, fake_registry, module_toml};
use basis_test_utils::fakes::{FakeToolchain, RecordingBackend, RecordingWatcher};
use basis_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const BUILD_STATIC: TaskId = TaskId::Build(TransformKind::Static);

fn options() -> RuntimeOptions {
    RuntimeOptions {
        debounce: Duration::from_millis(20),
    }
}

fn static_project() -> ProjectBuilder {
    ProjectBuilder::new()
        .config(&module_toml("web", &[("static", "src/static/**/*", "static")]))
        .file("src/static/logo.png", "")
}

/// Queue `events` then run the runtime until it exits.
async fn run_with(
    core: WatchCore,
    backend: &RecordingBackend,
    watcher: &RecordingWatcher,
    events: Vec<RuntimeEvent>,
) -> TestResult {
    let (tx, rx) = mpsc::channel(64);
    for event in events {
        tx.send(event).await?;
    }
    let runtime = WatchRuntime::new(core, rx, backend.clone(), watcher.clone(), options());
    with_timeout(runtime.run()).await?;
    Ok(())
}

#[tokio::test]
async fn repeated_changes_in_one_batch_launch_once() -> TestResult {
    init_tracing();
    let project = static_project();
    let core = WatchCore::start(project.loader(), fake_registry(&FakeToolchain::new()));
    let backend = RecordingBackend::new();
    let watcher = RecordingWatcher::new();

    let logo = project.join("src/static/logo.png");
    run_with(
        core,
        &backend,
        &watcher,
        vec![
            RuntimeEvent::PathChanged(logo.clone()),
            RuntimeEvent::PathChanged(logo),
            RuntimeEvent::PathChanged(project.join("notes.txt")),
            RuntimeEvent::ShutdownRequested,
        ],
    )
    .await?;

    assert_eq!(backend.launched(), vec![(BUILD_STATIC, 1)]);
    assert!(backend.was_drained());
    // Unwatched on exit.
    assert!(watcher.watched().is_empty());
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_dispatch_of_later_events() -> TestResult {
    init_tracing();
    let project = static_project();
    let core = WatchCore::start(project.loader(), fake_registry(&FakeToolchain::new()));
    let backend = RecordingBackend::new();

    run_with(
        core,
        &backend,
        &RecordingWatcher::new(),
        vec![
            RuntimeEvent::ShutdownRequested,
            RuntimeEvent::PathChanged(project.join("src/static/logo.png")),
        ],
    )
    .await?;

    assert!(backend.launched().is_empty());
    assert!(backend.was_drained());
    Ok(())
}

#[tokio::test]
async fn reload_in_a_batch_launches_against_the_new_snapshot() -> TestResult {
    init_tracing();
    let project = static_project();
    let core = WatchCore::start(project.loader(), fake_registry(&FakeToolchain::new()));
    assert_eq!(core.snapshot().map(|s| s.version), Some(1));

    project.write(
        "build.conf.toml",
        &module_toml(
            "web",
            &[
                ("static", "src/static/**/*", "public"),
                ("client", "src/main.ts", "public/app.js"),
            ],
        ),
    );

    let backend = RecordingBackend::new();
    let logo = project.join("src/static/logo.png");
    run_with(
        core,
        &backend,
        &RecordingWatcher::new(),
        vec![
            RuntimeEvent::PathChanged(logo.clone()),
            RuntimeEvent::PathChanged(project.config_path()),
            RuntimeEvent::PathChanged(logo),
            RuntimeEvent::PathChanged(project.join("src/main.ts")),
            RuntimeEvent::ShutdownRequested,
        ],
    )
    .await?;

    let client = DescriptorId {
        module: 0,
        kind: TransformKind::ClientScript,
        index: 0,
    };
    assert_eq!(
        backend.launched(),
        vec![
            (BUILD_STATIC, 1),
            (BUILD_STATIC, 2),
            (TaskId::Rebundle(client), 2),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn broken_config_at_start_waits_for_a_fix() -> TestResult {
    init_tracing();
    let project = ProjectBuilder::new()
        .config("[[modules]\nname = ")
        .file("src/static/logo.png", "");
    let core = WatchCore::start(project.loader(), fake_registry(&FakeToolchain::new()));
    assert!(core.snapshot().is_none());
    assert_eq!(core.dispatcher().bindings().len(), 1);

    project.write(
        "build.conf.toml",
        &module_toml("web", &[("static", "src/static/**/*", "static")]),
    );

    let backend = RecordingBackend::new();
    let logo = project.join("src/static/logo.png");
    run_with(
        core,
        &backend,
        &RecordingWatcher::new(),
        vec![
            RuntimeEvent::PathChanged(logo.clone()),
            RuntimeEvent::PathChanged(project.config_path()),
            RuntimeEvent::PathChanged(logo),
            RuntimeEvent::ShutdownRequested,
        ],
    )
    .await?;

    assert_eq!(backend.launched(), vec![(BUILD_STATIC, 1)]);
    Ok(())
}

#[tokio::test]
async fn unwatchable_root_deactivates_only_its_bindings() -> TestResult {
    init_tracing();
    let project = ProjectBuilder::new()
        .file(
            "conf/build.conf.toml",
            "[[modules]]\nname = \"web\"\npath = \"..\"\n\n\
             [[modules.transforms.static]]\nsource = \"assets/**/*\"\ndest = \"public\"\n\n\
             [[modules.transforms.client]]\nsource = \"src/main.ts\"\ndest = \"public/app.js\"\n",
        )
        .file("src/main.ts", "");

    let loader = ConfigLoader::new(project.join("conf/build.conf.toml"))?;
    let core = WatchCore::start(loader, fake_registry(&FakeToolchain::new()));

    let (tx, rx) = mpsc::channel(64);
    let backend = RecordingBackend::new();
    let watcher = RecordingWatcher::failing_on([project.join("assets")]);
    let runtime = WatchRuntime::new(core, rx, backend.clone(), watcher.clone(), options());
    let running = tokio::spawn(runtime.run());

    // Let the runtime register its roots before inspecting them.
    tx.send(RuntimeEvent::PathChanged(project.join("README.md")))
        .await?;
    tokio::time::sleep(Duration::from_millis(60)).await;

    let mut watched = watcher.watched();
    watched.sort();
    assert_eq!(watched, vec![project.join("conf"), project.join("src")]);

    tx.send(RuntimeEvent::PathChanged(project.join("assets/icon.svg")))
        .await?;
    tx.send(RuntimeEvent::PathChanged(project.join("src/main.ts")))
        .await?;
    tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(running).await??;

    let client = DescriptorId {
        module: 0,
        kind: TransformKind::ClientScript,
        index: 0,
    };
    assert_eq!(backend.launched(), vec![(TaskId::Rebundle(client), 1)]);
    Ok(())
}

#[tokio::test]
async fn watch_error_on_a_root_stops_its_dispatch() -> TestResult {
    init_tracing();
    let project = static_project().file("src/main.ts", "");
    project.write(
        "build.conf.toml",
        &module_toml(
            "web",
            &[
                ("static", "src/static/**/*", "static"),
                ("client", "src/main.ts", "static/app.js"),
            ],
        ),
    );
    let core = WatchCore::start(project.loader(), fake_registry(&FakeToolchain::new()));
    let backend = RecordingBackend::new();

    run_with(
        core,
        &backend,
        &RecordingWatcher::new(),
        vec![
            RuntimeEvent::WatchError {
                root: Some(project.join("src/static")),
                message: "directory removed".to_string(),
            },
            RuntimeEvent::PathChanged(project.join("src/static/logo.png")),
            RuntimeEvent::PathChanged(project.join("src/main.ts")),
            RuntimeEvent::ShutdownRequested,
        ],
    )
    .await?;

    let launched: Vec<TaskId> = backend.launched().into_iter().map(|(t, _)| t).collect();
    assert_eq!(launched.len(), 1);
    assert!(matches!(launched[0], TaskId::Rebundle(_)));
    Ok(())
}
