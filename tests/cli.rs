use assert_cmd::Command;
use predicates::prelude::*;
use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

#[test]
fn missing_workflow_prints_message_and_exits_cleanly() {
    let mut cmd = Command::cargo_bin("deed-image-sync").expect("Binary exists");
    cmd.arg("upload")
        .arg("--config")
        .arg("/definitely/not/here.yaml")
        .env_remove("AWS_STORAGE_BUCKET_NAME");

    // The config path is never read: the missing workflow is handled first.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Missing workflow name"));
}

#[test]
fn unreadable_config_fails_with_nonzero_exit() {
    let mut cmd = Command::cargo_bin("deed-image-sync").expect("Binary exists");
    cmd.args(["upload", "--workflow", "Ramsey County", "--config", "/definitely/not/here.yaml"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("loading settings"));
}

#[test]
fn help_lists_upload_options() {
    let mut cmd = Command::cargo_bin("deed-image-sync").expect("Binary exists");
    cmd.args(["upload", "--help"]);
    cmd.assert().success().stdout(
        predicate::str::contains("--workflow")
            .and(predicate::str::contains("--pool"))
            .and(predicate::str::contains("--rate-limit"))
            .and(predicate::str::contains("--dry-run"))
            .and(predicate::str::contains("--cache")),
    );
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use deed_image_sync::cli::{run, Cli, Commands, UploadArgs};

    let cli = Cli {
        command: Commands::Upload(UploadArgs {
            workflow: None,
            cache: false,
            pool: 8,
            rate_limit: 0.0,
            dry_run: false,
            config: std::path::PathBuf::from("dummy.yaml"),
        }),
    };

    run(cli).await.expect("missing workflow is not an error");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
