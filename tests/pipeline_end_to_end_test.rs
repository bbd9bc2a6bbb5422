//! End-to-end tests for the bootstrap pipeline
//!
//! Each test builds a config directory in a temp dir, registers hand-written
//! gears and drives the host through configure/start.

use async_trait::async_trait;
use collins::config::{LogLevel, ResolvedConfig};
use collins::{Collins, CollinsError, ErrorKind, LifecycleEvent, ServiceGear};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

type CallLog = Arc<Mutex<Vec<String>>>;

/// Gear that records every lifecycle call and can be told to fail.
struct RecordingGear {
    key: &'static str,
    calls: CallLog,
    fail_initialize: bool,
    fail_connect: bool,
}

impl RecordingGear {
    fn boxed(key: &'static str, calls: &CallLog, fail_initialize: bool) -> Box<dyn ServiceGear> {
        Box::new(Self {
            key,
            calls: Arc::clone(calls),
            fail_initialize,
            fail_connect: false,
        })
    }

    fn failing_connect(key: &'static str, calls: &CallLog) -> Box<dyn ServiceGear> {
        Box::new(Self {
            key,
            calls: Arc::clone(calls),
            fail_initialize: false,
            fail_connect: true,
        })
    }
}

#[async_trait]
impl ServiceGear for RecordingGear {
    async fn initialize(&mut self, config: &ResolvedConfig, log_level: LogLevel) -> collins::Result<()> {
        self.calls.lock().unwrap().push(format!(
            "{}:initialize:{}:{}",
            self.key,
            config.to_value(),
            log_level
        ));
        if self.fail_initialize {
            return Err(CollinsError::with_details(
                ErrorKind::custom("Gear:Initialize"),
                format!("{} refused to initialize", self.key),
            ));
        }
        Ok(())
    }

    async fn connect(&mut self) -> collins::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:connect", self.key));
        if self.fail_connect {
            return Err(CollinsError::with_details(
                ErrorKind::custom("Gear:Connect"),
                format!("{} could not connect", self.key),
            ));
        }
        Ok(())
    }
}

fn config_dir(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(temp_dir.path().join(name), content).unwrap();
    }
    temp_dir
}

fn json_file(value: Value) -> String {
    value.to_string()
}

#[tokio::test]
async fn test_inherited_token_reaches_gear() {
    let master = json_file(json!({ "logLevel": "info", "token": "abc" }));
    let slack = json_file(json!({ "token": "inherit", "channel": "#ops" }));
    let dir = config_dir(&[("index.json", &master), ("slack.config.json", &slack)]);

    let calls = CallLog::default();
    let mut collins = Collins::with_path(dir.path());
    let gear_calls = Arc::clone(&calls);
    collins
        .include("CollinsSlack", move || {
            RecordingGear::boxed("slack", &gear_calls, false)
        })
        .unwrap();
    let mut events = collins.subscribe();

    collins.run().await.unwrap();

    let record = collins.registry().get("slack").unwrap();
    let config = record.config().unwrap();
    assert_eq!(config.get_str("token"), Some("abc"));
    assert_eq!(config.get_str("channel"), Some("#ops"));
    assert_eq!(record.log_level(), Some(LogLevel::Info));

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("slack:initialize:"));
    assert!(calls[0].contains(r#""token":"abc""#));
    assert!(calls[0].ends_with(":info"));
    assert_eq!(calls[1], "slack:connect");

    match events.recv().await.unwrap() {
        LifecycleEvent::Ready { gears, .. } => assert_eq!(gears, vec!["slack"]),
        other => panic!("expected ready, got {other:?}"),
    }
    assert_eq!(events.recv().await.unwrap().topic(), "started");
}

#[tokio::test]
async fn test_missing_gear_config_is_reported() {
    let dir = config_dir(&[("index.json", "{}")]);

    let calls = CallLog::default();
    let mut collins = Collins::with_path(dir.path());
    let gear_calls = Arc::clone(&calls);
    collins
        .include("CollinsSlack", move || {
            RecordingGear::boxed("slack", &gear_calls, false)
        })
        .unwrap();
    let mut events = collins.subscribe();

    let err = collins.configure().await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MissingConfig);
    assert!(err.to_string().contains("slack"));
    assert_eq!(err.detail().get("missing"), Some(&json!(["slack"])));
    assert!(calls.lock().unwrap().is_empty());

    match events.recv().await.unwrap() {
        LifecycleEvent::StartFailed { error, .. } => {
            assert_eq!(error.kind(), &ErrorKind::MissingConfig)
        }
        other => panic!("expected error:start, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_detail_lists_only_absent_keys() {
    let dir = config_dir(&[
        ("index.json", "{}"),
        ("web.config.json", "{}"),
        ("metrics.config.json", "{}"),
    ]);

    let calls = CallLog::default();
    let mut collins = Collins::with_path(dir.path());
    for name in ["CollinsWeb", "CollinsSlack", "CollinsDiscord"] {
        let gear_calls = Arc::clone(&calls);
        collins
            .include(name, move || RecordingGear::boxed("any", &gear_calls, false))
            .unwrap();
    }

    let err = collins.configure().await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MissingConfig);
    assert_eq!(
        err.detail().get("missing"),
        Some(&json!(["slack", "discord"]))
    );
}

#[tokio::test]
async fn test_invalid_log_level_fails_before_gear_files_are_read() {
    // The gear file is malformed; only master validation may report.
    let dir = config_dir(&[
        ("index.json", r#"{ "logLevel": "not-a-level" }"#),
        ("slack.config.json", "{ not json"),
    ]);

    let calls = CallLog::default();
    let mut collins = Collins::with_path(dir.path());
    let gear_calls = Arc::clone(&calls);
    collins
        .include("CollinsSlack", move || {
            RecordingGear::boxed("slack", &gear_calls, false)
        })
        .unwrap();

    let err = collins.configure().await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidConfig);
    assert!(collins.store().master().is_none());
    assert!(collins.registry().get("slack").unwrap().config().is_none());
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_initialize_failure_does_not_block_siblings() {
    let dir = config_dir(&[
        ("index.json", "{}"),
        ("alpha.config.json", r#"{ "n": 1 }"#),
        ("beta.config.json", r#"{ "n": 2 }"#),
    ]);

    let calls = CallLog::default();
    let mut collins = Collins::with_path(dir.path());
    let alpha_calls = Arc::clone(&calls);
    collins
        .include("CollinsAlpha", move || {
            RecordingGear::boxed("alpha", &alpha_calls, true)
        })
        .unwrap();
    let beta_calls = Arc::clone(&calls);
    collins
        .include("CollinsBeta", move || {
            RecordingGear::boxed("beta", &beta_calls, false)
        })
        .unwrap();

    let err = collins.run().await.unwrap_err();
    assert_eq!(err.kind().as_str(), "Gear:Initialize");
    assert_eq!(err.details(), Some("alpha refused to initialize"));

    assert!(!collins.registry().get("alpha").unwrap().is_initialized());
    assert!(collins.registry().get("beta").unwrap().is_initialized());
    assert!(!collins.is_configured());

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| !call.ends_with(":connect")));
}

#[tokio::test]
async fn test_connect_failure_does_not_block_siblings() {
    let dir = config_dir(&[
        ("index.json", "{}"),
        ("alpha.config.json", "{}"),
        ("beta.config.json", "{}"),
    ]);

    let calls = CallLog::default();
    let mut collins = Collins::with_path(dir.path());
    let alpha_calls = Arc::clone(&calls);
    collins
        .include("CollinsAlpha", move || {
            RecordingGear::failing_connect("alpha", &alpha_calls)
        })
        .unwrap();
    let beta_calls = Arc::clone(&calls);
    collins
        .include("CollinsBeta", move || {
            RecordingGear::boxed("beta", &beta_calls, false)
        })
        .unwrap();
    let mut events = collins.subscribe();

    let err = collins.run().await.unwrap_err();
    assert_eq!(err.kind().as_str(), "Gear:Connect");
    assert_eq!(err.details(), Some("alpha could not connect"));
    assert!(collins.is_configured());
    assert!(!collins.is_started());

    let calls = calls.lock().unwrap().clone();
    assert!(calls.contains(&"alpha:connect".to_string()));
    assert!(calls.contains(&"beta:connect".to_string()));

    assert_eq!(events.recv().await.unwrap().topic(), "ready");
    match events.recv().await.unwrap() {
        LifecycleEvent::StartFailed { error, .. } => {
            assert_eq!(error.kind(), err.kind());
            assert_eq!(error.to_string(), err.to_string());
        }
        other => panic!("expected error:start, got {other:?}"),
    }
}

#[tokio::test]
async fn test_inheritance_failure_rejects_only_that_gear() {
    let master = json_file(json!({ "token": "abc" }));
    let slack = json_file(json!({ "token": "inherit", "secret": "inherit" }));
    let web = json_file(json!({ "token": "inherit", "port": 8080 }));
    let dir = config_dir(&[
        ("index.json", &master),
        ("slack.config.json", &slack),
        ("web.config.json", &web),
    ]);

    let calls = CallLog::default();
    let mut collins = Collins::with_path(dir.path());
    for (name, key) in [("CollinsSlack", "slack"), ("CollinsWeb", "web")] {
        let gear_calls = Arc::clone(&calls);
        collins
            .include(name, move || RecordingGear::boxed(key, &gear_calls, false))
            .unwrap();
    }

    let err = collins.configure().await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidConfig);
    assert_eq!(err.detail().get("file"), Some(&json!("slack.config.json")));
    assert_eq!(err.detail().get("property"), Some(&json!("secret")));

    // whole file rejected, nothing partially applied
    assert!(collins.registry().get("slack").unwrap().config().is_none());

    let web = collins.registry().get("web").unwrap().config().unwrap();
    assert_eq!(web.get_str("token"), Some("abc"));
    assert_eq!(web.get("port"), Some(&json!(8080)));

    // initialize never ran
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_registration_collision() {
    let calls = CallLog::default();
    let mut collins = Collins::new();

    let first_calls = Arc::clone(&calls);
    let key = collins
        .include("CollinsSlack", move || {
            RecordingGear::boxed("slack", &first_calls, false)
        })
        .unwrap();
    assert_eq!(key, "slack");

    let second_calls = Arc::clone(&calls);
    let err = collins
        .include("Slack", move || {
            RecordingGear::boxed("slack", &second_calls, false)
        })
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidInput);
    assert_eq!(collins.registry().len(), 1);
    assert_eq!(collins.registry().get("slack").unwrap().name(), "CollinsSlack");
}

#[tokio::test]
async fn test_unregistered_config_files_are_ignored() {
    let dir = config_dir(&[
        ("index.json", r#"{ "name": "Ops" }"#),
        ("orphan.config.json", "{ not json"),
        ("README.md", "# configs"),
    ]);

    let mut collins = Collins::with_path(dir.path());
    collins.run().await.unwrap();

    let master = collins.store().master().unwrap();
    assert_eq!(master.name(), "Ops");
    assert_eq!(master.user_agent(), "collins");
    assert_eq!(master.log_level(), LogLevel::Debug);
}
