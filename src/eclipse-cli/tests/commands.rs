//! Command handlers against an in-memory credential store and a mock API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eclipse_cli::cli::{Cli, CommandContext, ReportedError};
use eclipse_cli::config::CliConfig;
use eclipse_keyring_store::MemoryStore;
use eclipse_login::notify::Level;
use eclipse_login::{
    AppConfig, AppConfigStore, LoginOptions, RecordingNotifier, Session, SessionStore, now_millis,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    dir: TempDir,
    cli_key: Option<String>,
}

fn envelope(payload: Value) -> Value {
    json!({ "payload": payload, "statusCode": 200, "message": "ok" })
}

impl Harness {
    /// Configured and logged in.
    async fn new() -> Self {
        let harness = Self::empty().await;
        harness.save_config(false);
        harness.save_session();
        harness
    }

    /// Nothing stored yet.
    async fn empty() -> Self {
        Self {
            server: MockServer::start().await,
            store: Arc::new(MemoryStore::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            dir: tempfile::tempdir().unwrap(),
            cli_key: None,
        }
    }

    fn save_config(&self, first_run: bool) {
        AppConfigStore::new(self.store.clone())
            .save(&AppConfig {
                auth_domain: "tenant.auth.test".to_string(),
                auth_client_id: "cid".to_string(),
                auth_callback_url: "http://localhost:4242/callback".to_string(),
                auth_server_port: 4242,
                auth_target_audience: "aud".to_string(),
                api_url: Some(self.server.uri()),
                first_run,
            })
            .unwrap();
    }

    fn save_session(&self) {
        SessionStore::new(self.store.clone())
            .save(&Session {
                access_token: "tok".to_string(),
                expiration_date: now_millis() + 3_600_000,
            })
            .unwrap();
    }

    fn link(&self, component: Option<&str>) {
        let mut text = "PROJECT=p1\n".to_string();
        if let Some(component) = component {
            text.push_str(&format!("COMPONENT={component}\n"));
        }
        std::fs::write(self.dir.path().join(".eclipserc"), text).unwrap();
    }

    fn work_dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<i32> {
        let cli = Cli::try_parse_from(std::iter::once("eclipse").chain(args.iter().copied()))
            .unwrap();
        let config = CliConfig {
            api_url: None,
            cli_key: self.cli_key.clone(),
            suppress_error: false,
            login: LoginOptions {
                timeout: Some(Duration::from_secs(1)),
                open_browser: false,
            },
            work_dir: self.work_dir(),
        };
        let ctx = CommandContext::new(config, self.store.clone(), self.notifier.clone())?;
        ctx.run(cli.command.unwrap()).await
    }

    async fn mount_projects(&self, projects: Value) {
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(projects)))
            .mount(&self.server)
            .await;
    }

    async fn mount_secrets(&self) {
        Mock::given(method("GET"))
            .and(path("/secrets/reveal"))
            .and(query_param("projectId", "p1"))
            .and(query_param("ownerId", "u1"))
            .and(query_param("component", "api"))
            .and(query_param("environment", "staging"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                { "_id": "s1", "name": "DB_URL", "value": "postgres://db" },
                { "_id": "s2", "name": "PORT", "value": "8080" }
            ]))))
            .mount(&self.server)
            .await;
    }

    fn saw(&self, level: Level, needle: &str) -> bool {
        self.notifier.contains(level, needle)
    }
}

fn shop() -> Value {
    json!([{ "_id": "p1", "name": "Shop", "ownerId": "u1" }])
}

#[tokio::test]
async fn list_uses_component_from_eclipserc() {
    let h = Harness::new().await;
    h.link(Some("api"));
    h.mount_projects(shop()).await;
    h.mount_secrets().await;

    assert_eq!(h.run(&["ls", "staging"]).await.unwrap(), 0);
    assert!(h.saw(Level::Success, "Session restored"));
    assert!(!h.saw(Level::Warning, "No secrets found"));
}

#[tokio::test]
async fn env_writes_env_file() {
    let h = Harness::new().await;
    h.link(None);
    h.mount_projects(shop()).await;
    h.mount_secrets().await;

    h.run(&["env", "api/staging"]).await.unwrap();

    let text = std::fs::read_to_string(h.dir.path().join(".env.staging")).unwrap();
    assert_eq!(
        text,
        "# Environment file generated by Eclipse\nDB_URL=postgres://db\nPORT=8080\n"
    );
    assert!(h.saw(Level::Success, ".env file for staging environment"));
}

#[tokio::test]
async fn empty_secret_list_warns() {
    let h = Harness::new().await;
    h.link(None);
    h.mount_projects(shop()).await;
    Mock::given(method("GET"))
        .and(path("/secrets/reveal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .mount(&h.server)
        .await;

    h.run(&["env", "web/prod"]).await.unwrap();

    assert!(h.saw(
        Level::Warning,
        "No secrets found for project Shop: component web and environment prod"
    ));
    assert!(!h.dir.path().join(".env.prod").exists());
}

#[tokio::test]
async fn add_creates_secret() {
    let h = Harness::new().await;
    h.link(None);
    h.mount_projects(shop()).await;
    Mock::given(method("POST"))
        .and(path("/secrets"))
        .and(body_json(json!({
            "projectId": "p1",
            "ownerId": "u1",
            "name": "KEY",
            "value": "VALUE",
            "component": "api",
            "environment": "dev"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "_id": "s3", "name": "KEY" }))),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.run(&["a", "api/dev", "KEY", "VALUE"]).await.unwrap();
    assert!(h.saw(Level::Success, "Secret KEY created under project Shop."));
}

#[tokio::test]
async fn remove_deletes_by_id() {
    let h = Harness::new().await;
    h.link(None);
    h.mount_projects(shop()).await;
    h.mount_secrets().await;
    Mock::given(method("DELETE"))
        .and(path("/secrets/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(Value::Null)))
        .expect(1)
        .mount(&h.server)
        .await;

    h.run(&["rm", "api/staging", "DB_URL", "--yes"]).await.unwrap();
    assert!(h.saw(Level::Success, "Secret DB_URL successfully deleted."));
}

#[tokio::test]
async fn remove_unknown_secret_fails() {
    let h = Harness::new().await;
    h.link(None);
    h.mount_projects(shop()).await;
    h.mount_secrets().await;

    let err = h
        .run(&["rm", "api/staging", "NOPE", "--yes"])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Secret NOPE not found under project Shop");
}

#[tokio::test]
async fn project_commands_need_eclipserc() {
    let h = Harness::new().await;

    let err = h.run(&["ls", "api/staging"]).await.unwrap_err();
    assert!(err.downcast_ref::<ReportedError>().is_some());
    assert!(h.saw(Level::Warning, "project directory"));
}

#[tokio::test]
async fn inaccessible_project_is_reported() {
    let h = Harness::new().await;
    h.link(None);
    h.mount_projects(json!([])).await;

    let err = h.run(&["ls", "api/staging"]).await.unwrap_err();
    assert!(err.downcast_ref::<ReportedError>().is_some());
    assert!(h.saw(Level::Error, "do not have access"));
}

#[tokio::test]
async fn api_envelope_error_fails_command() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payload": null,
            "statusCode": 500,
            "message": "boom"
        })))
        .mount(&h.server)
        .await;

    let err = h.run(&["projects"]).await.unwrap_err();
    assert!(format!("{err:#}").contains("boom"));
}

#[tokio::test]
async fn link_writes_eclipserc() {
    let h = Harness::new().await;
    h.mount_projects(json!([
        { "_id": "p0", "name": "Blog", "ownerId": "u1" },
        { "_id": "p1", "name": "Shop", "ownerId": "u1" }
    ]))
    .await;

    h.run(&["link", "Shop", "web"]).await.unwrap();

    let text = std::fs::read_to_string(h.dir.path().join(".eclipserc")).unwrap();
    assert!(text.ends_with("PROJECT=p1\nCOMPONENT=web\n"));
    assert!(h.saw(Level::Success, "linked to project Shop"));
}

#[tokio::test]
async fn first_run_shows_welcome_once() {
    let h = Harness::empty().await;
    h.save_config(true);
    h.save_session();
    h.mount_projects(shop()).await;

    h.run(&["projects"]).await.unwrap();

    assert!(h.saw(Level::Message, "first time running Eclipse"));
    let config = AppConfigStore::new(h.store.clone()).require().unwrap();
    assert!(!config.first_run);
}

#[tokio::test]
async fn missing_config_is_synced_from_server() {
    let mut h = Harness::empty().await;
    h.save_session();
    h.cli_key = Some("cli-key".to_string());
    Mock::given(method("POST"))
        .and(path("/cli"))
        .and(header("authorization", "Bearer cli-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ECLIPSE_AUTH_DOMAIN": "tenant.auth.test",
            "ECLIPSE_AUTH_CLIENT_ID": "synced-client",
            "ECLIPSE_AUTH_TARGET_AUDIENCE": "aud"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let ctx_config = CliConfig {
        api_url: Some(h.server.uri()),
        cli_key: h.cli_key.clone(),
        suppress_error: false,
        login: LoginOptions::default(),
        work_dir: h.work_dir(),
    };
    let ctx = CommandContext::new(ctx_config, h.store.clone(), h.notifier.clone()).unwrap();
    let cli = Cli::try_parse_from(["eclipse", "init", "--from-server"]).unwrap();
    ctx.run(cli.command.unwrap()).await.unwrap();

    let config = AppConfigStore::new(h.store.clone()).require().unwrap();
    assert_eq!(config.auth_client_id, "synced-client");
    assert_eq!(config.api_url.as_deref(), Some(h.server.uri().as_str()));
    assert!(h.saw(Level::Success, "configured successfully"));
}

#[tokio::test]
async fn sync_without_cli_key_is_reported() {
    let h = Harness::empty().await;
    h.save_session();

    let err = h.run(&["projects"]).await.unwrap_err();
    assert!(err.downcast_ref::<ReportedError>().is_some());
    assert!(h.saw(Level::Warning, "syncing with Eclipse servers"));
    assert!(h.saw(Level::Error, "not able to contact the Eclipse servers"));
}

#[tokio::test]
async fn logout_and_status() {
    let h = Harness::new().await;

    h.run(&["status"]).await.unwrap();
    assert!(h.saw(Level::Success, "Logged in. Session expires at"));

    h.run(&["logout"]).await.unwrap();
    assert!(h.saw(Level::Success, "logged out successfully"));
    assert!(SessionStore::new(h.store.clone()).load().unwrap().is_none());

    h.run(&["status"]).await.unwrap();
    assert!(h.saw(Level::Message, "Not logged in."));
}

#[tokio::test]
async fn reset_removes_config_and_session() {
    let h = Harness::new().await;

    h.run(&["reset", "--yes"]).await.unwrap();

    assert!(AppConfigStore::new(h.store.clone()).load().unwrap().is_none());
    assert!(SessionStore::new(h.store.clone()).load().unwrap().is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn inject_runs_command_with_secrets() {
    let h = Harness::new().await;
    h.link(Some("api"));
    h.mount_projects(shop()).await;
    h.mount_secrets().await;

    let code = h
        .run(&[
            "i",
            "staging",
            "sh",
            "-c",
            r#"test "$DB_URL" = "postgres://db" && test "$PORT" = 8080 && exit 7"#,
        ])
        .await
        .unwrap();
    assert_eq!(code, 7);
}
