//! Command dispatch and handlers.
//!
//! [`dispatch_command`] composes the credential store, login flow, session
//! guard and API client, then hands the parsed command to [`CommandContext`].
//! Every command that talks to the API goes through the same startup
//! sequence: banner, app config (synced from the server when absent),
//! session guard, first-run welcome.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::CommandFactory;
use eclipse_keyring_store::{CredentialStore, KeyringStore};
use eclipse_login::{
    AppConfig, AppConfigStore, DEFAULT_AUTH_SERVER_PORT, DEFAULT_CALLBACK_PATH, GuardOutcome,
    LoginFlow, Notifier, Session, SessionGuard, SessionStatus, SessionStore,
};
use secrecy::SecretString;
use thiserror::Error;

use super::args::{
    AddArgs, Cli, Commands, InitArgs, InjectArgs, LinkArgs, ListArgs, OutputArgs, RemoveArgs,
    ResetArgs, TargetArgs,
};
use crate::api::{ApiClient, ApiError, CreateSecretDto, Project, RevealedSecret, SecretQuery};
use crate::config::CliConfig;
use crate::messages;
use crate::project_config::{ProjectConfig, ProjectConfigError, Target};
use crate::styled_output::StyledNotifier;
use crate::{prompt, secrets, shell};

/// A failure the user has already been shown through the notifier.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ReportedError(pub String);

/// Parse-to-exit-code entry point used by `main`.
pub async fn dispatch_command(cli: Cli) -> Result<i32> {
    let work_dir = std::env::current_dir().context("Failed to read the working directory")?;
    let config = CliConfig::from_cli(&cli, work_dir);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(0);
    };

    let store: Arc<dyn CredentialStore> = Arc::new(KeyringStore::new());
    let notifier: Arc<dyn Notifier> = Arc::new(StyledNotifier);
    let ctx = CommandContext::new(config, store, notifier)?;
    ctx.run(command).await
}

/// Shared state of one CLI invocation.
pub struct CommandContext {
    config: CliConfig,
    http: reqwest::Client,
    configs: AppConfigStore,
    sessions: SessionStore,
    flow: Arc<LoginFlow>,
    guard: SessionGuard,
    notifier: Arc<dyn Notifier>,
}

impl CommandContext {
    pub fn new(
        config: CliConfig,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let http = eclipse_common::create_default_client().map_err(|e| anyhow!(e))?;
        let flow = Arc::new(
            LoginFlow::new(store.clone(), notifier.clone())?
                .with_client(http.clone())
                .with_options(config.login.clone()),
        );
        let guard = SessionGuard::new(
            SessionStore::new(store.clone()),
            flow.clone(),
            notifier.clone(),
        );

        Ok(Self {
            config,
            http,
            configs: AppConfigStore::new(store.clone()),
            sessions: SessionStore::new(store),
            flow,
            guard,
            notifier,
        })
    }

    /// Run `command` and return the process exit code.
    pub async fn run(&self, command: Commands) -> Result<i32> {
        match command {
            Commands::Login => self.login().await,
            Commands::Logout => {
                self.flow.logout()?;
                Ok(0)
            }
            Commands::Status => self.status(),
            Commands::Init(args) => self.init(args).await,
            Commands::Reset(args) => self.reset(args),
            Commands::Projects(args) => self.projects(args).await,
            Commands::Link(args) => self.link(args).await,
            Commands::Inject(args) => self.inject(args).await,
            Commands::List(args) => self.list(args).await,
            Commands::Add(args) => self.add(args).await,
            Commands::Remove(args) => self.remove(args).await,
            Commands::Env(args) => self.env(args).await,
        }
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// The stored app config, fetched from `POST /cli` when there is none.
    async fn ensure_app_config(&self) -> Result<AppConfig> {
        match self.configs.load() {
            Ok(Some(config)) => return Ok(config),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Stored app config unreadable, syncing again"),
        }

        self.notifier.warning(messages::SYNCING_MESSAGE);
        match self.sync_from_server().await {
            Ok(config) => {
                self.notifier.success(messages::CONFIGURED_MESSAGE);
                Ok(config)
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "Config sync failed");
                self.notifier.error(messages::SYNC_FAILED_MESSAGE);
                Err(ReportedError(format!("config sync failed: {e:#}")).into())
            }
        }
    }

    async fn sync_from_server(&self) -> Result<AppConfig> {
        let api_url = self
            .config
            .api_url
            .clone()
            .ok_or(ApiError::MissingBaseUrl)?;
        let cli_key = self
            .config
            .cli_key
            .clone()
            .context("no CLI key configured; set ECLIPSE_CLI_KEY")?;

        let api = ApiClient::new(self.http.clone(), &api_url, SecretString::from(cli_key))?;
        let config = api.get_cli_values().await?.into_app_config(Some(api_url));
        config.validate()?;
        self.configs.save(&config)?;
        tracing::info!(issuer = %config.issuer(), "Synced app config");
        Ok(config)
    }

    fn welcome_if_first_run(&self, config: &AppConfig) -> Result<()> {
        if config.first_run {
            self.notifier.message(messages::WELCOME_MESSAGE);
            self.configs.clear_first_run()?;
        }
        Ok(())
    }

    /// Startup sequence for commands that call the API.
    async fn start_session(&self) -> Result<ApiClient> {
        self.notifier.message(messages::BANNER);
        let app_config = self.ensure_app_config().await?;

        let session = match self.guard.ensure_session().await {
            GuardOutcome::Restored(session) | GuardOutcome::LoggedIn(session) => session,
            GuardOutcome::Failed => {
                return Err(ReportedError("authentication required".to_string()).into());
            }
        };
        self.welcome_if_first_run(&app_config)?;

        let api_url = self
            .config
            .api_url
            .as_deref()
            .or(app_config.api_url.as_deref())
            .ok_or(ApiError::MissingBaseUrl)?;
        Ok(ApiClient::new(
            self.http.clone(),
            api_url,
            session.secret_token(),
        )?)
    }

    /// The `.eclipserc` of the working directory and the project it names.
    async fn linked_project(&self, api: &ApiClient) -> Result<(ProjectConfig, Project)> {
        let marker = match ProjectConfig::require_in(&self.config.work_dir) {
            Ok(marker) => marker,
            Err(e @ (ProjectConfigError::NotLinked | ProjectConfigError::Malformed(_))) => {
                self.notifier.warning(&e.to_string());
                return Err(ReportedError(e.to_string()).into());
            }
            Err(e) => return Err(e.into()),
        };

        let projects = api.get_projects(Some(&marker.project)).await?;
        match select_project(projects, &marker.project) {
            Some(project) => Ok((marker, project)),
            None => {
                self.notifier.error(messages::NO_ACCESS_MESSAGE);
                Err(ReportedError(messages::NO_ACCESS_MESSAGE.to_string()).into())
            }
        }
    }

    async fn fetch_secrets(
        &self,
        api: &ApiClient,
        project: &Project,
        target: &Target,
    ) -> Result<Vec<RevealedSecret>> {
        let query = SecretQuery::for_project(project, &target.component, &target.environment);
        let secrets = api.get_secrets(&query).await?;
        tracing::debug!(
            component = %target.component,
            environment = %target.environment,
            count = secrets.len(),
            "Fetched secrets"
        );
        if secrets.is_empty() {
            self.notifier
                .warning(&secrets::no_secrets_message(project, target));
        }
        Ok(secrets)
    }

    // ------------------------------------------------------------------
    // Account commands
    // ------------------------------------------------------------------

    async fn login(&self) -> Result<i32> {
        let app_config = self.ensure_app_config().await?;
        if self.flow.initialize_auth_flow().await {
            self.welcome_if_first_run(&app_config)?;
            Ok(0)
        } else {
            Err(ReportedError("login failed".to_string()).into())
        }
    }

    fn status(&self) -> Result<i32> {
        match self.configs.load()? {
            Some(config) => {
                let api_url = self
                    .config
                    .api_url
                    .as_deref()
                    .or(config.api_url.as_deref())
                    .unwrap_or("(not set)");
                println!("{:<14}{}", "Auth domain:", config.issuer());
                println!("{:<14}{}", "Client ID:", config.auth_client_id);
                println!("{:<14}{}", "Callback URL:", config.auth_callback_url);
                println!("{:<14}{}", "API URL:", api_url);
            }
            None => self
                .notifier
                .warning("Not configured. Run `eclipse init` to configure the CLI."),
        }

        match self.guard.inspect() {
            SessionStatus::Missing => self.notifier.message("Not logged in."),
            SessionStatus::Expired(session) => self
                .notifier
                .warning(&format!("Session expired {}.", describe_expiry(&session))),
            SessionStatus::Valid(session) => self.notifier.success(&format!(
                "Logged in. Session expires {}.",
                describe_expiry(&session)
            )),
        }
        Ok(0)
    }

    async fn init(&self, args: InitArgs) -> Result<i32> {
        if args.from_server {
            self.sync_from_server().await?;
        } else {
            let existing = self.configs.load().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable app config");
                None
            });
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let config = build_app_config(
                &args,
                existing.as_ref(),
                self.config.api_url.as_deref(),
                &mut stdin.lock(),
                &mut stdout,
            )?;
            config.validate()?;
            self.configs.save(&config)?;
        }
        self.notifier.success(messages::CONFIGURED_MESSAGE);
        Ok(0)
    }

    fn reset(&self, args: ResetArgs) -> Result<i32> {
        if !args.yes
            && !prompt::confirm_stdin("Delete the CLI configuration and the cached session?")?
        {
            self.notifier.warning(messages::ABORTED_MESSAGE);
            return Ok(0);
        }

        let config_deleted = self.configs.delete()?;
        let session_deleted = self.sessions.delete()?;
        tracing::info!(config_deleted, session_deleted, "Reset");
        self.notifier
            .success("CLI configuration and session removed.");
        Ok(0)
    }

    // ------------------------------------------------------------------
    // Project commands
    // ------------------------------------------------------------------

    async fn projects(&self, args: OutputArgs) -> Result<i32> {
        let api = self.start_session().await?;
        let projects = api.get_projects(None).await?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&projects)?);
        } else if projects.is_empty() {
            self.notifier.message("No projects found.");
        } else {
            print!("{}", secrets::format_project_table(&projects));
        }
        Ok(0)
    }

    async fn link(&self, args: LinkArgs) -> Result<i32> {
        let api = self.start_session().await?;
        let projects = api.get_projects(None).await?;
        let project = projects
            .into_iter()
            .find(|p| p.id == args.project || p.name == args.project)
            .ok_or_else(|| anyhow!("Project {} not found among your projects.", args.project))?;

        ProjectConfig::new(project.id.clone(), args.component).save_to(&self.config.work_dir)?;
        self.notifier
            .success(&format!("Directory linked to project {}.", project.name));
        Ok(0)
    }

    async fn inject(&self, args: InjectArgs) -> Result<i32> {
        let api = self.start_session().await?;
        let (marker, project) = self.linked_project(&api).await?;
        let target = Target::resolve(&args.target, &marker)?;
        let secrets = self.fetch_secrets(&api, &project, &target).await?;

        let Some((program, program_args)) = args.command.split_first() else {
            bail!("No command to run");
        };
        let env = secrets::secret_map(&secrets);
        Ok(shell::spawn_with_secrets(program, program_args, &env).await?)
    }

    async fn list(&self, args: ListArgs) -> Result<i32> {
        let api = self.start_session().await?;
        let (marker, project) = self.linked_project(&api).await?;
        let target = Target::resolve(&args.target.target, &marker)?;
        let secrets = self.fetch_secrets(&api, &project, &target).await?;

        if args.output.json {
            println!("{}", serde_json::to_string_pretty(&secrets)?);
        } else if !secrets.is_empty() {
            print!("{}", secrets::format_secret_table(&secrets));
        }
        Ok(0)
    }

    async fn add(&self, args: AddArgs) -> Result<i32> {
        let api = self.start_session().await?;
        let (marker, project) = self.linked_project(&api).await?;
        let target = Target::resolve(&args.target, &marker)?;

        let dto = CreateSecretDto {
            project_id: project.id.clone(),
            owner_id: project.owner_id.clone(),
            name: args.name,
            value: args.value,
            component: target.component,
            environment: target.environment,
        };
        api.create_secret(&dto).await?;
        self.notifier
            .success(&messages::secret_created(&dto.name, &project.name));
        Ok(0)
    }

    async fn remove(&self, args: RemoveArgs) -> Result<i32> {
        let api = self.start_session().await?;
        let (marker, project) = self.linked_project(&api).await?;
        let target = Target::resolve(&args.target, &marker)?;
        let secrets = self.fetch_secrets(&api, &project, &target).await?;

        let Some(secret) = secrets::find_secret(&secrets, &args.name) else {
            bail!(messages::secret_not_found(&args.name, &project.name));
        };

        if !args.yes && !prompt::confirm_stdin(messages::CONFIRM_DELETE_PROMPT)? {
            self.notifier.warning(messages::ABORTED_MESSAGE);
            return Ok(0);
        }

        api.delete_secret(&secret.secret.id).await?;
        self.notifier.success(&messages::secret_deleted(&args.name));
        Ok(0)
    }

    async fn env(&self, args: TargetArgs) -> Result<i32> {
        let api = self.start_session().await?;
        let (marker, project) = self.linked_project(&api).await?;
        let target = Target::resolve(&args.target, &marker)?;
        let secrets = self.fetch_secrets(&api, &project, &target).await?;
        if secrets.is_empty() {
            return Ok(0);
        }

        let path = secrets::write_env_file(&self.config.work_dir, &target.environment, &secrets)
            .context("Failed to write the env file")?;
        tracing::debug!(path = %path.display(), "Wrote env file");
        self.notifier
            .success(&messages::env_file_written(&target.environment));
        Ok(0)
    }
}

/// Pick the project named by `.eclipserc` out of the `/projects` answer.
fn select_project(projects: Vec<Project>, key: &str) -> Option<Project> {
    if projects.len() == 1 {
        return projects.into_iter().next();
    }
    projects.into_iter().find(|p| p.id == key || p.name == key)
}

fn describe_expiry(session: &Session) -> String {
    session
        .expires_at()
        .map(|at| format!("at {}", at.format("%Y-%m-%d %H:%M:%S UTC")))
        .unwrap_or_else(|| "at an unknown time".to_string())
}

/// Assemble an app config from `eclipse init` flags, prompting for the rest.
///
/// Stored values are offered as prompt defaults.
fn build_app_config<R: BufRead, W: Write>(
    args: &InitArgs,
    existing: Option<&AppConfig>,
    api_url: Option<&str>,
    input: &mut R,
    output: &mut W,
) -> Result<AppConfig> {
    let mut ask = |flag: Option<&String>, question: &str, default: Option<&str>| {
        match flag.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            Some(value) => Ok(value.to_string()),
            None => prompt::prompt_required(&mut *input, &mut *output, question, default),
        }
    };

    let domain = ask(
        args.domain.as_ref(),
        "Authorization server domain",
        existing.map(|c| c.auth_domain.as_str()),
    )?;
    let client_id = ask(
        args.client_id.as_ref(),
        "Client ID",
        existing.map(|c| c.auth_client_id.as_str()),
    )?;
    let audience = ask(
        args.audience.as_ref(),
        "Target audience",
        existing.map(|c| c.auth_target_audience.as_str()),
    )?;

    let port = match args.port {
        Some(port) => port,
        None => {
            let default = existing
                .map(|c| c.auth_server_port)
                .unwrap_or(DEFAULT_AUTH_SERVER_PORT)
                .to_string();
            let raw = ask(None, "Callback server port", Some(&default))?;
            raw.parse::<u16>()
                .with_context(|| format!("Invalid port {raw:?}"))?
        }
    };

    let default_callback = existing
        .filter(|c| c.auth_server_port == port)
        .map(|c| c.auth_callback_url.clone())
        .unwrap_or_else(|| format!("http://localhost:{port}{DEFAULT_CALLBACK_PATH}"));
    let callback_url = ask(
        args.callback_url.as_ref(),
        "Callback URL",
        Some(&default_callback),
    )?;

    let api_url = match api_url
        .map(str::to_string)
        .or_else(|| existing.and_then(|c| c.api_url.clone()))
    {
        Some(url) => Some(url),
        None => {
            let answer = prompt::prompt_input(&mut *input, &mut *output, "Eclipse API URL", None)?;
            Some(answer).filter(|a| !a.is_empty())
        }
    };

    Ok(AppConfig {
        auth_domain: domain,
        auth_client_id: client_id,
        auth_callback_url: callback_url,
        auth_server_port: port,
        auth_target_audience: audience,
        api_url,
        first_run: existing.map(|c| c.first_run).unwrap_or(true),
    })
}
