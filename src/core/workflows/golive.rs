//! `go-live`: promote a dev project to a freshly provisioned prod host.
//!
//! The promotion walks eight stages in order. Nothing on the remote host is
//! touched before the operator has confirmed the generated prod settings.
//! Any failure after that point leaves both hosts as they are; there is no
//! automatic reconciliation.

use serde::Serialize;
use std::fmt;

use crate::context::ProjectContext;
use crate::error::{Error, Result};
use crate::executor::{CommandRunner, CommandSpec};
use crate::guard::{self, Gate};
use crate::pipeline::{PipelineReport, PipelineRun, Step};
use crate::prompt::Prompter;
use crate::settings::SettingsFile;
use crate::ssh::{RemoteCommand, RemoteHost};
use crate::utils::io;
use crate::utils::template::{self, TemplateVars};
use crate::utils::validation::{self, InputKind};

use super::{drush, init_git, push, sites_path};

/// Attempts per parameter before collection gives up.
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preflight,
    ParameterCollection,
    SettingsPersistence,
    OperatorConfirmation,
    PreSyncHousekeeping,
    CodePromotion,
    RemoteFinalization,
    PostChecklist,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Preflight,
        Stage::ParameterCollection,
        Stage::SettingsPersistence,
        Stage::OperatorConfirmation,
        Stage::PreSyncHousekeeping,
        Stage::CodePromotion,
        Stage::RemoteFinalization,
        Stage::PostChecklist,
    ];

    pub fn number(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::ParameterCollection => "parameter collection",
            Stage::SettingsPersistence => "settings persistence",
            Stage::OperatorConfirmation => "operator confirmation",
            Stage::PreSyncHousekeeping => "pre-sync housekeeping",
            Stage::CodePromotion => "code promotion",
            Stage::RemoteFinalization => "remote finalization",
            Stage::PostChecklist => "post checklist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.number(), Stage::ALL.len(), self.label())
    }
}

/// One value collected from the operator and stored under `key`.
pub struct Parameter {
    pub key: &'static str,
    pub question: &'static str,
    pub kind: InputKind,
    pub fallback: Option<&'static str>,
}

pub const PARAMETERS: [Parameter; 7] = [
    Parameter {
        key: "PROD_HOST",
        question: "Production SSH host",
        kind: InputKind::Host,
        fallback: None,
    },
    Parameter {
        key: "PROD_USER",
        question: "Production SSH user",
        kind: InputKind::User,
        fallback: None,
    },
    Parameter {
        key: "PROD_DOMAIN",
        question: "Public domain",
        kind: InputKind::Domain,
        fallback: None,
    },
    Parameter {
        key: "PROD_DB_HOST",
        question: "Production database host",
        kind: InputKind::Host,
        fallback: Some("localhost"),
    },
    Parameter {
        key: "PROD_DB_NAME",
        question: "Production database name",
        kind: InputKind::Identifier,
        fallback: None,
    },
    Parameter {
        key: "PROD_DB_USER",
        question: "Production database user",
        kind: InputKind::Identifier,
        fallback: None,
    },
    Parameter {
        key: "PROD_DB_PASSWORD",
        question: "Production database password",
        kind: InputKind::Secret,
        fallback: None,
    },
];

const PREFLIGHT_CHECKLIST: [&str; 5] = [
    "Your SSH key is authorized for the prod account (login works without a password prompt).",
    "The prod account's SSH key is registered as an access key for the repository.",
    "DNS for the public domain points to the prod host and SSL can be issued.",
    "The prod database and its user exist.",
    "A current backup of the dev site exists.",
];

const POST_CHECKLIST: [&str; 5] = [
    "Point the document root of {{domain}} to the project's web directory on the prod host.",
    "Issue or activate the TLS certificate for {{domain}}.",
    "Register a cron job running `drush cron` on the prod host.",
    "Optional: submit the sitemap of https://{{domain}} to search engines.",
    "Optional: set up uptime monitoring for https://{{domain}}.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoLiveParams {
    pub host: String,
    pub user: String,
    pub domain: String,
    pub db_host: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
}

impl GoLiveParams {
    /// Build from values in [`PARAMETERS`] order.
    pub fn from_values(values: Vec<String>) -> Result<Self> {
        let [host, user, domain, db_host, db_name, db_user, db_password]: [String; 7] =
            values.try_into().map_err(|values: Vec<String>| {
                Error::internal_unexpected(format!(
                    "Expected {} go-live parameters, got {}",
                    PARAMETERS.len(),
                    values.len()
                ))
            })?;

        Ok(Self {
            host,
            user,
            domain,
            db_host,
            db_name,
            db_user,
            db_password,
        })
    }

    /// `PROD_*` keys stored in the local settings file.
    pub fn settings_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("PROD_HOST", self.host.as_str()),
            ("PROD_USER", self.user.as_str()),
            ("PROD_DOMAIN", self.domain.as_str()),
            ("PROD_DB_HOST", self.db_host.as_str()),
            ("PROD_DB_NAME", self.db_name.as_str()),
            ("PROD_DB_USER", self.db_user.as_str()),
            ("PROD_DB_PASSWORD", self.db_password.as_str()),
        ]
    }

    /// Keys that differ between the dev and the prod settings file.
    pub fn remote_overrides<'a>(&'a self, env_tag: &'a str) -> Vec<(&'static str, &'a str)> {
        vec![
            ("DB_HOST", self.db_host.as_str()),
            ("DB_NAME", self.db_name.as_str()),
            ("DB_USER", self.db_user.as_str()),
            ("DB_PASSWORD", self.db_password.as_str()),
            ("ENV", env_tag),
        ]
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoLiveReport {
    pub project: String,
    pub domain: String,
    pub target: String,
    pub stages_completed: Vec<Stage>,
    pub pipelines: Vec<PipelineReport>,
    pub follow_up: Vec<String>,
}

pub fn gates(ctx: &ProjectContext) -> Vec<Gate> {
    vec![
        Gate::dev(),
        Gate::file_exists(
            &ctx.config().settings.project_file,
            "The project settings file is missing. Run init-dev first.",
        ),
        Gate::dir_exists(
            sites_path(ctx, "files"),
            "The \"files\" storage directory was not found. Run install first.",
        ),
        Gate::dir_exists(".git", "No git repository found. Run init-git first."),
    ]
}

/// Ask for one parameter, re-prompting on invalid input.
fn collect_value(
    ctx: &ProjectContext,
    prompter: &dyn Prompter,
    param: &Parameter,
) -> Result<String> {
    let stored = ctx.setting(param.key).or(param.fallback);

    let mut attempt = 1;
    loop {
        let answer = if param.kind == InputKind::Secret {
            prompter.secret(param.question, stored)?
        } else {
            prompter.ask(param.question, stored)?
        };

        match validation::validate_input(param.kind, param.key, &answer) {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS => {
                log_status!(
                    "go-live",
                    "Invalid {} (attempt {}/{})",
                    param.key,
                    attempt,
                    MAX_ATTEMPTS
                );
                prompter.show(&err.message);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn collect_parameters(
    ctx: &ProjectContext,
    prompter: &dyn Prompter,
) -> Result<GoLiveParams> {
    let values = PARAMETERS
        .iter()
        .map(|param| collect_value(ctx, prompter, param))
        .collect::<Result<Vec<_>>>()?;
    GoLiveParams::from_values(values)
}

/// Store the parameters locally and write the prod settings staging file.
/// Returns the context carrying the new local snapshot and the staging file.
pub fn persist_settings(
    ctx: &ProjectContext,
    params: &GoLiveParams,
) -> Result<(ProjectContext, SettingsFile)> {
    let golive = &ctx.config().golive;

    let local = ctx.settings_file().upsert_many(&params.settings_pairs())?;
    let ctx = ctx.with_settings(local);

    let staging = ctx
        .settings_file()
        .copy_to(ctx.path(&golive.staging_file))?;
    let mut pairs = params.settings_pairs();
    pairs.extend(params.remote_overrides(&golive.env_tag));
    staging.upsert_many(&pairs)?;

    log_status!(
        "go-live",
        "Prod settings staged at {}",
        staging.path().display()
    );
    log_status!("go-live", "{}", credential_notice(&ctx));
    Ok((ctx, staging))
}

/// Show the staged prod settings and require an explicit yes.
/// Declining deletes the staging file.
pub fn confirm(
    prompter: &dyn Prompter,
    staging: &SettingsFile,
    params: &GoLiveParams,
) -> Result<()> {
    prompter.show(&format!(
        "Settings file for {} ({}):\n\n{}",
        params.domain,
        staging.path().display(),
        staging.read_raw()?
    ));

    let question = format!(
        "Go live with {} on {}@{}? Remote changes start after this point.",
        params.domain, params.user, params.host
    );
    if prompter.confirm(&question, false)? {
        return Ok(());
    }

    staging.remove()?;
    log_status!("go-live", "Declined; removed {}", staging.path().display());
    Err(Error::user_abort(
        "Go-live aborted by operator. No remote changes were made.",
    ))
}

pub fn remote_host(ctx: &ProjectContext, params: &GoLiveParams) -> RemoteHost {
    let golive = &ctx.config().golive;
    RemoteHost::new(
        &ctx.config().tools.ssh,
        &params.user,
        &params.host,
        golive.ssh_port,
        golive.identity_file.as_deref(),
    )
}

pub fn housekeeping_steps(ctx: &ProjectContext) -> Vec<Step<'static>> {
    vec![
        Step::command("cron", drush(ctx, ["cron"])),
        Step::command("cache-rebuild", drush(ctx, ["cache:rebuild"])),
    ]
}

fn remote_drush<I, S>(ctx: &ProjectContext, args: I) -> RemoteCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RemoteCommand::exec(&ctx.config().tools.drush, args).in_dir(&ctx.config().golive.remote_dir)
}

/// Prepare the prod account, clone the repository and mirror the local tree.
pub fn bootstrap_steps(
    ctx: &ProjectContext,
    host: &RemoteHost,
    repository: &str,
) -> Vec<Step<'static>> {
    let config = ctx.config();
    let golive = &config.golive;
    let remote_dir = golive.remote_dir.as_str();

    let mut steps = Vec::new();

    if !golive.placeholder_files.is_empty() {
        steps.push(Step::remote(
            "remove-placeholders",
            host,
            RemoteCommand::exec(
                "rm",
                ["-rf".to_string()]
                    .into_iter()
                    .chain(golive.placeholder_files.iter().cloned()),
            )
            .in_dir(remote_dir),
        ));
    }

    let known_hosts = ".ssh/known_hosts";
    steps.push(Step::remote(
        "register-git-host",
        host,
        RemoteCommand::exec("mkdir", ["-p", ".ssh"]).and(
            RemoteCommand::exec("grep", ["-qF", config.git.host.as_str(), known_hosts]).or(
                RemoteCommand::exec(&config.tools.ssh_keyscan, [config.git.host.as_str()])
                    .append_to(known_hosts),
            ),
        ),
    ));

    let path_commands = golive.path_additions.iter().map(|addition| {
        let line = format!("export PATH=\"{}:$PATH\"", addition);
        RemoteCommand::exec("grep", ["-qxF", line.as_str(), ".bashrc"])
            .or(RemoteCommand::exec("echo", [line.as_str()]).append_to(".bashrc"))
    });
    if let Some(command) = path_commands.reduce(RemoteCommand::and) {
        steps.push(Step::remote("path-additions", host, command));
    }

    steps.push(Step::remote(
        "clone",
        host,
        RemoteCommand::exec(&config.tools.git, ["clone", repository, "."]).in_dir(remote_dir),
    ));
    steps.push(Step::remote(
        "composer-install",
        host,
        RemoteCommand::exec(
            &config.tools.composer,
            ["install", "--no-dev", "--prefer-dist", "--no-interaction"],
        )
        .in_dir(remote_dir),
    ));

    let mut rsync_args = vec!["-az".to_string(), "-e".to_string(), host.rsync_shell()];
    rsync_args.extend(
        golive
            .rsync_excludes
            .iter()
            .map(|exclude| format!("--exclude={}", exclude)),
    );
    rsync_args.push("./".to_string());
    rsync_args.push(host.rsync_destination(remote_dir));
    steps.push(
        Step::command(
            "mirror-tree",
            CommandSpec::new(&config.tools.rsync)
                .args(rsync_args)
                .current_dir(ctx.root()),
        )
        .targets(host),
    );

    steps
}

/// Move settings and database into place and switch the site to production values.
pub fn finalize_steps<'a>(
    ctx: &'a ProjectContext,
    host: &RemoteHost,
    staging: &'a SettingsFile,
) -> Vec<Step<'a>> {
    let config = ctx.config();
    let golive = &config.golive;

    let remote_settings = format!(
        "{}/{}",
        golive.remote_dir.trim_end_matches('/'),
        config.settings.project_file
    );

    let dump = ctx.root().join("..").join(&golive.dump_file);
    let local_dump_gz = ctx.root().join("..").join(format!("{}.gz", golive.dump_file));
    let remote_dump_gz = format!("{}.gz", golive.dump_file);

    let mut steps = vec![
        Step::upload("upload-settings", host, staging.path(), remote_settings),
        Step::action("remove-staging-file", move || staging.remove()),
        Step::command(
            "dump-database",
            drush(
                ctx,
                [
                    "sql:dump".to_string(),
                    "--gzip".to_string(),
                    format!("--result-file={}", dump.display()),
                ],
            ),
        ),
        Step::upload(
            "upload-database",
            host,
            local_dump_gz.clone(),
            remote_dump_gz.clone(),
        ),
        Step::remote(
            "import-database",
            host,
            RemoteCommand::exec("gunzip", ["-c", remote_dump_gz.as_str()])
                .pipe(remote_drush(ctx, ["sql:cli"])),
        ),
        Step::remote(
            "remove-remote-dump",
            host,
            RemoteCommand::exec("rm", ["-f", remote_dump_gz.as_str()]),
        ),
        Step::action("remove-local-dump", move || {
            io::remove_file_if_exists(&local_dump_gz, "remove local database dump")
        }),
        Step::remote("cache-rebuild", host, remote_drush(ctx, ["cache:rebuild"])),
    ];

    steps.extend(
        golive
            .production_commands
            .iter()
            .enumerate()
            .map(|(index, args)| {
                Step::remote(
                    format!("production-setting-{}", index + 1),
                    host,
                    remote_drush(ctx, args.iter().cloned()),
                )
            }),
    );

    steps
}

fn checklist(header: &str, items: &[&str], domain: Option<&str>) -> (String, Vec<String>) {
    let items: Vec<String> = items
        .iter()
        .map(|item| match domain {
            Some(domain) => template::render(item, &[(TemplateVars::DOMAIN, domain)]),
            None => item.to_string(),
        })
        .collect();

    let mut text = header.to_string();
    for item in &items {
        text.push_str("\n  - ");
        text.push_str(item);
    }
    (text, items)
}

/// Reminder that the dev settings file now holds the prod database password.
pub fn credential_notice(ctx: &ProjectContext) -> String {
    format!(
        "{} on this dev host now stores the prod database password (PROD_DB_PASSWORD). Remove it once the prod site is verified.",
        ctx.config().settings.project_file
    )
}

fn enter(stage: Stage) {
    log_status!("go-live", "Stage {}", stage);
}

fn at_stage(stage: Stage) -> impl FnOnce(Error) -> Error {
    move |err| err.with_hint(format!("Go-live stopped during stage {}", stage))
}

pub fn run(
    ctx: &ProjectContext,
    runner: &dyn CommandRunner,
    prompter: &dyn Prompter,
) -> Result<GoLiveReport> {
    let mut stages = Vec::new();
    let mut pipelines = Vec::new();

    enter(Stage::Preflight);
    guard::check_all(ctx, &gates(ctx))?;
    let project = ctx.project_name()?.to_string();
    let repository = init_git::repository_url(ctx)?;
    let (text, _) = checklist("Before going live, make sure that:", &PREFLIGHT_CHECKLIST, None);
    prompter.show(&text);
    stages.push(Stage::Preflight);

    enter(Stage::ParameterCollection);
    let params = collect_parameters(ctx, prompter)?;
    stages.push(Stage::ParameterCollection);

    enter(Stage::SettingsPersistence);
    let (ctx, staging) = persist_settings(ctx, &params)?;
    stages.push(Stage::SettingsPersistence);

    enter(Stage::OperatorConfirmation);
    confirm(prompter, &staging, &params)
        .map_err(|err| err.with_hint(credential_notice(&ctx)))?;
    stages.push(Stage::OperatorConfirmation);

    let host = remote_host(&ctx, &params);

    enter(Stage::PreSyncHousekeeping);
    pipelines.push(
        PipelineRun::new("go-live:housekeeping")
            .steps(housekeeping_steps(&ctx))
            .run(runner)
            .map_err(at_stage(Stage::PreSyncHousekeeping))?,
    );
    stages.push(Stage::PreSyncHousekeeping);

    enter(Stage::CodePromotion);
    let message = format!("Go-live {} on {}", project, params.domain);
    pipelines.push(
        push::push_with_message(&ctx, runner, &message).map_err(at_stage(Stage::CodePromotion))?,
    );
    pipelines.push(
        PipelineRun::new("go-live:bootstrap")
            .steps(bootstrap_steps(&ctx, &host, &repository))
            .run(runner)
            .map_err(at_stage(Stage::CodePromotion))?,
    );
    stages.push(Stage::CodePromotion);

    enter(Stage::RemoteFinalization);
    pipelines.push(
        PipelineRun::new("go-live:finalize")
            .steps(finalize_steps(&ctx, &host, &staging))
            .run(runner)
            .map_err(at_stage(Stage::RemoteFinalization))?,
    );
    stages.push(Stage::RemoteFinalization);

    enter(Stage::PostChecklist);
    let notice = credential_notice(&ctx);
    let mut items: Vec<&str> = POST_CHECKLIST.to_vec();
    items.push(&notice);
    let (text, follow_up) = checklist(
        &format!("{} is live. Remaining manual steps:", params.domain),
        &items,
        Some(&params.domain),
    );
    prompter.show(&text);
    stages.push(Stage::PostChecklist);

    Ok(GoLiveReport {
        project,
        domain: params.domain.clone(),
        target: host.target(),
        stages_completed: stages,
        pipelines,
        follow_up,
    })
}
