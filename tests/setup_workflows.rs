mod common;

use common::{FakeRunner, Project};
use kickoff::workflows::{init_dev, init_git, install, update};
use std::fs;

#[test]
fn init_dev_writes_minimal_settings() {
    let project = Project::new();
    project
        .write("private/scaffold/default.settings.php.append", "")
        .write("web/sites/default/default.settings.php", "<?php // template\n");

    let runner = FakeRunner::new();
    let report = init_dev::run(&project.dev_context(), &runner).unwrap();

    let env = project.read(".env");
    assert!(env.contains("PROJECT_NAME=\"demo\""));
    assert!(env.contains("DB_NAME=\"dev1_demo\""));
    assert_eq!(
        project.read("web/sites/default/settings.php"),
        "<?php // template\n"
    );
    assert_eq!(report.completed, vec!["write-settings", "copy-settings-php"]);
    assert_eq!(
        report.messages.last().unwrap(),
        "Created minimal env and settings file for dev system."
    );
    assert!(runner.commands().is_empty());
}

#[test]
fn init_dev_refuses_existing_settings() {
    let project = Project::new();
    project
        .write("private/scaffold/default.settings.php.append", "")
        .write("web/sites/default/default.settings.php", "")
        .write(".env", "PROJECT_NAME=\"other\"\n");

    let err = init_dev::run(&project.dev_context(), &FakeRunner::new()).unwrap_err();
    assert_eq!(err.code.as_str(), "precondition.violation");
    assert_eq!(err.details["gate"], "file_absent:.env");
    assert_eq!(project.read(".env"), "PROJECT_NAME=\"other\"\n");
}

#[test]
fn init_dev_outside_dev_tier_is_refused() {
    let project = Project::new();
    let ctx = kickoff::context::ProjectContext::for_root(
        &project.root,
        "/user/home/demo/public_html",
        "web01",
        kickoff::config::KickoffConfig::default(),
    )
    .unwrap();

    let err = init_dev::run(&ctx, &FakeRunner::new()).unwrap_err();
    assert_eq!(err.code.as_str(), "precondition.violation");
    assert_eq!(err.details["gate"], "tier");
}

#[test]
fn install_runs_once() {
    let project = Project::new().initialized();
    let files_dir = project.path("web/sites/default/files");
    let runner = FakeRunner::new().on("site:install", move |_| common::create_dir(&files_dir));

    let report = install::run(&project.dev_context(), &runner).unwrap();
    assert_eq!(&report.completed[..3], &["make-writable", "site-install", "make-writable-again"]);
    assert_eq!(report.messages.last().unwrap(), "Site demo was created.");
    assert!(runner.ran("--site-name=demo") == 1);
    assert!(runner.ran("locale:import de") >= 1);

    // The files directory now exists, so a second install is refused.
    let err = install::run(&project.dev_context(), &runner).unwrap_err();
    assert_eq!(err.code.as_str(), "precondition.violation");
    assert_eq!(runner.ran("site:install"), 1);
}

#[test]
fn install_failure_reports_progress() {
    let project = Project::new().initialized();
    let runner = FakeRunner::new().fail("cache:rebuild");

    let err = install::run(&project.dev_context(), &runner).unwrap_err();
    assert_eq!(err.code.as_str(), "step.failed");

    let details = err.step_details().unwrap();
    assert_eq!(details.step, "cache-rebuild");
    assert_eq!(details.step_index, 3);
    assert_eq!(details.completed_steps.len(), 3);
    assert_eq!(runner.ran("create-default-content"), 0);
}

#[test]
fn init_git_pushes_initial_commit() {
    let project = Project::new().initialized();
    project.mkdir("web/sites/default/files");

    let runner = FakeRunner::new();
    init_git::run(&project.dev_context(), &runner).unwrap();

    assert_eq!(
        runner.commands()[..2],
        [
            "git init".to_string(),
            "git remote add origin git@bitbucket.org:webtourismus/demo.git".to_string()
        ]
    );
    assert_eq!(runner.position("--message=Initial commit"), Some(2));
    assert_eq!(runner.position("git push origin master"), Some(3));
}

#[test]
fn init_git_refuses_existing_repository() {
    let project = Project::new().installed();
    let err = init_git::run(&project.dev_context(), &FakeRunner::new()).unwrap_err();
    assert_eq!(err.details["gate"], "dir_absent:.git");
}

#[test]
fn update_merges_upstream_then_updates() {
    let project = Project::new().installed();
    project.write(
        "composer.json",
        r#"{"name": "webtourismus/demo", "require": {"drupal/core": "^10.1", "drupal/gin": "^3.0"}}"#,
    );
    fs::create_dir_all(project.tmp.path().join("starterkit")).unwrap();
    fs::write(
        project.tmp.path().join("starterkit/composer.json"),
        r#"{"require": {"drupal/core": "^10.2", "drupal/pathauto": "^1.12"}}"#,
    )
    .unwrap();

    let runner = FakeRunner::in_sync();
    let report = update::run(&project.dev_context(), &runner).unwrap();

    let manifest: serde_json::Value =
        serde_json::from_str(&project.read("composer.json")).unwrap();
    assert_eq!(manifest["require"]["drupal/core"], "^10.2");
    assert_eq!(manifest["require"]["drupal/gin"], "^3.0");
    assert_eq!(manifest["require"]["drupal/pathauto"], "^1.12");
    assert_eq!(manifest["name"], "webtourismus/demo");

    assert_eq!(report.completed[0], "merge-manifest");
    assert!(runner.position("update --no-interaction") < runner.position("updatedb -y"));
}

#[test]
fn update_refuses_when_behind() {
    let project = Project::new().installed();
    project.write("composer.json", "{}");
    fs::create_dir_all(project.tmp.path().join("starterkit")).unwrap();
    fs::write(project.tmp.path().join("starterkit/composer.json"), "{}").unwrap();

    let runner = FakeRunner::new().respond(
        "git status",
        kickoff::executor::CommandOutput::ok("Your branch is behind 'origin/master' by 1 commit."),
    );
    let err = update::run(&project.dev_context(), &runner).unwrap_err();
    assert_eq!(err.code.as_str(), "drift.conflict");
    assert_eq!(runner.ran("composer"), 0);
}
