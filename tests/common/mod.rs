#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use kickoff::config::KickoffConfig;
use kickoff::context::ProjectContext;
use kickoff::error::{Error, Result};
use kickoff::executor::{CommandOutput, CommandRunner, CommandSpec};
use kickoff::prompt::Prompter;
use tempfile::TempDir;

pub const DEV_PATH: &str = "/var/www/vhosts/dev1.webtourismus.at/demo.dev1.webtourismus.at";

pub const UP_TO_DATE: &str = "On branch master\nYour branch is up to date with 'origin/master'.\n";
pub const CONFIG_CLEAN: &str = "[notice] No differences between DB and sync directory.\n";

type Effect = Box<dyn Fn(&CommandSpec)>;

/// Records every command and answers from a script keyed by substrings of
/// the rendered command line. Unscripted commands succeed with no output.
#[derive(Default)]
pub struct FakeRunner {
    pub log: RefCell<Vec<String>>,
    outputs: Vec<(String, CommandOutput)>,
    effects: Vec<(String, Effect)>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean repository and configuration.
    pub fn in_sync() -> Self {
        Self::new()
            .respond("git status", CommandOutput::ok(UP_TO_DATE))
            .respond("config:status", CommandOutput::ok(CONFIG_CLEAN))
    }

    pub fn respond(mut self, needle: &str, output: CommandOutput) -> Self {
        self.outputs.push((needle.to_string(), output));
        self
    }

    pub fn fail(self, needle: &str) -> Self {
        self.respond(needle, CommandOutput::failed(1, format!("{} failed", needle)))
    }

    pub fn on(mut self, needle: &str, effect: impl Fn(&CommandSpec) + 'static) -> Self {
        self.effects.push((needle.to_string(), Box::new(effect)));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn ran(&self, needle: &str) -> usize {
        self.log.borrow().iter().filter(|c| c.contains(needle)).count()
    }

    /// Position of the first command containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.log.borrow().iter().position(|c| c.contains(needle))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> CommandOutput {
        let line = spec.display();
        self.log.borrow_mut().push(line.clone());

        for (needle, effect) in &self.effects {
            if line.contains(needle.as_str()) {
                effect(spec);
            }
        }

        self.outputs
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::ok(""))
    }

    fn capture(&self, spec: &CommandSpec) -> CommandOutput {
        self.run(spec)
    }
}

/// Answers prompts from queues. An exhausted queue behaves like a
/// non-interactive terminal.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
    confirms: RefCell<VecDeque<bool>>,
    pub shown: RefCell<Vec<String>>,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers(self, answers: &[&str]) -> Self {
        self.answers
            .borrow_mut()
            .extend(answers.iter().map(|a| a.to_string()));
        self
    }

    pub fn confirms(self, confirms: &[bool]) -> Self {
        self.confirms.borrow_mut().extend(confirms.iter().copied());
        self
    }

    fn next_answer(&self, question: &str, default: Option<&str>) -> Result<String> {
        self.asked.borrow_mut().push(question.to_string());
        match self.answers.borrow_mut().pop_front() {
            Some(answer) if answer.is_empty() => Ok(default.unwrap_or_default().to_string()),
            Some(answer) => Ok(answer),
            None => default
                .map(str::to_string)
                .ok_or_else(|| Error::validation_missing_argument(vec![question.to_string()])),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &str, default: Option<&str>) -> Result<String> {
        self.next_answer(question, default)
    }

    fn secret(&self, question: &str, default: Option<&str>) -> Result<String> {
        self.next_answer(question, default)
    }

    fn confirm(&self, _question: &str, default: bool) -> Result<bool> {
        Ok(self.confirms.borrow_mut().pop_front().unwrap_or(default))
    }

    fn show(&self, text: &str) {
        self.shown.borrow_mut().push(text.to_string());
    }
}

/// A scratch dev project: `<tmp>/demo`, with `<tmp>/.env` as the shared file.
pub struct Project {
    pub tmp: TempDir,
    pub root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("demo");
        fs::create_dir_all(&root).unwrap();
        fs::write(tmp.path().join(".env"), "ENV=\"dev1\"\n").unwrap();
        Self { tmp, root }
    }

    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    pub fn mkdir(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.root.join(relative)).unwrap();
        self
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative)).unwrap()
    }

    /// Context classified as the `demo` project of the `dev1` family.
    pub fn dev_context(&self) -> ProjectContext {
        ProjectContext::for_root(&self.root, DEV_PATH, "dev1", KickoffConfig::default()).unwrap()
    }

    /// Fresh checkout that went through init-dev.
    pub fn initialized(self) -> Self {
        self.write(".env", "PROJECT_NAME=\"demo\"\nDB_NAME=\"dev1_demo\"\n")
            .write("web/sites/default/settings.php", "<?php\n");
        self
    }

    /// Installed site with a repository.
    pub fn installed(self) -> Self {
        let project = self.initialized();
        project.mkdir("web/sites/default/files").mkdir(".git");
        project
    }
}

pub fn create_dir(path: &Path) {
    fs::create_dir_all(path).unwrap();
}
