//! In-process fakes for the pipeline's collaborators.

use crate::api::{AskAsync, ChatPrompt};
use crate::error::LedgerError;
use crate::images::ImageHost;
use crate::ledger::LedgerStore;
use crate::models::{GeneratedArtifact, ProcessedRecord};
use crate::publish::Publisher;
use crate::scrapers::PageSource;
use chrono::Local;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::error::Error;
use std::path::{Path, PathBuf};

/// Replies with a fixed script of results, one per call.
#[derive(Debug, Default)]
pub struct ScriptedAsk {
    script: RefCell<VecDeque<Result<String, String>>>,
    prompts: RefCell<Vec<ChatPrompt>>,
}

impl ScriptedAsk {
    pub fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: RefCell::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn prompts(&self) -> Vec<ChatPrompt> {
        self.prompts.borrow().clone()
    }
}

impl AskAsync for ScriptedAsk {
    type Response = String;

    async fn ask(&self, prompt: &ChatPrompt) -> Result<String, Box<dyn Error>> {
        self.prompts.borrow_mut().push(prompt.clone());
        match self.script.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(e.into()),
            None => Err("script exhausted".into()),
        }
    }
}

/// Replies by looking at which call is being made instead of call order.
///
/// Titles come back unchanged, bodies get a marker prefix and one `## `
/// section, tags are a fixed pair and alt text is constant.
#[derive(Debug, Default)]
pub struct EchoAsk {
    calls: Cell<usize>,
}

impl EchoAsk {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl AskAsync for EchoAsk {
    type Response = String;

    async fn ask(&self, prompt: &ChatPrompt) -> Result<String, Box<dyn Error>> {
        self.calls.set(self.calls.get() + 1);
        let field = |name: &str| {
            prompt
                .user
                .lines()
                .find_map(|l| l.strip_prefix(name))
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        if prompt.user.contains("JSON array") {
            Ok("[\"업계동향\", \"미래전망\"]".to_string())
        } else if prompt.user.contains("alt text") {
            Ok("기사 사진".to_string())
        } else if prompt.user.starts_with("Original title:") {
            Ok(field("Original title:"))
        } else {
            Ok(format!(
                "##### **요약**<br>**설명**\n\n재작성: {}\n\n## 향후 전망\n\n전망 문단",
                field("Title:")
            ))
        }
    }
}

/// Serves canned pages by URL; unknown URLs fail.
#[derive(Debug, Default)]
pub struct FakeSource {
    pages: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl PageSource for FakeSource {
    async fn fetch_text(&self, url: &str) -> Result<String, Box<dyn Error>> {
        self.requests.borrow_mut().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| format!("404 Not Found: {url}").into())
    }
}

/// Pretends to re-host images, failing for URLs marked as broken.
#[derive(Debug, Default)]
pub struct FakeImageHost {
    broken: HashSet<String>,
    uploads: RefCell<Vec<String>>,
}

impl FakeImageHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.borrow().clone()
    }
}

impl ImageHost for FakeImageHost {
    async fn upload(&self, image_url: &str) -> Result<String, Box<dyn Error>> {
        if self.broken.contains(image_url) {
            return Err(format!("upload rejected: {image_url}").into());
        }
        let mut uploads = self.uploads.borrow_mut();
        uploads.push(image_url.to_string());
        Ok(format!("https://images.test/{}/public", uploads.len()))
    }
}

/// Records every submission; optionally fails them all.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    fail: bool,
    submitted: RefCell<Vec<(String, PathBuf)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<(String, PathBuf)> {
        self.submitted.borrow().clone()
    }
}

impl Publisher for RecordingPublisher {
    async fn submit(&self, artifact: &GeneratedArtifact, document: &Path) -> Result<(), Box<dyn Error>> {
        self.submitted
            .borrow_mut()
            .push((artifact.title.clone(), document.to_path_buf()));
        if self.fail {
            Err("publisher offline".into())
        } else {
            Ok(())
        }
    }
}

/// In-memory [`LedgerStore`].
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: RefCell<Vec<ProcessedRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProcessedRecord> {
        self.records.borrow().clone()
    }
}

impl LedgerStore for MemoryLedger {
    fn contains_url(&self, url: &str) -> Result<bool, LedgerError> {
        Ok(self.records.borrow().iter().any(|r| r.url == url))
    }

    fn contains_fingerprint(&self, fingerprint: &str) -> Result<bool, LedgerError> {
        Ok(self
            .records
            .borrow()
            .iter()
            .any(|r| r.fingerprint == fingerprint))
    }

    fn record(&self, url: &str, title: &str, fingerprint: &str) -> Result<(), LedgerError> {
        let mut records = self.records.borrow_mut();
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = ProcessedRecord {
            id: next_id,
            url: url.to_string(),
            title: title.to_string(),
            fingerprint: fingerprint.to_string(),
            processed_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        // Replacing deletes the old row and inserts a new one, like SQLite's
        // INSERT OR REPLACE.
        records.retain(|r| r.url != url);
        records.push(record);
        Ok(())
    }

    fn count(&self) -> Result<usize, LedgerError> {
        Ok(self.records.borrow().len())
    }

    fn get(&self, url: &str) -> Result<Option<ProcessedRecord>, LedgerError> {
        Ok(self.records.borrow().iter().find(|r| r.url == url).cloned())
    }
}
