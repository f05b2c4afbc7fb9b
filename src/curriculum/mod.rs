use crate::progress::{ExtraTopicId, StepId, Totals};
use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use url::Url;

const EMBEDDED_CURRICULUM: &str = include_str!("../../assets/curriculum.json");
const TOPIC_ID_PATTERN: &str = r"^[a-z0-9]+(-[a-z0-9]+)*$";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curriculum {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<MainStep>,
    pub extra_categories: Vec<ExtraCategory>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainStep {
    pub id: StepId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraCategory {
    pub category: String,
    pub topics: Vec<ExtraTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraTopic {
    pub id: ExtraTopicId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

impl Curriculum {
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_CURRICULUM).context("Failed to parse embedded curriculum")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read curriculum file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid curriculum file: {}", path.display()))
    }

    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    fn parse(content: &str) -> Result<Self> {
        let curriculum: Self =
            serde_json::from_str(content).context("Failed to parse curriculum JSON")?;
        curriculum.validate()?;

        Ok(curriculum)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((position, step)) = self
            .steps
            .iter()
            .enumerate()
            .find(|(position, step)| step.id as usize != position + 1)
        {
            bail!(
                "Main step ids must run 1..N in order: position {} has id {}",
                position + 1,
                step.id
            );
        }

        let pattern = Regex::new(TOPIC_ID_PATTERN).context("Failed to compile topic id pattern")?;
        let mut seen = HashSet::new();
        for topic in self.topics() {
            if !pattern.is_match(&topic.id) {
                bail!("Extra topic id must be a lowercase slug: {}", topic.id);
            }
            if !seen.insert(topic.id.as_str()) {
                bail!("Duplicate extra topic id: {}", topic.id);
            }
        }

        self.steps
            .iter()
            .filter_map(|step| step.url.as_deref())
            .chain(self.channels.iter().map(|channel| channel.url.as_str()))
            .try_for_each(|raw| {
                Url::parse(raw)
                    .map(|_| ())
                    .with_context(|| format!("Invalid resource URL: {raw}"))
            })
    }

    pub fn topics(&self) -> impl Iterator<Item = &ExtraTopic> {
        self.extra_categories
            .iter()
            .flat_map(|category| category.topics.iter())
    }

    pub fn totals(&self) -> Totals {
        Totals {
            steps: self.steps.len(),
            extras: self.topics().count(),
        }
    }

    pub fn step(&self, id: StepId) -> Option<&MainStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn topic(&self, id: &str) -> Option<&ExtraTopic> {
        self.topics().find(|topic| topic.id == id)
    }

    pub fn contains_step(&self, id: StepId) -> bool {
        self.step(id).is_some()
    }

    pub fn contains_extra(&self, id: &str) -> bool {
        self.topic(id).is_some()
    }

    pub fn check_step(&self, id: StepId, allow_unknown: bool) -> Result<()> {
        if !allow_unknown && !self.contains_step(id) {
            bail!(
                "Unknown main step: {id}. Valid ids: 1..={}",
                self.steps.len()
            );
        }

        Ok(())
    }

    pub fn check_extra(&self, id: &str, allow_unknown: bool) -> Result<()> {
        if !allow_unknown && !self.contains_extra(id) {
            bail!("Unknown extra topic: {id}. Run `roadmap show` to list topic ids");
        }

        Ok(())
    }
}
