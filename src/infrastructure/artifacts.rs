//! File-backed artifact store
//!
//! One artifact per logical file under the data directory; every save
//! overwrites the previous content wholesale. Example resources used in
//! prompts live in a separate read-only resources directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::outbound::{ArtifactError, ArtifactStorePort};
use crate::domain::entities::{Lore, PddlDomain, PddlProblem, StoryGraph};

pub struct FileArtifactStore {
    data_dir: PathBuf,
    resources_dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(data_dir: impl Into<PathBuf>, resources_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            resources_dir: resources_dir.into(),
        }
    }

    fn lore_path(&self) -> PathBuf {
        self.data_dir.join("lore.json")
    }

    fn domain_path(&self) -> PathBuf {
        self.data_dir.join("domain.pddl")
    }

    fn problem_path(&self) -> PathBuf {
        self.data_dir.join("problem.pddl")
    }

    fn story_path(&self) -> PathBuf {
        self.data_dir.join("story.json")
    }

    fn plan_path(&self) -> PathBuf {
        self.data_dir.join("plan.txt")
    }

    fn frontend_path(&self) -> PathBuf {
        self.data_dir.join("index.html")
    }

    async fn read(&self, path: &Path) -> Result<String, ArtifactError> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(ArtifactError::Io(e)),
        }
    }

    async fn write(&self, path: &Path, content: &str) -> Result<PathBuf, ArtifactError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "artifact written");
        Ok(path.to_path_buf())
    }
}

#[async_trait]
impl ArtifactStorePort for FileArtifactStore {
    async fn load_lore(&self, path: Option<&Path>) -> Result<Lore, ArtifactError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| self.lore_path());
        let content = self.read(&path).await?;
        Lore::from_legacy_json(&content).map_err(|e| ArtifactError::Malformed {
            path,
            reason: e.to_string(),
        })
    }

    async fn save_lore(&self, lore: &Lore) -> Result<PathBuf, ArtifactError> {
        let path = self.lore_path();
        let content = serde_json::to_string_pretty(lore).map_err(|e| ArtifactError::Malformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.write(&path, &content).await
    }

    async fn save_domain(&self, domain: &PddlDomain) -> Result<PathBuf, ArtifactError> {
        self.write(&self.domain_path(), &domain.content).await
    }

    async fn load_domain(&self) -> Result<PddlDomain, ArtifactError> {
        let path = self.domain_path();
        let content = self.read(&path).await?;
        PddlDomain::parse(content).map_err(|e| ArtifactError::Malformed {
            path,
            reason: e.to_string(),
        })
    }

    async fn save_problem(&self, problem: &PddlProblem) -> Result<PathBuf, ArtifactError> {
        self.write(&self.problem_path(), &problem.content).await
    }

    async fn load_problem(&self) -> Result<PddlProblem, ArtifactError> {
        let path = self.problem_path();
        let content = self.read(&path).await?;
        PddlProblem::parse(content).map_err(|e| ArtifactError::Malformed {
            path,
            reason: e.to_string(),
        })
    }

    async fn save_story(&self, story: &StoryGraph) -> Result<PathBuf, ArtifactError> {
        let path = self.story_path();
        let content = serde_json::to_string_pretty(story).map_err(|e| ArtifactError::Malformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.write(&path, &content).await
    }

    async fn load_story(&self) -> Result<StoryGraph, ArtifactError> {
        let path = self.story_path();
        let content = self.read(&path).await?;
        let raw: StoryGraph =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        // Re-run the graph invariants on anything read back from disk
        StoryGraph::new(
            raw.title,
            raw.description,
            raw.initial_state,
            raw.states,
            raw.metadata,
        )
        .map_err(|e| ArtifactError::Malformed {
            path,
            reason: e.to_string(),
        })
    }

    async fn save_plan(&self, steps: &[String]) -> Result<PathBuf, ArtifactError> {
        let mut content = steps.join("\n");
        content.push('\n');
        self.write(&self.plan_path(), &content).await
    }

    async fn load_plan(&self) -> Result<Vec<String>, ArtifactError> {
        let content = self.read(&self.plan_path()).await?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(';'))
            .map(String::from)
            .collect())
    }

    async fn save_frontend(&self, code: &str) -> Result<PathBuf, ArtifactError> {
        self.write(&self.frontend_path(), code).await
    }

    async fn load_example_domain(&self) -> Result<String, ArtifactError> {
        self.read(&self.resources_dir.join("valid_domain.pddl")).await
    }

    async fn load_example_problem(&self) -> Result<String, ArtifactError> {
        self.read(&self.resources_dir.join("valid_problem.pddl")).await
    }

    async fn load_example_story(&self) -> Result<String, ArtifactError> {
        self.read(&self.resources_dir.join("story_example.json")).await
    }
}
