//! Quest pipeline - the generate / persist / validate / reflect loop
//!
//! Phase 1 drives the planner loop until the pair validates or the
//! reflection budget runs dry. Phase 2 turns the validated quest into a
//! story graph and a playable frontend. Everything is injected; the
//! pipeline owns no ambient state and one instance serves exactly one run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::outbound::{
    ArtifactError, ArtifactStorePort, LlmPort, PlannerError, PlannerPort,
};
use crate::application::services::frontend_service::{FrontendError, FrontendService};
use crate::application::services::generative_service::GenerativeService;
use crate::application::services::pddl_generation_service::{PddlError, PddlGenerationService};
use crate::application::services::reflection_service::ReflectionService;
use crate::application::services::story_service::{StoryError, StoryService};
use crate::domain::entities::{Lore, PddlDomain, PddlProblem};
use crate::domain::value_objects::ValidationResult;
use crate::domain::DomainError;

/// Knobs for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Ceiling on reflection cycles before giving up
    pub max_iterations: u32,
    /// Search strategy handed to the planner
    pub search_strategy: String,
    /// Wall-clock budget per planner invocation
    pub planner_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            search_strategy: "astar(blind())".to_string(),
            planner_timeout: Duration::from_secs(300),
        }
    }
}

/// What phase 1 hands to downstream consumers
#[derive(Debug)]
pub struct PhaseOneOutcome {
    pub domain: PddlDomain,
    pub problem: PddlProblem,
    pub validation: ValidationResult,
    /// Reflection cycles actually spent
    pub reflections: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("PDDL generation failed: {0}")]
    Pddl(#[from] PddlError),
    #[error("planner failure: {0}")]
    Planner(#[from] PlannerError),
    #[error("artifact store failure: {0}")]
    Artifact(#[from] ArtifactError),
    /// Structural inconsistency caught before a planner invocation
    #[error("domain/problem pair inconsistent: {0}")]
    Inconsistent(#[from] DomainError),
    /// The reflection budget ran out; carries the final planner error verbatim
    #[error("validation failed after {iterations} reflection cycles; last error: {last_error}")]
    ValidationExhausted { iterations: u32, last_error: String },
    #[error("story generation failed: {0}")]
    Story(#[from] StoryError),
    #[error("frontend generation failed: {0}")]
    Frontend(#[from] FrontendError),
}

/// The orchestration loop and its collaborators
pub struct QuestPipeline<L: LlmPort> {
    planner: Arc<dyn PlannerPort>,
    artifacts: Arc<dyn ArtifactStorePort>,
    pddl_generator: PddlGenerationService<L>,
    reflection: ReflectionService<L>,
    story_builder: StoryService<L>,
    frontend: FrontendService<L>,
    config: PipelineConfig,
}

impl<L: LlmPort> QuestPipeline<L> {
    pub fn new(
        generative: Arc<GenerativeService<L>>,
        planner: Arc<dyn PlannerPort>,
        artifacts: Arc<dyn ArtifactStorePort>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            planner,
            pddl_generator: PddlGenerationService::new(generative.clone(), artifacts.clone()),
            reflection: ReflectionService::new(generative.clone(), artifacts.clone()),
            story_builder: StoryService::new(generative.clone(), artifacts.clone()),
            frontend: FrontendService::new(generative),
            artifacts,
            config,
        }
    }

    /// Phase 1: generate the PDDL pair and refine it until the planner
    /// finds a solution or the reflection budget is exhausted.
    ///
    /// Each cycle persists the pair before validation so the planner always
    /// sees the current artifacts; iterations are strictly sequential.
    pub async fn run_phase1(&self, lore: &Lore) -> Result<PhaseOneOutcome, PipelineError> {
        tracing::info!(title = %lore.title, "starting phase 1: quest plan generation");

        let (mut domain, mut problem) = self.pddl_generator.generate(lore).await?;
        let mut domain_path = self.artifacts.save_domain(&domain).await?;
        let mut problem_path = self.artifacts.save_problem(&problem).await?;

        let mut reflections: u32 = 0;
        loop {
            problem.check_domain(&domain)?;

            tracing::info!(
                validation = reflections + 1,
                budget = self.config.max_iterations,
                "validating PDDL pair"
            );
            let validation = self
                .planner
                .validate(
                    &domain_path,
                    &problem_path,
                    &self.config.search_strategy,
                    self.config.planner_timeout,
                )
                .await?;

            if validation.success() {
                tracing::info!(
                    elapsed_ms = validation.elapsed.as_millis() as u64,
                    plan_steps = validation.plan.as_ref().map(|p| p.len()).unwrap_or(0),
                    reflections,
                    "PDDL validation succeeded"
                );
                if let Some(plan) = &validation.plan {
                    self.artifacts.save_plan(plan).await?;
                }
                return Ok(PhaseOneOutcome {
                    domain,
                    problem,
                    validation,
                    reflections,
                });
            }

            tracing::warn!(
                error = %validation.error_message,
                reflections,
                "PDDL validation failed"
            );

            if reflections >= self.config.max_iterations {
                tracing::error!(
                    iterations = reflections,
                    "maximum reflection iterations reached"
                );
                return Err(PipelineError::ValidationExhausted {
                    iterations: reflections,
                    last_error: validation.error_message,
                });
            }

            reflections += 1;
            let (fixed_domain, fixed_problem) = self
                .reflection
                .reflect(lore, &domain, &problem, &validation)
                .await?;
            domain = fixed_domain;
            problem = fixed_problem;
            domain_path = self.artifacts.save_domain(&domain).await?;
            problem_path = self.artifacts.save_problem(&problem).await?;
        }
    }

    /// Phase 2: build (or reuse) the story graph and emit the frontend.
    /// Returns the path of the written frontend artifact.
    pub async fn run_phase2(&self, lore: &Lore) -> Result<PathBuf, PipelineError> {
        tracing::info!("starting phase 2: interactive story generation");

        let story = match self.artifacts.load_story().await {
            Ok(story) => {
                tracing::info!(states = story.states.len(), "loaded existing story");
                story
            }
            Err(_) => {
                tracing::info!("no existing story found, generating a new one");
                let domain = self.artifacts.load_domain().await?;
                let problem = self.artifacts.load_problem().await?;
                let plan = match self.artifacts.load_plan().await {
                    Ok(plan) => plan,
                    Err(e) => {
                        tracing::warn!(error = %e, "no plan artifact, generating story without plan");
                        Vec::new()
                    }
                };

                let story = self.story_builder.build(lore, &domain, &problem, &plan).await?;
                self.artifacts.save_story(&story).await?;
                tracing::info!(states = story.states.len(), "story generated and saved");
                story
            }
        };

        let code = self.frontend.generate(&story).await?;
        let path = self.artifacts.save_frontend(&code).await?;
        tracing::info!(path = %path.display(), "frontend generated and saved");
        Ok(path)
    }

    /// Phase 1 followed by phase 2
    pub async fn run_full(&self, lore: &Lore) -> Result<PathBuf, PipelineError> {
        let outcome = self.run_phase1(lore).await?;
        tracing::info!(reflections = outcome.reflections, "phase 1 completed");
        let path = self.run_phase2(lore).await?;
        tracing::info!("pipeline completed");
        Ok(path)
    }

    /// Environment check: returns human-readable issues, empty when ready
    pub async fn check_requirements(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.planner.check_installation().await {
            issues.push("planner is not properly installed".to_string());
        }
        if let Err(e) = self.artifacts.load_example_domain().await {
            issues.push(format!("example domain unavailable: {e}"));
        }
        if let Err(e) = self.artifacts.load_example_problem().await {
            issues.push(format!("example problem unavailable: {e}"));
        }
        if let Err(e) = self.artifacts.load_example_story().await {
            issues.push(format!("example story unavailable: {e}"));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::application::ports::outbound::{
        CompletionRequest, CompletionResponse, LlmError,
    };
    use crate::domain::entities::StoryGraph;

    /// LLM stub that replays a queue of canned responses
    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
        calls: Mutex<u32>,
    }

    impl ScriptedLlm {
        fn repeating(response: &str, times: usize) -> Self {
            Self {
                responses: Mutex::new(
                    std::iter::repeat(response.to_string()).take(times).collect(),
                ),
                calls: Mutex::new(0),
            }
        }

        fn sequence(responses: Vec<String>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl LlmPort for ScriptedLlm {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            *self.calls.lock().unwrap() += 1;
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted LLM ran out of responses");
            Ok(CompletionResponse {
                content,
                model: "scripted".to_string(),
                tokens_used: 0,
            })
        }
    }

    /// Planner stub that replays a queue of canned verdicts
    struct ScriptedPlanner {
        verdicts: Mutex<VecDeque<ValidationResult>>,
        calls: Mutex<u32>,
    }

    impl ScriptedPlanner {
        fn new(verdicts: Vec<ValidationResult>) -> Self {
            Self {
                verdicts: Mutex::new(verdicts.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PlannerPort for ScriptedPlanner {
        async fn validate(
            &self,
            _domain_path: &Path,
            _problem_path: &Path,
            _search_strategy: &str,
            _timeout: Duration,
        ) -> Result<ValidationResult, PlannerError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self
                .verdicts
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted planner ran out of verdicts"))
        }

        async fn check_installation(&self) -> bool {
            true
        }
    }

    /// In-memory artifact store
    #[derive(Default)]
    struct MemoryStore {
        domain: Mutex<Option<PddlDomain>>,
        problem: Mutex<Option<PddlProblem>>,
        story: Mutex<Option<StoryGraph>>,
        plan: Mutex<Option<Vec<String>>>,
        frontend: Mutex<Option<String>>,
    }

    #[async_trait]
    impl ArtifactStorePort for MemoryStore {
        async fn load_lore(&self, _path: Option<&Path>) -> Result<Lore, ArtifactError> {
            Err(ArtifactError::NotFound(PathBuf::from("/mem/lore.json")))
        }

        async fn save_lore(&self, _lore: &Lore) -> Result<PathBuf, ArtifactError> {
            Ok(PathBuf::from("/mem/lore.json"))
        }

        async fn save_domain(&self, domain: &PddlDomain) -> Result<PathBuf, ArtifactError> {
            *self.domain.lock().unwrap() = Some(domain.clone());
            Ok(PathBuf::from("/mem/domain.pddl"))
        }

        async fn load_domain(&self) -> Result<PddlDomain, ArtifactError> {
            self.domain
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ArtifactError::NotFound(PathBuf::from("/mem/domain.pddl")))
        }

        async fn save_problem(&self, problem: &PddlProblem) -> Result<PathBuf, ArtifactError> {
            *self.problem.lock().unwrap() = Some(problem.clone());
            Ok(PathBuf::from("/mem/problem.pddl"))
        }

        async fn load_problem(&self) -> Result<PddlProblem, ArtifactError> {
            self.problem
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ArtifactError::NotFound(PathBuf::from("/mem/problem.pddl")))
        }

        async fn save_story(&self, story: &StoryGraph) -> Result<PathBuf, ArtifactError> {
            *self.story.lock().unwrap() = Some(story.clone());
            Ok(PathBuf::from("/mem/story.json"))
        }

        async fn load_story(&self) -> Result<StoryGraph, ArtifactError> {
            self.story
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ArtifactError::NotFound(PathBuf::from("/mem/story.json")))
        }

        async fn save_plan(&self, steps: &[String]) -> Result<PathBuf, ArtifactError> {
            *self.plan.lock().unwrap() = Some(steps.to_vec());
            Ok(PathBuf::from("/mem/plan.txt"))
        }

        async fn load_plan(&self) -> Result<Vec<String>, ArtifactError> {
            self.plan
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ArtifactError::NotFound(PathBuf::from("/mem/plan.txt")))
        }

        async fn save_frontend(&self, code: &str) -> Result<PathBuf, ArtifactError> {
            *self.frontend.lock().unwrap() = Some(code.to_string());
            Ok(PathBuf::from("/mem/index.html"))
        }

        async fn load_example_domain(&self) -> Result<String, ArtifactError> {
            Ok("(define (domain example))".to_string())
        }

        async fn load_example_problem(&self) -> Result<String, ArtifactError> {
            Ok("(define (problem example))".to_string())
        }

        async fn load_example_story(&self) -> Result<String, ArtifactError> {
            Ok("{}".to_string())
        }
    }

    const PDDL_RESPONSE: &str = "<DOMAIN_PDDL>\n(define (domain quest))\n</DOMAIN_PDDL>\n\
                                 <PROBLEM_PDDL>\n(define (problem quest-run))\n</PROBLEM_PDDL>";

    fn failed(msg: &str) -> ValidationResult {
        ValidationResult::failed(msg, Duration::from_millis(10))
    }

    fn solved() -> ValidationResult {
        ValidationResult::solved(
            vec!["(unlock door)".to_string(), "(enter vault)".to_string()],
            Duration::from_millis(10),
        )
    }

    fn pipeline(
        llm: ScriptedLlm,
        planner: Arc<ScriptedPlanner>,
        store: Arc<MemoryStore>,
        max_iterations: u32,
    ) -> QuestPipeline<ScriptedLlm> {
        let generative = Arc::new(GenerativeService::new(llm));
        QuestPipeline::new(
            generative,
            planner,
            store,
            PipelineConfig {
                max_iterations,
                ..PipelineConfig::default()
            },
        )
    }

    fn lore() -> Lore {
        Lore::new("Vault Quest", "desc", "init", "goal", "world")
    }

    #[tokio::test]
    async fn test_exhaustion_after_exact_reflection_budget_surfaces_last_error() {
        // ceiling 5 reflections: 6 validations, 6 LLM calls (1 gen + 5 reflect)
        let planner = Arc::new(ScriptedPlanner::new(
            (1..=6).map(|i| failed(&format!("err-{i}"))).collect(),
        ));
        let store = Arc::new(MemoryStore::default());
        let pipeline = pipeline(
            ScriptedLlm::repeating(PDDL_RESPONSE, 6),
            planner.clone(),
            store,
            5,
        );

        let err = pipeline.run_phase1(&lore()).await.unwrap_err();
        match err {
            PipelineError::ValidationExhausted {
                iterations,
                last_error,
            } => {
                assert_eq!(iterations, 5);
                assert_eq!(last_error, "err-6");
            }
            other => panic!("expected ValidationExhausted, got {other:?}"),
        }
        assert_eq!(planner.calls(), 6);
    }

    #[tokio::test]
    async fn test_success_on_third_validation_takes_two_reflections() {
        let planner = Arc::new(ScriptedPlanner::new(vec![
            failed("missing predicate"),
            failed("goal unreachable"),
            solved(),
        ]));
        let store = Arc::new(MemoryStore::default());
        let pipeline = pipeline(
            ScriptedLlm::repeating(PDDL_RESPONSE, 3),
            planner.clone(),
            store.clone(),
            5,
        );

        let outcome = pipeline.run_phase1(&lore()).await.unwrap();
        assert_eq!(outcome.reflections, 2);
        assert!(outcome.validation.success());
        assert_eq!(planner.calls(), 3);
        // The winning plan is persisted as an artifact
        assert_eq!(
            store.plan.lock().unwrap().as_deref(),
            Some(&["(unlock door)".to_string(), "(enter vault)".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_immediate_success_performs_no_reflection() {
        let planner = Arc::new(ScriptedPlanner::new(vec![solved()]));
        let store = Arc::new(MemoryStore::default());
        let llm = ScriptedLlm::repeating(PDDL_RESPONSE, 1);
        let pipeline = pipeline(llm, planner.clone(), store, 5);

        let outcome = pipeline.run_phase1(&lore()).await.unwrap();
        assert_eq!(outcome.reflections, 0);
        assert_eq!(planner.calls(), 1);
        // Pair names are derived from the lore title
        assert_eq!(outcome.domain.name, "vault_quest_domain");
        assert_eq!(outcome.problem.name, "vault_quest_problem");
        assert_eq!(outcome.problem.domain_name, outcome.domain.name);
    }

    #[tokio::test]
    async fn test_unextractable_blocks_abort_without_planner_call() {
        let planner = Arc::new(ScriptedPlanner::new(vec![]));
        let store = Arc::new(MemoryStore::default());
        let llm = ScriptedLlm::repeating("no blocks here, sorry", 1);
        let pipeline = pipeline(llm, planner.clone(), store, 5);

        let err = pipeline.run_phase1(&lore()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Pddl(PddlError::MissingBlocks)));
        assert_eq!(planner.calls(), 0);
    }

    #[tokio::test]
    async fn test_phase2_builds_story_and_frontend_from_artifacts() {
        let story_response = r#"<STORY_JSON>{
            "title": "x", "description": "y", "initial_state": "start",
            "states": {
                "start": {"id": "start", "text": "Opening.", "actions": [
                    {"id": "c0", "text": "Onward", "target_state": "end"}
                ]},
                "end": {"id": "end", "text": "Closing.", "actions": []}
            }
        }</STORY_JSON>"#;
        let frontend_response =
            "<FRONTEND_CODE><!DOCTYPE html><html><body>player</body></html></FRONTEND_CODE>";

        let store = Arc::new(MemoryStore::default());
        *store.domain.lock().unwrap() =
            Some(PddlDomain::new("d", "(define (domain d))").unwrap());
        *store.problem.lock().unwrap() =
            Some(PddlProblem::new("p", "d", "(define (problem p))").unwrap());
        *store.plan.lock().unwrap() = Some(vec!["(step one)".to_string()]);

        let planner = Arc::new(ScriptedPlanner::new(vec![]));
        let llm = ScriptedLlm::sequence(vec![
            story_response.to_string(),
            frontend_response.to_string(),
        ]);
        let pipeline = pipeline(llm, planner, store.clone(), 5);

        let path = pipeline.run_phase2(&lore()).await.unwrap();
        assert_eq!(path, PathBuf::from("/mem/index.html"));

        let story = store.story.lock().unwrap().clone().unwrap();
        // Canonical lore values override whatever the model invented
        assert_eq!(story.title, "Vault Quest");
        assert_eq!(
            story.metadata.get("generated_from_lore"),
            Some(&serde_json::json!(true))
        );
        assert!(store.frontend.lock().unwrap().as_ref().unwrap().contains("player"));
    }

    #[tokio::test]
    async fn test_phase2_reuses_existing_story() {
        let store = Arc::new(MemoryStore::default());
        let mut states = std::collections::BTreeMap::new();
        states.insert(
            "start".to_string(),
            crate::domain::entities::StoryState {
                id: "start".to_string(),
                text: "Already written.".to_string(),
                actions: vec![],
                is_terminal: true,
                image_url: None,
                metadata: serde_json::Map::new(),
            },
        );
        *store.story.lock().unwrap() = Some(
            StoryGraph::new("Old", "old", "start", states, serde_json::Map::new()).unwrap(),
        );

        let frontend_response =
            "<FRONTEND_CODE><!DOCTYPE html><html></html></FRONTEND_CODE>";
        // Only the frontend call should hit the LLM
        let llm = ScriptedLlm::sequence(vec![frontend_response.to_string()]);
        let planner = Arc::new(ScriptedPlanner::new(vec![]));
        let pipeline = pipeline(llm, planner, store.clone(), 5);

        pipeline.run_phase2(&lore()).await.unwrap();
        assert!(store.frontend.lock().unwrap().is_some());
        // Story untouched: still the pre-seeded one
        assert_eq!(store.story.lock().unwrap().as_ref().unwrap().title, "Old");
    }
}
