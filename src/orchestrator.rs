//! Application state for one authoring session and the flows that move it.
//!
//! The session lives behind a lock that is never held across a generation call:
//! each flow snapshots what it needs, releases the lock, awaits the generator,
//! then re-acquires the lock to store the result. An epoch counter bumps on every
//! new plan and on clear, so a result that arrives for a discarded plan is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::gemini::{generate_artifact, Artifact, GenerationFailure, Generator};
use crate::models::{Language, LessonPlan, LessonRequest, Presentation, StudentHandout, ValidationErrors};
use crate::persistence::FormStore;
use crate::prompts;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum PlanState {
    Idle,
    Loading,
    Success(LessonPlan),
    Error(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum ArtifactState<T> {
    Empty,
    Loading,
    Ready(T),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub language: Language,
    pub form: LessonRequest,
    pub plan: PlanState,
    pub presentation: ArtifactState<Presentation>,
    pub handout: ArtifactState<StudentHandout>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    epoch: u64,
}

impl Session {
    fn new(language: Language, form: LessonRequest) -> Self {
        Self {
            language,
            form,
            plan: PlanState::Idle,
            presentation: ArtifactState::Empty,
            handout: ArtifactState::Empty,
            updated_at: Utc::now(),
            epoch: 0,
        }
    }

    pub fn current_plan(&self) -> Option<&LessonPlan> {
        match &self.plan {
            PlanState::Success(plan) => Some(plan),
            _ => None,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("{} generation already in progress", .0.noun())]
    Busy(Artifact),
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    #[error("{} result discarded: the lesson plan changed while it was generating", .0.noun())]
    Superseded(Artifact),
}

/// Artifacts derived on demand from the current plan.
trait Derived: DeserializeOwned + Clone + Send + Sync + 'static {
    const ARTIFACT: Artifact;
    fn prompt(plan: &LessonPlan, lang: Language) -> String;
    fn slot(session: &mut Session) -> &mut ArtifactState<Self>;
}

impl Derived for Presentation {
    const ARTIFACT: Artifact = Artifact::Presentation;
    fn prompt(plan: &LessonPlan, lang: Language) -> String { prompts::presentation_prompt(plan, lang) }
    fn slot(session: &mut Session) -> &mut ArtifactState<Self> { &mut session.presentation }
}

impl Derived for StudentHandout {
    const ARTIFACT: Artifact = Artifact::Handout;
    fn prompt(plan: &LessonPlan, lang: Language) -> String { prompts::handout_prompt(plan, lang) }
    fn slot(session: &mut Session) -> &mut ArtifactState<Self> { &mut session.handout }
}

/// Moves a slot out of `Loading` when the flow that set it never reaches its
/// write-back, e.g. the request future was dropped mid-call.
struct LoadingGuard<'a> {
    session: &'a RwLock<Session>,
    artifact: Artifact,
    epoch: u64,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(session: &'a RwLock<Session>, artifact: Artifact, epoch: u64) -> Self {
        Self { session, artifact, epoch, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.session.write();
        if session.epoch != self.epoch {
            return;
        }
        let message = format!("Generation of the {} was interrupted.", self.artifact.noun());
        let reset = match self.artifact {
            Artifact::Plan if session.plan == PlanState::Loading => {
                session.plan = PlanState::Error(message);
                true
            }
            Artifact::Presentation if matches!(session.presentation, ArtifactState::Loading) => {
                session.presentation = ArtifactState::Failed(message);
                true
            }
            Artifact::Handout if matches!(session.handout, ArtifactState::Loading) => {
                session.handout = ArtifactState::Failed(message);
                true
            }
            _ => false,
        };
        if reset {
            session.touch();
            warn!("⚠️ {} generation abandoned before completion", self.artifact.noun());
        }
    }
}

pub struct Controller {
    session: RwLock<Session>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn FormStore>,
}

impl Controller {
    /// Starts a session, restoring the last saved form when there is one.
    pub fn new(generator: Arc<dyn Generator>, store: Arc<dyn FormStore>, language: Language) -> Self {
        let form = store.load().unwrap_or_default();
        Self { session: RwLock::new(Session::new(language, form)), generator, store }
    }

    pub fn snapshot(&self) -> Session {
        self.session.read().clone()
    }

    pub fn saved_form(&self) -> Option<LessonRequest> {
        self.store.load()
    }

    pub fn set_language(&self, language: Language) -> Session {
        let mut session = self.session.write();
        session.language = language;
        session.touch();
        info!("🌐 Language set to {}", language.code());
        session.clone()
    }

    /// Validates the form and generates a new lesson plan, replacing any previous one
    /// along with its presentation and handout.
    pub async fn submit_plan(&self, request: LessonRequest, language: Option<Language>) -> Result<LessonPlan, ControllerError> {
        request.validate()?;

        let (epoch, lang) = {
            let mut session = self.session.write();
            if session.plan == PlanState::Loading {
                return Err(ControllerError::Busy(Artifact::Plan));
            }
            if let Some(lang) = language {
                session.language = lang;
            }
            session.form = request.clone();
            session.plan = PlanState::Loading;
            session.presentation = ArtifactState::Empty;
            session.handout = ArtifactState::Empty;
            session.epoch += 1;
            session.touch();
            (session.epoch, session.language)
        };
        let mut guard = LoadingGuard::new(&self.session, Artifact::Plan, epoch);
        self.store.save(&request);

        let call_id = Uuid::new_v4();
        info!(%call_id, "🚀 Generating lesson plan '{}' ({} min, {})", request.lesson_title, request.duration, lang.code());
        let prompt = prompts::lesson_plan_prompt(&request, lang);
        let result = generate_artifact::<LessonPlan>(self.generator.as_ref(), Artifact::Plan, &prompt, CancellationToken::new()).await;

        guard.disarm();
        let mut session = self.session.write();
        if session.epoch != epoch {
            warn!(%call_id, "Dropping lesson plan result for a cleared session");
            return Err(ControllerError::Superseded(Artifact::Plan));
        }
        session.touch();
        match result {
            Ok(plan) => {
                if plan.stage_minutes() != u64::from(plan.lesson_info.duration) {
                    warn!(%call_id, "Stage durations add up to {} min, lesson is {} min", plan.stage_minutes(), plan.lesson_info.duration);
                }
                info!(%call_id, "✅ Lesson plan generated with {} stages", plan.stages.len());
                session.plan = PlanState::Success(plan.clone());
                Ok(plan)
            }
            Err(e) => {
                session.plan = PlanState::Error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// `Ok(None)` when there is no plan to derive from; no call is made.
    pub async fn generate_presentation(&self) -> Result<Option<Presentation>, ControllerError> {
        self.generate_derived::<Presentation>().await
    }

    /// `Ok(None)` when there is no plan to derive from; no call is made.
    pub async fn generate_handout(&self) -> Result<Option<StudentHandout>, ControllerError> {
        self.generate_derived::<StudentHandout>().await
    }

    async fn generate_derived<T: Derived>(&self) -> Result<Option<T>, ControllerError> {
        let (plan, epoch, lang) = {
            let mut session = self.session.write();
            let Some(plan) = session.current_plan().cloned() else {
                info!("No lesson plan yet, skipping {:?} generation", T::ARTIFACT);
                return Ok(None);
            };
            let epoch = session.epoch;
            let lang = session.language;
            let slot = T::slot(&mut session);
            if matches!(slot, ArtifactState::Loading) {
                return Err(ControllerError::Busy(T::ARTIFACT));
            }
            *slot = ArtifactState::Loading;
            session.touch();
            (plan, epoch, lang)
        };

        let mut guard = LoadingGuard::new(&self.session, T::ARTIFACT, epoch);
        let call_id = Uuid::new_v4();
        info!(%call_id, "🎯 Generating {:?} for '{}'", T::ARTIFACT, plan.lesson_info.lesson_title);
        let prompt = T::prompt(&plan, lang);
        let result = generate_artifact::<T>(self.generator.as_ref(), T::ARTIFACT, &prompt, CancellationToken::new()).await;

        guard.disarm();
        let mut session = self.session.write();
        if session.epoch != epoch {
            warn!(%call_id, "Dropping {:?} result for a replaced lesson plan", T::ARTIFACT);
            return Err(ControllerError::Superseded(T::ARTIFACT));
        }
        session.touch();
        let slot = T::slot(&mut session);
        match result {
            Ok(artifact) => {
                info!(%call_id, "✅ {:?} generated", T::ARTIFACT);
                *slot = ArtifactState::Ready(artifact.clone());
                Ok(Some(artifact))
            }
            Err(e) => {
                *slot = ArtifactState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Back to idle: drops the plan and everything derived from it, resets the form
    /// and forgets the saved copy.
    pub fn clear(&self) -> Session {
        let snapshot = {
            let mut session = self.session.write();
            let language = session.language;
            let epoch = session.epoch + 1;
            *session = Session::new(language, LessonRequest::default());
            session.epoch = epoch;
            session.clone()
        };
        self.store.clear();
        info!("🧹 Session cleared");
        snapshot
    }
}
