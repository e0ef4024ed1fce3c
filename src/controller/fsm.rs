use crate::{
    Error, Result, catalog,
    diagnosis::{DiagnosisReport, Diagnoser, ImagePayload, MediaType, SymptomRequest},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::{runtime::Handle, sync::Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MISSING_DESCRIPTION_MESSAGE: &str =
    "Please describe your plant's symptoms. A description is required.";
pub const DIAGNOSIS_FAILED_MESSAGE: &str = "Sorry, we couldn't get a diagnosis. The AI may be busy, or an error occurred. Please try again.";

pub type SharedController = Arc<Mutex<DiagnosisController>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Validating,
    Rejected,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    Submit,
    DescriptionMissing,
    InputAccepted,
    DiagnosisSucceeded,
    DiagnosisFailed,
    Settle,
}

/// How the last attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Rejected,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub description: String,
    pub plant_type: Option<String>,
    pub image: Option<ImagePayload>,
}

/// Token for the single in-flight attempt. Not `Clone`: only one exists per
/// submission and it is consumed by [`DiagnosisController::complete`].
#[derive(Debug)]
pub struct Submission {
    id: Uuid,
    pub request: SymptomRequest,
}

impl Submission {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub state: ControllerState,
    pub loading: bool,
    pub description: String,
    pub plant_type: Option<String>,
    pub image_mime_type: Option<MediaType>,
    pub report: Option<DiagnosisReport>,
    pub error: Option<String>,
    pub last_outcome: Option<Outcome>,
}

/// Per-session application state: form inputs, current report and error,
/// and the state of the one permitted in-flight attempt.
#[derive(Debug)]
pub struct DiagnosisController {
    state: ControllerState,
    form: FormState,
    report: Option<DiagnosisReport>,
    error: Option<String>,
    in_flight: Option<Uuid>,
    last_outcome: Option<Outcome>,
}

impl Default for DiagnosisController {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosisController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            form: FormState::default(),
            report: None,
            error: None,
            in_flight: None,
            last_outcome: None,
        }
    }

    pub fn current_state(&self) -> ControllerState {
        self.state
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn report(&self) -> Option<&DiagnosisReport> {
        self.report.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn is_loading(&self) -> bool {
        self.state == ControllerState::Submitting
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = description.into();
    }

    /// Selects a catalog plant type, or clears it with `None` / blank.
    pub fn set_plant_type(&mut self, plant_type: Option<&str>) -> Result<()> {
        self.form.plant_type = catalog::resolve(plant_type)?.map(str::to_string);
        Ok(())
    }

    /// Inputs are locked while an attempt is in flight.
    pub fn set_image(&mut self, image: Option<ImagePayload>) -> Result<()> {
        if self.is_loading() {
            return Err(Error::SubmissionInProgress);
        }
        self.form.image = image;
        Ok(())
    }

    pub fn transition(&mut self, event: ControllerEvent) -> Result<()> {
        use ControllerEvent as E;
        use ControllerState as S;

        let old_state = self.state;
        let new_state = match (old_state, event) {
            (S::Idle, E::Submit) => S::Validating,
            (S::Validating, E::DescriptionMissing) => S::Rejected,
            (S::Validating, E::InputAccepted) => S::Submitting,
            (S::Submitting, E::DiagnosisSucceeded) => S::Succeeded,
            (S::Submitting, E::DiagnosisFailed) => S::Failed,
            (S::Rejected | S::Succeeded | S::Failed, E::Settle) => S::Idle,
            _ => {
                warn!(
                    "Invalid controller transition from {:?} with event {:?}",
                    old_state, event
                );
                return Err(Error::InvalidTransition {
                    current: format!("{old_state:?}"),
                    requested: format!("{event:?}"),
                });
            }
        };

        debug!(
            "Controller state transition: {:?} -> {:?} (event: {:?})",
            old_state, new_state, event
        );
        self.state = new_state;
        Ok(())
    }

    /// Validates the form and, if acceptable, enters `Submitting`. The prior
    /// report and error are cleared before the request goes out.
    pub fn begin_submit(&mut self) -> Result<Submission> {
        if self.is_loading() {
            return Err(Error::SubmissionInProgress);
        }

        self.transition(ControllerEvent::Submit)?;

        if self.form.description.trim().is_empty() {
            self.transition(ControllerEvent::DescriptionMissing)?;
            self.error = Some(MISSING_DESCRIPTION_MESSAGE.to_string());
            self.last_outcome = Some(Outcome::Rejected);
            self.transition(ControllerEvent::Settle)?;
            return Err(Error::validation(MISSING_DESCRIPTION_MESSAGE));
        }

        self.transition(ControllerEvent::InputAccepted)?;
        self.report = None;
        self.error = None;

        let id = Uuid::new_v4();
        self.in_flight = Some(id);
        info!("Submitting diagnosis attempt {}", id);

        Ok(Submission {
            id,
            request: SymptomRequest {
                description: self.form.description.clone(),
                plant_type: self.form.plant_type.clone(),
                image: self.form.image.clone(),
            },
        })
    }

    /// Records the result of an attempt and settles back to `Idle`.
    pub fn complete(
        &mut self,
        submission: Submission,
        result: Result<DiagnosisReport>,
    ) -> Result<Outcome> {
        if self.in_flight != Some(submission.id) {
            return Err(Error::InvalidTransition {
                current: format!("{:?}", self.state),
                requested: format!("complete {}", submission.id),
            });
        }

        let outcome = match result {
            Ok(report) => {
                self.transition(ControllerEvent::DiagnosisSucceeded)?;
                self.report = Some(report);
                self.form.image = None;
                self.error = None;
                Outcome::Succeeded
            }
            Err(e) => {
                self.transition(ControllerEvent::DiagnosisFailed)?;
                debug!("Attempt {} failed: {}", submission.id, e);
                self.error = Some(DIAGNOSIS_FAILED_MESSAGE.to_string());
                Outcome::Failed
            }
        };

        self.in_flight = None;
        self.last_outcome = Some(outcome);
        self.transition(ControllerEvent::Settle)?;
        Ok(outcome)
    }

    /// Fails the attempt `id` without a model result. Returns false when that
    /// attempt is no longer in flight.
    pub fn abandon(&mut self, id: Uuid) -> bool {
        if self.in_flight != Some(id) {
            return false;
        }

        warn!("Diagnosis attempt {} abandoned before completing", id);
        self.in_flight = None;
        self.error = Some(DIAGNOSIS_FAILED_MESSAGE.to_string());
        self.last_outcome = Some(Outcome::Failed);
        if let Err(e) = self
            .transition(ControllerEvent::DiagnosisFailed)
            .and_then(|()| self.transition(ControllerEvent::Settle))
        {
            warn!("Forcing controller back to Idle: {}", e);
            self.state = ControllerState::Idle;
        }
        true
    }

    /// Runs one full attempt. The lock is not held while the model is awaited.
    /// If the returned future is dropped early the attempt is abandoned, so the
    /// session always settles back to `Idle`.
    pub async fn submit(controller: &SharedController, diagnoser: &Diagnoser) -> Result<Outcome> {
        let submission = controller.lock().await.begin_submit()?;
        let mut guard = InFlightGuard {
            controller: Arc::clone(controller),
            id: Some(submission.id),
        };

        let result = diagnoser.diagnose(&submission.request).await;
        let outcome = controller.lock().await.complete(submission, result);
        guard.id = None;
        outcome
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state,
            loading: self.is_loading(),
            description: self.form.description.clone(),
            plant_type: self.form.plant_type.clone(),
            image_mime_type: self.form.image.as_ref().map(|image| image.mime_type),
            report: self.report.clone(),
            error: self.error.clone(),
            last_outcome: self.last_outcome,
        }
    }
}

/// Abandons the in-flight attempt if `submit` is dropped before completing.
struct InFlightGuard {
    controller: SharedController,
    id: Option<Uuid>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };

        if let Ok(mut controller) = self.controller.try_lock() {
            controller.abandon(id);
            return;
        }

        // Someone holds the lock; settle once it is free.
        let controller = Arc::clone(&self.controller);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    controller.lock().await.abandon(id);
                });
            }
            Err(_) => warn!("No runtime to abandon diagnosis attempt {}", id),
        }
    }
}
