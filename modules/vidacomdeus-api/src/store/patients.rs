use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use vidacomdeus_common::time::now_iso;
use vidacomdeus_common::{Mood, PatientStatus, ResponseDepth, Severity, SleepQuality};

use super::{JsonStore, JsonStoreError};

pub const PATIENTS_FILE: &str = "patients.json";
const DEMO_PATIENTS: &str = include_str!("../../seed/patients.json");
const NEAR_LIMIT_RATIO: f64 = 0.8;
const RECENT_ACTIVITY: usize = 5;

#[derive(Error, Debug)]
pub enum TherapistError {
    #[error("Paciente não encontrado")]
    PatientNotFound,

    #[error("Sessão não encontrada")]
    SessionNotFound,

    #[error(transparent)]
    Store(#[from] JsonStoreError),
}

// --- Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapySession {
    pub id: String,
    pub patient_id: String,
    pub date: String,
    pub summary: String,
    pub mood: Mood,
    #[serde(default)]
    pub topics_covered: Vec<String>,
    pub homework: Option<String>,
    pub next_session_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientConfig {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub status: PatientStatus,
    pub created_at: String,

    // Clinical assessment
    pub chief_complaint: Option<String>,
    pub anxiety_level: Option<Severity>,
    pub depression_level: Option<Severity>,
    pub sleep_quality: Option<SleepQuality>,
    #[serde(default)]
    pub suicidal_ideation: bool,
    pub current_medication: Option<String>,

    // Guidance for the assistant
    pub therapy_goal: Option<String>,
    pub therapeutic_approach: Option<String>,
    #[serde(default)]
    pub focus_topics: Vec<String>,
    #[serde(default)]
    pub avoid_topics: Vec<String>,
    #[serde(default)]
    pub response_depth: ResponseDepth,

    #[serde(default)]
    pub messages_used: i64,
    #[serde(default = "default_messages_limit")]
    pub messages_limit: i64,

    #[serde(default)]
    pub sessions: Vec<TherapySession>,
}

fn default_messages_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: PatientStatus,
    pub messages_used: i64,
    pub messages_limit: i64,
    pub created_at: String,
}

impl From<&PatientConfig> for PatientSummary {
    fn from(p: &PatientConfig) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
            status: p.status,
            messages_used: p.messages_used,
            messages_limit: p.messages_limit,
            created_at: p.created_at.clone(),
        }
    }
}

// --- Requests ---

#[derive(Debug, Clone, Deserialize)]
pub struct PatientIntake {
    pub name: String,
    pub email: String,
    pub chief_complaint: Option<String>,
    pub anxiety_level: Option<Severity>,
    pub depression_level: Option<Severity>,
    pub sleep_quality: Option<SleepQuality>,
    #[serde(default)]
    pub suicidal_ideation: bool,
    pub current_medication: Option<String>,
    pub therapy_goal: Option<String>,
    pub therapeutic_approach: Option<String>,
    #[serde(default)]
    pub focus_topics: Vec<String>,
    #[serde(default)]
    pub avoid_topics: Vec<String>,
    #[serde(default)]
    pub response_depth: ResponseDepth,
    #[serde(default = "default_messages_limit")]
    pub messages_limit: i64,
    pub first_session_date: Option<String>,
    pub first_session_summary: Option<String>,
    pub first_session_mood: Option<Mood>,
}

/// Partial update of clinical and guidance fields.
///
/// Nullable fields use `Option<Option<_>>`: absent leaves the value alone,
/// explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientUpdate {
    #[serde(default, deserialize_with = "nullable")]
    pub chief_complaint: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub anxiety_level: Option<Option<Severity>>,
    #[serde(default, deserialize_with = "nullable")]
    pub depression_level: Option<Option<Severity>>,
    #[serde(default, deserialize_with = "nullable")]
    pub sleep_quality: Option<Option<SleepQuality>>,
    pub suicidal_ideation: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub current_medication: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub therapy_goal: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub therapeutic_approach: Option<Option<String>>,
    pub focus_topics: Option<Vec<String>>,
    pub avoid_topics: Option<Vec<String>>,
    pub response_depth: Option<ResponseDepth>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Editable fields of a session, used for both create and replace.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInput {
    pub date: String,
    pub summary: String,
    pub mood: Mood,
    #[serde(default)]
    pub topics_covered: Vec<String>,
    pub homework: Option<String>,
    pub next_session_date: Option<String>,
}

// --- Dashboard ---

#[derive(Debug, Clone, Serialize)]
pub struct NearLimitPatient {
    pub id: String,
    pub name: String,
    pub messages_used: i64,
    pub messages_limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentActivity {
    pub patient_name: String,
    pub action: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub total_patients: usize,
    pub active_patients: usize,
    pub paused_patients: usize,
    pub discharged_patients: usize,
    pub near_limit_patients: Vec<NearLimitPatient>,
    pub recent_activity: Vec<RecentActivity>,
}

pub fn overview(patients: &[PatientConfig]) -> DashboardOverview {
    let count = |status: PatientStatus| patients.iter().filter(|p| p.status == status).count();

    let near_limit_patients = patients
        .iter()
        .filter(|p| {
            p.messages_limit > 0
                && p.messages_used as f64 / p.messages_limit as f64 >= NEAR_LIMIT_RATIO
        })
        .map(|p| NearLimitPatient {
            id: p.id.clone(),
            name: p.name.clone(),
            messages_used: p.messages_used,
            messages_limit: p.messages_limit,
        })
        .collect();

    let mut newest: Vec<&PatientConfig> = patients.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_activity = newest
        .into_iter()
        .take(RECENT_ACTIVITY)
        .map(|p| RecentActivity {
            patient_name: p.name.clone(),
            action: "Sessão registrada".to_string(),
            timestamp: p.created_at.clone(),
        })
        .collect();

    DashboardOverview {
        total_patients: patients.len(),
        active_patients: count(PatientStatus::Active),
        paused_patients: count(PatientStatus::Paused),
        discharged_patients: count(PatientStatus::Discharged),
        near_limit_patients,
        recent_activity,
    }
}

fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &hex[..8])
}

impl PatientUpdate {
    fn apply(self, p: &mut PatientConfig) {
        if let Some(v) = self.chief_complaint {
            p.chief_complaint = v;
        }
        if let Some(v) = self.anxiety_level {
            p.anxiety_level = v;
        }
        if let Some(v) = self.depression_level {
            p.depression_level = v;
        }
        if let Some(v) = self.sleep_quality {
            p.sleep_quality = v;
        }
        if let Some(v) = self.suicidal_ideation {
            p.suicidal_ideation = v;
        }
        if let Some(v) = self.current_medication {
            p.current_medication = v;
        }
        if let Some(v) = self.therapy_goal {
            p.therapy_goal = v;
        }
        if let Some(v) = self.therapeutic_approach {
            p.therapeutic_approach = v;
        }
        if let Some(v) = self.focus_topics {
            p.focus_topics = v;
        }
        if let Some(v) = self.avoid_topics {
            p.avoid_topics = v;
        }
        if let Some(v) = self.response_depth {
            p.response_depth = v;
        }
    }
}

impl SessionInput {
    fn apply(self, s: &mut TherapySession) {
        s.date = self.date;
        s.summary = self.summary;
        s.mood = self.mood;
        s.topics_covered = self.topics_covered;
        s.homework = self.homework;
        s.next_session_date = self.next_session_date;
    }
}

// --- Store ---

/// Therapist patients persisted in `patients.json`.
#[derive(Clone)]
pub struct PatientStore {
    store: Arc<JsonStore>,
    seed_demo_data: bool,
}

impl PatientStore {
    pub fn new(store: Arc<JsonStore>, seed_demo_data: bool) -> Self {
        Self {
            store,
            seed_demo_data,
        }
    }

    /// Demo patients for a store that has never been written. An explicit `[]` is kept.
    fn seed(&self) -> Option<Vec<PatientConfig>> {
        if !self.seed_demo_data {
            return None;
        }
        match serde_json::from_str(DEMO_PATIENTS) {
            Ok(demo) => {
                info!("Seeding therapist store with demo patients");
                Some(demo)
            }
            Err(e) => {
                warn!(error = %e, "Demo patients fixture is invalid");
                None
            }
        }
    }

    /// Mutate the patient list under the store lock and persist it.
    async fn with_patients<R>(
        &self,
        f: impl FnOnce(&mut Vec<PatientConfig>) -> R,
    ) -> Result<R, TherapistError> {
        let result = self
            .store
            .update(
                PATIENTS_FILE,
                |existing| existing.or_else(|| self.seed()).unwrap_or_default(),
                f,
            )
            .await?;
        Ok(result)
    }

    pub async fn list(&self) -> Result<Vec<PatientConfig>, TherapistError> {
        let patients = self
            .store
            .read_or_seed(PATIENTS_FILE, || self.seed())
            .await?;
        Ok(patients.unwrap_or_default())
    }

    pub async fn get(&self, id: &str) -> Result<PatientConfig, TherapistError> {
        self.list()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or(TherapistError::PatientNotFound)
    }

    pub async fn create(&self, intake: PatientIntake) -> Result<PatientConfig, TherapistError> {
        let patient_id = short_id("pat");
        let now = now_iso();

        let mut sessions = Vec::new();
        if let Some(date) = intake.first_session_date {
            sessions.push(TherapySession {
                id: short_id("sess"),
                patient_id: patient_id.clone(),
                date,
                summary: intake.first_session_summary.unwrap_or_default(),
                mood: intake.first_session_mood.unwrap_or_default(),
                topics_covered: Vec::new(),
                homework: None,
                next_session_date: None,
                created_at: now.clone(),
            });
        }

        let patient = PatientConfig {
            id: patient_id,
            name: intake.name.trim().to_string(),
            email: intake.email.trim().to_string(),
            status: PatientStatus::Active,
            created_at: now,
            chief_complaint: intake.chief_complaint,
            anxiety_level: intake.anxiety_level,
            depression_level: intake.depression_level,
            sleep_quality: intake.sleep_quality,
            suicidal_ideation: intake.suicidal_ideation,
            current_medication: intake.current_medication,
            therapy_goal: intake.therapy_goal,
            therapeutic_approach: intake.therapeutic_approach,
            focus_topics: intake.focus_topics,
            avoid_topics: intake.avoid_topics,
            response_depth: intake.response_depth,
            messages_used: 0,
            messages_limit: intake.messages_limit,
            sessions,
        };

        let created = patient.clone();
        self.with_patients(move |patients| patients.push(patient)).await?;
        info!(patient_id = %created.id, "Patient created");
        Ok(created)
    }

    /// Apply `f` to one patient and persist.
    pub async fn modify(
        &self,
        id: &str,
        f: impl FnOnce(&mut PatientConfig),
    ) -> Result<PatientConfig, TherapistError> {
        self.with_patients(|patients| {
            patients.iter_mut().find(|p| p.id == id).map(|p| {
                f(p);
                p.clone()
            })
        })
        .await?
        .ok_or(TherapistError::PatientNotFound)
    }

    pub async fn update(&self, id: &str, update: PatientUpdate) -> Result<PatientConfig, TherapistError> {
        self.modify(id, |p| update.apply(p)).await
    }

    pub async fn set_status(&self, id: &str, status: PatientStatus) -> Result<PatientConfig, TherapistError> {
        self.modify(id, |p| p.status = status).await
    }

    pub async fn set_limit(&self, id: &str, messages_limit: i64) -> Result<PatientConfig, TherapistError> {
        self.modify(id, |p| p.messages_limit = messages_limit).await
    }

    pub async fn add_session(
        &self,
        patient_id: &str,
        input: SessionInput,
    ) -> Result<TherapySession, TherapistError> {
        let mut session = TherapySession {
            id: short_id("sess"),
            patient_id: patient_id.to_string(),
            date: String::new(),
            summary: String::new(),
            mood: Mood::default(),
            topics_covered: Vec::new(),
            homework: None,
            next_session_date: None,
            created_at: now_iso(),
        };
        input.apply(&mut session);

        let created = session.clone();
        self.modify(patient_id, move |p| p.sessions.push(session)).await?;
        Ok(created)
    }

    pub async fn update_session(
        &self,
        patient_id: &str,
        session_id: &str,
        input: SessionInput,
    ) -> Result<TherapySession, TherapistError> {
        self.with_patients(|patients| {
            let patient = patients
                .iter_mut()
                .find(|p| p.id == patient_id)
                .ok_or(TherapistError::PatientNotFound)?;
            let session = patient
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or(TherapistError::SessionNotFound)?;
            input.apply(session);
            Ok(session.clone())
        })
        .await?
    }
}
