use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vidacomdeus_common::EtlStatus;

use super::{JsonStore, JsonStoreError};

pub const ETL_RUNS_FILE: &str = "etl_runs.json";
pub const MAX_ETL_RUNS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlRun {
    pub id: String,
    pub name: String,
    pub status: EtlStatus,
    pub started_at: String,
    pub duration: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// ETL run history, newest first, capped at [`MAX_ETL_RUNS`].
#[derive(Clone)]
pub struct EtlRunLog {
    store: Arc<JsonStore>,
}

impl EtlRunLog {
    pub fn new(store: Arc<JsonStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<EtlRun>, JsonStoreError> {
        Ok(self.store.read(ETL_RUNS_FILE).await?.unwrap_or_default())
    }

    pub async fn latest(&self) -> Result<Option<EtlRun>, JsonStoreError> {
        Ok(self.list().await?.into_iter().next())
    }

    pub async fn record(&self, run: EtlRun) -> Result<(), JsonStoreError> {
        self.store
            .update(ETL_RUNS_FILE, Option::unwrap_or_default, |runs: &mut Vec<EtlRun>| {
                runs.insert(0, run);
                runs.truncate(MAX_ETL_RUNS);
            })
            .await
    }

    /// Returns false when the run has already been rotated out of the history.
    pub async fn finish(
        &self,
        id: &str,
        status: EtlStatus,
        duration: String,
        error: Option<String>,
    ) -> Result<bool, JsonStoreError> {
        self.store
            .update(ETL_RUNS_FILE, Option::unwrap_or_default, |runs: &mut Vec<EtlRun>| {
                match runs.iter_mut().find(|r| r.id == id) {
                    Some(run) => {
                        run.status = status;
                        run.duration = duration;
                        run.error = error;
                        true
                    }
                    None => false,
                }
            })
            .await
    }
}
