//! Run bookkeeping collaborator interface.
//!
//! The relational run store lives outside this system; the pipeline only
//! needs get-or-create and mark-processed. Idempotency of the raster
//! stages is derived from key existence, never from these records - they
//! exist for provenance and operator visibility.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use sfms_common::{RunType, SfmsError, SfmsResult};

/// One recorded pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub job: String,
    pub run_type: RunType,
    pub for_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
}

/// External run bookkeeping store, reduced to the operations the
/// pipeline consumes.
#[async_trait]
pub trait RunBookkeeping: Send + Sync {
    /// Fetch the run record for (job, run type, date), creating it if absent.
    async fn get_or_create_run(
        &self,
        job: &str,
        run_type: RunType,
        for_date: NaiveDate,
    ) -> SfmsResult<RunRecord>;

    /// Mark a run as fully processed.
    async fn mark_processed(&self, run_id: Uuid) -> SfmsResult<()>;
}

/// In-memory run log for tests and local runs.
#[derive(Default)]
pub struct InMemoryRunLog {
    records: Mutex<HashMap<(String, RunType, NaiveDate), RunRecord>>,
}

impl InMemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunBookkeeping for InMemoryRunLog {
    async fn get_or_create_run(
        &self,
        job: &str,
        run_type: RunType,
        for_date: NaiveDate,
    ) -> SfmsResult<RunRecord> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SfmsError::storage("run log poisoned"))?;
        let record = records
            .entry((job.to_string(), run_type, for_date))
            .or_insert_with(|| RunRecord {
                id: Uuid::new_v4(),
                job: job.to_string(),
                run_type,
                for_date,
                created_at: Utc::now(),
                processed: false,
            });
        Ok(record.clone())
    }

    async fn mark_processed(&self, run_id: Uuid) -> SfmsResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SfmsError::storage("run log poisoned"))?;
        for record in records.values_mut() {
            if record.id == run_id {
                record.processed = true;
                return Ok(());
            }
        }
        Err(SfmsError::storage(format!("unknown run id {}", run_id)))
    }
}
