use crate::{
    llm::Generator,
    models::{ApiError, LocalizationRequest, LocalizationResponse},
    pipeline::Pipeline,
    security::AuthContext,
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::info;
use uuid::Uuid;

/// Single-worker queue: jobs run one at a time in submission order.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    statuses: Arc<Mutex<HashMap<Uuid, JobState>>>,
}

struct Job {
    id: Uuid,
    request: LocalizationRequest,
    context: Option<AuthContext>,
}

#[derive(Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed {
        result: Box<LocalizationResponse>,
    },
    Failed {
        error: String,
        stage: Option<String>,
    },
}

#[derive(Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    #[serde(flatten)]
    pub state: JobState,
}

impl JobQueue {
    pub fn spawn<G>(pipeline: Pipeline<G>, capacity: usize) -> (Self, JoinHandle<()>)
    where
        G: Generator + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity.max(1));
        let statuses = Arc::new(Mutex::new(HashMap::new()));
        let statuses_bg = statuses.clone();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                {
                    let mut guard = statuses_bg.lock().await;
                    guard.insert(job.id, JobState::Running);
                }
                info!(target = "hermes.jobs", job_id = %job.id, "job_started");

                let result = pipeline.run(job.request, job.context).await;
                let mut guard = statuses_bg.lock().await;
                match result {
                    Ok(resp) => {
                        info!(target = "hermes.jobs", job_id = %job.id, "job_completed");
                        guard.insert(
                            job.id,
                            JobState::Completed {
                                result: Box::new(resp),
                            },
                        );
                    }
                    Err(err) => {
                        info!(
                            target = "hermes.jobs",
                            job_id = %job.id,
                            stage = err.stage(),
                            "job_failed"
                        );
                        guard.insert(
                            job.id,
                            JobState::Failed {
                                error: err.detail().to_string(),
                                stage: Some(err.stage().to_string()),
                            },
                        );
                    }
                }
            }
        });

        (Self { tx, statuses }, handle)
    }

    pub async fn enqueue_localization(
        &self,
        request: LocalizationRequest,
        context: Option<AuthContext>,
    ) -> Result<Uuid, ApiError> {
        let id = Uuid::new_v4();
        {
            let mut guard = self.statuses.lock().await;
            guard.insert(id, JobState::Queued);
        }
        let job = Job {
            id,
            request,
            context,
        };
        if self.tx.send(job).await.is_err() {
            self.statuses.lock().await.remove(&id);
            return Err(ApiError::new("queue_send_failed", "worker not available"));
        }
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Option<JobInfo> {
        let guard = self.statuses.lock().await;
        guard.get(&id).cloned().map(|state| JobInfo {
            id: id.to_string(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::batch::testing::FakeGenerator;
    use crate::models::SourceInput;
    use crate::pipeline::PipelineConfig;
    use crate::catalog::RawTable;
    use std::time::Duration;

    fn request(marketplace: &str) -> LocalizationRequest {
        LocalizationRequest {
            source: SourceInput::Rows(RawTable {
                headers: vec!["Title".into()],
                rows: vec![[("Title".to_string(), "Candle".to_string())].into_iter().collect()],
                ..RawTable::default()
            }),
            mappings: None,
            marketplace: marketplace.into(),
            target_language: "German".into(),
            batch_size: None,
            model: None,
        }
    }

    async fn wait_for(queue: &JobQueue, id: Uuid) -> JobState {
        for _ in 0..200 {
            if let Some(info) = queue.get(id).await
                && matches!(info.state, JobState::Completed { .. } | JobState::Failed { .. })
            {
                return info.state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} did not finish");
    }

    fn queue() -> JobQueue {
        let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(FakeGenerator::default()));
        JobQueue::spawn(pipeline, 4).0
    }

    #[tokio::test]
    async fn completed_job_carries_result() {
        let queue = queue();
        let id = queue
            .enqueue_localization(request("shopify"), None)
            .await
            .expect("enqueue");
        match wait_for(&queue, id).await {
            JobState::Completed { result } => {
                assert_eq!(result.results.len(), 1);
                assert_eq!(result.results[0].localized.title, "DE Candle");
            }
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn failed_job_reports_stage() {
        let queue = queue();
        let id = queue
            .enqueue_localization(request("amazon_mars"), None)
            .await
            .expect("enqueue");
        match wait_for(&queue, id).await {
            JobState::Failed { stage, .. } => assert_eq!(stage.as_deref(), Some("marketplace")),
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        assert!(queue().get(Uuid::new_v4()).await.is_none());
    }
}
