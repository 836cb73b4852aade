//! Job bridge - binds plugin jobs to the cron scheduler

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::errors::ConfigError;
use crate::application::services::EventTranslator;
use crate::domain::traits::Host;
use crate::infrastructure::plugins::{JobSpec, LoadedPlugin};
use crate::infrastructure::scheduler::{CronScheduler, JobFn, JobFuture};

/// One scheduled plugin job
pub struct JobRecord {
    pub id: String,
    pub plugin: Arc<LoadedPlugin>,
    pub spec: JobSpec,
}

pub struct JobBridge {
    scheduler: Arc<CronScheduler>,
    host: Arc<dyn Host>,
    translator: EventTranslator,
    jobs: BTreeMap<String, Arc<JobRecord>>,
}

impl JobBridge {
    pub fn new(scheduler: Arc<CronScheduler>, host: Arc<dyn Host>, translator: EventTranslator) -> Self {
        Self {
            scheduler,
            host,
            translator,
            jobs: BTreeMap::new(),
        }
    }

    /// `plugin-slug::job-name`
    pub fn job_id(plugin: &LoadedPlugin, job: &JobSpec) -> String {
        format!("{}::{}", plugin.definition().slug(), job.name)
    }

    /// Install a trigger for one job
    pub fn schedule(&mut self, plugin: Arc<LoadedPlugin>, spec: JobSpec) -> Result<String, ConfigError> {
        let id = Self::job_id(&plugin, &spec);
        let schedule = spec.schedule.clone();
        let record = Arc::new(JobRecord {
            id: id.clone(),
            plugin,
            spec,
        });

        let run: JobFn = {
            let record = record.clone();
            let host = self.host.clone();
            let translator = self.translator;
            Arc::new(move || -> JobFuture { Box::pin(fire(record.clone(), host.clone(), translator)) })
        };

        self.scheduler.add(id.clone(), &schedule, run)?;
        self.jobs.insert(id.clone(), record);
        Ok(id)
    }

    /// Schedule every job a plugin declares, returning how many were installed
    pub async fn schedule_all(&mut self, plugin: Arc<LoadedPlugin>) -> usize {
        let mut scheduled = 0;

        for spec in plugin.capabilities().jobs().await.iter() {
            match self.schedule(plugin.clone(), spec.clone()) {
                Ok(_) => scheduled += 1,
                Err(e) => tracing::error!(plugin = %plugin.definition().execute, "Skipping job: {}", e),
            }
        }

        scheduled
    }

    /// Force an immediate run. Unknown ids return every known id.
    pub fn invoke_now(&self, id: &str) -> Result<(), Vec<String>> {
        self.scheduler.trigger(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.jobs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

async fn fire(record: Arc<JobRecord>, host: Arc<dyn Host>, translator: EventTranslator) {
    tracing::info!(job_id = %record.id, "Running job {}", record.spec.name);

    let result = translator
        .invoke_and_apply(host.as_ref(), record.plugin.handle().as_ref(), &record.spec.name, None)
        .await;

    match result {
        Ok(applied) => tracing::info!(job_id = %record.id, applied, "Job completed"),
        Err(e) => tracing::error!(job_id = %record.id, "Job failed: {}", e),
    }
}
