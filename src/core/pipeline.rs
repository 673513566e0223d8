use crate::adapters::HttpFetcher;
use crate::app::assemblers::{department_assembler, DoctorAssembler, ServiceAssembler};
use crate::config::{ClinicConfig, FailurePolicy};
use crate::domain::model::{Category, CategoryFailure, Department, Doctor, Service, Snapshot};
use crate::domain::ports::{Assembler, HtmlFetcher};
use crate::utils::error::{ClinicError, Result};
use std::sync::Arc;
use std::time::Instant;

/// 同時執行三個組裝器並合併成一份 `Snapshot`
pub struct AggregationPipeline {
    doctors: Arc<dyn Assembler<Output = Doctor>>,
    departments: Arc<dyn Assembler<Output = Department>>,
    services: Arc<dyn Assembler<Output = Service>>,
    policy: FailurePolicy,
}

impl AggregationPipeline {
    pub fn new(
        doctors: Arc<dyn Assembler<Output = Doctor>>,
        departments: Arc<dyn Assembler<Output = Department>>,
        services: Arc<dyn Assembler<Output = Service>>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            doctors,
            departments,
            services,
            policy,
        }
    }

    pub fn from_config(config: &ClinicConfig, fetcher: Arc<dyn HtmlFetcher>) -> Self {
        Self::new(
            Arc::new(DoctorAssembler::new(fetcher.clone(), config)),
            department_assembler(fetcher.clone(), config),
            Arc::new(ServiceAssembler::new(fetcher, config)),
            config.refresh.failure_policy,
        )
    }

    /// 使用 reqwest 抓取器建立管線
    pub fn with_http(config: &ClinicConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(config)?;
        Ok(Self::from_config(config, Arc::new(fetcher)))
    }

    pub async fn refresh(&self) -> Result<Snapshot> {
        let started = Instant::now();
        tracing::info!("🚀 Starting refresh ({:?} failure policy)", self.policy);

        let snapshot = match self.policy {
            FailurePolicy::Isolated => self.refresh_isolated().await?,
            FailurePolicy::AbortOnAny => self.refresh_abort_on_any().await?,
        };

        tracing::info!(
            "📦 Snapshot ready in {:?}: {} doctors, {} departments, {} services{}",
            started.elapsed(),
            snapshot.doctors.len(),
            snapshot.departments.len(),
            snapshot.services.len(),
            if snapshot.is_partial() { " (partial)" } else { "" }
        );
        Ok(snapshot)
    }

    async fn refresh_isolated(&self) -> Result<Snapshot> {
        let (doctors, departments, services) = tokio::join!(
            self.doctors.assemble(),
            self.departments.assemble(),
            self.services.assemble(),
        );

        let mut failures = Vec::new();
        let doctors = settle(Category::Doctors, doctors, &mut failures);
        let departments = settle(Category::Departments, departments, &mut failures);
        let services = settle(Category::Services, services, &mut failures);

        if failures.len() == 3 {
            tracing::error!("❌ Every assembler failed, keeping previous state");
            return Err(ClinicError::Refresh { failures });
        }

        Ok(Snapshot::new(doctors, departments, services).with_failures(failures))
    }

    async fn refresh_abort_on_any(&self) -> Result<Snapshot> {
        let (doctors, departments, services) = tokio::try_join!(
            self.doctors.assemble(),
            self.departments.assemble(),
            self.services.assemble(),
        )?;
        Ok(Snapshot::new(doctors, departments, services))
    }
}

fn settle<T>(
    category: Category,
    result: Result<Vec<T>>,
    failures: &mut Vec<CategoryFailure>,
) -> Vec<T> {
    match result {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("⚠️ {} unavailable, continuing without them: {}", category, e);
            failures.push(CategoryFailure {
                category,
                message: e.to_string(),
            });
            Vec::new()
        }
    }
}
