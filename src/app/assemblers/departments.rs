use super::{log_stage, page_url, Stage};
use crate::config::{ClinicConfig, DepartmentSeed, DepartmentSourceKind};
use crate::core::extractor::{self, Shape};
use crate::domain::model::{Department, Record};
use crate::domain::ports::{Assembler, HtmlFetcher};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// 依設定選擇科別資料來源
pub fn department_assembler(
    fetcher: Arc<dyn HtmlFetcher>,
    config: &ClinicConfig,
) -> Arc<dyn Assembler<Output = Department>> {
    match config.departments.source {
        DepartmentSourceKind::Static => {
            Arc::new(StaticDepartments::new(config.departments.fallback.clone()))
        }
        DepartmentSourceKind::Scrape => Arc::new(ScrapedDepartments::new(fetcher, config)),
    }
}

/// 不經網路的固定科別資料
pub struct StaticDepartments {
    seeds: Vec<DepartmentSeed>,
}

impl StaticDepartments {
    pub fn new(seeds: Vec<DepartmentSeed>) -> Self {
        Self { seeds }
    }
}

#[async_trait]
impl Assembler for StaticDepartments {
    type Output = Department;

    fn name(&self) -> &str {
        "departments"
    }

    async fn assemble(&self) -> Result<Vec<Department>> {
        let departments: Vec<Department> = self
            .seeds
            .iter()
            .map(|seed| Department {
                id: Uuid::new_v4(),
                name: seed.name.clone(),
                description: seed.description.clone(),
                equipment: seed.equipment.clone(),
                specializations: seed.specializations.clone(),
                contact_info: seed.contact_info.clone(),
                schedule: seed.schedule.clone(),
            })
            .collect();

        log_stage(self.name(), Stage::Done(departments.len()));
        Ok(departments)
    }
}

pub struct ScrapedDepartments {
    fetcher: Arc<dyn HtmlFetcher>,
    base_url: String,
    path: String,
    shape: Shape,
}

impl ScrapedDepartments {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, config: &ClinicConfig) -> Self {
        Self {
            fetcher,
            base_url: config.source.base_url.clone(),
            path: config.departments.path.clone(),
            shape: config.extract.shapes.department_list.clone(),
        }
    }

    fn to_department(record: &Record) -> Department {
        Department {
            id: Uuid::new_v4(),
            name: record.text("name"),
            description: record.text("description"),
            equipment: record.list("equipment"),
            specializations: record.list("specializations"),
            contact_info: record.text("contact_info"),
            schedule: record.text("schedule"),
        }
    }

    async fn run(&self) -> Result<Vec<Department>> {
        let url = page_url(&self.base_url, &self.path)?;
        log_stage(self.name(), Stage::FetchingList(url.as_str()));

        let html = self.fetcher.fetch(url.as_str()).await?;
        let records = extractor::extract(&html, &self.shape)?;
        Ok(records.iter().map(Self::to_department).collect())
    }
}

#[async_trait]
impl Assembler for ScrapedDepartments {
    type Output = Department;

    fn name(&self) -> &str {
        "departments"
    }

    async fn assemble(&self) -> Result<Vec<Department>> {
        match self.run().await {
            Ok(departments) => {
                log_stage(self.name(), Stage::Done(departments.len()));
                Ok(departments)
            }
            Err(e) => {
                log_stage(self.name(), Stage::Failed(&e));
                Err(e)
            }
        }
    }
}
