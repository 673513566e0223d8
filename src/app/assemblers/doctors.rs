use super::{log_stage, page_url, resolve_link, Stage};
use crate::config::ClinicConfig;
use crate::core::extractor::{self, Shape};
use crate::domain::model::{Doctor, DoctorDetail, Record};
use crate::domain::ports::{Assembler, HtmlFetcher};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// 列表頁上的一位醫師，尚未合併詳細頁
#[derive(Debug, Clone, PartialEq)]
struct DoctorStub {
    name: String,
    specialty: String,
    photo_url: String,
    experience: String,
    detail_url: Option<Url>,
}

impl DoctorStub {
    fn from_record(record: &Record, base: &Url) -> Option<Self> {
        let name = record.text("name");
        let specialty = record.text("specialty");
        if name.is_empty() || specialty.is_empty() {
            return None;
        }

        Some(Self {
            name,
            specialty,
            photo_url: resolve_link(base, &record.text("photo"))
                .map(String::from)
                .unwrap_or_default(),
            experience: record.text("experience"),
            detail_url: resolve_link(base, &record.text("detail_url")),
        })
    }

    fn into_doctor(self, detail: DoctorDetail) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            name: self.name,
            specialty: self.specialty,
            photo_url: self.photo_url,
            experience: self.experience,
            schedule: detail.schedule,
            education: detail.education,
            certificates: detail.certificates,
        }
    }
}

/// 醫師列表 + 每位醫師的詳細頁。詳細頁以有上限的並行抓取，輸出順序與列表相同。
pub struct DoctorAssembler {
    fetcher: Arc<dyn HtmlFetcher>,
    base_url: String,
    list_path: String,
    list_shape: Shape,
    detail_shape: Shape,
    concurrency: usize,
}

impl DoctorAssembler {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, config: &ClinicConfig) -> Self {
        Self {
            fetcher,
            base_url: config.source.base_url.clone(),
            list_path: config.source.doctors_path.clone(),
            list_shape: config.extract.shapes.doctor_list.clone(),
            detail_shape: config.extract.shapes.doctor_detail.clone(),
            concurrency: config.extract.detail_concurrency.max(1),
        }
    }

    async fn fetch_stubs(&self) -> Result<Vec<DoctorStub>> {
        let list_url = page_url(&self.base_url, &self.list_path)?;
        log_stage(self.name(), Stage::FetchingList(list_url.as_str()));

        let html = self.fetcher.fetch(list_url.as_str()).await?;
        let records = extractor::extract(&html, &self.list_shape)?;

        Ok(records
            .iter()
            .filter_map(|record| DoctorStub::from_record(record, &list_url))
            .collect())
    }

    async fn fetch_detail(&self, url: &Url) -> Result<DoctorDetail> {
        let html = self.fetcher.fetch(url.as_str()).await?;
        let record = extractor::extract(&html, &self.detail_shape)?
            .into_iter()
            .next()
            .unwrap_or_default();

        Ok(DoctorDetail {
            schedule: record.text("schedule"),
            education: record.text("education"),
            certificates: record.list("certificates"),
        })
    }

    /// 詳細頁缺失或失敗時退回空值，不丟棄醫師
    async fn detail_or_default(&self, stub: &DoctorStub) -> DoctorDetail {
        let Some(url) = &stub.detail_url else {
            tracing::debug!("No detail link for {}", stub.name);
            return DoctorDetail::default();
        };

        match self.fetch_detail(url).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!("⚠️ Detail page for {} unavailable: {}", stub.name, e);
                DoctorDetail::default()
            }
        }
    }
}

#[async_trait]
impl Assembler for DoctorAssembler {
    type Output = Doctor;

    fn name(&self) -> &str {
        "doctors"
    }

    async fn assemble(&self) -> Result<Vec<Doctor>> {
        let stubs = match self.fetch_stubs().await {
            Ok(stubs) => stubs,
            Err(e) => {
                log_stage(self.name(), Stage::Failed(&e));
                return Err(e);
            }
        };

        log_stage(self.name(), Stage::FetchingDetails(stubs.len()));
        let doctors: Vec<Doctor> = stream::iter(stubs)
            .map(|stub| async move {
                let detail = self.detail_or_default(&stub).await;
                stub.into_doctor(detail)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        log_stage(self.name(), Stage::Done(doctors.len()));
        Ok(doctors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MapFetcher, BASE};
    use crate::utils::error::ClinicError;
    use std::time::Duration;

    const LIST: &str = r#"<html><body>
        <div class="doctor-item">
            <a href="/doctors/ivanov/"><img src="/upload/ivanov.jpg"></a>
            <div class="doctor-name">Иванов Иван Иванович</div>
            <div class="doctor-specialty">Терапевт</div>
            <div class="doctor-experience">Стаж 15 лет</div>
        </div>
        <div class="doctor-item">
            <a href="/doctors/petrova/"></a>
            <div class="doctor-name">Петрова Анна Сергеевна</div>
            <div class="doctor-specialty">Кардиолог</div>
        </div>
        <div class="doctor-item">
            <div class="doctor-name">Без специальности</div>
        </div>
        <div class="doctor-item">
            <div class="doctor-name">Сидоров Пётр</div>
            <div class="doctor-specialty">Невролог</div>
        </div>
    </body></html>"#;

    const IVANOV: &str = r#"<html><body>
        <div class="schedule">Пн-Пт 09:00-15:00</div>
        <div class="education">ДВГМУ, 2005</div>
        <div class="certificates">Терапия, 2020</div>
        <div class="certificates">Кардиология, 2022</div>
    </body></html>"#;

    fn assembler(fetcher: MapFetcher, concurrency: usize) -> DoctorAssembler {
        let mut config = ClinicConfig::default().with_base_url(BASE);
        config.extract.detail_concurrency = concurrency;
        DoctorAssembler::new(Arc::new(fetcher), &config)
    }

    #[tokio::test]
    async fn test_assemble_merges_detail_pages_in_list_order() {
        let fetcher = MapFetcher::new()
            .page("/doctors/", LIST)
            .page("/doctors/ivanov/", IVANOV);

        let doctors = assembler(fetcher, 4).assemble().await.unwrap();

        assert_eq!(doctors.len(), 3);
        assert_eq!(doctors[0].name, "Иванов Иван Иванович");
        assert_eq!(doctors[0].photo_url, "https://clinic.test/upload/ivanov.jpg");
        assert_eq!(doctors[0].experience, "Стаж 15 лет");
        assert_eq!(doctors[0].schedule, "Пн-Пт 09:00-15:00");
        assert_eq!(doctors[0].education, "ДВГМУ, 2005");
        assert_eq!(
            doctors[0].certificates,
            vec!["Терапия, 2020", "Кардиология, 2022"]
        );
        assert_eq!(doctors[1].specialty, "Кардиолог");
        assert_eq!(doctors[2].name, "Сидоров Пётр");
        assert_ne!(doctors[0].id, doctors[1].id);
    }

    #[tokio::test]
    async fn test_missing_detail_page_degrades_to_empty() {
        // /doctors/petrova/ is not served and Сидоров has no link
        let fetcher = MapFetcher::new()
            .page("/doctors/", LIST)
            .page("/doctors/ivanov/", IVANOV);

        let doctors = assembler(fetcher, 2).assemble().await.unwrap();

        assert_eq!(doctors[1].schedule, "");
        assert_eq!(doctors[1].education, "");
        assert!(doctors[1].certificates.is_empty());
        assert_eq!(doctors[1].photo_url, "");
        assert!(doctors[2].certificates.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_fails_assembler() {
        let result = assembler(MapFetcher::new(), 4).assemble().await;
        assert!(matches!(result, Err(ClinicError::Network { .. })));
    }

    #[tokio::test]
    async fn test_list_without_doctors_is_extraction_failure() {
        let fetcher = MapFetcher::new().page("/doctors/", "<html><body>Скоро</body></html>");
        let result = assembler(fetcher, 4).assemble().await;
        assert!(matches!(result, Err(ClinicError::Extraction { .. })));
    }

    #[tokio::test]
    async fn test_detail_fetches_respect_concurrency_limit() {
        let mut list = String::from("<html><body>");
        let mut fetcher = MapFetcher::new().delay(Duration::from_millis(20));
        for i in 0..10 {
            list.push_str(&format!(
                r#"<div class="doctor-item"><a href="/doctors/{i}/"></a>
                <div class="doctor-name">Врач {i}</div><div class="doctor-specialty">ЛОР</div></div>"#
            ));
            fetcher = fetcher.page(
                &format!("/doctors/{}/", i),
                &format!("<body><div class=\"schedule\">День {}</div></body>", i),
            );
        }
        list.push_str("</body></html>");
        let fetcher = Arc::new(fetcher.page("/doctors/", &list));

        let mut config = ClinicConfig::default().with_base_url(BASE);
        config.extract.detail_concurrency = 3;
        let doctors = DoctorAssembler::new(fetcher.clone(), &config)
            .assemble()
            .await
            .unwrap();

        assert_eq!(doctors.len(), 10);
        for (i, doctor) in doctors.iter().enumerate() {
            assert_eq!(doctor.name, format!("Врач {}", i));
            assert_eq!(doctor.schedule, format!("День {}", i));
        }
        assert!(fetcher.max_in_flight() <= 3);
        assert!(fetcher.max_in_flight() > 1);
        assert_eq!(fetcher.hits().len(), 11);
    }
}
