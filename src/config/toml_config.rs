use crate::config::shapes::ShapeSet;
use crate::utils::error::{ClinicError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://khabarovsk.rzd-medicine.ru";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub departments: DepartmentsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub doctors_path: String,
    pub price_path: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            doctors_path: "/doctors/".to_string(),
            price_path: "/price/".to_string(),
            timeout_seconds: 20,
            user_agent: concat!("clinic-etl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// 同時抓取醫師詳細頁的上限
    pub detail_concurrency: usize,
    /// 價格欄位要移除的貨幣字樣
    pub currency_token: String,
    pub shapes: ShapeSet,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            detail_concurrency: 4,
            currency_token: "руб.".to_string(),
            shapes: ShapeSet::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 各組裝器的失敗互不影響，全部失敗才算刷新失敗
    #[default]
    Isolated,
    /// 任一組裝器失敗即中止整次刷新
    AbortOnAny,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartmentSourceKind {
    #[default]
    Static,
    Scrape,
}

/// 靜態科別資料的一筆（id 在組裝時產生）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub schedule: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartmentsConfig {
    pub source: DepartmentSourceKind,
    pub path: String,
    pub fallback: Vec<DepartmentSeed>,
}

impl Default for DepartmentsConfig {
    fn default() -> Self {
        Self {
            source: DepartmentSourceKind::Static,
            path: "/departments/".to_string(),
            fallback: default_departments(),
        }
    }
}

fn seed(
    name: &str,
    description: &str,
    equipment: &[&str],
    specializations: &[&str],
    schedule: &str,
) -> DepartmentSeed {
    DepartmentSeed {
        name: name.to_string(),
        description: description.to_string(),
        equipment: equipment.iter().map(|s| s.to_string()).collect(),
        specializations: specializations.iter().map(|s| s.to_string()).collect(),
        contact_info: "Регистратура: +7 (4212) 98-77-77".to_string(),
        schedule: schedule.to_string(),
    }
}

/// 網站沒有科別列表頁，預設使用這份資料
fn default_departments() -> Vec<DepartmentSeed> {
    vec![
        seed(
            "Терапевтическое отделение",
            "Диагностика и лечение заболеваний внутренних органов.",
            &["Электрокардиограф", "Спирометр"],
            &["Терапия", "Кардиология", "Гастроэнтерология"],
            "Пн-Пт 08:00-20:00, Сб 09:00-14:00",
        ),
        seed(
            "Хирургическое отделение",
            "Плановые операции и амбулаторная хирургия.",
            &["Операционный стол", "Эндоскопическая стойка"],
            &["Общая хирургия", "Травматология", "Урология"],
            "Пн-Пт 08:00-18:00",
        ),
        seed(
            "Отделение лучевой диагностики",
            "Рентгенологические и ультразвуковые исследования.",
            &["МРТ 1,5 Тл", "КТ", "Аппарат УЗИ экспертного класса"],
            &["Рентгенология", "Ультразвуковая диагностика"],
            "Ежедневно 08:00-21:00",
        ),
    ]
}

impl ClinicConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClinicError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ClinicError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CLINIC_BASE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ClinicError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.source.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.base_url", &self.source.base_url)?;
        validation::validate_non_empty_string("source.doctors_path", &self.source.doctors_path)?;
        validation::validate_non_empty_string("source.price_path", &self.source.price_path)?;
        validation::validate_range("source.timeout_seconds", self.source.timeout_seconds, 1, 300)?;
        validation::validate_positive_number(
            "extract.detail_concurrency",
            self.extract.detail_concurrency,
            1,
        )?;

        let shapes = &self.extract.shapes;
        for (field, shape) in [
            ("extract.shapes.doctor_list", &shapes.doctor_list),
            ("extract.shapes.doctor_detail", &shapes.doctor_detail),
            ("extract.shapes.price_list", &shapes.price_list),
            ("extract.shapes.department_list", &shapes.department_list),
        ] {
            shape.validate().map_err(|e| ClinicError::ConfigValidationError {
                field: field.to_string(),
                message: e.to_string(),
            })?;
        }

        if self.departments.source == DepartmentSourceKind::Scrape {
            validation::validate_non_empty_string("departments.path", &self.departments.path)?;
        }
        for (i, department) in self.departments.fallback.iter().enumerate() {
            validation::validate_non_empty_string(
                &format!("departments.fallback[{}].name", i),
                &department.name,
            )?;
        }

        Ok(())
    }
}

impl Validate for ClinicConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ClinicConfig::from_toml_str("").unwrap();

        assert_eq!(config, ClinicConfig::default());
        assert_eq!(config.source.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.extract.detail_concurrency, 4);
        assert_eq!(config.refresh.failure_policy, FailurePolicy::Isolated);
        assert_eq!(config.departments.source, DepartmentSourceKind::Static);
        assert!(!config.departments.fallback.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[source]
base_url = "https://clinic.example.com"
timeout_seconds = 10

[extract]
detail_concurrency = 8

[refresh]
failure_policy = "abort_on_any"

[departments]
source = "scrape"
path = "/otdeleniya/"
"#;

        let config = ClinicConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.source.base_url, "https://clinic.example.com");
        assert_eq!(config.source.doctors_path, "/doctors/");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.extract.detail_concurrency, 8);
        assert_eq!(config.refresh.failure_policy, FailurePolicy::AbortOnAny);
        assert_eq!(config.departments.source, DepartmentSourceKind::Scrape);
        assert_eq!(config.departments.path, "/otdeleniya/");
    }

    #[test]
    fn test_shape_override_from_toml() {
        let toml_content = r#"
[extract.shapes.doctor_list]
container = "li.staff"

[[extract.shapes.doctor_list.fields]]
name = "name"
selector = "span.fio"
required = true

[[extract.shapes.doctor_list.fields]]
name = "specialty"
selector = "span.position"
required = true
"#;

        let config = ClinicConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.extract.shapes.doctor_list.container, "li.staff");
        assert_eq!(config.extract.shapes.doctor_list.fields.len(), 2);
        assert_eq!(
            config.extract.shapes.price_list,
            ShapeSet::default().price_list
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CLINIC_ETL_TEST_BASE_URL", "https://test.clinic.ru");

        let toml_content = r#"
[source]
base_url = "${CLINIC_ETL_TEST_BASE_URL}"
"#;

        let config = ClinicConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source.base_url, "https://test.clinic.ru");

        std::env::remove_var("CLINIC_ETL_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = ClinicConfig::default().with_base_url("invalid-url");
        assert!(invalid_url.validate().is_err());

        let mut zero_workers = ClinicConfig::default();
        zero_workers.extract.detail_concurrency = 0;
        assert!(zero_workers.validate().is_err());

        let mut no_timeout = ClinicConfig::default();
        no_timeout.source.timeout_seconds = 0;
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn test_invalid_shape_selector_fails_validation() {
        let config = ClinicConfig::from_toml_str(
            r#"
[extract.shapes.price_list]
container = "div["
fields = []
"#,
        )
        .unwrap();

        match config.validate() {
            Err(ClinicError::ConfigValidationError { field, message }) => {
                assert_eq!(field, "extract.shapes.price_list");
                assert!(message.contains("div["));
            }
            other => panic!("expected shape validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[source]\nbase_url = \"https://file.clinic.ru\"\n")
            .unwrap();

        let config = ClinicConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.source.base_url, "https://file.clinic.ru");
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = ClinicConfig::from_toml_str("[source\nbase_url = 1");
        assert!(matches!(
            result,
            Err(ClinicError::ConfigValidationError { .. })
        ));
    }
}
