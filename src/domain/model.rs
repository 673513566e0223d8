use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

/// 萃取器的輸出：欄位名稱 -> 值（字串或字串陣列）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    /// 取得文字欄位，缺少或非字串時回傳空字串
    pub fn text(&self, field: &str) -> String {
        self.data
            .get(field)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// 取得字串陣列欄位，缺少時回傳空陣列
    pub fn list(&self, field: &str) -> Vec<String> {
        match self.data.get(field) {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            Some(serde_json::Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub photo_url: String,
    pub experience: String,
    pub schedule: String,
    pub education: String,
    pub certificates: Vec<String>,
}

/// 醫師詳細頁的內容；頁面缺失時為預設空值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorDetail {
    pub schedule: String,
    pub education: String,
    pub certificates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub equipment: Vec<String>,
    pub specializations: Vec<String>,
    pub contact_info: String,
    pub schedule: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub price_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Doctors,
    Departments,
    Services,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Doctors => "doctors",
            Category::Departments => "departments",
            Category::Services => "services",
        };
        f.write_str(name)
    }
}

/// 單一組裝器失敗的紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFailure {
    pub category: Category,
    pub message: String,
}

impl fmt::Display for CategoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// 一次刷新的完整結果，建立後不可變
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub doctors: Vec<Doctor>,
    pub departments: Vec<Department>,
    pub services: Vec<Service>,
    pub fetched_at: DateTime<Utc>,
    pub partial_failures: Vec<CategoryFailure>,
}

impl Snapshot {
    pub fn new(doctors: Vec<Doctor>, departments: Vec<Department>, services: Vec<Service>) -> Self {
        Self {
            doctors,
            departments,
            services,
            fetched_at: Utc::now(),
            partial_failures: Vec::new(),
        }
    }

    pub fn with_failures(mut self, failures: Vec<CategoryFailure>) -> Self {
        self.partial_failures = failures;
        self
    }

    /// 至少有一個類別因失敗而為空
    pub fn is_partial(&self) -> bool {
        !self.partial_failures.is_empty()
    }

    /// 排序且不重複的服務類別
    pub fn service_categories(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|s| s.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 不分大小寫的關鍵字篩選；空白查詢回傳原快照的複本
    pub fn filtered(&self, query: &str) -> Snapshot {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.clone();
        }
        let hit = |text: &str| text.to_lowercase().contains(&query);

        Snapshot {
            doctors: self
                .doctors
                .iter()
                .filter(|d| hit(&d.name) || hit(&d.specialty))
                .cloned()
                .collect(),
            departments: self
                .departments
                .iter()
                .filter(|d| hit(&d.name) || hit(&d.description))
                .cloned()
                .collect(),
            services: self
                .services
                .iter()
                .filter(|s| hit(&s.name) || hit(&s.category))
                .cloned()
                .collect(),
            fetched_at: self.fetched_at,
            partial_failures: self.partial_failures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, category: &str) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: 0.0,
            category: category.to_string(),
            price_code: String::new(),
        }
    }

    #[test]
    fn test_record_accessors_default_to_empty() {
        let mut data = HashMap::new();
        data.insert("name".to_string(), serde_json::json!("Иванов"));
        data.insert("certs".to_string(), serde_json::json!(["A", "B"]));
        let record = Record { data };

        assert_eq!(record.text("name"), "Иванов");
        assert_eq!(record.text("missing"), "");
        assert_eq!(record.list("certs"), vec!["A", "B"]);
        assert!(record.list("missing").is_empty());
    }

    #[test]
    fn test_service_categories_sorted_and_unique() {
        let snapshot = Snapshot::new(
            vec![],
            vec![],
            vec![
                service("MRI", "Диагностика"),
                service("ECG", "Анализы"),
                service("CT", "Диагностика"),
            ],
        );

        assert_eq!(snapshot.service_categories(), vec!["Анализы", "Диагностика"]);
        assert!(!snapshot.is_partial());
    }

    #[test]
    fn test_filtered_is_case_insensitive() {
        let snapshot = Snapshot::new(
            vec![],
            vec![],
            vec![service("МРТ головы", "Диагностика"), service("ОАК", "Анализы")],
        );

        let found = snapshot.filtered("мрт");
        assert_eq!(found.services.len(), 1);
        assert_eq!(found.services[0].name, "МРТ головы");

        assert_eq!(snapshot.filtered("АНАЛИЗЫ").services.len(), 1);
        assert_eq!(snapshot.filtered("  ").services.len(), 2);
    }
}
