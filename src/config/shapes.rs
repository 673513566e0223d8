use crate::core::extractor::{CountRule, FieldRule, Shape};
use serde::{Deserialize, Serialize};

/// 價格表中找不到標題時使用的類別
pub const DEFAULT_SERVICE_CATEGORY: &str = "General services";

/// 每個頁面的結構描述；標記變動時只需改設定檔
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeSet {
    pub doctor_list: Shape,
    pub doctor_detail: Shape,
    pub price_list: Shape,
    pub department_list: Shape,
}

impl Default for ShapeSet {
    fn default() -> Self {
        Self {
            doctor_list: Shape {
                container: "div.doctor-item".to_string(),
                min_count: None,
                fields: vec![
                    FieldRule::text("name", "div.doctor-name").required(),
                    FieldRule::text("specialty", "div.doctor-specialty").required(),
                    FieldRule::attribute("photo", "img", "src"),
                    FieldRule::text("experience", "div.doctor-experience"),
                    FieldRule::attribute("detail_url", "a", "href"),
                ],
            },
            doctor_detail: Shape {
                container: "body".to_string(),
                min_count: None,
                fields: vec![
                    FieldRule::text("schedule", "div.schedule"),
                    FieldRule::text("education", "div.education"),
                    FieldRule::all_text("certificates", "div.certificates"),
                ],
            },
            price_list: Shape {
                container: "div.price-list table tr".to_string(),
                min_count: Some(CountRule {
                    selector: "td".to_string(),
                    min: 3,
                }),
                fields: vec![
                    FieldRule::nth("name", "td", 0).required(),
                    FieldRule::nth("price", "td", 1),
                    FieldRule::nth("price_code", "td", 2),
                    FieldRule::nearest_heading_within("category", "h2", "div.price-list")
                        .with_default(DEFAULT_SERVICE_CATEGORY),
                ],
            },
            department_list: Shape {
                container: "div.department-item".to_string(),
                min_count: None,
                fields: vec![
                    FieldRule::first_of("name", &["div.department-name", "h3", "h2"]).required(),
                    FieldRule::text("description", "div.department-description"),
                    FieldRule::all_text("equipment", "ul.equipment li"),
                    FieldRule::all_text("specializations", "ul.specializations li"),
                    FieldRule::text("contact_info", "div.contacts"),
                    FieldRule::text("schedule", "div.schedule"),
                ],
            },
        }
    }
}
