//! 以宣告式 `Shape` 描述頁面結構，從 HTML 中萃取 `Record`。
//!
//! 來源網站的標記是手寫且會變動的，所以萃取是逐筆盡力而為：
//! 選擇器失敗的欄位變成空值，只有必填欄位為空或不符合最少數量規則時才丟棄該筆。

use crate::domain::model::Record;
use crate::utils::error::{ClinicError, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 欄位的取值規則
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extraction {
    /// 第一個符合元素的文字
    #[default]
    Text,
    /// 第一個帶有此屬性的符合元素之屬性值
    Attribute { name: String },
    /// 依序嘗試多個選擇器，取第一個非空文字
    FirstOf { selectors: Vec<String> },
    /// 第 n 個符合元素的文字（從 0 起算）
    Nth { index: usize },
    /// 所有符合元素的文字，保留順序
    AllText,
    /// 往上層尋找最近的前置標題；`within` 設定時，走到符合的祖先為止
    NearestHeading {
        #[serde(default)]
        within: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    /// 相對於容器的選擇器；省略時代表容器本身
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub rule: Extraction,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
}

impl FieldRule {
    pub fn text(name: &str, selector: &str) -> Self {
        Self::new(name, Some(selector), Extraction::Text)
    }

    pub fn attribute(name: &str, selector: &str, attribute: &str) -> Self {
        Self::new(
            name,
            Some(selector),
            Extraction::Attribute {
                name: attribute.to_string(),
            },
        )
    }

    pub fn nth(name: &str, selector: &str, index: usize) -> Self {
        Self::new(name, Some(selector), Extraction::Nth { index })
    }

    pub fn all_text(name: &str, selector: &str) -> Self {
        Self::new(name, Some(selector), Extraction::AllText)
    }

    pub fn first_of(name: &str, selectors: &[&str]) -> Self {
        Self::new(
            name,
            None,
            Extraction::FirstOf {
                selectors: selectors.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    pub fn nearest_heading(name: &str, heading_selector: &str) -> Self {
        Self::new(
            name,
            Some(heading_selector),
            Extraction::NearestHeading { within: None },
        )
    }

    /// 只在 `scope` 祖先之內尋找標題
    pub fn nearest_heading_within(name: &str, heading_selector: &str, scope: &str) -> Self {
        Self::new(
            name,
            Some(heading_selector),
            Extraction::NearestHeading {
                within: Some(scope.to_string()),
            },
        )
    }

    pub fn new(name: &str, selector: Option<&str>, rule: Extraction) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.map(str::to_string),
            rule,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// 容器內至少要有 `min` 個符合 `selector` 的元素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRule {
    pub selector: String,
    pub min: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub container: String,
    #[serde(default)]
    pub min_count: Option<CountRule>,
    pub fields: Vec<FieldRule>,
}

impl Shape {
    /// 編譯所有選擇器，不讀取任何標記
    pub fn validate(&self) -> Result<()> {
        CompiledShape::compile(self).map(|_| ())
    }
}

/// 萃取單一完整頁面的結果
pub fn extract(html: &str, shape: &Shape) -> Result<Vec<Record>> {
    let compiled = CompiledShape::compile(shape)?;
    let document = Html::parse_document(html);
    compiled.extract_from(&document)
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ClinicError::ConfigError {
        message: format!("Invalid selector '{}': {}", selector, e),
    })
}

fn normalize_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

enum CompiledRule {
    Text,
    Attribute(String),
    FirstOf(Vec<Selector>),
    Nth(usize),
    AllText,
    NearestHeading(Option<Selector>),
}

struct CompiledField {
    name: String,
    selector: Option<Selector>,
    rule: CompiledRule,
    required: bool,
    default: Option<String>,
}

struct CompiledShape {
    container_source: String,
    container: Selector,
    min_count: Option<(Selector, usize)>,
    fields: Vec<CompiledField>,
}

impl CompiledShape {
    fn compile(shape: &Shape) -> Result<Self> {
        let min_count = match &shape.min_count {
            Some(rule) => Some((compile(&rule.selector)?, rule.min)),
            None => None,
        };

        let mut fields = Vec::with_capacity(shape.fields.len());
        for field in &shape.fields {
            let selector = field.selector.as_deref().map(compile).transpose()?;
            let rule = match &field.rule {
                Extraction::Text => CompiledRule::Text,
                Extraction::Attribute { name } => CompiledRule::Attribute(name.clone()),
                Extraction::FirstOf { selectors } => CompiledRule::FirstOf(
                    selectors
                        .iter()
                        .map(|s| compile(s))
                        .collect::<Result<Vec<_>>>()?,
                ),
                Extraction::Nth { index } => CompiledRule::Nth(*index),
                Extraction::AllText => CompiledRule::AllText,
                Extraction::NearestHeading { within } => {
                    if selector.is_none() {
                        return Err(ClinicError::ConfigError {
                            message: format!(
                                "Field '{}' uses nearest_heading without a heading selector",
                                field.name
                            ),
                        });
                    }
                    CompiledRule::NearestHeading(within.as_deref().map(compile).transpose()?)
                }
            };
            fields.push(CompiledField {
                name: field.name.clone(),
                selector,
                rule,
                required: field.required,
                default: field.default.clone(),
            });
        }

        Ok(Self {
            container_source: shape.container.clone(),
            container: compile(&shape.container)?,
            min_count,
            fields,
        })
    }

    fn extract_from(&self, document: &Html) -> Result<Vec<Record>> {
        let containers: Vec<ElementRef> = document.select(&self.container).collect();
        if containers.is_empty() {
            return Err(ClinicError::extraction(
                self.container_source.clone(),
                "no container elements matched",
            ));
        }

        tracing::debug!(
            "Found {} containers for '{}'",
            containers.len(),
            self.container_source
        );

        let mut records = Vec::with_capacity(containers.len());
        for (index, element) in containers.iter().enumerate() {
            if let Some(record) = self.extract_element(element, index) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn extract_element(&self, element: &ElementRef, index: usize) -> Option<Record> {
        if let Some((selector, min)) = &self.min_count {
            let count = element.select(selector).count();
            if count < *min {
                tracing::debug!(
                    "Skipping '{}' #{}: {} matches, need {}",
                    self.container_source,
                    index,
                    count,
                    min
                );
                return None;
            }
        }

        let mut data = HashMap::with_capacity(self.fields.len());
        for field in &self.fields {
            let mut value = self.resolve(field, element);

            if is_empty(&value) {
                if let Some(default) = &field.default {
                    value = serde_json::Value::String(default.clone());
                } else if field.required {
                    tracing::warn!(
                        "⚠️ Dropping '{}' #{}: required field '{}' is empty",
                        self.container_source,
                        index,
                        field.name
                    );
                    return None;
                }
            }
            data.insert(field.name.clone(), value);
        }

        Some(Record { data })
    }

    fn resolve(&self, field: &CompiledField, element: &ElementRef) -> serde_json::Value {
        use serde_json::Value;

        let targets: Vec<ElementRef> = match &field.selector {
            Some(selector) if !matches!(field.rule, CompiledRule::NearestHeading(_)) => {
                element.select(selector).collect()
            }
            _ => vec![*element],
        };

        match &field.rule {
            CompiledRule::Text => Value::String(
                targets
                    .first()
                    .map(normalize_text)
                    .unwrap_or_default(),
            ),
            CompiledRule::Attribute(name) => Value::String(
                targets
                    .iter()
                    .find_map(|t| t.value().attr(name))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default(),
            ),
            CompiledRule::FirstOf(selectors) => {
                let found = targets.first().and_then(|scope| {
                    selectors.iter().find_map(|selector| {
                        scope
                            .select(selector)
                            .map(|e| normalize_text(&e))
                            .find(|text| !text.is_empty())
                    })
                });
                Value::String(found.unwrap_or_default())
            }
            CompiledRule::Nth(index) => Value::String(
                targets
                    .get(*index)
                    .map(normalize_text)
                    .unwrap_or_default(),
            ),
            CompiledRule::AllText => Value::Array(
                targets
                    .iter()
                    .map(normalize_text)
                    .filter(|text| !text.is_empty())
                    .map(Value::String)
                    .collect(),
            ),
            CompiledRule::NearestHeading(scope) => {
                let heading = field
                    .selector
                    .as_ref()
                    .and_then(|selector| nearest_heading(element, selector, scope.as_ref()));
                Value::String(heading.unwrap_or_default())
            }
        }
    }
}

fn is_empty(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Null => true,
        _ => false,
    }
}

/// 從元素往上走，在每一層的前置兄弟節點中尋找最接近且有文字的標題。
/// 有 `scope` 時，走到符合 `scope` 的祖先就停止，不看它外面的兄弟節點。
fn nearest_heading(
    element: &ElementRef,
    heading: &Selector,
    scope: Option<&Selector>,
) -> Option<String> {
    let mut current = *element;
    loop {
        if scope.is_some_and(|scope| scope.matches(&current)) {
            return None;
        }
        for sibling in current.prev_siblings().filter_map(ElementRef::wrap) {
            if heading.matches(&sibling) {
                let text = normalize_text(&sibling);
                if !text.is_empty() {
                    return Some(text);
                }
                continue;
            }
            let inner: Vec<ElementRef> = sibling.select(heading).collect();
            if let Some(text) = inner
                .iter()
                .rev()
                .map(normalize_text)
                .find(|t| !t.is_empty())
            {
                return Some(text);
            }
        }
        current = current.parent().and_then(ElementRef::wrap)?;
    }
}
