use crate::utils::error::Result;
use async_trait::async_trait;

/// 取得原始 HTML 的傳輸層
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// 把抓取到的頁面組裝成某一類型的領域紀錄
#[async_trait]
pub trait Assembler: Send + Sync {
    type Output: Send;

    fn name(&self) -> &str;

    async fn assemble(&self) -> Result<Vec<Self::Output>>;
}
