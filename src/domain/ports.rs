use crate::domain::model::Locator;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    fn delete_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 給使用者看的完整位置
    fn display_path(&self, path: &str) -> String;
}

/// 瀏覽器分頁的操作介面。找不到元素時回傳 `ScraperError::ElementNotFound`。
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;
    async fn title(&self) -> Result<Option<String>>;
    async fn current_url(&self) -> Result<Option<String>>;
    async fn count(&self, locator: &Locator) -> Result<usize>;
    async fn click(&self, locator: &Locator) -> Result<()>;
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;
    /// 依序讀取最多 `limit` 個符合元素的屬性，缺少屬性的元素略過
    async fn attributes(&self, locator: &Locator, name: &str, limit: usize)
        -> Result<Vec<String>>;
}
