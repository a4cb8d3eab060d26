use crate::core::{HrefLedger, MergeReport, Storage};
use crate::utils::error::{Result, ScraperError};
use chrono::{DateTime, Utc};

/// 網域對應的檔名，非 `[A-Za-z0-9._-]` 的字元換成底線
pub fn ledger_file_name(domain: &str) -> String {
    let safe: String = domain
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.json", safe)
}

pub struct LedgerStore<S: Storage> {
    storage: S,
}

impl<S: Storage> LedgerStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// 讀取網域的紀錄；檔案不存在回傳 None，格式錯誤則回傳錯誤且不覆寫
    pub async fn load(&self, domain: &str) -> Result<Option<HrefLedger>> {
        let path = ledger_file_name(domain);
        if !self.storage.exists(&path).await? {
            return Ok(None);
        }

        let data = self.storage.read_file(&path).await?;
        let mut ledger: HrefLedger =
            serde_json::from_slice(&data).map_err(|e| ScraperError::LedgerError {
                message: format!("{} is not a valid ledger: {}", self.storage.display_path(&path), e),
            })?;
        ledger.normalize();
        Ok(Some(ledger))
    }

    pub async fn merge_and_save(&self, domain: &str, hrefs: Vec<String>) -> Result<MergeReport> {
        self.merge_and_save_at(domain, hrefs, Utc::now()).await
    }

    pub async fn merge_and_save_at(
        &self,
        domain: &str,
        hrefs: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<MergeReport> {
        let mut ledger = match self.load(domain).await? {
            Some(ledger) => ledger,
            None => {
                tracing::info!("📒 Creating new ledger for {}", domain);
                HrefLedger::new(domain, now)
            }
        };

        let added = ledger.merge(hrefs, now);

        let path = ledger_file_name(domain);
        let json = serde_json::to_vec_pretty(&ledger)?;
        self.storage.write_file(&path, &json).await?;

        tracing::info!(
            "📒 Ledger {} updated: {} new, {} total",
            domain,
            ledger.new_added_count,
            ledger.total_count
        );

        Ok(MergeReport {
            domain: domain.to_string(),
            ledger_path: self.storage.display_path(&path),
            added,
            total_count: ledger.total_count,
        })
    }
}
