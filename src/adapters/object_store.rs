use chrono::{DateTime, Utc};
use std::path::Path;

/// 依日期分層的物件鍵：`<prefix>/<YYYY>/<MM>/<DD>/<YYYYmmdd_HHMMSS>_<id>_<file>`
pub fn object_key(prefix: &str, now: DateTime<Utc>, unique_id: &str, file_name: &str) -> String {
    let name = format!("{}_{}_{}", now.format("%Y%m%d_%H%M%S"), unique_id, file_name);
    let date = now.format("%Y/%m/%d").to_string();
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", date, name)
    } else {
        format!("{}/{}/{}", prefix, date, name)
    }
}

pub fn public_url(public_base: Option<&str>, bucket: &str, key: &str) -> String {
    match public_base {
        Some(base) if !base.trim().is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), key)
        }
        _ => format!("https://{}.r2.dev/{}", bucket, key),
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(feature = "object-store")]
pub use s3::{ObjectStoreConfig, S3ObjectStore, UploadResult};

#[cfg(feature = "object-store")]
mod s3 {
    use super::{content_type_for, object_key, public_url};
    use crate::core::Storage;
    use crate::utils::error::{Result, ScraperError};
    use crate::utils::validation::{self, Validate};
    use aws_sdk_s3::config::Credentials;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::Client as S3Client;
    use std::env;
    use std::path::Path;

    #[derive(Debug, Clone)]
    pub struct ObjectStoreConfig {
        pub endpoint_url: String,
        pub bucket: String,
        pub access_key_id: String,
        pub secret_access_key: String,
        pub region: String,
        pub public_url: Option<String>,
    }

    fn required(name: &str) -> Result<String> {
        env::var(name).map_err(|_| ScraperError::MissingConfigError {
            field: name.to_string(),
        })
    }

    impl ObjectStoreConfig {
        pub fn from_env() -> Result<Self> {
            let endpoint_url = match env::var("OBJECT_STORE_ENDPOINT") {
                Ok(endpoint) => endpoint,
                Err(_) => format!(
                    "https://{}.r2.cloudflarestorage.com",
                    required("R2_ACCOUNT_ID")?
                ),
            };

            Ok(Self {
                endpoint_url,
                bucket: required("R2_BUCKET")?,
                access_key_id: required("R2_ACCESS_KEY_ID")?,
                secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
                region: env::var("OBJECT_STORE_REGION").unwrap_or_else(|_| "auto".to_string()),
                public_url: env::var("R2_PUBLIC_URL").ok(),
            })
        }
    }

    impl Validate for ObjectStoreConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_url("OBJECT_STORE_ENDPOINT", &self.endpoint_url)?;
            validation::validate_non_empty_string("R2_BUCKET", &self.bucket)?;
            validation::validate_non_empty_string("R2_ACCESS_KEY_ID", &self.access_key_id)?;
            validation::validate_non_empty_string("R2_SECRET_ACCESS_KEY", &self.secret_access_key)?;
            validation::validate_non_empty_string("OBJECT_STORE_REGION", &self.region)?;
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    pub struct UploadResult {
        pub key: String,
        pub public_url: String,
        pub size: u64,
    }

    #[derive(Debug, Clone)]
    pub struct S3ObjectStore {
        client: S3Client,
        bucket: String,
        public_url: Option<String>,
    }

    fn store_error(action: &str, e: impl std::fmt::Display) -> ScraperError {
        ScraperError::ObjectStoreError {
            message: format!("{} failed: {}", action, e),
        }
    }

    impl S3ObjectStore {
        pub async fn connect(config: &ObjectStoreConfig) -> Self {
            let credentials = Credentials::new(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
                None,
                None,
                "trailer-scraper",
            );

            let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .endpoint_url(&config.endpoint_url)
                .region(aws_config::Region::new(config.region.clone()))
                .credentials_provider(credentials)
                .retry_config(aws_config::retry::RetryConfig::standard().with_max_attempts(3))
                .load()
                .await;

            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(true)
                .build();

            Self {
                client: S3Client::from_conf(s3_config),
                bucket: config.bucket.clone(),
                public_url: config.public_url.clone(),
            }
        }

        pub fn bucket(&self) -> &str {
            &self.bucket
        }

        /// 上傳本機檔案到日期前綴底下
        pub async fn upload_file(&self, path: &Path, prefix: &str) -> Result<UploadResult> {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| ScraperError::ConfigError {
                    message: format!("{} is not a file", path.display()),
                })?;

            let now = chrono::Utc::now();
            let unique = uuid::Uuid::new_v4().simple().to_string();
            let key = object_key(prefix, now, &unique[..8], &file_name);
            let size = tokio::fs::metadata(path).await?.len();

            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| store_error("Reading upload body", e))?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(body)
                .content_type(content_type_for(path))
                .metadata("upload-date", now.to_rfc3339())
                .metadata("original-filename", file_name.as_str())
                .send()
                .await
                .map_err(|e| store_error("PutObject", e.into_service_error()))?;

            tracing::info!("📤 Uploaded {} as {}", file_name, key);
            Ok(UploadResult {
                public_url: public_url(self.public_url.as_deref(), &self.bucket, &key),
                key,
                size,
            })
        }
    }

    impl Storage for S3ObjectStore {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(path)
                .send()
                .await
                .map_err(|e| store_error("GetObject", e.into_service_error()))?;

            let data = resp
                .body
                .collect()
                .await
                .map_err(|e| store_error("Reading object body", e))?;

            Ok(data.into_bytes().to_vec())
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(path)
                .content_type(content_type_for(Path::new(path)))
                .body(ByteStream::from(data.to_vec()))
                .send()
                .await
                .map_err(|e| store_error("PutObject", e.into_service_error()))?;
            Ok(())
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(path)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(e) => {
                    let service_error = e.into_service_error();
                    if service_error.is_not_found() {
                        Ok(false)
                    } else {
                        Err(store_error("HeadObject", service_error))
                    }
                }
            }
        }

        async fn delete_file(&self, path: &str) -> Result<()> {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(path)
                .send()
                .await
                .map_err(|e| store_error("DeleteObject", e.into_service_error()))?;
            Ok(())
        }

        fn display_path(&self, path: &str) -> String {
            format!("s3://{}/{}", self.bucket, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_object_key_is_date_prefixed() {
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            object_key("trailers/", now, "ab12cd34", "clip.mp4"),
            "trailers/2026/03/07/20260307_090501_ab12cd34_clip.mp4"
        );
        assert_eq!(
            object_key("", now, "ab12cd34", "clip.mp4"),
            "2026/03/07/20260307_090501_ab12cd34_clip.mp4"
        );
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url(Some("https://media.example.com/"), "bucket", "a/b.mp4"),
            "https://media.example.com/a/b.mp4"
        );
        assert_eq!(
            public_url(None, "bucket", "a/b.mp4"),
            "https://bucket.r2.dev/a/b.mp4"
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("x/clip.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("ledger.json")), "application/json");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }
}
