use super::local::move_file;
use super::{ensure_dir, Transport, UPLOAD_TIMEOUT_SECS};
use crate::core::conflict::CollisionResolver;
use crate::core::scanner::FileCandidate;
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// 访问密钥请求头
pub const ACCESS_KEY_HEADER: &str = "x-access-key";

/// 错误响应正文最多保留的字符数
const BODY_EXCERPT_CHARS: usize = 200;

/// HTTP 上传传输
///
/// 以 multipart 表单（字段 `file`）上传，只有 200 才算成功；成功后把源文件移入已发送目录。
/// 其他情况源文件原地保留，下次运行会重新被扫描到。
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    access_key: String,
    sent_dir: PathBuf,
    timeout_secs: u64,
    name: String,
}

impl HttpTransport {
    pub fn new(
        endpoint: &str,
        access_key: &str,
        sent_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_timeout(endpoint, access_key, sent_dir, UPLOAD_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        endpoint: &str,
        access_key: &str,
        sent_dir: impl Into<PathBuf>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            access_key: access_key.to_string(),
            sent_dir: sent_dir.into(),
            timeout_secs,
            name: format!("http:{}", endpoint),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_request_error(&self, e: reqwest::Error) -> TransferError {
        if e.is_timeout() {
            TransferError::Timeout(self.timeout_secs)
        } else {
            TransferError::Network(e.to_string())
        }
    }

    /// 上传单个文件
    async fn upload(&self, candidate: &FileCandidate) -> std::result::Result<(), TransferError> {
        let path = &candidate.source_path;
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| TransferError::read(path, e))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| TransferError::read(path, e))?
            .len();

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(candidate.name.clone());
        let form = Form::new().part("file", part);

        debug!("上传: {} ({} 字节) -> {}", path.display(), length, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransferError::HttpStatus {
            status: status.as_u16(),
            body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn prepare(&self) -> Result<()> {
        ensure_dir(&self.sent_dir).await
    }

    fn destination_for(&self, candidate: &FileCandidate) -> PathBuf {
        self.sent_dir.join(&candidate.name)
    }

    async fn deliver(
        &self,
        candidate: &FileCandidate,
        desired: &Path,
    ) -> std::result::Result<PathBuf, TransferError> {
        self.upload(candidate).await?;

        // 已确认送达，归档时不能覆盖之前发送的同名文件
        let target = CollisionResolver::resolve(desired);
        move_file(&candidate.source_path, &target)
            .await
            .map_err(|e| {
                warn!("已上传但归档失败: {} - {}", candidate.source_path.display(), e);
                let source = match e {
                    TransferError::Read { source, .. } | TransferError::Write { source, .. } => {
                        source
                    }
                    other => std::io::Error::other(other.to_string()),
                };
                TransferError::Archive {
                    path: candidate.source_path.clone(),
                    source,
                }
            })?;

        Ok(target)
    }

    fn output_root(&self) -> &Path {
        &self.sent_dir
    }

    fn writes_manifest(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, "hello").unwrap();

        // 端口 1 上通常没有服务
        let transport = HttpTransport::with_timeout(
            "http://127.0.0.1:1/api/upload",
            "key",
            dir.path().join("sent"),
            5,
        )
        .unwrap();
        transport.prepare().await.unwrap();

        let candidate = FileCandidate {
            source_path: src.clone(),
            name: "a.txt".to_string(),
            size_bytes: 5,
            modified_time: 0,
            category: None,
        };
        let err = transport
            .deliver(&candidate, &transport.destination_for(&candidate))
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind(),
            crate::error::FailureKind::Network | crate::error::FailureKind::Timeout
        ));
        assert!(src.exists());
    }

    #[test]
    fn test_destination_is_sent_archive() {
        let transport =
            HttpTransport::new("http://localhost:8080/api/upload", "k", "/stick/sent").unwrap();
        let candidate = FileCandidate {
            source_path: PathBuf::from("/stick/zone/a.txt"),
            name: "a.txt".to_string(),
            size_bytes: 1,
            modified_time: 0,
            category: None,
        };
        assert_eq!(transport.destination_for(&candidate), PathBuf::from("/stick/sent/a.txt"));
        assert!(!transport.writes_manifest());
    }
}
