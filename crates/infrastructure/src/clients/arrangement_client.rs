use std::time::Duration;

use async_trait::async_trait;
use ingest_core::{
    config::GenerationConfig, ArrangementDraft, ArrangementGenerator, IngestError, IngestResult,
};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    recording_id: &'a str,
}

/// 通过HTTP调用编曲生成服务
pub struct HttpArrangementClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpArrangementClient {
    pub fn new(config: &GenerationConfig) -> IngestResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| IngestError::Network(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/arrangements", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }
}

#[async_trait]
impl ArrangementGenerator for HttpArrangementClient {
    async fn generate(&self, recording_id: &str) -> IngestResult<ArrangementDraft> {
        debug!(recording_id = %recording_id, "请求生成编曲");
        metrics::counter!("ingest_generation_requests_total").increment(1);

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .json(&GenerateRequest { recording_id });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IngestError::Network(format!("请求编曲服务失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Generation(format!(
                "编曲服务返回 {status}: {body}"
            )));
        }

        response
            .json::<ArrangementDraft>()
            .await
            .map_err(|e| IngestError::Generation(format!("解析编曲结果失败: {e}")))
    }
}
