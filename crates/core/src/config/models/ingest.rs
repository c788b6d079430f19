use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 任务处理器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 每个艺人最多发现的录音数
    pub artist_search_limit: usize,
    /// Fallback模式下扇出提交之间的间隔（毫秒）
    pub fallback_fanout_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            artist_search_limit: 10,
            fallback_fanout_delay_ms: 1000,
        }
    }
}

impl IngestConfig {
    pub fn fallback_fanout_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_fanout_delay_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.artist_search_limit == 0 {
            return Err(anyhow::anyhow!("艺人搜索数量上限必须大于0"));
        }

        if self.artist_search_limit > 100 {
            return Err(anyhow::anyhow!(
                "艺人搜索数量上限不能超过100: {}",
                self.artist_search_limit
            ));
        }

        Ok(())
    }
}

/// 远端Worker配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub max_concurrent_tasks: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 4,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent_tasks == 0 {
            return Err(anyhow::anyhow!("最大并发任务数必须大于0"));
        }
        Ok(())
    }
}
