use serde::{Deserialize, Serialize};

/// 执行模式
///
/// - `Broker`: 任务交给分布式消息代理，由远端Worker异步处理
/// - `Fallback`: 任务在当前进程内异步执行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Broker,
    Fallback,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Broker => "broker",
            ExecutionMode::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
