//! # 采集任务处理
//!
//! 任务处理器与Broker模式下的远程Worker。
//! 处理器只依赖 `TaskSubmitter` 提交扇出任务，不感知当前是哪个执行模式在调用它。

pub mod broker_worker;
pub mod handlers;

#[cfg(test)]
pub mod test_utils;

pub use broker_worker::{BrokerWorker, BrokerWorkerConfig};
pub use handlers::{HandlerConfig, IngestHandlers};
