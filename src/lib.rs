//! # 歌曲采集任务管道
//!
//! 把艺人采集和单曲采集任务交给消息代理上的Worker执行；
//! 消息代理未配置或不可用时，降级为在本进程内异步执行。
//! 降级是单向的，进程重启后才会重新尝试消息代理。

pub mod pipeline;

pub use ingest_core::{config::AppConfig, ExecutionMode, IngestError, Task, TaskKind};
pub use pipeline::{BrokerConnection, Collaborators, IngestPipeline};
