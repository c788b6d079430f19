//! 采集管道核心库
//!
//! 定义任务模型、错误类型、配置模型，以及调度器、处理器与外部协作方之间的接口。

pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use errors::*;
pub use models::*;
pub use traits::*;
