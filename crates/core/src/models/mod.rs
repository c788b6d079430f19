//! # 数据模型
//!
//! 采集管道的核心数据结构：任务、元数据协作方返回的录音信息、
//! 持久化协作方的作品与编曲记录，以及处理器的执行结果。
//!
//! 作品与编曲的不变式（每个外部ID一条作品、编曲版本单调递增）
//! 由持久化协作方负责，这里只定义字段。

pub mod execution_mode;
pub mod outcome;
pub mod recording;
pub mod task;

pub use execution_mode::*;
pub use outcome::*;
pub use recording::*;
pub use task::*;
