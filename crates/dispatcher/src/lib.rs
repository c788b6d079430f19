//! # 任务调度
//!
//! 双模式调度器及其配套组件：
//!
//! - [`Dispatcher`]：`submit` 的实现，决定任务进入消息代理还是在本进程内执行
//! - [`ModeState`]：Broker → Fallback 的单向状态机
//! - [`BrokerConnectionMonitor`]：监视代理连接，首次失败时触发降级
//! - [`FailurePolicy`]：进程内任务失败的处理策略

pub mod connection_monitor;
pub mod dispatcher;
pub mod mode;
pub mod strategies;

#[cfg(test)]
pub mod test_utils;

pub use connection_monitor::{BrokerConnectionMonitor, ConnectionMonitorConfig};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use mode::ModeState;
pub use strategies::{best_effort, BestEffort, FailurePolicy};
