//! 配置管理
//!
//! 配置来源按优先级从低到高：
//!
//! 1. 各配置段的默认值
//! 2. TOML配置文件（`-c` 指定，或默认路径 `config/ingest.toml`、`ingest.toml`、`/etc/ingest/config.toml`）
//! 3. `INGEST__` 前缀的环境变量，段与字段用 `__` 分隔
//!
//! ```toml
//! [broker]
//! url = "redis://127.0.0.1:6379/0"   # 省略则从启动起使用Fallback模式
//!
//! [ingest]
//! artist_search_limit = 10
//! fallback_fanout_delay_ms = 1000
//! ```

pub mod models;

pub use models::*;
