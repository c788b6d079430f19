//! 外部系统适配器：消息代理、元数据服务、编曲生成服务与SQLite持久化

pub mod clients;
pub mod database;
pub mod message_queue;
pub mod message_queue_factory;
pub mod redis_stream;

pub use clients::{HttpArrangementClient, MusicBrainzClient};
pub use database::{DatabaseManager, SqliteWorkRepository};
pub use message_queue::RabbitMQTaskQueue;
pub use message_queue_factory::TaskQueueFactory;
pub use redis_stream::RedisStreamTaskQueue;
