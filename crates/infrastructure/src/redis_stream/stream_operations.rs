use std::future::Future;

use ingest_core::{IngestError, IngestResult, QueuedTask, Task};
use redis::aio::ConnectionManager;
use redis::streams::StreamReadReply;
use tracing::{debug, warn};

/// stream条目中保存任务JSON的字段名
pub const TASK_FIELD: &str = "task";

/// 创建消费者组，stream不存在时一并创建；组已存在不算错误
pub(super) async fn ensure_consumer_group(
    conn: &mut ConnectionManager,
    stream: &str,
    group: &str,
) -> IngestResult<()> {
    let result: redis::RedisResult<String> = redis::cmd("XGROUP")
        .arg("CREATE")
        .arg(stream)
        .arg(group)
        .arg("0")
        .arg("MKSTREAM")
        .query_async(conn)
        .await;

    match result {
        Ok(_) => {
            debug!("已创建消费者组: {}", group);
            Ok(())
        }
        Err(e) if e.to_string().contains("BUSYGROUP") => {
            debug!("消费者组 {} 已存在", group);
            Ok(())
        }
        Err(e) => Err(IngestError::broker(format!(
            "创建消费者组 {group} 失败: {e}"
        ))),
    }
}

/// 把XREADGROUP的返回解析为任务，返回可用任务与无法解析的条目ID
pub fn parse_read_reply(reply: StreamReadReply) -> (Vec<QueuedTask>, Vec<String>) {
    let mut tasks = Vec::new();
    let mut malformed = Vec::new();

    for key in reply.keys {
        for entry in key.ids {
            let parsed = entry
                .get::<String>(TASK_FIELD)
                .ok_or_else(|| format!("缺少 {TASK_FIELD} 字段"))
                .and_then(|json| Task::from_json(&json).map_err(|e| e.to_string()));

            match parsed {
                Ok(task) => tasks.push(QueuedTask {
                    delivery_id: entry.id,
                    task,
                }),
                Err(reason) => {
                    warn!(entry_id = %entry.id, "丢弃无法解析的stream条目: {}", reason);
                    malformed.push(entry.id);
                }
            }
        }
    }

    (tasks, malformed)
}

/// 逐个确认无法解析的条目；确认失败只记录日志，不影响同批次的有效任务
pub(super) async fn ack_malformed<F, Fut>(entry_ids: Vec<String>, mut ack: F) -> usize
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = IngestResult<()>>,
{
    let mut acked = 0;
    for entry_id in entry_ids {
        match ack(entry_id.clone()).await {
            Ok(()) => acked += 1,
            Err(e) => warn!(entry_id = %entry_id, "确认无法解析的stream条目失败: {}", e),
        }
    }
    acked
}
