use std::sync::atomic::{AtomicU8, Ordering};

use ingest_core::ExecutionMode;
use tracing::warn;

const MODE_BROKER: u8 = 0;
const MODE_FALLBACK: u8 = 1;

/// 执行模式状态机
///
/// 只有两个状态和一次转换：Broker → Fallback。
/// 转换只发生一次，并且只由完成转换的调用方记录一条诊断日志；
/// 进程生命周期内不会回到Broker。
#[derive(Debug)]
pub struct ModeState {
    mode: AtomicU8,
}

impl ModeState {
    pub fn new(initial: ExecutionMode) -> Self {
        let value = match initial {
            ExecutionMode::Broker => MODE_BROKER,
            ExecutionMode::Fallback => MODE_FALLBACK,
        };
        Self {
            mode: AtomicU8::new(value),
        }
    }

    pub fn current(&self) -> ExecutionMode {
        match self.mode.load(Ordering::Acquire) {
            MODE_BROKER => ExecutionMode::Broker,
            _ => ExecutionMode::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.current() == ExecutionMode::Fallback
    }

    /// 切换到Fallback模式
    ///
    /// 仅当本次调用完成了转换时返回 `true`；并发的失败会竞争到同一结果。
    pub fn trip(&self, reason: &str) -> bool {
        let switched = self
            .mode
            .compare_exchange(
                MODE_BROKER,
                MODE_FALLBACK,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if switched {
            warn!(
                reason = %reason,
                "消息代理不可用，切换到进程内Fallback模式（重启进程后才会恢复Broker模式）"
            );
            metrics::counter!("ingest_mode_transitions_total").increment(1);
        }

        switched
    }
}
