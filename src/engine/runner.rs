// ==========================================
// 仓储履约模拟系统 - 模拟驱动器
// ==========================================
// 职责: 唯一的周期调度者——按墙钟间隔推进模拟时钟，
//       并在时钟运行期间触发注入器的到期释放
// 说明: 时钟推进与消息总线消费并发无关；本驱动器是时钟的单驱动者
// ==========================================

use crate::engine::clock::SimulationClock;
use crate::engine::injector::OrderInjector;
use crate::engine::workflow::OrderWorkflow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

// ==========================================
// SimulationRunner - 模拟驱动器
// ==========================================
pub struct SimulationRunner {
    clock: Arc<SimulationClock>,
    injector: Arc<OrderInjector>,
    workflow: Arc<OrderWorkflow>,
    tick_interval_ms: u64, // 墙钟调度间隔
}

impl SimulationRunner {
    pub fn new(
        clock: Arc<SimulationClock>,
        injector: Arc<OrderInjector>,
        workflow: Arc<OrderWorkflow>,
        tick_interval_ms: u64,
    ) -> Self {
        Self {
            clock,
            injector,
            workflow,
            tick_interval_ms,
        }
    }

    /// 运行模拟主循环，直至时钟耗尽时间区间
    pub async fn run(&self) {
        info!(
            tick_interval_ms = self.tick_interval_ms,
            "模拟驱动器启动"
        );

        let mut interval = tokio::time::interval(Duration::from_millis(self.tick_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if !self.clock.is_running() {
                break;
            }

            self.clock.tick();

            // 到达终止时间的那次 tick 之后不再释放订单
            if self.clock.is_running() {
                self.injector.release_due().await;
            }

            debug!(
                sim_time = %self.clock.format_date_time(self.clock.current_time()),
                progress = format!("{:.1}%", self.clock.progress() * 100.0),
                backlog = self.injector.backlog_len(),
                "tick"
            );
        }

        // 给消费端留出清空在途消息的时间窗
        tokio::time::sleep(Duration::from_millis(self.tick_interval_ms * 2)).await;

        self.log_summary();
    }

    /// 收尾汇总
    fn log_summary(&self) {
        let counters = self.workflow.counters();
        info!("=== 模拟运行结束 ===");
        info!(
            final_sim_time = %self.clock.format_date_time(self.clock.current_time()),
            progress = format!("{:.1}%", self.clock.progress() * 100.0),
            "时钟状态"
        );
        info!(
            received = counters.received,
            completed = counters.completed,
            failed = counters.failed,
            errored = counters.errored,
            backlog_remaining = self.injector.backlog_len(),
            "订单处理汇总"
        );
        info!("====================");
    }
}
