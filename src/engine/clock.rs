// ==========================================
// 仓储履约模拟系统 - 模拟时钟
// ==========================================
// 职责: 持有虚拟时间；由唯一外部调度器驱动推进
// 状态机: RUNNING（构造即运行）→ STOPPED（到达终止时间），单向终止，不可重启
// 红线: current_time 仅由 tick() 修改
// ==========================================

use chrono::{Duration, NaiveDateTime};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// 时钟可变状态（互斥保护，单驱动者纪律）
#[derive(Debug)]
struct ClockState {
    current_time: NaiveDateTime,
    running: bool,
}

// ==========================================
// SimulationClock - 模拟时钟
// ==========================================
pub struct SimulationClock {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    tick_seconds: i64,  // 每次 tick 推进的基准秒数
    speed_factor: f64,  // 速度因子（与 tick_seconds 的乘积截断为整秒）
    state: Mutex<ClockState>,
}

impl SimulationClock {
    /// 创建并启动模拟时钟
    ///
    /// # 参数
    /// - start_time / end_time: 模拟时间区间（含两端）
    /// - tick_seconds: 单次 tick 的基准秒数
    /// - speed_factor: 速度因子
    pub fn new(
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        tick_seconds: i64,
        speed_factor: f64,
    ) -> Self {
        info!("=== 模拟时钟初始化 ===");
        info!("模拟开始时间: {}", start_time);
        info!("模拟结束时间: {}", end_time);
        info!("tick 步长: {} 秒", tick_seconds);
        info!("速度因子: {}x", speed_factor);
        info!("======================");

        Self {
            start_time,
            end_time,
            tick_seconds,
            speed_factor,
            state: Mutex::new(ClockState {
                current_time: start_time,
                running: true,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 推进一次模拟时钟（由外部调度器调用）
    ///
    /// 未运行时为空操作；到达或越过结束时间后 running 永久置否
    pub fn tick(&self) {
        let mut state = self.state();
        if !state.running {
            return;
        }

        // 按速度因子计算实际推进秒数（小数部分截断）
        let seconds_to_add = (self.tick_seconds as f64 * self.speed_factor) as i64;
        state.current_time += Duration::seconds(seconds_to_add);

        if state.current_time >= self.end_time {
            state.running = false;
            info!(
                "=== 模拟结束于 {} ===",
                Self::format_time_of(state.current_time)
            );
        }
    }

    /// 当前模拟时间
    pub fn current_time(&self) -> NaiveDateTime {
        self.state().current_time
    }

    /// 时钟是否仍在运行（内部标志与时间上限双重判定）
    pub fn is_running(&self) -> bool {
        let state = self.state();
        state.running && state.current_time <= self.end_time
    }

    /// 指定时间是否落在模拟区间内（含两端）
    pub fn is_time_in_range(&self, t: NaiveDateTime) -> bool {
        t >= self.start_time && t <= self.end_time
    }

    /// 模拟进度（0.0 ~ 1.0，截断到区间内）
    pub fn progress(&self) -> f64 {
        let total_seconds = (self.end_time - self.start_time).num_seconds();
        if total_seconds <= 0 {
            return 1.0;
        }
        let elapsed_seconds = (self.current_time() - self.start_time).num_seconds();
        (elapsed_seconds as f64 / total_seconds as f64).clamp(0.0, 1.0)
    }

    /// 时间格式化（HH:MM:SS），用于日志
    pub fn format_time(&self, t: NaiveDateTime) -> String {
        Self::format_time_of(t)
    }

    /// 时间格式化（YYYY-MM-DD HH:MM:SS），用于日志
    pub fn format_date_time(&self, t: NaiveDateTime) -> String {
        t.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_time_of(t: NaiveDateTime) -> String {
        t.format("%H:%M:%S").to_string()
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }
}
