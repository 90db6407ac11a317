// ==========================================
// 仓储履约模拟系统 - 配置层
// ==========================================
// 职责: 系统配置的加载与覆写
// ==========================================

pub mod config_manager;

pub use config_manager::{ConfigManager, SimulationParams};
pub use config_manager::{
    DEFAULT_AUTO_INITIALIZE, DEFAULT_INITIAL_STOCK, DEFAULT_INVENTORY_CSV,
    DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_ORDER_CSV, DEFAULT_REPLENISHMENT_QUANTITY,
    DEFAULT_SIM_END_TIME, DEFAULT_SIM_START_TIME, DEFAULT_SPEED_FACTOR, DEFAULT_TICK_INTERVAL_MS,
    DEFAULT_TICK_SECONDS, DEFAULT_USE_CSV,
};
