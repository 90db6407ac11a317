// ==========================================
// 仓储履约模拟系统 - 主入口
// ==========================================
// 技术栈: Rust + Tokio + SQLite
// 流程: 初始化日志 → 装配 AppState → 装载种子 → 启动消费任务 →
//       驱动模拟主循环直至时钟耗尽
// ==========================================

use warehouse_sim::app::{get_default_db_path, AppState};
use warehouse_sim::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("仓储履约模拟系统");
    tracing::info!("系统版本: {}", warehouse_sim::VERSION);
    tracing::info!("==================================================");

    // 数据库路径（环境变量优先）
    let db_path = std::env::var("WAREHOUSE_SIM_DB").unwrap_or_else(|_| get_default_db_path());
    tracing::info!("使用数据库: {}", db_path);

    // 装配应用状态
    tracing::info!("正在初始化 AppState...");
    let app_state = AppState::new(&db_path)?;
    tracing::info!("AppState 初始化成功");

    // 装载种子数据（库存建档 + 订单积压队列）
    app_state.load_seed_data();

    // 启动消费任务
    app_state.start_consumers();

    // 驱动模拟主循环
    let runner = app_state.runner();
    runner.run().await;

    Ok(())
}
