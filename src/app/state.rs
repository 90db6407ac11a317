// ==========================================
// 仓储履约模拟系统 - 应用状态
// ==========================================
// 职责: 装配共享资源（连接/配置/总线/引擎），启动消费任务
// 说明: 订单行仅由工作流修改、库存行仅由台账修改；
//       两侧协同只经消息总线，装配层不引入跨台账的锁
// ==========================================

use crate::app::bus::InProcessMessageBus;
use crate::config::{ConfigManager, SimulationParams};
use crate::db;
use crate::engine::clock::SimulationClock;
use crate::engine::events::{
    BusPayload, MessageBus, TOPIC_INVENTORY_UPDATE, TOPIC_ORDER_PROCESSED, TOPIC_ORDER_RECEIVED,
};
use crate::engine::injector::OrderInjector;
use crate::engine::ledger::InventoryLedger;
use crate::engine::runner::SimulationRunner;
use crate::engine::workflow::OrderWorkflow;
use crate::importer::{ImportError, InventorySeedLoader, OrderSeedLoader};
use crate::repository::{InventoryItemRepository, OrderRepository};
use anyhow::anyhow;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

// ==========================================
// AppState - 应用状态
// ==========================================
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 配置快照
    pub params: SimulationParams,

    /// 进程内消息总线
    pub bus: Arc<InProcessMessageBus>,

    /// 模拟时钟
    pub clock: Arc<SimulationClock>,

    /// 订单注入器
    pub injector: Arc<OrderInjector>,

    /// 订单工作流
    pub workflow: Arc<OrderWorkflow>,

    /// 库存台账
    pub ledger: Arc<InventoryLedger>,

    /// 订单仓储
    pub order_repo: Arc<OrderRepository>,

    /// 库存仓储
    pub inventory_repo: Arc<InventoryItemRepository>,
}

impl AppState {
    /// 打开数据库并装配全部组件
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        let conn = db::open_sqlite_connection(db_path)?;
        db::init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| anyhow!("配置管理器初始化失败: {}", e))?,
        );
        let params = config
            .load_params()
            .map_err(|e| anyhow!("配置读取失败: {}", e))?;

        let order_repo = Arc::new(OrderRepository::from_connection(conn.clone()));
        let inventory_repo = Arc::new(InventoryItemRepository::from_connection(conn));

        let bus = Arc::new(InProcessMessageBus::default());
        let clock = Arc::new(SimulationClock::new(
            params.sim_start_time,
            params.sim_end_time,
            params.tick_seconds,
            params.speed_factor,
        ));
        let ledger = Arc::new(InventoryLedger::new(
            inventory_repo.clone(),
            params.initial_stock,
            params.low_stock_threshold,
            params.replenishment_quantity,
        ));
        let injector = Arc::new(OrderInjector::new(
            clock.clone(),
            bus.clone() as Arc<dyn MessageBus>,
        ));
        let workflow = Arc::new(OrderWorkflow::new(
            order_repo.clone(),
            ledger.clone(),
            bus.clone() as Arc<dyn MessageBus>,
            clock.clone(),
        ));

        Ok(Self {
            db_path: db_path.to_string(),
            config,
            params,
            bus,
            clock,
            injector,
            workflow,
            ledger,
            order_repo,
            inventory_repo,
        })
    }

    /// 装载种子数据（库存建档 + 订单积压队列）
    ///
    /// 种子文件问题只影响本次装载，不终止进程
    pub fn load_seed_data(&self) {
        if self.params.auto_initialize {
            match InventorySeedLoader::load_from_csv(Path::new(&self.params.inventory_csv_path)) {
                Ok(records) => {
                    InventorySeedLoader::seed_ledger(
                        records,
                        &self.ledger,
                        self.params.initial_stock,
                        self.params.low_stock_threshold,
                    );
                }
                Err(ImportError::FileNotFound(path)) => {
                    // 懒建档会兜底未知 SKU，缺文件只告警
                    warn!(file = %path, "库存种子文件不存在，库存将按需建档");
                }
                Err(e) => {
                    error!(error = %e, "库存种子装载失败");
                }
            }
        } else {
            info!("库存种子自动初始化已关闭");
        }

        if self.params.use_csv {
            match OrderSeedLoader::load_from_csv(Path::new(&self.params.order_csv_path)) {
                Ok(records) => {
                    let messages = OrderSeedLoader::group_into_messages(records);
                    self.injector.load_backlog(messages);
                }
                Err(e) => {
                    error!(error = %e, "订单种子装载失败");
                }
            }
        } else {
            info!("订单种子装载已关闭");
        }
    }

    /// 启动三个主题的消费任务
    ///
    /// - order.received → 订单工作流
    /// - inventory.update → 库存台账（单任务消费即对同一 SKU 串行应用）
    /// - order.processed → 外部观察者占位（仅记日志）
    pub fn start_consumers(&self) {
        if let Some(mut rx) = self.bus.take_receiver(TOPIC_ORDER_RECEIVED) {
            let workflow = self.workflow.clone();
            tokio::spawn(async move {
                while let Some(payload) = rx.recv().await {
                    match payload {
                        BusPayload::OrderReceived(msg) => {
                            workflow.handle_order_received(msg).await;
                        }
                        other => {
                            warn!(topic = TOPIC_ORDER_RECEIVED, payload = ?other, "非预期载荷，跳过");
                        }
                    }
                }
            });
        }

        if let Some(mut rx) = self.bus.take_receiver(TOPIC_INVENTORY_UPDATE) {
            let ledger = self.ledger.clone();
            tokio::spawn(async move {
                while let Some(payload) = rx.recv().await {
                    match payload {
                        BusPayload::InventoryUpdate(msg) => {
                            // 消费端最外层边界：失败记日志后继续，不做重试
                            if let Err(e) = ledger.apply_update(&msg) {
                                error!(sku = %msg.sku, operation = %msg.operation, error = %e, "库存变更处理失败");
                            }
                        }
                        other => {
                            warn!(topic = TOPIC_INVENTORY_UPDATE, payload = ?other, "非预期载荷，跳过");
                        }
                    }
                }
            });
        }

        if let Some(mut rx) = self.bus.take_receiver(TOPIC_ORDER_PROCESSED) {
            tokio::spawn(async move {
                while let Some(payload) = rx.recv().await {
                    if let BusPayload::OrderProcessed(msg) = payload {
                        debug!(
                            order_id = %msg.order_id,
                            status = %msg.status,
                            message = %msg.message,
                            "订单处理结果"
                        );
                    }
                }
            });
        }

        info!("消费任务已启动");
    }

    /// 构造模拟驱动器
    pub fn runner(&self) -> SimulationRunner {
        SimulationRunner::new(
            self.clock.clone(),
            self.injector.clone(),
            self.workflow.clone(),
            self.params.tick_interval_ms,
        )
    }
}

/// 默认数据库路径（系统数据目录下，目录不可用时回落当前目录）
pub fn get_default_db_path() -> String {
    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join("warehouse-sim");
        if std::fs::create_dir_all(&app_dir).is_ok() {
            return app_dir.join("warehouse_sim.db").display().to_string();
        }
    }
    "warehouse_sim.db".to_string()
}
