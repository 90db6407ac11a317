// ==========================================
// 仓储履约模拟系统 - 核心库
// ==========================================
// 技术栈: Rust + Tokio + SQLite
// 系统定位: 订单履约闭环仿真（虚拟时钟 + 消息总线）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 时钟/注入/工作流/台账
pub mod engine;

// 导入层 - 种子数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 装配与进程内总线
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{InventoryOperation, OrderStatus, OrderType, ProcessedStatus, TemperatureZone};

// 领域实体
pub use domain::{InventoryItem, Order, OrderLine, RawInventoryRecord, RawOrderRecord};

// 引擎
pub use engine::{
    InventoryLedger, MessageBus, NoOpMessageBus, OrderInjector, OrderWorkflow, RecordingBus,
    SimulationClock, SimulationRunner,
};
pub use engine::events::{
    BusError, BusPayload, InventoryUpdateMessage, OrderProcessedMessage, OrderReceivedMessage,
    TOPIC_INVENTORY_UPDATE, TOPIC_ORDER_PROCESSED, TOPIC_ORDER_RECEIVED,
};

// 仓储
pub use repository::{InventoryItemRepository, OrderRepository, RepositoryError, RepositoryResult};

// 配置
pub use config::{ConfigManager, SimulationParams};

// 应用
pub use app::{AppState, InProcessMessageBus, get_default_db_path};

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
