// ==========================================
// 仓储履约模拟系统 - 引擎层
// ==========================================
// 职责: 时钟推进、订单注入、订单工作流、库存台账、模拟驱动
// 红线: Engine 不拼 SQL；跨台账协同只走消息总线
// ==========================================

pub mod clock;
pub mod events;
pub mod injector;
pub mod ledger;
pub mod runner;
pub mod workflow;

// 重导出核心引擎
pub use clock::SimulationClock;
pub use events::{BusError, BusPayload, MessageBus, NoOpMessageBus, RecordingBus};
pub use injector::OrderInjector;
pub use ledger::InventoryLedger;
pub use runner::SimulationRunner;
pub use workflow::{CounterSnapshot, OrderWorkflow, WorkflowCounters};
