// ==========================================
// 履约闭环端到端测试
// ==========================================
// 覆盖: 时钟 → 注入器 → 工作流 → 总线 → 库存台账 的完整链路
// 说明: 为保证确定性，链路中的消息由测试按固定顺序手工排空；
//       最后一组用例走 AppState + 驱动器的真实装配路径
// ==========================================


use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_helpers::{build_repositories, create_test_db, open_test_connection};
use tokio::sync::mpsc;
use warehouse_sim::domain::OrderLine;
use warehouse_sim::engine::events::{
    BusPayload, InventoryUpdateMessage, OrderProcessedMessage, OrderReceivedMessage,
    TOPIC_INVENTORY_UPDATE, TOPIC_ORDER_PROCESSED, TOPIC_ORDER_RECEIVED,
};
use warehouse_sim::{
    InProcessMessageBus, InventoryLedger, MessageBus, OrderInjector, OrderStatus, OrderType,
    OrderWorkflow, ProcessedStatus, SimulationClock, TemperatureZone,
};

fn t(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 13)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

// ==========================================
// 手工排空式链路装配
// ==========================================

struct SimHarness {
    _tmp: NamedTempFile,
    clock: Arc<SimulationClock>,
    bus: Arc<InProcessMessageBus>,
    injector: Arc<OrderInjector>,
    workflow: Arc<OrderWorkflow>,
    ledger: Arc<InventoryLedger>,
    order_rx: mpsc::Receiver<BusPayload>,
    inventory_rx: mpsc::Receiver<BusPayload>,
    processed_rx: mpsc::Receiver<BusPayload>,
}

/// 装配完整链路；三个主题的接收端由测试持有，按需排空
fn build_harness(tick_seconds: i64) -> SimHarness {
    let (tmp, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    let (order_repo, inventory_repo) = build_repositories(conn);

    let clock = Arc::new(SimulationClock::new(t(8, 0), t(18, 0), tick_seconds, 1.0));
    let bus = Arc::new(InProcessMessageBus::default());
    let order_rx = bus.take_receiver(TOPIC_ORDER_RECEIVED).unwrap();
    let inventory_rx = bus.take_receiver(TOPIC_INVENTORY_UPDATE).unwrap();
    let processed_rx = bus.take_receiver(TOPIC_ORDER_PROCESSED).unwrap();

    let ledger = Arc::new(InventoryLedger::new(inventory_repo, 1000, 100, 500));
    let injector = Arc::new(OrderInjector::new(
        clock.clone(),
        bus.clone() as Arc<dyn MessageBus>,
    ));
    let workflow = Arc::new(OrderWorkflow::new(
        order_repo,
        ledger.clone(),
        bus.clone() as Arc<dyn MessageBus>,
        clock.clone(),
    ));

    SimHarness {
        _tmp: tmp,
        clock,
        bus,
        injector,
        workflow,
        ledger,
        order_rx,
        inventory_rx,
        processed_rx,
    }
}

impl SimHarness {
    /// 排空 order.received：逐条交给工作流
    async fn drain_orders(&mut self) {
        while let Ok(payload) = self.order_rx.try_recv() {
            if let BusPayload::OrderReceived(msg) = payload {
                self.workflow.handle_order_received(msg).await;
            }
        }
    }

    /// 排空 inventory.update：逐条交给台账（单消费者即同 SKU 串行）
    fn drain_inventory(&mut self) {
        while let Ok(payload) = self.inventory_rx.try_recv() {
            if let BusPayload::InventoryUpdate(msg) = payload {
                self.ledger.apply_update(&msg).unwrap();
            }
        }
    }

    /// 取走全部处理结果消息
    fn take_processed(&mut self) -> Vec<OrderProcessedMessage> {
        let mut out = Vec::new();
        while let Ok(payload) = self.processed_rx.try_recv() {
            if let BusPayload::OrderProcessed(msg) = payload {
                out.push(msg);
            }
        }
        out
    }
}

fn order(order_id: &str, placed: NaiveDateTime, sku: &str, quantity: i32) -> OrderReceivedMessage {
    OrderReceivedMessage {
        order_id: order_id.to_string(),
        order_type: OrderType::Delivery,
        placed_time: placed,
        due_time: placed + chrono::Duration::hours(2),
        customer_id: Some("CUST-1".to_string()),
        lines: vec![OrderLine {
            sku: sku.to_string(),
            quantity,
            temperature_zone: TemperatureZone::Ambient,
        }],
        sender_id: None,
    }
}

// ==========================================
// 场景 A: 整单库存恰好覆盖
// ==========================================
#[tokio::test]
async fn test_scenario_exact_stock_order_completes() {
    let mut h = build_harness(1800);
    h.ledger
        .seed_item("X1", None, 10, TemperatureZone::Ambient, 2)
        .unwrap();

    h.injector.load_backlog(vec![order("ORD-A", t(8, 30), "X1", 10)]);

    h.clock.tick(); // 08:30
    h.injector.release_due().await;
    h.drain_orders().await;
    h.drain_inventory();

    let stored = h.workflow.get_order("ORD-A").unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);

    let processed = h.take_processed();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].status, ProcessedStatus::Completed);

    // RESERVE(10) 先被应用 → DEDUCT(10) 全额从预占扣除，
    // 在库量不变、预占清零；未触及低库存阈值，不触发补货。
    // （扣减只在预占覆盖不足时才侵蚀在库量——操作表语义，如实保留）
    let item = h.ledger.get_or_create("X1").unwrap();
    assert_eq!(item.quantity, 10);
    assert_eq!(item.reserved_quantity, 0);
    assert_eq!(item.available_quantity(), 10);
}

// ==========================================
// 场景 B: 同一 tick 双单争抢最后库存（固有竞争窗口）
// ==========================================
#[tokio::test]
async fn test_scenario_double_admission_race_preserved() {
    let mut h = build_harness(1800);
    h.ledger
        .seed_item("X2", None, 5, TemperatureZone::Ambient, 0)
        .unwrap();

    h.injector.load_backlog(vec![
        order("ORD-R1", t(8, 30), "X2", 5),
        order("ORD-R2", t(8, 30), "X2", 5),
    ]);

    h.clock.tick();
    h.injector.release_due().await;

    // 两单的准入检查都发生在任何预占被台账应用之前：
    // 只有 5 件库存，两单却都通过准入——协议固有竞争，如实保留
    h.drain_orders().await;

    assert_eq!(
        h.workflow.get_order("ORD-R1").unwrap().unwrap().status,
        OrderStatus::Completed
    );
    assert_eq!(
        h.workflow.get_order("ORD-R2").unwrap().unwrap().status,
        OrderStatus::Completed
    );

    // 台账随后按 R1:RESERVE, R1:DEDUCT, R2:RESERVE, R2:DEDUCT 顺序应用：
    // 每次 DEDUCT 都被预占全额覆盖 → 5 件库存“发出”了 10 件，
    // 在库量却从未下降——超售以账实不符的形式留痕
    h.drain_inventory();
    let item = h.ledger.get_or_create("X2").unwrap();
    assert_eq!(item.quantity, 5);
    assert_eq!(item.reserved_quantity, 0);

    let processed = h.take_processed();
    assert_eq!(processed.len(), 2);
    assert!(processed.iter().all(|p| p.status == ProcessedStatus::Completed));
}

// ==========================================
// 场景 C: 未知 SKU 在准入检查前懒建档
// ==========================================
#[tokio::test]
async fn test_scenario_unknown_sku_auto_provisioned() {
    let mut h = build_harness(1800);

    h.injector
        .load_backlog(vec![order("ORD-C", t(8, 30), "SKU-UNSEEN", 7)]);

    h.clock.tick();
    h.injector.release_due().await;
    h.drain_orders().await;

    // 准入检查的直读已经完成建档（读带写副作用）
    let item = h.ledger.get_or_create("SKU-UNSEEN").unwrap();
    assert_eq!(item.quantity, 1000);

    h.drain_inventory();
    assert_eq!(
        h.workflow.get_order("ORD-C").unwrap().unwrap().status,
        OrderStatus::Completed
    );
    let item = h.ledger.get_or_create("SKU-UNSEEN").unwrap();
    assert_eq!(item.quantity, 1000);
    assert_eq!(item.reserved_quantity, 0);
}

// ==========================================
// 场景: 库存不足整单取消，已发射预占不回滚
// ==========================================
#[tokio::test]
async fn test_scenario_insufficient_inventory_cancels_order() {
    let mut h = build_harness(1800);
    h.ledger
        .seed_item("OK", None, 100, TemperatureZone::Ambient, 0)
        .unwrap();
    h.ledger
        .seed_item("LOW", None, 1, TemperatureZone::Ambient, 0)
        .unwrap();

    let mut msg = order("ORD-F", t(8, 30), "OK", 10);
    msg.lines.push(OrderLine {
        sku: "LOW".to_string(),
        quantity: 5,
        temperature_zone: TemperatureZone::Ambient,
    });
    h.injector.load_backlog(vec![msg]);

    h.clock.tick();
    h.injector.release_due().await;
    h.drain_orders().await;
    h.drain_inventory();

    assert_eq!(
        h.workflow.get_order("ORD-F").unwrap().unwrap().status,
        OrderStatus::Cancelled
    );

    let processed = h.take_processed();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].status, ProcessedStatus::Failed);
    assert_eq!(processed[0].message, "Insufficient inventory");

    // 第一行的 RESERVE 已被台账应用且无人回滚——预占滞留
    let ok_item = h.ledger.get_or_create("OK").unwrap();
    assert_eq!(ok_item.reserved_quantity, 10);
    assert_eq!(ok_item.quantity, 100);
}

// ==========================================
// 场景: 外部 DEDUCT 侵蚀在库量并触发自动补货
// ==========================================
#[tokio::test]
async fn test_scenario_low_stock_replenish_via_bus() {
    let mut h = build_harness(1800);
    h.ledger
        .seed_item("SKU-LOW", None, 5, TemperatureZone::Ambient, 100)
        .unwrap();

    // 无预占覆盖的扣减直接侵蚀在库量
    h.bus
        .publish(
            TOPIC_INVENTORY_UPDATE,
            BusPayload::InventoryUpdate(InventoryUpdateMessage {
                sku: "SKU-LOW".to_string(),
                quantity_change: Some(3),
                reserved_quantity_change: None,
                operation: "DEDUCT".to_string(),
                order_id: None,
            }),
        )
        .await
        .unwrap();
    h.drain_inventory();

    // 5 - 3 = 2 <= 100 → 单次自动补货 +500
    let item = h.ledger.get_or_create("SKU-LOW").unwrap();
    assert_eq!(item.quantity, 502);
}

// ==========================================
// 真实装配路径: AppState + 驱动器全流程
// ==========================================
mod full_simulation {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use warehouse_sim::config::ConfigManager;
    use warehouse_sim::AppState;

    /// 写种子文件 + 配置覆写，跑完整个模拟主循环
    #[tokio::test]
    async fn test_full_simulation_run_to_clock_exhaustion() {
        let (_tmp_db, db_path) = create_test_db().unwrap();
        let seed_dir = tempfile::tempdir().unwrap();

        let order_csv = seed_dir.path().join("orders.csv");
        let mut f = std::fs::File::create(&order_csv).unwrap();
        writeln!(f, "ORDER_ID,ORDER_TYPE,ORDER_PLACED_TIME,ORDER_DUE_TIME,CUSTOMER_ID,SKU,QUANTITY,TEMPERATURE_ZONE").unwrap();
        writeln!(f, "ORD-1,PICKUP,2024-01-13T08:01:00,2024-01-13T10:00:00,CUST-1,W100,4,AMBIENT").unwrap();
        writeln!(f, "ORD-1,PICKUP,2024-01-13T08:01:00,2024-01-13T10:00:00,CUST-1,W200,2,FROZEN").unwrap();
        writeln!(f, "ORD-2,DELIVERY,2024-01-13T08:03:00,2024-01-13T11:00:00,CUST-2,W100,100,AMBIENT").unwrap();
        drop(f);

        let inventory_csv = seed_dir.path().join("inventory.csv");
        let mut f = std::fs::File::create(&inventory_csv).unwrap();
        writeln!(f, "SKU,NAME,QUANTITY,TEMPERATURE_ZONE,LOW_STOCK_THRESHOLD").unwrap();
        writeln!(f, "W100,纸箱,50,AMBIENT,5").unwrap();
        writeln!(f, "W200,冻品,20,FROZEN,5").unwrap();
        drop(f);

        // 配置覆写：10 分钟模拟区间，每 tick 推进 60 秒，墙钟间隔 1ms
        {
            let conn = open_test_connection(&db_path).unwrap();
            let config = ConfigManager::from_connection(conn).unwrap();
            config.set_config_value("sim/start_time", "2024-01-13T08:00:00").unwrap();
            config.set_config_value("sim/end_time", "2024-01-13T08:10:00").unwrap();
            config.set_config_value("sim/tick_seconds", "60").unwrap();
            config.set_config_value("sim/tick_interval_ms", "1").unwrap();
            config
                .set_config_value("seed/order_csv", order_csv.to_str().unwrap())
                .unwrap();
            config
                .set_config_value("seed/inventory_csv", inventory_csv.to_str().unwrap())
                .unwrap();
        }

        let state = AppState::new(&db_path).unwrap();
        state.load_seed_data();
        assert_eq!(state.injector.backlog_len(), 2);

        state.start_consumers();
        state.runner().run().await;

        // 消费为异步任务：轮询直至两单进入终态（有超时上限）
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let ord1 = state.order_repo.find_by_order_id("ORD-1").unwrap();
            let ord2 = state.order_repo.find_by_order_id("ORD-2").unwrap();
            let done = matches!(&ord1, Some(o) if o.status.is_terminal())
                && matches!(&ord2, Some(o) if o.status.is_terminal());
            if done {
                break;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("订单未在期限内进入终态: {:?} / {:?}", ord1, ord2);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // ORD-1 两行均可满足 → COMPLETED；ORD-2 需求 100 > 可用 → CANCELLED
        assert_eq!(
            state.order_repo.find_by_order_id("ORD-1").unwrap().unwrap().status,
            OrderStatus::Completed
        );
        assert_eq!(
            state.order_repo.find_by_order_id("ORD-2").unwrap().unwrap().status,
            OrderStatus::Cancelled
        );

        // 时钟耗尽且不可重启
        assert!(!state.clock.is_running());
        assert_eq!(state.clock.progress(), 1.0);
        assert_eq!(state.injector.backlog_len(), 0);

        let counters = state.workflow.counters();
        assert_eq!(counters.received, 2);
        assert_eq!(counters.completed, 1);
        assert_eq!(counters.failed, 1);
    }
}
