// ==========================================
// 引擎层集成测试
// ==========================================
// 覆盖: 多 tick 时间线下的渐进释放、终止边界、重复投递效应
// ==========================================


use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use test_helpers::{build_repositories, create_test_db, open_test_connection};
use warehouse_sim::domain::OrderLine;
use warehouse_sim::engine::events::{
    InventoryUpdateMessage, OrderReceivedMessage, TOPIC_ORDER_RECEIVED,
};
use warehouse_sim::{
    InventoryLedger, MessageBus, OrderInjector, OrderType, RecordingBus, SimulationClock,
    TemperatureZone,
};

fn t(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 13)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn order(order_id: &str, placed: NaiveDateTime) -> OrderReceivedMessage {
    OrderReceivedMessage {
        order_id: order_id.to_string(),
        order_type: OrderType::Pickup,
        placed_time: placed,
        due_time: placed + chrono::Duration::hours(1),
        customer_id: None,
        lines: vec![OrderLine {
            sku: "SKU-1".to_string(),
            quantity: 1,
            temperature_zone: TemperatureZone::Ambient,
        }],
        sender_id: None,
    }
}

#[tokio::test]
async fn test_progressive_release_over_ticks() {
    let clock = Arc::new(SimulationClock::new(t(8, 0), t(18, 0), 600, 1.0)); // 每 tick 10 分钟
    let bus = Arc::new(RecordingBus::new());
    let injector = OrderInjector::new(clock.clone(), bus.clone() as Arc<dyn MessageBus>);

    injector.load_backlog(vec![
        order("ORD-0810", t(8, 10)),
        order("ORD-0820", t(8, 20)),
        order("ORD-0840", t(8, 40)),
    ]);

    // tick 1 → 08:10: 只释放第一单
    clock.tick();
    injector.release_due().await;
    assert_eq!(bus.count_for_topic(TOPIC_ORDER_RECEIVED), 1);
    assert_eq!(injector.backlog_len(), 2);

    // tick 2 → 08:20: 释放第二单
    clock.tick();
    injector.release_due().await;
    assert_eq!(bus.count_for_topic(TOPIC_ORDER_RECEIVED), 2);
    assert_eq!(injector.backlog_len(), 1);

    // tick 3 → 08:30: 无到期订单
    clock.tick();
    injector.release_due().await;
    assert_eq!(bus.count_for_topic(TOPIC_ORDER_RECEIVED), 2);

    // tick 4 → 08:40: 释放第三单
    clock.tick();
    injector.release_due().await;
    assert_eq!(bus.count_for_topic(TOPIC_ORDER_RECEIVED), 3);
    assert_eq!(injector.backlog_len(), 0);
}

#[tokio::test]
async fn test_order_due_exactly_at_end_time_never_released() {
    // 时钟到达终点的那次 tick 之后不再释放：
    // 恰在 end_time 下单的订单留在积压队列中（时钟终止语义优先）
    let clock = Arc::new(SimulationClock::new(t(8, 0), t(9, 0), 3600, 1.0));
    let bus = Arc::new(RecordingBus::new());
    let injector = OrderInjector::new(clock.clone(), bus.clone() as Arc<dyn MessageBus>);

    injector.load_backlog(vec![order("ORD-END", t(9, 0))]); // 区间内（含端点），可入队

    clock.tick(); // 09:00 → running = false
    injector.release_due().await; // 时钟已停，空操作

    assert_eq!(bus.count_for_topic(TOPIC_ORDER_RECEIVED), 0);
    assert_eq!(injector.backlog_len(), 1);
}

#[test]
fn test_redelivered_deduct_is_not_idempotent() {
    // 至少一次投递下，重复的 DEDUCT 会二次扣减——
    // 消费端不做去重（已知的加固待办），测试固定现状
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    let (_, inventory_repo) = build_repositories(conn);
    let ledger = InventoryLedger::new(inventory_repo, 1000, 100, 500);

    ledger
        .seed_item("SKU-RD", None, 600, TemperatureZone::Ambient, 0)
        .unwrap();

    let msg = InventoryUpdateMessage {
        sku: "SKU-RD".to_string(),
        quantity_change: Some(150),
        reserved_quantity_change: None,
        operation: "DEDUCT".to_string(),
        order_id: Some("ORD-RD".to_string()),
    };

    ledger.apply_update(&msg).unwrap();
    ledger.apply_update(&msg).unwrap(); // 同一消息重复投递

    let item = ledger.get_or_create("SKU-RD").unwrap();
    assert_eq!(item.quantity, 300);
}
