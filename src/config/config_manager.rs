// ==========================================
// 仓储履约模拟系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// 说明: 所有配置项带默认值；值解析失败告警后回落默认值
// ==========================================

use crate::db::configure_sqlite_connection;
use crate::repository::SIM_TIME_FORMAT;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// 配置默认值（与模拟基准场景一致）
// ==========================================

pub const DEFAULT_SIM_START_TIME: &str = "2024-01-13T08:00:00";
pub const DEFAULT_SIM_END_TIME: &str = "2024-01-13T18:00:00";
pub const DEFAULT_TICK_SECONDS: i64 = 1;
pub const DEFAULT_SPEED_FACTOR: f64 = 1.0;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_INITIAL_STOCK: i32 = 1000;
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 100;
pub const DEFAULT_REPLENISHMENT_QUANTITY: i32 = 500;
pub const DEFAULT_ORDER_CSV: &str = "data/orders_sample.csv";
pub const DEFAULT_INVENTORY_CSV: &str = "data/inventory_sample.csv";
pub const DEFAULT_USE_CSV: bool = true;
pub const DEFAULT_AUTO_INITIALIZE: bool = true;

// ==========================================
// SimulationParams - 配置快照
// ==========================================

/// 模拟运行参数快照（引擎消费侧一次性读取）
#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub sim_start_time: NaiveDateTime,
    pub sim_end_time: NaiveDateTime,
    pub tick_seconds: i64,
    pub speed_factor: f64,
    pub tick_interval_ms: u64,
    pub initial_stock: i32,
    pub low_stock_threshold: i32,
    pub replenishment_quantity: i32,
    pub order_csv_path: String,
    pub inventory_csv_path: String,
    pub use_csv: bool,         // 是否从种子文件装载订单
    pub auto_initialize: bool, // 是否从种子文件初始化库存
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入/覆写配置值
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析为目标类型；解析失败告警后回落默认值
    fn get_parsed_or_default<T: FromStr + Copy>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(raw) => match raw.parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key = key, value = %raw, "配置值解析失败，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    // ==========================================
    // 类型化读取
    // ==========================================

    pub fn sim_start_time(&self) -> Result<NaiveDateTime, Box<dyn Error>> {
        let raw = self.get_config_or_default("sim/start_time", DEFAULT_SIM_START_TIME)?;
        parse_time_or_default(&raw, DEFAULT_SIM_START_TIME)
    }

    pub fn sim_end_time(&self) -> Result<NaiveDateTime, Box<dyn Error>> {
        let raw = self.get_config_or_default("sim/end_time", DEFAULT_SIM_END_TIME)?;
        parse_time_or_default(&raw, DEFAULT_SIM_END_TIME)
    }

    pub fn tick_seconds(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default("sim/tick_seconds", DEFAULT_TICK_SECONDS)
    }

    pub fn speed_factor(&self) -> Result<f64, Box<dyn Error>> {
        self.get_parsed_or_default("sim/speed_factor", DEFAULT_SPEED_FACTOR)
    }

    pub fn tick_interval_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or_default("sim/tick_interval_ms", DEFAULT_TICK_INTERVAL_MS)
    }

    pub fn initial_stock(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default("inventory/initial_stock", DEFAULT_INITIAL_STOCK)
    }

    pub fn low_stock_threshold(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default("inventory/low_stock_threshold", DEFAULT_LOW_STOCK_THRESHOLD)
    }

    pub fn replenishment_quantity(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default(
            "inventory/replenishment_quantity",
            DEFAULT_REPLENISHMENT_QUANTITY,
        )
    }

    pub fn order_csv_path(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default("seed/order_csv", DEFAULT_ORDER_CSV)
    }

    pub fn inventory_csv_path(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default("seed/inventory_csv", DEFAULT_INVENTORY_CSV)
    }

    pub fn use_csv(&self) -> Result<bool, Box<dyn Error>> {
        self.get_parsed_or_default("seed/use_csv", DEFAULT_USE_CSV)
    }

    pub fn auto_initialize(&self) -> Result<bool, Box<dyn Error>> {
        self.get_parsed_or_default("seed/auto_initialize", DEFAULT_AUTO_INITIALIZE)
    }

    /// 读取完整配置快照
    pub fn load_params(&self) -> Result<SimulationParams, Box<dyn Error>> {
        Ok(SimulationParams {
            sim_start_time: self.sim_start_time()?,
            sim_end_time: self.sim_end_time()?,
            tick_seconds: self.tick_seconds()?,
            speed_factor: self.speed_factor()?,
            tick_interval_ms: self.tick_interval_ms()?,
            initial_stock: self.initial_stock()?,
            low_stock_threshold: self.low_stock_threshold()?,
            replenishment_quantity: self.replenishment_quantity()?,
            order_csv_path: self.order_csv_path()?,
            inventory_csv_path: self.inventory_csv_path()?,
            use_csv: self.use_csv()?,
            auto_initialize: self.auto_initialize()?,
        })
    }
}

/// 解析时间配置；解析失败告警后回落默认值
fn parse_time_or_default(raw: &str, default: &str) -> Result<NaiveDateTime, Box<dyn Error>> {
    match NaiveDateTime::parse_from_str(raw, SIM_TIME_FORMAT) {
        Ok(t) => Ok(t),
        Err(_) => {
            warn!(value = %raw, "时间配置解析失败，使用默认值");
            NaiveDateTime::parse_from_str(default, SIM_TIME_FORMAT).map_err(|e| e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let config = setup();
        let params = config.load_params().unwrap();
        assert_eq!(params.tick_seconds, 1);
        assert_eq!(params.initial_stock, 1000);
        assert_eq!(params.low_stock_threshold, 100);
        assert_eq!(params.replenishment_quantity, 500);
        assert!(params.use_csv);
        assert_eq!(
            params.sim_start_time.format(SIM_TIME_FORMAT).to_string(),
            DEFAULT_SIM_START_TIME
        );
    }

    #[test]
    fn test_override_roundtrip() {
        let config = setup();
        config.set_config_value("sim/tick_seconds", "60").unwrap();
        config.set_config_value("sim/speed_factor", "2.5").unwrap();
        assert_eq!(config.tick_seconds().unwrap(), 60);
        assert!((config.speed_factor().unwrap() - 2.5).abs() < f64::EPSILON);

        // 覆写
        config.set_config_value("sim/tick_seconds", "120").unwrap();
        assert_eq!(config.tick_seconds().unwrap(), 120);
    }

    #[test]
    fn test_bad_value_falls_back_to_default() {
        let config = setup();
        config.set_config_value("sim/tick_seconds", "很多").unwrap();
        config.set_config_value("sim/start_time", "13/01/2024").unwrap();
        assert_eq!(config.tick_seconds().unwrap(), DEFAULT_TICK_SECONDS);
        assert_eq!(
            config
                .sim_start_time()
                .unwrap()
                .format(SIM_TIME_FORMAT)
                .to_string(),
            DEFAULT_SIM_START_TIME
        );
    }
}
