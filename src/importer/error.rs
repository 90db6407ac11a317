// ==========================================
// 仓储履约模拟系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 语义: 种子文件不可读只中止本次装载，不终止进程；
//       坏行在装载内部记日志后跳过，不走错误通道
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(#[from] csv::Error),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
