use std::fmt;

#[derive(Debug, Clone)]
pub enum HistoryError {
    StoreUnavailable(String),
    DatabaseConfig(String),
    DatabaseOperation(String),
    /// Internal no-op signal: the visit or page is gone. Services swallow it.
    RecordNotFound(String),
    BatchPartialFailure {
        committed: usize,
        total: usize,
        message: String,
    },
    CycleDetected(String),
    Validation(String),
    FileOperation(String),
    Serialization(String),
    DateParse(String),
    CategoryCleanup(String),
}

impl HistoryError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            HistoryError::StoreUnavailable(_) => "E001",
            HistoryError::DatabaseConfig(_) => "E002",
            HistoryError::DatabaseOperation(_) => "E003",
            HistoryError::RecordNotFound(_) => "E004",
            HistoryError::BatchPartialFailure { .. } => "E005",
            HistoryError::CycleDetected(_) => "E006",
            HistoryError::Validation(_) => "E007",
            HistoryError::FileOperation(_) => "E008",
            HistoryError::Serialization(_) => "E009",
            HistoryError::DateParse(_) => "E010",
            HistoryError::CategoryCleanup(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            HistoryError::StoreUnavailable(_) => "Store Unavailable",
            HistoryError::DatabaseConfig(_) => "Database Configuration Error",
            HistoryError::DatabaseOperation(_) => "Database Operation Error",
            HistoryError::RecordNotFound(_) => "Record Not Found",
            HistoryError::BatchPartialFailure { .. } => "Batch Partial Failure",
            HistoryError::CycleDetected(_) => "Navigation Cycle Detected",
            HistoryError::Validation(_) => "Validation Error",
            HistoryError::FileOperation(_) => "File Operation Error",
            HistoryError::Serialization(_) => "Serialization Error",
            HistoryError::DateParse(_) => "Date Parse Error",
            HistoryError::CategoryCleanup(_) => "Category Cleanup Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            HistoryError::StoreUnavailable(msg) => msg,
            HistoryError::DatabaseConfig(msg) => msg,
            HistoryError::DatabaseOperation(msg) => msg,
            HistoryError::RecordNotFound(msg) => msg,
            HistoryError::BatchPartialFailure { message, .. } => message,
            HistoryError::CycleDetected(msg) => msg,
            HistoryError::Validation(msg) => msg,
            HistoryError::FileOperation(msg) => msg,
            HistoryError::Serialization(msg) => msg,
            HistoryError::DateParse(msg) => msg,
            HistoryError::CategoryCleanup(msg) => msg,
        }
    }

    /// True for the benign "record absent" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HistoryError::RecordNotFound(_))
    }

    /// 格式化为彩色输出
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI）
    pub fn format_simple(&self) -> String {
        match self {
            HistoryError::BatchPartialFailure {
                committed,
                total,
                message,
            } => format!(
                "{}: {} ({} of {} records committed)",
                self.error_type(),
                message,
                committed,
                total
            ),
            _ => format!("{}: {}", self.error_type(), self.message()),
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for HistoryError {}

// 便捷的构造函数
impl HistoryError {
    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        HistoryError::StoreUnavailable(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        HistoryError::DatabaseConfig(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        HistoryError::DatabaseOperation(msg.into())
    }

    pub fn record_not_found<T: Into<String>>(msg: T) -> Self {
        HistoryError::RecordNotFound(msg.into())
    }

    pub fn batch_partial_failure<T: Into<String>>(committed: usize, total: usize, msg: T) -> Self {
        HistoryError::BatchPartialFailure {
            committed,
            total,
            message: msg.into(),
        }
    }

    pub fn cycle_detected<T: Into<String>>(msg: T) -> Self {
        HistoryError::CycleDetected(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        HistoryError::Validation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        HistoryError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        HistoryError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        HistoryError::DateParse(msg.into())
    }

    pub fn category_cleanup<T: Into<String>>(msg: T) -> Self {
        HistoryError::CategoryCleanup(msg.into())
    }
}

impl From<sea_orm::DbErr> for HistoryError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                HistoryError::StoreUnavailable(err.to_string())
            }
            sea_orm::DbErr::RecordNotFound(msg) => HistoryError::RecordNotFound(msg),
            other => HistoryError::DatabaseOperation(other.to_string()),
        }
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        HistoryError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for HistoryError {
    fn from(err: csv::Error) -> Self {
        HistoryError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for HistoryError {
    fn from(err: chrono::ParseError) -> Self {
        HistoryError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
