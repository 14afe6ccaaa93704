use std::fmt;

#[derive(Debug, Clone)]
pub enum HttpulseError {
    /// Duplicate metric name or mismatched label schema at registration time.
    /// Fatal: surfaced at startup, never recoverable at runtime.
    Configuration(String),
    /// Negative counter delta, non-finite histogram value, or a label tuple
    /// that does not match the descriptor. Logged and dropped on the request
    /// path; a telemetry defect must never degrade the primary service.
    InvalidObservation(String),
    ConfigLoad(String),
    Io(String),
}

impl HttpulseError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            HttpulseError::Configuration(_) => "E001",
            HttpulseError::InvalidObservation(_) => "E002",
            HttpulseError::ConfigLoad(_) => "E003",
            HttpulseError::Io(_) => "E004",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            HttpulseError::Configuration(_) => "Metric Configuration Error",
            HttpulseError::InvalidObservation(_) => "Invalid Observation",
            HttpulseError::ConfigLoad(_) => "Configuration Load Error",
            HttpulseError::Io(_) => "IO Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            HttpulseError::Configuration(msg) => msg,
            HttpulseError::InvalidObservation(msg) => msg,
            HttpulseError::ConfigLoad(msg) => msg,
            HttpulseError::Io(msg) => msg,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for HttpulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for HttpulseError {}

// 便捷的构造函数
impl HttpulseError {
    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        HttpulseError::Configuration(msg.into())
    }

    pub fn invalid_observation<T: Into<String>>(msg: T) -> Self {
        HttpulseError::InvalidObservation(msg.into())
    }

    pub fn config_load<T: Into<String>>(msg: T) -> Self {
        HttpulseError::ConfigLoad(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for HttpulseError {
    fn from(err: std::io::Error) -> Self {
        HttpulseError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for HttpulseError {
    fn from(err: toml::de::Error) -> Self {
        HttpulseError::ConfigLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HttpulseError>;
