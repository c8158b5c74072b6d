//! 选择性估计错误类型
//!
//! "没有统计信息" 不属于错误：直方图估计函数返回 `Option<f64>`，
//! 由门面层替换为对应算子族的默认值。这里只定义真正的错误：
//! - 算子与操作数族不匹配（调用方预过滤失败，属于编程错误）
//! - 反序列化或手工构造的统计信息违反结构不变式
//! - 采样与配置错误

use thiserror::Error;

/// 统计与选择性估计错误类型
#[derive(Error, Debug)]
pub enum StatsError {
    /// 算子不属于该估计器支持的算子族
    #[error("不支持的算子 {op}（估计器: {family}）")]
    UnsupportedOperator { op: String, family: &'static str },

    /// 直方图结构不合法
    #[error("直方图不合法: {0}")]
    InvalidHistogram(String),

    /// 边界框不合法
    #[error("边界框不合法: {0}")]
    InvalidBox(String),

    /// 区间不合法
    #[error("区间不合法: {0}")]
    InvalidSpan(String),

    /// 采样错误
    #[error("采样错误: {0}")]
    Sampling(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StatsError {
    pub fn unsupported(op: impl std::fmt::Display, family: &'static str) -> Self {
        StatsError::UnsupportedOperator {
            op: op.to_string(),
            family,
        }
    }
}

/// 统计模块结果类型
pub type StatsResult<T> = Result<T, StatsError>;
