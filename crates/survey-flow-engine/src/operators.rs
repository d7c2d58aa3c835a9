//! 条件操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 未识别的操作符以 `Unknown` 保留原始文本，评估时恒为 false，
/// 序列化时原样写回，不会丢失作者的输入。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    // 相等比较
    Equals,
    NotEquals,

    // 包含检查
    Contains,
    NotContains,

    // 数值比较
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,

    // 空值检查
    IsEmpty,
    IsNotEmpty,

    // 列表成员检查
    InList,
    NotInList,

    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::InList => "in_list",
            Self::NotInList => "not_in_list",
            Self::Unknown(raw) => raw,
        }
    }

    /// 是否需要比较值（空值检查不需要）
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty | Self::Unknown(_))
    }

    /// 是否要求比较值为数组
    pub fn requires_list(&self) -> bool {
        matches!(self, Self::InList | Self::NotInList)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for Operator {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "greater_than_or_equal" => Self::GreaterThanOrEqual,
            "less_than_or_equal" => Self::LessThanOrEqual,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            "in_list" => Self::InList,
            "not_in_list" => Self::NotInList,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for Operator {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 逻辑组合符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}
