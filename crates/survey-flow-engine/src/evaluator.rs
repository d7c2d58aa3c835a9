//! 条件评估器
//!
//! 对单个条件节点（叶子比较或 AND/OR 组合）求值。求值是全函数：
//! 类型不匹配、值缺失、未知操作符都会退化为确定的布尔结果，从不返回错误。

use crate::models::{CompoundCondition, Condition, ResponseValues, SimpleCondition};
use crate::operators::{Combinator, Operator};
use serde_json::Value;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件树
    pub fn evaluate(condition: &Condition, values: &ResponseValues) -> bool {
        match condition {
            Condition::Simple(simple) => Self::evaluate_simple(simple, values),
            Condition::Compound(compound) => Self::evaluate_compound(compound, values),
        }
    }

    /// 评估组合节点
    ///
    /// 空的 AND 组为真、空的 OR 组为假，直接来自 `all` / `any` 的定义。
    fn evaluate_compound(compound: &CompoundCondition, values: &ResponseValues) -> bool {
        match compound.combinator {
            Combinator::And => compound
                .conditions
                .iter()
                .all(|child| Self::evaluate(child, values)),
            Combinator::Or => compound
                .conditions
                .iter()
                .any(|child| Self::evaluate(child, values)),
        }
    }

    /// 评估叶子条件
    pub fn evaluate_simple(condition: &SimpleCondition, values: &ResponseValues) -> bool {
        let answer = values.get(&condition.question_id);
        Self::apply(answer, &condition.operator, condition.value.as_ref())
    }

    /// 对答案应用操作符
    ///
    /// # Arguments
    /// * `answer` - 当前答案，`None` 表示未定义
    /// * `operator` - 操作符
    /// * `expected` - 规则中定义的比较值，`None` 表示未提供
    pub fn apply(answer: Option<&Value>, operator: &Operator, expected: Option<&Value>) -> bool {
        match operator {
            Operator::Equals => Self::strict_equals(answer, expected),
            Operator::NotEquals => !Self::strict_equals(answer, expected),
            Operator::Contains => Self::contains(answer, expected).unwrap_or(false),
            // 非字符串/数组答案：contains 为假，not_contains 为真
            Operator::NotContains => Self::contains(answer, expected).map_or(true, |r| !r),
            Operator::GreaterThan => Self::compare(answer, expected, |a, b| a > b),
            Operator::LessThan => Self::compare(answer, expected, |a, b| a < b),
            Operator::GreaterThanOrEqual => Self::compare(answer, expected, |a, b| a >= b),
            Operator::LessThanOrEqual => Self::compare(answer, expected, |a, b| a <= b),
            Operator::IsEmpty => Self::is_empty(answer),
            Operator::IsNotEmpty => !Self::is_empty(answer),
            Operator::InList => Self::in_list(answer, expected).unwrap_or(false),
            Operator::NotInList => Self::in_list(answer, expected).map_or(true, |r| !r),
            Operator::Unknown(_) => false,
        }
    }

    /// 严格相等：不做类型转换，"1" 与 1 不相等；未定义只等于未定义
    ///
    /// 数组和对象按引用语义处理，与任何值都不相等（包括内容相同的数组）。
    pub fn strict_equals(left: Option<&Value>, right: Option<&Value>) -> bool {
        match (left, right) {
            (None, None) => true,
            (Some(Value::Array(_) | Value::Object(_)), _)
            | (_, Some(Value::Array(_) | Value::Object(_))) => false,
            (Some(Value::Number(a)), Some(Value::Number(b))) => {
                // 统一按 f64 比较，100 与 100.0 相等
                matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
            }
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// 判断值是否为空：未定义、null、空字符串、空数组
    ///
    /// 0 和 false 都不是空值。
    pub fn is_empty(value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(arr)) => arr.is_empty(),
            _ => false,
        }
    }

    /// 字符串子串 / 数组成员检查
    ///
    /// 答案既不是字符串也不是数组时返回 `None`，由调用方决定正反语义。
    fn contains(answer: Option<&Value>, expected: Option<&Value>) -> Option<bool> {
        match answer? {
            Value::String(s) => Some(match expected.and_then(Self::scalar_text) {
                Some(needle) => s.contains(needle.as_str()),
                None => false,
            }),
            Value::Array(items) => Some(
                items
                    .iter()
                    .any(|item| Self::strict_equals(Some(item), expected)),
            ),
            _ => None,
        }
    }

    /// 列表成员检查，比较值不是数组时返回 `None`
    fn in_list(answer: Option<&Value>, expected: Option<&Value>) -> Option<bool> {
        match expected? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .any(|item| Self::strict_equals(answer, Some(item))),
            ),
            _ => None,
        }
    }

    /// 数值比较
    ///
    /// 两侧都先转成数值，非数值转为 NaN，任何与 NaN 的比较都为假。
    fn compare<F>(answer: Option<&Value>, expected: Option<&Value>, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        cmp(Self::to_number(answer), Self::to_number(expected))
    }

    /// 转换为数值，数字字符串按数字处理，其余一律为 NaN
    pub fn to_number(value: Option<&Value>) -> f64 {
        match value {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// 作为子串检索时使用的文本
    fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
