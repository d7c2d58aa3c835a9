//! 规则解析器
//!
//! 按作者编排顺序遍历规则，第一条命中的规则胜出。

use crate::evaluator::ConditionEvaluator;
use crate::models::{LogicAction, LogicRule, ResponseValues};

/// 规则解析器
pub struct RuleResolver;

impl RuleResolver {
    /// 返回第一条命中规则的动作，均未命中时返回 `None`
    ///
    /// 结果只取决于规则顺序与作答快照。
    pub fn resolve<'a>(rules: &'a [LogicRule], values: &ResponseValues) -> Option<&'a LogicAction> {
        Self::first_match(rules, values).map(|rule| &rule.action)
    }

    /// 返回第一条命中的规则本身（用于诊断输出）
    pub fn first_match<'a>(rules: &'a [LogicRule], values: &ResponseValues) -> Option<&'a LogicRule> {
        rules
            .iter()
            .find(|rule| ConditionEvaluator::evaluate(&rule.condition, values))
    }
}
