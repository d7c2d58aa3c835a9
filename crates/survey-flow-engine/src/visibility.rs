//! 可见性解析
//!
//! 每道题独立求值，默认可见。可见性不具传递性：被隐藏题目的旧答案
//! 仍然留在作答快照中，依赖它的题目照常按该值求值。

use crate::models::{LogicAction, Question, ResponseValues};
use crate::resolver::RuleResolver;
use serde::Serialize;
use std::collections::BTreeMap;

pub type VisibilityMap = BTreeMap<String, bool>;

/// 单道题的可见性判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityDecision {
    /// 命中 show 规则
    Shown,
    /// 命中 hide 规则
    Hidden,
    /// 无规则、无命中或命中 jump，按默认策略显示
    Unaffected,
}

impl VisibilityDecision {
    /// 由命中规则的动作得出判定
    pub fn from_action(action: Option<&LogicAction>) -> Self {
        match action {
            Some(LogicAction::Show) => Self::Shown,
            Some(LogicAction::Hide) => Self::Hidden,
            // jump 只影响提交时的顺序
            Some(LogicAction::Jump { .. }) | None => Self::Unaffected,
        }
    }

    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// 可见性解析器
pub struct VisibilityResolver;

impl VisibilityResolver {
    pub fn decide(question: &Question, values: &ResponseValues) -> VisibilityDecision {
        VisibilityDecision::from_action(RuleResolver::resolve(&question.logic, values))
    }

    pub fn is_visible(question: &Question, values: &ResponseValues) -> bool {
        Self::decide(question, values).is_visible()
    }
}

/// 批量计算所有题目的可见性
pub fn resolve_visibility(questions: &[Question], values: &ResponseValues) -> VisibilityMap {
    questions
        .iter()
        .map(|q| (q.id.clone(), VisibilityResolver::is_visible(q, values)))
        .collect()
}
