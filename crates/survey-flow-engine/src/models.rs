//! 问卷引擎领域模型
//!
//! 条件（`Condition`）是一棵由单条 `LogicRule` 独占的树；跨题目的引用关系
//! 由 [`crate::dependency_graph::DependencyGraph`] 单独建模，两者互不混用。

use crate::operators::{Combinator, Operator};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// 作答快照：questionId -> 答案
///
/// 键不存在即视为"未定义"，与显式的 `null` 区分。
pub type ResponseValues = HashMap<String, Value>;

/// 题目输入类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Textarea,
    Number,
    Email,
    Phone,
    Date,
    SingleChoice,
    MultipleChoice,
    Dropdown,
    Rating,
    Scale,
    YesNo,
    Location,
    File,
    /// 引擎不关心的其他控件类型
    #[serde(other)]
    Other,
}

/// 题目定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    /// 从 1 开始的位置序号，`{{Qn}}` 按它定位
    pub order: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 按作者编排顺序排列的逻辑规则，顺序即优先级
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logic: Vec<LogicRule>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        order: u32,
        question_type: QuestionType,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            order,
            question_type,
            text: text.into(),
            description: None,
            logic: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_rule(mut self, rule: LogicRule) -> Self {
        self.logic.push(rule);
        self
    }

    pub fn has_logic(&self) -> bool {
        !self.logic.is_empty()
    }

    /// 逻辑规则中引用到的题目 ID（去重，保持首次出现顺序）
    pub fn logic_references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        for rule in &self.logic {
            rule.condition.collect_references(&mut refs);
        }
        refs
    }
}

/// 条件节点（叶子比较或 AND/OR 组合）
///
/// JSON 按字段形状区分：带 `combinator` 的是组合节点，否则是叶子。
/// 多余的 `type` 字段会被忽略。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Compound(CompoundCondition),
    Simple(SimpleCondition),
}

impl Condition {
    pub fn simple(question_id: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Simple(SimpleCondition::new(question_id, operator, value))
    }

    /// 构造不带比较值的条件（is_empty / is_not_empty）
    pub fn unary(question_id: impl Into<String>, operator: Operator) -> Self {
        Self::Simple(SimpleCondition {
            question_id: question_id.into(),
            operator,
            value: None,
        })
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::Compound(CompoundCondition::new(Combinator::And, conditions))
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::Compound(CompoundCondition::new(Combinator::Or, conditions))
    }

    /// 递归收集叶子节点引用的题目 ID
    ///
    /// 组合节点本身不产生引用，只有叶子产生。
    pub fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Self::Simple(simple) => {
                if !refs.contains(&simple.question_id.as_str()) {
                    refs.push(&simple.question_id);
                }
            }
            Self::Compound(compound) => {
                for child in &compound.conditions {
                    child.collect_references(refs);
                }
            }
        }
    }

    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }
}

/// 叶子条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleCondition {
    pub question_id: String,
    pub operator: Operator,
    /// 显式的 `null` 保留为 `Some(Value::Null)`，缺省才是 `None`
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl SimpleCondition {
    pub fn new(question_id: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            question_id: question_id.into(),
            operator,
            value: Some(value.into()),
        }
    }
}

/// 组合条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundCondition {
    pub combinator: Combinator,
    pub conditions: Vec<Condition>,
}

impl CompoundCondition {
    pub fn new(combinator: Combinator, conditions: Vec<Condition>) -> Self {
        Self {
            combinator,
            conditions,
        }
    }
}

/// 规则命中后的动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogicAction {
    Show,
    Hide,
    /// 跳转只影响提交时的题目顺序，不影响可见性
    Jump {
        #[serde(rename = "targetQuestionId")]
        target_question_id: String,
    },
}

impl LogicAction {
    pub fn jump(target: impl Into<String>) -> Self {
        Self::Jump {
            target_question_id: target.into(),
        }
    }

    pub fn jump_target(&self) -> Option<&str> {
        match self {
            Self::Jump { target_question_id } => Some(target_question_id),
            _ => None,
        }
    }
}

/// 逻辑规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicRule {
    #[serde(default = "generate_rule_id")]
    pub id: String,
    pub condition: Condition,
    pub action: LogicAction,
}

impl LogicRule {
    pub fn new(condition: Condition, action: LogicAction) -> Self {
        Self {
            id: generate_rule_id(),
            condition,
            action,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

fn generate_rule_id() -> String {
    Uuid::new_v4().to_string()
}

/// 按 `order` 排序后的题目 ID 列表（`{{Qn}}` 的定位依据）
pub fn question_order(questions: &[Question]) -> Vec<String> {
    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|q| q.order);
    ordered.into_iter().map(|q| q.id.clone()).collect()
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
