//! 发布前校验
//!
//! 所有校验都返回结构化结果而不是 `Err`：发布流程据此阻断，渲染流程
//! 则可以忽略这些发现继续按默认可见策略运行。

use crate::dependency_graph::find_cycles;
use crate::models::{Condition, LogicAction, Question};
use crate::piping::{PipingError, PipingResolver};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{info, instrument, warn};

/// 逻辑规则错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicErrorKind {
    EmptyCompound,
    UnknownOperator,
    MissingValue,
    ListValueRequired,
    UnknownQuestion,
    SelfReference,
    ForwardReference,
    UnknownJumpTarget,
    BackwardJump,
    DuplicateRuleId,
}

/// 逻辑规则错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicError {
    pub question_id: String,
    pub rule_id: String,
    /// 形如 `rules[0].condition.conditions[1]`
    pub path: String,
    pub kind: LogicErrorKind,
    /// 出错的操作符或被引用的题目 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub message: String,
}

impl fmt::Display for LogicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.question_id, self.message, self.path)
    }
}

/// 逻辑规则校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicValidation {
    pub valid: bool,
    pub errors: Vec<LogicError>,
}

/// 单道题的规则校验上下文
struct RuleScope<'a> {
    question: &'a Question,
    rule_id: &'a str,
    /// 题目 ID -> order（重复 ID 取首次出现）
    orders: &'a HashMap<&'a str, u32>,
    errors: &'a mut Vec<LogicError>,
}

impl RuleScope<'_> {
    fn push(&mut self, path: &str, kind: LogicErrorKind, reference: Option<&str>, message: String) {
        self.errors.push(LogicError {
            question_id: self.question.id.clone(),
            rule_id: self.rule_id.to_string(),
            path: path.to_string(),
            kind,
            reference: reference.map(str::to_string),
            message,
        });
    }

    fn validate_node(&mut self, node: &Condition, path: &str) {
        match node {
            Condition::Simple(simple) => {
                let operator = &simple.operator;
                if !operator.is_known() {
                    self.push(
                        path,
                        LogicErrorKind::UnknownOperator,
                        Some(operator.as_str()),
                        format!("条件 '{}' 使用了未知操作符 '{}'", path, operator),
                    );
                } else if operator.requires_value() {
                    match &simple.value {
                        None => self.push(
                            path,
                            LogicErrorKind::MissingValue,
                            Some(operator.as_str()),
                            format!("条件 '{}' 的 {} 操作符需要比较值", path, operator),
                        ),
                        Some(value) if operator.requires_list() && !matches!(value, Value::Array(_)) => {
                            self.push(
                                path,
                                LogicErrorKind::ListValueRequired,
                                Some(operator.as_str()),
                                format!("条件 '{}' 的 {} 操作符需要数组值", path, operator),
                            )
                        }
                        Some(_) => {}
                    }
                }

                self.validate_reference(&simple.question_id, path);
            }
            Condition::Compound(compound) => {
                if compound.conditions.is_empty() {
                    self.push(
                        path,
                        LogicErrorKind::EmptyCompound,
                        None,
                        format!("{} 组合条件 '{}' 不能为空", compound.combinator, path),
                    );
                }

                for (i, child) in compound.conditions.iter().enumerate() {
                    let child_path = format!("{}.conditions[{}]", path, i);
                    self.validate_node(child, &child_path);
                }
            }
        }
    }

    fn validate_reference(&mut self, referenced: &str, path: &str) {
        if referenced == self.question.id {
            self.push(
                path,
                LogicErrorKind::SelfReference,
                Some(referenced),
                format!("条件 '{}' 引用了题目自身", path),
            );
            return;
        }

        match self.orders.get(referenced) {
            None => self.push(
                path,
                LogicErrorKind::UnknownQuestion,
                Some(referenced),
                format!("条件 '{}' 引用的题目 '{}' 不存在", path, referenced),
            ),
            Some(order) if *order >= self.question.order => self.push(
                path,
                LogicErrorKind::ForwardReference,
                Some(referenced),
                format!("条件 '{}' 引用了排在其后的题目 '{}'", path, referenced),
            ),
            Some(_) => {}
        }
    }

    fn validate_action(&mut self, action: &LogicAction, path: &str) {
        let Some(target) = action.jump_target() else {
            return;
        };

        match self.orders.get(target) {
            None => self.push(
                path,
                LogicErrorKind::UnknownJumpTarget,
                Some(target),
                format!("跳转目标 '{}' 不存在", target),
            ),
            Some(order) if *order <= self.question.order => self.push(
                path,
                LogicErrorKind::BackwardJump,
                Some(target),
                format!("跳转目标 '{}' 不在当前题目之后", target),
            ),
            Some(_) => {}
        }
    }
}

/// 校验所有题目的逻辑规则
pub fn validate_logic(questions: &[Question]) -> LogicValidation {
    let mut orders: HashMap<&str, u32> = HashMap::with_capacity(questions.len());
    for q in questions {
        orders.entry(q.id.as_str()).or_insert(q.order);
    }

    let mut errors = Vec::new();
    for question in questions {
        let mut seen_rule_ids = HashSet::new();

        for (i, rule) in question.logic.iter().enumerate() {
            let mut scope = RuleScope {
                question,
                rule_id: &rule.id,
                orders: &orders,
                errors: &mut errors,
            };

            if !seen_rule_ids.insert(rule.id.as_str()) {
                scope.push(
                    &format!("rules[{}]", i),
                    LogicErrorKind::DuplicateRuleId,
                    None,
                    format!("规则 ID '{}' 重复", rule.id),
                );
            }

            scope.validate_node(&rule.condition, &format!("rules[{}].condition", i));
            scope.validate_action(&rule.action, &format!("rules[{}].action", i));
        }
    }

    LogicValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// 题目结构错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralErrorKind {
    DuplicateQuestionId,
    DuplicateOrder,
    /// order 必须从 1 开始
    InvalidOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralError {
    pub question_id: String,
    pub kind: StructuralErrorKind,
    pub message: String,
}

fn validate_structure(questions: &[Question]) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();
    let mut orders: HashMap<u32, &str> = HashMap::new();

    for q in questions {
        if !ids.insert(q.id.as_str()) {
            errors.push(StructuralError {
                question_id: q.id.clone(),
                kind: StructuralErrorKind::DuplicateQuestionId,
                message: format!("题目 ID '{}' 重复", q.id),
            });
        }

        if q.order == 0 {
            errors.push(StructuralError {
                question_id: q.id.clone(),
                kind: StructuralErrorKind::InvalidOrder,
                message: format!("题目 '{}' 的 order 必须大于 0", q.id),
            });
        } else if let Some(existing) = orders.insert(q.order, q.id.as_str()) {
            errors.push(StructuralError {
                question_id: q.id.clone(),
                kind: StructuralErrorKind::DuplicateOrder,
                message: format!("题目 '{}' 与 '{}' 的 order {} 重复", q.id, existing, q.order),
            });
        }
    }

    errors
}

/// 发布前校验报告
#[derive(Debug, Clone, Serialize)]
pub struct SurveyValidationReport {
    pub structure: Vec<StructuralError>,
    pub logic: Vec<LogicError>,
    /// 逻辑规则中的循环路径，无环时为空
    pub cycle: Vec<String>,
    pub piping: Vec<PipingError>,
    pub checked_at: DateTime<Utc>,
}

impl SurveyValidationReport {
    pub fn is_publishable(&self) -> bool {
        self.error_count() == 0
    }

    /// 发现的问题总数，一个循环计为一个
    pub fn error_count(&self) -> usize {
        self.structure.len()
            + self.logic.len()
            + self.piping.len()
            + usize::from(!self.cycle.is_empty())
    }
}

/// 汇总结构、逻辑、循环和插值四类校验
#[instrument(skip(questions), fields(questions = questions.len()))]
pub fn validate_survey(questions: &[Question]) -> SurveyValidationReport {
    let report = SurveyValidationReport {
        structure: validate_structure(questions),
        logic: validate_logic(questions).errors,
        cycle: find_cycles(questions),
        piping: PipingResolver::validate(questions).errors,
        checked_at: Utc::now(),
    };

    if report.is_publishable() {
        info!("问卷校验通过");
    } else {
        warn!(
            structure = report.structure.len(),
            logic = report.logic.len(),
            piping = report.piping.len(),
            cycle = ?report.cycle,
            "问卷校验未通过"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogicRule, QuestionType};
    use crate::operators::Operator;
    use serde_json::json;

    fn kinds(validation: &LogicValidation) -> Vec<LogicErrorKind> {
        validation.errors.iter().map(|e| e.kind).collect()
    }

    fn q(id: &str, order: u32) -> Question {
        Question::new(id, order, QuestionType::Text, id)
    }

    #[test]
    fn test_valid_logic() {
        let questions = vec![
            q("q1", 1),
            q("q2", 2).with_rule(LogicRule::new(
                Condition::simple("q1", Operator::InList, json!(["a", "b"])),
                LogicAction::jump("q3"),
            )),
            q("q3", 3),
        ];
        let result = validate_logic(&questions);
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_operator_value_errors() {
        let questions = vec![
            q("q1", 1),
            q("q2", 2)
                .with_rule(
                    LogicRule::new(Condition::unary("q1", Operator::Equals), LogicAction::Hide)
                        .with_id("r1"),
                )
                .with_rule(
                    LogicRule::new(
                        Condition::simple("q1", Operator::InList, "a"),
                        LogicAction::Hide,
                    )
                    .with_id("r2"),
                )
                .with_rule(
                    LogicRule::new(
                        Condition::simple("q1", Operator::from("between"), 1),
                        LogicAction::Hide,
                    )
                    .with_id("r3"),
                ),
        ];
        let result = validate_logic(&questions);
        assert_eq!(
            kinds(&result),
            vec![
                LogicErrorKind::MissingValue,
                LogicErrorKind::ListValueRequired,
                LogicErrorKind::UnknownOperator,
            ]
        );
        assert_eq!(result.errors[2].rule_id, "r3");
        assert_eq!(result.errors[2].reference.as_deref(), Some("between"));
    }

    #[test]
    fn test_unary_operator_needs_no_value() {
        let questions = vec![
            q("q1", 1),
            q("q2", 2).with_rule(LogicRule::new(
                Condition::unary("q1", Operator::IsNotEmpty),
                LogicAction::Show,
            )),
        ];
        assert!(validate_logic(&questions).valid);
    }

    #[test]
    fn test_reference_errors_with_paths() {
        let questions = vec![
            q("q1", 1),
            q("q2", 2).with_rule(
                LogicRule::new(
                    Condition::and(vec![
                        Condition::simple("q2", Operator::Equals, 1),
                        Condition::or(vec![
                            Condition::simple("q3", Operator::Equals, 1),
                            Condition::simple("ghost", Operator::Equals, 1),
                        ]),
                        Condition::or(vec![]),
                    ]),
                    LogicAction::Hide,
                )
                .with_id("r1"),
            ),
            q("q3", 3),
        ];
        let result = validate_logic(&questions);
        let found: Vec<(LogicErrorKind, &str)> = result
            .errors
            .iter()
            .map(|e| (e.kind, e.path.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (LogicErrorKind::SelfReference, "rules[0].condition.conditions[0]"),
                (
                    LogicErrorKind::ForwardReference,
                    "rules[0].condition.conditions[1].conditions[0]"
                ),
                (
                    LogicErrorKind::UnknownQuestion,
                    "rules[0].condition.conditions[1].conditions[1]"
                ),
                (LogicErrorKind::EmptyCompound, "rules[0].condition.conditions[2]"),
            ]
        );
    }

    #[test]
    fn test_jump_errors() {
        let questions = vec![
            q("q1", 1),
            q("q2", 2)
                .with_rule(LogicRule::new(
                    Condition::unary("q1", Operator::IsEmpty),
                    LogicAction::jump("q1"),
                ))
                .with_rule(LogicRule::new(
                    Condition::unary("q1", Operator::IsEmpty),
                    LogicAction::jump("q404"),
                )),
        ];
        let result = validate_logic(&questions);
        assert_eq!(
            kinds(&result),
            vec![LogicErrorKind::BackwardJump, LogicErrorKind::UnknownJumpTarget]
        );
        assert_eq!(result.errors[0].path, "rules[0].action");
    }

    #[test]
    fn test_duplicate_rule_id() {
        let rule = LogicRule::new(Condition::unary("q1", Operator::IsEmpty), LogicAction::Hide)
            .with_id("same");
        let questions = vec![q("q1", 1), q("q2", 2).with_rule(rule.clone()).with_rule(rule)];
        let result = validate_logic(&questions);
        assert_eq!(kinds(&result), vec![LogicErrorKind::DuplicateRuleId]);
        assert_eq!(result.errors[0].path, "rules[1]");
    }

    #[test]
    fn test_structure_errors() {
        let questions = vec![q("q1", 1), q("q1", 2), q("q3", 2), q("q4", 0)];
        let report = validate_survey(&questions);
        let found: Vec<StructuralErrorKind> = report.structure.iter().map(|e| e.kind).collect();
        assert_eq!(
            found,
            vec![
                StructuralErrorKind::DuplicateQuestionId,
                StructuralErrorKind::DuplicateOrder,
                StructuralErrorKind::InvalidOrder,
            ]
        );
        assert!(!report.is_publishable());
    }

    #[test]
    fn test_survey_report_aggregates_cycle_and_piping() {
        let questions = vec![
            q("a", 1).with_rule(LogicRule::new(
                Condition::simple("b", Operator::Equals, 1),
                LogicAction::Hide,
            )),
            q("b", 2).with_rule(LogicRule::new(
                Condition::simple("a", Operator::Equals, 1),
                LogicAction::Hide,
            )),
            Question::new("c", 3, QuestionType::Text, "Hi {{Q4}}"),
        ];
        let report = validate_survey(&questions);
        assert_eq!(report.cycle, vec!["a", "b"]);
        assert_eq!(report.piping.len(), 1);
        // a 引用了排在其后的 b
        assert_eq!(report.logic.len(), 1);
        assert_eq!(report.error_count(), 3);
        assert!(!report.is_publishable());
    }

    #[test]
    fn test_publishable_survey() {
        let questions = vec![
            q("q1", 1),
            Question::new("q2", 2, QuestionType::Text, "Thanks {{Q1}}").with_rule(LogicRule::new(
                Condition::simple("q1", Operator::Equals, "No"),
                LogicAction::Hide,
            )),
        ];
        let report = validate_survey(&questions);
        assert!(report.is_publishable());
        assert_eq!(report.error_count(), 0);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("checked_at").is_some());
        assert_eq!(json["cycle"], json!([]));
    }
}
