//! 问卷流程解析引擎
//!
//! 根据作答快照决定题目的可见性与跳转，并将先前的答案插值到题目文本中：
//! - 条件求值（严格相等、数值比较、空值判定）
//! - 规则解析（首条命中优先）
//! - 可见性解析（默认可见）
//! - 依赖图与循环检测
//! - 答案插值与引用校验
//!
//! 所有求值都是同步纯函数，不做 I/O，可在任意线程并发调用。

pub mod cli;
pub mod dependency_graph;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod operators;
pub mod piping;
pub mod resolver;
pub mod snapshot;
pub mod validation;
pub mod visibility;

pub use dependency_graph::{find_cycles, find_reference_cycles, DependencyGraph};
pub use document::{load_answers, Survey};
pub use error::{FlowError, Result};
pub use evaluator::ConditionEvaluator;
pub use models::{
    question_order, CompoundCondition, Condition, LogicAction, LogicRule, Question, QuestionType,
    ResponseValues, SimpleCondition,
};
pub use operators::{Combinator, Operator};
pub use piping::{
    extract_placeholders, PipingContext, PipingError, PipingErrorKind, PipingOptions,
    PipingResolver, PipingValidation,
};
pub use resolver::RuleResolver;
pub use snapshot::{FlowSnapshot, QuestionState};
pub use validation::{validate_logic, validate_survey, LogicValidation, SurveyValidationReport};
pub use visibility::{resolve_visibility, VisibilityDecision, VisibilityMap, VisibilityResolver};
