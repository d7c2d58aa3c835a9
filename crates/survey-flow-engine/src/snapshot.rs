//! 流程快照
//!
//! 每次作答变化后整体重算：可见性、跳转目标、插值后的文本。
//! 快照只是一次计算结果，不缓存，不持有对题目列表的引用。

use crate::models::{Question, ResponseValues};
use crate::piping::{PipingContext, PipingOptions, PipingResolver};
use crate::resolver::RuleResolver;
use crate::visibility::VisibilityDecision;
use serde::Serialize;

/// 单道题的解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionState {
    pub id: String,
    pub order: u32,
    pub decision: VisibilityDecision,
    pub visible: bool,
    /// 命中的规则为 jump 时的目标
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jump_target: Option<String>,
    /// 插值后的题目文本
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 流程快照，题目按 `order` 排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowSnapshot {
    pub questions: Vec<QuestionState>,
}

impl FlowSnapshot {
    pub fn resolve(questions: &[Question], values: &ResponseValues, options: &PipingOptions) -> Self {
        let mut ordered: Vec<&Question> = questions.iter().collect();
        ordered.sort_by_key(|q| q.order);

        let context = PipingContext::new(values, ordered.iter().map(|q| q.id.clone()).collect());
        let piping = PipingResolver::with_options(options.clone());

        let states = ordered
            .into_iter()
            .map(|question| {
                let action = RuleResolver::resolve(&question.logic, values);
                let decision = VisibilityDecision::from_action(action);
                QuestionState {
                    id: question.id.clone(),
                    order: question.order,
                    decision,
                    visible: decision.is_visible(),
                    jump_target: action.and_then(|a| a.jump_target()).map(str::to_string),
                    text: piping.apply(&question.text, &context),
                    description: question
                        .description
                        .as_deref()
                        .map(|d| piping.apply(d, &context)),
                }
            })
            .collect();

        Self { questions: states }
    }

    pub fn get(&self, question_id: &str) -> Option<&QuestionState> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn visible_ids(&self) -> Vec<&str> {
        self.questions
            .iter()
            .filter(|q| q.visible)
            .map(|q| q.id.as_str())
            .collect()
    }

    /// 提交某题后的下一道题
    ///
    /// 当前题的跳转目标存在且排在其后时从目标开始查找，否则从下一题开始；
    /// 返回找到的第一道可见题目。`after_id` 不存在时返回 `None`。
    pub fn next_question(&self, after_id: &str) -> Option<&QuestionState> {
        let current = self.questions.iter().position(|q| q.id == after_id)?;

        let start = self.questions[current]
            .jump_target
            .as_deref()
            .and_then(|target| self.questions.iter().position(|q| q.id == target))
            .filter(|index| *index > current)
            .unwrap_or(current + 1);

        self.questions.iter().skip(start).find(|q| q.visible)
    }
}
