//! 答案插值（piping）
//!
//! 将题目文本中的 `{{questionId}}` / `{{Qn}}` 占位符替换为已作答内容。
//! 替换在渲染时进行，从不改写存储的题目文本；无法解析的占位符原样保留。
//! 答案文本本身不含 `{{...}}` 时，对结果重复应用是幂等的；答案中的占位符
//! 在第二次应用时会被再次展开，因此渲染结果只应替换一次。

use crate::models::{question_order, Question, ResponseValues};
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::LazyLock;
use survey_shared::config::PipingConfig;
use tracing::debug;

/// 匹配 `{{key}}` 格式的占位符
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder regex"));

/// 匹配 1 起始的位置令牌 `Qn`
static POSITIONAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Q(\d+)$").expect("positional regex"));

/// 占位符指向的目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKey<'a> {
    /// `Qn`，保存 1 起始的 n
    Position(usize),
    QuestionId(&'a str),
}

/// 文本中的一个占位符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// 完整的 `{{...}}` 文本
    pub raw: &'a str,
    /// 去除空白后的键
    pub key: &'a str,
}

impl<'a> Placeholder<'a> {
    pub fn target(&self) -> PlaceholderKey<'a> {
        parse_key(self.key)
    }
}

fn parse_key(key: &str) -> PlaceholderKey<'_> {
    POSITIONAL_REGEX
        .captures(key)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .map(PlaceholderKey::Position)
        .unwrap_or(PlaceholderKey::QuestionId(key))
}

/// 提取文本中的所有占位符（按出现顺序，不去重）
pub fn extract_placeholders(text: &str) -> Vec<Placeholder<'_>> {
    PLACEHOLDER_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let raw = caps.get(0)?.as_str();
            let key = caps.get(1)?.as_str();
            Some(Placeholder { raw, key })
        })
        .collect()
}

/// 插值上下文
#[derive(Debug, Clone)]
pub struct PipingContext<'a> {
    pub answers: &'a ResponseValues,
    /// 按 `order` 排列的题目 ID，`Qn` 取第 n-1 个
    pub question_order: Vec<String>,
}

impl<'a> PipingContext<'a> {
    pub fn new(answers: &'a ResponseValues, question_order: Vec<String>) -> Self {
        Self {
            answers,
            question_order,
        }
    }

    pub fn for_questions(questions: &[Question], answers: &'a ResponseValues) -> Self {
        Self::new(answers, question_order(questions))
    }

    /// 解析占位符键
    ///
    /// 外层 `None` 表示无法解析（保留原文）；内层 `None` 表示题目存在但未作答。
    fn lookup(&self, key: &str) -> Option<Option<&'a Value>> {
        match parse_key(key) {
            PlaceholderKey::Position(n) => {
                let id = self.question_order.get(n.checked_sub(1)?)?;
                Some(self.answers.get(id))
            }
            PlaceholderKey::QuestionId(key) => {
                if let Some(answer) = self.answers.get(key) {
                    return Some(Some(answer));
                }
                let index = question_index(&self.question_order, key)?;
                Some(self.answers.get(&self.question_order[index]))
            }
        }
    }
}

/// 将非位置键解析为 `order` 中的下标
///
/// 先精确匹配题目 ID，再匹配唯一以 `_<key>` 结尾的题目 ID（`{{flavor}}` 指向 `q_flavor`）；
/// 别名匹配到多道题时视为无法解析。
pub(crate) fn question_index(order: &[String], key: &str) -> Option<usize> {
    if let Some(index) = order.iter().position(|id| id == key) {
        return Some(index);
    }

    let suffix = format!("_{}", key);
    let mut aliases = order
        .iter()
        .enumerate()
        .filter(|(_, id)| id.ends_with(&suffix));
    match (aliases.next(), aliases.next()) {
        (Some((index, _)), None) => Some(index),
        _ => None,
    }
}

/// 插值格式选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipingOptions {
    pub empty_answer_text: String,
    pub list_separator: String,
    pub true_text: String,
    pub false_text: String,
}

impl Default for PipingOptions {
    fn default() -> Self {
        Self::from(&PipingConfig::default())
    }
}

impl From<&PipingConfig> for PipingOptions {
    fn from(config: &PipingConfig) -> Self {
        Self {
            empty_answer_text: config.empty_answer_text.clone(),
            list_separator: config.list_separator.clone(),
            true_text: config.true_text.clone(),
            false_text: config.false_text.clone(),
        }
    }
}

/// 插值解析器
#[derive(Debug, Clone, Default)]
pub struct PipingResolver {
    options: PipingOptions,
}

impl PipingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PipingOptions) -> Self {
        Self { options }
    }

    /// 替换文本中的占位符
    ///
    /// 单次扫描：插入的答案文本不会在本次调用中再被展开。
    pub fn apply(&self, text: &str, context: &PipingContext<'_>) -> String {
        PLACEHOLDER_REGEX
            .replace_all(text, |caps: &Captures| match context.lookup(&caps[1]) {
                Some(answer) => self.format_answer(answer),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// 格式化答案
    ///
    /// 未作答、null、空字符串、空数组显示为占位文本；布尔显示为 Yes/No；
    /// 数组按分隔符连接；整数值的浮点数不带小数部分。
    pub fn format_answer(&self, answer: Option<&Value>) -> String {
        match answer {
            None | Some(Value::Null) => self.options.empty_answer_text.clone(),
            Some(Value::String(s)) if s.is_empty() => self.options.empty_answer_text.clone(),
            Some(Value::Array(items)) if items.is_empty() => {
                self.options.empty_answer_text.clone()
            }
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.format_scalar(item))
                .collect::<Vec<_>>()
                .join(&self.options.list_separator),
            Some(other) => self.format_scalar(other),
        }
    }

    fn format_scalar(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Bool(true) => self.options.true_text.clone(),
            Value::Bool(false) => self.options.false_text.clone(),
            Value::Number(n) => format_number(n),
            other => other.to_string(),
        }
    }

    /// 校验所有题目的占位符引用
    ///
    /// 按 `order` 排序后的下标比较：引用自身、引用同位或之后的题目、
    /// 引用不存在的题目都会产生错误。不会修改输入。
    pub fn validate(questions: &[Question]) -> PipingValidation {
        let order = question_order(questions);
        let mut errors = Vec::new();

        for question in questions {
            let Some(own_index) = order.iter().position(|id| *id == question.id) else {
                continue;
            };

            let mut fields = vec![(TextField::Text, question.text.as_str())];
            if let Some(description) = &question.description {
                fields.push((TextField::Description, description.as_str()));
            }

            for (field, text) in fields {
                for placeholder in extract_placeholders(text) {
                    let referenced = match placeholder.target() {
                        PlaceholderKey::Position(n) => n.checked_sub(1).filter(|i| *i < order.len()),
                        PlaceholderKey::QuestionId(key) => question_index(&order, key),
                    };

                    let kind = match referenced {
                        None => PipingErrorKind::NotFound,
                        Some(index) if index == own_index => PipingErrorKind::SelfReference,
                        Some(index) if index > own_index => PipingErrorKind::ForwardReference,
                        Some(_) => continue,
                    };

                    errors.push(PipingError {
                        question_id: question.id.clone(),
                        question_index: own_index,
                        field,
                        placeholder: placeholder.key.to_string(),
                        kind,
                    });
                }
            }
        }

        debug!(
            questions = questions.len(),
            errors = errors.len(),
            "占位符校验完成"
        );

        PipingValidation {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// 按 JavaScript 的数字显示习惯格式化：整数值不带小数
fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// 占位符所在字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Text,
    Description,
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Description => write!(f, "description"),
        }
    }
}

/// 占位符错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipingErrorKind {
    SelfReference,
    ForwardReference,
    NotFound,
}

/// 占位符错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipingError {
    pub question_id: String,
    /// 按 `order` 排序后从 0 开始的下标
    pub question_index: usize,
    pub field: TextField,
    pub placeholder: String,
    pub kind: PipingErrorKind,
}

impl fmt::Display for PipingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            PipingErrorKind::SelfReference => "引用了题目自身",
            PipingErrorKind::ForwardReference => "引用了尚未出现的题目",
            PipingErrorKind::NotFound => "引用的题目不存在",
        };
        write!(
            f,
            "题目 {}（第 {} 题）的 {} 中占位符 {{{{{}}}}} {}",
            self.question_id,
            self.question_index + 1,
            self.field,
            self.placeholder,
            reason
        )
    }
}

/// 占位符校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipingValidation {
    pub valid: bool,
    pub errors: Vec<PipingError>,
}
