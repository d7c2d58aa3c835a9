//! 题目依赖图与循环检测
//!
//! 边 `A -> B` 表示题目 A 的某条规则（或插值占位符）读取了 B 的答案。
//! 图在查询时根据题目列表临时构建，不缓存、不随作答变化。

use crate::models::{question_order, Question};
use crate::piping::{extract_placeholders, question_index, PlaceholderKey};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// DFS 节点状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// 已入栈、尚未回溯
    Visiting,
    /// 子树已完整遍历
    Done,
}

/// 依赖图
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// 题目 ID，保持输入列表顺序，决定遍历起点顺序
    nodes: Vec<String>,
    /// question_id -> 它读取的题目（按首次引用顺序，去重）
    dependencies: HashMap<String, Vec<String>>,
    /// question_id -> 读取它的题目
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// 仅依据逻辑规则条件构建
    pub fn from_logic(questions: &[Question]) -> Self {
        Self::build(questions, false)
    }

    /// 依据逻辑规则条件和文本占位符共同构建
    pub fn from_references(questions: &[Question]) -> Self {
        Self::build(questions, true)
    }

    fn build(questions: &[Question], include_piping: bool) -> Self {
        let mut graph = Self {
            nodes: questions.iter().map(|q| q.id.clone()).collect(),
            ..Self::default()
        };
        let known: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        let order = question_order(questions);

        for question in questions {
            // 指向不存在题目的引用由逻辑校验报告，不进入图
            for target in question.logic_references() {
                if known.contains(target) {
                    graph.add_edge(&question.id, target);
                }
            }

            if !include_piping {
                continue;
            }

            let texts = std::iter::once(question.text.as_str()).chain(question.description.as_deref());
            for text in texts {
                for placeholder in extract_placeholders(text) {
                    let target = match placeholder.target() {
                        PlaceholderKey::Position(n) => n
                            .checked_sub(1)
                            .and_then(|i| order.get(i))
                            .map(|id| id.as_str()),
                        PlaceholderKey::QuestionId(key) => {
                            question_index(&order, key).map(|i| order[i].as_str())
                        }
                    };
                    if let Some(target) = target {
                        graph.add_edge(&question.id, target);
                    }
                }
            }
        }

        graph
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        let deps = self.dependencies.entry(from.to_string()).or_default();
        if deps.iter().any(|d| d == to) {
            return;
        }
        deps.push(to.to_string());
        self.dependents
            .entry(to.to_string())
            .or_default()
            .push(from.to_string());
    }

    /// 获取某题读取的所有题目
    pub fn dependencies_of(&self, question_id: &str) -> &[String] {
        self.dependencies
            .get(question_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 获取读取某题答案的所有题目
    pub fn dependents_of(&self, question_id: &str) -> &[String] {
        self.dependents
            .get(question_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 查找一个循环
    ///
    /// 返回的路径从被重复访问的祖先开始，到闭合循环的节点结束；自引用返回
    /// 单元素路径；无环时返回空列表。使用显式栈遍历，深链不会耗尽调用栈。
    pub fn find_cycle(&self) -> Vec<String> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.nodes.len());

        for start in &self.nodes {
            if marks.contains_key(start.as_str()) {
                continue;
            }

            // (节点, 下一个待访问的邻居下标)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            marks.insert(start, Mark::Visiting);

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(next) = self.dependencies_of(node).get(frame.1) else {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    continue;
                };
                frame.1 += 1;
                let next = next.as_str();

                match marks.get(next) {
                    Some(Mark::Visiting) => {
                        let from = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        let cycle: Vec<String> =
                            stack[from..].iter().map(|(n, _)| n.to_string()).collect();
                        debug!(cycle = ?cycle, "检测到循环依赖");
                        return cycle;
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::Visiting);
                        stack.push((next, 0));
                    }
                }
            }
        }

        Vec::new()
    }
}

/// 检测逻辑规则中的循环依赖
pub fn find_cycles(questions: &[Question]) -> Vec<String> {
    DependencyGraph::from_logic(questions).find_cycle()
}

/// 检测逻辑规则与插值占位符合并后的循环依赖
pub fn find_reference_cycles(questions: &[Question]) -> Vec<String> {
    DependencyGraph::from_references(questions).find_cycle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, LogicAction, LogicRule, QuestionType};
    use crate::operators::Operator;

    fn question(id: &str, order: u32, reads: &[&str]) -> Question {
        let mut q = Question::new(id, order, QuestionType::Text, id.to_uppercase());
        for target in reads {
            q = q.with_rule(LogicRule::new(
                Condition::unary(*target, Operator::IsEmpty),
                LogicAction::Hide,
            ));
        }
        q
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::from_logic(&[]);
        assert!(graph.is_empty());
        assert!(graph.find_cycle().is_empty());
    }

    #[test]
    fn test_tree_has_no_cycle() {
        let questions = vec![
            question("a", 1, &[]),
            question("b", 2, &["a"]),
            question("c", 3, &["a"]),
            question("d", 4, &["b", "c"]),
        ];
        let graph = DependencyGraph::from_logic(&questions);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert!(graph.find_cycle().is_empty());
        assert_eq!(graph.dependencies_of("d"), ["b", "c"]);
        assert_eq!(graph.dependents_of("a"), ["b", "c"]);
        assert!(graph.dependents_of("d").is_empty());
    }

    #[test]
    fn test_two_node_cycle() {
        let questions = vec![question("a", 1, &["b"]), question("b", 2, &["a"])];
        let cycle = find_cycles(&questions);
        assert_eq!(cycle, vec!["a", "b"]);
    }

    #[test]
    fn test_three_node_cycle_path_order() {
        let questions = vec![
            question("x", 1, &[]),
            question("a", 2, &["b"]),
            question("b", 3, &["c"]),
            question("c", 4, &["a"]),
        ];
        assert_eq!(find_cycles(&questions), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_entered_from_outside() {
        // s -> a -> b -> a：路径从被重复访问的 a 开始
        let questions = vec![
            question("s", 1, &["a"]),
            question("a", 2, &["b"]),
            question("b", 3, &["a"]),
        ];
        assert_eq!(find_cycles(&questions), vec!["a", "b"]);
    }

    #[test]
    fn test_self_reference() {
        let questions = vec![question("a", 1, &["a"])];
        assert_eq!(find_cycles(&questions), vec!["a"]);
    }

    #[test]
    fn test_unknown_references_are_ignored() {
        let questions = vec![question("a", 1, &["ghost"])];
        let graph = DependencyGraph::from_logic(&questions);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.find_cycle().is_empty());
    }

    #[test]
    fn test_duplicate_references_collapse() {
        let questions = vec![question("a", 1, &[]), question("b", 2, &["a", "a"])];
        let graph = DependencyGraph::from_logic(&questions);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_compound_leaves_produce_edges() {
        let q = Question::new("c", 3, QuestionType::Text, "C").with_rule(LogicRule::new(
            Condition::or(vec![
                Condition::simple("a", Operator::Equals, 1),
                Condition::and(vec![Condition::simple("b", Operator::Equals, 2)]),
            ]),
            LogicAction::Show,
        ));
        let questions = vec![question("a", 1, &[]), question("b", 2, &[]), q];
        let graph = DependencyGraph::from_logic(&questions);
        assert_eq!(graph.dependencies_of("c"), ["a", "b"]);
    }

    #[test]
    fn test_reference_graph_includes_piping() {
        let questions = vec![
            Question::new("a", 1, QuestionType::Text, "Hello {{b}}"),
            Question::new("b", 2, QuestionType::Text, "Name?").with_description("Was {{Q1}}"),
        ];
        assert!(find_cycles(&questions).is_empty());

        let graph = DependencyGraph::from_references(&questions);
        assert_eq!(graph.dependencies_of("a"), ["b"]);
        assert_eq!(graph.dependencies_of("b"), ["a"]);
        assert_eq!(find_reference_cycles(&questions), vec!["a", "b"]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let n = 10_000;
        let questions: Vec<Question> = (0..n)
            .map(|i| {
                let reads: Vec<String> = if i + 1 < n {
                    vec![format!("q{}", i + 1)]
                } else {
                    vec![]
                };
                let reads: Vec<&str> = reads.iter().map(String::as_str).collect();
                question(&format!("q{}", i), i as u32 + 1, &reads)
            })
            .collect();
        assert!(find_cycles(&questions).is_empty());
    }
}
