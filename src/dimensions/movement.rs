//! Movement: how smoothly control flows through the code.
//!
//! Penalizes branch-heavy units, deep nesting, long promise chains and
//! exception jumps; rewards early returns while units stay simple.

use std::collections::{BTreeMap, HashSet};

use crate::analyzers::complexity;
use crate::config::MovementConfig;
use crate::core::Result;
use crate::parser::queries::{callee_property, for_each_in_unit, function_sites};
use crate::parser::{for_each_node, AstNode, NodeKind};

use super::{
    Dimension, DimensionAnalyzer, DimensionOutcome, PrincipleAnalysisResult, Recommendation,
    RecommendationSeverity,
};

/// Points lost per unit of cyclomatic complexity above the threshold.
const COMPLEXITY_PENALTY_PER_POINT: f64 = 12.0;
/// Branch count above which `info` early-return advice applies.
const EARLY_RETURN_ADVICE_COMPLEXITY: u32 = 3;

const PROMISE_METHODS: &[&str] = &["then", "catch", "finally"];

/// Raw control-flow measurements for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementMetrics {
    /// Worst cyclomatic complexity of any unit.
    pub cyclomatic_complexity: u32,
    pub max_nesting_depth: u32,
    /// Promise chains deeper than the chain threshold.
    pub callback_chains: usize,
    /// Returns beyond the last one, summed over functions.
    pub early_returns: usize,
    /// `throw` statements plus `catch` clauses.
    pub exception_jumps: usize,
    /// Any function with more than a handful of branches.
    pub has_branchy_function: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MovementAnalyzer {
    config: MovementConfig,
}

impl MovementAnalyzer {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn measure(&self, root: &AstNode) -> MovementMetrics {
        let sites = function_sites(root);
        let file = complexity::analyze_file(root, sites.iter().map(|s| s.node));

        let mut metrics = MovementMetrics {
            cyclomatic_complexity: file.cyclomatic,
            max_nesting_depth: file.max_nesting,
            callback_chains: count_callback_chains(root, self.config.callback_chain_threshold),
            ..MovementMetrics::default()
        };

        for site in &sites {
            let mut returns: usize = 0;
            for_each_in_unit(site.node, |node, _| match node.kind {
                NodeKind::ReturnStatement => returns += 1,
                NodeKind::ThrowStatement | NodeKind::CatchClause => metrics.exception_jumps += 1,
                _ => {}
            });
            metrics.early_returns += returns.saturating_sub(1);
            if complexity::cyclomatic_complexity(site.node) > EARLY_RETURN_ADVICE_COMPLEXITY {
                metrics.has_branchy_function = true;
            }
        }

        metrics
    }

    pub fn score(&self, m: &MovementMetrics) -> f64 {
        let cfg = &self.config;
        let mut score = 100.0;

        if m.cyclomatic_complexity > cfg.complexity_threshold {
            let over = f64::from(m.cyclomatic_complexity - cfg.complexity_threshold);
            score -= (over * COMPLEXITY_PENALTY_PER_POINT).min(30.0);
        }
        if m.max_nesting_depth > cfg.nesting_threshold {
            let over = f64::from(m.max_nesting_depth - cfg.nesting_threshold);
            score -= (over * 5.0).min(20.0);
        }
        if m.callback_chains > cfg.callback_chain_threshold {
            let over = (m.callback_chains - cfg.callback_chain_threshold) as f64;
            score -= (over * 5.0).min(15.0);
        }
        // Early returns only help while every unit stays within budget.
        if m.cyclomatic_complexity <= cfg.complexity_threshold {
            score += (m.early_returns as f64 * 2.0).min(10.0);
        }
        score -= (m.exception_jumps as f64 * 2.0).min(10.0);

        score
    }

    pub fn recommendations(&self, m: &MovementMetrics) -> Vec<Recommendation> {
        let cfg = &self.config;
        let mut recs = Vec::new();

        if m.cyclomatic_complexity > cfg.complexity_threshold {
            let severity = if m.cyclomatic_complexity > cfg.complexity_threshold * 2 {
                RecommendationSeverity::Critical
            } else {
                RecommendationSeverity::Warning
            };
            recs.push(
                Recommendation::new(
                    Dimension::Movement,
                    severity,
                    format!(
                        "Cyclomatic complexity is {} (max recommended: {}). Split function into smaller units.",
                        m.cyclomatic_complexity, cfg.complexity_threshold
                    ),
                    ((m.cyclomatic_complexity - cfg.complexity_threshold) * 2).min(20),
                )
                .with_fix("Extract complex logic into separate functions"),
            );
        }

        if m.max_nesting_depth > cfg.nesting_threshold {
            let severity = if m.max_nesting_depth > cfg.nesting_threshold + 2 {
                RecommendationSeverity::Critical
            } else {
                RecommendationSeverity::Warning
            };
            recs.push(
                Recommendation::new(
                    Dimension::Movement,
                    severity,
                    format!(
                        "Maximum nesting depth is {} (recommended: {}). Extract nested logic into separate functions.",
                        m.max_nesting_depth, cfg.nesting_threshold
                    ),
                    ((m.max_nesting_depth - cfg.nesting_threshold) * 5).min(15),
                )
                .with_fix("Use early returns or extract nested blocks into helper functions"),
            );
        }

        if m.callback_chains > cfg.callback_chain_threshold {
            let over = (m.callback_chains - cfg.callback_chain_threshold) as u32;
            recs.push(
                Recommendation::new(
                    Dimension::Movement,
                    RecommendationSeverity::Warning,
                    format!(
                        "Found {} callback chains. Use async/await instead of promise chains.",
                        m.callback_chains
                    ),
                    (over * 5).min(10),
                )
                .with_fix("Convert .then() chains to async/await syntax"),
            );
        }

        if m.early_returns == 0 && m.has_branchy_function {
            recs.push(
                Recommendation::new(
                    Dimension::Movement,
                    RecommendationSeverity::Info,
                    "Consider using early returns to simplify control flow",
                    5,
                )
                .with_fix("Return early for edge cases instead of nesting"),
            );
        }

        recs
    }
}

impl DimensionAnalyzer for MovementAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::Movement
    }

    fn analyze(&self, ast: &AstNode, _source: &str) -> Result<DimensionOutcome> {
        let m = self.measure(ast);
        let metrics = BTreeMap::from([
            ("cyclomaticComplexity".to_string(), f64::from(m.cyclomatic_complexity)),
            ("maxNestingDepth".to_string(), f64::from(m.max_nesting_depth)),
            ("callbackChains".to_string(), m.callback_chains as f64),
            ("earlyReturns".to_string(), m.early_returns as f64),
            ("exceptionJumps".to_string(), m.exception_jumps as f64),
        ]);
        Ok(DimensionOutcome::Scored(PrincipleAnalysisResult::new(
            self.score(&m),
            self.recommendations(&m),
            metrics,
        )))
    }
}

fn is_promise_call(node: &AstNode) -> bool {
    node.kind == NodeKind::CallExpression
        && callee_property(node).is_some_and(|name| PROMISE_METHODS.contains(&name))
}

/// Length of the `.then/.catch/.finally` chain ending at `call`.
fn chain_depth(call: &AstNode) -> usize {
    let mut depth = 0;
    let mut current = Some(call);
    while let Some(node) = current.filter(|n| is_promise_call(n)) {
        depth += 1;
        current = node
            .child("function")
            .and_then(|callee| callee.child("object"));
    }
    depth
}

/// Maximal promise chains longer than `threshold` calls.
///
/// Pre-order visits the outermost call of a chain first; the inner links
/// are remembered so a chain is counted once.
pub fn count_callback_chains(root: &AstNode, threshold: usize) -> usize {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut chains = 0;

    for_each_node(root, |node, _| {
        if !is_promise_call(node) || seen.contains(&(node.range.start, node.range.end)) {
            return;
        }
        let mut current = Some(node);
        while let Some(link) = current.filter(|n| is_promise_call(n)) {
            seen.insert((link.range.start, link.range.end));
            current = link
                .child("function")
                .and_then(|callee| callee.child("object"));
        }
        if chain_depth(node) > threshold {
            chains += 1;
        }
    });

    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn run(source: &str) -> PrincipleAnalysisResult {
        let root = parse(source, Path::new("m.ts")).unwrap();
        match MovementAnalyzer::default().analyze(&root, source).unwrap() {
            DimensionOutcome::Scored(result) => result,
            DimensionOutcome::NotYetImplemented => panic!("movement is implemented"),
        }
    }

    fn branchy(branches: usize) -> String {
        let mut source = String::from("function classify(x: number): string {\n");
        for i in 0..branches {
            source.push_str(&format!("  if (x === {i}) return 'v{i}';\n"));
        }
        source.push_str("  return 'other';\n}\n");
        source
    }

    #[test]
    fn test_simple_function_scores_high() {
        let result = run("function add(a, b) { return a + b; }");
        assert!(result.score >= 95, "score was {}", result.score);
        assert_eq!(result.metrics["cyclomaticComplexity"], 1.0);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_eleven_branches_score_below_80() {
        let result = run(&branchy(11));
        assert_eq!(result.metrics["cyclomaticComplexity"], 12.0);
        assert!(result.score < 80, "score was {}", result.score);
        let rec = result
            .recommendations
            .iter()
            .find(|r| r.message.contains("complexity"))
            .expect("complexity recommendation");
        assert_eq!(rec.severity, RecommendationSeverity::Warning);
        assert_eq!(rec.estimated_impact, 4);
    }

    #[test]
    fn test_very_high_complexity_is_critical() {
        let result = run(&branchy(25));
        assert_eq!(result.score, 70);
        assert_eq!(
            result.recommendations[0].severity,
            RecommendationSeverity::Critical
        );
    }

    #[test]
    fn test_early_returns_earn_bonus_within_budget() {
        let m = MovementAnalyzer::default().measure(
            &parse(&branchy(3), Path::new("m.ts")).unwrap(),
        );
        assert_eq!(m.early_returns, 3);
        assert_eq!(MovementAnalyzer::default().score(&m), 106.0);
    }

    #[test]
    fn test_deep_nesting_penalty() {
        let source = "function f(a) {\n  if (a) {\n    for (;;) {\n      while (a) {\n        if (a > 1) {\n          if (a > 2) { a--; }\n        }\n      }\n    }\n  }\n}";
        let result = run(source);
        assert_eq!(result.metrics["maxNestingDepth"], 5.0);
        let rec = result
            .recommendations
            .iter()
            .find(|r| r.message.starts_with("Maximum nesting depth is 5"))
            .unwrap();
        assert_eq!(rec.severity, RecommendationSeverity::Warning);
        assert_eq!(rec.estimated_impact, 10);
    }

    #[test]
    fn test_callback_chains_counted_once() {
        let source = "fetch(u).then(a).then(b).then(c).catch(d);\np.then(a);";
        let root = parse(source, Path::new("c.js")).unwrap();
        assert_eq!(count_callback_chains(&root, 2), 1);
        assert_eq!(count_callback_chains(&root, 0), 2);
    }

    #[test]
    fn test_many_callback_chains_recommend_async_await() {
        let chain = "p.then(a).then(b).then(c);\n";
        let result = run(&chain.repeat(4));
        assert_eq!(result.metrics["callbackChains"], 4.0);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.message.contains("async/await") && r.estimated_impact == 10));
    }

    #[test]
    fn test_exception_jumps() {
        let source = "function f(x) {\n  try { if (!x) throw new Error('x'); } catch (e) { throw e; }\n}";
        let result = run(source);
        assert_eq!(result.metrics["exceptionJumps"], 3.0);
    }

    #[test]
    fn test_missing_early_returns_advice() {
        let source = "function f(a, b) {\n  let r = 0;\n  if (a) { r = 1; } else if (b) { r = 2; } else if (a && b) { r = 3; }\n  return r;\n}";
        let result = run(source);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.severity == RecommendationSeverity::Info && r.estimated_impact == 5));
    }
}
