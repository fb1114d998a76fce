//! Request complexity scoring.
//!
//! Scores the text of a request to decide whether it warrants a provider's
//! heavier reasoning model. The score combines input length, keyword hits,
//! and a few structural patterns; each contribution is capped so no single
//! signal dominates.

use llmux_core::Message;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const HIGH_KEYWORDS: &[&str] = &[
    // Broad scope
    "complete", "entire", "system", "application", "project", "architecture",
    "infrastructure", "platform",
    // Multi-component
    "multiple", "all of", "full stack", "fullstack", "end-to-end", "e2e",
    "frontend and backend", "backend and frontend",
    // Complex integration
    "integration", "microservice", "orchestration", "pipeline", "workflow",
    "gateway", "payment", "authentication",
    // Deep analysis
    "deep analysis", "troubleshooting", "debug", "investigation", "diagnostic",
    // Extensive documentation
    "complete documentation", "manual", "full guide", "specification", "detailed",
    // Large refactors
    "refactor all", "rewrite", "migrate",
    // Large data
    "all logs", "full history", "log analysis",
    // Deployment
    "ci/cd", "docker", "kubernetes", "deploy", "deployment",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "api", "endpoint", "service", "module", "component", "feature",
    "crud", "rest", "graphql", "database",
];

static HIGH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d+\+?\s*(files|components|modules|services)\b",
        r"\b(create|build|develop|implement)\s+(a|an|the)\s+system\b",
        r"\b(backend|frontend)\s+and\s+(frontend|backend)\b",
        r"\bwith\s+\d+\+?\s+(features|endpoints)\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Complexity tier of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    /// Short, single-concern request.
    Low,
    /// Moderate scope; the reasoning model is used only when the score or
    /// estimated output is high enough.
    Medium,
    /// Broad or multi-component request.
    High,
}

/// Result of scoring one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityReport {
    /// Tier derived from the score.
    pub level: ComplexityLevel,
    /// Score in `0..=100`.
    pub score: u32,
    /// Rough estimate of output tokens the request will need.
    pub estimated_tokens: u32,
    /// Human-readable contributions, for logs.
    pub reasons: Vec<String>,
}

impl ComplexityReport {
    /// Whether this request should be routed to a reasoning model.
    ///
    /// High always qualifies; Medium qualifies when the estimated output is
    /// large or the score sits in the upper half of the band.
    pub fn recommends_reasoning(&self) -> bool {
        match self.level {
            ComplexityLevel::High => true,
            ComplexityLevel::Medium => self.estimated_tokens > 4000 || self.score > 35,
            ComplexityLevel::Low => false,
        }
    }
}

/// Scores request text into a [`ComplexityReport`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ComplexityAnalyzer;

impl ComplexityAnalyzer {
    /// Scores the concatenated content of `messages`.
    pub fn analyze(messages: &[Message]) -> ComplexityReport {
        let text: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self::analyze_text(&text)
    }

    /// Scores a raw text blob.
    pub fn analyze_text(text: &str) -> ComplexityReport {
        let lower = text.to_lowercase();
        let mut score: u32 = 0;
        let mut reasons = Vec::new();

        // Input size tiers (15-40 points).
        let char_count = text.chars().count() as u32;
        let size_points = match char_count {
            c if c > 1500 => 40,
            c if c > 800 => 30,
            c if c > 400 => 20,
            c if c > 200 => 15,
            _ => 0,
        };
        if size_points > 0 {
            score += size_points;
            reasons.push(format!("input size ({char_count} chars)"));
        }

        // High-complexity keywords (8 points each, capped at 50).
        let high_hits: Vec<&str> = HIGH_KEYWORDS
            .iter()
            .copied()
            .filter(|kw| lower.contains(kw))
            .collect();
        if !high_hits.is_empty() {
            score += (high_hits.len() as u32 * 8).min(50);
            reasons.push(format!(
                "high-complexity keywords ({}): {}",
                high_hits.len(),
                high_hits[..high_hits.len().min(3)].join(", ")
            ));
        }

        // Medium-complexity keywords (4 points each, capped at 20).
        let medium_hits: Vec<&str> = MEDIUM_KEYWORDS
            .iter()
            .copied()
            .filter(|kw| lower.contains(kw))
            .collect();
        if !medium_hits.is_empty() {
            score += (medium_hits.len() as u32 * 4).min(20);
            reasons.push(format!(
                "medium-complexity keywords ({}): {}",
                medium_hits.len(),
                medium_hits[..medium_hits.len().min(3)].join(", ")
            ));
        }

        // Structural patterns (15 points each, capped at 45).
        let pattern_hits = HIGH_PATTERNS
            .iter()
            .filter(|re| re.is_match(&lower))
            .count() as u32;
        if pattern_hits > 0 {
            score += (pattern_hits * 15).min(45);
            reasons.push(format!("structural patterns ({pattern_hits})"));
        }

        // Output token estimate from trigger words plus input size.
        let mut estimated_tokens: u32 = 1000;
        if lower.contains("complete") {
            estimated_tokens += 3000;
        }
        if lower.contains("system") {
            estimated_tokens += 2000;
        }
        if lower.contains("documentation") {
            estimated_tokens += 2000;
        }
        if lower.contains("all") {
            estimated_tokens += 1500;
        }
        if lower.contains("analysis") {
            estimated_tokens += 1000;
        }
        estimated_tokens += char_count / 2;

        let level = if score >= 45 {
            ComplexityLevel::High
        } else if score >= 25 {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Low
        };

        ComplexityReport {
            level,
            score: score.min(100),
            estimated_tokens,
            reasons,
        }
    }
}
