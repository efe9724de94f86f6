//! Rules, violations, and the consolidated report.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;

use crate::architecture::Architecture;
use crate::model::Artifact;
use crate::selection::SelectionError;
use crate::types::Category;

/// Violation messages of one rule, all under one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violations {
    pub category: Category,
    pub messages: Vec<String>,
}

impl Violations {
    pub fn new(category: Category, messages: Vec<String>) -> Self {
        Self { category, messages }
    }

    /// `Ok(())` when there is nothing to report.
    pub fn into_result(self) -> Result<(), RuleError> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(RuleError::Violation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("{} violation(s) of {} conventions", .0.messages.len(), .0.category)]
    Violation(Violations),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
    /// Outcomes of a bundle of rules.
    #[error("{} rule(s) failed", .0.len())]
    Batch(Vec<RuleError>),
}

type Check<'a> = dyn Fn(&Architecture) -> Result<(), RuleError> + Send + Sync + 'a;

/// A check over the architecture. Global analyzers and selection rules share this type.
pub struct Rule<'a> {
    description: String,
    check: Box<Check<'a>>,
}

impl<'a> Rule<'a> {
    pub fn new(
        description: impl Into<String>,
        check: impl Fn(&Architecture) -> Result<(), RuleError> + Send + Sync + 'a,
    ) -> Self {
        Self {
            description: description.into(),
            check: Box::new(check),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn check(&self, arch: &Architecture) -> Result<(), RuleError> {
        (self.check)(arch)
    }
}

impl fmt::Debug for Rule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A whole-program check over the artifact.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> Category;

    /// Violation messages in discovery order.
    fn analyze(&self, artifact: &Artifact) -> anyhow::Result<Vec<String>>;
}

impl<A: Analyzer + 'static> From<A> for Rule<'static> {
    fn from(analyzer: A) -> Self {
        Rule::new(analyzer.name(), move |arch: &Architecture| {
            let messages = analyzer
                .analyze(arch.artifact())
                .with_context(|| format!("{} failed", analyzer.name()))?;
            Violations::new(analyzer.category(), messages).into_result()
        })
    }
}

/// Violations of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub category: Category,
    pub violations: Vec<String>,
}

/// The consolidated result of a `validate` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Sections sorted by category.
    pub sections: Vec<Section>,
    /// Non-violation failures, in rule order.
    pub errors: Vec<String>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.errors.is_empty()
    }

    pub fn violation_count(&self) -> usize {
        self.sections.iter().map(|s| s.violations.len()).sum()
    }

    pub fn violations(&self, category: Category) -> &[String] {
        self.sections
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.violations.as_slice())
            .unwrap_or_default()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Architecture violations found")?;
        for section in &self.sections {
            writeln!(f, "### {} Conventions", section.category)?;
            for v in &section.violations {
                writeln!(f, "- {v}")?;
            }
        }
        if !self.errors.is_empty() {
            writeln!(f, "### General Errors")?;
            for e in &self.errors {
                writeln!(f, "- {e}")?;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Collector {
    sections: BTreeMap<Category, Vec<String>>,
    errors: Vec<String>,
}

impl Collector {
    fn absorb(&mut self, error: RuleError) {
        match error {
            RuleError::Violation(v) => self
                .sections
                .entry(v.category)
                .or_default()
                .extend(v.messages),
            RuleError::Selection(e) => self.errors.push(e.to_string()),
            RuleError::Internal(e) => self.errors.push(format!("{e:#}")),
            RuleError::Batch(errors) => {
                for e in errors {
                    self.absorb(e);
                }
            }
        }
    }

    fn finish(self) -> Option<Report> {
        let sections: Vec<Section> = self
            .sections
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(category, violations)| Section {
                category,
                violations,
            })
            .collect();
        if sections.is_empty() && self.errors.is_empty() {
            return None;
        }
        Some(Report {
            sections,
            errors: self.errors,
        })
    }
}

/// Run every rule in order and merge the outcomes into one report.
///
/// Returns `None` when all rules pass.
pub fn validate(arch: &Architecture, rules: &[Rule<'_>]) -> Option<Report> {
    let mut collector = Collector::default();
    for rule in rules {
        match rule.check(arch) {
            Ok(()) => tracing::debug!(rule = rule.description(), "rule passed"),
            Err(e) => {
                tracing::debug!(rule = rule.description(), "rule failed: {e}");
                collector.absorb(e);
            }
        }
    }
    collector.finish()
}

/// Run several rules as one, collecting every failure into a batch.
pub fn all<'a>(description: impl Into<String>, rules: Vec<Rule<'a>>) -> Rule<'a> {
    Rule::new(description, move |arch: &Architecture| {
        let failures: Vec<RuleError> = rules.iter().filter_map(|r| r.check(arch).err()).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(RuleError::Batch(failures))
        }
    })
}
