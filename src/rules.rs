//! Post-translation mapping rules
//!
//! Site-specific renames applied on top of the translator output: function
//! names the engine maps generically, and warehouse table locations
//! (`project.dataset.table` → `catalog.schema.table`).

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::{debug, info};

use crate::dialect::Dialect;

/// On-disk shape of the rules file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesFile {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub functions: BTreeMap<String, String>,
    #[serde(default)]
    pub table_mapping: TableMapping,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableMapping {
    #[serde(default)]
    pub projects: BTreeMap<String, String>,
    #[serde(default)]
    pub datasets: BTreeMap<String, String>,
    #[serde(default)]
    pub tables: BTreeMap<String, String>,
}

impl TableMapping {
    fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.datasets.is_empty() && self.tables.is_empty()
    }
}

fn default_source() -> String {
    "bigquery".to_string()
}

fn default_target() -> String {
    "databricks".to_string()
}

/// Compiled rules, ready to apply
#[derive(Debug, Clone)]
pub struct MappingRules {
    source: Dialect,
    target: Dialect,
    functions: Vec<(Regex, String)>,
    tables: TableMapping,
    table_pattern: Regex,
}

// String literals come first so a dotted path inside quotes is consumed
// whole and handed back untouched by `map_table`.
const TABLE_PATTERN: &str = concat!(
    r#"'(?:[^'\\]|\\.|'')*'|"(?:[^"\\]|\\.|"")*"|"#,
    r"`([\w\-]+)\.([\w\-]+)\.([\w\-]+)`|`?([\w\-]+)`?\.`?([\w\-]+)`?\.`?([\w\-]+)`?",
);

impl MappingRules {
    pub fn from_file(file: RulesFile) -> Result<Self> {
        let source = file
            .source
            .parse::<Dialect>()
            .context("rules file 'source'")?;
        let target = file
            .target
            .parse::<Dialect>()
            .context("rules file 'target'")?;

        let mut functions = Vec::with_capacity(file.functions.len());
        for (from, to) in file.functions {
            let pattern = Regex::new(&format!(r"(?i)\b{}\s*\(", regex::escape(&from)))
                .with_context(|| format!("invalid function name in rules: {}", from))?;
            functions.push((pattern, format!("{}(", to)));
        }

        Ok(Self {
            source,
            target,
            functions,
            tables: file.table_mapping,
            table_pattern: Regex::new(TABLE_PATTERN)?,
        })
    }

    /// Load rules from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        let file: RulesFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))?;
        let rules = Self::from_file(file)?;
        info!(
            "Loaded {} function rules for {} -> {} from {}",
            rules.functions.len(),
            rules.source,
            rules.target,
            path.display()
        );
        Ok(rules)
    }

    pub fn applies_to(&self, from: Dialect, to: Dialect) -> bool {
        self.source == from && self.target == to
    }

    pub fn apply(&self, sql: &str) -> String {
        let mut out = sql.to_string();

        for (pattern, replacement) in &self.functions {
            out = pattern.replace_all(&out, replacement.as_str()).into_owned();
        }

        if !self.tables.is_empty() {
            out = self
                .table_pattern
                .replace_all(&out, |caps: &Captures| self.map_table(caps))
                .into_owned();
        }

        if out != sql {
            debug!("Mapping rules rewrote statement");
        }
        out
    }

    fn map_table(&self, caps: &Captures) -> String {
        if caps.get(1).is_none() && caps.get(4).is_none() {
            return caps[0].to_string();
        }
        let part = |a: usize, b: usize| caps.get(a).or_else(|| caps.get(b)).map_or("", |m| m.as_str());
        let (project, dataset, table) = (part(1, 4), part(2, 5), part(3, 6));

        let catalog = self.tables.projects.get(project);
        let schema = self.tables.datasets.get(dataset);
        let name = self.tables.tables.get(table);

        if catalog.is_none() && schema.is_none() && name.is_none() {
            return caps[0].to_string();
        }

        format!(
            "{}.{}.{}",
            catalog.map_or(project, String::as_str),
            schema.map_or(dataset, String::as_str),
            name.map_or(table, String::as_str)
        )
    }
}
