use crate::rules::{MissingOverride, RangeLoopReference, RuleId, RuleSet, VirtualDestructor};
use crate::ts::IncludeOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Contents of a `.cpp-refactor.toml` file.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RefactorConfig {
    /// Rule id to enabled flag; rules not listed are enabled
    #[serde(default)]
    pub rules: BTreeMap<String, bool>,
    #[serde(default, rename = "override")]
    pub override_rule: OverrideOptions,
    #[serde(default)]
    pub includes: IncludeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct OverrideOptions {
    /// Treat a lone `final` as explicit override intent
    #[serde(default = "default_true")]
    pub final_counts_as_override: bool,
}

impl Default for OverrideOptions {
    fn default() -> Self {
        Self {
            final_counts_as_override: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct IncludeConfig {
    #[serde(default = "default_true")]
    pub follow: bool,
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub system_paths: Vec<PathBuf>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            follow: true,
            search_paths: Vec::new(),
            system_paths: Vec::new(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Refuse to write a rewrite that adds syntax errors
    #[serde(default = "default_true")]
    pub verify_syntax: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            verify_syntax: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    IncludeOptions::default().max_depth
}

/// Rule names are compared against this threshold for suggestions.
const SUGGESTION_SIMILARITY: f64 = 0.7;

impl RefactorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for name in self.rules.keys() {
            if name.parse::<RuleId>().is_err() {
                issues.push(ValidationIssue::UnknownRule {
                    name: name.clone(),
                    suggestion: suggest_rule(name),
                });
            }
        }

        if self.includes.max_depth == 0 && self.includes.follow {
            issues.push(ValidationIssue::InvalidValue {
                field: "includes.max-depth",
                message: "must be at least 1 when includes.follow is true".to_string(),
            });
        }

        for path in self
            .includes
            .search_paths
            .iter()
            .chain(&self.includes.system_paths)
        {
            if path.as_os_str().is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    field: "includes",
                    message: "include paths must not be empty".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        self.rules.get(rule.as_str()).copied().unwrap_or(true)
    }

    /// Enabled rules, in their canonical order.
    pub fn rule_set(&self) -> RuleSet {
        let mut set = RuleSet::empty();
        for id in RuleId::ALL {
            if !self.is_enabled(id) {
                continue;
            }
            set = match id {
                RuleId::VirtualDestructor => set.with(VirtualDestructor),
                RuleId::MissingOverride => set.with(MissingOverride {
                    final_is_override: self.override_rule.final_counts_as_override,
                }),
                RuleId::RangeLoopReference => set.with(RangeLoopReference),
            };
        }
        set
    }

    pub fn include_options(&self) -> IncludeOptions {
        IncludeOptions {
            follow: self.includes.follow,
            search_paths: self.includes.search_paths.clone(),
            system_paths: self.includes.system_paths.clone(),
            max_depth: self.includes.max_depth,
        }
    }

    /// Enable only `rules`, disabling the rest.
    pub fn restrict_to(&mut self, rules: &[RuleId]) {
        for id in RuleId::ALL {
            self.rules.insert(id.as_str().to_string(), rules.contains(&id));
        }
    }
}

fn suggest_rule(name: &str) -> Option<String> {
    RuleId::ALL
        .into_iter()
        .map(|id| (id, strsim::jaro_winkler(name, id.as_str())))
        .filter(|(_, score)| *score >= SUGGESTION_SIMILARITY)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    UnknownRule {
        name: String,
        suggestion: Option<String>,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnknownRule { name, suggestion } => match suggestion {
                Some(s) => write!(f, "unknown rule '{name}' (did you mean '{s}'?)"),
                None => write!(f, "unknown rule '{name}'"),
            },
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
        }
    }
}
