#![forbid(unsafe_code)]

//! Declarative field rules.
//!
//! A field declares an ordered, comma-separated rule list such as
//! `required,minLength:2`. Each token is a rule name with an optional
//! `:parameter`. Evaluation stops at the first failing rule.
//!
//! Rules other than `required` pass on an empty (whitespace-only) value, so
//! optional fields may be left blank.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use regex::Regex;

use super::FormError;

pub const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
pub const PHONE_PATTERN: &str = r"^[+]?[0-9\s\-()]{10,}$";

/// One parsed token of a rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,
    pub param: Option<String>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, param: Option<&str>) -> Self {
        Self {
            name: name.into(),
            param: param.map(str::to_string),
        }
    }
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{}:{}", self.name, param),
            None => f.write_str(&self.name),
        }
    }
}

/// Custom predicate: `(trimmed value, parameter) -> passes`.
pub type Predicate = Arc<dyn Fn(&str, Option<&str>) -> bool + Send + Sync>;

/// How a rule decides.
#[derive(Clone)]
pub enum RuleCheck {
    NonEmpty,
    Pattern(Regex),
    MinChars,
    MaxChars,
    Predicate(Predicate),
}

impl fmt::Debug for RuleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEmpty => f.write_str("NonEmpty"),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::MinChars => f.write_str("MinChars"),
            Self::MaxChars => f.write_str("MaxChars"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Failure message of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMessage {
    Static(String),
    /// `{n}` is replaced by the rule parameter.
    Template(String),
}

impl RuleMessage {
    pub fn render(&self, param: Option<&str>) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Template(text) => text.replace("{n}", param.unwrap_or_default()),
        }
    }
}

/// A named validation rule.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub name: String,
    pub check: RuleCheck,
    pub message: RuleMessage,
    /// The rule needs a numeric parameter (`minLength:2`).
    pub numeric_param: bool,
}

/// Result of validating one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid { rule: String, message: String },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { message, .. } => Some(message),
        }
    }
}

/// Rule registry: the built-ins plus any registered custom rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: AHashMap<String, ValidationRule>,
}

impl RuleSet {
    /// The built-in rules.
    pub fn builtin() -> Result<Self, FormError> {
        let mut set = Self {
            rules: AHashMap::new(),
        };
        set.insert(ValidationRule {
            name: "required".into(),
            check: RuleCheck::NonEmpty,
            message: RuleMessage::Static("This field is required".into()),
            numeric_param: false,
        });
        set.register_pattern(
            "email",
            EMAIL_PATTERN,
            RuleMessage::Static("Please enter a valid email address".into()),
        )?;
        set.register_pattern(
            "phone",
            PHONE_PATTERN,
            RuleMessage::Static("Please enter a valid phone number".into()),
        )?;
        set.insert(ValidationRule {
            name: "minLength".into(),
            check: RuleCheck::MinChars,
            message: RuleMessage::Template("Must be at least {n} characters".into()),
            numeric_param: true,
        });
        set.insert(ValidationRule {
            name: "maxLength".into(),
            check: RuleCheck::MaxChars,
            message: RuleMessage::Template("Must be no more than {n} characters".into()),
            numeric_param: true,
        });
        Ok(set)
    }

    /// Add or replace a rule.
    pub fn insert(&mut self, rule: ValidationRule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    /// Register a regex rule.
    pub fn register_pattern(
        &mut self,
        name: &str,
        pattern: &str,
        message: RuleMessage,
    ) -> Result<(), FormError> {
        let re = Regex::new(pattern).map_err(|e| FormError::Pattern {
            rule: name.to_string(),
            reason: e.to_string(),
        })?;
        self.insert(ValidationRule {
            name: name.to_string(),
            check: RuleCheck::Pattern(re),
            message,
            numeric_param: false,
        });
        Ok(())
    }

    /// Register a predicate rule.
    pub fn register_predicate<F>(&mut self, name: &str, message: RuleMessage, predicate: F)
    where
        F: Fn(&str, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.insert(ValidationRule {
            name: name.to_string(),
            check: RuleCheck::Predicate(Arc::new(predicate)),
            message,
            numeric_param: false,
        });
    }

    pub fn get(&self, name: &str) -> Option<&ValidationRule> {
        self.rules.get(name)
    }

    /// Parse a rule list, rejecting unknown rules and bad parameters.
    pub fn parse(&self, list: &str) -> Result<Vec<FieldRule>, FormError> {
        list.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                let (name, param) = match token.split_once(':') {
                    Some((name, param)) => (name.trim(), Some(param.trim())),
                    None => (token, None),
                };
                let rule = self
                    .get(name)
                    .ok_or_else(|| FormError::UnknownRule(name.to_string()))?;
                if rule.numeric_param && param.is_none_or(|p| p.parse::<usize>().is_err()) {
                    return Err(FormError::InvalidParameter {
                        rule: name.to_string(),
                        param: param.unwrap_or_default().to_string(),
                    });
                }
                Ok(FieldRule::new(name, param))
            })
            .collect()
    }

    /// Evaluate `rules` in order against `value`; the first failure wins.
    pub fn check(&self, rules: &[FieldRule], value: &str) -> ValidationOutcome {
        let value = value.trim();
        for field_rule in rules {
            let Some(rule) = self.get(&field_rule.name) else {
                continue;
            };
            let param = field_rule.param.as_deref();
            if !matches!(rule.check, RuleCheck::NonEmpty) && value.is_empty() {
                continue;
            }
            let limit = || param.and_then(|p| p.parse::<usize>().ok()).unwrap_or(0);
            let passes = match &rule.check {
                RuleCheck::NonEmpty => !value.is_empty(),
                RuleCheck::Pattern(re) => re.is_match(value),
                RuleCheck::MinChars => value.chars().count() >= limit(),
                RuleCheck::MaxChars => value.chars().count() <= limit(),
                RuleCheck::Predicate(f) => f(value, param),
            };
            if !passes {
                return ValidationOutcome::Invalid {
                    rule: rule.name.clone(),
                    message: rule.message.render(param),
                };
            }
        }
        ValidationOutcome::Valid
    }
}
