use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::cleaning::normalize::{parse_number, round_to, title_case};
use crate::models::record::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Number,
}

/// A per-field constraint. Built once; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field_name: String,
    /// Must match the whole string form of the value.
    pub pattern: Option<Regex>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub required: bool,
    /// Checked case-sensitively after title-casing.
    pub allowed_values: Option<BTreeSet<String>>,
    pub value_type: ValueType,
}

impl FieldRule {
    fn text(field_name: &str) -> Self {
        Self {
            field_name: field_name.to_string(),
            pattern: None,
            min: None,
            max: None,
            required: false,
            allowed_values: None,
            value_type: ValueType::Text,
        }
    }

    fn number(field_name: &str) -> Self {
        Self {
            value_type: ValueType::Number,
            ..Self::text(field_name)
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn pattern(mut self, pattern: &str) -> Self {
        let anchored = format!("^(?:{pattern})$");
        self.pattern = Some(Regex::new(&anchored).expect("field rule pattern compiles"));
        self
    }

    fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationVerdict {
    pub valid: bool,
    /// The value to store when valid. `None` for an absent optional field.
    pub normalized: Option<FieldValue>,
}

impl ValidationVerdict {
    fn valid(normalized: Option<FieldValue>) -> Self {
        Self {
            valid: true,
            normalized,
        }
    }

    fn invalid() -> Self {
        Self {
            valid: false,
            normalized: None,
        }
    }
}

pub const ALLOWED_PROGRAMS: &[&str] = &[
    "Computer Science",
    "Data Science",
    "Business Administration",
    "Engineering",
    "Mathematics",
    "Statistics",
    "Information Systems",
];

/// Identity rules applied to every student record, keyed by field name.
pub static STUDENT_RULES: Lazy<BTreeMap<String, FieldRule>> = Lazy::new(|| {
    [
        FieldRule::text("student_id").required().pattern(r"STU\d{3}"),
        FieldRule::text("email")
            .required()
            .pattern(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
        FieldRule::number("gpa").required().range(0.0, 4.0),
        FieldRule::text("academic_program")
            .required()
            .allowed(ALLOWED_PROGRAMS),
    ]
    .into_iter()
    .map(|rule| (rule.field_name.clone(), rule))
    .collect()
});

/// Evaluates one value against one rule. Pure.
pub fn validate(field_name: &str, raw_value: &FieldValue, rule: &FieldRule) -> ValidationVerdict {
    if raw_value.is_blank() {
        if rule.required {
            debug!(field = field_name, "required field missing");
            return ValidationVerdict::invalid();
        }
        return ValidationVerdict::valid(None);
    }

    let normalized = match rule.value_type {
        ValueType::Number => {
            let number = match raw_value {
                FieldValue::Number(n) => Some(*n),
                FieldValue::Text(s) => parse_number(s),
                _ => None,
            };
            let Some(number) = number else {
                debug!(field = field_name, "value is not numeric");
                return ValidationVerdict::invalid();
            };
            if rule.min.is_some_and(|min| number < min) || rule.max.is_some_and(|max| number > max)
            {
                debug!(field = field_name, value = number, "value out of range");
                return ValidationVerdict::invalid();
            }
            FieldValue::Number(number)
        }
        ValueType::Text => {
            let text = raw_value.to_plain_string();
            if rule.allowed_values.is_some() {
                FieldValue::Text(title_case(&text))
            } else {
                FieldValue::Text(text)
            }
        }
    };

    let as_string = normalized.to_plain_string();
    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(&as_string) {
            debug!(field = field_name, "value does not match pattern");
            return ValidationVerdict::invalid();
        }
    }
    if let Some(allowed) = &rule.allowed_values {
        if !allowed.contains(&as_string) {
            debug!(field = field_name, value = %as_string, "value not in allowed set");
            return ValidationVerdict::invalid();
        }
    }

    ValidationVerdict::valid(Some(normalized))
}

/// Replaces `field` on a record map with its validated form, or the missing
/// marker. Absent fields are left absent.
pub fn apply_rule(fields: &mut BTreeMap<String, FieldValue>, rule: &FieldRule) {
    let Some(current) = fields.get(&rule.field_name) else {
        return;
    };
    let verdict = validate(&rule.field_name, current, rule);
    let replacement = if verdict.valid {
        verdict.normalized.unwrap_or(FieldValue::Missing)
    } else {
        FieldValue::Missing
    };
    fields.insert(rule.field_name.clone(), replacement);
}

/// GPA inside [0, 4] rounded to two decimals, otherwise the missing marker.
pub fn clean_gpa(raw: &FieldValue) -> FieldValue {
    let verdict = validate("gpa", raw, &STUDENT_RULES["gpa"]);
    match verdict.normalized {
        Some(FieldValue::Number(gpa)) if verdict.valid => FieldValue::Number(round_to(gpa, 2)),
        _ => FieldValue::Missing,
    }
}
