//! Guards for registry arguments
//!
//! Each guard returns a [`ValidationResult`] listing every problem it found;
//! results combine with [`ValidationResult::and`].

use url::Url;

use crate::{Error, PlayerOptions, Result};

/// Outcome of one or more guards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<String>),
}

impl ValidationResult {
    fn problem(message: impl Into<String>) -> Self {
        ValidationResult::Invalid(vec![message.into()])
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results, keeping every problem
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match (self, other) {
            (ValidationResult::Valid, other) => other,
            (invalid, ValidationResult::Valid) => invalid,
            (ValidationResult::Invalid(mut a), ValidationResult::Invalid(b)) => {
                a.extend(b);
                ValidationResult::Invalid(a)
            }
        }
    }

    /// `InvalidOptions` carrying every problem
    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(problems) => Err(Error::InvalidOptions(problems.join("; "))),
        }
    }
}

/// Options accepted by `create_player`
pub fn validate_options(options: &PlayerOptions, method: &str) -> ValidationResult {
    let mount = if options.dom_node.is_empty() {
        ValidationResult::problem(format!("\"domNode\" is required for method \"{}\"", method))
    } else {
        ValidationResult::Valid
    };

    let source = match (non_empty(&options.video_id), non_empty(&options.url)) {
        (None, None) => ValidationResult::problem(format!(
            "Either \"videoId\" or \"url\" are required for method \"{}\"",
            method
        )),
        (_, Some(url)) => validate_url(url, method),
        _ => ValidationResult::Valid,
    };

    mount.and(source)
}

/// A player id argument
pub fn validate_player_id(id: &str, method: &str) -> ValidationResult {
    if id.trim().is_empty() {
        ValidationResult::problem(format!("Method \"{}\" is expecting a player id", method))
    } else {
        ValidationResult::Valid
    }
}

/// A numeric argument (volume, seconds)
pub fn validate_number(value: f64, method: &str) -> ValidationResult {
    if value.is_finite() {
        ValidationResult::Valid
    } else {
        ValidationResult::problem(format!(
            "Invalid argument passed for method \"{}\": expecting a finite number, received {}",
            method, value
        ))
    }
}

fn validate_url(url: &str, method: &str) -> ValidationResult {
    match Url::parse(url) {
        Ok(_) => ValidationResult::Valid,
        Err(err) => ValidationResult::problem(format!(
            "Invalid \"url\" for method \"{}\": {}",
            method, err
        )),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
