//! Common utilities shared by the CLI and the test engine

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Substitute `{key}` placeholders in every element of an argument template
pub fn expand_template(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| expand_str(arg, vars))
        .collect()
}

/// Substitute `{key}` placeholders in a single string
pub fn expand_str(s: &str, vars: &[(&str, &str)]) -> String {
    let mut out = s.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}
