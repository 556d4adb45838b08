//! Control-flow transforms that wrap inner transform chains.

mod meta_err;
mod meta_for_each;
mod meta_retry;
mod meta_switch;

use regex::Regex;

pub use self::meta_err::{MetaErr, MetaErrSettings};
pub use self::meta_for_each::{MetaForEach, MetaForEachSettings};
pub use self::meta_retry::{MetaRetry, MetaRetrySettings};
pub use self::meta_switch::{Case, CaseSettings, MetaSwitch, MetaSwitchSettings};

use crate::error::{FlowError, Result};

fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p.as_ref()).map_err(FlowError::from))
        .collect()
}

fn matches_any(patterns: &[Regex], err: &FlowError) -> bool {
    let text = err.to_string();
    patterns.iter().any(|p| p.is_match(&text))
}

pub(crate) fn id_or(id: String, type_name: &str) -> String {
    if id.is_empty() {
        type_name.to_string()
    } else {
        id
    }
}
