//! Per-statement compilation state

use std::fmt;

/// Where the value of a positional parameter comes from at execution time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// `$name`, supplied by the caller
    External(String),
    /// `/task.path`, read from a finished root task
    RootResult { task: String, path: Vec<String> },
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::External(name) => write!(f, "${}", name),
            ParamSource::RootResult { task, path } => {
                write!(f, "/{}", task)?;
                for segment in path {
                    write!(f, ".{}", segment)?;
                }
                Ok(())
            }
        }
    }
}

/// Parameter list and row-alias counter of one statement
///
/// Passed by reference through the recursive render calls; nothing is shared
/// between statements.
#[derive(Debug, Default)]
pub struct CompileContext {
    params: Vec<ParamSource>,
    next_row_alias: usize,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for `source`: `$1`, `$2`, ... in first-use order, reused on repeat
    pub fn bind(&mut self, source: ParamSource) -> String {
        let index = match self.params.iter().position(|p| *p == source) {
            Some(index) => index,
            None => {
                self.params.push(source);
                self.params.len() - 1
            }
        };
        format!("${}", index + 1)
    }

    /// A fresh alias for a derived row set
    pub fn row_alias(&mut self) -> String {
        let alias = format!("_r{}", self.next_row_alias);
        self.next_row_alias += 1;
        alias
    }

    pub fn params(&self) -> &[ParamSource] {
        &self.params
    }

    pub fn into_params(self) -> Vec<ParamSource> {
        self.params
    }
}
