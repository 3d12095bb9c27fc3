//! Capability interfaces for the pluggable stages of the pipeline.
//!
//! The engine never knows how a format is transformed. It only calls these
//! traits in a fixed order:
//!
//! 1. [`Engine`]s, chosen by the file's trailing extensions (rightmost first)
//! 2. the [`DirectiveProcessor`], which reports requires and dependencies
//! 3. [`BundleProcessor`]s, once over the concatenated bundle
//!
//! Every capability has a [`name`](Engine::name) that feeds the environment
//! digest, so replacing an implementation invalidates persisted bundles.

use std::path::Path;

use crate::error::ProcessingError;

/// Transforms the text of a single source file, e.g. compiling a template
/// language into the target format.
pub trait Engine: Send + Sync {
    /// Stable identifier of the engine and its behavior.
    fn name(&self) -> &str;

    /// Transforms `input`, the contents of `path` after any engines to its
    /// right have run.
    fn transform(&self, input: &str, path: &Path) -> Result<String, ProcessingError>;
}

/// Post-processes a concatenated bundle, e.g. minification.
pub trait BundleProcessor: Send + Sync {
    /// Stable identifier of the processor and its behavior.
    fn name(&self) -> &str;

    /// Transforms the concatenated `source` of the bundle for `logical_path`.
    fn process(&self, source: &str, logical_path: &str) -> Result<String, ProcessingError>;
}

/// One entry of a file's require list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A single file, by logical path or `./`-relative path.
    File(String),
    /// Every bundleable file below a directory that shares the requiring
    /// file's format extension, in path order. The index expands it, since
    /// only the index knows which extensions are formats.
    Tree(String),
}

impl Requirement {
    /// The reference as written in the directive.
    pub fn reference(&self) -> &str {
        match self {
            Self::File(r) | Self::Tree(r) => r,
        }
    }
}

/// The result of running a [`DirectiveProcessor`] over a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// The file's body with directive lines removed.
    pub body: String,
    /// What to splice into the bundle, in declaration order.
    pub requires: Vec<Requirement>,
    /// References that affect freshness but contribute no body text.
    pub depends_on: Vec<String>,
}

/// Extracts require and dependency declarations from a file.
pub trait DirectiveProcessor: Send + Sync {
    /// Stable identifier of the processor and its behavior.
    fn name(&self) -> &str;

    /// Processes the engine output `source` of the file at `path`.
    fn process(&self, source: &str, path: &Path) -> Result<Directives, ProcessingError>;
}

/// An [`Engine`] backed by a closure.
pub struct FnEngine<F> {
    name: String,
    f: F,
}

impl<F> FnEngine<F>
where
    F: Fn(&str, &Path) -> Result<String, ProcessingError> + Send + Sync,
{
    /// Wraps `f` as an engine called `name`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Engine for FnEngine<F>
where
    F: Fn(&str, &Path) -> Result<String, ProcessingError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, input: &str, path: &Path) -> Result<String, ProcessingError> {
        (self.f)(input, path)
    }
}

/// A [`BundleProcessor`] backed by a closure.
pub struct FnProcessor<F> {
    name: String,
    f: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&str, &str) -> Result<String, ProcessingError> + Send + Sync,
{
    /// Wraps `f` as a bundle processor called `name`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> BundleProcessor for FnProcessor<F>
where
    F: Fn(&str, &str) -> Result<String, ProcessingError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, source: &str, logical_path: &str) -> Result<String, ProcessingError> {
        (self.f)(source, logical_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_engine_delegates() {
        let engine = FnEngine::new("upper", |input: &str, _: &Path| Ok(input.to_uppercase()));
        assert_eq!(engine.name(), "upper");
        assert_eq!(engine.transform("abc", Path::new("a.up")).unwrap(), "ABC");
    }

    #[test]
    fn fn_processor_delegates() {
        let strip = FnProcessor::new("strip", |source: &str, _: &str| {
            Ok(source.replace(' ', ""))
        });
        assert_eq!(strip.process("a b c", "app.js").unwrap(), "abc");
    }

    #[test]
    fn fn_processor_propagates_errors() {
        let failing = FnProcessor::new("fail", |_: &str, logical: &str| {
            Err(ProcessingError::new(format!("cannot minify {logical}")))
        });
        let err = failing.process("x", "app.js").unwrap_err();
        assert_eq!(err.message, "cannot minify app.js");
    }
}
