//! The require stack used for circular-dependency detection.
//!
//! A stack lives for one top-level build. Entering a file returns a
//! [`StackFrame`] guard that pops the file again when dropped, so early
//! returns through `?` leave the stack balanced.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// Files currently being built, outermost first.
#[derive(Debug, Default)]
pub struct RequireStack {
    paths: Vec<PathBuf>,
}

impl RequireStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `path` is being built further up the stack.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// The files on the stack, outermost first.
    pub fn chain(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of files on the stack.
    pub fn depth(&self) -> usize {
        self.paths.len()
    }

    /// Builds the error reported when `path` closes a cycle.
    pub fn cycle_error(&self, path: &Path) -> AssetError {
        let mut chain = self.paths.clone();
        chain.push(path.to_path_buf());
        AssetError::CircularDependency {
            path: path.to_path_buf(),
            chain,
        }
    }

    /// Pushes `path`, failing with [`AssetError::CircularDependency`] if it
    /// is already on the stack.
    pub fn enter(&mut self, path: &Path) -> Result<StackFrame<'_>, AssetError> {
        if self.contains(path) {
            return Err(self.cycle_error(path));
        }
        self.paths.push(path.to_path_buf());
        Ok(StackFrame { stack: self })
    }
}

/// Guard for one entry on a [`RequireStack`]; pops it on drop.
#[derive(Debug)]
pub struct StackFrame<'a> {
    stack: &'a mut RequireStack,
}

impl Deref for StackFrame<'_> {
    type Target = RequireStack;

    fn deref(&self) -> &RequireStack {
        self.stack
    }
}

impl DerefMut for StackFrame<'_> {
    fn deref_mut(&mut self) -> &mut RequireStack {
        self.stack
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        self.stack.paths.pop();
    }
}
