//! Schema Touch
//!
//! Marks an API schema as changed by appending a single space, so that the
//! next build regenerates its resolvers. The SDL keeps its meaning.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ApiLayout;
use crate::error::Result;
use crate::schema::is_hidden;

/// What a schema touch changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouchOutcome {
    /// One byte was appended to this file
    Touched(PathBuf),
    /// Neither a schema file nor a schema file tree exists
    NoSchema,
}

impl TouchOutcome {
    pub fn touched_path(&self) -> Option<&Path> {
        match self {
            TouchOutcome::Touched(path) => Some(path),
            TouchOutcome::NoSchema => None,
        }
    }
}

/// Touch the schema of the API in `api_dir`
///
/// The single schema file is preferred. Otherwise the schema directory is
/// walked depth-first in file-name order, skipping hidden entries, and only
/// the first regular file found is touched. The append is flushed to disk
/// before returning.
pub fn touch_schema(api_dir: &Path, layout: &ApiLayout) -> Result<TouchOutcome> {
    let schema_file = api_dir.join(&layout.schema_file);
    if schema_file.is_file() {
        append_space(&schema_file)?;
        return Ok(TouchOutcome::Touched(schema_file));
    }

    let schema_dir = api_dir.join(&layout.schema_dir);
    if !schema_dir.is_dir() {
        tracing::debug!(path = %api_dir.display(), "no schema to touch");
        return Ok(TouchOutcome::NoSchema);
    }

    match first_schema_file(&schema_dir)? {
        Some(path) => {
            append_space(&path)?;
            Ok(TouchOutcome::Touched(path))
        }
        None => Ok(TouchOutcome::NoSchema),
    }
}

/// First regular file of a depth-first, name-ordered walk
fn first_schema_file(schema_dir: &Path) -> Result<Option<PathBuf>> {
    let walker = WalkDir::new(schema_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

fn append_space(path: &Path) -> Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(b" ")?;
    file.sync_all()?;
    tracing::info!(path = %path.display(), "schema touched");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_touch_single_file() {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("schema.graphql");
        fs::write(&schema, "type A { id: ID! }").unwrap();

        let outcome = touch_schema(dir.path(), &ApiLayout::default()).unwrap();
        assert_eq!(outcome, TouchOutcome::Touched(schema.clone()));
        assert_eq!(fs::read_to_string(&schema).unwrap(), "type A { id: ID! } ");
    }

    #[test]
    fn test_touch_first_file_only() {
        let dir = tempdir().unwrap();
        let schema_dir = dir.path().join("schema");
        fs::create_dir_all(schema_dir.join("a_models")).unwrap();
        fs::write(schema_dir.join("a_models/post.graphql"), "type Post { id: ID! }").unwrap();
        fs::write(schema_dir.join("b.graphql"), "type B { id: ID! }").unwrap();

        let outcome = touch_schema(dir.path(), &ApiLayout::default()).unwrap();
        assert_eq!(outcome.touched_path(), Some(schema_dir.join("a_models/post.graphql").as_path()));
        assert_eq!(fs::read_to_string(schema_dir.join("b.graphql")).unwrap(), "type B { id: ID! }");
    }

    #[test]
    fn test_empty_directories_are_skipped() {
        let dir = tempdir().unwrap();
        let schema_dir = dir.path().join("schema");
        fs::create_dir_all(schema_dir.join("a_empty")).unwrap();
        fs::write(schema_dir.join("z.graphql"), "type Z { id: ID! }").unwrap();

        let outcome = touch_schema(dir.path(), &ApiLayout::default()).unwrap();
        assert_eq!(outcome.touched_path(), Some(schema_dir.join("z.graphql").as_path()));
    }

    #[test]
    fn test_no_schema_is_noop() {
        let dir = tempdir().unwrap();
        assert_eq!(
            touch_schema(dir.path(), &ApiLayout::default()).unwrap(),
            TouchOutcome::NoSchema
        );

        fs::create_dir_all(dir.path().join("schema/.hidden")).unwrap();
        fs::write(dir.path().join("schema/.hidden/x.graphql"), "type X { id: ID! }").unwrap();
        assert_eq!(
            touch_schema(dir.path(), &ApiLayout::default()).unwrap(),
            TouchOutcome::NoSchema
        );
    }
}
