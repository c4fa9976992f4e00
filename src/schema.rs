//! Schema reading and parsing
//!
//! An API keeps its SDL either in a single `schema.graphql` file or spread
//! over `*.graphql` files under a `schema/` directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use apollo_compiler::ast::Document;
use walkdir::WalkDir;

use crate::config::ApiLayout;
use crate::error::{NoticeError, Result};

/// SDL of an API, with the location it was read from
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub path: PathBuf,
    pub sdl: String,
}

impl SchemaSource {
    /// Parse the SDL into a document
    pub fn parse(&self) -> Result<Document> {
        parse_schema(&self.sdl, &self.path)
    }
}

/// Read the SDL of the API in `api_dir`; `None` when it has no schema
pub fn read_schema(api_dir: &Path, layout: &ApiLayout) -> Result<Option<SchemaSource>> {
    let schema_file = api_dir.join(&layout.schema_file);
    if schema_file.is_file() {
        let sdl = fs::read_to_string(&schema_file)?;
        return Ok(Some(SchemaSource {
            path: schema_file,
            sdl,
        }));
    }

    let schema_dir = api_dir.join(&layout.schema_dir);
    if !schema_dir.is_dir() {
        return Ok(None);
    }

    let mut parts = Vec::new();
    for entry in WalkDir::new(&schema_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
    {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().map(|ext| ext == "graphql").unwrap_or(false)
        {
            parts.push(fs::read_to_string(entry.path())?);
        }
    }

    Ok(Some(SchemaSource {
        path: schema_dir,
        sdl: parts.join("\n"),
    }))
}

/// Parse SDL without validating it against directive definitions
///
/// Blank SDL yields an empty document.
pub fn parse_schema(sdl: &str, path: &Path) -> Result<Document> {
    if sdl.trim().is_empty() {
        return Ok(Document::new());
    }
    Document::parse(sdl, path).map_err(|with_errors| NoticeError::SchemaParse {
        path: path.to_path_buf(),
        message: with_errors.errors.to_string(),
    })
}

/// Names starting with a dot are hidden
pub(crate) fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_single_file_wins() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("schema.graphql"), "type A { id: ID! }").unwrap();
        fs::create_dir_all(dir.path().join("schema")).unwrap();
        fs::write(dir.path().join("schema/b.graphql"), "type B { id: ID! }").unwrap();

        let source = read_schema(dir.path(), &ApiLayout::default()).unwrap().unwrap();
        assert_eq!(source.sdl, "type A { id: ID! }");
    }

    #[test]
    fn test_directory_is_concatenated_in_name_order() {
        let dir = tempdir().unwrap();
        let schema_dir = dir.path().join("schema");
        fs::create_dir_all(schema_dir.join("nested")).unwrap();
        fs::write(schema_dir.join("b.graphql"), "type B { id: ID! }").unwrap();
        fs::write(schema_dir.join("a.graphql"), "type A { id: ID! }").unwrap();
        fs::write(schema_dir.join("nested/c.graphql"), "type C { id: ID! }").unwrap();
        fs::write(schema_dir.join(".hidden.graphql"), "type Hidden { id: ID! }").unwrap();
        fs::write(schema_dir.join("notes.md"), "not sdl").unwrap();

        let source = read_schema(dir.path(), &ApiLayout::default()).unwrap().unwrap();
        assert_eq!(
            source.sdl,
            "type A { id: ID! }\ntype B { id: ID! }\ntype C { id: ID! }"
        );
        assert_eq!(source.parse().unwrap().definitions.len(), 3);
    }

    #[test]
    fn test_missing_schema() {
        let dir = tempdir().unwrap();
        assert!(read_schema(dir.path(), &ApiLayout::default()).unwrap().is_none());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = parse_schema("type Broken {", Path::new("schema.graphql"));
        assert!(matches!(result, Err(NoticeError::SchemaParse { .. })));
    }

    #[test]
    fn test_blank_sdl_is_empty_document() {
        let doc = parse_schema("  \n", Path::new("schema")).unwrap();
        assert!(doc.definitions.is_empty());
    }

    #[test]
    fn test_unknown_directives_parse() {
        let doc = parse_schema(
            "type Post @model @auth(rules: [{ allow: owner }]) { id: ID! @primaryKey }",
            Path::new("schema.graphql"),
        )
        .unwrap();
        assert_eq!(doc.definitions.len(), 1);
    }
}
