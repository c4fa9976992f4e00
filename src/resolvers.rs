//! Resolver Templates
//!
//! Loads generated request mapping templates from an API's build output and
//! finds list queries that use a filter expression without guarding it.
//!
//! ## Unsafe list query
//! A `Query.list*.req.vtl` template is unsafe when it assigns
//! `$filterExpression` from the `$filter` argument and the next statement is
//! not the null/empty check of that expression:
//!
//! ```text
//! #set( $filterExpression = $util.parseJson($util.transform.toDynamoDBFilterExpression($filter)) )
//! #if( $util.isNullOrEmpty($filterExpression) )
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::config::ApiLayout;
use crate::error::Result;
use crate::schema::is_hidden;

/// Resolver file name to template text
pub type ResolverArtifactMap = HashMap<String, String>;

const LIST_QUERY_PREFIX: &str = "Query.list";
const REQUEST_TEMPLATE_SUFFIX: &str = ".req.vtl";

/// Load the generated resolvers of the API in `api_dir`
///
/// A missing build output directory yields an empty map. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn load_resolvers(api_dir: &Path, layout: &ApiLayout) -> Result<ResolverArtifactMap> {
    let mut resolvers = ResolverArtifactMap::new();

    let resolver_dir = api_dir.join(&layout.resolver_build_dir);
    if !resolver_dir.is_dir() {
        tracing::debug!(path = %resolver_dir.display(), "no generated resolvers");
        return Ok(resolvers);
    }

    for entry in fs::read_dir(&resolver_dir)? {
        let entry = entry?;
        if is_hidden(&entry.file_name()) || !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let bytes = fs::read(entry.path())?;
        resolvers.insert(name, String::from_utf8_lossy(&bytes).into_owned());
    }

    Ok(resolvers)
}

/// Finds list query templates missing the filter expression guard
pub struct UnsafeResolverDetector {
    /// Assignment of `$filterExpression` from the `$filter` argument
    assignment: Regex,
    /// Guard that must directly follow the assignment
    guard: Regex,
}

impl Default for UnsafeResolverDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UnsafeResolverDetector {
    pub fn new() -> Self {
        Self {
            assignment: Regex::new(
                r"#set\( \$filterExpression = \$util\.parseJson\(\$util\.transform\.toDynamoDBFilterExpression\(\$filter\)\) \)",
            )
            .unwrap(),
            guard: Regex::new(r"\A\s*#if\( \$util\.isNullOrEmpty\(\$filterExpression\) \)").unwrap(),
        }
    }

    /// Whether a resolver file is a list query request template
    pub fn is_list_query_template(name: &str) -> bool {
        name.starts_with(LIST_QUERY_PREFIX) && name.ends_with(REQUEST_TEMPLATE_SUFFIX)
    }

    /// Whether any filter expression assignment in `template` is unguarded
    pub fn is_unsafe(&self, template: &str) -> bool {
        self.assignment
            .find_iter(template)
            .any(|m| !self.guard.is_match(&template[m.end()..]))
    }

    /// Bodies of the unsafe list query templates in `resolvers`
    pub fn unsafe_templates<'a>(&self, resolvers: &'a ResolverArtifactMap) -> Vec<&'a str> {
        resolvers
            .iter()
            .filter(|(name, _)| Self::is_list_query_template(name))
            .map(|(_, template)| template.as_str())
            .filter(|template| self.is_unsafe(template))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ASSIGNMENT: &str = "#set( $filterExpression = $util.parseJson($util.transform.toDynamoDBFilterExpression($filter)) )";
    const GUARD: &str = "#if( $util.isNullOrEmpty($filterExpression) )";

    #[test]
    fn test_guarded_assignment_is_safe() {
        let detector = UnsafeResolverDetector::new();
        let template = format!("#if( $ctx.args.filter )\n  {ASSIGNMENT}\n  {GUARD}\n    $util.error(\"bad\")\n  #end\n#end");
        assert!(!detector.is_unsafe(&template));
    }

    #[test]
    fn test_unguarded_assignment_is_unsafe() {
        let detector = UnsafeResolverDetector::new();
        let template = format!("#if( $ctx.args.filter )\n  {ASSIGNMENT}\n  #set( $query.filter = $filterExpression )\n#end");
        assert!(detector.is_unsafe(&template));
        assert!(detector.is_unsafe(ASSIGNMENT));
    }

    #[test]
    fn test_one_unguarded_assignment_is_enough() {
        let detector = UnsafeResolverDetector::new();
        let template = format!("{ASSIGNMENT}\n{GUARD}\n#end\n{ASSIGNMENT}\n#set( $x = 1 )");
        assert!(detector.is_unsafe(&template));
    }

    #[test]
    fn test_templates_without_filter_are_safe() {
        let detector = UnsafeResolverDetector::new();
        assert!(!detector.is_unsafe("{ \"version\": \"2018-05-29\", \"operation\": \"Scan\" }"));
    }

    #[test]
    fn test_only_list_request_templates_are_checked() {
        let detector = UnsafeResolverDetector::new();
        let resolvers: ResolverArtifactMap = [
            ("Query.listPosts.req.vtl", ASSIGNMENT),
            ("Query.listPosts.res.vtl", ASSIGNMENT),
            ("Query.getPost.req.vtl", ASSIGNMENT),
            ("Query.searchPosts.req.vtl", ASSIGNMENT),
        ]
        .into_iter()
        .map(|(name, body)| (name.to_string(), body.to_string()))
        .collect();

        assert_eq!(detector.unsafe_templates(&resolvers), vec![ASSIGNMENT]);
    }

    #[test]
    fn test_load_missing_and_empty_build_output() {
        let dir = tempdir().unwrap();
        let layout = ApiLayout::default();
        assert!(load_resolvers(dir.path(), &layout).unwrap().is_empty());

        fs::create_dir_all(dir.path().join("build/resolvers")).unwrap();
        assert!(load_resolvers(dir.path(), &layout).unwrap().is_empty());
    }

    #[test]
    fn test_load_skips_hidden_files_and_directories() {
        let dir = tempdir().unwrap();
        let resolver_dir = dir.path().join("build/resolvers");
        fs::create_dir_all(resolver_dir.join("nested")).unwrap();
        fs::write(resolver_dir.join("Query.listPosts.req.vtl"), ASSIGNMENT).unwrap();
        fs::write(resolver_dir.join(".DS_Store"), "junk").unwrap();

        let resolvers = load_resolvers(dir.path(), &ApiLayout::default()).unwrap();
        assert_eq!(resolvers.len(), 1);
        assert_eq!(resolvers["Query.listPosts.req.vtl"], ASSIGNMENT);
    }

    #[test]
    fn test_load_tolerates_invalid_utf8() {
        let dir = tempdir().unwrap();
        let resolver_dir = dir.path().join("build/resolvers");
        fs::create_dir_all(&resolver_dir).unwrap();
        fs::write(resolver_dir.join("Mutation.upload.req.vtl"), [0xff, 0xfe, b'#']).unwrap();
        fs::write(resolver_dir.join("Query.listPosts.req.vtl"), ASSIGNMENT).unwrap();

        let resolvers = load_resolvers(dir.path(), &ApiLayout::default()).unwrap();
        assert_eq!(resolvers.len(), 2);
        assert!(resolvers["Mutation.upload.req.vtl"].ends_with('#'));

        let detector = UnsafeResolverDetector::new();
        assert_eq!(detector.unsafe_templates(&resolvers), vec![ASSIGNMENT]);
    }
}
