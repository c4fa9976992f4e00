//! GraphQL Security Notices
//!
//! Decides, before a GraphQL API is deployed, whether a one-time security
//! migration notice must be shown. When the user accepts, the API schema is
//! touched so the build pipeline regenerates its resolvers.
//!
//! ## Features
//!
//! - **Directive Indexing**: per-type `@auth`, `@model` and `@primaryKey` lookup
//! - **Resolver Scanning**: detects list queries with unguarded filter expressions
//! - **One-Shot Flags**: notices are gated by project feature flags and cleared after use
//! - **Schema Touch**: semantically inert edit that invalidates build caches
//!
//! ## Project Layout
//!
//! ```text
//! amplify/
//! ├── .config/project-config.json
//! ├── cli.json                      # features.graphqltransformer.*
//! └── backend/
//!     ├── amplify-meta.json         # api / auth resources
//!     └── api/<name>/
//!         ├── schema.graphql        # or schema/**/*.graphql
//!         └── build/resolvers/      # Query.list*.req.vtl
//! ```

pub mod config;
pub mod directives;
pub mod error;
pub mod flags;
pub mod notices;
pub mod project;
pub mod prompt;
pub mod resolvers;
pub mod schema;
pub mod telemetry;
pub mod touch;

pub use config::NoticeConfig;
pub use directives::{
    collect_directives_by_type, directive_names_by_type, has_field_auth_directives,
    has_v2_auth_directives, DirectiveMap, FieldAuthTypeSet,
};
pub use error::{NoticeError, Result};
pub use flags::{set_notification_flag, FeatureFlags};
pub use notices::{NoticeOutcome, SecurityNotices};
pub use project::{ProjectMeta, ProjectStore};
pub use prompt::{Prompter, TerminalPrompter};
pub use resolvers::{load_resolvers, ResolverArtifactMap, UnsafeResolverDetector};
pub use schema::{parse_schema, read_schema, SchemaSource};
pub use telemetry::{Telemetry, TracingTelemetry};
pub use touch::{touch_schema, TouchOutcome};
