//! Security Notification Policies
//!
//! Three independent policies decide whether a one-time security notice must
//! be shown before a GraphQL API is deployed. When the user accepts, the
//! schema is touched so the build regenerates resolvers.
//!
//! | Policy | Gate | Trigger |
//! |--------|------|---------|
//! | field auth | `showfieldauthnotification` | v2, `@model(subscriptions: off)` type with non-null `@auth` field |
//! | list query | none | unguarded list query filter, v2, type-level `@auth` |
//! | primary key | `securityEnhancementNotification` | auth resource, type with `@auth` and `@primaryKey` |
//!
//! The flag-gated policies clear their flag after every run that reaches a
//! decision, so they fire at most once per project. A declined prompt leaves
//! the flag set and yields [`NoticeOutcome::Declined`]; the caller is expected
//! to stop the deployment.

use std::path::Path;

use apollo_compiler::ast::Document;

use crate::directives::{
    collect_directives_by_type, directive_names_by_type, has_field_auth_directives,
    has_v2_auth_directives, subscriptions_disabled, DirectiveMap, FieldAuthTypeSet, AUTH,
    PRIMARY_KEY,
};
use crate::error::Result;
use crate::flags::{
    set_notification_flag, FeatureFlags, SECURITY_ENHANCEMENT_NOTIFICATION,
    SHOW_FIELD_AUTH_NOTIFICATION,
};
use crate::project::ProjectStore;
use crate::prompt::Prompter;
use crate::resolvers::{load_resolvers, UnsafeResolverDetector};
use crate::schema::read_schema;
use crate::telemetry::Telemetry;
use crate::touch::{touch_schema, TouchOutcome};

pub const FIELD_AUTH_QUESTION: &str = "This version introduces additional security enhancements for your GraphQL API. \
The changes are applied automatically with this deployment. This change won't impact your client code. Continue?";

pub const LIST_QUERY_QUESTION: &str = "This version introduces additional security enhancements for list queries \
with filters on your GraphQL API. The changes are applied automatically with this deployment. \
This change won't impact your client code. Continue?";

pub const PRIMARY_KEY_QUESTION: &str = "This version introduces additional security enhancements for your GraphQL API. \
@auth authorization rules applied on primary keys and indexes are scoped down further. \
The changes are applied automatically with this deployment. This change won't impact your client code. Continue?";

/// Result of running a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeOutcome {
    /// Nothing was shown or nothing changed
    Unchanged,
    /// The user accepted and the schema was touched
    SchemaModified,
    /// The user declined; the deployment must not proceed
    Declined,
}

impl NoticeOutcome {
    pub fn schema_modified(self) -> bool {
        self == NoticeOutcome::SchemaModified
    }

    pub fn is_declined(self) -> bool {
        self == NoticeOutcome::Declined
    }
}

/// Whether the field auth notice applies
///
/// Requires transformer v2 and a type that both disables subscriptions on
/// its `@model` and has a non-null field with `@auth`.
pub fn field_auth_notice_required(
    directive_map: &DirectiveMap,
    field_auth_types: &FieldAuthTypeSet,
    uses_transformer_v2: bool,
) -> bool {
    uses_transformer_v2
        && directive_map.iter().any(|(type_name, directives)| {
            subscriptions_disabled(directives) && field_auth_types.contains(type_name)
        })
}

/// Runs the notification policies for one project
pub struct SecurityNotices<P, T> {
    project: ProjectStore,
    flags: FeatureFlags,
    prompter: P,
    telemetry: T,
    detector: UnsafeResolverDetector,
}

impl<P: Prompter, T: Telemetry> SecurityNotices<P, T> {
    pub fn new(project: ProjectStore, flags: FeatureFlags, prompter: P, telemetry: T) -> Self {
        Self {
            project,
            flags,
            prompter,
            telemetry,
            detector: UnsafeResolverDetector::new(),
        }
    }

    pub fn project(&self) -> &ProjectStore {
        &self.project
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    /// Run all policies in deployment order, stopping at the first decline
    pub fn notify_all(&mut self) -> Result<NoticeOutcome> {
        let steps: [fn(&mut Self) -> Result<NoticeOutcome>; 3] = [
            Self::notify_field_auth_security_change,
            Self::notify_list_query_security_change,
            Self::notify_security_enhancement,
        ];

        let mut outcome = NoticeOutcome::Unchanged;
        for step in steps {
            match step(self)? {
                NoticeOutcome::Declined => return Ok(NoticeOutcome::Declined),
                NoticeOutcome::SchemaModified => outcome = NoticeOutcome::SchemaModified,
                NoticeOutcome::Unchanged => {}
            }
        }

        Ok(outcome)
    }

    /// Field auth policy, gated by `showfieldauthnotification`
    pub fn notify_field_auth_security_change(&mut self) -> Result<NoticeOutcome> {
        if !self.flag_enabled(SHOW_FIELD_AUTH_NOTIFICATION) {
            return Ok(NoticeOutcome::Unchanged);
        }

        let Some(api_dir) = self.project.api_resource_dir()? else {
            self.clear_flag(SHOW_FIELD_AUTH_NOTIFICATION)?;
            return Ok(NoticeOutcome::Unchanged);
        };

        let doc = self.read_document(&api_dir)?;
        let directive_map = collect_directives_by_type(&doc);
        let field_auth_types = has_field_auth_directives(&doc);

        let mut outcome = NoticeOutcome::Unchanged;
        if field_auth_notice_required(
            &directive_map,
            &field_auth_types,
            self.flags.uses_transformer_v2(),
        ) {
            outcome = self.confirm_and_touch(FIELD_AUTH_QUESTION, &api_dir)?;
            if outcome.is_declined() {
                return Ok(outcome);
            }
        } else {
            tracing::debug!("field auth notice not required");
        }

        self.clear_flag(SHOW_FIELD_AUTH_NOTIFICATION)?;
        Ok(outcome)
    }

    /// List query policy
    ///
    /// Has no persisted flag: it keeps firing while generated list queries
    /// lack the filter guard.
    pub fn notify_list_query_security_change(&mut self) -> Result<NoticeOutcome> {
        let Some(api_dir) = self.project.api_resource_dir()? else {
            return Ok(NoticeOutcome::Unchanged);
        };

        let resolvers = load_resolvers(&api_dir, self.project.api_layout())?;
        let unsafe_count = self.detector.unsafe_templates(&resolvers).len();
        if unsafe_count == 0 {
            tracing::debug!(resolvers = resolvers.len(), "no unsafe list queries");
            return Ok(NoticeOutcome::Unchanged);
        }
        tracing::debug!(unsafe_count, "unsafe list queries found");

        let doc = self.read_document(&api_dir)?;
        if !has_v2_auth_directives(&doc, self.flags.uses_transformer_v2()) {
            return Ok(NoticeOutcome::Unchanged);
        }

        self.confirm_and_touch(LIST_QUERY_QUESTION, &api_dir)
    }

    /// Primary key policy, gated by `securityEnhancementNotification`
    pub fn notify_security_enhancement(&mut self) -> Result<NoticeOutcome> {
        if !self.flag_enabled(SECURITY_ENHANCEMENT_NOTIFICATION) {
            return Ok(NoticeOutcome::Unchanged);
        }

        let meta = self.project.read_meta()?;
        let api_dir = {
            let layout = self.project.api_layout();
            match meta.api_names_for_service(&layout.service).as_slice() {
                [name] => Some(self.project.resource_dir(&layout.category, name)),
                names => {
                    tracing::debug!(count = names.len(), "primary key notice needs exactly one API");
                    None
                }
            }
        };

        let Some(api_dir) = api_dir.filter(|dir| dir.is_dir()) else {
            self.clear_flag(SECURITY_ENHANCEMENT_NOTIFICATION)?;
            return Ok(NoticeOutcome::Unchanged);
        };

        let doc = self.read_document(&api_dir)?;
        let auth_on_primary_key = directive_names_by_type(&doc)
            .values()
            .any(|names| names.contains(AUTH) && names.contains(PRIMARY_KEY));

        let mut outcome = NoticeOutcome::Unchanged;
        if meta.has_auth() && auth_on_primary_key {
            outcome = self.confirm_and_touch(PRIMARY_KEY_QUESTION, &api_dir)?;
            if outcome.is_declined() {
                return Ok(outcome);
            }
        }

        self.clear_flag(SECURITY_ENHANCEMENT_NOTIFICATION)?;
        Ok(outcome)
    }

    fn flag_enabled(&mut self, flag_name: &str) -> bool {
        let area = self.flags.area().to_string();
        self.flags.ensure_feature_flag(&area, flag_name);
        self.flags.get_boolean(&format!("{area}.{flag_name}"))
    }

    fn clear_flag(&mut self, flag_name: &str) -> Result<()> {
        set_notification_flag(&self.project, &mut self.flags, flag_name, false)
    }

    fn read_document(&self, api_dir: &Path) -> Result<Document> {
        match read_schema(api_dir, self.project.api_layout())? {
            Some(source) => source.parse(),
            None => {
                tracing::warn!(path = %api_dir.display(), "GraphQL API has no schema");
                Ok(Document::new())
            }
        }
    }

    fn confirm_and_touch(&mut self, question: &str, api_dir: &Path) -> Result<NoticeOutcome> {
        if !self.prompter.confirm(question)? {
            self.telemetry.emit_success()?;
            tracing::info!("security notice declined");
            return Ok(NoticeOutcome::Declined);
        }

        match touch_schema(api_dir, self.project.api_layout())? {
            TouchOutcome::Touched(_) => Ok(NoticeOutcome::SchemaModified),
            TouchOutcome::NoSchema => {
                tracing::warn!(path = %api_dir.display(), "accepted notice but no schema to touch");
                Ok(NoticeOutcome::Unchanged)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn indexes(sdl: &str) -> (DirectiveMap, FieldAuthTypeSet) {
        let doc = Document::parse(sdl, Path::new("schema.graphql")).unwrap();
        (collect_directives_by_type(&doc), has_field_auth_directives(&doc))
    }

    #[test]
    fn test_field_auth_trigger() {
        let (map, types) = indexes(
            r#"
            type Post @model(subscriptions: null) {
              id: ID!
              owner: String! @auth(rules: [{ allow: owner, operations: [read] }])
            }
            "#,
        );
        assert!(field_auth_notice_required(&map, &types, true));
        assert!(!field_auth_notice_required(&map, &types, false));
    }

    #[test]
    fn test_field_auth_needs_same_type() {
        let (map, types) = indexes(
            r#"
            type Post @model(subscriptions: { level: off }) { id: ID! }
            type Secret @model { id: ID! value: String! @auth(rules: [{ allow: owner }]) }
            "#,
        );
        assert!(!field_auth_notice_required(&map, &types, true));
    }

    #[test]
    fn test_field_auth_subscriptions_on() {
        let (map, types) = indexes(
            r#"
            type Post @model(subscriptions: { level: public }) {
              id: ID!
              owner: String! @auth(rules: [{ allow: owner }])
            }
            "#,
        );
        assert!(!field_auth_notice_required(&map, &types, true));
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(NoticeOutcome::SchemaModified.schema_modified());
        assert!(!NoticeOutcome::Unchanged.schema_modified());
        assert!(NoticeOutcome::Declined.is_declined());
    }
}
