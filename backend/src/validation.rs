//! Field validation for profile data and social links.
//!
//! The same checks run in the client modules before a request is sent and in
//! the request handlers before anything is written. Every check collects all
//! violations instead of stopping at the first one.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidateUrl, ValidationErrors};

use crate::db::models::{Platform, SocialLink};

// ============================================================================
// Violations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Every field-level violation found in one candidate value, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation::new(field, code, message)],
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    pub fn codes_for(&self, field: &str) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.field == field)
            .map(|v| v.code.as_str())
            .collect()
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    fn append(&mut self, other: ValidationReport) {
        self.violations.extend(other.violations);
    }

    fn extend_prefixed(&mut self, prefix: &str, other: ValidationReport) {
        for mut v in other.violations {
            v.field = if v.field.is_empty() {
                prefix.to_string()
            } else {
                format!("{}.{}", prefix, v.field)
            };
            self.violations.push(v);
        }
    }

    fn sorted(mut self) -> Self {
        self.violations
            .sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        self
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationReport> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self.sorted())
        }
    }
}

impl From<ValidationErrors> for ValidationReport {
    fn from(errors: ValidationErrors) -> Self {
        let mut report = ValidationReport::default();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", camel_case(&field)));
                report.push(Violation::new(
                    camel_case(&field),
                    err.code.to_string(),
                    message,
                ));
            }
        }
        report.sorted()
    }
}

/// Struct field names are reported the way they appear on the wire.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

// ============================================================================
// Schemas
// ============================================================================

/// Complete profile as entered in the edit form. All three fields are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFormData {
    #[validate(length(min = 1, max = 50, code = "length", message = "display name must be 1-50 characters"))]
    pub display_name: String,

    #[validate(length(max = 1000, code = "length", message = "bio must be at most 1000 characters"))]
    pub bio: String,

    #[validate(email(code = "email", message = "contact email must be a valid email address"))]
    pub contact_email: String,
}

/// Partial profile update. Absent fields are left untouched by the merge-write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50, code = "length", message = "display name must be 1-50 characters"))]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000, code = "length", message = "bio must be at most 1000 characters"))]
    pub bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(code = "email", message = "contact email must be a valid email address"))]
    pub contact_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url(code = "url", message = "profile image URL must be a valid URL"))]
    pub profile_image_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.contact_email.is_none()
            && self.profile_image_url.is_none()
    }
}

impl From<ProfileFormData> for ProfileUpdate {
    fn from(form: ProfileFormData) -> Self {
        Self {
            display_name: Some(form.display_name),
            bio: Some(form.bio),
            contact_email: Some(form.contact_email),
            profile_image_url: None,
        }
    }
}

/// A social link as submitted by a client. The platform stays a plain string
/// so an unknown platform is reported alongside the other violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SocialLinkInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[validate(custom(function = "validate_platform"))]
    pub platform: String,

    #[validate(url(code = "url", message = "enter a valid URL"))]
    pub url: String,
}

impl From<SocialLink> for SocialLinkInput {
    fn from(link: SocialLink) -> Self {
        Self {
            id: Some(link.id),
            platform: link.platform.as_str().to_string(),
            url: link.url,
        }
    }
}

/// Email and password entered in the sign-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(code = "email", message = "enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, code = "required", message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpData {
    #[validate(email(code = "email", message = "enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, code = "length", message = "password must be at least 6 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", code = "must_match", message = "passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PasswordReset {
    #[validate(email(code = "email", message = "enter a valid email address"))]
    pub email: String,
}

fn validate_platform(platform: &str) -> Result<(), validator::ValidationError> {
    if platform.parse::<Platform>().is_ok() {
        return Ok(());
    }
    let mut err = validator::ValidationError::new("platform");
    err.message = Some(
        format!(
            "platform must be one of: {}",
            Platform::ALL
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
        .into(),
    );
    Err(err)
}

// ============================================================================
// Checks
// ============================================================================

pub fn validate_profile_form(form: &ProfileFormData) -> Result<(), ValidationReport> {
    form.validate().map_err(ValidationReport::from)
}

pub fn validate_profile_update(update: ProfileUpdate) -> Result<ProfileUpdate, ValidationReport> {
    match update.validate() {
        Ok(()) => Ok(update),
        Err(errors) => Err(errors.into()),
    }
}

/// Validate one link and turn it into its stored form, assigning an id when
/// the client did not send one.
pub fn validate_social_link(input: SocialLinkInput) -> Result<SocialLink, ValidationReport> {
    let mut report = match input.validate() {
        Ok(()) => ValidationReport::default(),
        Err(errors) => errors.into(),
    };

    // The platform pattern is only meaningful for a well-formed URL on a known platform.
    let platform = input.platform.parse::<Platform>().ok();
    if let Some(platform) = platform {
        if report.is_empty() && !platform.matches(&input.url) {
            report.push(Violation::new(
                "url",
                "platform_mismatch",
                format!("URL does not match the {} profile format", platform.as_str()),
            ));
        }
    }

    match platform {
        Some(platform) if report.is_empty() => Ok(SocialLink {
            id: input
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            platform,
            url: input.url,
        }),
        _ => Err(report.sorted()),
    }
}

/// Validate a whole link list. Either every element passes or the violations
/// of every failing element are returned, keyed by index.
pub fn validate_social_links(
    inputs: Vec<SocialLinkInput>,
) -> Result<Vec<SocialLink>, ValidationReport> {
    let mut report = ValidationReport::default();
    let mut links = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        match validate_social_link(input) {
            Ok(link) => links.push(link),
            Err(element) => report.extend_prefixed(&format!("[{}]", index), element),
        }
    }

    report.into_result(links)
}

// ============================================================================
// Request bodies
// ============================================================================
//
// Bodies are decoded field by field from a JSON value so that wrong types and
// missing fields are reported per field alongside the schema violations.

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A string member of `object`. `null` is a wrong type, not an absent field.
fn string_member(
    object: &Map<String, Value>,
    key: &str,
    required: bool,
    report: &mut ValidationReport,
) -> Option<String> {
    match object.get(key) {
        Some(Value::String(value)) => Some(value.clone()),
        Some(other) => {
            report.push(Violation::new(
                key,
                "type",
                format!("{} must be a string, got {}", key, json_type(other)),
            ));
            None
        }
        None if required => {
            report.push(Violation::new(key, "required", format!("{} is required", key)));
            None
        }
        None => None,
    }
}

/// Decode and validate a `PUT /api/profile/update` body.
pub fn parse_profile_update(body: &Value) -> Result<ProfileUpdate, ValidationReport> {
    let Some(object) = body.as_object() else {
        return Err(ValidationReport::single(
            "body",
            "type",
            format!("request body must be a JSON object, got {}", json_type(body)),
        ));
    };

    let mut report = ValidationReport::default();
    let update = ProfileUpdate {
        display_name: string_member(object, "displayName", false, &mut report),
        bio: string_member(object, "bio", false, &mut report),
        contact_email: string_member(object, "contactEmail", false, &mut report),
        profile_image_url: string_member(object, "profileImageUrl", false, &mut report),
    };

    match validate_profile_update(update) {
        Ok(update) => report.into_result(update),
        Err(schema) => {
            report.append(schema);
            Err(report.sorted())
        }
    }
}

fn parse_social_link(item: &Value) -> Result<SocialLink, ValidationReport> {
    let Some(object) = item.as_object() else {
        return Err(ValidationReport::single(
            "",
            "type",
            format!("social link must be a JSON object, got {}", json_type(item)),
        ));
    };

    let mut report = ValidationReport::default();
    let id = string_member(object, "id", false, &mut report);
    let platform = string_member(object, "platform", true, &mut report);
    let url = string_member(object, "url", true, &mut report);

    match (platform, url) {
        (Some(platform), Some(url)) => {
            match validate_social_link(SocialLinkInput { id, platform, url }) {
                Ok(link) if report.is_empty() => return Ok(link),
                Ok(_) => {}
                Err(element) => report.append(element),
            }
        }
        // Check whichever of the two decoded cleanly
        (Some(platform), None) => {
            if let Err(err) = validate_platform(&platform) {
                let message = err
                    .message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "unknown platform".to_string());
                report.push(Violation::new("platform", err.code.to_string(), message));
            }
        }
        (None, Some(url)) => {
            if !url.validate_url() {
                report.push(Violation::new("url", "url", "enter a valid URL"));
            }
        }
        (None, None) => {}
    }

    Err(report.sorted())
}

/// Decode and validate a `PUT /api/profile/social-links` body. Violations are
/// keyed by element index; a non-object element is reported as `[i]`.
pub fn parse_social_links(body: &Value) -> Result<Vec<SocialLink>, ValidationReport> {
    let Some(items) = body.as_array() else {
        return Err(ValidationReport::single(
            "body",
            "type",
            format!(
                "request body must be a JSON array of social links, got {}",
                json_type(body)
            ),
        ));
    };

    let mut report = ValidationReport::default();
    let mut links = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match parse_social_link(item) {
            Ok(link) => links.push(link),
            Err(element) => report.extend_prefixed(&format!("[{}]", index), element),
        }
    }

    report.into_result(links)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn form(display_name: &str, bio: &str, email: &str) -> ProfileFormData {
        ProfileFormData {
            display_name: display_name.to_string(),
            bio: bio.to_string(),
            contact_email: email.to_string(),
        }
    }

    fn link(platform: &str, url: &str) -> SocialLinkInput {
        SocialLinkInput {
            id: None,
            platform: platform.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn display_name_length_bounds() {
        assert!(validate_profile_form(&form("", "", "a@example.com")).is_err());
        assert!(validate_profile_form(&form("a", "", "a@example.com")).is_ok());
        assert!(validate_profile_form(&form(&"a".repeat(50), "", "a@example.com")).is_ok());

        let err = validate_profile_form(&form(&"a".repeat(51), "", "a@example.com")).unwrap_err();
        assert_eq!(err.codes_for("displayName"), vec!["length"]);
    }

    #[test]
    fn display_name_counts_characters_not_bytes() {
        // 50 three-byte characters
        let name = "あ".repeat(50);
        assert!(validate_profile_form(&form(&name, "", "a@example.com")).is_ok());
    }

    #[test]
    fn bio_may_be_empty_but_not_too_long() {
        assert!(validate_profile_form(&form("Alice", "", "a@example.com")).is_ok());
        assert!(validate_profile_form(&form("Alice", &"b".repeat(1000), "a@example.com")).is_ok());
        let err =
            validate_profile_form(&form("Alice", &"b".repeat(1001), "a@example.com")).unwrap_err();
        assert!(err.has_field("bio"));
    }

    #[test]
    fn all_violations_are_reported() {
        let err = validate_profile_form(&form("", &"b".repeat(1001), "nope")).unwrap_err();
        assert_eq!(err.violations().len(), 3);
        assert!(err.has_field("displayName"));
        assert!(err.has_field("bio"));
        assert!(err.has_field("contactEmail"));
    }

    #[test]
    fn email_syntax() {
        for bad in ["", "alice", "alice@", "@example.com", "alice example.com"] {
            let update = ProfileUpdate {
                contact_email: Some(bad.to_string()),
                ..Default::default()
            };
            assert!(validate_profile_update(update).is_err(), "{bad:?} should fail");
        }

        let update = ProfileUpdate {
            contact_email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        let validated = validate_profile_update(update).unwrap();
        assert_eq!(validated.contact_email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn update_fields_are_all_optional() {
        assert!(validate_profile_update(ProfileUpdate::default()).is_ok());

        let update = ProfileUpdate {
            display_name: Some(String::new()),
            profile_image_url: Some("not a url".to_string()),
            ..Default::default()
        };
        let err = validate_profile_update(update).unwrap_err();
        assert!(err.has_field("displayName"));
        assert_eq!(err.codes_for("profileImageUrl"), vec!["url"]);
    }

    #[test]
    fn field_names_use_wire_casing() {
        assert_eq!(camel_case("profile_image_url"), "profileImageUrl");
        assert_eq!(camel_case("bio"), "bio");
    }

    #[test]
    fn twitter_link_must_be_on_twitter() {
        let ok = validate_social_link(link("twitter", "https://twitter.com/alice")).unwrap();
        assert_eq!(ok.platform, Platform::Twitter);
        assert!(!ok.id.is_empty());

        let err = validate_social_link(link("twitter", "https://example.com/alice")).unwrap_err();
        assert_eq!(err.codes_for("url"), vec!["platform_mismatch"]);
    }

    #[test]
    fn malformed_url_is_distinct_from_platform_mismatch() {
        let err = validate_social_link(link("twitter", "twitter.com/alice")).unwrap_err();
        assert_eq!(err.codes_for("url"), vec!["url"]);
    }

    #[test]
    fn platform_patterns() {
        assert!(validate_social_link(link("instagram", "https://www.instagram.com/alice")).is_ok());
        assert!(validate_social_link(link("tiktok", "https://www.tiktok.com/@alice")).is_ok());
        assert!(validate_social_link(link("tiktok", "https://www.tiktok.com/alice")).is_err());
        assert!(validate_social_link(link("niconico", "https://www.nicovideo.jp/user/123")).is_ok());
        assert!(validate_social_link(link("niconico", "https://www.nicovideo.jp/watch/sm9")).is_err());
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = validate_social_link(link("myspace", "https://myspace.com/alice")).unwrap_err();
        assert_eq!(err.codes_for("platform"), vec!["platform"]);
    }

    #[test]
    fn client_supplied_id_is_kept() {
        let mut input = link("twitter", "https://twitter.com/alice");
        input.id = Some("abc".to_string());
        assert_eq!(validate_social_link(input).unwrap().id, "abc");
    }

    #[test]
    fn list_reports_every_failing_element() {
        let err = validate_social_links(vec![
            link("twitter", "https://twitter.com/alice"),
            link("twitter", "https://example.com/alice"),
            link("instagram", "nope"),
        ])
        .unwrap_err();

        assert_eq!(err.codes_for("[1].url"), vec!["platform_mismatch"]);
        assert_eq!(err.codes_for("[2].url"), vec!["url"]);
        assert!(!err.has_field("[0].url"));
    }

    #[test]
    fn list_keeps_order_and_duplicates() {
        let links = validate_social_links(vec![
            link("twitter", "https://twitter.com/alice"),
            link("twitter", "https://twitter.com/alice_alt"),
        ])
        .unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].url, "https://twitter.com/alice_alt");
    }

    #[test]
    fn sign_in_needs_an_email_and_a_password() {
        let err = Credentials {
            email: "nope".to_string(),
            password: String::new(),
        }
        .validate()
        .map_err(ValidationReport::from)
        .unwrap_err();
        assert_eq!(err.codes_for("email"), vec!["email"]);
        assert_eq!(err.codes_for("password"), vec!["required"]);
    }

    #[test]
    fn sign_up_passwords_must_match_and_be_long_enough() {
        let data = |password: &str, confirm: &str| SignUpData {
            email: "alice@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        };

        assert!(data("secret1", "secret1").validate().is_ok());

        let err = ValidationReport::from(data("secret1", "secret2").validate().unwrap_err());
        assert_eq!(err.codes_for("confirmPassword"), vec!["must_match"]);

        let err = ValidationReport::from(data("abc", "abc").validate().unwrap_err());
        assert_eq!(err.codes_for("password"), vec!["length"]);
    }

    #[test]
    fn update_body_must_be_an_object() {
        for body in [json!(["Alice"]), json!("Alice"), json!(null), json!(3)] {
            let err = parse_profile_update(&body).unwrap_err();
            assert_eq!(err.codes_for("body"), vec!["type"]);
        }
    }

    #[test]
    fn every_mistyped_update_field_is_reported() {
        let err = parse_profile_update(&json!({"displayName": 5, "bio": 7})).unwrap_err();
        assert_eq!(err.violations().len(), 2);
        assert_eq!(err.codes_for("displayName"), vec!["type"]);
        assert_eq!(err.codes_for("bio"), vec!["type"]);
    }

    #[test]
    fn type_and_schema_violations_are_reported_together() {
        let err =
            parse_profile_update(&json!({"displayName": "", "contactEmail": false})).unwrap_err();
        assert_eq!(err.codes_for("displayName"), vec!["length"]);
        assert_eq!(err.codes_for("contactEmail"), vec!["type"]);
    }

    #[test]
    fn null_update_field_is_a_type_violation() {
        let err = parse_profile_update(&json!({"bio": null})).unwrap_err();
        assert_eq!(err.codes_for("bio"), vec!["type"]);
    }

    #[test]
    fn unknown_update_keys_are_ignored() {
        let update =
            parse_profile_update(&json!({"displayName": "Alice", "userId": "other"})).unwrap();
        assert_eq!(update.display_name.as_deref(), Some("Alice"));
        assert_eq!(update.bio, None);
    }

    #[test]
    fn links_body_must_be_an_array() {
        let err = parse_social_links(&json!({"platform": "twitter"})).unwrap_err();
        assert_eq!(err.codes_for("body"), vec!["type"]);
    }

    #[test]
    fn non_object_link_is_reported_by_index() {
        let err = parse_social_links(&json!([["id", "twitter", "https://twitter.com/a"]]))
            .unwrap_err();
        assert_eq!(err.codes_for("[0]"), vec!["type"]);
    }

    #[test]
    fn missing_and_mistyped_link_fields_are_all_reported() {
        let err = parse_social_links(&json!([
            {"platform": "twitter", "url": "https://twitter.com/alice"},
            {"platform": "twitter"},
            {"platform": "instagram", "url": 5},
        ]))
        .unwrap_err();
        assert_eq!(err.violations().len(), 2);
        assert_eq!(err.codes_for("[1].url"), vec!["required"]);
        assert_eq!(err.codes_for("[2].url"), vec!["type"]);
    }

    #[test]
    fn the_decoded_half_of_a_broken_link_is_still_checked() {
        let err = parse_social_links(&json!([{"platform": "myspace"}])).unwrap_err();
        assert_eq!(err.codes_for("[0].platform"), vec!["platform"]);
        assert_eq!(err.codes_for("[0].url"), vec!["required"]);
    }

    #[test]
    fn well_typed_links_parse() {
        let links = parse_social_links(&json!([
            {"id": "a", "platform": "twitter", "url": "https://twitter.com/alice"},
            {"platform": "niconico", "url": "https://www.nicovideo.jp/user/1"},
        ]))
        .unwrap();
        assert_eq!(links[0].id, "a");
        assert_eq!(links[1].platform, Platform::Niconico);
    }
}
