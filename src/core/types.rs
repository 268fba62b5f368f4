//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Urn`] - Validated resource URN
//! - [`ProviderReference`] - A provider resource's URN plus its ID
//! - [`ResourceId`] - Provider-assigned resource identifier
//!
//! # Grammar
//!
//! ```text
//! urn:pulumi:<stack>::<project>::<qualified-type>::<name>
//! <qualified-type> := [<parent-type>$]*<type>
//! <provider-reference> := <urn>::<id>
//! ```
//!
//! # Validation
//!
//! These types enforce validity at construction time. A value that exists
//! always splits into its components, so accessors are infallible.
//!
//! # Examples
//!
//! ```
//! use stackstate::core::types::{ProviderReference, Urn};
//!
//! let urn = Urn::parse("urn:pulumi:dev::web::aws:s3/bucket:Bucket::assets").unwrap();
//! assert_eq!(urn.stack(), "dev");
//! assert_eq!(urn.project(), "web");
//! assert_eq!(urn.name(), "assets");
//!
//! let reference =
//!     ProviderReference::parse("urn:pulumi:dev::web::pulumi:providers:aws::default::abc").unwrap();
//! assert_eq!(reference.id().as_str(), "abc");
//!
//! assert!(Urn::parse("not-a-urn").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix every URN starts with.
pub const URN_PREFIX: &str = "urn:pulumi:";

/// Separator between URN components and between a provider URN and its ID.
pub const URN_NAME_DELIMITER: &str = "::";

/// Separator between parent types inside a qualified type.
pub const URN_TYPE_DELIMITER: char = '$';

/// Type token of the synthetic root stack resource.
pub const ROOT_STACK_TYPE: &str = "pulumi:pulumi:Stack";

/// Prefix of every first-class provider type token.
pub const PROVIDER_TYPE_PREFIX: &str = "pulumi:providers:";

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid URN '{urn}': {reason}")]
    InvalidUrn { urn: String, reason: String },

    #[error("invalid provider reference '{reference}': {reason}")]
    InvalidProviderReference { reference: String, reason: String },

    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

fn invalid_urn(urn: &str, reason: impl Into<String>) -> TypeError {
    TypeError::InvalidUrn {
        urn: urn.to_string(),
        reason: reason.into(),
    }
}

/// Check whether a type token names a first-class provider.
///
/// # Example
///
/// ```
/// use stackstate::core::types::is_provider_type;
///
/// assert!(is_provider_type("pulumi:providers:aws"));
/// assert!(!is_provider_type("pulumi:providers:"));
/// assert!(!is_provider_type("aws:s3/bucket:Bucket"));
/// ```
pub fn is_provider_type(type_token: &str) -> bool {
    type_token
        .strip_prefix(PROVIDER_TYPE_PREFIX)
        .is_some_and(|package| !package.is_empty())
}

/// Validate a stack or project name.
///
/// Names must be non-empty and contain only ASCII alphanumerics, `-`, `_`
/// and `.`. This is stricter than what [`Urn::parse`] accepts for existing
/// URNs, and is applied to names introduced by a rename.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| TypeError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(fail("name cannot be empty"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(fail(&format!("name cannot contain '{c}'")));
    }
    Ok(())
}

/// Validate a possibly qualified stack name such as `org/project/dev`.
///
/// Each `/`-separated segment must pass [`validate_name`]. Checkpoints may
/// carry qualified names; URN stack components may not.
///
/// # Example
///
/// ```
/// use stackstate::core::types::validate_qualified_name;
///
/// assert!(validate_qualified_name("stack", "dev").is_ok());
/// assert!(validate_qualified_name("stack", "acme/web/dev").is_ok());
/// assert!(validate_qualified_name("stack", "acme//dev").is_err());
/// ```
pub fn validate_qualified_name(kind: &'static str, name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return validate_name(kind, name);
    }
    for segment in name.split('/') {
        validate_name(kind, segment).map_err(|err| match err {
            TypeError::InvalidName { reason, .. } => TypeError::InvalidName {
                kind,
                name: name.to_string(),
                reason: format!("segment '{segment}': {reason}"),
            },
            other => other,
        })?;
    }
    Ok(())
}

/// A validated resource URN.
///
/// The textual form is stored verbatim, so parsing and printing round-trip
/// byte-for-byte.
///
/// # Example
///
/// ```
/// use stackstate::core::types::Urn;
///
/// let urn = Urn::new("dev", "web", "my:module:Component", "aws:s3/bucket:Bucket", "logs").unwrap();
/// assert_eq!(
///     urn.as_str(),
///     "urn:pulumi:dev::web::my:module:Component$aws:s3/bucket:Bucket::logs"
/// );
/// assert_eq!(urn.type_token(), "aws:s3/bucket:Bucket");
/// assert_eq!(urn.parent_type(), Some("my:module:Component"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn(String);

impl Urn {
    /// Build a URN from its components.
    ///
    /// `parent_type` may be empty, in which case the qualified type is just
    /// `base_type`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidUrn` if a component is empty or contains
    /// the `::` delimiter.
    pub fn new(
        stack: &str,
        project: &str,
        parent_type: &str,
        base_type: &str,
        name: &str,
    ) -> Result<Self, TypeError> {
        let qualified_type = if parent_type.is_empty() {
            base_type.to_string()
        } else {
            format!("{parent_type}{URN_TYPE_DELIMITER}{base_type}")
        };
        Self::from_components(stack, project, &qualified_type, name)
    }

    /// Parse and validate a URN string.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidUrn` if the prefix is missing or any of the
    /// stack, project or type components is absent.
    pub fn parse(urn: impl Into<String>) -> Result<Self, TypeError> {
        let urn = urn.into();
        Self::validate(&urn)?;
        Ok(Self(urn))
    }

    fn from_components(
        stack: &str,
        project: &str,
        qualified_type: &str,
        name: &str,
    ) -> Result<Self, TypeError> {
        Self::parse(format!(
            "{URN_PREFIX}{stack}{d}{project}{d}{qualified_type}{d}{name}",
            d = URN_NAME_DELIMITER
        ))
    }

    fn validate(urn: &str) -> Result<(), TypeError> {
        let rest = urn
            .strip_prefix(URN_PREFIX)
            .ok_or_else(|| invalid_urn(urn, format!("missing '{URN_PREFIX}' prefix")))?;

        let parts: Vec<&str> = rest.splitn(4, URN_NAME_DELIMITER).collect();
        if parts.len() != 4 {
            return Err(invalid_urn(
                urn,
                "expected <stack>::<project>::<type>::<name>",
            ));
        }
        for (part, what) in parts[..3].iter().zip(["stack", "project", "type"]) {
            if part.is_empty() {
                return Err(invalid_urn(urn, format!("{what} component cannot be empty")));
            }
        }
        if parts[2].split(URN_TYPE_DELIMITER).any(str::is_empty) {
            return Err(invalid_urn(urn, "qualified type has an empty component"));
        }
        Ok(())
    }

    /// The four components in order: stack, project, qualified type, name.
    fn components(&self) -> [&str; 4] {
        let rest = &self.0[URN_PREFIX.len()..];
        let mut parts = rest.splitn(4, URN_NAME_DELIMITER);
        // Validated at construction.
        let mut next = || parts.next().unwrap_or_default();
        [next(), next(), next(), next()]
    }

    /// The stack component.
    pub fn stack(&self) -> &str {
        self.components()[0]
    }

    /// The project component.
    pub fn project(&self) -> &str {
        self.components()[1]
    }

    /// The parent-qualified type, e.g. `a:b:Parent$x:y:Child`.
    pub fn qualified_type(&self) -> &str {
        self.components()[2]
    }

    /// The resource's own type token (last component of the qualified type).
    pub fn type_token(&self) -> &str {
        let qualified = self.qualified_type();
        qualified
            .rsplit_once(URN_TYPE_DELIMITER)
            .map_or(qualified, |(_, t)| t)
    }

    /// The parent portion of the qualified type, if any.
    pub fn parent_type(&self) -> Option<&str> {
        self.qualified_type()
            .rsplit_once(URN_TYPE_DELIMITER)
            .map(|(p, _)| p)
    }

    /// The name component. May itself contain `::`.
    pub fn name(&self) -> &str {
        self.components()[3]
    }

    /// Whether this URN names the synthetic root stack resource.
    pub fn is_root_stack(&self) -> bool {
        self.qualified_type() == ROOT_STACK_TYPE
    }

    /// Whether this URN names a first-class provider resource.
    pub fn is_provider(&self) -> bool {
        is_provider_type(self.type_token())
    }

    /// A copy of this URN in a different stack.
    pub fn with_stack(&self, stack: &str) -> Result<Self, TypeError> {
        let [_, project, qualified_type, name] = self.components();
        Self::from_components(stack, project, qualified_type, name)
    }

    /// A copy of this URN in a different project.
    pub fn with_project(&self, project: &str) -> Result<Self, TypeError> {
        let [stack, _, qualified_type, name] = self.components();
        Self::from_components(stack, project, qualified_type, name)
    }

    /// A copy of this URN with a different parent-qualified type.
    pub fn with_qualified_type(&self, qualified_type: &str) -> Result<Self, TypeError> {
        let [stack, project, _, name] = self.components();
        Self::from_components(stack, project, qualified_type, name)
    }

    /// A copy of this URN with a different name.
    pub fn with_name(&self, name: &str) -> Result<Self, TypeError> {
        let [stack, project, qualified_type, _] = self.components();
        Self::from_components(stack, project, qualified_type, name)
    }

    /// Get the URN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Urn {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Urn {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

impl AsRef<str> for Urn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Urn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A provider-assigned resource identifier.
///
/// IDs are opaque; any string is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap an ID string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to a first-class provider resource: `<urn>::<id>`.
///
/// # Example
///
/// ```
/// use stackstate::core::types::{ProviderReference, ResourceId, Urn};
///
/// let urn = Urn::parse("urn:pulumi:dev::web::pulumi:providers:aws::default").unwrap();
/// let reference = ProviderReference::new(urn, ResourceId::new("1234")).unwrap();
/// let text = reference.to_string();
/// assert_eq!(text, "urn:pulumi:dev::web::pulumi:providers:aws::default::1234");
/// assert_eq!(ProviderReference::parse(&text).unwrap(), reference);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderReference {
    urn: Urn,
    id: ResourceId,
}

impl ProviderReference {
    /// Build a reference from a provider URN and ID.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidProviderReference` if the URN does not name
    /// a provider type.
    pub fn new(urn: Urn, id: ResourceId) -> Result<Self, TypeError> {
        if !urn.is_provider() {
            return Err(TypeError::InvalidProviderReference {
                reference: format!("{urn}{URN_NAME_DELIMITER}{id}"),
                reason: format!("'{}' is not a provider type", urn.type_token()),
            });
        }
        Ok(Self { urn, id })
    }

    /// Parse `<urn>::<id>`, splitting at the last `::`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidProviderReference` if there is no
    /// separator, the URN is malformed, or the URN is not a provider type.
    pub fn parse(reference: &str) -> Result<Self, TypeError> {
        let invalid = |reason: String| TypeError::InvalidProviderReference {
            reference: reference.to_string(),
            reason,
        };

        let (urn, id) = reference
            .rsplit_once(URN_NAME_DELIMITER)
            .ok_or_else(|| invalid("expected <urn>::<id>".to_string()))?;
        let urn = Urn::parse(urn).map_err(|e| invalid(e.to_string()))?;
        Self::new(urn, ResourceId::new(id)).map_err(|_| invalid("not a provider URN".to_string()))
    }

    /// The provider resource's URN.
    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    /// The provider resource's ID.
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// A copy of this reference pointing at a different URN, keeping the ID.
    pub fn with_urn(&self, urn: Urn) -> Result<Self, TypeError> {
        Self::new(urn, self.id.clone())
    }
}

impl std::fmt::Display for ProviderReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.urn, URN_NAME_DELIMITER, self.id)
    }
}
