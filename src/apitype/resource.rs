//! apitype::resource
//!
//! Resource wire types.
//!
//! - `ResourceV1`: the original shape, with the deprecated `defaults` bag
//! - `ResourceV2`: drops `defaults`; adds `external` and `provider`
//! - `ResourceV3`: adds `propertyDependencies`, `pendingReplacement`,
//!   `aliases`, `customTimeouts` and `additionalSecretOutputs`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::core::resource::{CustomTimeouts, PropertyMap};

fn is_false(value: &bool) -> bool {
    !*value
}

/// A resource as written by the first schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceV1 {
    pub urn: String,
    pub custom: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub type_token: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: PropertyMap,
    /// Deprecated; never populated by later writers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: PropertyMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: PropertyMap,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub protect: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    #[serde(rename = "initErrors", default, deserialize_with = "null_as_default")]
    pub init_errors: Vec<String>,
}

/// A resource as written by the second schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceV2 {
    pub urn: String,
    pub custom: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub type_token: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: PropertyMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: PropertyMap,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub protect: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<String>,
    #[serde(
        rename = "initErrors",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub init_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
}

/// A resource as written by the third (current) schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceV3 {
    pub urn: String,
    pub custom: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub type_token: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: PropertyMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: PropertyMap,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub protect: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<String>,
    #[serde(
        rename = "initErrors",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub init_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(
        rename = "propertyDependencies",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub property_dependencies: BTreeMap<String, Vec<String>>,
    #[serde(rename = "pendingReplacement", default, skip_serializing_if = "is_false")]
    pub pending_replacement: bool,
    #[serde(
        rename = "additionalSecretOutputs",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub additional_secret_outputs: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aliases: Vec<String>,
    #[serde(
        rename = "customTimeouts",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_timeouts: Option<CustomTimeouts>,
}
