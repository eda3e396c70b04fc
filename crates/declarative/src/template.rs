//! Template synthesis - the serialized form handed to the provisioning engine
//!
//! Templates use the CloudFormation JSON layout. Maps are key-sorted so the
//! same graph always produces byte-identical output.

use crate::error::{GraphError, Result};
use crate::graph::ResourceGraph;
use crate::resource::Resource;
use crate::types::DeletionPolicy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Template format version understood by the engine
pub const FORMAT_VERSION: &str = "2010-09-09";

/// A synthesized template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub resources: BTreeMap<String, TemplateResource>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

/// One resource entry of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

/// One output entry of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<TemplateExport>,
}

/// Cross-stack export of an output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateExport {
    pub name: String,
}

/// `DependsOn` may be written as a single string or a list
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

impl TemplateResource {
    fn from_resource(resource: &dyn Resource) -> Self {
        let properties = resource
            .properties()
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect();

        let mut depends_on: Vec<String> = resource
            .depends_on()
            .into_iter()
            .map(String::from)
            .collect();
        depends_on.sort();
        depends_on.dedup();

        let policy = resource.deletion_policy();

        Self {
            resource_type: resource.resource_type().to_string(),
            properties,
            depends_on,
            deletion_policy: policy,
            update_replace_policy: policy,
        }
    }
}

impl Template {
    /// Synthesize a template from a graph
    pub fn synthesize(graph: &ResourceGraph, description: Option<&str>) -> Self {
        let resources = graph
            .resources()
            .map(|r| (r.logical_id().to_string(), TemplateResource::from_resource(r)))
            .collect();

        let outputs = graph
            .outputs()
            .iter()
            .map(|o| {
                (
                    o.name.to_string(),
                    TemplateOutput {
                        value: o.value.to_json(),
                        description: o.description.clone(),
                        export: o
                            .export_name
                            .clone()
                            .map(|name| TemplateExport { name }),
                    },
                )
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: description.map(str::to_string),
            resources,
            outputs,
        }
    }

    /// Parse a template from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Single-line JSON
    pub fn to_json_compact(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// blake3 hex digest of the compact JSON form
    pub fn fingerprint(&self) -> Result<String> {
        let json = self.to_json_compact()?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Read a template file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Write the pretty-printed template to a file
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut content = self.to_json_pretty()?;
        content.push('\n');
        fs::write(path, content).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Look up a resource entry by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.get(logical_id)
    }

    /// All resource entries of a given type
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TemplateResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }
}
