use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::driver::MigrationRequest;

/// Canonical command names.
pub const RPC_METHODS: &[&str] = &[
    "listSpaces",
    "getSpaceDetails",
    "countContent",
    "createSpace",
    "migrateSpace",
    "migrateAttachments",
    "migrateComments",
];

/// Older names still accepted by the dispatcher, paired with their canonical name.
pub const RPC_ALIASES: &[(&str, &str)] = &[
    ("getSpaces", "listSpaces"),
    ("countSpaceContent", "countContent"),
    ("createTargetSpace", "createSpace"),
];

/// Every name `RpcMethod::parse` accepts.
pub fn accepted_method_names() -> impl Iterator<Item = &'static str> {
    RPC_METHODS
        .iter()
        .copied()
        .chain(RPC_ALIASES.iter().map(|(alias, _)| *alias))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    ListSpaces,
    GetSpaceDetails,
    CountContent,
    CreateSpace,
    MigrateSpace,
    MigrateAttachments,
    MigrateComments,
}

impl RpcMethod {
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = RPC_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |(_, canonical)| *canonical);
        match name {
            "listSpaces" => Some(Self::ListSpaces),
            "getSpaceDetails" => Some(Self::GetSpaceDetails),
            "countContent" => Some(Self::CountContent),
            "createSpace" => Some(Self::CreateSpace),
            "migrateSpace" => Some(Self::MigrateSpace),
            "migrateAttachments" => Some(Self::MigrateAttachments),
            "migrateComments" => Some(Self::MigrateComments),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListSpaces => "listSpaces",
            Self::GetSpaceDetails => "getSpaceDetails",
            Self::CountContent => "countContent",
            Self::CreateSpace => "createSpace",
            Self::MigrateSpace => "migrateSpace",
            Self::MigrateAttachments => "migrateAttachments",
            Self::MigrateComments => "migrateComments",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceKeyPayload {
    #[serde(default)]
    pub space_key: String,
}

impl SpaceKeyPayload {
    pub fn validate(&self) -> Result<()> {
        require("spaceKey", &self.space_key)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpacePayload {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CreateSpacePayload {
    pub fn validate(&self) -> Result<()> {
        require("key", &self.key)?;
        require("name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MigrateSpacePayload {
    #[serde(default)]
    pub source_space_key: String,
    #[serde(default)]
    pub source_space_id: Option<String>,
    #[serde(default)]
    pub target_space_key: String,
    #[serde(default)]
    pub target_space_name: String,
    #[serde(default)]
    pub target_space_description: String,
}

impl MigrateSpacePayload {
    pub fn validate(&self) -> Result<()> {
        require("sourceSpaceKey", &self.source_space_key)?;
        require("targetSpaceKey", &self.target_space_key)?;
        require("targetSpaceName", &self.target_space_name)
    }

    pub fn into_request(self) -> MigrationRequest {
        MigrationRequest {
            source_space_key: self.source_space_key.trim().to_string(),
            source_space_id: self
                .source_space_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            target_space_key: self.target_space_key.trim().to_string(),
            target_space_name: self.target_space_name.trim().to_string(),
            target_space_description: self.target_space_description,
        }
    }
}

/// Source and target page of a single-page sub-resource copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PagePairPayload {
    #[serde(default)]
    pub source_page_id: String,
    #[serde(default)]
    pub target_page_id: String,
}

impl PagePairPayload {
    pub fn validate(&self) -> Result<()> {
        require("sourcePageId", &self.source_page_id)?;
        require("targetPageId", &self.target_page_id)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("missing required field: {field}");
    }
    Ok(())
}
