//! Network containers and their resolution to region configs

use serde::{Deserialize, Serialize};

use crate::spec::RegionConfig;

/// A provider network container (VPC / VNet) of a project
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,

    pub provider_name: String,

    /// Azure region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// AWS region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}

/// Find the container backing a region config
///
/// GCP containers are global, so the first one of the provider is used.
/// Otherwise the container must match the provider and either its Azure
/// `region` or its AWS `region_name`.
pub fn resolve_container_id<'a>(containers: &'a [Container], region: &RegionConfig) -> Option<&'a str> {
    containers
        .iter()
        .find(|c| {
            if region.provider_name == "GCP" {
                return c.provider_name == "GCP";
            }
            c.provider_name == region.provider_name
                && (c.region.as_deref() == Some(region.region_name.as_str())
                    || c.region_name.as_deref() == Some(region.region_name.as_str()))
        })
        .map(|c| c.id.as_str())
}
