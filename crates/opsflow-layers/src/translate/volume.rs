//! EBS volume sets keyed by mount point

use super::{non_empty, non_zero};
use crate::attribute::check_one_of;
use crate::error::{LayerError, Result};
use opsflow_cloud::VolumeConfiguration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_VOLUME_TYPE: &str = "standard";

const VOLUME_TYPES: &[&str] = &["standard", "io1", "gp2", "st1", "sc1"];

/// One volume group mounted on every instance in the layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub mount_point: String,
    pub number_of_disks: i64,
    /// GiB per disk
    pub size: i64,
    #[serde(rename = "type")]
    pub volume_type: String,
    /// RAID level as a string; empty means no RAID
    pub raid_level: String,
    /// Provisioned IOPS; zero means unset
    pub iops: i64,
    pub encrypted: bool,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            mount_point: String::new(),
            number_of_disks: 0,
            size: 0,
            volume_type: DEFAULT_VOLUME_TYPE.to_string(),
            raid_level: String::new(),
            iops: 0,
            encrypted: false,
        }
    }
}

impl VolumeConfig {
    pub fn new(mount_point: impl Into<String>, number_of_disks: i64, size: i64) -> Self {
        Self {
            mount_point: mount_point.into(),
            number_of_disks,
            size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mount_point.is_empty() {
            return Err(LayerError::Validation(
                "ebs_volume.mount_point is required".to_string(),
            ));
        }
        if self.number_of_disks <= 0 {
            return Err(LayerError::Validation(format!(
                "ebs_volume ({}): number_of_disks must be positive",
                self.mount_point
            )));
        }
        if self.size <= 0 {
            return Err(LayerError::Validation(format!(
                "ebs_volume ({}): size must be positive",
                self.mount_point
            )));
        }
        check_one_of("ebs_volume.type", &self.volume_type, VOLUME_TYPES)
    }
}

/// Volume configurations with at most one entry per mount point.
///
/// Inserting a second entry for a mount point replaces the first, so when a
/// set is built from a list the last entry for each mount point wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<VolumeConfig>", into = "Vec<VolumeConfig>")]
pub struct VolumeSet(BTreeMap<String, VolumeConfig>);

impl VolumeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a volume, returning the entry it replaced
    pub fn insert(&mut self, volume: VolumeConfig) -> Option<VolumeConfig> {
        self.0.insert(volume.mount_point.clone(), volume)
    }

    pub fn get(&self, mount_point: &str) -> Option<&VolumeConfig> {
        self.0.get(mount_point)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Volumes ordered by mount point
    pub fn iter(&self) -> impl Iterator<Item = &VolumeConfig> {
        self.0.values()
    }

    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(VolumeConfig::validate)
    }
}

impl FromIterator<VolumeConfig> for VolumeSet {
    fn from_iter<I: IntoIterator<Item = VolumeConfig>>(iter: I) -> Self {
        let mut set = VolumeSet::new();
        for volume in iter {
            set.insert(volume);
        }
        set
    }
}

impl From<Vec<VolumeConfig>> for VolumeSet {
    fn from(volumes: Vec<VolumeConfig>) -> Self {
        volumes.into_iter().collect()
    }
}

impl From<VolumeSet> for Vec<VolumeConfig> {
    fn from(set: VolumeSet) -> Self {
        set.0.into_values().collect()
    }
}

pub fn expand(volumes: &VolumeSet) -> Vec<VolumeConfiguration> {
    volumes.iter().map(expand_volume).collect()
}

fn expand_volume(volume: &VolumeConfig) -> VolumeConfiguration {
    VolumeConfiguration {
        encrypted: Some(volume.encrypted),
        iops: non_zero(volume.iops),
        mount_point: non_empty(&volume.mount_point),
        number_of_disks: non_zero(volume.number_of_disks),
        // unparsable levels are dropped rather than rejected
        raid_level: volume.raid_level.parse::<i64>().ok(),
        size: non_zero(volume.size),
        volume_type: non_empty(&volume.volume_type),
    }
}

pub fn flatten(remote: &[VolumeConfiguration]) -> VolumeSet {
    remote.iter().map(flatten_volume).collect()
}

fn flatten_volume(remote: &VolumeConfiguration) -> VolumeConfig {
    VolumeConfig {
        mount_point: remote.mount_point.clone().unwrap_or_default(),
        number_of_disks: remote.number_of_disks.unwrap_or_default(),
        size: remote.size.unwrap_or_default(),
        volume_type: remote
            .volume_type
            .clone()
            .unwrap_or_else(|| DEFAULT_VOLUME_TYPE.to_string()),
        raid_level: remote
            .raid_level
            .map(|level| level.to_string())
            .unwrap_or_default(),
        iops: remote.iops.unwrap_or_default(),
        encrypted: remote.encrypted.unwrap_or(false),
    }
}
