//! Load-based auto scaling thresholds

use super::non_zero;
use crate::attribute::check_range;
use crate::error::{LayerError, Result};
use opsflow_cloud::{
    AutoScalingThresholds, LoadBasedAutoScalingConfiguration, SetLoadBasedAutoScalingRequest,
};
use serde::{Deserialize, Deserializer, Serialize};

const MAX_ALARMS: usize = 5;
const MIN_WAIT_MINUTES: i64 = 1;
const MAX_WAIT_MINUTES: i64 = 100;

/// Load-based auto scaling of a layer, one threshold block per direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBasedAutoScaling {
    pub enable: bool,
    #[serde(deserialize_with = "upscaling_block")]
    pub upscaling: Option<ScalingThresholds>,
    /// Omitted fields take the downscaling defaults, not the upscaling ones
    #[serde(deserialize_with = "downscaling_block")]
    pub downscaling: Option<ScalingThresholds>,
}

/// When to add or remove instances. Float thresholds of zero mean unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingThresholds {
    pub alarms: Vec<String>,
    pub cpu_threshold: f64,
    /// Minutes to ignore metrics after scaling
    pub ignore_metrics_time: i64,
    pub instance_count: i64,
    pub load_threshold: f64,
    pub memory_threshold: f64,
    /// Minutes a threshold must be exceeded before scaling
    pub thresholds_wait_time: i64,
}

impl Default for ScalingThresholds {
    fn default() -> Self {
        Self::upscaling()
    }
}

impl ScalingThresholds {
    pub fn upscaling() -> Self {
        Self {
            alarms: Vec::new(),
            cpu_threshold: 80.0,
            ignore_metrics_time: 5,
            instance_count: 1,
            load_threshold: 0.0,
            memory_threshold: 0.0,
            thresholds_wait_time: 5,
        }
    }

    pub fn downscaling() -> Self {
        Self {
            cpu_threshold: 30.0,
            ignore_metrics_time: 10,
            thresholds_wait_time: 10,
            ..Self::upscaling()
        }
    }

    pub fn validate(&self, direction: &str) -> Result<()> {
        if self.alarms.len() > MAX_ALARMS {
            return Err(LayerError::Validation(format!(
                "load_based_auto_scaling.{}.alarms: at most {} alarms, got {}",
                direction,
                MAX_ALARMS,
                self.alarms.len()
            )));
        }
        check_range(
            "ignore_metrics_time",
            self.ignore_metrics_time,
            MIN_WAIT_MINUTES,
            MAX_WAIT_MINUTES,
        )?;
        check_range(
            "thresholds_wait_time",
            self.thresholds_wait_time,
            MIN_WAIT_MINUTES,
            MAX_WAIT_MINUTES,
        )
    }
}

/// A threshold block as written by the user; unset fields fall back to the
/// defaults of the block's direction
#[derive(Deserialize)]
struct ThresholdOverrides {
    alarms: Option<Vec<String>>,
    cpu_threshold: Option<f64>,
    ignore_metrics_time: Option<i64>,
    instance_count: Option<i64>,
    load_threshold: Option<f64>,
    memory_threshold: Option<f64>,
    thresholds_wait_time: Option<i64>,
}

impl ThresholdOverrides {
    fn over(self, defaults: ScalingThresholds) -> ScalingThresholds {
        ScalingThresholds {
            alarms: self.alarms.unwrap_or(defaults.alarms),
            cpu_threshold: self.cpu_threshold.unwrap_or(defaults.cpu_threshold),
            ignore_metrics_time: self
                .ignore_metrics_time
                .unwrap_or(defaults.ignore_metrics_time),
            instance_count: self.instance_count.unwrap_or(defaults.instance_count),
            load_threshold: self.load_threshold.unwrap_or(defaults.load_threshold),
            memory_threshold: self.memory_threshold.unwrap_or(defaults.memory_threshold),
            thresholds_wait_time: self
                .thresholds_wait_time
                .unwrap_or(defaults.thresholds_wait_time),
        }
    }
}

fn upscaling_block<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<ScalingThresholds>, D::Error>
where
    D: Deserializer<'de>,
{
    let block = Option::<ThresholdOverrides>::deserialize(deserializer)?;
    Ok(block.map(|overrides| overrides.over(ScalingThresholds::upscaling())))
}

fn downscaling_block<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<ScalingThresholds>, D::Error>
where
    D: Deserializer<'de>,
{
    let block = Option::<ThresholdOverrides>::deserialize(deserializer)?;
    Ok(block.map(|overrides| overrides.over(ScalingThresholds::downscaling())))
}

impl LoadBasedAutoScaling {
    pub fn validate(&self) -> Result<()> {
        if let Some(up) = &self.upscaling {
            up.validate("upscaling")?;
        }
        if let Some(down) = &self.downscaling {
            down.validate("downscaling")?;
        }
        Ok(())
    }
}

pub fn expand(layer_id: &str, config: &LoadBasedAutoScaling) -> SetLoadBasedAutoScalingRequest {
    SetLoadBasedAutoScalingRequest {
        layer_id: layer_id.to_string(),
        enable: Some(config.enable),
        up_scaling: config.upscaling.as_ref().map(expand_thresholds),
        down_scaling: config.downscaling.as_ref().map(expand_thresholds),
    }
}

/// Request that switches auto scaling off, leaving thresholds in place
pub fn disable(layer_id: &str) -> SetLoadBasedAutoScalingRequest {
    SetLoadBasedAutoScalingRequest {
        layer_id: layer_id.to_string(),
        enable: Some(false),
        ..Default::default()
    }
}

fn non_zero_f64(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

fn expand_thresholds(thresholds: &ScalingThresholds) -> AutoScalingThresholds {
    AutoScalingThresholds {
        alarms: (!thresholds.alarms.is_empty()).then(|| thresholds.alarms.clone()),
        cpu_threshold: non_zero_f64(thresholds.cpu_threshold),
        ignore_metrics_time: non_zero(thresholds.ignore_metrics_time),
        instance_count: non_zero(thresholds.instance_count),
        load_threshold: non_zero_f64(thresholds.load_threshold),
        memory_threshold: non_zero_f64(thresholds.memory_threshold),
        thresholds_wait_time: non_zero(thresholds.thresholds_wait_time),
    }
}

pub fn flatten(remote: &LoadBasedAutoScalingConfiguration) -> LoadBasedAutoScaling {
    LoadBasedAutoScaling {
        enable: remote.enable.unwrap_or(false),
        upscaling: remote
            .up_scaling
            .as_ref()
            .map(|t| flatten_thresholds(t, ScalingThresholds::upscaling())),
        downscaling: remote
            .down_scaling
            .as_ref()
            .map(|t| flatten_thresholds(t, ScalingThresholds::downscaling())),
    }
}

fn flatten_thresholds(
    remote: &AutoScalingThresholds,
    defaults: ScalingThresholds,
) -> ScalingThresholds {
    ScalingThresholds {
        alarms: remote.alarms.clone().unwrap_or_default(),
        cpu_threshold: remote.cpu_threshold.unwrap_or(defaults.cpu_threshold),
        ignore_metrics_time: remote
            .ignore_metrics_time
            .unwrap_or(defaults.ignore_metrics_time),
        instance_count: remote.instance_count.unwrap_or(defaults.instance_count),
        load_threshold: remote.load_threshold.unwrap_or(defaults.load_threshold),
        memory_threshold: remote.memory_threshold.unwrap_or(defaults.memory_threshold),
        thresholds_wait_time: remote
            .thresholds_wait_time
            .unwrap_or(defaults.thresholds_wait_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_defaults() {
        let up = ScalingThresholds::upscaling();
        let down = ScalingThresholds::downscaling();
        assert_eq!(up.cpu_threshold, 80.0);
        assert_eq!(down.cpu_threshold, 30.0);
        assert_eq!(up.ignore_metrics_time, 5);
        assert_eq!(down.ignore_metrics_time, 10);
        assert_eq!(up.instance_count, 1);
        assert_eq!(down.instance_count, 1);
    }

    #[test]
    fn test_expand_omits_unset_thresholds() {
        let config = LoadBasedAutoScaling {
            enable: true,
            upscaling: Some(ScalingThresholds::upscaling()),
            downscaling: None,
        };

        let request = expand("layer-1", &config);
        assert_eq!(request.layer_id, "layer-1");
        assert_eq!(request.enable, Some(true));
        assert!(request.down_scaling.is_none());

        let up = request.up_scaling.unwrap();
        assert_eq!(up.cpu_threshold, Some(80.0));
        assert_eq!(up.load_threshold, None);
        assert_eq!(up.memory_threshold, None);
        assert_eq!(up.alarms, None);
    }

    #[test]
    fn test_flatten_fills_direction_defaults() {
        let remote = LoadBasedAutoScalingConfiguration {
            layer_id: Some("layer-1".to_string()),
            enable: Some(true),
            up_scaling: Some(AutoScalingThresholds {
                memory_threshold: Some(90.0),
                ..Default::default()
            }),
            down_scaling: Some(AutoScalingThresholds::default()),
        };

        let local = flatten(&remote);
        let up = local.upscaling.unwrap();
        assert_eq!(up.memory_threshold, 90.0);
        assert_eq!(up.cpu_threshold, 80.0);
        assert_eq!(local.downscaling, Some(ScalingThresholds::downscaling()));
    }

    #[test]
    fn test_deserialized_blocks_use_their_own_direction_defaults() {
        let config: LoadBasedAutoScaling = serde_json::from_value(serde_json::json!({
            "enable": true,
            "upscaling": { "memory_threshold": 85.0 },
            "downscaling": { "cpu_threshold": 20.0 },
        }))
        .unwrap();

        let up = config.upscaling.unwrap();
        assert_eq!(up.memory_threshold, 85.0);
        assert_eq!(up.cpu_threshold, 80.0);
        assert_eq!(up.thresholds_wait_time, 5);

        let down = config.downscaling.unwrap();
        let defaults = ScalingThresholds::downscaling();
        assert_eq!(down.cpu_threshold, 20.0);
        assert_eq!(down.ignore_metrics_time, defaults.ignore_metrics_time);
        assert_eq!(down.thresholds_wait_time, defaults.thresholds_wait_time);
        assert_eq!(down.instance_count, defaults.instance_count);
    }

    #[test]
    fn test_deserialized_empty_downscaling_block_is_all_defaults() {
        let config: LoadBasedAutoScaling =
            serde_json::from_value(serde_json::json!({ "downscaling": {} })).unwrap();
        assert!(!config.enable);
        assert_eq!(config.upscaling, None);
        assert_eq!(config.downscaling, Some(ScalingThresholds::downscaling()));

        let round_trip: LoadBasedAutoScaling =
            serde_json::from_value(serde_json::to_value(&config).unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_validate_limits() {
        let mut thresholds = ScalingThresholds::upscaling();
        assert!(thresholds.validate("upscaling").is_ok());

        thresholds.alarms = (0..6).map(|i| format!("alarm-{}", i)).collect();
        assert!(thresholds.validate("upscaling").is_err());

        let mut thresholds = ScalingThresholds::downscaling();
        thresholds.thresholds_wait_time = 101;
        assert!(thresholds.validate("downscaling").is_err());

        thresholds.thresholds_wait_time = 10;
        thresholds.ignore_metrics_time = 0;
        assert!(thresholds.validate("downscaling").is_err());
    }
}
