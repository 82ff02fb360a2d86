use crate::utils::deserialize_lenient_f64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One day of activity totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: String,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub total_steps: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub total_distance_meters: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub total_calories: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub active_calories: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub bmr_calories: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub avg_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub max_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub resting_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub avg_stress_level: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub floor_climbed: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub minutes_sedentary: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub minutes_lightly_active: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub minutes_moderately_active: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub minutes_highly_active: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub activity_id: String,
    #[serde(default)]
    pub activity_name: String,
    #[serde(default)]
    pub activity_type: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration_seconds: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub distance_meters: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub avg_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub max_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub steps: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub elevation_gain: Option<f64>,
}

/// Result of `authenticate` and `test`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ConnectionProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    /// Numeric or string depending on the account type
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub full_name: String,
}
