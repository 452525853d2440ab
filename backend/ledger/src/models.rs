use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PROFILES_TABLE: &str = "profiles";
pub const ACTIONS_TABLE: &str = "eco_actions";

/// Columns fetched when aggregating impact.
pub const IMPACT_COLUMNS: &str = "carbon_saved,water_saved,waste_saved,energy_saved";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub points: Option<i64>,
}

impl Profile {
    pub fn points_or_zero(&self) -> i64 {
        self.points.unwrap_or(0)
    }
}

/// Store-assigned row key. Serial tables hand back integers, uuid tables strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(id) => write!(f, "{id}"),
            RowId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewEcoAction {
    pub user_id: String,
    pub name: String,
    pub points: i64,
    pub category: String,
    pub description: String,
    pub impact: String,
    #[serde(default)]
    pub carbon_saved: f64,
    #[serde(default)]
    pub water_saved: f64,
    #[serde(default)]
    pub waste_saved: f64,
    #[serde(default)]
    pub energy_saved: f64,
}

impl NewEcoAction {
    pub fn impact_values(&self) -> [(&'static str, f64); 4] {
        [
            ("carbon_saved", self.carbon_saved),
            ("water_saved", self.water_saved),
            ("waste_saved", self.waste_saved),
            ("energy_saved", self.energy_saved),
        ]
    }
}

/// A logged action as the store returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EcoAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    #[serde(flatten)]
    pub action: NewEcoAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The impact columns of one action. Older rows may carry nulls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactRow {
    #[serde(default)]
    pub carbon_saved: Option<f64>,
    #[serde(default)]
    pub water_saved: Option<f64>,
    #[serde(default)]
    pub waste_saved: Option<f64>,
    #[serde(default)]
    pub energy_saved: Option<f64>,
}

impl From<&NewEcoAction> for ImpactRow {
    fn from(action: &NewEcoAction) -> Self {
        Self {
            carbon_saved: Some(action.carbon_saved),
            water_saved: Some(action.water_saved),
            waste_saved: Some(action.waste_saved),
            energy_saved: Some(action.energy_saved),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactTotals {
    pub carbon: f64,
    pub water: f64,
    pub waste: f64,
    pub energy: f64,
}

impl ImpactTotals {
    pub fn add(&mut self, row: &ImpactRow) {
        self.carbon += row.carbon_saved.unwrap_or(0.0);
        self.water += row.water_saved.unwrap_or(0.0);
        self.waste += row.waste_saved.unwrap_or(0.0);
        self.energy += row.energy_saved.unwrap_or(0.0);
    }
}

impl<'a> FromIterator<&'a ImpactRow> for ImpactTotals {
    fn from_iter<I: IntoIterator<Item = &'a ImpactRow>>(rows: I) -> Self {
        let mut totals = ImpactTotals::default();
        for row in rows {
            totals.add(row);
        }

        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_without_points() {
        let profile: Profile = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert_eq!(profile.points, None);
        assert_eq!(profile.points_or_zero(), 0);

        let profile: Profile = serde_json::from_str(r#"{"id":"u1","points":null}"#).unwrap();
        assert_eq!(profile.points_or_zero(), 0);
    }

    #[test]
    fn test_row_id_forms() {
        let id: RowId = serde_json::from_str("42").unwrap();
        assert_eq!(id, RowId::Int(42));
        assert_eq!(id.to_string(), "42");

        let id: RowId = serde_json::from_str(r#""9b2c""#).unwrap();
        assert_eq!(id.to_string(), "9b2c");
    }

    #[test]
    fn test_action_defaults_impact_to_zero() {
        let action: NewEcoAction = serde_json::from_str(
            r#"{"user_id":"u1","name":"Bike","points":5,"category":"transport",
                "description":"rode in","impact":"low","carbon_saved":1.5}"#,
        )
        .unwrap();

        assert_eq!(action.carbon_saved, 1.5);
        assert_eq!(action.water_saved, 0.0);
        assert_eq!(action.energy_saved, 0.0);
    }

    #[test]
    fn test_stored_action_flattens() {
        let stored: EcoAction = serde_json::from_str(
            r#"{"id":7,"user_id":"u1","name":"Compost","points":3,"category":"waste",
                "description":"","impact":"medium","carbon_saved":0,"water_saved":0,
                "waste_saved":2,"energy_saved":0,"created_at":"2025-03-01T10:00:00+00:00"}"#,
        )
        .unwrap();

        assert_eq!(stored.id, Some(RowId::Int(7)));
        assert_eq!(stored.action.waste_saved, 2.0);
        assert!(stored.created_at.is_some());
    }

    #[test]
    fn test_totals_treat_null_as_zero() {
        let rows: Vec<ImpactRow> = serde_json::from_str(
            r#"[{"carbon_saved":1.5,"water_saved":null,"waste_saved":2,"energy_saved":0.5},
                {"carbon_saved":null,"water_saved":10},
                {}]"#,
        )
        .unwrap();

        let totals: ImpactTotals = rows.iter().collect();
        assert_eq!(
            totals,
            ImpactTotals {
                carbon: 1.5,
                water: 10.0,
                waste: 2.0,
                energy: 0.5,
            }
        );
    }
}
