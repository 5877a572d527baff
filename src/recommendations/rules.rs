//! Deterministic recommendation rules

use crate::recommendations::models::{
    power_kw, Priority, Recommendation, SensorReadings, KELVIN_OFFSET,
};

/// Number of recommendations shown for every prediction
pub const RECOMMENDATION_COUNT: usize = 4;

/// Most high-priority items kept when trimming
const MAX_HIGH_PRIORITY: usize = 2;

/// Temperature differential (K) above which cooling needs attention
const HIGH_TEMP_DIFF_K: f64 = 15.0;

/// Process temperature (°C) above which monitoring is stepped up
const HIGH_PROCESS_TEMP_C: f64 = 50.0;

const HIGH_SPEED_RPM: f64 = 2000.0;
const LOW_SPEED_RPM: f64 = 1000.0;

const HIGH_TORQUE_NM: f64 = 50.0;
const LOW_TORQUE_NM: f64 = 20.0;

/// Rule engine deriving recommendations from threshold checks on the readings
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Exactly [`RECOMMENDATION_COUNT`] recommendations for the readings and outcome
    pub fn default_recommendations(
        &self,
        readings: &SensorReadings,
        requires_maintenance: bool,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::with_capacity(RECOMMENDATION_COUNT + 2);

        if let (Some(air), Some(process)) = (readings.air_temperature, readings.process_temperature)
        {
            recommendations.push(thermal_rule(air, process));
        }
        if let Some(rpm) = readings.rotational_speed {
            recommendations.push(speed_rule(rpm));
        }
        if let Some(torque) = readings.torque {
            recommendations.push(torque_rule(torque));
        }
        recommendations.push(outcome_rule(requires_maintenance));

        for extra in additional_pool(readings) {
            if recommendations.len() >= RECOMMENDATION_COUNT {
                break;
            }
            if !recommendations.contains(&extra) {
                recommendations.push(extra);
            }
        }

        select_four(recommendations)
    }
}

/// Trim to four: at most two high, then medium, then low, keeping rule order within a level
pub fn select_four(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    if recommendations.len() <= RECOMMENDATION_COUNT {
        return recommendations;
    }

    let by_priority = |priority: Priority| {
        recommendations
            .iter()
            .filter(move |r| r.priority == priority)
            .cloned()
    };

    let mut selected: Vec<Recommendation> =
        by_priority(Priority::High).take(MAX_HIGH_PRIORITY).collect();
    let remaining = RECOMMENDATION_COUNT - selected.len();
    selected.extend(by_priority(Priority::Medium).take(remaining));
    let remaining = RECOMMENDATION_COUNT - selected.len();
    selected.extend(by_priority(Priority::Low).take(remaining));

    selected
}

fn thermal_rule(air_k: f64, process_k: f64) -> Recommendation {
    let temp_diff = process_k - air_k;
    let process_c = process_k - KELVIN_OFFSET;

    if temp_diff > HIGH_TEMP_DIFF_K {
        Recommendation::new(
            "Cooling System Optimization",
            format!(
                "Temperature differential of {:.1}K detected. Check cooling efficiency, clean heat exchangers, and verify coolant flow rates to prevent thermal stress.",
                temp_diff
            ),
            "fas fa-snowflake",
            Priority::High,
        )
    } else if process_c > HIGH_PROCESS_TEMP_C {
        Recommendation::new(
            "Temperature Monitoring Enhancement",
            format!(
                "Process temperature at {:.1}°C requires attention. Implement continuous thermal monitoring and consider heat dissipation improvements.",
                process_c
            ),
            "fas fa-thermometer-half",
            Priority::Medium,
        )
    } else {
        Recommendation::new(
            "Thermal Stability Maintenance",
            "Current thermal conditions are stable. Monitor temperature trends and maintain cooling system efficiency to prevent future overheating.",
            "fas fa-temperature-low",
            Priority::Low,
        )
    }
}

fn speed_rule(rpm: f64) -> Recommendation {
    if rpm > HIGH_SPEED_RPM {
        Recommendation::new(
            "High-Speed Bearing Maintenance",
            format!(
                "Operating at {} RPM requires premium lubrication. Schedule bearing inspection and use high-speed compatible lubricants.",
                rpm
            ),
            "fas fa-tachometer-alt",
            Priority::High,
        )
    } else if rpm < LOW_SPEED_RPM {
        Recommendation::new(
            "Low-Speed Operation Analysis",
            format!(
                "Low speed operation at {} RPM may indicate efficiency issues. Check for mechanical resistance and alignment problems.",
                rpm
            ),
            "fas fa-search",
            Priority::Medium,
        )
    } else {
        Recommendation::new(
            "Optimal Speed Range Monitoring",
            format!(
                "Current speed of {} RPM is within normal range. Continue monitoring for speed variations and maintain consistent operation.",
                rpm
            ),
            "fas fa-gauge",
            Priority::Low,
        )
    }
}

fn torque_rule(torque: f64) -> Recommendation {
    if torque > HIGH_TORQUE_NM {
        Recommendation::new(
            "High-Torque Component Inspection",
            format!(
                "High torque load of {} Nm detected. Inspect coupling alignment, check for mechanical stress, and verify fastener torque specifications.",
                torque
            ),
            "fas fa-wrench",
            Priority::High,
        )
    } else if torque < LOW_TORQUE_NM {
        Recommendation::new(
            "Drive System Verification",
            format!(
                "Low torque reading of {} Nm may indicate slipping or reduced load transfer. Check belt tension and coupling integrity.",
                torque
            ),
            "fas fa-tools",
            Priority::Medium,
        )
    } else {
        Recommendation::new(
            "Torque Load Optimization",
            format!(
                "Current torque of {} Nm is within acceptable range. Monitor for load variations and optimize power transfer efficiency.",
                torque
            ),
            "fas fa-balance-scale",
            Priority::Low,
        )
    }
}

fn outcome_rule(requires_maintenance: bool) -> Recommendation {
    if requires_maintenance {
        Recommendation::new(
            "Immediate Maintenance Protocol",
            "The model indicates maintenance is required. Schedule an immediate inspection focusing on wear components, lubrication levels, and alignment checks.",
            "fas fa-exclamation-triangle",
            Priority::High,
        )
    } else {
        Recommendation::new(
            "Preventive Maintenance Scheduling",
            "Machine is operating normally. Maintain the current maintenance schedule and monitor parameter trends for early detection of changes.",
            "fas fa-calendar-check",
            Priority::Low,
        )
    }
}

/// General advice used to top up the rule output, in order of preference
fn additional_pool(readings: &SensorReadings) -> Vec<Recommendation> {
    let mut pool = vec![
        Recommendation::new(
            "Vibration Analysis Implementation",
            "Conduct comprehensive vibration analysis to detect early signs of mechanical wear, misalignment, or bearing degradation before they cause failures.",
            "fas fa-wave-square",
            Priority::Medium,
        ),
        Recommendation::new(
            "Lubrication Schedule Optimization",
            "Review and optimize lubrication intervals based on current operating conditions, load factors, and manufacturer specifications.",
            "fas fa-oil-can",
            Priority::Medium,
        ),
        Recommendation::new(
            "Performance Trending & Analytics",
            "Establish baseline performance metrics and implement trend analysis for predictive maintenance optimization.",
            "fas fa-chart-line",
            Priority::Low,
        ),
    ];

    if let (Some(rpm), Some(torque)) = (readings.rotational_speed, readings.torque) {
        pool.push(Recommendation::new(
            "Energy Efficiency Audit",
            format!(
                "With estimated power output of {:.2} kW, conduct an energy efficiency audit to identify optimization opportunities and reduce operational costs.",
                power_kw(rpm, torque)
            ),
            "fas fa-bolt",
            Priority::Medium,
        ));
    }

    pool.push(Recommendation::new(
        "Safety Protocol Review",
        "Review current safety protocols and emergency procedures to ensure compliance with the latest industrial safety standards.",
        "fas fa-shield-alt",
        Priority::Medium,
    ));
    pool.push(Recommendation::new(
        "Sensor Calibration Check",
        "Verify the accuracy of temperature, speed, and torque sensors through calibration checks to keep predictive maintenance data reliable.",
        "fas fa-adjust",
        Priority::Low,
    ));

    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_nominal_readings() {
        let engine = RecommendationEngine::new();
        let readings = SensorReadings::new(298.1, 308.6, 1551.0, 42.8);

        let recs = engine.default_recommendations(&readings, false);

        assert_eq!(
            titles(&recs),
            vec![
                "Thermal Stability Maintenance",
                "Optimal Speed Range Monitoring",
                "Torque Load Optimization",
                "Preventive Maintenance Scheduling",
            ]
        );
        assert!(recs.iter().all(|r| r.priority == Priority::Low));
    }

    #[test]
    fn test_stressed_machine() {
        let engine = RecommendationEngine::new();
        let readings = SensorReadings::new(295.0, 312.0, 2400.0, 65.0);

        let recs = engine.default_recommendations(&readings, true);

        assert_eq!(recs.len(), RECOMMENDATION_COUNT);
        assert_eq!(recs[0].title, "Cooling System Optimization");
        assert!(recs[0].description.contains("17.0K"));
        assert_eq!(recs[1].title, "High-Speed Bearing Maintenance");
        assert_eq!(recs[2].title, "High-Torque Component Inspection");
        assert_eq!(recs[3].title, "Immediate Maintenance Protocol");
    }

    #[test]
    fn test_medium_thresholds() {
        let engine = RecommendationEngine::new();
        // 330 K process temperature is 56.85 °C with a small differential
        let readings = SensorReadings::new(320.0, 330.0, 900.0, 12.0);

        let recs = engine.default_recommendations(&readings, false);

        assert_eq!(recs[0].title, "Temperature Monitoring Enhancement");
        assert_eq!(recs[0].priority, Priority::Medium);
        assert_eq!(recs[1].title, "Low-Speed Operation Analysis");
        assert_eq!(recs[2].title, "Drive System Verification");
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        let engine = RecommendationEngine::new();
        let readings = SensorReadings::new(300.0, 315.0, 2000.0, 50.0);

        let recs = engine.default_recommendations(&readings, false);

        assert_eq!(recs[0].title, "Thermal Stability Maintenance");
        assert_eq!(recs[1].title, "Optimal Speed Range Monitoring");
        assert_eq!(recs[2].title, "Torque Load Optimization");
    }

    #[test]
    fn test_pads_missing_readings_from_pool() {
        let engine = RecommendationEngine::new();
        let readings = SensorReadings {
            torque: Some(42.0),
            ..Default::default()
        };

        let recs = engine.default_recommendations(&readings, true);

        assert_eq!(
            titles(&recs),
            vec![
                "Torque Load Optimization",
                "Immediate Maintenance Protocol",
                "Vibration Analysis Implementation",
                "Lubrication Schedule Optimization",
            ]
        );
    }

    #[test]
    fn test_select_four_caps_high_priority() {
        let rec = |title: &str, priority| Recommendation::new(title, "", "fas fa-tools", priority);
        let input = vec![
            rec("h1", Priority::High),
            rec("l1", Priority::Low),
            rec("h2", Priority::High),
            rec("m1", Priority::Medium),
            rec("h3", Priority::High),
            rec("l2", Priority::Low),
        ];

        let selected = select_four(input);

        assert_eq!(titles(&selected), vec!["h1", "h2", "m1", "l1"]);
    }

    #[test]
    fn test_select_four_keeps_short_lists() {
        let input = vec![Recommendation::new("only", "", "fas fa-tools", Priority::High)];
        assert_eq!(select_four(input).len(), 1);
    }

    #[test]
    fn test_always_four() {
        let engine = RecommendationEngine::new();
        for readings in [
            SensorReadings::default(),
            SensorReadings::new(290.0, 320.0, 500.0, 80.0),
            SensorReadings {
                rotational_speed: Some(1500.0),
                torque: Some(40.0),
                ..Default::default()
            },
        ] {
            for requires_maintenance in [true, false] {
                let recs = engine.default_recommendations(&readings, requires_maintenance);
                assert_eq!(recs.len(), RECOMMENDATION_COUNT);
            }
        }
    }
}
