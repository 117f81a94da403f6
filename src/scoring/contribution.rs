use crate::settings::settings;
use serde::Serialize;

/// A field observation flattened for scoring: the ids the matcher compares on
/// plus the display names carried into the audit trail.
#[derive(Debug, Clone)]
pub struct ObservedAnomalyView {
    pub id: i32,
    pub anomaly_type_id: i32,
    pub zone_id: i32,
    pub material_type_id: i32,
    pub anomaly_name: String,
    pub zone_name: String,
    pub material_name: String,
}

/// A catalog anomaly of one failure mode, with the full sets of zones and
/// materials where the mechanism is considered plausible.
#[derive(Debug, Clone)]
pub struct CatalogAnomalyView {
    pub id: i32,
    pub anomaly_type_id: i32,
    pub weight: f32,
    pub anomaly_name: String,
    pub zone_ids: Vec<i32>,
    pub material_ids: Vec<i32>,
}

/// One counted (observation, catalog anomaly) pair, kept so the final report
/// can show exactly which evidence drove each failure mode's score.
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub observed_id: i32,
    pub observed_name: String,
    pub catalog_id: i32,
    pub catalog_name: String,
    pub zone_name: String,
    pub material_name: String,
    pub weight: f32,
    pub amount: f32,
}

/// Evaluates one (observation, catalog anomaly) pair.
///
/// The pair counts only when the anomaly types are equal AND the observation's
/// zone and material both belong to the catalog anomaly's sets. A partial
/// facet match contributes nothing. The contribution keeps the original
/// per-facet bonus arithmetic, which with the strict gate always amounts to
/// weight * (1 + 2 * facet_bonus).
pub fn pair_contribution(
    observed: &ObservedAnomalyView,
    catalog: &CatalogAnomalyView,
) -> Option<Contribution> {
    if observed.anomaly_type_id != catalog.anomaly_type_id {
        return None;
    }

    let material_match = catalog.material_ids.contains(&observed.material_type_id);
    let zone_match = catalog.zone_ids.contains(&observed.zone_id);
    if !(material_match && zone_match) {
        return None;
    }

    let bonus = settings().scoring.facet_bonus;
    let amount = catalog.weight
        * (1.0 + bonus * material_match as i32 as f32 + bonus * zone_match as i32 as f32);

    Some(Contribution {
        observed_id: observed.id,
        observed_name: observed.anomaly_name.clone(),
        catalog_id: catalog.id,
        catalog_name: catalog.anomaly_name.clone(),
        zone_name: observed.zone_name.clone(),
        material_name: observed.material_name.clone(),
        weight: catalog.weight,
        amount,
    })
}

/// Scores one candidate failure mode against every observation on the dam.
/// Returns the summed score with the audit records behind it.
pub fn score_mode(
    observed: &[ObservedAnomalyView],
    catalog: &[CatalogAnomalyView],
) -> (f32, Vec<Contribution>) {
    let mut total = 0.0;
    let mut contributions = Vec::new();

    for obs in observed {
        for anomaly in catalog {
            if let Some(contribution) = pair_contribution(obs, anomaly) {
                total += contribution.amount;
                contributions.push(contribution);
            }
        }
    }

    (total, contributions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(anomaly_type: i32, zone: i32, material: i32) -> ObservedAnomalyView {
        ObservedAnomalyView {
            id: 1,
            anomaly_type_id: anomaly_type,
            zone_id: zone,
            material_type_id: material,
            anomaly_name: "Seepage".into(),
            zone_name: "Core".into(),
            material_name: "Clay".into(),
        }
    }

    fn catalog(
        anomaly_type: i32,
        weight: f32,
        zones: Vec<i32>,
        materials: Vec<i32>,
    ) -> CatalogAnomalyView {
        CatalogAnomalyView {
            id: 10,
            anomaly_type_id: anomaly_type,
            weight,
            anomaly_name: "Seepage".into(),
            zone_ids: zones,
            material_ids: materials,
        }
    }

    #[test]
    fn anomaly_type_mismatch_contributes_nothing() {
        let obs = observed(1, 1, 1);
        let cat = catalog(2, 4.0, vec![1], vec![1]);
        assert!(pair_contribution(&obs, &cat).is_none());
    }

    #[test]
    fn zone_mismatch_gates_out_the_pair() {
        // material matches, zone does not: strict AND gate drops the pair
        let obs = observed(1, 1, 1);
        let cat = catalog(1, 4.0, vec![2], vec![1]);
        assert!(pair_contribution(&obs, &cat).is_none());
    }

    #[test]
    fn material_mismatch_gates_out_the_pair() {
        let obs = observed(1, 1, 1);
        let cat = catalog(1, 4.0, vec![1], vec![2]);
        assert!(pair_contribution(&obs, &cat).is_none());
    }

    #[test]
    fn full_match_contributes_twice_the_weight() {
        let obs = observed(1, 1, 1);
        let cat = catalog(1, 4.0, vec![1], vec![1]);
        let contribution = pair_contribution(&obs, &cat).expect("full match");
        assert!((contribution.amount - 8.0).abs() < 1e-6);
        assert!((contribution.weight - 4.0).abs() < 1e-6);
    }

    #[test]
    fn score_sums_every_counted_pair() {
        let observations = vec![observed(1, 1, 1), observed(2, 1, 1)];
        let anomalies = vec![
            catalog(1, 4.0, vec![1], vec![1]),
            catalog(2, 1.5, vec![1, 2], vec![1, 3]),
            catalog(3, 9.0, vec![1], vec![1]), // no observation of this type
        ];

        let (score, contributions) = score_mode(&observations, &anomalies);
        assert_eq!(contributions.len(), 2);
        assert!((score - (8.0 + 3.0)).abs() < 1e-6);
    }

    #[test]
    fn no_match_scores_zero() {
        let observations = vec![observed(1, 1, 1)];
        let anomalies = vec![catalog(1, 4.0, vec![2], vec![2])];
        let (score, contributions) = score_mode(&observations, &anomalies);
        assert_eq!(score, 0.0);
        assert!(contributions.is_empty());
    }
}
