use crate::catalog::{CatalogError, CatalogResult};
use crate::db;
use crate::schema::{
    anomaly_types, material_types, observed_anomalies, system_anomalies, system_anomaly_materials,
    system_anomaly_zones, zones,
};
use crate::scoring::candidates::{enumerate_candidates, FailureModeCandidate};
use crate::scoring::contribution::{score_mode, CatalogAnomalyView, ObservedAnomalyView};
use crate::scoring::ranking::{normalize, RankedMode, ScoredMode};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// What the analysis concluded. The first three variants are expected,
/// well-defined states surfaced to the user as information, never as errors.
#[derive(Debug, Clone, Serialize)]
pub enum AnalysisOutcome {
    /// The dam has no recorded observations yet.
    InsufficientData,
    /// No failure mode is registered for the dam's construction type.
    NoCandidates,
    /// Candidates exist but no (observation, catalog anomaly) pair satisfied
    /// the match criteria.
    NoMatch,
    Ranked(Vec<RankedMode>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub dam_id: i32,
    pub dam_name: String,
    pub dam_type_name: String,
    pub observation_count: usize,
    pub candidate_count: usize,
    pub outcome: AnalysisOutcome,
}

/// Runs the full likelihood analysis for one dam: enumerate the candidate
/// failure modes for its construction type, score each against the observed
/// anomalies, drop zero scores and normalize the rest into a ranked
/// probability distribution. Read-only; one fully materialized result.
pub fn run_analysis(conn: &mut SqliteConnection, dam_id: i32) -> CatalogResult<AnalysisReport> {
    let (dam, dam_type) =
        db::get_dam_with_type(conn, dam_id)?.ok_or(CatalogError::NotFound {
            entity: "dam",
            id: dam_id,
        })?;

    let observed = load_observed_views(conn, dam_id)?;
    if observed.is_empty() {
        return Ok(report(
            dam.name,
            dam_type.name,
            dam_id,
            0,
            0,
            AnalysisOutcome::InsufficientData,
        ));
    }

    let candidates = enumerate_candidates(conn, dam.dam_type_id)?;
    if candidates.is_empty() {
        return Ok(report(
            dam.name,
            dam_type.name,
            dam_id,
            observed.len(),
            0,
            AnalysisOutcome::NoCandidates,
        ));
    }

    let candidate_count = candidates.len();
    let catalog_by_mode = load_catalog_views(conn, &candidates)?;

    let mut scored = Vec::new();
    for candidate in candidates {
        let catalog = catalog_by_mode
            .get(&candidate.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let (score, contributions) = score_mode(&observed, catalog);
        debug!(mode = %candidate.name, score, pairs = contributions.len(), "scored candidate");
        if score > 0.0 {
            scored.push(ScoredMode {
                candidate,
                score,
                contributions,
            });
        }
    }

    let outcome = if scored.is_empty() {
        AnalysisOutcome::NoMatch
    } else {
        AnalysisOutcome::Ranked(normalize(scored))
    };

    Ok(report(
        dam.name,
        dam_type.name,
        dam_id,
        observed.len(),
        candidate_count,
        outcome,
    ))
}

fn report(
    dam_name: String,
    dam_type_name: String,
    dam_id: i32,
    observation_count: usize,
    candidate_count: usize,
    outcome: AnalysisOutcome,
) -> AnalysisReport {
    AnalysisReport {
        dam_id,
        dam_name,
        dam_type_name,
        observation_count,
        candidate_count,
        outcome,
    }
}

fn load_observed_views(
    conn: &mut SqliteConnection,
    dam_id: i32,
) -> QueryResult<Vec<ObservedAnomalyView>> {
    let rows: Vec<(i32, i32, i32, i32, String, String, String)> = observed_anomalies::table
        .inner_join(anomaly_types::table)
        .inner_join(zones::table)
        .inner_join(material_types::table)
        .filter(observed_anomalies::dam_id.eq(dam_id))
        .select((
            observed_anomalies::id,
            observed_anomalies::anomaly_type_id,
            observed_anomalies::zone_id,
            observed_anomalies::material_type_id,
            anomaly_types::name,
            zones::name,
            material_types::name,
        ))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, type_id, zone_id, material_id, anomaly_name, zone_name, material_name)| {
            ObservedAnomalyView {
                id,
                anomaly_type_id: type_id,
                zone_id,
                material_type_id: material_id,
                anomaly_name,
                zone_name,
                material_name,
            }
        })
        .collect())
}

/// Loads every catalog anomaly of the candidate modes in three scoped reads:
/// the anomalies themselves, then their zone and material link sets.
fn load_catalog_views(
    conn: &mut SqliteConnection,
    candidates: &[FailureModeCandidate],
) -> QueryResult<HashMap<i32, Vec<CatalogAnomalyView>>> {
    let mode_ids: Vec<i32> = candidates.iter().map(|c| c.id).collect();

    let rows: Vec<(i32, i32, i32, f32, String)> = system_anomalies::table
        .inner_join(anomaly_types::table)
        .filter(system_anomalies::failure_mode_id.eq_any(&mode_ids))
        .select((
            system_anomalies::id,
            system_anomalies::failure_mode_id,
            system_anomalies::anomaly_type_id,
            system_anomalies::weight,
            anomaly_types::name,
        ))
        .load(conn)?;

    let anomaly_ids: Vec<i32> = rows.iter().map(|r| r.0).collect();

    let mut zones_by_anomaly: HashMap<i32, Vec<i32>> = HashMap::new();
    let zone_links: Vec<(i32, i32)> = system_anomaly_zones::table
        .filter(system_anomaly_zones::system_anomaly_id.eq_any(&anomaly_ids))
        .select((
            system_anomaly_zones::system_anomaly_id,
            system_anomaly_zones::zone_id,
        ))
        .load(conn)?;
    for (anomaly_id, zone_id) in zone_links {
        zones_by_anomaly.entry(anomaly_id).or_default().push(zone_id);
    }

    let mut materials_by_anomaly: HashMap<i32, Vec<i32>> = HashMap::new();
    let material_links: Vec<(i32, i32)> = system_anomaly_materials::table
        .filter(system_anomaly_materials::system_anomaly_id.eq_any(&anomaly_ids))
        .select((
            system_anomaly_materials::system_anomaly_id,
            system_anomaly_materials::material_type_id,
        ))
        .load(conn)?;
    for (anomaly_id, material_id) in material_links {
        materials_by_anomaly
            .entry(anomaly_id)
            .or_default()
            .push(material_id);
    }

    let mut by_mode: HashMap<i32, Vec<CatalogAnomalyView>> = HashMap::new();
    for (id, failure_mode_id, anomaly_type_id, weight, anomaly_name) in rows {
        by_mode.entry(failure_mode_id).or_default().push(CatalogAnomalyView {
            id,
            anomaly_type_id,
            weight,
            anomaly_name,
            zone_ids: zones_by_anomaly.remove(&id).unwrap_or_default(),
            material_ids: materials_by_anomaly.remove(&id).unwrap_or_default(),
        });
    }

    Ok(by_mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        create_anomaly_type, create_failure_mode, create_material_type, create_system_anomaly,
        register_dam, record_observed_anomaly, seed_defaults,
    };
    use crate::db::{
        NewAnomalyType, NewDam, NewFailureMode, NewMaterialType, NewObservedAnomaly,
        NewSystemAnomaly,
    };
    use chrono::NaiveDate;
    use diesel::Connection;
    use diesel_migrations::MigrationHarness;

    struct Fixture {
        conn: SqliteConnection,
        dam: i32,
        seepage: i32,
        cracking: i32,
        clay: i32,
    }

    // dam type 1 (Homogeneous) and zone 1 (Core) come from the seeded defaults
    fn fixture() -> Fixture {
        let mut conn = SqliteConnection::establish(":memory:").expect("in-memory db");
        conn.run_pending_migrations(db::MIGRATIONS).expect("migrations");
        seed_defaults(&mut conn).unwrap();

        let seepage = create_anomaly_type(
            &mut conn,
            &NewAnomalyType {
                name: "Seepage".into(),
                description: None,
                image_path: None,
            },
        )
        .unwrap();
        let cracking = create_anomaly_type(
            &mut conn,
            &NewAnomalyType {
                name: "Cracking".into(),
                description: None,
                image_path: None,
            },
        )
        .unwrap();
        let clay = create_material_type(
            &mut conn,
            &NewMaterialType {
                name: "Clay".into(),
                description: None,
            },
        )
        .unwrap();
        let dam = register_dam(
            &mut conn,
            &NewDam {
                name: "Alto Ceira".into(),
                dam_type_id: 1,
                location: Some("Pampilhosa da Serra".into()),
                height_m: Some(41.0),
                length_m: Some(120.0),
                crest_height_ratio: Some(2.9),
            },
        )
        .unwrap();

        Fixture {
            conn,
            dam,
            seepage,
            cracking,
            clay,
        }
    }

    fn add_mode(fx: &mut Fixture, name: &str, dam_types: &[i32]) -> i32 {
        create_failure_mode(
            &mut fx.conn,
            &NewFailureMode {
                category_id: 1,
                name: name.into(),
                description: None,
                technical_reference: None,
                image_path: None,
            },
            dam_types,
        )
        .unwrap()
    }

    fn add_catalog_anomaly(fx: &mut Fixture, mode: i32, anomaly_type: i32, weight: f32) {
        create_system_anomaly(
            &mut fx.conn,
            &NewSystemAnomaly {
                failure_mode_id: mode,
                anomaly_type_id: anomaly_type,
                severity: None,
                weight,
                image_path: None,
            },
            &[1],
            &[fx.clay],
        )
        .unwrap();
    }

    fn observe(fx: &mut Fixture, anomaly_type: i32, zone: i32) {
        record_observed_anomaly(
            &mut fx.conn,
            &NewObservedAnomaly {
                dam_id: fx.dam,
                anomaly_type_id: anomaly_type,
                zone_id: zone,
                material_type_id: fx.clay,
                description: Some("wet patch on the downstream face".into()),
                image_path: None,
                source_visual_inspection: true,
                source_instrumentation: false,
                source_drone: false,
                source_insar: false,
                source_satellite: false,
                observed_on: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            },
        )
        .unwrap();
    }

    #[test]
    fn no_observations_yields_insufficient_data() {
        let mut fx = fixture();
        add_mode(&mut fx, "Piping", &[1]);

        let report = run_analysis(&mut fx.conn, fx.dam).unwrap();
        assert!(matches!(report.outcome, AnalysisOutcome::InsufficientData));
        assert_eq!(report.observation_count, 0);
    }

    #[test]
    fn dam_type_without_modes_yields_no_candidates() {
        let mut fx = fixture();
        // mode registered for a different construction type only
        add_mode(&mut fx, "Face rupture", &[3]);
        let seepage = fx.seepage;
        observe(&mut fx, seepage, 1);

        let report = run_analysis(&mut fx.conn, fx.dam).unwrap();
        assert!(matches!(report.outcome, AnalysisOutcome::NoCandidates));
    }

    #[test]
    fn candidates_are_scoped_to_the_dam_type() {
        let mut fx = fixture();
        let applicable = add_mode(&mut fx, "Piping", &[1]);
        let foreign = add_mode(&mut fx, "Face rupture", &[3]);
        let seepage = fx.seepage;
        add_catalog_anomaly(&mut fx, applicable, seepage, 4.0);
        add_catalog_anomaly(&mut fx, foreign, seepage, 9.0);
        observe(&mut fx, seepage, 1);

        let report = run_analysis(&mut fx.conn, fx.dam).unwrap();
        let ranked = match report.outcome {
            AnalysisOutcome::Ranked(ranked) => ranked,
            other => panic!("expected ranking, got {other:?}"),
        };
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate.id, applicable);
    }

    #[test]
    fn ranked_distribution_matches_score_shares() {
        let mut fx = fixture();
        let piping = add_mode(&mut fx, "Piping", &[1]);
        let sliding = add_mode(&mut fx, "Slope sliding", &[1]);
        let (seepage, cracking) = (fx.seepage, fx.cracking);
        // one matching observation each: 15.0 * 2 vs 5.0 * 2
        add_catalog_anomaly(&mut fx, piping, seepage, 7.5);
        add_catalog_anomaly(&mut fx, sliding, cracking, 2.5);
        observe(&mut fx, seepage, 1);
        observe(&mut fx, cracking, 1);

        let report = run_analysis(&mut fx.conn, fx.dam).unwrap();
        let ranked = match report.outcome {
            AnalysisOutcome::Ranked(ranked) => ranked,
            other => panic!("expected ranking, got {other:?}"),
        };
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].candidate.id, piping);
        assert!((ranked[0].probability_pct - 75.0).abs() < 1e-4);
        assert!((ranked[1].probability_pct - 25.0).abs() < 1e-4);
        assert!((ranked[0].score - 15.0).abs() < 1e-4);
        assert_eq!(ranked[0].contributions.len(), 1);
    }

    #[test]
    fn zero_score_candidates_are_excluded() {
        let mut fx = fixture();
        let piping = add_mode(&mut fx, "Piping", &[1]);
        let sliding = add_mode(&mut fx, "Slope sliding", &[1]);
        let (seepage, cracking) = (fx.seepage, fx.cracking);
        add_catalog_anomaly(&mut fx, piping, seepage, 4.0);
        // sliding expects cracking, which is never observed
        add_catalog_anomaly(&mut fx, sliding, cracking, 4.0);
        observe(&mut fx, seepage, 1);

        let report = run_analysis(&mut fx.conn, fx.dam).unwrap();
        assert_eq!(report.candidate_count, 2);
        let ranked = match report.outcome {
            AnalysisOutcome::Ranked(ranked) => ranked,
            other => panic!("expected ranking, got {other:?}"),
        };
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate.id, piping);
        assert!((ranked[0].probability_pct - 100.0).abs() < 1e-4);
    }

    #[test]
    fn observation_in_unlisted_zone_yields_no_match() {
        let mut fx = fixture();
        let piping = add_mode(&mut fx, "Piping", &[1]);
        let seepage = fx.seepage;
        // catalog anomaly lives in zone 1 only; observation is in zone 5
        add_catalog_anomaly(&mut fx, piping, seepage, 4.0);
        observe(&mut fx, seepage, 5);

        let report = run_analysis(&mut fx.conn, fx.dam).unwrap();
        assert!(matches!(report.outcome, AnalysisOutcome::NoMatch));
    }

    #[test]
    fn unknown_dam_is_an_error() {
        let mut fx = fixture();
        let result = run_analysis(&mut fx.conn, 999);
        assert!(matches!(result, Err(CatalogError::NotFound { .. })));
    }
}
