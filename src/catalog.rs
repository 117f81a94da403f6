//! Administrator-facing catalog maintenance: reference vocabularies, failure
//! modes, catalog anomalies, dams and field observations.
//!
//! Integrity rules are enforced here at entry, not by database cascades:
//! duplicate (failure mode, anomaly type) pairs are rejected, weights are
//! bounded, and nothing is deleted while dependent rows still reference it.

use crate::db::{
    NewAnomalyType, NewDam, NewDamType, NewFailureMode, NewFailureModeCategory, NewMaterialType,
    NewObservedAnomaly, NewSystemAnomaly, NewZone,
};
use crate::schema::{
    analysis_contexts, anomaly_types, dam_types, dams, failure_mode_categories,
    failure_mode_dam_types, failure_modes, material_types, observed_anomalies, system_anomalies,
    system_anomaly_materials, system_anomaly_zones, zones,
};
use crate::settings::settings;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("failure mode {failure_mode_id} already has a catalog anomaly of type {anomaly_type_id}")]
    DuplicateCatalogPair {
        failure_mode_id: i32,
        anomaly_type_id: i32,
    },
    #[error("weight {0} outside the allowed range [{1}, {2}]")]
    WeightOutOfRange(f32, f32, f32),
    #[error("an observation needs at least one detection source")]
    NoDetectionSource,
    #[error("{entity} {id} is still referenced by {dependents} row(s)")]
    InUse {
        entity: &'static str,
        id: i32,
        dependents: i64,
    },
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

// ---- reference vocabularies ----

pub fn create_dam_type(conn: &mut SqliteConnection, new: &NewDamType) -> CatalogResult<i32> {
    let id = diesel::insert_into(dam_types::table)
        .values(new)
        .returning(dam_types::id)
        .get_result(conn)?;
    Ok(id)
}

pub fn update_dam_type(
    conn: &mut SqliteConnection,
    type_id: i32,
    changes: &NewDamType,
) -> CatalogResult<()> {
    let updated = diesel::update(dam_types::table.find(type_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "dam type",
            id: type_id,
        });
    }
    Ok(())
}

pub fn delete_dam_type(conn: &mut SqliteConnection, type_id: i32) -> CatalogResult<()> {
    let dependents: i64 = dams::table
        .filter(dams::dam_type_id.eq(type_id))
        .count()
        .get_result::<i64>(conn)?
        + failure_mode_dam_types::table
            .filter(failure_mode_dam_types::dam_type_id.eq(type_id))
            .count()
            .get_result::<i64>(conn)?;
    if dependents > 0 {
        return Err(CatalogError::InUse {
            entity: "dam type",
            id: type_id,
            dependents,
        });
    }
    ensure_deleted(
        diesel::delete(dam_types::table.find(type_id)).execute(conn)?,
        "dam type",
        type_id,
    )
}

pub fn create_zone(conn: &mut SqliteConnection, new: &NewZone) -> CatalogResult<i32> {
    let id = diesel::insert_into(zones::table)
        .values(new)
        .returning(zones::id)
        .get_result(conn)?;
    Ok(id)
}

pub fn update_zone(
    conn: &mut SqliteConnection,
    zone_id: i32,
    changes: &NewZone,
) -> CatalogResult<()> {
    let updated = diesel::update(zones::table.find(zone_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "zone",
            id: zone_id,
        });
    }
    Ok(())
}

pub fn delete_zone(conn: &mut SqliteConnection, zone_id: i32) -> CatalogResult<()> {
    let dependents: i64 = observed_anomalies::table
        .filter(observed_anomalies::zone_id.eq(zone_id))
        .count()
        .get_result::<i64>(conn)?
        + system_anomaly_zones::table
            .filter(system_anomaly_zones::zone_id.eq(zone_id))
            .count()
            .get_result::<i64>(conn)?;
    if dependents > 0 {
        return Err(CatalogError::InUse {
            entity: "zone",
            id: zone_id,
            dependents,
        });
    }
    ensure_deleted(
        diesel::delete(zones::table.find(zone_id)).execute(conn)?,
        "zone",
        zone_id,
    )
}

pub fn create_material_type(
    conn: &mut SqliteConnection,
    new: &NewMaterialType,
) -> CatalogResult<i32> {
    let id = diesel::insert_into(material_types::table)
        .values(new)
        .returning(material_types::id)
        .get_result(conn)?;
    Ok(id)
}

pub fn update_material_type(
    conn: &mut SqliteConnection,
    material_id: i32,
    changes: &NewMaterialType,
) -> CatalogResult<()> {
    let updated = diesel::update(material_types::table.find(material_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "material type",
            id: material_id,
        });
    }
    Ok(())
}

pub fn delete_material_type(conn: &mut SqliteConnection, material_id: i32) -> CatalogResult<()> {
    let dependents: i64 = observed_anomalies::table
        .filter(observed_anomalies::material_type_id.eq(material_id))
        .count()
        .get_result::<i64>(conn)?
        + system_anomaly_materials::table
            .filter(system_anomaly_materials::material_type_id.eq(material_id))
            .count()
            .get_result::<i64>(conn)?;
    if dependents > 0 {
        return Err(CatalogError::InUse {
            entity: "material type",
            id: material_id,
            dependents,
        });
    }
    ensure_deleted(
        diesel::delete(material_types::table.find(material_id)).execute(conn)?,
        "material type",
        material_id,
    )
}

pub fn create_anomaly_type(
    conn: &mut SqliteConnection,
    new: &NewAnomalyType,
) -> CatalogResult<i32> {
    let id = diesel::insert_into(anomaly_types::table)
        .values(new)
        .returning(anomaly_types::id)
        .get_result(conn)?;
    Ok(id)
}

pub fn update_anomaly_type(
    conn: &mut SqliteConnection,
    type_id: i32,
    changes: &NewAnomalyType,
) -> CatalogResult<()> {
    let updated = diesel::update(anomaly_types::table.find(type_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "anomaly type",
            id: type_id,
        });
    }
    Ok(())
}

pub fn delete_anomaly_type(conn: &mut SqliteConnection, type_id: i32) -> CatalogResult<()> {
    let dependents: i64 = observed_anomalies::table
        .filter(observed_anomalies::anomaly_type_id.eq(type_id))
        .count()
        .get_result::<i64>(conn)?
        + system_anomalies::table
            .filter(system_anomalies::anomaly_type_id.eq(type_id))
            .count()
            .get_result::<i64>(conn)?;
    if dependents > 0 {
        return Err(CatalogError::InUse {
            entity: "anomaly type",
            id: type_id,
            dependents,
        });
    }
    ensure_deleted(
        diesel::delete(anomaly_types::table.find(type_id)).execute(conn)?,
        "anomaly type",
        type_id,
    )
}

// ---- failure modes ----

pub fn create_failure_mode_category(
    conn: &mut SqliteConnection,
    new: &NewFailureModeCategory,
) -> CatalogResult<i32> {
    let id = diesel::insert_into(failure_mode_categories::table)
        .values(new)
        .returning(failure_mode_categories::id)
        .get_result(conn)?;
    Ok(id)
}

pub fn update_failure_mode_category(
    conn: &mut SqliteConnection,
    category_id: i32,
    changes: &NewFailureModeCategory,
) -> CatalogResult<()> {
    let updated = diesel::update(failure_mode_categories::table.find(category_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "failure mode category",
            id: category_id,
        });
    }
    Ok(())
}

pub fn delete_failure_mode_category(
    conn: &mut SqliteConnection,
    category_id: i32,
) -> CatalogResult<()> {
    let dependents: i64 = failure_modes::table
        .filter(failure_modes::category_id.eq(category_id))
        .count()
        .get_result(conn)?;
    if dependents > 0 {
        return Err(CatalogError::InUse {
            entity: "failure mode category",
            id: category_id,
            dependents,
        });
    }
    ensure_deleted(
        diesel::delete(failure_mode_categories::table.find(category_id)).execute(conn)?,
        "failure mode category",
        category_id,
    )
}

/// Registers a failure mode together with the dam types it applies to.
pub fn create_failure_mode(
    conn: &mut SqliteConnection,
    new: &NewFailureMode,
    dam_type_ids: &[i32],
) -> CatalogResult<i32> {
    conn.transaction(|conn| {
        let mode_id: i32 = diesel::insert_into(failure_modes::table)
            .values(new)
            .returning(failure_modes::id)
            .get_result(conn)?;
        insert_dam_type_links(conn, mode_id, dam_type_ids)?;
        Ok(mode_id)
    })
}

pub fn update_failure_mode(
    conn: &mut SqliteConnection,
    mode_id: i32,
    changes: &NewFailureMode,
) -> CatalogResult<()> {
    let updated = diesel::update(failure_modes::table.find(mode_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "failure mode",
            id: mode_id,
        });
    }
    Ok(())
}

/// Rewrites the failure mode / dam type association wholesale inside one
/// transaction, so readers never observe the emptied link set.
pub fn replace_failure_mode_dam_types(
    conn: &mut SqliteConnection,
    mode_id: i32,
    dam_type_ids: &[i32],
) -> CatalogResult<()> {
    conn.transaction(|conn| {
        diesel::delete(
            failure_mode_dam_types::table
                .filter(failure_mode_dam_types::failure_mode_id.eq(mode_id)),
        )
        .execute(conn)?;
        insert_dam_type_links(conn, mode_id, dam_type_ids)
    })
}

fn insert_dam_type_links(
    conn: &mut SqliteConnection,
    mode_id: i32,
    dam_type_ids: &[i32],
) -> CatalogResult<()> {
    if dam_type_ids.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = dam_type_ids
        .iter()
        .map(|type_id| {
            (
                failure_mode_dam_types::failure_mode_id.eq(mode_id),
                failure_mode_dam_types::dam_type_id.eq(*type_id),
            )
        })
        .collect();
    diesel::insert_into(failure_mode_dam_types::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

pub fn delete_failure_mode(conn: &mut SqliteConnection, mode_id: i32) -> CatalogResult<()> {
    let dependents: i64 = system_anomalies::table
        .filter(system_anomalies::failure_mode_id.eq(mode_id))
        .count()
        .get_result(conn)?;
    if dependents > 0 {
        return Err(CatalogError::InUse {
            entity: "failure mode",
            id: mode_id,
            dependents,
        });
    }
    conn.transaction(|conn| {
        diesel::delete(
            failure_mode_dam_types::table
                .filter(failure_mode_dam_types::failure_mode_id.eq(mode_id)),
        )
        .execute(conn)?;
        ensure_deleted(
            diesel::delete(failure_modes::table.find(mode_id)).execute(conn)?,
            "failure mode",
            mode_id,
        )
    })
}

// ---- catalog anomalies ----

/// Registers an expected anomaly for a failure mode, with the zones and
/// materials where that mechanism is plausible. A failure mode may carry at
/// most one catalog anomaly per anomaly type.
pub fn create_system_anomaly(
    conn: &mut SqliteConnection,
    new: &NewSystemAnomaly,
    zone_ids: &[i32],
    material_ids: &[i32],
) -> CatalogResult<i32> {
    let s = settings();
    if new.weight < s.scoring.weight_min || new.weight > s.scoring.weight_max {
        return Err(CatalogError::WeightOutOfRange(
            new.weight,
            s.scoring.weight_min,
            s.scoring.weight_max,
        ));
    }

    let duplicate: Option<i32> = system_anomalies::table
        .filter(system_anomalies::failure_mode_id.eq(new.failure_mode_id))
        .filter(system_anomalies::anomaly_type_id.eq(new.anomaly_type_id))
        .select(system_anomalies::id)
        .first(conn)
        .optional()?;
    if duplicate.is_some() {
        return Err(CatalogError::DuplicateCatalogPair {
            failure_mode_id: new.failure_mode_id,
            anomaly_type_id: new.anomaly_type_id,
        });
    }

    conn.transaction(|conn| {
        let anomaly_id: i32 = diesel::insert_into(system_anomalies::table)
            .values(new)
            .returning(system_anomalies::id)
            .get_result(conn)?;
        insert_zone_links(conn, anomaly_id, zone_ids)?;
        insert_material_links(conn, anomaly_id, material_ids)?;
        Ok(anomaly_id)
    })
}

/// Rewrites a catalog anomaly's own columns. The weight bounds and the
/// one-anomaly-per-type rule hold on update too, so a retargeted anomaly
/// cannot collide with a sibling pair.
pub fn update_system_anomaly(
    conn: &mut SqliteConnection,
    anomaly_id: i32,
    changes: &NewSystemAnomaly,
) -> CatalogResult<()> {
    let s = settings();
    if changes.weight < s.scoring.weight_min || changes.weight > s.scoring.weight_max {
        return Err(CatalogError::WeightOutOfRange(
            changes.weight,
            s.scoring.weight_min,
            s.scoring.weight_max,
        ));
    }

    let duplicate: Option<i32> = system_anomalies::table
        .filter(system_anomalies::failure_mode_id.eq(changes.failure_mode_id))
        .filter(system_anomalies::anomaly_type_id.eq(changes.anomaly_type_id))
        .filter(system_anomalies::id.ne(anomaly_id))
        .select(system_anomalies::id)
        .first(conn)
        .optional()?;
    if duplicate.is_some() {
        return Err(CatalogError::DuplicateCatalogPair {
            failure_mode_id: changes.failure_mode_id,
            anomaly_type_id: changes.anomaly_type_id,
        });
    }

    let updated = diesel::update(system_anomalies::table.find(anomaly_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "catalog anomaly",
            id: anomaly_id,
        });
    }
    Ok(())
}

pub fn replace_system_anomaly_zones(
    conn: &mut SqliteConnection,
    anomaly_id: i32,
    zone_ids: &[i32],
) -> CatalogResult<()> {
    conn.transaction(|conn| {
        diesel::delete(
            system_anomaly_zones::table
                .filter(system_anomaly_zones::system_anomaly_id.eq(anomaly_id)),
        )
        .execute(conn)?;
        insert_zone_links(conn, anomaly_id, zone_ids)
    })
}

pub fn replace_system_anomaly_materials(
    conn: &mut SqliteConnection,
    anomaly_id: i32,
    material_ids: &[i32],
) -> CatalogResult<()> {
    conn.transaction(|conn| {
        diesel::delete(
            system_anomaly_materials::table
                .filter(system_anomaly_materials::system_anomaly_id.eq(anomaly_id)),
        )
        .execute(conn)?;
        insert_material_links(conn, anomaly_id, material_ids)
    })
}

fn insert_zone_links(
    conn: &mut SqliteConnection,
    anomaly_id: i32,
    zone_ids: &[i32],
) -> CatalogResult<()> {
    if zone_ids.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = zone_ids
        .iter()
        .map(|zone_id| {
            (
                system_anomaly_zones::system_anomaly_id.eq(anomaly_id),
                system_anomaly_zones::zone_id.eq(*zone_id),
            )
        })
        .collect();
    diesel::insert_into(system_anomaly_zones::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

fn insert_material_links(
    conn: &mut SqliteConnection,
    anomaly_id: i32,
    material_ids: &[i32],
) -> CatalogResult<()> {
    if material_ids.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = material_ids
        .iter()
        .map(|material_id| {
            (
                system_anomaly_materials::system_anomaly_id.eq(anomaly_id),
                system_anomaly_materials::material_type_id.eq(*material_id),
            )
        })
        .collect();
    diesel::insert_into(system_anomaly_materials::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

pub fn delete_system_anomaly(conn: &mut SqliteConnection, anomaly_id: i32) -> CatalogResult<()> {
    conn.transaction(|conn| {
        diesel::delete(
            system_anomaly_zones::table
                .filter(system_anomaly_zones::system_anomaly_id.eq(anomaly_id)),
        )
        .execute(conn)?;
        diesel::delete(
            system_anomaly_materials::table
                .filter(system_anomaly_materials::system_anomaly_id.eq(anomaly_id)),
        )
        .execute(conn)?;
        ensure_deleted(
            diesel::delete(system_anomalies::table.find(anomaly_id)).execute(conn)?,
            "catalog anomaly",
            anomaly_id,
        )
    })
}

// ---- dams and observations ----

pub fn register_dam(conn: &mut SqliteConnection, new: &NewDam) -> CatalogResult<i32> {
    let id = diesel::insert_into(dams::table)
        .values(new)
        .returning(dams::id)
        .get_result(conn)?;
    Ok(id)
}

pub fn update_dam(conn: &mut SqliteConnection, dam_id: i32, changes: &NewDam) -> CatalogResult<()> {
    let updated = diesel::update(dams::table.find(dam_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "dam",
            id: dam_id,
        });
    }
    Ok(())
}

pub fn delete_dam(conn: &mut SqliteConnection, dam_id: i32) -> CatalogResult<()> {
    let dependents: i64 = observed_anomalies::table
        .filter(observed_anomalies::dam_id.eq(dam_id))
        .count()
        .get_result::<i64>(conn)?
        + analysis_contexts::table
            .filter(analysis_contexts::dam_id.eq(dam_id))
            .count()
            .get_result::<i64>(conn)?;
    if dependents > 0 {
        return Err(CatalogError::InUse {
            entity: "dam",
            id: dam_id,
            dependents,
        });
    }
    ensure_deleted(
        diesel::delete(dams::table.find(dam_id)).execute(conn)?,
        "dam",
        dam_id,
    )
}

pub fn record_observed_anomaly(
    conn: &mut SqliteConnection,
    new: &NewObservedAnomaly,
) -> CatalogResult<i32> {
    if new.detection_sources().is_empty() {
        return Err(CatalogError::NoDetectionSource);
    }
    let id = diesel::insert_into(observed_anomalies::table)
        .values(new)
        .returning(observed_anomalies::id)
        .get_result(conn)?;
    Ok(id)
}

pub fn update_observed_anomaly(
    conn: &mut SqliteConnection,
    observation_id: i32,
    changes: &NewObservedAnomaly,
) -> CatalogResult<()> {
    if changes.detection_sources().is_empty() {
        return Err(CatalogError::NoDetectionSource);
    }
    let updated = diesel::update(observed_anomalies::table.find(observation_id))
        .set(changes)
        .execute(conn)?;
    if updated == 0 {
        return Err(CatalogError::NotFound {
            entity: "observation",
            id: observation_id,
        });
    }
    Ok(())
}

pub fn delete_observed_anomaly(
    conn: &mut SqliteConnection,
    observation_id: i32,
) -> CatalogResult<()> {
    ensure_deleted(
        diesel::delete(observed_anomalies::table.find(observation_id)).execute(conn)?,
        "observation",
        observation_id,
    )
}

fn ensure_deleted(deleted: usize, entity: &'static str, id: i32) -> CatalogResult<()> {
    if deleted == 0 {
        return Err(CatalogError::NotFound { entity, id });
    }
    Ok(())
}

// ---- defaults ----

const DEFAULT_DAM_TYPES: &[(&str, &str)] = &[
    ("Homogeneous", "Dam built from a single material"),
    ("Earth and Rockfill", "Earth core with rockfill shells"),
    ("Concrete-Face Rockfill", "Rockfill dam with a concrete face"),
    (
        "Asphalt-Core Rockfill",
        "Rockfill dam with an impervious bituminous core",
    ),
];

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Internal Erosion", "Internal erosion of soils in the embankment or foundation"),
    ("Mass Movement", "Static instability of large masses"),
    ("Hydraulic Failure", "Failures driven by reservoir water levels"),
];

const DEFAULT_ZONES: &[(&str, &str)] = &[
    ("Core", "Central zone of the dam"),
    ("Filter", "Filter zone"),
    ("Upstream Rockfill", "Rockfill on the upstream face"),
    ("Downstream Rockfill", "Rockfill on the downstream face"),
    ("Foundation", "Foundation zone"),
    ("Crest", "Dam crest"),
    ("Upstream Slope", "Slope of the upstream face"),
    ("Downstream Slope", "Slope of the downstream face"),
    ("Drain", "Drainage system"),
    ("Concrete Face", "Concrete face (CFRD dams)"),
];

/// Seeds the standard dam types, failure mode categories and dam zones when
/// the corresponding table is still empty. Safe to run at every startup.
pub fn seed_defaults(conn: &mut SqliteConnection) -> CatalogResult<()> {
    let dam_type_count: i64 = dam_types::table.count().get_result(conn)?;
    if dam_type_count == 0 {
        for (name, description) in DEFAULT_DAM_TYPES {
            create_dam_type(
                conn,
                &NewDamType {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    technical_reference: None,
                    image_path: None,
                },
            )?;
        }
        info!(count = DEFAULT_DAM_TYPES.len(), "seeded default dam types");
    }

    let category_count: i64 = failure_mode_categories::table.count().get_result(conn)?;
    if category_count == 0 {
        for (name, description) in DEFAULT_CATEGORIES {
            create_failure_mode_category(
                conn,
                &NewFailureModeCategory {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    technical_reference: None,
                },
            )?;
        }
        info!(
            count = DEFAULT_CATEGORIES.len(),
            "seeded default failure mode categories"
        );
    }

    let zone_count: i64 = zones::table.count().get_result(conn)?;
    if zone_count == 0 {
        for (name, description) in DEFAULT_ZONES {
            create_zone(
                conn,
                &NewZone {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                },
            )?;
        }
        info!(count = DEFAULT_ZONES.len(), "seeded default zones");
    }

    Ok(())
}
