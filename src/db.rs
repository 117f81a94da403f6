use crate::schema::{analysis_contexts, dam_types, dams, observed_anomalies};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde::Serialize;
use strum::Display;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn establish_pool(database_url: &str, max_size: u32) -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .expect("Failed to create pool")
}

pub fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA busy_timeout = 2000;")?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")?;
    conn.batch_execute("PRAGMA synchronous = NORMAL;")?;
    conn.batch_execute("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

pub fn run_migrations(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;
    Ok(())
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::dam_types)]
pub struct DamType {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub technical_reference: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::dam_types)]
pub struct NewDamType {
    pub name: String,
    pub description: Option<String>,
    pub technical_reference: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::material_types)]
pub struct MaterialType {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::material_types)]
pub struct NewMaterialType {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::zones)]
pub struct Zone {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::zones)]
pub struct NewZone {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::anomaly_types)]
pub struct AnomalyType {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::anomaly_types)]
pub struct NewAnomalyType {
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::failure_mode_categories)]
pub struct FailureModeCategory {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub technical_reference: Option<String>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::failure_mode_categories)]
pub struct NewFailureModeCategory {
    pub name: String,
    pub description: Option<String>,
    pub technical_reference: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::failure_modes)]
pub struct FailureMode {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub technical_reference: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::failure_modes)]
pub struct NewFailureMode {
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub technical_reference: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::dams)]
pub struct Dam {
    pub id: i32,
    pub name: String,
    pub dam_type_id: i32,
    pub location: Option<String>,
    pub height_m: Option<f32>,
    pub length_m: Option<f32>,
    pub crest_height_ratio: Option<f32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::dams)]
pub struct NewDam {
    pub name: String,
    pub dam_type_id: i32,
    pub location: Option<String>,
    pub height_m: Option<f32>,
    pub length_m: Option<f32>,
    pub crest_height_ratio: Option<f32>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::system_anomalies)]
pub struct SystemAnomaly {
    pub id: i32,
    pub failure_mode_id: i32,
    pub anomaly_type_id: i32,
    pub severity: Option<f32>,
    pub weight: f32,
    pub image_path: Option<String>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::system_anomalies)]
pub struct NewSystemAnomaly {
    pub failure_mode_id: i32,
    pub anomaly_type_id: i32,
    pub severity: Option<f32>,
    pub weight: f32,
    pub image_path: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::observed_anomalies)]
pub struct ObservedAnomaly {
    pub id: i32,
    pub dam_id: i32,
    pub anomaly_type_id: i32,
    pub zone_id: i32,
    pub material_type_id: i32,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub source_visual_inspection: bool,
    pub source_instrumentation: bool,
    pub source_drone: bool,
    pub source_insar: bool,
    pub source_satellite: bool,
    pub observed_on: NaiveDate,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::observed_anomalies)]
pub struct NewObservedAnomaly {
    pub dam_id: i32,
    pub anomaly_type_id: i32,
    pub zone_id: i32,
    pub material_type_id: i32,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub source_visual_inspection: bool,
    pub source_instrumentation: bool,
    pub source_drone: bool,
    pub source_insar: bool,
    pub source_satellite: bool,
    pub observed_on: NaiveDate,
}

/// How a field observation was detected. At least one source is required
/// before an observation is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum DetectionSource {
    #[strum(serialize = "visual inspection")]
    VisualInspection,
    #[strum(serialize = "instrumentation")]
    Instrumentation,
    #[strum(serialize = "drone")]
    Drone,
    #[strum(serialize = "InSAR")]
    Insar,
    #[strum(serialize = "satellite")]
    Satellite,
}

fn collect_sources(
    visual: bool,
    instrumentation: bool,
    drone: bool,
    insar: bool,
    satellite: bool,
) -> Vec<DetectionSource> {
    let flags = [
        (visual, DetectionSource::VisualInspection),
        (instrumentation, DetectionSource::Instrumentation),
        (drone, DetectionSource::Drone),
        (insar, DetectionSource::Insar),
        (satellite, DetectionSource::Satellite),
    ];
    flags
        .into_iter()
        .filter_map(|(set, source)| set.then_some(source))
        .collect()
}

impl ObservedAnomaly {
    pub fn detection_sources(&self) -> Vec<DetectionSource> {
        collect_sources(
            self.source_visual_inspection,
            self.source_instrumentation,
            self.source_drone,
            self.source_insar,
            self.source_satellite,
        )
    }
}

impl NewObservedAnomaly {
    pub fn detection_sources(&self) -> Vec<DetectionSource> {
        collect_sources(
            self.source_visual_inspection,
            self.source_instrumentation,
            self.source_drone,
            self.source_insar,
            self.source_satellite,
        )
    }
}

pub fn get_dam_with_type(
    conn: &mut SqliteConnection,
    dam_id_val: i32,
) -> QueryResult<Option<(Dam, DamType)>> {
    dams::table
        .inner_join(dam_types::table)
        .filter(dams::id.eq(dam_id_val))
        .select((Dam::as_select(), DamType::as_select()))
        .first(conn)
        .optional()
}

pub fn list_dams(conn: &mut SqliteConnection) -> QueryResult<Vec<(Dam, DamType)>> {
    dams::table
        .inner_join(dam_types::table)
        .select((Dam::as_select(), DamType::as_select()))
        .order(dams::name.asc())
        .load(conn)
}

pub fn list_dam_types(conn: &mut SqliteConnection) -> QueryResult<Vec<DamType>> {
    dam_types::table
        .select(DamType::as_select())
        .order(dam_types::name.asc())
        .load(conn)
}

pub fn list_zones(conn: &mut SqliteConnection) -> QueryResult<Vec<Zone>> {
    use crate::schema::zones;
    zones::table
        .select(Zone::as_select())
        .order(zones::name.asc())
        .load(conn)
}

pub fn list_material_types(conn: &mut SqliteConnection) -> QueryResult<Vec<MaterialType>> {
    use crate::schema::material_types;
    material_types::table
        .select(MaterialType::as_select())
        .order(material_types::name.asc())
        .load(conn)
}

pub fn list_anomaly_types(conn: &mut SqliteConnection) -> QueryResult<Vec<AnomalyType>> {
    use crate::schema::anomaly_types;
    anomaly_types::table
        .select(AnomalyType::as_select())
        .order(anomaly_types::name.asc())
        .load(conn)
}

pub fn list_failure_modes(
    conn: &mut SqliteConnection,
) -> QueryResult<Vec<(FailureMode, FailureModeCategory)>> {
    use crate::schema::{failure_mode_categories, failure_modes};
    failure_modes::table
        .inner_join(failure_mode_categories::table)
        .select((FailureMode::as_select(), FailureModeCategory::as_select()))
        .order(failure_modes::name.asc())
        .load(conn)
}

/// Catalog anomalies of one failure mode with their anomaly-type names.
pub fn system_anomalies_for_mode(
    conn: &mut SqliteConnection,
    mode_id: i32,
) -> QueryResult<Vec<(SystemAnomaly, String)>> {
    use crate::schema::{anomaly_types, system_anomalies};
    system_anomalies::table
        .inner_join(anomaly_types::table)
        .filter(system_anomalies::failure_mode_id.eq(mode_id))
        .select((SystemAnomaly::as_select(), anomaly_types::name))
        .load(conn)
}

/// Observations joined with their anomaly-type, zone and material names, for
/// listing outside the scoring path.
pub fn observed_anomalies_with_names(
    conn: &mut SqliteConnection,
    dam_id_val: i32,
) -> QueryResult<Vec<(ObservedAnomaly, String, String, String)>> {
    use crate::schema::{anomaly_types, material_types, zones};

    observed_anomalies::table
        .inner_join(anomaly_types::table)
        .inner_join(zones::table)
        .inner_join(material_types::table)
        .filter(observed_anomalies::dam_id.eq(dam_id_val))
        .select((
            ObservedAnomaly::as_select(),
            anomaly_types::name,
            zones::name,
            material_types::name,
        ))
        .order(observed_anomalies::observed_on.desc())
        .load(conn)
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::analysis_contexts)]
struct NewAnalysisContext {
    user_id: i32,
    dam_id: i32,
}

/// Marks `dam_id` as the dam under analysis for `user_id`. At most one dam is
/// active per user; reselection replaces the previous row wholesale.
pub fn select_dam_for_analysis(
    conn: &mut SqliteConnection,
    user_id_val: i32,
    dam_id_val: i32,
) -> QueryResult<()> {
    diesel::replace_into(analysis_contexts::table)
        .values(&NewAnalysisContext {
            user_id: user_id_val,
            dam_id: dam_id_val,
        })
        .execute(conn)?;
    Ok(())
}

pub fn dam_under_analysis(
    conn: &mut SqliteConnection,
    user_id_val: i32,
) -> QueryResult<Option<i32>> {
    analysis_contexts::table
        .filter(analysis_contexts::user_id.eq(user_id_val))
        .select(analysis_contexts::dam_id)
        .first(conn)
        .optional()
}

