use crate::schema::{failure_mode_dam_types, failure_modes};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

/// A failure mode registered as applicable to the dam type under analysis.
#[derive(Queryable, Debug, Clone, Serialize)]
pub struct FailureModeCandidate {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
}

/// Every failure mode linked to `dam_type_id` through the association table.
/// An empty result means the dam type cannot be scored; the caller reports
/// that to the user instead of treating it as a fault.
pub fn enumerate_candidates(
    conn: &mut SqliteConnection,
    dam_type_id: i32,
) -> QueryResult<Vec<FailureModeCandidate>> {
    failure_modes::table
        .inner_join(failure_mode_dam_types::table)
        .filter(failure_mode_dam_types::dam_type_id.eq(dam_type_id))
        .select((
            failure_modes::id,
            failure_modes::name,
            failure_modes::description,
            failure_modes::image_path,
        ))
        .order(failure_modes::id.asc())
        .load(conn)
}
