use crate::model::{ItemId, StationId};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("unknown {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },
    #[error("'{name}' could be {kind} '{first}' or '{second}'")]
    Ambiguous {
        kind: &'static str,
        name: String,
        first: String,
        second: String,
    },
    #[error("{table} entry for station {station} / item {item} has an invalid modified timestamp")]
    BadTimestamp {
        table: &'static str,
        station: StationId,
        item: ItemId,
    },
    #[error("no destinations could be reached within the constraints")]
    NoHops,
    #[error("no data: {0}")]
    NoData(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
