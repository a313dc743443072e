use crate::DbModelManager;
use anyhow::Result;
use async_trait::async_trait;
use jt_domain::{Amenity, Item, ItemId, PadSize, Ship, ShipId, Station, StationId, System, SystemId};
use mockall::automock;
use sqlx::FromRow;
use std::fmt::Debug;
use tracing::debug;

#[automock]
#[async_trait]
pub trait CatalogBmcTrait: Send + Sync + Debug {
    async fn load_systems(&self) -> Result<Vec<System>>;
    async fn load_stations(&self) -> Result<Vec<Station>>;
    async fn load_items(&self) -> Result<Vec<Item>>;
    async fn load_ships(&self) -> Result<Vec<Ship>>;
}

#[derive(Debug)]
pub struct DbCatalogBmc {
    pub mm: DbModelManager,
}

#[derive(Debug, FromRow)]
struct DbSystemRow {
    system_id: i64,
    name: String,
    pos_x: f64,
    pos_y: f64,
    pos_z: f64,
}

#[derive(Debug, FromRow)]
struct DbStationRow {
    station_id: i64,
    system_id: i64,
    system_name: String,
    name: String,
    ls_from_star: f64,
    blackmarket: String,
    max_pad_size: String,
    shipyard: String,
    outfitting: String,
    refuel: String,
    item_count: i64,
}

#[derive(Debug, FromRow)]
struct DbItemRow {
    item_id: i64,
    name: String,
    category: String,
}

#[derive(Debug, FromRow)]
struct DbShipRow {
    ship_id: i64,
    name: String,
    capacity: i64,
    max_ly_full: f64,
    max_ly_empty: f64,
}

#[async_trait]
impl CatalogBmcTrait for DbCatalogBmc {
    async fn load_systems(&self) -> Result<Vec<System>> {
        let rows: Vec<DbSystemRow> = sqlx::query_as(
            r#"
select system_id, name, pos_x, pos_y, pos_z
  from System
 order by system_id
        "#,
        )
        .fetch_all(self.mm.pool())
        .await?;

        debug!("loaded {} systems", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| System {
                id: SystemId(row.system_id),
                name: row.name,
                pos: [row.pos_x, row.pos_y, row.pos_z],
                station_ids: Vec::new(),
            })
            .collect())
    }

    async fn load_stations(&self) -> Result<Vec<Station>> {
        let rows: Vec<DbStationRow> = sqlx::query_as(
            r#"
select s.station_id
     , s.system_id
     , y.name as system_name
     , s.name
     , s.ls_from_star
     , s.blackmarket
     , s.max_pad_size
     , s.shipyard
     , s.outfitting
     , s.refuel
     , s.item_count
  from Station s
  join System y on y.system_id = s.system_id
 order by s.station_id
        "#,
        )
        .fetch_all(self.mm.pool())
        .await?;

        debug!("loaded {} stations", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| Station {
                id: StationId(row.station_id),
                system_id: SystemId(row.system_id),
                system_name: row.system_name,
                name: row.name,
                ls_from_star: row.ls_from_star,
                black_market: Amenity::from_code(&row.blackmarket),
                max_pad_size: PadSize::from_code(&row.max_pad_size),
                shipyard: Amenity::from_code(&row.shipyard),
                outfitting: Amenity::from_code(&row.outfitting),
                refuel: Amenity::from_code(&row.refuel),
                item_count: row.item_count.max(0) as u32,
            })
            .collect())
    }

    async fn load_items(&self) -> Result<Vec<Item>> {
        let rows: Vec<DbItemRow> = sqlx::query_as(
            r#"
select item_id, name, category
  from Item
 order by item_id
        "#,
        )
        .fetch_all(self.mm.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Item {
                id: ItemId(row.item_id),
                name: row.name,
                category: row.category,
            })
            .collect())
    }

    async fn load_ships(&self) -> Result<Vec<Ship>> {
        let rows: Vec<DbShipRow> = sqlx::query_as(
            r#"
select ship_id, name, capacity, max_ly_full, max_ly_empty
  from Ship
 order by ship_id
        "#,
        )
        .fetch_all(self.mm.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Ship {
                id: ShipId(row.ship_id),
                name: row.name,
                capacity: row.capacity.max(0) as u32,
                max_ly_full: row.max_ly_full,
                max_ly_empty: row.max_ly_empty,
            })
            .collect())
    }
}

/// Fixture-backed catalog source for tests and offline use.
#[derive(Debug, Default)]
pub struct InMemoryCatalogBmc {
    systems: Vec<System>,
    stations: Vec<Station>,
    items: Vec<Item>,
    ships: Vec<Ship>,
}

impl InMemoryCatalogBmc {
    pub fn new(systems: Vec<System>, stations: Vec<Station>, items: Vec<Item>, ships: Vec<Ship>) -> Self {
        Self {
            systems,
            stations,
            items,
            ships,
        }
    }
}

#[async_trait]
impl CatalogBmcTrait for InMemoryCatalogBmc {
    async fn load_systems(&self) -> Result<Vec<System>> {
        Ok(self.systems.clone())
    }

    async fn load_stations(&self) -> Result<Vec<Station>> {
        Ok(self.stations.clone())
    }

    async fn load_items(&self) -> Result<Vec<Item>> {
        Ok(self.items.clone())
    }

    async fn load_ships(&self) -> Result<Vec<Ship>> {
        Ok(self.ships.clone())
    }
}
