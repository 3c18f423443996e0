//! Generated vanity address pool row.
//!
//! A row is created by the keypair search engine, stored with its raw
//! key material and generation diagnostics, and later handed out to
//! exactly one claimant. Claimed rows are kept for audit; rows that
//! fail claim-time validation are retired with [`Model::claimed_at`]
//! left empty.

use sea_orm::{entity::prelude::*, FromQueryResult};

/// Vanity address model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vanity_addresses")]
pub struct Model {
    /// Unique vanity address identifier.
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Base58-encoded public key. Globally unique.
    pub public_key: String,

    /// Raw 64-byte key material, secret half followed by public half.
    pub private_key: Vec<u8>,

    /// Suffix family the generation targeted.
    pub suffix_requested: String,

    /// Literal trailing characters of the public key.
    pub suffix_actual: String,

    /// Whether the row can still be claimed.
    pub available: bool,

    /// Insertion timestamp.
    pub created_at: TimeDateTime,

    /// Claim timestamp, set exactly once.
    pub claimed_at: Option<TimeDateTime>,

    /// Search attempts spent producing this row.
    pub generation_attempts: i64,

    /// Search wall-clock time spent producing this row, in seconds.
    pub generation_time_seconds: f64,
}

/// Vanity address model relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Per-row generation cost columns, used for pool statistics.
#[derive(FromQueryResult)]
pub struct GenerationMetrics {
    pub available: bool,
    pub generation_attempts: i64,
    pub generation_time_seconds: f64,
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveValue, ConnectionTrait, Database, EntityTrait, Schema};
    use time::{OffsetDateTime, PrimitiveDateTime};

    use super::*;

    #[tokio::test]
    async fn insert_and_fetch() {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("unable to create test database");

        let schema = Schema::new(db.get_database_backend());
        let table = schema.create_table_from_entity(Entity);
        db.execute(db.get_database_backend().build(&table))
            .await
            .unwrap();

        let now = OffsetDateTime::now_utc();

        Entity::insert(ActiveModel {
            public_key: ActiveValue::Set("6ccQetZuD8XfpCbtz1j8wViBLock".to_owned()),
            private_key: ActiveValue::Set(vec![7; 64]),
            suffix_requested: ActiveValue::Set("LOCK".to_owned()),
            suffix_actual: ActiveValue::Set("Lock".to_owned()),
            available: ActiveValue::Set(true),
            created_at: ActiveValue::Set(PrimitiveDateTime::new(now.date(), now.time())),
            claimed_at: ActiveValue::Set(None),
            generation_attempts: ActiveValue::Set(12_345),
            generation_time_seconds: ActiveValue::Set(1.5),
            ..Default::default()
        })
        .exec_without_returning(&db)
        .await
        .unwrap();

        let row = Entity::find()
            .one(&db)
            .await
            .unwrap()
            .expect("row was stored");

        assert!(row.available);
        assert!(row.claimed_at.is_none());
        assert_eq!(row.suffix_actual, "Lock");
        assert_eq!(row.private_key.len(), 64);
    }
}
