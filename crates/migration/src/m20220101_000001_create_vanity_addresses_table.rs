use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VanityAddresses::Table)
                    .col(
                        ColumnDef::new(VanityAddresses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VanityAddresses::PublicKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(VanityAddresses::PrivateKey)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VanityAddresses::SuffixRequested)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VanityAddresses::SuffixActual)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VanityAddresses::Available)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(VanityAddresses::CreatedAt)
                            .timestamp()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_string()),
                    )
                    .col(ColumnDef::new(VanityAddresses::ClaimedAt).timestamp())
                    .col(
                        ColumnDef::new(VanityAddresses::GenerationAttempts)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VanityAddresses::GenerationTimeSeconds)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-vanity-addresses-available-suffix")
                    .table(VanityAddresses::Table)
                    .col(VanityAddresses::Available)
                    .col(VanityAddresses::SuffixRequested)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-vanity-addresses-created-at")
                    .table(VanityAddresses::Table)
                    .col(VanityAddresses::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VanityAddresses::Table).to_owned())
            .await
    }
}

/// Learn more at https://docs.rs/sea-query#iden
#[derive(Iden)]
pub(crate) enum VanityAddresses {
    Table,
    Id,
    PublicKey,
    PrivateKey,
    SuffixRequested,
    SuffixActual,
    Available,
    CreatedAt,
    ClaimedAt,
    GenerationAttempts,
    GenerationTimeSeconds,
}
