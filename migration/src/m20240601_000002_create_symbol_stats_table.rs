use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(SymbolStats::Table)
                .if_not_exists()
                .col(ColumnDef::new(SymbolStats::Symbol).string().not_null().primary_key())
                .col(ColumnDef::new(SymbolStats::AvgVolume30d).double().not_null())
                .col(ColumnDef::new(SymbolStats::UpdatedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SymbolStats::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum SymbolStats {
    Table,
    Symbol,
    #[iden = "avg_volume_30d"]
    AvgVolume30d,
    UpdatedAt,
}
