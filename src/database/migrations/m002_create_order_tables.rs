use sea_orm_migration::prelude::*;

use super::m001_create_reference_tables::{Persons, Products, Units, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderCategories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderCategories::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::OrderType).integer().not_null())
                    .col(ColumnDef::new(Orders::Status).integer().not_null())
                    .col(ColumnDef::new(Orders::OriginId).integer())
                    .col(ColumnDef::new(Orders::OriginContactId).integer())
                    .col(ColumnDef::new(Orders::DestinationId).integer().not_null())
                    .col(ColumnDef::new(Orders::DestinationContactId).integer())
                    .col(ColumnDef::new(Orders::CategoryId).integer())
                    .col(ColumnDef::new(Orders::EffectiveDate).date().not_null())
                    .col(ColumnDef::new(Orders::Notes).text())
                    .col(ColumnDef::new(Orders::InternalNotes).text())
                    .col(
                        ColumnDef::new(Orders::NeedsReview)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Orders::CreatorId).integer())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_destination_id")
                            .from(Orders::Table, Orders::DestinationId)
                            .to(Persons::Table, Persons::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_origin_id")
                            .from(Orders::Table, Orders::OriginId)
                            .to(Persons::Table, Persons::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_category_id")
                            .from(Orders::Table, Orders::CategoryId)
                            .to(OrderCategories::Table, OrderCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_creator_id")
                            .from(Orders::Table, Orders::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderLineItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderLineItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderLineItems::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderLineItems::ProductId).integer().not_null())
                    .col(ColumnDef::new(OrderLineItems::UnitId).integer().not_null())
                    .col(
                        ColumnDef::new(OrderLineItems::Quantity)
                            .decimal_len(16, 3)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrderLineItems::Notes).text())
                    .col(
                        ColumnDef::new(OrderLineItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderLineItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_line_items_order_id")
                            .from(OrderLineItems::Table, OrderLineItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_line_items_product_id")
                            .from(OrderLineItems::Table, OrderLineItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_line_items_unit_id")
                            .from(OrderLineItems::Table, OrderLineItems::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderConsolidated::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderConsolidated::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrderConsolidated::DestinationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderConsolidated::ProductId).integer().not_null())
                    .col(ColumnDef::new(OrderConsolidated::UnitId).integer().not_null())
                    .col(
                        ColumnDef::new(OrderConsolidated::RequestQuantity)
                            .decimal_len(16, 3)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderConsolidated::SupplyReserveQuantity)
                            .decimal_len(16, 3)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderConsolidated::SupplyTransportQuantity)
                            .decimal_len(16, 3)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderConsolidated::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderConsolidated::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_consolidated_destination_id")
                            .from(OrderConsolidated::Table, OrderConsolidated::DestinationId)
                            .to(Persons::Table, Persons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Not a foreign key: history rows outlive deleted orders
        manager
            .create_table(
                Table::create()
                    .table(OrderHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderHistory::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderHistory::ActorId).integer().not_null())
                    .col(
                        ColumnDef::new(OrderHistory::IsCreation)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OrderHistory::Snapshot).json_binary().not_null())
                    .col(
                        ColumnDef::new(OrderHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_destination_type")
                    .table(Orders::Table)
                    .col(Orders::DestinationId)
                    .col(Orders::OrderType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_line_items_order_product")
                    .table(OrderLineItems::Table)
                    .col(OrderLineItems::OrderId)
                    .col(OrderLineItems::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_consolidated_key")
                    .table(OrderConsolidated::Table)
                    .col(OrderConsolidated::DestinationId)
                    .col(OrderConsolidated::ProductId)
                    .col(OrderConsolidated::UnitId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_history_order_id")
                    .table(OrderHistory::Table)
                    .col(OrderHistory::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderConsolidated::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderLineItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderCategories::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum OrderCategories {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
    OrderType,
    Status,
    OriginId,
    OriginContactId,
    DestinationId,
    DestinationContactId,
    CategoryId,
    EffectiveDate,
    Notes,
    InternalNotes,
    NeedsReview,
    CreatorId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum OrderLineItems {
    Table,
    Id,
    OrderId,
    ProductId,
    UnitId,
    Quantity,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum OrderConsolidated {
    Table,
    Id,
    DestinationId,
    ProductId,
    UnitId,
    RequestQuantity,
    SupplyReserveQuantity,
    SupplyTransportQuantity,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum OrderHistory {
    Table,
    Id,
    OrderId,
    ActorId,
    IsCreation,
    Snapshot,
    CreatedAt,
}
