use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(States::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(States::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(States::Name).string().not_null())
                    .col(ColumnDef::new(States::Initials).string_len(2).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cities::Name).string().not_null())
                    .col(ColumnDef::new(Cities::StateId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cities_state_id")
                            .from(Cities::Table, Cities::StateId)
                            .to(States::Table, States::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Level).integer().not_null().default(1))
                    .col(ColumnDef::new(Users::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PersonTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PersonTypes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PersonTypes::Name).string_len(60).not_null())
                    .col(ColumnDef::new(PersonTypes::CityId).integer())
                    .col(
                        ColumnDef::new(PersonTypes::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Persons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Persons::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Persons::Name).string().not_null())
                    .col(ColumnDef::new(Persons::CityId).integer().not_null())
                    .col(ColumnDef::new(Persons::PersonTypeId).integer())
                    .col(ColumnDef::new(Persons::ParentId).integer())
                    .col(ColumnDef::new(Persons::LegalType).integer().not_null())
                    .col(ColumnDef::new(Persons::Priority).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Persons::ExportIgnore)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Persons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Persons::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_persons_city_id")
                            .from(Persons::Table, Persons::CityId)
                            .to(Cities::Table, Cities::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_persons_person_type_id")
                            .from(Persons::Table, Persons::PersonTypeId)
                            .to(PersonTypes::Table, PersonTypes::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PersonContacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PersonContacts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PersonContacts::PersonId).integer().not_null())
                    .col(ColumnDef::new(PersonContacts::UserId).integer())
                    .col(ColumnDef::new(PersonContacts::Name).string().not_null())
                    .col(
                        ColumnDef::new(PersonContacts::CanEditOrder)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PersonContacts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_person_contacts_person_id")
                            .from(PersonContacts::Table, PersonContacts::PersonId)
                            .to(Persons::Table, Persons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_person_contacts_user_id")
                            .from(PersonContacts::Table, PersonContacts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Units::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Units::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Units::Name).string().not_null())
                    .col(ColumnDef::new(Units::NameSingular).string().not_null())
                    .col(ColumnDef::new(Units::NamePlural).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(150).not_null())
                    .col(ColumnDef::new(Products::Description).string())
                    .col(ColumnDef::new(Products::UnitId).integer().not_null())
                    .col(
                        ColumnDef::new(Products::Consumable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Products::RequestFormActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Products::Priority).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_unit_id")
                            .from(Products::Table, Products::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_persons_name_city")
                    .table(Persons::Table)
                    .col(Persons::Name)
                    .col(Persons::CityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_person_contacts_user_person")
                    .table(PersonContacts::Table)
                    .col(PersonContacts::UserId)
                    .col(PersonContacts::PersonId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Units::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PersonContacts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Persons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PersonTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(States::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
pub(super) enum States {
    Table,
    Id,
    Name,
    Initials,
}

#[derive(Iden)]
pub(super) enum Cities {
    Table,
    Id,
    Name,
    StateId,
}

#[derive(Iden)]
pub(super) enum Users {
    Table,
    Id,
    Name,
    Email,
    Level,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
pub(super) enum PersonTypes {
    Table,
    Id,
    Name,
    CityId,
    Priority,
}

#[derive(Iden)]
pub(super) enum Persons {
    Table,
    Id,
    Name,
    CityId,
    PersonTypeId,
    ParentId,
    LegalType,
    Priority,
    ExportIgnore,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(super) enum PersonContacts {
    Table,
    Id,
    PersonId,
    UserId,
    Name,
    CanEditOrder,
    IsActive,
}

#[derive(Iden)]
pub(super) enum Units {
    Table,
    Id,
    Name,
    NameSingular,
    NamePlural,
}

#[derive(Iden)]
pub(super) enum Products {
    Table,
    Id,
    Name,
    Description,
    UnitId,
    Consumable,
    RequestFormActive,
    Priority,
    CreatedAt,
    UpdatedAt,
}
