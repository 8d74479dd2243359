use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(string(Users::Name))
                    .col(string(Users::Email))
                    .col(string(Users::PasswordHash))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .col(timestamp_with_time_zone(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("unique_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create meetups table
        manager
            .create_table(
                Table::create()
                    .table(Meetups::Table)
                    .if_not_exists()
                    .col(pk_uuid(Meetups::Id))
                    .col(string(Meetups::Title))
                    .col(string(Meetups::Description).default(""))
                    .col(string(Meetups::Location))
                    .col(timestamp_with_time_zone(Meetups::Date))
                    .col(uuid(Meetups::OrganizerId))
                    .col(uuid_null(Meetups::BannerFileId))
                    .col(timestamp_with_time_zone(Meetups::CreatedAt))
                    .col(timestamp_with_time_zone(Meetups::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meetups_organizer_id")
                            .from(Meetups::Table, Meetups::OrganizerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meetups_date")
                    .table(Meetups::Table)
                    .col(Meetups::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meetups_organizer_id")
                    .table(Meetups::Table)
                    .col(Meetups::OrganizerId)
                    .to_owned(),
            )
            .await?;

        // Create subscriptions table. The meetup date is denormalized into
        // meetup_date so the one-subscription-per-instant rule can be a
        // plain unique constraint.
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(pk_uuid(Subscriptions::Id))
                    .col(uuid(Subscriptions::UserId))
                    .col(uuid(Subscriptions::MeetupId))
                    .col(timestamp_with_time_zone(Subscriptions::MeetupDate))
                    .col(timestamp_with_time_zone(Subscriptions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_user_id")
                            .from(Subscriptions::Table, Subscriptions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_meetup_id")
                            .from(Subscriptions::Table, Subscriptions::MeetupId)
                            .to(Meetups::Table, Meetups::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_meetup_id")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::MeetupId)
                    .to_owned(),
            )
            .await?;

        // Unique constraint backing the double-booking rule
        manager
            .create_index(
                Index::create()
                    .name("unique_subscription_user_instant")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .col(Subscriptions::MeetupDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Meetups::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Meetups {
    Table,
    Id,
    Title,
    Description,
    Location,
    Date,
    OrganizerId,
    BannerFileId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    MeetupId,
    MeetupDate,
    CreatedAt,
}
