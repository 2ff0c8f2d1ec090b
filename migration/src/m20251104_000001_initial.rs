use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Admins {
    Table,
    Id,
    Email,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Issuers {
    Table,
    Id,
    IssuerId,
    Email,
    Name,
    Approved,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SubscriptionPlans {
    Table,
    Id,
    Code,
    Title,
    Subheader,
    Fee,
    CreditLimit,
    Rate,
    ValidityDays,
    Status,
    LastUpdate,
}

#[derive(DeriveIden)]
enum SubscriptionLedgers {
    Table,
    Id,
    Email,
    IssuerId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SubscriptionAllocations {
    Table,
    Id,
    LedgerId,
    Position,
    PlanTitle,
    PurchasedAt,
    Fee,
    DurationDays,
    AllocatedCredits,
    CurrentCredits,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Admins::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Admins::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Admins::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Admins::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Admins::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Issuers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issuers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Issuers::IssuerId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Issuers::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Issuers::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Issuers::Approved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Issuers::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Issuers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubscriptionPlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionPlans::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionPlans::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionPlans::Title)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionPlans::Subheader)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SubscriptionPlans::Fee).double().not_null())
                    .col(
                        ColumnDef::new(SubscriptionPlans::CreditLimit)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SubscriptionPlans::Rate).double().not_null())
                    .col(
                        ColumnDef::new(SubscriptionPlans::ValidityDays)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(SubscriptionPlans::Status)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SubscriptionPlans::LastUpdate)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubscriptionLedgers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionLedgers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionLedgers::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionLedgers::IssuerId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionLedgers::Status)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SubscriptionLedgers::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionLedgers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubscriptionAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionAllocations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::LedgerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::PlanTitle)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::PurchasedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::Fee)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::DurationDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::AllocatedCredits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::CurrentCredits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionAllocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_allocations_ledger")
                            .from(
                                SubscriptionAllocations::Table,
                                SubscriptionAllocations::LedgerId,
                            )
                            .to(SubscriptionLedgers::Table, SubscriptionLedgers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // append-at-position races surface as unique violations
        manager
            .create_index(
                Index::create()
                    .name("idx_subscription_allocations_ledger_position")
                    .table(SubscriptionAllocations::Table)
                    .col(SubscriptionAllocations::LedgerId)
                    .col(SubscriptionAllocations::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SubscriptionAllocations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SubscriptionLedgers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubscriptionPlans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Issuers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Admins::Table).to_owned())
            .await?;
        Ok(())
    }
}
