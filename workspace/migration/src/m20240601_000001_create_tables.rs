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
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create sessions table
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(pk_auto(Sessions::Id))
                    .col(integer(Sessions::UserId))
                    .col(string(Sessions::Token).unique_key())
                    .col(timestamp_with_time_zone(Sessions::CreatedAt))
                    .col(timestamp_with_time_zone(Sessions::ExpiresAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_user")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::UserId))
                    .col(string(Transactions::Name))
                    .col(decimal_len(Transactions::Amount, 16, 4))
                    .col(string_len(Transactions::Kind, 10))
                    .col(string_null(Transactions::Category))
                    .col(boolean(Transactions::IsPaid).default(true))
                    .col(timestamp_with_time_zone(Transactions::CreatedAt))
                    // deliberately not a foreign key, generated rows outlive their template
                    .col(integer_null(Transactions::RecurringExpenseId))
                    .col(string_len_null(Transactions::BillingPeriod, 7))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_user")
                            .from(Transactions::Table, Transactions::UserId)
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
                    .name("idx_transactions_user_created_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // One generated row per template and month
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_recurring_period")
                    .table(Transactions::Table)
                    .col(Transactions::RecurringExpenseId)
                    .col(Transactions::BillingPeriod)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create recurring_expenses table
        manager
            .create_table(
                Table::create()
                    .table(RecurringExpenses::Table)
                    .if_not_exists()
                    .col(pk_auto(RecurringExpenses::Id))
                    .col(integer(RecurringExpenses::UserId))
                    .col(string(RecurringExpenses::Name))
                    .col(decimal_len(RecurringExpenses::Amount, 16, 4))
                    .col(string(RecurringExpenses::Category))
                    .col(integer(RecurringExpenses::Day))
                    .col(timestamp_with_time_zone(RecurringExpenses::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_expense_user")
                            .from(RecurringExpenses::Table, RecurringExpenses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(RecurringExpenses::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
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
    Email,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    Token,
    CreatedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    Name,
    Amount,
    #[sea_orm(iden = "type")]
    Kind,
    Category,
    IsPaid,
    CreatedAt,
    RecurringExpenseId,
    BillingPeriod,
}

#[derive(DeriveIden)]
enum RecurringExpenses {
    Table,
    Id,
    UserId,
    Name,
    Amount,
    Category,
    Day,
    CreatedAt,
}
