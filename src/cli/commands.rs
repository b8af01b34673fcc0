pub mod generate_month;
pub mod initdb;
pub mod migrate_and_serve;
pub mod serve;
pub mod summary;

pub use generate_month::generate_month;
pub use initdb::init_database;
pub use migrate_and_serve::migrate_and_serve;
pub use serve::serve;
pub use summary::print_summary;

use anyhow::{Context, Result, anyhow};
use model::entities::user;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, info};

use crate::auth::normalize_email;

/// Connects to the database and resolves the account behind `email`.
async fn connect_for_user(database_url: &str, email: &str) -> Result<(DatabaseConnection, user::Model)> {
    debug!("Database URL: {}", database_url);
    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", database_url))?;
    info!("Successfully connected to database");

    let email = normalize_email(email);
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&db)
        .await?
        .ok_or_else(|| anyhow!("No account registered for {}", email))?;
    debug!("Resolved {} to user {}", email, user.id);

    Ok((db, user))
}
