use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::repositories::{
    attempt::AttemptRepository, earnings::EarningsRepository, referral::ReferralRepository, user::UserRepository,
    DbResult,
};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Clone)]
pub struct DbPersistence {
    pub users: UserRepository,
    pub referrals: ReferralRepository,
    pub earnings: EarningsRepository,
    pub attempts: AttemptRepository,

    pub pool: PgPool,
}

impl DbPersistence {
    pub async fn new(database_url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let users = UserRepository::new(&pool);
        let referrals = ReferralRepository::new(&pool);
        let earnings = EarningsRepository::new(&pool);
        let attempts = AttemptRepository::new(&pool);

        Ok(Self {
            users,
            referrals,
            earnings,
            attempts,
            pool,
        })
    }

    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
