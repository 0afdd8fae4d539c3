use sqlx::PgPool;

pub async fn reset_database(pool: &PgPool) {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .expect("Failed to run migrations for tests");

    sqlx::query("TRUNCATE earnings, referrals, referral_attempts, users RESTART IDENTITY CASCADE")
        .execute(pool)
        .await
        .expect("Failed to truncate tables for tests");
}
