use super::DBClient;
use super::payment::SUBSCRIPTION_COLUMNS;
use crate::models::Subscription;
use uuid::Uuid;

pub trait SubscriptionExt {
    /// Subscriptions of a user, newest first
    async fn get_user_subscriptions(&self, user_id: Uuid)
    -> Result<Vec<Subscription>, sqlx::Error>;

    /// The active subscription ending last, if any
    async fn get_active_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    async fn get_subscription_by_payment(
        &self,
        payment_id: i64,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    /// Stop renewal of a subscription owned by `user_id`.
    /// Status and end date stay as they are. None if the id is not the user's.
    async fn cancel_subscription(
        &self,
        user_id: Uuid,
        subscription_id: i64,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    /// Expire active subscriptions whose end date has passed and revoke premium
    /// from users left without an active one.
    /// Returns (subscriptions expired, users downgraded).
    async fn expire_subscriptions(&self) -> Result<(u64, u64), sqlx::Error>;
}

impl SubscriptionExt for DBClient {
    async fn get_user_subscriptions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1 \
             ORDER BY start_date DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    async fn get_active_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
            WHERE user_id = $1 AND status = 'active' AND end_date > NOW()
            ORDER BY end_date DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    async fn get_subscription_by_payment(
        &self,
        payment_id: i64,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE payment_id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    async fn cancel_subscription(
        &self,
        user_id: Uuid,
        subscription_id: i64,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            UPDATE subscriptions
            SET auto_renew = FALSE
            WHERE id = $1 AND user_id = $2
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(subscription_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    async fn expire_subscriptions(&self) -> Result<(u64, u64), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(
            "UPDATE subscriptions SET status = 'expired' WHERE status = 'active' AND end_date <= NOW()",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Separate statement so it sees the rows expired above
        let downgraded = sqlx::query(
            r#"
            UPDATE users u
            SET is_premium = FALSE, updated_at = NOW()
            WHERE u.is_premium
              AND EXISTS (
                  SELECT 1 FROM subscriptions s
                  WHERE s.user_id = u.id AND s.status = 'expired'
              )
              AND NOT EXISTS (
                  SELECT 1 FROM subscriptions s
                  WHERE s.user_id = u.id AND s.status = 'active'
              )
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok((expired, downgraded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewPayment, PaymentExt, UserExt, fixtures};
    use crate::models::{PaymentMethod, SubscriptionStatus};
    use sqlx::PgPool;

    async fn subscribed_user(db: &DBClient, pool: &PgPool) -> (Uuid, Subscription) {
        let user = fixtures::user(db).await;
        let plan = fixtures::plan(pool, "Monthly").await;
        let (_, subscription) = db
            .process_payment(NewPayment {
                user_id: user.id,
                plan: &plan,
                amount: &plan.price,
                currency: "EUR",
                method: PaymentMethod::Card,
                request_id: None,
            })
            .await
            .unwrap();
        (user.id, subscription)
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cancel_only_stops_renewal(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let (user_id, subscription) = subscribed_user(&db, &pool).await;

        let cancelled = db
            .cancel_subscription(user_id, subscription.id)
            .await
            .unwrap()
            .unwrap();

        assert!(!cancelled.auto_renew);
        assert_eq!(cancelled.status, SubscriptionStatus::Active);
        assert_eq!(cancelled.end_date, subscription.end_date);
        assert!(db.get_active_subscription(user_id).await.unwrap().is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cannot_cancel_someone_elses_subscription(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let (_, subscription) = subscribed_user(&db, &pool).await;
        let stranger = fixtures::user(&db).await;

        let result = db
            .cancel_subscription(stranger.id, subscription.id)
            .await
            .unwrap();
        assert!(result.is_none());

        let untouched = db
            .get_subscription_by_payment(subscription.payment_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(untouched.auto_renew);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn sweep_expires_lapsed_subscriptions(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let (lapsed_user, lapsed) = subscribed_user(&db, &pool).await;
        let (current_user, _) = subscribed_user(&db, &pool).await;

        sqlx::query("UPDATE subscriptions SET end_date = NOW() - INTERVAL '1 day' WHERE id = $1")
            .bind(lapsed.id)
            .execute(&pool)
            .await
            .unwrap();

        let (expired, downgraded) = db.expire_subscriptions().await.unwrap();
        assert_eq!((expired, downgraded), (1, 1));

        let subscriptions = db.get_user_subscriptions(lapsed_user).await.unwrap();
        assert_eq!(subscriptions[0].status, SubscriptionStatus::Expired);

        let lapsed_user = db.get_user(Some(lapsed_user), None, None).await.unwrap().unwrap();
        let current_user = db.get_user(Some(current_user), None, None).await.unwrap().unwrap();
        assert!(!lapsed_user.is_premium);
        assert!(current_user.is_premium);

        // Nothing left to expire
        assert_eq!(db.expire_subscriptions().await.unwrap(), (0, 0));
    }
}
