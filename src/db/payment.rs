use super::DBClient;
use crate::models::{Payment, PaymentMethod, PaymentStatus, Subscription, SubscriptionPlan};
use chrono::Utc;
use sqlx::types::BigDecimal;
use uuid::Uuid;

const PAYMENT_COLUMNS: &str = "id, user_id, plan_id, amount, currency, status, payment_method, \
     transaction_id, request_id, payment_date";

pub(super) const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, plan_id, payment_id, start_date, end_date, status, auto_renew";

/// A payment request that already passed validation
pub struct NewPayment<'a> {
    pub user_id: Uuid,
    pub plan: &'a SubscriptionPlan,
    pub amount: &'a BigDecimal,
    pub currency: &'a str,
    pub method: PaymentMethod,
    pub request_id: Option<&'a str>,
}

pub trait PaymentExt {
    async fn get_plans(&self, active_only: bool) -> Result<Vec<SubscriptionPlan>, sqlx::Error>;

    async fn get_plan(&self, plan_id: i64) -> Result<Option<SubscriptionPlan>, sqlx::Error>;

    /// Payment history of a user, newest first
    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, sqlx::Error>;

    async fn find_payment_by_request(
        &self,
        user_id: Uuid,
        request_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error>;

    /// Record a completed payment, open the matching subscription and grant
    /// premium access, all in one transaction.
    async fn process_payment(
        &self,
        payment: NewPayment<'_>,
    ) -> Result<(Payment, Subscription), sqlx::Error>;
}

/// Reference handed back by the simulated gateway
fn generate_transaction_id() -> String {
    format!("TX-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

impl PaymentExt for DBClient {
    async fn get_plans(&self, active_only: bool) -> Result<Vec<SubscriptionPlan>, sqlx::Error> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, name, description, price, billing_cycle, features, is_active
            FROM subscription_plans
            WHERE is_active OR NOT $1
            ORDER BY price
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    async fn get_plan(&self, plan_id: i64) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, name, description, price, billing_cycle, features, is_active
            FROM subscription_plans
            WHERE id = $1
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 \
             ORDER BY payment_date DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn find_payment_by_request(
        &self,
        user_id: Uuid,
        request_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 AND request_id = $2"
        ))
        .bind(user_id)
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn process_payment(
        &self,
        payment: NewPayment<'_>,
    ) -> Result<(Payment, Subscription), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let stored = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments
                (user_id, plan_id, amount, currency, status, payment_method, transaction_id, request_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.user_id)
        .bind(payment.plan.id)
        .bind(payment.amount)
        .bind(payment.currency)
        .bind(PaymentStatus::Completed)
        .bind(payment.method)
        .bind(generate_transaction_id())
        .bind(payment.request_id)
        .fetch_one(&mut *tx)
        .await?;

        let start = Utc::now();
        let end = payment.plan.billing_cycle.subscription_end(start);

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (user_id, plan_id, payment_id, start_date, end_date, status, auto_renew)
            VALUES ($1, $2, $3, $4, $5, 'active', TRUE)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(payment.user_id)
        .bind(payment.plan.id)
        .bind(stored.id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET is_premium = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(payment.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((stored, subscription))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SubscriptionExt, UserExt, fixtures};
    use crate::models::SubscriptionStatus;
    use chrono::Duration;
    use sqlx::PgPool;

    fn card_payment<'a>(
        user_id: Uuid,
        plan: &'a SubscriptionPlan,
        request_id: Option<&'a str>,
    ) -> NewPayment<'a> {
        NewPayment {
            user_id,
            plan,
            amount: &plan.price,
            currency: "EUR",
            method: PaymentMethod::Card,
            request_id,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn payment_opens_subscription_and_grants_premium(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let user = fixtures::user(&db).await;
        let plan = fixtures::plan(&pool, "Annual").await;

        let (payment, subscription) = db
            .process_payment(card_payment(user.id, &plan, None))
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.plan_id, Some(plan.id));
        assert_eq!(subscription.payment_id, Some(payment.id));
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert!(subscription.auto_renew);
        assert_eq!(
            subscription.end_date - subscription.start_date,
            Duration::days(365)
        );

        let user = db.get_user(Some(user.id), None, None).await.unwrap().unwrap();
        assert!(user.is_premium);
        assert_eq!(
            db.get_active_subscription(user.id).await.unwrap().map(|s| s.id),
            Some(subscription.id)
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn monthly_plan_lasts_thirty_days(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let user = fixtures::user(&db).await;
        let plan = fixtures::plan(&pool, "Monthly").await;

        let (_, subscription) = db
            .process_payment(card_payment(user.id, &plan, None))
            .await
            .unwrap();

        assert_eq!(
            subscription.end_date - subscription.start_date,
            Duration::days(30)
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reused_request_id_writes_nothing(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let user = fixtures::user(&db).await;
        let plan = fixtures::plan(&pool, "Monthly").await;

        let (payment, _) = db
            .process_payment(card_payment(user.id, &plan, Some("req-1")))
            .await
            .unwrap();

        let err = db
            .process_payment(card_payment(user.id, &plan, Some("req-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(ref e) if e.is_unique_violation()));

        // Nothing from the failed attempt was kept
        assert_eq!(db.get_user_payments(user.id).await.unwrap().len(), 1);
        assert_eq!(db.get_user_subscriptions(user.id).await.unwrap().len(), 1);
        assert_eq!(
            db.find_payment_by_request(user.id, "req-1")
                .await
                .unwrap()
                .map(|p| p.id),
            Some(payment.id)
        );
    }

    #[test]
    fn transaction_ids_are_prefixed_and_unique() {
        let first = generate_transaction_id();
        let second = generate_transaction_id();
        assert!(first.starts_with("TX-"));
        assert_eq!(first.len(), 35);
        assert_ne!(first, second);
    }
}
