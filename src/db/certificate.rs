use super::DBClient;
use crate::dtos::{CertificateDto, CertificateVerificationRow};
use crate::models::Certificate;
use uuid::Uuid;

const CERTIFICATE_COLUMNS: &str =
    "id, user_id, course_id, title, certificate_id, issue_date, expiry_date, is_valid";

const CERTIFICATE_WITH_COURSE: &str = r#"
    SELECT ce.id, ce.certificate_id, ce.user_id, ce.course_id, c.title AS course_title,
           ce.title, ce.issue_date, ce.expiry_date, ce.is_valid
    FROM certificates ce
    JOIN courses c ON c.id = ce.course_id
"#;

pub trait CertificateExt {
    async fn get_certificate_for(
        &self,
        user_id: Uuid,
        course_id: i64,
    ) -> Result<Option<Certificate>, sqlx::Error>;

    /// Issue a certificate unless one already exists for the (user, course) pair.
    /// The flag is true when a new certificate was created.
    async fn issue_certificate(
        &self,
        user_id: Uuid,
        course_id: i64,
        title: &str,
    ) -> Result<(Certificate, bool), sqlx::Error>;

    async fn get_user_certificates(&self, user_id: Uuid)
    -> Result<Vec<CertificateDto>, sqlx::Error>;

    async fn get_all_certificates(&self) -> Result<Vec<CertificateDto>, sqlx::Error>;

    /// Public lookup by display identifier
    async fn get_certificate_verification(
        &self,
        certificate_id: &str,
    ) -> Result<Option<CertificateVerificationRow>, sqlx::Error>;

    async fn set_certificate_validity(
        &self,
        id: i64,
        is_valid: bool,
    ) -> Result<Option<Certificate>, sqlx::Error>;
}

const DISPLAY_ID_CONSTRAINT: &str = "certificates_certificate_id_key";
const DISPLAY_ID_ATTEMPTS: usize = 5;

impl DBClient {
    /// Insert with the first display id that is not taken yet
    async fn issue_with_display_ids(
        &self,
        user_id: Uuid,
        course_id: i64,
        title: &str,
        display_ids: impl Iterator<Item = String>,
    ) -> Result<(Certificate, bool), sqlx::Error> {
        let mut last_err = None;

        for display_id in display_ids.take(DISPLAY_ID_ATTEMPTS) {
            let inserted = sqlx::query_as::<_, Certificate>(&format!(
                r#"
                INSERT INTO certificates (user_id, course_id, title, certificate_id)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, course_id) DO NOTHING
                RETURNING {CERTIFICATE_COLUMNS}
                "#
            ))
            .bind(user_id)
            .bind(course_id)
            .bind(title)
            .bind(&display_id)
            .fetch_optional(&self.pool)
            .await;

            match inserted {
                Ok(Some(certificate)) => return Ok((certificate, true)),
                Ok(None) => {
                    // Lost the race to a concurrent request or already issued
                    let existing = self
                        .get_certificate_for(user_id, course_id)
                        .await?
                        .ok_or(sqlx::Error::RowNotFound)?;
                    return Ok((existing, false));
                }
                Err(sqlx::Error::Database(db_err))
                    if db_err.constraint() == Some(DISPLAY_ID_CONSTRAINT) =>
                {
                    tracing::warn!(display_id = %display_id, "Certificate display id collision, retrying");
                    last_err = Some(sqlx::Error::Database(db_err));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(sqlx::Error::RowNotFound))
    }
}

impl CertificateExt for DBClient {
    async fn get_certificate_for(
        &self,
        user_id: Uuid,
        course_id: i64,
    ) -> Result<Option<Certificate>, sqlx::Error> {
        let certificate = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE user_id = $1 AND course_id = $2"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    async fn issue_certificate(
        &self,
        user_id: Uuid,
        course_id: i64,
        title: &str,
    ) -> Result<(Certificate, bool), sqlx::Error> {
        let display_ids = std::iter::repeat_with(Certificate::generate_display_id);
        self.issue_with_display_ids(user_id, course_id, title, display_ids)
            .await
    }

    async fn get_user_certificates(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CertificateDto>, sqlx::Error> {
        let certificates = sqlx::query_as::<_, CertificateDto>(&format!(
            "{CERTIFICATE_WITH_COURSE} WHERE ce.user_id = $1 ORDER BY ce.issue_date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    async fn get_all_certificates(&self) -> Result<Vec<CertificateDto>, sqlx::Error> {
        let certificates = sqlx::query_as::<_, CertificateDto>(&format!(
            "{CERTIFICATE_WITH_COURSE} ORDER BY ce.issue_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    async fn get_certificate_verification(
        &self,
        certificate_id: &str,
    ) -> Result<Option<CertificateVerificationRow>, sqlx::Error> {
        let row = sqlx::query_as::<_, CertificateVerificationRow>(
            r#"
            SELECT ce.certificate_id, c.title AS course_name, u.username,
                   u.first_name, u.last_name, ce.issue_date, ce.is_valid
            FROM certificates ce
            JOIN courses c ON c.id = ce.course_id
            JOIN users u ON u.id = ce.user_id
            WHERE ce.certificate_id = $1
            "#,
        )
        .bind(certificate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_certificate_validity(
        &self,
        id: i64,
        is_valid: bool,
    ) -> Result<Option<Certificate>, sqlx::Error> {
        let certificate = sqlx::query_as::<_, Certificate>(&format!(
            "UPDATE certificates SET is_valid = $1 WHERE id = $2 RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(is_valid)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    async fn second_issue_returns_the_same_certificate(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let user = fixtures::user(&db).await;
        let course_id = fixtures::course(&pool, true).await;

        let (first, created) = db
            .issue_certificate(user.id, course_id, "Malagasy 101")
            .await
            .unwrap();
        assert!(created);

        let (second, created) = db
            .issue_certificate(user.id, course_id, "Malagasy 101")
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(first.certificate_id, second.certificate_id);
        assert_eq!(db.get_user_certificates(user.id).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn taken_display_id_is_retried(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let first_user = fixtures::user(&db).await;
        let second_user = fixtures::user(&db).await;
        let course_id = fixtures::course(&pool, true).await;

        let (existing, _) = db
            .issue_certificate(first_user.id, course_id, "Malagasy 101")
            .await
            .unwrap();

        let ids = [existing.certificate_id.clone(), "CL-0000FFFF".to_string()];
        let (issued, created) = db
            .issue_with_display_ids(second_user.id, course_id, "Malagasy 101", ids.into_iter())
            .await
            .unwrap();

        assert!(created);
        assert_eq!(issued.certificate_id, "CL-0000FFFF");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn invalidated_certificate_still_resolves(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let user = fixtures::user(&db).await;
        let course_id = fixtures::course(&pool, true).await;

        let (certificate, _) = db
            .issue_certificate(user.id, course_id, "Malagasy 101")
            .await
            .unwrap();

        let row = db
            .get_certificate_verification(&certificate.certificate_id)
            .await
            .unwrap()
            .unwrap();
        assert!(row.is_valid);

        db.set_certificate_validity(certificate.id, false)
            .await
            .unwrap()
            .unwrap();

        let row = db
            .get_certificate_verification(&certificate.certificate_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!row.is_valid);
        assert!(
            db.get_certificate_verification("CL-NOTFOUND")
                .await
                .unwrap()
                .is_none()
        );
    }
}
