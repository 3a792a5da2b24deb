use sqlx::{Pool, Postgres};

pub mod scheduler;

mod user;
pub use user::UserExt;

mod course;
pub use course::CourseExt;

mod learning_path;
pub use learning_path::LearningPathExt;

mod progress;
pub use progress::ProgressExt;

mod certificate;
pub use certificate::CertificateExt;

mod payment;
pub use payment::{NewPayment, PaymentExt};

mod subscription;
pub use subscription::SubscriptionExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}
impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
