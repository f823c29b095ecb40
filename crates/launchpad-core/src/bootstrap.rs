//! Administrator bootstrap: one idempotent insert into the provisioned
//! database. `ON CONFLICT (email) DO NOTHING` makes a saga re-run a no-op.

use sqlx::postgres::PgConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::request::AdminIdentity;

pub(crate) async fn insert_admin(conn: &mut PgConnection, admin: &AdminIdentity) -> Result<()> {
    let result = sqlx::query(
        "INSERT INTO admins (id, email, password_hash) VALUES ($1, $2, $3) \
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(&admin.email)
    .bind(&admin.password_hash)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        info!(email = %admin.email, "administrator already present, nothing to do");
    } else {
        info!(email = %admin.email, "administrator account created");
    }
    Ok(())
}
