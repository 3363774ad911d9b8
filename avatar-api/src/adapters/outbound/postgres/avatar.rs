use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::{
    models::{Avatar, AvatarId, NewAvatar, StoredImage, UserId, UserKey},
    ports::outbound::AvatarRepository,
    AvatarError,
};

pub struct PostgresAvatarRepository {
    pool: PgPool,
}

impl PostgresAvatarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AvatarRow {
    id: i32,
    user_id: i32,
    image: String,
    primary: bool,
    date_uploaded: OffsetDateTime,
}

impl From<AvatarRow> for Avatar {
    fn from(row: AvatarRow) -> Self {
        Self {
            id: AvatarId::new(row.id),
            user_id: UserId::new(row.user_id),
            image: StoredImage::new(row.image),
            primary: row.primary,
            date_uploaded: row.date_uploaded,
        }
    }
}

#[async_trait]
impl AvatarRepository for PostgresAvatarRepository {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Avatar>, AvatarError> {
        let rows = sqlx::query_as::<_, AvatarRow>(
            r#"
            SELECT id, user_id, image, "primary", date_uploaded
            FROM avatars
            WHERE user_id = $1
            ORDER BY date_uploaded ASC, id ASC
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Avatar::from).collect())
    }

    async fn primary_for_user(&self, user_id: &UserId) -> Result<Option<Avatar>, AvatarError> {
        let row = sqlx::query_as::<_, AvatarRow>(
            r#"
            SELECT id, user_id, image, "primary", date_uploaded
            FROM avatars
            WHERE user_id = $1
            ORDER BY "primary" DESC, date_uploaded ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Avatar::from))
    }

    async fn insert_primary(&self, avatar: &NewAvatar) -> Result<Avatar, AvatarError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE avatars
            SET "primary" = FALSE
            WHERE user_id = $1 AND "primary"
            "#,
        )
        .bind(avatar.user_id.as_i32())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AvatarRow>(
            r#"
            INSERT INTO avatars (user_id, image, "primary", date_uploaded)
            VALUES ($1, $2, TRUE, $3)
            RETURNING id, user_id, image, "primary", date_uploaded
            "#,
        )
        .bind(avatar.user_id.as_i32())
        .bind(avatar.image.as_str())
        .bind(avatar.date_uploaded)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn set_primary(
        &self,
        user_id: &UserId,
        avatar_id: &AvatarId,
    ) -> Result<Avatar, AvatarError> {
        let mut tx = self.pool.begin().await?;

        // Clear first: the partial unique index forbids two primaries even mid-transaction.
        sqlx::query(
            r#"
            UPDATE avatars
            SET "primary" = FALSE
            WHERE user_id = $1 AND "primary" AND id <> $2
            "#,
        )
        .bind(user_id.as_i32())
        .bind(avatar_id.as_i32())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AvatarRow>(
            r#"
            UPDATE avatars
            SET "primary" = TRUE
            WHERE user_id = $1 AND id = $2
            RETURNING id, user_id, image, "primary", date_uploaded
            "#,
        )
        .bind(user_id.as_i32())
        .bind(avatar_id.as_i32())
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls the clear back.
        let Some(row) = row else {
            return Err(AvatarError::NotFound);
        };

        tx.commit().await?;

        Ok(row.into())
    }

    async fn delete_many(
        &self,
        user_id: &UserId,
        avatar_ids: &[AvatarId],
    ) -> Result<Vec<Avatar>, AvatarError> {
        if avatar_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = avatar_ids.iter().map(AvatarId::as_i32).collect::<Vec<_>>();

        let rows = sqlx::query_as::<_, AvatarRow>(
            r#"
            DELETE FROM avatars
            WHERE user_id = $1 AND id = ANY($2)
            RETURNING id, user_id, image, "primary", date_uploaded
            "#,
        )
        .bind(user_id.as_i32())
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Avatar::from).collect())
    }

    async fn find_user_by_key(&self, key: &UserKey) -> Result<Option<UserId>, AvatarError> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT id
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(id.map(UserId::new))
    }
}
