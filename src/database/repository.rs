use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{NewPost, Post, PostChanges, PostRow, User};

/// Persistence boundary for user credentials.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Insert a user. A duplicate email surfaces as `DatabaseError::UniqueViolation`.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Post CRUD, always scoped to the owning user.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn list(&self, owner_id: i64) -> Result<Vec<Post>, DatabaseError>;
    async fn create(&self, owner_id: i64, post: NewPost) -> Result<Post, DatabaseError>;
    async fn get(&self, owner_id: i64, id: i64) -> Result<Option<Post>, DatabaseError>;
    async fn update(&self, owner_id: i64, id: i64, changes: PostChanges) -> Result<Option<Post>, DatabaseError>;
    async fn delete(&self, owner_id: i64, id: i64) -> Result<bool, DatabaseError>;
}

const POST_COLUMNS: &str = "id, owner_id, title, content, status, created_at, updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn list(&self, owner_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE owner_id = $1 ORDER BY updated_at DESC, id DESC",
            POST_COLUMNS
        );

        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    async fn create(&self, owner_id: i64, post: NewPost) -> Result<Post, DatabaseError> {
        let sql = format!(
            "INSERT INTO posts (owner_id, title, content) VALUES ($1, $2, $3) RETURNING {}",
            POST_COLUMNS
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(owner_id)
            .bind(&post.title)
            .bind(&post.content)
            .fetch_one(&self.pool)
            .await?;

        Post::try_from(row)
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Option<Post>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE id = $1 AND owner_id = $2",
            POST_COLUMNS
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    async fn update(&self, owner_id: i64, id: i64, changes: PostChanges) -> Result<Option<Post>, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE posts SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            POST_COLUMNS
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(changes.title)
            .bind(changes.content)
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
