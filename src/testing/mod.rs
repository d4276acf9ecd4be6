use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::app::AppState;
use crate::config::AppConfig;
use crate::database::models::{NewPost, Post, PostChanges, User};
use crate::database::{DatabaseError, PostRepository, UserRepository};

/// Development preset with a fixed secret and the cheapest bcrypt cost
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = "test-secret".to_string();
    config.security.password_hash_cost = 4;
    config.completion.api_key = "test-key".to_string();
    config
}

/// In-memory stand-in for the `users` table
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<User>>,
    fail_next_create: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryUserRepository {
    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn remove(&self, email: &str) {
        self.users.lock().unwrap().retain(|u| u.email != email);
    }

    /// Simulate losing a registration race: the next insert hits the unique constraint.
    pub fn fail_next_create_with_unique_violation(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Make `ping` report the store as unreachable.
    pub fn set_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, DatabaseError> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }

        let user = User {
            id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError("connection refused".to_string()));
        }
        Ok(())
    }
}

/// In-memory stand-in for the `posts` table
#[derive(Default)]
pub struct MemoryPostRepository {
    posts: Mutex<Vec<Post>>,
}

impl MemoryPostRepository {
    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn list(&self, owner_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn create(&self, owner_id: i64, post: NewPost) -> Result<Post, DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        let now = Utc::now();
        let post = Post {
            id: posts.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            owner_id,
            title: post.title,
            content: post.content,
            status: Default::default(),
            created_at: now,
            updated_at: now,
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Option<Post>, DatabaseError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id && p.owner_id == owner_id)
            .cloned())
    }

    async fn update(&self, owner_id: i64, id: i64, changes: PostChanges) -> Result<Option<Post>, DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == id && p.owner_id == owner_id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(status) = changes.status {
            post.status = status;
        }
        post.updated_at = Utc::now();

        Ok(Some(post.clone()))
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<bool, DatabaseError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| !(p.id == id && p.owner_id == owner_id));
        Ok(posts.len() < before)
    }
}

/// Application state wired to fresh in-memory stores
pub struct TestApp {
    pub config: AppConfig,
    pub state: AppState,
    pub users: Arc<MemoryUserRepository>,
    pub posts: Arc<MemoryPostRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let users = Arc::new(MemoryUserRepository::default());
        let posts = Arc::new(MemoryPostRepository::default());
        let state = AppState::new(&config, users.clone(), posts.clone()).unwrap();
        state.schema_ready.store(true, Ordering::SeqCst);

        Self { config, state, users, posts }
    }

    pub fn router(&self) -> axum::Router {
        crate::app::app(self.state.clone(), &self.config)
    }

    /// Register a user through the auth service and return its bearer token.
    pub async fn register(&self, email: &str) -> String {
        self.state.auth.register(email, "pw123").await.unwrap()
    }
}
