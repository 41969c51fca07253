use crate::{
    auth::AuthService,
    entities::user::{self, Entity as UserEntity, Permissions, UserRole, UserStatus},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub search: Option<String>,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: NewUser) -> Result<user::Model, ServiceError> {
        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("Email already exists".to_string()));
        }

        let password_hash = AuthService::hash_password(&input.password)
            .map_err(|e| ServiceError::HashError(e.to_string()))?;

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            password_hash: Set(password_hash),
            role: Set(input.role),
            status: Set(UserStatus::Active),
            permissions: Set(Permissions(input.permissions)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_err(e, "Email already exists"))?;

        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        UserEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(&self, query: UserQuery) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let mut select = UserEntity::find();

        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(user::Column::Name.contains(search.as_str()))
                    .add(user::Column::Email.contains(search.as_str())),
            );
        }

        let paginator = select.paginate(&*self.db, query.limit.max(1));
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((users, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: UserPatch) -> Result<user::Model, ServiceError> {
        let current = self.get(id).await?;

        let mut active: user::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(password) = patch.password {
            let password_hash = AuthService::hash_password(&password)
                .map_err(|e| ServiceError::HashError(e.to_string()))?;
            active.password_hash = Set(password_hash);
        }
        if let Some(role) = patch.role {
            active.role = Set(role);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(permissions) = patch.permissions {
            active.permissions = Set(Permissions(permissions));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = UserEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }
}
