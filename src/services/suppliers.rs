use crate::{
    entities::supplier::{self, Entity as SupplierEntity, SupplierStatus},
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
pub struct NewSupplier {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub status: Option<SupplierStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierQuery {
    pub search: Option<String>,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DatabaseConnection>,
}

impl SupplierService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewSupplier) -> Result<supplier::Model, ServiceError> {
        let now = Utc::now();
        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            tax_id: Set(input.tax_id),
            status: Set(SupplierStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        SupplierEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: SupplierQuery,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let mut select = SupplierEntity::find();

        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(supplier::Column::Name.contains(search.as_str()))
                    .add(supplier::Column::Email.contains(search.as_str())),
            );
        }

        let paginator = select.paginate(&*self.db, query.limit.max(1));
        let total = paginator.num_items().await?;
        let suppliers = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((suppliers, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: SupplierPatch,
    ) -> Result<supplier::Model, ServiceError> {
        let current = self.get(id).await?;

        let mut active: supplier::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(tax_id) = patch.tax_id {
            active.tax_id = Set(Some(tax_id));
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = SupplierEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Supplier {} not found", id)));
        }
        Ok(())
    }
}
