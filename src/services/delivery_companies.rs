use crate::{
    entities::delivery_company::{self, CompanyStatus, Entity as DeliveryCompanyEntity},
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
pub struct NewDeliveryCompany {
    pub name: String,
    pub code: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryCompanyPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: Option<CompanyStatus>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryCompanyQuery {
    pub search: Option<String>,
    pub page: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct DeliveryCompanyService {
    db: Arc<DatabaseConnection>,
}

impl DeliveryCompanyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(
        &self,
        input: NewDeliveryCompany,
    ) -> Result<delivery_company::Model, ServiceError> {
        let now = Utc::now();
        let model = delivery_company::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            code: Set(input.code),
            phone: Set(input.phone),
            email: Set(input.email),
            address: Set(input.address),
            status: Set(CompanyStatus::Active),
            rating: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_err(e, "Delivery company code already exists"))?;

        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<delivery_company::Model, ServiceError> {
        DeliveryCompanyEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery company {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: DeliveryCompanyQuery,
    ) -> Result<(Vec<delivery_company::Model>, u64), ServiceError> {
        let mut select = DeliveryCompanyEntity::find();

        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(delivery_company::Column::Name.contains(search.as_str()))
                    .add(delivery_company::Column::Code.contains(search.as_str())),
            );
        }

        let paginator = select.paginate(&*self.db, query.limit.max(1));
        let total = paginator.num_items().await?;
        let companies = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((companies, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: DeliveryCompanyPatch,
    ) -> Result<delivery_company::Model, ServiceError> {
        let current = self.get(id).await?;

        let mut active: delivery_company::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(phone);
        }
        if let Some(email) = patch.email {
            active.email = Set(Some(email));
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(rating) = patch.rating {
            active.rating = Set(Some(rating));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = DeliveryCompanyEntity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Delivery company {} not found",
                id
            )));
        }
        Ok(())
    }
}
