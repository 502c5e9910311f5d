use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::database::clock::timestamp_now;
use crate::database::models::Service;
use crate::database::{from_record, from_records, record_i64, returned_id, with_transaction, RelationalStore};
use crate::params;
use crate::services::{required_text, ContentError};

const SELECT_SERVICE: &str =
    "SELECT id, title, description, icon, order_number, created_at, updated_at FROM Services";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub order_number: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ServiceOrder {
    pub id: i64,
    pub order_number: i64,
}

/// The services offered by the organisation, displayed by `order_number`.
pub struct ServiceCatalog {
    store: Arc<dyn RelationalStore>,
}

impl ServiceCatalog {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Service>, ContentError> {
        let sql = format!("{} ORDER BY order_number ASC, id ASC", SELECT_SERVICE);
        Ok(from_records(self.store.query_many(&sql, &[]).await?)?)
    }

    pub async fn get(&self, id: i64) -> Result<Service, ContentError> {
        let sql = format!("{} WHERE id = ?", SELECT_SERVICE);
        self.store
            .query_one(&sql, &params![id])
            .await?
            .map(from_record)
            .transpose()?
            .ok_or(ContentError::NotFound("Service"))
    }

    async fn next_order_number(&self) -> Result<i64, ContentError> {
        let row = self
            .store
            .query_one("SELECT COALESCE(MAX(order_number), 0) + 1 AS next FROM Services", &[])
            .await?;
        Ok(row.as_ref().and_then(|r| record_i64(r, "next")).unwrap_or(1))
    }

    /// A missing or zero `order_number` appends the service after the current last one.
    pub async fn create(&self, input: ServiceInput) -> Result<Service, ContentError> {
        let title = required_text(input.title, "title")?;
        let order_number = match input.order_number {
            Some(n) if n != 0 => n,
            _ => self.next_order_number().await?,
        };

        let now = timestamp_now();
        let row = self
            .store
            .query_one(
                "INSERT INTO Services (title, description, icon, order_number, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
                &params![title, input.description, input.icon, order_number, now.as_str(), now.as_str()],
            )
            .await?;
        let id = returned_id(row)?;
        info!("Created service {} at position {}", id, order_number);
        self.get(id).await
    }

    pub async fn update(&self, id: i64, input: ServiceInput) -> Result<Service, ContentError> {
        let current = self.get(id).await?;
        let title = match input.title {
            Some(title) => required_text(Some(title), "title")?,
            None => current.title,
        };

        let result = self
            .store
            .execute(
                "UPDATE Services SET title = ?, description = ?, icon = ?, order_number = ?, updated_at = ? WHERE id = ?",
                &params![
                    title,
                    input.description.or(current.description),
                    input.icon.or(current.icon),
                    input.order_number.unwrap_or(current.order_number),
                    timestamp_now(),
                    id
                ],
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ContentError::NotFound("Service"));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        let result = self
            .store
            .execute("DELETE FROM Services WHERE id = ?", &params![id])
            .await?;
        if result.rows_affected == 0 {
            return Err(ContentError::NotFound("Service"));
        }
        info!("Deleted service {}", id);
        Ok(())
    }

    /// Apply every position in one transaction; any failure, including an
    /// unknown id, leaves all positions unchanged.
    pub async fn reorder(&self, entries: Vec<ServiceOrder>) -> Result<(), ContentError> {
        if entries.is_empty() {
            return Err(ContentError::validation("Invalid service order data", Some("services")));
        }

        let count = entries.len();
        let now = timestamp_now();
        with_transaction::<_, ContentError, _>(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                for entry in &entries {
                    let result = tx
                        .execute(
                            "UPDATE Services SET order_number = ?, updated_at = ? WHERE id = ?",
                            &params![entry.order_number, now.as_str(), entry.id],
                        )
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(ContentError::NotFound("Service"));
                    }
                }
                Ok(())
            })
        })
        .await?;

        info!("Reordered {} services", count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{temp_store, FailingStore};

    fn named(title: &str) -> ServiceInput {
        ServiceInput {
            title: Some(title.to_string()),
            description: Some("Y".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_order_number_appends() {
        let fixture = temp_store().await;
        let catalog = ServiceCatalog::new(fixture.store.clone());

        let first = catalog.create(named("A")).await.unwrap();
        assert_eq!(first.order_number, 1);
        catalog
            .create(ServiceInput { order_number: Some(7), ..named("B") })
            .await
            .unwrap();
        let last = catalog.create(named("C")).await.unwrap();
        assert_eq!(last.order_number, 8);

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed.last().unwrap().id, last.id);
    }

    #[tokio::test]
    async fn zero_order_number_appends() {
        let fixture = temp_store().await;
        let catalog = ServiceCatalog::new(fixture.store.clone());

        catalog.create(named("A")).await.unwrap();
        catalog.create(named("B")).await.unwrap();
        let zero = catalog
            .create(ServiceInput { order_number: Some(0), ..named("C") })
            .await
            .unwrap();
        assert_eq!(zero.order_number, 3);
        assert_eq!(catalog.list().await.unwrap().last().unwrap().id, zero.id);
    }

    #[tokio::test]
    async fn reorder_updates_every_entry() {
        let fixture = temp_store().await;
        let catalog = ServiceCatalog::new(fixture.store.clone());
        let a = catalog.create(named("A")).await.unwrap();
        let b = catalog.create(named("B")).await.unwrap();

        catalog
            .reorder(vec![
                ServiceOrder { id: a.id, order_number: 5 },
                ServiceOrder { id: b.id, order_number: 3 },
            ])
            .await
            .unwrap();

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].order_number, 5);
    }

    #[tokio::test]
    async fn reorder_failure_on_second_statement_rolls_back_first() {
        let fixture = temp_store().await;
        let catalog = ServiceCatalog::new(fixture.store.clone());
        let a = catalog.create(named("A")).await.unwrap();
        let b = catalog.create(named("B")).await.unwrap();

        let failing: Arc<dyn RelationalStore> = Arc::new(FailingStore::new(fixture.store.clone(), 2));
        let broken = ServiceCatalog::new(failing);
        let result = broken
            .reorder(vec![
                ServiceOrder { id: a.id, order_number: 5 },
                ServiceOrder { id: b.id, order_number: 3 },
            ])
            .await;
        assert!(matches!(result, Err(ContentError::Database(_))));

        assert_eq!(catalog.get(a.id).await.unwrap().order_number, 1);
        assert_eq!(catalog.get(b.id).await.unwrap().order_number, 2);
    }

    #[tokio::test]
    async fn reorder_with_unknown_id_changes_nothing() {
        let fixture = temp_store().await;
        let catalog = ServiceCatalog::new(fixture.store.clone());
        let a = catalog.create(named("A")).await.unwrap();

        let result = catalog
            .reorder(vec![
                ServiceOrder { id: a.id, order_number: 9 },
                ServiceOrder { id: 4242, order_number: 1 },
            ])
            .await;
        assert!(matches!(result, Err(ContentError::NotFound("Service"))));
        assert_eq!(catalog.get(a.id).await.unwrap().order_number, 1);
        assert!(matches!(catalog.reorder(vec![]).await, Err(ContentError::Validation { .. })));
    }
}
