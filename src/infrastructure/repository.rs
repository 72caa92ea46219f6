// Typed access to one collection of the document store

use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::entities::Entity;
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{DocumentStore, Filter, FindOptions, SortOrder};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Validated pagination and sorting parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl PageRequest {
    /// `allowed_sorts` whitelists the fields a caller may sort on; the first
    /// entry is the default.
    pub fn new(
        page: Option<u64>,
        limit: Option<u64>,
        sort_by: Option<String>,
        sort_order: Option<SortOrder>,
        allowed_sorts: &[&str],
    ) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        // The offset is handed to the store as a signed 64-bit value
        if (page - 1)
            .checked_mul(limit)
            .filter(|skip| *skip <= i64::MAX as u64)
            .is_none()
        {
            return Err(AppError::Validation(format!("page {} is out of range", page)));
        }

        let sort_by = match sort_by {
            Some(field) if allowed_sorts.contains(&field.as_str()) => field,
            Some(field) => {
                return Err(AppError::Validation(format!(
                    "Cannot sort by '{}'; allowed: {}",
                    field,
                    allowed_sorts.join(", ")
                )))
            }
            None => allowed_sorts.first().copied().unwrap_or("createdAt").to_string(),
        };

        Ok(Self {
            page,
            limit,
            sort_by,
            sort_order: sort_order.unwrap_or_default(),
        })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    fn find_options(&self) -> FindOptions {
        FindOptions::sorted(&self.sort_by, self.sort_order).paged(self.skip(), self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: &PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.limit);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct Repository<T: Entity> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn decode(doc: serde_json::Value) -> AppResult<T> {
        serde_json::from_value(doc).map_err(|e| {
            AppError::Database(format!("Malformed {} document: {}", T::ENTITY_NAME, e))
        })
    }

    pub async fn find(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, filter, options)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn find_all(&self, filter: &Filter) -> AppResult<Vec<T>> {
        self.find(filter, &FindOptions::default()).await
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<T>> {
        self.store
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    /// Load by id or fail with a not-found error
    pub async fn get(&self, id: &str) -> AppResult<T> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::ENTITY_NAME, id)))
    }

    pub async fn insert(&self, entity: &T) -> AppResult<()> {
        entity.ensure_valid()?;
        let doc = serde_json::to_value(entity)?;
        self.store.insert(T::COLLECTION, entity.id(), doc).await
    }

    pub async fn update(&self, entity: &T) -> AppResult<()> {
        entity.ensure_valid()?;
        let doc = serde_json::to_value(entity)?;
        if self.store.update_by_id(T::COLLECTION, entity.id(), doc).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "{} {} not found",
                T::ENTITY_NAME,
                entity.id()
            )))
        }
    }

    /// Optimistic replace: only succeeds while the stored document still
    /// matches `expected`
    pub async fn update_if(&self, entity: &T, expected: &Filter) -> AppResult<bool> {
        entity.ensure_valid()?;
        let doc = serde_json::to_value(entity)?;
        self.store
            .update_if(T::COLLECTION, entity.id(), expected, doc)
            .await
    }

    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        self.store.delete_by_id(T::COLLECTION, id).await
    }

    pub async fn count(&self, filter: &Filter) -> AppResult<u64> {
        self.store.count(T::COLLECTION, filter).await
    }

    pub async fn exists(&self, filter: &Filter) -> AppResult<bool> {
        Ok(self.count(filter).await? > 0)
    }

    pub async fn page(&self, filter: &Filter, request: &PageRequest) -> AppResult<Page<T>> {
        let total = self.count(filter).await?;
        let items = self.find(filter, &request.find_options()).await?;
        Ok(Page {
            items,
            pagination: Pagination::new(request, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTS: &[&str] = &["createdAt", "name"];

    #[test]
    fn test_page_request_defaults() {
        let request = PageRequest::new(None, None, None, None, SORTS).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(request.sort_by, "createdAt");
        assert_eq!(request.sort_order, SortOrder::Desc);
        assert_eq!(request.skip(), 0);
    }

    #[test]
    fn test_page_request_validation() {
        assert!(PageRequest::new(Some(0), None, None, None, SORTS).is_err());
        assert!(PageRequest::new(None, Some(0), None, None, SORTS).is_err());
        assert!(PageRequest::new(None, Some(101), None, None, SORTS).is_err());
        assert!(PageRequest::new(None, None, Some("password".into()), None, SORTS).is_err());
        assert!(matches!(
            PageRequest::new(Some(u64::MAX), Some(MAX_PAGE_SIZE), None, None, SORTS),
            Err(AppError::Validation(_))
        ));
        assert!(PageRequest::new(Some(i64::MAX as u64 / 10 + 2), Some(10), None, None, SORTS).is_err());

        let last = PageRequest::new(Some(i64::MAX as u64 / 10 + 1), Some(10), None, None, SORTS)
            .unwrap();
        assert!(last.skip() <= i64::MAX as u64);

        let request =
            PageRequest::new(Some(3), Some(10), Some("name".into()), Some(SortOrder::Asc), SORTS)
                .unwrap();
        assert_eq!(request.skip(), 20);
    }

    #[test]
    fn test_pagination_flags() {
        let request = PageRequest::new(Some(2), Some(10), None, None, SORTS).unwrap();
        let pagination = Pagination::new(&request, 25);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);

        let empty = Pagination::new(&PageRequest::new(None, None, None, None, SORTS).unwrap(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }
}
