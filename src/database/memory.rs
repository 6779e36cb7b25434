use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    database::CustomerRepository,
    models::{Customer, CustomerId, CustomerUpdate, NewCustomer, Page},
    ClienteleError, Result,
};

/// Process-local customer store with the same semantics as the MongoDB one
///
/// Member number uniqueness is checked under the same lock as the write
#[derive(Default)]
pub struct InMemoryCustomerDatabase {
    customers: Mutex<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CustomerId, Customer>> {
        self.customers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sorted<F>(&self, predicate: F) -> Vec<Customer>
    where
        F: Fn(&Customer) -> bool,
    {
        let mut customers: Vec<Customer> = self
            .lock()
            .values()
            .filter(|customer| predicate(customer))
            .cloned()
            .collect();
        customers.sort_by_key(|customer| customer.member_number);
        customers
    }
}

fn member_number_taken(
    customers: &HashMap<CustomerId, Customer>,
    member_number: i64,
    except: Option<&CustomerId>,
) -> bool {
    customers
        .values()
        .any(|c| c.member_number == member_number && Some(&c.id) != except)
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerDatabase {
    #[tracing::instrument(skip(self), fields(repository = "customer_memory"))]
    async fn find_by_id(&self, id: &CustomerId) -> Result<Customer> {
        self.lock().get(id).cloned().ok_or(ClienteleError::NotFound)
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_memory"))]
    async fn find_all(&self) -> Result<Vec<Customer>> {
        Ok(self.sorted(|_| true))
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_memory"))]
    async fn search(&self, term: &str) -> Result<Vec<Customer>> {
        let term = term.to_lowercase();
        Ok(self.sorted(|customer| {
            customer.name.to_lowercase().contains(&term)
                || customer.interests.to_lowercase().contains(&term)
        }))
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_memory"))]
    async fn paginate(&self, page: Page) -> Result<Vec<Customer>> {
        Ok(self
            .sorted(|_| true)
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.size() as usize)
            .collect())
    }

    #[tracing::instrument(skip(self, customer), fields(repository = "customer_memory"))]
    async fn create(&self, customer: NewCustomer) -> Result<Customer> {
        let mut customers = self.lock();
        if member_number_taken(&customers, customer.member_number, None) {
            return Err(ClienteleError::Conflict);
        }
        let customer = customer.into_customer(CustomerId::new());
        customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    #[tracing::instrument(skip(self, update), fields(repository = "customer_memory"))]
    async fn update(&self, id: &CustomerId, update: CustomerUpdate) -> Result<Customer> {
        let mut customers = self.lock();
        if !customers.contains_key(id) {
            return Err(ClienteleError::NotFound);
        }
        if let Some(member_number) = update.member_number {
            if member_number_taken(&customers, member_number, Some(id)) {
                return Err(ClienteleError::Conflict);
            }
        }
        let customer = customers.get_mut(id).ok_or(ClienteleError::NotFound)?;
        update.apply(customer);
        Ok(customer.clone())
    }

    #[tracing::instrument(skip(self), fields(repository = "customer_memory"))]
    async fn delete_by_id(&self, id: &CustomerId) -> Result<Customer> {
        self.lock().remove(id).ok_or(ClienteleError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{new_customer, seed};
    use claim::{assert_err, assert_ok};

    #[actix_rt::test]
    async fn duplicate_member_number_conflicts_without_overwriting() {
        let db = InMemoryCustomerDatabase::new();
        let original = assert_ok!(db.create(new_customer(1, "Ada", "maths")).await);

        let duplicate = db.create(new_customer(1, "Impostor", "forgery")).await;

        assert_eq!(duplicate, Err(ClienteleError::Conflict));
        let all = db.find_all().await.unwrap();
        assert_eq!(all, vec![original]);
    }

    #[actix_rt::test]
    async fn find_all_is_sorted_by_member_number() {
        let db = InMemoryCustomerDatabase::new();
        for member_number in &[30, 10, 20] {
            db.create(new_customer(*member_number, "Someone", "things"))
                .await
                .unwrap();
        }
        let numbers: Vec<i64> = db
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|c| c.member_number)
            .collect();
        assert_eq!(numbers, vec![10, 20, 30]);
    }

    #[actix_rt::test]
    async fn pages_follow_member_number_order() {
        let db = InMemoryCustomerDatabase::new();
        seed(&db, 25).await;

        let numbers = |customers: Vec<Customer>| -> Vec<i64> {
            customers.iter().map(|c| c.member_number).collect()
        };

        let first = db.paginate(Page::parse("1", 10).unwrap()).await.unwrap();
        assert_eq!(numbers(first), (1..=10).collect::<Vec<_>>());

        let third = db.paginate(Page::parse("3", 10).unwrap()).await.unwrap();
        assert_eq!(numbers(third), (21..=25).collect::<Vec<_>>());

        let past_the_end = db.paginate(Page::parse("4", 10).unwrap()).await.unwrap();
        assert!(past_the_end.is_empty());
    }

    #[actix_rt::test]
    async fn search_matches_name_or_interests_ignoring_case() {
        let db = InMemoryCustomerDatabase::new();
        db.create(new_customer(2, "Alan Turing", "Cryptography, running"))
            .await
            .unwrap();
        db.create(new_customer(1, "Ada Lovelace", "maths")).await.unwrap();

        let by_interest = db.search("CRYPTO").await.unwrap();
        assert_eq!(by_interest.len(), 1);
        assert_eq!(by_interest[0].name, "Alan Turing");

        let by_name = db.search("a").await.unwrap();
        assert_eq!(by_name.len(), 2);
        assert_eq!(by_name[0].member_number, 1);

        assert!(db.search("knitting").await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn update_of_unknown_id_changes_nothing() {
        let db = InMemoryCustomerDatabase::new();
        let existing = db.create(new_customer(1, "Ada", "maths")).await.unwrap();

        let update = CustomerUpdate {
            name: Some("Changed".into()),
            ..Default::default()
        };
        let result = db.update(&CustomerId::new(), update).await;

        assert_eq!(result, Err(ClienteleError::NotFound));
        assert_eq!(db.find_all().await.unwrap(), vec![existing]);
    }

    #[actix_rt::test]
    async fn update_into_taken_member_number_conflicts() {
        let db = InMemoryCustomerDatabase::new();
        db.create(new_customer(1, "Ada", "maths")).await.unwrap();
        let alan = db.create(new_customer(2, "Alan", "codes")).await.unwrap();

        let update = CustomerUpdate {
            member_number: Some(1),
            ..Default::default()
        };
        assert_eq!(
            db.update(&alan.id, update).await,
            Err(ClienteleError::Conflict)
        );

        let keep_own = CustomerUpdate {
            member_number: Some(2),
            interests: Some("codes, chess".into()),
            ..Default::default()
        };
        let updated = assert_ok!(db.update(&alan.id, keep_own).await);
        assert_eq!(updated.interests, "codes, chess");
        assert_eq!(updated.name, "Alan");
    }

    #[actix_rt::test]
    async fn delete_returns_the_record_once() {
        let db = InMemoryCustomerDatabase::new();
        let ada = db.create(new_customer(1, "Ada", "maths")).await.unwrap();

        assert_eq!(db.delete_by_id(&ada.id).await, Ok(ada.clone()));
        assert_err!(db.delete_by_id(&ada.id).await);
        assert_err!(db.find_by_id(&ada.id).await);
    }
}
