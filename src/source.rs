use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub id: u64,
    pub customer_id: u64,
    pub group_id: u64,
}

/// Shared handle to the data source a resolution session reads from.
pub type SourceHandle = Arc<dyn DataSource>;

/// Bulk-read collaborator behind the batch functions.
///
/// Each operation accepts a set of identifiers and returns the matching
/// entities (for affiliations, matching on the customer foreign key). An
/// empty input yields an empty output, not an error. Matches may come back
/// in any order and need not cover every requested id; alignment against the
/// requested ids is the batch functions' job.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn customers_by_ids(&self, ids: &[u64]) -> Result<Vec<Customer>, SourceError>;

    async fn affiliations_by_customer_ids(
        &self,
        customer_ids: &[u64],
    ) -> Result<Vec<Affiliation>, SourceError>;

    async fn groups_by_ids(&self, ids: &[u64]) -> Result<Vec<Group>, SourceError>;
}

#[derive(Debug, Default)]
struct BatchLog {
    customers: Vec<usize>,
    affiliations: Vec<usize>,
    groups: Vec<usize>,
}

/// In-memory [`DataSource`] used by tests and demos.
///
/// Records the size of every bulk read it serves, so callers can assert how
/// requests were batched, and supports injecting a failure into any of the
/// three operations.
#[derive(Default)]
pub struct MemorySource {
    customers: HashMap<u64, Customer>,
    affiliations: Vec<Affiliation>,
    groups: HashMap<u64, Group>,
    batches: Mutex<BatchLog>,
    fail_customers: AtomicBool,
    fail_affiliations: AtomicBool,
    fail_groups: AtomicBool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dataset from the original demo: three customers, four groups, and
    /// affiliations 1→{1,4}, 2→{2,4}, 3→{3,4}.
    pub fn demo() -> Self {
        let mut source = Self::new();
        for (id, ordinal) in [(1, "first"), (2, "second"), (3, "third")] {
            source.customers.insert(
                id,
                Customer {
                    id,
                    first_name: format!("{ordinal} customer"),
                    last_name: format!("{ordinal} customer last name"),
                },
            );
        }
        for (id, ordinal) in [(1, "first"), (2, "second"), (3, "third"), (4, "fourth")] {
            source.groups.insert(id, Group { id, name: format!("{ordinal} group") });
        }
        for (id, (customer_id, group_id)) in
            [(1, 1), (1, 4), (2, 2), (2, 4), (3, 3), (3, 4)].into_iter().enumerate()
        {
            source.affiliations.push(Affiliation {
                id: id as u64 + 1,
                customer_id,
                group_id,
            });
        }
        source
    }

    pub fn add_customer(&mut self, customer: Customer) {
        self.customers.insert(customer.id, customer);
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.insert(group.id, group);
    }

    pub fn add_affiliation(&mut self, affiliation: Affiliation) {
        self.affiliations.push(affiliation);
    }

    /// Makes every subsequent `customers_by_ids` call fail.
    pub fn fail_customer_reads(&self) {
        self.fail_customers.store(true, Ordering::SeqCst);
    }

    /// Makes every subsequent `affiliations_by_customer_ids` call fail.
    pub fn fail_affiliation_reads(&self) {
        self.fail_affiliations.store(true, Ordering::SeqCst);
    }

    /// Makes every subsequent `groups_by_ids` call fail.
    pub fn fail_group_reads(&self) {
        self.fail_groups.store(true, Ordering::SeqCst);
    }

    /// Sizes of the customer bulk reads served so far, in call order.
    pub fn customer_batches(&self) -> Vec<usize> {
        self.batches.lock().expect("batch log poisoned").customers.clone()
    }

    pub fn affiliation_batches(&self) -> Vec<usize> {
        self.batches.lock().expect("batch log poisoned").affiliations.clone()
    }

    pub fn group_batches(&self) -> Vec<usize> {
        self.batches.lock().expect("batch log poisoned").groups.clone()
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn customers_by_ids(&self, ids: &[u64]) -> Result<Vec<Customer>, SourceError> {
        self.batches.lock().expect("batch log poisoned").customers.push(ids.len());
        if self.fail_customers.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("customer store offline".to_owned()));
        }
        Ok(ids.iter().filter_map(|id| self.customers.get(id).cloned()).collect())
    }

    async fn affiliations_by_customer_ids(
        &self,
        customer_ids: &[u64],
    ) -> Result<Vec<Affiliation>, SourceError> {
        self.batches.lock().expect("batch log poisoned").affiliations.push(customer_ids.len());
        if self.fail_affiliations.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("affiliation store offline".to_owned()));
        }
        Ok(self
            .affiliations
            .iter()
            .filter(|a| customer_ids.contains(&a.customer_id))
            .cloned()
            .collect())
    }

    async fn groups_by_ids(&self, ids: &[u64]) -> Result<Vec<Group>, SourceError> {
        self.batches.lock().expect("batch log poisoned").groups.push(ids.len());
        if self.fail_groups.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("group store offline".to_owned()));
        }
        Ok(ids.iter().filter_map(|id| self.groups.get(id).cloned()).collect())
    }
}
