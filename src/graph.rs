//! Demo query execution over a [`Session`]: the `CustomerVisit` document
//! from the original fixture, resolved breadth-first so that sibling fields
//! of the same entity type land in the same loader batch.
//!
//! This module is the executor-facing glue, not the coalescing core. A real
//! graph executor would drive the same two-phase flow: every resolver of the
//! current turn registers its keys and hands back a [`Deferred`], and only
//! then does the executor start resolving them.

use std::sync::Arc;

use futures::future;
use serde_json::{json, Value};

use crate::{
    deferred::Deferred,
    error::LoadError,
    session::Session,
    source::{Affiliation, Customer, Group},
};

/// A failure confined to one field of the result document. The field is
/// rendered as `null` and the failure is reported here, leaving sibling
/// fields resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// The resolved document plus any field-level failures.
#[derive(Debug)]
pub struct QueryOutcome {
    pub data: Value,
    pub errors: Vec<FieldError>,
}

/// Resolves the affiliations field for one customer.
///
/// The load is offloaded to its own task writing a one-shot outcome, so the
/// caller returns to the executor immediately and sibling customers can
/// register their ids into the same affiliations batch.
fn resolve_affiliations(session: &Arc<Session>, customer_id: u64) -> Deferred<Vec<Affiliation>> {
    let session = Arc::clone(session);
    Deferred::spawn(async move {
        let key = session.customer_key(customer_id);
        // An id with no affiliation rows loads as an empty list, never as
        // not-found; treat an absent slot the same way.
        Ok(session.affiliations.load(key).await?.unwrap_or_default())
    })
}

/// Resolves the group field for one affiliation. `Ok(None)` means the group
/// id matched no row.
fn resolve_group(session: &Arc<Session>, group_id: u64) -> Deferred<Option<Group>> {
    let session = Arc::clone(session);
    Deferred::spawn(async move {
        let key = session.group_key(group_id);
        session.groups.load(key).await
    })
}

/// Executes the `CustomerVisit` query for the given customer ids.
///
/// The walk is breadth-first per level: all customers in one batch, then all
/// their affiliation lists in one batch, then every distinct group id across
/// all affiliations in one batch. A failing top-level customer load fails
/// the query; failures below that are per-field ([`FieldError`]).
pub async fn customer_visit(
    session: &Arc<Session>,
    customer_ids: &[u64],
) -> Result<QueryOutcome, LoadError> {
    let keys = customer_ids.iter().map(|id| session.customer_key(*id)).collect::<Vec<_>>();
    let customers = session
        .customers
        .load_many(keys)
        .await?
        .into_iter()
        .flatten() // ids that matched no customer produce no item
        .collect::<Vec<Customer>>();
    tracing::debug!(total_customers = customers.len(), "resolved customer level");

    // Turn 1: register every customer's affiliation interest, then resolve.
    let deferred = customers
        .iter()
        .map(|customer| resolve_affiliations(session, customer.id))
        .collect::<Vec<_>>();
    let affiliation_lists =
        future::join_all(deferred.into_iter().map(Deferred::resolve)).await;

    // Turn 2: register every group interest across all customers, then
    // resolve. Duplicate group ids coalesce inside the group loader.
    let deferred_groups = affiliation_lists
        .iter()
        .map(|list| match list {
            Ok(affiliations) => affiliations
                .iter()
                .map(|a| resolve_group(session, a.group_id))
                .collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        })
        .collect::<Vec<_>>();

    let mut errors = Vec::new();
    let mut items = Vec::with_capacity(customers.len());
    for ((item_idx, customer), (affiliations, deferred_groups)) in
        customers.iter().enumerate().zip(affiliation_lists.iter().zip(deferred_groups))
    {
        let affiliations_value = match affiliations {
            Ok(affiliations) => {
                let groups =
                    future::join_all(deferred_groups.into_iter().map(Deferred::resolve)).await;
                let mut affiliation_items = Vec::with_capacity(affiliations.len());
                for (affiliation_idx, group) in groups.into_iter().enumerate() {
                    let group_value = match group {
                        Ok(Some(group)) => serde_json::to_value(&group)
                            .map_err(|e| LoadError::fetch(e.to_string()))?,
                        Ok(None) => Value::Null,
                        Err(error) => {
                            errors.push(FieldError {
                                path: format!(
                                    "CustomerVisit.items.{item_idx}.customer.affiliations.items.{affiliation_idx}.group"
                                ),
                                message: error.to_string(),
                            });
                            Value::Null
                        }
                    };
                    affiliation_items.push(json!({ "group": group_value }));
                }
                json!({ "items": affiliation_items })
            }
            Err(error) => {
                errors.push(FieldError {
                    path: format!("CustomerVisit.items.{item_idx}.customer.affiliations"),
                    message: error.to_string(),
                });
                Value::Null
            }
        };
        items.push(json!({
            "customer": {
                "id": customer.id,
                "first_name": customer.first_name,
                "last_name": customer.last_name,
                "affiliations": affiliations_value,
            }
        }));
    }

    Ok(QueryOutcome { data: json!({ "CustomerVisit": { "items": items } }), errors })
}
