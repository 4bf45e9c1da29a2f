use crate::filters::FilterSet;
use crate::store::{load_state_or_default, FilterStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// A customer account managers curate updates for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Owning account manager or team tag
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub group_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerGroup {
    pub id: String,
    pub name: String,
}

/// Read-mostly directory of customers and groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerDirectory {
    customers: Vec<Customer>,
    groups: Vec<CustomerGroup>,
}

impl CustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory exported by the customer tooling
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read a directory file; a missing file is an empty directory
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Create a customer with a fresh id
    pub fn create_customer(&mut self, name: String, owner: Option<String>) -> Customer {
        let customer = Customer {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            owner,
            group_ids: Vec::new(),
        };
        self.customers.push(customer.clone());
        customer
    }

    /// Remove a customer along with its stored filter mode and override
    pub fn delete_customer(&mut self, id: &str, store: &dyn FilterStore) -> crate::Result<Customer> {
        let index = self
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| crate::Error::NotFound(format!("customer {}", id)))?;

        let mut state = load_state_or_default(store);
        state.forget_customer(id);
        store.save(&state)?;

        info!("Deleted customer {}", id);
        Ok(self.customers.remove(index))
    }

    pub fn add_group(&mut self, name: String) -> CustomerGroup {
        let group = CustomerGroup {
            id: uuid::Uuid::new_v4().to_string(),
            name,
        };
        self.groups.push(group.clone());
        group
    }

    pub fn add_to_group(&mut self, customer_id: &str, group_id: &str) -> crate::Result<()> {
        if !self.groups.iter().any(|g| g.id == group_id) {
            return Err(crate::Error::NotFound(format!("group {}", group_id)));
        }
        let customer = self
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .ok_or_else(|| crate::Error::NotFound(format!("customer {}", customer_id)))?;

        if !customer.group_ids.iter().any(|g| g == group_id) {
            customer.group_ids.push(group_id.to_string());
        }
        Ok(())
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn groups(&self) -> &[CustomerGroup] {
        &self.groups
    }

    pub fn members_of(&self, group_id: &str) -> Vec<&Customer> {
        self.customers
            .iter()
            .filter(|c| c.group_ids.iter().any(|g| g == group_id))
            .collect()
    }

    /// Customers a filter set's targeting fields point at.
    /// No targeting at all means everyone.
    pub fn resolve_audience(&self, filters: &FilterSet) -> Vec<&Customer> {
        if !filters.has_targeting() {
            return self.customers.iter().collect();
        }

        let ids: BTreeSet<&str> = filters
            .target_customer_ids
            .iter()
            .map(String::as_str)
            .collect();
        let groups: BTreeSet<&str> = filters
            .target_group_ids
            .iter()
            .map(String::as_str)
            .collect();
        let owners: Vec<String> = filters
            .target_owner_tags
            .iter()
            .map(|o| o.trim().to_lowercase())
            .collect();

        self.customers
            .iter()
            .filter(|c| {
                ids.contains(c.id.as_str())
                    || c.group_ids.iter().any(|g| groups.contains(g.as_str()))
                    || c
                        .owner
                        .as_ref()
                        .is_some_and(|o| owners.contains(&o.trim().to_lowercase()))
            })
            .collect()
    }
}
