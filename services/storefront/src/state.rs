//! State handed to every request handler.

use std::sync::Arc;

use crate::db::{CustomerStore, Database, OrderStore, ProductStore, UserStore};

/// Database handle plus one store per entity, built once at startup.
///
/// Cloning is cheap; handlers receive it through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Stores>,
}

struct Stores {
    db: Database,
    users: UserStore,
    customers: CustomerStore,
    products: ProductStore,
    orders: OrderStore,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        let stores = Stores {
            users: db.users(),
            customers: db.customers(),
            products: db.products(),
            orders: db.orders(),
            db,
        };
        Self {
            inner: Arc::new(stores),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn users(&self) -> &UserStore {
        &self.inner.users
    }

    pub fn customers(&self) -> &CustomerStore {
        &self.inner.customers
    }

    pub fn products(&self) -> &ProductStore {
        &self.inner.products
    }

    pub fn orders(&self) -> &OrderStore {
        &self.inner.orders
    }
}
