//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    auth::{AuthService, GoogleTokenVerifier, OtpSender, PgAuthService},
    database::{self, Db},
    domain::{
        carts::{CartsService, PgCartsService},
        categories::{CategoriesService, PgCategoriesService},
        orders::{ClearCartHook, NotifyHook, OrderPlacedHook, OrdersService, PgOrdersService},
        products::{PgProductsService, ProductsService},
        settings::{PgSettingsService, SettingsService},
    },
    notifications::{ChatNotifier, Mailer},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// Outbound integrations the context cannot build on its own.
#[derive(Clone)]
pub struct ExternalProviders {
    pub google: Arc<dyn GoogleTokenVerifier>,
    pub otp: Arc<dyn OtpSender>,
    pub mailer: Arc<dyn Mailer>,
    pub chat: Arc<dyn ChatNotifier>,
}

#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<dyn AuthService>,
    pub categories: Arc<dyn CategoriesService>,
    pub products: Arc<dyn ProductsService>,
    pub carts: Arc<dyn CartsService>,
    pub orders: Arc<dyn OrdersService>,
    pub settings: Arc<dyn SettingsService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(
        url: &str,
        providers: ExternalProviders,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        let db = Db::new(pool.clone());

        let auth: Arc<dyn AuthService> = Arc::new(PgAuthService::new(
            pool,
            providers.google,
            providers.otp,
        ));
        let carts: Arc<dyn CartsService> = Arc::new(PgCartsService::new(db.clone()));
        let products: Arc<dyn ProductsService> = Arc::new(PgProductsService::new(db.clone()));
        let settings: Arc<dyn SettingsService> = Arc::new(PgSettingsService::new(db.clone()));

        let hooks: Vec<Arc<dyn OrderPlacedHook>> = vec![
            Arc::new(ClearCartHook::new(Arc::clone(&carts))),
            Arc::new(NotifyHook::new(
                Arc::clone(&auth),
                Arc::clone(&settings),
                providers.mailer,
                providers.chat,
            )),
        ];

        let orders: Arc<dyn OrdersService> = Arc::new(PgOrdersService::new(
            db.clone(),
            Arc::clone(&carts),
            Arc::clone(&products),
            hooks,
        ));

        Ok(Self {
            auth,
            categories: Arc::new(PgCategoriesService::new(db)),
            products,
            carts,
            orders,
            settings,
        })
    }
}
