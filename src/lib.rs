pub mod config;
pub mod domain {
    pub mod auth;
    pub mod payment;
    pub mod promo;
    pub mod transaction;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod payments;
        pub mod promos;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod auth;
    }
}
pub mod lifecycle;
pub mod money;
pub mod repo {
    pub mod courses_repo;
    pub mod payments_repo;
    pub mod promo_codes_repo;
    pub mod transactions_repo;
}
pub mod service {
    pub mod payment_service;
    pub mod promo_service;
}

#[derive(Clone)]
pub struct AppState {
    pub promo_service: service::promo_service::PromoService,
    pub payment_service: service::payment_service::PaymentService,
}
