use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use coursepay::config::AppConfig;
use coursepay::gateways::konnect::KonnectGateway;
use coursepay::gateways::stripe::StripeGateway;
use coursepay::gateways::GatewayRegistry;
use coursepay::repo::courses_repo::CoursesRepo;
use coursepay::repo::payments_repo::PaymentsRepo;
use coursepay::repo::promo_codes_repo::PromoCodesRepo;
use coursepay::repo::transactions_repo::TransactionsRepo;
use coursepay::service::payment_service::PaymentService;
use coursepay::service::promo_service::PromoService;
use coursepay::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    if cfg.stripe.webhook_secret.is_none() {
        tracing::warn!(
            "STRIPE_WEBHOOK_SECRET is not set: webhook signature verification is DISABLED"
        );
    }

    let client = reqwest::Client::new();
    let gateways = GatewayRegistry::new(vec![
        Arc::new(KonnectGateway::new(cfg.konnect.clone(), client.clone())),
        Arc::new(StripeGateway::new(cfg.stripe.clone(), client)),
    ]);

    let promo_codes_repo = PromoCodesRepo { pool: pool.clone() };
    let payments_repo = PaymentsRepo { pool: pool.clone() };
    let transactions_repo = TransactionsRepo { pool: pool.clone() };
    let courses_repo = CoursesRepo { pool: pool.clone() };

    let promo_service = PromoService { promo_codes_repo };
    let payment_service = PaymentService {
        payments_repo,
        transactions_repo,
        courses_repo,
        promo_service: promo_service.clone(),
        gateways,
        home_currency: cfg.home_currency.clone(),
        subscription_price: cfg.subscription_price,
    };

    let state = AppState {
        promo_service,
        payment_service,
    };

    let authed_routes = Router::new()
        .route("/checkout", post(coursepay::http::handlers::payments::checkout))
        .route(
            "/payments/:payment_id",
            get(coursepay::http::handlers::payments::get_payment),
        )
        .route(
            "/payments/:payment_id/verify",
            post(coursepay::http::handlers::payments::verify_payment),
        )
        .route(
            "/payments/:payment_id/transaction",
            get(coursepay::http::handlers::payments::get_payment_transaction),
        )
        .route(
            "/promo-codes",
            post(coursepay::http::handlers::promos::create_promo)
                .get(coursepay::http::handlers::promos::list_all_promos),
        )
        .route(
            "/promo-codes/active",
            get(coursepay::http::handlers::promos::list_active_promos),
        )
        .route(
            "/promo-codes/course/:course_id",
            get(coursepay::http::handlers::promos::list_promos_for_course),
        )
        .route(
            "/promo-codes/:promo_code_id",
            get(coursepay::http::handlers::promos::get_promo)
                .patch(coursepay::http::handlers::promos::update_promo)
                .delete(coursepay::http::handlers::promos::delete_promo),
        )
        .route(
            "/promo-codes/:promo_code_id/deactivate",
            post(coursepay::http::handlers::promos::deactivate_promo),
        )
        .layer(from_fn(coursepay::http::middleware::auth::require_identity));

    let app = Router::new()
        .route("/health", get(coursepay::http::handlers::payments::health))
        .route(
            "/promo-codes/validate",
            post(coursepay::http::handlers::promos::validate_promo),
        )
        .route(
            "/webhooks/konnect",
            post(coursepay::http::handlers::webhooks::konnect_webhook),
        )
        .route(
            "/webhooks/stripe",
            post(coursepay::http::handlers::webhooks::stripe_webhook),
        )
        .merge(authed_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
