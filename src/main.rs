use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use credforge_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{MailerService, PlanNotifier, StripeService},
    handlers,
    middlewares::create_cors,
    repositories::{DbAdminDirectory, DbIssuerDirectory, DbLedgerStore, DbPlanStore},
    services::{CatalogService, SubscriptionService},
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // load configuration
    let config = Config::from_toml().expect("Failed to load configuration file");

    // create the database connection pool
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // run database migrations
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // external services
    let stripe_service = StripeService::new(config.stripe.clone());
    let mailer_service = MailerService::new(config.mailer.clone());
    let notifier: Arc<dyn PlanNotifier> = Arc::new(mailer_service.clone());

    // repositories
    let admins = Arc::new(DbAdminDirectory::new(pool.clone()));
    let issuers = Arc::new(DbIssuerDirectory::new(pool.clone()));
    let plans = Arc::new(DbPlanStore::new(pool.clone()));
    let ledgers = Arc::new(DbLedgerStore::new(pool.clone()));

    // services
    let catalog_service = CatalogService::new(admins.clone(), plans.clone());
    let subscription_service = SubscriptionService::new(
        issuers.clone(),
        plans.clone(),
        ledgers.clone(),
        notifier,
        stripe_service.clone(),
        mailer_service.clone(),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(subscription_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::plan_config)
                    .configure(handlers::subscription_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
