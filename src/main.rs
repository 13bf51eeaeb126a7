use anyhow::Context;
use provision_db::MongoStore;
use provision_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load provision settings")?;
    provision_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        db = %settings.database.uri,
        admin = %settings.admin.username,
        "provision bootstrap starting"
    );

    let catalog = provision_app::catalog::fixed()?;
    let store = MongoStore::connect(&settings.database, &settings.admin)
        .await
        .with_context(|| "failed to configure database client")?;

    provision_app::bootstrap(&store, &catalog, &settings.bootstrap)
        .await
        .with_context(|| "database bootstrap failed")?;

    Ok(())
}
