//! Walkthrough against a live app: open a page, wait for its API calls to
//! go idle, drive a dropdown and a toggle, then grab a screenshot.
//!
//! Run with a reachable target, e.g.
//! `TARGET_URL=http://localhost:3000/orders cargo run --example order_review`

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use driver::{IdleConfig, Session, SessionConfig, WaitConfig};
use quiesce_core::ResourceExpectation;
use quiesce_pages::{Component, Locator, LocatorTable, ToggleKind};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,driver=debug".into()),
        )
        .init();

    let target =
        std::env::var("TARGET_URL").unwrap_or_else(|_| "http://localhost:3000/orders".into());

    let session = Session::launch_with(
        SessionConfig::default().with_viewport(1440, 900),
        WaitConfig::default(),
        IdleConfig::default(),
    )
    .await?;

    let page = Arc::new(session.open(&target).await?);
    page.wait_for_resources(&[
        ResourceExpectation::named("/api/orders"),
        ResourceExpectation::at_least("/api/line-items", 2),
    ])
    .await?;

    let mut locators = LocatorTable::new();
    locators.insert("status-filter", Locator::test_id("order-status-filter"));
    locators.insert("express-toggle", Locator::css("#express-shipping"));

    let orders = Component::new(Arc::new(locators), page.clone());
    orders.select_from_dropdown("status-filter", "Shipped").await?;
    orders
        .set_toggle("express-toggle", ToggleKind::Checkbox, true)
        .await?;

    page.wait_until_idle().await?;
    page.check_accessibility(true).await?;
    page.screenshot(Path::new("orders.png")).await?;

    session.close().await?;
    Ok(())
}
