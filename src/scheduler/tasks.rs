use std::sync::Arc;

use tracing::{error, info};

use crate::config::RefreshConfig;
use crate::pricing::PricingService;
use crate::scheduler::Scheduler;

pub const REFRESH_TASK: &str = "currency-refresh";

/// Register the recurring market cache refresh. Call once, before updates are served.
pub async fn register_refresh_task(
    scheduler: &Scheduler,
    pricing: Arc<dyn PricingService>,
    refresh: &RefreshConfig,
) -> anyhow::Result<()> {
    scheduler
        .add_interval_job(
            REFRESH_TASK,
            refresh.initial_delay(),
            refresh.interval(),
            move || {
                let pricing = pricing.clone();
                Box::pin(async move {
                    match pricing.refresh().await {
                        Ok(count) => info!("Refreshed {} currencies", count),
                        Err(e) => error!("Currency refresh failed: {}", e),
                    }
                })
            },
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::pricing::PricingError;

    #[derive(Default)]
    struct CountingPricing {
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl PricingService for CountingPricing {
        async fn format_currency_details(&self, slug: &str) -> Result<String, PricingError> {
            Err(PricingError::UnknownCurrency(slug.to_string()))
        }

        async fn render_currency_image(&self, slug: &str) -> Result<Vec<u8>, PricingError> {
            Err(PricingError::UnknownCurrency(slug.to_string()))
        }

        async fn refresh(&self) -> Result<usize, PricingError> {
            Ok(self.refreshes.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_refresh_task_warms_cache() {
        let mut scheduler = Scheduler::new().await.unwrap();
        let pricing = Arc::new(CountingPricing::default());

        register_refresh_task(
            &scheduler,
            pricing.clone(),
            &RefreshConfig {
                initial_delay_ms: 100,
                interval_secs: 3600,
            },
        )
        .await
        .unwrap();

        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(pricing.refreshes.load(Ordering::SeqCst), 1);
        scheduler.shutdown().await.unwrap();
    }
}
