use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting search");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} opportunities", raw_data.len());
        self.monitor.log_stats("extract");

        let result = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "Transformed {} rows ({} duplicates dropped)",
            result.rows.len(),
            result.duplicates_dropped
        );
        self.monitor.log_stats("transform");

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
