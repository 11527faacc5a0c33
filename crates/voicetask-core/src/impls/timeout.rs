//! TimeoutGenerator - 任意の generator に制限時間をかける decorator

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{Result, TaskerError};
use crate::ports::{GenerationRequest, StructuredGenerator};

/// Fails with `TaskerError::Generation` when the wrapped call takes longer
/// than `limit`.
#[derive(Clone)]
pub struct TimeoutGenerator {
    inner: Arc<dyn StructuredGenerator>,
    limit: Duration,
}

impl TimeoutGenerator {
    pub fn new(inner: Arc<dyn StructuredGenerator>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl StructuredGenerator for TimeoutGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<serde_json::Value> {
        let prompt = request.prompt_name;
        match tokio::time::timeout(self.limit, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(prompt, limit_ms = self.limit.as_millis() as u64, "generation timed out");
                Err(TaskerError::Generation(format!(
                    "'{prompt}' timed out after {}ms",
                    self.limit.as_millis()
                )))
            }
        }
    }
}

impl std::fmt::Debug for TimeoutGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutGenerator")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Slow(Duration);

    #[async_trait]
    impl StructuredGenerator for Slow {
        async fn generate(&self, _request: GenerationRequest) -> Result<serde_json::Value> {
            tokio::time::sleep(self.0).await;
            Ok(json!({"ok": true}))
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt_name: "test.slow.v1",
            instructions: String::new(),
            input: json!({}),
            output_schema: json!({}),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out() {
        let generator = TimeoutGenerator::new(
            Arc::new(Slow(Duration::from_secs(30))),
            Duration::from_secs(5),
        );
        let err = generator.generate(request()).await.unwrap_err();
        assert!(matches!(err, TaskerError::Generation(msg) if msg.contains("timed out")));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_generator_passes_through() {
        let generator = TimeoutGenerator::new(
            Arc::new(Slow(Duration::from_millis(10))),
            Duration::from_secs(5),
        );
        assert_eq!(generator.generate(request()).await.unwrap(), json!({"ok": true}));
    }
}
