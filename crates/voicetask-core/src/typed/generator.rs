//! TypedGenerator - 型付き呼び出しの表層
//!
//! # 二層構造
//! - **表層（Typed）**: `TypedGenerator::run::<P>()` - 型安全
//! - **内部（Dyn）**: `Arc<dyn StructuredGenerator>` - object-safe, provider 非依存

use std::sync::Arc;

use tracing::debug;

use super::codec::PayloadCodec;
use super::prompt::Prompt;
use crate::domain::Result;
use crate::ports::StructuredGenerator;

#[derive(Clone)]
pub struct TypedGenerator {
    inner: Arc<dyn StructuredGenerator>,
}

impl TypedGenerator {
    pub fn new(inner: Arc<dyn StructuredGenerator>) -> Self {
        Self { inner }
    }

    /// Encode `input`, call the generator, decode the answer as `P::Output`.
    pub async fn run<P: Prompt>(&self, input: &P::Input) -> Result<P::Output> {
        let request = PayloadCodec::encode::<P>(input)?;
        debug!(prompt = P::NAME, "calling structured generator");
        let value = self.inner.generate(request).await?;
        PayloadCodec::decode::<P>(value)
    }
}

impl std::fmt::Debug for TypedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedGenerator").finish_non_exhaustive()
    }
}
