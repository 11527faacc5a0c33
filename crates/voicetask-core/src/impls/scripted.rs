//! ScriptedGenerator - あらかじめ用意した応答を返す generator
//!
//! テストと `--offline` モード用。prompt 名ごとに FIFO で応答を消費し、
//! 台本が尽きたら `repeat` で登録した応答、それもなければ `Generation` エラーを返す。
//! （resolver 側は fallback に落ちるので、台本なしでも全フローが動く）

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Result, TaskerError};
use crate::ports::{GenerationRequest, StructuredGenerator};

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<Result<Value>>>,
    repeated: HashMap<String, Value>,
    calls: Vec<GenerationRequest>,
}

#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<Script>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next call of `prompt_name` with `value`.
    pub fn respond(self, prompt_name: &str, value: Value) -> Self {
        self.push(prompt_name, Ok(value));
        self
    }

    /// Fail the next call of `prompt_name` with `error`.
    pub fn fail(self, prompt_name: &str, error: TaskerError) -> Self {
        self.push(prompt_name, Err(error));
        self
    }

    /// Answer every call of `prompt_name` with `value` once the queue is empty.
    pub fn repeat(self, prompt_name: &str, value: Value) -> Self {
        self.lock().repeated.insert(prompt_name.to_string(), value);
        self
    }

    pub fn push(&self, prompt_name: &str, response: Result<Value>) {
        self.lock()
            .queued
            .entry(prompt_name.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.lock().calls.clone()
    }

    /// Prompt names of every request received so far, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(|r| r.prompt_name).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StructuredGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Value> {
        let mut script = self.lock();
        let name = request.prompt_name;
        script.calls.push(request);

        if let Some(response) = script.queued.get_mut(name).and_then(VecDeque::pop_front) {
            return response;
        }
        script
            .repeated
            .get(name)
            .cloned()
            .ok_or_else(|| TaskerError::Generation(format!("no scripted response for '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: &'static str) -> GenerationRequest {
        GenerationRequest {
            prompt_name: name,
            instructions: String::new(),
            input: json!({}),
            output_schema: json!({}),
        }
    }

    #[tokio::test]
    async fn queued_then_repeated_then_error() {
        let generator = ScriptedGenerator::new()
            .respond("a", json!(1))
            .repeat("a", json!(2));

        assert_eq!(generator.generate(request("a")).await.unwrap(), json!(1));
        assert_eq!(generator.generate(request("a")).await.unwrap(), json!(2));
        assert_eq!(generator.generate(request("a")).await.unwrap(), json!(2));
        assert!(matches!(
            generator.generate(request("b")).await,
            Err(TaskerError::Generation(_))
        ));
        assert_eq!(generator.call_names(), vec!["a", "a", "a", "b"]);
    }

    #[tokio::test]
    async fn scripted_failure_is_returned() {
        let generator =
            ScriptedGenerator::new().fail("a", TaskerError::schema_violation("a", "bad"));
        assert!(matches!(
            generator.generate(request("a")).await,
            Err(TaskerError::SchemaViolation { .. })
        ));
    }
}
