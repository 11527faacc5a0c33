//! Prompt trait - 型付きプロンプトの定義
//!
//! # 学習ポイント
//! - Associated Constants (`const NAME`)
//! - Associated Types で入力・出力の型を対応付ける

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Prompt は prompt 名・入力型・出力型・出力スキーマを対応付ける
///
/// # 使用例
/// ```ignore
/// struct ExtractTime;
///
/// impl Prompt for ExtractTime {
///     const NAME: &'static str = "voicetask.time.extract.v1";
///     type Input = ExtractTimeInput;
///     type Output = ExtractTimeOutput;
///     fn instructions(input: &Self::Input) -> String { ... }
///     fn output_schema() -> serde_json::Value { ... }
/// }
/// ```
///
/// # Trait Bounds
/// - `Input: Serialize`: generator に JSON で渡すため
/// - `Output: DeserializeOwned`: 返ってきた JSON を型に落とすため
pub trait Prompt: Send + Sync + 'static {
    /// prompt 名
    ///
    /// # 命名規約
    /// - `voicetask.{domain}.{action}.v{major}`
    const NAME: &'static str;

    type Input: Serialize + Send + Sync;

    type Output: DeserializeOwned + Send;

    /// Rendered instructions for one call.
    fn instructions(input: &Self::Input) -> String;

    /// JSON Schema of `Output`, sent along with the request.
    fn output_schema() -> serde_json::Value;
}
