//! Typed - 型付き Prompt API
//!
//! prompt 名の typo と出力の形の取り違えを型で排除し、
//! スキーマ検証を provider から独立した明示的な契約にします。
//!
//! # 二層構造
//! - **表層（Typed）**: `Prompt` trait, `TypedGenerator` - 型安全
//! - **内部（Dyn）**: `StructuredGenerator` port - object-safe, JSON のみ

pub mod codec;
pub mod generator;
pub mod prompt;

pub use self::codec::PayloadCodec;
pub use self::generator::TypedGenerator;
pub use self::prompt::Prompt;
