//! Transcriber port - 音声→テキスト
//!
//! 音声は `AudioClip`（MIME type + bytes）として渡す。
//! ブラウザから届く `data:<mime>;base64,<data>` 形式の URI もここで受け付ける。

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::domain::{Result, TaskerError};

/// Recorded audio handed to a `Transcriber`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Parse `data:<mime>;base64,<payload>`.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| TaskerError::Transcription("audio is not a data URI".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| TaskerError::Transcription("data URI has no payload".into()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            TaskerError::Transcription("data URI must be base64 encoded".into())
        })?;
        if mime_type.is_empty() {
            return Err(TaskerError::Transcription(
                "data URI is missing a MIME type".into(),
            ));
        }
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| TaskerError::Transcription(format!("invalid base64 audio: {e}")))?;
        Ok(Self::new(mime_type, bytes))
    }

    /// File extension used when uploading the clip.
    pub fn file_extension(&self) -> &'static str {
        let subtype = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .rsplit('/')
            .next()
            .unwrap_or_default();
        match subtype {
            "webm" => "webm",
            "ogg" => "ogg",
            "wav" | "x-wav" | "wave" => "wav",
            "mpeg" | "mp3" => "mp3",
            "mp4" | "m4a" | "x-m4a" => "m4a",
            "flac" => "flac",
            _ => "bin",
        }
    }
}

/// Transcriber は音声をテキストに変換する
///
/// 空文字列や聞き取れない入力は `TaskerError::Transcription` にする。
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &AudioClip) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_data_uri() {
        let clip = AudioClip::from_data_uri("data:audio/webm;codecs=opus;base64,aGVsbG8=").unwrap();
        assert_eq!(clip.mime_type, "audio/webm;codecs=opus");
        assert_eq!(clip.bytes, b"hello");
        assert_eq!(clip.file_extension(), "webm");
    }

    #[test]
    fn rejects_non_data_uri() {
        assert!(matches!(
            AudioClip::from_data_uri("https://example.com/a.wav"),
            Err(TaskerError::Transcription(_))
        ));
        assert!(AudioClip::from_data_uri("data:audio/wav,plain").is_err());
        assert!(AudioClip::from_data_uri("data:;base64,aGVsbG8=").is_err());
    }
}
