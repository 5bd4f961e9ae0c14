//! Subword encoders used to measure and slice transcript text.

use anyhow::{Result, bail};
use tiktoken_rs::CoreBPE;

/// Encodes text into token ids and back
pub trait TokenEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Fails when the slice does not decode to valid UTF-8, e.g. when it
    /// starts or ends inside a multi-byte character.
    fn decode(&self, tokens: &[u32]) -> Result<String>;

    fn name(&self) -> &str;
}

/// BPE encoder backed by tiktoken vocabularies
pub struct TiktokenEncoder {
    name: String,
    bpe: CoreBPE,
}

impl TiktokenEncoder {
    /// Load a named encoding ("cl100k_base", "o200k_base", "p50k_base", "r50k_base")
    pub fn for_encoding(name: &str) -> Result<Self> {
        let bpe = match name {
            "cl100k_base" => tiktoken_rs::cl100k_base()?,
            "o200k_base" => tiktoken_rs::o200k_base()?,
            "p50k_base" => tiktoken_rs::p50k_base()?,
            "r50k_base" => tiktoken_rs::r50k_base()?,
            other => bail!("unknown encoding: {}", other),
        };
        Ok(Self {
            name: name.to_string(),
            bpe,
        })
    }
}

impl TokenEncoder for TiktokenEncoder {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.bpe.decode(tokens.iter().map(|&t| t as _).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// One token per character; lossless and predictable
    pub struct CharEncoder;

    impl TokenEncoder for CharEncoder {
        fn encode(&self, text: &str) -> Vec<u32> {
            text.chars().map(|c| c as u32).collect()
        }

        fn decode(&self, tokens: &[u32]) -> Result<String> {
            tokens
                .iter()
                .map(|&t| char::from_u32(t).ok_or_else(|| anyhow::anyhow!("invalid token {}", t)))
                .collect()
        }

        fn name(&self) -> &str {
            "chars"
        }
    }

    /// One token per UTF-8 byte; slices that cut a character do not decode
    pub struct ByteEncoder;

    impl TokenEncoder for ByteEncoder {
        fn encode(&self, text: &str) -> Vec<u32> {
            text.bytes().map(u32::from).collect()
        }

        fn decode(&self, tokens: &[u32]) -> Result<String> {
            let bytes = tokens
                .iter()
                .map(|&t| u8::try_from(t))
                .collect::<std::result::Result<Vec<u8>, _>>()?;
            Ok(String::from_utf8(bytes)?)
        }

        fn name(&self) -> &str {
            "bytes"
        }
    }
}
