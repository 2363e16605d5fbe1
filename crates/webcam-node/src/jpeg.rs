//! JFIF identifier repair.
//!
//! Some webcam servers emit an APP0 segment whose identifier is zeroed instead
//! of `JFIF\0`. Strict decoders reject those images, so the identifier is
//! patched before a snapshot leaves this service.

use crate::http::HttpResult;
use crate::metrics;
use bytes::{Bytes, BytesMut};
use tracing::{debug, error};

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const JFIF: [u8; 4] = *b"JFIF";

/// Offset of an APP0 identifier that needs repair, or `None` when the buffer
/// should be left alone (not a jpeg, already conformant, or unparseable).
pub fn find_app0_identifier_needing_repair(buf: &[u8]) -> Option<usize> {
    if buf.len() < 2 || buf[0] != MARKER_PREFIX || buf[1] != SOI {
        return None;
    }

    let mut pos = 2usize;
    while pos < buf.len() {
        if pos + 1 >= buf.len() {
            error!(offset = pos, len = buf.len(), "ran out of buffer before finding the jpeg APP0 segment");
            return None;
        }
        if buf[pos] != MARKER_PREFIX {
            error!(offset = pos, byte = buf[pos], "jpeg segment header didn't start with 0xFF");
            return None;
        }

        match buf[pos + 1] {
            SOS => {
                debug!("found the jpeg start of scan before an APP0 segment");
                return None;
            }
            APP0 => {
                // Skip the marker and the two length bytes.
                let id = pos + 4;
                let Some(identifier) = buf.get(id..id + 5) else {
                    error!(offset = id, len = buf.len(), "jpeg APP0 segment is truncated");
                    return None;
                };
                let needs_repair = identifier[..4].contains(&0) || identifier[4] != 0;
                return needs_repair.then_some(id);
            }
            _ => {
                let Some(len_bytes) = buf.get(pos + 2..pos + 4) else {
                    error!(offset = pos, "jpeg segment length is truncated");
                    return None;
                };
                // The length counts its own two bytes.
                let segment_len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
                if segment_len < 2 {
                    error!(offset = pos, segment_len, "jpeg segment length is invalid");
                    return None;
                }
                pos += 2 + segment_len;
            }
        }
    }

    debug!("walked the jpeg headers without finding an APP0 segment");
    None
}

/// A repaired copy of `buf`, or `None` if it doesn't need one.
///
/// The copy is only made when a byte actually changes.
pub fn repair_jfif_identifier(buf: &Bytes) -> Option<Bytes> {
    let offset = find_app0_identifier_needing_repair(buf)?;

    let mut repaired = BytesMut::from(&buf[..]);
    for (i, letter) in JFIF.iter().enumerate() {
        if repaired[offset + i] == 0 {
            repaired[offset + i] = *letter;
        }
    }
    repaired[offset + 4] = 0;

    Some(repaired.freeze())
}

/// Buffers the snapshot and repairs its JFIF identifier if needed.
///
/// Returns `None` only when the body can't be read; a buffer that merely looks
/// corrupt is passed through untouched.
pub async fn ensure_jpeg_header_info(mut result: HttpResult) -> Option<HttpResult> {
    let buf = match result.buffer_body().await {
        Ok(buf) => buf,
        Err(e) => {
            error!(url = %result.url(), error = %e, "failed to buffer the snapshot body");
            return None;
        }
    };

    if let Some(repaired) = repair_jfif_identifier(&buf) {
        debug!(url = %result.url(), "repaired the jpeg APP0 identifier");
        metrics::JPEG_HEADER_REPAIRS_TOTAL.inc();
        result.set_full_body(repaired);
    }

    Some(result)
}
