//! Single frame extraction from a multipart MJPEG stream.
//!
//! Many cameras only expose a stream. To get a snapshot out of one we read the
//! first part's headers with one bounded read, then read exactly the declared
//! number of image bytes and hang up. The stream is never buffered beyond the
//! first frame.

use crate::http::{get_following_redirects, BodyError, HttpExecutor, HttpResult, MAX_BODY_SIZE};
use bytes::BytesMut;
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info};

/// Upper bound for the boundary line plus part headers.
pub const INITIAL_READ_SIZE: usize = 300;

const PART_HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error)]
enum ExtractError {
  #[error("no response from the stream url")]
  NoResponse,
  #[error("stream url returned status {0}")]
  BadStatus(StatusCode),
  #[error("stream isn't multipart, content type {0:?}")]
  NotMultipart(Option<String>),
  #[error("stream returned no data")]
  NoData,
  #[error("part headers weren't terminated within the first {0} bytes")]
  HeadersTooLong(usize),
  #[error("part headers are missing {0:?}")]
  IncompletePartHeaders(Vec<&'static str>),
  #[error("part declares {0} bytes, more than a single frame may be")]
  FrameTooLarge(usize),
  #[error("part content type {0:?} isn't a valid header value")]
  InvalidContentType(String),
  #[error("stream ended early, expected {expected} more bytes but got {got}")]
  ShortRead { expected: usize, got: usize },
  #[error("frame buffer is {got} bytes, expected {expected}")]
  SizeMismatch { expected: usize, got: usize },
  #[error("timed out reading the stream")]
  Timeout,
  #[error("connection error reading the stream: {0}")]
  Connection(String),
}

impl From<BodyError> for ExtractError {
  fn from(e: BodyError) -> Self {
    match e {
      BodyError::Timeout => ExtractError::Timeout,
      BodyError::Connection(msg) => ExtractError::Connection(msg),
      BodyError::TooLarge(limit) => ExtractError::FrameTooLarge(limit),
    }
  }
}

impl ExtractError {
  /// Unavailable or non-MJPEG sources are routine; faults after the frame
  /// size is known are not.
  fn log(&self, url: &str) {
    match self {
      ExtractError::Timeout => debug!(url, error = %self, "snapshot from stream failed"),
      ExtractError::ShortRead { .. }
      | ExtractError::SizeMismatch { .. }
      | ExtractError::Connection(_) => error!(url, error = %self, "snapshot from stream failed"),
      _ => info!(url, error = %self, "snapshot from stream failed"),
    }
  }
}

struct PartHeaders {
  content_type: String,
  content_length: usize,
  /// Bytes from the start of the read up to and including the terminator.
  block_len: usize,
}

/// Pulls the first JPEG out of the MJPEG stream at `url`.
///
/// The returned result looks like a plain snapshot response: status 200,
/// `content-type` and `content-length` headers, and the image as its full
/// body. Any failure yields `None` after logging.
pub async fn get_snapshot_from_stream(executor: &dyn HttpExecutor, url: &str) -> Option<HttpResult> {
  match extract_first_frame(executor, url).await {
    Ok(result) => Some(result),
    Err(e) => {
      e.log(url);
      None
    }
  }
}

async fn extract_first_frame(executor: &dyn HttpExecutor, url: &str) -> Result<HttpResult, ExtractError> {
  let mut result = get_following_redirects(executor, url)
    .await
    .ok_or(ExtractError::NoResponse)?;
  if !result.is_success() {
    return Err(ExtractError::BadStatus(result.status()));
  }

  let content_type = result.header_str(CONTENT_TYPE.as_str()).map(str::to_string);
  let is_multipart = content_type
    .as_deref()
    .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/"))
    .unwrap_or(false);
  if !is_multipart {
    return Err(ExtractError::NotMultipart(content_type));
  }

  // The body is dropped with `result` on every early return, closing the connection.
  let body = result.body_mut();
  let head = body.read(INITIAL_READ_SIZE).await?;
  if head.is_empty() {
    return Err(ExtractError::NoData);
  }

  let part = parse_part_headers(&head)?;
  let total = part
    .block_len
    .checked_add(part.content_length)
    .ok_or(ExtractError::FrameTooLarge(part.content_length))?;

  let mut frame = BytesMut::from(&head[..]);
  if frame.len() < total {
    let expected = total - frame.len();
    let rest = body.read(expected).await?;
    if rest.len() != expected {
      return Err(ExtractError::ShortRead {
        expected,
        got: rest.len(),
      });
    }
    frame.extend_from_slice(&rest);
  }
  body.close();

  frame.truncate(total);
  if frame.len() != total {
    return Err(ExtractError::SizeMismatch {
      expected: total,
      got: frame.len(),
    });
  }

  let image = frame.split_off(part.block_len).freeze();
  if image.len() != part.content_length {
    error!(
      url,
      declared = part.content_length,
      actual = image.len(),
      "extracted frame size doesn't match the declared content length"
    );
  }

  let content_type = HeaderValue::from_str(&part.content_type)
    .map_err(|_| ExtractError::InvalidContentType(part.content_type.clone()))?;

  result.set_status(StatusCode::OK);
  let headers = result.headers_mut();
  headers.clear();
  headers.insert(CONTENT_TYPE, content_type);
  headers.insert(CONTENT_LENGTH, HeaderValue::from(image.len()));
  debug!(url, bytes = image.len(), "extracted a frame from the stream");
  result.set_full_body(image);

  Ok(result)
}

fn parse_part_headers(head: &[u8]) -> Result<PartHeaders, ExtractError> {
  // Searching raw bytes keeps offsets exact even if the text decode below replaces bytes.
  let end = head
    .windows(PART_HEADER_TERMINATOR.len())
    .position(|w| w == PART_HEADER_TERMINATOR)
    .ok_or(ExtractError::HeadersTooLong(INITIAL_READ_SIZE))?;
  let text = String::from_utf8_lossy(&head[..end]);

  let mut content_type = None;
  let mut content_length = 0usize;
  for line in text.split("\r\n") {
    let Some((name, value)) = line.split_once(':') else {
      continue;
    };
    let name = name.trim().to_ascii_lowercase();
    if name == "content-type" {
      content_type = Some(value.trim().to_string());
    } else if name == "content-length" {
      content_length = value.trim().parse().unwrap_or(0);
    }
  }

  let mut missing = Vec::new();
  if content_type.is_none() {
    missing.push("content-type");
  }
  if content_length == 0 {
    missing.push("content-length");
  }
  if content_length > MAX_BODY_SIZE {
    return Err(ExtractError::FrameTooLarge(content_length));
  }
  match content_type {
    Some(content_type) if missing.is_empty() => Ok(PartHeaders {
      content_type,
      content_length,
      block_len: end + PART_HEADER_TERMINATOR.len(),
    }),
    _ => Err(ExtractError::IncompletePartHeaders(missing)),
  }
}
