//! Multer-backed form parser
//!
//! Parts carrying a filename are streamed to the dispatcher as [`Part`]s; parts
//! without one are read whole and emitted as fields.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use contracts::{
    FlushGuard, FlushState, FormEvent, FormParser, MultipartConfig, ParseError, Part,
};
use futures_util::{stream, Stream, StreamExt};
use tracing::{debug, instrument};

use crate::limits::FieldLimits;

type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Request body plus its multipart boundary
pub struct MulterSource {
    boundary: String,
    body: BodyStream,
}

impl MulterSource {
    /// Create a source from a boundary and a body stream
    pub fn new<S>(boundary: impl Into<String>, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        Self {
            boundary: boundary.into(),
            body: Box::pin(body),
        }
    }

    /// Create a source from a `Content-Type` header value
    ///
    /// # Errors
    /// Returns `Malformed` if the header is not `multipart/form-data` with a boundary
    pub fn from_content_type<S>(content_type: &str, body: S) -> Result<Self, ParseError>
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        let boundary = multer::parse_boundary(content_type).map_err(map_multer_error)?;
        Ok(Self::new(boundary, body))
    }

    /// Create a source from a fully buffered body
    pub fn from_bytes(boundary: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(boundary, stream::once(async move { Ok(body) }))
    }

    /// Multipart boundary
    pub fn boundary(&self) -> &str {
        &self.boundary
    }
}

/// Body of one multer field
///
/// Multer only yields the next field once the previous one is dropped, so the
/// slot in `current` is held for as long as the field itself.
struct FieldBody {
    field: multer::Field<'static>,
    _slot: FlushGuard,
}

impl Stream for FieldBody {
    type Item = Result<Bytes, ParseError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.field
            .poll_next_unpin(cx)
            .map(|chunk| chunk.map(|chunk| chunk.map_err(map_multer_error)))
    }
}

/// Parser over a real `multipart/form-data` body
pub struct MulterParser {
    multipart: multer::Multipart<'static>,
    limits: FieldLimits,
    flush: FlushState,
    /// Tracks the emitted field that still borrows the multer state
    current: FlushState,
    body_guard: Option<FlushGuard>,
    done: bool,
}

impl MulterParser {
    fn finish(&mut self, event: FormEvent) -> Option<FormEvent> {
        self.done = true;
        self.body_guard.take();
        Some(event)
    }

    fn file_part(&self, field: multer::Field<'static>, name: String, filename: String) -> Part {
        let content_type = field.content_type().map(|mime| mime.to_string());
        let body = FieldBody {
            field,
            _slot: self.current.begin(),
        };

        let part = Part::new(name, body)
            .with_filename(filename)
            .tracked(self.flush.begin());
        match content_type {
            Some(content_type) => part.with_content_type(content_type),
            None => part,
        }
    }
}

impl FormParser for MulterParser {
    type Source = MulterSource;

    fn start(source: MulterSource, config: &MultipartConfig) -> Self {
        let flush = FlushState::new();
        let body_guard = Some(flush.begin());

        Self {
            multipart: multer::Multipart::new(source.body, source.boundary),
            limits: FieldLimits::new(config),
            flush,
            current: FlushState::new(),
            body_guard,
            done: false,
        }
    }

    #[instrument(name = "multer_parser_next_event", skip(self))]
    async fn next_event(&mut self) -> Option<FormEvent> {
        if self.done {
            return None;
        }

        self.current.flushed().await;
        let field = match self.multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return self.finish(FormEvent::Close),
            Err(e) => return self.finish(FormEvent::Error(map_multer_error(e))),
        };

        if let Err(error) = self.limits.count_part() {
            return self.finish(FormEvent::Error(error));
        }

        let name = field.name().unwrap_or_default().to_string();
        if let Some(filename) = field.file_name().map(str::to_string) {
            debug!(name = %name, filename = %filename, "file part");
            return Some(FormEvent::Part(self.file_part(field, name, filename)));
        }

        let value = match field.text().await {
            Ok(value) => value,
            Err(e) => return self.finish(FormEvent::Error(map_multer_error(e))),
        };
        if let Err(error) = self.limits.add_field_value(value.len()) {
            return self.finish(FormEvent::Error(error));
        }
        debug!(key = %name, len = value.len(), "field");
        Some(FormEvent::Field { key: name, value })
    }

    fn flush_state(&self) -> FlushState {
        self.flush.clone()
    }
}

fn map_multer_error(error: multer::Error) -> ParseError {
    ParseError::Malformed {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "X-FORM-BOUNDARY";

    fn body(sections: &[(&str, Option<&str>, &str)]) -> String {
        let mut out = String::new();
        for (name, filename, value) in sections {
            out.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(filename) => {
                    out.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    ));
                    out.push_str("Content-Type: text/plain\r\n");
                }
                None => {
                    out.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"\r\n"
                    ));
                }
            }
            out.push_str("\r\n");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        out
    }

    #[tokio::test]
    async fn test_fields_and_files_are_split() {
        let raw = body(&[
            ("title", None, "holiday"),
            ("photos[0]", Some("a.txt"), "first file"),
        ]);
        let source = MulterSource::from_bytes(BOUNDARY, raw);
        let mut parser = MulterParser::start(source, &MultipartConfig::default());

        match parser.next_event().await {
            Some(FormEvent::Field { key, value }) => {
                assert_eq!(key, "title");
                assert_eq!(value, "holiday");
            }
            other => panic!("expected field, got {other:?}"),
        }

        let part = match parser.next_event().await {
            Some(FormEvent::Part(part)) => part,
            other => panic!("expected part, got {other:?}"),
        };
        assert_eq!(part.name(), "photos[0]");
        assert_eq!(part.filename(), Some("a.txt"));
        assert_eq!(part.content_type(), Some("text/plain"));
        assert_eq!(part.bytes().await.unwrap(), Bytes::from_static(b"first file"));

        assert!(matches!(parser.next_event().await, Some(FormEvent::Close)));
        assert_eq!(parser.flush_state().flushing(), 0);
    }

    #[tokio::test]
    async fn test_max_fields_counts_files() {
        let raw = body(&[("title", None, "x"), ("doc", Some("d.txt"), "y")]);
        let source = MulterSource::from_bytes(BOUNDARY, raw);
        let mut parser = MulterParser::start(source, &MultipartConfig::with_max_fields(1));

        assert!(matches!(
            parser.next_event().await,
            Some(FormEvent::Field { .. })
        ));
        assert!(matches!(
            parser.next_event().await,
            Some(FormEvent::Error(ParseError::FieldsLimitExceeded { limit: 1 }))
        ));
        assert!(parser.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_boundary_from_content_type() {
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        let source = MulterSource::from_content_type(
            &content_type,
            stream::iter(Vec::<Result<Bytes, std::io::Error>>::new()),
        )
        .unwrap();
        assert_eq!(source.boundary(), BOUNDARY);

        assert!(MulterSource::from_content_type(
            "application/json",
            stream::iter(Vec::<Result<Bytes, std::io::Error>>::new()),
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_truncated_body_reports_error() {
        let raw = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nno end"
        );
        let source = MulterSource::from_bytes(BOUNDARY, raw);
        let mut parser = MulterParser::start(source, &MultipartConfig::default());

        assert!(matches!(
            parser.next_event().await,
            Some(FormEvent::Error(ParseError::Malformed { .. }))
        ));
        assert_eq!(parser.flush_state().flushing(), 0);
    }
}
