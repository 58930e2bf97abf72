//! LogHandler - drains parts and logs a summary via tracing

use contracts::{HandlerError, Part, PartHandler};
use tracing::{info, instrument};

/// Handler that reads each part to the end and logs its size
pub struct LogHandler {
    name: String,
}

impl LogHandler {
    /// Create a new LogHandler with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PartHandler for LogHandler {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_handler_handle",
        skip(self, part),
        fields(handler = %self.name, part = %part.name())
    )]
    async fn handle(&self, part: Part) -> Result<(), HandlerError> {
        let name = part.name().to_string();
        let filename = part.filename().map(str::to_string);
        let content_type = part.content_type().map(str::to_string);
        let bytes = part.drain().await?;

        info!(
            handler = %self.name,
            part = %name,
            filename = ?filename,
            content_type = ?content_type,
            bytes,
            "Part received"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{FlushState, ParseError};
    use futures_util::stream;

    #[tokio::test]
    async fn test_log_handler_consumes_part() {
        let flush = FlushState::new();
        let part = Part::new(
            "doc",
            stream::iter(vec![Ok::<_, ParseError>(Bytes::from_static(b"hello"))]),
        )
        .with_filename("doc.txt")
        .tracked(flush.begin());

        let handler = LogHandler::new("audit");
        handler.handle(part).await.unwrap();
        assert_eq!(flush.flushing(), 0);
    }

    #[test]
    fn test_log_handler_name() {
        let handler = LogHandler::new("my_logger");
        assert_eq!(handler.name(), "my_logger");
    }

    #[tokio::test]
    async fn test_log_handler_reports_stream_error() {
        let part = Part::new(
            "doc",
            stream::iter(vec![Err::<Bytes, _>(ParseError::malformed("cut off"))]),
        );
        let err = LogHandler::new("audit").handle(part).await.unwrap_err();
        assert!(err.to_string().contains("cut off"));
    }
}
