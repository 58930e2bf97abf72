//! Request body source for the `run` command.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use form_parser::MulterSource;
use futures_util::{stream, Stream};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{CliError, Result};

/// Bytes inspected when looking for the opening boundary line
const SNIFF_LEN: usize = 512;

/// Open a body file as a multipart source
///
/// The boundary comes from `content_type` when given, otherwise from the first
/// line of the body (`--<boundary>`).
pub async fn open_source(
    path: &Path,
    content_type: Option<&str>,
    chunk_size: usize,
) -> Result<MulterSource> {
    if !path.exists() {
        return Err(CliError::body_not_found(path.display().to_string()));
    }

    let boundary = match content_type {
        Some(content_type) => parse_content_type(content_type)?,
        None => sniff_boundary(path).await?,
    };
    debug!(boundary = %boundary, chunk_size, "Multipart boundary resolved");

    let file = File::open(path).await?;
    Ok(MulterSource::new(boundary, file_stream(file, chunk_size.max(1))))
}

fn parse_content_type(content_type: &str) -> Result<String> {
    let source = MulterSource::from_content_type(
        content_type,
        stream::empty::<std::io::Result<Bytes>>(),
    )
    .map_err(|e| CliError::boundary(e.to_string()))?;
    Ok(source.boundary().to_string())
}

async fn sniff_boundary(path: &Path) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut head = vec![0u8; SNIFF_LEN];
    let read = file.read(&mut head).await?;
    boundary_from_head(&head[..read])
}

/// Boundary named by the first line of a multipart body
fn boundary_from_head(head: &[u8]) -> Result<String> {
    let line_end = head
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| CliError::boundary("no line break in the first bytes of the body"))?;
    let line = std::str::from_utf8(&head[..line_end])
        .map_err(|_| CliError::boundary("first line is not valid UTF-8"))?
        .trim_end_matches('\r');

    match line.strip_prefix("--") {
        Some(boundary) if !boundary.is_empty() => Ok(boundary.to_string()),
        _ => Err(CliError::boundary(
            "body does not start with a boundary line; pass --content-type",
        )),
    }
}

/// Read `file` in chunks of at most `chunk_size` bytes
fn file_stream(
    file: File,
    chunk_size: usize,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    stream::unfold(Some(file), move |file| async move {
        let mut file = file?;
        let mut buf = BytesMut::zeroed(chunk_size);
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(read) => {
                buf.truncate(read);
                Some((Ok(buf.freeze()), Some(file)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}
