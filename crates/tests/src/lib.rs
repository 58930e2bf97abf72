//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于 multer 的端到端分发测试

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_blueprint_toml_round_trip() {
        let content = r#"
[limits]
max_fields = 8

[[files]]
name = "avatar"
handler = "log"

[[fields]]
name = "*"
handler = "collect"
"#;
        let blueprint = config_loader::ConfigLoader::load_from_str(
            content,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        let serialized = config_loader::ConfigLoader::to_toml(&blueprint).unwrap();
        let reparsed = config_loader::ConfigLoader::load_from_str(
            &serialized,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(reparsed.limits.max_fields, 8);
        assert_eq!(reparsed.files[0].name, "avatar");
        assert_eq!(reparsed.fields[0].name, "*");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{HandlerError, MultipartConfig, Part};
    use dispatcher::{CompletionState, DispatchError, Dispatcher, DispatcherBuilder};
    use form_parser::{MulterParser, MulterSource};
    use futures_util::stream;

    const BOUNDARY: &str = "X-FORM-BOUNDARY";

    enum Entry<'a> {
        Field(&'a str, &'a str),
        File(&'a str, &'a str, &'a str),
        Unnamed(&'a str),
    }

    /// Encode `entries` as a multipart/form-data body
    fn encode(entries: &[Entry<'_>]) -> String {
        let mut body = String::new();
        for entry in entries {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match entry {
                Entry::Field(name, value) => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                    ));
                }
                Entry::File(name, filename, contents) => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n{contents}\r\n"
                    ));
                }
                Entry::Unnamed(contents) => {
                    body.push_str(&format!(
                        "Content-Disposition: form-data; filename=\"anon.bin\"\r\n\r\n{contents}\r\n"
                    ));
                }
            }
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    /// Source that delivers the body in `chunk` sized pieces
    fn chunked_source(body: String, chunk: usize) -> MulterSource {
        let chunks: Vec<Result<Bytes, std::io::Error>> = body
            .into_bytes()
            .chunks(chunk)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        MulterSource::new(BOUNDARY, stream::iter(chunks))
    }

    fn source(entries: &[Entry<'_>]) -> MulterSource {
        MulterSource::from_bytes(BOUNDARY, encode(entries))
    }

    /// End-to-end test: TOML blueprint -> DispatcherBuilder -> MulterParser
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析并验证路由配置
    /// 2. DispatcherBuilder 安装 disk/discard/collect handler
    /// 3. Dispatcher 在 multer 解析的请求体上完成分发
    #[tokio::test]
    async fn test_e2e_blueprint_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
[[files]]
name = "avatar"
handler = "disk"
params = {{ base_path = "{}" }}

[[files]]
name = "*"
handler = "discard"

[[fields]]
name = "*"
handler = "collect"
"#,
            dir.path().display()
        );
        let blueprint =
            config_loader::ConfigLoader::load_from_str(&content, config_loader::ConfigFormat::Toml)
                .unwrap();

        let builder = DispatcherBuilder::from_blueprint(&blueprint).unwrap();
        let collector = builder.collector();
        let body = encode(&[
            Entry::Field("title", "holiday"),
            Entry::File("avatar", "../../me.png", "png-bytes"),
            Entry::File("extra", "notes.txt", "dropped by wildcard"),
            Entry::Field("tags[0]", "sea"),
        ]);
        let mut dispatcher = builder.build::<MulterParser>(chunked_source(body, 7));

        dispatcher.process().await.unwrap();

        assert_eq!(
            collector.entries(),
            vec![
                ("title".to_string(), "holiday".to_string()),
                ("tags[0]".to_string(), "sea".to_string()),
            ]
        );
        let written = std::fs::read(dir.path().join("0000-me.png")).unwrap();
        assert_eq!(written, b"png-bytes");

        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.parts_handled, 2);
        assert_eq!(snapshot.parts_drained, 0);
        assert_eq!(snapshot.fields_handled, 2);
        assert_eq!(dispatcher.state(), CompletionState::Settled);
    }

    #[tokio::test]
    async fn test_array_parts_share_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();

        let mut dispatcher = Dispatcher::<MulterParser>::new(
            source(&[
                Entry::File("files[0]", "a.txt", "alpha"),
                Entry::File("files[1]", "b.txt", "beta"),
                Entry::File("files[]", "c.txt", "gamma"),
            ]),
            MultipartConfig::default(),
        );
        dispatcher.on_file("files", move |part: Part| {
            let recorded = recorded.clone();
            async move {
                let name = part.name().to_string();
                let bytes = part.bytes().await?;
                recorded
                    .lock()
                    .unwrap()
                    .push((name, String::from_utf8_lossy(&bytes).into_owned()));
                Ok::<(), HandlerError>(())
            }
        });

        dispatcher.process().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], ("files[0]".to_string(), "alpha".to_string()));
        assert_eq!(seen[2], ("files[]".to_string(), "gamma".to_string()));
    }

    #[tokio::test]
    async fn test_unmatched_and_unnamed_parts_are_drained() {
        let handled = Arc::new(AtomicUsize::new(0));
        let counter = handled.clone();

        let mut dispatcher = Dispatcher::<MulterParser>::new(
            source(&[
                Entry::File("resume", "cv.pdf", "0123456789"),
                Entry::Unnamed("abc"),
                Entry::File("avatar", "me.png", "png"),
            ]),
            MultipartConfig::default(),
        );
        dispatcher.on_file("avatar", move |part: Part| {
            let counter = counter.clone();
            async move {
                part.drain().await?;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        });

        dispatcher.process().await.unwrap();

        assert_eq!(handled.load(Ordering::SeqCst), 1);
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.parts_drained, 2);
        assert_eq!(snapshot.bytes_drained, 13);
    }

    #[tokio::test]
    async fn test_no_handlers_leaves_body_unread() {
        let polled = Arc::new(AtomicBool::new(false));
        let flag = polled.clone();
        let body = stream::poll_fn(move |_cx| {
            flag.store(true, Ordering::SeqCst);
            std::task::Poll::Ready(None::<Result<Bytes, std::io::Error>>)
        });

        let mut dispatcher = Dispatcher::<MulterParser>::new(
            MulterSource::new(BOUNDARY, body),
            MultipartConfig::default(),
        );

        dispatcher.process().await.unwrap();
        assert!(!polled.load(Ordering::SeqCst));
        assert!(matches!(
            dispatcher.process().await,
            Err(DispatchError::AlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_max_fields_counts_files() {
        let mut dispatcher = Dispatcher::<MulterParser>::new(
            source(&[
                Entry::Field("a", "1"),
                Entry::File("doc", "d.txt", "x"),
                Entry::Field("b", "2"),
            ]),
            MultipartConfig::with_max_fields(2),
        );
        dispatcher
            .on_file("*", |part: Part| async move {
                part.drain().await?;
                Ok::<(), HandlerError>(())
            })
            .on_field("*", |_key, _value| Ok(()));

        let err = dispatcher.process().await.unwrap_err();
        assert!(matches!(err, DispatchError::EntityTooLarge { .. }));
        assert_eq!(err.status_code(), 413);
    }

    #[tokio::test]
    async fn test_field_size_limit_is_entity_too_large() {
        let mut dispatcher = Dispatcher::<MulterParser>::new(
            source(&[Entry::Field("bio", "0123456789"), Entry::Field("x", "y")]),
            MultipartConfig {
                max_fields: 10,
                max_fields_size: 4,
            },
        );
        dispatcher.on_field("*", |_key, _value| Ok(()));

        let err = dispatcher.process().await.unwrap_err();
        assert_eq!(err.status_code(), 413);
    }

    #[derive(Debug)]
    struct StorageFull;

    impl std::fmt::Display for StorageFull {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "storage full")
        }
    }

    impl std::error::Error for StorageFull {}

    #[tokio::test]
    async fn test_handler_error_is_returned_verbatim() {
        let mut dispatcher = Dispatcher::<MulterParser>::new(
            source(&[
                Entry::File("avatar", "me.png", "png"),
                Entry::File("later", "l.txt", "never handled"),
            ]),
            MultipartConfig::default(),
        );
        dispatcher.on_file("avatar", |part: Part| async move {
            part.drain().await?;
            Err::<(), HandlerError>(Box::new(StorageFull))
        });
        dispatcher.on_file("later", |part: Part| async move {
            part.drain().await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), HandlerError>(())
        });

        let err = tokio::time::timeout(Duration::from_secs(1), dispatcher.process())
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err.to_string(), "storage full");
        assert!(err
            .into_handler_error()
            .unwrap()
            .downcast_ref::<StorageFull>()
            .is_some());
    }

    #[tokio::test]
    async fn test_malformed_body_is_parser_error() {
        let mut dispatcher = Dispatcher::<MulterParser>::new(
            MulterSource::from_bytes(BOUNDARY, "--X-FORM-BOUNDARY\r\nno headers end"),
            MultipartConfig::default(),
        );
        dispatcher.on_file("*", |part: Part| async move {
            part.drain().await?;
            Ok::<(), HandlerError>(())
        });

        let err = dispatcher.process().await.unwrap_err();
        assert!(matches!(err, DispatchError::Parser(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_handler_reading_part_late_still_completes() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let mut dispatcher = Dispatcher::<MulterParser>::new(
            source(&[
                Entry::File("slow", "s.bin", "slow body"),
                Entry::Field("after", "value"),
            ]),
            MultipartConfig::default(),
        );
        dispatcher
            .on_file("slow", move |part: Part| {
                let flag = flag.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let bytes = part.bytes().await?;
                    assert_eq!(&bytes[..], b"slow body");
                    flag.store(true, Ordering::SeqCst);
                    Ok::<(), HandlerError>(())
                }
            })
            .on_field("after", |_key, value| {
                assert_eq!(value, "value");
                Ok(())
            });

        dispatcher.process().await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(dispatcher.pending_handlers(), 0);
    }
}
