use std::{io::Cursor, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use image::ImageReader;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use tracing::{debug, instrument, warn};

use crate::config::ImageConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    /// Accepts the essence of a `Content-Type` value, parameters ignored.
    pub fn from_mime(ct: &str) -> Option<Self> {
        let essence = ct.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    fn from_decoder(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

/// Guesses the format from the signature, then parses the header.
/// Anything that is not a readable JPEG, PNG or GIF is `InvalidFormat`.
pub fn decode_header(bytes: &[u8]) -> Result<ImageInfo, ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::InvalidFormat(e.to_string()))?;
    let format = reader
        .format()
        .and_then(ImageFormat::from_decoder)
        .ok_or_else(|| ImageError::InvalidFormat("unknown image format".into()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ImageError::InvalidFormat(e.to_string()))?;

    Ok(ImageInfo {
        format,
        width,
        height,
        size: bytes.len(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("error fetching image from url: {0}")]
    Fetch(#[source] reqwest::Error),
    #[error("error - image is not available: {0}")]
    Unavailable(u16),
    #[error("error - unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("error reading image: {0}")]
    Read(#[source] reqwest::Error),
    #[error("error - image too large: {size}, but need {max}")]
    TooLarge { size: usize, max: usize },
    #[error("error - invalid image format: {0}")]
    InvalidFormat(String),
}

/// Checks that a URL points at a reachable, reasonably sized image.
#[async_trait]
pub trait ImageInspector: Send + Sync {
    async fn inspect(&self, url: &str) -> Result<ImageInfo, ImageError>;
}

#[derive(Clone)]
pub struct HttpImageInspector {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageInspector {
    pub fn new(cfg: &ImageConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .build()
            .context("build image http client")?;
        Ok(Self::with_client(client, cfg.max_bytes))
    }

    pub fn with_client(client: reqwest::Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }
}

#[async_trait]
impl ImageInspector for HttpImageInspector {
    #[instrument(skip(self))]
    async fn inspect(&self, url: &str) -> Result<ImageInfo, ImageError> {
        let mut resp = self.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "image fetch failed");
            ImageError::Fetch(e)
        })?;

        if resp.status() != StatusCode::OK {
            return Err(ImageError::Unavailable(resp.status().as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if ImageFormat::from_mime(&content_type).is_none() {
            return Err(ImageError::UnsupportedContentType(content_type));
        }

        if let Some(len) = resp.content_length() {
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            if len > self.max_bytes {
                return Err(ImageError::TooLarge {
                    size: len,
                    max: self.max_bytes,
                });
            }
        }

        let mut buf = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(ImageError::Read)? {
            buf.extend_from_slice(&chunk);
            if buf.len() > self.max_bytes {
                return Err(ImageError::TooLarge {
                    size: buf.len(),
                    max: self.max_bytes,
                });
            }
        }
        debug!(size = buf.len(), "image downloaded");

        let info = decode_header(&buf)?;
        debug!(width = info.width, height = info.height, "image header decoded");
        Ok(info)
    }
}

#[cfg(test)]
pub use stub::StubImageInspector;


#[cfg(test)]
mod image_tests {
    use std::net::SocketAddr;

    use axum::{http::header, routing::get, Router};

    use super::*;

    /// 1x1 greyscale PNG.
    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\
        \x00\x00\x00\x0dIHDR\x00\x00\x00\x01\x00\x00\x00\x01\x08\x00\x00\x00\x00\x3a\x7e\x9b\x55\
        \x00\x00\x00\x0aIDAT\x78\x9c\x63\x60\x00\x00\x00\x02\x00\x01\x48\xaf\xa4\x71\
        \x00\x00\x00\x00IEND\xae\x42\x60\x82";
    /// 1x1 GIF.
    const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00\
        !\xf9\x04\x01\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;";
    /// PNG signature followed by bytes that are not a PNG header.
    const TRUNCATED_PNG: &[u8] = b"\x89PNG\r\n\x1a\ngarbage-not-a-png";

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageFormat::from_mime("image/jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("image/png"), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::from_mime("Image/GIF; charset=binary"),
            Some(ImageFormat::Gif)
        );
        assert_eq!(ImageFormat::from_mime("image/webp"), None);
        assert_eq!(ImageFormat::from_mime("text/html"), None);
        assert_eq!(ImageFormat::from_mime(""), None);
    }

    #[test]
    fn test_decode_header() {
        let png = decode_header(PNG_BYTES).unwrap();
        assert_eq!((png.format, png.width, png.height), (ImageFormat::Png, 1, 1));
        assert_eq!(png.size, PNG_BYTES.len());

        let gif = decode_header(GIF_BYTES).unwrap();
        assert_eq!((gif.format, gif.width, gif.height), (ImageFormat::Gif, 1, 1));
    }

    #[test]
    fn test_decode_header_rejects_undecodable_bytes() {
        for bytes in [TRUNCATED_PNG, b"GIF89a".as_slice(), b"<html>".as_slice(), b"".as_slice()] {
            assert!(
                matches!(decode_header(bytes), Err(ImageError::InvalidFormat(_))),
                "{bytes:?}"
            );
        }
    }

    async fn spawn_server() -> SocketAddr {
        let app = Router::new()
            .route(
                "/cat.png",
                get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES) }),
            )
            .route(
                "/cat.gif",
                get(|| async { ([(header::CONTENT_TYPE, "image/gif")], GIF_BYTES) }),
            )
            .route(
                "/page",
                get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }),
            )
            .route(
                "/fake.png",
                get(|| async { ([(header::CONTENT_TYPE, "image/png")], "not an image") }),
            )
            .route(
                "/truncated.png",
                get(|| async { ([(header::CONTENT_TYPE, "image/png")], TRUNCATED_PNG) }),
            )
            .route(
                "/huge.png",
                get(|| async {
                    let mut body = PNG_BYTES.to_vec();
                    body.resize(4096, 0);
                    ([(header::CONTENT_TYPE, "image/png")], body)
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn inspector(max_bytes: usize) -> HttpImageInspector {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpImageInspector::with_client(client, max_bytes)
    }

    #[tokio::test]
    async fn accepts_served_images() {
        let addr = spawn_server().await;
        let insp = inspector(1024);

        let info = insp.inspect(&format!("http://{addr}/cat.png")).await.unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!(info.size, PNG_BYTES.len());

        let info = insp.inspect(&format!("http://{addr}/cat.gif")).await.unwrap();
        assert_eq!(info.format, ImageFormat::Gif);
    }

    #[tokio::test]
    async fn rejects_missing_resource() {
        let addr = spawn_server().await;
        let err = inspector(1024)
            .inspect(&format!("http://{addr}/nope.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Unavailable(404)));
        assert_eq!(err.to_string(), "error - image is not available: 404");
    }

    #[tokio::test]
    async fn rejects_non_image_content_type() {
        let addr = spawn_server().await;
        let err = inspector(1024)
            .inspect(&format!("http://{addr}/page"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "error - unsupported content type: text/html");
    }

    #[tokio::test]
    async fn rejects_body_that_is_not_an_image() {
        let addr = spawn_server().await;
        for path in ["fake.png", "truncated.png"] {
            let err = inspector(1024)
                .inspect(&format!("http://{addr}/{path}"))
                .await
                .unwrap_err();
            assert!(matches!(err, ImageError::InvalidFormat(_)), "{path}: {err}");
            assert!(err.to_string().starts_with("error - invalid image format: "));
        }
    }

    #[tokio::test]
    async fn rejects_oversized_body() {
        let addr = spawn_server().await;
        let err = inspector(1024)
            .inspect(&format!("http://{addr}/huge.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { max: 1024, .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = inspector(1024)
            .inspect(&format!("http://{addr}/cat.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Fetch(_)));
    }
}
