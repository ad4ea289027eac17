use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, ClientResult, ProfileApi};
use crate::services::image;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Downscales a chosen image and uploads it, one at a time.
#[derive(Debug, Default)]
pub struct ImageUploader {
    busy: AtomicBool,
}

/// Clears the busy flag however the upload ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ImageUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn upload<A: ProfileApi + ?Sized>(
        &self,
        api: &A,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<UploadedImage> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ClientError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let prepared = tokio::task::spawn_blocking(move || image::prepare_upload(&bytes))
            .await
            .map_err(|e| ClientError::ImageDecode(format!("image task failed: {}", e)))??;

        tracing::debug!(
            "Uploading {} as {}x{} {}",
            filename,
            prepared.width,
            prepared.height,
            prepared.kind.content_type()
        );
        api.upload_image(filename, prepared.bytes).await
    }
}

#[cfg(test)]
mod tests {
    use ::image::ImageFormat;

    use super::*;
    use crate::client::mock::MockApi;
    use crate::services::image::tests::encoded;

    #[tokio::test]
    async fn large_image_is_shrunk_before_upload() {
        let api = MockApi::default();
        let uploader = ImageUploader::new();

        let uploaded = uploader
            .upload(&api, "wide.jpg", encoded(2000, 1000, ImageFormat::Jpeg))
            .await
            .unwrap();
        assert_eq!((uploaded.width, uploaded.height), (1200, 600));
        assert!(!uploader.is_busy());

        let uploads = api.uploads.lock().unwrap();
        assert_eq!(uploads[0].0, "wide.jpg");
        assert_eq!(::image::guess_format(&uploads[0].1).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn decode_failure_resets_busy_flag() {
        let api = MockApi::default();
        let uploader = ImageUploader::new();

        let err = uploader
            .upload(&api, "broken.png", b"not an image".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ImageDecode(_)));
        assert!(!uploader.is_busy());
        assert!(api.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_resets_busy_flag() {
        let api = MockApi {
            fail_uploads: true,
            ..Default::default()
        };
        let uploader = ImageUploader::new();

        let err = uploader
            .upload(&api, "ok.png", encoded(10, 10, ImageFormat::Png))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Upload(_)));
        assert!(!uploader.is_busy());
    }

    #[tokio::test]
    async fn concurrent_upload_is_refused() {
        let api = MockApi::default();
        let uploader = ImageUploader::new();
        uploader.busy.store(true, Ordering::SeqCst);

        let err = uploader
            .upload(&api, "ok.png", encoded(10, 10, ImageFormat::Png))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Busy));
        // The refused call must not clear the flag it does not own
        assert!(uploader.is_busy());
    }
}
